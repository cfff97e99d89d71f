use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

/// Outcome of one recognition pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Speech was recognised
    Transcript(String),
    /// The pass ended without a result; listen again
    Ended,
    /// The source is gone for good
    Closed,
}

/// Source of transcripts
#[async_trait::async_trait]
pub trait Recognizer: Send {
    /// Run one recognition pass
    async fn listen(&mut self) -> Result<Recognition>;
}

/// Output for spoken replies
#[async_trait::async_trait]
pub trait Speaker: Send {
    async fn speak(&mut self, text: &str) -> Result<()>;
}

/// Recogniser that treats each line typed on stdin as a transcript
pub struct StdinRecognizer {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinRecognizer {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Recognizer for StdinRecognizer {
    async fn listen(&mut self) -> Result<Recognition> {
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from stdin")?;

        Ok(match line.as_deref().map(str::trim) {
            None => Recognition::Closed,
            Some("") => Recognition::Ended,
            Some(text) => Recognition::Transcript(text.to_string()),
        })
    }
}

/// Speaker that writes replies to the log
#[derive(Debug, Default)]
pub struct LogSpeaker;

#[async_trait::async_trait]
impl Speaker for LogSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        info!("Assistant says: {}", text);
        Ok(())
    }
}
