use anyhow::Result;
use std::future::Future;
use tracing::{debug, info, warn};

use super::config::AssistantConfig;
use super::io::{Recognition, Recognizer, Speaker};

/// Characters dropped before a sentence is spoken
const UNSPEAKABLE: &[char] = &[
    '&', '/', '\\', '#', ',', '+', '(', ')', '$', '~', '%', '.', '\'', '"', '*', '?', '<', '>',
    '{', '}',
];

/// Extract the command following the wake word
///
/// The transcript is lowercased and split on single spaces; it is a
/// command only when the first word is exactly the lowercased name.
pub fn parse_command(transcript: &str, name: &str) -> Option<String> {
    let lowered = transcript.to_lowercase();
    let mut words = lowered.split(' ');
    let first = words.next()?;

    if first != name.to_lowercase() {
        return None;
    }
    Some(words.collect::<Vec<_>>().join(" "))
}

/// Strip punctuation a speech synthesiser would read out
pub fn sanitize_utterance(sentence: &str) -> String {
    sentence.chars().filter(|c| !UNSPEAKABLE.contains(c)).collect()
}

/// Receives commands with the wake word removed
#[async_trait::async_trait]
pub trait CommandHandler: Send {
    /// Handle one command. Returns the reply to speak, if any.
    async fn handle(&mut self, command: &str) -> Result<Option<String>>;
}

#[async_trait::async_trait]
impl<F> CommandHandler for F
where
    F: FnMut(&str) -> Option<String> + Send,
{
    async fn handle(&mut self, command: &str) -> Result<Option<String>> {
        Ok(self(command))
    }
}

/// Continuously listening voice command dispatcher
pub struct Assistant<R, S> {
    config: AssistantConfig,
    recognizer: R,
    speaker: S,
}

impl<R: Recognizer, S: Speaker> Assistant<R, S> {
    pub fn new(config: AssistantConfig, recognizer: R, speaker: S) -> Self {
        Self {
            config,
            recognizer,
            speaker,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Speak a sentence with unspeakable punctuation removed
    pub async fn say(&mut self, sentence: &str) -> Result<()> {
        let filtered = sanitize_utterance(sentence);
        self.speaker.speak(&filtered).await
    }

    /// Listen and dispatch commands until `shutdown` completes or the
    /// recogniser closes. Returns the number of commands dispatched.
    ///
    /// Listening is suspended while a command is handled and resumes
    /// afterwards. Speaker errors are logged. Recogniser errors are logged
    /// and listening restarts after the configured delay.
    pub async fn run_until<H, F>(&mut self, handler: &mut H, shutdown: F) -> Result<usize>
    where
        H: CommandHandler,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut dispatched = 0;

        info!(
            "Listening for \"{}\" ({})",
            self.config.name, self.config.language
        );

        loop {
            let heard = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                heard = self.recognizer.listen() => heard,
            };

            match heard {
                Ok(Recognition::Transcript(transcript)) => {
                    let Some(command) = parse_command(&transcript, &self.config.name) else {
                        debug!("Ignoring transcript without wake word: {}", transcript);
                        continue;
                    };

                    info!("Dispatching command: \"{}\"", command);
                    dispatched += 1;

                    let reply = match handler.handle(&command).await {
                        Ok(reply) => reply.unwrap_or_else(|| self.config.reply.clone()),
                        Err(e) => {
                            warn!("Command handler failed: {:#}", e);
                            self.config.reply.clone()
                        }
                    };
                    if let Err(e) = self.say(&reply).await {
                        warn!("Failed to speak reply, listening again: {:#}", e);
                    }
                }
                Ok(Recognition::Ended) => debug!("Recognition pass ended, listening again"),
                Ok(Recognition::Closed) => {
                    info!("Recognizer closed");
                    break;
                }
                Err(e) => {
                    warn!("Recognizer error, restarting: {:#}", e);
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.config.restart_delay()) => {}
                    }
                }
            }
        }

        info!("Stopped listening after {} commands", dispatched);
        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_requires_leading_wake_word() {
        assert_eq!(
            parse_command("Samantha what time is it", "Samantha"),
            Some("what time is it".to_string())
        );
        assert_eq!(parse_command("hey samantha what time", "Samantha"), None);
        assert_eq!(parse_command("samantha", "Samantha"), Some(String::new()));
        assert_eq!(parse_command("", "Samantha"), None);
    }

    #[test]
    fn test_sanitize_utterance() {
        assert_eq!(
            sanitize_utterance("It's 5 o'clock, (probably)."),
            "Its 5 oclock probably"
        );
        assert_eq!(sanitize_utterance("a/b\\c #1 + {x} <y> $2 ~ 50% *?\""), "abc 1  x y 2  50 ");
    }
}
