use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the voice command assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Wake word every command must start with
    pub name: String,

    /// Recognition language (BCP 47 tag)
    pub language: String,

    /// Spoken when a command produces no reply of its own
    pub reply: String,

    /// Pause before listening again after a recogniser error
    pub restart_delay_ms: u64,
}

impl AssistantConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Samantha".to_string(),
            language: "en-US".to_string(),
            reply: "Sorry, I don't know that one.".to_string(),
            restart_delay_ms: 250,
        }
    }
}
