//! Wake-word voice command dispatch
//!
//! A recogniser produces transcripts; those that begin with the assistant's
//! name are dispatched to a command handler and the reply is spoken. The
//! listen loop restarts after every recognition pass until it is shut down.

mod config;
mod dispatcher;
mod io;

pub use config::AssistantConfig;
pub use dispatcher::{parse_command, sanitize_utterance, Assistant, CommandHandler};
pub use io::{LogSpeaker, Recognition, Recognizer, Speaker, StdinRecognizer};
