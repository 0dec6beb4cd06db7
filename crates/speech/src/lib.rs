mod command;
pub mod error;
mod synth;
#[cfg(any(test, feature = "mock"))]
pub mod testing;
pub mod transport;
mod voice;

pub use crate::command::{CommandOutput, CommandRunner, Invocation, SystemRunner, discover, shell_quote};
pub use crate::synth::{Connector, DEFAULT_TIMEOUT, Synthesizer, slug};
pub use crate::transport::Transport;
pub use crate::voice::VoiceModel;
