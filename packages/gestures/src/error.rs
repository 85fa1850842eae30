use core::fmt;

use crate::types::InputId;

/// Reasons a one-shot initialization can fail. Steps completed before the
/// failure stay in place.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitError {
    AlreadyInitialized,
    TaskSpawn,
    PinConfig { input: InputId },
    TimerCreate { input: InputId },
    InterruptRegistration { input: InputId },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => f.write_str("buttons already initialized"),
            Self::TaskSpawn => f.write_str("failed to spawn button event task"),
            Self::PinConfig { input } => write!(f, "pin configuration failed for input {input}"),
            Self::TimerCreate { input } => {
                write!(f, "failed to create timer set for input {input}")
            }
            Self::InterruptRegistration { input } => {
                write!(f, "failed to register interrupt handler for input {input}")
            }
        }
    }
}
