#![cfg_attr(not(test), no_std)]

pub mod button;
pub mod channel;
pub mod engine;
pub mod error;
pub mod registry;
pub mod timers;
pub mod types;

pub use button::{Button, ButtonPin};
pub use channel::{Dispatcher, EventHandler, EventSink};
pub use engine::{ActionBuffer, EngineAction, EngineOutput, GestureEngine};
pub use error::InitError;
pub use registry::ButtonRegistry;
pub use timers::{Clock, ScheduledTimers, TimerSchedule, TimerSet};
pub use types::{
    ButtonEvent, EventKind, GestureState, GestureTimings, InputConfig, InputId, Polarity,
    TimerRole,
};

/// Upper bound on monitored inputs a firmware image may configure.
pub const MAX_INPUTS: usize = 8;
