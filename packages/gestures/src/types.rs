use core::fmt;

use embassy_time::Duration;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InputId(pub u8);

impl InputId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw level that means "pressed".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Polarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    pub const fn is_pressed(self, level_high: bool) -> bool {
        match self {
            Self::ActiveLow => !level_high,
            Self::ActiveHigh => level_high,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum EventKind {
    Down = 0,
    Up = 1,
    Click = 2,
    DoubleClick = 3,
    Hold = 4,
}

impl EventKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Click => "click",
            Self::DoubleClick => "double-click",
            Self::Hold => "hold",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonEvent {
    pub input: InputId,
    pub kind: EventKind,
}

impl ButtonEvent {
    pub const fn new(input: InputId, kind: EventKind) -> Self {
        Self { input, kind }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u8)]
pub enum TimerRole {
    Debounce = 0,
    DoubleClick = 1,
    Hold = 2,
    HoldRepeat = 3,
}

impl TimerRole {
    pub const COUNT: usize = 4;
    pub const ALL: [TimerRole; Self::COUNT] = [
        Self::Debounce,
        Self::DoubleClick,
        Self::Hold,
        Self::HoldRepeat,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Debounce => "debounce_timer",
            Self::DoubleClick => "double_click_timer",
            Self::Hold => "hold_timer",
            Self::HoldRepeat => "hold_repeat_timer",
        }
    }
}

impl fmt::Display for TimerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GestureTimings {
    pub debounce: Duration,
    pub double_click: Duration,
    pub hold: Duration,
    pub hold_repeat: Duration,
}

impl GestureTimings {
    pub const DEFAULT: Self = Self {
        debounce: Duration::from_millis(10),
        double_click: Duration::from_millis(500),
        hold: Duration::from_millis(2_000),
        hold_repeat: Duration::from_millis(200),
    };
}

impl Default for GestureTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-input options, fixed once the input is registered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InputConfig {
    pub polarity: Polarity,
    pub double_click: bool,
    pub hold: bool,
    pub hold_repeat: bool,
}

impl InputConfig {
    pub const fn all_gestures(polarity: Polarity) -> Self {
        Self {
            polarity,
            double_click: true,
            hold: true,
            hold_repeat: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum GestureState {
    #[default]
    Idle = 0,
    Debouncing = 1,
    Pressed = 2,
    Holding = 3,
    Repeating = 4,
}
