use embedded_hal::digital::InputPin;

use crate::{
    channel::EventSink,
    engine::{EngineAction, EngineOutput, GestureEngine},
    timers::TimerSet,
    types::{ButtonEvent, GestureState, GestureTimings, InputConfig, InputId, TimerRole},
};

/// Edge-interrupt capable input pin.
pub trait ButtonPin: InputPin {
    /// Acknowledges a latched edge interrupt, returning whether one was pending.
    fn take_pending_edge(&mut self) -> bool;
}

/// One monitored input: its pin, its four timers and its gesture engine.
pub struct Button<P, T> {
    id: InputId,
    pin: P,
    timers: T,
    engine: GestureEngine,
}

impl<P, T> Button<P, T>
where
    P: ButtonPin,
    T: TimerSet,
{
    pub fn new(id: InputId, config: InputConfig, timings: GestureTimings, pin: P, timers: T) -> Self {
        Self {
            id,
            pin,
            timers,
            engine: GestureEngine::new(config, timings),
        }
    }

    pub fn id(&self) -> InputId {
        self.id
    }

    pub fn config(&self) -> InputConfig {
        self.engine.config()
    }

    pub fn state(&self) -> GestureState {
        self.engine.state()
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    /// Raw edge. Never emits; at most arms the debounce timer.
    pub fn on_edge(&mut self) {
        let output = self.engine.edge();
        for action in output.actions.iter() {
            self.apply_timer(*action);
        }
    }

    /// Timer expiry. Returns how many events the sink rejected.
    pub fn on_timer<S: EventSink + ?Sized>(&mut self, role: TimerRole, sink: &S) -> u32 {
        let output = match role {
            TimerRole::Debounce => {
                if !self.engine.is_debouncing() {
                    return 0;
                }
                // Act on the level after the settling window, not the edge.
                match self.pin.is_high() {
                    Ok(high) => {
                        let pressed = self.engine.config().polarity.is_pressed(high);
                        self.engine.settle(pressed)
                    }
                    Err(_) => self.engine.settle_aborted(),
                }
            }
            TimerRole::DoubleClick => self.engine.double_click_elapsed(),
            TimerRole::Hold => self.engine.hold_elapsed(),
            TimerRole::HoldRepeat => self.engine.repeat_tick(),
        };
        self.apply(output, sink)
    }

    fn apply<S: EventSink + ?Sized>(&mut self, output: EngineOutput, sink: &S) -> u32 {
        let mut dropped = 0;
        for action in output.actions.iter() {
            match *action {
                EngineAction::Emit(kind) => {
                    if !sink.offer(ButtonEvent::new(self.id, kind)) {
                        dropped += 1;
                    }
                }
                timer_action => self.apply_timer(timer_action),
            }
        }
        dropped
    }

    fn apply_timer(&mut self, action: EngineAction) {
        match action {
            EngineAction::ArmOnce { role, after } => self.timers.arm_once(role, after),
            EngineAction::ArmPeriodic { role, period } => self.timers.arm_periodic(role, period),
            EngineAction::Cancel(role) => self.timers.cancel(role),
            EngineAction::Emit(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use core::{cell::RefCell, convert::Infallible};

    use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
    use embassy_time::Duration;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;
    use crate::types::{EventKind, Polarity};

    #[derive(Default)]
    struct FakePin {
        high: bool,
        pending: bool,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    impl ButtonPin for FakePin {
        fn take_pending_edge(&mut self) -> bool {
            core::mem::take(&mut self.pending)
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl InputPin for BrokenPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    impl ButtonPin for BrokenPin {
        fn take_pending_edge(&mut self) -> bool {
            true
        }
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum TimerCall {
        Once(TimerRole, Duration),
        Periodic(TimerRole, Duration),
        Cancel(TimerRole),
    }

    #[derive(Default)]
    struct RecordingTimers {
        calls: RefCell<std::vec::Vec<TimerCall>>,
    }

    impl TimerSet for &RecordingTimers {
        fn arm_once(&mut self, role: TimerRole, after: Duration) {
            self.calls.borrow_mut().push(TimerCall::Once(role, after));
        }

        fn arm_periodic(&mut self, role: TimerRole, period: Duration) {
            self.calls.borrow_mut().push(TimerCall::Periodic(role, period));
        }

        fn cancel(&mut self, role: TimerRole) {
            self.calls.borrow_mut().push(TimerCall::Cancel(role));
        }
    }

    fn drain(channel: &Channel<CriticalSectionRawMutex, ButtonEvent, 8>) -> std::vec::Vec<EventKind> {
        core::iter::from_fn(|| channel.try_receive().ok())
            .map(|event| event.kind)
            .collect()
    }

    #[test]
    fn active_low_pin_reads_low_as_pressed() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let mut button = Button::new(
            InputId(3),
            InputConfig::all_gestures(Polarity::ActiveLow),
            GestureTimings::DEFAULT,
            FakePin::default(),
            &timers,
        );

        button.on_edge();
        button.pin_mut().high = false;
        assert_eq!(button.on_timer(TimerRole::Debounce, &channel), 0);

        let event = channel.try_receive().expect("down queued");
        assert_eq!(event, ButtonEvent::new(InputId(3), EventKind::Down));
        assert_eq!(drain(&channel), [EventKind::Click]);
        assert_eq!(
            timers.calls.borrow().as_slice(),
            [
                TimerCall::Once(TimerRole::Debounce, Duration::from_millis(10)),
                TimerCall::Once(TimerRole::Hold, Duration::from_millis(2_000)),
                TimerCall::Once(TimerRole::DoubleClick, Duration::from_millis(500)),
            ]
        );
    }

    #[test]
    fn active_high_pin_reads_low_as_released() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let mut button = Button::new(
            InputId(0),
            InputConfig::all_gestures(Polarity::ActiveHigh),
            GestureTimings::DEFAULT,
            FakePin::default(),
            &timers,
        );

        button.on_edge();
        button.on_timer(TimerRole::Debounce, &channel);
        assert_eq!(drain(&channel), [EventKind::Up]);
        assert_eq!(button.state(), GestureState::Idle);
    }

    #[test]
    fn level_is_sampled_at_settle_time_not_edge_time() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let mut button = Button::new(
            InputId(0),
            InputConfig::all_gestures(Polarity::ActiveLow),
            GestureTimings::DEFAULT,
            FakePin {
                high: false,
                pending: false,
            },
            &timers,
        );

        // Bounce: pressed at the edge, back to released before the re-sample.
        button.on_edge();
        button.pin_mut().high = true;
        button.on_edge();
        button.on_edge();
        button.on_timer(TimerRole::Debounce, &channel);

        assert_eq!(drain(&channel), [EventKind::Up]);
        let debounce_arms = timers
            .calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, TimerCall::Once(TimerRole::Debounce, _)))
            .count();
        assert_eq!(debounce_arms, 1);
    }

    #[test]
    fn full_sink_counts_dropped_events() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 1> = Channel::new();
        let mut button = Button::new(
            InputId(0),
            InputConfig::all_gestures(Polarity::ActiveHigh),
            GestureTimings::DEFAULT,
            FakePin {
                high: true,
                pending: false,
            },
            &timers,
        );

        button.on_edge();
        assert_eq!(button.on_timer(TimerRole::Debounce, &channel), 1);
        assert_eq!(
            channel.try_receive().map(|event| event.kind),
            Ok(EventKind::Down)
        );
        // Timers are still driven even though Click was dropped.
        assert_eq!(button.state(), GestureState::Pressed);
    }

    #[test]
    fn unreadable_pin_abandons_the_settle() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let mut button = Button::new(
            InputId(0),
            InputConfig::all_gestures(Polarity::ActiveLow),
            GestureTimings::DEFAULT,
            BrokenPin,
            &timers,
        );

        button.on_edge();
        assert_eq!(button.on_timer(TimerRole::Debounce, &channel), 0);
        assert!(channel.is_empty());
        assert_eq!(button.state(), GestureState::Idle);
    }

    #[test]
    fn stray_debounce_expiry_does_not_sample() {
        let timers = RecordingTimers::default();
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let mut button = Button::new(
            InputId(0),
            InputConfig::all_gestures(Polarity::ActiveLow),
            GestureTimings::DEFAULT,
            BrokenPin,
            &timers,
        );

        assert_eq!(button.on_timer(TimerRole::Debounce, &channel), 0);
        assert!(channel.is_empty());
        assert!(timers.calls.borrow().is_empty());
    }
}
