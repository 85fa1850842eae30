//! Per-input debounce and gesture state machine.
//!
//! The engine is pure: every step returns the ordered list of events to emit
//! and timers to arm or cancel, and the caller applies them. The four running
//! flags live here and are the only record of which timers are armed, so an
//! expiry that arrives after its timer was cancelled is ignored.

use embassy_time::Duration;
use heapless::Vec;
use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::types::{EventKind, GestureState, GestureTimings, InputConfig, TimerRole};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineAction {
    Emit(EventKind),
    ArmOnce { role: TimerRole, after: Duration },
    ArmPeriodic { role: TimerRole, period: Duration },
    Cancel(TimerRole),
}

const ACTION_SLOTS: usize = 6;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionBuffer {
    slots: Vec<EngineAction, ACTION_SLOTS>,
}

impl ActionBuffer {
    pub const MAX: usize = ACTION_SLOTS;

    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn push(&mut self, action: EngineAction) {
        let pushed = self.slots.push(action);
        debug_assert!(pushed.is_ok(), "action buffer overflow");
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineAction> {
        self.slots.iter()
    }

    pub fn emitted(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.slots.iter().filter_map(|action| match action {
            EngineAction::Emit(kind) => Some(*kind),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EngineOutput {
    pub actions: ActionBuffer,
    pub state: GestureState,
}

#[derive(Clone, Copy, Debug)]
enum GestureEvent {
    Edge,
    Settled { pressed: bool },
    SettleAborted,
    DoubleClickElapsed,
    HoldElapsed,
    RepeatTick,
}

#[derive(Default)]
struct DispatchContext {
    actions: ActionBuffer,
}

impl DispatchContext {
    fn emit(&mut self, kind: EventKind) {
        self.actions.push(EngineAction::Emit(kind));
    }

    fn arm_once(&mut self, role: TimerRole, after: Duration) {
        self.actions.push(EngineAction::ArmOnce { role, after });
    }

    fn arm_periodic(&mut self, role: TimerRole, period: Duration) {
        self.actions.push(EngineAction::ArmPeriodic { role, period });
    }

    fn cancel(&mut self, role: TimerRole) {
        self.actions.push(EngineAction::Cancel(role));
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct RunningTimers {
    debounce: bool,
    double_click: bool,
    hold: bool,
    hold_repeat: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Phase {
    #[default]
    Released,
    Pressed,
    Holding,
    Repeating,
}

pub struct GestureEngine {
    machine: statig::blocking::StateMachine<GestureHsm>,
}

impl GestureEngine {
    pub fn new(config: InputConfig, timings: GestureTimings) -> Self {
        Self {
            machine: GestureHsm::new(config, timings).state_machine(),
        }
    }

    /// Raw edge in either direction.
    pub fn edge(&mut self) -> EngineOutput {
        self.dispatch(GestureEvent::Edge)
    }

    /// Debounce expiry with the level sampled after the settling window.
    pub fn settle(&mut self, pressed: bool) -> EngineOutput {
        self.dispatch(GestureEvent::Settled { pressed })
    }

    /// Debounce expiry where the pin could not be sampled.
    pub fn settle_aborted(&mut self) -> EngineOutput {
        self.dispatch(GestureEvent::SettleAborted)
    }

    pub fn double_click_elapsed(&mut self) -> EngineOutput {
        self.dispatch(GestureEvent::DoubleClickElapsed)
    }

    pub fn hold_elapsed(&mut self) -> EngineOutput {
        self.dispatch(GestureEvent::HoldElapsed)
    }

    pub fn repeat_tick(&mut self) -> EngineOutput {
        self.dispatch(GestureEvent::RepeatTick)
    }

    pub fn is_debouncing(&self) -> bool {
        self.machine.inner().running.debounce
    }

    pub fn is_armed(&self, role: TimerRole) -> bool {
        let running = &self.machine.inner().running;
        match role {
            TimerRole::Debounce => running.debounce,
            TimerRole::DoubleClick => running.double_click,
            TimerRole::Hold => running.hold,
            TimerRole::HoldRepeat => running.hold_repeat,
        }
    }

    pub fn state(&self) -> GestureState {
        self.machine.inner().gesture_state()
    }

    pub fn config(&self) -> InputConfig {
        self.machine.inner().config
    }

    fn dispatch(&mut self, event: GestureEvent) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        EngineOutput {
            actions: context.actions,
            state: self.state(),
        }
    }
}

struct GestureHsm {
    config: InputConfig,
    timings: GestureTimings,
    running: RunningTimers,
    phase: Phase,
}

impl GestureHsm {
    fn new(config: InputConfig, timings: GestureTimings) -> Self {
        Self {
            config,
            timings,
            running: RunningTimers::default(),
            phase: Phase::Released,
        }
    }

    fn gesture_state(&self) -> GestureState {
        if self.running.debounce {
            return GestureState::Debouncing;
        }
        match self.phase {
            Phase::Released => GestureState::Idle,
            Phase::Pressed => GestureState::Pressed,
            Phase::Holding => GestureState::Holding,
            Phase::Repeating => GestureState::Repeating,
        }
    }

    fn begin_debounce(&mut self, context: &mut DispatchContext) {
        // Only the first edge of a burst schedules a re-sample.
        if self.running.debounce {
            return;
        }
        context.arm_once(TimerRole::Debounce, self.timings.debounce);
        self.running.debounce = true;
    }

    fn settle_press(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        if !self.running.debounce {
            return Handled;
        }
        self.running.debounce = false;

        context.emit(EventKind::Down);
        context.emit(EventKind::Click);

        if self.config.hold && !self.running.hold {
            context.arm_once(TimerRole::Hold, self.timings.hold);
            self.running.hold = true;
        }

        if self.config.double_click {
            if self.running.double_click {
                context.emit(EventKind::DoubleClick);
                context.cancel(TimerRole::DoubleClick);
                self.running.double_click = false;
            } else {
                context.arm_once(TimerRole::DoubleClick, self.timings.double_click);
                self.running.double_click = true;
            }
        }

        if self.running.hold_repeat {
            self.phase = Phase::Repeating;
            Transition(State::repeating())
        } else {
            self.phase = Phase::Pressed;
            Transition(State::pressed())
        }
    }

    fn settle_release(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        if !self.running.debounce {
            return Handled;
        }
        self.running.debounce = false;

        context.emit(EventKind::Up);
        if self.running.hold {
            context.cancel(TimerRole::Hold);
            self.running.hold = false;
        }
        if self.running.hold_repeat {
            context.cancel(TimerRole::HoldRepeat);
            self.running.hold_repeat = false;
        }

        self.phase = Phase::Released;
        Transition(State::released())
    }

    fn fire_hold(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        if !self.running.hold {
            return Handled;
        }
        // One-shot: repetition belongs to the periodic timer.
        self.running.hold = false;

        context.emit(EventKind::Hold);
        if !self.config.hold_repeat {
            self.phase = Phase::Holding;
            return Transition(State::holding());
        }

        context.emit(EventKind::Click);
        if !self.running.hold_repeat {
            context.arm_periodic(TimerRole::HoldRepeat, self.timings.hold_repeat);
            self.running.hold_repeat = true;
        }
        self.phase = Phase::Repeating;
        Transition(State::repeating())
    }
}

#[state_machine(initial = "State::released()")]
impl GestureHsm {
    #[state(superstate = "monitoring")]
    fn released(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::Settled { pressed: true } => self.settle_press(context),
            _ => Super,
        }
    }

    #[state(superstate = "engaged")]
    fn pressed(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::HoldElapsed => self.fire_hold(context),
            _ => Super,
        }
    }

    #[state(superstate = "engaged")]
    fn holding(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::HoldElapsed => self.fire_hold(context),
            _ => Super,
        }
    }

    #[state(superstate = "engaged")]
    fn repeating(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::RepeatTick if self.running.hold_repeat => {
                context.emit(EventKind::Click);
                Handled
            }
            // Hold re-armed by a second settle while repeat keeps running.
            GestureEvent::HoldElapsed => self.fire_hold(context),
            _ => Super,
        }
    }

    #[superstate(superstate = "monitoring")]
    fn engaged(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::Settled { pressed: true } => self.settle_press(context),
            GestureEvent::Settled { pressed: false } => self.settle_release(context),
            _ => Super,
        }
    }

    #[superstate]
    fn monitoring(&mut self, context: &mut DispatchContext, event: &GestureEvent) -> Outcome<State> {
        match event {
            GestureEvent::Edge => {
                self.begin_debounce(context);
                Handled
            }
            GestureEvent::Settled { pressed: false } => self.settle_release(context),
            GestureEvent::Settled { pressed: true } => Handled,
            GestureEvent::SettleAborted => {
                self.running.debounce = false;
                Handled
            }
            GestureEvent::DoubleClickElapsed => {
                // Window closes silently.
                self.running.double_click = false;
                Handled
            }
            // Expiry of a timer that release already cancelled.
            GestureEvent::HoldElapsed | GestureEvent::RepeatTick => Handled,
        }
    }
}
