//! Fixed table of monitored inputs, shared between interrupt handlers and
//! the timer service.
//!
//! Every input sits behind its own `critical_section::Mutex`, so all handlers
//! touching one input are serialized and the running flags inside its engine
//! are never observed half-updated.

use core::{
    cell::{Cell, RefCell},
    sync::atomic::{AtomicU32, Ordering},
};

use critical_section::Mutex;

use crate::{
    button::{Button, ButtonPin},
    channel::EventSink,
    error::InitError,
    timers::TimerSet,
    types::{GestureState, InputId, TimerRole},
};

pub struct ButtonRegistry<P, T, const N: usize> {
    slots: [Mutex<RefCell<Option<Button<P, T>>>>; N],
    initialized: Mutex<Cell<bool>>,
    registered: Mutex<Cell<usize>>,
    dropped: AtomicU32,
}

impl<P, T, const N: usize> Default for ButtonRegistry<P, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T, const N: usize> ButtonRegistry<P, T, N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { Mutex::new(RefCell::new(None)) }; N],
            initialized: Mutex::new(Cell::new(false)),
            registered: Mutex::new(Cell::new(0)),
            dropped: AtomicU32::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.registered.borrow(cs).get())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_initialized(&self) -> bool {
        critical_section::with(|cs| self.initialized.borrow(cs).get())
    }

    /// Events rejected by a full channel since boot.
    pub fn dropped_events(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<P, T, const N: usize> ButtonRegistry<P, T, N>
where
    P: ButtonPin,
    T: TimerSet,
{
    /// Claims the registry once. Call before installing the interrupt
    /// handler so no handler observes a partly filled table.
    pub fn claim(&self) -> Result<(), InitError> {
        critical_section::with(|cs| {
            let initialized = self.initialized.borrow(cs);
            if initialized.get() {
                return Err(InitError::AlreadyInitialized);
            }
            initialized.set(true);
            Ok(())
        })
    }

    /// Places a button in the slot named by its id. Slots filled before a
    /// failure stay registered.
    pub fn register(&self, button: Button<P, T>) -> Result<(), InitError> {
        let id = button.id();
        let config = button.config();
        critical_section::with(|cs| {
            let Some(slot) = self.slots.get(id.index()) else {
                return Err(InitError::InterruptRegistration { input: id });
            };
            let mut slot = slot.borrow_ref_mut(cs);
            if slot.is_some() {
                return Err(InitError::InterruptRegistration { input: id });
            }
            *slot = Some(button);
            let registered = self.registered.borrow(cs);
            registered.set(registered.get() + 1);
            Ok(())
        })?;

        log::info!(
            "buttons: registered input={} polarity={:?} double_click={} hold={} hold_repeat={}",
            id,
            config.polarity,
            config.double_click,
            config.hold,
            config.hold_repeat
        );
        Ok(())
    }

    /// One-shot initialization from a list of buttons.
    pub fn initialize<I>(&self, buttons: I) -> Result<(), InitError>
    where
        I: IntoIterator<Item = Button<P, T>>,
    {
        self.claim()?;
        for button in buttons {
            self.register(button)?;
        }
        Ok(())
    }

    /// Raw edge interrupt for one input.
    pub fn on_edge(&self, id: InputId) {
        self.with_button(id, |button| button.on_edge());
    }

    /// Shared GPIO interrupt: acknowledges and handles every input with a
    /// latched edge.
    pub fn service_edges(&self) {
        for slot in &self.slots {
            critical_section::with(|cs| {
                if let Some(button) = slot.borrow_ref_mut(cs).as_mut() {
                    if button.pin_mut().take_pending_edge() {
                        button.on_edge();
                    }
                }
            });
        }
    }

    /// Timer expiry for one input.
    pub fn on_timer<S: EventSink + ?Sized>(&self, id: InputId, role: TimerRole, sink: &S) {
        let dropped = self
            .with_button(id, |button| button.on_timer(role, sink))
            .unwrap_or(0);
        if dropped > 0 {
            self.dropped.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    pub fn state(&self, id: InputId) -> Option<GestureState> {
        self.with_button(id, |button| button.state())
    }

    fn with_button<R>(&self, id: InputId, f: impl FnOnce(&mut Button<P, T>) -> R) -> Option<R> {
        let slot = self.slots.get(id.index())?;
        critical_section::with(|cs| slot.borrow_ref_mut(cs).as_mut().map(f))
    }
}
