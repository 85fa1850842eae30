//! Timer Set abstraction and a shared software timer service.
//!
//! `TimerSchedule` keeps one deadline slot per (input, role). Arm and cancel
//! are short critical sections, callable from interrupt context; a single
//! task waits on `next_deadline()` / `wait_changed()` and drains
//! `pop_expired()`.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Instant};

use crate::{
    error::InitError,
    types::{InputId, TimerRole},
};

/// The four timers owned by one input.
pub trait TimerSet {
    /// Arms `role` to fire once after `after`. Re-arming restarts it.
    fn arm_once(&mut self, role: TimerRole, after: Duration);
    /// Arms `role` to fire every `period` until cancelled.
    fn arm_periodic(&mut self, role: TimerRole, period: Duration);
    fn cancel(&mut self, role: TimerRole);
}

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Slot {
    deadline: Option<Instant>,
    period: Option<Duration>,
}

impl Slot {
    const IDLE: Self = Self {
        deadline: None,
        period: None,
    };
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Expiry {
    pub input: InputId,
    pub role: TimerRole,
    pub deadline: Instant,
}

struct Table<const N: usize> {
    slots: [[Slot; TimerRole::COUNT]; N],
    created: [bool; N],
}

pub struct TimerSchedule<const N: usize> {
    table: Mutex<RefCell<Table<N>>>,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl<const N: usize> Default for TimerSchedule<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimerSchedule<N> {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(Table {
                slots: [[Slot::IDLE; TimerRole::COUNT]; N],
                created: [false; N],
            })),
            changed: Signal::new(),
        }
    }

    /// Hands out the Timer Set of `input`. Each input's timers are created
    /// once and live for the rest of the program.
    pub fn create<C: Clock>(
        &self,
        input: InputId,
        clock: C,
    ) -> Result<ScheduledTimers<'_, C, N>, InitError> {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            match table.created.get_mut(input.index()) {
                Some(created) if !*created => {
                    *created = true;
                    Ok(())
                }
                _ => Err(InitError::TimerCreate { input }),
            }
        })?;

        log::debug!("timers: created timer set input={}", input);

        Ok(ScheduledTimers {
            schedule: self,
            input,
            clock,
        })
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        critical_section::with(|cs| {
            let table = self.table.borrow_ref(cs);
            table
                .slots
                .iter()
                .flat_map(|roles| roles.iter())
                .filter_map(|slot| slot.deadline)
                .min()
        })
    }

    /// Removes the earliest timer due at `now`. One-shot timers disarm;
    /// periodic timers advance by one period.
    ///
    /// On equal deadlines a debounce fires after the gesture timers, so a
    /// window or hold that ends at the settle instant has already ended.
    pub fn pop_expired(&self, now: Instant) -> Option<Expiry> {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);

            let mut earliest: Option<(Instant, bool, usize, usize)> = None;
            for (input, roles) in table.slots.iter().enumerate() {
                for (role, slot) in roles.iter().enumerate() {
                    let Some(deadline) = slot.deadline else {
                        continue;
                    };
                    if deadline > now {
                        continue;
                    }
                    let key = (deadline, role == TimerRole::Debounce.index(), input, role);
                    if earliest.is_none_or(|best| key < best) {
                        earliest = Some(key);
                    }
                }
            }

            let (deadline, _, input, role) = earliest?;
            let slot = &mut table.slots[input][role];
            slot.deadline = slot.period.map(|period| deadline + period);

            Some(Expiry {
                input: InputId(input as u8),
                role: TimerRole::ALL[role],
                deadline,
            })
        })
    }

    pub fn is_armed(&self, input: InputId, role: TimerRole) -> bool {
        critical_section::with(|cs| {
            let table = self.table.borrow_ref(cs);
            table
                .slots
                .get(input.index())
                .is_some_and(|roles| roles[role.index()].deadline.is_some())
        })
    }

    /// Resolves once any slot was armed or cancelled since the last wait.
    pub async fn wait_changed(&self) {
        self.changed.wait().await;
    }

    fn set(&self, input: InputId, role: TimerRole, slot: Slot) {
        critical_section::with(|cs| {
            let mut table = self.table.borrow_ref_mut(cs);
            if let Some(roles) = table.slots.get_mut(input.index()) {
                roles[role.index()] = slot;
            }
        });
        self.changed.signal(());
    }
}

/// Timer Set of one input, backed by a shared `TimerSchedule`.
pub struct ScheduledTimers<'a, C, const N: usize> {
    schedule: &'a TimerSchedule<N>,
    input: InputId,
    clock: C,
}

impl<C, const N: usize> ScheduledTimers<'_, C, N> {
    pub fn input(&self) -> InputId {
        self.input
    }
}

impl<C: Clock, const N: usize> TimerSet for ScheduledTimers<'_, C, N> {
    fn arm_once(&mut self, role: TimerRole, after: Duration) {
        let slot = Slot {
            deadline: Some(self.clock.now() + after),
            period: None,
        };
        self.schedule.set(self.input, role, slot);
    }

    fn arm_periodic(&mut self, role: TimerRole, period: Duration) {
        let slot = Slot {
            deadline: Some(self.clock.now() + period),
            period: Some(period),
        };
        self.schedule.set(self.input, role, slot);
    }

    fn cancel(&mut self, role: TimerRole) {
        self.schedule.set(self.input, role, Slot::IDLE);
    }
}
