use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};

use crate::types::{ButtonEvent, EventKind, InputId};

/// Producer side of the event channel. `offer` never blocks; a full channel
/// rejects the event and it is dropped.
pub trait EventSink {
    fn offer(&self, event: ButtonEvent) -> bool;
}

impl<M: RawMutex, const N: usize> EventSink for Channel<M, ButtonEvent, N> {
    fn offer(&self, event: ButtonEvent) -> bool {
        self.try_send(event).is_ok()
    }
}

/// Application callback surface.
pub trait EventHandler {
    fn on_event(&mut self, input: InputId, kind: EventKind);
}

impl<F> EventHandler for F
where
    F: FnMut(InputId, EventKind),
{
    fn on_event(&mut self, input: InputId, kind: EventKind) {
        self(input, kind)
    }
}

/// Single consumer of the event channel, run from task context.
pub struct Dispatcher<'a, M: RawMutex, const N: usize> {
    channel: &'a Channel<M, ButtonEvent, N>,
}

impl<'a, M: RawMutex, const N: usize> Dispatcher<'a, M, N> {
    pub const fn new(channel: &'a Channel<M, ButtonEvent, N>) -> Self {
        Self { channel }
    }

    /// Waits without timeout for the next event and hands it to `handler`.
    pub async fn dispatch_next<H: EventHandler>(&self, handler: &mut H) -> ButtonEvent {
        let event = self.channel.receive().await;
        handler.on_event(event.input, event.kind);
        event
    }

    /// Dispatches forever.
    pub async fn run<H: EventHandler>(&self, mut handler: H) {
        loop {
            self.dispatch_next(&mut handler).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    use super::*;

    #[test]
    fn full_channel_rejects_without_blocking() {
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 2> = Channel::new();
        let down = ButtonEvent::new(InputId(0), EventKind::Down);

        assert!(channel.offer(down));
        assert!(channel.offer(down));
        assert!(!channel.offer(ButtonEvent::new(InputId(0), EventKind::Click)));
        assert_eq!(channel.len(), 2);
    }

    #[test]
    fn dispatcher_delivers_in_enqueue_order() {
        let channel: Channel<CriticalSectionRawMutex, ButtonEvent, 8> = Channel::new();
        let sent = [
            ButtonEvent::new(InputId(0), EventKind::Down),
            ButtonEvent::new(InputId(1), EventKind::Down),
            ButtonEvent::new(InputId(0), EventKind::Click),
            ButtonEvent::new(InputId(1), EventKind::Up),
        ];
        for event in sent {
            assert!(channel.offer(event));
        }

        let dispatcher = Dispatcher::new(&channel);
        let mut seen = std::vec::Vec::new();
        let mut handler = |input: InputId, kind: EventKind| seen.push(ButtonEvent::new(input, kind));
        for _ in 0..sent.len() {
            block_on(dispatcher.dispatch_next(&mut handler));
        }

        assert_eq!(seen, sent);
        assert!(channel.is_empty());
    }
}
