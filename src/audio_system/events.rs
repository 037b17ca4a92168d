/// Sound event notifications
///
/// Lets UI code and tests observe what the session manager did without
/// coupling to its internals.
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;

use super::source::EffectName;

/// Things the session manager did
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    MusicStarted,
    MusicPaused,
    MusicLoadFailed,
    EffectLoaded(EffectName),
    EffectLoadFailed(EffectName),
    EffectPlayed { name: EffectName, volume: f32 },
    EffectThrottled(EffectName),
    MusicDucked { volume: f32 },
    MusicRestored { volume: f32 },
    PreloadFinished { loaded: usize },
    Disposed,
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<SoundEvent>,
}

/// Fans sound events out to every listener of one session
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (Receiver<SoundEvent>, SubscriberId) {
        let (tx, rx) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber { id, sender: tx });
        (rx, id)
    }

    /// Stop delivering to `id`; its receiver sees a disconnect
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Deliver `event` without blocking. Listeners whose receiver was dropped are forgotten.
    pub fn publish(&self, event: SoundEvent) {
        let stale: Vec<SubscriberId> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| matches!(s.sender.try_send(event.clone()), Err(TrySendError::Disconnected(_))))
            .map(|s| s.id)
            .collect();

        if !stale.is_empty() {
            self.subscribers.write().retain(|s| !stale.contains(&s.id));
        }
    }

    #[cfg(test)]
    fn listeners(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listener_gets_the_event() {
        let bus = EventBus::new();
        let (first, _) = bus.subscribe();
        let (second, _) = bus.subscribe();

        bus.publish(SoundEvent::EffectThrottled(EffectName::Tap));

        assert_eq!(first.try_recv(), Ok(SoundEvent::EffectThrottled(EffectName::Tap)));
        assert_eq!(second.try_recv(), Ok(SoundEvent::EffectThrottled(EffectName::Tap)));
    }

    #[test]
    fn test_unsubscribe_disconnects_receiver() {
        let bus = EventBus::new();
        let (rx, id) = bus.subscribe();
        let (_other, other_id) = bus.subscribe();
        assert_ne!(id, other_id);

        bus.unsubscribe(id);
        bus.publish(SoundEvent::MusicStarted);

        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_dropped_listener_is_forgotten_on_publish() {
        let bus = EventBus::new();
        let (kept, _) = bus.subscribe();
        let (dropped, _) = bus.subscribe();
        drop(dropped);
        assert_eq!(bus.listeners(), 2);

        bus.publish(SoundEvent::MusicPaused);

        assert_eq!(bus.listeners(), 1);
        assert_eq!(kept.try_recv(), Ok(SoundEvent::MusicPaused));
    }
}
