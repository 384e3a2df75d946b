use glam::DVec2;
use std::sync::{Arc, Weak};

/// A visual component that repositions its reflection for an offset.
pub trait Offsetable: Send + Sync {
    /// Accept a new offset and re-layout.
    fn apply_offset(&self, offset: DVec2);
}

/// Handle returned by registration, used to unregister explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

/// Non-owning set of observers.
///
/// Entries hold weak references only. Observers dropped elsewhere are
/// pruned on the next registration or the next time the live set is taken.
#[derive(Default)]
pub struct Registry {
    next_id: u64,
    entries: Vec<(ObserverToken, Weak<dyn Offsetable>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Weak<dyn Offsetable>) -> ObserverToken {
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        let token = ObserverToken(self.next_id);
        self.next_id += 1;
        self.entries.push((token, observer));
        token
    }

    /// Remove an entry. Returns `false` if the token was unknown or already pruned.
    pub fn unregister(&mut self, token: ObserverToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| *t != token);
        self.entries.len() != before
    }

    /// Strong references to every observer still alive, pruning the rest.
    pub fn live(&mut self) -> Vec<Arc<dyn Offsetable>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|(_, weak)| match weak.upgrade() {
            Some(observer) => {
                live.push(observer);
                true
            }
            None => false,
        });
        live
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Number of entries, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Probe(Mutex<Vec<DVec2>>);

    impl Offsetable for Probe {
        fn apply_offset(&self, offset: DVec2) {
            self.0.lock().unwrap().push(offset);
        }
    }

    fn weak(probe: &Arc<Probe>) -> Weak<dyn Offsetable> {
        let weak: Weak<Probe> = Arc::downgrade(probe);
        weak
    }

    #[test]
    fn tokens_are_unique() {
        let probe = Arc::new(Probe::default());
        let mut registry = Registry::new();
        let a = registry.register(weak(&probe));
        let b = registry.register(weak(&probe));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn dead_entries_are_pruned_lazily() {
        let kept = Arc::new(Probe::default());
        let dropped = Arc::new(Probe::default());
        let mut registry = Registry::new();
        registry.register(weak(&kept));
        registry.register(weak(&dropped));

        drop(dropped);
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.len(), 2);

        let live = registry.live();
        assert_eq!(live.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registering_prunes_dead_entries() {
        let kept = Arc::new(Probe::default());
        let mut registry = Registry::new();
        registry.register(weak(&kept));
        for _ in 0..1000 {
            let transient = Arc::new(Probe::default());
            registry.register(weak(&transient));
        }
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn registry_does_not_keep_observers_alive() {
        let probe = Arc::new(Probe::default());
        let mut registry = Registry::new();
        registry.register(weak(&probe));
        assert_eq!(Arc::strong_count(&probe), 1);
    }

    #[test]
    fn unregister_removes_entry() {
        let probe = Arc::new(Probe::default());
        let mut registry = Registry::new();
        let token = registry.register(weak(&probe));
        assert!(registry.unregister(token));
        assert!(!registry.unregister(token));
        assert!(registry.live().is_empty());
    }
}
