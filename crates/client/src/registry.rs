//! Subscriber registry for inbound messages.
//!
//! All mutation goes through one short-held lock. Dispatch works on a
//! [`CallbackRegistry::snapshot`]: a handler removed while a message is being
//! dispatched may still see that message once, and a handler added during
//! dispatch never sees it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use dart_duel_protocol::{CorrelationId, Message};

/// A registered message handler.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync + 'static>;

/// Identifies one registered handler.
///
/// Subscriber ids and one-shot response handler ids never compare equal,
/// even when they wrap the same UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Key);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Key {
    Subscriber(Uuid),
    Reply(CorrelationId),
}

impl SubscriptionId {
    /// Mint a fresh id.
    pub fn generate() -> Self {
        Self(Key::Subscriber(Uuid::new_v4()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(Key::Subscriber(uuid))
    }

    /// Id of the one-shot handler waiting for the response to `id`.
    pub(crate) fn for_request(id: CorrelationId) -> Self {
        Self(Key::Reply(id))
    }

    pub fn as_uuid(&self) -> Uuid {
        match self.0 {
            Key::Subscriber(uuid) => uuid,
            Key::Reply(id) => id.as_uuid(),
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::Subscriber(uuid) => uuid.hyphenated().fmt(f),
            Key::Reply(id) => write!(f, "reply:{id}"),
        }
    }
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    // Insertion order; snapshots are taken in this order.
    by_seq: BTreeMap<u64, (SubscriptionId, Handler)>,
    seq_of: HashMap<SubscriptionId, u64>,
}

impl Entries {
    fn take(&mut self, id: SubscriptionId) -> Option<Handler> {
        let seq = self.seq_of.remove(&id)?;
        self.by_seq.remove(&seq).map(|(_, handler)| handler)
    }
}

/// Thread-safe map from [`SubscriptionId`] to [`Handler`].
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Mutex<Entries>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under a fresh id.
    pub fn add<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.insert(SubscriptionId::generate(), Arc::new(handler))
    }

    /// Register `handler` under `id`, replacing any handler already there.
    ///
    /// A replaced handler moves to the end of the dispatch order.
    pub fn insert(&self, id: SubscriptionId, handler: Handler) -> SubscriptionId {
        // Displaced handlers are dropped after the lock is released.
        let _displaced = {
            let mut entries = self.entries.lock();
            let displaced = entries.take(id);
            let seq = entries.next_seq;
            entries.next_seq += 1;
            entries.by_seq.insert(seq, (id, handler));
            entries.seq_of.insert(id, seq);
            displaced
        };
        id
    }

    /// Remove the handler registered under `id`.
    ///
    /// Returns whether anything was removed; removing an absent id is a no-op.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.entries.lock().take(id);
        removed.is_some()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.lock().seq_of.contains_key(&id)
    }

    /// Point-in-time copy of the registered handlers, in registration order.
    pub fn snapshot(&self) -> Vec<Handler> {
        let entries = self.entries.lock();
        entries
            .by_seq
            .values()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().seq_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every handler.
    pub fn clear(&self) {
        let _cleared = {
            let mut entries = self.entries.lock();
            entries.seq_of.clear();
            std::mem::take(&mut entries.by_seq)
        };
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn probe() -> Message {
        Message::Unrecognized(json!(null))
    }

    /// Handler that appends `label` to `log` when invoked.
    fn recorder(log: &Arc<Mutex<Vec<u32>>>, label: u32) -> impl Fn(&Message) + Send + Sync {
        let log = Arc::clone(log);
        move |_: &Message| log.lock().push(label)
    }

    fn run(handlers: &[Handler]) {
        let msg = probe();
        for h in handlers {
            h(&msg);
        }
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = CallbackRegistry::new();
        reg.add(recorder(&log, 1));
        reg.add(recorder(&log, 2));
        reg.add(recorder(&log, 3));

        run(&reg.snapshot());
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_is_idempotent_and_targets_one_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = CallbackRegistry::new();
        let a = reg.add(recorder(&log, 1));
        let _b = reg.add(recorder(&log, 2));

        assert!(reg.remove(a));
        assert!(!reg.remove(a));
        assert!(!reg.remove(SubscriptionId::generate()));
        assert_eq!(reg.len(), 1);

        run(&reg.snapshot());
        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn subscriber_ids_cannot_reach_reply_handlers() {
        let reg = CallbackRegistry::new();
        let request = CorrelationId::generate();
        let reply = reg.insert(SubscriptionId::for_request(request), Arc::new(|_: &Message| {}));

        let lookalike = SubscriptionId::from_uuid(request.as_uuid());
        assert_ne!(lookalike, reply);
        assert!(!reg.remove(lookalike));
        assert!(reg.contains(reply));
        assert_eq!(reply.as_uuid(), request.as_uuid());
    }

    #[test]
    fn insert_replaces_existing_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = CallbackRegistry::new();
        let id = SubscriptionId::generate();
        reg.insert(id, Arc::new(recorder(&log, 1)));
        reg.add(recorder(&log, 2));
        reg.insert(id, Arc::new(recorder(&log, 3)));

        assert_eq!(reg.len(), 2);
        run(&reg.snapshot());
        assert_eq!(*log.lock(), vec![2, 3]);
    }

    #[test]
    fn removal_after_snapshot_does_not_affect_in_flight_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = CallbackRegistry::new();
        let c = Arc::clone(&calls);
        let id = reg.add(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let snapshot = reg.snapshot();
        reg.remove(id);
        run(&snapshot);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        run(&reg.snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_remove_itself_during_dispatch() {
        let reg = Arc::new(CallbackRegistry::new());
        let id = SubscriptionId::generate();
        let weak = Arc::downgrade(&reg);
        reg.insert(
            id,
            Arc::new(move |_: &Message| {
                if let Some(reg) = weak.upgrade() {
                    reg.remove(id);
                    reg.remove(id);
                }
            }),
        );

        run(&reg.snapshot());
        assert!(reg.is_empty());
    }

    #[test]
    fn handler_added_during_dispatch_misses_current_message() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = Arc::new(CallbackRegistry::new());
        let weak = Arc::downgrade(&reg);
        let inner_log = Arc::clone(&log);
        reg.add(move |_| {
            inner_log.lock().push(1);
            if let Some(reg) = weak.upgrade() {
                reg.add(recorder(&inner_log, 2));
            }
        });

        run(&reg.snapshot());
        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn concurrent_mutation_never_tears_snapshots() {
        let reg = Arc::new(CallbackRegistry::new());
        let stable_calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&stable_calls);
        reg.add(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let id = reg.add(|_| {});
                        assert!(reg.remove(id));
                    }
                })
            })
            .collect();

        let msg = probe();
        for _ in 0..500 {
            let snapshot = reg.snapshot();
            assert!(!snapshot.is_empty() && snapshot.len() <= 5);
            for h in &snapshot {
                h(&msg);
            }
        }

        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(stable_calls.load(Ordering::SeqCst), 500);
        assert_eq!(reg.len(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
        RemoveUnknown,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Add),
            2 => (0usize..16).prop_map(Op::Remove),
            1 => Just(Op::RemoveUnknown),
        ]
    }

    proptest! {
        #[test]
        fn snapshot_matches_model(ops in prop::collection::vec(arb_op(), 0..64)) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let reg = CallbackRegistry::new();
            let mut issued: Vec<(SubscriptionId, u32)> = Vec::new();
            let mut model: Vec<(SubscriptionId, u32)> = Vec::new();
            let mut next_label = 0u32;

            for op in ops {
                match op {
                    Op::Add => {
                        let id = reg.add(recorder(&log, next_label));
                        issued.push((id, next_label));
                        model.push((id, next_label));
                        next_label += 1;
                    }
                    Op::Remove(i) => {
                        if let Some(&(id, _)) = issued.get(i) {
                            let was_live = model.iter().any(|(m, _)| *m == id);
                            prop_assert_eq!(reg.remove(id), was_live);
                            model.retain(|(m, _)| *m != id);
                        }
                    }
                    Op::RemoveUnknown => {
                        prop_assert!(!reg.remove(SubscriptionId::generate()));
                    }
                }
            }

            log.lock().clear();
            run(&reg.snapshot());
            let expected: Vec<u32> = model.iter().map(|(_, label)| *label).collect();
            prop_assert_eq!(&*log.lock(), &expected);
            prop_assert_eq!(reg.len(), model.len());
        }
    }
}
