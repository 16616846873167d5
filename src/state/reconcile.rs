//! Reconciling List State
//!
//! Single source of truth for an ordered collection that is mutated both
//! optimistically (local first) and by authoritative reloads.
//!
//! Flow per gesture:
//! `apply_local_mutation` (snapshot + mutate) -> `commit` (ticket) ->
//! caller persists with the ticket, outside any lock -> `settle`.
//!
//! While anything is staged or in flight, `replace` is ignored so a slow
//! reload cannot clobber the optimistic order.

use std::collections::BTreeSet;

/// How a ticket's persistence result was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Backend accepted; local state was already correct
    Committed,
    /// Backend rejected; the ticket's snapshot was restored, or a resync
    /// was scheduled when a later ticket had already committed
    RolledBack,
    /// Result arrived for a ticket issued before a rollback; discarded
    Superseded,
}

/// Everything one persistence call needs, captured at commit time
#[derive(Debug)]
pub struct CommitTicket<T, P> {
    seq: u64,
    snapshot: Vec<T>,
    payload: P,
}

impl<T, P> CommitTicket<T, P> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// State before the mutation this ticket persists
    pub fn snapshot(&self) -> &[T] {
        &self.snapshot
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilingList<T> {
    items: Vec<T>,
    /// Snapshot of a mutated-but-not-yet-committed gesture
    staged: Option<Vec<T>>,
    in_flight: BTreeSet<u64>,
    next_seq: u64,
    /// Tickets with a lower sequence were issued before the last rollback
    valid_from: u64,
    /// Highest sequence the backend accepted
    last_committed: Option<u64>,
    /// Local items may no longer match the backend
    needs_resync: bool,
}

impl<T: Clone> Default for ReconcilingList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone> ReconcilingList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            staged: None,
            in_flight: BTreeSet::new(),
            next_seq: 0,
            valid_from: 0,
            last_committed: None,
            needs_resync: false,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_pending(&self) -> bool {
        self.staged.is_some() || !self.in_flight.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Adopt an authoritative collection unless an optimistic change is pending.
    /// Returns whether it was adopted.
    pub fn replace(&mut self, new_items: Vec<T>) -> bool {
        if self.is_pending() {
            log::debug!(
                "Ignoring reload of {} items: {} persist call(s) pending",
                new_items.len(),
                self.in_flight.len()
            );
            return false;
        }
        self.items = new_items;
        self.needs_resync = false;
        true
    }

    /// Synchronously transform local state and mark it pending.
    /// Only the first call per gesture takes the snapshot.
    pub fn apply_local_mutation<R>(&mut self, transform: impl FnOnce(&mut Vec<T>) -> R) -> R {
        if self.staged.is_none() {
            self.staged = Some(self.items.clone());
        }
        transform(&mut self.items)
    }

    /// Rearrange items without treating it as a change to persist (e.g. a new sort mode).
    pub fn adjust_view(&mut self, transform: impl FnOnce(&mut Vec<T>)) {
        transform(&mut self.items);
    }

    /// Apply a change the backend already holds. Staged state gets it too;
    /// snapshots held by in-flight tickets cannot, so a resync is flagged.
    pub fn apply_persisted(&mut self, transform: impl Fn(&mut Vec<T>)) {
        transform(&mut self.items);
        if let Some(staged) = self.staged.as_mut() {
            transform(staged);
        }
        if !self.in_flight.is_empty() {
            self.needs_resync = true;
        }
    }

    /// Turn the staged mutation into a ticket. The payload is computed from the
    /// current (mutated) state. `None` when nothing is staged.
    pub fn commit<P>(&mut self, payload: impl FnOnce(&[T]) -> P) -> Option<CommitTicket<T, P>> {
        let snapshot = self.staged.take()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq);

        Some(CommitTicket {
            seq,
            snapshot,
            payload: payload(&self.items),
        })
    }

    /// Apply the persistence result of a ticket.
    pub fn settle<P, E>(&mut self, ticket: CommitTicket<T, P>, result: &Result<(), E>) -> Settled {
        self.in_flight.remove(&ticket.seq);

        if ticket.seq < self.valid_from {
            self.needs_resync = true;
            return Settled::Superseded;
        }

        match result {
            Ok(()) => {
                self.last_committed = Some(self.last_committed.map_or(ticket.seq, |c| c.max(ticket.seq)));
                Settled::Committed
            }
            Err(_) if self.last_committed.is_some_and(|c| c > ticket.seq) => {
                // A later payload already persisted state built on this
                // gesture; the snapshot no longer matches the backend
                self.needs_resync = true;
                Settled::RolledBack
            }
            Err(_) => {
                self.items = ticket.snapshot;
                self.staged = None;
                // Later tickets were built on the state we just discarded
                self.valid_from = self.next_seq;
                Settled::RolledBack
            }
        }
    }

    /// True once (and only once) when nothing is pending and a superseded or
    /// out-of-order result means the backend should be re-read.
    pub fn take_needs_resync(&mut self) -> bool {
        if self.is_pending() || !self.needs_resync {
            return false;
        }
        self.needs_resync = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::move_item;

    fn list() -> ReconcilingList<char> {
        ReconcilingList::new(vec!['a', 'b', 'c'])
    }

    #[test]
    fn test_replace_when_idle() {
        let mut l = list();
        assert!(l.replace(vec!['x']));
        assert_eq!(l.items(), &['x']);
    }

    #[test]
    fn test_replace_ignored_while_pending() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 2, 0));
        assert!(!l.replace(vec!['z']));

        let ticket = l.commit(|v| v.to_vec()).unwrap();
        assert!(!l.replace(vec!['z']));
        assert_eq!(l.items(), &['c', 'a', 'b']);

        assert_eq!(l.settle(ticket, &Ok::<(), ()>(())), Settled::Committed);
        assert!(!l.is_pending());
        assert!(l.replace(vec!['z']));
    }

    #[test]
    fn test_failure_restores_snapshot() {
        let mut l = list();
        let before = l.items().to_vec();
        l.apply_local_mutation(|v| move_item(v, 0, 2));
        let ticket = l.commit(|v| v.to_vec()).unwrap();
        assert_eq!(ticket.payload(), &vec!['b', 'c', 'a']);
        assert_eq!(ticket.snapshot(), before.as_slice());

        assert_eq!(l.settle(ticket, &Err::<(), _>("offline")), Settled::RolledBack);
        assert_eq!(l.items(), before.as_slice());
        assert!(!l.is_pending());
    }

    #[test]
    fn test_second_mutation_keeps_first_snapshot() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 0, 1));
        l.apply_local_mutation(|v| move_item(v, 2, 0));
        let ticket = l.commit(|_| ()).unwrap();
        assert_eq!(ticket.snapshot(), &['a', 'b', 'c']);
        assert!(l.commit(|_| ()).is_none());
    }

    #[test]
    fn test_chained_gestures_stay_pending_until_both_settle() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 0, 1));
        let first = l.commit(|_| ()).unwrap();
        l.apply_local_mutation(|v| move_item(v, 2, 0));
        let second = l.commit(|_| ()).unwrap();
        // second gesture applied on top of the optimistic state
        assert_eq!(l.items(), &['c', 'b', 'a']);

        assert_eq!(l.settle(first, &Ok::<(), ()>(())), Settled::Committed);
        assert!(l.is_pending());
        assert!(!l.replace(vec![]));

        assert_eq!(l.settle(second, &Ok::<(), ()>(())), Settled::Committed);
        assert!(!l.is_pending());
    }

    #[test]
    fn test_results_after_rollback_are_superseded() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 0, 1));
        let first = l.commit(|_| ()).unwrap();
        l.apply_local_mutation(|v| move_item(v, 2, 0));
        let second = l.commit(|_| ()).unwrap();

        // second fails first: back to the state before the second gesture
        assert_eq!(l.settle(second, &Err::<(), _>(())), Settled::RolledBack);
        assert_eq!(l.items(), &['b', 'a', 'c']);

        // first resolves late: its outcome no longer applies
        assert_eq!(l.settle(first, &Err::<(), _>(())), Settled::Superseded);
        assert_eq!(l.items(), &['b', 'a', 'c']);
        assert!(l.take_needs_resync());
        assert!(!l.take_needs_resync());
    }

    #[test]
    fn test_failure_after_later_commit_keeps_items_and_resyncs() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 0, 2));
        let first = l.commit(|_| ()).unwrap();
        l.apply_local_mutation(|v| move_item(v, 1, 0));
        let second = l.commit(|_| ()).unwrap();
        assert_eq!(l.items(), &['c', 'b', 'a']);

        assert_eq!(l.settle(second, &Ok::<(), ()>(())), Settled::Committed);
        assert_eq!(l.settle(first, &Err::<(), _>(())), Settled::RolledBack);

        // the first snapshot would disagree with what the second persisted
        assert_eq!(l.items(), &['c', 'b', 'a']);
        assert!(!l.is_pending());
        assert!(l.take_needs_resync());
    }

    #[test]
    fn test_apply_persisted_reaches_staged_state() {
        let mut l = list();
        l.apply_persisted(|v| v[0] = 'x');
        assert_eq!(l.items(), &['x', 'b', 'c']);
        assert!(!l.take_needs_resync());

        l.apply_local_mutation(|v| move_item(v, 0, 2));
        l.apply_persisted(|v| v.iter_mut().filter(|c| **c == 'b').for_each(|c| *c = 'y'));
        let ticket = l.commit(|_| ()).unwrap();
        assert_eq!(ticket.snapshot(), &['x', 'y', 'c']);

        l.apply_persisted(|v| v.iter_mut().filter(|c| **c == 'c').for_each(|c| *c = 'z'));
        assert_eq!(l.settle(ticket, &Err::<(), _>(())), Settled::RolledBack);
        // the restored snapshot lost 'z', so the backend gets re-read
        assert_eq!(l.items(), &['x', 'y', 'c']);
        assert!(l.take_needs_resync());
    }

    #[test]
    fn test_gesture_after_rollback_is_valid() {
        let mut l = list();
        l.apply_local_mutation(|v| move_item(v, 0, 1));
        let first = l.commit(|_| ()).unwrap();
        l.settle(first, &Err::<(), _>(()));

        l.apply_local_mutation(|v| move_item(v, 0, 2));
        let next = l.commit(|_| ()).unwrap();
        assert_eq!(l.settle(next, &Err::<(), _>(())), Settled::RolledBack);
        assert_eq!(l.items(), &['a', 'b', 'c']);
    }
}
