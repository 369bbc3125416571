use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::records::RecordId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    record: RecordId,
    priority: f64,
    seq: u64,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-priority queue of search records. Equal priorities pop in insertion
/// order, which keeps searches deterministic.
#[derive(Debug, Default, Clone)]
pub struct Frontier {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, record: RecordId, priority: f64) {
        self.heap.push(QueueEntry {
            record,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Pops the cheapest entry that `is_stale` does not reject.
    pub fn pop_min<F>(&mut self, mut is_stale: F) -> Option<(RecordId, f64)>
    where
        F: FnMut(RecordId) -> bool,
    {
        while let Some(entry) = self.heap.pop() {
            if is_stale(entry.record) {
                continue;
            }
            return Some((entry.record, entry.priority));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_by_priority_then_insertion_order() {
        let mut frontier = Frontier::new();
        frontier.push(RecordId(0), 3.0);
        frontier.push(RecordId(1), 1.0);
        frontier.push(RecordId(2), 1.0);
        frontier.push(RecordId(3), -2.0);
        assert_eq!(frontier.len(), 4);

        let order: Vec<u32> = std::iter::from_fn(|| frontier.pop_min(|_| false))
            .map(|(id, _)| id.0)
            .collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
        assert!(frontier.is_empty());
    }

    #[test]
    fn skips_stale_entries() {
        let mut frontier = Frontier::new();
        frontier.push(RecordId(0), 1.0);
        frontier.push(RecordId(1), 2.0);
        let popped = frontier.pop_min(|id| id == RecordId(0));
        assert_eq!(popped, Some((RecordId(1), 2.0)));
        assert_eq!(frontier.pop_min(|_| false), None);
    }
}
