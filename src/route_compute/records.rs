//! Arena of tentative search entries.
//!
//! Records form a backward tree: each one points at the record it was
//! relaxed from. The arena is append-only during a search, so a parent id
//! stays valid even after its record has been superseded.

use std::collections::BTreeMap;

use crate::model::{EdgeId, NodeId};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub(crate) u32);

/// What a record is deduplicated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotKey {
    Origin,
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Open,
    Finalized,
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub key: SlotKey,
    /// Node reached by this record in the search direction.
    pub node: NodeId,
    pub edge: Option<EdgeId>,
    pub parent: Option<RecordId>,
    /// Edges traversed since the search origin.
    pub depth: usize,
    pub cost: f64,
    pub constraints: Vec<f64>,
    pub parameters: Vec<f64>,
    pub priority: f64,
    pub state: RecordState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Inserted {
        id: RecordId,
        superseded: Option<RecordId>,
    },
    Rejected,
}

#[derive(Debug, Clone, Default)]
pub struct SearchRecords {
    records: Vec<SearchRecord>,
    slots: BTreeMap<SlotKey, Vec<RecordId>>,
    finalized: BTreeMap<NodeId, Vec<RecordId>>,
    capacity: usize,
}

impl SearchRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every record and sets the number of slots per key.
    pub fn reset(&mut self, capacity: usize) {
        self.records.clear();
        self.slots.clear();
        self.finalized.clear();
        self.capacity = capacity.max(1);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> &SearchRecord {
        &self.records[id.0 as usize]
    }

    pub fn is_open(&self, id: RecordId) -> bool {
        self.get(id).state == RecordState::Open
    }

    pub fn finalize(&mut self, id: RecordId) {
        let record = &mut self.records[id.0 as usize];
        record.state = RecordState::Finalized;
        self.finalized.entry(record.node).or_default().push(id);
    }

    pub fn slot(&self, key: SlotKey) -> &[RecordId] {
        self.slots.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inserts `record` if its key has a free slot or it beats the worst
    /// occupant, which is then superseded. Slots stay sorted by cost; ties
    /// keep the earlier record first.
    pub fn offer(&mut self, record: SearchRecord) -> Offer {
        let capacity = self.capacity.max(1);
        let slot = self.slots.entry(record.key).or_default();

        let mut superseded = None;
        if slot.len() >= capacity {
            let worst = slot[slot.len() - 1];
            if record.cost + EPS >= self.records[worst.0 as usize].cost {
                return Offer::Rejected;
            }
            slot.pop();
            self.records[worst.0 as usize].state = RecordState::Superseded;
            superseded = Some(worst);
        }

        let id = RecordId(self.records.len() as u32);
        let records = &self.records;
        let at = slot.partition_point(|existing| records[existing.0 as usize].cost <= record.cost + EPS);
        slot.insert(at, id);
        self.records.push(SearchRecord {
            state: RecordState::Open,
            ..record
        });
        Offer::Inserted { id, superseded }
    }

    /// Edges from the root to `id`, in the order they were traversed.
    pub fn trail(&self, id: RecordId) -> Vec<EdgeId> {
        let mut edges = Vec::new();
        let mut current = Some(id);
        while let Some(at) = current {
            let record = self.get(at);
            if let Some(edge) = record.edge {
                edges.push(edge);
            }
            current = record.parent;
        }
        edges.reverse();
        edges
    }

    /// Finalized, non-superseded records that reached `node`, cheapest first.
    pub fn finalized_at(&self, node: NodeId) -> Vec<RecordId> {
        let mut out: Vec<RecordId> = self
            .finalized
            .get(&node)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.get(*id).state == RecordState::Finalized)
            .collect();
        out.sort_by(|a, b| {
            self.get(*a)
                .cost
                .total_cmp(&self.get(*b).cost)
                .then_with(|| a.cmp(b))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: SlotKey, node: u32, parent: Option<RecordId>, edge: Option<u32>, cost: f64) -> SearchRecord {
        SearchRecord {
            key,
            node: NodeId(node),
            edge: edge.map(EdgeId),
            parent,
            depth: 0,
            cost,
            constraints: Vec::new(),
            parameters: Vec::new(),
            priority: cost,
            state: RecordState::Open,
        }
    }

    #[test]
    fn single_slot_keeps_the_cheapest_record() {
        let mut records = SearchRecords::new();
        records.reset(1);
        let key = SlotKey::Node(NodeId(1));

        let first = records.offer(record(key, 1, None, Some(0), 5.0));
        let Offer::Inserted { id: first_id, .. } = first else {
            panic!("first record must be inserted");
        };
        assert_eq!(records.offer(record(key, 1, None, Some(1), 5.0)), Offer::Rejected);

        let better = records.offer(record(key, 1, None, Some(2), 3.0));
        assert!(matches!(
            better,
            Offer::Inserted { superseded: Some(id), .. } if id == first_id
        ));
        assert_eq!(records.get(first_id).state, RecordState::Superseded);
        assert_eq!(records.slot(key).len(), 1);
    }

    #[test]
    fn multiple_slots_stay_sorted() {
        let mut records = SearchRecords::new();
        records.reset(2);
        let key = SlotKey::Edge(EdgeId(4));
        records.offer(record(key, 2, None, Some(4), 7.0));
        records.offer(record(key, 2, None, Some(4), 2.0));
        records.offer(record(key, 2, None, Some(4), 4.0));

        let costs: Vec<f64> = records
            .slot(key)
            .iter()
            .map(|id| records.get(*id).cost)
            .collect();
        assert_eq!(costs, vec![2.0, 4.0]);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn trail_walks_back_to_the_root() {
        let mut records = SearchRecords::new();
        records.reset(1);
        let Offer::Inserted { id: root, .. } =
            records.offer(record(SlotKey::Origin, 0, None, None, 0.0))
        else {
            panic!("root must be inserted");
        };
        let Offer::Inserted { id: mid, .. } =
            records.offer(record(SlotKey::Node(NodeId(1)), 1, Some(root), Some(10), 1.0))
        else {
            panic!("mid must be inserted");
        };
        let Offer::Inserted { id: leaf, .. } =
            records.offer(record(SlotKey::Node(NodeId(2)), 2, Some(mid), Some(11), 2.0))
        else {
            panic!("leaf must be inserted");
        };

        assert_eq!(records.trail(leaf), vec![EdgeId(10), EdgeId(11)]);
        assert!(records.finalized_at(NodeId(2)).is_empty());
        records.finalize(leaf);
        assert_eq!(records.finalized_at(NodeId(2)), vec![leaf]);
    }

    #[test]
    fn superseded_records_leave_the_finalized_index() {
        let mut records = SearchRecords::new();
        records.reset(1);
        let key = SlotKey::Node(NodeId(3));
        let Offer::Inserted { id: first, .. } = records.offer(record(key, 3, None, Some(0), 4.0))
        else {
            panic!("first record must be inserted");
        };
        records.finalize(first);
        assert_eq!(records.finalized_at(NodeId(3)), vec![first]);

        let Offer::Inserted { id: better, .. } = records.offer(record(key, 3, None, Some(1), 1.0))
        else {
            panic!("cheaper record must be inserted");
        };
        assert!(records.finalized_at(NodeId(3)).is_empty());
        records.finalize(better);
        assert_eq!(records.finalized_at(NodeId(3)), vec![better]);
        assert!(records.finalized_at(NodeId(4)).is_empty());

        records.reset(1);
        assert!(records.finalized_at(NodeId(3)).is_empty());
    }
}
