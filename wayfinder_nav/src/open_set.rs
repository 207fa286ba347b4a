// Open set for A*: a binary min-heap over `NodeId`s keyed on
// `combined_cost`, with decrease-key.
//
// The heap is 1-based (slot 0 is unused) so parent/child arithmetic is
// `i / 2` and `2i, 2i + 1`. Each node records its own slot in
// `SearchNode::heap_index`, which is what makes `update` O(log n): no search
// for the node is needed. The set does not own the nodes; every operation
// borrows the store's node slice.
//
// See also: `node.rs` for `SearchNode` and `NO_HEAP_INDEX`, `search.rs` for
// the loop that drives this.

use crate::node::{NO_HEAP_INDEX, NodeId, SearchNode};

#[derive(Debug)]
pub struct OpenSet {
    heap: Vec<NodeId>,
}

impl Default for OpenSet {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl OpenSet {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut heap = Vec::with_capacity(capacity + 1);
        // Slot 0 is a placeholder; it is never read as a node.
        heap.push(NodeId(u32::MAX));
        Self { heap }
    }

    pub fn len(&self) -> usize {
        self.heap.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a node that is not currently in the set.
    pub fn insert(&mut self, nodes: &mut [SearchNode], id: NodeId) {
        debug_assert!(!nodes[id.index()].is_open(), "node inserted twice");
        self.heap.push(id);
        let slot = self.heap.len() - 1;
        nodes[id.index()].heap_index = slot;
        self.sift_up(nodes, slot);
    }

    /// Restore order after a node's `combined_cost` decreased.
    pub fn update(&mut self, nodes: &mut [SearchNode], id: NodeId) {
        let slot = nodes[id.index()].heap_index;
        debug_assert!(slot != NO_HEAP_INDEX, "update on a node not in the set");
        self.sift_up(nodes, slot);
    }

    /// Pop the node with the lowest `combined_cost`.
    pub fn remove_lowest(&mut self, nodes: &mut [SearchNode]) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }
        let lowest = self.heap.swap_remove(1);
        nodes[lowest.index()].heap_index = NO_HEAP_INDEX;
        if !self.is_empty() {
            let moved = self.heap[1];
            nodes[moved.index()].heap_index = 1;
            self.sift_down(nodes, 1);
        }
        Some(lowest)
    }

    fn key(&self, nodes: &[SearchNode], slot: usize) -> f64 {
        nodes[self.heap[slot].index()].combined_cost
    }

    fn swap(&mut self, nodes: &mut [SearchNode], a: usize, b: usize) {
        self.heap.swap(a, b);
        nodes[self.heap[a].index()].heap_index = a;
        nodes[self.heap[b].index()].heap_index = b;
    }

    fn sift_up(&mut self, nodes: &mut [SearchNode], mut slot: usize) {
        while slot > 1 {
            let parent = slot / 2;
            if self.key(nodes, parent) <= self.key(nodes, slot) {
                break;
            }
            self.swap(nodes, slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, nodes: &mut [SearchNode], mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = slot * 2;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.key(nodes, right) < self.key(nodes, left) {
                right
            } else {
                left
            };
            if self.key(nodes, slot) <= self.key(nodes, child) {
                break;
            }
            self.swap(nodes, slot, child);
            slot = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicConfig;
    use crate::goal::Goal;
    use crate::node::NodeStore;
    use crate::types::Position;
    use wayfinder_prng::GameRng;

    fn store_with(costs: &[f64]) -> (NodeStore, Vec<NodeId>) {
        let goal = Goal::YLevel(0);
        let weights = HeuristicConfig::default();
        let mut store = NodeStore::default();
        let ids = costs
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let id = store.get_or_create(Position::new(i as i32, 0, 0), &goal, &weights);
                store.node_mut(id).combined_cost = c;
                id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn pops_in_order() {
        let (mut store, ids) = store_with(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let mut open = OpenSet::default();
        for &id in &ids {
            open.insert(store.nodes_mut(), id);
        }
        assert_eq!(open.len(), 5);
        let mut popped = Vec::new();
        while let Some(id) = open.remove_lowest(store.nodes_mut()) {
            assert!(!store.node(id).is_open());
            popped.push(store.node(id).combined_cost);
        }
        assert_eq!(popped, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(open.is_empty());
    }

    #[test]
    fn update_moves_node_forward() {
        let (mut store, ids) = store_with(&[5.0, 6.0, 7.0]);
        let mut open = OpenSet::default();
        for &id in &ids {
            open.insert(store.nodes_mut(), id);
        }
        store.node_mut(ids[2]).combined_cost = 1.0;
        open.update(store.nodes_mut(), ids[2]);
        assert_eq!(open.remove_lowest(store.nodes_mut()), Some(ids[2]));
        assert_eq!(open.remove_lowest(store.nodes_mut()), Some(ids[0]));
    }

    #[test]
    fn remove_from_empty_is_none() {
        let mut store = NodeStore::default();
        let mut open = OpenSet::with_capacity(0);
        assert_eq!(open.remove_lowest(store.nodes_mut()), None);
    }

    #[test]
    fn randomized_operations_keep_heap_order() {
        let count = 300;
        let (mut store, ids) = store_with(&vec![0.0; count]);
        let mut rng = GameRng::new(42);
        for &id in &ids {
            store.node_mut(id).combined_cost = rng.next_f64() * 1000.0;
        }
        let mut open = OpenSet::with_capacity(4);
        let mut last_popped = f64::NEG_INFINITY;
        let mut inserted = 0;
        for step in 0..2000 {
            match rng.range_u64(0, 3) {
                0 if inserted < count => {
                    let id = ids[inserted];
                    // Keep pops monotone: nothing enters below the last pop.
                    let c = store.node(id).combined_cost.max(last_popped);
                    store.node_mut(id).combined_cost = c;
                    open.insert(store.nodes_mut(), id);
                    inserted += 1;
                }
                1 => {
                    let open_ids: Vec<NodeId> = ids[..inserted]
                        .iter()
                        .copied()
                        .filter(|&id| store.node(id).is_open())
                        .collect();
                    if let Some(&id) = open_ids.get(rng.range_usize(0, open_ids.len().max(1))) {
                        let node = store.node_mut(id);
                        node.combined_cost = (node.combined_cost - 10.0).max(last_popped);
                        open.update(store.nodes_mut(), id);
                    }
                }
                _ => {
                    if let Some(id) = open.remove_lowest(store.nodes_mut()) {
                        let c = store.node(id).combined_cost;
                        assert!(c >= last_popped, "step {step}: {c} < {last_popped}");
                        // Nothing still open may be cheaper than what came out.
                        let cheapest_left = ids[..inserted]
                            .iter()
                            .filter(|&&other| store.node(other).is_open())
                            .map(|&other| store.node(other).combined_cost)
                            .fold(f64::INFINITY, f64::min);
                        assert!(c <= cheapest_left, "step {step}: {c} > {cheapest_left}");
                        last_popped = c;
                    }
                }
            }
            // Every open node knows its slot.
            for &id in &ids[..inserted] {
                let node = store.node(id);
                if node.is_open() {
                    assert_eq!(open.heap[node.heap_index], id);
                }
            }
        }
    }
}
