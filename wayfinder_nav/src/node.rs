// Per-search node storage.
//
// Nodes live in an arena (`Vec<SearchNode>`) addressed by `NodeId`, with an
// `FxHashMap<Position, NodeId>` to find the node for a position. Parents are
// `NodeId`s rather than references, so a node's predecessor chain is plain
// data. The store only grows; it is created by a `SearchSession` and dropped
// with it.
//
// See also: `open_set.rs`, which orders nodes by `combined_cost` and writes
// `heap_index` back into them, `search.rs` for the session that owns both.

use crate::config::HeuristicConfig;
use crate::goal::Goal;
use crate::movement::Transition;
use crate::types::Position;
use rustc_hash::FxHashMap;

/// Index of a node within its `NodeStore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `heap_index` of a node that is not in the open set. The heap is 1-based,
/// so zero is never a real slot.
pub const NO_HEAP_INDEX: usize = 0;

#[derive(Clone, Debug)]
pub struct SearchNode {
    pub position: Position,
    /// Best known cost from the start. `+inf` until first reached.
    pub cost: f64,
    /// Goal heuristic, computed once at creation.
    pub heuristic: f64,
    /// `cost + heuristic`; the open-set key.
    pub combined_cost: f64,
    pub parent: Option<NodeId>,
    /// The move from `parent` to this node, and what it cost.
    pub parent_transition: Option<Transition>,
    pub transition_cost: f64,
    pub heap_index: usize,
}

impl SearchNode {
    fn new(position: Position, heuristic: f64) -> Self {
        Self {
            position,
            cost: f64::INFINITY,
            heuristic,
            combined_cost: f64::INFINITY,
            parent: None,
            parent_transition: None,
            transition_cost: 0.0,
            heap_index: NO_HEAP_INDEX,
        }
    }

    /// Whether the node currently sits in the open set.
    pub fn is_open(&self) -> bool {
        self.heap_index != NO_HEAP_INDEX
    }
}

/// Arena of search nodes plus a position index.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: Vec<SearchNode>,
    by_position: FxHashMap<Position, NodeId>,
}

impl NodeStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            by_position: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// The node for `position`, creating it (with its heuristic) if new.
    pub fn get_or_create(
        &mut self,
        position: Position,
        goal: &Goal,
        weights: &HeuristicConfig,
    ) -> NodeId {
        if let Some(&id) = self.by_position.get(&position) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        let heuristic = goal.heuristic_with(position, weights);
        self.nodes.push(SearchNode::new(position, heuristic));
        self.by_position.insert(position, id);
        id
    }

    pub fn get(&self, position: Position) -> Option<NodeId> {
        self.by_position.get(&position).copied()
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.index()]
    }

    /// All nodes, for the open set to read and update in place.
    pub fn nodes_mut(&mut self) -> &mut [SearchNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
