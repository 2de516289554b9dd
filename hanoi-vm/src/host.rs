//! Host callbacks for delegated opcodes
//!
//! Opcodes whose semantics reach outside the core (intent dispatch,
//! semantic lookup) call a narrow synchronous hook with a typed payload.
//! The core assumes nothing about the implementation; a hook failure
//! surfaces as a runtime fault and never corrupts the stack.

use hanoi_ternary::T81Big;

use core::fmt;

use crate::{
    operand::Operand,
    symbolic::T729Intent,
};

/// Failure modes of a host hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// No implementation is attached for this hook.
    Unavailable,
    /// The hook ran and failed.
    Failed(&'static str),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "host unavailable"),
            Self::Failed(reason) => write!(f, "host failed: {reason}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Outcome of offering an intent to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    /// The host consumed the intent, optionally producing a value.
    Handled(Option<Operand>),
    /// The host passes; the core executes the carried opcode itself.
    Defer,
}

/// Synchronous host interface. All methods have non-failing defaults so a
/// host implements only what it serves.
pub trait HostHooks: Send + Sync {
    /// Semantic lookup over the host's mindmap.
    fn mindmap_query(&self, query: &Operand) -> Result<Operand, HostError> {
        let _ = query;
        Err(HostError::Unavailable)
    }

    /// First offer of a `T729_INTENT` dispatch.
    fn intent(&self, intent: &T729Intent) -> Result<IntentOutcome, HostError> {
        let _ = intent;
        Ok(IntentOutcome::Defer)
    }
}

/// Host with no services attached; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl HostHooks for NoopHost {}

/// Reference mindmap: an arena-owned semantic graph.
///
/// Nodes live in a flat arena and reference each other by index, so cyclic
/// structures carry no ownership cycles. A query vector walks the graph:
/// its first element selects the entry node by key, each further element
/// follows the edge whose target carries that key.
#[derive(Debug, Default)]
pub struct MindMap {
    nodes: Vec<MindNode>,
}

/// Index of a node in the mindmap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdx(pub usize);

#[derive(Debug)]
struct MindNode {
    key: T81Big,
    value: Operand,
    edges: Vec<NodeIdx>,
}

impl MindMap {
    /// Empty mindmap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index.
    pub fn insert(&mut self, key: T81Big, value: Operand) -> NodeIdx {
        let index = NodeIdx(self.nodes.len());
        self.nodes.push(MindNode {
            key,
            value,
            edges: Vec::new(),
        });
        index
    }

    /// Add a directed edge; out-of-range indices are ignored.
    pub fn link(&mut self, from: NodeIdx, to: NodeIdx) {
        if to.0 < self.nodes.len() {
            if let Some(node) = self.nodes.get_mut(from.0) {
                if !node.edges.contains(&to) {
                    node.edges.push(to);
                }
            }
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn find_root(&self, key: &T81Big) -> Option<NodeIdx> {
        self.nodes
            .iter()
            .position(|node| &node.key == key)
            .map(NodeIdx)
    }

    fn follow(&self, from: NodeIdx, key: &T81Big) -> Option<NodeIdx> {
        self.nodes.get(from.0)?.edges.iter().copied().find(|&edge| {
            self.nodes
                .get(edge.0)
                .map(|node| &node.key == key)
                .unwrap_or(false)
        })
    }
}

impl HostHooks for MindMap {
    fn mindmap_query(&self, query: &Operand) -> Result<Operand, HostError> {
        let Operand::Vector(path) = query else {
            return Err(HostError::Failed("query is not a vector"))
        };
        let mut keys = path.elements().iter().map(|element| match element {
            Operand::BigInt(key) => Ok(key),
            _ => Err(HostError::Failed("query element is not a BIGINT")),
        });
        let root_key = keys.next().ok_or(HostError::Failed("empty query"))??;
        let mut cursor = self
            .find_root(root_key)
            .ok_or(HostError::Failed("no node matches the root key"))?;
        for key in keys {
            cursor = self
                .follow(cursor, key?)
                .ok_or(HostError::Failed("path breaks off"))?;
        }
        self.nodes
            .get(cursor.0)
            .map(|node| node.value.clone())
            .ok_or(HostError::Failed("dangling node index"))
    }
}
