use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a document node.
///
/// Ids are minted whenever a node is created or deserialized and are never
/// persisted. Selections are re-anchored through them after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Mint the next sequential id
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let id1 = NodeId::next();
        let id2 = NodeId::next();
        let id3 = NodeId::next();

        assert!(id1 < id2);
        assert!(id2 < id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_display() {
        let id = NodeId::next();
        assert_eq!(id.to_string(), format!("n{}", id.as_u64()));
    }
}
