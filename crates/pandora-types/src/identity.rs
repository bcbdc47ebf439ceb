use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Handle of a node inside a collection tree arena.
///
/// Ids are allocated monotonically by the owning tree and never reused, so a
/// stale handle to a released node can be detected instead of silently
/// aliasing a newer node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a handle from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value of this handle.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The handle allocated after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("node#").unwrap_or(s);
        raw.parse::<u64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidNodeId(format!("{s}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let id = NodeId::from_raw(42);
        assert_eq!(id.to_string(), "node#42");
        assert_eq!("node#42".parse::<NodeId>().unwrap(), id);
        assert_eq!("42".parse::<NodeId>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "node#x".parse::<NodeId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidNodeId(_)));
    }

    #[test]
    fn next_is_monotonic() {
        let id = NodeId::from_raw(7);
        assert!(id.next() > id);
        assert_eq!(id.next().as_u64(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let id = NodeId::from_raw(3);
        let json = serde_json::to_string(&id).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
