use super::changeset::Serial;

/// An edge connecting a changeset to one of its parents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Child serial
    pub from: Serial,
    /// Parent serial
    pub to: Serial,
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    /// Regular parent-child relationship
    Regular,
    /// Edge from a merge changeset to one of its two parents
    Merge,
}

impl Edge {
    pub fn new(from: Serial, to: Serial) -> Self {
        Self {
            from,
            to,
            edge_type: EdgeType::Regular,
        }
    }

    pub fn merge(from: Serial, to: Serial) -> Self {
        Self {
            from,
            to,
            edge_type: EdgeType::Merge,
        }
    }
}
