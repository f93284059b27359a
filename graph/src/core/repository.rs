use super::changeset::{Changeset, RawChangeset, Serial, NULL_ID, NULL_SERIAL};
use super::edge::Edge;
use super::error::GraphError;
use crate::diagnostic;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Changeset history of one source repository, indexed by serial, id and tag.
///
/// Built once from a parse pass and read-only afterwards. Parents are stored
/// as serials and looked up through the graph.
#[derive(Debug, Clone)]
pub struct ChangesetGraph {
    by_serial: BTreeMap<Serial, Changeset>,
    by_hash: HashMap<String, Serial>,
    by_tag: BTreeMap<String, Serial>,
    edges: Vec<Edge>,
    /// Quick lookup: parent serial -> child serials
    children: HashMap<Serial, Vec<Serial>>,
    null: Changeset,
}

impl ChangesetGraph {
    /// Load records, logging duplicate serials or ids and keeping the later one
    pub fn load(records: impl IntoIterator<Item = RawChangeset>) -> Result<Self, GraphError> {
        Self::load_with(records, diagnostic::warn)
    }

    /// Load records, handing duplicate serials or ids and records without a
    /// usable identity to `on_diagnostic`.
    ///
    /// When the policy continues, unusable records are skipped and later
    /// records overwrite earlier ones in the index. Unresolved or inconsistent
    /// parents always fail the load.
    pub fn load_with<F>(
        records: impl IntoIterator<Item = RawChangeset>,
        mut on_diagnostic: F,
    ) -> Result<Self, GraphError>
    where
        F: FnMut(GraphError) -> Result<(), GraphError>,
    {
        let mut by_serial = BTreeMap::new();
        let mut by_hash = HashMap::new();

        for (index, raw) in records.into_iter().enumerate() {
            let Some(cs) = Changeset::from_raw(raw) else {
                on_diagnostic(GraphError::MissingIdentity { record: index + 1 })?;
                continue;
            };
            if cs.serial < 0 {
                on_diagnostic(GraphError::NegativeSerial {
                    serial: cs.serial,
                    id: cs.id.clone(),
                })?;
                continue;
            }

            if let Some(previous) = by_serial.get(&cs.serial).map(|p: &Changeset| p.id.clone()) {
                on_diagnostic(GraphError::DuplicateSerial {
                    serial: cs.serial,
                    previous: previous.clone(),
                    id: cs.id.clone(),
                })?;
                if by_hash.get(&previous) == Some(&cs.serial) {
                    by_hash.remove(&previous);
                }
            }
            if let Some(&previous) = by_hash.get(&cs.id) {
                on_diagnostic(GraphError::DuplicateId {
                    id: cs.id.clone(),
                    previous,
                    serial: cs.serial,
                })?;
            }

            by_hash.insert(cs.id.clone(), cs.serial);
            by_serial.insert(cs.serial, cs);
        }

        let null = Changeset::null();
        let mut resolved = Vec::with_capacity(by_serial.len());
        for cs in by_serial.values() {
            let mut parents = SmallVec::<[Serial; 2]>::new();
            for parent in &cs.parent_refs {
                let target = if parent.is_null() {
                    &null
                } else {
                    by_serial
                        .get(&parent.serial)
                        .ok_or_else(|| GraphError::UnresolvedParent {
                            serial: cs.serial,
                            id: cs.id.clone(),
                            parent: parent.clone(),
                        })?
                };
                if !parent.matches(&target.id) {
                    return Err(GraphError::ParentMismatch {
                        serial: cs.serial,
                        id: cs.id.clone(),
                        parent: parent.clone(),
                        actual: target.id.clone(),
                    });
                }
                if target.serial >= cs.serial {
                    return Err(GraphError::ParentOrder {
                        serial: cs.serial,
                        id: cs.id.clone(),
                        parent: parent.clone(),
                    });
                }
                parents.push(target.serial);
            }
            resolved.push((cs.serial, parents));
        }
        for (serial, parents) in resolved {
            if let Some(cs) = by_serial.get_mut(&serial) {
                cs.parents = parents;
            }
        }

        let mut edges = Vec::new();
        let mut children: HashMap<Serial, Vec<Serial>> = HashMap::new();
        let mut by_tag = BTreeMap::new();
        for cs in by_serial.values() {
            for &parent in cs.parents.iter().filter(|&&p| p != NULL_SERIAL) {
                let edge = if cs.is_merge() {
                    Edge::merge(cs.serial, parent)
                } else {
                    Edge::new(cs.serial, parent)
                };
                edges.push(edge);
                children.entry(parent).or_default().push(cs.serial);
            }
            for tag in &cs.tags {
                by_tag.insert(tag.clone(), cs.serial);
            }
        }

        debug!(changesets = by_serial.len(), edges = edges.len(), "loaded changeset graph");

        Ok(Self {
            by_serial,
            by_hash,
            by_tag,
            edges,
            children,
            null,
        })
    }

    /// Look up a changeset by serial; `-1` yields the null revision
    pub fn get(&self, serial: Serial) -> Option<&Changeset> {
        if serial == NULL_SERIAL {
            Some(&self.null)
        } else {
            self.by_serial.get(&serial)
        }
    }

    /// Look up a changeset by its exact id
    pub fn by_id(&self, id: &str) -> Option<&Changeset> {
        if id == NULL_ID {
            return Some(&self.null);
        }
        self.by_hash.get(id).and_then(|&serial| self.get(serial))
    }

    /// Look up the changeset carrying a tag
    pub fn by_tag(&self, tag: &str) -> Option<&Changeset> {
        self.by_tag.get(tag).and_then(|&serial| self.get(serial))
    }

    /// All tags with the changeset they point at, sorted by tag name
    pub fn tags(&self) -> impl Iterator<Item = (&str, &Changeset)> + '_ {
        self.by_tag
            .iter()
            .filter_map(|(tag, &serial)| self.get(serial).map(|cs| (tag.as_str(), cs)))
    }

    /// The changeset with the greatest serial, if any
    pub fn head(&self) -> Option<&Changeset> {
        self.by_serial.values().next_back()
    }

    /// The null revision sentinel
    pub fn null(&self) -> &Changeset {
        &self.null
    }

    /// Resolved parents of a changeset
    pub fn parents<'a>(&'a self, cs: &'a Changeset) -> impl Iterator<Item = &'a Changeset> + 'a {
        cs.parents.iter().filter_map(move |&serial| self.get(serial))
    }

    /// Get children of a changeset
    pub fn children(&self, serial: Serial) -> Vec<&Changeset> {
        self.children
            .get(&serial)
            .map(|serials| serials.iter().filter_map(|&s| self.get(s)).collect())
            .unwrap_or_default()
    }

    /// Ascending-serial traversal from 0, ending at the first missing serial
    pub fn iter(&self) -> SerialOrder<'_> {
        SerialOrder {
            graph: self,
            next: 0,
        }
    }

    /// Get all root changesets (no real parents)
    pub fn roots(&self) -> Vec<&Changeset> {
        self.by_serial.values().filter(|cs| cs.is_root()).collect()
    }

    /// Get all leaf changesets (no children)
    pub fn leaves(&self) -> Vec<&Changeset> {
        self.by_serial
            .values()
            .filter(|cs| !self.children.contains_key(&cs.serial))
            .collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Count of changesets, not counting the null revision
    pub fn len(&self) -> usize {
        self.by_serial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_serial.is_empty()
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let roots = self.roots().len();
        GraphStats {
            total_changesets: self.by_serial.len(),
            total_edges: self.edges.len(),
            merge_changesets: self.by_serial.values().filter(|cs| cs.is_merge()).count(),
            root_changesets: roots,
            leaf_changesets: self.leaves().len(),
            tags: self.by_tag.len(),
            head: self.head().map(|cs| cs.serial),
            contiguous: self.iter().count(),
            has_unrelated_roots: roots > 1,
        }
    }
}

/// Iterator returned by [`ChangesetGraph::iter`]
pub struct SerialOrder<'a> {
    graph: &'a ChangesetGraph,
    next: Serial,
}

impl<'a> Iterator for SerialOrder<'a> {
    type Item = &'a Changeset;

    fn next(&mut self) -> Option<Self::Item> {
        let cs = self.graph.by_serial.get(&self.next)?;
        self.next += 1;
        Some(cs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub total_changesets: usize,
    pub total_edges: usize,
    pub merge_changesets: usize,
    pub root_changesets: usize,
    pub leaf_changesets: usize,
    pub tags: usize,
    pub head: Option<Serial>,
    /// Changesets reachable by serial-order traversal before the first gap
    pub contiguous: usize,
    pub has_unrelated_roots: bool,
}
