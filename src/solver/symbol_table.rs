use super::node::{Edge, NodeId};
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Bidirectional name <-> node map for named inputs. Entries hold an
/// external reference on their node (taken by the solver facade when it
/// registers the symbol), so a registered node stays live until the table is
/// cleared or the solver is dropped.
pub struct SymbolTable {
    by_name: HashMap<String, Edge>,
    by_node: HashMap<NodeId, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_node: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: String, edge: Edge) -> Result<()> {
        if self.by_name.contains_key(&name) {
            bail!("symbol {} is already defined", name);
        }
        self.by_name.insert(name.clone(), edge);
        self.by_node.insert(edge.id, name);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<Edge> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.by_node.get(&id).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Drains all entries; the caller is responsible for releasing the
    /// references the entries held.
    pub fn drain(&mut self) -> Vec<Edge> {
        self.by_node.clear();
        self.by_name.drain().map(|(_, e)| e).collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
