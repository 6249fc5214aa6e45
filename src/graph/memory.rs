//! In-memory [`GraphStore`] fake recording nodes and edges for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RelationshipSpec;

use super::GraphStore;

#[derive(Debug, Clone)]
pub struct RecordedNode {
    pub title: String,
    pub level: i32,
}

#[derive(Debug, Clone)]
pub struct RecordedEdge {
    pub code: String,
    pub rel: RelationshipSpec,
}

#[derive(Default)]
pub struct MemoryGraph {
    nodes: RwLock<HashMap<String, RecordedNode>>,
    edges: RwLock<Vec<RecordedEdge>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, code: &str) -> Option<RecordedNode> {
        self.nodes.read().unwrap().get(code).cloned()
    }

    pub fn edges_from(&self, code: &str) -> Vec<RecordedEdge> {
        self.edges
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn upsert_code_node(&self, code: &str, title: &str, level: i32) -> Result<()> {
        self.nodes.write().unwrap().insert(
            code.to_string(),
            RecordedNode {
                title: title.to_string(),
                level,
            },
        );
        Ok(())
    }

    async fn upsert_relationship(&self, code: &str, rel: &RelationshipSpec) -> Result<()> {
        let mut edges = self.edges.write().unwrap();
        // MERGE semantics: replace an existing edge with the same identity.
        edges.retain(|e| {
            !(e.code == code
                && e.rel.rel_type == rel.rel_type
                && e.rel.target_id == rel.target_id
                && e.rel.target_type == rel.target_type)
        });
        edges.push(RecordedEdge {
            code: code.to_string(),
            rel: rel.clone(),
        });
        Ok(())
    }
}
