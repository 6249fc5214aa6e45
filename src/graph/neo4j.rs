//! Neo4j [`GraphStore`] implementation over the Bolt protocol.
//!
//! Node and relationship labels are interpolated after sanitizing (Cypher
//! cannot parameterize labels); everything else is a bound parameter.
//! Arbitrary edge properties are carried as a JSON string property to keep
//! the projection schema-free.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{query, Graph};

use crate::config::Neo4jConfig;
use crate::models::RelationshipSpec;

use super::{sanitize_label, GraphStore};

pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .with_context(|| format!("Failed to connect to neo4j at {}", config.uri))?;
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn upsert_code_node(&self, code: &str, title: &str, level: i32) -> Result<()> {
        self.graph
            .run(
                query(
                    "MERGE (c:UnspscCode {code: $code}) \
                     SET c.title = $title, c.level = $level, c.updated_at = $ts",
                )
                .param("code", code)
                .param("title", title)
                .param("level", level as i64)
                .param("ts", chrono::Utc::now().timestamp()),
            )
            .await?;
        Ok(())
    }

    async fn upsert_relationship(&self, code: &str, rel: &RelationshipSpec) -> Result<()> {
        let rel_type = sanitize_label(&rel.rel_type, "RELATED_TO");
        let target_label = sanitize_label(&rel.target_type, "ENTITY");
        let props_json = serde_json::to_string(&rel.properties)?;

        let cypher = format!(
            "MERGE (c:UnspscCode {{code: $code}}) \
             MERGE (t:{target_label} {{id: $target_id}}) \
             MERGE (c)-[r:{rel_type}]->(t) \
             SET r.properties = $props, r.updated_at = $ts"
        );
        self.graph
            .run(
                query(&cypher)
                    .param("code", code)
                    .param("target_id", rel.target_id.as_str())
                    .param("props", props_json)
                    .param("ts", chrono::Utc::now().timestamp()),
            )
            .await?;
        Ok(())
    }
}
