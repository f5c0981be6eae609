//! Per-graph handle
//!
//! A [`Graph`] owns the metadata cache for one graph name and sends every
//! command through the connection strategy it was selected from. Two handles
//! for the same name keep independent caches.

use crate::client::GraphClient;
use crate::error::GraphResult;
use crate::protocol::command::{self, ConstraintType, EntityType};
use crate::query::admin::{
    create_index_query, drop_index_query, parse_pairs, parse_slow_log, parse_string_list,
    vector_index_options, IndexEntity, IndexOptions, IndexType, ReplyMap, SlowLogEntry,
};
use crate::query::metadata::{MetadataCache, MetadataCategory, MetadataSource};
use crate::query::params::QueryOptions;
use crate::query::reply::{assemble, first_column, QueryReply};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Fetches schema names with read-only procedure calls on the graph itself
struct ClientMetadataSource {
    graph: String,
    client: Arc<dyn GraphClient>,
}

#[async_trait]
impl MetadataSource for ClientMetadataSource {
    async fn fetch(&self, category: MetadataCategory) -> GraphResult<Vec<String>> {
        debug!("Fetching {} of graph {}", category, self.graph);
        let reply = self
            .client
            .ro_query(&self.graph, category.procedure(), &QueryOptions::default(), false)
            .await?;
        first_column(&reply)
    }
}

/// Handle to one named graph
#[derive(Clone)]
pub struct Graph {
    name: String,
    client: Arc<dyn GraphClient>,
    metadata: MetadataCache,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("topology", &self.client.topology())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Graph {
    pub fn new(name: impl Into<String>, client: Arc<dyn GraphClient>) -> Self {
        let name = name.into();
        let source = ClientMetadataSource {
            graph: name.clone(),
            client: client.clone(),
        };
        Self {
            name,
            client,
            metadata: MetadataCache::new(Arc::new(source)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    pub async fn query(&self, query: &str) -> GraphResult<QueryReply> {
        self.query_with(query, &QueryOptions::default()).await
    }

    pub async fn query_with(&self, query: &str, options: &QueryOptions) -> GraphResult<QueryReply> {
        let reply = self.client.query(&self.name, query, options, true).await?;
        assemble(&reply, &self.metadata).await
    }

    /// Read-only query; replicas may serve it
    pub async fn ro_query(&self, query: &str) -> GraphResult<QueryReply> {
        self.ro_query_with(query, &QueryOptions::default()).await
    }

    pub async fn ro_query_with(&self, query: &str, options: &QueryOptions) -> GraphResult<QueryReply> {
        let reply = self.client.ro_query(&self.name, query, options, true).await?;
        assemble(&reply, &self.metadata).await
    }

    /// Delete the graph and everything in it
    pub async fn delete(&self) -> GraphResult<()> {
        self.client.execute(&command::delete(&self.name)).await?;
        Ok(())
    }

    /// Execution plan, one operation per line
    pub async fn explain(&self, query: &str) -> GraphResult<Vec<String>> {
        parse_string_list(&self.client.execute(&command::explain(&self.name, query)).await?)
    }

    /// Run the query and return the plan annotated with per-operation timings
    pub async fn profile(&self, query: &str) -> GraphResult<Vec<String>> {
        parse_string_list(&self.client.execute(&command::profile(&self.name, query)).await?)
    }

    pub async fn memory_usage(&self, samples: Option<u32>) -> GraphResult<ReplyMap> {
        parse_pairs(&self.client.execute(&command::memory_usage(&self.name, samples)).await?)
    }

    pub async fn slow_log(&self) -> GraphResult<Vec<SlowLogEntry>> {
        parse_slow_log(&self.client.execute(&command::slow_log(&self.name)).await?)
    }

    pub async fn constraint_create(
        &self,
        constraint_type: ConstraintType,
        entity_type: EntityType,
        label: &str,
        properties: &[&str],
    ) -> GraphResult<()> {
        let cmd = command::constraint_create(&self.name, constraint_type, entity_type, label, properties);
        self.client.execute(&cmd).await?;
        Ok(())
    }

    pub async fn constraint_drop(
        &self,
        constraint_type: ConstraintType,
        entity_type: EntityType,
        label: &str,
        properties: &[&str],
    ) -> GraphResult<()> {
        let cmd = command::constraint_drop(&self.name, constraint_type, entity_type, label, properties);
        self.client.execute(&cmd).await?;
        Ok(())
    }

    /// Copy this graph to `dest_graph` and return a handle to the copy
    pub async fn copy(&self, dest_graph: &str) -> GraphResult<Graph> {
        self.client.execute(&command::copy(&self.name, dest_graph)).await?;
        Ok(Graph::new(dest_graph, self.client.clone()))
    }

    pub async fn create_typed_index(
        &self,
        index_type: IndexType,
        entity: IndexEntity,
        label: &str,
        properties: &[&str],
        options: Option<&IndexOptions>,
    ) -> GraphResult<QueryReply> {
        self.query(&create_index_query(index_type, entity, label, properties, options))
            .await
    }

    pub async fn create_node_range_index(&self, label: &str, properties: &[&str]) -> GraphResult<QueryReply> {
        self.create_typed_index(IndexType::Range, IndexEntity::Node, label, properties, None)
            .await
    }

    pub async fn create_node_fulltext_index(&self, label: &str, properties: &[&str]) -> GraphResult<QueryReply> {
        self.create_typed_index(IndexType::Fulltext, IndexEntity::Node, label, properties, None)
            .await
    }

    /// `similarity_function` is `euclidean` or `cosine`
    pub async fn create_node_vector_index(
        &self,
        label: &str,
        properties: &[&str],
        dimension: u32,
        similarity_function: &str,
    ) -> GraphResult<QueryReply> {
        let options = vector_index_options(dimension, similarity_function);
        self.create_typed_index(IndexType::Vector, IndexEntity::Node, label, properties, Some(&options))
            .await
    }

    pub async fn create_edge_range_index(&self, label: &str, properties: &[&str]) -> GraphResult<QueryReply> {
        self.create_typed_index(IndexType::Range, IndexEntity::Edge, label, properties, None)
            .await
    }

    pub async fn create_edge_fulltext_index(&self, label: &str, properties: &[&str]) -> GraphResult<QueryReply> {
        self.create_typed_index(IndexType::Fulltext, IndexEntity::Edge, label, properties, None)
            .await
    }

    pub async fn create_edge_vector_index(
        &self,
        label: &str,
        properties: &[&str],
        dimension: u32,
        similarity_function: &str,
    ) -> GraphResult<QueryReply> {
        let options = vector_index_options(dimension, similarity_function);
        self.create_typed_index(IndexType::Vector, IndexEntity::Edge, label, properties, Some(&options))
            .await
    }

    pub async fn drop_typed_index(
        &self,
        index_type: IndexType,
        entity: IndexEntity,
        label: &str,
        attribute: &str,
    ) -> GraphResult<QueryReply> {
        self.query(&drop_index_query(index_type, entity, label, attribute)).await
    }

    pub async fn drop_node_range_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Range, IndexEntity::Node, label, attribute).await
    }

    pub async fn drop_node_fulltext_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Fulltext, IndexEntity::Node, label, attribute).await
    }

    pub async fn drop_node_vector_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Vector, IndexEntity::Node, label, attribute).await
    }

    pub async fn drop_edge_range_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Range, IndexEntity::Edge, label, attribute).await
    }

    pub async fn drop_edge_fulltext_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Fulltext, IndexEntity::Edge, label, attribute).await
    }

    pub async fn drop_edge_vector_index(&self, label: &str, attribute: &str) -> GraphResult<QueryReply> {
        self.drop_typed_index(IndexType::Vector, IndexEntity::Edge, label, attribute).await
    }
}
