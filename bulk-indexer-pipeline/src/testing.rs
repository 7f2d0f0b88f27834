//! In-memory search engine used by the pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bulk_indexer_repository::{
    AliasAction, BulkOperation, BulkResponse, SearchEngineClient, SearchError,
};
use bulk_indexer_shared::{Document, DocumentRejection, IndexSchema};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub struct MockIndex {
    pub documents: BTreeMap<String, Value>,
    pub schema: Option<IndexSchema>,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, MockIndex>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    /// Bindings of every alias after each applied update request.
    alias_history: Vec<BTreeMap<String, BTreeSet<String>>>,
}

/// Mock engine with failure toggles.
pub struct MockEngine {
    state: Mutex<EngineState>,
    atomic_aliases: bool,
    reject_schemas: bool,
    /// 1-based bulk call that fails with a connection error.
    fail_bulk_on: Option<usize>,
    /// Number of upcoming alias updates that fail with a connection error.
    fail_alias_updates: AtomicUsize,
    bulk_calls: AtomicUsize,
    alias_update_calls: AtomicUsize,
    last_refresh: Mutex<Option<bool>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            atomic_aliases: true,
            reject_schemas: false,
            fail_bulk_on: None,
            fail_alias_updates: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
            alias_update_calls: AtomicUsize::new(0),
            last_refresh: Mutex::new(None),
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_atomic(mut self) -> Self {
        self.atomic_aliases = false;
        self
    }

    pub fn rejecting_schemas(mut self) -> Self {
        self.reject_schemas = true;
        self
    }

    pub fn failing_bulk_on(mut self, call: usize) -> Self {
        self.fail_bulk_on = Some(call);
        self
    }

    pub fn fail_next_alias_updates(&self, count: usize) {
        self.fail_alias_updates.store(count, Ordering::SeqCst);
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn seed_index(&self, name: &str, docs: usize) {
        let mut state = self.state.lock().await;
        let index = state.indices.entry(name.to_string()).or_default();
        for i in 0..docs {
            let id = format!("seed-{}", i);
            index.documents.insert(id.clone(), json!({ "complaint_id": id }));
        }
    }

    pub async fn seed_alias(&self, alias: &str, index: &str) {
        let mut state = self.state.lock().await;
        state.indices.entry(index.to_string()).or_default();
        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    pub async fn bindings(&self, alias: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .aliases
            .get(alias)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Bindings of `alias` after every applied update.
    pub async fn binding_history(&self, alias: &str) -> Vec<Vec<String>> {
        let state = self.state.lock().await;
        state
            .alias_history
            .iter()
            .map(|snapshot| {
                snapshot
                    .get(alias)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default()
            })
            .collect()
    }

    pub async fn count(&self, index: &str) -> usize {
        let state = self.state.lock().await;
        state
            .indices
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }

    pub async fn index(&self, name: &str) -> Option<MockIndex> {
        self.state.lock().await.indices.get(name).cloned()
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn alias_update_calls(&self) -> usize {
        self.alias_update_calls.load(Ordering::SeqCst)
    }

    pub async fn last_refresh(&self) -> Option<bool> {
        *self.last_refresh.lock().await
    }
}

fn apply(state: &mut EngineState, action: &AliasAction) -> Result<(), SearchError> {
    match action {
        AliasAction::Add { alias, index } => {
            if !state.indices.contains_key(index) {
                return Err(SearchError::alias(format!("index_not_found_exception: {}", index)));
            }
            state
                .aliases
                .entry(alias.clone())
                .or_default()
                .insert(index.clone());
        }
        AliasAction::Remove { alias, index } => {
            let removed = state
                .aliases
                .get_mut(alias)
                .map(|set| set.remove(index))
                .unwrap_or(false);
            if !removed {
                return Err(SearchError::alias(format!(
                    "aliases_not_found_exception: {} on {}",
                    alias, index
                )));
            }
            if state.aliases.get(alias).is_some_and(BTreeSet::is_empty) {
                state.aliases.remove(alias);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl SearchEngineClient for MockEngine {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        Ok(self.state.lock().await.indices.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        schema: Option<&IndexSchema>,
    ) -> Result<(), SearchError> {
        if schema.is_some() && self.reject_schemas {
            return Err(SearchError::schema("mapper_parsing_exception: unknown type"));
        }

        let mut state = self.state.lock().await;
        if state.indices.contains_key(index) {
            return Err(SearchError::IndexAlreadyExists(index.to_string()));
        }
        state.indices.insert(
            index.to_string(),
            MockIndex {
                documents: BTreeMap::new(),
                schema: schema.cloned(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let mut state = self.state.lock().await;
        state.indices.remove(index);
        for set in state.aliases.values_mut() {
            set.remove(index);
        }
        state.aliases.retain(|_, set| !set.is_empty());
        Ok(())
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, SearchError> {
        Ok(self.state.lock().await.aliases.contains_key(alias))
    }

    async fn alias_bound_to(&self, alias: &str, index: &str) -> Result<bool, SearchError> {
        let state = self.state.lock().await;
        Ok(state
            .aliases
            .get(alias)
            .is_some_and(|set| set.contains(index)))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError> {
        self.alias_update_calls.fetch_add(1, Ordering::SeqCst);

        let pending = self.fail_alias_updates.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_alias_updates.store(pending - 1, Ordering::SeqCst);
            return Err(SearchError::connection("alias update timed out"));
        }
        if !self.atomic_aliases && actions.len() > 1 {
            return Err(SearchError::alias("multi-action alias updates not supported"));
        }

        let mut state = self.state.lock().await;
        let mut next = EngineState {
            indices: state.indices.clone(),
            aliases: state.aliases.clone(),
            alias_history: Vec::new(),
        };
        for action in actions {
            apply(&mut next, action)?;
        }
        state.aliases = next.aliases;
        let snapshot = state.aliases.clone();
        state.alias_history.push(snapshot);
        Ok(())
    }

    fn supports_atomic_alias_update(&self) -> bool {
        self.atomic_aliases
    }

    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkResponse, SearchError> {
        let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_refresh.lock().await = Some(refresh);

        if self.fail_bulk_on == Some(call) {
            return Err(SearchError::connection("connection reset by peer"));
        }

        let mut state = self.state.lock().await;
        let mut response = BulkResponse::default();
        for op in operations {
            let index = state.indices.entry(op.index.clone()).or_default();
            if index.documents.contains_key(&op.id) {
                response.rejections.push(DocumentRejection::new(
                    &op.id,
                    format!(
                        "version_conflict_engine_exception: [{}]: version conflict, document already exists",
                        op.id
                    ),
                ));
            } else {
                index.documents.insert(op.id.clone(), op.body.clone());
                response.succeeded += 1;
            }
        }
        Ok(response)
    }

    async fn document_count(&self, index: &str) -> Result<u64, SearchError> {
        Ok(self.count(index).await as u64)
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

/// `count` documents with ids `0..count`.
pub fn documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| Document::new(i.to_string(), json!({ "complaint_id": i.to_string() })))
        .collect()
}

pub fn schema() -> IndexSchema {
    IndexSchema::new(
        json!({ "number_of_shards": 1 }),
        json!({ "properties": { "complaint_id": { "type": "keyword" } } }),
    )
}
