//! Alias controller module for the bulk indexer pipeline.
//!
//! Decides which physical index is live from the alias binding and moves the
//! alias on commit or rollback. The alias is never left without a binding
//! while it is being moved.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::errors::LoadError;
use bulk_indexer_repository::{AliasAction, SearchEngineClient, SearchError};
use bulk_indexer_shared::{IndexPair, IndexRoles};

/// Backoff applied to alias updates that fail because the engine is
/// unavailable.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first failure.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

pub struct AliasController {
    client: Arc<dyn SearchEngineClient>,
    retry: RetryPolicy,
}

impl AliasController {
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_retry_policy(client, RetryPolicy::default())
    }

    pub fn with_retry_policy(client: Arc<dyn SearchEngineClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Read the alias binding and derive the roles for this run.
    ///
    /// Without a binding to either name, `pair.primary` becomes the build
    /// target. An alias bound to both names cannot be resolved.
    #[instrument(skip(self, pair))]
    pub async fn resolve_roles(
        &self,
        alias: &str,
        pair: &IndexPair,
    ) -> Result<IndexRoles, LoadError> {
        let bootstrap = IndexRoles {
            live: pair.secondary.clone(),
            backup: pair.primary.clone(),
            alias_bound: false,
        };

        if !self.client.alias_exists(alias).await? {
            info!(alias = %alias, target = %bootstrap.backup, "Alias does not exist yet");
            return Ok(bootstrap);
        }

        let on_primary = self.client.alias_bound_to(alias, &pair.primary).await?;
        let on_secondary = self.client.alias_bound_to(alias, &pair.secondary).await?;

        let roles = match (on_primary, on_secondary) {
            (true, true) => {
                return Err(LoadError::alias_unresolved(
                    alias,
                    format!("bound to both {} and {}", pair.primary, pair.secondary),
                ))
            }
            (true, false) => IndexRoles {
                live: pair.primary.clone(),
                backup: pair.secondary.clone(),
                alias_bound: true,
            },
            (false, true) => IndexRoles {
                live: pair.secondary.clone(),
                backup: pair.primary.clone(),
                alias_bound: true,
            },
            (false, false) => {
                warn!(alias = %alias, "Alias exists but is bound to neither index");
                bootstrap
            }
        };

        info!(
            alias = %alias,
            live = %roles.live,
            backup = %roles.backup,
            "Resolved index roles"
        );
        Ok(roles)
    }

    /// Move `alias` from `old_live` to `new_live`.
    ///
    /// Engines with multi-action updates get a single remove+add request.
    /// Otherwise the add is applied first, then the remove, so readers may
    /// briefly see both indices but never neither.
    #[instrument(skip(self))]
    pub async fn commit(&self, alias: &str, old_live: &str, new_live: &str) -> Result<(), LoadError> {
        if !self.client.alias_exists(alias).await? {
            info!(alias = %alias, index = %new_live, "Adding alias");
            self.update_with_retry(&[AliasAction::add(alias, new_live)])
                .await?;
            return Ok(());
        }

        let on_old = self.client.alias_bound_to(alias, old_live).await?;
        let on_new = self.client.alias_bound_to(alias, new_live).await?;

        match (on_old, on_new) {
            (true, false) => {
                info!(
                    alias = %alias,
                    from = %old_live,
                    to = %new_live,
                    "Removing index from alias and adding new one"
                );
                self.apply(vec![
                    AliasAction::add(alias, new_live),
                    AliasAction::remove(alias, old_live),
                ])
                .await
            }
            (true, true) => {
                warn!(alias = %alias, index = %old_live, "Dropping leftover binding");
                self.update_with_retry(&[AliasAction::remove(alias, old_live)])
                    .await?;
                Ok(())
            }
            (false, true) => {
                debug!(alias = %alias, index = %new_live, "Alias already bound to new index");
                Ok(())
            }
            (false, false) => {
                info!(alias = %alias, index = %new_live, "Alias exists, adding index to it");
                self.update_with_retry(&[AliasAction::add(alias, new_live)])
                    .await?;
                Ok(())
            }
        }
    }

    /// Restore the binding `alias` had before the run that produced `roles`.
    ///
    /// Calling it again once restored does not touch the engine.
    #[instrument(skip(self, roles), fields(live = %roles.live, backup = %roles.backup))]
    pub async fn rollback(&self, alias: &str, roles: &IndexRoles) -> Result<(), LoadError> {
        let mut actions = Vec::with_capacity(2);

        if roles.alias_bound && !self.client.alias_bound_to(alias, &roles.live).await? {
            actions.push(AliasAction::add(alias, &roles.live));
        }
        if self.client.alias_bound_to(alias, &roles.backup).await? {
            actions.push(AliasAction::remove(alias, &roles.backup));
        }

        if actions.is_empty() {
            debug!(alias = %alias, "Alias already in its original state");
            return Ok(());
        }

        info!(alias = %alias, actions = actions.len(), "Reverting alias");
        self.apply(actions).await
    }

    /// Apply `actions` in one request when the engine allows it, else one by
    /// one in order.
    async fn apply(&self, actions: Vec<AliasAction>) -> Result<(), LoadError> {
        if actions.len() == 1 || self.client.supports_atomic_alias_update() {
            self.update_with_retry(&actions).await?;
            return Ok(());
        }

        for action in &actions {
            self.update_with_retry(std::slice::from_ref(action)).await?;
        }
        Ok(())
    }

    /// Send one alias update with exponential backoff retry logic.
    async fn update_with_retry(&self, actions: &[AliasAction]) -> Result<(), SearchError> {
        let mut delay_ms = self.retry.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            match self.client.update_aliases(actions).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(attempt = attempt, "Alias update succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) if e.is_unavailable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt = attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Alias update failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms * 2, self.retry.max_retry_delay_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;

    const ALIAS: &str = "complaints";

    fn pair() -> IndexPair {
        IndexPair::for_alias(ALIAS)
    }

    fn controller(engine: Arc<MockEngine>) -> AliasController {
        AliasController::with_retry_policy(
            engine,
            RetryPolicy {
                max_retries: 3,
                initial_retry_delay_ms: 1,
                max_retry_delay_ms: 4,
            },
        )
    }

    async fn bound_engine(index: &str) -> Arc<MockEngine> {
        let engine = MockEngine::new().into_arc();
        engine.seed_index("complaints-v1", 0).await;
        engine.seed_index("complaints-v2", 0).await;
        engine.seed_alias(ALIAS, index).await;
        engine
    }

    #[tokio::test]
    async fn test_resolve_without_alias_targets_primary() {
        let engine = MockEngine::new().into_arc();
        let roles = controller(engine).resolve_roles(ALIAS, &pair()).await.unwrap();

        assert_eq!(roles.backup, "complaints-v1");
        assert_eq!(roles.live, "complaints-v2");
        assert!(!roles.alias_bound);
    }

    #[tokio::test]
    async fn test_resolve_follows_binding() {
        let engine = bound_engine("complaints-v1").await;
        let roles = controller(engine).resolve_roles(ALIAS, &pair()).await.unwrap();
        assert_eq!(roles.live, "complaints-v1");
        assert_eq!(roles.backup, "complaints-v2");
        assert!(roles.alias_bound);

        let engine = bound_engine("complaints-v2").await;
        let roles = controller(engine).resolve_roles(ALIAS, &pair()).await.unwrap();
        assert_eq!(roles.live, "complaints-v2");
        assert_eq!(roles.backup, "complaints-v1");
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable_and_read_only() {
        let engine = bound_engine("complaints-v2").await;
        let aliases = controller(engine.clone());

        let first = aliases.resolve_roles(ALIAS, &pair()).await.unwrap();
        let second = aliases.resolve_roles(ALIAS, &pair()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.alias_update_calls(), 0);
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v2"]);
    }

    #[tokio::test]
    async fn test_resolve_alias_on_other_index_bootstraps() {
        let engine = MockEngine::new().into_arc();
        engine.seed_alias(ALIAS, "legacy").await;

        let roles = controller(engine).resolve_roles(ALIAS, &pair()).await.unwrap();

        assert_eq!(roles.backup, "complaints-v1");
        assert!(!roles.alias_bound);
    }

    #[tokio::test]
    async fn test_resolve_double_binding_is_unresolved() {
        let engine = bound_engine("complaints-v1").await;
        engine.seed_alias(ALIAS, "complaints-v2").await;

        let result = controller(engine).resolve_roles(ALIAS, &pair()).await;

        assert!(matches!(result, Err(LoadError::AliasUnresolved { .. })));
    }

    #[tokio::test]
    async fn test_commit_creates_missing_alias() {
        let engine = MockEngine::new().into_arc();
        engine.seed_index("complaints-v1", 0).await;

        controller(engine.clone())
            .commit(ALIAS, "complaints-v2", "complaints-v1")
            .await
            .unwrap();

        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1"]);
    }

    #[tokio::test]
    async fn test_commit_swaps_in_one_request() {
        let engine = bound_engine("complaints-v1").await;

        controller(engine.clone())
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await
            .unwrap();

        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v2"]);
        assert_eq!(engine.alias_update_calls(), 1);
    }

    #[tokio::test]
    async fn test_commit_non_atomic_adds_before_removing() {
        let engine = MockEngine::new().non_atomic().into_arc();
        engine.seed_index("complaints-v2", 0).await;
        engine.seed_alias(ALIAS, "complaints-v1").await;

        controller(engine.clone())
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await
            .unwrap();

        let history = engine.binding_history(ALIAS).await;
        assert_eq!(
            history,
            vec![
                vec!["complaints-v1".to_string(), "complaints-v2".to_string()],
                vec!["complaints-v2".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_commit_already_on_new_is_noop() {
        let engine = bound_engine("complaints-v2").await;

        controller(engine.clone())
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await
            .unwrap();

        assert_eq!(engine.alias_update_calls(), 0);
    }

    #[tokio::test]
    async fn test_commit_alias_on_other_index_adds() {
        let engine = MockEngine::new().into_arc();
        engine.seed_index("complaints-v1", 0).await;
        engine.seed_alias(ALIAS, "legacy").await;

        controller(engine.clone())
            .commit(ALIAS, "complaints-v2", "complaints-v1")
            .await
            .unwrap();

        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1", "legacy"]);
    }

    #[tokio::test]
    async fn test_commit_retries_unavailable_engine() {
        let engine = bound_engine("complaints-v1").await;
        engine.fail_next_alias_updates(2);

        controller(engine.clone())
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await
            .unwrap();

        assert_eq!(engine.alias_update_calls(), 3);
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v2"]);
    }

    #[tokio::test]
    async fn test_commit_gives_up_after_max_retries() {
        let engine = bound_engine("complaints-v1").await;
        engine.fail_next_alias_updates(10);

        let result = controller(engine.clone())
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await;

        assert!(matches!(result, Err(LoadError::EngineUnavailable(_))));
        assert_eq!(engine.alias_update_calls(), 4);
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1"]);
    }

    #[tokio::test]
    async fn test_rollback_first_run_leaves_alias_unbound() {
        let engine = MockEngine::new().into_arc();
        let aliases = controller(engine.clone());
        let roles = aliases.resolve_roles(ALIAS, &pair()).await.unwrap();

        aliases.rollback(ALIAS, &roles).await.unwrap();

        assert!(engine.bindings(ALIAS).await.is_empty());
        assert_eq!(engine.alias_update_calls(), 0);
    }

    #[tokio::test]
    async fn test_rollback_restores_live_binding() {
        let engine = bound_engine("complaints-v1").await;
        let aliases = controller(engine.clone());
        let roles = aliases.resolve_roles(ALIAS, &pair()).await.unwrap();

        // Commit went through before the failure was noticed.
        aliases
            .commit(ALIAS, "complaints-v1", "complaints-v2")
            .await
            .unwrap();

        aliases.rollback(ALIAS, &roles).await.unwrap();
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1"]);

        let calls = engine.alias_update_calls();
        aliases.rollback(ALIAS, &roles).await.unwrap();
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1"]);
        assert_eq!(engine.alias_update_calls(), calls);
    }

    #[tokio::test]
    async fn test_rollback_non_atomic_never_unbinds() {
        let engine = MockEngine::new().non_atomic().into_arc();
        engine.seed_alias(ALIAS, "complaints-v2").await;
        let roles = IndexRoles {
            live: "complaints-v1".to_string(),
            backup: "complaints-v2".to_string(),
            alias_bound: true,
        };
        engine.seed_index("complaints-v1", 0).await;

        controller(engine.clone()).rollback(ALIAS, &roles).await.unwrap();

        let history = engine.binding_history(ALIAS).await;
        assert!(history.iter().all(|bindings| !bindings.is_empty()));
        assert_eq!(engine.bindings(ALIAS).await, vec!["complaints-v1"]);
    }
}
