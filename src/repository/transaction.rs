// Copyright 2025 Cowboy AI, LLC.

//! Transaction manager for graph mutations
//!
//! A transaction wraps a logical unit of repository writes in a change log.
//! Writes are applied immediately; rollback undoes them by applying inverse
//! operations in reverse insertion order, so it is best-effort undo and
//! assumes no interleaved writer inside the unit. Lifecycle operations
//! (begin, commit, rollback) serialise through one lock.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use super::graph::{EntityRecord, GraphRepository, PropMap, RelationRecord};
use crate::errors::{KgError, KgResult};
use crate::identifiers::TxId;

/// Kind of mutation a change record captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    /// A new entity row was created
    CreateEntity,
    /// An existing entity row was merged into
    UpdateEntity,
    /// An entity row (and its incident relations) was removed
    DeleteEntity,
    /// A new relation row was created
    CreateRelation,
    /// An existing relation row was merged into
    UpdateRelation,
    /// A relation row was removed
    DeleteRelation,
}

/// One recorded mutation with the state needed to invert it
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    /// What happened
    pub operation: OperationType,
    /// Entity id for entity operations
    pub entity_id: Option<String>,
    /// Source id for relation operations
    pub src_id: Option<String>,
    /// Namespaced relation type for relation operations
    pub rel_type: Option<String>,
    /// Destination id for relation operations
    pub dst_id: Option<String>,
    /// Entity row as read immediately before the mutation
    pub before_entity: Option<EntityRecord>,
    /// Relation row as read immediately before the mutation
    pub before_relation: Option<RelationRecord>,
    /// Props applied by the mutation (create/update only)
    pub after_props: Option<PropMap>,
    /// When the mutation was recorded
    pub timestamp: DateTime<Utc>,
}

/// Transaction lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Created but not yet active
    Pending,
    /// Accepting mutations
    Active,
    /// Finished successfully (terminal)
    Committed,
    /// Undone (terminal)
    RolledBack,
    /// Failed without a clean rollback (terminal)
    Failed,
}

impl TransactionState {
    /// State name for logs and summaries
    pub fn name(&self) -> &'static str {
        match self {
            TransactionState::Pending => "pending",
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled_back",
            TransactionState::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack | TransactionState::Failed
        )
    }
}

/// Closed transaction summary kept in the manager's history
#[derive(Debug, Clone)]
pub struct TransactionSummary {
    /// Transaction id
    pub tx_id: TxId,
    /// Final state
    pub state: TransactionState,
    /// Number of recorded changes
    pub changes: usize,
    /// When the transaction began
    pub created_at: DateTime<Utc>,
    /// Rollback reason, when rolled back
    pub reason: Option<String>,
}

/// Aggregate counters over closed transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    /// Committed transactions
    pub committed: u64,
    /// Rolled-back transactions
    pub rolled_back: u64,
    /// Changes recorded by committed transactions
    pub committed_changes: u64,
}

#[derive(Default)]
struct ManagerState {
    history: Vec<TransactionSummary>,
    stats: TransactionStats,
}

const HISTORY_LIMIT: usize = 256;

/// An open transaction over the shared repository.
///
/// Obtained from [`TransactionManager::begin`] or inside
/// [`TransactionManager::run`]. Dropping an ACTIVE transaction rolls it back
/// with reason `"abandoned"`.
pub struct Transaction {
    id: TxId,
    state: TransactionState,
    changes: Vec<ChangeRecord>,
    created_at: DateTime<Utc>,
    repo: Arc<dyn GraphRepository>,
    manager: Arc<Mutex<ManagerState>>,
}

impl Transaction {
    /// Transaction id
    pub fn id(&self) -> &TxId {
        &self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of recorded changes so far
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    fn check_active(&self, op: &str) -> KgResult<()> {
        if self.state != TransactionState::Active {
            return Err(KgError::storage(
                op,
                format!(
                    "transaction {} is not active (state={})",
                    self.id,
                    self.state.name()
                ),
            ));
        }
        Ok(())
    }

    /// Upsert an entity, recording CREATE or UPDATE depending on whether the
    /// row already existed.
    pub fn upsert_entity(
        &mut self,
        entity_id: &str,
        labels: &[String],
        props: PropMap,
    ) -> KgResult<()> {
        self.check_active("upsert_entity")?;
        let before = self.repo.get_entity(entity_id);
        let operation = if before.is_some() {
            OperationType::UpdateEntity
        } else {
            OperationType::CreateEntity
        };
        self.repo.upsert_entity(entity_id, labels, props.clone())?;
        self.changes.push(ChangeRecord {
            operation,
            entity_id: Some(entity_id.to_string()),
            src_id: None,
            rel_type: None,
            dst_id: None,
            before_entity: before,
            before_relation: None,
            after_props: Some(props),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Upsert a relation, recording CREATE or UPDATE
    pub fn upsert_relation(
        &mut self,
        src_id: &str,
        rel_type: &str,
        dst_id: &str,
        props: PropMap,
    ) -> KgResult<()> {
        self.check_active("upsert_relation")?;
        let before = self.repo.get_relation(src_id, rel_type, dst_id);
        let operation = if before.is_some() {
            OperationType::UpdateRelation
        } else {
            OperationType::CreateRelation
        };
        self.repo
            .upsert_relation(src_id, rel_type, dst_id, props.clone())?;
        self.changes.push(ChangeRecord {
            operation,
            entity_id: None,
            src_id: Some(src_id.to_string()),
            rel_type: Some(rel_type.to_string()),
            dst_id: Some(dst_id.to_string()),
            before_entity: None,
            before_relation: before,
            after_props: Some(props),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Delete an entity (cascades in the repository); false if absent.
    ///
    /// The relations removed by the cascade are recorded individually so
    /// rollback can restore them along with the entity.
    pub fn delete_entity(&mut self, entity_id: &str) -> KgResult<bool> {
        self.check_active("delete_entity")?;
        let Some(before) = self.repo.get_entity(entity_id) else {
            return Ok(false);
        };

        let incident: Vec<RelationRecord> = self
            .repo
            .get_all_relations()
            .into_iter()
            .filter(|rel| rel.src_id == entity_id || rel.dst_id == entity_id)
            .collect();

        let deleted = self.repo.delete_entity(entity_id)?;
        if deleted {
            for rel in incident {
                self.changes.push(ChangeRecord {
                    operation: OperationType::DeleteRelation,
                    entity_id: None,
                    src_id: Some(rel.src_id.clone()),
                    rel_type: Some(rel.rel_type.clone()),
                    dst_id: Some(rel.dst_id.clone()),
                    before_entity: None,
                    before_relation: Some(rel),
                    after_props: None,
                    timestamp: Utc::now(),
                });
            }
            self.changes.push(ChangeRecord {
                operation: OperationType::DeleteEntity,
                entity_id: Some(entity_id.to_string()),
                src_id: None,
                rel_type: None,
                dst_id: None,
                before_entity: Some(before),
                before_relation: None,
                after_props: None,
                timestamp: Utc::now(),
            });
        }
        Ok(deleted)
    }

    /// Delete a relation; false if absent
    pub fn delete_relation(
        &mut self,
        src_id: &str,
        rel_type: &str,
        dst_id: &str,
    ) -> KgResult<bool> {
        self.check_active("delete_relation")?;
        let Some(before) = self.repo.get_relation(src_id, rel_type, dst_id) else {
            return Ok(false);
        };
        let deleted = self.repo.delete_relation(src_id, rel_type, dst_id)?;
        if deleted {
            self.changes.push(ChangeRecord {
                operation: OperationType::DeleteRelation,
                entity_id: None,
                src_id: Some(src_id.to_string()),
                rel_type: Some(rel_type.to_string()),
                dst_id: Some(dst_id.to_string()),
                before_entity: None,
                before_relation: Some(before),
                after_props: None,
                timestamp: Utc::now(),
            });
        }
        Ok(deleted)
    }

    /// Commit: O(1) apart from bookkeeping, since writes already landed
    pub fn commit(mut self) -> KgResult<()> {
        self.check_active("commit")?;
        self.state = TransactionState::Committed;
        self.close(None);
        Ok(())
    }

    /// Roll back by undoing recorded changes in reverse order
    pub fn rollback(mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.do_rollback(&reason);
    }

    fn do_rollback(&mut self, reason: &str) {
        if self.state != TransactionState::Active {
            return;
        }
        for change in self.changes.iter().rev() {
            if let Err(e) = undo_change(self.repo.as_ref(), change) {
                tracing::error!(tx = %self.id, error = %e, "failed to undo change");
            }
        }
        self.state = TransactionState::RolledBack;
        tracing::warn!(tx = %self.id, reason, changes = self.changes.len(), "transaction rolled back");
        self.close(Some(reason.to_string()));
    }

    fn close(&mut self, reason: Option<String>) {
        let summary = TransactionSummary {
            tx_id: self.id.clone(),
            state: self.state,
            changes: self.changes.len(),
            created_at: self.created_at,
            reason,
        };
        if let Ok(mut mgr) = self.manager.lock() {
            match self.state {
                TransactionState::Committed => {
                    mgr.stats.committed += 1;
                    mgr.stats.committed_changes += self.changes.len() as u64;
                    tracing::info!(tx = %self.id, changes = self.changes.len(), "transaction committed");
                }
                TransactionState::RolledBack => mgr.stats.rolled_back += 1,
                _ => {}
            }
            mgr.history.push(summary);
            if mgr.history.len() > HISTORY_LIMIT {
                let overflow = mgr.history.len() - HISTORY_LIMIT;
                mgr.history.drain(..overflow);
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            self.do_rollback("abandoned");
        }
    }
}

fn undo_change(repo: &dyn GraphRepository, change: &ChangeRecord) -> KgResult<()> {
    match change.operation {
        OperationType::CreateEntity => {
            if let Some(id) = &change.entity_id {
                repo.delete_entity(id)?;
            }
        }
        OperationType::UpdateEntity => {
            if let Some(before) = &change.before_entity {
                repo.upsert_entity(&before.id, &before.labels, before.props.clone())?;
            }
        }
        OperationType::DeleteEntity => {
            if let Some(before) = &change.before_entity {
                repo.upsert_entity(&before.id, &before.labels, before.props.clone())?;
            }
        }
        OperationType::CreateRelation => {
            if let (Some(src), Some(rtype), Some(dst)) =
                (&change.src_id, &change.rel_type, &change.dst_id)
            {
                repo.delete_relation(src, rtype, dst)?;
            }
        }
        OperationType::UpdateRelation | OperationType::DeleteRelation => {
            if let Some(before) = &change.before_relation {
                repo.upsert_relation(
                    &before.src_id,
                    &before.rel_type,
                    &before.dst_id,
                    before.props.clone(),
                )?;
            }
        }
    }
    Ok(())
}

/// Hands out transactions over one shared repository.
///
/// The usual entry point is [`TransactionManager::run`], which commits on
/// `Ok` and rolls back (propagating the original error) on `Err`.
pub struct TransactionManager {
    repo: Arc<dyn GraphRepository>,
    state: Arc<Mutex<ManagerState>>,
}

impl TransactionManager {
    /// Create a manager over the given repository
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self {
            repo,
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    /// The repository this manager writes through
    pub fn repository(&self) -> Arc<dyn GraphRepository> {
        Arc::clone(&self.repo)
    }

    /// Begin a transaction
    pub fn begin(&self) -> Transaction {
        let tx = Transaction {
            id: TxId::generate(),
            state: TransactionState::Active,
            changes: Vec::new(),
            created_at: Utc::now(),
            repo: Arc::clone(&self.repo),
            manager: Arc::clone(&self.state),
        };
        tracing::debug!(tx = %tx.id, "transaction started");
        tx
    }

    /// Run a closure inside a transaction: commit on `Ok`, roll back on `Err`
    pub fn run<T>(&self, f: impl FnOnce(&mut Transaction) -> KgResult<T>) -> KgResult<T> {
        let mut tx = self.begin();
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback(err.to_string());
                Err(err)
            }
        }
    }

    /// Counters over closed transactions
    pub fn stats(&self) -> TransactionStats {
        self.state.lock().map(|s| s.stats).unwrap_or_default()
    }

    /// The most recent closed transactions, oldest first
    pub fn recent(&self, count: usize) -> Vec<TransactionSummary> {
        self.state
            .lock()
            .map(|s| {
                let skip = s.history.len().saturating_sub(count);
                s.history[skip..].to_vec()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::graph::props;
    use crate::repository::memory::InMemoryGraphRepository;
    use serde_json::json;

    fn setup() -> (Arc<InMemoryGraphRepository>, TransactionManager) {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let mgr = TransactionManager::new(repo.clone() as Arc<dyn GraphRepository>);
        (repo, mgr)
    }

    fn labels() -> Vec<String> {
        vec!["DomainEntity".to_string()]
    }

    #[test]
    fn run_commits_on_ok() {
        let (repo, mgr) = setup();
        mgr.run(|tx| {
            tx.upsert_entity("A", &labels(), PropMap::new())?;
            tx.upsert_relation("A", "domain:Affect", "B", PropMap::new())?;
            Ok(())
        })
        .unwrap();

        assert_eq!(repo.count_entities(), 1);
        assert_eq!(repo.count_relations(), 1);
        assert_eq!(mgr.stats().committed, 1);
        assert_eq!(mgr.stats().committed_changes, 2);
    }

    #[test]
    fn run_rolls_back_on_err_and_restores_counts() {
        let (repo, mgr) = setup();
        let pre_entities = repo.count_entities();
        let pre_relations = repo.count_relations();

        let result: KgResult<()> = mgr.run(|tx| {
            tx.upsert_entity("E", &labels(), PropMap::new())?;
            tx.upsert_relation("E", "domain:Affect", "F", PropMap::new())?;
            Err(KgError::Validation("boom".into()))
        });
        assert!(result.is_err());

        assert_eq!(repo.count_entities(), pre_entities);
        assert_eq!(repo.count_relations(), pre_relations);
        assert_eq!(mgr.stats().rolled_back, 1);
        assert_eq!(mgr.stats().committed, 0);
    }

    #[test]
    fn rollback_restores_updated_rows() {
        let (repo, mgr) = setup();
        repo.upsert_entity("A", &labels(), props(vec![("name", json!("old"))]))
            .unwrap();

        let result: KgResult<()> = mgr.run(|tx| {
            tx.upsert_entity("A", &labels(), props(vec![("name", json!("new"))]))?;
            Err(KgError::Validation("abort".into()))
        });
        assert!(result.is_err());

        let rec = repo.get_entity("A").unwrap();
        assert_eq!(rec.props.get("name"), Some(&json!("old")));
    }

    #[test]
    fn rollback_restores_deleted_relation() {
        let (repo, mgr) = setup();
        repo.upsert_relation("A", "domain:Affect", "B", props(vec![("sign", json!("+"))]))
            .unwrap();

        let result: KgResult<()> = mgr.run(|tx| {
            assert!(tx.delete_relation("A", "domain:Affect", "B")?);
            Err(KgError::Validation("abort".into()))
        });
        assert!(result.is_err());

        let rel = repo.get_relation("A", "domain:Affect", "B").unwrap();
        assert_eq!(rel.props.get("sign"), Some(&json!("+")));
    }

    #[test]
    fn commit_then_inverse_commit_restores_original_state() {
        let (repo, mgr) = setup();

        mgr.run(|tx| tx.upsert_entity("X", &labels(), PropMap::new()))
            .unwrap();
        assert_eq!(repo.count_entities(), 1);

        mgr.run(|tx| tx.delete_entity("X").map(|_| ())).unwrap();
        assert_eq!(repo.count_entities(), 0);
        assert!(repo.get_entity("X").is_none());
    }

    #[test]
    fn mutating_a_closed_transaction_fails_high() {
        let (_, mgr) = setup();
        let mut tx = mgr.begin();
        tx.upsert_entity("A", &labels(), PropMap::new()).unwrap();
        // Drive the state machine past ACTIVE by hand.
        tx.state = TransactionState::Committed;
        let err = tx
            .upsert_entity("B", &labels(), PropMap::new())
            .unwrap_err();
        match err {
            KgError::Storage { severity, .. } => {
                assert_eq!(severity, crate::errors::ErrorSeverity::High)
            }
            other => panic!("expected storage error, got {other:?}"),
        }
        // avoid the abandoned-drop path for the hand-closed transaction
        tx.state = TransactionState::Committed;
    }

    #[test]
    fn abandoned_transaction_rolls_back_on_drop() {
        let (repo, mgr) = setup();
        {
            let mut tx = mgr.begin();
            tx.upsert_entity("Z", &labels(), PropMap::new()).unwrap();
            // dropped without commit
        }
        assert_eq!(repo.count_entities(), 0);
        let recent = mgr.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].state, TransactionState::RolledBack);
        assert_eq!(recent[0].reason.as_deref(), Some("abandoned"));
    }

    #[test]
    fn state_machine_terminal_flags() {
        assert!(!TransactionState::Pending.is_terminal());
        assert!(!TransactionState::Active.is_terminal());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
        assert!(TransactionState::Failed.is_terminal());
    }

    #[test]
    fn undo_is_applied_in_reverse_order() {
        let (repo, mgr) = setup();
        let result: KgResult<()> = mgr.run(|tx| {
            tx.upsert_entity("A", &labels(), props(vec![("v", json!(1))]))?;
            tx.upsert_entity("A", &labels(), props(vec![("v", json!(2))]))?;
            tx.upsert_entity("A", &labels(), props(vec![("v", json!(3))]))?;
            Err(KgError::Validation("abort".into()))
        });
        assert!(result.is_err());
        // Reverse-order undo walks 3 -> 2 -> 1 -> create, removing the row.
        assert!(repo.get_entity("A").is_none());
    }
}
