//! Transactional invariants over the shared repository.

use proptest::prelude::*;
use rand::seq::SliceRandom;
use std::sync::Arc;

use causal_kg::repository::{props, Direction, PropMap};
use causal_kg::{
    GraphRepository, InMemoryGraphRepository, KgError, KgResult, TransactionManager,
};
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
fn aborted_transaction_restores_counts() {
    let (repo, mgr) = setup();
    repo.upsert_entity("existing", &labels(), PropMap::new())
        .unwrap();
    repo.upsert_relation("existing", "domain:Affect", "other", PropMap::new())
        .unwrap();

    let entities_before = repo.count_entities();
    let relations_before = repo.count_relations();

    let result: KgResult<()> = mgr.run(|tx| {
        tx.upsert_entity("E", &labels(), PropMap::new())?;
        tx.upsert_relation("E", "domain:Affect", "F", PropMap::new())?;
        Err(KgError::Validation("forced failure".into()))
    });
    assert!(result.is_err());

    assert_eq!(repo.count_entities(), entities_before);
    assert_eq!(repo.count_relations(), relations_before);
}

#[test]
fn committed_changes_count_net_operations() {
    let (repo, mgr) = setup();
    mgr.run(|tx| {
        tx.upsert_entity("A", &labels(), PropMap::new())?;
        tx.upsert_entity("B", &labels(), PropMap::new())?;
        tx.upsert_relation("A", "domain:Affect", "B", PropMap::new())?;
        Ok(())
    })
    .unwrap();

    assert_eq!(repo.count_entities(), 2);
    assert_eq!(repo.count_relations(), 1);
    assert_eq!(mgr.stats().committed_changes, 3);
}

#[test]
fn commit_then_inverse_commit_round_trips() {
    let (repo, mgr) = setup();

    mgr.run(|tx| {
        tx.upsert_entity("A", &labels(), props(vec![("name", json!("A"))]))?;
        tx.upsert_relation("A", "domain:Affect", "B", props(vec![("sign", json!("+"))]))
    })
    .unwrap();
    assert_eq!(repo.count_entities(), 1);
    assert_eq!(repo.count_relations(), 1);

    mgr.run(|tx| {
        tx.delete_relation("A", "domain:Affect", "B")?;
        tx.delete_entity("A")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(repo.count_entities(), 0);
    assert_eq!(repo.count_relations(), 0);
    assert!(repo.get_entity("A").is_none());
    assert!(repo.get_relation("A", "domain:Affect", "B").is_none());
}

#[test]
fn rollback_undoes_mixed_operations_in_reverse() {
    let (repo, mgr) = setup();
    repo.upsert_entity("keep", &labels(), props(vec![("v", json!("original"))]))
        .unwrap();
    repo.upsert_relation("keep", "domain:Affect", "other", props(vec![("sign", json!("+"))]))
        .unwrap();

    let result: KgResult<()> = mgr.run(|tx| {
        tx.upsert_entity("keep", &labels(), props(vec![("v", json!("mutated"))]))?;
        tx.delete_relation("keep", "domain:Affect", "other")?;
        tx.upsert_entity("new", &labels(), PropMap::new())?;
        Err(KgError::Validation("abort".into()))
    });
    assert!(result.is_err());

    assert!(repo.get_entity("new").is_none());
    let kept = repo.get_entity("keep").unwrap();
    assert_eq!(kept.props.get("v"), Some(&json!("original")));
    let rel = repo.get_relation("keep", "domain:Affect", "other").unwrap();
    assert_eq!(rel.props.get("sign"), Some(&json!("+")));
}

#[test]
fn neighbors_survive_rollback_of_cascading_delete() {
    let (repo, mgr) = setup();
    repo.upsert_relation("A", "domain:Affect", "B", PropMap::new())
        .unwrap();
    repo.upsert_entity("A", &labels(), PropMap::new()).unwrap();

    let result: KgResult<()> = mgr.run(|tx| {
        tx.delete_relation("A", "domain:Affect", "B")?;
        tx.delete_entity("A")?;
        Err(KgError::Validation("abort".into()))
    });
    assert!(result.is_err());

    let neighbors = repo.get_neighbors("A", None, Direction::Out);
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].other_id, "B");
}

#[test]
fn rollback_is_order_insensitive() {
    let (repo, mgr) = setup();
    let mut ids: Vec<String> = (0..12).map(|i| format!("ent_{i}")).collect();
    ids.shuffle(&mut rand::thread_rng());

    let result: KgResult<()> = mgr.run(|tx| {
        for id in &ids {
            tx.upsert_entity(id, &labels(), PropMap::new())?;
        }
        for pair in ids.windows(2) {
            tx.upsert_relation(&pair[0], "domain:Affect", &pair[1], PropMap::new())?;
        }
        Err(KgError::Validation("abort".into()))
    });
    assert!(result.is_err());
    assert_eq!(repo.count_entities(), 0);
    assert_eq!(repo.count_relations(), 0);
}

proptest! {
    #[test]
    fn upserting_the_same_entity_twice_is_idempotent(
        id in "[a-zA-Z_][a-zA-Z0-9_]{0,16}",
        key in "[a-z]{1,8}",
        value in "[a-zA-Z0-9 ]{0,20}",
    ) {
        let repo = InMemoryGraphRepository::new();
        let p = props(vec![(key.as_str(), json!(value))]);
        repo.upsert_entity(&id, &labels(), p.clone()).unwrap();
        let first = repo.get_entity(&id).unwrap();
        repo.upsert_entity(&id, &labels(), p).unwrap();
        let second = repo.get_entity(&id).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(repo.count_entities(), 1);
    }

    #[test]
    fn commit_and_inverse_preserve_counts_for_any_entity_set(
        ids in proptest::collection::hash_set("[a-z]{1,10}", 1..8),
    ) {
        let (repo, mgr) = setup();
        let ids: Vec<String> = ids.into_iter().collect();

        mgr.run(|tx| {
            for id in &ids {
                tx.upsert_entity(id, &labels(), PropMap::new())?;
            }
            Ok(())
        }).unwrap();
        prop_assert_eq!(repo.count_entities(), ids.len());

        mgr.run(|tx| {
            for id in &ids {
                tx.delete_entity(id)?;
            }
            Ok(())
        }).unwrap();
        prop_assert_eq!(repo.count_entities(), 0);
    }

    #[test]
    fn rollback_restores_counts_for_any_change_sequence(
        ids in proptest::collection::vec("[a-z]{1,10}", 1..10),
    ) {
        let (repo, mgr) = setup();
        let before = repo.count_entities();

        let result: KgResult<()> = mgr.run(|tx| {
            for id in &ids {
                tx.upsert_entity(id, &labels(), PropMap::new())?;
            }
            Err(KgError::Validation("abort".into()))
        });
        prop_assert!(result.is_err());
        prop_assert_eq!(repo.count_entities(), before);
    }
}
