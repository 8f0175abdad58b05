//! End-to-end ingestion flows: static conflicts, evidence accumulation, and
//! sign conflicts with accumulating counter-evidence.

use causal_kg::domain::{ConflictResolution, FinalDestination};
use causal_kg::identifiers::FragmentId;
use causal_kg::validation::{SchemaCheck, SignCheck, ValidationResult};
use causal_kg::{
    KgContext, KnowledgeEngine, Polarity, RawEdge, RelationKey, RelationType, ResolvedEntity,
    SemanticTag, Settings, SignTag, StaticRule, ValidationDestination,
};

fn engine_with_rules(rules: Vec<StaticRule>) -> KnowledgeEngine {
    let mut settings = Settings::default().with_builtin_patterns();
    settings.static_domain.static_rules = rules;
    KnowledgeEngine::new(KgContext::builder().settings(settings).build())
}

fn funds_rate_rule() -> StaticRule {
    StaticRule {
        rule_id: "SR-001".into(),
        head: "Federal_Funds_Rate".into(),
        tail: "US_10Y_Treasury".into(),
        polarity: Polarity::Negative,
        relation: RelationType::Affect,
        certainty: 1.0,
        description: "policy rate hikes depress long treasury prices".into(),
    }
}

fn edge(id: &str, head: &str, tail: &str, polarity: Polarity, conf: f64) -> RawEdge {
    RawEdge {
        raw_edge_id: id.into(),
        head_entity_id: head.into(),
        tail_entity_id: tail.into(),
        head_name: Some(head.replace('_', " ")),
        tail_name: Some(tail.replace('_', " ")),
        relation_type: RelationType::Affect,
        polarity_guess: polarity,
        student_conf: conf,
        fragment_text: Some(format!(
            "{} moved and {} followed in the latest session",
            head.replace('_', " "),
            tail.replace('_', " ")
        )),
        fragment_id: FragmentId::new(format!("frag_{id}")),
    }
}

fn entities(ids: &[&str]) -> Vec<ResolvedEntity> {
    ids.iter()
        .map(|id| ResolvedEntity::canonical(*id, id.replace('_', " ")))
        .collect()
}

/// A hand-built arbitration verdict, the way a host drives the ingest API.
fn domain_verdict(edge: &RawEdge, tag: SemanticTag) -> ValidationResult {
    ValidationResult {
        edge_id: edge.raw_edge_id.clone(),
        validation_passed: true,
        destination: ValidationDestination::DomainCandidate,
        combined_conf: 0.8,
        student_conf: edge.student_conf,
        sign_score: 0.9,
        semantic_conf: 0.85,
        schema: Some(SchemaCheck {
            edge_id: edge.raw_edge_id.clone(),
            schema_valid: true,
            errors: vec![],
            has_required_fields: true,
            entity_pair_valid: true,
            no_self_loop: true,
        }),
        sign: Some(SignCheck {
            edge_id: edge.raw_edge_id.clone(),
            polarity_final: edge.polarity_guess,
            sign_tag: SignTag::Confident,
            consistency: 0.9,
            pattern_polarity: None,
            static_polarity: None,
            llm_polarity: None,
            conflict_with_static: false,
        }),
        semantic: Some(causal_kg::validation::SemanticCheck {
            edge_id: edge.raw_edge_id.clone(),
            tag,
            confidence: 0.85,
            has_exaggeration: false,
            correlation_as_causation: false,
            weak_evidence: false,
            domain_conflict: false,
            llm_judgement: None,
        }),
        rejection_codes: vec![],
    }
}

#[test]
fn static_conflict_routes_to_personal_without_domain_write() {
    let engine = engine_with_rules(vec![funds_rate_rule()]);
    let e = edge(
        "e1",
        "Federal_Funds_Rate",
        "US_10Y_Treasury",
        Polarity::Positive,
        0.9,
    );
    let resolved = entities(&["Federal_Funds_Rate", "US_10Y_Treasury"]);

    let outcome = engine
        .process(&e, &domain_verdict(&e, SemanticTag::SemConfident), &resolved)
        .unwrap();

    let domain = outcome.domain.expect("domain pipeline ran");
    let static_result = domain.static_result.expect("static guard ran");
    assert!(static_result.static_conflict);
    assert_eq!(domain.final_destination, FinalDestination::Personal);

    // No Domain write happened for the key.
    let key = RelationKey::new("Federal_Funds_Rate", "US_10Y_Treasury", RelationType::Affect);
    assert!(engine.context().domain_adapter.get_relation(&key).is_none());

    // The edge landed in the Personal KG instead.
    let personal = outcome.personal.expect("personal pipeline ran");
    let stored = engine
        .context()
        .personal_adapter
        .get_relation_by_id(&personal.relation_id)
        .unwrap();
    assert_eq!(stored.sign, Polarity::Positive);
    assert_eq!(stored.occurrence_count, 1);
}

#[test]
fn evidence_accumulates_across_repeated_agreeing_edges() {
    let engine = engine_with_rules(vec![]);
    let resolved = entities(&["Inflation", "Gold_Price"]);

    for i in 0..3 {
        let e = edge(
            &format!("e{i}"),
            "Inflation",
            "Gold_Price",
            Polarity::Positive,
            0.8,
        );
        engine
            .process(&e, &domain_verdict(&e, SemanticTag::SemConfident), &resolved)
            .unwrap();
    }

    let key = RelationKey::new("Inflation", "Gold_Price", RelationType::Affect);
    let relation = engine.context().domain_adapter.get_relation(&key).unwrap();
    assert_eq!(relation.evidence_count, 3);
    assert_eq!(relation.sign, Polarity::Positive);
    assert!(relation.domain_conf > 0.5);
    assert!(relation.domain_conf < 0.95);
    // single row per key
    assert_eq!(engine.context().domain_adapter.all_relations().len(), 1);
}

#[test]
fn overwhelming_counter_evidence_flows_to_personal_while_domain_sign_holds() {
    let engine = engine_with_rules(vec![]);
    let resolved = entities(&["Inflation", "Gold_Price"]);
    let key = RelationKey::new("Inflation", "Gold_Price", RelationType::Affect);

    // Seed the existing relation with two supporting edges: evidence = 2.
    for i in 0..2 {
        let e = edge(
            &format!("seed{i}"),
            "Inflation",
            "Gold_Price",
            Polarity::Positive,
            0.8,
        );
        engine
            .process(&e, &domain_verdict(&e, SemanticTag::SemConfident), &resolved)
            .unwrap();
    }

    // Nine counter-edges in sequence.
    let mut personal_hits = Vec::new();
    for i in 0..9 {
        let e = edge(
            &format!("ctr{i}"),
            "Inflation",
            "Gold_Price",
            Polarity::Negative,
            0.8,
        );
        let outcome = engine
            .process(&e, &domain_verdict(&e, SemanticTag::SemConfident), &resolved)
            .unwrap();
        personal_hits.push(outcome.personal.is_some());

        if let Some(conflict) = outcome.domain.as_ref().and_then(|d| d.conflict_result.clone()) {
            // Once the counter-evidence ratio crosses the threshold the
            // resolution must be a Personal demotion.
            let ratio = conflict.counter_evidence as f64 / conflict.existing_evidence.max(1) as f64;
            if ratio >= 3.0 {
                assert_eq!(conflict.resolution, ConflictResolution::ToPersonal);
            }
        }
    }

    // The crossing happens at counter-evidence 6 against evidence 2; from
    // there on every counter-edge lands in the Personal KG.
    assert_eq!(personal_hits[..5], [false, false, false, false, false]);
    assert_eq!(personal_hits[5..], [true, true, true, true]);

    // Domain keeps its original sign; conflicts accumulate; confidence
    // shrinks to the floor.
    let relation = engine.context().domain_adapter.get_relation(&key).unwrap();
    assert_eq!(relation.sign, Polarity::Positive);
    assert_eq!(relation.evidence_count, 2);
    assert_eq!(relation.conflict_count, 9);
    assert!((relation.domain_conf - 0.10).abs() < 1e-9);

    // Personal accrued one occurrence per demoted counter-edge.
    let personal_key = engine.context().personal_adapter.get_relation(&key).unwrap();
    assert_eq!(personal_key.sign, Polarity::Negative);
    assert_eq!(personal_key.occurrence_count, 4);
    assert!(personal_key.history.len() >= 4);
}

#[tokio::test]
async fn self_loops_always_drop() {
    let engine = engine_with_rules(vec![]);
    let e = edge("loop", "Inflation", "Inflation", Polarity::Positive, 0.9);
    let outcome = engine.ingest(&e, &entities(&["Inflation"])).await.unwrap();
    assert_eq!(
        outcome.validation.destination,
        ValidationDestination::DropLog
    );
    assert!(outcome.domain.is_none());
    assert!(outcome.personal.is_none());
    assert_eq!(engine.drop_log().len(), 1);
    assert!(engine.drop_log()[0]
        .rejection_codes
        .contains(&"self_loop_detected".to_string()));
}

#[tokio::test]
async fn full_ingest_respects_the_suspect_gate() {
    // Driven through real validation, a static contradiction is caught at
    // the sign stage and never reaches the Domain pipeline at all.
    let engine = engine_with_rules(vec![funds_rate_rule()]);
    let e = edge(
        "e1",
        "Federal_Funds_Rate",
        "US_10Y_Treasury",
        Polarity::Positive,
        0.9,
    );
    let outcome = engine
        .ingest(&e, &entities(&["Federal_Funds_Rate", "US_10Y_Treasury"]))
        .await
        .unwrap();

    assert_eq!(
        outcome.validation.destination,
        ValidationDestination::DropLog
    );
    assert!(outcome
        .validation
        .rejection_codes
        .iter()
        .any(|c| c.starts_with("sign_tag:suspect")));
}

#[tokio::test]
async fn batch_ingest_wraps_everything_in_one_transaction() {
    let engine = engine_with_rules(vec![]);
    let resolved = entities(&["Inflation", "Gold_Price"]);
    let edges: Vec<RawEdge> = (0..3)
        .map(|i| {
            edge(
                &format!("b{i}"),
                "Inflation",
                "Gold_Price",
                Polarity::Positive,
                0.9,
            )
        })
        .collect();

    let outcomes = engine.ingest_batch(&edges, &resolved).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(engine.stats().transactions.committed, 1);
}
