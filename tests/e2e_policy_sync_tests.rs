//! End-to-end tests for policy model synchronization
//!
//! The synchronizer talks HTTP to a fake policy engine and stores into an
//! on-disk SQLite database.
//!
//! Note: FakePolicyEngine answers 404 to every path that was not scripted.

mod common;

use clamp_policy_sync::config::{PolicyEngineSettings, SyncSettings};
use clamp_policy_sync::policy_models::PolicyModelId;
use clamp_policy_sync::sync::{MicroServiceModelRef, SyncFailureReason};
use common::*;

fn engine_settings() -> PolicyEngineSettings {
    PolicyEngineSettings {
        timeout_sec: 5,
        ..Default::default()
    }
}

fn sync_settings(record_failed_fetches: bool) -> SyncSettings {
    SyncSettings {
        worker_threads: 2,
        record_failed_fetches,
        ..Default::default()
    }
}

fn serve_both_models(engine: &FakePolicyEngine) {
    engine
        .respond(LIST_ALL_PATH, vec![(200, LIST_ALL_DOCUMENT)])
        .respond(TCA_MODEL_PATH, vec![(200, TCA_MODEL)])
        .respond(OPERATIONAL_MODEL_PATH, vec![(200, OPERATIONAL_MODEL)]);
}

fn tca_id() -> PolicyModelId {
    PolicyModelId::new(TCA_TYPE, MODEL_VERSION)
}

fn operational_id() -> PolicyModelId {
    PolicyModelId::new(OPERATIONAL_TYPE, MODEL_VERSION)
}

#[test]
fn test_sync_stores_every_listed_policy_type() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    let db = TestDatabase::new();
    let store = db.open();

    let synchronizer = build_synchronizer(
        &engine.base_url,
        store.clone(),
        engine_settings(),
        sync_settings(true),
    );
    let report = synchronizer.synchronize_all();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    assert_eq!(report.inserted, vec![operational_id(), tca_id()]);
    assert_eq!(store.count().unwrap(), 2);

    let tca = store.get(&tca_id()).unwrap().unwrap();
    assert_eq!(tca.model.definition, TCA_MODEL);
    let operational = store.get(&operational_id()).unwrap().unwrap();
    assert_eq!(operational.model.definition, OPERATIONAL_MODEL);
}

#[test]
fn test_second_pass_never_updates_stored_models() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    let db = TestDatabase::new();

    let first = build_synchronizer(&engine.base_url, db.open(), engine_settings(), sync_settings(true));
    assert_eq!(first.synchronize_all().inserted.len(), 2);

    // The engine now serves a different definition for the same key
    engine.respond(TCA_MODEL_PATH, vec![(200, "changed: true\n")]);

    let store = db.open();
    let second = build_synchronizer(&engine.base_url, store.clone(), engine_settings(), sync_settings(true));
    let report = second.synchronize_all();

    assert!(report.inserted.is_empty());
    assert_eq!(report.already_present, vec![operational_id(), tca_id()]);
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.get(&tca_id()).unwrap().unwrap().model.definition, TCA_MODEL);
}

#[test]
fn test_empty_document_changes_nothing() {
    let engine = FakePolicyEngine::spawn();
    engine.respond(LIST_ALL_PATH, vec![(200, "{}")]);
    let db = TestDatabase::new();
    let store = db.open();

    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), engine_settings(), sync_settings(true));
    let report = synchronizer.synchronize_all();

    assert!(report.skipped_reason.is_some());
    assert!(report.failures.is_empty());
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(engine.requests().len(), 1);
}

#[test]
fn test_list_retried_until_available() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    engine.respond(
        LIST_ALL_PATH,
        vec![(503, ""), (503, ""), (200, LIST_ALL_DOCUMENT)],
    );
    let db = TestDatabase::new();
    let store = db.open();

    let settings = PolicyEngineSettings {
        retry_interval_ms: 10,
        retry_limit: 3,
        ..engine_settings()
    };
    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), settings, sync_settings(true));
    let report = synchronizer.synchronize_all();

    assert_eq!(engine.requests_to(LIST_ALL_PATH), 3);
    assert_eq!(report.inserted.len(), 2);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_list_unavailable_is_nothing_to_do() {
    let engine = FakePolicyEngine::spawn();
    engine.respond(LIST_ALL_PATH, vec![(503, "")]);
    let db = TestDatabase::new();
    let store = db.open();

    let settings = PolicyEngineSettings {
        retry_limit: 2,
        ..engine_settings()
    };
    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), settings, sync_settings(true));
    let report = synchronizer.synchronize_all();

    assert_eq!(engine.requests_to(LIST_ALL_PATH), 2);
    assert!(report.skipped_reason.is_some());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_failed_model_fetch_recorded_with_empty_definition() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    engine.respond(TCA_MODEL_PATH, vec![(500, "boom")]);
    let db = TestDatabase::new();
    let store = db.open();

    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), engine_settings(), sync_settings(true));
    let report = synchronizer.synchronize_all();

    assert_eq!(report.inserted, vec![operational_id(), tca_id()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].policy_type.as_deref(), Some(TCA_TYPE));
    assert!(matches!(report.failures[0].reason, SyncFailureReason::Fetch(_)));
    assert_eq!(store.get(&tca_id()).unwrap().unwrap().model.definition, "");
}

#[test]
fn test_failed_model_fetch_not_recorded() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    engine.respond(TCA_MODEL_PATH, vec![(500, "boom")]);
    let db = TestDatabase::new();
    let store = db.open();

    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), engine_settings(), sync_settings(false));
    let report = synchronizer.synchronize_all();

    assert_eq!(report.inserted, vec![operational_id()]);
    assert_eq!(report.failures.len(), 1);
    assert!(store.get(&tca_id()).unwrap().is_none());

    // A later pass picks the model up once the engine serves it
    engine.respond(TCA_MODEL_PATH, vec![(200, TCA_MODEL)]);
    let report = synchronizer.synchronize_all();
    assert_eq!(report.inserted, vec![tca_id()]);
    assert_eq!(store.get(&tca_id()).unwrap().unwrap().model.definition, TCA_MODEL);
}

#[test]
fn test_requests_carry_accept_and_basic_auth() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    let db = TestDatabase::new();

    let settings = PolicyEngineSettings {
        user: Some(POLICY_USER.to_string()),
        password: Some(POLICY_PASSWORD.to_string()),
        ..engine_settings()
    };
    let synchronizer = build_synchronizer(&engine.base_url, db.open(), settings, sync_settings(true));
    synchronizer.synchronize_all();

    let requests = engine.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request.method, "GET");
        assert_eq!(request.header("Accept"), Some("application/yaml"));
        assert_eq!(request.header("Authorization"), Some(POLICY_BASIC_AUTH));
    }

    let mut paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec![LIST_ALL_PATH, OPERATIONAL_MODEL_PATH, TCA_MODEL_PATH]);
}

#[test]
fn test_no_credentials_no_authorization_header() {
    let engine = FakePolicyEngine::spawn();
    engine.respond(LIST_ALL_PATH, vec![(200, "{}")]);
    let db = TestDatabase::new();

    let synchronizer =
        build_synchronizer(&engine.base_url, db.open(), engine_settings(), sync_settings(true));
    synchronizer.synchronize_all();

    let requests = engine.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].header("Authorization").is_none());
}

#[test]
fn test_create_policy_model_for_microservice() {
    let engine = FakePolicyEngine::spawn();
    serve_both_models(&engine);
    let db = TestDatabase::new();

    let synchronizer =
        build_synchronizer(&engine.base_url, db.open(), engine_settings(), sync_settings(true));

    let model = synchronizer.create_policy_model_for_microservice(&MicroServiceModelRef {
        name: "tca".to_string(),
        model_type: TCA_TYPE.to_string(),
        model_version: MODEL_VERSION.to_string(),
    });
    assert_eq!(model.id(), tca_id());
    assert_eq!(model.definition, TCA_MODEL);

    // Unknown model: the engine answers 404, the definition stays empty
    let missing = synchronizer.create_policy_model_from_engine("onap.policies.Unknown", "2.0.0");
    assert_eq!(missing.policy_type, "onap.policies.Unknown");
    assert_eq!(missing.version, "2.0.0");
    assert_eq!(missing.definition, "");
}

#[test]
fn test_synchronize_one_stores_empty_model_body() {
    let engine = FakePolicyEngine::spawn();
    engine.respond(TCA_MODEL_PATH, vec![(200, "")]);
    let db = TestDatabase::new();
    let store = db.open();

    let synchronizer =
        build_synchronizer(&engine.base_url, store.clone(), engine_settings(), sync_settings(false));
    let report = synchronizer.synchronize_one(TCA_TYPE, MODEL_VERSION);

    // An empty 200 answer is a successful download, not a failed one
    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    assert_eq!(report.inserted, vec![tca_id()]);
    assert_eq!(store.get(&tca_id()).unwrap().unwrap().model.definition, "");
    assert_eq!(engine.requests_to(TCA_MODEL_PATH), 1);

    // Unknown model: the engine answers 404 and nothing is recorded
    let missing = synchronizer.synchronize_one("onap.policies.Unknown", "2.0.0");
    assert_eq!(missing.processed(), 0);
    assert_eq!(missing.failures.len(), 1);
    assert_eq!(store.count().unwrap(), 1);
}
