//! Pipeline behavior driven through in-memory collaborators: reference
//! resolution, access annotation, enrichment, ordering and failure policy.

mod common;

use common::*;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use tabularium::context::RequestContext;
use tabularium::error::AppError;
use tabularium::pipeline::{access, EntityPipeline, ExtraStage};
use tabularium::resolver::resolve_references;
use tabularium::store::RecordStore;

fn request_ctx(state: &tabularium::server::AppState) -> RequestContext {
    RequestContext::new(state.ctx.clone())
}

#[tokio::test]
async fn collection_member_of_stays_null() {
    let store = FakeStore::new(vec![collection("arcp://corpus", "Corpus")], vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let entity = state.ctx.store.get_entity("arcp://corpus").await.unwrap().unwrap();
    let values = state.entity_pipeline.run_all(vec![entity], &ctx).await.unwrap();
    assert_eq!(values[0]["memberOf"], Value::Null);
    assert_eq!(values[0]["rootCollection"], Value::Null);
}

#[tokio::test]
async fn dangling_reference_resolves_to_null_not_error() {
    let orphan = entity("arcp://corpus/item/1", "Item 1", Some("arcp://deleted"), Some("arcp://deleted"));
    let store = FakeStore::new(vec![orphan.clone()], vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let values = state.entity_pipeline.run_all(vec![orphan], &ctx).await.unwrap();
    assert_eq!(values[0]["memberOf"], Value::Null);
    // Not the raw identifier string either.
    assert_ne!(values[0]["rootCollection"], Value::String("arcp://deleted".into()));
    assert_eq!(values[0]["rootCollection"], Value::Null);
}

#[tokio::test]
async fn batch_resolution_is_one_store_lookup() {
    let parent = collection("arcp://corpus", "Corpus");
    let items: Vec<_> = (1..=5)
        .map(|i| {
            entity(
                &format!("arcp://corpus/item/{i}"),
                &format!("Item {i}"),
                Some("arcp://corpus"),
                Some("arcp://corpus"),
            )
        })
        .collect();
    let mut all = vec![parent];
    all.extend(items.clone());
    let store = FakeStore::new(all, vec![]);
    let state = app_state(store.clone(), FakeSearch::empty());
    let ctx = request_ctx(&state);

    let values = state.entity_pipeline.run_all(items, &ctx).await.unwrap();
    assert_eq!(values.len(), 5);
    assert_eq!(store.batched_lookups.load(std::sync::atomic::Ordering::SeqCst), 1);
    for value in &values {
        assert_eq!(value["memberOf"]["name"], "Corpus");
    }
}

#[tokio::test]
async fn empty_batch_short_circuits_without_store_round_trip() {
    let store = FakeStore::new(vec![], vec![]);
    let refs = resolve_references(store.as_ref(), &[]).await.unwrap();
    assert!(refs.is_empty());
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn run_all_preserves_input_order() {
    let ids = ["arcp://z", "arcp://a", "arcp://m"];
    let records: Vec<_> = ids.iter().map(|id| collection(id, id)).collect();
    let store = FakeStore::new(records.clone(), vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let values = state.entity_pipeline.run_all(records, &ctx).await.unwrap();
    let out: Vec<&str> = values.iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert_eq!(out, ids);
}

#[tokio::test]
async fn one_failing_record_aborts_the_whole_batch() {
    let failing: ExtraStage = Arc::new(|value: Value, _ctx: RequestContext| -> BoxFuture<'static, Result<Value, AppError>> {
        Box::pin(async move {
            if value["id"] == "arcp://bad" {
                Err(AppError::internal("enrichment failed"))
            } else {
                Ok(value)
            }
        })
    });
    let pipeline = EntityPipeline::new(access::open_entity_stage()).with_extra(failing);

    let records = vec![collection("arcp://good", "Good"), collection("arcp://bad", "Bad")];
    let store = FakeStore::new(records.clone(), vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let result = pipeline.run_all(records, &ctx).await;
    assert!(result.is_err(), "partial results must never be returned");
}

#[tokio::test]
async fn access_block_reflects_license_policy() {
    let mut open = entity("arcp://corpus/item/open", "Open", None, None);
    open.metadata_license_id = Some(OPEN_LICENSE.to_string());
    open.content_license_id = Some(RESTRICTED_LICENSE.to_string());
    let store = FakeStore::new(vec![open.clone()], vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let values = state.entity_pipeline.run_all(vec![open], &ctx).await.unwrap();
    assert_eq!(values[0]["access"]["metadata"], true);
    assert_eq!(values[0]["access"]["content"], false);
    assert_eq!(
        values[0]["access"]["contentAuthorizationUrl"],
        "https://example.org/authorize"
    );
}

#[tokio::test]
async fn links_enrichment_runs_after_access() {
    let parent = collection("arcp://corpus", "Corpus");
    let item = entity("arcp://corpus/item/1", "Item 1", Some("arcp://corpus"), Some("arcp://corpus"));
    let store = FakeStore::new(vec![parent, item.clone()], vec![]);
    let state = app_state(store, FakeSearch::empty());
    let ctx = request_ctx(&state);

    let values = state.entity_pipeline.run_all(vec![item], &ctx).await.unwrap();
    let links = &values[0]["links"];
    assert_eq!(links["self"], "http://api.test/entity/arcp%3A%2F%2Fcorpus%2Fitem%2F1");
    assert_eq!(
        links["rocrate"],
        "http://api.test/entity/arcp%3A%2F%2Fcorpus%2Fitem%2F1/rocrate"
    );
    assert_eq!(links["memberOf"], "http://api.test/entity/arcp%3A%2F%2Fcorpus");
}

#[test]
fn setup_without_resolvable_access_policy_fails() {
    let mut config = test_config();
    config.access_policy = "nonsense".to_string();
    let store = FakeStore::new(vec![], vec![]);
    let ctx = Arc::new(tabularium::context::AppContext {
        store,
        search: FakeSearch::empty(),
        config,
    });
    let err = tabularium::server::build_state(ctx).err().expect("must fail at setup time");
    assert_eq!(err.code_str(), "INTERNAL_ERROR");
}
