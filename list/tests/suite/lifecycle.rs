use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use catalog_filter::FacetRegistration;
use catalog_list::ListConfig;
use catalog_list::ListController;
use catalog_list::ListPhase;
use catalog_list::QueryFailure;
use catalog_list::QueryState;
use catalog_protocol::FacetId;
use catalog_test_support::ScriptedCatalog;
use catalog_test_support::owned_fixture;
use catalog_test_support::wait_for_snapshot;
use pretty_assertions::assert_eq;

fn controller(catalog: &Arc<ScriptedCatalog>, config: ListConfig) -> ListController {
    ListController::builder(catalog.clone())
        .config(config)
        .register(FacetRegistration::new(FacetId::Kind).initial("component"))
        .register(FacetRegistration::new(FacetId::Lifecycle))
        .build()
}

#[tokio::test]
async fn phases_follow_requests() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = controller(&catalog, ListConfig::default());
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    let _subscription = controller.subscribe(move |snapshot| {
        sink.lock().unwrap().push(snapshot.phase);
    });
    assert_eq!(controller.snapshot().phase, ListPhase::Uninitialized);

    controller.start().await;
    let first = catalog.next_query().await?;
    catalog.respond(first.request_id, owned_fixture())?;
    wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let second = catalog.next_query().await?;
    catalog.fail(second.request_id, "catalog is down")?;
    wait_for_snapshot(&controller, |s| s.phase == ListPhase::Error).await?;

    controller.set_facet(FacetId::Lifecycle, ["experimental"]);
    let third = catalog.next_query().await?;
    catalog.respond(third.request_id, owned_fixture())?;
    wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;

    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            ListPhase::Loading,
            ListPhase::Ready,
            ListPhase::Loading,
            ListPhase::Error,
            ListPhase::Loading,
            ListPhase::Ready,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failure_keeps_previous_entities_visible() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = controller(&catalog, ListConfig::default());
    controller.start().await;
    let first = catalog.next_query().await?;
    catalog.respond(first.request_id, owned_fixture())?;
    let ready = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let second = catalog.next_query().await?;
    catalog.fail(second.request_id, "catalog is down")?;
    let failed = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Error).await?;

    assert!(Arc::ptr_eq(&ready.entities, &failed.entities));
    assert_eq!(failed.entities.len(), 7);
    assert_eq!(
        failed.error,
        Some(QueryFailure::Backend(
            "catalog backend error: catalog is down".to_string()
        ))
    );
    assert!(matches!(
        failed.query_state,
        QueryState::Error { request_id, .. } if request_id == second.request_id
    ));
    Ok(())
}

#[tokio::test]
async fn first_failure_shows_no_entities_and_retry_recovers() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = controller(&catalog, ListConfig::default());
    controller.start().await;
    let first = catalog.next_query().await?;
    catalog.fail(first.request_id, "catalog is down")?;
    let failed = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Error).await?;
    assert!(failed.entities.is_empty());

    controller.retry();
    let second = catalog.next_query().await?;
    assert_eq!(second.filter, first.filter);
    assert!(second.request_id > first.request_id);
    catalog.respond(second.request_id, owned_fixture())?;

    let ready = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;
    assert_eq!(ready.error, None);
    assert_eq!(ready.entities.len(), 7);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_times_out() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = controller(
        &catalog,
        ListConfig {
            debounce_ms: 100,
            request_timeout_ms: 1_000,
        },
    );
    controller.start().await;
    let first = catalog.next_query().await?;

    let failed = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Error).await?;

    assert_eq!(failed.error, Some(QueryFailure::Timeout(1_000)));
    assert!(matches!(
        failed.query_state,
        QueryState::Error { request_id, .. } if request_id == first.request_id
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn superseded_request_never_times_out() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = controller(
        &catalog,
        ListConfig {
            debounce_ms: 100,
            request_timeout_ms: 1_000,
        },
    );
    controller.start().await;
    let _first = catalog.next_query().await?;
    tokio::time::sleep(Duration::from_millis(600)).await;

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let second = catalog.next_query().await?;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(controller.snapshot().phase, ListPhase::Loading);

    catalog.respond(second.request_id, owned_fixture())?;
    let ready = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;
    assert_eq!(ready.error, None);
    Ok(())
}
