use std::sync::Arc;
use std::time::Duration;

use catalog_filter::FacetRegistration;
use catalog_filter::FacetValue;
use catalog_filter::Predicate;
use catalog_list::ListConfig;
use catalog_list::ListController;
use catalog_list::ListPhase;
use catalog_protocol::FacetId;
use catalog_test_support::ScriptedCatalog;
use catalog_test_support::owned_fixture;
use catalog_test_support::wait_for_snapshot;
use pretty_assertions::assert_eq;

const DEBOUNCE: Duration = Duration::from_millis(200);

async fn started(catalog: &Arc<ScriptedCatalog>) -> anyhow::Result<ListController> {
    let controller = ListController::builder(catalog.clone())
        .config(ListConfig {
            debounce_ms: 200,
            request_timeout_ms: 10_000,
        })
        .register(FacetRegistration::new(FacetId::Kind).initial("component"))
        .register(FacetRegistration::new(FacetId::Lifecycle))
        .register(FacetRegistration::new(FacetId::Text))
        .build();
    controller.start().await;
    let first = catalog.next_query().await?;
    catalog.respond(first.request_id, owned_fixture())?;
    wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;
    Ok(controller)
}

#[tokio::test(start_paused = true)]
async fn keystrokes_coalesce_into_one_request() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = started(&catalog).await?;

    for text in ["l", "le", "led", "ledg"] {
        controller.set_facet(FacetId::Text, text);
        tokio::time::sleep(DEBOUNCE / 4).await;
    }
    assert_eq!(catalog.query_count(), 1);
    assert_eq!(
        controller.snapshot().facet(FacetId::Text).map(|f| f.value.clone()),
        Some(FacetValue::One("ledg".to_string()))
    );

    let query = catalog.next_query().await?;
    assert_eq!(
        query.filter.get(FacetId::Text),
        Some(&Predicate::Text(vec!["ledg".to_string()]))
    );
    catalog.respond(query.request_id, owned_fixture())?;
    let snapshot = wait_for_snapshot(&controller, |s| s.phase == ListPhase::Ready).await?;

    let names: Vec<&str> = snapshot
        .entities
        .iter()
        .map(|e| e.metadata.name.as_str())
        .collect();
    assert_eq!(names, vec!["ledger"]);
    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(catalog.query_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn click_supersedes_pending_keystrokes() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = started(&catalog).await?;

    controller.set_facet(FacetId::Text, "bill");
    controller.set_facet(FacetId::Lifecycle, ["production"]);

    let query = catalog.next_query().await?;
    assert!(query.filter.constrains(FacetId::Text));
    assert!(query.filter.constrains(FacetId::Lifecycle));

    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(catalog.query_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn text_reverted_inside_window_issues_nothing() -> anyhow::Result<()> {
    let catalog = ScriptedCatalog::new();
    let controller = started(&catalog).await?;
    let before = controller.snapshot();

    controller.set_facet(FacetId::Text, "x");
    controller.clear_facet(FacetId::Text);
    tokio::time::sleep(DEBOUNCE * 2).await;

    assert_eq!(catalog.query_count(), 1);
    let after = controller.snapshot();
    assert_eq!(after.filter, before.filter);
    assert_eq!(after.phase, ListPhase::Ready);
    Ok(())
}
