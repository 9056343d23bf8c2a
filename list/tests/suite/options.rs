use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_backend_client::Identity;
use catalog_backend_client::InMemoryCatalog;
use catalog_backend_client::InMemoryCatalogConfig;
use catalog_backend_client::InMemoryStarredEntities;
use catalog_backend_client::StaticIdentity;
use catalog_filter::FacetOption;
use catalog_filter::FacetRegistration;
use catalog_filter::FacetValue;
use catalog_filter::UserContext;
use catalog_list::CatalogPageConfig;
use catalog_list::ListController;
use catalog_list::ListPhase;
use catalog_list::ListSnapshot;
use catalog_protocol::Entity;
use catalog_protocol::EntityRef;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use catalog_test_support::jdoe;
use catalog_test_support::owned_fixture;
use catalog_test_support::team_a;
use catalog_test_support::wait_for_snapshot;
use pretty_assertions::assert_eq;

fn names(snapshot: &ListSnapshot) -> BTreeSet<String> {
    snapshot
        .entities
        .iter()
        .map(|entity| entity.metadata.name.clone())
        .collect()
}

fn page_controller(catalog: Arc<InMemoryCatalog>) -> ListController {
    ListController::builder(catalog)
        .registrations(CatalogPageConfig::default().default_registrations())
        .user_context(UserContext::new(jdoe()).with_ownership_refs([team_a()]))
        .build()
}

async fn settled_after(
    controller: &ListController,
    version: u64,
) -> anyhow::Result<Arc<ListSnapshot>> {
    wait_for_snapshot(controller, |s| {
        s.version > version && s.phase == ListPhase::Ready
    })
    .await
}

fn option(value: &str, count: usize) -> FacetOption {
    FacetOption {
        value: value.to_string(),
        count: Some(count),
    }
}

fn uncounted(value: &str) -> FacetOption {
    FacetOption {
        value: value.to_string(),
        count: None,
    }
}

#[tokio::test]
async fn owned_list_narrows_by_lifecycle() -> anyhow::Result<()> {
    let catalog = Arc::new(InMemoryCatalog::new(owned_fixture()));
    let controller = page_controller(catalog);
    controller.start().await;

    let owned = settled_after(&controller, 0).await?;
    assert_eq!(owned.entities.len(), 5);
    let lifecycle = owned
        .options(FacetId::Lifecycle)
        .map(|options| options.available.clone());
    assert_eq!(
        lifecycle,
        Some(vec![option("production", 3), option("experimental", 2)])
    );

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let production = settled_after(&controller, owned.version).await?;

    assert_eq!(
        names(&production),
        BTreeSet::from([
            "billing".to_string(),
            "invoices".to_string(),
            "ledger".to_string()
        ])
    );
    let owners = production
        .options(FacetId::Owner)
        .map(|options| options.available.clone());
    assert_eq!(
        owners,
        Some(vec![
            option("user:default/jdoe", 2),
            option("group:default/team-a", 1),
        ])
    );
    // The lifecycle picker keeps offering its siblings.
    assert_eq!(
        production
            .options(FacetId::Lifecycle)
            .map(|options| options.available_values().len()),
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn hidden_kind_facet_still_filters() -> anyhow::Result<()> {
    let mut entities = owned_fixture();
    entities.push(
        Entity::new("API", "ledger-api")
            .with_relation(catalog_protocol::RELATION_OWNED_BY, "user:default/jdoe"),
    );
    let controller = page_controller(Arc::new(InMemoryCatalog::new(entities)));
    controller.start().await;

    let snapshot = settled_after(&controller, 0).await?;

    assert_eq!(snapshot.facet(FacetId::Kind).map(|f| f.hidden), Some(true));
    assert!(!names(&snapshot).contains("ledger-api"));
    Ok(())
}

#[tokio::test]
async fn pruned_selection_is_retained() -> anyhow::Result<()> {
    let controller = page_controller(Arc::new(InMemoryCatalog::new(owned_fixture())));
    controller.start().await;
    let started = settled_after(&controller, 0).await?;

    controller.set_facet(FacetId::Tag, ["alpha"]);
    let tagged = settled_after(&controller, started.version).await?;
    assert_eq!(
        names(&tagged),
        BTreeSet::from(["prototype".to_string(), "sandbox".to_string()])
    );

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let narrowed = settled_after(&controller, tagged.version).await?;

    assert!(narrowed.entities.is_empty());
    assert_eq!(
        narrowed.facet(FacetId::Tag).map(|f| f.value.clone()),
        Some(FacetValue::from(["alpha"]).normalize(FacetId::Tag)?)
    );
    let tags = narrowed.options(FacetId::Tag).cloned().unwrap_or_default();
    assert!(!tags.is_available("alpha"));
    assert_eq!(tags.selected, BTreeSet::from(["alpha".to_string()]));
    assert_eq!(tags.unavailable_selected, BTreeSet::from(["alpha".to_string()]));
    Ok(())
}

#[tokio::test]
async fn tags_or_within_and_across_facets() -> anyhow::Result<()> {
    let entities = vec![
        Entity::new("Component", "e1")
            .with_tags(["a", "b"])
            .with_spec("lifecycle", "production"),
        Entity::new("Component", "e2").with_tags(["c"]),
        Entity::new("Component", "e3").with_tags(["a"]),
    ];
    let controller = ListController::builder(Arc::new(InMemoryCatalog::new(entities)))
        .register(FacetRegistration::new(FacetId::Tag))
        .register(FacetRegistration::new(FacetId::Lifecycle))
        .build();
    controller.start().await;
    let all = settled_after(&controller, 0).await?;
    assert_eq!(all.entities.len(), 3);

    controller.set_facet(FacetId::Tag, ["a", "b"]);
    let tagged = settled_after(&controller, all.version).await?;
    assert_eq!(
        names(&tagged),
        BTreeSet::from(["e1".to_string(), "e3".to_string()])
    );

    controller.set_facet(FacetId::Lifecycle, ["production"]);
    let narrowed = settled_after(&controller, tagged.version).await?;
    assert_eq!(names(&narrowed), BTreeSet::from(["e1".to_string()]));
    Ok(())
}

#[tokio::test]
async fn partially_filtered_backend_is_narrowed_locally() -> anyhow::Result<()> {
    let catalog = Arc::new(InMemoryCatalog::with_config(
        owned_fixture(),
        InMemoryCatalogConfig {
            server_side_facets: Some(BTreeSet::from([FacetId::Kind])),
            latency_ms: 0,
        },
    ));
    let controller = page_controller(catalog);
    controller.start().await;
    let owned = settled_after(&controller, 0).await?;
    assert_eq!(owned.entities.len(), 5);

    controller.set_facet(FacetId::Lifecycle, ["experimental"]);
    let experimental = settled_after(&controller, owned.version).await?;

    assert_eq!(
        names(&experimental),
        BTreeSet::from(["prototype".to_string(), "sandbox".to_string()])
    );
    assert_eq!(
        experimental
            .options(FacetId::Lifecycle)
            .map(|options| options.available.clone()),
        Some(vec![option("production", 3), option("experimental", 2)])
    );
    Ok(())
}

#[tokio::test]
async fn user_scope_options_and_starred_refresh() -> anyhow::Result<()> {
    let starred = Arc::new(InMemoryStarredEntities::default());
    let controller = ListController::builder(Arc::new(InMemoryCatalog::new(owned_fixture())))
        .registrations(CatalogPageConfig::default().default_registrations())
        .providers(
            Arc::new(StaticIdentity::new(
                Identity::user(jdoe()).with_groups([team_a()]),
            )),
            starred.clone(),
        )
        .build();
    controller.start().await;
    let owned = settled_after(&controller, 0).await?;
    assert_eq!(
        owned
            .options(FacetId::User)
            .map(|options| options.available.clone()),
        Some(vec![
            option("owned", 5),
            uncounted("starred"),
            uncounted("all"),
        ])
    );

    controller.set_facet(FacetId::User, UserScope::Starred);
    let none = settled_after(&controller, owned.version).await?;
    assert!(none.entities.is_empty());

    starred.toggle(&EntityRef::new("component", "default", "search")?);
    controller.refresh_user_context().await;
    let refreshed = settled_after(&controller, none.version).await?;

    assert_eq!(names(&refreshed), BTreeSet::from(["search".to_string()]));
    Ok(())
}

#[tokio::test]
async fn user_scope_counts_come_from_an_unscoped_response() -> anyhow::Result<()> {
    let controller = page_controller(Arc::new(InMemoryCatalog::new(owned_fixture())));
    controller.start().await;
    let owned = settled_after(&controller, 0).await?;
    let scopes = owned.options(FacetId::User).cloned().unwrap_or_default();
    assert_eq!(scopes.count("owned"), Some(5));
    assert_eq!(scopes.count("all"), None);

    controller.set_facet(FacetId::User, UserScope::All);
    let all = settled_after(&controller, owned.version).await?;
    assert_eq!(all.entities.len(), 7);
    assert_eq!(
        all.options(FacetId::User)
            .map(|options| options.available.clone()),
        Some(vec![
            option("owned", 5),
            option("starred", 0),
            option("all", 7),
        ])
    );

    // Switching back keeps the counts learned from the unscoped response.
    controller.set_facet(FacetId::User, UserScope::Owned);
    let back = settled_after(&controller, all.version).await?;
    assert_eq!(back.entities.len(), 5);
    assert_eq!(
        back.options(FacetId::User).and_then(|options| options.count("all")),
        Some(7)
    );
    Ok(())
}

#[tokio::test]
async fn registering_a_picker_replaces_its_facet() -> anyhow::Result<()> {
    let controller = page_controller(Arc::new(InMemoryCatalog::new(owned_fixture())));
    controller.start().await;
    let owned = settled_after(&controller, 0).await?;

    controller.register_facet(FacetRegistration::new(FacetId::User).initial(UserScope::All));
    let all = settled_after(&controller, owned.version).await?;

    assert_eq!(all.facets.len(), 6);
    assert_eq!(all.entities.len(), 7);
    assert_eq!(
        controller.facet(FacetId::User).map(|f| f.value),
        Some(FacetValue::One("all".to_string()))
    );
    Ok(())
}

#[tokio::test]
async fn invalid_scope_is_ignored() -> anyhow::Result<()> {
    let controller = page_controller(Arc::new(InMemoryCatalog::new(owned_fixture())));
    controller.start().await;
    let owned = settled_after(&controller, 0).await?;

    controller.set_facet(FacetId::User, "everything");
    controller.clear_facet(FacetId::Text);

    assert!(Arc::ptr_eq(&owned, &controller.snapshot()));
    Ok(())
}
