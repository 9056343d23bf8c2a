use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use catalog_backend_client::InMemoryCatalog;
use catalog_backend_client::InMemoryCatalogConfig;
use catalog_backend_client::InMemoryStarredEntities;
use catalog_backend_client::Identity;
use catalog_backend_client::StaticIdentity;
use catalog_list::CatalogPageConfig;
use catalog_list::ListController;
use catalog_list::ListPhase;
use catalog_list::ListScope;
use catalog_list::ListSnapshot;
use catalog_list::page::SUPPORT_TEXT;
use catalog_protocol::DEFAULT_OWNER_KIND;
use catalog_protocol::EntityRef;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use owo_colors::OwoColorize;
use tracing::info;

#[derive(Debug, clap::Parser)]
pub struct ListArgs {
    /// Catalog export: a JSON array of entities or `{"items": [...]}`.
    #[arg(long, value_name = "FILE")]
    pub entities: PathBuf,

    /// Page layout in TOML.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Signed-in user, e.g. `jdoe` or `user:default/jdoe`.
    #[arg(long, value_name = "REF")]
    pub user: Option<String>,

    /// Group the user belongs to. Repeatable.
    #[arg(long = "owner-group", value_name = "REF")]
    pub owner_groups: Vec<String>,

    /// Entity the user has starred. Repeatable.
    #[arg(long, value_name = "REF")]
    pub starred: Vec<String>,

    /// Kind to list instead of the configured one.
    #[arg(long)]
    pub kind: Option<String>,

    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    #[arg(long = "lifecycle", value_name = "LIFECYCLE")]
    pub lifecycles: Vec<String>,

    #[arg(long = "owner", value_name = "REF")]
    pub owners: Vec<String>,

    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// owned, starred or all.
    #[arg(long)]
    pub scope: Option<UserScope>,

    /// Free-text search over names, titles, descriptions and tags.
    #[arg(long)]
    pub text: Option<String>,

    /// Print the final list snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ListArgs) -> Result<()> {
    let page = match &args.config {
        Some(path) => CatalogPageConfig::load(path)
            .with_context(|| format!("failed to load page config {}", path.display()))?,
        None => CatalogPageConfig::default(),
    };
    let entities = crate::read_entities(&args.entities)?;
    info!(count = entities.len(), "loaded catalog export");

    let identity = identity(&args)?;
    let starred = args
        .starred
        .iter()
        .map(|raw| parse_ref(raw, "component"))
        .collect::<Result<Vec<_>>>()?;

    // Like the catalog backend, the export is only narrowed by kind before
    // the controller filters the rest locally, so pickers keep their
    // sibling options on the first query.
    let catalog = InMemoryCatalog::with_config(
        entities,
        InMemoryCatalogConfig {
            server_side_facets: Some(BTreeSet::from([FacetId::Kind])),
            latency_ms: 0,
        },
    );
    let controller = ListController::builder(Arc::new(catalog))
        .config(page.list.clone())
        .registrations(page.default_registrations())
        .providers(
            Arc::new(StaticIdentity::new(identity)),
            Arc::new(InMemoryStarredEntities::new(starred)),
        )
        .build();
    let scope = ListScope::new(controller);
    apply_arguments(&scope, &args);

    scope.start().await;
    let snapshot = settle(&scope).await?;
    if let Some(failure) = &snapshot.error {
        bail!("catalog query failed: {failure}");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    } else {
        print!("{}", render(&page, &snapshot));
    }
    Ok(())
}

fn identity(args: &ListArgs) -> Result<Identity> {
    let Some(user) = &args.user else {
        if !args.owner_groups.is_empty() {
            bail!("--owner-group requires --user");
        }
        return Ok(Identity::guest());
    };
    let groups = args
        .owner_groups
        .iter()
        .map(|raw| parse_ref(raw, DEFAULT_OWNER_KIND))
        .collect::<Result<Vec<_>>>()?;
    Ok(Identity::user(parse_ref(user, "user")?).with_groups(groups))
}

fn parse_ref(raw: &str, default_kind: &str) -> Result<EntityRef> {
    EntityRef::parse_with_default_kind(raw, default_kind)
        .with_context(|| format!("invalid entity reference {raw:?}"))
}

/// Facets are set before `start`, so the first query already carries all of
/// them.
fn apply_arguments(controller: &ListController, args: &ListArgs) {
    if let Some(kind) = &args.kind {
        controller.set_facet(FacetId::Kind, kind.as_str());
    }
    if let Some(scope) = args.scope {
        controller.set_facet(FacetId::User, scope);
    }
    let repeated = [
        (FacetId::Type, &args.types),
        (FacetId::Lifecycle, &args.lifecycles),
        (FacetId::Owner, &args.owners),
        (FacetId::Tag, &args.tags),
    ];
    for (id, values) in repeated {
        if !values.is_empty() {
            controller.set_facet(id, values.clone());
        }
    }
    if let Some(text) = &args.text {
        controller.set_facet(FacetId::Text, text.as_str());
    }
}

async fn settle(controller: &ListController) -> Result<Arc<ListSnapshot>> {
    let mut snapshots = controller.watch();
    let snapshot = snapshots
        .wait_for(|snapshot| matches!(snapshot.phase, ListPhase::Ready | ListPhase::Error))
        .await
        .context("catalog list closed before the query settled")?;
    Ok(snapshot.clone())
}

fn render(page: &CatalogPageConfig, snapshot: &ListSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", page.title().bold());
    let _ = writeln!(out, "{}", SUPPORT_TEXT.dimmed());
    let _ = writeln!(out);

    if snapshot.entities.is_empty() {
        let _ = writeln!(out, "No entities match the current filters.");
    }
    for entity in snapshot.entities.iter() {
        let owners: Vec<String> = entity
            .owner_refs()
            .iter()
            .map(|owner| owner.humanize(Some(DEFAULT_OWNER_KIND)))
            .collect();
        let _ = writeln!(
            out,
            "{}  {}  {}  {}",
            entity.display_title().cyan(),
            entity.spec_type().unwrap_or("-"),
            entity.lifecycle().unwrap_or("-"),
            if owners.is_empty() {
                "-".to_string()
            } else {
                owners.join(", ")
            },
        );
    }

    let _ = writeln!(out);
    for facet in snapshot.facets.iter().filter(|facet| !facet.hidden) {
        let Some(options) = snapshot.options(facet.id) else {
            continue;
        };
        let mut rendered: Vec<String> = options
            .available
            .iter()
            .map(|option| {
                let marker = if options.selected.contains(&option.value) {
                    "*"
                } else {
                    ""
                };
                match option.count {
                    Some(count) => format!("{marker}{} ({count})", option.value),
                    None => format!("{marker}{}", option.value),
                }
            })
            .collect();
        rendered.extend(
            options
                .unavailable_selected
                .iter()
                .map(|value| format!("*{value} (0)")),
        );
        if !rendered.is_empty() {
            let _ = writeln!(out, "{}: {}", facet.id.dimmed(), rendered.join(", "));
        }
    }
    let _ = writeln!(out, "{} entities", snapshot.entities.len());
    out
}
