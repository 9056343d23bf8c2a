use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use catalog_backend_client::InMemoryStarredEntities;
use catalog_backend_client::StaticPermissions;
use catalog_protocol::EntityRef;
use catalog_scaffolder::TASK_CREATE_PERMISSION;
use catalog_scaffolder::TemplateCard;
use catalog_scaffolder::TemplateCardOptions;
use owo_colors::OwoColorize;

const TEMPLATE_KIND: &str = "template";

#[derive(Debug, clap::Parser)]
pub struct TemplatesArgs {
    /// Catalog export: a JSON array of entities or `{"items": [...]}`.
    #[arg(long, value_name = "FILE")]
    pub entities: PathBuf,

    /// Grant the task-create permission so cards offer "Choose".
    #[arg(long)]
    pub can_create: bool,

    /// Template the user has starred. Repeatable.
    #[arg(long, value_name = "REF")]
    pub starred: Vec<String>,

    /// Print the cards as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: TemplatesArgs) -> Result<()> {
    let permissions = if args.can_create {
        StaticPermissions::granting([TASK_CREATE_PERMISSION])
    } else {
        StaticPermissions::default()
    };
    let favorites = args
        .starred
        .iter()
        .map(|raw| {
            EntityRef::parse_with_default_kind(raw, TEMPLATE_KIND)
                .with_context(|| format!("invalid entity reference {raw:?}"))
        })
        .collect::<Result<Vec<_>>>()
        .map(InMemoryStarredEntities::new)?;

    let mut cards = Vec::new();
    for entity in crate::read_entities(&args.entities)? {
        if !entity.kind.eq_ignore_ascii_case(TEMPLATE_KIND) {
            continue;
        }
        let card = TemplateCard::resolve(
            entity,
            &permissions,
            &favorites,
            TemplateCardOptions::default(),
        )
        .await;
        cards.push(card);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }
    if cards.is_empty() {
        println!("No templates found.");
        return Ok(());
    }
    for card in &cards {
        print!("{}", render(card));
    }
    Ok(())
}

fn render(card: &TemplateCard) -> String {
    let mut out = String::new();
    let star = if card.starred { "★" } else { "☆" };
    match &card.template_type {
        Some(template_type) => {
            let _ = writeln!(out, "{}  {}", template_type.dimmed(), star.yellow());
        }
        None => {
            let _ = writeln!(out, "{}", star.yellow());
        }
    }
    let _ = writeln!(out, "{}", card.title.bold());
    let dates: Vec<String> = [("Created", card.created_at), ("Updated", card.updated_at)]
        .into_iter()
        .filter_map(|(label, date)| date.map(|date| format!("{label}: {date}")))
        .collect();
    if !dates.is_empty() {
        let _ = writeln!(out, "{}", dates.join("  "));
    }
    let _ = writeln!(out, "{}", card.description);
    if card.sections.default_divider {
        let _ = writeln!(out, "{}", "---".dimmed());
    }
    if card.sections.tags_divider {
        let _ = writeln!(out, "{}", "--- tags".dimmed());
        let _ = writeln!(out, "{}", card.tags.join(" "));
    }
    if card.sections.links_divider {
        let _ = writeln!(out, "{}", "--- links".dimmed());
        for link in &card.links {
            let _ = writeln!(out, "[{}] {} <{}>", link.icon, link.text, link.url);
        }
    }
    let owners = card.owner_labels();
    if !owners.is_empty() {
        let _ = writeln!(out, "Owned by {}", owners.join(", "));
    }
    if card.can_choose {
        let _ = writeln!(out, "{}", "[Choose]".green());
    }
    let _ = writeln!(out);
    out
}
