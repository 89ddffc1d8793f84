use eyre::Result;
use toolkit_client::{CatalogEntry, ClientError};
use toolkit_types::{Category, ModuleId};

use crate::cli::ModuleCommands;
use crate::context::Context;

pub async fn handle_module_command(cmd: ModuleCommands, ctx: &Context) -> Result<()> {
    match cmd {
        ModuleCommands::List { category } => handle_list_modules(category, ctx).await,
        ModuleCommands::Search { query } => handle_search_modules(query, ctx).await,
        ModuleCommands::Show { id } => handle_show_module(id, ctx).await,
    }
}

async fn handle_list_modules(category: Option<String>, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;

    let entries: Vec<&CatalogEntry> = match category {
        Some(name) => {
            let category: Category = name.parse()?;
            catalog.by_category(category)
        }
        None => catalog.entries().iter().collect(),
    };

    if entries.is_empty() {
        println!("📦 No modules found");
        return Ok(());
    }

    println!("📦 Modules ({}):", entries.len());
    for entry in entries {
        print_entry(entry, ctx.store.is_installed(entry.module.id).await);
    }
    Ok(())
}

async fn handle_search_modules(query: String, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;
    let hits = catalog.search(&query);

    if hits.is_empty() {
        println!("🔍 No modules match '{}'", query);
        return Ok(());
    }

    println!("🔍 {} result(s) for '{}':", hits.len(), query);
    for entry in hits {
        print_entry(entry, ctx.store.is_installed(entry.module.id).await);
    }
    Ok(())
}

async fn handle_show_module(id: i64, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;
    let id = ModuleId(id);
    let entry = catalog.get(id).ok_or(ClientError::UnknownModule(id))?;
    let module = &entry.module;

    println!("📦 {} ({})", module.name, entry.reference);
    println!("   Category: {}", module.category);
    println!("   Downloads: {}", module.downloads);
    if !module.tags.is_empty() {
        println!("   Tags: {}", module.tags.join(", "));
    }
    println!("   Updated: {}", module.updated_at.format("%Y-%m-%d %H:%M"));
    if ctx.store.is_installed(id).await {
        println!("   ✅ Installed");
    }
    println!();
    println!("{}", module.description);
    println!();
    println!("{}", module.content);
    Ok(())
}

pub(crate) fn print_entry(entry: &CatalogEntry, installed: bool) {
    let marker = if installed { "✅" } else { "  " };
    let demo = if entry.reference.is_demo() {
        " [demo]"
    } else {
        ""
    };
    println!(
        "  {} {:>4}  {} ({}, {} downloads){}",
        marker,
        entry.module.id.get(),
        entry.module.name,
        entry.module.category,
        entry.module.downloads,
        demo
    );
}
