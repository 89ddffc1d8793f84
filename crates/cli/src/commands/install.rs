use eyre::Result;
use toolkit_client::{ClientError, ErrorCategory, Outcome};
use toolkit_types::ModuleId;

use crate::commands::modules::print_entry;
use crate::context::Context;

pub async fn handle_install(id: i64, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;
    let id = ModuleId(id);
    let Some(entry) = catalog.get(id) else {
        eprintln!("❌ No module with id {} in the catalog", id);
        return Err(ClientError::UnknownModule(id).into());
    };

    println!("📦 Installing {}", entry.module.name);
    match ctx.store.install(entry.reference).await {
        Ok(outcome) => {
            match outcome {
                Outcome::Applied => println!("✅ Installed {}", entry.module.name),
                Outcome::AlreadySatisfied => {
                    println!("⚠️ {} is already installed", entry.module.name)
                }
                Outcome::Local => println!(
                    "✅ Installed {} (demo module, kept on this device only)",
                    entry.module.name
                ),
                Outcome::Superseded => println!("⚠️ A newer request for this module took over"),
            }
            Ok(())
        }
        Err(e) => {
            report_failure("install", &e, ctx).await?;
            Err(e.into())
        }
    }
}

pub async fn handle_uninstall(id: i64, ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;
    let id = ModuleId(id);
    let Some(entry) = catalog.get(id) else {
        eprintln!("❌ No module with id {} in the catalog", id);
        return Err(ClientError::UnknownModule(id).into());
    };

    println!("🗑️ Uninstalling {}", entry.module.name);
    match ctx.store.uninstall(entry.reference).await {
        Ok(Outcome::AlreadySatisfied) => {
            println!("⚠️ {} is not installed", entry.module.name);
            Ok(())
        }
        Ok(Outcome::Superseded) => {
            println!("⚠️ A newer request for this module took over");
            Ok(())
        }
        Ok(_) => {
            println!("✅ Uninstalled {}", entry.module.name);
            Ok(())
        }
        Err(e) => {
            report_failure("uninstall", &e, ctx).await?;
            Err(e.into())
        }
    }
}

pub async fn handle_installed(ctx: &Context) -> Result<()> {
    let catalog = ctx.catalog().await;
    let installed = ctx.store.installed().await;

    if installed.is_empty() {
        println!("📦 No modules installed");
        println!("💡 Use 'toolkit modules list' to browse the catalog");
        return Ok(());
    }

    println!("📦 Installed modules ({}):", installed.len());
    for entry in catalog.installed(&ctx.store).await {
        print_entry(entry, true);
    }
    for id in installed.iter().filter(|id| catalog.get(**id).is_none()) {
        println!("  ✅ {:>4}  (not in the current catalog)", id.get());
    }
    if !ctx.store.is_authenticated().await {
        println!("💡 Showing the locally cached set; sign in to see your account's modules");
    }
    Ok(())
}

async fn report_failure(action: &str, err: &ClientError, ctx: &Context) -> Result<()> {
    eprintln!("❌ Failed to {} ({}): {}", action, err.category(), err);
    if err.category() == ErrorCategory::Unauthenticated {
        ctx.sync_session().await?;
        println!("💡 Use 'toolkit login <username>' to sign in");
    }
    Ok(())
}
