use eyre::Result;
use std::io::{self, Write};

use crate::context::Context;

pub async fn handle_login(username: String, password: Option<String>, ctx: &Context) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    match ctx.store.login(&username, &password).await {
        Ok(user) => {
            ctx.sync_session().await?;
            println!("✅ Signed in as {}", user.username);
            println!("📦 {} module(s) installed", user.installed_modules.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Login failed ({}): {}", e.category(), e);
            Err(e.into())
        }
    }
}

pub async fn handle_register(
    username: String,
    email: String,
    password: Option<String>,
    ctx: &Context,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Choose a password: ")?,
    };

    match ctx.store.register(&username, &email, &password).await {
        Ok(user) => {
            ctx.sync_session().await?;
            println!("✅ Account {} created and signed in", user.username);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Registration failed ({}): {}", e.category(), e);
            Err(e.into())
        }
    }
}

pub async fn handle_logout(ctx: &Context) -> Result<()> {
    if !ctx.store.is_authenticated().await {
        println!("⚠️ Not signed in");
    }
    ctx.store.logout().await;
    ctx.sync_session().await?;
    println!("👋 Signed out");
    Ok(())
}

pub async fn handle_whoami(ctx: &Context) -> Result<()> {
    match ctx.store.session().await {
        Some(user) => {
            println!("👤 {} <{}>", user.username, user.email);
            if let Some(created_at) = user.created_at {
                println!("   Member since {}", created_at.format("%Y-%m-%d"));
            }
            println!("📦 {} module(s) installed", ctx.store.installed().await.len());
        }
        None => {
            println!("👤 Not signed in");
            println!("💡 Use 'toolkit login <username>' to sign in");
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
