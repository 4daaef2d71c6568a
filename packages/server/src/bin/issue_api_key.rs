use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use atelier::auth::{BLOG_INGEST_SCOPE, MEDIA_SCOPE};
use atelier::auth::keys::generate_api_key;
use atelier::config::AppConfig;
use atelier::entity::api_key;

/// Create an API key and print the raw value once.
#[derive(Parser, Debug)]
#[command(name = "issue-api-key", version)]
struct Args {
    /// Human-readable label, e.g. the publishing tool using the key.
    #[arg(long)]
    name: String,

    /// Capability granted to the key.
    #[arg(long, default_value = BLOG_INGEST_SCOPE, value_parser = [BLOG_INGEST_SCOPE, MEDIA_SCOPE])]
    scope: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let config = AppConfig::load().context("Failed to load config")?;
    let db = atelier::database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;

    let issued = generate_api_key();
    let row = api_key::ActiveModel {
        id: Set(Uuid::now_v7()),
        name: Set(args.name.clone()),
        key_hash: Set(issued.hash),
        scope: Set(args.scope.clone()),
        active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .context("Failed to store API key")?;

    println!("id:    {}", row.id);
    println!("name:  {}", row.name);
    println!("scope: {}", row.scope);
    println!("key:   {}", issued.raw);
    eprintln!("Store the key now; only its hash is kept.");

    Ok(())
}
