use anyhow::{Context, Result};
use clap::Parser;

use advert_sync::database_ops::db::{resolve_database_url, Db};
use advert_sync::model::ReconcileRequest;
use advert_sync::util::env as env_util;

#[derive(Parser, Debug)]
#[command(
    name = "reconcile",
    version,
    about = "Materialize advert instances across target locations"
)]
struct Cli {
    /// Advert to materialize
    #[arg(long)]
    advert_id: String,

    /// Target location ids (comma separated; may be repeated)
    #[arg(long = "locations", value_delimiter = ',')]
    location_ids: Vec<String>,

    /// Database name override applied to the configured DSN
    #[arg(long)]
    database: Option<String>,

    /// Connection pool size
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::bootstrap_cli("reconcile");
    advert_sync::logging::init_tracing("info")?;

    let cli = Cli::parse();
    let request = ReconcileRequest {
        advert_id: cli.advert_id,
        location_ids: cli.location_ids,
        database_name: cli.database,
    };

    let base_url = env_util::env_req("DATABASE_URL")?;
    let database_url = resolve_database_url(&base_url, request.database_name.as_deref())?;
    let db = Db::connect(&database_url, cli.max_connections).await?;

    let summary = advert_sync::reconcile(&db, &request)
        .await
        .context("reconcile failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
