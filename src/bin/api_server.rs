use anyhow::Result;

use advert_sync::api::ApiServer;
use advert_sync::database_ops::db::Db;
use advert_sync::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::bootstrap_cli("api_server");
    advert_sync::logging::init_tracing("info,actix_web=warn")?;

    let database_url = env_util::env_req("DATABASE_URL")?;
    let max_connections = env_util::env_parse("DB_MAX_CONNECTIONS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    ApiServer::from_env()?.run(db).await
}
