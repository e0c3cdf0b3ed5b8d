// API server implementation using actix-web

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};

use crate::api::routes;
use crate::database_ops::db::Db;
use crate::util::env;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env::init_env();
        let host = env::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env::env_parse("API_PORT", 8080u16);
        Ok(Self { host, port })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            "Starting advert-sync API server"
        );

        let db_data = web::Data::new(db);

        HttpServer::new(move || {
            App::new()
                .app_data(db_data.clone())
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
