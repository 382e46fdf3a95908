//! HTTP server command
//!
//! Resolves database settings, builds the user store, and runs the server
//! until Ctrl+C/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use userctl_server::db::{MemoryUserStore, PgUserStore, PoolConfig, UserStore};
use userctl_server::http::{run_server, ServerConfig};
use userctl_server::{AppState, DatabaseConfig, DatabaseSource};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Full database URL (overrides the DB_* settings)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = userctl_server::config::DEFAULT_DB_PORT)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Maximum pooled connections
    #[arg(long, default_value_t = userctl_server::db::pool::DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Seconds a request waits for a pooled connection before failing
    #[arg(long, default_value_t = userctl_server::db::pool::DEFAULT_ACQUIRE_TIMEOUT.as_secs())]
    pub acquire_timeout_secs: u64,

    /// Keep users in process memory instead of PostgreSQL (data is lost on exit).
    /// Database settings are ignored when set.
    #[arg(long)]
    pub in_memory: bool,
}

impl ServeArgs {
    /// Resolve database settings: URL first, then discrete DB_* values.
    pub fn database_source(&self) -> Result<DatabaseSource> {
        if let Some(url) = &self.database_url {
            return Ok(DatabaseSource::Url(url.clone()));
        }

        let mut missing = Vec::new();
        if self.db_user.is_none() {
            missing.push("DB_USER");
        }
        if self.db_password.is_none() {
            missing.push("DB_PASSWORD");
        }
        if self.db_name.is_none() {
            missing.push("DB_NAME");
        }
        if !missing.is_empty() {
            bail!(
                "database not configured: set DATABASE_URL or {} (flags, environment, or ~/.userctl/.env)",
                missing.join(", ")
            );
        }

        Ok(DatabaseSource::Fields(DatabaseConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone().unwrap_or_default(),
            password: self.db_password.clone().unwrap_or_default(),
            name: self.db_name.clone().unwrap_or_default(),
        }))
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let store: Arc<dyn UserStore> = if args.in_memory {
        tracing::warn!("Using in-memory user store; data will not persist");
        Arc::new(MemoryUserStore::new())
    } else {
        let options = args.database_source()?.connect_options()?;
        let pool_config = args.pool_config();
        tracing::info!(
            max_connections = pool_config.max_connections,
            "Connecting to database"
        );

        let store = PgUserStore::connect(options, pool_config)
            .await
            .context("Failed to connect to database")?;
        Arc::new(store)
    };

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    tracing::info!("Starting userctl server on {}", config.bind_addr);
    run_server(AppState::new(store), config)
        .await
        .context("Server error")?;

    Ok(())
}
