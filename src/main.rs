//! Referral Dashboard - Main Application Entry Point
//!
//! Serves the dashboard API by default. Subcommands load CSV exports,
//! rebuild tree numbering and manage dashboard accounts.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Serve HTTP or run the requested command

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CommandLine, Commands};
use referral_tree_dashboard::{
    app,
    config::Config,
    db::{self, DbPool},
    import::{hierarchy::import_platform, wallet_profiles::import_wallet_profiles},
    services::{auth_service, nested_set},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = CommandLine::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(pool, &config).await?,
        Commands::ImportCsv {
            app,
            sheets_dir,
            clear,
        } => {
            if !sheets_dir.is_dir() {
                bail!("sheets directory {} does not exist", sheets_dir.display());
            }
            for &platform in app.platforms() {
                let summary = import_platform(&pool, platform, &sheets_dir, clear).await?;
                println!(
                    "{}: {} users, {} purchases, {} earnings, {} trees",
                    platform.display_name(),
                    summary.users,
                    summary.purchases,
                    summary.earnings,
                    summary.tree.trees
                );
            }
        }
        Commands::ImportWalletProfiles { csv_file, clear } => {
            let summary = import_wallet_profiles(&pool, &csv_file, clear).await?;
            println!(
                "Wallet profiles: {} created, {} updated, {} skipped",
                summary.created, summary.updated, summary.skipped
            );
        }
        Commands::RebuildTree { app } => {
            for &platform in app.platforms() {
                let report = nested_set::rebuild_tree(&pool, platform).await?;
                println!(
                    "{}: {} nodes in {} trees ({} dangling parents, {} detached)",
                    platform.display_name(),
                    report.nodes,
                    report.trees,
                    report.dangling,
                    report.detached
                );
            }
        }
        Commands::CreateUser {
            username,
            password,
            email,
            full_name,
            seller,
            staff,
        } => {
            let user = auth_service::create_user(
                &pool,
                &username,
                &password,
                email.as_deref(),
                &full_name,
                seller,
                staff,
            )
            .await?;
            println!("Created dashboard user {} (id {})", user.username, user.id);
        }
        Commands::SetPassword { username, password } => {
            auth_service::set_password(&pool, &username, &password).await?;
            println!("Password updated for {username}");
        }
    }

    Ok(())
}

async fn serve(pool: DbPool, config: &Config) -> anyhow::Result<()> {
    if config.signing_secret().is_none() {
        bail!("JWT_SECRET must be set to serve the API");
    }
    let tokens = auth_service::TokenKeys::from_config(config);
    let router = app(AppState::new(pool, tokens), config);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
