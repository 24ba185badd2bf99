mod bot;
mod config;
mod handlers;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod testing;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starshop_db::{
    AccountRepository, AccountStore, MemoryAccountStore, MemoryOrderStore, OrderRepository,
    OrderStore, Schema, init_db, migrate,
};
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Dispatcher;
use crate::bot::gates::SystemClock;
use crate::config::Config;
use crate::services::notification_service::{NotificationSink, TelegramNotifier};
use crate::services::order_service::OrderService;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "starshop-bot")]
#[command(about = "Telegram stars shop bot and storefront order backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and register the webhook (default)
    Serve,
    /// Register the webhook with Telegram and exit
    RegisterWebhook,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        println!("⚠️  No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    let file_appender = tracing_appender::rolling::never(".", "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "starshop_bot=debug,starshop_db=info,tower_http=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    if config.operator_ids.is_empty() {
        warn!("No operator ids configured, order and purchase notifications go nowhere");
    }

    let notifier: Arc<dyn NotificationSink> =
        Arc::new(TelegramNotifier::new(Bot::new(config.bot_token.clone())));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, notifier).await,
        Commands::RegisterWebhook => {
            let url = config
                .webhook_url()
                .context("PUBLIC_URL is required to register the webhook")?;
            notifier
                .register_webhook(&url)
                .await
                .with_context(|| format!("Failed to register webhook {url}"))?;
            info!("Webhook registered at {}", url);
            Ok(())
        }
    }
}

async fn open_stores(config: &Config) -> Result<(Arc<dyn AccountStore>, Arc<dyn OrderStore>)> {
    let account_pool = match &config.database_url {
        Some(url) => Some(
            init_db(url, Schema::Accounts)
                .await
                .context("Account store unavailable")?,
        ),
        None => None,
    };

    let accounts: Arc<dyn AccountStore> = match &account_pool {
        Some(pool) => Arc::new(AccountRepository::new(pool.clone())),
        None => {
            warn!("DATABASE_URL not set, accounts are kept in memory and lost on restart");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let orders: Arc<dyn OrderStore> = match (&config.orders_database_url, &account_pool) {
        (Some(url), Some(pool)) if Some(url) == config.database_url.as_ref() => {
            migrate(pool, Schema::Orders)
                .await
                .context("Order store unavailable")?;
            Arc::new(OrderRepository::new(pool.clone()))
        }
        (Some(url), _) => Arc::new(OrderRepository::new(
            init_db(url, Schema::Orders)
                .await
                .context("Order store unavailable")?,
        )),
        (None, _) => {
            warn!("No orders database configured, orders are kept in memory");
            Arc::new(MemoryOrderStore::new())
        }
    };

    Ok((accounts, orders))
}

async fn run_server(config: Arc<Config>, notifier: Arc<dyn NotificationSink>) -> Result<()> {
    let (accounts, orders) = open_stores(&config).await?;
    info!("Stores ready");

    let dispatcher = Arc::new(Dispatcher::new(
        config.clone(),
        accounts,
        orders.clone(),
        notifier.clone(),
        Arc::new(SystemClock),
    ));
    let state = AppState {
        dispatcher,
        order_service: OrderService::new(orders, notifier.clone(), config.clone()),
    };

    match config.webhook_url() {
        Some(url) => match notifier.register_webhook(&url).await {
            Ok(()) => info!("Webhook registered at {}", url),
            Err(e) => error!("Failed to register webhook {}: {}", url, e),
        },
        None => warn!("PUBLIC_URL not set, webhook registration skipped"),
    }

    let app = routes::build_router(state, &config.public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
