mod action;
mod catalog;
mod config;
mod error;
mod format;
mod geo;
mod keyboard;
mod router;
mod storage;
mod tg;

use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env()?;
    let bot = Bot::from_env();

    // каталог только читаем; битый файл — повод не стартовать
    let catalog = catalog::MemoryCatalog::load(&config.catalog_path).await?;
    info!(films = catalog.film_count(), cinemas = catalog.cinema_count(), "catalog loaded");

    let storage = storage::Storage::new(&config.store_path).await?;
    info!(users = storage.user_count().await, path = %config.store_path.display(), "preferences loaded");

    let router = router::Router::new(Arc::new(catalog), Arc::new(storage));
    tg::run(bot, router, config.inline_cache_secs).await;
    Ok(())
}
