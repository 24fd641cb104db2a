use anyhow::Context;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON-каталог фильмов и кинотеатров
    pub catalog_path: PathBuf,
    /// снапшот избранного
    pub store_path: PathBuf,
    pub inline_cache_secs: u32,
}

impl Config {
    /// Токен бота читает `Bot::from_env` (TELOXIDE_TOKEN), здесь только пути и таймауты.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let inline_cache_secs = match get("INLINE_CACHE_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("INLINE_CACHE_SECS must be a number of seconds, got {v:?}"))?,
            None => 0,
        };
        Ok(Self {
            catalog_path: get("CATALOG_PATH").unwrap_or_else(|| "data/database.json".to_string()).into(),
            store_path: get("STORE_PATH").unwrap_or_else(|| "kino_users.json".to_string()).into(),
            inline_cache_secs,
        })
    }
}
