use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Избранное пользователя. Запись создаётся при первом переключении и не удаляется.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn toggle_favorite(&self, user_id: u64, film_id: &str) -> Result<Toggle, StoreError>;
    /// Пустой список, если записи нет.
    async fn list_favorites(&self, user_id: u64) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserRecord {
    pub films: Vec<String>,
}

impl UserRecord {
    fn toggle(&mut self, film_id: &str) -> Toggle {
        let before = self.films.len();
        self.films.retain(|f| f != film_id);
        if self.films.len() < before {
            Toggle::Removed
        } else {
            self.films.push(film_id.to_string());
            Toggle::Added
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FileState {
    version: u32,
    // telegram user id -> избранное
    users: HashMap<u64, UserRecord>,
}

#[derive(Clone)]
pub struct Storage {
    inner: Arc<RwLock<FileState>>,
    // сериализует мутации вместе с записью снапшота: файл не откатится к старому состоянию
    flush_lock: Arc<Mutex<()>>,
    path: PathBuf,
}

impl Storage {
    pub async fn new(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if fs::try_exists(&path).await.unwrap_or(false) {
            let data = fs::read(&path).await?;
            match serde_json::from_slice::<FileState>(&data) {
                Ok(mut s) => {
                    if s.version == 0 {
                        s.version = 1;
                    }
                    s
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt preference file, starting empty");
                    FileState { version: 1, ..Default::default() }
                }
            }
        } else {
            FileState { version: 1, ..Default::default() }
        };
        Ok(Self { inner: Arc::new(RwLock::new(state)), flush_lock: Arc::new(Mutex::new(())), path })
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    async fn write_snapshot(&self, snapshot: &[u8]) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for Storage {
    async fn toggle_favorite(&self, user_id: u64, film_id: &str) -> Result<Toggle, StoreError> {
        let _flush = self.flush_lock.lock().await;
        // 1) меняем память и снимаем снапшот под одним локом
        let (outcome, created, snapshot) = {
            let mut guard = self.inner.write().await;
            let created = !guard.users.contains_key(&user_id);
            let outcome = guard.users.entry(user_id).or_default().toggle(film_id);
            (outcome, created, serde_json::to_vec_pretty(&*guard))
        };
        // 2) атомарная запись; при сбое возвращаем память как было
        let written = match snapshot {
            Ok(bytes) => self.write_snapshot(&bytes).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            let mut guard = self.inner.write().await;
            if created {
                // запись появилась только ради этой попытки
                guard.users.remove(&user_id);
            } else if let Some(rec) = guard.users.get_mut(&user_id) {
                rec.toggle(film_id);
            }
            return Err(e);
        }
        Ok(outcome)
    }

    async fn list_favorites(&self, user_id: u64) -> Result<Vec<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.users.get(&user_id).map(|r| r.films.clone()).unwrap_or_default())
    }
}
