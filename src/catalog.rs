use crate::error::StoreError;
use crate::geo::Coordinate;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, sync::Arc};
use tokio::fs;

/* ====== Каталог (только чтение) ====== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub genre: String,
    pub year: u16,
    pub rate: f64,
    pub length: String,
    pub country: String,
    /// URL постера
    pub picture: String,
    pub link: String,
    /// кинотеатры, где сейчас идёт фильм
    #[serde(default)]
    pub cinemas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cinema {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub location: Coordinate,
    #[serde(default)]
    pub films: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilmFilter {
    All,
    Genre(String),
    Ids(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CinemaFilter {
    All,
    Ids(Vec<String>),
}

/// Несуществующий id — это пустой результат, а не ошибка.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_films(&self, filter: &FilmFilter) -> Result<Vec<Film>, StoreError>;
    async fn find_cinemas(&self, filter: &CinemaFilter) -> Result<Vec<Cinema>, StoreError>;
    async fn find_film_by_id(&self, id: &str) -> Result<Option<Film>, StoreError>;
    async fn find_cinema_by_id(&self, id: &str) -> Result<Option<Cinema>, StoreError>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    films: Vec<Film>,
    #[serde(default)]
    cinemas: Vec<Cinema>,
}

/// Каталог целиком в памяти, загружается один раз на старте.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    films: Arc<Vec<Film>>,
    cinemas: Arc<Vec<Cinema>>,
}

impl MemoryCatalog {
    pub fn new(films: Vec<Film>, cinemas: Vec<Cinema>) -> Self {
        Self { films: Arc::new(films), cinemas: Arc::new(cinemas) }
    }

    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .await
            .with_context(|| format!("cannot read catalog {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("bad catalog {}", path.display()))
    }

    pub fn from_json(data: &[u8]) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_slice(data)?;
        let mut seen = HashSet::new();
        for f in &file.films {
            anyhow::ensure!(seen.insert(f.uuid.as_str()), "duplicate film uuid {}", f.uuid);
        }
        seen.clear();
        for c in &file.cinemas {
            anyhow::ensure!(seen.insert(c.uuid.as_str()), "duplicate cinema uuid {}", c.uuid);
            c.location
                .validate()
                .with_context(|| format!("cinema {}", c.uuid))?;
        }
        Ok(Self::new(file.films, file.cinemas))
    }

    pub fn film_count(&self) -> usize {
        self.films.len()
    }

    pub fn cinema_count(&self) -> usize {
        self.cinemas.len()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_films(&self, filter: &FilmFilter) -> Result<Vec<Film>, StoreError> {
        let found = self
            .films
            .iter()
            .filter(|f| match filter {
                FilmFilter::All => true,
                FilmFilter::Genre(g) => &f.genre == g,
                FilmFilter::Ids(ids) => ids.contains(&f.uuid),
            })
            .cloned()
            .collect();
        Ok(found)
    }

    async fn find_cinemas(&self, filter: &CinemaFilter) -> Result<Vec<Cinema>, StoreError> {
        let found = self
            .cinemas
            .iter()
            .filter(|c| match filter {
                CinemaFilter::All => true,
                CinemaFilter::Ids(ids) => ids.contains(&c.uuid),
            })
            .cloned()
            .collect();
        Ok(found)
    }

    async fn find_film_by_id(&self, id: &str) -> Result<Option<Film>, StoreError> {
        Ok(self.films.iter().find(|f| f.uuid == id).cloned())
    }

    async fn find_cinema_by_id(&self, id: &str) -> Result<Option<Cinema>, StoreError> {
        Ok(self.cinemas.iter().find(|c| c.uuid == id).cloned())
    }
}
