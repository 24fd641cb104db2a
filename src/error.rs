use thiserror::Error;

/// Ошибки разбора/сборки payload'а кнопки.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("malformed action payload: {0}")]
    Malformed(String),
    #[error("unknown action kind: {0}")]
    UnknownKind(String),
    #[error("action payload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoError {
    #[error("invalid coordinate: lat={latitude}, lon={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Жёсткая ошибка хранилища. Отсутствие записи ошибкой не считается.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
