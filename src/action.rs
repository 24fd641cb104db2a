use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Telegram отдаёт callback_data как есть, но не больше 64 байт.
pub const MAX_PAYLOAD_BYTES: usize = 64;

const KINDS: [&str; 4] = ["TFF", "SC", "SCM", "SF"];

/* ====== Действие, зашитое в inline-кнопку ======
   {"t":"TFF","f":"<film>","fav":false}
   {"t":"SC","c":["<cinema>",...]}
   {"t":"SCM","lat":55.7,"lon":37.6}
   {"t":"SF","f":["<film>",...]} */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Action {
    #[serde(rename = "TFF")]
    ToggleFavorite {
        #[serde(rename = "f")]
        film_id: String,
        /// Состояние на момент отрисовки кнопки; источник правды — хранилище.
        #[serde(rename = "fav")]
        is_fav: bool,
    },
    #[serde(rename = "SC")]
    ShowCinemas {
        #[serde(rename = "c")]
        cinema_ids: Vec<String>,
    },
    #[serde(rename = "SCM")]
    ShowCinemaMap {
        #[serde(rename = "lat")]
        latitude: f64,
        #[serde(rename = "lon")]
        longitude: f64,
    },
    #[serde(rename = "SF")]
    ShowFilms {
        #[serde(rename = "f")]
        film_ids: Vec<String>,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ToggleFavorite { .. } => "TFF",
            Action::ShowCinemas { .. } => "SC",
            Action::ShowCinemaMap { .. } => "SCM",
            Action::ShowFilms { .. } => "SF",
        }
    }
}

pub fn encode(action: &Action) -> Result<String, ActionError> {
    if let Action::ShowCinemaMap { latitude, longitude } = action {
        // serde_json пишет NaN/inf как null, обратно такое не разобрать
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ActionError::Malformed("non-finite coordinate".to_string()));
        }
    }
    let payload = serde_json::to_string(action).map_err(|e| ActionError::Malformed(e.to_string()))?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(ActionError::TooLarge { size: payload.len(), limit: MAX_PAYLOAD_BYTES });
    }
    Ok(payload)
}

pub fn decode(payload: &str) -> Result<Action, ActionError> {
    let value: Value = serde_json::from_str(payload).map_err(|e| ActionError::Malformed(e.to_string()))?;
    let kind = value
        .get("t")
        .and_then(Value::as_str)
        .ok_or_else(|| ActionError::Malformed("missing action kind".to_string()))?;
    if !KINDS.contains(&kind) {
        return Err(ActionError::UnknownKind(kind.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ActionError::Malformed(e.to_string()))
}
