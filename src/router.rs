//! Маршрутизация входящих событий чата.
//!
//! Роутер не хранит состояния: каждое событие превращается в список ответов
//! (`Reply`) и не более чем одну запись в хранилище избранного. Транспорт
//! (teloxide) живёт отдельно, в `tg.rs`.

use crate::action::{self, Action};
use crate::catalog::{Catalog, CinemaFilter, Film, FilmFilter};
use crate::error::{ActionError, BotError};
use crate::format::{self, FilmListKind};
use crate::geo::{self, Coordinate};
use crate::keyboard::{film, home, InlineButton, Markup, Menu, BACK};
use crate::storage::{PreferenceStore, Toggle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/* ====== Входящие события ====== */
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Text { chat_id: i64, user_id: u64, first_name: String, text: String },
    Location { chat_id: i64, user_id: u64, location: Coordinate },
    Callback { query_id: String, chat_id: i64, user_id: u64, data: Option<String> },
    InlineQuery { query_id: String, user_id: u64, query: String },
}

impl Event {
    pub fn user_id(&self) -> u64 {
        match self {
            Event::Text { user_id, .. }
            | Event::Location { user_id, .. }
            | Event::Callback { user_id, .. }
            | Event::InlineQuery { user_id, .. } => *user_id,
        }
    }
}

/* ====== Исходящие ответы ====== */
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// HTML-текст
    Text { chat_id: i64, html: String, markup: Option<Markup> },
    Photo { chat_id: i64, photo: String, caption: String, markup: Option<Markup> },
    Location { chat_id: i64, location: Coordinate },
    Inline { query_id: String, results: Vec<InlineFilm> },
    CallbackAnswer { query_id: String, text: Option<String>, alert: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFilm {
    pub id: String,
    pub photo_url: String,
    pub caption: String,
    pub link_text: String,
    pub link: String,
}

/// Больше Telegram в одном answerInlineQuery не примет.
pub const MAX_INLINE_RESULTS: usize = 50;

const UNAVAILABLE: &str = "Сервис временно недоступен, попробуйте позже";
const BAD_BUTTON: &str = "Не удалось обработать кнопку";

/* ====== Команды ====== */

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Start,
    Film(String),
    Cinema(String),
}

static SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(start|f|c)([A-Za-z0-9_-]*)(?:@\w+)?(?:\s|$)").expect("slash command regex")
});

impl SlashCommand {
    fn parse(text: &str) -> Option<Self> {
        let caps = SLASH.captures(text.trim())?;
        let arg = caps.get(2).map_or("", |m| m.as_str());
        match (caps.get(1).map(|m| m.as_str()), arg.is_empty()) {
            (Some("start"), true) => Some(SlashCommand::Start),
            (Some("f"), false) => Some(SlashCommand::Film(arg.to_string())),
            (Some("c"), false) => Some(SlashCommand::Cinema(arg.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuCommand {
    Favourites,
    Films,
    Cinemas,
    /// None — все фильмы
    Genre(Option<&'static str>),
    Back,
}

impl MenuCommand {
    fn parse(text: &str) -> Option<Self> {
        match text {
            home::FAVOURITE => Some(MenuCommand::Favourites),
            home::FILMS => Some(MenuCommand::Films),
            home::CINEMAS => Some(MenuCommand::Cinemas),
            film::RANDOM => Some(MenuCommand::Genre(None)),
            film::ACTION => Some(MenuCommand::Genre(Some("action"))),
            film::COMEDY => Some(MenuCommand::Genre(Some("comedy"))),
            BACK => Some(MenuCommand::Back),
            _ => None,
        }
    }
}

fn text(chat_id: i64, html: impl Into<String>, menu: Option<Menu>) -> Reply {
    Reply::Text { chat_id, html: html.into(), markup: menu.map(Markup::Menu) }
}

fn answer(query_id: &str, text: Option<&str>, alert: bool) -> Reply {
    Reply::CallbackAnswer { query_id: query_id.to_string(), text: text.map(str::to_string), alert }
}

/// Кнопка с действием; если payload не влезает в лимит — кнопки не будет.
fn action_button(label: impl Into<String>, a: &Action) -> Option<InlineButton> {
    match action::encode(a) {
        Ok(data) => Some(InlineButton::Callback { text: label.into(), data }),
        Err(e) => {
            warn!(kind = a.kind(), error = %e, "button dropped");
            None
        }
    }
}

#[derive(Clone)]
pub struct Router {
    catalog: Arc<dyn Catalog>,
    prefs: Arc<dyn PreferenceStore>,
}

impl Router {
    pub fn new(catalog: Arc<dyn Catalog>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { catalog, prefs }
    }

    /// Никогда не падает: ошибки превращаются в лог и, при сбое хранилища,
    /// в один ответ о недоступности тому, кто прислал событие.
    #[instrument(skip(self, event), fields(user = event.user_id()))]
    pub async fn handle(&self, event: Event) -> Vec<Reply> {
        let fallback = match &event {
            Event::Text { chat_id, .. } | Event::Location { chat_id, .. } => {
                Some(text(*chat_id, UNAVAILABLE, None))
            }
            Event::Callback { query_id, .. } => Some(answer(query_id, Some(UNAVAILABLE), true)),
            // пустой ответ, чтобы клиент не ждал
            Event::InlineQuery { query_id, .. } => {
                Some(Reply::Inline { query_id: query_id.clone(), results: Vec::new() })
            }
        };
        match self.route(event).await {
            Ok(replies) => replies,
            Err(BotError::Store(e)) => {
                error!(error = %e, "storage failure");
                fallback.into_iter().collect()
            }
            Err(e) => {
                warn!(error = %e, "event ignored");
                Vec::new()
            }
        }
    }

    async fn route(&self, event: Event) -> Result<Vec<Reply>, BotError> {
        match event {
            Event::Text { chat_id, user_id, first_name, text } => {
                self.on_text(chat_id, user_id, &first_name, &text).await
            }
            Event::Location { chat_id, location, .. } => self.nearby_cinemas(chat_id, location).await,
            Event::Callback { query_id, chat_id, user_id, data } => {
                self.on_callback(&query_id, chat_id, user_id, data.as_deref()).await
            }
            Event::InlineQuery { query_id, query, .. } => self.on_inline(query_id, &query).await,
        }
    }

    /* ====== Текст: slash-команды и кнопки меню ====== */
    async fn on_text(
        &self,
        chat_id: i64,
        user_id: u64,
        first_name: &str,
        input: &str,
    ) -> Result<Vec<Reply>, BotError> {
        if let Some(cmd) = SlashCommand::parse(input) {
            return match cmd {
                SlashCommand::Start => {
                    let greeting = format!(
                        "Привет, {}\nВыберите команду для начала работы",
                        format::html_escape(first_name)
                    );
                    Ok(vec![text(chat_id, greeting, Some(Menu::Home))])
                }
                SlashCommand::Film(id) => self.film_detail(chat_id, user_id, &id).await,
                SlashCommand::Cinema(id) => self.cinema_detail(chat_id, &id).await,
            };
        }
        let Some(cmd) = MenuCommand::parse(input) else {
            debug!(text = input, "unrecognized text");
            return Ok(Vec::new());
        };
        match cmd {
            MenuCommand::Favourites => self.favourites(chat_id, user_id).await,
            MenuCommand::Films => Ok(vec![text(chat_id, "Выберите жанр:", Some(Menu::Film))]),
            MenuCommand::Cinemas => Ok(vec![text(chat_id, "Отправьте местоположение", Some(Menu::Cinemas))]),
            MenuCommand::Genre(genre) => {
                let filter = genre.map_or(FilmFilter::All, |g| FilmFilter::Genre(g.to_string()));
                let films = self.catalog.find_films(&filter).await?;
                Ok(vec![text(chat_id, format::film_list(&films, FilmListKind::Catalog), Some(Menu::Film))])
            }
            MenuCommand::Back => Ok(vec![text(chat_id, "Что хотите посмотреть?", Some(Menu::Home))]),
        }
    }

    async fn favourites(&self, chat_id: i64, user_id: u64) -> Result<Vec<Reply>, BotError> {
        let ids = self.prefs.list_favorites(user_id).await?;
        // устаревшие id (фильм убрали из каталога) просто выпадают
        let films = if ids.is_empty() { Vec::new() } else { self.catalog.find_films(&FilmFilter::Ids(ids)).await? };
        Ok(vec![text(chat_id, format::film_list(&films, FilmListKind::Favourites), Some(Menu::Home))])
    }

    async fn film_detail(&self, chat_id: i64, user_id: u64, film_id: &str) -> Result<Vec<Reply>, BotError> {
        let Some(f) = self.catalog.find_film_by_id(film_id).await? else {
            debug!(film_id, "film not found");
            return Ok(vec![text(chat_id, "Фильм не найден", None)]);
        };
        let is_fav = self.prefs.list_favorites(user_id).await?.contains(&f.uuid);
        let fav_label = if is_fav { "Удалить из избранного" } else { "Добавить в избранное" };

        let first_row: Vec<InlineButton> = [
            action_button(fav_label, &Action::ToggleFavorite { film_id: f.uuid.clone(), is_fav }),
            action_button("Показать кинотеатры", &Action::ShowCinemas { cinema_ids: f.cinemas.clone() }),
        ]
        .into_iter()
        .flatten()
        .collect();
        let link_row = vec![InlineButton::Url { text: format!("Кинопоиск: {}", f.name), url: f.link.clone() }];

        Ok(vec![Reply::Photo {
            chat_id,
            photo: f.picture.clone(),
            caption: format::film_caption(&f),
            markup: Some(Markup::Inline(vec![first_row, link_row])),
        }])
    }

    async fn cinema_detail(&self, chat_id: i64, cinema_id: &str) -> Result<Vec<Reply>, BotError> {
        let Some(c) = self.catalog.find_cinema_by_id(cinema_id).await? else {
            debug!(cinema_id, "cinema not found");
            return Ok(vec![text(chat_id, "Кинотеатр не найден", None)]);
        };
        let map = Action::ShowCinemaMap { latitude: c.location.latitude, longitude: c.location.longitude };
        let mut first_row = vec![InlineButton::Url { text: c.name.clone(), url: c.url.clone() }];
        first_row.extend(action_button("Показать на карте", &map));
        let rows = vec![
            first_row,
            action_button("Фильмы в прокате", &Action::ShowFilms { film_ids: c.films.clone() })
                .into_iter()
                .collect(),
        ];
        Ok(vec![Reply::Text {
            chat_id,
            html: format::cinema_title(&c),
            markup: Some(Markup::Inline(rows)),
        }])
    }

    async fn nearby_cinemas(&self, chat_id: i64, origin: Coordinate) -> Result<Vec<Reply>, BotError> {
        let cinemas = self.catalog.find_cinemas(&CinemaFilter::All).await?;
        let ranked = geo::rank(origin, cinemas)?;
        Ok(vec![text(chat_id, format::ranked_list(&ranked), Some(Menu::Home))])
    }

    /* ====== Inline-режим ====== */
    async fn on_inline(&self, query_id: String, query: &str) -> Result<Vec<Reply>, BotError> {
        let needle = query.trim().to_lowercase();
        let films = self.catalog.find_films(&FilmFilter::All).await?;
        let results = films
            .iter()
            .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
            .take(MAX_INLINE_RESULTS)
            .map(inline_film)
            .collect();
        Ok(vec![Reply::Inline { query_id, results }])
    }

    /* ====== Callback-кнопки ====== */
    async fn on_callback(
        &self,
        query_id: &str,
        chat_id: i64,
        user_id: u64,
        data: Option<&str>,
    ) -> Result<Vec<Reply>, BotError> {
        let decoded = match data {
            Some(d) => action::decode(d),
            None => Err(ActionError::Malformed("empty callback data".to_string())),
        };
        let a = match decoded {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "callback payload rejected");
                return Ok(vec![answer(query_id, Some(BAD_BUTTON), true)]);
            }
        };
        debug!(kind = a.kind(), "callback action");

        match a {
            Action::ToggleFavorite { film_id, is_fav } => {
                if self.catalog.find_film_by_id(&film_id).await?.is_none() {
                    return Ok(vec![answer(query_id, Some("Фильм больше не доступен"), false)]);
                }
                let outcome = self.prefs.toggle_favorite(user_id, &film_id).await?;
                if is_fav != (outcome == Toggle::Removed) {
                    debug!(film_id, is_fav, "stale favourite button");
                }
                info!(film_id, ?outcome, "favourite toggled");
                let msg = match outcome {
                    Toggle::Added => "Добавлено в избранное",
                    Toggle::Removed => "Удалено из избранного",
                };
                Ok(vec![answer(query_id, Some(msg), false)])
            }
            Action::ShowCinemas { cinema_ids } => {
                let cinemas = self.catalog.find_cinemas(&CinemaFilter::Ids(cinema_ids)).await?;
                Ok(vec![
                    answer(query_id, None, false),
                    text(chat_id, format::cinema_list(&cinemas), Some(Menu::Home)),
                ])
            }
            Action::ShowCinemaMap { latitude, longitude } => match Coordinate::new(latitude, longitude) {
                Ok(location) => Ok(vec![answer(query_id, None, false), Reply::Location { chat_id, location }]),
                Err(e) => {
                    warn!(error = %e, "map button with bad coordinate");
                    Ok(vec![answer(query_id, Some(BAD_BUTTON), true)])
                }
            },
            Action::ShowFilms { film_ids } => {
                let films = self.catalog.find_films(&FilmFilter::Ids(film_ids)).await?;
                Ok(vec![
                    answer(query_id, None, false),
                    text(chat_id, format::film_list(&films, FilmListKind::Catalog), Some(Menu::Home)),
                ])
            }
        }
    }
}

fn inline_film(f: &Film) -> InlineFilm {
    InlineFilm {
        id: f.uuid.clone(),
        photo_url: f.picture.clone(),
        caption: format::film_caption(f),
        link_text: format!("Кинопоиск: {}", f.name),
        link: f.link.clone(),
    }
}
