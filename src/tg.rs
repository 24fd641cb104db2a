use crate::format;
use crate::geo::Coordinate;
use crate::keyboard::{InlineButton, Markup, Menu};
use crate::router::{Event, InlineFilm, Reply, Router};
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{
        ButtonRequest, CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup,
        InlineQuery, InlineQueryResult, InlineQueryResultPhoto, InputFile, KeyboardButton,
        KeyboardMarkup, ParseMode, ReplyMarkup,
    },
    utils::command::BotCommands,
};
use tracing::{error, warn};
use url::Url;

/* ====== Команды для меню Telegram ======
   /f<id> и /c<id> сюда не входят: их разбирает роутер */
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Команды:")]
enum Command {
    #[command(description = "главное меню")]
    Start,
}

/// Откуда пришло событие: ответ на callback/inline возможен только на тот же запрос.
enum Origin<'a> {
    Message,
    Callback(&'a CallbackQuery),
    Inline(&'a InlineQuery, u32),
}

pub async fn run(bot: Bot, router: Router, inline_cache_secs: u32) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "cannot register bot commands");
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let router = router.clone();
            move |bot: Bot, msg: Message| {
                let router = router.clone();
                async move { on_message(bot, msg, &router).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let router = router.clone();
            move |bot: Bot, q: CallbackQuery| {
                let router = router.clone();
                async move { on_callback(bot, q, &router).await }
            }
        }))
        .branch(Update::filter_inline_query().endpoint({
            let router = router.clone();
            move |bot: Bot, q: InlineQuery| {
                let router = router.clone();
                async move { on_inline(bot, q, &router, inline_cache_secs).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/* ====== Update -> Event ====== */

async fn on_message(bot: Bot, msg: Message, router: &Router) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else { return Ok(()) };
    let chat_id = msg.chat.id.0;
    let user_id = user.id.0;
    let event = if let Some(loc) = msg.location() {
        Event::Location {
            chat_id,
            user_id,
            location: Coordinate { latitude: loc.latitude, longitude: loc.longitude },
        }
    } else if let Some(text) = msg.text() {
        Event::Text { chat_id, user_id, first_name: user.first_name.clone(), text: text.to_string() }
    } else {
        return Ok(());
    };
    let replies = router.handle(event).await;
    deliver(&bot, replies, Origin::Message).await;
    Ok(())
}

async fn on_callback(bot: Bot, q: CallbackQuery, router: &Router) -> ResponseResult<()> {
    // без сообщения (inline-режим) отвечаем в личку
    let chat_id = q.message.as_ref().map(|m| m.chat().id.0).unwrap_or(q.from.id.0 as i64);
    let event = Event::Callback {
        query_id: q.id.to_string(),
        chat_id,
        user_id: q.from.id.0,
        data: q.data.clone(),
    };
    let replies = router.handle(event).await;
    deliver(&bot, replies, Origin::Callback(&q)).await;
    Ok(())
}

async fn on_inline(bot: Bot, q: InlineQuery, router: &Router, cache_secs: u32) -> ResponseResult<()> {
    let event = Event::InlineQuery { query_id: q.id.to_string(), user_id: q.from.id.0, query: q.query.clone() };
    let replies = router.handle(event).await;
    deliver(&bot, replies, Origin::Inline(&q, cache_secs)).await;
    Ok(())
}

/* ====== Reply -> Telegram ====== */

/// Ответы шлём по порядку; сбой одного не отменяет остальные.
async fn deliver(bot: &Bot, replies: Vec<Reply>, origin: Origin<'_>) {
    for reply in replies {
        if let Err(e) = send_reply(bot, without_broken_photo(reply), &origin).await {
            error!(error = %e, "telegram request failed");
        }
    }
}

async fn send_reply(bot: &Bot, reply: Reply, origin: &Origin<'_>) -> ResponseResult<()> {
    match reply {
        Reply::Text { chat_id, html, markup } => {
            let req = bot.send_message(ChatId(chat_id), html).parse_mode(ParseMode::Html);
            match markup {
                Some(m) => req.reply_markup(reply_markup(m)).await?,
                None => req.await?,
            };
        }
        Reply::Photo { chat_id, photo, caption, markup } => {
            let url = Url::parse(&photo).map_err(to_req_err)?;
            let req = bot.send_photo(ChatId(chat_id), InputFile::url(url)).caption(caption);
            match markup {
                Some(m) => req.reply_markup(reply_markup(m)).await?,
                None => req.await?,
            };
        }
        Reply::Location { chat_id, location } => {
            bot.send_location(ChatId(chat_id), location.latitude, location.longitude).await?;
        }
        Reply::CallbackAnswer { text, alert, .. } => {
            let Origin::Callback(q) = origin else {
                warn!("callback answer outside of callback");
                return Ok(());
            };
            let mut req = bot.answer_callback_query(q.id.clone()).show_alert(alert);
            if let Some(t) = text {
                req = req.text(t);
            }
            req.await?;
        }
        Reply::Inline { results, .. } => {
            let Origin::Inline(q, cache_secs) = origin else {
                warn!("inline answer outside of inline query");
                return Ok(());
            };
            let results: Vec<InlineQueryResult> = results.into_iter().filter_map(inline_result).collect();
            bot.answer_inline_query(q.id.clone(), results).cache_time(*cache_secs).await?;
        }
    }
    Ok(())
}

/// Постер с битым URL Telegram не примет: шлём подпись текстом, кнопки сохраняем.
fn without_broken_photo(reply: Reply) -> Reply {
    match reply {
        Reply::Photo { chat_id, photo, caption, markup } if Url::parse(&photo).is_err() => {
            warn!(photo, "bad poster url, sending caption only");
            Reply::Text { chat_id, html: format::html_escape(&caption), markup }
        }
        other => other,
    }
}

fn to_req_err<E: std::fmt::Display>(e: E) -> teloxide::RequestError {
    teloxide::RequestError::Io(std::sync::Arc::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        e.to_string(),
    )))
}

/* ====== Кнопки ====== */

fn reply_markup(m: Markup) -> ReplyMarkup {
    match m {
        Markup::Menu(menu) => ReplyMarkup::Keyboard(menu_keyboard(menu)),
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_keyboard(rows)),
    }
}

fn menu_keyboard(menu: Menu) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = menu
        .layout()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|b| {
                    let btn = KeyboardButton::new(b.text);
                    if b.request_location { btn.request(ButtonRequest::Location) } else { btn }
                })
                .collect()
        })
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard()
}

fn inline_keyboard(rows: Vec<Vec<InlineButton>>) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .into_iter()
        .map(|row| row.into_iter().filter_map(inline_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn inline_button(b: InlineButton) -> Option<InlineKeyboardButton> {
    match b {
        InlineButton::Callback { text, data } => Some(InlineKeyboardButton::callback(text, data)),
        InlineButton::Url { text, url } => match Url::parse(&url) {
            Ok(u) => Some(InlineKeyboardButton::url(text, u)),
            Err(e) => {
                warn!(url, error = %e, "link button dropped");
                None
            }
        },
    }
}

fn inline_result(f: InlineFilm) -> Option<InlineQueryResult> {
    let photo = match Url::parse(&f.photo_url) {
        Ok(u) => u,
        Err(e) => {
            warn!(film = f.id, error = %e, "inline result without poster skipped");
            return None;
        }
    };
    let mut result = InlineQueryResultPhoto::new(f.id, photo.clone(), photo);
    result.caption = Some(f.caption);
    result.reply_markup = inline_button(InlineButton::Url { text: f.link_text, url: f.link })
        .map(|b| InlineKeyboardMarkup::new(vec![vec![b]]));
    Some(InlineQueryResult::Photo(result))
}
