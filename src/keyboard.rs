/* ====== Статичные меню (reply-клавиатуры) ====== */

pub mod home {
    pub const FILMS: &str = "Фильмы";
    pub const CINEMAS: &str = "Кинотеатры";
    pub const FAVOURITE: &str = "Избранное";
}

pub mod film {
    pub const RANDOM: &str = "Случайный жанр";
    pub const ACTION: &str = "Боевики";
    pub const COMEDY: &str = "Комедии";
}

pub const BACK: &str = "В главное меню";
pub const SEND_LOCATION: &str = "Отправить местоположение";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Home,
    Film,
    Cinemas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuButton {
    pub text: &'static str,
    pub request_location: bool,
}

const fn label(text: &'static str) -> MenuButton {
    MenuButton { text, request_location: false }
}

impl Menu {
    pub fn layout(self) -> Vec<Vec<MenuButton>> {
        match self {
            Menu::Home => vec![
                vec![label(home::FILMS), label(home::CINEMAS)],
                vec![label(home::FAVOURITE)],
            ],
            Menu::Film => vec![
                vec![label(film::RANDOM)],
                vec![label(film::ACTION), label(film::COMEDY)],
                vec![label(BACK)],
            ],
            Menu::Cinemas => vec![
                vec![MenuButton { text: SEND_LOCATION, request_location: true }],
                vec![label(BACK)],
            ],
        }
    }
}

/* ====== Inline-кнопки под сообщением ====== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineButton {
    /// data — закодированный `Action`
    Callback { text: String, data: String },
    Url { text: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Menu(Menu),
    Inline(Vec<Vec<InlineButton>>),
}
