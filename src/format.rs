//! Отрисовка записей каталога в HTML-подмножество Telegram. Без I/O.

use crate::catalog::{Cinema, Film};
use crate::geo::Ranked;
use unicode_segmentation::UnicodeSegmentation;

/// Лимит подписи к фото в Telegram.
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilmListKind {
    /// подборка по жанру или по кинотеатру
    Catalog,
    Favourites,
}

pub fn film_caption(f: &Film) -> String {
    let text = format!(
        "Название: {}\nГод выпуска: {}\nРейтинг: {}\nДлительность: {}\nСтрана: {}\n",
        f.name, f.year, f.rate, f.length, f.country
    );
    clip(&text, CAPTION_LIMIT)
}

pub fn film_list(films: &[Film], kind: FilmListKind) -> String {
    match kind {
        FilmListKind::Catalog => {
            if films.is_empty() {
                return "Фильмы не найдены".to_string();
            }
            films
                .iter()
                .enumerate()
                .map(|(i, f)| format!("<b>{}.</b> {} - /f{}", i + 1, html_escape(&f.name), f.uuid))
                .collect::<Vec<_>>()
                .join("\n")
        }
        FilmListKind::Favourites => {
            if films.is_empty() {
                return "У Вас нет фильмов в категории избранное".to_string();
            }
            let lines = films
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    format!(
                        "<b>{}.</b> \"{}\" <em>рейтинг - {}</em> link - /f{}",
                        i + 1,
                        html_escape(&f.name),
                        f.rate,
                        f.uuid
                    )
                })
                .collect::<Vec<_>>();
            format!("<strong>Ваши фильмы в категории избранное:</strong>\n{}", lines.join("\n"))
        }
    }
}

/// Кинотеатры, где идёт фильм.
pub fn cinema_list(cinemas: &[Cinema]) -> String {
    if cinemas.is_empty() {
        return "Сейчас фильм не идёт ни в одном кинотеатре".to_string();
    }
    let lines = cinemas
        .iter()
        .enumerate()
        .map(|(i, c)| format!("<b>{}.</b> {} /c{}", i + 1, html_escape(&c.name), c.uuid))
        .collect::<Vec<_>>();
    format!("<strong>Фильм можно посмотреть в кинотеатрах:</strong>\n{}", lines.join("\n"))
}

pub fn ranked_list(ranked: &[Ranked]) -> String {
    if ranked.is_empty() {
        return "Кинотеатры не найдены".to_string();
    }
    ranked
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "<b>{}.</b> {} <em>Расстояние</em> - <strong>{}</strong> км /c{}",
                i + 1,
                html_escape(&r.cinema.name),
                r.distance_km,
                r.cinema.uuid
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn cinema_title(c: &Cinema) -> String {
    format!("Кинотеатр {}", html_escape(&c.name))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Обрезка по графемам, чтобы не рвать составные символы.
pub fn clip(s: &str, max: usize) -> String {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    if graphemes.len() <= max {
        s.to_string()
    } else {
        graphemes[..max.saturating_sub(1)].concat() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn film(uuid: &str, name: &str) -> Film {
        Film {
            uuid: uuid.into(),
            name: name.into(),
            genre: "action".into(),
            year: 1999,
            rate: 8.5,
            length: "2ч 16мин".into(),
            country: "США".into(),
            picture: "https://img.example/p.jpg".into(),
            link: "https://kino.example/p".into(),
            cinemas: vec![],
        }
    }

    fn cinema(uuid: &str, name: &str) -> Cinema {
        Cinema {
            uuid: uuid.into(),
            name: name.into(),
            url: "https://cinema.example".into(),
            location: Coordinate { latitude: 0.0, longitude: 0.0 },
            films: vec![],
        }
    }

    #[test]
    fn caption_fields() {
        let c = film_caption(&film("f3", "Матрица"));
        assert_eq!(
            c,
            "Название: Матрица\nГод выпуска: 1999\nРейтинг: 8.5\nДлительность: 2ч 16мин\nСтрана: США\n"
        );
    }

    #[test]
    fn numbered_lists() {
        let films = [film("f1", "A&B"), film("f2", "<C>")];
        assert_eq!(
            film_list(&films, FilmListKind::Catalog),
            "<b>1.</b> A&amp;B - /ff1\n<b>2.</b> &lt;C&gt; - /ff2"
        );
        let fav = film_list(&films[..1], FilmListKind::Favourites);
        assert!(fav.starts_with("<strong>Ваши фильмы"));
        assert!(fav.ends_with("<b>1.</b> \"A&amp;B\" <em>рейтинг - 8.5</em> link - /ff1"));

        let cinemas = cinema_list(&[cinema("c1", "Октябрь")]);
        assert!(cinemas.ends_with("<b>1.</b> Октябрь /cc1"));
        assert_eq!(cinema_title(&cinema("c1", "Октябрь")), "Кинотеатр Октябрь");
    }

    #[test]
    fn ranked_line() {
        let r = Ranked { cinema: cinema("c1", "Октябрь"), distance_km: 1.202 };
        assert_eq!(
            ranked_list(&[r]),
            "<b>1.</b> Октябрь <em>Расстояние</em> - <strong>1.202</strong> км /cc1"
        );
    }

    #[test]
    fn empty_lists_have_fixed_texts() {
        assert_eq!(film_list(&[], FilmListKind::Catalog), "Фильмы не найдены");
        assert_eq!(film_list(&[], FilmListKind::Favourites), "У Вас нет фильмов в категории избранное");
        assert_eq!(cinema_list(&[]), "Сейчас фильм не идёт ни в одном кинотеатре");
        assert_eq!(ranked_list(&[]), "Кинотеатры не найдены");
    }

    #[test]
    fn clip_by_graphemes() {
        assert_eq!(clip("abc", 3), "abc");
        assert_eq!(clip("abcdef", 4), "abc…");
        // флаг — одна графема из двух code point'ов
        assert_eq!(clip("🇷🇺🇷🇺🇷🇺", 2), "🇷🇺…");
    }
}
