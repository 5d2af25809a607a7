// Console Rendering
//
// Fixed seven column film table with word-wrapped cells, and the popular
// queries report. Everything writes to a caller supplied `Write` so the
// layout can be checked in tests.

use std::io::{self, Write};

use crate::models::{Film, RankedQuery};

const HEADERS: [&str; 7] = ["ID", "Title", "Year", "Genre", "Actors", "Price", "Description"];
const WIDTHS: [usize; 7] = [5, 20, 7, 12, 30, 8, 38];

/// Print `films` under the column header, one or more lines per film
pub fn write_films<W: Write>(out: &mut W, films: &[Film]) -> io::Result<()> {
    let header: String = HEADERS
        .iter()
        .zip(WIDTHS)
        .map(|(title, width)| format!("{:<width$} ", title, width = width))
        .collect();
    writeln!(out, "{}", header)?;
    writeln!(out, "{}", "-".repeat(header.chars().count()))?;

    for film in films {
        let cells = film_cells(film);
        let wrapped: Vec<Vec<String>> = cells.iter().zip(WIDTHS).map(|(cell, width)| wrap(cell, width)).collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line in 0..height {
            let text: String = wrapped
                .iter()
                .zip(WIDTHS)
                .map(|(lines, width)| {
                    let cell = lines.get(line).map(String::as_str).unwrap_or("");
                    format!("{:<width$} ", cell, width = width)
                })
                .collect();
            writeln!(out, "{}", text)?;
        }
    }
    Ok(())
}

fn film_cells(film: &Film) -> [String; 7] {
    [
        film.id.to_string(),
        film.title.clone(),
        film.release_year.map(|y| y.to_string()).unwrap_or_default(),
        film.genre.clone().unwrap_or_default(),
        film.actors.clone().unwrap_or_default(),
        format!("{:.2}", film.rental_rate),
        film.description.clone().unwrap_or_default(),
    ]
}

/// Greedy word wrap. Words longer than `width` are split; blank text yields
/// a single empty line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        if !current.is_empty() && current.chars().count() + 1 + word.len() <= width {
            current.push(' ');
            current.extend(word.iter());
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        while word.len() > width {
            lines.push(word.drain(..width).collect());
        }
        current.extend(word.iter());
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// "1 time", "3 times"
pub fn occurrences(count: u64) -> String {
    if count == 1 {
        "1 time".to_string()
    } else {
        format!("{} times", count)
    }
}

/// Print the popular queries report headed with the requested size `n`
pub fn write_top_queries<W: Write>(out: &mut W, ranked: &[RankedQuery], n: usize) -> io::Result<()> {
    writeln!(out, "\nTop {} most popular queries:", n)?;
    if ranked.is_empty() {
        return writeln!(out, "No queries yet.");
    }

    writeln!(out, "Most frequent search queries:")?;
    for (rank, query) in ranked.iter().enumerate() {
        writeln!(
            out,
            "{}. Query - {} by keyword {} - {}",
            rank + 1,
            query.query_type.as_str(),
            query.query_text,
            occurrences(query.count)
        )?;
    }
    Ok(())
}
