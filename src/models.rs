// Data Models and Types
//
// Catalog rows, the film record decoded from them, the genre and release
// year lookups used by the genre search, and the search log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

use crate::error::DecodeError;

/// A single column value as returned by the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => format!("{:?}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered catalog row
pub type Row = Vec<Value>;

/// Film is one search result: the film plus its genre and billed actors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub release_year: Option<i32>,
    /// Absent when the film has no category
    pub genre: Option<String>,
    /// Comma separated full names, ordered by first then last name
    pub actors: Option<String>,
    pub rental_rate: f64,
    pub description: Option<String>,
}

impl Film {
    pub const COLUMNS: usize = 7;

    /// Decode a row shaped (id, title, year, genre, actors, rate, description)
    pub fn from_row(row: &[Value]) -> Result<Self, DecodeError> {
        if row.len() != Self::COLUMNS {
            return Err(DecodeError::ColumnCount {
                expected: Self::COLUMNS,
                actual: row.len(),
            });
        }

        let release_year = match &row[2] {
            Value::Null => None,
            value => Some(
                value
                    .as_i64()
                    .and_then(|year| i32::try_from(year).ok())
                    .ok_or_else(|| unexpected("release_year", value))?,
            ),
        };

        Ok(Self {
            id: row[0].as_i64().ok_or_else(|| unexpected("film_id", &row[0]))?,
            title: required_text("title", &row[1])?,
            release_year,
            genre: optional_text("genre", &row[3])?,
            actors: optional_text("actors", &row[4])?,
            rental_rate: row[5].as_f64().ok_or_else(|| unexpected("rental_rate", &row[5]))?,
            description: optional_text("description", &row[6])?,
        })
    }
}

fn unexpected(column: &'static str, value: &Value) -> DecodeError {
    DecodeError::Column {
        column,
        found: value.describe(),
    }
}

fn required_text(column: &'static str, value: &Value) -> Result<String, DecodeError> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| unexpected(column, value))
}

fn optional_text(column: &'static str, value: &Value) -> Result<Option<String>, DecodeError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s.clone())),
        other => Err(unexpected(column, other)),
    }
}

/// Genres keyed by their case-folded name, valued by the display name.
///
/// Two genres that differ only in case fold onto one key; the one seen last
/// wins and the collision is logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreCatalog {
    by_key: BTreeMap<String, String>,
}

impl GenreCatalog {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_key = BTreeMap::new();
        for name in names {
            let name = name.into();
            if let Some(previous) = by_key.insert(fold(&name), name.clone()) {
                if previous != name {
                    warn!("Genre '{}' shadows '{}' after case folding", name, previous);
                }
            }
        }
        Self { by_key }
    }

    /// Display name of the genre matching `input` regardless of case
    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.by_key.get(&fold(input)).map(String::as_str)
    }

    /// Case-folded keys in alphabetical order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Case-fold and trim, the normal form of every user search term
pub fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Release years present in the catalog, always `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// A chosen range is acceptable when it lies inside the catalog range
    pub fn accepts(&self, from: i32, to: i32) -> bool {
        self.min <= from && from <= to && to <= self.max
    }
}

/// SearchKind tags which search dimension produced a search event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    #[serde(rename = "search_by_name")]
    Title,
    #[serde(rename = "search_by_actor")]
    Actor,
    #[serde(rename = "search_by_description")]
    Description,
    #[serde(rename = "search_by_genre_and_year")]
    GenreAndYear,
}

impl SearchKind {
    /// Convert enum to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Title => "search_by_name",
            SearchKind::Actor => "search_by_actor",
            SearchKind::Description => "search_by_description",
            SearchKind::GenreAndYear => "search_by_genre_and_year",
        }
    }
}

/// SearchEvent records one new (first page) search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEvent {
    pub id: Uuid,
    pub query_type: SearchKind,
    /// Case-folded, trimmed search term
    pub query_text: String,
    pub timestamp: DateTime<Utc>,
}

impl SearchEvent {
    pub fn new(query_type: SearchKind, query_text: &str) -> Self {
        Self::at(query_type, query_text, Utc::now())
    }

    pub fn at(query_type: SearchKind, query_text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_type,
            query_text: fold(query_text),
            timestamp,
        }
    }
}

/// RankedQuery is one line of the popular queries report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedQuery {
    pub query_type: SearchKind,
    pub query_text: String,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        vec![
            Value::Int(1),
            Value::from("ACADEMY DINOSAUR"),
            Value::Int(2006),
            Value::from("Documentary"),
            Value::from("Penelope Guiness, Rock Dukakis"),
            Value::Float(0.99),
            Value::from("A Epic Drama"),
        ]
    }

    #[test]
    fn decodes_a_full_row() {
        let film = Film::from_row(&row()).unwrap();

        assert_eq!(film.id, 1);
        assert_eq!(film.title, "ACADEMY DINOSAUR");
        assert_eq!(film.release_year, Some(2006));
        assert_eq!(film.genre.as_deref(), Some("Documentary"));
        assert_eq!(film.rental_rate, 0.99);
    }

    #[test]
    fn missing_genre_and_actors_decode_as_none() {
        let mut row = row();
        row[3] = Value::Null;
        row[4] = Value::Null;

        let film = Film::from_row(&row).unwrap();
        assert_eq!(film.genre, None);
        assert_eq!(film.actors, None);
    }

    #[test]
    fn decimal_text_is_accepted_as_price() {
        let mut row = row();
        row[5] = Value::from("4.99");
        assert_eq!(Film::from_row(&row).unwrap().rental_rate, 4.99);
    }

    #[test]
    fn short_rows_are_rejected() {
        let err = Film::from_row(&row()[..5]).unwrap_err();
        assert_eq!(err, DecodeError::ColumnCount { expected: 7, actual: 5 });
    }

    #[test]
    fn missing_title_is_rejected() {
        let mut row = row();
        row[1] = Value::Null;
        assert!(matches!(
            Film::from_row(&row),
            Err(DecodeError::Column { column: "title", .. })
        ));
    }

    #[test]
    fn genre_lookup_round_trips_every_display_name() {
        let genres = GenreCatalog::from_names(["Action", "Sci-Fi", "Documentary"]);

        for key in genres.keys().map(str::to_string).collect::<Vec<_>>() {
            let display = genres.resolve(&key).unwrap().to_string();
            assert_eq!(genres.resolve(&fold(&display)), Some(display.as_str()));
        }
        assert_eq!(genres.resolve("  SCI-FI "), Some("Sci-Fi"));
        assert_eq!(genres.resolve("western"), None);
    }

    #[test]
    fn case_collisions_keep_the_last_genre() {
        let genres = GenreCatalog::from_names(["Drama", "DRAMA"]);
        assert_eq!(genres.len(), 1);
        assert_eq!(genres.resolve("drama"), Some("DRAMA"));
    }

    #[test]
    fn year_range_accepts_only_nested_ranges() {
        let bounds = YearRange::new(2000, 2010).unwrap();

        assert!(bounds.accepts(2000, 2010));
        assert!(bounds.accepts(2005, 2005));
        assert!(!bounds.accepts(1999, 2005));
        assert!(!bounds.accepts(2005, 2011));
        assert!(!bounds.accepts(2008, 2004));
        assert!(YearRange::new(2010, 2000).is_none());
    }

    #[test]
    fn search_event_normalizes_text_and_serializes_its_tag() {
        let event = SearchEvent::new(SearchKind::Actor, "  Penelope ");
        assert_eq!(event.query_text, "penelope");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["query_type"], "search_by_actor");
        assert_eq!(SearchKind::Actor.as_str(), "search_by_actor");
    }
}
