//! Test doubles: an in-memory catalog that answers the search statements the
//! way the SQL templates do, and helpers wiring it into a facade.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::analytics::{AnalyticsLogger, MemoryEventStore};
use crate::database::CatalogGateway;
use crate::error::GatewayError;
use crate::metrics::AppMetrics;
use crate::models::{Film, Row, Value};
use crate::queries::{CatalogQuery, Param, QueryName};
use crate::search::SearchFacade;

pub(crate) fn film(id: i64, title: &str) -> Film {
    Film {
        id,
        title: title.to_string(),
        release_year: Some(2006),
        genre: None,
        actors: None,
        rental_rate: 2.99,
        description: None,
    }
}

impl Film {
    pub(crate) fn with_genre(mut self, genre: &str) -> Self {
        self.genre = Some(genre.to_string());
        self
    }

    pub(crate) fn with_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub(crate) fn with_actors(mut self, actors: &str) -> Self {
        self.actors = Some(actors.to_string());
        self
    }

    pub(crate) fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Numbered films titled "FILM 1", "FILM 2", ...
pub(crate) fn numbered_films(count: usize) -> Vec<Film> {
    (1..=count as i64).map(|id| film(id, &format!("FILM {}", id))).collect()
}

pub(crate) fn film_row(film: &Film) -> Row {
    vec![
        Value::Int(film.id),
        Value::Text(film.title.clone()),
        film.release_year.map(i64::from).into(),
        film.genre.as_deref().into(),
        film.actors.as_deref().into(),
        Value::Float(film.rental_rate),
        film.description.as_deref().into(),
    ]
}

pub(crate) struct FakeCatalog {
    films: Vec<Film>,
    genres: Option<Vec<String>>,
    executed: Mutex<Vec<CatalogQuery>>,
    failing: bool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn with_films(films: Vec<Film>) -> Self {
        Self {
            films,
            genres: None,
            executed: Mutex::new(Vec::new()),
            failing: false,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// A catalog whose every statement fails
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::with_films(Vec::new())
        }
    }

    /// Genres listed by the catalog instead of those of its films
    pub(crate) fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = Some(genres.iter().map(|g| g.to_string()).collect());
        self
    }

    pub(crate) fn executed(&self) -> Vec<CatalogQuery> {
        self.executed.lock().unwrap().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn genre_rows(&self) -> Vec<Row> {
        let mut names: Vec<String> = match &self.genres {
            Some(genres) => genres.clone(),
            None => self.films.iter().filter_map(|f| f.genre.clone()).collect(),
        };
        names.sort();
        names.dedup();
        names.into_iter().map(|name| vec![Value::Text(name)]).collect()
    }

    fn year_bounds_row(&self) -> Vec<Row> {
        let years = self.films.iter().filter_map(|f| f.release_year.map(i64::from));
        let min = years.clone().min();
        let max = years.max();
        vec![vec![min.into(), max.into()]]
    }

    fn search_rows(&self, query: &CatalogQuery) -> Vec<Row> {
        let needle = match query.params.first() {
            Some(Param::Text(pattern)) => unwrap_pattern(pattern),
            _ => String::new(),
        };
        let int = |index: usize| match query.params.get(index) {
            Some(Param::Int(v)) => *v,
            _ => 0,
        };
        let contains = |haystack: Option<&str>| haystack.is_some_and(|h| h.to_lowercase().contains(&needle));

        let n = query.params.len();
        let (limit, offset) = (int(n - 2) as usize, int(n - 1) as usize);

        self.films
            .iter()
            .filter(|film| match query.name {
                QueryName::FilmsByTitle => contains(Some(&film.title)),
                QueryName::FilmsByDescription => contains(film.description.as_deref()),
                QueryName::FilmsByActor => film
                    .actors
                    .as_deref()
                    .is_some_and(|actors| actors.split(", ").any(|name| contains(Some(name)))),
                QueryName::FilmsByGenreAndYear => {
                    let year = film.release_year.map(i64::from);
                    contains(film.genre.as_deref()) && year.is_some_and(|y| int(1) <= y && y <= int(2))
                }
                QueryName::AllGenres | QueryName::YearBounds => false,
            })
            .skip(offset)
            .take(limit)
            .map(film_row)
            .collect()
    }
}

/// Turn "%te!_xt%" back into the lower-cased literal "te_xt"
fn unwrap_pattern(pattern: &str) -> String {
    let inner = pattern.strip_prefix('%').and_then(|p| p.strip_suffix('%')).unwrap_or(pattern);
    let mut literal = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '!' => literal.extend(chars.next()),
            other => literal.push(other),
        }
    }
    literal.to_lowercase()
}

impl CatalogGateway for FakeCatalog {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<Row>, GatewayError> {
        self.executed.lock().unwrap().push(query.clone());
        if !self.is_open() {
            return Err(GatewayError::Closed);
        }
        query.check()?;

        Ok(match query.name {
            QueryName::AllGenres => self.genre_rows(),
            QueryName::YearBounds => self.year_bounds_row(),
            _ => self.search_rows(query),
        })
    }

    fn is_open(&self) -> bool {
        !self.failing && !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn build_facade(
    catalog: FakeCatalog,
    page_size: u32,
) -> (
    SearchFacade<FakeCatalog, MemoryEventStore>,
    Arc<FakeCatalog>,
    Arc<AnalyticsLogger<MemoryEventStore>>,
) {
    let metrics = Arc::new(AppMetrics::new().unwrap());
    let catalog = Arc::new(catalog);
    let analytics = Arc::new(AnalyticsLogger::new(MemoryEventStore::new(), metrics.clone()));
    let facade = SearchFacade::new(catalog.clone(), analytics.clone(), metrics, page_size);
    (facade, catalog, analytics)
}
