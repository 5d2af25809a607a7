//! Search facade: one operation per search dimension plus the genre and
//! release year lookups behind the genre search.
//!
//! Each search wraps the user's text into a substring pattern, binds the page
//! bounds and decodes the rows into [`Film`]s. Only the first page
//! (`offset == 0`) of a search is recorded in the search log, so a session
//! that pages through many results logs exactly one event.

use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::{AnalyticsLogger, EventStore};
use crate::database::CatalogGateway;
use crate::error::{DecodeError, SearchError};
use crate::metrics::AppMetrics;
use crate::models::{fold, Film, GenreCatalog, Row, SearchKind, Value, YearRange};
use crate::queries::{pattern_wrap, CatalogQuery};

/// A search the user asked for, independent of which page is being shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    Title(String),
    Actor(String),
    Description(String),
    GenreAndYear { genre: String, year_min: i32, year_max: i32 },
}

impl SearchRequest {
    pub fn kind(&self) -> SearchKind {
        match self {
            SearchRequest::Title(_) => SearchKind::Title,
            SearchRequest::Actor(_) => SearchKind::Actor,
            SearchRequest::Description(_) => SearchKind::Description,
            SearchRequest::GenreAndYear { .. } => SearchKind::GenreAndYear,
        }
    }

    /// Text stored in the search log for this request
    pub fn log_text(&self) -> String {
        match self {
            SearchRequest::Title(text) | SearchRequest::Actor(text) | SearchRequest::Description(text) => fold(text),
            SearchRequest::GenreAndYear { genre, year_min, year_max } => {
                format!("{} {}-{}", fold(genre), year_min, year_max)
            }
        }
    }
}

pub struct SearchFacade<C, S> {
    catalog: Arc<C>,
    analytics: Arc<AnalyticsLogger<S>>,
    metrics: Arc<AppMetrics>,
    page_size: u32,
}

impl<C: CatalogGateway, S: EventStore> SearchFacade<C, S> {
    pub fn new(
        catalog: Arc<C>,
        analytics: Arc<AnalyticsLogger<S>>,
        metrics: Arc<AppMetrics>,
        page_size: u32,
    ) -> Self {
        Self {
            catalog,
            analytics,
            metrics,
            page_size: page_size.max(1),
        }
    }

    /// Maximum number of films per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Films whose title contains `text`
    pub async fn by_title(&self, text: &str, offset: u32) -> Result<Vec<Film>, SearchError> {
        self.search(&SearchRequest::Title(text.to_string()), offset).await
    }

    /// Films with a billed actor whose "first last" name contains `text`
    pub async fn by_actor(&self, text: &str, offset: u32) -> Result<Vec<Film>, SearchError> {
        self.search(&SearchRequest::Actor(text.to_string()), offset).await
    }

    /// Films whose description contains `text`
    pub async fn by_description(&self, text: &str, offset: u32) -> Result<Vec<Film>, SearchError> {
        self.search(&SearchRequest::Description(text.to_string()), offset).await
    }

    /// Films of a genre released between `year_min` and `year_max` inclusive
    pub async fn by_genre_and_year(
        &self,
        genre: &str,
        year_min: i32,
        year_max: i32,
        offset: u32,
    ) -> Result<Vec<Film>, SearchError> {
        let request = SearchRequest::GenreAndYear {
            genre: genre.to_string(),
            year_min,
            year_max,
        };
        self.search(&request, offset).await
    }

    /// Run one page of `request`, starting `offset` rows into the result
    pub async fn search(&self, request: &SearchRequest, offset: u32) -> Result<Vec<Film>, SearchError> {
        info!("Search film {}: {:?}, offset: {}", request.kind().as_str(), request, offset);

        let new_search = offset == 0;
        self.metrics.record_page(request.kind(), new_search);
        if new_search {
            self.analytics.record(request.kind(), &request.log_text()).await;
        }

        let limit = self.page_size;
        let query = match request {
            SearchRequest::Title(text) => CatalogQuery::films_by_title(pattern_wrap(text), limit, offset),
            SearchRequest::Actor(text) => CatalogQuery::films_by_actor(pattern_wrap(text), limit, offset),
            SearchRequest::Description(text) => {
                CatalogQuery::films_by_description(pattern_wrap(text), limit, offset)
            }
            SearchRequest::GenreAndYear { genre, year_min, year_max } => {
                CatalogQuery::films_by_genre_and_year(pattern_wrap(genre), *year_min, *year_max, limit, offset)
            }
        };

        let rows = self.catalog.execute(&query).await?;
        let films = rows
            .iter()
            .map(|row| Film::from_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(films)
    }

    /// Genres available in the catalog, keyed by case-folded name
    pub async fn all_genres(&self) -> Result<GenreCatalog, SearchError> {
        info!("Query all genres");
        let rows = self.catalog.execute(&CatalogQuery::all_genres()).await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.first() {
                Some(Value::Text(name)) => names.push(name.clone()),
                Some(Value::Null) => warn!("Skipping category without a name"),
                other => {
                    return Err(DecodeError::Column {
                        column: "name",
                        found: format!("{:?}", other),
                    }
                    .into())
                }
            }
        }
        Ok(GenreCatalog::from_names(names))
    }

    /// Earliest and latest release year, `None` for an empty catalog
    pub async fn year_bounds(&self) -> Result<Option<YearRange>, SearchError> {
        info!("Query min and max year");
        let rows = self.catalog.execute(&CatalogQuery::year_bounds()).await?;
        Ok(rows.first().and_then(|row| decode_year_bounds(row)))
    }
}

fn decode_year_bounds(row: &Row) -> Option<YearRange> {
    let year = |value: Option<&Value>| value.and_then(Value::as_i64).and_then(|y| i32::try_from(y).ok());
    YearRange::new(year(row.first())?, year(row.get(1))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::MemoryEventStore;
    use crate::queries::{Param, QueryName};
    use crate::testing::{build_facade, film, FakeCatalog};

    fn catalog() -> FakeCatalog {
        FakeCatalog::with_films(vec![
            film(1, "ACADEMY DINOSAUR").with_genre("Documentary").with_year(2006).with_actors("Penelope Guiness"),
            film(2, "ACE GOLDFINGER").with_genre("Horror").with_year(2006).with_actors("Bob Fawcett"),
            film(3, "DINOSAUR SECRETARY").with_genre("Action").with_year(2008).with_actors("Lucille Tracy"),
            film(4, "ZORRO ARK").with_genre("Comedy").with_year(2009).with_description("A Intrepid Panorama of a Mad Scientist"),
        ])
    }

    #[tokio::test]
    async fn title_search_finds_every_substring_match() {
        let (facade, _, _) = build_facade(catalog(), 10);

        let films = facade.by_title("dinosaur", 0).await.unwrap();
        let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn binds_pattern_and_page_bounds() {
        let (facade, catalog, _) = build_facade(catalog(), 10);

        facade.by_description("mad", 20).await.unwrap();

        let executed = catalog.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].name, QueryName::FilmsByDescription);
        assert_eq!(
            executed[0].params,
            vec![Param::Text("%mad%".into()), Param::Int(10), Param::Int(20)]
        );
    }

    #[tokio::test]
    async fn genre_search_binds_the_year_range() {
        let (facade, catalog, _) = build_facade(catalog(), 5);

        let films = facade.by_genre_and_year("Action", 2007, 2010, 0).await.unwrap();

        assert_eq!(films.len(), 1);
        assert_eq!(films[0].id, 3);
        assert_eq!(
            catalog.executed()[0].params,
            vec![
                Param::Text("%Action%".into()),
                Param::Int(2007),
                Param::Int(2010),
                Param::Int(5),
                Param::Int(0),
            ]
        );
    }

    #[tokio::test]
    async fn only_first_pages_are_logged() {
        let (facade, _, analytics) = build_facade(catalog(), 1);

        facade.by_actor("Penelope", 0).await.unwrap();
        facade.by_actor("Penelope", 1).await.unwrap();
        facade.by_actor("Penelope", 2).await.unwrap();
        facade.by_genre_and_year("Action", 2006, 2009, 0).await.unwrap();

        let events = analytics.store().map(MemoryEventStore::events).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].query_type, SearchKind::Actor);
        assert_eq!(events[0].query_text, "penelope");
        assert_eq!(events[1].query_type, SearchKind::GenreAndYear);
        assert_eq!(events[1].query_text, "action 2006-2009");
    }

    #[tokio::test]
    async fn failures_stay_distinguishable_from_empty_results() {
        let (failing, _, analytics) = build_facade(FakeCatalog::failing(), 10);
        let err = failing.by_title("dinosaur", 0).await.unwrap_err();
        assert!(matches!(err, SearchError::Gateway(_)));
        // the failed search is still a search the user made
        assert_eq!(analytics.store().unwrap().events().len(), 1);

        let (facade, _, _) = build_facade(catalog(), 10);
        assert!(facade.by_title("nothing", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn genres_resolve_case_insensitively() {
        let (facade, _, _) = build_facade(catalog().with_genres(&["Action", "Sci-Fi"]), 10);

        let genres = facade.all_genres().await.unwrap();
        assert_eq!(genres.resolve("sci-fi"), Some("Sci-Fi"));
        assert_eq!(genres.len(), 2);
    }

    #[tokio::test]
    async fn year_bounds_span_the_catalog() {
        let (facade, _, _) = build_facade(catalog(), 10);
        assert_eq!(facade.year_bounds().await.unwrap(), YearRange::new(2006, 2009));

        let (facade, _, _) = build_facade(FakeCatalog::with_films(Vec::new()), 10);
        assert_eq!(facade.year_bounds().await.unwrap(), None);
    }

    #[test]
    fn log_text_is_normalized() {
        assert_eq!(SearchRequest::Title("  Dino ".into()).log_text(), "dino");
        let request = SearchRequest::GenreAndYear {
            genre: "Sci-Fi".into(),
            year_min: 2005,
            year_max: 2006,
        };
        assert_eq!(request.log_text(), "sci-fi 2005-2006");
    }
}
