//! Parameterized statements run against the film catalog.
//!
//! Every film search returns the same seven columns (id, title, year, genre,
//! actors, rental rate, description), one row per film, ordered by film id so
//! that LIMIT/OFFSET pages line up. `LIKE` predicates use `!` as the escape
//! character, see [`escape_like`].

use std::fmt;

use crate::error::GatewayError;

/// Builds a film search template around one WHERE predicate
macro_rules! film_search {
    ($predicate:literal) => {
        concat!(
            "SELECT f.film_id, f.title, f.release_year, c.name AS genre, ",
            "GROUP_CONCAT(CONCAT(a.first_name, ' ', a.last_name) ",
            "ORDER BY a.first_name, a.last_name SEPARATOR ', ') AS actors, ",
            "f.rental_rate, f.description ",
            "FROM film AS f ",
            "LEFT JOIN film_category AS fc ON f.film_id = fc.film_id ",
            "LEFT JOIN category AS c ON fc.category_id = c.category_id ",
            "LEFT JOIN film_actor AS fa ON f.film_id = fa.film_id ",
            "LEFT JOIN actor AS a ON fa.actor_id = a.actor_id ",
            "WHERE ",
            $predicate,
            " GROUP BY f.film_id, f.title, f.release_year, c.name, f.rental_rate, f.description ",
            "ORDER BY f.film_id ",
            "LIMIT ? OFFSET ?"
        )
    };
}

pub const FILMS_BY_TITLE: &str = film_search!("f.title LIKE ? ESCAPE '!'");

// Filter through EXISTS so the actor list still names every billed actor
pub const FILMS_BY_ACTOR: &str = film_search!(
    "EXISTS (SELECT 1 FROM film_actor AS fa2 JOIN actor AS a2 ON fa2.actor_id = a2.actor_id \
     WHERE fa2.film_id = f.film_id AND CONCAT(a2.first_name, ' ', a2.last_name) LIKE ? ESCAPE '!')"
);

pub const FILMS_BY_DESCRIPTION: &str = film_search!("f.description LIKE ? ESCAPE '!'");

pub const FILMS_BY_GENRE_AND_YEAR: &str =
    film_search!("c.name LIKE ? ESCAPE '!' AND f.release_year BETWEEN ? AND ?");

pub const ALL_GENRES: &str = "SELECT DISTINCT name FROM category ORDER BY name";

pub const YEAR_BOUNDS: &str = "SELECT MIN(release_year), MAX(release_year) FROM film";

/// Which statement a [`CatalogQuery`] runs; used as a label in logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    FilmsByTitle,
    FilmsByActor,
    FilmsByDescription,
    FilmsByGenreAndYear,
    AllGenres,
    YearBounds,
}

impl QueryName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryName::FilmsByTitle => "films_by_title",
            QueryName::FilmsByActor => "films_by_actor",
            QueryName::FilmsByDescription => "films_by_description",
            QueryName::FilmsByGenreAndYear => "films_by_genre_and_year",
            QueryName::AllGenres => "all_genres",
            QueryName::YearBounds => "year_bounds",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positional statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i64),
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v.into())
    }
}

impl From<u32> for Param {
    fn from(v: u32) -> Self {
        Param::Int(v.into())
    }
}

/// A template with `?` placeholders and the parameters bound to them, in order
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub name: QueryName,
    pub template: &'static str,
    pub params: Vec<Param>,
}

impl CatalogQuery {
    pub fn new(name: QueryName, template: &'static str, params: Vec<Param>) -> Self {
        Self {
            name,
            template,
            params,
        }
    }

    /// Number of positional placeholders in the template
    pub fn placeholders(&self) -> usize {
        self.template.matches('?').count()
    }

    /// Fails unless there is exactly one parameter per placeholder
    pub fn check(&self) -> Result<(), GatewayError> {
        let expected = self.placeholders();
        if expected != self.params.len() {
            return Err(GatewayError::ParameterCount {
                query: self.name,
                expected,
                actual: self.params.len(),
            });
        }
        Ok(())
    }

    pub fn films_by_title(pattern: String, limit: u32, offset: u32) -> Self {
        Self::new(
            QueryName::FilmsByTitle,
            FILMS_BY_TITLE,
            vec![pattern.into(), limit.into(), offset.into()],
        )
    }

    pub fn films_by_actor(pattern: String, limit: u32, offset: u32) -> Self {
        Self::new(
            QueryName::FilmsByActor,
            FILMS_BY_ACTOR,
            vec![pattern.into(), limit.into(), offset.into()],
        )
    }

    pub fn films_by_description(pattern: String, limit: u32, offset: u32) -> Self {
        Self::new(
            QueryName::FilmsByDescription,
            FILMS_BY_DESCRIPTION,
            vec![pattern.into(), limit.into(), offset.into()],
        )
    }

    pub fn films_by_genre_and_year(
        pattern: String,
        year_min: i32,
        year_max: i32,
        limit: u32,
        offset: u32,
    ) -> Self {
        Self::new(
            QueryName::FilmsByGenreAndYear,
            FILMS_BY_GENRE_AND_YEAR,
            vec![
                pattern.into(),
                year_min.into(),
                year_max.into(),
                limit.into(),
                offset.into(),
            ],
        )
    }

    pub fn all_genres() -> Self {
        Self::new(QueryName::AllGenres, ALL_GENRES, Vec::new())
    }

    pub fn year_bounds() -> Self {
        Self::new(QueryName::YearBounds, YEAR_BOUNDS, Vec::new())
    }
}

/// Escape `LIKE` wildcards so user text matches literally
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(ch);
    }
    escaped
}

/// Wrap user text into a substring match pattern
pub fn pattern_wrap(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_builders_match_their_placeholders() {
        let queries = [
            CatalogQuery::films_by_title(pattern_wrap("dino"), 10, 0),
            CatalogQuery::films_by_actor(pattern_wrap("penelope"), 10, 0),
            CatalogQuery::films_by_description(pattern_wrap("epic"), 10, 20),
            CatalogQuery::films_by_genre_and_year(pattern_wrap("action"), 2000, 2010, 10, 0),
            CatalogQuery::all_genres(),
            CatalogQuery::year_bounds(),
        ];

        for query in &queries {
            assert!(query.check().is_ok(), "{} is malformed", query.name);
        }
    }

    #[test]
    fn parameter_count_must_match_placeholders() {
        let short = CatalogQuery::new(
            QueryName::FilmsByTitle,
            FILMS_BY_TITLE,
            vec![Param::Text("%dino%".into()), Param::Int(10)],
        );

        match short.check() {
            Err(GatewayError::ParameterCount { query, expected, actual }) => {
                assert_eq!(query, QueryName::FilmsByTitle);
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("expected a parameter count error, got {:?}", other),
        }

        let mut long = CatalogQuery::all_genres();
        long.params.push(Param::Int(1));
        assert!(matches!(
            long.check(),
            Err(GatewayError::ParameterCount { expected: 0, actual: 1, .. })
        ));
    }

    #[test]
    fn pagination_bounds_are_the_last_two_parameters() {
        let query = CatalogQuery::films_by_genre_and_year("%x%".into(), 2001, 2005, 10, 30);
        assert_eq!(
            query.params,
            vec![
                Param::Text("%x%".into()),
                Param::Int(2001),
                Param::Int(2005),
                Param::Int(10),
                Param::Int(30),
            ]
        );
    }

    #[test]
    fn templates_group_and_page() {
        for template in [FILMS_BY_TITLE, FILMS_BY_ACTOR, FILMS_BY_DESCRIPTION, FILMS_BY_GENRE_AND_YEAR] {
            assert!(template.contains("GROUP BY f.film_id"));
            assert!(template.contains("ORDER BY f.film_id"));
            assert!(template.ends_with("LIMIT ? OFFSET ?"));
        }
    }

    #[test]
    fn wildcards_in_user_text_are_escaped() {
        assert_eq!(pattern_wrap("dino"), "%dino%");
        assert_eq!(pattern_wrap("100%"), "%100!%%");
        assert_eq!(pattern_wrap("a_b!"), "%a!_b!!%");
        assert_eq!(pattern_wrap(""), "%%");
    }
}
