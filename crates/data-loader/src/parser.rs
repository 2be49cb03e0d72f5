//! Parser for the TMDB movie tables.
//!
//! Two CSV files feed the batch job:
//! - movies table: `id, title, overview, genres, keywords, ...`
//! - credits table: `movie_id, title, cast, crew`
//!
//! Both are keyed by title. Extra columns are ignored; the columns listed
//! above must be present in the header.

use crate::error::{DataLoadError, Result};
use crate::types::{MovieId, RawMovie};
use csv::StringRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const MOVIES_COLUMNS: [&str; 4] = ["title", "overview", "genres", "keywords"];
const CREDITS_COLUMNS: [&str; 4] = ["movie_id", "title", "cast", "crew"];

/// One row of the movies table. Every field may be blank in the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieRow {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub genres: Option<String>,
    pub keywords: Option<String>,
}

/// One row of the credits table.
///
/// `movie_id` stays text here; a value that is not a number makes the
/// joined row incomplete rather than failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditsRow {
    pub movie_id: Option<String>,
    pub title: Option<String>,
    pub cast: Option<String>,
    pub crew: Option<String>,
}

/// Result of joining the two tables, with counts of what was discarded
#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub movies: Vec<RawMovie>,
    /// Joined rows dropped because a required field was blank
    pub dropped_incomplete: usize,
    /// Movies rows whose title has no credits row
    pub unmatched: usize,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|_| DataLoadError::FileNotFound {
        path: path.display().to_string(),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse the movies table from disk
pub fn parse_movies(path: &Path) -> Result<Vec<MovieRow>> {
    parse_table(open(path)?, &file_label(path), &MOVIES_COLUMNS)
}

/// Parse the credits table from disk
pub fn parse_credits(path: &Path) -> Result<Vec<CreditsRow>> {
    parse_table(open(path)?, &file_label(path), &CREDITS_COLUMNS)
}

/// Parse any CSV source whose header contains `required` columns.
pub fn parse_table<R, T>(source: R, file: &str, required: &[&str]) -> Result<Vec<T>>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(source);
    let headers = reader.headers()?.clone();
    check_columns(&headers, file, required)?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| DataLoadError::ParseError {
                file: file.to_string(),
                line,
                reason: e.to_string(),
            })?;
        rows.push(row);
    }

    debug!("Parsed {} rows from {}", rows.len(), file);
    Ok(rows)
}

fn check_columns(headers: &StringRecord, file: &str, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(DataLoadError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Load both tables and join them.
///
/// The two files are parsed in parallel with `rayon::join`.
pub fn load_from_files(movies_path: &Path, credits_path: &Path) -> Result<JoinOutcome> {
    info!(
        "Loading movie tables from {} and {}",
        movies_path.display(),
        credits_path.display()
    );

    let (movies, credits) = rayon::join(
        || parse_movies(movies_path),
        || parse_credits(credits_path),
    );
    let movies = movies?;
    let credits = credits?;

    let outcome = join_on_title(&movies, &credits);
    info!(
        "Joined {} movies rows with {} credits rows into {} records ({} incomplete, {} unmatched)",
        movies.len(),
        credits.len(),
        outcome.movies.len(),
        outcome.dropped_incomplete,
        outcome.unmatched
    );
    Ok(outcome)
}

/// Inner-join movies and credits on exact title.
///
/// Output order follows the movies table; a title present several times in
/// the credits table yields one joined row per credits row, in credits order.
/// Joined rows with any blank required field are dropped.
pub fn join_on_title(movies: &[MovieRow], credits: &[CreditsRow]) -> JoinOutcome {
    let mut by_title: HashMap<&str, Vec<&CreditsRow>> = HashMap::new();
    for row in credits {
        if let Some(title) = row.title.as_deref() {
            by_title.entry(title).or_default().push(row);
        }
    }

    let mut outcome = JoinOutcome::default();
    for movie in movies {
        let Some(matches) = movie.title.as_deref().and_then(|t| by_title.get(t)) else {
            outcome.unmatched += 1;
            continue;
        };

        for credit in matches {
            match complete_row(movie, credit) {
                Some(raw) => outcome.movies.push(raw),
                None => {
                    debug!("Dropping incomplete row for title {:?}", movie.title);
                    outcome.dropped_incomplete += 1;
                }
            }
        }
    }

    if outcome.dropped_incomplete > 0 {
        warn!(
            "Dropped {} incomplete rows after joining on title",
            outcome.dropped_incomplete
        );
    }
    outcome
}

fn present(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

fn parse_movie_id(field: &Option<String>) -> Option<MovieId> {
    field.as_deref()?.trim().parse().ok()
}

fn complete_row(movie: &MovieRow, credit: &CreditsRow) -> Option<RawMovie> {
    Some(RawMovie {
        movie_id: parse_movie_id(&credit.movie_id)?,
        title: present(&movie.title)?,
        overview: present(&movie.overview)?,
        genres: present(&movie.genres)?,
        keywords: present(&movie.keywords)?,
        cast: present(&credit.cast)?,
        crew: present(&credit.crew)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIES_CSV: &str = "\
budget,genres,id,keywords,overview,title
100,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}]\",19995,[],A marine on an alien world.,Avatar
50,[],285,[],,Pirates
10,[],1,[],Two ghosts.,The Host
";

    const CREDITS_CSV: &str = "\
movie_id,title,cast,crew
19995,Avatar,[],[]
285,Pirates,[],[]
7,The Host,[],[]
8,The Host,[],[]
";

    fn load() -> (Vec<MovieRow>, Vec<CreditsRow>) {
        let movies = parse_table(MOVIES_CSV.as_bytes(), "movies.csv", &MOVIES_COLUMNS).unwrap();
        let credits =
            parse_table(CREDITS_CSV.as_bytes(), "credits.csv", &CREDITS_COLUMNS).unwrap();
        (movies, credits)
    }

    #[test]
    fn test_parse_movies_keeps_json_text() {
        let (movies, _) = load();
        assert_eq!(movies.len(), 3);
        assert_eq!(
            movies[0].genres.as_deref(),
            Some("[{\"id\": 28, \"name\": \"Action\"}]")
        );
    }

    #[test]
    fn test_missing_column_is_reported() {
        let result: Result<Vec<CreditsRow>> =
            parse_table("movie_id,title\n1,A\n".as_bytes(), "credits.csv", &CREDITS_COLUMNS);
        assert!(matches!(
            result,
            Err(DataLoadError::MissingColumn { ref column, .. }) if column == "cast"
        ));
    }

    #[test]
    fn test_bad_movie_id_drops_only_that_row() {
        let credits: Vec<CreditsRow> = parse_table(
            "movie_id,title,cast,crew\nabc,Avatar,[],[]\n 42 ,The Host,[],[]\n".as_bytes(),
            "credits.csv",
            &CREDITS_COLUMNS,
        )
        .unwrap();
        let (movies, _) = load();

        let outcome = join_on_title(&movies, &credits);
        // Avatar has a bad id; Pirates has no credits row at all
        assert_eq!(outcome.dropped_incomplete, 1);
        assert_eq!(outcome.unmatched, 1);
        let ids: Vec<MovieId> = outcome.movies.iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![42]);
    }

    #[test]
    fn test_join_drops_incomplete_and_expands_duplicates() {
        let (movies, credits) = load();
        let outcome = join_on_title(&movies, &credits);

        // Pirates has a blank overview; The Host matches two credits rows
        assert_eq!(outcome.dropped_incomplete, 1);
        assert_eq!(outcome.unmatched, 0);
        let ids: Vec<MovieId> = outcome.movies.iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![19995, 7, 8]);
    }

    #[test]
    fn test_join_counts_unmatched_titles() {
        let movies = vec![MovieRow {
            title: Some("Nowhere".to_string()),
            ..Default::default()
        }];
        let outcome = join_on_title(&movies, &[]);
        assert_eq!(outcome.unmatched, 1);
        assert!(outcome.movies.is_empty());
    }
}
