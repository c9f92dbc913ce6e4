//! Match repository: the persistent collection of bracket matches.
//!
//! The trait is the only way bracket operations touch storage, so the
//! PostgreSQL implementation can be swapped for the in-memory one in tests
//! and in the server's memory backend.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tokio::sync::RwLock;

use super::timeouts::{DEFAULT_QUERY_TIMEOUT, LONG_OPERATION_TIMEOUT, with_timeout};
use crate::bracket::editor::check_score;
use crate::bracket::{
    BracketError, BracketResult, Match, MatchStatus, MatchUpdate, SagaStep, ValidationError,
};

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// All matches ordered by round, then position
    async fn list_matches(&self) -> BracketResult<Vec<Match>>;

    /// Delete every match and insert `matches` in their place
    async fn replace_all(&self, matches: &[Match]) -> BracketResult<()>;

    /// Apply a partial update to one match
    async fn update_match(&self, identifier: &str, update: &MatchUpdate) -> BracketResult<()>;

    /// Find a match by identifier
    async fn find_match_by_identifier(&self, identifier: &str) -> BracketResult<Option<Match>>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS bracket_matches (
    identifier TEXT PRIMARY KEY,
    round_index INTEGER NOT NULL CHECK (round_index >= 0),
    match_index INTEGER NOT NULL CHECK (match_index >= 0),
    round_name TEXT NOT NULL,
    team1_name TEXT NOT NULL DEFAULT 'TBD',
    team2_name TEXT NOT NULL DEFAULT 'TBD',
    score1 INTEGER NOT NULL DEFAULT 0 CHECK (score1 >= 0),
    score2 INTEGER NOT NULL DEFAULT 0 CHECK (score2 >= 0),
    winner_name TEXT,
    status TEXT NOT NULL DEFAULT 'scheduled',
    next_match_identifier TEXT
)
"#;

const SELECT_COLUMNS: &str = "SELECT identifier, round_index, match_index, round_name, \
     team1_name, team2_name, score1, score2, winner_name, status, next_match_identifier \
     FROM bracket_matches";

/// PostgreSQL implementation of `MatchRepository`
pub struct PgMatchRepository {
    pool: PgPool,
}

impl PgMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `bracket_matches` table if it does not exist
    pub async fn ensure_schema(&self) -> BracketResult<()> {
        with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(SCHEMA).execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    fn row_to_match(row: &PgRow) -> BracketResult<Match> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<MatchStatus>().map_err(BracketError::Integrity)?;

        Ok(Match {
            identifier: row.try_get("identifier")?,
            round_index: to_u32(row.try_get("round_index")?, "round_index")?,
            match_index: to_u32(row.try_get("match_index")?, "match_index")?,
            round_name: row.try_get("round_name")?,
            team1_name: row.try_get("team1_name")?,
            team2_name: row.try_get("team2_name")?,
            score1: to_u32(row.try_get("score1")?, "score1")?,
            score2: to_u32(row.try_get("score2")?, "score2")?,
            winner_name: row.try_get("winner_name")?,
            status,
            next_match_identifier: row.try_get("next_match_identifier")?,
        })
    }
}

fn to_u32(value: i32, column: &str) -> BracketResult<u32> {
    u32::try_from(value)
        .map_err(|_| BracketError::Integrity(format!("negative {column}: {value}")))
}

/// Scores are stored as `INTEGER`; larger values are rejected, not wrapped
fn score_to_i32(score: u32) -> BracketResult<i32> {
    let score = check_score(score)?;
    i32::try_from(score)
        .map_err(|_| BracketError::Validation(ValidationError::ScoreOutOfRange(score)))
}

#[async_trait]
impl MatchRepository for PgMatchRepository {
    async fn list_matches(&self) -> BracketResult<Vec<Match>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY round_index, match_index");
        let rows = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(&sql).fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(Self::row_to_match).collect()
    }

    async fn replace_all(&self, matches: &[Match]) -> BracketResult<()> {
        let scores = matches
            .iter()
            .map(|m| Ok::<_, BracketError>((score_to_i32(m.score1)?, score_to_i32(m.score2)?)))
            .collect::<BracketResult<Vec<(i32, i32)>>>()?;

        with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query("DELETE FROM bracket_matches").execute(&self.pool),
        )
        .await?;

        if matches.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO bracket_matches (identifier, round_index, match_index, round_name, \
             team1_name, team2_name, score1, score2, winner_name, status, next_match_identifier) ",
        );
        builder.push_values(matches.iter().zip(scores), |mut row, (m, (score1, score2))| {
            row.push_bind(&m.identifier)
                .push_bind(m.round_index as i32)
                .push_bind(m.match_index as i32)
                .push_bind(&m.round_name)
                .push_bind(&m.team1_name)
                .push_bind(&m.team2_name)
                .push_bind(score1)
                .push_bind(score2)
                .push_bind(&m.winner_name)
                .push_bind(m.status.as_str())
                .push_bind(&m.next_match_identifier);
        });

        // The delete above is already committed; a failed insert leaves an
        // empty table until generation is run again.
        with_timeout(LONG_OPERATION_TIMEOUT, builder.build().execute(&self.pool))
            .await
            .map_err(|e| BracketError::partial(SagaStep::InsertMatches, e.into()))?;

        Ok(())
    }

    async fn update_match(&self, identifier: &str, update: &MatchUpdate) -> BracketResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let score1 = update.score1.map(score_to_i32).transpose()?;
        let score2 = update.score2.map(score_to_i32).transpose()?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE bracket_matches SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(name) = &update.team1_name {
                fields.push("team1_name = ").push_bind_unseparated(name.clone());
            }
            if let Some(name) = &update.team2_name {
                fields.push("team2_name = ").push_bind_unseparated(name.clone());
            }
            if let Some(score) = score1 {
                fields.push("score1 = ").push_bind_unseparated(score);
            }
            if let Some(score) = score2 {
                fields.push("score2 = ").push_bind_unseparated(score);
            }
            if let Some(winner) = &update.winner_name {
                fields.push("winner_name = ").push_bind_unseparated(winner.clone());
            }
            if let Some(status) = update.status {
                fields.push("status = ").push_bind_unseparated(status.as_str());
            }
        }
        builder.push(" WHERE identifier = ").push_bind(identifier);

        let result = with_timeout(DEFAULT_QUERY_TIMEOUT, builder.build().execute(&self.pool)).await?;
        if result.rows_affected() == 0 {
            return Err(BracketError::MatchNotFound(identifier.to_string()));
        }

        Ok(())
    }

    async fn find_match_by_identifier(&self, identifier: &str) -> BracketResult<Option<Match>> {
        let sql = format!("{SELECT_COLUMNS} WHERE identifier = $1");
        let row = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(&sql).bind(identifier).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(Self::row_to_match).transpose()
    }
}

/// In-process implementation of `MatchRepository`.
///
/// Holds the match set behind a `tokio::sync::RwLock`. Each call is applied
/// under a single lock acquisition.
#[derive(Default)]
pub struct InMemoryMatchRepository {
    matches: RwLock<Vec<Match>>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing match set
    pub fn with_matches(matches: Vec<Match>) -> Self {
        let mut matches = matches;
        matches.sort_by_key(|m| (m.round_index, m.match_index));
        Self {
            matches: RwLock::new(matches),
        }
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn list_matches(&self) -> BracketResult<Vec<Match>> {
        Ok(self.matches.read().await.clone())
    }

    async fn replace_all(&self, matches: &[Match]) -> BracketResult<()> {
        for m in matches {
            check_score(m.score1)?;
            check_score(m.score2)?;
        }
        let mut replacement = matches.to_vec();
        replacement.sort_by_key(|m| (m.round_index, m.match_index));
        *self.matches.write().await = replacement;
        Ok(())
    }

    async fn update_match(&self, identifier: &str, update: &MatchUpdate) -> BracketResult<()> {
        update.score1.map(check_score).transpose()?;
        update.score2.map(check_score).transpose()?;
        let mut matches = self.matches.write().await;
        let target = matches
            .iter_mut()
            .find(|m| m.identifier == identifier)
            .ok_or_else(|| BracketError::MatchNotFound(identifier.to_string()))?;
        update.apply(target);
        Ok(())
    }

    async fn find_match_by_identifier(&self, identifier: &str) -> BracketResult<Option<Match>> {
        let matches = self.matches.read().await;
        Ok(matches.iter().find(|m| m.identifier == identifier).cloned())
    }
}
