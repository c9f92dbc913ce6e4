//! Single-elimination bracket engine.
//!
//! This module provides:
//! - Bracket generation from a list of entrant names, with a fixed bye rule
//! - Match editing with winner resolution from scores or a manual pick
//! - Single-hop advancement of a winner into its parent match
//! - Single-hop reset of a completed match
//! - A read-only view with rounds, champion and stale-link detection
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::bracket::{BracketConfig, BracketManager, ScoreSubmission};
//! use bracket_engine::db::InMemoryMatchRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Arc::new(InMemoryMatchRepository::new());
//!     let manager = BracketManager::new(repo, BracketConfig::default())?;
//!
//!     let entrants: Vec<String> = (1..=32).map(|i| format!("Team {i}")).collect();
//!     manager.generate(&entrants).await?;
//!
//!     let (session, _view) = manager.load_for_edit("R1-M1").await?;
//!     let outcome = manager.submit(&session, ScoreSubmission::new(3, 1)).await?;
//!     println!("{} advances to {:?}", outcome.winner_name, outcome.advanced_to);
//!
//!     Ok(())
//! }
//! ```

pub mod editor;
pub mod errors;
pub mod generator;
pub mod manager;
pub mod models;
pub mod topology;
pub mod view;

pub use editor::{EditSession, EditView, ScoreSubmission};
pub use errors::{BracketError, BracketResult, ErrorKind, SagaStep, ValidationError};
pub use generator::parse_entrants;
pub use manager::{BracketManager, GenerationReport, ResetOutcome, SubmitOutcome};
pub use models::{
    BYE, BracketConfig, DEFAULT_SLOT_COUNT, MAX_SCORE, Match, MatchStatus, MatchUpdate, TBD, TeamSlot,
    is_sentinel, match_identifier, round_name, round_names,
};
pub use topology::{BracketTopology, FeedTarget, MatchNode};
pub use view::{Bracket, BracketState, OrphanedResult, RoundView, StaleLink};
