//! # Bracket Engine
//!
//! A single-elimination tournament bracket library.
//!
//! A bracket is a fixed, power-of-two grid of slots seeded with entrant
//! names. Matches form a binary tree built leaf to root: every match except
//! the final feeds exactly one slot of a parent match in the next round.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Data model, generation, editing, advancement and reset
//! - [`db`]: Match repository trait with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::{generator::generate, MatchStatus, BYE};
//!
//! let entrants: Vec<String> = (1..=30).map(|i| format!("Team {i}")).collect();
//! let matches = generate(&entrants, 32).unwrap();
//!
//! assert_eq!(matches.len(), 31);
//! assert_eq!(matches[0].team2_name, BYE);
//! assert_eq!(matches[0].status, MatchStatus::Completed);
//! ```

/// Bracket model and operations.
pub mod bracket;
pub use bracket::{
    BracketConfig, BracketError, BracketManager, BracketResult, BracketState, EditSession,
    Match, MatchStatus, ScoreSubmission, TeamSlot, ValidationError,
};

/// Match storage.
pub mod db;
pub use db::{InMemoryMatchRepository, MatchRepository, PgMatchRepository};
