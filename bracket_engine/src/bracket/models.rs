//! Bracket data models for single-elimination tournaments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ValidationError;

/// Placeholder for a slot whose occupant is not yet determined
pub const TBD: &str = "TBD";

/// Placeholder for a deliberately empty slot
pub const BYE: &str = "BYE";

/// Default number of leaf slots in a bracket
pub const DEFAULT_SLOT_COUNT: usize = 32;

/// Highest score a match can record; scores are stored as `INTEGER`
pub const MAX_SCORE: u32 = i32::MAX as u32;

/// Returns true if `name` is one of the slot sentinels (`TBD` or `BYE`)
pub fn is_sentinel(name: &str) -> bool {
    name == TBD || name == BYE
}

/// Build the identifier of a match from its zero-based round and position.
///
/// Identifiers are one-based in both components: round 0, match 0 is `R1-M1`.
pub fn match_identifier(round_index: u32, match_index: u32) -> String {
    format!("R{}-M{}", round_index + 1, match_index + 1)
}

/// Display name for a round, counted back from the final.
///
/// - last round: `Final`
/// - second to last: `Semifinals`
/// - third to last: `Quarterfinals`
/// - anything earlier: `Round of N` where N is the number of entrants left
pub fn round_name(round_index: u32, round_count: u32) -> String {
    let remaining = round_count.saturating_sub(round_index);
    match remaining {
        0 | 1 => "Final".to_string(),
        2 => "Semifinals".to_string(),
        3 => "Quarterfinals".to_string(),
        n => format!("Round of {}", 1u64 << n),
    }
}

/// Ordered list of round names for a bracket with `round_count` rounds
pub fn round_names(round_count: u32) -> Vec<String> {
    (0..round_count)
        .map(|round| round_name(round, round_count))
        .collect()
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not yet played
    #[default]
    Scheduled,
    /// Result recorded
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// One of the two team slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSlot {
    Team1,
    Team2,
}

impl TeamSlot {
    /// Slot of the parent match fed by the match at `match_index`.
    ///
    /// Even positions feed `Team1`, odd positions feed `Team2`. This is the
    /// only place the parity rule lives.
    pub fn feeding(match_index: u32) -> Self {
        if match_index % 2 == 0 {
            TeamSlot::Team1
        } else {
            TeamSlot::Team2
        }
    }

    pub fn other(&self) -> Self {
        match self {
            TeamSlot::Team1 => TeamSlot::Team2,
            TeamSlot::Team2 => TeamSlot::Team1,
        }
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSlot::Team1 => f.write_str("team1"),
            TeamSlot::Team2 => f.write_str("team2"),
        }
    }
}

/// A single match in the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Stable key, `R{round+1}-M{index+1}`
    pub identifier: String,
    /// Zero-based round number
    pub round_index: u32,
    /// Zero-based position within the round
    pub match_index: u32,
    /// Display label for the round
    pub round_name: String,
    pub team1_name: String,
    pub team2_name: String,
    pub score1: u32,
    pub score2: u32,
    /// Set only while `status` is `Completed`
    pub winner_name: Option<String>,
    pub status: MatchStatus,
    /// Identifier of the parent match, `None` for the final
    pub next_match_identifier: Option<String>,
}

impl Match {
    /// Create a scheduled match with both slots set to `TBD`
    pub fn placeholder(
        round_index: u32,
        match_index: u32,
        round_name: String,
        next_match_identifier: Option<String>,
    ) -> Self {
        Self {
            identifier: match_identifier(round_index, match_index),
            round_index,
            match_index,
            round_name,
            team1_name: TBD.to_string(),
            team2_name: TBD.to_string(),
            score1: 0,
            score2: 0,
            winner_name: None,
            status: MatchStatus::Scheduled,
            next_match_identifier,
        }
    }

    /// Name currently occupying `slot`
    pub fn team_name(&self, slot: TeamSlot) -> &str {
        match slot {
            TeamSlot::Team1 => &self.team1_name,
            TeamSlot::Team2 => &self.team2_name,
        }
    }

    /// Which slot the recorded winner occupies, if any
    pub fn winner_slot(&self) -> Option<TeamSlot> {
        let winner = self.winner_name.as_deref()?;
        if winner == self.team1_name {
            Some(TeamSlot::Team1)
        } else if winner == self.team2_name {
            Some(TeamSlot::Team2)
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// True if either side is a `BYE`
    pub fn has_bye(&self) -> bool {
        self.team1_name == BYE || self.team2_name == BYE
    }

    /// Slot the parent match receives this match's winner into
    pub fn feeds(&self) -> Option<TeamSlot> {
        self.next_match_identifier
            .as_ref()
            .map(|_| TeamSlot::feeding(self.match_index))
    }
}

/// Partial update applied to a persisted match.
///
/// `None` leaves a field untouched. `winner_name` is doubly optional so a
/// winner can be cleared (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub team1_name: Option<String>,
    pub team2_name: Option<String>,
    pub score1: Option<u32>,
    pub score2: Option<u32>,
    pub winner_name: Option<Option<String>>,
    pub status: Option<MatchStatus>,
}

impl MatchUpdate {
    /// Record a finished match
    pub fn completed(score1: u32, score2: u32, winner_name: String) -> Self {
        Self {
            score1: Some(score1),
            score2: Some(score2),
            winner_name: Some(Some(winner_name)),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        }
    }

    /// Record a winner without touching the scores
    pub fn walkover(winner_name: String) -> Self {
        Self {
            winner_name: Some(Some(winner_name)),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        }
    }

    /// Return a match to its unplayed state
    pub fn cleared() -> Self {
        Self {
            score1: Some(0),
            score2: Some(0),
            winner_name: Some(None),
            status: Some(MatchStatus::Scheduled),
            ..Default::default()
        }
    }

    /// Overwrite a single team slot
    pub fn slot(slot: TeamSlot, name: impl Into<String>) -> Self {
        let name = name.into();
        match slot {
            TeamSlot::Team1 => Self {
                team1_name: Some(name),
                ..Default::default()
            },
            TeamSlot::Team2 => Self {
                team2_name: Some(name),
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply this update in place
    pub fn apply(&self, target: &mut Match) {
        if let Some(name) = &self.team1_name {
            target.team1_name = name.clone();
        }
        if let Some(name) = &self.team2_name {
            target.team2_name = name.clone();
        }
        if let Some(score) = self.score1 {
            target.score1 = score;
        }
        if let Some(score) = self.score2 {
            target.score2 = score;
        }
        if let Some(winner) = &self.winner_name {
            target.winner_name = winner.clone();
        }
        if let Some(status) = self.status {
            target.status = status;
        }
    }
}

/// Bracket configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Number of leaf slots (power of two)
    pub slot_count: usize,
    /// Shuffle entrants before seeding instead of using input order
    pub shuffle_entrants: bool,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            shuffle_entrants: false,
        }
    }
}

impl BracketConfig {
    /// Create a configuration with the given slot count and input-order seeding
    pub fn with_slots(slot_count: usize) -> Self {
        Self {
            slot_count,
            ..Default::default()
        }
    }

    /// Check that the slot count describes a bracket with at least one round
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_slot_count(self.slot_count)
    }

    /// Number of rounds, `log2(slot_count)`
    pub fn round_count(&self) -> u32 {
        self.slot_count.trailing_zeros()
    }
}

pub(crate) fn validate_slot_count(slot_count: usize) -> Result<(), ValidationError> {
    if slot_count < 2 || !slot_count.is_power_of_two() {
        return Err(ValidationError::InvalidSlotCount(slot_count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_identifier_is_one_based() {
        assert_eq!(match_identifier(0, 0), "R1-M1");
        assert_eq!(match_identifier(1, 7), "R2-M8");
        assert_eq!(match_identifier(4, 0), "R5-M1");
    }

    #[test]
    fn test_round_names_for_32_slots() {
        assert_eq!(
            round_names(5),
            vec![
                "Round of 32",
                "Round of 16",
                "Quarterfinals",
                "Semifinals",
                "Final"
            ]
        );
    }

    #[test]
    fn test_round_names_for_small_bracket() {
        assert_eq!(round_names(1), vec!["Final"]);
        assert_eq!(round_names(2), vec!["Semifinals", "Final"]);
    }

    #[test]
    fn test_team_slot_parity() {
        assert_eq!(TeamSlot::feeding(0), TeamSlot::Team1);
        assert_eq!(TeamSlot::feeding(1), TeamSlot::Team2);
        assert_eq!(TeamSlot::feeding(14), TeamSlot::Team1);
        assert_eq!(TeamSlot::feeding(15), TeamSlot::Team2);
        assert_eq!(TeamSlot::Team1.other(), TeamSlot::Team2);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [MatchStatus::Scheduled, MatchStatus::Completed] {
            assert_eq!(status.as_str().parse::<MatchStatus>(), Ok(status));
        }
        assert!("finished".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn test_match_json_field_names() {
        let m = Match::placeholder(0, 1, "Semifinals".to_string(), Some("R2-M1".to_string()));
        let json = serde_json::to_value(&m).unwrap();

        assert_eq!(json["identifier"], "R1-M2");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["team1_name"], TBD);
        assert_eq!(json["next_match_identifier"], "R2-M1");
        assert!(json["winner_name"].is_null());
        assert_eq!(serde_json::to_value(TeamSlot::Team2).unwrap(), "team2");
    }

    #[test]
    fn test_update_apply_completed_then_cleared() {
        let mut m = Match::placeholder(0, 0, "Final".to_string(), None);
        m.team1_name = "Ada".to_string();
        m.team2_name = "Grace".to_string();

        MatchUpdate::completed(3, 1, "Ada".to_string()).apply(&mut m);
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner_name.as_deref(), Some("Ada"));
        assert_eq!(m.winner_slot(), Some(TeamSlot::Team1));

        MatchUpdate::cleared().apply(&mut m);
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.winner_name, None);
        assert_eq!((m.score1, m.score2), (0, 0));
        // Team names are untouched by a clear
        assert_eq!(m.team1_name, "Ada");
    }

    #[test]
    fn test_update_slot_only_touches_one_side() {
        let mut m = Match::placeholder(1, 0, "Final".to_string(), None);
        MatchUpdate::slot(TeamSlot::Team2, "Linus").apply(&mut m);
        assert_eq!(m.team1_name, TBD);
        assert_eq!(m.team2_name, "Linus");
        assert!(MatchUpdate::default().is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(BracketConfig::default().validate().is_ok());
        assert_eq!(BracketConfig::default().round_count(), 5);
        assert!(BracketConfig::with_slots(2).validate().is_ok());
        assert!(BracketConfig::with_slots(0).validate().is_err());
        assert!(BracketConfig::with_slots(1).validate().is_err());
        assert!(BracketConfig::with_slots(24).validate().is_err());
    }
}
