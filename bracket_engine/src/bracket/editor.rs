//! Editing state for a single match and winner resolution.

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::models::{MAX_SCORE, Match, MatchStatus, TeamSlot, is_sentinel};
use super::topology::FeedTarget;

/// Handle for one edit of one match.
///
/// Created when a match is opened for editing and passed explicitly into
/// the submit, bye and reset operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub match_identifier: String,
    pub match_index: u32,
    /// Parent slot the winner goes to, `None` for the final
    pub feeds: Option<FeedTarget>,
}

impl EditSession {
    pub fn for_match(m: &Match) -> Self {
        Self {
            match_identifier: m.identifier.clone(),
            match_index: m.match_index,
            feeds: m
                .next_match_identifier
                .as_ref()
                .map(|next| FeedTarget::new(next.clone(), m.match_index)),
        }
    }
}

/// What an editor shows for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditView {
    pub identifier: String,
    pub round_name: String,
    pub team1_name: String,
    pub team2_name: String,
    pub score1: u32,
    pub score2: u32,
    /// Side currently recorded as winner, used to preselect the pick
    pub winner_candidate: Option<TeamSlot>,
    pub status: MatchStatus,
}

impl From<&Match> for EditView {
    fn from(m: &Match) -> Self {
        Self {
            identifier: m.identifier.clone(),
            round_name: m.round_name.clone(),
            team1_name: m.team1_name.clone(),
            team2_name: m.team2_name.clone(),
            score1: m.score1,
            score2: m.score2,
            winner_candidate: m.winner_slot(),
            status: m.status,
        }
    }
}

/// Scores entered by the operator, with an optional explicit winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score1: u32,
    pub score2: u32,
    #[serde(default)]
    pub manual_winner: Option<TeamSlot>,
}

impl ScoreSubmission {
    pub fn new(score1: u32, score2: u32) -> Self {
        Self {
            score1,
            score2,
            manual_winner: None,
        }
    }

    pub fn with_winner(mut self, slot: TeamSlot) -> Self {
        self.manual_winner = Some(slot);
        self
    }
}

/// Decide the winner of a scored match.
///
/// A manual pick wins over scores; otherwise the higher score wins. Ties
/// without a pick, and winners that are `TBD` or `BYE`, are rejected.
pub fn resolve_winner(m: &Match, submission: &ScoreSubmission) -> Result<String, ValidationError> {
    check_score(submission.score1)?;
    check_score(submission.score2)?;

    let slot = match submission.manual_winner {
        Some(slot) => slot,
        None if submission.score1 > submission.score2 => TeamSlot::Team1,
        None if submission.score2 > submission.score1 => TeamSlot::Team2,
        None => {
            return Err(ValidationError::NoWinner {
                score1: submission.score1,
                score2: submission.score2,
            });
        }
    };

    let name = m.team_name(slot);
    if is_sentinel(name) {
        return Err(ValidationError::SentinelWinner(name.to_string()));
    }
    Ok(name.to_string())
}

/// Reject scores the match store cannot hold
pub fn check_score(score: u32) -> Result<u32, ValidationError> {
    if score > MAX_SCORE {
        return Err(ValidationError::ScoreOutOfRange(score));
    }
    Ok(score)
}

/// Decide who advances from a match declared as a bye.
///
/// A manual pick must name a real team. Without a pick, exactly one side
/// may hold a real team.
pub fn resolve_bye_winner(
    m: &Match,
    manual_winner: Option<TeamSlot>,
) -> Result<String, ValidationError> {
    if let Some(slot) = manual_winner {
        let name = m.team_name(slot);
        if is_sentinel(name) {
            return Err(ValidationError::SentinelWinner(name.to_string()));
        }
        return Ok(name.to_string());
    }

    match (is_sentinel(&m.team1_name), is_sentinel(&m.team2_name)) {
        (false, true) => Ok(m.team1_name.clone()),
        (true, false) => Ok(m.team2_name.clone()),
        (true, true) => Err(ValidationError::NoValidTeam),
        (false, false) => Err(ValidationError::AmbiguousBye),
    }
}
