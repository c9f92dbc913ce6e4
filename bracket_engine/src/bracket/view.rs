//! Read-only view over a persisted match set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::{BracketError, BracketResult};
use super::models::{Match, MatchStatus, TeamSlot, match_identifier};
use super::topology::{BracketTopology, FeedTarget};

/// A round of the bracket with its matches
#[derive(Debug, Clone, Serialize)]
pub struct RoundView<'a> {
    pub round_index: u32,
    pub round_name: &'a str,
    pub matches: &'a [Match],
}

/// A completed match whose winner is missing from the parent slot it feeds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleLink {
    pub source: String,
    pub winner_name: String,
    pub target: FeedTarget,
    /// What the parent slot holds instead
    pub found: String,
}

/// A completed match whose recorded winner no longer occupies either of its
/// own slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedResult {
    pub identifier: String,
    pub winner_name: String,
    pub team1_name: String,
    pub team2_name: String,
}

/// Loaded bracket, or the reason the setup flow must run first
#[derive(Debug, Clone)]
pub enum BracketState {
    NeedsSetup { reason: String },
    Ready(Bracket),
}

/// Persisted matches arranged on their topology
#[derive(Debug, Clone)]
pub struct Bracket {
    topology: BracketTopology,
    /// Matches in topology order
    matches: Vec<Match>,
    by_identifier: HashMap<String, usize>,
}

impl Bracket {
    /// Arrange `matches` on a topology and check they describe a complete
    /// single-elimination tree.
    pub fn from_matches(mut matches: Vec<Match>) -> BracketResult<Self> {
        if matches.is_empty() {
            return Err(BracketError::EmptyBracket);
        }

        matches.sort_by_key(|m| (m.round_index, m.match_index));
        let first_round = matches.iter().filter(|m| m.round_index == 0).count();
        let topology = BracketTopology::new(first_round * 2).map_err(|_| {
            BracketError::Integrity(format!("first round holds {first_round} matches"))
        })?;

        if matches.len() != topology.len() {
            return Err(BracketError::Integrity(format!(
                "expected {} matches, found {}",
                topology.len(),
                matches.len()
            )));
        }

        for (node, m) in topology.nodes().iter().zip(&matches) {
            let expected_id = match_identifier(node.round_index, node.match_index);
            if m.identifier != expected_id
                || m.round_index != node.round_index
                || m.match_index != node.match_index
            {
                return Err(BracketError::MatchNotFound(expected_id));
            }
            let expected_next = topology
                .parent_of(&node.identifier)
                .map(|parent| parent.identifier.as_str());
            if m.next_match_identifier.as_deref() != expected_next {
                return Err(BracketError::Integrity(format!(
                    "{} links to {:?}, expected {:?}",
                    m.identifier, m.next_match_identifier, expected_next
                )));
            }
        }

        let by_identifier = matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.identifier.clone(), i))
            .collect();

        Ok(Self {
            topology,
            matches,
            by_identifier,
        })
    }

    pub fn topology(&self) -> &BracketTopology {
        &self.topology
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }

    pub fn get(&self, identifier: &str) -> Option<&Match> {
        self.by_identifier.get(identifier).map(|&i| &self.matches[i])
    }

    pub fn parent(&self, identifier: &str) -> Option<&Match> {
        let target = self.topology.feed_target(identifier)?;
        self.get(&target.identifier)
    }

    /// Matches of one round in position order
    pub fn round(&self, round_index: u32) -> &[Match] {
        let start: usize = (0..round_index)
            .map(|r| self.topology.matches_in_round(r))
            .sum();
        let len = self.topology.matches_in_round(round_index);
        &self.matches[start..start + len]
    }

    pub fn rounds(&self) -> Vec<RoundView<'_>> {
        (0..self.topology.round_count())
            .map(|round_index| {
                let matches = self.round(round_index);
                RoundView {
                    round_index,
                    round_name: matches
                        .first()
                        .map(|m| m.round_name.as_str())
                        .unwrap_or_default(),
                    matches,
                }
            })
            .collect()
    }

    /// Winner of the final, once it has been played.
    ///
    /// `None` while the final's result is orphaned by a reset further down.
    pub fn champion(&self) -> Option<&str> {
        let root = self.topology.final_node()?;
        let m = self.get(&root.identifier)?;
        if m.status == MatchStatus::Completed && m.winner_slot().is_some() {
            m.winner_name.as_deref()
        } else {
            None
        }
    }

    /// Completed matches whose winner does not occupy the parent slot.
    ///
    /// Auto-resolved byes and winners overwritten in their parent slot leave
    /// such links behind. Nothing is repaired here.
    pub fn stale_links(&self) -> Vec<StaleLink> {
        let mut stale = Vec::new();
        for m in &self.matches {
            let Some(winner) = m.winner_name.as_deref() else {
                continue;
            };
            if m.status != MatchStatus::Completed {
                continue;
            }
            let Some(target) = self.topology.feed_target(&m.identifier) else {
                continue;
            };
            let Some(parent) = self.get(&target.identifier) else {
                continue;
            };
            let found = parent.team_name(target.slot);
            if found != winner {
                stale.push(StaleLink {
                    source: m.identifier.clone(),
                    winner_name: winner.to_string(),
                    found: found.to_string(),
                    target,
                });
            }
        }
        stale
    }

    /// Completed matches whose winner sits in neither of their own slots.
    ///
    /// Resetting a match retracts its winner from the parent; if the parent
    /// was already played its result is left pointing at a team that is no
    /// longer there. Nothing is repaired here.
    pub fn orphaned_results(&self) -> Vec<OrphanedResult> {
        self.matches
            .iter()
            .filter(|m| m.is_completed() && m.winner_slot().is_none())
            .filter_map(|m| {
                Some(OrphanedResult {
                    identifier: m.identifier.clone(),
                    winner_name: m.winner_name.clone()?,
                    team1_name: m.team1_name.clone(),
                    team2_name: m.team2_name.clone(),
                })
            })
            .collect()
    }

    /// Count of completed matches per round
    pub fn completed_in_round(&self, round_index: u32) -> usize {
        self.round(round_index)
            .iter()
            .filter(|m| m.is_completed())
            .count()
    }

    /// Slot of the parent fed by `identifier`
    pub fn feeds(&self, identifier: &str) -> Option<TeamSlot> {
        self.topology.feed_target(identifier).map(|t| t.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::generator::generate;
    use crate::bracket::models::{MatchUpdate, TBD};

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Team {i}")).collect()
    }

    #[test]
    fn test_empty_bracket_is_rejected() {
        assert!(matches!(
            Bracket::from_matches(Vec::new()),
            Err(BracketError::EmptyBracket)
        ));
    }

    #[test]
    fn test_rounds_follow_topology() {
        let bracket = Bracket::from_matches(generate(&names(32), 32).unwrap()).unwrap();
        let rounds = bracket.rounds();
        assert_eq!(rounds.len(), 5);
        assert_eq!(rounds[0].matches.len(), 16);
        assert_eq!(rounds[0].round_name, "Round of 32");
        assert_eq!(rounds[4].matches.len(), 1);
        assert_eq!(rounds[4].round_name, "Final");
        assert_eq!(rounds[2].matches[0].identifier, "R3-M1");
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let mut matches = generate(&names(8), 8).unwrap();
        matches.reverse();
        let bracket = Bracket::from_matches(matches).unwrap();
        assert_eq!(bracket.matches()[0].identifier, "R1-M1");
        assert_eq!(bracket.parent("R1-M3").unwrap().identifier, "R2-M2");
        assert_eq!(bracket.feeds("R1-M3"), Some(TeamSlot::Team1));
    }

    #[test]
    fn test_missing_match_is_an_integrity_error() {
        let mut matches = generate(&names(8), 8).unwrap();
        matches.remove(5);
        let err = Bracket::from_matches(matches).unwrap_err();
        assert!(matches!(err, BracketError::Integrity(_)));
    }

    #[test]
    fn test_broken_link_is_an_integrity_error() {
        let mut matches = generate(&names(8), 8).unwrap();
        matches[0].next_match_identifier = Some("R2-M2".to_string());
        let err = Bracket::from_matches(matches).unwrap_err();
        assert!(matches!(err, BracketError::Integrity(_)));
    }

    #[test]
    fn test_auto_byes_show_up_as_stale_links() {
        let bracket = Bracket::from_matches(generate(&names(30), 32).unwrap()).unwrap();
        let stale = bracket.stale_links();
        assert_eq!(stale.len(), 2);
        assert_eq!(stale[0].source, "R1-M1");
        assert_eq!(stale[0].winner_name, "Team 1");
        assert_eq!(stale[0].found, TBD);
        assert_eq!(stale[1].source, "R1-M16");
        assert_eq!(stale[1].target.slot, TeamSlot::Team2);
    }

    #[test]
    fn test_reset_below_played_final_orphans_its_result() {
        let mut matches = generate(&names(4), 4).unwrap();
        MatchUpdate::completed(2, 0, "Team 1".to_string()).apply(&mut matches[0]);
        MatchUpdate::completed(2, 0, "Team 3".to_string()).apply(&mut matches[1]);
        MatchUpdate::slot(TeamSlot::Team1, "Team 1").apply(&mut matches[2]);
        MatchUpdate::slot(TeamSlot::Team2, "Team 3").apply(&mut matches[2]);
        MatchUpdate::completed(1, 0, "Team 1".to_string()).apply(&mut matches[2]);

        let bracket = Bracket::from_matches(matches.clone()).unwrap();
        assert_eq!(bracket.champion(), Some("Team 1"));
        assert!(bracket.orphaned_results().is_empty());

        // Reset R1-M1: clear it and retract Team 1 from the final
        MatchUpdate::cleared().apply(&mut matches[0]);
        MatchUpdate::slot(TeamSlot::Team1, TBD).apply(&mut matches[2]);

        let bracket = Bracket::from_matches(matches).unwrap();
        assert_eq!(bracket.champion(), None);
        let orphaned = bracket.orphaned_results();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].identifier, "R2-M1");
        assert_eq!(orphaned[0].winner_name, "Team 1");
        assert_eq!(orphaned[0].team1_name, TBD);
        assert_eq!(orphaned[0].team2_name, "Team 3");
    }

    #[test]
    fn test_champion_requires_completed_final() {
        let mut matches = generate(&names(2), 2).unwrap();
        assert!(Bracket::from_matches(matches.clone()).unwrap().champion().is_none());

        MatchUpdate::completed(1, 0, "Team 1".to_string()).apply(&mut matches[0]);
        let bracket = Bracket::from_matches(matches).unwrap();
        assert_eq!(bracket.champion(), Some("Team 1"));
        assert_eq!(bracket.completed_in_round(0), 1);
    }
}
