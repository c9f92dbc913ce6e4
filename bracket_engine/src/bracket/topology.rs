//! Shape of a single-elimination bracket.
//!
//! The topology is an arena of match nodes keyed by identifier. Each node
//! knows its parent and which parent slot it feeds, so the generator and
//! the propagator read the same precomputed links instead of deriving them
//! from indices on their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::ValidationError;
use super::models::{TeamSlot, match_identifier, round_name, validate_slot_count};

/// Where a match's winner goes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedTarget {
    /// Identifier of the parent match
    pub identifier: String,
    /// Slot of the parent that receives the winner
    pub slot: TeamSlot,
}

impl FeedTarget {
    /// Target for the match at `match_index` whose parent is `next_identifier`
    pub fn new(next_identifier: impl Into<String>, match_index: u32) -> Self {
        Self {
            identifier: next_identifier.into(),
            slot: TeamSlot::feeding(match_index),
        }
    }
}

/// A node of the topology arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNode {
    pub identifier: String,
    pub round_index: u32,
    pub match_index: u32,
    pub round_name: String,
    /// Arena index of the parent node
    pub parent: Option<usize>,
    /// Parent slot this node feeds, present iff `parent` is
    pub feeds: Option<TeamSlot>,
}

/// Tree of matches for a given slot count, built leaf to root
#[derive(Debug, Clone)]
pub struct BracketTopology {
    slot_count: usize,
    round_count: u32,
    nodes: Vec<MatchNode>,
    by_identifier: HashMap<String, usize>,
}

impl BracketTopology {
    /// Build the topology for `slot_count` leaf slots
    pub fn new(slot_count: usize) -> Result<Self, ValidationError> {
        validate_slot_count(slot_count)?;

        let round_count = slot_count.trailing_zeros();
        let mut nodes = Vec::with_capacity(slot_count - 1);
        let mut round_start = 0usize;
        let mut match_count = slot_count / 2;

        for round in 0..round_count {
            let next_round_start = round_start + match_count;
            let is_final = round + 1 == round_count;

            for index in 0..match_count {
                let (parent, feeds) = if is_final {
                    (None, None)
                } else {
                    (
                        Some(next_round_start + index / 2),
                        Some(TeamSlot::feeding(index as u32)),
                    )
                };
                nodes.push(MatchNode {
                    identifier: match_identifier(round, index as u32),
                    round_index: round,
                    match_index: index as u32,
                    round_name: round_name(round, round_count),
                    parent,
                    feeds,
                });
            }

            round_start = next_round_start;
            match_count /= 2;
        }

        let by_identifier = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.identifier.clone(), i))
            .collect();

        Ok(Self {
            slot_count,
            round_count,
            nodes,
            by_identifier,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    /// Number of matches in `round`, `slot_count / 2^(round+1)`
    pub fn matches_in_round(&self, round: u32) -> usize {
        if round >= self.round_count {
            0
        } else {
            self.slot_count >> (round + 1)
        }
    }

    /// All nodes, ordered by round then position
    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, identifier: &str) -> Option<&MatchNode> {
        self.by_identifier.get(identifier).map(|&i| &self.nodes[i])
    }

    pub fn parent_of(&self, identifier: &str) -> Option<&MatchNode> {
        let parent = self.node(identifier)?.parent?;
        Some(&self.nodes[parent])
    }

    /// Parent identifier and slot fed by `identifier`
    pub fn feed_target(&self, identifier: &str) -> Option<FeedTarget> {
        let node = self.node(identifier)?;
        let parent = &self.nodes[node.parent?];
        Some(FeedTarget {
            identifier: parent.identifier.clone(),
            slot: node.feeds?,
        })
    }

    /// The single root match
    pub fn final_node(&self) -> Option<&MatchNode> {
        self.nodes.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_32_slots_shape() {
        let topology = BracketTopology::new(32).unwrap();
        assert_eq!(topology.round_count(), 5);
        assert_eq!(topology.len(), 31);
        for round in 0..5 {
            assert_eq!(topology.matches_in_round(round), 32 >> (round + 1));
        }
        assert_eq!(topology.matches_in_round(5), 0);
    }

    #[test]
    fn test_every_non_final_node_has_one_parent() {
        let topology = BracketTopology::new(16).unwrap();
        let roots: Vec<_> = topology
            .nodes()
            .iter()
            .filter(|node| node.parent.is_none())
            .collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].identifier, "R4-M1");
        assert_eq!(topology.final_node().unwrap().identifier, "R4-M1");
    }

    #[test]
    fn test_feed_targets_follow_parity() {
        let topology = BracketTopology::new(32).unwrap();

        let target = topology.feed_target("R1-M1").unwrap();
        assert_eq!(target.identifier, "R2-M1");
        assert_eq!(target.slot, TeamSlot::Team1);

        let target = topology.feed_target("R1-M2").unwrap();
        assert_eq!(target.identifier, "R2-M1");
        assert_eq!(target.slot, TeamSlot::Team2);

        let target = topology.feed_target("R3-M4").unwrap();
        assert_eq!(target.identifier, "R4-M2");
        assert_eq!(target.slot, TeamSlot::Team2);

        assert!(topology.feed_target("R5-M1").is_none());
        assert!(topology.feed_target("R9-M1").is_none());
    }

    #[test]
    fn test_feed_target_matches_free_constructor() {
        let topology = BracketTopology::new(8).unwrap();
        for node in topology.nodes() {
            if let Some(parent) = topology.parent_of(&node.identifier) {
                assert_eq!(
                    topology.feed_target(&node.identifier),
                    Some(FeedTarget::new(parent.identifier.clone(), node.match_index))
                );
            }
        }
    }

    #[test]
    fn test_two_slot_topology_is_just_a_final() {
        let topology = BracketTopology::new(2).unwrap();
        assert_eq!(topology.round_count(), 1);
        assert_eq!(topology.len(), 1);
        assert_eq!(topology.nodes()[0].round_name, "Final");
    }

    #[test]
    fn test_invalid_slot_counts_are_rejected() {
        assert_eq!(
            BracketTopology::new(12).unwrap_err(),
            ValidationError::InvalidSlotCount(12)
        );
        assert!(BracketTopology::new(0).is_err());
    }
}
