//! Bracket generation from a list of entrant names.

use rand::Rng;
use rand::seq::SliceRandom;

use super::errors::ValidationError;
use super::models::{BYE, Match, MatchStatus, TBD, is_sentinel};
use super::topology::BracketTopology;

/// Split raw multi-line input into entrant names.
///
/// Each line is trimmed and blank lines are dropped. Order is preserved.
pub fn parse_entrants(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shuffle entrants in place so seeding does not follow input order
pub fn shuffle_entrants<R: Rng + ?Sized>(entrants: &mut [String], rng: &mut R) {
    entrants.shuffle(rng);
}

/// Fill the seeding grid.
///
/// When exactly `slot_count - 2` entrants are given, positions `1` and
/// `slot_count - 2` hold `BYE` and entrants take the remaining positions in
/// order. Any other count places entrant `i` at slot `i`, leaves missing
/// slots as `TBD`, and drops entrants beyond `slot_count`.
pub fn seed_slots(entrants: &[String], slot_count: usize) -> Vec<String> {
    let mut slots = vec![TBD.to_string(); slot_count];

    if slot_count >= 2 && entrants.len() == slot_count - 2 {
        let bye_positions = [1, slot_count - 2];
        for &position in &bye_positions {
            slots[position] = BYE.to_string();
        }
        let open = (0..slot_count).filter(|i| !bye_positions.contains(i));
        for (position, name) in open.zip(entrants) {
            slots[position] = name.clone();
        }
    } else {
        for (slot, name) in slots.iter_mut().zip(entrants) {
            *slot = name.clone();
        }
    }

    slots
}

/// Generate every match of the bracket.
///
/// Round 0 is seeded from the slot grid; later rounds are `TBD`
/// placeholders. A round-0 match with one `BYE` side and a real opponent is
/// completed on the spot with the opponent as winner. The winner is not
/// written into the parent match.
pub fn generate(entrants: &[String], slot_count: usize) -> Result<Vec<Match>, ValidationError> {
    if let Some(name) = entrants.iter().find(|name| is_sentinel(name)) {
        return Err(ValidationError::ReservedName(name.clone()));
    }

    let topology = BracketTopology::new(slot_count)?;
    let slots = seed_slots(entrants, slot_count);
    let nodes = topology.nodes();

    let matches = nodes
        .iter()
        .map(|node| {
            let next = node.parent.map(|p| nodes[p].identifier.clone());
            let mut m = Match::placeholder(
                node.round_index,
                node.match_index,
                node.round_name.clone(),
                next,
            );

            if node.round_index == 0 {
                let first = 2 * node.match_index as usize;
                m.team1_name = slots[first].clone();
                m.team2_name = slots[first + 1].clone();
                resolve_auto_bye(&mut m);
            }

            m
        })
        .collect();

    Ok(matches)
}

fn resolve_auto_bye(m: &mut Match) {
    let winner = if m.team1_name == BYE && !is_sentinel(&m.team2_name) {
        m.team2_name.clone()
    } else if m.team2_name == BYE && !is_sentinel(&m.team1_name) {
        m.team1_name.clone()
    } else {
        return;
    };

    m.winner_name = Some(winner);
    m.status = MatchStatus::Completed;
}
