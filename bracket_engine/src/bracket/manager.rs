//! Bracket manager running bracket operations against a match repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::editor::{EditSession, EditView, ScoreSubmission, resolve_bye_winner, resolve_winner};
use super::errors::{BracketError, BracketResult, ErrorKind, SagaStep};
use super::generator::{generate, seed_slots, shuffle_entrants};
use super::models::{BYE, BracketConfig, Match, MatchUpdate, TBD, TeamSlot};
use super::topology::FeedTarget;
use super::view::{Bracket, BracketState};
use crate::db::MatchRepository;

/// Summary of a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generated_at: DateTime<Utc>,
    /// Entrants supplied
    pub entrant_count: usize,
    /// Entrants that received a slot
    pub seeded_count: usize,
    /// Entrants beyond the slot count, in input order
    pub dropped_entrants: Vec<String>,
    pub bye_count: usize,
    pub match_count: usize,
    pub round_count: u32,
}

/// Result of completing a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub match_identifier: String,
    pub winner_name: String,
    /// Parent slot the winner was written into
    pub advanced_to: Option<FeedTarget>,
}

/// Result of resetting a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOutcome {
    pub match_identifier: String,
    /// Parent slot put back to `TBD`
    pub retracted: Option<FeedTarget>,
}

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    repo: Arc<dyn MatchRepository>,
    config: BracketConfig,
}

impl BracketManager {
    /// Create a new bracket manager
    pub fn new(repo: Arc<dyn MatchRepository>, config: BracketConfig) -> BracketResult<Self> {
        config.validate()?;
        Ok(Self { repo, config })
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    /// Replace the live bracket with a new one built from `entrants`.
    ///
    /// The previous match set is discarded. Auto-resolved byes are not
    /// advanced; see [`BracketManager::advance_auto_byes`].
    pub async fn generate(&self, entrants: &[String]) -> BracketResult<GenerationReport> {
        let slot_count = self.config.slot_count;
        let mut entrants = entrants.to_vec();
        if self.config.shuffle_entrants {
            let mut rng = rand::rng();
            shuffle_entrants(&mut entrants, &mut rng);
        }

        let matches = generate(&entrants, slot_count)?;
        let slots = seed_slots(&entrants, slot_count);
        let bye_count = slots.iter().filter(|s| *s == BYE).count();
        let dropped_entrants: Vec<String> = entrants.iter().skip(slot_count).cloned().collect();

        if !dropped_entrants.is_empty() {
            log::warn!(
                "{} entrant(s) exceed the {} slots and were dropped: {:?}",
                dropped_entrants.len(),
                slot_count,
                dropped_entrants
            );
        }

        log::debug!("Saga step '{}' + '{}'", SagaStep::ClearBracket, SagaStep::InsertMatches);
        self.repo.replace_all(&matches).await.inspect_err(|e| {
            log::error!("Bracket generation failed: {}", e);
        })?;

        let report = GenerationReport {
            generated_at: Utc::now(),
            entrant_count: entrants.len(),
            seeded_count: entrants.len() - dropped_entrants.len(),
            dropped_entrants,
            bye_count,
            match_count: matches.len(),
            round_count: self.config.round_count(),
        };

        log::info!(
            "Generated bracket: {} entrants, {} matches over {} rounds, {} byes",
            report.entrant_count,
            report.match_count,
            report.round_count,
            report.bye_count
        );

        Ok(report)
    }

    /// All matches of the live bracket, ordered by round then position
    pub async fn list_matches(&self) -> BracketResult<Vec<Match>> {
        self.repo.list_matches().await
    }

    /// Load the live bracket.
    ///
    /// An empty or malformed match set yields `NeedsSetup` so callers can
    /// route to generation. Storage failures are returned as errors.
    pub async fn load_bracket(&self) -> BracketResult<BracketState> {
        let matches = self.repo.list_matches().await?;
        match Bracket::from_matches(matches) {
            Ok(bracket) => Ok(BracketState::Ready(bracket)),
            Err(e) if e.kind() == ErrorKind::DataIntegrity => {
                log::warn!("Bracket needs setup: {}", e);
                Ok(BracketState::NeedsSetup {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Open a match for editing
    pub async fn load_for_edit(&self, identifier: &str) -> BracketResult<(EditSession, EditView)> {
        let m = self.fetch(identifier).await?;
        Ok((EditSession::for_match(&m), EditView::from(&m)))
    }

    /// Record scores for the match of `session` and advance the winner.
    ///
    /// The winner is resolved from a fresh read of the match before any
    /// write. On a validation error nothing is written.
    pub async fn submit(
        &self,
        session: &EditSession,
        submission: ScoreSubmission,
    ) -> BracketResult<SubmitOutcome> {
        let m = self.fetch_for_session(session).await?;
        let winner = resolve_winner(&m, &submission)?;
        let update = MatchUpdate::completed(submission.score1, submission.score2, winner.clone());
        self.complete(session, update, winner).await
    }

    /// Complete the match of `session` as a bye and advance the winner
    pub async fn declare_bye(
        &self,
        session: &EditSession,
        manual_winner: Option<TeamSlot>,
    ) -> BracketResult<SubmitOutcome> {
        let m = self.fetch_for_session(session).await?;
        let winner = resolve_bye_winner(&m, manual_winner)?;
        self.complete(session, MatchUpdate::walkover(winner.clone()), winner)
            .await
    }

    /// Write `winner_name` into the parent slot fed by the match at
    /// `source_match_index`. One hop only; the previous occupant is
    /// overwritten.
    pub async fn advance(
        &self,
        next_identifier: &str,
        source_match_index: u32,
        winner_name: &str,
    ) -> BracketResult<FeedTarget> {
        let target = FeedTarget::new(next_identifier, source_match_index);
        self.repo
            .update_match(&target.identifier, &MatchUpdate::slot(target.slot, winner_name))
            .await?;
        log::debug!(
            "Advanced {} into {} {}",
            winner_name,
            target.identifier,
            target.slot
        );
        Ok(target)
    }

    /// Return the match of `session` to scheduled and put `TBD` back into
    /// the parent slot it feeds. Matches further up are left as they are.
    pub async fn reset(&self, session: &EditSession) -> BracketResult<ResetOutcome> {
        self.fetch_for_session(session).await?;

        log::debug!("Saga step '{}' on {}", SagaStep::ClearResult, session.match_identifier);
        self.repo
            .update_match(&session.match_identifier, &MatchUpdate::cleared())
            .await?;

        let retracted = match &session.feeds {
            Some(target) => {
                log::debug!("Saga step '{}' on {}", SagaStep::RetractWinner, target.identifier);
                self.advance(&target.identifier, session.match_index, TBD)
                    .await
                    .map_err(|e| self.partial(SagaStep::RetractWinner, e))?;
                Some(target.clone())
            }
            None => None,
        };

        log::info!("Reset match {}", session.match_identifier);
        Ok(ResetOutcome {
            match_identifier: session.match_identifier.clone(),
            retracted,
        })
    }

    /// Push every auto-resolved first-round bye winner into its parent slot.
    ///
    /// Generation leaves these winners in place without advancing them;
    /// this is the explicit follow-up. Running it twice writes the same
    /// values again.
    pub async fn advance_auto_byes(&self) -> BracketResult<Vec<FeedTarget>> {
        let matches = self.repo.list_matches().await?;
        let mut advanced = Vec::new();

        for m in matches
            .iter()
            .filter(|m| m.round_index == 0 && m.is_completed() && m.has_bye())
        {
            let (Some(winner), Some(next)) = (&m.winner_name, &m.next_match_identifier) else {
                continue;
            };
            advanced.push(self.advance(next, m.match_index, winner).await?);
        }

        log::info!("Advanced {} bye winner(s)", advanced.len());
        Ok(advanced)
    }

    async fn fetch(&self, identifier: &str) -> BracketResult<Match> {
        self.repo
            .find_match_by_identifier(identifier)
            .await?
            .ok_or_else(|| BracketError::MatchNotFound(identifier.to_string()))
    }

    async fn fetch_for_session(&self, session: &EditSession) -> BracketResult<Match> {
        let m = self.fetch(&session.match_identifier).await?;
        if EditSession::for_match(&m) != *session {
            return Err(BracketError::Integrity(format!(
                "match {} no longer matches the opened edit",
                session.match_identifier
            )));
        }
        Ok(m)
    }

    async fn complete(
        &self,
        session: &EditSession,
        update: MatchUpdate,
        winner: String,
    ) -> BracketResult<SubmitOutcome> {
        log::debug!("Saga step '{}' on {}", SagaStep::RecordResult, session.match_identifier);
        self.repo
            .update_match(&session.match_identifier, &update)
            .await?;

        let advanced_to = match &session.feeds {
            Some(target) => {
                log::debug!("Saga step '{}' on {}", SagaStep::AdvanceWinner, target.identifier);
                Some(
                    self.advance(&target.identifier, session.match_index, &winner)
                        .await
                        .map_err(|e| self.partial(SagaStep::AdvanceWinner, e))?,
                )
            }
            None => None,
        };

        log::info!("Match {} won by {}", session.match_identifier, winner);
        Ok(SubmitOutcome {
            match_identifier: session.match_identifier.clone(),
            winner_name: winner,
            advanced_to,
        })
    }

    fn partial(&self, step: SagaStep, source: BracketError) -> BracketError {
        log::warn!(
            "Step '{}' failed after earlier writes were applied: {}",
            step,
            source
        );
        BracketError::partial(step, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::MatchStatus;
    use crate::db::InMemoryMatchRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Team {i}")).collect()
    }

    fn manager_with(slot_count: usize) -> (BracketManager, Arc<InMemoryMatchRepository>) {
        let repo = Arc::new(InMemoryMatchRepository::new());
        let manager = BracketManager::new(repo.clone(), BracketConfig::with_slots(slot_count))
            .expect("valid config");
        (manager, repo)
    }

    /// Repository whose updates start failing after a number of successes
    struct FlakyRepository {
        inner: InMemoryMatchRepository,
        updates_left: AtomicUsize,
    }

    #[async_trait]
    impl MatchRepository for FlakyRepository {
        async fn list_matches(&self) -> BracketResult<Vec<Match>> {
            self.inner.list_matches().await
        }

        async fn replace_all(&self, matches: &[Match]) -> BracketResult<()> {
            self.inner.replace_all(matches).await
        }

        async fn update_match(&self, identifier: &str, update: &MatchUpdate) -> BracketResult<()> {
            if self.updates_left.load(Ordering::SeqCst) == 0 {
                return Err(BracketError::Storage("write rejected".to_string()));
            }
            self.updates_left.fetch_sub(1, Ordering::SeqCst);
            self.inner.update_match(identifier, update).await
        }

        async fn find_match_by_identifier(&self, identifier: &str) -> BracketResult<Option<Match>> {
            self.inner.find_match_by_identifier(identifier).await
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let repo = Arc::new(InMemoryMatchRepository::new());
        assert!(BracketManager::new(repo, BracketConfig::with_slots(6)).is_err());
    }

    #[tokio::test]
    async fn test_generate_reports_dropped_entrants() {
        let (manager, _) = manager_with(8);
        let report = manager.generate(&names(10)).await.unwrap();

        assert_eq!(report.entrant_count, 10);
        assert_eq!(report.seeded_count, 8);
        assert_eq!(report.dropped_entrants, vec!["Team 9", "Team 10"]);
        assert_eq!(report.match_count, 7);
        assert_eq!(report.round_count, 3);
        assert_eq!(report.bye_count, 0);
    }

    #[tokio::test]
    async fn test_generate_with_shuffle_keeps_every_entrant() {
        let repo = Arc::new(InMemoryMatchRepository::new());
        let config = BracketConfig {
            slot_count: 8,
            shuffle_entrants: true,
        };
        let manager = BracketManager::new(repo, config).unwrap();
        manager.generate(&names(8)).await.unwrap();

        let mut seeded: Vec<String> = manager
            .list_matches()
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.round_index == 0)
            .flat_map(|m| [m.team1_name, m.team2_name])
            .collect();
        seeded.sort();
        let mut expected = names(8);
        expected.sort();
        assert_eq!(seeded, expected);
    }

    #[tokio::test]
    async fn test_load_bracket_without_matches_needs_setup() {
        let (manager, _) = manager_with(8);
        let state = manager.load_bracket().await.unwrap();
        assert!(matches!(state, BracketState::NeedsSetup { .. }));
    }

    #[tokio::test]
    async fn test_load_for_edit_unknown_match() {
        let (manager, _) = manager_with(8);
        manager.generate(&names(8)).await.unwrap();
        let err = manager.load_for_edit("R9-M1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[tokio::test]
    async fn test_submit_final_has_no_advancement() {
        let (manager, repo) = manager_with(2);
        manager.generate(&names(2)).await.unwrap();

        let (session, _) = manager.load_for_edit("R1-M1").await.unwrap();
        let outcome = manager
            .submit(&session, ScoreSubmission::new(0, 2))
            .await
            .unwrap();

        assert_eq!(outcome.winner_name, "Team 2");
        assert!(outcome.advanced_to.is_none());
        let stored = repo.find_match_by_identifier("R1-M1").await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_stale_session_is_rejected() {
        let (manager, _) = manager_with(8);
        manager.generate(&names(8)).await.unwrap();

        let (mut session, _) = manager.load_for_edit("R1-M2").await.unwrap();
        session.match_index = 0;
        let err = manager
            .submit(&session, ScoreSubmission::new(1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::Integrity(_)));
    }

    #[tokio::test]
    async fn test_failed_advance_is_reported_as_partial_write() {
        let repo = Arc::new(FlakyRepository {
            inner: InMemoryMatchRepository::new(),
            updates_left: AtomicUsize::new(1),
        });
        let manager = BracketManager::new(repo.clone(), BracketConfig::with_slots(4)).unwrap();
        manager.generate(&names(4)).await.unwrap();

        let (session, _) = manager.load_for_edit("R1-M2").await.unwrap();
        let err = manager
            .submit(&session, ScoreSubmission::new(4, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BracketError::PartialWrite {
                step: SagaStep::AdvanceWinner,
                ..
            }
        ));

        // The first write stays applied
        let stored = repo.find_match_by_identifier("R1-M2").await.unwrap().unwrap();
        assert_eq!(stored.winner_name.as_deref(), Some("Team 3"));
        let parent = repo.find_match_by_identifier("R2-M1").await.unwrap().unwrap();
        assert_eq!(parent.team2_name, TBD);

        // Re-running once storage recovers completes the operation
        repo.updates_left.store(2, Ordering::SeqCst);
        manager
            .submit(&session, ScoreSubmission::new(4, 1))
            .await
            .unwrap();
        let parent = repo.find_match_by_identifier("R2-M1").await.unwrap().unwrap();
        assert_eq!(parent.team2_name, "Team 3");
    }

    #[tokio::test]
    async fn test_advance_auto_byes_fills_parent_slots() {
        let (manager, repo) = manager_with(32);
        manager.generate(&names(30)).await.unwrap();

        let advanced = manager.advance_auto_byes().await.unwrap();
        assert_eq!(advanced.len(), 2);

        let parent = repo.find_match_by_identifier("R2-M1").await.unwrap().unwrap();
        assert_eq!(parent.team1_name, "Team 1");
        let parent = repo.find_match_by_identifier("R2-M8").await.unwrap().unwrap();
        assert_eq!(parent.team2_name, "Team 30");

        match manager.load_bracket().await.unwrap() {
            BracketState::Ready(bracket) => assert!(bracket.stale_links().is_empty()),
            BracketState::NeedsSetup { reason } => panic!("unexpected setup: {reason}"),
        }
    }
}
