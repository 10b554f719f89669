use crate::casino_store::StoreBatch;
use crate::config::ResponsibleGamingConfig;
use crate::cooldown::CooldownManager;
use crate::errors::CasinoResult;
use crate::games::draws::DrawSource;
use crate::games::types::{FinalResult, GameRecord, GameVariant, Outcome, Phase};
use crate::profile::Profile;
use crate::session::Session;
use chrono::{DateTime, Utc};

/// One player's mutable rows, loaded under the player's lock
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub profile: Profile,
    pub session: Option<Session>,
    pub balance: u64,
}

/// A decided wager ready to be applied
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    pub variant: GameVariant,
    pub outcome: Outcome,
    pub stake: u64,
    pub at_stake: u64,
    pub payout: u64,
    pub phase: Phase,
    pub was_risk: bool,
}

/// Applies finalized outcomes: credit, cooldown, profile and session
/// aggregates, audit row
pub struct WagerProcessor {
    cooldowns: CooldownManager,
    responsible: ResponsibleGamingConfig,
}

impl WagerProcessor {
    /// Create a new wager processor
    pub fn new(cooldowns: CooldownManager, responsible: ResponsibleGamingConfig) -> Self {
        Self {
            cooldowns,
            responsible,
        }
    }

    pub fn cooldowns(&self) -> &CooldownManager {
        &self.cooldowns
    }

    /// Mutate `state` and stage every resulting row in `batch`.
    /// Nothing is visible until the caller commits the batch.
    pub fn finalize(
        &self,
        state: &mut PlayerState,
        settlement: Settlement,
        record_id: u64,
        now: DateTime<Utc>,
        draws: &mut dyn DrawSource,
        batch: &mut StoreBatch,
    ) -> CasinoResult<FinalResult> {
        let won = settlement.outcome.is_win();
        let player_id = state.profile.player_id;

        state.balance = state.balance.saturating_add(settlement.payout);

        let cooldown = state.profile.cooldown_mut(settlement.variant);
        let started = if won {
            self.cooldowns.on_win(cooldown);
            None
        } else {
            self.cooldowns.on_loss(cooldown, now, draws)
        };

        let forced_break_until = state.profile.record_outcome(
            settlement.stake,
            won,
            settlement.payout,
            now,
            &self.responsible,
        );

        if let Some(session) = state.session.as_mut() {
            session.record_game(settlement.stake, won, settlement.payout);
            batch.put_session(session)?;
        }

        let record = GameRecord {
            id: record_id,
            player_id,
            session_id: state.session.as_ref().map(|session| session.id),
            variant: settlement.variant,
            stake: settlement.stake,
            outcome: settlement.outcome,
            multiplier: settlement.outcome.multiplier_value(),
            payout: settlement.payout,
            phase: settlement.phase.number(),
            was_risk: settlement.was_risk,
            near_miss: settlement.outcome == Outcome::NearMiss,
            created_at: now,
        };

        batch.put_game_record(&record)?;
        batch.put_profile(&state.profile)?;
        batch.put_balance(player_id, state.balance);

        let last_chance = self
            .cooldowns
            .last_chance(&state.profile.cooldown(settlement.variant));

        tracing::debug!(
            player_id,
            record_id,
            outcome = %settlement.outcome,
            stake = settlement.stake,
            payout = settlement.payout,
            balance = state.balance,
            "Wager finalized"
        );

        Ok(FinalResult {
            player_id,
            record_id,
            session_id: record.session_id,
            outcome: settlement.outcome,
            stake: settlement.stake,
            at_stake: settlement.at_stake,
            payout: settlement.payout,
            net: settlement.payout as i64 - settlement.stake as i64,
            balance: state.balance,
            phase: settlement.phase,
            was_risk: settlement.was_risk,
            cooldown_until: started.map(|cooldown| cooldown.until),
            forced_break_until,
            last_chance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CooldownConfig;
    use crate::games::draws::ScriptedDraws;
    use crate::games::types::Multiplier;
    use crate::session::SessionTracker;

    fn processor() -> WagerProcessor {
        WagerProcessor::new(
            CooldownManager::new(CooldownConfig::default()),
            ResponsibleGamingConfig::default(),
        )
    }

    fn loss(stake: u64) -> Settlement {
        Settlement {
            variant: GameVariant::Dice,
            outcome: Outcome::Lose,
            stake,
            at_stake: stake,
            payout: 0,
            phase: Phase::One,
            was_risk: false,
        }
    }

    #[test]
    fn test_win_credits_and_records_session() {
        let now = Utc::now();
        let mut profile = Profile::new(3, now);
        let session = SessionTracker::open(&mut profile, None, 11, now).unwrap();
        let mut state = PlayerState {
            profile,
            session: Some(session),
            balance: 900,
        };
        let mut batch = StoreBatch::new();
        let mut draws = ScriptedDraws::new();

        let settlement = Settlement {
            outcome: Outcome::Win {
                multiplier: Multiplier::X2,
            },
            payout: 200,
            ..loss(100)
        };
        let result = processor()
            .finalize(&mut state, settlement, 1, now, &mut draws, &mut batch)
            .unwrap();

        assert_eq!(result.balance, 1_100);
        assert_eq!(result.net, 100);
        assert_eq!(result.session_id, Some(11));
        assert!(result.cooldown_until.is_none());
        assert_eq!(state.session.as_ref().unwrap().games_played, 1);
        assert_eq!(state.profile.current_win_streak, 1);
        // session, record, index, profile, balance
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn test_third_loss_starts_cooldown_and_warns_before_it() {
        let now = Utc::now();
        let mut state = PlayerState {
            profile: Profile::new(3, now),
            session: None,
            balance: 500,
        };
        let processor = processor();
        let mut draws = ScriptedDraws::new().with_ranges([50]);

        let mut batch = StoreBatch::new();
        let first = processor
            .finalize(&mut state, loss(10), 1, now, &mut draws, &mut batch)
            .unwrap();
        assert!(first.last_chance.is_none());

        let second = processor
            .finalize(&mut state, loss(10), 2, now, &mut draws, &mut batch)
            .unwrap();
        assert!(second.last_chance.is_some());

        let third = processor
            .finalize(&mut state, loss(10), 3, now, &mut draws, &mut batch)
            .unwrap();
        assert_eq!(third.cooldown_until, Some(now + chrono::Duration::seconds(50)));
        assert_eq!(third.net, -10);
        assert_eq!(third.balance, 500);
        assert!(third.session_id.is_none());
    }
}
