//! Wagering engine: the operations exposed to callers.
//!
//! Every mutating operation runs under a per-player async lock, loads the
//! player's rows, stages all writes in one [`StoreBatch`] and commits it
//! atomically. Phase-one resolution additionally holds the global jackpot
//! lock (always acquired after the player lock) until its batch commits, so
//! contributions and wins are never lost to concurrent wagers.

use crate::{
    access::{AccessDecision, AccessGate},
    casino_store::{CasinoStore, StoreBatch},
    clock::{Clock, SystemClock},
    config::CasinoConfig,
    cooldown::CooldownManager,
    errors::{CasinoError, CasinoResult, ConfigurationError, WagerError},
    games::{
        draws::{DrawSource, RandomDraws},
        pending_pool::PendingWagerPool,
        processor::{PlayerState, Settlement, WagerProcessor},
        resolver::{BetResolver, Phase1Roll, Phase2Roll},
        types::{
            BetResponse, CooldownTier, FinalResult, GameRecord, GameVariant, Modifiers,
            Multiplier, Outcome, PendingWager, Phase,
        },
    },
    jackpot::{contribution_for, JackpotPool, JackpotSnapshot, JackpotState, JackpotWin},
    metrics::EngineMetrics,
    profile::{Greeting, Profile, StreakBadge},
    session::{SessionSummary, SessionTracker},
    storage::OptimizedStorage,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Profile plus derived read-only signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub balance: u64,
    pub streak_badge: Option<StreakBadge>,
    pub last_chance: Option<CooldownTier>,
}

/// Everything needed to greet a player on entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeContext {
    pub greeting: Greeting,
    pub balance: u64,
    pub jackpot_pool: u64,
    pub modifiers: Modifiers,
    pub streak_badge: Option<StreakBadge>,
}

/// Jackpot record with recent history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackpotInfo {
    #[serde(flatten)]
    pub state: JackpotState,
    pub floor: u64,
    pub min_pool: u64,
    pub recent_wins: Vec<JackpotWin>,
}

pub struct CasinoEngine {
    config: Arc<CasinoConfig>,
    store: CasinoStore,
    resolver: BetResolver,
    processor: WagerProcessor,
    gate: AccessGate,
    jackpot: JackpotPool,
    pending: PendingWagerPool,
    player_locks: DashMap<u64, Arc<Mutex<()>>>,
    draws: std::sync::Mutex<Box<dyn DrawSource>>,
    clock: Arc<dyn Clock>,
    metrics: EngineMetrics,
}

impl CasinoEngine {
    /// Open storage from the config and run with real randomness and time
    pub fn open(config: CasinoConfig) -> CasinoResult<Self> {
        let storage = OptimizedStorage::new_with_config(&config.storage)?;
        Self::with_parts(
            config,
            storage,
            Box::new(RandomDraws::from_entropy()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: CasinoConfig,
        storage: OptimizedStorage,
        draws: Box<dyn DrawSource>,
        clock: Arc<dyn Clock>,
    ) -> CasinoResult<Self> {
        config.validate().map_err(ConfigurationError::from)?;

        let store = CasinoStore::open(storage)?;
        let jackpot_state = match store.load_jackpot()? {
            Some(state) => state,
            None => JackpotState::fresh(&config.jackpot),
        };
        let pending = PendingWagerPool::warm(store.load_all_pending()?);

        let metrics = EngineMetrics::new()?;
        metrics.jackpot_pool.set(jackpot_state.pool as i64);
        metrics.pending_wagers.set(pending.pending_count() as i64);
        metrics.pending_value.set(pending.outstanding_value() as i64);

        tracing::info!(
            jackpot_pool = jackpot_state.pool,
            pending_wagers = pending.pending_count(),
            enforce_limits = config.limits.enforce,
            "Casino engine ready"
        );

        let cooldowns = CooldownManager::new(config.cooldown.clone());
        Ok(Self {
            resolver: BetResolver::new(config.odds.clone(), config.bonuses.clone()),
            processor: WagerProcessor::new(cooldowns, config.responsible.clone()),
            gate: AccessGate::new(&config),
            jackpot: JackpotPool::new(config.jackpot.clone(), jackpot_state),
            config: Arc::new(config),
            store,
            pending,
            player_locks: DashMap::new(),
            draws: std::sync::Mutex::new(draws),
            clock,
            metrics,
        })
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    fn player_lock(&self, player_id: u64) -> Arc<Mutex<()>> {
        self.player_locks
            .entry(player_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn with_draws<R>(&self, f: impl FnOnce(&mut dyn DrawSource) -> R) -> R {
        let mut draws = self
            .draws
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut **draws)
    }

    /// Profile (created lazily, daily counters rolled), open session, balance
    fn load_state(&self, player_id: u64, now: DateTime<Utc>) -> CasinoResult<PlayerState> {
        let mut profile = self
            .store
            .load_profile(player_id)?
            .unwrap_or_else(|| Profile::new(player_id, now));
        profile.reset_daily_if_stale(now);

        let session = match profile.current_session_id {
            Some(session_id) => self
                .store
                .load_session(session_id)?
                .filter(|session| session.is_open),
            None => None,
        };
        if session.is_none() {
            profile.current_session_id = None;
        }

        Ok(PlayerState {
            profile,
            session,
            balance: self.store.load_balance(player_id)?,
        })
    }

    /// Run the access gate and open a session, or resume the one already open
    pub async fn enter(&self, player_id: u64) -> CasinoResult<AccessDecision> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        let mut state = self.load_state(player_id, now)?;
        let mut decision = self
            .gate
            .evaluate(&state.profile, GameVariant::Dice, state.balance, now);
        if !decision.allowed {
            self.metrics.record_rejection(&decision.reason.to_string());
            tracing::warn!(player_id, reason = %decision.reason, "Entry refused");
            return Ok(decision);
        }

        let mut batch = StoreBatch::new();
        let session_id = match state.session.take() {
            Some(open) => open.id,
            None => {
                let session_id = self.store.next_session_id()?;
                let session = SessionTracker::open(&mut state.profile, None, session_id, now)?;
                batch.put_session(&session)?;
                self.metrics.sessions_opened_total.inc();
                tracing::info!(player_id, session_id, "Session opened");
                session_id
            }
        };
        batch.put_profile(&state.profile)?;
        self.store.commit(batch)?;

        decision.session_id = Some(session_id);
        Ok(decision)
    }

    /// Debit the stake, contribute to the jackpot and resolve phase one.
    /// All rejections happen before any state change.
    pub async fn place_bet(&self, player_id: u64, stake: u64) -> CasinoResult<BetResponse> {
        let limits = &self.config.limits;
        if stake < limits.min_stake || stake > limits.max_stake {
            self.metrics.record_rejection("stake_out_of_bounds");
            tracing::warn!(player_id, stake, "Stake out of bounds");
            return Err(WagerError::StakeOutOfBounds {
                stake,
                min: limits.min_stake,
                max: limits.max_stake,
            }
            .into());
        }

        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        if self.pending.contains(player_id) {
            self.metrics.record_rejection("pending_wager_exists");
            return Err(WagerError::PendingWagerExists(player_id).into());
        }

        let mut state = self.load_state(player_id, now)?;
        let decision = self
            .gate
            .evaluate(&state.profile, GameVariant::Dice, state.balance, now);
        if !decision.allowed {
            self.metrics.record_rejection(&decision.reason.to_string());
            tracing::warn!(player_id, reason = %decision.reason, "Wager refused");
            return Err(CasinoError::AccessDenied(decision));
        }
        if state.balance < stake {
            self.metrics.record_rejection("insufficient_balance");
            tracing::warn!(player_id, stake, balance = state.balance, "Insufficient balance");
            return Err(WagerError::InsufficientBalance {
                balance: state.balance,
                required: stake,
            }
            .into());
        }

        let mut jackpot = self.jackpot.lock().await;
        let mut next_jackpot = jackpot.clone();
        next_jackpot.contribute(contribution_for(stake, self.jackpot.config()));
        state.balance -= stake;

        let modifiers = state.profile.modifiers(now, &self.config.bonuses);
        let roll = self.with_draws(|draws| self.resolver.resolve_phase1(stake, modifiers, draws));

        let mut batch = StoreBatch::new();
        let settlement = |outcome: Outcome, payout: u64| Settlement {
            variant: GameVariant::Dice,
            outcome,
            stake,
            at_stake: stake,
            payout,
            phase: Phase::One,
            was_risk: false,
        };

        let mut jackpot_won = None;
        let response = match roll {
            Phase1Roll::Intermediate { value } => {
                let wager = PendingWager {
                    player_id,
                    session_id: state.session.as_ref().map(|session| session.id),
                    variant: GameVariant::Dice,
                    stake,
                    value,
                    created_at: now,
                };
                batch.put_pending(&wager)?;
                batch.put_profile(&state.profile)?;
                batch.put_balance(player_id, state.balance);
                BetResponse::Pending {
                    wager,
                    balance: state.balance,
                }
            }
            Phase1Roll::Win { multiplier, payout } => {
                let result = self.finalize(
                    &mut state,
                    settlement(Outcome::Win { multiplier }, payout),
                    now,
                    &mut batch,
                )?;
                BetResponse::Final { result }
            }
            Phase1Roll::Lose {
                jackpot_hit,
                near_miss,
            } => {
                let won = if jackpot_hit {
                    next_jackpot.try_win(player_id, self.jackpot.config(), now)
                } else {
                    None
                };

                let (outcome, payout) = match won {
                    Some(amount) => {
                        let win = JackpotWin {
                            id: self.store.next_jackpot_win_id()?,
                            player_id,
                            amount,
                            won_at: now,
                        };
                        batch.put_jackpot_win(&win)?;
                        jackpot_won = Some(amount);
                        (Outcome::Jackpot { amount }, amount)
                    }
                    None if near_miss => (Outcome::NearMiss, 0),
                    None => (Outcome::Lose, 0),
                };

                let result = self.finalize(&mut state, settlement(outcome, payout), now, &mut batch)?;
                BetResponse::Final { result }
            }
        };

        batch.put_jackpot(&next_jackpot)?;
        self.store.commit(batch)?;
        *jackpot = next_jackpot;
        self.metrics.jackpot_pool.set(jackpot.pool as i64);
        drop(jackpot);

        self.metrics.wagers_total.inc();
        match &response {
            BetResponse::Pending { wager, .. } => {
                self.pending.insert(wager.clone());
                self.metrics.pending_wagers.set(self.pending.pending_count() as i64);
                self.metrics.pending_value.set(self.pending.outstanding_value() as i64);
                tracing::debug!(player_id, stake, value = wager.value, "Wager pending take or risk");
            }
            BetResponse::Final { result } => {
                self.metrics.record_outcome(result.outcome.tag());
            }
        }
        if let Some(amount) = jackpot_won {
            self.metrics.jackpot_wins_total.inc();
            tracing::info!(player_id, amount, "Jackpot won");
        }

        Ok(response)
    }

    /// Settle a pending wager at its intermediate value
    pub async fn take_intermediate(&self, player_id: u64) -> CasinoResult<FinalResult> {
        self.settle_pending(player_id, |_, wager| Settlement {
            variant: wager.variant,
            outcome: Outcome::Win {
                multiplier: Multiplier::X1_5,
            },
            stake: wager.stake,
            at_stake: wager.value,
            payout: wager.value,
            phase: Phase::One,
            was_risk: false,
        })
        .await
    }

    /// Gamble the pending value on the phase-two table. A loss forfeits the
    /// whole pending value; a win pays the multiplier on the original stake.
    pub async fn risk_intermediate(&self, player_id: u64) -> CasinoResult<FinalResult> {
        self.settle_pending(player_id, |engine, wager| {
            let roll = engine.with_draws(|draws| engine.resolver.resolve_phase2(wager, draws));
            let (outcome, payout) = match roll {
                Phase2Roll::Win { multiplier, payout } => (Outcome::Win { multiplier }, payout),
                Phase2Roll::Lose => (Outcome::Lose, 0),
            };
            Settlement {
                variant: wager.variant,
                outcome,
                stake: wager.stake,
                at_stake: wager.value,
                payout,
                phase: Phase::Two,
                was_risk: true,
            }
        })
        .await
    }

    async fn settle_pending<F>(&self, player_id: u64, decide: F) -> CasinoResult<FinalResult>
    where
        F: FnOnce(&Self, &PendingWager) -> Settlement,
    {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        let wager = self
            .store
            .load_pending(player_id)?
            .ok_or(WagerError::NoPendingWager(player_id))?;

        let mut state = self.load_state(player_id, now)?;
        if state.session.as_ref().map(|session| session.id) != wager.session_id {
            state.session = None;
        }

        let settlement = decide(self, &wager);
        let mut batch = StoreBatch::new();
        batch.delete_pending(player_id);
        let result = self.finalize(&mut state, settlement, now, &mut batch)?;
        self.store.commit(batch)?;

        self.pending.remove(player_id);
        self.metrics.pending_wagers.set(self.pending.pending_count() as i64);
        self.metrics.pending_value.set(self.pending.outstanding_value() as i64);
        self.metrics.record_outcome(result.outcome.tag());
        Ok(result)
    }

    fn finalize(
        &self,
        state: &mut PlayerState,
        settlement: Settlement,
        now: DateTime<Utc>,
        batch: &mut StoreBatch,
    ) -> CasinoResult<FinalResult> {
        let record_id = self.store.next_game_id()?;
        self.with_draws(|draws| {
            self.processor
                .finalize(state, settlement, record_id, now, draws, batch)
        })
    }

    /// Close the open session. `None` when there was no session or it saw no games.
    pub async fn exit_session(&self, player_id: u64) -> CasinoResult<Option<SessionSummary>> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        let mut state = self.load_state(player_id, now)?;
        let Some(mut session) = state.session.take() else {
            return Ok(None);
        };

        let summary = SessionTracker::close(&mut state.profile, &mut session, now);
        let mut batch = StoreBatch::new();
        batch.put_session(&session)?;
        batch.put_profile(&state.profile)?;
        self.store.commit(batch)?;

        tracing::info!(
            player_id,
            session_id = session.id,
            games = session.games_played,
            net = session.net_result,
            "Session closed"
        );
        Ok(summary)
    }

    /// Hard self-exclusion; can only be extended, never shortened
    pub async fn self_exclude(&self, player_id: u64, days: u32) -> CasinoResult<DateTime<Utc>> {
        if days == 0 {
            return Err(WagerError::InvalidAmount("self-exclusion needs at least one day".to_string()).into());
        }

        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        let mut state = self.load_state(player_id, now)?;
        let until = state.profile.self_exclude(days, now);
        let mut batch = StoreBatch::new();
        batch.put_profile(&state.profile)?;
        self.store.commit(batch)?;

        tracing::info!(player_id, days, until = %until, "Player self-excluded");
        Ok(until)
    }

    /// Start the golden-hour bonus window; returns when it ends
    pub async fn activate_golden_hour(&self, player_id: u64) -> CasinoResult<DateTime<Utc>> {
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;
        let now = self.clock.now();

        let mut state = self.load_state(player_id, now)?;
        state.profile.activate_golden_hour(now);
        let mut batch = StoreBatch::new();
        batch.put_profile(&state.profile)?;
        self.store.commit(batch)?;

        Ok(now + Duration::minutes(self.config.bonuses.golden_hour_minutes))
    }

    pub async fn deposit(&self, player_id: u64, amount: u64) -> CasinoResult<u64> {
        if amount == 0 {
            return Err(WagerError::InvalidAmount("deposit must be positive".to_string()).into());
        }

        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;

        let balance = self
            .store
            .load_balance(player_id)?
            .checked_add(amount)
            .ok_or_else(|| WagerError::InvalidAmount("balance overflow".to_string()))?;
        let mut batch = StoreBatch::new();
        batch.put_balance(player_id, balance);
        self.store.commit(batch)?;

        tracing::debug!(player_id, amount, balance, "Deposit credited");
        Ok(balance)
    }

    pub fn balance(&self, player_id: u64) -> CasinoResult<u64> {
        self.store.load_balance(player_id)
    }

    /// Pending take/risk decision, if any; lets a reconnecting client recover it
    pub fn pending_wager(&self, player_id: u64) -> Option<PendingWager> {
        self.pending.get(player_id)
    }

    pub fn last_chance(&self, player_id: u64) -> CasinoResult<Option<CooldownTier>> {
        let Some(profile) = self.store.load_profile(player_id)? else {
            return Ok(None);
        };
        Ok(self
            .processor
            .cooldowns()
            .last_chance(&profile.cooldown(GameVariant::Dice)))
    }

    pub fn profile(&self, player_id: u64) -> CasinoResult<ProfileOverview> {
        let now = self.clock.now();
        let state = self.load_state(player_id, now)?;
        let last_chance = self
            .processor
            .cooldowns()
            .last_chance(&state.profile.cooldown(GameVariant::Dice));

        Ok(ProfileOverview {
            streak_badge: state.profile.streak_badge(),
            last_chance,
            balance: state.balance,
            profile: state.profile,
        })
    }

    pub async fn welcome_context(&self, player_id: u64) -> CasinoResult<WelcomeContext> {
        let now = self.clock.now();
        let state = self.load_state(player_id, now)?;
        let bonuses = &self.config.bonuses;

        Ok(WelcomeContext {
            greeting: state.profile.greeting(now, bonuses),
            balance: state.balance,
            jackpot_pool: self.jackpot.snapshot().await.pool,
            modifiers: state.profile.modifiers(now, bonuses),
            streak_badge: state.profile.streak_badge(),
        })
    }

    pub fn recent_games(&self, player_id: u64, limit: usize) -> CasinoResult<Vec<GameRecord>> {
        self.store.recent_games(player_id, limit)
    }

    pub async fn jackpot_snapshot(&self) -> JackpotSnapshot {
        self.jackpot.snapshot().await
    }

    pub async fn jackpot_info(&self, recent: usize) -> CasinoResult<JackpotInfo> {
        let state = self.jackpot.state().await;
        let config = self.jackpot.config();
        Ok(JackpotInfo {
            state,
            floor: config.floor,
            min_pool: config.min_pool,
            recent_wins: self.store.recent_jackpot_wins(recent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::games::draws::ScriptedDraws;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn engine(dir: &TempDir, draws: ScriptedDraws) -> CasinoEngine {
        let start = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        CasinoEngine::with_parts(
            CasinoConfig::default(),
            OptimizedStorage::new(dir.path()).unwrap(),
            Box::new(draws),
            Arc::new(ManualClock::new(start)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rejected_stake_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, ScriptedDraws::new());
        engine.deposit(1, 50).await.unwrap();

        let err = engine.place_bet(1, 5).await.unwrap_err();
        assert!(matches!(err, CasinoError::Wager(WagerError::StakeOutOfBounds { .. })));

        let err = engine.place_bet(1, 100).await.unwrap_err();
        assert!(matches!(
            err,
            CasinoError::Wager(WagerError::InsufficientBalance { balance: 50, required: 100 })
        ));

        assert_eq!(engine.balance(1).unwrap(), 50);
        assert_eq!(engine.jackpot_snapshot().await.pool, 500);
        assert!(engine.recent_games(1, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jackpot_hit_pays_pool_and_resets() {
        let dir = TempDir::new().unwrap();
        // lose bucket, jackpot draw under 20 bp
        let engine = engine(&dir, ScriptedDraws::new().with_bps([0, 5, 9_999]));
        engine.deposit(1, 1_000).await.unwrap();

        let response = engine.place_bet(1, 100).await.unwrap();
        let BetResponse::Final { result } = response else {
            panic!("expected final result");
        };

        assert_eq!(result.outcome, Outcome::Jackpot { amount: 505 });
        assert_eq!(result.payout, 505);
        assert_eq!(result.balance, 1_405);
        assert_eq!(engine.jackpot_snapshot().await.pool, 500);

        let info = engine.jackpot_info(5).await.unwrap();
        assert_eq!(info.state.last_winner_id, Some(1));
        assert_eq!(info.state.total_won, 505);
        assert_eq!(info.recent_wins.len(), 1);
        assert_eq!(engine.profile(1).unwrap().profile.current_win_streak, 1);
    }

    #[tokio::test]
    async fn test_double_submitted_bet_resolves_once() {
        let dir = TempDir::new().unwrap();
        // Intermediate on the first bet; the second must see the pending wager
        let engine = Arc::new(engine(&dir, ScriptedDraws::new().with_bps([7_000, 7_000])));
        engine.deposit(1, 1_000).await.unwrap();

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.place_bet(1, 100).await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.place_bet(1, 100).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(CasinoError::Wager(WagerError::PendingWagerExists(1)))
        )));
        assert_eq!(engine.balance(1).unwrap(), 900);
        assert_eq!(engine.jackpot_snapshot().await.pool, 505);
    }

    #[tokio::test]
    async fn test_pending_gauges_follow_the_pool() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, ScriptedDraws::new().with_bps([7_000]));
        engine.deposit(1, 1_000).await.unwrap();

        engine.place_bet(1, 100).await.unwrap();
        let text = engine.metrics().to_prometheus_format();
        assert!(text.contains("casino_pending_wagers 1"));
        assert!(text.contains("casino_pending_value 150"));

        engine.take_intermediate(1).await.unwrap();
        let text = engine.metrics().to_prometheus_format();
        assert!(text.contains("casino_pending_wagers 0"));
        assert!(text.contains("casino_pending_value 0"));
    }
}
