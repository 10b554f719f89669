//! Play sessions: one open session per player at most

use crate::errors::WagerError;
use crate::profile::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub player_id: u64,
    pub games_played: u32,
    pub total_staked: u64,
    pub total_won: u64,
    pub net_result: i64,
    pub max_win_streak: u32,
    pub max_lose_streak: u32,
    /// Running streaks counted from this session's games only
    pub win_streak: u32,
    pub lose_streak: u32,
    pub is_open: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Final aggregates of a closed session that saw at least one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: u64,
    pub player_id: u64,
    pub games_played: u32,
    pub total_staked: u64,
    pub total_won: u64,
    pub net_result: i64,
    pub max_win_streak: u32,
    pub max_lose_streak: u32,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl Session {
    /// Fold one finalized game in
    pub fn record_game(&mut self, stake: u64, won: bool, payout: u64) {
        self.games_played += 1;
        self.total_staked = self.total_staked.saturating_add(stake);

        if won {
            let winnings = payout.saturating_sub(stake);
            self.total_won = self.total_won.saturating_add(winnings);
            self.net_result += payout as i64 - stake as i64;
            self.win_streak += 1;
            self.lose_streak = 0;
            self.max_win_streak = self.max_win_streak.max(self.win_streak);
        } else {
            self.net_result -= stake as i64;
            self.lose_streak += 1;
            self.win_streak = 0;
            self.max_lose_streak = self.max_lose_streak.max(self.lose_streak);
        }
    }
}

/// Session lifecycle rules over a profile and its current session row
pub struct SessionTracker;

impl SessionTracker {
    /// Start a session. Fails while `current` is still open; the caller must
    /// resume or close it first.
    pub fn open(
        profile: &mut Profile,
        current: Option<&Session>,
        session_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Session, WagerError> {
        if let Some(open) = current.filter(|session| session.is_open) {
            return Err(WagerError::SessionAlreadyOpen {
                player_id: profile.player_id,
                session_id: open.id,
            });
        }

        profile.total_visits += 1;
        profile.current_session_id = Some(session_id);

        Ok(Session {
            id: session_id,
            player_id: profile.player_id,
            games_played: 0,
            total_staked: 0,
            total_won: 0,
            net_result: 0,
            max_win_streak: 0,
            max_lose_streak: 0,
            win_streak: 0,
            lose_streak: 0,
            is_open: true,
            opened_at: now,
            closed_at: None,
        })
    }

    /// Close the session exactly once. The summary is `None` for an already
    /// closed session or one with zero games.
    pub fn close(
        profile: &mut Profile,
        session: &mut Session,
        now: DateTime<Utc>,
    ) -> Option<SessionSummary> {
        if !session.is_open {
            return None;
        }

        session.is_open = false;
        session.closed_at = Some(now);
        profile.last_session_result = session.net_result;
        profile.last_session_games = session.games_played;
        if profile.current_session_id == Some(session.id) {
            profile.current_session_id = None;
        }

        if session.games_played == 0 {
            return None;
        }

        Some(SessionSummary {
            session_id: session.id,
            player_id: session.player_id,
            games_played: session.games_played,
            total_staked: session.total_staked,
            total_won: session.total_won,
            net_result: session.net_result,
            max_win_streak: session.max_win_streak,
            max_lose_streak: session.max_lose_streak,
            opened_at: session.opened_at,
            closed_at: now,
        })
    }
}
