//! Persistent casino state stored in RocksDB.
//!
//! State rows (profiles, sessions, pending wagers, jackpot) are bincode;
//! audit rows (game records, jackpot wins) are JSON so they stay readable
//! with external tooling. Every mutating engine operation stages its writes in
//! a [`StoreBatch`] and commits it as one atomic RocksDB write.

use crate::{
    errors::{CasinoResult, StorageError},
    games::types::{GameRecord, PendingWager},
    jackpot::{JackpotState, JackpotWin},
    profile::Profile,
    session::Session,
    storage::OptimizedStorage,
};
use rocksdb::WriteBatch;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Mutex;

const PROFILE_PREFIX: &[u8] = b"casino:profile:";
const BALANCE_PREFIX: &[u8] = b"casino:balance:";
const SESSION_PREFIX: &[u8] = b"casino:session:";
const PENDING_PREFIX: &[u8] = b"casino:pending:";
const GAME_RECORD_PREFIX: &[u8] = b"casino:record:";
const PLAYER_GAMES_PREFIX: &[u8] = b"casino:index:player_games:";
const JACKPOT_WIN_PREFIX: &[u8] = b"casino:jackpot:win:";
const JACKPOT_STATE_KEY: &[u8] = b"casino:jackpot:state";

const SESSION_SEQ_KEY: &[u8] = b"casino:seq:session";
const GAME_SEQ_KEY: &[u8] = b"casino:seq:game";
const JACKPOT_WIN_SEQ_KEY: &[u8] = b"casino:seq:jackpot_win";

/// Ids handed out per persisted reservation
const ID_BLOCK: u64 = 1_000;

fn id_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn player_games_prefix(player_id: u64) -> Vec<u8> {
    id_key(PLAYER_GAMES_PREFIX, player_id)
}

fn player_game_index_key(player_id: u64, record_id: u64) -> Vec<u8> {
    // Newest first: prefix | player(be) | inv_record_id(be)
    let mut key = player_games_prefix(player_id);
    key.extend_from_slice(&(u64::MAX - record_id).to_be_bytes());
    key
}

fn jackpot_win_key(win_id: u64) -> Vec<u8> {
    id_key(JACKPOT_WIN_PREFIX, u64::MAX - win_id)
}

fn decode_u64(bytes: &[u8], what: &str) -> CasinoResult<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StorageError::CorruptedData(format!("{} has {} bytes, expected 8", what, bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

fn trailing_u64(key: &[u8]) -> Option<u64> {
    let offset = key.len().checked_sub(8)?;
    let raw: [u8; 8] = key[offset..].try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

fn decode_bin<T: DeserializeOwned>(bytes: &[u8], what: &str) -> CasinoResult<T> {
    bincode::deserialize(bytes).map_err(|e| {
        StorageError::CorruptedData(format!("Failed to decode {}: {}", what, e)).into()
    })
}

fn encode_bin<T: Serialize>(value: &T, what: &str) -> CasinoResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to encode {}: {}", what, e)).into()
    })
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8], what: &str) -> CasinoResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        StorageError::CorruptedData(format!("Failed to decode {}: {}", what, e)).into()
    })
}

fn encode_json<T: Serialize>(value: &T, what: &str) -> CasinoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to encode {}: {}", what, e)).into()
    })
}

/// Block-reserving id sequence. A reservation is written through before any
/// id from it is handed out, so ids never repeat across restarts.
struct IdAllocator {
    key: &'static [u8],
    block: Mutex<IdBlock>,
}

struct IdBlock {
    next: u64,
    ceiling: u64,
}

impl IdAllocator {
    fn load(storage: &OptimizedStorage, key: &'static [u8]) -> CasinoResult<Self> {
        let ceiling = match storage.get(key)? {
            Some(bytes) => decode_u64(&bytes, "id reservation")?,
            None => 0,
        };
        Ok(Self {
            key,
            block: Mutex::new(IdBlock {
                next: ceiling.max(1),
                ceiling,
            }),
        })
    }

    fn next(&self, storage: &OptimizedStorage) -> CasinoResult<u64> {
        let mut block = self
            .block
            .lock()
            .map_err(|_| StorageError::WriteFailed("id allocator poisoned".to_string()))?;
        if block.next >= block.ceiling {
            let ceiling = block.next + ID_BLOCK;
            storage.put(self.key, &ceiling.to_be_bytes())?;
            block.ceiling = ceiling;
        }
        let id = block.next;
        block.next += 1;
        Ok(id)
    }
}

/// Writes staged for one atomic commit
#[derive(Default)]
pub struct StoreBatch {
    batch: WriteBatch,
    staged: usize,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged == 0
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch.put(key, value);
        self.staged += 1;
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.batch.delete(key);
        self.staged += 1;
    }

    pub fn put_profile(&mut self, profile: &Profile) -> CasinoResult<()> {
        let bytes = encode_bin(profile, "profile")?;
        self.put(id_key(PROFILE_PREFIX, profile.player_id), bytes);
        Ok(())
    }

    pub fn put_balance(&mut self, player_id: u64, balance: u64) {
        self.put(id_key(BALANCE_PREFIX, player_id), balance.to_be_bytes().to_vec());
    }

    pub fn put_session(&mut self, session: &Session) -> CasinoResult<()> {
        let bytes = encode_bin(session, "session")?;
        self.put(id_key(SESSION_PREFIX, session.id), bytes);
        Ok(())
    }

    pub fn put_pending(&mut self, pending: &PendingWager) -> CasinoResult<()> {
        let bytes = encode_bin(pending, "pending wager")?;
        self.put(id_key(PENDING_PREFIX, pending.player_id), bytes);
        Ok(())
    }

    pub fn delete_pending(&mut self, player_id: u64) {
        self.delete(id_key(PENDING_PREFIX, player_id));
    }

    pub fn put_jackpot(&mut self, state: &JackpotState) -> CasinoResult<()> {
        let bytes = encode_bin(state, "jackpot state")?;
        self.put(JACKPOT_STATE_KEY.to_vec(), bytes);
        Ok(())
    }

    pub fn put_jackpot_win(&mut self, win: &JackpotWin) -> CasinoResult<()> {
        let bytes = encode_json(win, "jackpot win")?;
        self.put(jackpot_win_key(win.id), bytes);
        Ok(())
    }

    /// Stage the audit row together with the per-player index entry
    pub fn put_game_record(&mut self, record: &GameRecord) -> CasinoResult<()> {
        let bytes = encode_json(record, "game record")?;
        self.put(id_key(GAME_RECORD_PREFIX, record.id), bytes);
        self.put(player_game_index_key(record.player_id, record.id), Vec::new());
        Ok(())
    }
}

/// Typed access to casino rows
pub struct CasinoStore {
    storage: OptimizedStorage,
    session_ids: IdAllocator,
    game_ids: IdAllocator,
    jackpot_win_ids: IdAllocator,
}

impl CasinoStore {
    pub fn open(storage: OptimizedStorage) -> CasinoResult<Self> {
        Ok(Self {
            session_ids: IdAllocator::load(&storage, SESSION_SEQ_KEY)?,
            game_ids: IdAllocator::load(&storage, GAME_SEQ_KEY)?,
            jackpot_win_ids: IdAllocator::load(&storage, JACKPOT_WIN_SEQ_KEY)?,
            storage,
        })
    }

    pub fn commit(&self, batch: StoreBatch) -> CasinoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let staged = batch.len();
        self.storage.write(batch.batch)?;
        tracing::debug!(staged, "Committed store batch");
        Ok(())
    }

    pub fn next_session_id(&self) -> CasinoResult<u64> {
        self.session_ids.next(&self.storage)
    }

    pub fn next_game_id(&self) -> CasinoResult<u64> {
        self.game_ids.next(&self.storage)
    }

    pub fn next_jackpot_win_id(&self) -> CasinoResult<u64> {
        self.jackpot_win_ids.next(&self.storage)
    }

    pub fn load_profile(&self, player_id: u64) -> CasinoResult<Option<Profile>> {
        match self.storage.get(&id_key(PROFILE_PREFIX, player_id))? {
            Some(bytes) => decode_bin(&bytes, "profile").map(Some),
            None => Ok(None),
        }
    }

    /// Missing balance rows read as zero
    pub fn load_balance(&self, player_id: u64) -> CasinoResult<u64> {
        match self.storage.get(&id_key(BALANCE_PREFIX, player_id))? {
            Some(bytes) => decode_u64(&bytes, "balance"),
            None => Ok(0),
        }
    }

    pub fn load_session(&self, session_id: u64) -> CasinoResult<Option<Session>> {
        match self.storage.get(&id_key(SESSION_PREFIX, session_id))? {
            Some(bytes) => decode_bin(&bytes, "session").map(Some),
            None => Ok(None),
        }
    }

    pub fn load_pending(&self, player_id: u64) -> CasinoResult<Option<PendingWager>> {
        match self.storage.get(&id_key(PENDING_PREFIX, player_id))? {
            Some(bytes) => decode_bin(&bytes, "pending wager").map(Some),
            None => Ok(None),
        }
    }

    pub fn load_all_pending(&self) -> CasinoResult<Vec<PendingWager>> {
        self.storage
            .scan_prefix(PENDING_PREFIX, usize::MAX)?
            .iter()
            .map(|(_, bytes)| decode_bin(bytes, "pending wager"))
            .collect()
    }

    pub fn load_jackpot(&self) -> CasinoResult<Option<JackpotState>> {
        match self.storage.get(JACKPOT_STATE_KEY)? {
            Some(bytes) => decode_bin(&bytes, "jackpot state").map(Some),
            None => Ok(None),
        }
    }

    pub fn load_game_record(&self, record_id: u64) -> CasinoResult<Option<GameRecord>> {
        let Some(bytes) = self.storage.get(&id_key(GAME_RECORD_PREFIX, record_id))? else {
            return Ok(None);
        };

        decode_json(&bytes, "game record").map(Some)
    }

    /// Newest first
    pub fn recent_games(&self, player_id: u64, limit: usize) -> CasinoResult<Vec<GameRecord>> {
        let prefix = player_games_prefix(player_id);
        let mut records = Vec::new();

        for (key, _) in self.storage.scan_prefix(&prefix, limit)? {
            let Some(inv_id) = trailing_u64(&key) else {
                continue;
            };
            let record_id = u64::MAX - inv_id;
            match self.load_game_record(record_id)? {
                Some(record) => records.push(record),
                None => tracing::warn!(player_id, record_id, "Index points at missing game record"),
            }
        }
        Ok(records)
    }

    /// Newest first
    pub fn recent_jackpot_wins(&self, limit: usize) -> CasinoResult<Vec<JackpotWin>> {
        self.storage
            .scan_prefix(JACKPOT_WIN_PREFIX, limit)?
            .iter()
            .map(|(_, bytes)| decode_json(bytes, "jackpot win"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{GameVariant, Outcome};
    use chrono::Utc;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> CasinoStore {
        CasinoStore::open(OptimizedStorage::new(dir.path()).unwrap()).unwrap()
    }

    fn record(id: u64, player_id: u64) -> GameRecord {
        GameRecord {
            id,
            player_id,
            session_id: None,
            variant: GameVariant::Dice,
            stake: 10,
            outcome: Outcome::Lose,
            multiplier: 0.0,
            payout: 0,
            phase: 1,
            was_risk: false,
            near_miss: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ids_never_repeat_across_reopen() {
        let dir = TempDir::new().unwrap();
        let first = {
            let store = open_store(&dir);
            let a = store.next_game_id().unwrap();
            let b = store.next_game_id().unwrap();
            assert!(b > a);
            b
        };

        let store = open_store(&dir);
        assert!(store.next_game_id().unwrap() > first);
    }

    #[test]
    fn test_batch_commits_profile_balance_and_pending_together() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();
        let pending = PendingWager {
            player_id: 5,
            session_id: None,
            variant: GameVariant::Dice,
            stake: 100,
            value: 150,
            created_at: now,
        };

        let mut batch = StoreBatch::new();
        batch.put_profile(&Profile::new(5, now)).unwrap();
        batch.put_balance(5, 900);
        batch.put_pending(&pending).unwrap();
        assert_eq!(batch.len(), 3);
        store.commit(batch).unwrap();

        assert_eq!(store.load_balance(5).unwrap(), 900);
        assert_eq!(store.load_pending(5).unwrap(), Some(pending));
        assert_eq!(store.load_all_pending().unwrap().len(), 1);
        assert_eq!(store.load_profile(5).unwrap().unwrap().player_id, 5);

        let mut batch = StoreBatch::new();
        batch.delete_pending(5);
        store.commit(batch).unwrap();
        assert_eq!(store.load_pending(5).unwrap(), None);
    }

    #[test]
    fn test_recent_games_newest_first_per_player() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut batch = StoreBatch::new();
        for id in 1..=4 {
            batch.put_game_record(&record(id, 1)).unwrap();
        }
        batch.put_game_record(&record(5, 2)).unwrap();
        store.commit(batch).unwrap();

        let games = store.recent_games(1, 3).unwrap();
        let ids: Vec<u64> = games.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert_eq!(store.recent_games(2, 10).unwrap().len(), 1);
        assert!(store.recent_games(3, 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_rows_read_as_defaults() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert_eq!(store.load_balance(77).unwrap(), 0);
        assert!(store.load_profile(77).unwrap().is_none());
        assert!(store.load_jackpot().unwrap().is_none());
        assert!(store.recent_jackpot_wins(5).unwrap().is_empty());
    }
}
