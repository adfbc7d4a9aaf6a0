use std::collections::{HashMap, HashSet};

use quasar_types::parking_lot::Mutex;

/// `session id → (start time, last update time)`, both in epoch seconds.
type SessionRecords = HashMap<i64, (i64, i64)>;

/// The global session table: per graph frontend address, the sessions it
/// currently owns. All updates go through one mutex; reads are rare (the
/// reaper and the admin surface).
#[derive(Default)]
pub struct SessionManager {
    global_sessions: Mutex<HashMap<String, SessionRecords>>,
    heartbeat_interval_secs: i64,
}

impl SessionManager {
    pub fn new(heartbeat_interval_secs: u64) -> Self {
        Self {
            global_sessions: Mutex::new(HashMap::new()),
            heartbeat_interval_secs: heartbeat_interval_secs as i64,
        }
    }

    pub fn add_or_update_session(
        &self,
        addr: &str,
        session_id: i64,
        start_time: i64,
        update_time: i64,
    ) {
        let mut sessions = self.global_sessions.lock();
        let records = sessions.entry(addr.to_string()).or_default();
        match records.get_mut(&session_id) {
            Some(record) if record.0 == start_time => {
                record.1 = update_time;
            }
            // Unknown session, or a stale record from a previous
            // incarnation of the same id.
            _ => {
                records.insert(session_id, (start_time, update_time));
            }
        }
    }

    pub fn remove_session(&self, addr: &str, session_id: i64) {
        let mut sessions = self.global_sessions.lock();
        if let Some(records) = sessions.get_mut(addr) {
            records.remove(&session_id);
            if records.is_empty() {
                sessions.remove(addr);
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.global_sessions.lock().values().map(|r| r.len()).sum()
    }

    /// Sweeps the table. For an address that missed the current heartbeat
    /// round entirely the frontend may have crashed: its sessions survive
    /// only while `update_time + 2 × heartbeat` has not passed. For a live
    /// address, only sessions refreshed in this round survive.
    pub fn remove_invalid_sessions(&self, active_addrs: &HashSet<String>, update_time: i64) {
        let mut sessions = self.global_sessions.lock();
        let mut kept: HashMap<String, SessionRecords> = HashMap::new();
        for (addr, records) in sessions.iter() {
            let alive = active_addrs.contains(addr);
            for (&session_id, &(start_time, last_update)) in records {
                let keep = if alive {
                    last_update == update_time
                } else {
                    last_update + 2 * self.heartbeat_interval_secs >= update_time
                };
                if keep {
                    kept.entry(addr.clone())
                        .or_default()
                        .insert(session_id, (start_time, last_update));
                }
            }
        }
        *sessions = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_refreshes_only_matching_incarnations() {
        let manager = SessionManager::new(10);
        manager.add_or_update_session("graph-1", 7, 100, 100);
        manager.add_or_update_session("graph-1", 7, 100, 150);
        // A different start time is a new incarnation and replaces the old.
        manager.add_or_update_session("graph-1", 7, 200, 210);
        let sessions = manager.global_sessions.lock();
        assert_eq!(sessions["graph-1"][&7], (200, 210));
    }

    #[test]
    fn remove_drops_empty_addresses() {
        let manager = SessionManager::new(10);
        manager.add_or_update_session("graph-1", 7, 100, 100);
        manager.remove_session("graph-1", 7);
        assert_eq!(manager.session_count(), 0);
        assert!(manager.global_sessions.lock().is_empty());
    }

    #[test]
    fn reaper_keeps_recent_sessions_of_crashed_frontends() {
        let manager = SessionManager::new(10);
        manager.add_or_update_session("crashed", 1, 0, 100);
        manager.add_or_update_session("crashed", 2, 0, 50);

        // Nothing heartbeated; "crashed" is not in the active set.
        manager.remove_invalid_sessions(&HashSet::new(), 115);
        let sessions = manager.global_sessions.lock();
        // 100 + 20 >= 115 keeps session 1; 50 + 20 < 115 drops session 2.
        assert!(sessions["crashed"].contains_key(&1));
        assert!(!sessions["crashed"].contains_key(&2));
    }

    #[test]
    fn reaper_expires_stale_sessions_of_live_frontends() {
        let manager = SessionManager::new(10);
        manager.add_or_update_session("live", 1, 0, 120);
        manager.add_or_update_session("live", 2, 0, 90);

        let active = HashSet::from(["live".to_string()]);
        manager.remove_invalid_sessions(&active, 120);
        let sessions = manager.global_sessions.lock();
        // Only the session refreshed at exactly this sweep survives.
        assert!(sessions["live"].contains_key(&1));
        assert!(!sessions["live"].contains_key(&2));
    }
}
