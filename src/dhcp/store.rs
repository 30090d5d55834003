//! Durable reconciliation against a local SQLite lease store (§4.B, §6
//! schema). Startup reload and post-flush bookkeeping around the
//! `lease`/`expiration` tables; the actual SQLite engine choice (`rusqlite`)
//! supersedes the teacher's MySQL pool, documented in DESIGN.md.
//!
//! Design Note 5 is load-bearing here: the sink call must succeed *before*
//! any `UPDATE`/`DELETE` against these tables runs, so a crash between sink
//! success and DB commit can only ever re-send a notification the
//! controller already has — never the reverse.

use std::path::Path;
use std::sync::Mutex;

use mac_address::MacAddress;
use rusqlite::Connection;

use super::notification::{Action, IpFamily, Notification};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub struct LeaseStore {
    conn: Mutex<Connection>,
}

impl LeaseStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS lease (
                id INTEGER PRIMARY KEY,
                ip TEXT NOT NULL,
                mac_address TEXT NOT NULL,
                duid TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                lifetime INTEGER NOT NULL,
                state TEXT NOT NULL,
                needs_sync INTEGER NOT NULL,
                range_id INTEGER
            );
            CREATE TABLE IF NOT EXISTS expiration (
                id INTEGER PRIMARY KEY,
                ip TEXT NOT NULL,
                mac_address TEXT NOT NULL,
                duid TEXT,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE lease (
                id INTEGER PRIMARY KEY, ip TEXT NOT NULL, mac_address TEXT NOT NULL,
                duid TEXT, created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL,
                lifetime INTEGER NOT NULL, state TEXT NOT NULL, needs_sync INTEGER NOT NULL,
                range_id INTEGER
            );
            CREATE TABLE expiration (
                id INTEGER PRIMARY KEY, ip TEXT NOT NULL, mac_address TEXT NOT NULL,
                duid TEXT, created_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Loads rows needing sync on startup: unsynced active leases as
    /// `commit` notifications, all expirations as `expiry` notifications.
    pub fn load_pending(&self) -> Result<Vec<Notification>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut notifications = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT ip, mac_address, updated_at, lifetime FROM lease
             WHERE needs_sync = 1 AND state = 'active'",
        )?;
        let rows = stmt.query_map([], |row| {
            let ip: String = row.get(0)?;
            let mac: String = row.get(1)?;
            let updated_at: i64 = row.get(2)?;
            let lifetime: i64 = row.get(3)?;
            Ok((ip, mac, updated_at, lifetime))
        })?;
        for row in rows {
            let (ip, mac, updated_at, lifetime) = row?;
            notifications.push(Notification {
                action: Action::Commit,
                ip_family: IpFamily::Ipv4,
                hostname: None,
                mac: parse_mac(&mac),
                ip: ip.parse().expect("stored ip is always valid"),
                timestamp: updated_at,
                lease_time: lifetime as u32,
            });
        }

        let mut stmt =
            conn.prepare("SELECT ip, mac_address, created_at FROM expiration")?;
        let rows = stmt.query_map([], |row| {
            let ip: String = row.get(0)?;
            let mac: String = row.get(1)?;
            let created_at: i64 = row.get(2)?;
            Ok((ip, mac, created_at))
        })?;
        for row in rows {
            let (ip, mac, created_at) = row?;
            notifications.push(Notification {
                action: Action::Expiry,
                ip_family: IpFamily::Ipv4,
                hostname: None,
                mac: parse_mac(&mac),
                ip: ip.parse().expect("stored ip is always valid"),
                timestamp: created_at,
                lease_time: 0,
            });
        }

        Ok(notifications)
    }

    /// Commits the bookkeeping for one successfully flushed batch, in a
    /// single transaction. Must only be called *after* the sink call for
    /// this batch has already succeeded.
    pub fn reconcile(&self, batch: &[Notification]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for notification in batch {
            match notification.action {
                Action::Commit => {
                    tx.execute(
                        "UPDATE lease SET needs_sync = 0 WHERE ip = ?1 AND mac_address = ?2",
                        rusqlite::params![
                            notification.ip.to_string(),
                            notification.mac.to_string()
                        ],
                    )?;
                }
                Action::Expiry => {
                    tx.execute(
                        "DELETE FROM expiration WHERE ip = ?1 AND mac_address = ?2 AND created_at = ?3",
                        rusqlite::params![
                            notification.ip.to_string(),
                            notification.mac.to_string(),
                            notification.timestamp
                        ],
                    )?;
                }
                Action::Release => {}
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Test/bootstrap helper: seeds one unsynced active lease row.
    pub fn insert_lease(
        &self,
        ip: &str,
        mac: MacAddress,
        updated_at: i64,
        lifetime: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lease (ip, mac_address, duid, created_at, updated_at, lifetime, state, needs_sync, range_id)
             VALUES (?1, ?2, NULL, ?3, ?3, ?4, 'active', 1, NULL)",
            rusqlite::params![ip, mac.to_string(), updated_at, lifetime],
        )?;
        Ok(())
    }

    pub fn needs_sync(&self, ip: &str, mac: MacAddress) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let value: i64 = conn.query_row(
            "SELECT needs_sync FROM lease WHERE ip = ?1 AND mac_address = ?2",
            rusqlite::params![ip, mac.to_string()],
            |row| row.get(0),
        )?;
        Ok(value != 0)
    }
}

fn parse_mac(raw: &str) -> MacAddress {
    raw.parse().unwrap_or(MacAddress::new([0; 6]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddress {
        "aa:bb:cc:dd:ee:ff".parse().unwrap()
    }

    #[test]
    fn loads_unsynced_active_lease() {
        let store = LeaseStore::in_memory().unwrap();
        store.insert_lease("10.0.0.1", mac(), 100, 3600).unwrap();
        let pending = store.load_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].action, Action::Commit);
    }

    #[test]
    fn reconcile_clears_needs_sync() {
        let store = LeaseStore::in_memory().unwrap();
        store.insert_lease("10.0.0.1", mac(), 100, 3600).unwrap();
        let pending = store.load_pending().unwrap();
        store.reconcile(&pending).unwrap();
        assert!(!store.needs_sync("10.0.0.1", mac()).unwrap());
    }
}
