//! SQLite session store backend.
//!
//! The connection string is a path to an existing database file. Schema:
//!
//! ```text
//! users    (user_id PK, enabled, duke, cookie_version)
//! sessions (user_id, ip, client_id PK together,
//!           cookie_version, soft_lifetime, soft_expires, hard_expires)
//! ```
//!
//! Times are Unix seconds. A session is valid until the earlier of its
//! soft and hard expiry; every successful check pushes the soft expiry
//! forward, the hard expiry never moves.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::{InsertOutcome, StoreConnection, StoreConnector, StoreCredentials, StoreError};

const CLIENT_ID_LEN: usize = 4;

/// Attempts at finding a client ID not already used by the same user/IP.
const CLIENT_ID_ATTEMPTS: usize = 8;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id        TEXT PRIMARY KEY,
        enabled        INTEGER NOT NULL DEFAULT 1,
        duke           INTEGER NOT NULL DEFAULT 0,
        cookie_version INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS sessions (
        user_id        TEXT NOT NULL REFERENCES users(user_id),
        ip             TEXT NOT NULL,
        client_id      TEXT NOT NULL,
        cookie_version INTEGER NOT NULL,
        soft_lifetime  INTEGER NOT NULL,
        soft_expires   INTEGER NOT NULL,
        hard_expires   INTEGER NOT NULL,
        PRIMARY KEY (user_id, ip, client_id)
    );
";

const SQL_PING: &str = "SELECT 1";

const SQL_LOOKUP_SESSION: &str = "
    SELECT s.soft_lifetime, s.soft_expires, s.hard_expires
      FROM sessions s
      JOIN users u ON u.user_id = s.user_id
     WHERE s.user_id = ?1 AND s.ip = ?2 AND s.client_id = ?3
       AND s.cookie_version = ?4
       AND u.enabled = 1
       AND u.cookie_version = s.cookie_version";

const SQL_SLIDE_SESSION: &str = "
    UPDATE sessions SET soft_expires = ?4
     WHERE user_id = ?1 AND ip = ?2 AND client_id = ?3";

const SQL_LOOKUP_USER: &str =
    "SELECT enabled, duke, cookie_version FROM users WHERE user_id = ?1";

const SQL_CLIENT_ID_TAKEN: &str =
    "SELECT 1 FROM sessions WHERE user_id = ?1 AND ip = ?2 AND client_id = ?3";

const SQL_INSERT_SESSION: &str = "
    INSERT OR REPLACE INTO sessions
        (user_id, ip, client_id, cookie_version, soft_lifetime, soft_expires, hard_expires)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const BUSINESS_STATEMENTS: [&str; 6] = [
    SQL_PING,
    SQL_LOOKUP_SESSION,
    SQL_SLIDE_SESSION,
    SQL_LOOKUP_USER,
    SQL_CLIENT_ID_TAKEN,
    SQL_INSERT_SESSION,
];

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn random_client_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CLIENT_ID_LEN)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// SqliteConnector
// ---------------------------------------------------------------------------

/// Opens connections to an SQLite session database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl SqliteConnector {
    /// Creates the database file if needed and the tables if missing.
    ///
    /// The daemon never creates its store on its own; this is for
    /// first-time setup and tests.
    pub fn initialize_schema(path: impl AsRef<Path>) -> Result<(), StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.as_ref().display(), "session store schema ready");
        Ok(())
    }

    /// Adds or replaces a user row.
    pub fn put_user(
        path: impl AsRef<Path>,
        user_id: &str,
        enabled: bool,
        duke: bool,
        cookie_version: u32,
    ) -> Result<(), StoreError> {
        let conn = Connection::open_with_flags(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        conn.execute(
            "INSERT OR REPLACE INTO users (user_id, enabled, duke, cookie_version)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, enabled, duke, cookie_version],
        )?;
        Ok(())
    }
}

impl StoreConnector for SqliteConnector {
    type Connection = SqliteConnection;

    fn connect(&self, credentials: &StoreCredentials) -> Result<SqliteConnection, StoreError> {
        // Read-write without CREATE: a typo in the config must not quietly
        // produce an empty store that rejects every session.
        let conn = Connection::open_with_flags(
            &credentials.connection_string,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(credentials.timeout)?;
        conn.set_prepared_statement_cache_capacity(BUSINESS_STATEMENTS.len());
        Ok(SqliteConnection { conn })
    }
}

// ---------------------------------------------------------------------------
// SqliteConnection
// ---------------------------------------------------------------------------

/// One open SQLite connection.
pub struct SqliteConnection {
    conn: Connection,
}

impl StoreConnection for SqliteConnection {
    fn prepare(&mut self) -> Result<(), StoreError> {
        for sql in BUSINESS_STATEMENTS {
            self.conn.prepare_cached(sql)?;
        }
        Ok(())
    }

    fn ping(&mut self) -> Result<(), StoreError> {
        let one: i64 = self
            .conn
            .prepare_cached(SQL_PING)?
            .query_row([], |row| row.get(0))?;
        if one == 1 {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("health probe returned {one}")))
        }
    }

    fn check_session(
        &mut self,
        user_id: &str,
        ip: &str,
        client_id: &str,
        cookie_version: &str,
    ) -> Result<u32, StoreError> {
        let Ok(version) = cookie_version.parse::<i64>() else {
            return Ok(0);
        };
        let now = now_secs();
        let tx = self.conn.transaction()?;

        let row: Option<(i64, i64, i64)> = tx
            .prepare_cached(SQL_LOOKUP_SESSION)?
            .query_row(params![user_id, ip, client_id, version], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let Some((soft_lifetime, soft_expires, hard_expires)) = row else {
            return Ok(0);
        };
        if now >= soft_expires || now >= hard_expires {
            return Ok(0);
        }

        let remaining = soft_lifetime.min(hard_expires - now);
        tx.prepare_cached(SQL_SLIDE_SESSION)?
            .execute(params![user_id, ip, client_id, now + remaining])?;
        tx.commit()?;

        Ok(u32::try_from(remaining).unwrap_or(u32::MAX))
    }

    fn insert_session(
        &mut self,
        user_id: &str,
        ip: &str,
        hard_lifetime_secs: u32,
        soft_lifetime_secs: u32,
    ) -> Result<InsertOutcome, StoreError> {
        if soft_lifetime_secs == 0 || soft_lifetime_secs > hard_lifetime_secs {
            return Ok(InsertOutcome::rejected());
        }

        let now = now_secs();
        let tx = self.conn.transaction()?;

        let user: Option<(bool, bool, i64)> = tx
            .prepare_cached(SQL_LOOKUP_USER)?
            .query_row(params![user_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let Some((true, duke, version)) = user else {
            return Ok(InsertOutcome::rejected());
        };

        let mut client_id = random_client_id();
        for _ in 1..CLIENT_ID_ATTEMPTS {
            let taken = tx
                .prepare_cached(SQL_CLIENT_ID_TAKEN)?
                .exists(params![user_id, ip, client_id])?;
            if !taken {
                break;
            }
            client_id = random_client_id();
        }

        tx.prepare_cached(SQL_INSERT_SESSION)?.execute(params![
            user_id,
            ip,
            client_id,
            version,
            soft_lifetime_secs,
            now + i64::from(soft_lifetime_secs),
            now + i64::from(hard_lifetime_secs),
        ])?;
        tx.commit()?;

        Ok(InsertOutcome {
            duke_flag: if duke { "1" } else { "0" }.to_string(),
            cookie_version: version.to_string(),
            client_id,
        })
    }

    fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    struct Db {
        _dir: TempDir,
        path: std::path::PathBuf,
    }

    impl Db {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sessions.db");
            SqliteConnector::initialize_schema(&path).unwrap();
            SqliteConnector::put_user(&path, "alice", true, false, 1).unwrap();
            SqliteConnector::put_user(&path, "bob", true, true, 3).unwrap();
            SqliteConnector::put_user(&path, "carol", false, false, 1).unwrap();
            Self { _dir: dir, path }
        }

        fn connect(&self) -> SqliteConnection {
            let creds = StoreCredentials::new(self.path.to_string_lossy());
            let mut conn = SqliteConnector.connect(&creds).unwrap();
            conn.prepare().unwrap();
            conn
        }

        fn exec(&self, sql: &str) {
            Connection::open(&self.path).unwrap().execute_batch(sql).unwrap();
        }
    }

    #[test]
    fn test_connect_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let creds = StoreCredentials::new(dir.path().join("nope.db").to_string_lossy());
        assert!(SqliteConnector.connect(&creds).is_err());
    }

    #[test]
    fn test_prepare_without_schema_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path).unwrap();

        let creds = StoreCredentials::new(path.to_string_lossy());
        let mut conn = SqliteConnector.connect(&creds).unwrap();
        assert!(conn.prepare().is_err());
    }

    #[test]
    fn test_ping_open_connection_succeeds() {
        let db = Db::new();
        assert!(db.connect().ping().is_ok());
    }

    #[test]
    fn test_insert_session_enabled_user_returns_cookie_values() {
        let db = Db::new();
        let mut conn = db.connect();

        let outcome = conn.insert_session("bob", "10.0.0.2", 7200, 3600).unwrap();

        assert_eq!(outcome.duke_flag, "1");
        assert_eq!(outcome.cookie_version, "3");
        assert_eq!(outcome.client_id.len(), CLIENT_ID_LEN);
        assert!(outcome.client_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_insert_session_rejections_return_empty_duke_flag() {
        let db = Db::new();
        let mut conn = db.connect();

        assert!(conn.insert_session("nobody", "10.0.0.1", 60, 30).unwrap().is_rejected());
        assert!(conn.insert_session("carol", "10.0.0.1", 60, 30).unwrap().is_rejected());
        assert!(conn.insert_session("alice", "10.0.0.1", 30, 60).unwrap().is_rejected());
        assert!(conn.insert_session("alice", "10.0.0.1", 60, 0).unwrap().is_rejected());
    }

    #[test]
    fn test_check_session_fresh_session_returns_soft_lifetime() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();

        let lifetime = conn
            .check_session("alice", "10.0.0.1", &out.client_id, &out.cookie_version)
            .unwrap();

        assert_eq!(lifetime, 3600);
    }

    #[test]
    fn test_check_session_near_hard_expiry_returns_remaining() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();
        db.exec(&format!(
            "UPDATE sessions SET hard_expires = {} WHERE client_id = '{}'",
            now_secs() + 100,
            out.client_id
        ));

        let lifetime = conn
            .check_session("alice", "10.0.0.1", &out.client_id, "1")
            .unwrap();

        assert!((99..=100).contains(&lifetime), "got {lifetime}");
    }

    #[test]
    fn test_check_session_slides_soft_expiry() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();
        db.exec(&format!(
            "UPDATE sessions SET soft_expires = {} WHERE client_id = '{}'",
            now_secs() + 10,
            out.client_id
        ));

        conn.check_session("alice", "10.0.0.1", &out.client_id, "1").unwrap();

        let soft: i64 = Connection::open(&db.path)
            .unwrap()
            .query_row("SELECT soft_expires FROM sessions", [], |r| r.get(0))
            .unwrap();
        assert!(soft >= now_secs() + 3500, "soft expiry not extended");
    }

    #[test]
    fn test_check_session_expired_returns_zero() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();
        db.exec("UPDATE sessions SET soft_expires = 1");

        let lifetime = conn
            .check_session("alice", "10.0.0.1", &out.client_id, "1")
            .unwrap();

        assert_eq!(lifetime, 0);
    }

    #[test]
    fn test_check_session_mismatches_return_zero() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();
        let cid = out.client_id.as_str();

        assert_eq!(conn.check_session("alice", "10.0.0.9", cid, "1").unwrap(), 0);
        assert_eq!(conn.check_session("alice", "10.0.0.1", "????", "1").unwrap(), 0);
        assert_eq!(conn.check_session("alice", "10.0.0.1", cid, "2").unwrap(), 0);
        assert_eq!(conn.check_session("alice", "10.0.0.1", cid, "x").unwrap(), 0);
    }

    #[test]
    fn test_check_session_version_bump_revokes_session() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();

        SqliteConnector::put_user(&db.path, "alice", true, false, 2).unwrap();

        assert_eq!(
            conn.check_session("alice", "10.0.0.1", &out.client_id, "1").unwrap(),
            0
        );
    }

    #[test]
    fn test_check_session_disabled_user_returns_zero() {
        let db = Db::new();
        let mut conn = db.connect();
        let out = conn.insert_session("alice", "10.0.0.1", 7200, 3600).unwrap();

        SqliteConnector::put_user(&db.path, "alice", false, false, 1).unwrap();

        assert_eq!(
            conn.check_session("alice", "10.0.0.1", &out.client_id, "1").unwrap(),
            0
        );
    }

    #[test]
    fn test_close_open_connection_succeeds() {
        let db = Db::new();
        assert!(db.connect().close().is_ok());
    }
}
