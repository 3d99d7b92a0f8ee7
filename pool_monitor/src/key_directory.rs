//! Deposit address to validator key lookup.

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use types::PublicKeyBytes;

#[derive(Debug)]
pub enum KeyDirectoryError {
    SQLError(String),
    InvalidPubkey(String),
    Task(String),
}

impl From<rusqlite::Error> for KeyDirectoryError {
    fn from(e: rusqlite::Error) -> Self {
        KeyDirectoryError::SQLError(format!("{:?}", e))
    }
}

impl fmt::Display for KeyDirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Resolves deposit sender addresses to the validator keys they deposited for.
pub trait KeyDirectory: Send + Sync {
    /// Keys deposited by any of `addresses`, each key once. Addresses are lowercase
    /// `0x`-prefixed hex.
    fn keys_for_addresses(
        &self,
        addresses: &[String],
    ) -> impl Future<Output = Result<Vec<PublicKeyBytes>, KeyDirectoryError>> + Send;
}

impl<T: KeyDirectory> KeyDirectory for Arc<T> {
    fn keys_for_addresses(
        &self,
        addresses: &[String],
    ) -> impl Future<Output = Result<Vec<PublicKeyBytes>, KeyDirectoryError>> + Send {
        (**self).keys_for_addresses(addresses)
    }
}

/// A key directory for deployments where every pool has static keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyDirectory;

impl KeyDirectory for NoKeyDirectory {
    async fn keys_for_addresses(
        &self,
        _addresses: &[String],
    ) -> Result<Vec<PublicKeyBytes>, KeyDirectoryError> {
        Ok(vec![])
    }
}

/// Deposits indexed into SQLite, one row per deposit:
///
/// ```sql
/// CREATE TABLE deposits (sender TEXT NOT NULL, pubkey BLOB NOT NULL)
/// ```
///
/// `sender` is matched case-insensitively. A key topped up by several deposits is returned once,
/// in order of its first deposit.
#[derive(Clone)]
pub struct SqliteKeyDirectory {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl fmt::Debug for SqliteKeyDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteKeyDirectory")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteKeyDirectory {
    /// Open an existing deposit database read-only.
    pub fn open(path: &Path) -> Result<Self, KeyDirectoryError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self::from_connection(conn, path))
    }

    /// Create an empty deposit database at `path`.
    pub fn create(path: &Path) -> Result<Self, KeyDirectoryError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS deposits (
                sender TEXT NOT NULL,
                pubkey BLOB NOT NULL
            )",
            params![],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS deposits_sender ON deposits (lower(sender))",
            params![],
        )?;
        Ok(Self::from_connection(conn, path))
    }

    fn from_connection(conn: Connection, path: &Path) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        }
    }

    pub fn insert_deposit(
        &self,
        sender: &str,
        pubkey: &PublicKeyBytes,
    ) -> Result<(), KeyDirectoryError> {
        self.conn.lock().execute(
            "INSERT INTO deposits (sender, pubkey) VALUES (?1, ?2)",
            params![sender, pubkey.as_serialized()],
        )?;
        Ok(())
    }

    fn query_keys(
        conn: &Connection,
        addresses: &[String],
    ) -> Result<Vec<PublicKeyBytes>, KeyDirectoryError> {
        if addresses.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = vec!["?"; addresses.len()].join(", ");
        let sql = format!(
            "SELECT pubkey FROM deposits
             WHERE lower(sender) IN ({})
             GROUP BY pubkey
             ORDER BY MIN(rowid)",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let lowercase = addresses.iter().map(|a| a.to_lowercase());
        let rows = stmt.query_map(params_from_iter(lowercase), |row| row.get::<_, Vec<u8>>(0))?;

        rows.map(|row| {
            let bytes = row?;
            PublicKeyBytes::deserialize(&bytes)
                .map_err(|e| KeyDirectoryError::InvalidPubkey(format!("{:?}", e)))
        })
        .collect()
    }
}

impl KeyDirectory for SqliteKeyDirectory {
    async fn keys_for_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<PublicKeyBytes>, KeyDirectoryError> {
        let conn = self.conn.clone();
        let addresses = addresses.to_vec();
        tokio::task::spawn_blocking(move || Self::query_keys(&conn.lock(), &addresses))
            .await
            .map_err(|e| KeyDirectoryError::Task(format!("{:?}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use types::test_utils::test_pubkey;

    const LIDO: &str = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";
    const OTHER: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";

    fn directory() -> (tempfile::TempDir, SqliteKeyDirectory) {
        let dir = tempdir().unwrap();
        let db = SqliteKeyDirectory::create(&dir.path().join("deposits.sqlite")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn keys_by_sender() {
        let (_dir, db) = directory();
        db.insert_deposit(LIDO, &test_pubkey(1)).unwrap();
        db.insert_deposit(OTHER, &test_pubkey(2)).unwrap();
        db.insert_deposit(&LIDO.to_uppercase().replace("0X", "0x"), &test_pubkey(3))
            .unwrap();

        let keys = db.keys_for_addresses(&[LIDO.to_string()]).await.unwrap();
        assert_eq!(keys, vec![test_pubkey(1), test_pubkey(3)]);
    }

    #[tokio::test]
    async fn top_ups_are_returned_once() {
        let (_dir, db) = directory();
        db.insert_deposit(LIDO, &test_pubkey(7)).unwrap();
        db.insert_deposit(LIDO, &test_pubkey(8)).unwrap();
        db.insert_deposit(LIDO, &test_pubkey(7)).unwrap();

        let keys = db.keys_for_addresses(&[LIDO.to_string()]).await.unwrap();
        assert_eq!(keys, vec![test_pubkey(7), test_pubkey(8)]);
    }

    #[tokio::test]
    async fn several_addresses() {
        let (_dir, db) = directory();
        db.insert_deposit(LIDO, &test_pubkey(1)).unwrap();
        db.insert_deposit(OTHER, &test_pubkey(2)).unwrap();

        let keys = db
            .keys_for_addresses(&[OTHER.to_string(), LIDO.to_string()])
            .await
            .unwrap();
        assert_eq!(keys, vec![test_pubkey(1), test_pubkey(2)]);
        assert!(db.keys_for_addresses(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_read_only() {
        let (dir, db) = directory();
        db.insert_deposit(LIDO, &test_pubkey(1)).unwrap();
        drop(db);

        let db = SqliteKeyDirectory::open(&dir.path().join("deposits.sqlite")).unwrap();
        let keys = db.keys_for_addresses(&[LIDO.to_string()]).await.unwrap();
        assert_eq!(keys, vec![test_pubkey(1)]);
    }

    #[tokio::test]
    async fn corrupt_pubkey() {
        let (_dir, db) = directory();
        db.conn
            .lock()
            .execute(
                "INSERT INTO deposits (sender, pubkey) VALUES (?1, ?2)",
                params![LIDO, vec![1u8, 2, 3]],
            )
            .unwrap();
        assert!(matches!(
            db.keys_for_addresses(&[LIDO.to_string()]).await,
            Err(KeyDirectoryError::InvalidPubkey(_))
        ));
    }

    #[test]
    fn open_missing_database() {
        let dir = tempdir().unwrap();
        assert!(SqliteKeyDirectory::open(&dir.path().join("absent.sqlite")).is_err());
    }
}
