//! ConnectionPool: the single writer connection plus read-only readers.
//!
//! Version appends, TTL closes and bridge writes all serialize on the writer.
//! Time-travel scans and listings go to a reader, so a long keyset scan does
//! not hold up mutations.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use rusqlite::{Connection, OpenFlags};

use topograph_core::errors::StorageError;
use topograph_core::{TopologyError, TopologyResult};

use crate::{pragmas, to_storage_err};

pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl ConnectionPool {
    /// Open the writer first so the file and its WAL exist, then at least
    /// one reader.
    pub fn open(path: &Path, read_pool_size: usize) -> TopologyResult<Self> {
        let writer = Connection::open(path).map_err(to_storage_err)?;
        pragmas::configure_connection(&writer)?;

        let readers = (0..read_pool_size.max(1))
            .map(|_| open_reader(path).map(Mutex::new))
            .collect::<TopologyResult<Vec<_>>>()?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Each in-memory connection is its own database, so this pool has no
    /// readers and every read runs on the writer.
    pub fn open_in_memory() -> TopologyResult<Self> {
        let writer = Connection::open_in_memory().map_err(to_storage_err)?;
        pragmas::configure_connection(&writer)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    pub fn with_writer<F, T>(&self, f: F) -> TopologyResult<T>
    where
        F: FnOnce(&Connection) -> TopologyResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| poisoned(format!("writer lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run `f` on an idle reader, starting from the round-robin position.
    /// Blocks on that position only when every reader is busy.
    pub fn with_reader<F, T>(&self, f: F) -> TopologyResult<T>
    where
        F: FnOnce(&Connection) -> TopologyResult<T>,
    {
        let n = self.readers.len();
        if n == 0 {
            return self.with_writer(f);
        }

        let start = self.next_reader.fetch_add(1, Ordering::Relaxed);
        let conn = match self.idle_reader(start, n) {
            Some(guard) => guard?,
            None => {
                let index = start % n;
                self.readers[index]
                    .lock()
                    .map_err(|e| poisoned(format!("reader {index} lock poisoned: {e}")))?
            }
        };
        f(&conn)
    }

    fn idle_reader(
        &self,
        start: usize,
        n: usize,
    ) -> Option<TopologyResult<MutexGuard<'_, Connection>>> {
        (0..n).map(|offset| (start + offset) % n).find_map(|index| {
            match self.readers[index].try_lock() {
                Ok(guard) => Some(Ok(guard)),
                Err(TryLockError::WouldBlock) => None,
                Err(TryLockError::Poisoned(e)) => Some(Err(poisoned(format!(
                    "reader {index} lock poisoned: {e}"
                )))),
            }
        })
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// `PRAGMA journal_mode` as reported by the writer, e.g. `wal` or `memory`.
    pub fn journal_mode(&self) -> TopologyResult<String> {
        self.with_writer(|conn| {
            conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .map_err(to_storage_err)
        })
    }
}

fn open_reader(path: &Path) -> TopologyResult<Connection> {
    let reader = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(to_storage_err)?;
    pragmas::configure_readonly_connection(&reader)?;
    Ok(reader)
}

fn poisoned(message: String) -> TopologyError {
    StorageError::Pool(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_reads_use_writer() {
        let pool = ConnectionPool::open_in_memory().unwrap();
        assert_eq!(pool.reader_count(), 0);
        pool.with_writer(|c| {
            c.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
                .map_err(to_storage_err)
        })
        .unwrap();
        let x: i64 = pool
            .with_reader(|c| {
                c.query_row("SELECT x FROM t", [], |r| r.get(0))
                    .map_err(to_storage_err)
            })
            .unwrap();
        assert_eq!(x, 7);
    }

    #[test]
    fn file_pool_is_wal_and_readers_see_commits() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("topo.db"), 3).unwrap();
        assert_eq!(pool.reader_count(), 3);
        assert_eq!(pool.journal_mode().unwrap(), "wal");

        pool.with_writer(|c| {
            c.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2);")
                .map_err(to_storage_err)
        })
        .unwrap();
        for _ in 0..4 {
            let n: i64 = pool
                .with_reader(|c| {
                    c.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
                        .map_err(to_storage_err)
                })
                .unwrap();
            assert_eq!(n, 2);
        }
    }

    #[test]
    fn busy_reader_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("topo.db"), 2).unwrap();
        pool.with_writer(|c| c.execute_batch("CREATE TABLE t (x INTEGER);").map_err(to_storage_err))
            .unwrap();

        // Hold reader 0 while another read is issued from the same thread.
        let held = pool.readers[0].lock().unwrap();
        pool.next_reader.store(0, Ordering::Relaxed);
        let n: i64 = pool
            .with_reader(|c| {
                c.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
                    .map_err(to_storage_err)
            })
            .unwrap();
        assert_eq!(n, 0);
        drop(held);
    }

    #[test]
    fn zero_readers_requested_still_opens_one() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("topo.db"), 0).unwrap();
        assert_eq!(pool.reader_count(), 1);
    }
}
