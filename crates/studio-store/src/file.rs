use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::batch::{KeyRange, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// Flush/sync strategy for the batch log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every batch (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on page-cache writeback.
    #[default]
    OsDefault,
}

/// Configuration for [`FileKvStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Sync strategy applied after each appended batch.
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes payload CRC + 4 bytes header CRC.
const HEADER_SIZE: usize = 12;

struct FileState {
    writer: BufWriter<File>,
    /// End of the last complete record.
    offset: u64,
    entries: BTreeMap<String, Vec<u8>>,
    /// Set when a failed append could not be rolled back. The log may end in
    /// a partial record, so appends are refused until `compact` rewrites it.
    broken: bool,
}

/// Durable key-value store backed by a single append-only batch log.
///
/// Every [`WriteBatch`] becomes one record:
///
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [4 bytes: CRC32 of the 8 bytes above (little-endian u32)]
/// [N bytes: payload (bincode-serialized WriteBatch)]
/// ```
///
/// The full key space is mirrored in memory. On open the log is replayed
/// front-to-back. A torn write from a crash is dropped and the file
/// truncated, so the batch it held is lost as a whole. A record counts as
/// torn only when it is the last one and its header is incomplete, its
/// header is intact but the payload is short or fails its CRC, or it is
/// followed by nothing but zero bytes. Any other damage is reported as
/// [`StoreError::Corrupt`] and the file is left untouched.
pub struct FileKvStore {
    path: PathBuf,
    config: FileStoreConfig,
    state: RwLock<FileState>,
}

impl FileKvStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path, config: FileStoreConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (entries, valid_len, records) = replay(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "dropping torn record at log tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        info!(path = %path.display(), records, keys = entries.len(), "store opened");

        Ok(Self {
            path: path.to_path_buf(),
            config,
            state: RwLock::new(FileState {
                writer: BufWriter::new(file),
                offset: valid_len,
                entries,
                broken: false,
            }),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes.
    pub fn log_len(&self) -> StoreResult<u64> {
        Ok(self.state.read().map_err(poisoned)?.offset)
    }

    /// Rewrite the log as a single snapshot record.
    ///
    /// The snapshot is written to a temporary file in the same directory and
    /// renamed over the log, and the directory is synced, so a crash leaves
    /// either the old or the new log. Compaction also clears the unusable
    /// state left by a failed rollback.
    pub fn compact(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        let mut snapshot = WriteBatch::new();
        for (key, value) in &state.entries {
            snapshot.put(key.clone(), value.clone());
        }
        let record = encode_record(&snapshot)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&record)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        sync_dir(&dir)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = state.offset;
        state.offset = file.metadata()?.len();
        replace_writer(&mut state, file);
        state.broken = false;

        info!(before, after = state.offset, keys = state.entries.len(), "log compacted");
        Ok(())
    }

    /// Truncate the log back to the last complete record and discard any
    /// bytes still buffered from a failed append.
    fn reset_writer(&self, state: &mut FileState) -> StoreResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        file.set_len(state.offset)?;
        replace_writer(state, file);
        Ok(())
    }

    fn append(&self, state: &mut FileState, record: &[u8]) -> StoreResult<()> {
        state.writer.write_all(record)?;
        state.writer.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            state.writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.entries.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let record = encode_record(&batch)?;
        let mut state = self.state.write().map_err(poisoned)?;
        if state.broken {
            return Err(StoreError::Unavailable(format!(
                "{} may end in a partial record; compact or reopen the store",
                self.path.display()
            )));
        }

        if let Err(e) = self.append(&mut state, &record) {
            // The next record must start on a clean boundary.
            if let Err(rollback) = self.reset_writer(&mut state) {
                warn!(offset = state.offset, error = %rollback, "failed to roll back partial record");
                state.broken = true;
            }
            return Err(e);
        }

        let record_offset = state.offset;
        state.offset += record.len() as u64;
        let puts = batch.len();
        batch.apply_to(&mut state.entries);

        debug!(offset = record_offset, len = record.len(), puts, "batch appended");
        Ok(())
    }

    fn scan(&self, range: &KeyRange) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(range.collect_from(&state.entries))
    }
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("path", &self.path)
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}

fn encode_record(batch: &WriteBatch) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Serialization(format!("batch of {} bytes exceeds record limit", payload.len()))
    })?;

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(&length.to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    let header_crc = crc32fast::hash(&record);
    record.extend_from_slice(&header_crc.to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Swap in a writer for `file`, dropping anything still buffered.
fn replace_writer(state: &mut FileState, file: File) {
    let failed = std::mem::replace(&mut state.writer, BufWriter::new(file));
    let _ = failed.into_parts();
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> StoreResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> StoreResult<()> {
    Ok(())
}

/// Replay the log, returning the materialized entries, the length of the
/// valid prefix, and the number of records applied.
fn replay(path: &Path) -> StoreResult<(BTreeMap<String, Vec<u8>>, u64, u64)> {
    let data = fs::read(path)?;
    let mut entries = BTreeMap::new();
    let mut offset = 0usize;
    let mut records = 0u64;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < HEADER_SIZE {
            // An incomplete header can only be the end of an interrupted append.
            break;
        }

        let corrupt = |reason: &str| StoreError::Corrupt {
            offset: offset as u64,
            reason: reason.to_string(),
        };

        let length = read_u32(rest, 0) as usize;
        let payload_crc = read_u32(rest, 4);
        if crc32fast::hash(&rest[..8]) != read_u32(rest, 8) {
            if rest.iter().all(|&b| b == 0) {
                break;
            }
            return Err(corrupt("header CRC mismatch"));
        }

        let end = HEADER_SIZE + length;
        if end > rest.len() {
            break;
        }
        let at_tail = end == rest.len();

        let payload = &rest[HEADER_SIZE..end];
        if length == 0 || crc32fast::hash(payload) != payload_crc {
            if at_tail {
                break;
            }
            return Err(corrupt(if length == 0 {
                "zero-length record"
            } else {
                "payload CRC mismatch"
            }));
        }

        let batch: WriteBatch = bincode::deserialize(payload).map_err(|e| StoreError::Corrupt {
            offset: offset as u64,
            reason: e.to_string(),
        })?;
        batch.apply_to(&mut entries);

        records += 1;
        offset += end;
    }

    Ok((entries, offset as u64, records))
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}
