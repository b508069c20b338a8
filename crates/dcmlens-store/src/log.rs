use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dcmlens_types::{ContentDigest, FileId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::DedupIndex;

/// One `digest → file` pairing, as persisted in the index log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub digest: ContentDigest,
    pub file_id: FileId,
}

/// Tuning for [`LogDedupIndex`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// `fsync` after every record.
    pub sync_on_write: bool,
    /// Minimum frame count before the log is considered for compaction.
    pub compact_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            compact_threshold: 1024,
        }
    }
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct LogState {
    entries: HashMap<ContentDigest, FileId>,
    writer: BufWriter<File>,
    /// Frames currently in the log file, live or superseded.
    frames: usize,
}

/// Durable dedup index backed by an append-only log.
///
/// Each [`FileRecord`] is bincode-serialized and framed on disk as:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload]
/// ```
/// On open the log is replayed front to back; later frames for a digest win.
/// Frames failing the CRC are skipped and a torn tail ends the replay. If any
/// damage was found the log is rewritten from the recovered entries, so new
/// frames are never appended behind garbage. When superseded frames pile up
/// the log is compacted the same way.
pub struct LogDedupIndex {
    path: PathBuf,
    config: IndexConfig,
    state: Mutex<LogState>,
}

/// Result of replaying raw log bytes.
struct Replay {
    entries: HashMap<ContentDigest, FileId>,
    frames: usize,
    damaged: bool,
}

impl LogDedupIndex {
    /// Open (or create) the index log at `path`.
    ///
    /// A missing log is an empty index. An unreadable or corrupt log is
    /// recovered as far as possible and never fails the open.
    pub fn open(path: impl AsRef<Path>, config: IndexConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let replay = match fs::read(&path) {
            Ok(bytes) => replay(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Replay {
                entries: HashMap::new(),
                frames: 0,
                damaged: false,
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "dedup index unreadable; starting empty");
                Replay {
                    entries: HashMap::new(),
                    frames: 0,
                    damaged: true,
                }
            }
        };

        let writer = if replay.damaged {
            warn!(
                path = %path.display(),
                recovered = replay.entries.len(),
                "dedup index damaged; rewriting from recovered entries"
            );
            rewrite(&path, &replay.entries, config.sync_on_write)?
        } else {
            BufWriter::new(open_append(&path)?)
        };

        let frames = if replay.damaged {
            replay.entries.len()
        } else {
            replay.frames
        };

        info!(
            path = %path.display(),
            entries = replay.entries.len(),
            frames,
            "dedup index loaded"
        );

        Ok(Self {
            path,
            config,
            state: Mutex::new(LogState {
                entries: replay.entries,
                writer,
                frames,
            }),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames currently in the log, including superseded ones.
    pub fn frame_count(&self) -> usize {
        self.state.lock().expect("index mutex poisoned").frames
    }

    /// Rewrite the log so it holds exactly one frame per live digest.
    pub fn compact(&self) -> StoreResult<()> {
        let mut state = self.state.lock().expect("index mutex poisoned");
        self.compact_locked(&mut state)
    }

    fn compact_locked(&self, state: &mut LogState) -> StoreResult<()> {
        state.writer.flush()?;
        let before = state.frames;
        state.writer = rewrite(&self.path, &state.entries, self.config.sync_on_write)?;
        state.frames = state.entries.len();
        debug!(before, after = state.frames, "dedup index compacted");
        Ok(())
    }

    fn should_compact(&self, state: &LogState) -> bool {
        state.frames > self.config.compact_threshold && state.frames > 2 * state.entries.len()
    }
}

impl DedupIndex for LogDedupIndex {
    fn lookup(&self, digest: &ContentDigest) -> StoreResult<Option<FileId>> {
        let state = self.state.lock().expect("index mutex poisoned");
        Ok(state.entries.get(digest).copied())
    }

    fn record(&self, digest: ContentDigest, id: FileId) -> StoreResult<()> {
        let record = FileRecord {
            digest,
            file_id: id,
        };
        let frame = encode_frame(&record)?;

        let mut state = self.state.lock().expect("index mutex poisoned");
        state.writer.write_all(&frame)?;
        state.writer.flush()?;
        if self.config.sync_on_write {
            state.writer.get_ref().sync_data()?;
        }
        state.frames += 1;
        if let Some(previous) = state.entries.insert(digest, id) {
            if previous != id {
                debug!(digest = %digest.short_hex(), %previous, %id, "dedup entry replaced");
            }
        }

        if self.should_compact(&state) {
            self.compact_locked(&mut state)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().expect("index mutex poisoned").entries.len()
    }
}

impl std::fmt::Debug for LogDedupIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogDedupIndex")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

fn encode_frame(record: &FileRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = payload.len() as u32;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn replay(bytes: &[u8]) -> Replay {
    let mut entries = HashMap::new();
    let mut frames = 0;
    let mut damaged = false;
    let mut offset = 0usize;

    while offset < bytes.len() {
        if offset + HEADER_SIZE > bytes.len() {
            warn!(offset, "truncated dedup index header; stopping replay");
            damaged = true;
            break;
        }
        let header = &bytes[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        if length == 0 || start + length > bytes.len() {
            warn!(offset, length, "invalid dedup index frame length; stopping replay");
            damaged = true;
            break;
        }
        let payload = &bytes[start..start + length];
        offset = start + length;

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping dedup index frame"
            );
            damaged = true;
            continue;
        }

        match bincode::deserialize::<FileRecord>(payload) {
            Ok(record) => {
                entries.insert(record.digest, record.file_id);
                frames += 1;
            }
            Err(e) => {
                warn!(offset, error = %e, "undecodable dedup index frame; skipping");
                damaged = true;
            }
        }
    }

    debug!(frames, entries = entries.len(), damaged, "dedup index replay complete");
    Replay {
        entries,
        frames,
        damaged,
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Atomically replace the log at `path` with one frame per entry and return
/// an append handle on the new file.
fn rewrite(
    path: &Path,
    entries: &HashMap<ContentDigest, FileId>,
    sync: bool,
) -> StoreResult<BufWriter<File>> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        for (digest, file_id) in entries {
            let frame = encode_frame(&FileRecord {
                digest: *digest,
                file_id: *file_id,
            })?;
            out.write_all(&frame)?;
        }
        out.flush()?;
    }
    if sync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(BufWriter::new(open_append(path)?))
}
