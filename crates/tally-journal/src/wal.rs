use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tally_ledger::Receipt;
use tracing::{debug, warn};

use crate::error::{JournalError, Result};

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: u64 = 8;

/// Upper bound on a single frame; larger length fields are treated as torn.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

struct WalWriter {
    /// Unbuffered: a failed append must not leave bytes queued for the next one.
    file: File,
    /// End of the last complete frame.
    offset: u64,
}

/// Outcome of reading the journal back.
#[derive(Debug)]
pub struct Recovery {
    pub receipts: Vec<Receipt>,
    /// Bytes cut from the end of the file because they did not form a
    /// complete, valid frame.
    pub discarded_bytes: u64,
}

/// Crash-recoverable write-ahead journal of receipts.
///
/// On-disk format, one frame per receipt:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Receipt)]
/// ```
///
/// Receipts are hash-linked, so a bad frame cannot be skipped: recovery
/// stops at the first torn or corrupt frame and truncates the file there.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    sync_mode: SyncMode,
}

impl WriteAheadLog {
    /// Open (or create) the journal file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self> {
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
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter { file, offset }),
            sync_mode,
        })
    }

    /// Append one receipt. Returns the byte offset of its frame.
    ///
    /// On error the journal is left ending at the previous frame, so a
    /// receipt whose append failed is never recovered.
    pub fn append(&self, receipt: &Receipt) -> Result<u64> {
        let payload =
            bincode::serialize(receipt).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                JournalError::Serialization(format!("receipt of {} bytes is too large", payload.len()))
            })?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.lock()?;
        let entry_offset = w.offset;

        // Bytes past the last frame are left over from an append whose
        // rollback also failed.
        let file_len = w.file.metadata()?.len();
        if file_len > entry_offset {
            warn!(offset = entry_offset, file_len, "cutting stale bytes before append");
            w.file.set_len(entry_offset)?;
        }

        if let Err(e) = write_frame(&mut w.file, &frame, self.sync_mode) {
            if let Err(rollback) = w.file.set_len(entry_offset) {
                warn!(offset = entry_offset, error = %rollback, "journal rollback failed");
            }
            return Err(e.into());
        }

        w.offset += frame.len() as u64;
        debug!(seq = receipt.seq, offset = entry_offset, len = payload.len(), "journal append");
        Ok(entry_offset)
    }

    /// Read every valid receipt, front to back, and cut off anything after
    /// the last valid frame.
    pub fn recover(&self) -> Result<Recovery> {
        let mut w = self.lock()?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        let file_len = reader.get_ref().metadata()?.len();
        let mut receipts = Vec::new();
        let mut offset = 0u64;

        while offset < file_len {
            match read_frame(&mut reader, offset, file_len)? {
                Some((receipt, frame_len)) => {
                    receipts.push(receipt);
                    offset += frame_len;
                }
                None => break,
            }
        }

        let discarded_bytes = file_len - offset;
        if discarded_bytes > 0 {
            warn!(
                offset,
                discarded_bytes,
                path = %self.path.display(),
                "truncating torn journal tail"
            );
            w.file.set_len(offset)?;
            w.file.sync_all()?;
        }
        w.offset = offset;

        debug!(recovered = receipts.len(), "journal recovery complete");
        Ok(Recovery {
            receipts,
            discarded_bytes,
        })
    }

    /// End of the last complete frame.
    pub fn offset(&self) -> Result<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    fn lock(&self) -> Result<MutexGuard<'_, WalWriter>> {
        self.writer.lock().map_err(|_| JournalError::Poisoned)
    }
}

fn write_frame(file: &mut File, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    file.write_all(frame)?;
    if sync_mode == SyncMode::EveryWrite {
        file.sync_data()?;
    }
    Ok(())
}

/// Read the frame at `offset`. `None` means the frame is torn or corrupt.
fn read_frame(
    reader: &mut BufReader<File>,
    offset: u64,
    file_len: u64,
) -> Result<Option<(Receipt, u64)>> {
    let mut header = [0u8; HEADER_SIZE as usize];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            warn!(offset, "truncated journal header");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let frame_len = HEADER_SIZE + u64::from(length);

    if length == 0 || length > MAX_FRAME_LEN || offset + frame_len > file_len {
        warn!(offset, length, file_len, "invalid journal frame length");
        return Ok(None);
    }

    let mut payload = vec![0u8; length as usize];
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            warn!(offset, "truncated journal frame");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        warn!(offset, expected = expected_crc, actual = actual_crc, "journal CRC mismatch");
        return Ok(None);
    }

    match bincode::deserialize::<Receipt>(&payload) {
        Ok(receipt) => Ok(Some((receipt, frame_len))),
        Err(e) => {
            warn!(offset, error = %e, "undecodable journal frame");
            Ok(None)
        }
    }
}
