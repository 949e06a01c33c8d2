//! Memory-mapped binary event log (spec §4.4/§6, C6).
//!
//! On-disk entry format (little-endian), mirroring the teacher crate's
//! `FileJournal` layout:
//!
//! ```text
//! [4 bytes: entry_length][8 bytes: sequence][8 bytes: timestamp_ns]
//! [N bytes: JSON payload][4 bytes: CRC32]
//! ```
//!
//! `entry_length` counts everything after itself (sequence ‖ timestamp ‖
//! payload ‖ crc = 20 + N). The CRC32 covers sequence ‖ timestamp ‖ payload,
//! not `entry_length` itself. Unlike the teacher's multi-segment rotation,
//! this journal is a single file that grows (remapped) as needed — the spec
//! does not call for segment rotation and one growing file keeps replay
//! (`read_from`) a single linear scan.

#![cfg(feature = "journal")]

use super::error::JournalError;
use super::types::SequencedEvent;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const ENTRY_HEADER_SIZE: usize = 4 + 8 + 8;
pub const ENTRY_CRC_SIZE: usize = 4;
pub const ENTRY_OVERHEAD: usize = ENTRY_HEADER_SIZE + ENTRY_CRC_SIZE;

const INITIAL_CAPACITY: usize = 4 * 1024 * 1024;
const GROWTH_FACTOR: usize = 2;

struct Inner {
    file: File,
    mmap: MmapMut,
    write_pos: usize,
    capacity: usize,
    path: PathBuf,
}

impl Inner {
    fn grow_to(&mut self, required: usize) -> Result<(), JournalError> {
        let mut new_capacity = self.capacity.max(INITIAL_CAPACITY);
        while new_capacity < required {
            new_capacity *= GROWTH_FACTOR;
        }
        self.mmap.flush().map_err(|e| JournalError::Io {
            message: e.to_string(),
            path: Some(self.path.clone()),
        })?;
        self.file
            .set_len(new_capacity as u64)
            .map_err(|e| JournalError::Io {
                message: e.to_string(),
                path: Some(self.path.clone()),
            })?;
        // SAFETY: this process exclusively owns the journal file for its
        // lifetime; nothing else truncates or remaps it concurrently.
        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&self.file)
                .map_err(|e| JournalError::Io {
                    message: e.to_string(),
                    path: Some(self.path.clone()),
                })?
        };
        self.mmap = mmap;
        self.capacity = new_capacity;
        Ok(())
    }
}

/// Append-only, memory-mapped, CRC-checked binary event log.
pub struct BinaryJournal {
    inner: Mutex<Inner>,
}

impl BinaryJournal {
    /// Open (creating if absent) the journal file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| JournalError::Io {
                message: e.to_string(),
                path: Some(path.clone()),
            })?;

        let existing_len = file
            .metadata()
            .map_err(|e| JournalError::Io {
                message: e.to_string(),
                path: Some(path.clone()),
            })?
            .len() as usize;

        let capacity = existing_len.max(INITIAL_CAPACITY);
        file.set_len(capacity as u64).map_err(|e| JournalError::Io {
            message: e.to_string(),
            path: Some(path.clone()),
        })?;

        // SAFETY: see `grow_to`.
        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|e| JournalError::Io {
                    message: e.to_string(),
                    path: Some(path.clone()),
                })?
        };

        let write_pos = scan_write_position(&mmap, existing_len.min(capacity));

        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                mmap,
                write_pos,
                capacity,
                path,
            }),
        })
    }

    /// Append one event. Not wait-free — this is the cold path; the hot
    /// path only ever touches [`super::ring::EventRing`].
    pub fn append(&self, event: &SequencedEvent) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(event).map_err(|e| JournalError::SerializationError {
            message: e.to_string(),
        })?;

        let entry_len = 8 + 8 + payload.len() + ENTRY_CRC_SIZE;
        let total_len = 4 + entry_len;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&event.sequence.to_le_bytes());
        hasher.update(&event.timestamp_ns.to_le_bytes());
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut inner = self.inner.lock().expect("journal mutex poisoned");
        if inner.write_pos + total_len > inner.capacity {
            inner.grow_to(inner.write_pos + total_len)?;
        }

        let start = inner.write_pos;
        let mut offset = start;
        inner.mmap[offset..offset + 4].copy_from_slice(&(entry_len as u32).to_le_bytes());
        offset += 4;
        inner.mmap[offset..offset + 8].copy_from_slice(&event.sequence.to_le_bytes());
        offset += 8;
        inner.mmap[offset..offset + 8].copy_from_slice(&event.timestamp_ns.to_le_bytes());
        offset += 8;
        inner.mmap[offset..offset + payload.len()].copy_from_slice(&payload);
        offset += payload.len();
        inner.mmap[offset..offset + 4].copy_from_slice(&crc.to_le_bytes());
        offset += 4;

        inner.write_pos = offset;
        inner
            .mmap
            .flush_range(start, offset - start)
            .map_err(|e| JournalError::Io {
                message: e.to_string(),
                path: Some(inner.path.clone()),
            })?;
        Ok(())
    }

    /// Force a full flush of any buffered pages to disk (batched fsync,
    /// spec §4.4: "writes the binary record to an append-only log (fsync
    /// batched)").
    pub fn sync(&self) -> Result<(), JournalError> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        inner.mmap.flush().map_err(|e| JournalError::Io {
            message: e.to_string(),
            path: Some(inner.path.clone()),
        })
    }

    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.read_from(0).ok()?.filter_map(Result::ok).last().map(|e| e.sequence)
    }

    /// Read every entry whose sequence is `>= from`, in order.
    pub fn read_from(&self, from: u64) -> Result<Vec<Result<SequencedEvent, JournalError>>, JournalError> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        let mut entries = Vec::new();
        let mut offset = 0usize;
        while offset + 4 <= inner.write_pos {
            let len_bytes: [u8; 4] = inner.mmap[offset..offset + 4]
                .try_into()
                .expect("slice is exactly 4 bytes");
            let entry_len = u32::from_le_bytes(len_bytes) as usize;
            if entry_len < 16 + ENTRY_CRC_SIZE || offset + 4 + entry_len > inner.write_pos {
                break;
            }
            let body_start = offset + 4;
            let sequence = u64::from_le_bytes(
                inner.mmap[body_start..body_start + 8]
                    .try_into()
                    .expect("8 bytes"),
            );
            let timestamp_ns = u64::from_le_bytes(
                inner.mmap[body_start + 8..body_start + 16]
                    .try_into()
                    .expect("8 bytes"),
            );
            let payload_len = entry_len - 16 - ENTRY_CRC_SIZE;
            let payload_start = body_start + 16;
            let payload = &inner.mmap[payload_start..payload_start + payload_len];
            let crc_start = payload_start + payload_len;
            let stored_crc = u32::from_le_bytes(
                inner.mmap[crc_start..crc_start + 4].try_into().expect("4 bytes"),
            );

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&sequence.to_le_bytes());
            hasher.update(&timestamp_ns.to_le_bytes());
            hasher.update(payload);
            let actual_crc = hasher.finalize();

            if actual_crc != stored_crc {
                entries.push(Err(JournalError::CorruptEntry {
                    sequence,
                    expected_crc: stored_crc,
                    actual_crc,
                }));
            } else if sequence >= from {
                match serde_json::from_slice(payload) {
                    Ok(event) => entries.push(Ok(SequencedEvent {
                        sequence,
                        timestamp_ns,
                        event,
                    })),
                    Err(e) => entries.push(Err(JournalError::DeserializationError {
                        sequence,
                        message: e.to_string(),
                    })),
                }
            }

            offset = crc_start + 4;
        }
        Ok(entries)
    }
}

/// Scan forward from the start of the mapped region to find the first byte
/// past the last structurally valid entry, so re-opening an existing
/// journal resumes appending in the right place rather than overwriting it.
fn scan_write_position(mmap: &MmapMut, len: usize) -> usize {
    let mut offset = 0usize;
    while offset + 4 <= len {
        let len_bytes: [u8; 4] = match mmap[offset..offset + 4].try_into() {
            Ok(b) => b,
            Err(_) => break,
        };
        let entry_len = u32::from_le_bytes(len_bytes) as usize;
        if entry_len == 0 || offset + 4 + entry_len > len {
            break;
        }
        offset += 4 + entry_len;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::types::JournalEvent;
    use crate::types::OwnerId;

    fn event(seq: u64, amount: i128) -> SequencedEvent {
        SequencedEvent {
            sequence: seq,
            timestamp_ns: seq * 1000,
            event: JournalEvent::Deposit {
                owner_id: OwnerId(1),
                amount_micros: amount,
                resulting_balance_micros: amount,
            },
        }
    }

    #[test]
    fn append_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.bin");
        let journal = BinaryJournal::open(&path).unwrap();
        journal.append(&event(1, 100)).unwrap();
        journal.append(&event(2, 200)).unwrap();

        let entries = journal.read_from(0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_ref().unwrap().sequence, 1);
        assert_eq!(entries[1].as_ref().unwrap().sequence, 2);
        assert_eq!(journal.last_sequence(), Some(2));
    }

    #[test]
    fn reopen_resumes_after_last_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.bin");
        {
            let journal = BinaryJournal::open(&path).unwrap();
            journal.append(&event(1, 100)).unwrap();
        }
        let journal = BinaryJournal::open(&path).unwrap();
        journal.append(&event(2, 200)).unwrap();
        let entries = journal.read_from(0).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn read_from_filters_by_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.bin");
        let journal = BinaryJournal::open(&path).unwrap();
        for i in 1..=5u64 {
            journal.append(&event(i, i as i128 * 10)).unwrap();
        }
        let entries = journal.read_from(3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].as_ref().unwrap().sequence, 3);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.bin");
        let journal = BinaryJournal::open(&path).unwrap();
        // A payload large enough to force several `grow_to` calls.
        for i in 0..200_000u64 {
            journal.append(&event(i + 1, i as i128)).unwrap();
        }
        assert_eq!(journal.last_sequence(), Some(200_000));
    }
}
