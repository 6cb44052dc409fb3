// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! One line per committed revision or saved state blob: an 8-digit hex CRC32
//! of the JSON body, a space, then the JSON body itself. Opening a log replays the valid prefix and cuts off
//! a torn or corrupt tail so later appends are never stranded behind it.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;
use wr_core::{TransactionData, TransactionRevision};

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAL unusable: a failed append could not be rolled back")]
    Poisoned,
}

/// A durable state change
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// A revision appended to its chain
    Commit { revision: TransactionData },
    /// Script state captured at a revision
    SaveState {
        revision: TransactionRevision,
        state: Vec<u8>,
    },
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
    sync_writes: bool,
    poisoned: bool,
}

impl Wal {
    /// Open or create a WAL, returning the operations already recorded
    pub fn open(path: &Path, sync_writes: bool) -> Result<(Self, Vec<Operation>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        let (operations, valid_len) = Self::parse(&contents);

        if valid_len < contents.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                valid_len,
                discarded = contents.len() as u64 - valid_len,
                "WAL tail is torn or corrupt; truncating at last valid entry"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let wal = Self {
            file,
            sequence: operations.len() as u64,
            sync_writes,
            poisoned: false,
        };
        Ok((wal, operations))
    }

    /// Parse complete, checksummed lines; stops at the first bad one
    fn parse(contents: &[u8]) -> (Vec<Operation>, u64) {
        let mut operations = Vec::new();
        let mut valid_len = 0usize;

        for line in contents.split_inclusive(|b| *b == b'\n') {
            // A line without its terminator is a torn write
            let Some(body) = line.strip_suffix(b"\n") else {
                break;
            };
            if body.is_empty() {
                valid_len += line.len();
                continue;
            }
            let Some(entry) = WalEntry::decode(body) else {
                tracing::warn!(offset = valid_len, "unreadable or corrupt WAL entry");
                break;
            };
            operations.push(entry.op);
            valid_len += line.len();
        }

        (operations, valid_len as u64)
    }

    /// Append an operation to the log
    ///
    /// A failed append leaves the file as it was, so an error here always
    /// means the operation is not durable.
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        self.append_with(op, |file, line| file.write_all(line))
    }

    fn append_with(
        &mut self,
        op: &Operation,
        write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> Result<u64, WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let line = entry.encode()?;
        let start = self.file.metadata()?.len();

        let written = write(&mut self.file, &line).and_then(|()| {
            if self.sync_writes {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            self.rollback(start);
            return Err(e.into());
        }

        self.sequence += 1;
        Ok(self.sequence)
    }

    /// Cut the file back to `len` after a failed append
    fn rollback(&mut self, len: u64) {
        let restored = self.file.set_len(len).and_then(|()| {
            if self.sync_writes {
                self.file.sync_all()
            } else {
                Ok(())
            }
        });
        if let Err(e) = restored {
            tracing::error!(len, error = %e, "WAL rollback failed; refusing further appends");
            self.poisoned = true;
        }
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

impl WalEntry {
    /// `<crc32 hex> <json>\n`
    fn encode(&self) -> Result<Vec<u8>, WalError> {
        let body = serde_json::to_vec(self)?;
        let mut line = format!("{:08x} ", crc32fast::hash(&body)).into_bytes();
        line.extend_from_slice(&body);
        line.push(b'\n');
        Ok(line)
    }

    /// Decode one line body (terminator already stripped)
    fn decode(line: &[u8]) -> Option<Self> {
        if line.len() < 9 {
            return None;
        }
        let (checksum, body) = line.split_at(9);
        let checksum = std::str::from_utf8(checksum.strip_suffix(b" ")?).ok()?;
        let checksum = u32::from_str_radix(checksum, 16).ok()?;
        if crc32fast::hash(body) != checksum {
            return None;
        }
        serde_json::from_slice(body).ok()
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
