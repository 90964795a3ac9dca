//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Checksum`] type used as the content key for
//! duplicate grouping, and the [`Hasher`] that produces it by reading a
//! file's full content. Small files are streamed through a fixed buffer,
//! large files are hashed from a memory map using BLAKE3's rayon backend.
//!
//! [`Hasher::contents_equal`] performs the optional byte-for-byte
//! confirmation used when content verification is enabled.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::HashError;

/// Files at or above this size are hashed through a memory map.
pub const MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Read buffer used for streaming hashes and content comparison.
const BUFFER_SIZE: usize = 64 * 1024;

/// Fixed-width content digest (BLAKE3, 32 bytes).
///
/// Treated as an opaque equality/ordering key. Displayed and serialized as
/// lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hexadecimal representation (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(&self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Checksum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_to_hash(s).map(Self).ok_or_else(|| format!("invalid checksum: {s}"))
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}

impl From<blake3::Hash> for Checksum {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Convert raw digest bytes to a lowercase hex string.
#[must_use]
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    use fmt::Write;

    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Parse a 64-character hex string into digest bytes.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// Content hasher.
///
/// Stateless apart from its configuration, so a single instance can be
/// shared by reference across the engine.
#[derive(Debug, Clone)]
pub struct Hasher {
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default memory-map threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mmap_threshold: MMAP_THRESHOLD,
        }
    }

    /// Override the size at which files are hashed through a memory map.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Compute the checksum of a file's full content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Checksum, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut hasher = blake3::Hasher::new();
        if len >= self.mmap_threshold {
            log::trace!("Hashing {} via mmap ({} bytes)", path.display(), len);
            hasher
                .update_mmap_rayon(path)
                .map_err(|e| HashError::from_io(path, e))?;
        } else {
            let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
            let mut buffer = vec![0u8; BUFFER_SIZE];
            loop {
                let read = read_retrying(&mut reader, &mut buffer)
                    .map_err(|e| HashError::from_io(path, e))?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
        }

        Ok(hasher.finalize().into())
    }

    /// Compare two files byte for byte.
    ///
    /// Returns `Ok(false)` as soon as a difference (including length) is
    /// found.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if either file cannot be read.
    pub fn contents_equal(&self, a: &Path, b: &Path) -> Result<bool, HashError> {
        let file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
        let file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

        let len_a = file_a.metadata().map_err(|e| HashError::from_io(a, e))?.len();
        let len_b = file_b.metadata().map_err(|e| HashError::from_io(b, e))?.len();
        if len_a != len_b {
            return Ok(false);
        }

        let mut reader_a = BufReader::with_capacity(BUFFER_SIZE, file_a);
        let mut reader_b = BufReader::with_capacity(BUFFER_SIZE, file_b);
        let mut buf_a = vec![0u8; BUFFER_SIZE];
        let mut buf_b = vec![0u8; BUFFER_SIZE];

        loop {
            let read_a = fill(&mut reader_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
            let read_b = fill(&mut reader_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;
            if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
                return Ok(false);
            }
            if read_a == 0 {
                return Ok(true);
            }
        }
    }
}

fn read_retrying(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Read until `buf` is full or EOF, so both sides of a comparison advance
/// in identical chunks.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = read_retrying(reader, &mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
