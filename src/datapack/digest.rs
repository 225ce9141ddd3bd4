//! Integrity digest for datapack snapshots
//!
//! Clients compare their local digest against the server's to detect
//! "nothing changed" without downloading the catalog. The digest is
//! BLAKE2b-512 over a canonical JSON rendering of the snapshot:
//!
//! - cards sorted by identity
//! - object keys sorted lexicographically
//! - no insignificant whitespace
//! - non-ASCII characters escaped as `\uXXXX`
//!
//! The hash itself is produced by a [`ContentHasher`]. The `b2sum` utility
//! and the in-process implementation produce the same value for the same
//! bytes; [`FallbackHasher`] tries the former and falls back silently.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use blake2::{Blake2b512, Digest};
use serde::Serialize;
use serde_json::{ser::Formatter, Map, Value};

use super::error::DatapackError;
use super::snapshot::{CardRecord, CatalogSnapshot};

/// Length of a hex-encoded BLAKE2b-512 digest
pub const DIGEST_HEX_LEN: usize = 128;

/// Capability to hash canonical datapack bytes
pub trait ContentHasher: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Lowercase hex BLAKE2b-512 of `bytes`
    fn hash(&self, bytes: &[u8]) -> Result<String, DatapackError>;
}

/// In-process BLAKE2b-512
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2bHasher;

impl ContentHasher for Blake2bHasher {
    fn name(&self) -> &str {
        "blake2b"
    }

    fn hash(&self, bytes: &[u8]) -> Result<String, DatapackError> {
        let mut hasher = Blake2b512::new();
        hasher.update(bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Pipes the bytes through an external `b2sum`-compatible command
#[derive(Debug, Clone)]
pub struct B2sumHasher {
    command: String,
}

impl B2sumHasher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for B2sumHasher {
    fn default() -> Self {
        Self::new("b2sum")
    }
}

impl ContentHasher for B2sumHasher {
    fn name(&self) -> &str {
        &self.command
    }

    fn hash(&self, bytes: &[u8]) -> Result<String, DatapackError> {
        let hasher_error = |msg: String| DatapackError::Hasher(format!("{}: {}", self.command, msg));

        let mut child = Command::new(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| hasher_error(e.to_string()))?;

        // b2sum only writes once stdin is closed, so the pipe cannot deadlock
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(bytes)
                .map_err(|e| hasher_error(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| hasher_error(e.to_string()))?;
        if !output.status.success() {
            return Err(hasher_error(format!("exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let digest = stdout.split_whitespace().next().unwrap_or_default();
        if !is_hex_digest(digest) {
            return Err(hasher_error(format!("unexpected output {:?}", digest)));
        }

        Ok(digest.to_string())
    }
}

/// Tries `primary`, using `fallback` when it fails
///
/// Both backends must implement the same algorithm; the fallback only
/// changes where the hash is computed, never its value.
pub struct FallbackHasher<P, F = Blake2bHasher> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackHasher<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ContentHasher, F: ContentHasher> ContentHasher for FallbackHasher<P, F> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn hash(&self, bytes: &[u8]) -> Result<String, DatapackError> {
        match self.primary.hash(bytes) {
            Ok(digest) => Ok(digest),
            Err(e) => {
                tracing::debug!(
                    primary = %self.primary.name(),
                    fallback = %self.fallback.name(),
                    error = %e,
                    "Primary hasher failed, falling back"
                );
                self.fallback.hash(bytes)
            }
        }
    }
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Canonical byte rendering of a snapshot
pub fn canonical_bytes(snapshot: &CatalogSnapshot) -> Result<Vec<u8>, DatapackError> {
    let mut cards: Vec<&CardRecord> = snapshot.cards().iter().collect();
    cards.sort_by(|a, b| a.id.cmp(&b.id));

    let mut root = Map::new();
    root.insert("cards".to_string(), serde_json::to_value(&cards)?);
    // Same shape as the served document, which omits an absent version
    if let Some(version) = snapshot.version() {
        root.insert("version".to_string(), Value::String(version.to_string()));
    }
    let document = sort_keys(Value::Object(root));

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    document.serialize(&mut serializer)?;
    Ok(out)
}

/// Digest of a snapshot using the given hasher
pub fn digest(snapshot: &CatalogSnapshot, hasher: &dyn ContentHasher) -> Result<String, DatapackError> {
    let bytes = canonical_bytes(snapshot)?;
    hasher.hash(&bytes)
}

/// Whether a client's digest matches the server's. Exact comparison; all
/// normalization happens before hashing.
pub fn compare(local: &str, remote: &str) -> bool {
    local == remote
}

/// Rebuild every object with its keys inserted in sorted order, so output
/// is sorted whether or not serde_json preserves insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Compact formatter that escapes every non-ASCII character as UTF-16
/// `\uXXXX` units.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
