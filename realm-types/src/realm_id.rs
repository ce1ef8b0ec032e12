//! Structural element identity.
//!
//! A [`RealmId`] ties a UI element to its structural location in source:
//! file, enclosing component, path from the file root, and start position.
//! The digest deliberately excludes everything else — unrelated edits
//! elsewhere in the file, attribute contents, and the version counter all
//! leave the hash unchanged, so the same element keeps the same identity
//! across re-parses.

use crate::Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Width of the identity digest in hex characters.
///
/// 16 hex chars = 64 bits. Wide enough that collisions at realistic
/// element counts are negligible; registration upserts on hash, so a
/// collision degrades to an overwrite rather than corruption.
pub const REALM_HASH_LEN: usize = 16;

/// A position in a source file. Lines and columns are 1-based, the byte
/// offset is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub byte_offset: usize,
}

impl SourceLocation {
    #[must_use]
    pub const fn new(line: u32, column: u32, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

/// An inclusive start/end pair of source positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    #[must_use]
    pub const fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// Whether the span contains the given point, both ends inclusive.
    #[must_use]
    pub fn contains(&self, line: u32, column: u32) -> bool {
        if line < self.start.line || line > self.end.line {
            return false;
        }
        if line == self.start.line && column < self.start.column {
            return false;
        }
        if line == self.end.line && column > self.end.column {
            return false;
        }
        true
    }
}

/// Stable identifier tying a UI element to its structural source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmId {
    /// Fixed-width hex digest of the structural location.
    pub hash: String,
    /// Workspace-relative path of the source file.
    pub source_file: String,
    /// Structural path from the file root to the element,
    /// e.g. `"App/div[0]/button[1]"`.
    pub ast_path: String,
    /// Name of the nearest enclosing named component.
    pub component_name: String,
    /// Start/end of the element in source.
    pub span: SourceSpan,
    /// Mutation counter. Bumped on every committed change; never part of
    /// the digest.
    pub version: u32,
}

impl RealmId {
    /// Derives the id for an element at a structural location.
    ///
    /// Pure: identical inputs always produce the identical hash.
    #[must_use]
    pub fn generate(
        source_file: impl Into<String>,
        component_name: impl Into<String>,
        ast_path: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        let source_file = source_file.into();
        let component_name = component_name.into();
        let ast_path = ast_path.into();
        let hash = Self::digest(
            &source_file,
            &component_name,
            &ast_path,
            span.start.line,
            span.start.column,
        );
        Self {
            hash,
            source_file,
            ast_path,
            component_name,
            span,
            version: 1,
        }
    }

    /// Computes the truncated SHA-256 digest over the colon-joined
    /// structural tuple.
    fn digest(file: &str, component: &str, ast_path: &str, line: u32, column: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{file}:{component}:{ast_path}:{line}:{column}").as_bytes());
        let full = hex::encode(hasher.finalize());
        full[..REALM_HASH_LEN].to_string()
    }

    /// Returns a copy with `version + 1`. The hash is untouched: bumping
    /// the version never changes identity.
    #[must_use]
    pub fn bump_version(&self) -> Self {
        Self {
            version: self.version + 1,
            ..self.clone()
        }
    }

    /// Serializes to the structured-text wire form.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an externally supplied id, validating every field before
    /// trusting it.
    pub fn parse_untrusted(json: &str) -> crate::Result<Self> {
        let id: Self = serde_json::from_str(json)?;
        id.validate()?;
        Ok(id)
    }

    /// Field-level validation for ids that crossed a process boundary.
    pub fn validate(&self) -> crate::Result<()> {
        if self.hash.len() != REALM_HASH_LEN {
            return Err(Error::InvalidRealmId(format!(
                "hash must be {REALM_HASH_LEN} hex chars, got {}",
                self.hash.len()
            )));
        }
        if !self.hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidRealmId("hash is not hex".into()));
        }
        if self.source_file.is_empty() {
            return Err(Error::InvalidRealmId("empty source_file".into()));
        }
        if self.ast_path.is_empty() {
            return Err(Error::InvalidRealmId("empty ast_path".into()));
        }
        if self.version == 0 {
            return Err(Error::InvalidRealmId("version must be >= 1".into()));
        }
        Ok(())
    }
}

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.hash, self.version)
    }
}
