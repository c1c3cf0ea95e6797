//! core::types
//!
//! Strong types for the domain: branch names, object ids, ref names.
//!
//! These types validate at construction time, so an invalid branch name or
//! a malformed hash cannot flow past the boundary where it entered the
//! program. Serde implementations go through the same validation
//! (`#[serde(try_from = "String")]`), which means metadata blobs and state
//! files are checked on read as well.
//!
//! # Examples
//!
//! ```
//! use avstack::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("feat/parser").unwrap();
//! let meta = RefName::for_metadata(&branch);
//! assert_eq!(meta.as_str(), "refs/av/branch-metadata/feat/parser");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters Git forbids anywhere in a refname component.
const INVALID_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Shared refname-rule check used by both [`BranchName`] and [`RefName`].
///
/// Mirrors `git check-ref-format`: no empty names, no trailing `/` or
/// `.lock`, no `..` / `@{` / `//`, no control characters, and the same
/// rules applied per `/`-separated component.
fn check_ref_rules(name: &str, what: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if name.ends_with('/') {
        return Err(format!("{what} cannot end with '/'"));
    }
    if name.ends_with(".lock") {
        return Err(format!("{what} cannot end with '.lock'"));
    }
    for pat in ["..", "@{", "//"] {
        if name.contains(pat) {
            return Err(format!("{what} cannot contain '{pat}'"));
        }
    }
    for c in INVALID_REF_CHARS {
        if name.contains(c) {
            return Err(format!("{what} cannot contain '{c}'"));
        }
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(format!("{what} cannot contain control characters"));
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Err(format!("{what} component cannot start with '.'"));
        }
        if component.ends_with(".lock") {
            return Err(format!("{what} component cannot end with '.lock'"));
        }
    }
    Ok(())
}

/// A validated local branch name (the short form, without `refs/heads/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidBranchName`] if the name violates Git's
    /// refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_ref_rules(&name, "branch name").map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// The branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object id (SHA-1 or SHA-256), normalized to lowercase hex.
///
/// The all-zero id is valid and carries meaning in operation records: it
/// stands for "resolve the remote-tracking trunk head at execution time"
/// rather than a concrete commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a validated object id.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidOid`] for anything that is not 40 or 64
    /// hex characters.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("object id must be hexadecimal".into()));
        }
        Ok(Self(oid))
    }

    /// The null object id (40 zeros).
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    /// Whether this is the null id.
    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// Abbreviated form: the first `len` characters (clamped).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// The object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, fully-qualified Git reference name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

/// Namespace under which branch metadata blobs are stored.
pub const METADATA_REF_PREFIX: &str = "refs/av/branch-metadata/";

impl RefName {
    /// Create a validated ref name.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidRefName`] if the name violates Git's
    /// refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('/') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot start with '/'".into(),
            ));
        }
        check_ref_rules(&name, "ref name").map_err(TypeError::InvalidRefName)?;
        Ok(Self(name))
    }

    /// Ref for a local branch: `refs/heads/<branch>`.
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// Remote-tracking ref: `refs/remotes/<remote>/<branch>`.
    pub fn for_remote_branch(remote: &str, branch: &BranchName) -> Self {
        Self(format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// Metadata ref for a branch: `refs/av/branch-metadata/<branch>`.
    pub fn for_metadata(branch: &BranchName) -> Self {
        Self(format!("{}{}", METADATA_REF_PREFIX, branch.as_str()))
    }

    /// Strip a prefix, returning the remainder if it matches.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    /// Whether this ref lives in the branch-metadata namespace.
    pub fn is_metadata_ref(&self) -> bool {
        self.0.starts_with(METADATA_REF_PREFIX)
    }

    /// Whether this is a local branch ref.
    pub fn is_branch_ref(&self) -> bool {
        self.0.starts_with("refs/heads/")
    }

    /// The ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
