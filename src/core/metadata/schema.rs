//! core::metadata::schema
//!
//! The branch record and its JSON wire format.
//!
//! Each tracked branch has one record, stored as a blob under
//! `refs/av/branch-metadata/<branch>`:
//!
//! ```json
//! { "parent": { "name": "feat-1", "head": "abc..." },
//!   "children": ["feat-3"],
//!   "pullRequest": { "id": "PR_x", "number": 17, "permalink": "...", "state": "OPEN" },
//!   "mergeCommit": "def..." }
//! ```
//!
//! # Compatibility
//!
//! - `parent` may be a bare string (older writers); it is read as
//!   `{name: s}` with no recorded branching point.
//! - An empty or absent parent marks a legacy stack root whose trunk is
//!   the repository default branch.
//! - Unknown fields are tolerated on read and dropped on rewrite.
//! - `children` is written for older readers but is advisory here:
//!   the stack model always derives children by scanning parents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from record encoding and decoding.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to parse branch record: {0}")]
    Parse(String),

    #[error("invalid branch record: {0}")]
    InvalidValue(String),

    #[error("invalid branch record field: {0}")]
    Type(#[from] TypeError),
}

/// The parent of a tracked branch.
///
/// A branch either sits directly on a trunk or is stacked on another
/// tracked branch. Stacked parents record the parent head observed at the
/// last sync (the branching point); it is the `<upstream>` of the child's
/// next `rebase --onto`. A stacked parent with no recorded branching point
/// comes from a legacy record or an interrupted run and is repaired by
/// recomputing the merge base on the next sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentState {
    /// The branch targets a long-lived trunk. Trunk heads are never
    /// recorded; the remote-tracking ref is consulted at use time.
    Trunk { name: BranchName },

    /// The branch targets another tracked branch.
    Stacked {
        name: BranchName,
        branching_point: Option<Oid>,
    },
}

impl ParentState {
    /// The parent branch name, trunk or not.
    pub fn name(&self) -> &BranchName {
        match self {
            ParentState::Trunk { name } => name,
            ParentState::Stacked { name, .. } => name,
        }
    }

    /// Whether the parent is a trunk.
    pub fn is_trunk(&self) -> bool {
        matches!(self, ParentState::Trunk { .. })
    }

    /// The recorded branching point, if any.
    pub fn branching_point(&self) -> Option<&Oid> {
        match self {
            ParentState::Trunk { .. } => None,
            ParentState::Stacked {
                branching_point, ..
            } => branching_point.as_ref(),
        }
    }
}

/// State of a forge request, as recorded in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Open => write!(f, "open"),
            RequestState::Closed => write!(f, "closed"),
            RequestState::Merged => write!(f, "merged"),
        }
    }
}

/// The forge request associated with a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Forge-assigned opaque id.
    pub id: String,
    /// Request number.
    pub number: u64,
    /// Web permalink.
    pub permalink: String,
    /// Last observed state.
    pub state: RequestState,
}

impl RequestRecord {
    /// Whether the request is still open on the forge.
    pub fn is_open(&self) -> bool {
        self.state == RequestState::Open
    }
}

/// One tracked branch's metadata.
///
/// The branch's own name is not part of the record; it is the key (the
/// metadata ref name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    /// Parent pointer.
    pub parent: ParentState,
    /// Advisory child list for older readers; derived fresh by the model.
    pub children: Vec<BranchName>,
    /// Associated forge request, if one was ever observed.
    pub request: Option<RequestRecord>,
    /// The trunk commit that incorporated this branch, once merged.
    pub merge_commit: Option<Oid>,
}

impl BranchRecord {
    /// A fresh record stacked on `parent` at `branching_point`.
    pub fn stacked(parent: BranchName, branching_point: Oid) -> Self {
        Self {
            parent: ParentState::Stacked {
                name: parent,
                branching_point: Some(branching_point),
            },
            children: Vec::new(),
            request: None,
            merge_commit: None,
        }
    }

    /// A fresh record sitting directly on a trunk.
    pub fn on_trunk(trunk: BranchName) -> Self {
        Self {
            parent: ParentState::Trunk { name: trunk },
            children: Vec::new(),
            request: None,
            merge_commit: None,
        }
    }

    /// Whether the branch has been merged into a trunk.
    pub fn is_merged(&self) -> bool {
        self.merge_commit.is_some()
    }
}

// Wire representation. Field order here is the blob encoding order.

#[derive(Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<WireParent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<String>,
    #[serde(
        rename = "pullRequest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pull_request: Option<RequestRecord>,
    #[serde(rename = "mergeCommit", default, skip_serializing_if = "Option::is_none")]
    merge_commit: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireParent {
    Full(WireParentFull),
    // Bare string written by older clients.
    Name(String),
}

#[derive(Serialize, Deserialize)]
struct WireParentFull {
    name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    trunk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    head: Option<String>,
}

/// Decode a branch record blob.
///
/// `default_trunk` resolves the legacy empty-parent form: such records are
/// stack roots on the repository default branch.
///
/// # Errors
///
/// - [`MetadataError::Parse`] for malformed JSON
/// - [`MetadataError::InvalidValue`] for a trunk parent carrying a head
/// - [`MetadataError::Type`] for invalid names or hashes
pub fn parse_record(json: &str, default_trunk: &BranchName) -> Result<BranchRecord, MetadataError> {
    let wire: WireRecord =
        serde_json::from_str(json).map_err(|e| MetadataError::Parse(e.to_string()))?;

    let parent = match wire.parent {
        None => ParentState::Trunk {
            name: default_trunk.clone(),
        },
        Some(WireParent::Name(name)) if name.is_empty() => ParentState::Trunk {
            name: default_trunk.clone(),
        },
        Some(WireParent::Name(name)) => ParentState::Stacked {
            name: BranchName::new(name)?,
            branching_point: None,
        },
        Some(WireParent::Full(full)) if full.name.is_empty() => ParentState::Trunk {
            name: default_trunk.clone(),
        },
        Some(WireParent::Full(full)) => {
            let name = BranchName::new(full.name)?;
            let head = full.head.map(Oid::new).transpose()?;
            if full.trunk {
                if head.is_some() {
                    return Err(MetadataError::InvalidValue(format!(
                        "trunk parent '{name}' cannot carry a branching point"
                    )));
                }
                ParentState::Trunk { name }
            } else {
                ParentState::Stacked {
                    name,
                    branching_point: head,
                }
            }
        }
    };

    let children = wire
        .children
        .into_iter()
        .map(BranchName::new)
        .collect::<Result<Vec<_>, _>>()?;

    let merge_commit = wire.merge_commit.map(Oid::new).transpose()?;

    Ok(BranchRecord {
        parent,
        children,
        request: wire.pull_request,
        merge_commit,
    })
}

/// Encode a branch record as its canonical blob content.
///
/// The encoding is deterministic: fixed field order, no whitespace
/// variation, optional fields omitted when absent. Equal records encode
/// to byte-equal blobs, so unchanged metadata produces unchanged ref
/// targets.
pub fn encode_record(record: &BranchRecord) -> String {
    let parent = match &record.parent {
        ParentState::Trunk { name } => WireParentFull {
            name: name.to_string(),
            trunk: true,
            head: None,
        },
        ParentState::Stacked {
            name,
            branching_point,
        } => WireParentFull {
            name: name.to_string(),
            trunk: false,
            head: branching_point.as_ref().map(|o| o.to_string()),
        },
    };

    let wire = WireRecord {
        parent: Some(WireParent::Full(parent)),
        children: record.children.iter().map(|c| c.to_string()).collect(),
        pull_request: record.request.clone(),
        merge_commit: record.merge_commit.as_ref().map(|o| o.to_string()),
    };

    // Struct serialization cannot fail.
    serde_json::to_string(&wire).expect("branch record serialization")
}
