//! forge::body
//!
//! The request body codec.
//!
//! Request descriptions carry two machine-maintained regions alongside
//! the user's prose:
//!
//! 1. A stack summary between `<!-- av pr stack begin -->` and
//!    `<!-- av pr stack end -->`: a bullet list of the stack with the
//!    current branch highlighted.
//! 2. A metadata region between `<!-- av pr metadata` and `-->`,
//!    holding a fenced JSON block `{parent, parentHead, parentPull,
//!    trunk}` that lets any client rebuild cross-stack links from the
//!    body alone.
//!
//! [`parse_body`] strips both regions; [`serialize_body`] re-emits them.
//! Serialization strips first, so applying it twice yields the same
//! string and user edits outside the regions survive every update.
//!
//! The delimiter comments are a fixed wire format; changing them would
//! need a migration path, so nothing here treats them as configurable.

use serde::{Deserialize, Serialize};

/// Start of the stack summary region.
pub const STACK_BEGIN: &str = "<!-- av pr stack begin -->";
/// End of the stack summary region.
pub const STACK_END: &str = "<!-- av pr stack end -->";
/// Start of the metadata region (an unterminated HTML comment opener).
pub const METADATA_BEGIN: &str = "<!-- av pr metadata";
/// End of the metadata region.
pub const METADATA_END: &str = "-->";

/// Machine-readable request metadata embedded in the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetadata {
    /// Parent branch name, absent for stack roots on trunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Parent head at last sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_head: Option<String>,
    /// Parent's request number, when the parent has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_pull: Option<u64>,
    /// The trunk this stack targets.
    pub trunk: String,
}

/// One line of the stack summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// Branch name.
    pub branch: String,
    /// Request number, when submitted.
    pub number: Option<u64>,
    /// Request permalink, when submitted.
    pub permalink: Option<String>,
    /// Whether this entry is the request's own branch.
    pub is_current: bool,
}

/// Render the stack summary region.
fn render_stack(entries: &[StackEntry]) -> String {
    let mut lines = vec![STACK_BEGIN.to_string()];
    for entry in entries {
        let marker = if entry.is_current { "➡" } else { "⏳" };
        let link = match (entry.number, &entry.permalink) {
            (Some(number), Some(permalink)) => format!(" ([#{number}]({permalink}))"),
            (Some(number), None) => format!(" (#{number})"),
            (None, _) => String::new(),
        };
        lines.push(format!("- {marker} **{}**{link}", entry.branch));
    }
    lines.push(STACK_END.to_string());
    lines.join("\n")
}

/// Render the metadata region.
fn render_metadata(meta: &BodyMetadata) -> String {
    // Struct serialization cannot fail.
    let json = serde_json::to_string(meta).expect("body metadata serialization");
    format!("{METADATA_BEGIN}\n```json\n{json}\n```\n{METADATA_END}")
}

/// Strip both machine regions from a body, returning the user's prose and
/// any parsed metadata.
///
/// Unparseable or absent metadata regions yield `None`; the user text is
/// preserved either way.
pub fn parse_body(body: &str) -> (String, Option<BodyMetadata>) {
    let (without_stack, _) = strip_region(body, STACK_BEGIN, STACK_END);
    let (text, meta_content) = strip_region(&without_stack, METADATA_BEGIN, METADATA_END);

    let meta = meta_content.and_then(|content| {
        let json = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(json).ok()
    });

    (text.trim().to_string(), meta)
}

/// Build a body from user prose, metadata, and an optional stack summary.
///
/// Any machine regions already present in `text` are stripped first, so
/// this function is idempotent and safe to apply to a previously
/// serialized body that the user has edited.
pub fn serialize_body(text: &str, meta: &BodyMetadata, stack: Option<&[StackEntry]>) -> String {
    let (user_text, _) = parse_body(text);

    let mut sections = Vec::new();
    if let Some(entries) = stack {
        sections.push(render_stack(entries));
    }
    if !user_text.is_empty() {
        sections.push(user_text);
    }
    sections.push(render_metadata(meta));
    sections.join("\n\n")
}

/// Remove the first `begin..end` region, returning the remaining text and
/// the region's inner content.
///
/// Unmatched or reversed markers leave the body untouched.
fn strip_region(body: &str, begin: &str, end: &str) -> (String, Option<String>) {
    let Some(start) = body.find(begin) else {
        return (body.to_string(), None);
    };
    let content_start = start + begin.len();
    let Some(end_rel) = body[content_start..].find(end) else {
        return (body.to_string(), None);
    };
    let content = body[content_start..content_start + end_rel].to_string();
    let after = &body[content_start + end_rel + end.len()..];

    let before = body[..start].trim_end();
    let after = after.trim_start();
    let remaining = match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (true, false) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before}\n\n{after}"),
    };
    (remaining, Some(content))
}
