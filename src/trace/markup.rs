//! Tool-call markup extraction.
//!
//! Assistant messages embed tool invocations as tagged markup: a block opened
//! by `<use_mcp_tool>` containing independently tagged `<server_name>`,
//! `<tool_name>` and `<arguments>` regions. The markup is not guaranteed to be
//! well-formed XML; unbalanced or missing closing tags are expected inputs.
//! Everything here degrades to "no match" rather than erroring.

use super::ToolInvocation;

/// Tag that opens an invocation block inside assistant text.
pub const INVOCATION_TAG: &str = "use_mcp_tool";

const SERVER_NAME_TAG: &str = "server_name";
const TOOL_NAME_TAG: &str = "tool_name";
const ARGUMENTS_TAG: &str = "arguments";

/// Extract the first `<name>…</name>` region from `text`.
///
/// Matching is non-greedy (shortest region after the first open tag) and
/// tolerates embedded newlines. A missing open or close tag yields `None`.
pub fn tag_region<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(&text[start..end])
}

/// Extract at most one structured invocation from `text`.
///
/// The `tool_name` region is mandatory; without it no invocation is produced
/// even if the other regions are present. `server_name` and `arguments`
/// default to the empty string. The tool name is trimmed of surrounding
/// whitespace.
pub fn extract_invocation(text: &str) -> Option<ToolInvocation> {
    let tool_name = tag_region(text, TOOL_NAME_TAG)?.trim();
    if tool_name.is_empty() {
        return None;
    }
    let server_name = tag_region(text, SERVER_NAME_TAG)
        .map(str::trim)
        .unwrap_or_default();
    let raw_arguments = tag_region(text, ARGUMENTS_TAG)
        .map(str::trim)
        .unwrap_or_default();
    Some(ToolInvocation {
        server_name: server_name.to_string(),
        tool_name: tool_name.to_string(),
        raw_arguments: raw_arguments.to_string(),
    })
}

/// Split a message into its reasoning text and the first invocation.
///
/// The reasoning portion is everything before the first `<use_mcp_tool>`
/// open tag; if no invocation is present the entire text is reasoning.
/// Only the first invocation is split out.
pub fn split_reasoning(text: &str) -> (&str, Option<ToolInvocation>) {
    match extract_invocation(text) {
        Some(invocation) => {
            let block_open = format!("<{INVOCATION_TAG}>");
            let name_open = format!("<{TOOL_NAME_TAG}>");
            // A block without the wrapper tag still has a tool_name region.
            let cut = text
                .find(&block_open)
                .or_else(|| text.find(&name_open))
                .unwrap_or(text.len());
            (text[..cut].trim_end(), Some(invocation))
        }
        None => (text, None),
    }
}

/// Lazily scan `text` for every `<tool_name>…</tool_name>` occurrence,
/// yielding the trimmed names. Used for frequency counting; unlike
/// [`extract_invocation`] this finds all occurrences in a message.
pub fn tool_name_occurrences(text: &str) -> impl Iterator<Item = &str> {
    let open = format!("<{TOOL_NAME_TAG}>");
    let close = format!("</{TOOL_NAME_TAG}>");
    let mut rest = text;
    std::iter::from_fn(move || loop {
        let start = rest.find(&open)? + open.len();
        let Some(len) = rest[start..].find(&close) else {
            // Unterminated trailing tag: nothing more to find.
            rest = "";
            return None;
        };
        let name = rest[start..start + len].trim();
        rest = &rest[start + len + close.len()..];
        if !name.is_empty() {
            return Some(name);
        }
    })
}
