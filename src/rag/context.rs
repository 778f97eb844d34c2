//! Context formatting for prompt injection.

use super::ContextEntry;

/// Separator between entries. Entry renderings never contain a blank line.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Join entry texts with a blank line, in order, without truncation.
pub fn format_context(entries: &[ContextEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// Split a formatted context back into entry texts.
pub fn split_context(context: &str) -> Vec<&str> {
    if context.is_empty() {
        return Vec::new();
    }
    context.split(ENTRY_SEPARATOR).collect()
}
