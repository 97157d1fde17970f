//! Placeholder substitution for admin-authored page templates.
//!
//! Templates reference buyer data with `{...}` tokens: a bare well-known
//! name (`{childName}`) or a dotted `{tabId.variantId}` path into the
//! configuration's selection map. Templates are authored in the back
//! office and may reference variants a product does not (yet) declare, so
//! unknown placeholders are deliberately left verbatim instead of raising;
//! the unresolved names are reported back for admin tooling to warn on.

use std::sync::LazyLock;

use regex::Regex;

use crate::configuration::ResolvedConfiguration;

/// Regex pattern matching `{placeholder}` tokens (bare or dotted names).
pub const PLACEHOLDER_PATTERN: &str = r"\{([a-zA-Z_][a-zA-Z0-9_.]*)\}";

/// Compiled placeholder regex. Compiled once, reused forever.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Bare placeholder names resolvable against configuration top-level
/// fields (everything else must use the dotted form).
pub const WELL_KNOWN_PLACEHOLDERS: &[&str] = &["childName", "dedication", "author"];

/// Result of substituting one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutedText {
    pub text: String,
    /// Placeholder names left verbatim in `text`, in order of appearance.
    pub unresolved: Vec<String>,
}

/// Substitute every placeholder in `template` from `config`.
///
/// Dotted names resolve against `characters[tab][variant]`; an empty
/// selected value substitutes as the empty string. Unresolvable names
/// stay verbatim. Single-pass and side-effect-free, so re-running on the
/// output is a no-op as long as substituted values introduce no new
/// placeholders.
pub fn substitute(template: &str, config: &ResolvedConfiguration) -> SubstitutedText {
    let mut unresolved = Vec::new();
    let text = PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match resolve_placeholder(name, config) {
                Some(value) => value,
                None => {
                    unresolved.push(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .to_string();

    if !unresolved.is_empty() {
        tracing::debug!(?unresolved, "template placeholders left unresolved");
    }
    SubstitutedText { text, unresolved }
}

/// [`substitute`], discarding the unresolved-name report.
pub fn substitute_text(template: &str, config: &ResolvedConfiguration) -> String {
    substitute(template, config).text
}

fn resolve_placeholder(name: &str, config: &ResolvedConfiguration) -> Option<String> {
    match name.split_once('.') {
        Some((tab_id, variant_id)) => {
            // A second dot makes the variant id unresolvable, which is
            // the verbatim fail-open path.
            config.field(tab_id, variant_id).map(str::to_string)
        }
        None => match name {
            "childName" => config.name.clone(),
            "dedication" => config.dedication.clone(),
            "author" => config.author.clone(),
            _ => None,
        },
    }
}

/// Extract all placeholder names from a template, deduplicated and
/// sorted. Used by admin tooling to preview what a template depends on.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut placeholders: Vec<String> = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect();
    placeholders.sort();
    placeholders.dedup();
    placeholders
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
