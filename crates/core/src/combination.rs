//! Combination keys and avatar artwork lookup.
//!
//! Artwork is pre-authored per combination of enumerated choices rather
//! than generated, so the engine never enumerates combinations ahead of
//! time: it derives a canonical key from whatever is currently selected
//! and looks the key up in the product's avatar mapping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::schema::Tab;
use crate::selection::SelectionValues;

/// Reserved key used when no enumerated variant has a non-empty
/// selection, and as the authored fallback for background art.
pub const DEFAULT_COMBINATION_KEY: &str = "default";

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Derive the canonical combination key for one tab.
///
/// Collects the selected option ids of every `options`/`color` variant,
/// discards empty values, sorts lexicographically and joins with `_`.
/// Sorting makes the key independent of both variant declaration order
/// and the order the buyer edited fields in. Returns
/// [`DEFAULT_COMBINATION_KEY`] when nothing qualifies.
pub fn combination_key(tab: &Tab, selections: &BTreeMap<String, String>) -> String {
    join_key(
        tab.variants
            .iter()
            .filter(|v| v.is_combination_source())
            .filter_map(|v| selections.get(&v.id))
            .map(String::as_str),
    )
}

/// [`combination_key`] over a set of tabs, for artwork keyed across
/// characters (e.g. a shared spread).
pub fn combination_key_for_tabs(tabs: &[&Tab], values: &SelectionValues) -> String {
    join_key(tabs.iter().flat_map(|tab| {
        tab.variants
            .iter()
            .filter(|v| v.is_combination_source())
            .filter_map(|v| {
                values
                    .get(&tab.id)
                    .and_then(|t| t.get(&v.id))
                    .map(String::as_str)
            })
    }))
}

fn join_key<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let mut ids: Vec<&str> = ids.filter(|id| !id.is_empty()).collect();
    if ids.is_empty() {
        return DEFAULT_COMBINATION_KEY.to_string();
    }
    ids.sort_unstable();
    ids.join("_")
}

// ---------------------------------------------------------------------------
// Avatar mapping
// ---------------------------------------------------------------------------

/// Combination key → pre-rendered image URL, authored per product.
///
/// Keys come in two forms: scoped (`tabId:sortedOptionIds`) and legacy
/// unscoped (`sortedOptionIds`). The unscoped form predates multi-tab
/// products and is kept only as a migration path; scoped entries always
/// win, and legacy hits are logged so remaining data can be migrated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarMapping {
    entries: HashMap<String, String>,
}

impl AvatarMapping {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the artwork for a tab's combination key.
    ///
    /// Scoped entry first, legacy unscoped entry second. `None` means
    /// "render nothing", never a broken-image placeholder.
    pub fn resolve(&self, tab_id: &str, key: &str) -> Option<&str> {
        let scoped = format!("{tab_id}:{key}");
        if let Some(url) = self.entries.get(&scoped) {
            return Some(url.as_str());
        }
        match self.entries.get(key) {
            Some(url) => {
                tracing::debug!(tab_id, key, "avatar resolved via legacy unscoped key");
                Some(url.as_str())
            }
            None => {
                tracing::debug!(tab_id, key, "no avatar mapping for combination");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
