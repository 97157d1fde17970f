//! The persisted snapshot of a buyer's selections.
//!
//! A [`ResolvedConfiguration`] is what crosses the persistence boundary
//! when the buyer adds the book to the cart (or updates an existing cart
//! line). It carries the full selection map plus denormalized convenience
//! fields the storefront reads without walking the schema: the child's
//! name at top level and an appearance subset for the avatar thumbnail.
//! Dedication and author metadata are attached by the checkout flow, not
//! by this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{CustomizationSchema, TabKind};
use crate::selection::{SelectionStore, SelectionValues};
use crate::types::Timestamp;

/// The variant id surfaced as the configuration's top-level name.
pub const NAME_VARIANT_ID: &str = "name";

/// Variant ids copied into the denormalized `appearance` subset.
pub const APPEARANCE_VARIANT_IDS: &[&str] =
    &["hairColor", "hairStyle", "skinTone", "eyeColor", "glasses"];

/// A finalized, serializable configuration for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfiguration {
    pub id: Uuid,
    pub product_id: String,
    /// The child's name, denormalized from the first character tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The complete selection map (tab id → variant id → value). Seeds
    /// the store again when the buyer edits this cart line.
    pub characters: SelectionValues,
    /// Appearance choices of the first character tab that declares them,
    /// keyed by variant id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub appearance: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: Timestamp,
}

impl ResolvedConfiguration {
    /// Freeze a validated store into a configuration snapshot.
    pub fn from_store(
        product_id: impl Into<String>,
        schema: &CustomizationSchema,
        store: &SelectionStore,
    ) -> Self {
        let characters = store.values().clone();

        let mut name = None;
        let mut appearance = BTreeMap::new();
        for tab in schema.tabs.iter().filter(|t| t.kind == TabKind::Character) {
            let Some(values) = characters.get(&tab.id) else {
                continue;
            };
            if name.is_none() {
                name = values
                    .get(NAME_VARIANT_ID)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            for variant_id in APPEARANCE_VARIANT_IDS {
                if appearance.contains_key(*variant_id) {
                    continue;
                }
                if let Some(value) = values.get(*variant_id).filter(|v| !v.is_empty()) {
                    appearance.insert((*variant_id).to_string(), value.clone());
                }
            }
        }

        Self {
            id: Uuid::now_v7(),
            product_id: product_id.into(),
            name,
            characters,
            appearance,
            dedication: None,
            author: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// The selections of one tab.
    pub fn character(&self, tab_id: &str) -> Option<&BTreeMap<String, String>> {
        self.characters.get(tab_id)
    }

    /// One selected value, by tab and variant id.
    pub fn field(&self, tab_id: &str, variant_id: &str) -> Option<&str> {
        self.characters
            .get(tab_id)
            .and_then(|t| t.get(variant_id))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::schema::{OptionChoice, Tab, Variant, VariantKind};

    fn schema() -> CustomizationSchema {
        CustomizationSchema {
            tabs: vec![
                Tab {
                    id: "child".to_string(),
                    label: "Child".to_string(),
                    kind: TabKind::Character,
                    variants: vec![
                        Variant {
                            id: "name".to_string(),
                            label: "First name".to_string(),
                            show_label: true,
                            kind: VariantKind::Text {
                                min_length: Some(2),
                                max_length: None,
                            },
                        },
                        Variant {
                            id: "hairColor".to_string(),
                            label: "Hair color".to_string(),
                            show_label: false,
                            kind: VariantKind::Options {
                                options: vec![OptionChoice {
                                    id: "brown".to_string(),
                                    label: "Brown".to_string(),
                                    resource: None,
                                    thumbnail: None,
                                }],
                            },
                        },
                    ],
                },
                Tab {
                    id: "cover".to_string(),
                    label: "Cover".to_string(),
                    kind: TabKind::Other,
                    variants: vec![Variant {
                        id: "name".to_string(),
                        label: "Cover title".to_string(),
                        show_label: true,
                        kind: VariantKind::Text {
                            min_length: None,
                            max_length: None,
                        },
                    }],
                },
            ],
        }
    }

    fn store(schema: &CustomizationSchema) -> SelectionStore {
        let mut rng = StdRng::seed_from_u64(1);
        let mut store = SelectionStore::initialize(schema, None, &mut rng);
        store.set("child", "name", " Léa ").unwrap();
        store.set("cover", "name", "Not the child").unwrap();
        store
    }

    #[test]
    fn surfaces_the_character_name_trimmed() {
        let schema = schema();
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store(&schema));
        // Only character tabs are eligible; "cover" is skipped.
        assert_eq!(config.name.as_deref(), Some("Léa"));
    }

    #[test]
    fn empty_name_stays_unset() {
        let schema = schema();
        let mut rng = StdRng::seed_from_u64(1);
        let store = SelectionStore::initialize(&schema, None, &mut rng);
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store);
        assert_eq!(config.name, None);
    }

    #[test]
    fn copies_appearance_subset() {
        let schema = schema();
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store(&schema));
        assert_eq!(config.appearance.get("hairColor").map(String::as_str), Some("brown"));
        assert!(!config.appearance.contains_key("name"));
    }

    #[test]
    fn snapshot_carries_the_full_selection_map() {
        let schema = schema();
        let store = store(&schema);
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store);
        assert_eq!(&config.characters, store.values());
    }

    #[test]
    fn serializes_with_storefront_field_names() {
        let schema = schema();
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store(&schema));
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("productId").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["characters"]["child"]["hairColor"], "brown");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let schema = schema();
        let config = ResolvedConfiguration::from_store("book-1", &schema, &store(&schema));
        let json = serde_json::to_string(&config).unwrap();
        let back: ResolvedConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
