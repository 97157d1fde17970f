//! Customization schema model and structural validation.
//!
//! A product's schema is authored in the back office and shipped to the
//! storefront as JSON: an ordered list of tabs, each holding typed
//! variants, each non-text variant enumerating its selectable options.
//! The schema is immutable for the lifetime of a customization session;
//! it is validated once when the product catalog loads, so downstream
//! resolvers can assume ids are unique and option lists are non-empty.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length for tab, variant and option labels.
pub const MAX_LABEL_LENGTH: usize = 200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The full customization schema for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationSchema {
    /// Ordered tabs; the first tab is active when a session opens.
    pub tabs: Vec<Tab>,
}

/// A named group of customizable variants for one character or aspect
/// of the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: TabKind,
    pub variants: Vec<Variant>,
}

/// Whether a tab describes a story character or some other aspect
/// (cover style, dedication art, ...). Character tabs are the ones the
/// avatar preview follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Character,
    Other,
}

/// One customizable field within a tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub label: String,
    /// Whether the storefront renders the label next to the control.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_label: bool,
    #[serde(flatten)]
    pub kind: VariantKind,
}

/// The typed shape of a variant, discriminated by the authored `type`
/// field. Every consumer matches exhaustively, so adding a kind fails to
/// compile until defaulting, validation and key derivation handle it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantKind {
    /// Free text entered by the buyer (a name, a dedication line).
    Text {
        #[serde(
            default,
            rename = "minLength",
            skip_serializing_if = "Option::is_none"
        )]
        min_length: Option<usize>,
        #[serde(
            default,
            rename = "maxLength",
            skip_serializing_if = "Option::is_none"
        )]
        max_length: Option<usize>,
    },
    /// One choice from an enumerated option list.
    Options { options: Vec<OptionChoice> },
    /// Like `Options`, but options carry a color swatch resource.
    Color { options: Vec<OptionChoice> },
    /// An on/off toggle stored as a string ("" when unset).
    Checkbox,
}

impl VariantKind {
    /// The authored discriminant string, as it appears in schema JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Options { .. } => "options",
            Self::Color { .. } => "color",
            Self::Checkbox => "checkbox",
        }
    }
}

/// One selectable choice within an `options` or `color` variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChoice {
    pub id: String,
    pub label: String,
    /// Color hex value or image URL backing the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Small preview image shown in the picker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl CustomizationSchema {
    /// The tab a fresh session opens on.
    pub fn first_tab(&self) -> Option<&Tab> {
        self.tabs.first()
    }

    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }
}

impl Tab {
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

impl Variant {
    /// The option list for enumerated kinds; empty for text and checkbox.
    pub fn options(&self) -> &[OptionChoice] {
        match &self.kind {
            VariantKind::Options { options } | VariantKind::Color { options } => options,
            VariantKind::Text { .. } | VariantKind::Checkbox => &[],
        }
    }

    /// Whether this variant's selection participates in combination keys.
    pub fn is_combination_source(&self) -> bool {
        matches!(
            self.kind,
            VariantKind::Options { .. } | VariantKind::Color { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Validate a schema once, at catalog load.
///
/// Rules:
/// - at least one tab; ids and labels non-empty, labels within
///   [`MAX_LABEL_LENGTH`]
/// - tab ids unique; variant ids unique within a tab; option ids unique
///   within a variant
/// - `options`/`color` variants declare at least one option
/// - text length bounds coherent (`minLength <= maxLength` when both set)
pub fn validate_schema(schema: &CustomizationSchema) -> Result<(), CoreError> {
    if schema.tabs.is_empty() {
        return Err(CoreError::Validation(
            "Schema must declare at least one tab".to_string(),
        ));
    }

    let mut tab_ids = HashSet::new();
    for tab in &schema.tabs {
        validate_label("Tab", &tab.id, &tab.label)?;
        if !tab_ids.insert(tab.id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate tab id '{}'",
                tab.id
            )));
        }

        let mut variant_ids = HashSet::new();
        for variant in &tab.variants {
            validate_label("Variant", &variant.id, &variant.label)?;
            if !variant_ids.insert(variant.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate variant id '{}' in tab '{}'",
                    variant.id, tab.id
                )));
            }
            validate_variant_kind(tab, variant)?;
        }
    }

    Ok(())
}

fn validate_label(entity: &str, id: &str, label: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::Validation(format!(
            "{entity} id must not be empty"
        )));
    }
    if label.is_empty() {
        return Err(CoreError::Validation(format!(
            "{entity} '{id}' label must not be empty"
        )));
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(CoreError::Validation(format!(
            "{entity} '{id}' label too long: {} chars (max {MAX_LABEL_LENGTH})",
            label.len()
        )));
    }
    Ok(())
}

fn validate_variant_kind(tab: &Tab, variant: &Variant) -> Result<(), CoreError> {
    match &variant.kind {
        VariantKind::Text {
            min_length,
            max_length,
        } => {
            if let (Some(min), Some(max)) = (min_length, max_length) {
                if min > max {
                    return Err(CoreError::Validation(format!(
                        "Variant '{}' in tab '{}': minLength ({min}) must not exceed maxLength ({max})",
                        variant.id, tab.id
                    )));
                }
            }
        }
        VariantKind::Options { options } | VariantKind::Color { options } => {
            if options.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Variant '{}' in tab '{}' is '{}' but declares no options",
                    variant.id,
                    tab.id,
                    variant.kind.as_str()
                )));
            }
            let mut option_ids = HashSet::new();
            for option in options {
                validate_label("Option", &option.id, &option.label)?;
                if !option_ids.insert(option.id.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "Duplicate option id '{}' in variant '{}'",
                        option.id, variant.id
                    )));
                }
            }
        }
        VariantKind::Checkbox => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
