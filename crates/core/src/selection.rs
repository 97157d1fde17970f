//! Buyer selection state: initialization, restoration, mutation and
//! submission validation.
//!
//! One [`SelectionStore`] exists per active customization session. It is
//! seeded from the product schema (with a uniformly random option picked
//! for every enumerated variant, so the preview never starts blank) or
//! from a previously saved configuration when the buyer edits an existing
//! cart line. Switching products discards the store outright; nothing is
//! merged.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use crate::error::CoreError;
use crate::schema::{CustomizationSchema, VariantKind};

/// Tab id → variant id → selected value. Option id for enumerated kinds,
/// free text for text variants, "" when unset.
pub type SelectionValues = BTreeMap<String, BTreeMap<String, String>>;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// Why a text variant failed submission validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingRequiredField,
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
}

/// One failing field, with enough context to render a message and refocus
/// the owning tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub tab_id: String,
    pub variant_id: String,
    /// The variant's display label, used in buyer-facing messages.
    pub label: String,
    pub kind: ViolationKind,
}

impl FieldViolation {
    /// Buyer-facing message for length violations; `None` for
    /// missing-required failures, which share one generic message.
    pub fn length_message(&self) -> Option<String> {
        match self.kind {
            ViolationKind::TooShort { min, .. } => Some(format!(
                "{} must be at least {min} characters long",
                self.label
            )),
            ViolationKind::TooLong { max, .. } => Some(format!(
                "{} must be at most {max} characters long",
                self.label
            )),
            ViolationKind::MissingRequiredField => None,
        }
    }
}

/// Generic message shown once when any required field is missing.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all required fields";

/// The result of submission validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Violations in schema order (tab order, then variant order).
    pub violations: Vec<FieldViolation>,
    /// The first tab containing a failure; the caller switches focus to it.
    pub first_failing_tab: Option<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Ids of the failing variants, in schema order.
    pub fn failing_variant_ids(&self) -> Vec<&str> {
        self.violations
            .iter()
            .map(|v| v.variant_id.as_str())
            .collect()
    }

    /// Buyer-facing messages: one per length violation, plus a single
    /// generic message if any required field is missing.
    pub fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .violations
            .iter()
            .filter_map(FieldViolation::length_message)
            .collect();
        if self
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::MissingRequiredField)
        {
            messages.push(MISSING_FIELDS_MESSAGE.to_string());
        }
        messages
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate selections for submission.
///
/// Text variants are required: a value whose trimmed form is empty fails
/// with [`ViolationKind::MissingRequiredField`]; declared length bounds
/// are checked against the character count of the trimmed value.
/// Enumerated and checkbox variants are never required.
pub fn validate_selections(
    schema: &CustomizationSchema,
    values: &SelectionValues,
) -> ValidationOutcome {
    let mut violations = Vec::new();

    for tab in &schema.tabs {
        for variant in &tab.variants {
            let (min_length, max_length) = match variant.kind {
                VariantKind::Text {
                    min_length,
                    max_length,
                } => (min_length, max_length),
                _ => continue,
            };

            let value = values
                .get(&tab.id)
                .and_then(|t| t.get(&variant.id))
                .map(String::as_str)
                .unwrap_or("");
            let trimmed = value.trim();

            let kind = if trimmed.is_empty() {
                Some(ViolationKind::MissingRequiredField)
            } else {
                let length = trimmed.chars().count();
                match (min_length, max_length) {
                    (Some(min), _) if length < min => {
                        Some(ViolationKind::TooShort {
                            min,
                            actual: length,
                        })
                    }
                    (_, Some(max)) if length > max => {
                        Some(ViolationKind::TooLong {
                            max,
                            actual: length,
                        })
                    }
                    _ => None,
                }
            };

            if let Some(kind) = kind {
                violations.push(FieldViolation {
                    tab_id: tab.id.clone(),
                    variant_id: variant.id.clone(),
                    label: variant.label.clone(),
                    kind,
                });
            }
        }
    }

    let first_failing_tab = violations.first().map(|v| v.tab_id.clone());
    ValidationOutcome {
        violations,
        first_failing_tab,
    }
}

// ---------------------------------------------------------------------------
// Selection store
// ---------------------------------------------------------------------------

/// The live selection state for one customization session.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    values: SelectionValues,
    /// Violations recorded by the last failed submission; cleared
    /// field-by-field as the buyer edits.
    violations: Vec<FieldViolation>,
    active_tab: Option<String>,
}

impl SelectionStore {
    /// Build the store for a schema, restoring prior selections where
    /// supplied and defaulting the rest.
    ///
    /// Defaulting: enumerated variants pick one option uniformly at
    /// random (a friendly non-empty starting state); text and checkbox
    /// variants start empty. Restored values win key-by-key and are kept
    /// verbatim; restored keys that no longer exist in the schema are
    /// dropped.
    pub fn initialize(
        schema: &CustomizationSchema,
        restored: Option<&SelectionValues>,
        rng: &mut impl Rng,
    ) -> Self {
        let mut values: SelectionValues = BTreeMap::new();

        for tab in &schema.tabs {
            let tab_values = values.entry(tab.id.clone()).or_default();
            for variant in &tab.variants {
                let restored_value = restored
                    .and_then(|r| r.get(&tab.id))
                    .and_then(|t| t.get(&variant.id));
                let value = match restored_value {
                    Some(value) => value.clone(),
                    None => match &variant.kind {
                        VariantKind::Options { options }
                        | VariantKind::Color { options } => {
                            let index = rng.random_range(0..options.len());
                            options[index].id.clone()
                        }
                        VariantKind::Text { .. } | VariantKind::Checkbox => String::new(),
                    },
                };
                tab_values.insert(variant.id.clone(), value);
            }
        }

        Self {
            values,
            violations: Vec::new(),
            active_tab: schema.first_tab().map(|t| t.id.clone()),
        }
    }

    /// [`Self::initialize`] with the process-wide RNG.
    pub fn initialize_default(
        schema: &CustomizationSchema,
        restored: Option<&SelectionValues>,
    ) -> Self {
        Self::initialize(schema, restored, &mut rand::rng())
    }

    pub fn values(&self) -> &SelectionValues {
        &self.values
    }

    pub fn value(&self, tab_id: &str, variant_id: &str) -> Option<&str> {
        self.values
            .get(tab_id)
            .and_then(|t| t.get(variant_id))
            .map(String::as_str)
    }

    /// The selections of one tab (variant id → value).
    pub fn tab_values(&self, tab_id: &str) -> Option<&BTreeMap<String, String>> {
        self.values.get(tab_id)
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active_tab.as_deref()
    }

    pub fn set_active_tab(&mut self, tab_id: impl Into<String>) {
        self.active_tab = Some(tab_id.into());
    }

    /// Record a buyer edit. Clears any violation recorded for the field
    /// so the error disappears as soon as the buyer touches it.
    pub fn set(
        &mut self,
        tab_id: &str,
        variant_id: &str,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let slot = self
            .values
            .get_mut(tab_id)
            .and_then(|t| t.get_mut(variant_id))
            .ok_or_else(|| CoreError::NotFound {
                entity: "variant",
                id: format!("{tab_id}.{variant_id}"),
            })?;
        *slot = value.into();
        self.violations
            .retain(|v| !(v.tab_id == tab_id && v.variant_id == variant_id));
        Ok(())
    }

    /// Violations recorded by the last failed submission.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn violation_for(&self, tab_id: &str, variant_id: &str) -> Option<&FieldViolation> {
        self.violations
            .iter()
            .find(|v| v.tab_id == tab_id && v.variant_id == variant_id)
    }

    /// Validate for submission, recording violations and moving the
    /// active tab to the first failure.
    pub fn validate_for_submission(
        &mut self,
        schema: &CustomizationSchema,
    ) -> ValidationOutcome {
        let outcome = validate_selections(schema, &self.values);
        self.violations = outcome.violations.clone();
        if let Some(tab_id) = &outcome.first_failing_tab {
            self.active_tab = Some(tab_id.clone());
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
