//! The customization session state machine.
//!
//! `Loading → Editing(active tab) → Validating → Editing | Completed`;
//! a completed session is reopened into `Editing` when the buyer edits
//! the cart line again, seeded with the previously resolved
//! configuration. A session owns its [`SelectionStore`] exclusively;
//! switching products means discarding the session and starting a new
//! one, never merging.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::configuration::ResolvedConfiguration;
use crate::error::CoreError;
use crate::schema::{validate_schema, CustomizationSchema};
use crate::selection::{SelectionStore, SelectionValues, ValidationOutcome};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle states of a customization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The product's schema is still being fetched.
    Loading,
    /// The buyer is editing selections.
    Editing,
    /// Submission validation is running.
    Validating,
    /// Selections were validated and frozen into a configuration.
    Completed,
}

impl SessionStatus {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "loading" => Ok(Self::Loading),
            "editing" => Ok(Self::Editing),
            "validating" => Ok(Self::Validating),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid session status '{s}'. Must be one of: loading, editing, validating, completed"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Editing => "editing",
            Self::Validating => "validating",
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The outcome of a submission attempt. A rejection is a recoverable
/// state, not an error: the session is back in `Editing` with the first
/// failing tab focused and violations recorded on the store.
#[derive(Debug, Clone)]
pub enum SubmissionResult {
    Accepted(ResolvedConfiguration),
    Rejected(ValidationOutcome),
}

/// One buyer's active customization of one product.
#[derive(Debug, Clone)]
pub struct CustomizationSession {
    product_id: String,
    schema: CustomizationSchema,
    store: SelectionStore,
    status: SessionStatus,
}

impl CustomizationSession {
    /// Open a session for a freshly loaded product schema, optionally
    /// restoring prior selections (edit-existing-item flow).
    pub fn start(
        product_id: impl Into<String>,
        schema: CustomizationSchema,
        restored: Option<&SelectionValues>,
        rng: &mut impl Rng,
    ) -> Result<Self, CoreError> {
        validate_schema(&schema)?;
        let product_id = product_id.into();
        let store = SelectionStore::initialize(&schema, restored, rng);
        tracing::debug!(%product_id, restored = restored.is_some(), "customization session opened");
        Ok(Self {
            product_id,
            schema,
            store,
            status: SessionStatus::Editing,
        })
    }

    /// [`Self::start`] with the process-wide RNG.
    pub fn start_default(
        product_id: impl Into<String>,
        schema: CustomizationSchema,
        restored: Option<&SelectionValues>,
    ) -> Result<Self, CoreError> {
        Self::start(product_id, schema, restored, &mut rand::rng())
    }

    /// Open a session seeded from a previously resolved configuration.
    pub fn resume(
        schema: CustomizationSchema,
        prior: &ResolvedConfiguration,
        rng: &mut impl Rng,
    ) -> Result<Self, CoreError> {
        Self::start(prior.product_id.clone(), schema, Some(&prior.characters), rng)
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn schema(&self) -> &CustomizationSchema {
        &self.schema
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.store.active_tab()
    }

    /// Switch the active tab.
    pub fn select_tab(&mut self, tab_id: &str) -> Result<(), CoreError> {
        if self.schema.tab(tab_id).is_none() {
            return Err(CoreError::NotFound {
                entity: "tab",
                id: tab_id.to_string(),
            });
        }
        self.store.set_active_tab(tab_id);
        Ok(())
    }

    /// Record a buyer edit. Only legal while editing.
    pub fn set(
        &mut self,
        tab_id: &str,
        variant_id: &str,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.ensure_status(SessionStatus::Editing, "edit selections")?;
        self.store.set(tab_id, variant_id, value)
    }

    /// Validate and, on success, freeze the selections into a
    /// configuration. On rejection the session returns to `Editing` with
    /// the first failing tab active.
    pub fn submit(&mut self) -> Result<SubmissionResult, CoreError> {
        self.ensure_status(SessionStatus::Editing, "submit")?;
        self.status = SessionStatus::Validating;

        let outcome = self.store.validate_for_submission(&self.schema);
        if !outcome.is_valid() {
            self.status = SessionStatus::Editing;
            tracing::debug!(
                product_id = %self.product_id,
                failures = outcome.violations.len(),
                "submission rejected"
            );
            return Ok(SubmissionResult::Rejected(outcome));
        }

        self.status = SessionStatus::Completed;
        let config =
            ResolvedConfiguration::from_store(self.product_id.clone(), &self.schema, &self.store);
        tracing::debug!(product_id = %self.product_id, "submission accepted");
        Ok(SubmissionResult::Accepted(config))
    }

    /// Return a completed session to editing (edit-from-cart flow).
    pub fn reopen(&mut self) -> Result<(), CoreError> {
        self.ensure_status(SessionStatus::Completed, "reopen")?;
        self.status = SessionStatus::Editing;
        Ok(())
    }

    fn ensure_status(&self, expected: SessionStatus, action: &str) -> Result<(), CoreError> {
        if self.status != expected {
            return Err(CoreError::Validation(format!(
                "Cannot {action} while the session is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
