//! Product catalog boundary.
//!
//! The storefront's back office exports products (customization schema,
//! avatar mapping, authored page content, legacy story pages) as one JSON
//! document; this crate loads that document into an in-memory catalog,
//! validates every product once, and hands read-only product data to the
//! personalization engine. Nothing here performs I/O beyond parsing the
//! document the caller already fetched.

mod error;
mod provider;

pub use error::CatalogError;
pub use provider::{Product, ProductCatalog, StaticCatalog, DEFAULT_FRONT_MATTER_PAGES};

use rand::Rng;
use storyforge_core::selection::SelectionValues;
use storyforge_core::session::CustomizationSession;

/// Open a customization session for a catalog product.
///
/// Fails with [`CatalogError::MissingProduct`] /
/// [`CatalogError::MissingSchema`] when the product cannot be customized;
/// both are terminal for the session (the storefront redirects the buyer).
pub fn start_session(
    catalog: &impl ProductCatalog,
    product_id: &str,
    restored: Option<&SelectionValues>,
    rng: &mut impl Rng,
) -> Result<CustomizationSession, CatalogError> {
    let product = catalog.product(product_id)?;
    let schema = product.customization_schema()?;
    Ok(CustomizationSession::start(
        product_id,
        schema.clone(),
        restored,
        rng,
    )?)
}
