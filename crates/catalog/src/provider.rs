//! Product definitions and the in-memory catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use storyforge_core::combination::AvatarMapping;
use storyforge_core::configuration::ResolvedConfiguration;
use storyforge_core::content::{validate_content_config, BookContext, ContentConfig};
use storyforge_core::schema::{validate_schema, CustomizationSchema};
use storyforge_core::substitution::{extract_placeholders, WELL_KNOWN_PLACEHOLDERS};

use crate::error::CatalogError;

/// Fixed pages (cover, title) shown before story content when a product
/// does not author its own page list.
pub const DEFAULT_FRONT_MATTER_PAGES: u32 = 1;

fn default_front_matter() -> u32 {
    DEFAULT_FRONT_MATTER_PAGES
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// One product as exported by the back office. Read-only for the
/// lifetime of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    /// The customization schema; absent for non-customizable products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<CustomizationSchema>,
    /// Combination key → pre-rendered artwork.
    #[serde(default, skip_serializing_if = "AvatarMapping::is_empty")]
    pub avatar_mapping: AvatarMapping,
    /// Admin-authored page content; absent products render in legacy
    /// story mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_config: Option<ContentConfig>,
    /// Legacy flat story pages, already substituted upstream.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub story_pages: Vec<String>,
    #[serde(default = "default_front_matter")]
    pub front_matter_pages: u32,
}

impl Product {
    /// The schema, or [`CatalogError::MissingSchema`] for products that
    /// cannot be customized.
    pub fn customization_schema(&self) -> Result<&CustomizationSchema, CatalogError> {
        self.schema
            .as_ref()
            .ok_or_else(|| CatalogError::MissingSchema(self.id.clone()))
    }

    /// Assemble the page-resolution context for a finalized
    /// configuration of this product.
    pub fn book_context<'a>(
        &'a self,
        config: &'a ResolvedConfiguration,
    ) -> Result<BookContext<'a>, CatalogError> {
        Ok(BookContext {
            schema: self.customization_schema()?,
            config,
            avatars: &self.avatar_mapping,
            content: self.content_config.as_ref(),
            story_pages: &self.story_pages,
            front_matter_pages: self.front_matter_pages,
        })
    }

    /// Validate everything validatable without a buyer: schema shape,
    /// content shape, and (at debug level) template placeholders that
    /// reference nothing the schema declares.
    fn validate(&self) -> Result<(), CatalogError> {
        if let Some(schema) = &self.schema {
            validate_schema(schema)?;
        }
        if let Some(content) = &self.content_config {
            validate_content_config(content)?;
            if let Some(schema) = &self.schema {
                self.scan_templates(schema, content);
            }
        }
        Ok(())
    }

    /// Unknown placeholders are legal (the engine fails open) but worth
    /// surfacing to the admin who authored them.
    fn scan_templates(&self, schema: &CustomizationSchema, content: &ContentConfig) {
        for text in &content.texts {
            for name in extract_placeholders(&text.template) {
                let known = match name.split_once('.') {
                    Some((tab_id, variant_id)) => schema
                        .tab(tab_id)
                        .and_then(|tab| tab.variant(variant_id))
                        .is_some(),
                    None => WELL_KNOWN_PLACEHOLDERS.contains(&name.as_str()),
                };
                if !known {
                    tracing::debug!(
                        product_id = %self.id,
                        placeholder = %name,
                        "template references a placeholder the schema does not declare"
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Read-only product lookup, the boundary the engine consumes.
pub trait ProductCatalog {
    fn product(&self, product_id: &str) -> Result<&Product, CatalogError>;
}

/// The back-office export document.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    products: Vec<Product>,
}

/// An in-memory catalog loaded once from the exported JSON document.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashMap<String, Product>,
}

impl StaticCatalog {
    /// Parse and validate a back-office catalog export.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_products(document.products)
    }

    /// Build a catalog from already-parsed products, validating each.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut map = HashMap::with_capacity(products.len());
        for product in products {
            product.validate()?;
            let id = product.id.clone();
            if map.insert(id.clone(), product).is_some() {
                return Err(CatalogError::Invalid(
                    storyforge_core::CoreError::Validation(format!(
                        "Duplicate product id '{id}'"
                    )),
                ));
            }
        }
        tracing::info!(products = map.len(), "product catalog loaded");
        Ok(Self { products: map })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for StaticCatalog {
    fn product(&self, product_id: &str) -> Result<&Product, CatalogError> {
        self.products
            .get(product_id)
            .ok_or_else(|| CatalogError::MissingProduct(product_id.to_string()))
    }
}
