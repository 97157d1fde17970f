use storyforge_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No product with the requested id; the storefront shows
    /// "item not found" and redirects.
    #[error("Product not found: '{0}'")]
    MissingProduct(String),

    /// The product exists but carries no customization schema, so no
    /// session can be opened for it.
    #[error("Product '{0}' has no customization schema")]
    MissingSchema(String),

    #[error("Malformed catalog document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid product definition: {0}")]
    Invalid(#[from] CoreError),
}
