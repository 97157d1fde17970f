/// Schema entity identifiers (products, tabs, variants, options) are
/// admin-authored strings, not database keys.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
