//! Commands for the product catalog.

use uuid::Uuid;

/// Command to create a new product.
///
/// Fields arrive as submitted; they are validated when the command is
/// handled.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Unit price as decimal text, e.g. `"18.99"`.
    pub price: Option<String>,
}
