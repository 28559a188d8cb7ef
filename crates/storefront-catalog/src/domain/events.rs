//! Event names emitted by the product catalog.

/// Aggregate type stamped on every product event.
pub const PRODUCT_AGGREGATE: &str = "Product";

/// Entity type under which products are stored.
pub const PRODUCT_ENTITY: &str = "Product";

/// Emitted when a new product is stored. The payload is the product snapshot.
pub const PRODUCT_CREATED: &str = "ProductCreated";
