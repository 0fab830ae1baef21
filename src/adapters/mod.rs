// Adapters layer: concrete implementations for external systems (http client, table store).

pub mod http;
pub mod table;
