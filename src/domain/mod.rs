// Domain layer: data model and the table-store port. No behavior beyond value coercion helpers.

pub mod model;
pub mod ports;
