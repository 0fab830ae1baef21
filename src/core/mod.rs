pub mod collector;
pub mod migration;
pub mod path;
pub mod transform;

pub use crate::domain::model::{
    ApiSpec, CollectMode, CollectSettings, FieldMapping, FieldSpec, FieldType, MigrationResult,
    Pagination, Record, Transform,
};
pub use crate::domain::ports::TableStore;
pub use crate::utils::error::Result;
