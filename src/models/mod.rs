pub mod entity;
pub mod enums;
pub mod marker;
pub mod payload;
pub mod record;
pub mod segment;

pub use entity::*;
pub use enums::*;
pub use marker::*;
pub use payload::*;
pub use record::*;
pub use segment::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid {entity_type} context: {reason}")]
    InvalidContext {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
