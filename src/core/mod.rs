pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{CastKind, FieldMap, Row};
pub use value::Value;
