// Static per-model schema table
pub mod schema;

// Record checking against a schema
pub mod validator;

pub use schema::{FieldKind, FieldRule, Model};
pub use validator::{collect_violations, validate_record};
