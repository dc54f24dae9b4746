pub mod schema;
pub mod validation;

pub(crate) use schema::completion_schema;
pub use schema::{decode_structured, CompletionSchema, DecodeError, SchemaHandle};
pub use validation::{validate_candidate, validate_day};
