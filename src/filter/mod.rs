pub mod error;
pub mod submission_filter;

pub use error::FilterError;
pub use submission_filter::{FieldPredicate, SqlConditions, SubmissionFilter};
