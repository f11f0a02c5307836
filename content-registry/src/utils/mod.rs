//! Registry helpers

mod validation;

pub use validation::validate_submission;
