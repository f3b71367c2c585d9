//! Post-build validation of SuperTheme packages.
//!
//! [`Validator::validate`] never fails; it returns a [`ValidationResult`]
//! listing every error and warning by stage. Callers that need a hard stop
//! use [`ValidationResult::into_result`].
//!
//! ```
//! use stylestack::validation::{IssueCategory, Validator};
//!
//! let result = Validator::default().validate(b"not a package");
//! assert!(!result.is_valid);
//! assert_eq!(result.errors[0].category, IssueCategory::Structure);
//! ```

pub mod result;
pub mod validator;

pub use result::{IssueCategory, ValidationIssue, ValidationResult};
pub use validator::{Validator, ValidatorConfig};
