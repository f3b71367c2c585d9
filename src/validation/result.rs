//! Validation findings.

use crate::common::{Error, Result};
use serde::Serialize;

/// The validation stage that produced an issue. Stages run in declaration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCategory {
    Structure,
    ContentTypes,
    Namespaces,
    Relationships,
    Performance,
    CrossPlatform,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Structure => "Structure",
            Self::ContentTypes => "ContentTypes",
            Self::Namespaces => "Namespaces",
            Self::Relationships => "Relationships",
            Self::Performance => "Performance",
            Self::CrossPlatform => "CrossPlatform",
        };
        f.write_str(name)
    }
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub message: String,
    /// Archive member the issue is about, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.category, path, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub package_size: u64,
    pub variant_count: usize,
    pub file_count: usize,
}

impl ValidationResult {
    pub(crate) fn new(package_size: u64) -> Self {
        Self {
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            package_size,
            variant_count: 0,
            file_count: 0,
        }
    }

    pub(crate) fn error(&mut self, category: IssueCategory, path: Option<&str>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            category,
            message: message.into(),
            path: path.map(str::to_string),
        });
    }

    pub(crate) fn warning(&mut self, category: IssueCategory, path: Option<&str>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            category,
            message: message.into(),
            path: path.map(str::to_string),
        });
    }

    /// Close the run. Strict mode turns every warning into an error.
    pub(crate) fn finish(mut self, strict: bool) -> Self {
        if strict {
            self.errors.append(&mut self.warnings);
        }
        self.is_valid = self.errors.is_empty();
        self
    }

    /// Errors raised by one stage.
    pub fn errors_in(&self, category: IssueCategory) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(move |issue| issue.category == category)
    }

    /// Warnings raised by one stage.
    pub fn warnings_in(&self, category: IssueCategory) -> impl Iterator<Item = &ValidationIssue> {
        self.warnings.iter().filter(move |issue| issue.category == category)
    }

    /// `Ok(self)` when valid, otherwise [`Error::ValidationFailed`].
    pub fn into_result(self) -> Result<Self> {
        match self.errors.first() {
            None => Ok(self),
            Some(first) => Err(Error::ValidationFailed {
                error_count: self.errors.len(),
                first: first.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_promotes_warnings() {
        let mut result = ValidationResult::new(10);
        result.warning(IssueCategory::Performance, Some("big.xml"), "large");
        let lenient = result.clone().finish(false);
        assert!(lenient.is_valid);
        assert_eq!(lenient.warnings.len(), 1);

        let strict = result.finish(true);
        assert!(!strict.is_valid);
        assert!(strict.warnings.is_empty());
        assert_eq!(strict.errors_in(IssueCategory::Performance).count(), 1);
        assert!(matches!(
            strict.into_result(),
            Err(Error::ValidationFailed { error_count: 1, ref first }) if first.contains("big.xml")
        ));
    }

    #[test]
    fn test_serializes_for_reports() {
        let mut result = ValidationResult::new(0);
        result.error(IssueCategory::Structure, None, "unreadable archive");
        let json = serde_json::to_value(result.finish(false)).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["errors"][0]["category"], "Structure");
        assert!(json["errors"][0].get("path").is_none());
    }
}
