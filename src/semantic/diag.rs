//! Validation errors and their conversion into diagnostics.
//!
//! A failed validation produces exactly one [`ValidationError`]. Internal
//! errors are attributed to the innermost node that reported them and, at
//! the top level, carry the debug rendering of the whole tree with that
//! node marked. Resource exhaustion is reported verbatim.

use std::fmt;

use miette::{Diagnostic, LabeledSpan, Report, Severity, SourceCode};

use crate::ast::debug_string::{
    AnnotatedDebugString, ToDebugNode, annotated_debug_string, debug_string, node_address,
};

/// Prefix of every wrapped internal error message.
pub const VALIDATION_FAILED_PREFIX: &str = "Resolved AST validation failed: ";

/// Result type of every fallible validation step.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Categories of validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The tree violates a structural or typing contract.
    Internal,

    /// The tree is nested deeper than the configured recursion limit.
    ResourceExhausted,
}

impl ValidationErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Internal => "Internal",
            Self::ResourceExhausted => "ResourceExhausted",
        }
    }

    /// Stable diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Internal => "resolved_ast::internal",
            Self::ResourceExhausted => "resolved_ast::resource_exhausted",
        }
    }
}

/// The node an internal error was first reported at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Address of the node inside the validated tree.
    pub node_address: usize,
    /// Debug rendering of that node alone.
    pub node_debug_string: String,
}

/// A single validation failure.
#[derive(Debug, Clone)]
pub struct ValidationError {
    kind: ValidationErrorKind,
    detail: String,
    message: String,
    location: Option<ErrorLocation>,
    tree: Option<AnnotatedDebugString>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind,
            message: detail.clone(),
            detail,
            location: None,
            tree: None,
        }
    }

    /// A contract violation.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::Internal, detail)
    }

    /// A recursion limit violation.
    pub fn resource_exhausted(detail: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::ResourceExhausted, detail)
    }

    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ValidationErrorKind::Internal
    }

    pub fn is_resource_exhausted(&self) -> bool {
        self.kind == ValidationErrorKind::ResourceExhausted
    }

    /// The full message, including the annotated tree once wrapped.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The violated contract alone, without tree context.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn location(&self) -> Option<&ErrorLocation> {
        self.location.as_ref()
    }

    /// Debug rendering of the validated tree with the failing node marked.
    pub fn annotated_tree(&self) -> Option<&AnnotatedDebugString> {
        self.tree.as_ref()
    }

    /// Attributes an internal error to `node` unless an inner node already
    /// claimed it.
    pub(crate) fn attach_location<N: ToDebugNode>(&mut self, node: &N) {
        if self.is_internal() && self.location.is_none() {
            self.location = Some(ErrorLocation {
                node_address: node_address(node),
                node_debug_string: debug_string(node),
            });
        }
    }

    /// Wraps an internal error with the rendering of `root`.
    pub(crate) fn wrap_with_tree<N: ToDebugNode + ?Sized>(mut self, root: &N) -> Self {
        if !self.is_internal() || self.tree.is_some() {
            return self;
        }
        let failed_at = self.location.as_ref().map(|l| l.node_address);
        let tree = annotated_debug_string(root, failed_at);
        self.message = format!("{VALIDATION_FAILED_PREFIX}{}\n{}", self.detail, tree.text);
        self.tree = Some(tree);
        self
    }

    fn help_text(&self) -> &'static str {
        match self.kind {
            ValidationErrorKind::Internal => {
                "the tree was produced by a resolver or rewriter that broke its output contract"
            }
            ValidationErrorKind::ResourceExhausted => {
                "the tree is nested too deeply; raise max_recursion_depth or simplify the query"
            }
        }
    }

    /// Renders this error as a miette report over the annotated tree.
    pub fn to_report(&self) -> Report {
        Report::new(self.clone())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl Diagnostic for ValidationError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.help_text()))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.tree.as_ref().map(|t| &t.text as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.tree.as_ref()?.marked_span.clone()?;
        let label = LabeledSpan::new_primary_with_span(
            Some("validation failed here".to_string()),
            (span.start, span.end - span.start),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expression::{Expr, Literal};
    use crate::ast::value::Value;

    fn literal() -> Expr {
        Expr::Literal(Literal::new(Value::Int64(5)))
    }

    #[test]
    fn kind_names_and_codes() {
        assert_eq!(ValidationErrorKind::Internal.name(), "Internal");
        assert_eq!(
            ValidationErrorKind::ResourceExhausted.code(),
            "resolved_ast::resource_exhausted"
        );
    }

    #[test]
    fn first_location_wins() {
        let inner = literal();
        let outer = literal();
        let mut error = ValidationError::internal("bad literal");
        error.attach_location(&inner);
        error.attach_location(&outer);
        let location = error.location().expect("location");
        assert_eq!(location.node_address, node_address(&inner));
        assert_eq!(location.node_debug_string, "Literal(type=INT64, value=5)\n");
    }

    #[test]
    fn wrapping_marks_failing_node() {
        let expr = literal();
        let mut error = ValidationError::internal("bad literal");
        error.attach_location(&expr);
        let error = error.wrap_with_tree(&expr);
        assert_eq!(
            error.message(),
            "Resolved AST validation failed: bad literal\n\
             Literal(type=INT64, value=5) (validation failed here)\n"
        );
        assert_eq!(error.detail(), "bad literal");
        let tree = error.annotated_tree().expect("tree");
        assert!(tree.marked_span.is_some());
        let labels: Vec<_> = error.labels().expect("labels").collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].primary());
    }

    #[test]
    fn resource_exhaustion_is_never_wrapped() {
        let expr = literal();
        let mut error = ValidationError::resource_exhausted("Out of stack space");
        error.attach_location(&expr);
        let error = error.wrap_with_tree(&expr);
        assert!(error.location().is_none());
        assert_eq!(error.message(), "Out of stack space");
        assert_eq!(error.to_string(), "Out of stack space");
    }

    #[test]
    fn report_carries_code_help_and_tree() {
        let expr = literal();
        let mut error = ValidationError::internal("bad literal");
        error.attach_location(&expr);
        let error = error.wrap_with_tree(&expr);
        assert_eq!(
            error.code().map(|c| c.to_string()).as_deref(),
            Some("resolved_ast::internal")
        );
        assert!(error.help().is_some_and(|h| h.to_string().contains("output contract")));
        assert!(error.source_code().is_some());

        let report = error.to_report();
        assert_eq!(report.to_string(), error.message());
        assert!(format!("{report:?}").contains("validation failed here"));
    }

    #[test]
    fn unwrapped_errors_have_no_source() {
        let error = ValidationError::resource_exhausted("Out of stack space");
        assert!(error.source_code().is_none());
        assert!(error.labels().is_none());
        assert!(error.help().is_some_and(|h| h.to_string().contains("max_recursion_depth")));
    }
}
