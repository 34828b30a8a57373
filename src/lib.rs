//! Structural validator for resolved SQL abstract syntax trees.
//!
//! A resolver turns SQL text into a tree of typed, column-bound nodes. This
//! crate checks that such a tree is internally consistent before anything
//! downstream consumes it, and reports violations with miette diagnostics
//! pointing into the tree's debug rendering.
//!
//! # Example
//!
//! ```
//! use resolved_ast_validator::ast::expression::{Expr, Literal};
//! use resolved_ast_validator::{LanguageOptions, Validator, Value};
//!
//! let expr = Expr::Literal(Literal::new(Value::Int64(1)));
//! let mut validator = Validator::with_language(LanguageOptions::new());
//! assert!(validator.validate_standalone_expr(&expr).is_ok());
//! ```

pub mod ast;
pub mod semantic;

// Re-export the node roots and primitives.
pub use ast::{ColumnFactory, Expr, ResolvedColumn, Scan, Statement, Type, TypeRef, Value};

// Re-export the validator surface.
pub use semantic::{
    LanguageFeature, LanguageOptions, ValidationError, ValidationErrorKind, ValidationResult,
    Validator, ValidatorOptions,
};
