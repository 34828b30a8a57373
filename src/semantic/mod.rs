//! Structural validation of resolved ASTs.
//!
//! The validator walks a resolved statement or expression and checks the
//! contracts a resolver must uphold:
//! - every column reference is visible in the scope it appears in
//! - every newly defined column has a fresh id
//! - declared types agree with the types of the values that feed them
//! - node shapes are legal for the language features that are enabled
//!
//! A pass reports at most one error. Internal errors carry the debug string
//! of the whole tree with the failing node marked.
//!
//! # Example
//!
//! ```
//! use resolved_ast_validator::ast::program::{QueryStmt, Statement};
//! use resolved_ast_validator::ast::query::{Scan, SingleRowScan};
//! use resolved_ast_validator::semantic::{LanguageOptions, Validator};
//!
//! let statement = Statement::Query(QueryStmt::new(Vec::new(), Scan::SingleRow(SingleRowScan::default())));
//! let mut validator = Validator::with_language(LanguageOptions::new());
//! assert!(validator.validate_statement(&statement).is_ok());
//! ```

pub mod diag;
pub mod language;
pub mod validator;

pub use diag::{
    ErrorLocation, VALIDATION_FAILED_PREFIX, ValidationError, ValidationErrorKind,
    ValidationResult,
};
pub use language::{LanguageFeature, LanguageOptions};
pub use validator::{STACK_EXHAUSTED_MESSAGE, Validator, ValidatorOptions};
