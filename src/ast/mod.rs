//! Resolved AST node structures and the catalog objects they reference.

pub mod catalog;
pub mod column;
pub mod debug_string;
pub mod descriptors;
pub mod expression;
pub mod graph;
pub mod mutation;
pub mod procedure;
pub mod program;
pub mod query;
pub mod session;
pub mod types;
pub mod value;

// Re-export the node roots
pub use expression::Expr;
pub use program::Statement;
pub use query::{Scan, ScanBase};

// Re-export column and type primitives
pub use column::{ColumnFactory, ResolvedColumn, SequenceNumber};
pub use types::{Collation, ProductMode, Type, TypeRef};
pub use value::Value;

// Re-export debug rendering
pub use debug_string::{AnnotatedDebugString, FAILURE_MARKER, ToDebugNode, debug_string};
