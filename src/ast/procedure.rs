//! Scripting statements: ASSERT, SET assignment, EXECUTE IMMEDIATE and
//! CALL of a catalog procedure.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::descriptors::{FunctionSignature, Procedure};
use crate::ast::expression::Expr;

/// `ASSERT expression [AS description]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertStmt {
    pub expression: Expr,
    pub description: SmolStr,
}

/// `SET target = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub target: Expr,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteImmediateArgument {
    /// Empty for positional arguments.
    pub name: SmolStr,
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteImmediateStmt {
    pub sql: Expr,
    pub into_identifier_list: Vec<SmolStr>,
    pub using_argument_list: Vec<ExecuteImmediateArgument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    pub procedure: Arc<Procedure>,
    pub signature: FunctionSignature,
    pub argument_list: Vec<Expr>,
}
