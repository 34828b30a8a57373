//! Common test utilities
//!
//! Shared fixtures for building resolved trees by hand and asserting on
//! validation outcomes.
//!
//! # Tree builders
//! - [`Fixture`] - Hands out fresh column ids and builds table scans
//! - [`int64_literal`], [`bool_literal`], [`string_literal`] - Literals
//! - [`column_ref`], [`correlated_ref`] - Column references
//! - [`scalar_call`], [`aggregate_call`] - Calls to ad-hoc catalog functions
//! - [`query_stmt`] - A query statement outputting every column of its scan
//!
//! # Validation helpers
//! - [`assert_valid`] - Assert that a statement validates
//! - [`assert_invalid_containing`] - Assert a failure whose detail contains text
//! - [`validator_with`] - A validator with the given features enabled

#![allow(dead_code)]

use std::sync::Arc;

use resolved_ast_validator::ast::column::{ColumnFactory, ResolvedColumn};
use resolved_ast_validator::ast::descriptors::{
    Function, FunctionMode, FunctionOptions, FunctionSignature, Table,
};
use resolved_ast_validator::ast::expression::{
    AggregateFunctionCall, ColumnRef, ComputedColumn, ErrorMode, Expr, FunctionCall,
    FunctionCallBase, Literal,
};
use resolved_ast_validator::ast::program::{OutputColumn, QueryStmt, Statement};
use resolved_ast_validator::ast::query::{
    ProjectScan, Scan, ScanBase, SingleRowScan, TableScan,
};
use resolved_ast_validator::ast::types::{TypeRef, types};
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::semantic::{
    LanguageFeature, LanguageOptions, ValidationError, ValidationResult, Validator,
};

// ============================================================================
// Column and scan fixtures
// ============================================================================

/// Allocates column ids the way a resolver would.
pub struct Fixture {
    pub factory: ColumnFactory,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            factory: ColumnFactory::new(0),
        }
    }

    pub fn column(&mut self, table: &str, name: &str, ty: TypeRef) -> ResolvedColumn {
        self.factory.make_col(table, name, ty)
    }

    pub fn int64_column(&mut self, table: &str, name: &str) -> ResolvedColumn {
        self.column(table, name, types::int64())
    }

    /// A scan over every column of a fresh catalog table.
    pub fn table_scan(&mut self, table: &str, columns: &[(&str, TypeRef)]) -> Scan {
        let catalog = Table::new(table, columns.iter().map(|(n, t)| (*n, t.clone())).collect());
        let column_list: Vec<_> = columns
            .iter()
            .map(|(name, ty)| self.column(table, name, ty.clone()))
            .collect();
        Scan::Table(TableScan {
            base: ScanBase::new(column_list),
            table: Arc::new(catalog),
            for_system_time_expr: None,
            column_index_list: (0..columns.len()).collect(),
            alias: table.into(),
        })
    }

    /// `SELECT <value> AS <name>` over a single-row scan.
    pub fn project_literal(&mut self, name: &str, value: Value) -> Scan {
        let literal = Expr::Literal(Literal::new(value));
        let column = self.column("$query", name, literal.ty().clone());
        project(vec![ComputedColumn::new(column, literal)], single_row())
    }
}

pub fn single_row() -> Scan {
    Scan::SingleRow(SingleRowScan::default())
}

/// Projects the computed columns on top of `input`, keeping no input
/// column in the output.
pub fn project(expr_list: Vec<ComputedColumn>, input: Scan) -> Scan {
    let columns = expr_list.iter().map(|c| c.column.clone()).collect();
    Scan::Project(ProjectScan::new(ScanBase::new(columns), expr_list, input))
}

/// Projects a subset of the input columns without computing anything.
pub fn select(columns: Vec<ResolvedColumn>, input: Scan) -> Scan {
    Scan::Project(ProjectScan::new(ScanBase::new(columns), Vec::new(), input))
}

// ============================================================================
// Expression fixtures
// ============================================================================

pub fn int64_literal(value: i64) -> Expr {
    Expr::Literal(Literal::new(Value::Int64(value)))
}

pub fn bool_literal(value: bool) -> Expr {
    Expr::Literal(Literal::new(Value::Bool(value)))
}

pub fn string_literal(value: &str) -> Expr {
    Expr::Literal(Literal::new(Value::string(value)))
}

pub fn column_ref(column: &ResolvedColumn) -> Expr {
    Expr::ColumnRef(ColumnRef::new(column.clone()))
}

pub fn correlated_ref(column: &ResolvedColumn) -> Expr {
    Expr::ColumnRef(ColumnRef::correlated(column.clone()))
}

fn call_base(name: &str, mode: FunctionMode, args: Vec<Expr>, result: TypeRef) -> FunctionCallBase {
    let options = FunctionOptions {
        supports_order_by: true,
        supports_limit: true,
        ..FunctionOptions::default()
    };
    let argument_types = args.iter().map(|a| a.ty().clone()).collect();
    FunctionCallBase {
        ty: result.clone(),
        function: Some(Arc::new(Function::new(name, mode).with_options(options))),
        signature: FunctionSignature::fixed(argument_types, result),
        argument_list: args,
        generic_argument_list: Vec::new(),
        error_mode: ErrorMode::Default,
        hint_list: Vec::new(),
        collation_list: Vec::new(),
    }
}

/// A call whose signature matches its arguments exactly.
pub fn scalar_call(name: &str, args: Vec<Expr>, result: TypeRef) -> Expr {
    Expr::FunctionCall(FunctionCall {
        base: call_base(name, FunctionMode::Scalar, args, result),
    })
}

pub fn aggregate_call(name: &str, args: Vec<Expr>, result: TypeRef) -> Expr {
    Expr::AggregateFunctionCall(AggregateFunctionCall::new(call_base(
        name,
        FunctionMode::Aggregate,
        args,
        result,
    )))
}

/// `$equal(lhs, rhs)` returning BOOL.
pub fn equal(lhs: Expr, rhs: Expr) -> Expr {
    scalar_call("$equal", vec![lhs, rhs], types::bool())
}

// ============================================================================
// Statements and validation
// ============================================================================

/// A query statement that outputs every column of `scan` under its name.
pub fn query_stmt(scan: Scan) -> Statement {
    let outputs = scan
        .column_list()
        .iter()
        .map(|c| OutputColumn::new(c.name.clone(), c.clone()))
        .collect();
    Statement::Query(QueryStmt::new(outputs, scan))
}

pub fn validator_with(features: &[LanguageFeature]) -> Validator {
    let mut language = LanguageOptions::new();
    for &feature in features {
        language.enable_feature(feature);
    }
    Validator::with_language(language)
}

pub fn validate(statement: &Statement) -> ValidationResult<()> {
    Validator::default().validate_statement(statement)
}

/// Assert that `statement` validates under `validator`.
///
/// # Panics
/// Panics with the full error message, including the annotated tree.
pub fn assert_valid_with(validator: &mut Validator, statement: &Statement) {
    if let Err(error) = validator.validate_statement(statement) {
        panic!("expected statement to validate, got:\n{error}");
    }
}

pub fn assert_valid(statement: &Statement) {
    assert_valid_with(&mut Validator::default(), statement);
}

/// Assert that validation fails with an internal error whose detail
/// contains `text`, and return the error for further checks.
pub fn assert_invalid_containing_with(
    validator: &mut Validator,
    statement: &Statement,
    text: &str,
) -> ValidationError {
    match validator.validate_statement(statement) {
        Ok(()) => panic!("expected validation to fail with `{text}`, but it succeeded"),
        Err(error) => {
            assert!(
                error.detail().contains(text),
                "expected error containing `{text}`, got:\n{error}"
            );
            error
        }
    }
}

pub fn assert_invalid_containing(statement: &Statement, text: &str) -> ValidationError {
    assert_invalid_containing_with(&mut Validator::default(), statement, text)
}
