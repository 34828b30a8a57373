//! Statement-level rules: batches, EXPLAIN and scripting.

mod common;

use common::*;
use resolved_ast_validator::ast::expression::{
    ComputedColumn, ComputedColumnBase, DeferredComputedColumn, Expr, SystemVariable,
};
use resolved_ast_validator::ast::procedure::AssignmentStmt;
use resolved_ast_validator::ast::program::{CreateWithEntryStmt, ExplainStmt, MultiStmt, Statement};
use resolved_ast_validator::ast::query::{
    AggregateScan, AggregateScanBase, Scan, ScanBase, WithEntry, WithRefScan,
};
use resolved_ast_validator::ast::types::{TypeRef, types};
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::semantic::Validator;

// ============================================================================
// Batches
// ============================================================================

fn create_with_entry(fx: &mut Fixture, name: &str) -> Statement {
    Statement::CreateWithEntry(CreateWithEntryStmt {
        with_entry: WithEntry {
            with_query_name: name.into(),
            with_subquery: Box::new(fx.project_literal("one", Value::Int64(1))),
        },
    })
}

fn read_with_entry(fx: &mut Fixture, name: &str) -> Statement {
    let column = fx.int64_column(name, "one");
    query_stmt(Scan::WithRef(WithRefScan {
        base: ScanBase::new(vec![column]),
        with_query_name: name.into(),
    }))
}

fn multi(statement_list: Vec<Statement>) -> Statement {
    Statement::Multi(MultiStmt { statement_list })
}

#[test]
fn batch_entries_are_visible_to_later_statements() {
    let mut fx = Fixture::new();
    let batch = multi(vec![create_with_entry(&mut fx, "w"), read_with_entry(&mut fx, "w")]);
    assert_valid(&batch);

    let backwards = multi(vec![read_with_entry(&mut fx, "w"), create_with_entry(&mut fx, "w")]);
    assert_invalid_containing(&backwards, "WITH query w is not visible");
}

#[test]
fn batch_entries_do_not_outlive_the_batch() {
    let mut fx = Fixture::new();
    let mut validator = Validator::default();
    assert_valid_with(
        &mut validator,
        &multi(vec![create_with_entry(&mut fx, "w")]),
    );
    assert_invalid_containing_with(
        &mut validator,
        &read_with_entry(&mut fx, "w"),
        "WITH query w is not visible",
    );
}

#[test]
fn batch_entry_names_are_unique() {
    let mut fx = Fixture::new();
    let batch = multi(vec![create_with_entry(&mut fx, "w"), create_with_entry(&mut fx, "W")]);
    assert_invalid_containing(&batch, "Duplicate WITH query name W in batch");
}

#[test]
fn create_with_entry_needs_a_batch() {
    let mut fx = Fixture::new();
    assert_invalid_containing(
        &create_with_entry(&mut fx, "w"),
        "CreateWithEntryStmt is only allowed inside a MultiStmt",
    );
}

#[test]
fn batches_do_not_nest() {
    let mut fx = Fixture::new();
    let inner = multi(vec![create_with_entry(&mut fx, "w")]);
    assert_invalid_containing(&multi(vec![inner]), "MultiStmt cannot be nested");
}

/// `SELECT SUM(v) FROM t` where the sum defers its errors to a side
/// effect column, optionally consumed by `$with_side_effects` on top.
fn deferred_sum(fx: &mut Fixture, consume: bool) -> Statement {
    let input = fx.table_scan("t", &[("v", types::int64())]);
    let value = input.column_list()[0].clone();
    let total = fx.int64_column("$aggregate", "total");
    let side_effect = fx.column("$aggregate", "total_side_effect", types::bytes());
    let computed = ComputedColumnBase::Deferred(DeferredComputedColumn {
        column: total.clone(),
        expr: aggregate_call("sum", vec![column_ref(&value)], types::int64()),
        side_effect_column: side_effect.clone(),
    });
    let aggregate = Scan::Aggregate(AggregateScan::new(
        ScanBase::new(vec![total.clone(), side_effect.clone()]),
        AggregateScanBase::new(input, Vec::new(), vec![computed]),
    ));
    if !consume {
        return query_stmt(aggregate);
    }
    let out = fx.int64_column("$query", "total");
    let consumed = scalar_call(
        "$with_side_effects",
        vec![column_ref(&total), column_ref(&side_effect)],
        types::int64(),
    );
    query_stmt(project(vec![ComputedColumn::new(out, consumed)], aggregate))
}

#[test]
fn batch_statements_consume_their_own_side_effects() {
    let mut fx = Fixture::new();
    let consumed = multi(vec![deferred_sum(&mut fx, true), deferred_sum(&mut fx, true)]);
    assert_valid(&consumed);

    let leaked = multi(vec![deferred_sum(&mut fx, false), deferred_sum(&mut fx, true)]);
    assert_invalid_containing(
        &leaked,
        "Batch statement 0 left state behind: Unconsumed side effect columns",
    );
}

// ============================================================================
// EXPLAIN
// ============================================================================

#[test]
fn explain_validates_the_explained_statement() {
    let mut fx = Fixture::new();
    let explain = |statement: Statement| {
        Statement::Explain(ExplainStmt {
            statement: Box::new(statement),
        })
    };
    assert_valid(&explain(query_stmt(fx.project_literal("one", Value::Int64(1)))));

    let error = assert_invalid_containing(
        &explain(create_with_entry(&mut fx, "w")),
        "CreateWithEntryStmt is only allowed inside a MultiStmt",
    );
    assert!(error.to_string().contains("ExplainStmt"), "{error}");
}

// ============================================================================
// Assignment
// ============================================================================

fn system_variable(name: &str, ty: TypeRef) -> Expr {
    Expr::SystemVariable(SystemVariable {
        ty,
        name_path: vec![name.into()],
    })
}

fn assignment(target: Expr, expr: Expr) -> Statement {
    Statement::Assignment(AssignmentStmt { target, expr })
}

#[test]
fn assignment_sets_a_system_variable_of_the_same_type() {
    assert_valid(&assignment(system_variable("time_zone_offset", types::int64()), int64_literal(3)));

    assert_invalid_containing(
        &assignment(system_variable("time_zone", types::string()), int64_literal(3)),
        "Assigned value has type INT64, expected STRING",
    );
    assert_invalid_containing(
        &assignment(int64_literal(1), int64_literal(3)),
        "Assignment target must be a system variable, found Literal",
    );
}
