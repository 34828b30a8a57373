//! Query statement validation: scoping, column ids, ordering, subqueries
//! and error reporting.

mod common;

use common::*;
use miette::Diagnostic;
use resolved_ast_validator::ast::expression::{
    ColumnRef, ComputedColumn, OrderByItem, SubqueryExpr, SubqueryType,
};
use resolved_ast_validator::ast::program::{OutputColumn, QueryStmt, Statement};
use resolved_ast_validator::ast::query::{
    FilterScan, JoinScan, JoinType, LimitOffsetScan, OrderByScan, ProjectScan, Scan, ScanBase,
    WithEntry, WithRefScan, WithScan,
};
use resolved_ast_validator::ast::FAILURE_MARKER;
use resolved_ast_validator::ast::types::types;
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::semantic::{
    LanguageFeature, STACK_EXHAUSTED_MESSAGE, VALIDATION_FAILED_PREFIX, ValidationErrorKind,
    Validator, ValidatorOptions,
};
use resolved_ast_validator::Expr;

// ============================================================================
// Minimal queries
// ============================================================================

#[test]
fn minimal_query_validates() {
    let mut fx = Fixture::new();
    let scan = fx.project_literal("five", Value::Int64(5));
    let five = scan.column_list()[0].clone();
    let stmt = Statement::Query(QueryStmt::new(vec![OutputColumn::new("five", five)], scan));
    assert_valid(&stmt);
}

#[test]
fn empty_query_over_single_row_validates() {
    assert_valid(&Statement::Query(QueryStmt::new(Vec::new(), single_row())));
}

#[test]
fn dangling_output_column_names_the_column() {
    let mut fx = Fixture::new();
    let scan = fx.project_literal("five", Value::Int64(5));
    let never_defined = fx.int64_column("$query", "five");
    let stmt = Statement::Query(QueryStmt::new(
        vec![OutputColumn::new("five", never_defined.clone())],
        scan,
    ));

    let error = assert_invalid_containing(&stmt, &never_defined.debug_string());
    assert!(error.is_internal());
    assert!(error.message().starts_with(VALIDATION_FAILED_PREFIX));
    assert!(error.message().contains("QueryStmt"));
}

#[test]
fn value_table_requires_one_output_column() {
    let mut fx = Fixture::new();
    let scan = fx.table_scan("t", &[("a", types::int64()), ("b", types::string())]);
    let Statement::Query(mut stmt) = query_stmt(scan) else {
        unreachable!()
    };
    stmt.is_value_table = true;
    assert_invalid_containing(&Statement::Query(stmt), "is a value table but has 2 output columns");
}

#[test]
fn reference_to_undefined_column_marks_the_failing_node() {
    let mut fx = Fixture::new();
    let stray = fx.int64_column("t", "stray");
    let out = fx.int64_column("$query", "out");
    let scan = project(vec![ComputedColumn::new(out, column_ref(&stray))], single_row());

    let error = assert_invalid_containing(&query_stmt(scan), "Incorrect reference to column t.stray#1");
    let location = error.location().expect("internal errors carry a location");
    assert!(location.node_debug_string.starts_with("ColumnRef"));

    let tree = error.annotated_tree().expect("wrapped errors carry the tree");
    assert!(tree.text.contains(FAILURE_MARKER));
    assert!(tree.marked_span.is_some());
}

#[test]
fn column_list_must_come_from_the_scan() {
    let mut fx = Fixture::new();
    let extra = fx.int64_column("t", "extra");
    let Scan::Table(mut table) = fx.table_scan("t", &[("a", types::int64())]) else {
        unreachable!()
    };
    let a = table.base.column_list[0].clone();
    let scan = Scan::Project(ProjectScan::new(
        ScanBase::new(vec![a, extra]),
        Vec::new(),
        Scan::Table(table.clone()),
    ));
    assert_invalid_containing(&query_stmt(scan), "Column list contains column t.extra#1");

    table.column_index_list = vec![3];
    assert_invalid_containing(&query_stmt(Scan::Table(table)), "Column index 3 is out of range");
}

#[test]
fn table_scan_column_types_match_the_catalog() {
    let mut fx = Fixture::new();
    let Scan::Table(mut table) = fx.table_scan("t", &[("a", types::int64())]) else {
        unreachable!()
    };
    table.base.column_list[0].ty = types::string();
    assert_invalid_containing(&query_stmt(Scan::Table(table)), "has type STRING, expected INT64");
}

#[test]
fn later_select_items_do_not_see_earlier_ones() {
    let mut fx = Fixture::new();
    let x = fx.int64_column("$query", "x");
    let y = fx.int64_column("$query", "y");
    let scan = project(
        vec![
            ComputedColumn::new(x.clone(), int64_literal(1)),
            ComputedColumn::new(y, column_ref(&x)),
        ],
        single_row(),
    );
    assert_invalid_containing(&query_stmt(scan), "Incorrect reference to column $query.x#1");
}

// ============================================================================
// Filters and joins
// ============================================================================

#[test]
fn filter_must_be_bool() {
    let mut fx = Fixture::new();
    let input = fx.table_scan("t", &[("a", types::int64()), ("flag", types::bool())]);
    let columns = input.column_list().to_vec();

    let filter = |expr| {
        Scan::Filter(FilterScan {
            base: ScanBase::new(columns.clone()),
            input_scan: Box::new(input.clone()),
            filter_expr: Box::new(expr),
        })
    };
    assert_valid(&query_stmt(filter(column_ref(&columns[1]))));
    assert_invalid_containing(
        &query_stmt(filter(column_ref(&columns[0]))),
        "Filter expression must be BOOL, but has type INT64",
    );
}

#[test]
fn join_condition_sees_both_sides() {
    let mut fx = Fixture::new();
    let left = fx.table_scan("l", &[("id", types::int64())]);
    let right = fx.table_scan("r", &[("id", types::int64())]);
    let l_id = left.column_list()[0].clone();
    let r_id = right.column_list()[0].clone();

    let join = Scan::Join(JoinScan::inner(
        ScanBase::new(vec![l_id.clone(), r_id.clone()]),
        left,
        right,
        Some(equal(column_ref(&l_id), column_ref(&r_id))),
    ));
    assert_valid(&query_stmt(join));
}

#[test]
fn join_inputs_must_be_disjoint() {
    let mut fx = Fixture::new();
    let left = fx.table_scan("l", &[("id", types::int64())]);
    let shared = left.column_list()[0].clone();
    let right = left.clone();

    let join = Scan::Join(JoinScan::inner(ScanBase::new(vec![shared]), left, right, None));
    let error = validate(&query_stmt(join)).expect_err("shared column ids must be rejected");
    assert!(error.detail().contains("column id 1"), "{error}");
}

#[test]
fn outer_joins_require_a_condition() {
    let mut fx = Fixture::new();
    let left = fx.table_scan("l", &[("a", types::int64())]);
    let right = fx.table_scan("r", &[("b", types::int64())]);
    let mut join = JoinScan::inner(ScanBase::new(Vec::new()), left, right, None);
    join.join_type = JoinType::Full;
    assert_invalid_containing(&query_stmt(Scan::Join(join)), "Full JOIN requires a join condition");
}

#[test]
fn lateral_join_is_feature_gated() {
    let mut fx = Fixture::new();
    let left = fx.table_scan("l", &[("a", types::int64())]);
    let a = left.column_list()[0].clone();
    let b = fx.int64_column("$lateral", "b");
    let right = project(vec![ComputedColumn::new(b.clone(), correlated_ref(&a))], single_row());

    let mut join = JoinScan::inner(ScanBase::new(vec![a.clone(), b]), left, right, None);
    join.is_lateral = true;
    join.parameter_list = vec![ColumnRef::new(a)];
    let stmt = query_stmt(Scan::Join(join));

    assert_invalid_containing(&stmt, "LATERAL join is not supported without FEATURE_LATERAL_JOIN");
    assert_valid_with(&mut validator_with(&[LanguageFeature::LateralJoin]), &stmt);
}

// ============================================================================
// Ordering
// ============================================================================

fn ordered_by_first_column(fx: &mut Fixture) -> Scan {
    let input = fx.table_scan("t", &[("a", types::int64())]);
    let a = input.column_list()[0].clone();
    Scan::OrderBy(OrderByScan {
        base: ScanBase::ordered(vec![a.clone()]),
        input_scan: Box::new(input),
        order_by_item_list: vec![OrderByItem::new(ColumnRef::new(a))],
    })
}

#[test]
fn order_by_produces_ordered_output() {
    let mut fx = Fixture::new();
    let ordered = ordered_by_first_column(&mut fx);
    let columns = ordered.column_list().to_vec();

    let limited = Scan::LimitOffset(LimitOffsetScan {
        base: ScanBase::ordered(columns),
        input_scan: Box::new(ordered),
        limit: Some(Box::new(int64_literal(10))),
        offset: None,
    });
    assert_valid(&query_stmt(limited));
}

#[test]
fn only_order_by_creates_order() {
    let mut fx = Fixture::new();
    let input = fx.table_scan("t", &[("a", types::int64())]);
    let a = input.column_list()[0].clone();
    let scan = Scan::Project(ProjectScan::new(ScanBase::ordered(vec![a]), Vec::new(), input));
    assert_invalid_containing(&query_stmt(scan), "ProjectScan is ordered but its input TableScan is not");

    let input = fx.table_scan("u", &[("b", types::int64())]);
    let Scan::Table(mut table) = input else { unreachable!() };
    table.base.is_ordered = true;
    assert_invalid_containing(&query_stmt(Scan::Table(table)), "TableScan cannot produce an ordered result");
}

#[test]
fn limit_must_be_a_non_negative_constant() {
    let mut fx = Fixture::new();
    let input = fx.table_scan("t", &[("a", types::int64())]);
    let a = input.column_list()[0].clone();

    let limit = |expr| {
        Scan::LimitOffset(LimitOffsetScan {
            base: ScanBase::new(vec![a.clone()]),
            input_scan: Box::new(input.clone()),
            limit: Some(Box::new(expr)),
            offset: None,
        })
    };
    assert_invalid_containing(&query_stmt(limit(int64_literal(-1))), "LIMIT must not be negative");
    let computed = scalar_call("$add", vec![int64_literal(1), int64_literal(2)], types::int64());
    assert_invalid_containing(
        &query_stmt(limit(computed)),
        "LIMIT must be a literal or parameter, found FunctionCall",
    );
}

// ============================================================================
// Subqueries and WITH
// ============================================================================

fn scalar_subquery(fx: &mut Fixture, parameterized: bool) -> Statement {
    let input = fx.table_scan("t", &[("a", types::int64())]);
    let a = input.column_list()[0].clone();
    let inner = fx.int64_column("$subquery", "inner");
    let subquery = project(vec![ComputedColumn::new(inner, correlated_ref(&a))], single_row());

    let parameter_list = if parameterized {
        vec![ColumnRef::new(a.clone())]
    } else {
        Vec::new()
    };
    let expr = Expr::SubqueryExpr(SubqueryExpr {
        ty: types::int64(),
        subquery_type: SubqueryType::Scalar,
        parameter_list,
        in_expr: None,
        in_collation: None,
        subquery: Box::new(subquery),
        hint_list: Vec::new(),
    });
    let out = fx.int64_column("$query", "out");
    query_stmt(project(vec![ComputedColumn::new(out, expr)], input))
}

#[test]
fn correlated_reference_requires_a_parameter() {
    let mut fx = Fixture::new();
    assert_valid(&scalar_subquery(&mut fx, true));

    let mut fx = Fixture::new();
    assert_invalid_containing(
        &scalar_subquery(&mut fx, false),
        "Incorrect reference to correlated column t.a#1",
    );
}

#[test]
fn unreferenced_subquery_parameter_is_rejected_when_required() {
    let mut fx = Fixture::new();
    let input = fx.table_scan("t", &[("a", types::int64())]);
    let a = input.column_list()[0].clone();
    let inner = fx.int64_column("$subquery", "inner");
    let subquery = project(vec![ComputedColumn::new(inner, int64_literal(1))], single_row());
    let expr = Expr::SubqueryExpr(SubqueryExpr {
        ty: types::bool(),
        subquery_type: SubqueryType::Exists,
        parameter_list: vec![ColumnRef::new(a)],
        in_expr: None,
        in_collation: None,
        subquery: Box::new(subquery),
        hint_list: Vec::new(),
    });
    let out = fx.column("$query", "out", types::bool());
    let stmt = query_stmt(project(vec![ComputedColumn::new(out, expr)], input));

    assert_valid(&stmt);
    let mut strict = Validator::default()
        .with_options(ValidatorOptions::new().with_require_subquery_parameters_referenced(true));
    assert_invalid_containing_with(&mut strict, &stmt, "Subquery parameter t.a#1 is not referenced");
}

#[test]
fn with_ref_reads_a_visible_entry() {
    let mut fx = Fixture::new();
    let entry = fx.project_literal("x", Value::Int64(1));
    let ref_column = fx.int64_column("q", "x");

    let with = |name: &str| {
        Scan::With(WithScan {
            base: ScanBase::new(vec![ref_column.clone()]),
            with_entry_list: vec![WithEntry {
                with_query_name: "q".into(),
                with_subquery: Box::new(entry.clone()),
            }],
            query: Box::new(Scan::WithRef(WithRefScan {
                base: ScanBase::new(vec![ref_column.clone()]),
                with_query_name: name.into(),
            })),
            recursive: false,
        })
    };
    assert_valid(&query_stmt(with("Q")));
    assert_invalid_containing(&query_stmt(with("missing")), "WITH query missing is not visible");
}

// ============================================================================
// Re-validation and resource limits
// ============================================================================

#[test]
fn revalidation_is_idempotent() {
    let mut fx = Fixture::new();
    let stmt = scalar_subquery(&mut fx, true);
    let before = stmt.clone();

    let mut validator = Validator::default();
    assert!(validator.validate_statement(&stmt).is_ok());
    assert!(validator.validate_statement(&stmt).is_ok());
    assert_eq!(stmt, before);
}

#[test]
fn validator_recovers_after_a_failure() {
    let mut fx = Fixture::new();
    let bad = scalar_subquery(&mut fx, false);
    let mut fx = Fixture::new();
    let good = scalar_subquery(&mut fx, true);

    let mut validator = Validator::default();
    assert!(validator.validate_statement(&bad).is_err());
    assert!(validator.validate_statement(&good).is_ok());
}

fn add_chain(depth: usize) -> Expr {
    (0..depth).fold(int64_literal(0), |acc, i| {
        scalar_call("$add", vec![acc, int64_literal(i as i64)], types::int64())
    })
}

#[test]
fn deep_expressions_exhaust_the_recursion_budget() {
    let options = ValidatorOptions::new().with_max_recursion_depth(64);
    let mut validator = Validator::default().with_options(options);

    assert!(validator.validate_standalone_expr(&add_chain(32)).is_ok());

    let error = validator
        .validate_standalone_expr(&add_chain(200))
        .expect_err("depth limit must be enforced");
    assert!(error.is_resource_exhausted());
    assert_eq!(error.kind(), ValidationErrorKind::ResourceExhausted);
    assert_eq!(error.message(), STACK_EXHAUSTED_MESSAGE);
    assert!(error.annotated_tree().is_none());
}

#[test]
fn standalone_expression_sees_no_columns() {
    let mut fx = Fixture::new();
    let a = fx.int64_column("t", "a");
    let mut validator = Validator::default();
    assert!(validator.validate_standalone_expr(&int64_literal(7)).is_ok());

    let error = validator
        .validate_standalone_expr(&column_ref(&a))
        .expect_err("no column is visible");
    assert!(error.detail().contains("Incorrect reference to column t.a#1"));
    assert!(error.message().starts_with(VALIDATION_FAILED_PREFIX));
}

#[test]
fn errors_render_as_diagnostics() {
    let mut fx = Fixture::new();
    let stray = fx.int64_column("t", "stray");
    let out = fx.int64_column("$query", "out");
    let stmt = query_stmt(project(vec![ComputedColumn::new(out, column_ref(&stray))], single_row()));

    let error = validate(&stmt).expect_err("dangling reference");
    assert_eq!(
        error.code().map(|c| c.to_string()).as_deref(),
        Some("resolved_ast::internal")
    );
    assert_eq!(error.labels().map_or(0, Iterator::count), 1);

    let report = format!("{:?}", error.to_report());
    assert!(report.contains("Incorrect reference to column t.stray#1"), "{report}");
}
