//! Validator Benchmarks
//!
//! Measures a full validation pass over hand-built resolved trees, grouped
//! by the shape that dominates the cost:
//!
//! - **Wide projections**: many computed columns over one input
//! - **Deep expressions**: long chains of nested function calls
//! - **Many-way joins**: left-deep inner joins over fresh table scans
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench wide_projection
//! ```

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use resolved_ast_validator::ast::column::{ColumnFactory, ResolvedColumn};
use resolved_ast_validator::ast::descriptors::{Function, FunctionMode, FunctionSignature, Table};
use resolved_ast_validator::ast::expression::{
    ColumnRef, ComputedColumn, ErrorMode, Expr, FunctionCall, FunctionCallBase, Literal,
};
use resolved_ast_validator::ast::program::{OutputColumn, QueryStmt, Statement};
use resolved_ast_validator::ast::query::{JoinScan, ProjectScan, Scan, ScanBase, TableScan};
use resolved_ast_validator::ast::types::types;
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::{Validator, ValidatorOptions};

// ============================================================================
// Tree builders
// ============================================================================

fn table_scan(factory: &mut ColumnFactory, table: &str, width: usize) -> Scan {
    let names: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
    let catalog = Table::new(table, names.iter().map(|n| (n.as_str(), types::int64())).collect());
    let column_list = names
        .iter()
        .map(|n| factory.make_col(table, n.as_str(), types::int64()))
        .collect();
    Scan::Table(TableScan {
        base: ScanBase::new(column_list),
        table: Arc::new(catalog),
        for_system_time_expr: None,
        column_index_list: (0..width).collect(),
        alias: table.into(),
    })
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    let signature = FunctionSignature::fixed(vec![types::int64(), types::int64()], types::int64());
    Expr::FunctionCall(FunctionCall {
        base: FunctionCallBase {
            ty: types::int64(),
            function: Some(Arc::new(Function::new("$add", FunctionMode::Scalar))),
            signature,
            argument_list: vec![lhs, rhs],
            generic_argument_list: Vec::new(),
            error_mode: ErrorMode::Default,
            hint_list: Vec::new(),
            collation_list: Vec::new(),
        },
    })
}

fn literal(value: i64) -> Expr {
    Expr::Literal(Literal::new(Value::Int64(value)))
}

fn column_ref(column: &ResolvedColumn) -> Expr {
    Expr::ColumnRef(ColumnRef::new(column.clone()))
}

fn project(expr_list: Vec<ComputedColumn>, input: Scan) -> Scan {
    let columns = expr_list.iter().map(|c| c.column.clone()).collect();
    Scan::Project(ProjectScan::new(ScanBase::new(columns), expr_list, input))
}

fn query(scan: Scan) -> Statement {
    let outputs = scan
        .column_list()
        .iter()
        .map(|c| OutputColumn::new(c.name.clone(), c.clone()))
        .collect();
    Statement::Query(QueryStmt::new(outputs, scan))
}

/// `SELECT c0 + 1, c1 + 1, ... FROM t` with `width` columns.
fn wide_projection(width: usize) -> Statement {
    let mut factory = ColumnFactory::new(0);
    let input = table_scan(&mut factory, "t", width);
    let inputs = input.column_list().to_vec();
    let expr_list = inputs
        .iter()
        .map(|c| {
            let output = factory.make_col("$query", c.name.clone(), types::int64());
            ComputedColumn::new(output, add(column_ref(c), literal(1)))
        })
        .collect();
    query(project(expr_list, input))
}

/// `SELECT ((c0 + 1) + 1) + ...` nested `depth` times.
fn deep_expression(depth: usize) -> Statement {
    let mut factory = ColumnFactory::new(0);
    let input = table_scan(&mut factory, "t", 1);
    let mut expr = column_ref(&input.column_list()[0]);
    for _ in 0..depth {
        expr = add(expr, literal(1));
    }
    let output = factory.make_col("$query", "deep", types::int64());
    query(project(vec![ComputedColumn::new(output, expr)], input))
}

/// `t0 JOIN t1 ON t0.c0 = t1.c0 JOIN t2 ...` over `tables` scans.
fn many_way_join(tables: usize) -> Statement {
    let mut factory = ColumnFactory::new(0);
    let mut scan = table_scan(&mut factory, "t0", 4);
    for i in 1..tables {
        let right = table_scan(&mut factory, &format!("t{i}"), 4);
        let condition = Expr::FunctionCall(FunctionCall {
            base: FunctionCallBase {
                ty: types::bool(),
                function: Some(Arc::new(Function::new("$equal", FunctionMode::Scalar))),
                signature: FunctionSignature::fixed(
                    vec![types::int64(), types::int64()],
                    types::bool(),
                ),
                argument_list: vec![
                    column_ref(&scan.column_list()[0]),
                    column_ref(&right.column_list()[0]),
                ],
                generic_argument_list: Vec::new(),
                error_mode: ErrorMode::Default,
                hint_list: Vec::new(),
                collation_list: Vec::new(),
            },
        });
        let columns = scan
            .column_list()
            .iter()
            .chain(right.column_list())
            .cloned()
            .collect();
        scan = Scan::Join(JoinScan::inner(ScanBase::new(columns), scan, right, Some(condition)));
    }
    query(scan)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_wide_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_projection");
    let mut validator = Validator::default();

    for width in [10, 100, 1_000] {
        let stmt = wide_projection(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &stmt, |b, s| {
            b.iter(|| validator.validate_statement(black_box(s)));
        });
    }

    group.finish();
}

fn bench_deep_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_expression");
    let options = ValidatorOptions::new().with_max_recursion_depth(2_048);
    let mut validator = Validator::default().with_options(options);

    for depth in [10, 100, 500] {
        let stmt = deep_expression(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &stmt, |b, s| {
            b.iter(|| validator.validate_statement(black_box(s)));
        });
    }

    group.finish();
}

fn bench_many_way_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_way_join");
    let mut validator = Validator::default();

    for tables in [2, 8, 32] {
        let stmt = many_way_join(tables);
        group.bench_with_input(BenchmarkId::from_parameter(tables), &stmt, |b, s| {
            b.iter(|| validator.validate_statement(black_box(s)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_wide_projection,
    bench_deep_expression,
    bench_many_way_join
);
criterion_main!(benches);
