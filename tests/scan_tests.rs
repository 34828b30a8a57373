//! Analytic, sampling, table function and MATCH_RECOGNIZE scans.

mod common;

use std::sync::Arc;

use common::*;
use resolved_ast_validator::ast::column::ResolvedColumn;
use resolved_ast_validator::ast::descriptors::{
    Function, FunctionMode, FunctionOptions, FunctionSignature, RelationSchema,
    SignatureArgument, SignatureArgumentKind, TableValuedFunction, WindowOrderSupport,
};
use resolved_ast_validator::ast::expression::{
    AnalyticFunctionCall, BoundaryType, ColumnRef, ComputedColumn, Expr, FrameUnit,
    FunctionArgument, Literal, NullHandlingModifier, OrderByItem, SubqueryExpr, SubqueryType,
    WindowFrame, WindowFrameExpr,
};
use resolved_ast_validator::ast::program::Statement;
use resolved_ast_validator::ast::query::{
    AfterMatchSkipMode, AnalyticFunctionGroup, AnalyticScan, MatchRecognizePattern,
    MatchRecognizeScan, MatchRecognizeVariableDefinition, MeasureGroup, PatternOperationType,
    SampleScan, SampleUnit, Scan, ScanBase, TvfScan, WindowOrdering,
};
use resolved_ast_validator::ast::types::types;
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::semantic::LanguageFeature;

fn window_order_by(column: &ResolvedColumn) -> WindowOrdering {
    WindowOrdering {
        order_by_item_list: vec![OrderByItem::new(ColumnRef::new(column.clone()))],
        hint_list: Vec::new(),
    }
}

// ============================================================================
// Analytic functions
// ============================================================================

/// An analytic call over `args` with the given capabilities.
fn analytic_call(
    name: &str,
    args: Vec<Expr>,
    options: FunctionOptions,
    window_frame: Option<WindowFrame>,
) -> Expr {
    let Expr::FunctionCall(call) = scalar_call(name, args, types::int64()) else {
        unreachable!("fixture builds function calls")
    };
    let mut base = call.base;
    base.function = Some(Arc::new(
        Function::new(name, FunctionMode::Analytic).with_options(options),
    ));
    Expr::AnalyticFunctionCall(AnalyticFunctionCall {
        base,
        distinct: false,
        null_handling_modifier: NullHandlingModifier::Default,
        window_frame,
    })
}

fn row_number() -> Expr {
    let options = FunctionOptions {
        supports_over_clause: true,
        window_ordering_support: WindowOrderSupport::Required,
        ..FunctionOptions::default()
    };
    analytic_call("row_number", Vec::new(), options, None)
}

fn framed_sum(value: &ResolvedColumn, frame: WindowFrame) -> Expr {
    let options = FunctionOptions {
        supports_over_clause: true,
        supports_window_framing: true,
        ..FunctionOptions::default()
    };
    analytic_call("sum", vec![column_ref(value)], options, Some(frame))
}

type Bound = (BoundaryType, Option<Expr>);

fn frame(unit: FrameUnit, start: Bound, end: Bound) -> WindowFrame {
    let boundary = |(boundary_type, expression): Bound| WindowFrameExpr {
        boundary_type,
        expression: expression.map(Box::new),
    };
    WindowFrame {
        frame_unit: unit,
        start_expr: boundary(start),
        end_expr: boundary(end),
    }
}

/// `SELECT k, v, <call> OVER ([ORDER BY k]) FROM t`.
fn analytic_stmt(
    fx: &mut Fixture,
    ordered: bool,
    call: impl FnOnce(&ResolvedColumn) -> Expr,
) -> Statement {
    let input = fx.table_scan("t", &[("k", types::int64()), ("v", types::int64())]);
    let key = input.column_list()[0].clone();
    let value = input.column_list()[1].clone();
    let output = fx.int64_column("$analytic", "w");
    let group = AnalyticFunctionGroup {
        partition_by: None,
        order_by: ordered.then(|| window_order_by(&key)),
        analytic_function_list: vec![ComputedColumn::new(output.clone(), call(&value)).into()],
    };
    query_stmt(Scan::Analytic(AnalyticScan {
        base: ScanBase::new(vec![key, value, output]),
        input_scan: Box::new(input),
        function_group_list: vec![group],
    }))
}

#[test]
fn row_number_requires_window_order_by() {
    let mut fx = Fixture::new();
    assert_valid(&analytic_stmt(&mut fx, true, |_| row_number()));
    assert_invalid_containing(
        &analytic_stmt(&mut fx, false, |_| row_number()),
        "Function row_number requires window ORDER BY",
    );
}

#[test]
fn rows_frame_between_offset_and_current_row_validates() {
    let mut fx = Fixture::new();
    let stmt = analytic_stmt(&mut fx, true, |value| {
        framed_sum(
            value,
            frame(
                FrameUnit::Rows,
                (BoundaryType::OffsetPreceding, Some(int64_literal(1))),
                (BoundaryType::CurrentRow, None),
            ),
        )
    });
    assert_valid(&stmt);
}

#[test]
fn window_frame_bounds_are_ordered_and_typed() {
    let mut fx = Fixture::new();

    let backwards = analytic_stmt(&mut fx, true, |value| {
        framed_sum(
            value,
            frame(
                FrameUnit::Rows,
                (BoundaryType::CurrentRow, None),
                (BoundaryType::OffsetPreceding, Some(int64_literal(1))),
            ),
        )
    });
    assert_invalid_containing(
        &backwards,
        "Window frame starts at CurrentRow but ends at OffsetPreceding",
    );

    let string_offset = analytic_stmt(&mut fx, true, |value| {
        framed_sum(
            value,
            frame(
                FrameUnit::Rows,
                (BoundaryType::OffsetPreceding, Some(string_literal("1"))),
                (BoundaryType::CurrentRow, None),
            ),
        )
    });
    assert_invalid_containing(&string_offset, "ROWS frame offset must be INT64, but has type STRING");

    let missing_offset = analytic_stmt(&mut fx, true, |value| {
        framed_sum(
            value,
            frame(
                FrameUnit::Rows,
                (BoundaryType::OffsetPreceding, None),
                (BoundaryType::CurrentRow, None),
            ),
        )
    });
    assert_invalid_containing(&missing_offset, "OffsetPreceding boundary requires an offset");

    let unordered_range = analytic_stmt(&mut fx, false, |value| {
        framed_sum(
            value,
            frame(
                FrameUnit::Range,
                (BoundaryType::UnboundedPreceding, None),
                (BoundaryType::CurrentRow, None),
            ),
        )
    });
    assert_invalid_containing(&unordered_range, "RANGE window frame requires window ORDER BY");
}

#[test]
fn frame_on_unframed_function_is_rejected() {
    let mut fx = Fixture::new();
    let stmt = analytic_stmt(&mut fx, true, |_| {
        let Expr::AnalyticFunctionCall(mut call) = row_number() else {
            unreachable!()
        };
        call.window_frame = Some(frame(
            FrameUnit::Rows,
            (BoundaryType::UnboundedPreceding, None),
            (BoundaryType::CurrentRow, None),
        ));
        Expr::AnalyticFunctionCall(call)
    });
    assert_invalid_containing(&stmt, "Function row_number does not support a window frame");
}

// ============================================================================
// TABLESAMPLE
// ============================================================================

fn sample_stmt(
    fx: &mut Fixture,
    unit: SampleUnit,
    size: Expr,
    weight: Option<ResolvedColumn>,
) -> Statement {
    let input = fx.table_scan("t", &[("k", types::int64())]);
    let mut columns = input.column_list().to_vec();
    columns.extend(weight.clone());
    query_stmt(Scan::Sample(SampleScan {
        base: ScanBase::new(columns),
        input_scan: Box::new(input),
        method: "bernoulli".into(),
        size: Box::new(size),
        unit,
        repeatable_argument: None,
        weight_column: weight,
        partition_by_list: Vec::new(),
    }))
}

#[test]
fn tablesample_percent_and_rows_validate() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::TableSample]);

    let percent = sample_stmt(
        &mut fx,
        SampleUnit::Percent,
        Expr::Literal(Literal::new(Value::Double(12.5))),
        None,
    );
    assert_invalid_containing(&percent, "TABLESAMPLE is not supported without FEATURE_TABLESAMPLE");
    assert_valid_with(&mut validator, &percent);

    let weight = fx.column("$sample_weight", "weight", types::double());
    let rows = sample_stmt(&mut fx, SampleUnit::Rows, int64_literal(100), Some(weight));
    assert_valid_with(&mut validator, &rows);
}

#[test]
fn tablesample_size_and_weight_are_checked() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::TableSample]);

    let too_large = sample_stmt(&mut fx, SampleUnit::Percent, int64_literal(150), None);
    assert_invalid_containing_with(&mut validator, &too_large, "is not in [0, 100]");

    let computed_size = scalar_call("abs", vec![int64_literal(-5)], types::int64());
    let rows_from_call = sample_stmt(&mut fx, SampleUnit::Rows, computed_size, None);
    assert_invalid_containing_with(
        &mut validator,
        &rows_from_call,
        "TABLESAMPLE ROWS size must be a literal or parameter, found FunctionCall",
    );

    let weight = fx.int64_column("$sample_weight", "weight");
    let int_weight = sample_stmt(&mut fx, SampleUnit::Rows, int64_literal(10), Some(weight.clone()));
    assert_invalid_containing_with(
        &mut validator,
        &int_weight,
        &format!("TABLESAMPLE weight column {weight} must be DOUBLE"),
    );
}

// ============================================================================
// Table-valued functions
// ============================================================================

/// `tvf(TABLE t)` where `tvf` takes a table with one INT64 column `k` and
/// returns one INT64 column `out`.
fn tvf_scan(fx: &mut Fixture, argument: FunctionArgument) -> TvfScan {
    let schema = |name: &str| RelationSchema {
        columns: vec![(name.into(), types::int64())],
        is_value_table: false,
    };
    let output = fx.int64_column("tvf", "out");
    TvfScan {
        base: ScanBase::new(vec![output]),
        tvf: Arc::new(TableValuedFunction { name: "tvf".into() }),
        signature: FunctionSignature::new(
            vec![SignatureArgument::of_kind(SignatureArgumentKind::Relation(Some(schema("k"))))],
            SignatureArgument::of_kind(SignatureArgumentKind::Relation(Some(schema("out")))),
        ),
        argument_list: vec![argument],
        column_index_list: vec![0],
        alias: "tvf".into(),
    }
}

fn table_argument(fx: &mut Fixture, column_name: &str) -> FunctionArgument {
    let scan = fx.table_scan("t", &[(column_name, types::int64())]);
    let argument_column_list = scan.column_list().to_vec();
    FunctionArgument::Scan {
        scan: Box::new(scan),
        argument_column_list,
    }
}

#[test]
fn tvf_with_matching_table_argument_validates() {
    let mut fx = Fixture::new();
    let argument = table_argument(&mut fx, "k");
    assert_valid(&query_stmt(Scan::Tvf(tvf_scan(&mut fx, argument))));
}

#[test]
fn tvf_table_argument_follows_the_declared_schema() {
    let mut fx = Fixture::new();
    let argument = table_argument(&mut fx, "other");
    let renamed = tvf_scan(&mut fx, argument);
    assert_invalid_containing(
        &query_stmt(Scan::Tvf(renamed)),
        "Table argument 0 of tvf has column t.other#1 where the schema requires k",
    );

    let scalar = tvf_scan(&mut fx, FunctionArgument::Expr(int64_literal(1)));
    assert_invalid_containing(
        &query_stmt(Scan::Tvf(scalar)),
        "Argument 0 of tvf is SCALAR, but the signature expects RELATION",
    );

    let argument = table_argument(&mut fx, "k");
    let mut extra = tvf_scan(&mut fx, argument);
    extra.argument_list.push(FunctionArgument::Expr(int64_literal(1)));
    assert_invalid_containing(
        &query_stmt(Scan::Tvf(extra)),
        "Table function tvf has 2 arguments, but its signature expects 1",
    );
}

// ============================================================================
// MATCH_RECOGNIZE
// ============================================================================

/// `t(k, v) MATCH_RECOGNIZE(ORDER BY k MEASURES COUNT(v) PATTERN (<pattern>)
/// DEFINE A AS v > 0)`, with `measure` replacing the COUNT when given.
fn match_recognize(
    fx: &mut Fixture,
    pattern: MatchRecognizePattern,
    measure: Option<Expr>,
) -> MatchRecognizeScan {
    let input = fx.table_scan("t", &[("k", types::int64()), ("v", types::int64())]);
    let key = input.column_list()[0].clone();
    let value = input.column_list()[1].clone();
    let match_number = fx.int64_column("$match_recognize", "match_number");
    let match_row_number = fx.int64_column("$match_recognize", "match_row_number");
    let classifier = fx.column("$match_recognize", "classifier", types::string());
    let measure_column = fx.int64_column("$measures", "m");
    let measure = measure
        .unwrap_or_else(|| aggregate_call("count", vec![column_ref(&value)], types::int64()));

    MatchRecognizeScan {
        base: ScanBase::new(vec![key.clone(), match_number.clone(), measure_column.clone()]),
        input_scan: Box::new(input),
        option_list: Vec::new(),
        partition_by: None,
        order_by: window_order_by(&key),
        pattern_variable_definition_list: vec![MatchRecognizeVariableDefinition {
            name: "A".into(),
            predicate: scalar_call(
                "$greater",
                vec![column_ref(&value), int64_literal(0)],
                types::bool(),
            ),
        }],
        pattern,
        after_match_skip_mode: AfterMatchSkipMode::EndOfMatch,
        measure_group_list: vec![MeasureGroup {
            pattern_variable_ref: None,
            aggregate_list: vec![ComputedColumn::new(measure_column, measure).into()],
        }],
        match_number_column: match_number,
        match_row_number_column: match_row_number,
        classifier_column: classifier,
    }
}

fn variable(name: &str) -> MatchRecognizePattern {
    MatchRecognizePattern::VariableRef(name.into())
}

#[test]
fn match_recognize_over_defined_variables_validates() {
    let mut fx = Fixture::new();
    let stmt = query_stmt(Scan::MatchRecognize(match_recognize(&mut fx, variable("a"), None)));
    assert_invalid_containing(
        &stmt,
        "MATCH_RECOGNIZE is not supported without FEATURE_MATCH_RECOGNIZE",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::MatchRecognize]), &stmt);
}

#[test]
fn match_recognize_pattern_references_must_be_defined() {
    let mut fx = Fixture::new();
    let pattern = MatchRecognizePattern::Operation {
        op_type: PatternOperationType::Concat,
        operand_list: vec![variable("A"), variable("B")],
    };
    let stmt = query_stmt(Scan::MatchRecognize(match_recognize(&mut fx, pattern, None)));
    assert_invalid_containing_with(
        &mut validator_with(&[LanguageFeature::MatchRecognize]),
        &stmt,
        "Pattern variable B is not defined",
    );
}

#[test]
fn match_recognize_cannot_nest_inside_measures() {
    let mut fx = Fixture::new();
    let inner = match_recognize(&mut fx, variable("A"), None);
    let inner_match_number = inner.match_number_column.clone();
    let subquery = Expr::SubqueryExpr(SubqueryExpr {
        ty: types::int64(),
        subquery_type: SubqueryType::Scalar,
        parameter_list: Vec::new(),
        in_expr: None,
        in_collation: None,
        subquery: Box::new(select(vec![inner_match_number], Scan::MatchRecognize(inner))),
        hint_list: Vec::new(),
    });
    let measure = aggregate_call("max", vec![subquery], types::int64());
    let outer = match_recognize(&mut fx, variable("A"), Some(measure));

    assert_invalid_containing_with(
        &mut validator_with(&[LanguageFeature::MatchRecognize]),
        &query_stmt(Scan::MatchRecognize(outer)),
        "MATCH_RECOGNIZE cannot be nested inside the measures of another MATCH_RECOGNIZE",
    );
}
