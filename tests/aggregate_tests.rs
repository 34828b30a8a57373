//! Aggregate scans: grouping, aggregate modifiers, grouping sets, WITH
//! GROUP ROWS and the privacy-aware aggregations.

mod common;

use common::*;
use resolved_ast_validator::ast::column::ResolvedColumn;
use resolved_ast_validator::ast::program::{OptionEntry, Statement};
use resolved_ast_validator::ast::expression::{
    ColumnRef, ComputedColumn, ComputedColumnBase, Expr, Literal, OrderByItem,
};
use resolved_ast_validator::ast::query::{
    AggregateScan, AggregateScanBase, AggregationThresholdAggregateScan, AnonymizedAggregateScan,
    DifferentialPrivacyAggregateScan, GroupRowsScan, GroupingCall, GroupingSetBase,
    GroupingSetMultiColumn, Scan, ScanBase,
};
use resolved_ast_validator::ast::types::types;
use resolved_ast_validator::ast::value::Value;
use resolved_ast_validator::semantic::{LanguageFeature, Validator, ValidatorOptions};

/// `SELECT k, SUM(v) FROM t GROUP BY k` with the pieces kept apart so
/// tests can rewire them.
struct Grouped {
    input: Scan,
    key: ResolvedColumn,
    value: ResolvedColumn,
    group_key: ResolvedColumn,
    total: ResolvedColumn,
}

impl Grouped {
    fn new(fx: &mut Fixture) -> Self {
        let input = fx.table_scan("t", &[("k", types::int64()), ("v", types::int64())]);
        let key = input.column_list()[0].clone();
        let value = input.column_list()[1].clone();
        Self {
            input,
            key,
            value,
            group_key: fx.int64_column("$groupby", "k"),
            total: fx.int64_column("$aggregate", "total"),
        }
    }

    fn sum(&self) -> Expr {
        aggregate_call("sum", vec![column_ref(&self.value)], types::int64())
    }

    fn scan_with(&self, aggregate: Expr) -> AggregateScan {
        let group_by = ComputedColumn::new(self.group_key.clone(), column_ref(&self.key));
        let computed = ComputedColumn::new(self.total.clone(), aggregate);
        AggregateScan::new(
            ScanBase::new(vec![self.group_key.clone(), self.total.clone()]),
            AggregateScanBase::new(self.input.clone(), vec![group_by], vec![computed.into()]),
        )
    }

    fn stmt(&self, scan: AggregateScan) -> Statement {
        query_stmt(Scan::Aggregate(scan))
    }
}

fn with_order_by(expr: Expr, column: &ResolvedColumn) -> Expr {
    let Expr::AggregateFunctionCall(mut call) = expr else {
        unreachable!("fixture builds aggregate calls")
    };
    call.order_by_item_list = vec![OrderByItem::new(ColumnRef::new(column.clone()))];
    Expr::AggregateFunctionCall(call)
}

// ============================================================================
// Grouping and aggregate lists
// ============================================================================

#[test]
fn group_by_with_sum_validates() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    assert_valid(&grouped.stmt(grouped.scan_with(grouped.sum())));
}

#[test]
fn aggregate_output_hides_the_input_columns() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let mut scan = grouped.scan_with(grouped.sum());
    scan.base.column_list.push(grouped.value.clone());
    assert_invalid_containing(
        &grouped.stmt(scan),
        &format!("Column list contains column {} not visible in AggregateScan", grouped.value),
    );
}

#[test]
fn aggregate_list_requires_aggregate_calls() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let scan = grouped.scan_with(scalar_call("abs", vec![column_ref(&grouped.value)], types::int64()));
    assert_invalid_containing(
        &grouped.stmt(scan),
        "Aggregate list entry must be an aggregate function call, found FunctionCall",
    );
}

#[test]
fn aggregate_column_type_matches_its_call() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let scan = grouped.scan_with(aggregate_call(
        "string_agg",
        vec![column_ref(&grouped.value)],
        types::string(),
    ));
    assert_invalid_containing(&grouped.stmt(scan), "has type STRING, expected INT64");
}

// ============================================================================
// Aggregate modifiers
// ============================================================================

#[test]
fn aggregate_order_by_sees_the_pre_aggregation_input() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);

    let by_input = with_order_by(grouped.sum(), &grouped.key);
    assert_valid(&grouped.stmt(grouped.scan_with(by_input)));

    let by_group_key = with_order_by(grouped.sum(), &grouped.group_key);
    assert_invalid_containing(
        &grouped.stmt(grouped.scan_with(by_group_key)),
        &format!("Incorrect reference to column {}", grouped.group_key),
    );
}

#[test]
fn distinct_requires_function_support() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let Expr::AggregateFunctionCall(mut call) = grouped.sum() else {
        unreachable!()
    };
    call.distinct = true;
    assert_invalid_containing(
        &grouped.stmt(grouped.scan_with(Expr::AggregateFunctionCall(call))),
        "Function sum does not support DISTINCT",
    );
}

#[test]
fn aggregate_limit_must_be_a_constant() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let Expr::AggregateFunctionCall(mut call) = grouped.sum() else {
        unreachable!()
    };
    call.limit = Some(Box::new(int64_literal(10)));
    assert_valid(&grouped.stmt(grouped.scan_with(Expr::AggregateFunctionCall(call.clone()))));

    call.limit = Some(Box::new(column_ref(&grouped.key)));
    assert_invalid_containing(
        &grouped.stmt(grouped.scan_with(Expr::AggregateFunctionCall(call))),
        "Aggregate LIMIT must be a literal or parameter, found ColumnRef",
    );
}

#[test]
fn multi_level_aggregation_is_feature_gated() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let inner_key = fx.int64_column("$inner_groupby", "k");
    let Expr::AggregateFunctionCall(mut call) = aggregate_call(
        "count",
        vec![column_ref(&inner_key)],
        types::int64(),
    ) else {
        unreachable!()
    };
    call.group_by_list = vec![ComputedColumn::new(inner_key, column_ref(&grouped.key))];
    let stmt = grouped.stmt(grouped.scan_with(Expr::AggregateFunctionCall(call)));

    assert_invalid_containing(
        &stmt,
        "GROUP BY inside an aggregate is not supported without FEATURE_MULTILEVEL_AGGREGATION",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::MultilevelAggregation]), &stmt);
}

// ============================================================================
// Grouping sets
// ============================================================================

#[test]
fn grouping_sets_cover_every_group_by_column() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let key_ref = ColumnRef::new(grouped.group_key.clone());
    let mut validator = validator_with(&[LanguageFeature::GroupingSets]);

    let mut scan = grouped.scan_with(grouped.sum());
    scan.aggregate.grouping_set_list = vec![
        GroupingSetBase::GroupingSet(vec![key_ref.clone()]),
        GroupingSetBase::GroupingSet(Vec::new()),
    ];
    assert_valid_with(&mut validator, &grouped.stmt(scan.clone()));

    scan.aggregate.grouping_set_list = vec![GroupingSetBase::GroupingSet(Vec::new())];
    assert_invalid_containing_with(
        &mut validator,
        &grouped.stmt(scan.clone()),
        "does not appear in any grouping set",
    );

    scan.aggregate.grouping_set_list = vec![GroupingSetBase::GroupingSet(vec![ColumnRef::new(
        grouped.key.clone(),
    )])];
    assert_invalid_containing_with(
        &mut validator,
        &grouped.stmt(scan),
        "is not a grouping column",
    );
}

#[test]
fn rollup_and_cube_are_feature_gated() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let items = vec![GroupingSetMultiColumn {
        column_list: vec![ColumnRef::new(grouped.group_key.clone())],
    }];

    let mut rollup = grouped.scan_with(grouped.sum());
    rollup.aggregate.grouping_set_list = vec![GroupingSetBase::Rollup(items.clone())];
    assert_invalid_containing(
        &grouped.stmt(rollup.clone()),
        "ROLLUP is not supported without FEATURE_ROLLUP",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::Rollup]), &grouped.stmt(rollup));

    let mut cube = grouped.scan_with(grouped.sum());
    cube.aggregate.grouping_set_list = vec![GroupingSetBase::Cube(items)];
    assert_invalid_containing(&grouped.stmt(cube), "CUBE is not supported without FEATURE_CUBE");
}

#[test]
fn grouping_call_reads_a_group_by_column() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let output = fx.int64_column("$grouping_call", "g");

    let mut scan = grouped.scan_with(grouped.sum());
    scan.base.column_list.push(output.clone());
    scan.aggregate.grouping_call_list = vec![GroupingCall {
        group_by_column: ColumnRef::new(grouped.group_key.clone()),
        output_column: output.clone(),
    }];
    assert_valid(&grouped.stmt(scan.clone()));

    scan.aggregate.grouping_call_list[0].group_by_column = ColumnRef::new(grouped.total.clone());
    assert_invalid_containing(
        &grouped.stmt(scan),
        &format!("GROUPING argument {} is not a grouping column", grouped.total),
    );
}

#[test]
fn aggregate_columns_need_fresh_ids() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let mut scan = grouped.scan_with(grouped.sum());
    let ComputedColumnBase::Computed(first) = scan.aggregate.aggregate_list[0].clone() else {
        unreachable!()
    };
    scan.aggregate.aggregate_list.push(ComputedColumnBase::Computed(first));
    assert_invalid_containing(
        &grouped.stmt(scan),
        &format!("Duplicate column id {}", grouped.total.column_id),
    );
}

// ============================================================================
// WITH GROUP ROWS
// ============================================================================

/// `SUM(v) WITH GROUP ROWS (SELECT <columns> FROM GROUP_ROWS())`.
fn sum_with_group_rows(grouped: &Grouped, columns: Vec<ResolvedColumn>) -> Expr {
    let Expr::AggregateFunctionCall(mut call) = grouped.sum() else {
        unreachable!()
    };
    let group_rows = Scan::GroupRows(GroupRowsScan {
        base: ScanBase::new(columns.clone()),
    });
    call.with_group_rows_subquery = Some(Box::new(select(columns, group_rows)));
    Expr::AggregateFunctionCall(call)
}

#[test]
fn group_rows_subquery_reads_the_aggregate_input() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let stmt = grouped.stmt(grouped.scan_with(sum_with_group_rows(
        &grouped,
        vec![grouped.value.clone()],
    )));

    assert_invalid_containing(
        &stmt,
        "WITH GROUP ROWS is not supported without FEATURE_WITH_GROUP_ROWS",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::WithGroupRows]), &stmt);
}

#[test]
fn group_rows_cannot_expose_grouping_output() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let stmt = grouped.stmt(grouped.scan_with(sum_with_group_rows(
        &grouped,
        vec![grouped.group_key.clone()],
    )));
    assert_invalid_containing_with(
        &mut validator_with(&[LanguageFeature::WithGroupRows]),
        &stmt,
        &format!(
            "Column list contains column {} not visible in GroupRowsScan",
            grouped.group_key
        ),
    );
}

#[test]
fn group_rows_scan_outside_with_group_rows_is_rejected() {
    let mut fx = Fixture::new();
    let column = fx.int64_column("t", "v");
    let stmt = query_stmt(Scan::GroupRows(GroupRowsScan {
        base: ScanBase::new(vec![column]),
    }));
    assert_invalid_containing_with(
        &mut validator_with(&[LanguageFeature::WithGroupRows]),
        &stmt,
        "GroupRowsScan appears outside of a WITH GROUP ROWS subquery",
    );
}

// ============================================================================
// Privacy-aware aggregation
// ============================================================================

fn null_int64() -> Expr {
    Expr::Literal(Literal::new(Value::null(types::int64())))
}

fn greater_or_equal(lhs: Expr, rhs: Expr) -> Expr {
    scalar_call("$greater_or_equal", vec![lhs, rhs], types::bool())
}

/// `IF(total >= 10, <noisy>, NULL)` as the DP group selection threshold.
fn min_units_threshold(grouped: &Grouped, noisy: Expr) -> Expr {
    scalar_call(
        "if",
        vec![
            greater_or_equal(column_ref(&grouped.total), int64_literal(10)),
            noisy,
            null_int64(),
        ],
        types::int64(),
    )
}

fn dp_stmt(grouped: &Grouped, threshold: Expr, options: Vec<OptionEntry>) -> Statement {
    let AggregateScan { base, aggregate } = grouped.scan_with(grouped.sum());
    query_stmt(Scan::DifferentialPrivacyAggregate(DifferentialPrivacyAggregateScan {
        base,
        aggregate,
        group_selection_threshold_expr: Some(Box::new(threshold)),
        option_list: options,
    }))
}

#[test]
fn differential_privacy_threshold_is_an_aggregate_column() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let mut validator = validator_with(&[LanguageFeature::DifferentialPrivacy]);

    let stmt = dp_stmt(&grouped, column_ref(&grouped.total), Vec::new());
    assert_invalid_containing(
        &stmt,
        "Differential privacy aggregation is not supported without FEATURE_DIFFERENTIAL_PRIVACY",
    );
    assert_valid_with(&mut validator, &stmt);

    let stmt = dp_stmt(&grouped, int64_literal(5), Vec::new());
    assert_invalid_containing_with(
        &mut validator,
        &stmt,
        "Group selection threshold must be a ColumnRef, found Literal",
    );
}

#[test]
fn min_privacy_units_threshold_subtracts_a_literal_offset() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let mut validator = validator_with(&[LanguageFeature::DifferentialPrivacy]);
    let options = || vec![OptionEntry::new("min_privacy_units_per_group", int64_literal(10))];
    let safe_subtract = |offset: Expr| {
        scalar_call(
            "safe_subtract",
            vec![column_ref(&grouped.total), offset],
            types::int64(),
        )
    };

    let threshold = min_units_threshold(&grouped, safe_subtract(int64_literal(1)));
    assert_valid_with(&mut validator, &dp_stmt(&grouped, threshold, options()));

    let threshold = min_units_threshold(&grouped, column_ref(&grouped.total));
    assert_invalid_containing_with(
        &mut validator,
        &dp_stmt(&grouped, threshold, options()),
        "Group selection threshold must compute the noisy count with safe_subtract, found ColumnRef",
    );

    let threshold = min_units_threshold(&grouped, safe_subtract(null_int64()));
    assert_invalid_containing_with(
        &mut validator,
        &dp_stmt(&grouped, threshold, options()),
        "safe_subtract offset must be a non-NULL INT64 literal",
    );

    let threshold = min_units_threshold(&grouped, safe_subtract(column_ref(&grouped.total)));
    assert_invalid_containing_with(
        &mut validator,
        &dp_stmt(&grouped, threshold, options()),
        "safe_subtract offset must be a non-NULL INT64 literal, found ColumnRef",
    );

    let plain = dp_stmt(&grouped, column_ref(&grouped.total), options());
    assert_invalid_containing_with(
        &mut validator,
        &plain,
        "Group selection threshold with min_privacy_units_per_group must be an IF call, found ColumnRef",
    );
}

#[test]
fn anonymized_k_threshold_reads_an_aggregate_column() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let mut validator = validator_with(&[LanguageFeature::Anonymization]);
    let anonymized = |threshold: &ResolvedColumn| {
        let AggregateScan { base, aggregate } = grouped.scan_with(grouped.sum());
        query_stmt(Scan::AnonymizedAggregate(AnonymizedAggregateScan {
            base,
            aggregate,
            k_threshold_expr: Some(Box::new(column_ref(threshold))),
            anonymization_option_list: vec![OptionEntry::new("epsilon", int64_literal(1))],
        }))
    };

    assert_invalid_containing(
        &anonymized(&grouped.total),
        "Anonymized aggregation is not supported without FEATURE_ANONYMIZATION",
    );
    assert_valid_with(&mut validator, &anonymized(&grouped.total));
    assert_invalid_containing_with(
        &mut validator,
        &anonymized(&grouped.group_key),
        &format!("Group selection threshold {} is not an aggregate column", grouped.group_key),
    );
}

#[test]
fn aggregation_threshold_options_follow_the_allow_list() {
    let mut fx = Fixture::new();
    let grouped = Grouped::new(&mut fx);
    let thresholded = |options: Vec<OptionEntry>| {
        let AggregateScan { base, aggregate } = grouped.scan_with(grouped.sum());
        query_stmt(Scan::AggregationThresholdAggregate(AggregationThresholdAggregateScan {
            base,
            aggregate,
            option_list: options,
        }))
    };
    let threshold = || OptionEntry::new("THRESHOLD", int64_literal(50));
    let mut validator = validator_with(&[LanguageFeature::AggregationThreshold]);

    assert_invalid_containing(
        &thresholded(vec![threshold()]),
        "Aggregation threshold aggregation is not supported without FEATURE_AGGREGATION_THRESHOLD",
    );
    assert_valid_with(&mut validator, &thresholded(vec![threshold()]));
    assert_invalid_containing_with(
        &mut validator,
        &thresholded(vec![OptionEntry::new("epsilon", int64_literal(1))]),
        "Option epsilon is not allowed in aggregation threshold options",
    );
    assert_invalid_containing_with(
        &mut validator,
        &thresholded(vec![threshold(), threshold()]),
        "Option THRESHOLD is specified more than once in aggregation threshold options",
    );

    let mut language = validator.language_options().clone();
    language.enable_feature(LanguageFeature::AggregationThreshold);
    let mut narrowed = Validator::new(
        language,
        ValidatorOptions::new().with_allowed_aggregation_threshold_options(["privacy_unit_column"]),
    );
    assert_invalid_containing_with(
        &mut narrowed,
        &thresholded(vec![threshold()]),
        "Option THRESHOLD is not allowed",
    );
}
