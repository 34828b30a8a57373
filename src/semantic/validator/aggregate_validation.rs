//! Aggregate scan validation.
//!
//! Covers plain aggregation, grouping sets (ROLLUP, CUBE and the legacy
//! rollup column list), and the anonymized, differential privacy and
//! aggregation threshold variants. Each function returns the columns the
//! scan makes available to its `column_list`.

use rustc_hash::FxHashSet;

use crate::ast::expression::{ColumnRef, ComputedColumnBase, Expr, FunctionCall};
use crate::ast::program::OptionEntry;
use crate::ast::query::{
    AggregateScanBase, AggregationThresholdAggregateScan, AnonymizedAggregateScan,
    DifferentialPrivacyAggregateScan, GroupingSetBase,
};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

/// Option that switches the group selection threshold to its two-column form.
const MIN_PRIVACY_UNITS_PER_GROUP: &str = "min_privacy_units_per_group";

/// Subtraction the rewriter applies to the noisy privacy unit count.
const SAFE_SUBTRACT: &str = "safe_subtract";

/// Measure aggregation, which privacy-aware aggregation cannot evaluate.
const MEASURE_AGGREGATE: &str = "AGG";

impl Validator {
    /// Validates the parts shared by every aggregate scan kind.
    pub(super) fn validate_aggregate_scan_base(
        &mut self,
        aggregate: &AggregateScanBase,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.validate_scan(&aggregate.input_scan, params)?;
        let input = ColumnSet::from_columns(aggregate.input_scan.column_list());

        let mut available = ColumnSet::new();
        for group_by in &aggregate.group_by_list {
            self.with_context(group_by, |v| {
                v.validate_expr(&input, params, &group_by.expr)?;
                v.check_type_equals(group_by.expr.ty(), &group_by.column.ty, || {
                    format!("Grouping column {}", group_by.column)
                })?;
                ensure(group_by.column.ty.supports_grouping(&v.language), || {
                    format!(
                        "Grouping column {} has type {}, which does not support grouping",
                        group_by.column,
                        v.type_name(&group_by.column.ty)
                    )
                })?;
                v.check_unique_column_id(&group_by.column)
            })?;
            available = available.with_columns([&group_by.column]);
        }

        if !aggregate.collation_list.is_empty() {
            self.check_feature(LanguageFeature::CollationSupport, "GROUP BY collation")?;
            ensure(aggregate.collation_list.len() <= aggregate.group_by_list.len(), || {
                format!(
                    "GROUP BY has {} collations for {} grouping columns",
                    aggregate.collation_list.len(),
                    aggregate.group_by_list.len()
                )
            })?;
        }

        for computed in &aggregate.aggregate_list {
            self.validate_aggregate_computed_column(&input, params, computed)?;
            available = available.with_columns([computed.column()]);
            if let ComputedColumnBase::Deferred(deferred) = computed {
                available = available.with_columns([&deferred.side_effect_column]);
            }
        }

        self.validate_grouping_sets(aggregate)?;

        let group_by_ids: FxHashSet<i64> = aggregate
            .group_by_list
            .iter()
            .map(|g| g.column.column_id)
            .collect();
        for grouping_call in &aggregate.grouping_call_list {
            let argument = &grouping_call.group_by_column;
            ensure(group_by_ids.contains(&argument.column.column_id), || {
                format!("GROUPING argument {} is not a grouping column", argument.column)
            })?;
            ensure(grouping_call.output_column.ty.is_int64(), || {
                format!("GROUPING output column {} must be INT64", grouping_call.output_column)
            })?;
            self.check_unique_column_id(&grouping_call.output_column)?;
            available = available.with_columns([&grouping_call.output_column]);
        }
        Ok(available)
    }

    fn validate_grouping_sets(&mut self, aggregate: &AggregateScanBase) -> ValidationResult<()> {
        if !aggregate.rollup_column_list.is_empty() {
            return self.validate_legacy_rollup(aggregate);
        }
        if aggregate.grouping_set_list.is_empty() {
            return Ok(());
        }

        let group_by_ids: FxHashSet<i64> = aggregate
            .group_by_list
            .iter()
            .map(|g| g.column.column_id)
            .collect();
        let mut covered = FxHashSet::default();
        let mut check_member = |column_ref: &ColumnRef| -> ValidationResult<()> {
            ensure(!column_ref.is_correlated, || {
                format!("Grouping set column {} cannot be correlated", column_ref.column)
            })?;
            ensure(group_by_ids.contains(&column_ref.column.column_id), || {
                format!("Grouping set column {} is not a grouping column", column_ref.column)
            })?;
            covered.insert(column_ref.column.column_id);
            Ok(())
        };

        for grouping_set in &aggregate.grouping_set_list {
            match grouping_set {
                GroupingSetBase::GroupingSet(columns) => {
                    if !self.feature_enabled(LanguageFeature::GroupingSets) {
                        return fail(format!(
                            "GROUPING SETS is not supported without {}",
                            LanguageFeature::GroupingSets
                        ));
                    }
                    columns.iter().try_for_each(&mut check_member)?;
                }
                GroupingSetBase::Rollup(items) | GroupingSetBase::Cube(items) => {
                    let (feature, what) = match grouping_set {
                        GroupingSetBase::Cube(_) => (LanguageFeature::Cube, "CUBE"),
                        _ => (LanguageFeature::Rollup, "ROLLUP"),
                    };
                    if !self.feature_enabled(feature) {
                        return fail(format!("{what} is not supported without {feature}"));
                    }
                    ensure(!items.is_empty(), || format!("{what} must list at least one column"))?;
                    for item in items {
                        ensure(!item.column_list.is_empty(), || {
                            format!("{what} item must contain at least one column")
                        })?;
                        item.column_list.iter().try_for_each(&mut check_member)?;
                    }
                }
            }
        }

        for group_by in &aggregate.group_by_list {
            ensure(covered.contains(&group_by.column.column_id), || {
                format!(
                    "Grouping column {} does not appear in any grouping set",
                    group_by.column
                )
            })?;
        }
        Ok(())
    }

    /// The legacy ROLLUP form lists every prefix of `rollup_column_list`
    /// as a grouping set, longest first, ending with the empty set.
    fn validate_legacy_rollup(&self, aggregate: &AggregateScanBase) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::Rollup, "ROLLUP")?;
        let group_by_ids: FxHashSet<i64> = aggregate
            .group_by_list
            .iter()
            .map(|g| g.column.column_id)
            .collect();
        for column_ref in &aggregate.rollup_column_list {
            ensure(group_by_ids.contains(&column_ref.column.column_id), || {
                format!("ROLLUP column {} is not a grouping column", column_ref.column)
            })?;
        }
        let rollup_len = aggregate.rollup_column_list.len();
        ensure(aggregate.grouping_set_list.len() == rollup_len + 1, || {
            format!(
                "ROLLUP of {rollup_len} columns must have {} grouping sets, found {}",
                rollup_len + 1,
                aggregate.grouping_set_list.len()
            )
        })?;
        for (index, grouping_set) in aggregate.grouping_set_list.iter().enumerate() {
            let GroupingSetBase::GroupingSet(columns) = grouping_set else {
                return fail("ROLLUP column list can only be combined with plain grouping sets");
            };
            let prefix: FxHashSet<i64> = aggregate.rollup_column_list[..rollup_len - index]
                .iter()
                .map(|c| c.column.column_id)
                .collect();
            let actual: FxHashSet<i64> = columns.iter().map(|c| c.column.column_id).collect();
            ensure(actual == prefix && columns.len() == prefix.len(), || {
                format!("Grouping set {index} does not match ROLLUP prefix of length {}", prefix.len())
            })?;
        }
        Ok(())
    }

    // ========================================================================
    // Privacy-aware aggregation
    // ========================================================================

    /// Restrictions shared by the privacy-aware aggregate scans.
    fn check_privacy_aggregate_list(
        &self,
        aggregate: &AggregateScanBase,
        what: &str,
    ) -> ValidationResult<()> {
        for computed in &aggregate.aggregate_list {
            let Expr::AggregateFunctionCall(call) = computed.expr() else {
                continue;
            };
            ensure(!call.is_multi_level(), || {
                format!("{what} does not support multi-level aggregation")
            })?;
            ensure(
                !call.base.function_name().eq_ignore_ascii_case(MEASURE_AGGREGATE),
                || format!("{what} does not support {MEASURE_AGGREGATE}()"),
            )?;
        }
        Ok(())
    }

    pub(super) fn validate_anonymized_aggregate_scan(
        &mut self,
        scan: &AnonymizedAggregateScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::Anonymization, "Anonymized aggregation")?;
        let available = self.validate_aggregate_scan_base(&scan.aggregate, params)?;
        self.check_privacy_aggregate_list(&scan.aggregate, "Anonymized aggregation")?;
        let allowed = self.options.allowed_anonymization_options.clone();
        self.check_allowed_options(
            &scan.anonymization_option_list,
            &allowed,
            "anonymization options",
        )?;
        self.validate_option_list(&scan.anonymization_option_list)?;
        if let Some(threshold) = &scan.k_threshold_expr {
            self.validate_threshold_column_ref(&available, params, threshold, &scan.aggregate)?;
        }
        Ok(available)
    }

    pub(super) fn validate_differential_privacy_aggregate_scan(
        &mut self,
        scan: &DifferentialPrivacyAggregateScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(
            LanguageFeature::DifferentialPrivacy,
            "Differential privacy aggregation",
        )?;
        let available = self.validate_aggregate_scan_base(&scan.aggregate, params)?;
        self.check_privacy_aggregate_list(&scan.aggregate, "Differential privacy aggregation")?;
        let allowed = self.options.allowed_differential_privacy_options.clone();
        self.check_allowed_options(&scan.option_list, &allowed, "differential privacy options")?;
        self.validate_option_list(&scan.option_list)?;
        if let Some(threshold) = &scan.group_selection_threshold_expr {
            self.with_context(threshold.as_ref(), |v| {
                if has_option(&scan.option_list, MIN_PRIVACY_UNITS_PER_GROUP) {
                    v.validate_min_privacy_units_threshold(
                        &available,
                        params,
                        threshold,
                        &scan.aggregate,
                    )
                } else {
                    v.validate_threshold_column_ref(&available, params, threshold, &scan.aggregate)
                }
            })?;
        }
        Ok(available)
    }

    pub(super) fn validate_aggregation_threshold_aggregate_scan(
        &mut self,
        scan: &AggregationThresholdAggregateScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(
            LanguageFeature::AggregationThreshold,
            "Aggregation threshold aggregation",
        )?;
        let available = self.validate_aggregate_scan_base(&scan.aggregate, params)?;
        self.check_privacy_aggregate_list(&scan.aggregate, "Aggregation threshold aggregation")?;
        let allowed = self.options.allowed_aggregation_threshold_options.clone();
        self.check_allowed_options(&scan.option_list, &allowed, "aggregation threshold options")?;
        self.validate_option_list(&scan.option_list)?;
        Ok(available)
    }

    /// A threshold that is a plain INT64 reference to an aggregate column.
    fn validate_threshold_column_ref(
        &mut self,
        available: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
        aggregate: &AggregateScanBase,
    ) -> ValidationResult<()> {
        self.validate_expr(available, params, expr)?;
        check_aggregate_column_ref(expr, aggregate, "Group selection threshold")
    }

    /// `IF($greater_or_equal(exact_units, min_units),
    /// SAFE_SUBTRACT(noisy_count, offset), NULL)`.
    fn validate_min_privacy_units_threshold(
        &mut self,
        available: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
        aggregate: &AggregateScanBase,
    ) -> ValidationResult<()> {
        self.validate_expr(available, params, expr)?;
        let Some(if_call) = expr.as_function_call().filter(|c| is_named(c, "if")) else {
            return fail(format!(
                "Group selection threshold with {MIN_PRIVACY_UNITS_PER_GROUP} must be an IF call, found {}",
                expr.kind_name()
            ));
        };
        ensure(expr.ty().is_int64(), || "Group selection threshold must be INT64".to_string())?;
        let [condition, noisy_count, otherwise] = if_call.base.argument_list.as_slice() else {
            return fail("Group selection threshold IF must have 3 arguments");
        };

        let Some(comparison) = condition
            .as_function_call()
            .filter(|c| is_named(c, "$greater_or_equal"))
        else {
            return fail("Group selection threshold condition must be $greater_or_equal");
        };
        let [exact_units, min_units] = comparison.base.argument_list.as_slice() else {
            return fail("Group selection threshold comparison must have 2 arguments");
        };
        check_aggregate_column_ref(exact_units, aggregate, "Exact privacy unit count")?;
        ensure(min_units.is_literal_or_parameter(), || {
            format!(
                "{MIN_PRIVACY_UNITS_PER_GROUP} threshold must be a literal or parameter, found {}",
                min_units.kind_name()
            )
        })?;
        check_noisy_count(noisy_count, aggregate)?;
        ensure(
            otherwise.as_literal().is_some_and(|l| l.value.is_null()),
            || "Group selection threshold must be NULL when the condition fails".to_string(),
        )
    }
}

fn is_named(call: &FunctionCall, name: &str) -> bool {
    call.base.function_name().eq_ignore_ascii_case(name)
}

/// `SAFE_SUBTRACT(ColumnRef noisy_count, Literal offset)`, both INT64.
fn check_noisy_count(expr: &Expr, aggregate: &AggregateScanBase) -> ValidationResult<()> {
    let Some(subtract) = expr.as_function_call().filter(|c| is_named(c, SAFE_SUBTRACT)) else {
        return fail(format!(
            "Group selection threshold must compute the noisy count with {SAFE_SUBTRACT}, found {}",
            expr.kind_name()
        ));
    };
    ensure(expr.ty().is_int64(), || format!("{SAFE_SUBTRACT} of the noisy count must be INT64"))?;
    let [noisy_count, offset] = subtract.base.argument_list.as_slice() else {
        return fail(format!("{SAFE_SUBTRACT} of the noisy count must have 2 arguments"));
    };
    check_aggregate_column_ref(noisy_count, aggregate, "Noisy privacy unit count")?;
    ensure(
        offset
            .as_literal()
            .is_some_and(|l| !l.value.is_null() && offset.ty().is_int64()),
        || {
            format!(
                "{SAFE_SUBTRACT} offset must be a non-NULL INT64 literal, found {}",
                offset.kind_name()
            )
        },
    )
}

fn has_option(options: &[OptionEntry], name: &str) -> bool {
    options.iter().any(|o| o.name.eq_ignore_ascii_case(name))
}

fn check_aggregate_column_ref(
    expr: &Expr,
    aggregate: &AggregateScanBase,
    what: &str,
) -> ValidationResult<()> {
    let Some(column_ref) = expr.as_column_ref() else {
        return fail(format!("{what} must be a ColumnRef, found {}", expr.kind_name()));
    };
    ensure(column_ref.ty.is_int64(), || format!("{what} must be INT64"))?;
    ensure(
        aggregate
            .aggregate_list
            .iter()
            .any(|c| c.column().column_id == column_ref.column.column_id),
        || format!("{what} {} is not an aggregate column", column_ref.column),
    )
}
