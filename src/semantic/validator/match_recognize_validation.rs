//! MATCH_RECOGNIZE.
//!
//! Pattern variables are registered in the pass state while the pattern
//! and the MEASURES clause are validated, so that every variable reference
//! resolves against the DEFINE clause of the same scan.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::ast::expression::ColumnRef;
use crate::ast::query::{MatchRecognizePattern, MatchRecognizeScan};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::state::MatchRecognizeState;
use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    pub(super) fn validate_match_recognize_scan(
        &mut self,
        scan: &MatchRecognizeScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::MatchRecognize, "MATCH_RECOGNIZE")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_option_list(&scan.option_list)?;

        if let Some(partition_by) = &scan.partition_by {
            self.validate_window_partitioning(&input, partition_by)?;
            check_distinct_columns(partition_by.partition_by_list.iter(), "PARTITION BY")?;
        }
        let order_by = &scan.order_by;
        self.with_context(order_by, |v| {
            ensure(!order_by.order_by_item_list.is_empty(), || {
                "MATCH_RECOGNIZE requires ORDER BY items".to_string()
            })?;
            let empty = ColumnSet::new();
            for item in &order_by.order_by_item_list {
                ensure(!item.column_ref.is_correlated, || {
                    format!("MATCH_RECOGNIZE ORDER BY column {} cannot be correlated", item.column_ref.column)
                })?;
            }
            v.validate_order_by_items(&input, &empty, &order_by.order_by_item_list)?;
            check_distinct_columns(
                order_by.order_by_item_list.iter().map(|i| &i.column_ref),
                "MATCH_RECOGNIZE ORDER BY",
            )?;
            v.validate_option_list(&order_by.hint_list)
        })?;

        let mut defined_variables = FxHashSet::default();
        for definition in &scan.pattern_variable_definition_list {
            ensure(defined_variables.insert(lowercase(&definition.name)), || {
                format!("Pattern variable {} is defined more than once", definition.name)
            })?;
            self.validate_bool_expr(
                &input,
                params,
                &definition.predicate,
                "Pattern variable definition",
            )?;
        }

        ensure(self.state.match_recognize.is_none(), || {
            "MATCH_RECOGNIZE cannot be nested inside the measures of another MATCH_RECOGNIZE"
                .to_string()
        })?;
        self.state.match_recognize = Some(MatchRecognizeState { defined_variables });
        let result = self.validate_match_recognize_body(scan, &input, params);
        self.state.match_recognize = None;
        result
    }

    fn validate_match_recognize_body(
        &mut self,
        scan: &MatchRecognizeScan,
        input: &ColumnSet,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.validate_pattern(&scan.pattern, params)?;

        for (column, what) in [
            (&scan.match_number_column, "match number"),
            (&scan.match_row_number_column, "match row number"),
        ] {
            ensure(column.ty.is_int64(), || format!("MATCH_RECOGNIZE {what} column {column} must be INT64"))?;
        }
        ensure(scan.classifier_column.ty.is_string(), || {
            format!(
                "MATCH_RECOGNIZE classifier column {} must be STRING",
                scan.classifier_column
            )
        })?;
        let synthesized = [
            &scan.match_number_column,
            &scan.match_row_number_column,
            &scan.classifier_column,
        ];
        self.check_unique_column_ids(synthesized)?;
        let measure_visible = input.with_columns(synthesized);

        let mut has_universal_group = false;
        let mut named_groups = FxHashSet::default();
        let mut available = measure_visible.clone();
        for group in &scan.measure_group_list {
            match &group.pattern_variable_ref {
                None => {
                    ensure(!has_universal_group, || {
                        "MATCH_RECOGNIZE has more than one measure group without a pattern variable"
                            .to_string()
                    })?;
                    has_universal_group = true;
                }
                Some(name) => {
                    ensure(self.is_pattern_variable_defined(name), || {
                        format!("Measure group references undefined pattern variable {name}")
                    })?;
                    ensure(named_groups.insert(lowercase(name)), || {
                        format!("Pattern variable {name} has more than one measure group")
                    })?;
                }
            }
            for computed in &group.aggregate_list {
                self.validate_aggregate_computed_column(&measure_visible, params, computed)?;
                available = available.with_columns([computed.column()]);
            }
        }
        Ok(available)
    }

    fn is_pattern_variable_defined(&self, name: &str) -> bool {
        self.state
            .match_recognize
            .as_ref()
            .is_some_and(|state| state.defined_variables.contains(&lowercase(name)))
    }

    fn validate_pattern(&mut self, pattern: &MatchRecognizePattern, params: &ColumnSet) -> ValidationResult<()> {
        self.with_depth(|v| {
            v.with_context(pattern, |v| match pattern {
                MatchRecognizePattern::Empty | MatchRecognizePattern::Anchor(_) => Ok(()),
                MatchRecognizePattern::VariableRef(name) => ensure(v.is_pattern_variable_defined(name), || {
                    format!("Pattern variable {name} is not defined")
                }),
                MatchRecognizePattern::Operation { op_type, operand_list } => {
                    ensure(operand_list.len() >= 2, || {
                        format!(
                            "Pattern {op_type:?} must have at least 2 operands, found {}",
                            operand_list.len()
                        )
                    })?;
                    for operand in operand_list {
                        v.validate_pattern(operand, params)?;
                    }
                    Ok(())
                }
                MatchRecognizePattern::Quantification {
                    operand,
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    v.validate_pattern(operand, params)?;
                    let empty = ColumnSet::new();
                    let mut literal_bounds = [None, None];
                    for (slot, bound) in literal_bounds.iter_mut().zip([lower_bound, upper_bound]) {
                        if let Some(bound) = bound {
                            v.validate_int64_constant(&empty, params, bound, "Pattern quantifier bound")?;
                            *slot = bound.as_literal().and_then(|l| l.value.as_i64());
                        }
                    }
                    match literal_bounds {
                        [Some(lower), Some(upper)] if lower > upper => fail(format!(
                            "Pattern quantifier lower bound {lower} exceeds upper bound {upper}"
                        )),
                        _ => Ok(()),
                    }
                }
            })
        })
    }
}

fn lowercase(name: &str) -> SmolStr {
    SmolStr::new(name.to_ascii_lowercase())
}

fn check_distinct_columns<'a, I>(column_refs: I, what: &str) -> ValidationResult<()>
where
    I: Iterator<Item = &'a ColumnRef>,
{
    let mut seen = FxHashSet::default();
    for column_ref in column_refs {
        ensure(seen.insert(column_ref.column.column_id), || {
            format!("{what} lists column {} more than once", column_ref.column)
        })?;
    }
    Ok(())
}
