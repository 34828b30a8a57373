//! Set operations and recursive unions.

use rustc_hash::FxHashSet;

use crate::ast::column::ResolvedColumn;
use crate::ast::expression::Expr;
use crate::ast::query::{
    RecursiveRefScan, RecursiveScan, SetOperationColumnMatchMode,
    SetOperationColumnPropagationMode, SetOperationItem, SetOperationScan,
};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::state::RecursiveScanFrame;
use super::{ColumnSet, Validator, ensure, fail};

/// Features that each permit a recursive scan.
const RECURSION_FEATURES: [LanguageFeature; 3] = [
    LanguageFeature::WithRecursive,
    LanguageFeature::PipeRecursiveUnion,
    LanguageFeature::SqlGraphBoundedPathQuantification,
];

impl Validator {
    pub(super) fn validate_set_operation_scan(
        &mut self,
        scan: &SetOperationScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        ensure(scan.input_item_list.len() >= 2, || {
            format!(
                "Set operation must have at least 2 inputs, found {}",
                scan.input_item_list.len()
            )
        })?;

        match scan.column_match_mode {
            SetOperationColumnMatchMode::ByPosition => {
                ensure(
                    scan.column_propagation_mode == SetOperationColumnPropagationMode::Strict,
                    || {
                        format!(
                            "Set operation BY POSITION requires STRICT column propagation, found {:?}",
                            scan.column_propagation_mode
                        )
                    },
                )?;
            }
            SetOperationColumnMatchMode::Corresponding
            | SetOperationColumnMatchMode::CorrespondingBy => {
                if matches!(
                    scan.column_propagation_mode,
                    SetOperationColumnPropagationMode::Left | SetOperationColumnPropagationMode::Full
                ) {
                    self.check_feature(
                        LanguageFeature::CorrespondingFull,
                        "LEFT or FULL CORRESPONDING",
                    )?;
                }
            }
        }

        let columns = &scan.base.column_list;
        for item in &scan.input_item_list {
            self.validate_set_operation_item(item, columns, params)?;
            if scan.column_match_mode != SetOperationColumnMatchMode::ByPosition {
                check_corresponding_names(&item.output_column_list)?;
            }
        }
        self.check_unique_column_ids(columns)?;
        Ok(ColumnSet::from_columns(columns))
    }

    /// Validates one input and aligns its output columns with `columns`.
    fn validate_set_operation_item(
        &mut self,
        item: &SetOperationItem,
        columns: &[ResolvedColumn],
        params: &ColumnSet,
    ) -> ValidationResult<()> {
        self.with_context(item, |v| {
            v.validate_scan(&item.scan, params)?;
            let produced = ColumnSet::from_columns(item.scan.column_list());
            v.check_columns_available(&item.output_column_list, &produced, "Set operation item")?;
            ensure(item.output_column_list.len() == columns.len(), || {
                format!(
                    "Set operation input produces {} columns, expected {}",
                    item.output_column_list.len(),
                    columns.len()
                )
            })?;
            for (index, (input_column, column)) in
                item.output_column_list.iter().zip(columns).enumerate()
            {
                v.check_type_equals(&input_column.ty, &column.ty, || {
                    format!("Set operation input column {index} ({input_column})")
                })?;
            }
            Ok(())
        })
    }

    // ========================================================================
    // Recursion
    // ========================================================================

    pub(super) fn validate_recursive_scan(
        &mut self,
        scan: &RecursiveScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        if !RECURSION_FEATURES.iter().any(|&f| self.feature_enabled(f)) {
            let names: Vec<_> = RECURSION_FEATURES.iter().map(|f| f.name()).collect();
            return fail(format!(
                "Recursive scan is not supported without one of [{}]",
                names.join(", ")
            ));
        }

        let depth_column_id = scan
            .recursion_depth_modifier
            .as_ref()
            .map(|m| m.recursion_depth_column.column_id);
        let union_columns: Vec<ResolvedColumn> = scan
            .base
            .column_list
            .iter()
            .filter(|c| Some(c.column_id) != depth_column_id)
            .cloned()
            .collect();

        self.validate_set_operation_item(&scan.non_recursive_term, &union_columns, params)?;

        self.state.recursive_scans.push(RecursiveScanFrame {
            expected_columns: union_columns.clone(),
            references: 0,
        });
        let result = self.validate_set_operation_item(&scan.recursive_term, &union_columns, params);
        let frame = self.state.recursive_scans.pop();
        result?;
        let references = frame.map_or(0, |f| f.references);
        match references {
            1 => {}
            0 => return fail("Recursive term does not reference the recursive scan"),
            n => {
                return fail(format!(
                    "Recursive term references the recursive scan {n} times, expected exactly once"
                ));
            }
        }

        if let Some(modifier) = &scan.recursion_depth_modifier {
            let column = &modifier.recursion_depth_column;
            ensure(column.ty.is_int64(), || format!("Recursion depth column {column} must be INT64"))?;
            ensure(scan.base.column_list.contains(column), || {
                format!("Recursion depth column {column} is missing from the column list")
            })?;
            let empty = ColumnSet::new();
            for bound in [&modifier.lower_bound, &modifier.upper_bound].into_iter().flatten() {
                self.validate_int64_constant(&empty, params, bound, "Recursion depth bound")?;
            }
            let literal = |bound: &Option<Box<Expr>>| {
                bound
                    .as_ref()
                    .and_then(|b| b.as_literal())
                    .and_then(|l| l.value.as_i64())
            };
            if let (Some(lower), Some(upper)) =
                (literal(&modifier.lower_bound), literal(&modifier.upper_bound))
            {
                ensure(lower <= upper, || {
                    format!("Recursion depth lower bound {lower} exceeds upper bound {upper}")
                })?;
            }
        }

        self.check_unique_column_ids(&scan.base.column_list)?;
        Ok(ColumnSet::from_columns(&scan.base.column_list))
    }

    /// The back-reference produces fresh columns shaped like the enclosing
    /// recursive scan's union columns.
    pub(super) fn validate_recursive_ref_scan(
        &mut self,
        scan: &RecursiveRefScan,
    ) -> ValidationResult<ColumnSet> {
        let Some(frame) = self.state.recursive_scans.last_mut() else {
            return fail("RecursiveRefScan appears outside the recursive term of a recursive scan");
        };
        frame.references += 1;
        let expected: Vec<_> = frame.expected_columns.iter().map(|c| c.ty.clone()).collect();

        let columns = &scan.base.column_list;
        ensure(columns.len() == expected.len(), || {
            format!(
                "RecursiveRefScan has {} columns, expected {}",
                columns.len(),
                expected.len()
            )
        })?;
        for (column, ty) in columns.iter().zip(&expected) {
            self.check_type_equals(&column.ty, ty, || format!("Recursive reference column {column}"))?;
        }
        self.check_unique_column_ids(columns)?;
        Ok(ColumnSet::from_columns(columns))
    }
}

/// CORRESPONDING matches columns by name, so names must be present and
/// distinct.
fn check_corresponding_names(columns: &[ResolvedColumn]) -> ValidationResult<()> {
    let mut seen = FxHashSet::default();
    for column in columns {
        ensure(!column.name.is_empty() && !column.name.starts_with('$'), || {
            format!("CORRESPONDING input has anonymous column {column}")
        })?;
        ensure(seen.insert(column.name.to_ascii_lowercase()), || {
            format!("CORRESPONDING input has duplicate column name {}", column.name)
        })?;
    }
    Ok(())
}
