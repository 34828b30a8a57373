//! PIVOT and UNPIVOT.

use rustc_hash::FxHashSet;

use crate::ast::column::ResolvedColumn;
use crate::ast::query::{PivotScan, UnpivotScan};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    /// The output is the group-by columns plus one column per
    /// (pivot expression, pivot value) cell, each cell exactly once.
    pub(super) fn validate_pivot_scan(&mut self, scan: &PivotScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::Pivot, "PIVOT")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;

        let mut available = ColumnSet::new();
        for group_by in &scan.group_by_list {
            self.with_context(group_by, |v| {
                v.validate_expr(&input, params, &group_by.expr)?;
                v.check_type_equals(group_by.expr.ty(), &group_by.column.ty, || {
                    format!("PIVOT grouping column {}", group_by.column)
                })?;
                v.check_unique_column_id(&group_by.column)
            })?;
            available = available.with_columns([&group_by.column]);
        }

        ensure(!scan.pivot_expr_list.is_empty(), || "PIVOT has no pivot expressions".to_string())?;
        for pivot_expr in &scan.pivot_expr_list {
            self.validate_aggregate_expr(&input, params, pivot_expr)?;
        }

        self.validate_expr(&input, params, &scan.for_expr)?;
        let for_type = scan.for_expr.ty();
        ensure(for_type.supports_grouping(&self.language), || {
            format!(
                "PIVOT FOR expression has type {}, which does not support grouping",
                self.type_name(for_type)
            )
        })?;

        ensure(!scan.pivot_value_list.is_empty(), || "PIVOT has no IN values".to_string())?;
        let empty = ColumnSet::new();
        for value in &scan.pivot_value_list {
            self.validate_expr(&empty, params, value)?;
            self.check_type_equals(value.ty(), for_type, || "PIVOT IN value".to_string())?;
        }

        let mut cells = FxHashSet::default();
        for pivot_column in &scan.pivot_column_list {
            let column = &pivot_column.column;
            let Some(pivot_expr) = scan.pivot_expr_list.get(pivot_column.pivot_expr_index) else {
                return fail(format!(
                    "Pivot column {column} has pivot expression index {} out of range",
                    pivot_column.pivot_expr_index
                ));
            };
            ensure(pivot_column.pivot_value_index < scan.pivot_value_list.len(), || {
                format!(
                    "Pivot column {column} has pivot value index {} out of range",
                    pivot_column.pivot_value_index
                )
            })?;
            ensure(
                cells.insert((pivot_column.pivot_expr_index, pivot_column.pivot_value_index)),
                || {
                    format!(
                        "Pivot cell ({}, {}) appears more than once",
                        pivot_column.pivot_expr_index, pivot_column.pivot_value_index
                    )
                },
            )?;
            self.check_type_equals(&column.ty, pivot_expr.ty(), || format!("Pivot column {column}"))?;
            self.check_unique_column_id(column)?;
            available = available.with_columns([column]);
        }

        let grid = scan.pivot_expr_list.len() * scan.pivot_value_list.len();
        ensure(cells.len() == grid, || {
            format!("PIVOT defines {} of its {grid} pivot cells", cells.len())
        })?;
        let output = ColumnSet::from_columns(&scan.base.column_list);
        for column in scan
            .group_by_list
            .iter()
            .map(|g| &g.column)
            .chain(scan.pivot_column_list.iter().map(|p| &p.column))
        {
            ensure(output.contains(column), || {
                format!("PIVOT column {column} is missing from the column list")
            })?;
        }
        Ok(available)
    }

    /// Output order: projected input columns, value columns, label column.
    pub(super) fn validate_unpivot_scan(
        &mut self,
        scan: &UnpivotScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::Unpivot, "UNPIVOT")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;

        ensure(!scan.value_column_list.is_empty(), || "UNPIVOT has no value columns".to_string())?;
        self.check_unique_column_ids(&scan.value_column_list)?;
        self.check_unique_column_id(&scan.label_column)?;

        ensure(scan.label_list.len() == scan.unpivot_arg_list.len(), || {
            format!(
                "UNPIVOT has {} labels for {} IN groups",
                scan.label_list.len(),
                scan.unpivot_arg_list.len()
            )
        })?;
        for label in &scan.label_list {
            self.check_type_equals(&label.ty(), &scan.label_column.ty, || {
                format!("UNPIVOT label {label}")
            })?;
        }

        let output = ColumnSet::from_columns(&scan.base.column_list);
        let empty = ColumnSet::new();
        for arg in &scan.unpivot_arg_list {
            ensure(arg.column_list.len() == scan.value_column_list.len(), || {
                format!(
                    "UNPIVOT IN group has {} columns, expected {}",
                    arg.column_list.len(),
                    scan.value_column_list.len()
                )
            })?;
            for (column_ref, value_column) in arg.column_list.iter().zip(&scan.value_column_list) {
                ensure(!column_ref.is_correlated, || {
                    format!("UNPIVOT IN column {} cannot be correlated", column_ref.column)
                })?;
                self.validate_column_ref(&input, &empty, column_ref)?;
                self.check_type_equals(&column_ref.ty, &value_column.ty, || {
                    format!("UNPIVOT IN column {}", column_ref.column)
                })?;
                ensure(!output.contains(&column_ref.column), || {
                    format!("UNPIVOT IN column {} also appears in the output", column_ref.column)
                })?;
            }
        }

        for projected in &scan.projected_input_column_list {
            self.with_context(projected, |v| {
                v.validate_expr(&input, params, &projected.expr)?;
                v.check_type_equals(projected.expr.ty(), &projected.column.ty, || {
                    format!("UNPIVOT projected column {}", projected.column)
                })?;
                v.check_unique_column_id(&projected.column)
            })?;
        }

        let expected: Vec<_> = scan
            .projected_input_column_list
            .iter()
            .map(|p| &p.column)
            .chain(&scan.value_column_list)
            .chain([&scan.label_column])
            .collect();
        let actual: Vec<_> = scan.base.column_list.iter().collect();
        ensure(actual == expected, || {
            let names = |columns: &[&ResolvedColumn]| {
                columns.iter().map(|c| c.debug_string()).collect::<Vec<_>>().join(", ")
            };
            format!(
                "UNPIVOT column list [{}] does not match [{}]",
                names(&actual),
                names(&expected)
            )
        })?;
        Ok(output)
    }
}
