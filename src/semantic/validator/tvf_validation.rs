//! Table-valued function calls.

use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::{RelationSchema, SignatureArgumentKind};
use crate::ast::expression::FunctionArgument;
use crate::ast::query::TvfScan;
use crate::semantic::diag::ValidationResult;

use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    pub(super) fn validate_tvf_scan(&mut self, scan: &TvfScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let name = &scan.tvf.name;
        ensure(scan.signature.is_concrete(), || {
            format!("Signature of table function {name} is not concrete")
        })?;
        let expected = scan.signature.concrete_arguments();
        ensure(scan.argument_list.len() == expected.len(), || {
            format!(
                "Table function {name} has {} arguments, but its signature expects {}",
                scan.argument_list.len(),
                expected.len()
            )
        })?;

        let empty = ColumnSet::new();
        for (index, (arg, signature_arg)) in scan.argument_list.iter().zip(&expected).enumerate() {
            self.with_context(arg, |v| {
                v.validate_function_argument(&empty, params, arg, signature_arg, index, name)?;
                if let (
                    FunctionArgument::Scan {
                        argument_column_list,
                        ..
                    },
                    SignatureArgumentKind::Relation(Some(schema)),
                ) = (arg, &signature_arg.kind)
                {
                    v.check_relation_schema(argument_column_list, schema, index, name)?;
                }
                if let FunctionArgument::Descriptor(descriptor) = arg {
                    for column in &descriptor.descriptor_column_list {
                        check_descriptor_column_source(column, &scan.argument_list, name)?;
                    }
                }
                Ok(())
            })?;
        }

        self.validate_tvf_result_columns(scan)?;
        self.check_unique_column_ids(&scan.base.column_list)?;
        Ok(ColumnSet::from_columns(&scan.base.column_list))
    }

    /// A table argument bound to a fixed schema matches it positionally,
    /// by name (case-insensitive) and type.
    fn check_relation_schema(
        &self,
        columns: &[ResolvedColumn],
        schema: &RelationSchema,
        index: usize,
        callee: &str,
    ) -> ValidationResult<()> {
        ensure(columns.len() == schema.columns.len(), || {
            format!(
                "Table argument {index} of {callee} has {} columns, but its schema requires {}",
                columns.len(),
                schema.columns.len()
            )
        })?;
        for (column, (schema_name, schema_type)) in columns.iter().zip(&schema.columns) {
            if !schema.is_value_table {
                ensure(column.name.eq_ignore_ascii_case(schema_name), || {
                    format!(
                        "Table argument {index} of {callee} has column {column} where the schema requires {schema_name}"
                    )
                })?;
            }
            self.check_type_equals(&column.ty, schema_type, || {
                format!("Column {column} of table argument {index} of {callee}")
            })?;
        }
        Ok(())
    }

    fn validate_tvf_result_columns(&self, scan: &TvfScan) -> ValidationResult<()> {
        let name = &scan.tvf.name;
        let columns = &scan.base.column_list;
        if scan.column_index_list.is_empty() && self.options.allow_legacy_empty_column_index_list {
            return Ok(());
        }
        ensure(scan.column_index_list.len() == columns.len(), || {
            format!(
                "TVFScan of {name} has {} columns but {} column indexes",
                columns.len(),
                scan.column_index_list.len()
            )
        })?;
        let SignatureArgumentKind::Relation(Some(schema)) = &scan.signature.result.kind else {
            return Ok(());
        };
        for (column, &index) in columns.iter().zip(&scan.column_index_list) {
            let Some((_, ty)) = schema.columns.get(index) else {
                return fail(format!(
                    "Column index {index} is out of range for the {} result columns of {name}",
                    schema.columns.len()
                ));
            };
            self.check_type_equals(&column.ty, ty, || format!("Result column {column} of {name}"))?;
        }
        Ok(())
    }
}

/// A resolved descriptor column must come from exactly one table argument
/// of the same call.
fn check_descriptor_column_source(
    column: &ResolvedColumn,
    arguments: &[FunctionArgument],
    callee: &str,
) -> ValidationResult<()> {
    let sources = arguments
        .iter()
        .filter(|arg| match arg {
            FunctionArgument::Scan {
                argument_column_list,
                ..
            } => argument_column_list.contains(column),
            _ => false,
        })
        .count();
    ensure(sources == 1, || {
        format!(
            "Descriptor column {column} of {callee} must come from exactly one table argument, found {sources}"
        )
    })
}
