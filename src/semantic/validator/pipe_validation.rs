//! Pipe operators and subpipelines.
//!
//! A subpipeline reads the rows of its enclosing pipe through exactly one
//! `SubpipelineInputScan`. The enclosing operator pushes a frame describing
//! its input before validating the subpipeline and pops it afterwards,
//! checking that the input was read.

use crate::ast::query::{
    GeneralizedQuerySubpipeline, LogScan, OutputSchema, PipeCreateTableScan, PipeExportDataScan,
    PipeForkScan, PipeIfScan, PipeInsertScan, PipeTeeScan, Scan, Subpipeline,
    SubpipelineInputScan,
};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::state::SubpipelineFrame;
use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    // ========================================================================
    // Subpipeline protocol
    // ========================================================================

    /// Runs `f` with `input` as the rows a `SubpipelineInputScan` reads,
    /// and requires `f` to have read them exactly once.
    pub(super) fn with_subpipeline_input<T, F>(&mut self, input: &Scan, f: F) -> ValidationResult<T>
    where
        F: FnOnce(&mut Self) -> ValidationResult<T>,
    {
        self.state.subpipelines.push(SubpipelineFrame {
            input_columns: input.column_list().to_vec(),
            input_is_ordered: input.is_ordered(),
            input_seen: false,
        });
        let result = f(self);
        let frame = self.state.subpipelines.pop();
        let value = result?;
        ensure(frame.is_some_and(|f| f.input_seen), || {
            "Subpipeline does not contain a SubpipelineInputScan".to_string()
        })?;
        Ok(value)
    }

    /// Validates a subpipeline fed by `input`.
    pub(super) fn validate_subpipeline(
        &mut self,
        subpipeline: &Subpipeline,
        input: &Scan,
        params: &ColumnSet,
    ) -> ValidationResult<()> {
        self.with_context(subpipeline, |v| {
            v.with_subpipeline_input(input, |v| v.validate_scan(&subpipeline.scan, params))
        })
    }

    /// Validates the query of a statement, which reads `pipe_input` as a
    /// subpipeline when the statement is embedded in a pipe operator.
    pub(super) fn validate_statement_query(
        &mut self,
        query: &Scan,
        pipe_input: Option<&Scan>,
    ) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        match pipe_input {
            Some(input) => self.with_subpipeline_input(input, |v| v.validate_scan(query, &empty)),
            None => self.validate_scan(query, &empty),
        }
    }

    /// The input scan reuses the columns of the enclosing pipe input.
    pub(super) fn validate_subpipeline_input_scan(
        &mut self,
        scan: &SubpipelineInputScan,
    ) -> ValidationResult<ColumnSet> {
        let Some(frame) = self.state.subpipelines.last_mut() else {
            return fail("SubpipelineInputScan appears outside of a subpipeline");
        };
        ensure(!frame.input_seen, || {
            "Subpipeline contains more than one SubpipelineInputScan".to_string()
        })?;
        frame.input_seen = true;
        ensure(!scan.base.is_ordered || frame.input_is_ordered, || {
            "SubpipelineInputScan is ordered but the subpipeline input is not".to_string()
        })?;
        Ok(ColumnSet::from_columns(&frame.input_columns))
    }

    pub(super) fn validate_output_schema(
        &self,
        schema: &OutputSchema,
        available: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        ensure(!schema.output_column_list.is_empty(), || format!("{what} has no output columns"))?;
        ensure(!schema.is_value_table || schema.output_column_list.len() == 1, || {
            format!(
                "{what} is a value table but has {} output columns",
                schema.output_column_list.len()
            )
        })?;
        for output_column in &schema.output_column_list {
            ensure(available.contains(&output_column.column), || {
                format!(
                    "{what} output column {} is not produced by its query",
                    output_column.column
                )
            })?;
        }
        Ok(())
    }

    fn check_in_generalized_query(&self, what: &str) -> ValidationResult<()> {
        ensure(self.state.generalized_query_depth > 0, || {
            format!("{what} is only allowed inside a generalized query statement")
        })
    }

    // ========================================================================
    // Pipe operators
    // ========================================================================

    pub(super) fn validate_log_scan(&mut self, scan: &LogScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeLog, "Pipe LOG")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_subpipeline(&scan.subpipeline, &scan.input_scan, params)?;
        if let Some(schema) = &scan.output_schema {
            let produced = ColumnSet::from_columns(scan.subpipeline.scan.column_list());
            self.validate_output_schema(schema, &produced, "LOG subpipeline")?;
        }
        Ok(input)
    }

    /// Only the statically selected case is resolved; without one, the
    /// input passes through unchanged.
    pub(super) fn validate_pipe_if_scan(
        &mut self,
        scan: &PipeIfScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeIf, "Pipe IF")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        ensure(!scan.if_case_list.is_empty(), || "Pipe IF has no cases".to_string())?;

        let empty = ColumnSet::new();
        let last = scan.if_case_list.len() - 1;
        for (index, case) in scan.if_case_list.iter().enumerate() {
            match &case.condition {
                Some(condition) => {
                    self.validate_bool_expr(&empty, params, condition, "Pipe IF condition")?;
                }
                None => ensure(index == last, || {
                    format!("Pipe IF case {index} has no condition but is not the final ELSE")
                })?,
            }
            ensure(!case.subpipeline_sql.is_empty(), || {
                format!("Pipe IF case {index} has no subpipeline text")
            })?;
            ensure(case.subpipeline.is_none() || scan.selected_case == Some(index), || {
                format!("Pipe IF case {index} is resolved but not selected")
            })?;
        }

        let Some(selected) = scan.selected_case else {
            return Ok(input);
        };
        let Some(case) = scan.if_case_list.get(selected) else {
            return fail(format!(
                "Pipe IF selected case {selected} is out of range for {} cases",
                scan.if_case_list.len()
            ));
        };
        let Some(subpipeline) = &case.subpipeline else {
            return fail(format!("Pipe IF selected case {selected} has no resolved subpipeline"));
        };
        self.validate_subpipeline(subpipeline, &scan.input_scan, params)?;
        Ok(ColumnSet::from_columns(subpipeline.scan.column_list()))
    }

    fn validate_generalized_subpipelines(
        &mut self,
        input: &Scan,
        subpipelines: &[GeneralizedQuerySubpipeline],
        params: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        ensure(!subpipelines.is_empty(), || format!("{what} has no subpipelines"))?;
        for generalized in subpipelines {
            self.with_context(generalized, |v| {
                v.validate_subpipeline(&generalized.subpipeline, input, params)?;
                if let Some(schema) = &generalized.output_schema {
                    let produced =
                        ColumnSet::from_columns(generalized.subpipeline.scan.column_list());
                    v.validate_output_schema(schema, &produced, what)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// FORK ends the main pipe; its results come from the subpipelines.
    pub(super) fn validate_pipe_fork_scan(
        &mut self,
        scan: &PipeForkScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeFork, "Pipe FORK")?;
        self.check_in_generalized_query("Pipe FORK")?;
        self.validate_scan(&scan.input_scan, params)?;
        self.validate_generalized_subpipelines(&scan.input_scan, &scan.subpipeline_list, params, "Pipe FORK")?;
        Ok(ColumnSet::new())
    }

    /// TEE passes its input through after feeding every subpipeline.
    pub(super) fn validate_pipe_tee_scan(
        &mut self,
        scan: &PipeTeeScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeTee, "Pipe TEE")?;
        self.check_in_generalized_query("Pipe TEE")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_generalized_subpipelines(&scan.input_scan, &scan.subpipeline_list, params, "Pipe TEE")?;
        Ok(input)
    }

    pub(super) fn validate_pipe_export_data_scan(
        &mut self,
        scan: &PipeExportDataScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeExportData, "Pipe EXPORT DATA")?;
        self.check_in_generalized_query("Pipe EXPORT DATA")?;
        self.validate_scan(&scan.input_scan, params)?;
        self.validate_export_data_stmt(&scan.export_data_stmt, Some(&scan.input_scan))?;
        Ok(ColumnSet::new())
    }

    pub(super) fn validate_pipe_insert_scan(
        &mut self,
        scan: &PipeInsertScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeInsert, "Pipe INSERT")?;
        self.check_in_generalized_query("Pipe INSERT")?;
        self.validate_scan(&scan.input_scan, params)?;
        self.validate_insert_stmt(&scan.insert_stmt, Some(&scan.input_scan))?;
        Ok(ColumnSet::new())
    }

    pub(super) fn validate_pipe_create_table_scan(
        &mut self,
        scan: &PipeCreateTableScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::PipeCreateTable, "Pipe CREATE TABLE")?;
        self.check_in_generalized_query("Pipe CREATE TABLE")?;
        self.validate_scan(&scan.input_scan, params)?;
        self.validate_create_table_as_select_stmt(
            &scan.create_table_as_select_stmt,
            Some(&scan.input_scan),
        )?;
        Ok(ColumnSet::new())
    }
}
