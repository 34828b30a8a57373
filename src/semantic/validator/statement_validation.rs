//! Statement dispatch, query statements, batches, scripting and session
//! statements.
//!
//! DDL lives in `ddl_validation`, DML in `dml_validation` and CREATE
//! PROPERTY GRAPH in `graph_validation`.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::ast::descriptors::SignatureArgumentKind;
use crate::ast::expression::Expr;
use crate::ast::program::{
    CreateWithEntryStmt, ExportDataStmt, GeneralizedQueryStmt, MultiStmt, OutputColumn,
    QueryStmt, Statement,
};
use crate::ast::procedure::{AssignmentStmt, CallStmt, ExecuteImmediateStmt};
use crate::ast::query::Scan;
use crate::ast::session::{
    AnalyzeStmt, AuxLoadDataStmt, CloneDataStmt, GrantOrRevokeStmt, ImportKind, ImportStmt,
    ShowStmt,
};
use crate::semantic::diag::ValidationResult;

use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    pub(super) fn validate_statement_internal(&mut self, statement: &Statement) -> ValidationResult<()> {
        self.with_depth(|v| {
            v.with_context(statement, |v| {
                v.validate_statement_kind(statement)?;
                v.validate_option_list(statement.hint_list())
            })
        })
    }

    fn validate_statement_kind(&mut self, statement: &Statement) -> ValidationResult<()> {
        match statement {
            Statement::Query(s) => self.validate_query_stmt(s),
            Statement::GeneralizedQuery(s) => self.validate_generalized_query_stmt(s),
            Statement::Explain(s) => self.validate_statement_internal(&s.statement),
            Statement::Multi(s) => self.validate_multi_stmt(s),
            Statement::CreateWithEntry(s) => self.validate_create_with_entry_stmt(s),

            Statement::CreateDatabase(s) => self.validate_create_database_stmt(s),
            Statement::CreateSchema(s) => self.validate_create_schema_stmt(s),
            Statement::CreateTable(s) => self.validate_create_table_stmt(s),
            Statement::CreateTableAsSelect(s) => self.validate_create_table_as_select_stmt(s, None),
            Statement::CreateExternalTable(s) => self.validate_create_external_table_stmt(s),
            Statement::CreateSnapshotTable(s) => self.validate_create_snapshot_table_stmt(s),
            Statement::CreateView(s) => self.validate_create_view_base(&s.view).map(|_| ()),
            Statement::CreateMaterializedView(s) => self.validate_create_materialized_view_stmt(s),
            Statement::CreateIndex(s) => self.validate_create_index_stmt(s),
            Statement::CreateFunction(s) => self.validate_create_function_stmt(s),
            Statement::CreateTableFunction(s) => self.validate_create_table_function_stmt(s),
            Statement::CreateProcedure(s) => self.validate_create_procedure_stmt(s),
            Statement::CreateConstant(s) => {
                self.validate_create_common(&s.common, "CREATE CONSTANT")?;
                let empty = ColumnSet::new();
                self.validate_expr(&empty, &empty, &s.expr)
            }
            Statement::CreateModel(s) => self.validate_create_model_stmt(s),
            Statement::CreateRowAccessPolicy(s) => self.validate_create_row_access_policy_stmt(s),
            Statement::CreatePrivilegeRestriction(s) => {
                self.validate_create_privilege_restriction_stmt(s)
            }
            Statement::CreateEntity(s) => {
                self.validate_create_common(&s.common, "CREATE ENTITY")?;
                ensure(!s.entity_type.is_empty(), || "CREATE ENTITY requires an entity type".to_string())?;
                self.validate_option_list(&s.option_list)
            }
            Statement::CreateConnection(s) => {
                self.validate_create_common(&s.common, "CREATE CONNECTION")?;
                self.validate_option_list(&s.option_list)
            }
            Statement::CreateSequence(s) => {
                self.validate_create_common(&s.common, "CREATE SEQUENCE")?;
                self.validate_option_list(&s.option_list)
            }
            Statement::CreatePropertyGraph(s) => self.validate_create_property_graph_stmt(s),
            Statement::AlterObject(s) => self.validate_alter_object_stmt(s),
            Statement::AlterAllRowAccessPolicies(s) => {
                self.validate_alter_all_row_access_policies_stmt(s)
            }
            Statement::Rename(s) => {
                ensure(!s.object_type.is_empty(), || "RENAME requires an object type".to_string())?;
                check_name_path(&s.old_name_path, "RENAME source")?;
                check_name_path(&s.new_name_path, "RENAME target")
            }
            Statement::Drop(s)
            | Statement::DropTableFunction(s)
            | Statement::DropMaterializedView(s)
            | Statement::DropSnapshotTable(s) => {
                ensure(!s.object_type.is_empty(), || "DROP requires an object type".to_string())?;
                check_name_path(&s.name_path, "DROP")
            }
            Statement::DropFunction(s) => self.validate_drop_function_stmt(s),
            Statement::DropRowAccessPolicy(s) => self.validate_drop_row_access_policy_stmt(s),
            Statement::DropPrivilegeRestriction(s) => {
                check_name_path(&s.name_path, "DROP PRIVILEGE RESTRICTION")?;
                ensure(!s.column_privilege_list.is_empty(), || {
                    "DROP PRIVILEGE RESTRICTION requires privileges".to_string()
                })
            }
            Statement::DropIndex(s) => {
                ensure(!s.name.is_empty(), || "DROP INDEX requires an index name".to_string())?;
                check_name_path(&s.table_name_path, "DROP INDEX table")
            }
            Statement::Undrop(s) => self.validate_undrop_stmt(s),

            Statement::Insert(s) => self.validate_insert_stmt(s, None),
            Statement::Update(s) => self.validate_update_stmt(s),
            Statement::Delete(s) => self.validate_delete_stmt(s),
            Statement::Merge(s) => self.validate_merge_stmt(s),
            Statement::Truncate(s) => self.validate_truncate_stmt(s),

            Statement::Begin(s) => check_isolation_levels(&s.isolation_level_list),
            Statement::SetTransaction(s) => check_isolation_levels(&s.isolation_level_list),
            Statement::Commit
            | Statement::Rollback
            | Statement::RunBatch
            | Statement::AbortBatch
            | Statement::StartBatch(_) => Ok(()),

            Statement::Assert(s) => {
                let empty = ColumnSet::new();
                self.validate_bool_expr(&empty, &empty, &s.expression, "ASSERT expression")
            }
            Statement::Assignment(s) => self.validate_assignment_stmt(s),
            Statement::ExecuteImmediate(s) => self.validate_execute_immediate_stmt(s),
            Statement::Call(s) => self.validate_call_stmt(s),

            Statement::Describe(s) => {
                ensure(!s.object_type.is_empty(), || "DESCRIBE requires an object type".to_string())?;
                check_name_path(&s.name_path, "DESCRIBE")
            }
            Statement::Show(s) => self.validate_show_stmt(s),
            Statement::DefineTable(s) => {
                check_name_path(&s.name_path, "DEFINE TABLE")?;
                self.validate_option_list(&s.option_list)
            }
            Statement::ExportData(s) => self.validate_export_data_stmt(s, None),
            Statement::ExportModel(s) => {
                check_name_path(&s.model_name_path, "EXPORT MODEL")?;
                check_connection(s.connection.as_ref(), "EXPORT MODEL")?;
                self.validate_option_list(&s.option_list)
            }
            Statement::ExportMetadata(s) => {
                ensure(!s.schema_object_kind.is_empty(), || {
                    "EXPORT METADATA requires an object kind".to_string()
                })?;
                check_name_path(&s.name_path, "EXPORT METADATA")?;
                check_connection(s.connection.as_ref(), "EXPORT METADATA")?;
                self.validate_option_list(&s.option_list)
            }
            Statement::Grant(s) => self.validate_grant_or_revoke_stmt(s, "GRANT"),
            Statement::Revoke(s) => self.validate_grant_or_revoke_stmt(s, "REVOKE"),
            Statement::Analyze(s) => self.validate_analyze_stmt(s),
            Statement::AuxLoadData(s) => self.validate_aux_load_data_stmt(s),
            Statement::CloneData(s) => self.validate_clone_data_stmt(s),
            Statement::Import(s) => self.validate_import_stmt(s),
            Statement::Module(s) => {
                check_name_path(&s.name_path, "MODULE")?;
                self.validate_option_list(&s.option_list)
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn validate_query_stmt(&mut self, stmt: &QueryStmt) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_scan(&stmt.query, &empty)?;
        let produced = ColumnSet::from_columns(stmt.query.column_list());
        self.validate_output_column_list(&stmt.output_column_list, &produced, stmt.is_value_table, "Query")
    }

    /// Pipe FORK, TEE and the terminal pipe operators are only legal while
    /// a generalized query is open.
    fn validate_generalized_query_stmt(&mut self, stmt: &GeneralizedQueryStmt) -> ValidationResult<()> {
        self.state.generalized_query_depth += 1;
        let result = self.validate_generalized_query_body(stmt);
        self.state.generalized_query_depth -= 1;
        result
    }

    fn validate_generalized_query_body(&mut self, stmt: &GeneralizedQueryStmt) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_scan(&stmt.query, &empty)?;
        let produced = ColumnSet::from_columns(stmt.query.column_list());
        match &stmt.output_schema {
            Some(schema) => self.validate_output_schema(schema, &produced, "Generalized query"),
            None => ensure(stmt.query.column_list().is_empty(), || {
                "Generalized query without an output schema must not produce columns".to_string()
            }),
        }
    }

    /// Requires every output column to come from `available`; a value table
    /// has exactly one.
    pub(super) fn validate_output_column_list(
        &self,
        output_columns: &[OutputColumn],
        available: &ColumnSet,
        is_value_table: bool,
        what: &str,
    ) -> ValidationResult<()> {
        ensure(!is_value_table || output_columns.len() == 1, || {
            format!(
                "{what} is a value table but has {} output columns",
                output_columns.len()
            )
        })?;
        for output_column in output_columns {
            ensure(available.contains(&output_column.column), || {
                format!(
                    "{what} output column {} is not produced by its query",
                    output_column.column.debug_string()
                )
            })?;
        }
        Ok(())
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Column ids stay unique and WITH entries stay visible across the
    /// statements of a batch.
    fn validate_multi_stmt(&mut self, stmt: &MultiStmt) -> ValidationResult<()> {
        ensure(!self.state.in_multi_stmt, || "MultiStmt cannot be nested".to_string())?;
        self.state.in_multi_stmt = true;
        let result = self.validate_batch_statements(&stmt.statement_list);
        self.state.in_multi_stmt = false;
        self.state.with_entries.clear();
        self.state.batch_with_entries = 0;
        result
    }

    fn validate_batch_statements(&mut self, statements: &[Statement]) -> ValidationResult<()> {
        for (index, statement) in statements.iter().enumerate() {
            self.trace_batch_statement(index, statement);
            self.validate_statement_internal(statement)?;
            if let Some(message) = self.state.open_scope() {
                return fail(format!("Batch statement {index} left state behind: {message}"));
            }
        }
        Ok(())
    }

    fn validate_create_with_entry_stmt(&mut self, stmt: &CreateWithEntryStmt) -> ValidationResult<()> {
        ensure(self.state.in_multi_stmt, || {
            "CreateWithEntryStmt is only allowed inside a MultiStmt".to_string()
        })?;
        let entry = &stmt.with_entry;
        let duplicate = self
            .state
            .with_entries
            .iter()
            .take(self.state.batch_with_entries)
            .any(|(name, _)| name.eq_ignore_ascii_case(&entry.with_query_name));
        ensure(!duplicate, || {
            format!("Duplicate WITH query name {} in batch", entry.with_query_name)
        })?;
        let empty = ColumnSet::new();
        self.validate_scan(&entry.with_subquery, &empty)?;
        self.state.with_entries.push((
            entry.with_query_name.clone(),
            entry.with_subquery.column_list().to_vec(),
        ));
        self.state.batch_with_entries = self.state.with_entries.len();
        Ok(())
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    fn validate_assignment_stmt(&mut self, stmt: &AssignmentStmt) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        ensure(matches!(stmt.target, Expr::SystemVariable(_)), || {
            format!("Assignment target must be a system variable, found {}", stmt.target.kind_name())
        })?;
        self.validate_expr(&empty, &empty, &stmt.target)?;
        self.validate_expr(&empty, &empty, &stmt.expr)?;
        self.check_type_equals(stmt.expr.ty(), stmt.target.ty(), || "Assigned value".to_string())
    }

    /// USING arguments are either all positional or all named.
    fn validate_execute_immediate_stmt(&mut self, stmt: &ExecuteImmediateStmt) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_expr(&empty, &empty, &stmt.sql)?;
        ensure(stmt.sql.ty().is_string(), || {
            format!("EXECUTE IMMEDIATE SQL must be STRING, found {}", self.type_name(stmt.sql.ty()))
        })?;

        let named = stmt.using_argument_list.iter().filter(|a| !a.name.is_empty()).count();
        ensure(named == 0 || named == stmt.using_argument_list.len(), || {
            "EXECUTE IMMEDIATE mixes named and positional USING arguments".to_string()
        })?;
        let mut names = FxHashSet::default();
        for argument in &stmt.using_argument_list {
            if !argument.name.is_empty() {
                ensure(names.insert(argument.name.to_ascii_lowercase()), || {
                    format!("USING argument {} is specified more than once", argument.name)
                })?;
            }
            self.validate_expr(&empty, &empty, &argument.expression)?;
        }
        check_distinct_names(&stmt.into_identifier_list, "EXECUTE IMMEDIATE INTO")
    }

    fn validate_call_stmt(&mut self, stmt: &CallStmt) -> ValidationResult<()> {
        let name = &stmt.procedure.name;
        ensure(stmt.signature.is_concrete(), || {
            format!("Signature of procedure {name} is not concrete")
        })?;
        let expected = stmt.signature.concrete_arguments();
        ensure(stmt.argument_list.len() == expected.len(), || {
            format!(
                "CALL {name} has {} arguments, but its signature expects {}",
                stmt.argument_list.len(),
                expected.len()
            )
        })?;
        let empty = ColumnSet::new();
        for (index, (argument, signature_arg)) in stmt.argument_list.iter().zip(&expected).enumerate() {
            self.validate_expr(&empty, &empty, argument)?;
            if let SignatureArgumentKind::Fixed(ty) = &signature_arg.kind {
                self.check_type_equals(argument.ty(), ty, || {
                    format!("Argument {index} of procedure {name}")
                })?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Session and administration
    // ========================================================================

    fn validate_show_stmt(&mut self, stmt: &ShowStmt) -> ValidationResult<()> {
        ensure(!stmt.identifier.is_empty(), || "SHOW requires an identifier".to_string())?;
        if let Some(like_expr) = &stmt.like_expr {
            let empty = ColumnSet::new();
            self.validate_expr(&empty, &empty, like_expr)?;
            let is_string_literal = like_expr.as_literal().is_some_and(|l| l.value.as_str().is_some());
            ensure(is_string_literal, || "SHOW LIKE pattern must be a STRING literal".to_string())?;
        }
        Ok(())
    }

    /// The exported rows come from the statement's own query, or from the
    /// pipe input when embedded in pipe EXPORT DATA.
    pub(super) fn validate_export_data_stmt(
        &mut self,
        stmt: &ExportDataStmt,
        pipe_input: Option<&Scan>,
    ) -> ValidationResult<()> {
        check_connection(stmt.connection.as_ref(), "EXPORT DATA")?;
        self.validate_option_list(&stmt.option_list)?;
        let produced = match (&stmt.query, pipe_input) {
            (Some(query), _) => {
                self.validate_statement_query(query, pipe_input)?;
                ColumnSet::from_columns(query.column_list())
            }
            (None, Some(input)) => ColumnSet::from_columns(input.column_list()),
            (None, None) => return fail("EXPORT DATA requires a query"),
        };
        ensure(!stmt.output_column_list.is_empty(), || {
            "EXPORT DATA has no output columns".to_string()
        })?;
        self.validate_output_column_list(&stmt.output_column_list, &produced, stmt.is_value_table, "EXPORT DATA")
    }

    fn validate_grant_or_revoke_stmt(&mut self, stmt: &GrantOrRevokeStmt, what: &str) -> ValidationResult<()> {
        check_name_path(&stmt.name_path, what)?;
        ensure(!stmt.grantee_expr_list.is_empty(), || format!("{what} requires grantees"))?;
        self.validate_grantee_list(&stmt.grantee_expr_list, what)
    }

    /// Grantees are STRING literals or parameters.
    pub(super) fn validate_grantee_list(&mut self, grantees: &[Expr], what: &str) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        for grantee in grantees {
            self.validate_expr(&empty, &empty, grantee)?;
            ensure(grantee.is_literal_or_parameter() && grantee.ty().is_string(), || {
                format!("{what} grantee must be a STRING literal or parameter")
            })?;
        }
        Ok(())
    }

    fn validate_analyze_stmt(&mut self, stmt: &AnalyzeStmt) -> ValidationResult<()> {
        self.validate_option_list(&stmt.option_list)?;
        for info in &stmt.table_and_column_index_list {
            let table = &info.table;
            let mut seen = FxHashSet::default();
            for &index in &info.column_index_list {
                ensure(index < table.num_columns(), || {
                    format!(
                        "ANALYZE column index {index} is out of range for the {} columns of {}",
                        table.num_columns(),
                        table.name
                    )
                })?;
                ensure(seen.insert(index), || {
                    format!("ANALYZE lists column index {index} of {} more than once", table.name)
                })?;
            }
        }
        Ok(())
    }

    fn validate_aux_load_data_stmt(&mut self, stmt: &AuxLoadDataStmt) -> ValidationResult<()> {
        check_name_path(&stmt.name_path, "LOAD DATA")?;
        check_connection(stmt.connection.as_ref(), "LOAD DATA")?;
        let mut defined = self.validate_column_definitions(&stmt.column_definition_list, &[], "LOAD DATA")?;
        self.check_unique_column_ids(&stmt.pseudo_column_list)?;
        defined = defined.with_columns(&stmt.pseudo_column_list);
        if let Some(partition_columns) = &stmt.with_partition_columns {
            let partitions = self.validate_column_definitions(
                &partition_columns.column_definition_list,
                &stmt.column_definition_list,
                "LOAD DATA partition",
            )?;
            defined = defined.union(&partitions);
        }
        self.validate_table_constraints(
            stmt.primary_key.as_ref(),
            &stmt.foreign_key_list,
            &stmt.check_constraint_list,
            &stmt.column_definition_list,
            &defined,
        )?;
        self.validate_partitioning(&stmt.partition_by_list, &stmt.cluster_by_list, &defined)?;
        self.validate_output_column_list(&stmt.output_column_list, &defined, false, "LOAD DATA")?;
        self.validate_option_list(&stmt.option_list)?;
        self.validate_option_list(&stmt.from_files_option_list)
    }

    fn validate_clone_data_stmt(&mut self, stmt: &CloneDataStmt) -> ValidationResult<()> {
        ensure(matches!(stmt.target_table.as_ref(), Scan::Table(_)), || {
            format!("CLONE DATA target must be a TableScan, found {}", stmt.target_table.kind_name())
        })?;
        let empty = ColumnSet::new();
        self.validate_scan(&stmt.target_table, &empty)?;
        self.validate_scan(&stmt.clone_from, &empty)
    }

    fn validate_import_stmt(&mut self, stmt: &ImportStmt) -> ValidationResult<()> {
        match stmt.import_kind {
            ImportKind::Module => {
                check_name_path(&stmt.name_path, "IMPORT MODULE")?;
                ensure(stmt.file_path.is_empty() && stmt.into_alias_path.is_empty(), || {
                    "IMPORT MODULE cannot have a file path or INTO alias".to_string()
                })?;
            }
            ImportKind::Proto => {
                ensure(!stmt.file_path.is_empty(), || "IMPORT PROTO requires a file path".to_string())?;
                ensure(stmt.name_path.is_empty() && stmt.alias_path.is_empty(), || {
                    "IMPORT PROTO cannot have a name path or alias".to_string()
                })?;
            }
        }
        self.validate_option_list(&stmt.option_list)
    }
}

/// Object names must have at least one non-empty component.
pub(super) fn check_name_path(path: &[SmolStr], what: &str) -> ValidationResult<()> {
    ensure(!path.is_empty() && path.iter().all(|part| !part.is_empty()), || {
        format!("{what} requires a non-empty name path")
    })
}

pub(super) fn check_connection(connection: Option<&SmolStr>, what: &str) -> ValidationResult<()> {
    ensure(connection.is_none_or(|c| !c.is_empty()), || {
        format!("{what} connection name must not be empty")
    })
}

pub(super) fn check_distinct_names(names: &[SmolStr], what: &str) -> ValidationResult<()> {
    let mut seen = FxHashSet::default();
    for name in names {
        ensure(!name.is_empty(), || format!("{what} contains an empty name"))?;
        ensure(seen.insert(name.to_ascii_lowercase()), || {
            format!("{what} lists {name} more than once")
        })?;
    }
    Ok(())
}

fn check_isolation_levels(levels: &[SmolStr]) -> ValidationResult<()> {
    ensure(levels.iter().all(|level| !level.is_empty()), || {
        "Transaction isolation level must not be empty".to_string()
    })
}
