//! CREATE, ALTER, DROP and UNDROP statements.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::ast::catalog::{
    AlterAction, AlterAllRowAccessPoliciesStmt, AlterObjectKind, AlterObjectStmt,
    CheckConstraint, ColumnAnnotations, ColumnDefinition, CreateCommon, CreateDatabaseStmt,
    CreateExternalTableStmt, CreateFunctionStmt, CreateIndexStmt, CreateMaterializedViewStmt,
    CreateModelStmt, CreatePrivilegeRestrictionStmt, CreateProcedureStmt,
    CreateRowAccessPolicyStmt, CreateSchemaStmt, CreateSnapshotTableStmt,
    CreateTableAsSelectStmt, CreateTableBase, CreateTableFunctionStmt, CreateTableStmt,
    CreateViewBase, DropFunctionStmt, DropRowAccessPolicyStmt, ForeignKey, PrimaryKey,
    UndropStmt,
};
use crate::ast::descriptors::SignatureArgumentKind;
use crate::ast::expression::Expr;
use crate::ast::program::OutputColumn;
use crate::ast::query::Scan;
use crate::ast::types::{Type, TypeParameters};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::statement_validation::{check_connection, check_distinct_names, check_name_path};
use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    pub(super) fn validate_create_common(&self, common: &CreateCommon, what: &str) -> ValidationResult<()> {
        check_name_path(&common.name_path, what)
    }

    pub(super) fn validate_create_database_stmt(&mut self, stmt: &CreateDatabaseStmt) -> ValidationResult<()> {
        check_name_path(&stmt.name_path, "CREATE DATABASE")?;
        self.validate_option_list(&stmt.option_list)
    }

    pub(super) fn validate_create_schema_stmt(&mut self, stmt: &CreateSchemaStmt) -> ValidationResult<()> {
        self.validate_create_common(&stmt.common, "CREATE SCHEMA")?;
        if let Some(collation_name) = &stmt.collation_name {
            self.validate_collation_name(collation_name, "CREATE SCHEMA")?;
        }
        self.validate_option_list(&stmt.option_list)
    }

    /// Default collation names are STRING literals or parameters.
    fn validate_collation_name(&mut self, collation_name: &Expr, what: &str) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::CollationSupport, &format!("{what} collation"))?;
        let empty = ColumnSet::new();
        self.validate_expr(&empty, &empty, collation_name)?;
        ensure(collation_name.is_literal_or_parameter() && collation_name.ty().is_string(), || {
            format!("{what} collation must be a STRING literal or parameter")
        })
    }

    // ========================================================================
    // Tables
    // ========================================================================

    pub(super) fn validate_create_table_stmt(&mut self, stmt: &CreateTableStmt) -> ValidationResult<()> {
        let defined = self.validate_create_table_base(&stmt.table, "CREATE TABLE")?;
        ensure(stmt.clone_from.is_none() || stmt.copy_from.is_none(), || {
            "CREATE TABLE cannot have both CLONE and COPY sources".to_string()
        })?;
        let empty = ColumnSet::new();
        for source in [&stmt.clone_from, &stmt.copy_from].into_iter().flatten() {
            self.validate_scan(source, &empty)?;
        }
        self.validate_partitioning(&stmt.partition_by_list, &stmt.cluster_by_list, &defined)
    }

    /// Validates the shared CREATE TABLE fields and returns the columns the
    /// table defines.
    fn validate_create_table_base(&mut self, table: &CreateTableBase, what: &str) -> ValidationResult<ColumnSet> {
        self.validate_create_common(&table.common, what)?;
        self.validate_option_list(&table.option_list)?;
        if let Some(collation_name) = &table.collation_name {
            self.validate_collation_name(collation_name, what)?;
        }
        let mut defined = self.validate_column_definitions(&table.column_definition_list, &[], what)?;
        self.check_unique_column_ids(&table.pseudo_column_list)?;
        defined = defined.with_columns(&table.pseudo_column_list);
        self.validate_table_constraints(
            table.primary_key.as_ref(),
            &table.foreign_key_list,
            &table.check_constraint_list,
            &table.column_definition_list,
            &defined,
        )?;
        Ok(defined)
    }

    /// Column names are distinct (case-insensitively) among `definitions`
    /// and `existing`. Generated expressions see every defined column;
    /// defaults see none.
    pub(super) fn validate_column_definitions(
        &mut self,
        definitions: &[ColumnDefinition],
        existing: &[ColumnDefinition],
        what: &str,
    ) -> ValidationResult<ColumnSet> {
        let mut names: FxHashSet<String> =
            existing.iter().map(|d| d.name.to_ascii_lowercase()).collect();
        for definition in definitions {
            ensure(!definition.name.is_empty(), || format!("{what} has a column without a name"))?;
            ensure(names.insert(definition.name.to_ascii_lowercase()), || {
                format!("{what} defines column {} more than once", definition.name)
            })?;
        }

        let defined = ColumnSet::from_columns(definitions.iter().map(|d| &d.column));
        for definition in definitions {
            self.validate_column_definition(definition, &defined)?;
        }
        Ok(defined)
    }

    fn validate_column_definition(
        &mut self,
        definition: &ColumnDefinition,
        defined: &ColumnSet,
    ) -> ValidationResult<()> {
        let name = &definition.name;
        self.check_type_equals(&definition.column.ty, &definition.ty, || {
            format!("Column definition {name}")
        })?;
        self.check_unique_column_id(&definition.column)?;
        if let Some(annotations) = &definition.annotations {
            self.validate_column_annotations(annotations, &definition.ty, name)?;
        }

        let empty = ColumnSet::new();
        match (&definition.generated_column_info, &definition.default_value) {
            (Some(_), Some(_)) => {
                return fail(format!("Column {name} cannot be both generated and defaulted"));
            }
            (Some(generated), None) => {
                self.validate_expr(defined, &empty, &generated.expression)?;
                self.check_type_equals(generated.expression.ty(), &definition.ty, || {
                    format!("Generated expression of column {name}")
                })?;
            }
            (None, Some(default_value)) => {
                ensure(!default_value.sql.is_empty(), || {
                    format!("Default value of column {name} has no SQL text")
                })?;
                self.validate_expr(&empty, &empty, &default_value.expression)?;
                self.check_type_equals(default_value.expression.ty(), &definition.ty, || {
                    format!("Default value of column {name}")
                })?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Annotations mirror the nesting of the column type.
    fn validate_column_annotations(
        &mut self,
        annotations: &ColumnAnnotations,
        ty: &Type,
        column: &str,
    ) -> ValidationResult<()> {
        if let Some(collation_name) = &annotations.collation_name {
            ensure(ty.is_string(), || {
                format!("Collation on column {column} requires STRING, found {}", self.type_name(ty))
            })?;
            self.validate_collation_name(collation_name, "Column")?;
        }
        if let Some(parameters) = &annotations.type_parameters {
            self.validate_type_parameters(parameters, ty, column)?;
        }
        self.validate_option_list(&annotations.option_list)?;

        if annotations.child_list.is_empty() {
            return Ok(());
        }
        let child_types: Vec<&Type> = match ty {
            Type::Struct(s) => s.fields.iter().map(|f| f.ty.as_ref()).collect(),
            Type::Array(a) => vec![a.element_type.as_ref()],
            _ => {
                return fail(format!(
                    "Column {column} of type {} cannot have nested annotations",
                    self.type_name(ty)
                ));
            }
        };
        ensure(annotations.child_list.len() <= child_types.len(), || {
            format!(
                "Column {column} has {} nested annotations for {} children",
                annotations.child_list.len(),
                child_types.len()
            )
        })?;
        for (child, child_type) in annotations.child_list.iter().zip(child_types) {
            self.validate_column_annotations(child, child_type, column)?;
        }
        Ok(())
    }

    fn validate_type_parameters(&self, parameters: &TypeParameters, ty: &Type, column: &str) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::ParameterizedTypes, "Type parameters")?;
        ensure(parameters.matches_type(ty), || {
            format!(
                "Type parameters of column {column} do not match type {}",
                self.type_name(ty)
            )
        })
    }

    pub(super) fn validate_table_constraints(
        &mut self,
        primary_key: Option<&PrimaryKey>,
        foreign_keys: &[ForeignKey],
        check_constraints: &[CheckConstraint],
        definitions: &[ColumnDefinition],
        defined: &ColumnSet,
    ) -> ValidationResult<()> {
        if let Some(primary_key) = primary_key {
            self.validate_primary_key(primary_key, Some(definitions))?;
        }
        for foreign_key in foreign_keys {
            self.validate_foreign_key(foreign_key, Some(definitions))?;
        }
        let mut names = FxHashSet::default();
        for constraint in check_constraints {
            self.validate_check_constraint(constraint, defined)?;
            if !constraint.constraint_name.is_empty() {
                ensure(names.insert(constraint.constraint_name.to_ascii_lowercase()), || {
                    format!("Constraint {} is defined more than once", constraint.constraint_name)
                })?;
            }
        }
        Ok(())
    }

    /// Offsets index `definitions` when the statement defines columns;
    /// ALTER TABLE ADD PRIMARY KEY names its columns instead.
    fn validate_primary_key(
        &mut self,
        primary_key: &PrimaryKey,
        definitions: Option<&[ColumnDefinition]>,
    ) -> ValidationResult<()> {
        self.validate_option_list(&primary_key.option_list)?;
        let Some(definitions) = definitions else {
            return check_distinct_names(&primary_key.column_name_list, "PRIMARY KEY");
        };
        ensure(primary_key.column_offset_list.len() == primary_key.column_name_list.len(), || {
            format!(
                "PRIMARY KEY has {} offsets and {} names",
                primary_key.column_offset_list.len(),
                primary_key.column_name_list.len()
            )
        })?;
        let mut seen = FxHashSet::default();
        for (&offset, name) in primary_key.column_offset_list.iter().zip(&primary_key.column_name_list) {
            let Some(definition) = definitions.get(offset) else {
                return fail(format!(
                    "PRIMARY KEY column offset {offset} is out of range for {} columns",
                    definitions.len()
                ));
            };
            ensure(definition.name.eq_ignore_ascii_case(name), || {
                format!("PRIMARY KEY column {name} does not match column {}", definition.name)
            })?;
            ensure(seen.insert(offset), || format!("PRIMARY KEY lists column {name} more than once"))?;
            ensure(definition.ty.supports_grouping(&self.language), || {
                format!(
                    "PRIMARY KEY column {name} has type {}, which does not support grouping",
                    self.type_name(&definition.ty)
                )
            })?;
        }
        Ok(())
    }

    fn validate_foreign_key(
        &mut self,
        foreign_key: &ForeignKey,
        definitions: Option<&[ColumnDefinition]>,
    ) -> ValidationResult<()> {
        self.validate_option_list(&foreign_key.option_list)?;
        let referenced = &foreign_key.referenced_table;
        ensure(!foreign_key.referenced_column_offset_list.is_empty(), || {
            "FOREIGN KEY has no referenced columns".to_string()
        })?;
        let referenced_types = foreign_key
            .referenced_column_offset_list
            .iter()
            .map(|&offset| match referenced.column(offset) {
                Some(column) => Ok(column.ty.clone()),
                None => fail(format!(
                    "FOREIGN KEY referenced offset {offset} is out of range for table {}",
                    referenced.name
                )),
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        let Some(definitions) = definitions else {
            return ensure(
                foreign_key.referencing_column_list.len() == referenced_types.len(),
                || {
                    format!(
                        "FOREIGN KEY has {} referencing and {} referenced columns",
                        foreign_key.referencing_column_list.len(),
                        referenced_types.len()
                    )
                },
            );
        };
        ensure(foreign_key.referencing_column_offset_list.len() == referenced_types.len(), || {
            format!(
                "FOREIGN KEY has {} referencing and {} referenced columns",
                foreign_key.referencing_column_offset_list.len(),
                referenced_types.len()
            )
        })?;
        for (&offset, referenced_type) in foreign_key
            .referencing_column_offset_list
            .iter()
            .zip(&referenced_types)
        {
            let Some(definition) = definitions.get(offset) else {
                return fail(format!(
                    "FOREIGN KEY referencing offset {offset} is out of range for {} columns",
                    definitions.len()
                ));
            };
            self.check_type_equals(&definition.ty, referenced_type, || {
                format!("FOREIGN KEY column {}", definition.name)
            })?;
        }
        Ok(())
    }

    fn validate_check_constraint(&mut self, constraint: &CheckConstraint, defined: &ColumnSet) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_bool_expr(defined, &empty, &constraint.expression, "CHECK constraint")?;
        self.validate_option_list(&constraint.option_list)
    }

    /// PARTITION BY and CLUSTER BY expressions see the table's columns.
    pub(super) fn validate_partitioning(
        &mut self,
        partition_by: &[Expr],
        cluster_by: &[Expr],
        visible: &ColumnSet,
    ) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        for expr in partition_by {
            self.validate_expr(visible, &empty, expr)?;
            ensure(expr.ty().supports_partitioning(&self.language), || {
                format!(
                    "PARTITION BY expression has type {}, which does not support partitioning",
                    self.type_name(expr.ty())
                )
            })?;
        }
        for expr in cluster_by {
            self.validate_expr(visible, &empty, expr)?;
        }
        Ok(())
    }

    /// The query reads `pipe_input` when the statement is embedded in pipe
    /// CREATE TABLE.
    pub(super) fn validate_create_table_as_select_stmt(
        &mut self,
        stmt: &CreateTableAsSelectStmt,
        pipe_input: Option<&Scan>,
    ) -> ValidationResult<()> {
        let defined = self.validate_create_table_base(&stmt.table, "CREATE TABLE AS SELECT")?;
        self.validate_statement_query(&stmt.query, pipe_input)?;
        let produced = ColumnSet::from_columns(stmt.query.column_list());
        ensure(!stmt.output_column_list.is_empty(), || {
            "CREATE TABLE AS SELECT has no output columns".to_string()
        })?;
        self.validate_output_column_list(
            &stmt.output_column_list,
            &produced,
            stmt.table.is_value_table,
            "CREATE TABLE AS SELECT",
        )?;
        self.check_definitions_match_output(
            &stmt.table.column_definition_list,
            &stmt.output_column_list,
            "CREATE TABLE AS SELECT",
        )?;
        self.validate_partitioning(
            &stmt.partition_by_list,
            &stmt.cluster_by_list,
            &defined.union(&produced),
        )
    }

    /// Explicit column definitions line up with the query output.
    fn check_definitions_match_output(
        &self,
        definitions: &[ColumnDefinition],
        output_columns: &[OutputColumn],
        what: &str,
    ) -> ValidationResult<()> {
        if definitions.is_empty() {
            return Ok(());
        }
        ensure(definitions.len() == output_columns.len(), || {
            format!(
                "{what} defines {} columns but its query produces {}",
                definitions.len(),
                output_columns.len()
            )
        })?;
        for (definition, output_column) in definitions.iter().zip(output_columns) {
            self.check_type_equals(&output_column.column.ty, &definition.ty, || {
                format!("{what} column {}", definition.name)
            })?;
        }
        Ok(())
    }

    pub(super) fn validate_create_external_table_stmt(
        &mut self,
        stmt: &CreateExternalTableStmt,
    ) -> ValidationResult<()> {
        self.validate_create_table_base(&stmt.table, "CREATE EXTERNAL TABLE")?;
        check_connection(stmt.connection.as_ref(), "CREATE EXTERNAL TABLE")?;
        if let Some(partition_columns) = &stmt.with_partition_columns {
            self.validate_column_definitions(
                &partition_columns.column_definition_list,
                &stmt.table.column_definition_list,
                "WITH PARTITION COLUMNS",
            )?;
        }
        Ok(())
    }

    pub(super) fn validate_create_snapshot_table_stmt(
        &mut self,
        stmt: &CreateSnapshotTableStmt,
    ) -> ValidationResult<()> {
        self.validate_create_common(&stmt.common, "CREATE SNAPSHOT TABLE")?;
        ensure(matches!(stmt.clone_from.as_ref(), Scan::Table(_)), || {
            format!(
                "CREATE SNAPSHOT TABLE must clone a TableScan, found {}",
                stmt.clone_from.kind_name()
            )
        })?;
        self.validate_scan(&stmt.clone_from, &ColumnSet::new())?;
        self.validate_option_list(&stmt.option_list)
    }

    // ========================================================================
    // Views and indexes
    // ========================================================================

    /// Returns the columns of the view query.
    pub(super) fn validate_create_view_base(&mut self, view: &CreateViewBase) -> ValidationResult<ColumnSet> {
        self.validate_create_common(&view.common, "CREATE VIEW")?;
        self.validate_option_list(&view.option_list)?;
        ensure(!view.sql.is_empty(), || "CREATE VIEW has no SQL text".to_string())?;
        if view.recursive {
            self.check_feature(LanguageFeature::WithRecursive, "Recursive view")?;
        }
        self.validate_scan(&view.query, &ColumnSet::new())?;
        let produced = ColumnSet::from_columns(view.query.column_list());
        ensure(!view.output_column_list.is_empty(), || "CREATE VIEW has no output columns".to_string())?;
        self.validate_output_column_list(&view.output_column_list, &produced, view.is_value_table, "CREATE VIEW")?;
        Ok(produced)
    }

    pub(super) fn validate_create_materialized_view_stmt(
        &mut self,
        stmt: &CreateMaterializedViewStmt,
    ) -> ValidationResult<()> {
        let produced = self.validate_create_view_base(&stmt.view)?;
        let defined = self.validate_column_definitions(&stmt.column_definition_list, &[], "CREATE MATERIALIZED VIEW")?;
        self.check_definitions_match_output(
            &stmt.column_definition_list,
            &stmt.view.output_column_list,
            "CREATE MATERIALIZED VIEW",
        )?;
        self.validate_partitioning(&stmt.partition_by_list, &stmt.cluster_by_list, &produced.union(&defined))
    }

    /// UNNEST items and computed columns extend what later index items see.
    pub(super) fn validate_create_index_stmt(&mut self, stmt: &CreateIndexStmt) -> ValidationResult<()> {
        self.validate_create_common(&stmt.common, "CREATE INDEX")?;
        check_name_path(&stmt.table_name_path, "CREATE INDEX table")?;
        ensure(matches!(stmt.table_scan.as_ref(), Scan::Table(_)), || {
            format!("CREATE INDEX must scan a table, found {}", stmt.table_scan.kind_name())
        })?;
        let empty = ColumnSet::new();
        self.validate_scan(&stmt.table_scan, &empty)?;
        let mut visible = ColumnSet::from_columns(stmt.table_scan.column_list());

        for unnest in &stmt.unnest_expressions_list {
            self.validate_expr(&visible, &empty, &unnest.array_expr)?;
            let Some(element_type) = unnest.array_expr.ty().element_type() else {
                return fail(format!(
                    "Index UNNEST expression has type {}, expected an array",
                    self.type_name(unnest.array_expr.ty())
                ));
            };
            self.check_type_equals(&unnest.element_column.ty, element_type, || {
                format!("Index UNNEST element column {}", unnest.element_column)
            })?;
            self.check_unique_column_id(&unnest.element_column)?;
            visible = visible.with_columns([&unnest.element_column]);
            if let Some(offset) = &unnest.array_offset_column {
                ensure(offset.ty.is_int64(), || format!("Index UNNEST offset column {offset} must be INT64"))?;
                self.check_unique_column_id(offset)?;
                visible = visible.with_columns([offset]);
            }
        }
        for computed in &stmt.computed_columns_list {
            self.with_context(computed, |v| {
                v.validate_expr(&visible, &empty, &computed.expr)?;
                v.check_type_equals(computed.expr.ty(), &computed.column.ty, || {
                    format!("Index computed column {}", computed.column)
                })?;
                v.check_unique_column_id(&computed.column)
            })?;
            visible = visible.with_columns([&computed.column]);
        }

        ensure(stmt.index_all_columns == stmt.index_item_list.is_empty(), || {
            "CREATE INDEX must list items unless it indexes all columns".to_string()
        })?;
        ensure(!stmt.index_all_columns || stmt.is_search, || {
            "Only a search index may index all columns".to_string()
        })?;
        for item in &stmt.index_item_list {
            ensure(!item.column_ref.is_correlated, || {
                format!("Index item {} cannot be correlated", item.column_ref.column)
            })?;
            self.validate_column_ref(&visible, &empty, &item.column_ref)?;
        }
        for expr in &stmt.storing_expression_list {
            self.validate_expr(&visible, &empty, expr)?;
        }
        self.validate_option_list(&stmt.option_list)
    }

    // ========================================================================
    // Routines
    // ========================================================================

    pub(super) fn validate_create_function_stmt(&mut self, stmt: &CreateFunctionStmt) -> ValidationResult<()> {
        self.validate_create_common(&stmt.common, "CREATE FUNCTION")?;
        self.validate_routine_arguments(&stmt.argument_name_list, stmt.signature.arguments.len(), "CREATE FUNCTION")?;
        if let Some(result_type) = stmt.signature.result_type() {
            self.check_type_equals(&stmt.return_type, result_type, || "Function return type".to_string())?;
        }
        check_connection(stmt.connection.as_ref(), "CREATE FUNCTION")?;
        self.validate_option_list(&stmt.option_list)?;

        ensure(stmt.is_aggregate || stmt.aggregate_expression_list.is_empty(), || {
            "Only an aggregate function may have aggregate expressions".to_string()
        })?;
        let empty = ColumnSet::new();
        let mut visible = ColumnSet::new();
        for computed in &stmt.aggregate_expression_list {
            self.with_context(computed, |v| {
                v.validate_aggregate_expr(&empty, &empty, &computed.expr)?;
                v.check_type_equals(computed.expr.ty(), &computed.column.ty, || {
                    format!("Aggregate column {}", computed.column)
                })?;
                v.check_unique_column_id(&computed.column)
            })?;
            visible = visible.with_columns([&computed.column]);
        }

        match &stmt.function_expression {
            Some(body) => {
                ensure(!stmt.is_remote, || "Remote function cannot have a SQL body".to_string())?;
                ensure(stmt.language.is_empty() || stmt.language.eq_ignore_ascii_case("SQL"), || {
                    format!("Function with a SQL body has language {}", stmt.language)
                })?;
                self.validate_expr(&visible, &empty, body)?;
                if stmt.has_explicit_return_type {
                    self.check_type_equals(body.ty(), &stmt.return_type, || "Function body".to_string())?;
                }
            }
            None => ensure(stmt.is_remote || !stmt.language.is_empty(), || {
                "Function without a SQL body requires a language".to_string()
            })?,
        }
        Ok(())
    }

    fn validate_routine_arguments(&self, names: &[SmolStr], expected: usize, what: &str) -> ValidationResult<()> {
        ensure(names.len() == expected, || {
            format!("{what} names {} arguments, but its signature has {expected}", names.len())
        })?;
        check_distinct_names(names, &format!("{what} arguments"))
    }

    pub(super) fn validate_create_table_function_stmt(
        &mut self,
        stmt: &CreateTableFunctionStmt,
    ) -> ValidationResult<()> {
        let what = "CREATE TABLE FUNCTION";
        self.validate_create_common(&stmt.common, what)?;
        self.validate_routine_arguments(&stmt.argument_name_list, stmt.signature.arguments.len(), what)?;
        self.validate_option_list(&stmt.option_list)?;

        let Some(query) = &stmt.query else {
            return ensure(stmt.output_column_list.is_empty(), || {
                format!("{what} without a query cannot have output columns")
            });
        };
        self.validate_scan(query, &ColumnSet::new())?;
        let produced = ColumnSet::from_columns(query.column_list());
        ensure(!stmt.output_column_list.is_empty(), || format!("{what} has no output columns"))?;
        self.validate_output_column_list(&stmt.output_column_list, &produced, stmt.is_value_table, what)?;

        if !stmt.has_explicit_return_schema {
            return Ok(());
        }
        let SignatureArgumentKind::Relation(Some(schema)) = &stmt.signature.result.kind else {
            return fail(format!("{what} with an explicit return schema must return a fixed relation"));
        };
        ensure(schema.columns.len() == stmt.output_column_list.len(), || {
            format!(
                "{what} returns {} columns, but its schema declares {}",
                stmt.output_column_list.len(),
                schema.columns.len()
            )
        })?;
        for (output_column, (name, ty)) in stmt.output_column_list.iter().zip(&schema.columns) {
            self.check_type_equals(&output_column.column.ty, ty, || format!("{what} column {name}"))?;
        }
        Ok(())
    }

    pub(super) fn validate_create_procedure_stmt(&mut self, stmt: &CreateProcedureStmt) -> ValidationResult<()> {
        let what = "CREATE PROCEDURE";
        self.validate_create_common(&stmt.common, what)?;
        self.validate_routine_arguments(&stmt.argument_name_list, stmt.signature.arguments.len(), what)?;
        check_connection(stmt.connection.as_ref(), what)?;
        ensure(!stmt.procedure_body.is_empty() || !stmt.language.is_empty(), || {
            format!("{what} requires a body or a language")
        })?;
        ensure(stmt.procedure_body.is_empty() || stmt.code.is_empty(), || {
            format!("{what} cannot have both a SQL body and external code")
        })?;
        self.validate_option_list(&stmt.option_list)
    }

    // ========================================================================
    // Models and access control
    // ========================================================================

    /// TRANSFORM sees the query output; remote models may omit the query.
    pub(super) fn validate_create_model_stmt(&mut self, stmt: &CreateModelStmt) -> ValidationResult<()> {
        let what = "CREATE MODEL";
        self.validate_create_common(&stmt.common, what)?;
        check_connection(stmt.connection.as_ref(), what)?;
        self.validate_option_list(&stmt.option_list)?;
        self.validate_column_definitions(&stmt.input_column_definition_list, &[], "CREATE MODEL INPUT")?;
        self.validate_column_definitions(&stmt.output_column_definition_list, &[], "CREATE MODEL OUTPUT")?;

        let Some(query) = &stmt.query else {
            ensure(stmt.is_remote, || format!("{what} requires a query unless the model is remote"))?;
            return ensure(
                stmt.output_column_list.is_empty()
                    && stmt.transform_list.is_empty()
                    && stmt.transform_output_column_list.is_empty(),
                || format!("{what} without a query cannot have output or TRANSFORM columns"),
            );
        };
        let empty = ColumnSet::new();
        self.validate_scan(query, &empty)?;
        let produced = ColumnSet::from_columns(query.column_list());
        self.validate_output_column_list(&stmt.output_column_list, &produced, false, what)?;

        let mut transformed = ColumnSet::new();
        for computed in &stmt.transform_list {
            self.with_context(computed, |v| {
                v.validate_expr(&produced, &empty, &computed.expr)?;
                v.check_type_equals(computed.expr.ty(), &computed.column.ty, || {
                    format!("TRANSFORM column {}", computed.column)
                })?;
                v.check_unique_column_id(&computed.column)
            })?;
            transformed = transformed.with_columns([&computed.column]);
        }
        ensure(stmt.transform_list.len() == stmt.transform_output_column_list.len(), || {
            format!(
                "{what} has {} TRANSFORM expressions and {} TRANSFORM outputs",
                stmt.transform_list.len(),
                stmt.transform_output_column_list.len()
            )
        })?;
        self.validate_output_column_list(&stmt.transform_output_column_list, &transformed, false, "TRANSFORM")
    }

    pub(super) fn validate_create_row_access_policy_stmt(
        &mut self,
        stmt: &CreateRowAccessPolicyStmt,
    ) -> ValidationResult<()> {
        check_name_path(&stmt.target_name_path, "CREATE ROW ACCESS POLICY target")?;
        self.validate_grantee_list(&stmt.grantee_expr_list, "CREATE ROW ACCESS POLICY")?;
        let visible = self.validate_target_table_scan(stmt.table_scan.as_deref(), "CREATE ROW ACCESS POLICY")?;
        match &stmt.predicate {
            Some(predicate) => {
                ensure(stmt.table_scan.is_some(), || {
                    "Row access policy predicate requires a table scan".to_string()
                })?;
                ensure(!stmt.predicate_str.is_empty(), || {
                    "Row access policy predicate has no SQL text".to_string()
                })?;
                self.validate_bool_expr(&visible, &ColumnSet::new(), predicate, "Row access policy predicate")
            }
            None => Ok(()),
        }
    }

    /// The optional target of a policy statement must be a table scan.
    fn validate_target_table_scan(&mut self, table_scan: Option<&Scan>, what: &str) -> ValidationResult<ColumnSet> {
        let Some(table_scan) = table_scan else {
            return Ok(ColumnSet::new());
        };
        ensure(matches!(table_scan, Scan::Table(_)), || {
            format!("{what} target must be a TableScan, found {}", table_scan.kind_name())
        })?;
        self.validate_scan(table_scan, &ColumnSet::new())?;
        Ok(ColumnSet::from_columns(table_scan.column_list()))
    }

    pub(super) fn validate_create_privilege_restriction_stmt(
        &mut self,
        stmt: &CreatePrivilegeRestrictionStmt,
    ) -> ValidationResult<()> {
        let what = "CREATE PRIVILEGE RESTRICTION";
        self.validate_create_common(&stmt.common, what)?;
        ensure(!stmt.object_type.is_empty(), || format!("{what} requires an object type"))?;
        ensure(!stmt.column_privilege_list.is_empty(), || format!("{what} requires privileges"))?;
        for privilege in &stmt.column_privilege_list {
            ensure(!privilege.action_type.is_empty(), || format!("{what} privilege has no action"))?;
        }
        self.validate_grantee_list(&stmt.restrictee_list, what)
    }

    // ========================================================================
    // ALTER
    // ========================================================================

    pub(super) fn validate_alter_object_stmt(&mut self, stmt: &AlterObjectStmt) -> ValidationResult<()> {
        let what = format!("ALTER {}", stmt.kind.as_str());
        check_name_path(&stmt.name_path, &what)?;
        let visible = self.validate_target_table_scan(stmt.table_scan.as_deref(), &what)?;
        ensure(!stmt.alter_action_list.is_empty(), || format!("{what} has no actions"))?;
        for action in &stmt.alter_action_list {
            self.validate_alter_action(action, stmt.kind, &visible)?;
        }
        Ok(())
    }

    /// Only REVOKE applies to every policy of a table at once.
    pub(super) fn validate_alter_all_row_access_policies_stmt(
        &mut self,
        stmt: &AlterAllRowAccessPoliciesStmt,
    ) -> ValidationResult<()> {
        let what = "ALTER ALL ROW ACCESS POLICIES";
        check_name_path(&stmt.table_name_path, what)?;
        let visible = self.validate_target_table_scan(stmt.table_scan.as_deref(), what)?;
        ensure(!stmt.alter_action_list.is_empty(), || format!("{what} has no actions"))?;
        for action in &stmt.alter_action_list {
            ensure(matches!(action, AlterAction::RevokeFrom { .. }), || {
                format!("{what} does not support {}", action.kind_name())
            })?;
            self.validate_alter_action(action, AlterObjectKind::RowAccessPolicy, &visible)?;
        }
        Ok(())
    }

    fn validate_alter_action(
        &mut self,
        action: &AlterAction,
        kind: AlterObjectKind,
        visible: &ColumnSet,
    ) -> ValidationResult<()> {
        let allowed = match action {
            AlterAction::SetOptions(_) | AlterAction::RenameTo { .. } => true,
            AlterAction::SetCollateClause { .. } => {
                matches!(kind, AlterObjectKind::Table | AlterObjectKind::Schema)
            }
            AlterAction::SetAs { .. } => kind == AlterObjectKind::Entity,
            AlterAction::GrantTo(_)
            | AlterAction::RevokeFrom { .. }
            | AlterAction::FilterUsing { .. } => matches!(
                kind,
                AlterObjectKind::RowAccessPolicy | AlterObjectKind::PrivilegeRestriction
            ),
            _ => kind == AlterObjectKind::Table,
        };
        ensure(allowed, || {
            format!("{} is not allowed on ALTER {}", action.kind_name(), kind.as_str())
        })?;

        let empty = ColumnSet::new();
        match action {
            AlterAction::SetOptions(options) => self.validate_option_list(options),
            AlterAction::AddColumn { column_definition, .. } => {
                self.validate_column_definition(column_definition, visible)
            }
            AlterAction::DropColumn { name, .. } => check_column_name(name),
            AlterAction::RenameColumn { name, new_name, .. } => {
                check_column_name(name)?;
                check_column_name(new_name)
            }
            AlterAction::AlterColumnSetDataType {
                column,
                updated_type,
                updated_type_parameters,
                updated_annotations,
                ..
            } => {
                check_column_name(column)?;
                if let Some(parameters) = updated_type_parameters {
                    self.validate_type_parameters(parameters, updated_type, column)?;
                }
                if let Some(annotations) = updated_annotations {
                    self.validate_column_annotations(annotations, updated_type, column)?;
                }
                Ok(())
            }
            AlterAction::AlterColumnSetOptions { column, option_list, .. } => {
                check_column_name(column)?;
                self.validate_option_list(option_list)
            }
            AlterAction::AlterColumnDropNotNull { column, .. }
            | AlterAction::AlterColumnDropDefault { column, .. } => check_column_name(column),
            AlterAction::AlterColumnSetDefault { column, default_value, .. } => {
                check_column_name(column)?;
                ensure(!default_value.sql.is_empty(), || {
                    format!("Default value of column {column} has no SQL text")
                })?;
                self.validate_expr(&empty, &empty, &default_value.expression)
            }
            AlterAction::AddPrimaryKey { primary_key, .. } => {
                ensure(!primary_key.column_name_list.is_empty(), || {
                    "ADD PRIMARY KEY requires columns".to_string()
                })?;
                self.validate_primary_key(primary_key, None)
            }
            AlterAction::AddForeignKey { foreign_key, .. } => self.validate_foreign_key(foreign_key, None),
            AlterAction::AddCheckConstraint { check_constraint, .. } => {
                self.validate_check_constraint(check_constraint, visible)
            }
            AlterAction::DropConstraint { name, .. } => {
                ensure(!name.is_empty(), || "DROP CONSTRAINT requires a name".to_string())
            }
            AlterAction::DropPrimaryKey { .. } => Ok(()),
            AlterAction::SetAs { entity_body_json } => {
                ensure(!entity_body_json.is_empty(), || "SET AS requires a body".to_string())
            }
            AlterAction::SetCollateClause { collation_name } => {
                self.validate_collation_name(collation_name, "SET DEFAULT COLLATE")
            }
            AlterAction::RenameTo { new_path } => check_name_path(new_path, "RENAME TO"),
            AlterAction::GrantTo(grantees) => {
                ensure(!grantees.is_empty(), || "GRANT TO requires grantees".to_string())?;
                self.validate_grantee_list(grantees, "GRANT TO")
            }
            AlterAction::RevokeFrom {
                revokee_expr_list,
                is_revoke_from_all,
            } => {
                ensure(*is_revoke_from_all == revokee_expr_list.is_empty(), || {
                    "REVOKE FROM names grantees exactly when it does not revoke from ALL".to_string()
                })?;
                self.validate_grantee_list(revokee_expr_list, "REVOKE FROM")
            }
            AlterAction::FilterUsing { predicate, predicate_str } => {
                ensure(!predicate_str.is_empty(), || "FILTER USING has no SQL text".to_string())?;
                self.validate_bool_expr(visible, &empty, predicate, "FILTER USING predicate")
            }
        }
    }

    // ========================================================================
    // DROP and UNDROP
    // ========================================================================

    pub(super) fn validate_drop_function_stmt(&mut self, stmt: &DropFunctionStmt) -> ValidationResult<()> {
        check_name_path(&stmt.name_path, "DROP FUNCTION")?;
        match (&stmt.arguments, &stmt.signature) {
            (Some(arguments), Some(signature)) => {
                let expected = signature.concrete_arguments();
                ensure(arguments.len() == expected.len(), || {
                    format!(
                        "DROP FUNCTION lists {} argument types, but the signature has {}",
                        arguments.len(),
                        expected.len()
                    )
                })
            }
            (None, Some(_)) => fail("DROP FUNCTION has a signature without argument types"),
            (_, None) => Ok(()),
        }
    }

    pub(super) fn validate_drop_row_access_policy_stmt(
        &mut self,
        stmt: &DropRowAccessPolicyStmt,
    ) -> ValidationResult<()> {
        check_name_path(&stmt.target_name_path, "DROP ROW ACCESS POLICY target")?;
        ensure(stmt.is_drop_all == stmt.name.is_empty(), || {
            "DROP ROW ACCESS POLICY names a policy exactly when it does not drop all".to_string()
        })
    }

    pub(super) fn validate_undrop_stmt(&mut self, stmt: &UndropStmt) -> ValidationResult<()> {
        ensure(!stmt.schema_object_kind.is_empty(), || "UNDROP requires an object kind".to_string())?;
        check_name_path(&stmt.name_path, "UNDROP")?;
        if let Some(for_system_time) = &stmt.for_system_time_expr {
            let empty = ColumnSet::new();
            self.validate_expr(&empty, &empty, for_system_time)?;
            ensure(matches!(for_system_time.ty().as_ref(), Type::Timestamp), || {
                format!(
                    "UNDROP FOR SYSTEM_TIME AS OF must be TIMESTAMP, found {}",
                    self.type_name(for_system_time.ty())
                )
            })?;
        }
        self.validate_option_list(&stmt.option_list)
    }
}

fn check_column_name(name: &str) -> ValidationResult<()> {
    ensure(!name.is_empty(), || "ALTER COLUMN requires a column name".to_string())
}
