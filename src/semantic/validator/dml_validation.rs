//! INSERT, UPDATE, DELETE, MERGE and TRUNCATE.
//!
//! Top-level statements write the table of their `table_scan`. Nested
//! statements inside an `UpdateItem` write the elements of an array column
//! instead: they have no table scan, no RETURNING and no
//! ASSERT_ROWS_MODIFIED, and see the enclosing scope plus the element
//! column of their item.

use rustc_hash::FxHashSet;

use crate::ast::column::ResolvedColumn;
use crate::ast::expression::{ColumnRef, Expr};
use crate::ast::mutation::{
    ConflictAction, DeleteStmt, DmlValue, InsertMode, InsertRow, InsertStmt, MergeActionType,
    MergeMatchType, MergeStmt, MergeWhen, OnConflictClause, ReturningClause, TruncateStmt,
    UpdateItem, UpdateStmt,
};
use crate::ast::query::Scan;
use crate::ast::types::Type;
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

/// Scope of a nested DML statement.
#[derive(Clone, Copy)]
struct NestedScope<'a> {
    /// Everything the enclosing statement sees, including the element column.
    visible: &'a ColumnSet,
    element_column: &'a ResolvedColumn,
}

/// Where a DML statement writes.
struct DmlTarget {
    /// Columns that may be written.
    writable: ColumnSet,
    /// Columns expressions of the statement may read.
    visible: ColumnSet,
}

/// Follows struct and proto field accesses down to the column they start
/// from.
fn update_target_root(expr: &Expr) -> Option<&ColumnRef> {
    match expr {
        Expr::ColumnRef(column_ref) => Some(column_ref),
        Expr::GetStructField(field) => update_target_root(&field.expr),
        Expr::GetProtoField(field) => update_target_root(&field.expr),
        _ => None,
    }
}

impl Validator {
    // ========================================================================
    // Shared pieces
    // ========================================================================

    /// The target table of a top-level statement must be a plain table scan.
    fn validate_dml_table_scan(&mut self, table_scan: &Scan, what: &str) -> ValidationResult<ColumnSet> {
        ensure(matches!(table_scan, Scan::Table(_)), || {
            format!("{what} target must be a TableScan, found {}", table_scan.kind_name())
        })?;
        self.validate_scan(table_scan, &ColumnSet::new())?;
        Ok(ColumnSet::from_columns(table_scan.column_list()))
    }

    /// Resolves the write target of a statement from its optional table scan
    /// and the nesting scope.
    fn dml_target(
        &mut self,
        table_scan: Option<&Scan>,
        nested: Option<NestedScope<'_>>,
        what: &str,
    ) -> ValidationResult<DmlTarget> {
        match (table_scan, nested) {
            (Some(table_scan), None) => {
                let columns = self.validate_dml_table_scan(table_scan, what)?;
                Ok(DmlTarget {
                    writable: columns.clone(),
                    visible: columns,
                })
            }
            (None, Some(scope)) => Ok(DmlTarget {
                writable: ColumnSet::from_columns([scope.element_column]),
                visible: scope.visible.clone(),
            }),
            (None, None) => fail(format!("{what} requires a table scan")),
            (Some(_), Some(_)) => fail(format!("Nested {what} cannot have a table scan")),
        }
    }

    /// RETURNING and ASSERT_ROWS_MODIFIED belong to top-level statements.
    fn validate_top_level_clauses(
        &mut self,
        assert_rows_modified: Option<&Expr>,
        returning: Option<&ReturningClause>,
        is_nested: bool,
        target: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        if is_nested {
            ensure(assert_rows_modified.is_none(), || {
                format!("Nested {what} cannot have ASSERT_ROWS_MODIFIED")
            })?;
            return ensure(returning.is_none(), || format!("Nested {what} cannot have THEN RETURN"));
        }
        if let Some(assert_rows_modified) = assert_rows_modified {
            let empty = ColumnSet::new();
            self.validate_int64_constant(&empty, &empty, assert_rows_modified, "ASSERT_ROWS_MODIFIED")?;
        }
        if let Some(returning) = returning {
            self.validate_returning_clause(returning, target)?;
        }
        Ok(())
    }

    fn validate_returning_clause(&mut self, returning: &ReturningClause, target: &ColumnSet) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::DmlReturning, "THEN RETURN")?;
        ensure(!returning.output_column_list.is_empty(), || {
            "THEN RETURN has no output columns".to_string()
        })?;
        let empty = ColumnSet::new();
        let mut available = target.clone();
        for computed in &returning.expr_list {
            self.with_context(computed, |v| {
                v.validate_expr(target, &empty, &computed.expr)?;
                v.check_type_equals(computed.expr.ty(), &computed.column.ty, || {
                    format!("THEN RETURN column {}", computed.column)
                })?;
                v.check_unique_column_id(&computed.column)
            })?;
            available = available.with_columns([&computed.column]);
        }
        if let Some(action_column) = &returning.action_column {
            ensure(action_column.ty.is_string(), || {
                format!("THEN RETURN WITH ACTION column {action_column} must be STRING")
            })?;
            self.check_unique_column_id(action_column)?;
            available = available.with_columns([action_column]);
        }
        for output_column in &returning.output_column_list {
            ensure(available.contains(&output_column.column), || {
                format!(
                    "THEN RETURN output column {} is not produced by the statement",
                    output_column.column
                )
            })?;
        }
        Ok(())
    }

    /// A DML value may be `DEFAULT`; anything else is an ordinary expression.
    fn validate_dml_value(
        &mut self,
        value: &DmlValue,
        visible: &ColumnSet,
        params: &ColumnSet,
        expected: &Type,
        what: &str,
    ) -> ValidationResult<()> {
        match &value.value {
            Expr::DmlDefault(_) => {}
            expr => self.validate_expr(visible, params, expr)?,
        }
        self.check_type_equals(value.value.ty(), expected, || what.to_string())
    }

    /// Insert columns are distinct writable columns.
    fn validate_insert_columns(
        &self,
        insert_columns: &[ResolvedColumn],
        writable: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        ensure(!insert_columns.is_empty(), || format!("{what} has no insert columns"))?;
        let mut seen = FxHashSet::default();
        for column in insert_columns {
            ensure(writable.contains(column), || {
                format!("{what} inserts into column {column}, which is not in its target")
            })?;
            ensure(seen.insert(column.column_id), || {
                format!("{what} inserts into column {column} more than once")
            })?;
        }
        Ok(())
    }

    fn validate_insert_row(
        &mut self,
        row: &InsertRow,
        insert_columns: &[ResolvedColumn],
        visible: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        ensure(row.value_list.len() == insert_columns.len(), || {
            format!(
                "{what} row has {} values for {} columns",
                row.value_list.len(),
                insert_columns.len()
            )
        })?;
        let empty = ColumnSet::new();
        for (value, column) in row.value_list.iter().zip(insert_columns) {
            self.validate_dml_value(value, visible, &empty, &column.ty, &format!("{what} value for {column}"))?;
        }
        Ok(())
    }

    // ========================================================================
    // INSERT
    // ========================================================================

    /// The query reads `pipe_input` when the statement is embedded in pipe
    /// INSERT.
    pub(super) fn validate_insert_stmt(
        &mut self,
        stmt: &InsertStmt,
        pipe_input: Option<&Scan>,
    ) -> ValidationResult<()> {
        if pipe_input.is_some() {
            self.validate_option_list(&stmt.hint_list)?;
        }
        self.validate_insert(stmt, pipe_input, None)
    }

    fn validate_insert(
        &mut self,
        stmt: &InsertStmt,
        pipe_input: Option<&Scan>,
        nested: Option<NestedScope<'_>>,
    ) -> ValidationResult<()> {
        let what = "INSERT";
        let target = self.dml_target(stmt.table_scan.as_deref(), nested, what)?;
        self.validate_insert_columns(&stmt.insert_column_list, &target.writable, what)?;
        if let Some(scope) = nested {
            let element_id = scope.element_column.column_id;
            let inserts_element =
                matches!(stmt.insert_column_list.as_slice(), [only] if only.column_id == element_id);
            ensure(inserts_element, || {
                format!("Nested INSERT must insert into element column {}", scope.element_column)
            })?;
        }

        match (&stmt.query, stmt.row_list.is_empty()) {
            (Some(query), true) => self.validate_insert_query(stmt, query, pipe_input, &target)?,
            (None, false) => {
                ensure(pipe_input.is_none(), || "Pipe INSERT requires a query".to_string())?;
                ensure(stmt.query_parameter_list.is_empty() && stmt.query_output_column_list.is_empty(), || {
                    "INSERT VALUES cannot have query parameters or query output columns".to_string()
                })?;
                for row in &stmt.row_list {
                    self.validate_insert_row(row, &stmt.insert_column_list, &target.visible, what)?;
                }
            }
            (Some(_), false) => return fail("INSERT cannot have both a query and a row list"),
            (None, true) => return fail("INSERT requires either a query or a row list"),
        }

        if let Some(on_conflict) = &stmt.on_conflict_clause {
            ensure(nested.is_none(), || "Nested INSERT cannot have ON CONFLICT".to_string())?;
            ensure(stmt.insert_mode == InsertMode::OrError, || {
                format!("INSERT {:?} cannot have ON CONFLICT", stmt.insert_mode)
            })?;
            self.validate_on_conflict_clause(on_conflict, &target)?;
        }
        self.validate_top_level_clauses(
            stmt.assert_rows_modified.as_deref(),
            stmt.returning.as_ref(),
            nested.is_some(),
            &target.writable,
            what,
        )?;
        if nested.is_some() {
            self.validate_option_list(&stmt.hint_list)?;
        }
        Ok(())
    }

    /// The query sees its parameter list as correlated columns and produces
    /// one output column per insert column.
    fn validate_insert_query(
        &mut self,
        stmt: &InsertStmt,
        query: &Scan,
        pipe_input: Option<&Scan>,
        target: &DmlTarget,
    ) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_column_refs(&target.visible, &empty, &stmt.query_parameter_list)?;
        let params = ColumnSet::from_columns(stmt.query_parameter_list.iter().map(|p| &p.column));
        match pipe_input {
            Some(input) => self.with_subpipeline_input(input, |v| v.validate_scan(query, &params))?,
            None => self.validate_scan(query, &params)?,
        }

        ensure(stmt.query_output_column_list.len() == stmt.insert_column_list.len(), || {
            format!(
                "INSERT query has {} output columns for {} insert columns",
                stmt.query_output_column_list.len(),
                stmt.insert_column_list.len()
            )
        })?;
        let produced = ColumnSet::from_columns(query.column_list());
        for (output, column) in stmt.query_output_column_list.iter().zip(&stmt.insert_column_list) {
            ensure(produced.contains(output), || {
                format!("INSERT query output column {output} is not produced by its query")
            })?;
            self.check_type_equals(&output.ty, &column.ty, || {
                format!("INSERT query output column {output}")
            })?;
        }
        Ok(())
    }

    /// DO UPDATE sees the target row and the `excluded` row of the
    /// insert-row scan.
    fn validate_on_conflict_clause(
        &mut self,
        on_conflict: &OnConflictClause,
        target: &DmlTarget,
    ) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::InsertOnConflictClause, "INSERT ON CONFLICT")?;
        let has_columns = !on_conflict.conflict_target_column_list.is_empty();
        let has_constraint = !on_conflict.unique_constraint_name.is_empty();
        ensure(has_columns != has_constraint, || {
            "ON CONFLICT requires exactly one of a conflict target or a constraint name".to_string()
        })?;
        let empty = ColumnSet::new();
        self.validate_column_refs(&target.writable, &empty, &on_conflict.conflict_target_column_list)?;

        match on_conflict.conflict_action {
            ConflictAction::Nothing => ensure(
                on_conflict.insert_row_scan.is_none()
                    && on_conflict.update_item_list.is_empty()
                    && on_conflict.update_where_expression.is_none(),
                || "ON CONFLICT DO NOTHING cannot have update clauses".to_string(),
            ),
            ConflictAction::Update => {
                let Some(insert_row_scan) = &on_conflict.insert_row_scan else {
                    return fail("ON CONFLICT DO UPDATE requires an insert row scan");
                };
                self.validate_scan(insert_row_scan, &empty)?;
                let visible = target
                    .visible
                    .union(&ColumnSet::from_columns(insert_row_scan.column_list()));
                ensure(!on_conflict.update_item_list.is_empty(), || {
                    "ON CONFLICT DO UPDATE has no update items".to_string()
                })?;
                for item in &on_conflict.update_item_list {
                    self.validate_update_item(item, &visible, &target.writable)?;
                }
                if let Some(predicate) = &on_conflict.update_where_expression {
                    self.validate_bool_expr(&visible, &empty, predicate, "ON CONFLICT DO UPDATE WHERE")?;
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // UPDATE and DELETE
    // ========================================================================

    pub(super) fn validate_update_stmt(&mut self, stmt: &UpdateStmt) -> ValidationResult<()> {
        self.validate_update(stmt, None)
    }

    fn validate_update(&mut self, stmt: &UpdateStmt, nested: Option<NestedScope<'_>>) -> ValidationResult<()> {
        let what = "UPDATE";
        let target = self.dml_target(stmt.table_scan.as_deref(), nested, what)?;
        let mut visible =
            self.validate_array_offset_column(stmt.array_offset_column.as_ref(), &target.visible, nested, what)?;

        if let Some(from_scan) = &stmt.from_scan {
            ensure(nested.is_none(), || "Nested UPDATE cannot have a FROM clause".to_string())?;
            self.validate_scan(from_scan, &ColumnSet::new())?;
            visible = visible.union(&ColumnSet::from_columns(from_scan.column_list()));
        }
        let empty = ColumnSet::new();
        if let Some(where_expr) = &stmt.where_expr {
            self.validate_bool_expr(&visible, &empty, where_expr, "UPDATE WHERE")?;
        }
        ensure(!stmt.update_item_list.is_empty(), || "UPDATE has no update items".to_string())?;
        for item in &stmt.update_item_list {
            self.validate_update_item(item, &visible, &target.writable)?;
        }

        self.validate_top_level_clauses(
            stmt.assert_rows_modified.as_deref(),
            stmt.returning.as_ref(),
            nested.is_some(),
            &target.writable,
            what,
        )?;
        if nested.is_some() {
            self.validate_option_list(&stmt.hint_list)?;
        }
        Ok(())
    }

    pub(super) fn validate_delete_stmt(&mut self, stmt: &DeleteStmt) -> ValidationResult<()> {
        self.validate_delete(stmt, None)
    }

    fn validate_delete(&mut self, stmt: &DeleteStmt, nested: Option<NestedScope<'_>>) -> ValidationResult<()> {
        let what = "DELETE";
        let target = self.dml_target(stmt.table_scan.as_deref(), nested, what)?;
        let visible =
            self.validate_array_offset_column(stmt.array_offset_column.as_ref(), &target.visible, nested, what)?;
        let Some(where_expr) = &stmt.where_expr else {
            return fail("DELETE requires a WHERE clause");
        };
        self.validate_bool_expr(&visible, &ColumnSet::new(), where_expr, "DELETE WHERE")?;

        self.validate_top_level_clauses(
            stmt.assert_rows_modified.as_deref(),
            stmt.returning.as_ref(),
            nested.is_some(),
            &target.writable,
            what,
        )?;
        if nested.is_some() {
            self.validate_option_list(&stmt.hint_list)?;
        }
        Ok(())
    }

    /// Only nested statements iterate array offsets.
    fn validate_array_offset_column(
        &mut self,
        offset: Option<&ResolvedColumn>,
        visible: &ColumnSet,
        nested: Option<NestedScope<'_>>,
        what: &str,
    ) -> ValidationResult<ColumnSet> {
        let Some(offset) = offset else {
            return Ok(visible.clone());
        };
        ensure(nested.is_some(), || format!("Top-level {what} cannot have an array offset column"))?;
        ensure(offset.ty.is_int64(), || format!("Array offset column {offset} must be INT64"))?;
        self.check_unique_column_id(offset)?;
        Ok(visible.with_columns([offset]))
    }

    /// An update item either assigns a value, updates array elements by
    /// offset, or runs nested DML over the elements of an array.
    fn validate_update_item(
        &mut self,
        item: &UpdateItem,
        visible: &ColumnSet,
        writable: &ColumnSet,
    ) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        self.validate_expr(visible, &empty, &item.target)?;
        let Some(root) = update_target_root(&item.target) else {
            return fail(format!(
                "UPDATE target must be a column or a field of one, found {}",
                item.target.kind_name()
            ));
        };
        ensure(writable.contains(&root.column), || {
            format!("UPDATE target column {} is not writable here", root.column)
        })?;

        let forms = [
            item.set_value.is_some(),
            !item.array_update_list.is_empty(),
            item.has_nested_dml(),
        ];
        ensure(forms.iter().filter(|&&f| f).count() == 1, || {
            "UPDATE item must have exactly one of SET, array element updates or nested DML".to_string()
        })?;

        if let Some(set_value) = &item.set_value {
            ensure(item.element_column.is_none(), || {
                "UPDATE item with SET cannot have an element column".to_string()
            })?;
            return self.validate_dml_value(set_value, visible, &empty, item.target.ty(), "UPDATE SET value");
        }

        let Some(element_column) = &item.element_column else {
            return fail("Array UPDATE item requires an element column");
        };
        let Some(element_type) = item.target.ty().element_type() else {
            return fail(format!(
                "Array UPDATE target has type {}, expected an array",
                self.type_name(item.target.ty())
            ));
        };
        self.check_type_equals(&element_column.ty, element_type, || {
            format!("Array element column {element_column}")
        })?;
        self.check_unique_column_id(element_column)?;
        let element_visible = visible.with_columns([element_column]);
        let element_writable = ColumnSet::from_columns([element_column]);

        for array_item in &item.array_update_list {
            self.validate_expr(visible, &empty, &array_item.offset)?;
            ensure(array_item.offset.ty().is_int64(), || {
                format!(
                    "Array element offset must be INT64, found {}",
                    self.type_name(array_item.offset.ty())
                )
            })?;
            self.validate_update_item(&array_item.update_item, &element_visible, &element_writable)?;
        }

        let scope = NestedScope {
            visible: &element_visible,
            element_column,
        };
        // Nested statements count towards the recursion limit.
        for delete in &item.delete_list {
            self.with_depth(|v| v.validate_delete(delete, Some(scope)))?;
        }
        for update in &item.update_list {
            self.with_depth(|v| v.validate_update(update, Some(scope)))?;
        }
        for insert in &item.insert_list {
            self.with_depth(|v| v.validate_insert(insert, None, Some(scope)))?;
        }
        Ok(())
    }

    // ========================================================================
    // MERGE and TRUNCATE
    // ========================================================================

    pub(super) fn validate_merge_stmt(&mut self, stmt: &MergeStmt) -> ValidationResult<()> {
        let target = self.validate_dml_table_scan(&stmt.table_scan, "MERGE")?;
        let empty = ColumnSet::new();
        self.validate_scan(&stmt.from_scan, &empty)?;
        let source = ColumnSet::from_columns(stmt.from_scan.column_list());
        let both = target.union(&source);
        self.validate_bool_expr(&both, &empty, &stmt.merge_expr, "MERGE ON condition")?;

        ensure(!stmt.when_clause_list.is_empty(), || "MERGE has no WHEN clauses".to_string())?;
        for when in &stmt.when_clause_list {
            let visible = match when.match_type {
                MergeMatchType::Matched => &both,
                MergeMatchType::NotMatchedBySource => &target,
                MergeMatchType::NotMatchedByTarget => &source,
            };
            self.validate_merge_when(when, visible, &target)?;
        }
        Ok(())
    }

    /// Rows missing from the target can only be inserted; rows present in
    /// it can only be updated or deleted.
    fn validate_merge_when(
        &mut self,
        when: &MergeWhen,
        visible: &ColumnSet,
        target: &ColumnSet,
    ) -> ValidationResult<()> {
        let inserts = when.action_type == MergeActionType::Insert;
        let legal = match when.match_type {
            MergeMatchType::NotMatchedByTarget => inserts,
            MergeMatchType::Matched | MergeMatchType::NotMatchedBySource => !inserts,
        };
        ensure(legal, || {
            format!("MERGE WHEN {:?} cannot {:?}", when.match_type, when.action_type)
        })?;
        if let Some(match_expr) = &when.match_expr {
            self.validate_bool_expr(visible, &ColumnSet::new(), match_expr, "MERGE WHEN condition")?;
        }

        match when.action_type {
            MergeActionType::Insert => {
                ensure(when.update_item_list.is_empty(), || {
                    "MERGE INSERT cannot have update items".to_string()
                })?;
                self.validate_insert_columns(&when.insert_column_list, target, "MERGE INSERT")?;
                let Some(row) = &when.insert_row else {
                    return fail("MERGE INSERT requires a row");
                };
                self.validate_insert_row(row, &when.insert_column_list, visible, "MERGE INSERT")
            }
            MergeActionType::Update => {
                ensure(when.insert_column_list.is_empty() && when.insert_row.is_none(), || {
                    "MERGE UPDATE cannot have insert columns".to_string()
                })?;
                ensure(!when.update_item_list.is_empty(), || {
                    "MERGE UPDATE has no update items".to_string()
                })?;
                for item in &when.update_item_list {
                    self.validate_update_item(item, visible, target)?;
                }
                Ok(())
            }
            MergeActionType::Delete => ensure(
                when.insert_column_list.is_empty()
                    && when.insert_row.is_none()
                    && when.update_item_list.is_empty(),
                || "MERGE DELETE cannot have insert columns or update items".to_string(),
            ),
        }
    }

    pub(super) fn validate_truncate_stmt(&mut self, stmt: &TruncateStmt) -> ValidationResult<()> {
        let target = self.validate_dml_table_scan(&stmt.table_scan, "TRUNCATE")?;
        if let Some(where_expr) = &stmt.where_expr {
            self.validate_bool_expr(&target, &ColumnSet::new(), where_expr, "TRUNCATE WHERE")?;
        }
        Ok(())
    }
}

