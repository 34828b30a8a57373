//! Data modification statements: INSERT, UPDATE, DELETE, MERGE and
//! TRUNCATE, including DML nested inside UPDATE of array columns.
//!
//! A top-level statement carries a `table_scan` over its target table.
//! A nested statement has no table scan; it operates on the elements of
//! the array named by the enclosing `UpdateItem`, exposed through that
//! item's `element_column`.

use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::expression::{ColumnRef, ComputedColumn, Expr};
use crate::ast::program::{OptionEntry, OutputColumn};
use crate::ast::query::Scan;

// ============================================================================
// Shared pieces
// ============================================================================

/// A value written by DML. `value` may be a `DmlDefault`.
#[derive(Debug, Clone, PartialEq)]
pub struct DmlValue {
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertRow {
    pub value_list: Vec<DmlValue>,
}

/// THEN RETURN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturningClause {
    pub output_column_list: Vec<OutputColumn>,
    /// Optional `WITH ACTION` column (STRING).
    pub action_column: Option<ResolvedColumn>,
    pub expr_list: Vec<ComputedColumn>,
}

// ============================================================================
// INSERT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    #[default]
    OrError,
    OrIgnore,
    OrReplace,
    OrUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Nothing,
    Update,
}

/// ON CONFLICT clause of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflictClause {
    pub conflict_action: ConflictAction,
    pub conflict_target_column_list: Vec<ColumnRef>,
    pub unique_constraint_name: SmolStr,
    /// Scan exposing the `excluded` row to DO UPDATE.
    pub insert_row_scan: Option<Box<Scan>>,
    pub update_item_list: Vec<UpdateItem>,
    pub update_where_expression: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table_scan: Option<Box<Scan>>,
    pub insert_mode: InsertMode,
    pub assert_rows_modified: Option<Box<Expr>>,
    pub returning: Option<ReturningClause>,
    pub insert_column_list: Vec<ResolvedColumn>,
    /// Outer columns the query may reference.
    pub query_parameter_list: Vec<ColumnRef>,
    pub query: Option<Box<Scan>>,
    /// Columns of `query` aligned with `insert_column_list`.
    pub query_output_column_list: Vec<ResolvedColumn>,
    pub row_list: Vec<InsertRow>,
    pub on_conflict_clause: Option<OnConflictClause>,
    pub hint_list: Vec<OptionEntry>,
}

impl InsertStmt {
    pub fn new(table_scan: Option<Scan>, insert_column_list: Vec<ResolvedColumn>) -> Self {
        Self {
            table_scan: table_scan.map(Box::new),
            insert_mode: InsertMode::OrError,
            assert_rows_modified: None,
            returning: None,
            insert_column_list,
            query_parameter_list: Vec::new(),
            query: None,
            query_output_column_list: Vec::new(),
            row_list: Vec::new(),
            on_conflict_clause: None,
            hint_list: Vec::new(),
        }
    }
}

// ============================================================================
// UPDATE / DELETE
// ============================================================================

/// `target[offset] = ...` inside an array UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateArrayItem {
    pub offset: Expr,
    pub update_item: Box<UpdateItem>,
}

/// One SET item. Exactly one of `set_value`, the nested DML lists, or
/// `array_update_list` is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItem {
    pub target: Expr,
    pub set_value: Option<DmlValue>,
    /// Stands for each array element in nested DML and array updates.
    pub element_column: Option<ResolvedColumn>,
    pub array_update_list: Vec<UpdateArrayItem>,
    pub delete_list: Vec<DeleteStmt>,
    pub update_list: Vec<UpdateStmt>,
    pub insert_list: Vec<InsertStmt>,
}

impl UpdateItem {
    pub fn set(target: Expr, value: Expr) -> Self {
        Self {
            target,
            set_value: Some(DmlValue { value }),
            element_column: None,
            array_update_list: Vec::new(),
            delete_list: Vec::new(),
            update_list: Vec::new(),
            insert_list: Vec::new(),
        }
    }

    pub fn has_nested_dml(&self) -> bool {
        !self.delete_list.is_empty() || !self.update_list.is_empty() || !self.insert_list.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table_scan: Option<Box<Scan>>,
    pub assert_rows_modified: Option<Box<Expr>>,
    pub returning: Option<ReturningClause>,
    /// Only for nested UPDATE over an array.
    pub array_offset_column: Option<ResolvedColumn>,
    pub where_expr: Option<Box<Expr>>,
    pub update_item_list: Vec<UpdateItem>,
    pub from_scan: Option<Box<Scan>>,
    pub hint_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table_scan: Option<Box<Scan>>,
    pub assert_rows_modified: Option<Box<Expr>>,
    pub returning: Option<ReturningClause>,
    /// Only for nested DELETE over an array.
    pub array_offset_column: Option<ResolvedColumn>,
    pub where_expr: Option<Box<Expr>>,
    pub hint_list: Vec<OptionEntry>,
}

// ============================================================================
// MERGE / TRUNCATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMatchType {
    Matched,
    NotMatchedBySource,
    NotMatchedByTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeActionType {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeWhen {
    pub match_type: MergeMatchType,
    pub match_expr: Option<Box<Expr>>,
    pub action_type: MergeActionType,
    pub insert_column_list: Vec<ResolvedColumn>,
    pub insert_row: Option<InsertRow>,
    pub update_item_list: Vec<UpdateItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeStmt {
    pub table_scan: Box<Scan>,
    pub from_scan: Box<Scan>,
    pub merge_expr: Box<Expr>,
    pub when_clause_list: Vec<MergeWhen>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateStmt {
    pub table_scan: Box<Scan>,
    pub where_expr: Option<Box<Expr>>,
}
