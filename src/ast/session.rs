//! Session, transaction and administrative statements.
//!
//! This module defines the resolved form of:
//! - BEGIN / SET TRANSACTION / COMMIT / ROLLBACK
//! - START BATCH / RUN BATCH / ABORT BATCH
//! - DESCRIBE, SHOW, DEFINE TABLE
//! - GRANT / REVOKE
//! - EXPORT MODEL / EXPORT METADATA, IMPORT, MODULE
//! - ANALYZE, LOAD DATA, CLONE DATA

use smol_str::SmolStr;

use crate::ast::catalog::{CheckConstraint, ColumnDefinition, ForeignKey, PrimaryKey, WithPartitionColumns};
use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::TableRef;
use crate::ast::expression::Expr;
use crate::ast::program::{OptionEntry, OutputColumn};
use crate::ast::query::Scan;

// ============================================================================
// Transactions and batches
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadWriteMode {
    #[default]
    Unspecified,
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeginStmt {
    pub read_write_mode: ReadWriteMode,
    pub isolation_level_list: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetTransactionStmt {
    pub read_write_mode: ReadWriteMode,
    pub isolation_level_list: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StartBatchStmt {
    pub batch_type: SmolStr,
}

// ============================================================================
// Introspection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescribeStmt {
    pub object_type: SmolStr,
    pub name_path: Vec<SmolStr>,
    pub from_name_path: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowStmt {
    pub identifier: SmolStr,
    pub name_path: Vec<SmolStr>,
    /// LIKE pattern; a STRING literal.
    pub like_expr: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefineTableStmt {
    pub name_path: Vec<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

// ============================================================================
// Privileges
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GrantOrRevokeStmt {
    pub privilege_list: Vec<SmolStr>,
    pub object_type: SmolStr,
    pub name_path: Vec<SmolStr>,
    /// STRING literals or parameters naming grantees.
    pub grantee_expr_list: Vec<Expr>,
}

// ============================================================================
// Export / import / modules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportModelStmt {
    pub model_name_path: Vec<SmolStr>,
    pub connection: Option<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportMetadataStmt {
    pub schema_object_kind: SmolStr,
    pub name_path: Vec<SmolStr>,
    pub connection: Option<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Module,
    Proto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub import_kind: ImportKind,
    pub name_path: Vec<SmolStr>,
    pub file_path: SmolStr,
    pub alias_path: Vec<SmolStr>,
    pub into_alias_path: Vec<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleStmt {
    pub name_path: Vec<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

// ============================================================================
// Data maintenance
// ============================================================================

/// A table plus the ordinals of the columns to analyze.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAndColumnInfo {
    pub table: TableRef,
    pub column_index_list: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzeStmt {
    pub option_list: Vec<OptionEntry>,
    pub table_and_column_index_list: Vec<TableAndColumnInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionMode {
    #[default]
    Append,
    Overwrite,
}

/// LOAD DATA into a (possibly new) table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuxLoadDataStmt {
    pub insertion_mode: InsertionMode,
    pub name_path: Vec<SmolStr>,
    pub output_column_list: Vec<OutputColumn>,
    pub column_definition_list: Vec<ColumnDefinition>,
    pub pseudo_column_list: Vec<ResolvedColumn>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_key_list: Vec<ForeignKey>,
    pub check_constraint_list: Vec<CheckConstraint>,
    pub partition_by_list: Vec<Expr>,
    pub cluster_by_list: Vec<Expr>,
    pub option_list: Vec<OptionEntry>,
    pub with_partition_columns: Option<WithPartitionColumns>,
    pub connection: Option<SmolStr>,
    pub from_files_option_list: Vec<OptionEntry>,
}

/// CLONE DATA INTO target FROM source [UNION ALL source ...].
#[derive(Debug, Clone, PartialEq)]
pub struct CloneDataStmt {
    pub target_table: Box<Scan>,
    pub clone_from: Box<Scan>,
}
