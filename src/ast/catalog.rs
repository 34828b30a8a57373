//! Catalog (DDL) statements.
//!
//! This module defines the resolved form of:
//! - CREATE statements for tables, views, functions, procedures, models,
//!   indexes, policies and other schema objects
//! - ALTER statements and their actions
//! - DROP / UNDROP / RENAME statements
//!
//! CREATE PROPERTY GRAPH lives in [`crate::ast::graph`].

use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::{FunctionSignature, TableRef};
use crate::ast::expression::{ColumnRef, ComputedColumn, Expr};
use crate::ast::program::{OptionEntry, OutputColumn};
use crate::ast::query::Scan;
use crate::ast::types::{TypeParameters, TypeRef};

// ============================================================================
// Shared CREATE fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateScope {
    #[default]
    Default,
    Private,
    Public,
    Temp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    #[default]
    Default,
    OrReplace,
    IfNotExists,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateCommon {
    pub name_path: Vec<SmolStr>,
    pub create_scope: CreateScope,
    pub create_mode: CreateMode,
}

impl CreateCommon {
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self {
            name_path: vec![name.into()],
            ..Self::default()
        }
    }
}

// ============================================================================
// Column definitions and constraints
// ============================================================================

/// Per-column annotations, mirroring the nesting of the column type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnAnnotations {
    pub collation_name: Option<Box<Expr>>,
    pub not_null: bool,
    pub option_list: Vec<OptionEntry>,
    pub child_list: Vec<ColumnAnnotations>,
    pub type_parameters: Option<TypeParameters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedMode {
    Always,
    ByDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredMode {
    NonStored,
    Stored,
    StoredVolatile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedColumnInfo {
    pub expression: Expr,
    pub stored_mode: StoredMode,
    pub generated_mode: GeneratedMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefaultValue {
    pub expression: Expr,
    pub sql: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: SmolStr,
    pub ty: TypeRef,
    pub annotations: Option<ColumnAnnotations>,
    pub is_hidden: bool,
    /// The column other parts of the statement use to refer to this
    /// definition.
    pub column: ResolvedColumn,
    pub generated_column_info: Option<GeneratedColumnInfo>,
    pub default_value: Option<ColumnDefaultValue>,
}

impl ColumnDefinition {
    pub fn new(column: ResolvedColumn) -> Self {
        Self {
            name: column.name.clone(),
            ty: column.ty.clone(),
            annotations: None,
            is_hidden: false,
            column,
            generated_column_info: None,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimaryKey {
    /// Offsets into the column definition list.
    pub column_offset_list: Vec<usize>,
    pub column_name_list: Vec<SmolStr>,
    pub option_list: Vec<OptionEntry>,
    pub unenforced: bool,
    pub constraint_name: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyMatchMode {
    #[default]
    Simple,
    Full,
    NotDistinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyActionOperation {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub constraint_name: SmolStr,
    pub referencing_column_offset_list: Vec<usize>,
    pub referenced_table: TableRef,
    pub referenced_column_offset_list: Vec<usize>,
    pub match_mode: ForeignKeyMatchMode,
    pub update_action: ForeignKeyActionOperation,
    pub delete_action: ForeignKeyActionOperation,
    pub enforced: bool,
    pub option_list: Vec<OptionEntry>,
    pub referencing_column_list: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub constraint_name: SmolStr,
    pub expression: Expr,
    pub enforced: bool,
    pub option_list: Vec<OptionEntry>,
}

// ============================================================================
// CREATE TABLE family
// ============================================================================

/// Fields shared by every CREATE TABLE variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTableBase {
    pub common: CreateCommon,
    pub option_list: Vec<OptionEntry>,
    pub column_definition_list: Vec<ColumnDefinition>,
    pub pseudo_column_list: Vec<ResolvedColumn>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_key_list: Vec<ForeignKey>,
    pub check_constraint_list: Vec<CheckConstraint>,
    pub like_table: Option<TableRef>,
    pub collation_name: Option<Box<Expr>>,
    pub is_value_table: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTableStmt {
    pub table: CreateTableBase,
    pub clone_from: Option<Box<Scan>>,
    pub copy_from: Option<Box<Scan>>,
    pub partition_by_list: Vec<Expr>,
    pub cluster_by_list: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableAsSelectStmt {
    pub table: CreateTableBase,
    pub partition_by_list: Vec<Expr>,
    pub cluster_by_list: Vec<Expr>,
    pub output_column_list: Vec<OutputColumn>,
    pub query: Box<Scan>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithPartitionColumns {
    pub column_definition_list: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateExternalTableStmt {
    pub table: CreateTableBase,
    pub with_partition_columns: Option<WithPartitionColumns>,
    pub connection: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSnapshotTableStmt {
    pub common: CreateCommon,
    pub clone_from: Box<Scan>,
    pub option_list: Vec<OptionEntry>,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlSecurity {
    #[default]
    Unspecified,
    Definer,
    Invoker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateViewBase {
    pub common: CreateCommon,
    pub option_list: Vec<OptionEntry>,
    pub output_column_list: Vec<OutputColumn>,
    pub has_explicit_columns: bool,
    pub query: Box<Scan>,
    pub sql: SmolStr,
    pub sql_security: SqlSecurity,
    pub is_value_table: bool,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateViewStmt {
    pub view: CreateViewBase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateMaterializedViewStmt {
    pub view: CreateViewBase,
    pub column_definition_list: Vec<ColumnDefinition>,
    pub partition_by_list: Vec<Expr>,
    pub cluster_by_list: Vec<Expr>,
}

// ============================================================================
// Indexes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem {
    pub column_ref: ColumnRef,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnnestItem {
    pub array_expr: Expr,
    pub element_column: ResolvedColumn,
    pub array_offset_column: Option<ResolvedColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStmt {
    pub common: CreateCommon,
    pub table_name_path: Vec<SmolStr>,
    pub table_scan: Box<Scan>,
    pub is_unique: bool,
    pub is_search: bool,
    pub index_all_columns: bool,
    pub index_item_list: Vec<IndexItem>,
    pub storing_expression_list: Vec<Expr>,
    pub option_list: Vec<OptionEntry>,
    pub computed_columns_list: Vec<ComputedColumn>,
    pub unnest_expressions_list: Vec<UnnestItem>,
}

// ============================================================================
// Routines
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeterminismLevel {
    #[default]
    Unspecified,
    Deterministic,
    NotDeterministic,
    Immutable,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateFunctionStmt {
    pub common: CreateCommon,
    pub has_explicit_return_type: bool,
    pub return_type: TypeRef,
    pub argument_name_list: Vec<SmolStr>,
    pub signature: FunctionSignature,
    pub is_aggregate: bool,
    pub language: SmolStr,
    pub code: SmolStr,
    /// Aggregate sub-expressions of an aggregate SQL function body.
    pub aggregate_expression_list: Vec<ComputedColumn>,
    pub function_expression: Option<Box<Expr>>,
    pub option_list: Vec<OptionEntry>,
    pub sql_security: SqlSecurity,
    pub determinism_level: DeterminismLevel,
    pub is_remote: bool,
    pub connection: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableFunctionStmt {
    pub common: CreateCommon,
    pub argument_name_list: Vec<SmolStr>,
    pub signature: FunctionSignature,
    pub has_explicit_return_schema: bool,
    pub option_list: Vec<OptionEntry>,
    pub language: SmolStr,
    pub code: SmolStr,
    pub query: Option<Box<Scan>>,
    pub output_column_list: Vec<OutputColumn>,
    pub is_value_table: bool,
    pub sql_security: SqlSecurity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateProcedureStmt {
    pub common: CreateCommon,
    pub argument_name_list: Vec<SmolStr>,
    pub signature: FunctionSignature,
    pub option_list: Vec<OptionEntry>,
    pub procedure_body: SmolStr,
    pub connection: Option<SmolStr>,
    pub language: SmolStr,
    pub code: SmolStr,
}

// ============================================================================
// Other schema objects
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CreateConstantStmt {
    pub common: CreateCommon,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateDatabaseStmt {
    pub name_path: Vec<SmolStr>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateSchemaStmt {
    pub common: CreateCommon,
    pub collation_name: Option<Box<Expr>>,
    pub option_list: Vec<OptionEntry>,
}

/// Statements consisting of a name and an option list (connections,
/// sequences).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateWithOptionsStmt {
    pub common: CreateCommon,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateEntityStmt {
    pub common: CreateCommon,
    pub entity_type: SmolStr,
    pub entity_body_json: SmolStr,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateModelStmt {
    pub common: CreateCommon,
    pub option_list: Vec<OptionEntry>,
    pub output_column_list: Vec<OutputColumn>,
    pub query: Option<Box<Scan>>,
    /// TRANSFORM clause: computed over the query output.
    pub transform_list: Vec<ComputedColumn>,
    pub transform_output_column_list: Vec<OutputColumn>,
    pub input_column_definition_list: Vec<ColumnDefinition>,
    pub output_column_definition_list: Vec<ColumnDefinition>,
    pub is_remote: bool,
    pub connection: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRowAccessPolicyStmt {
    pub create_mode: CreateMode,
    pub name: SmolStr,
    pub target_name_path: Vec<SmolStr>,
    pub grantee_expr_list: Vec<Expr>,
    pub table_scan: Option<Box<Scan>>,
    pub predicate: Option<Box<Expr>>,
    pub predicate_str: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Privilege {
    pub action_type: SmolStr,
    pub unit_list: Vec<Vec<SmolStr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePrivilegeRestrictionStmt {
    pub common: CreateCommon,
    pub column_privilege_list: Vec<Privilege>,
    pub object_type: SmolStr,
    pub restrictee_list: Vec<Expr>,
}

// ============================================================================
// ALTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterObjectKind {
    Table,
    View,
    MaterializedView,
    ApproxView,
    Schema,
    ExternalSchema,
    Database,
    Model,
    Connection,
    Sequence,
    Entity,
    PrivilegeRestriction,
    RowAccessPolicy,
    Index,
}

impl AlterObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlterObjectKind::Table => "TABLE",
            AlterObjectKind::View => "VIEW",
            AlterObjectKind::MaterializedView => "MATERIALIZED VIEW",
            AlterObjectKind::ApproxView => "APPROX VIEW",
            AlterObjectKind::Schema => "SCHEMA",
            AlterObjectKind::ExternalSchema => "EXTERNAL SCHEMA",
            AlterObjectKind::Database => "DATABASE",
            AlterObjectKind::Model => "MODEL",
            AlterObjectKind::Connection => "CONNECTION",
            AlterObjectKind::Sequence => "SEQUENCE",
            AlterObjectKind::Entity => "ENTITY",
            AlterObjectKind::PrivilegeRestriction => "PRIVILEGE RESTRICTION",
            AlterObjectKind::RowAccessPolicy => "ROW ACCESS POLICY",
            AlterObjectKind::Index => "INDEX",
        }
    }
}

/// One ALTER action.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    SetOptions(Vec<OptionEntry>),
    AddColumn {
        is_if_not_exists: bool,
        column_definition: ColumnDefinition,
    },
    DropColumn {
        is_if_exists: bool,
        name: SmolStr,
    },
    RenameColumn {
        is_if_exists: bool,
        name: SmolStr,
        new_name: SmolStr,
    },
    AlterColumnSetDataType {
        is_if_exists: bool,
        column: SmolStr,
        updated_type: TypeRef,
        updated_type_parameters: Option<TypeParameters>,
        updated_annotations: Option<ColumnAnnotations>,
    },
    AlterColumnSetOptions {
        is_if_exists: bool,
        column: SmolStr,
        option_list: Vec<OptionEntry>,
    },
    AlterColumnDropNotNull {
        is_if_exists: bool,
        column: SmolStr,
    },
    AlterColumnSetDefault {
        is_if_exists: bool,
        column: SmolStr,
        default_value: ColumnDefaultValue,
    },
    AlterColumnDropDefault {
        is_if_exists: bool,
        column: SmolStr,
    },
    AddPrimaryKey {
        is_if_not_exists: bool,
        primary_key: PrimaryKey,
    },
    AddForeignKey {
        is_if_not_exists: bool,
        foreign_key: ForeignKey,
    },
    AddCheckConstraint {
        is_if_not_exists: bool,
        check_constraint: CheckConstraint,
    },
    DropConstraint {
        is_if_exists: bool,
        name: SmolStr,
    },
    DropPrimaryKey {
        is_if_exists: bool,
    },
    SetAs {
        entity_body_json: SmolStr,
    },
    SetCollateClause {
        collation_name: Expr,
    },
    RenameTo {
        new_path: Vec<SmolStr>,
    },
    GrantTo(Vec<Expr>),
    RevokeFrom {
        revokee_expr_list: Vec<Expr>,
        is_revoke_from_all: bool,
    },
    FilterUsing {
        predicate: Expr,
        predicate_str: SmolStr,
    },
}

impl AlterAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AlterAction::SetOptions(_) => "SetOptionsAction",
            AlterAction::AddColumn { .. } => "AddColumnAction",
            AlterAction::DropColumn { .. } => "DropColumnAction",
            AlterAction::RenameColumn { .. } => "RenameColumnAction",
            AlterAction::AlterColumnSetDataType { .. } => "AlterColumnSetDataTypeAction",
            AlterAction::AlterColumnSetOptions { .. } => "AlterColumnOptionsAction",
            AlterAction::AlterColumnDropNotNull { .. } => "AlterColumnDropNotNullAction",
            AlterAction::AlterColumnSetDefault { .. } => "AlterColumnSetDefaultAction",
            AlterAction::AlterColumnDropDefault { .. } => "AlterColumnDropDefaultAction",
            AlterAction::AddPrimaryKey { .. } => "AddConstraintAction",
            AlterAction::AddForeignKey { .. } => "AddConstraintAction",
            AlterAction::AddCheckConstraint { .. } => "AddConstraintAction",
            AlterAction::DropConstraint { .. } => "DropConstraintAction",
            AlterAction::DropPrimaryKey { .. } => "DropPrimaryKeyAction",
            AlterAction::SetAs { .. } => "SetAsAction",
            AlterAction::SetCollateClause { .. } => "SetCollateClause",
            AlterAction::RenameTo { .. } => "RenameToAction",
            AlterAction::GrantTo(_) => "GrantToAction",
            AlterAction::RevokeFrom { .. } => "RevokeFromAction",
            AlterAction::FilterUsing { .. } => "FilterUsingAction",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterObjectStmt {
    pub kind: AlterObjectKind,
    pub name_path: Vec<SmolStr>,
    pub alter_action_list: Vec<AlterAction>,
    pub is_if_exists: bool,
    /// Target table of ALTER ROW ACCESS POLICY / PRIVILEGE RESTRICTION;
    /// FILTER USING predicates are scoped to its columns.
    pub table_scan: Option<Box<Scan>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterAllRowAccessPoliciesStmt {
    pub table_name_path: Vec<SmolStr>,
    pub alter_action_list: Vec<AlterAction>,
    pub table_scan: Option<Box<Scan>>,
}

// ============================================================================
// DROP / UNDROP / RENAME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropMode {
    #[default]
    Unspecified,
    Restrict,
    Cascade,
}

/// DROP of a named object. Also used for DROP TABLE FUNCTION,
/// MATERIALIZED VIEW and SNAPSHOT TABLE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropStmt {
    pub object_type: SmolStr,
    pub is_if_exists: bool,
    pub name_path: Vec<SmolStr>,
    pub drop_mode: DropMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropFunctionStmt {
    pub is_if_exists: bool,
    pub name_path: Vec<SmolStr>,
    /// Argument types when the statement names a specific overload.
    pub arguments: Option<Vec<TypeRef>>,
    pub signature: Option<FunctionSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropRowAccessPolicyStmt {
    pub is_drop_all: bool,
    pub is_if_exists: bool,
    pub name: SmolStr,
    pub target_name_path: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropPrivilegeRestrictionStmt {
    pub object_type: SmolStr,
    pub is_if_exists: bool,
    pub name_path: Vec<SmolStr>,
    pub column_privilege_list: Vec<Privilege>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropIndexStmt {
    pub name: SmolStr,
    pub table_name_path: Vec<SmolStr>,
    pub is_if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndropStmt {
    pub schema_object_kind: SmolStr,
    pub is_if_not_exists: bool,
    pub name_path: Vec<SmolStr>,
    pub for_system_time_expr: Option<Box<Expr>>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameStmt {
    pub object_type: SmolStr,
    pub old_name_path: Vec<SmolStr>,
    pub new_name_path: Vec<SmolStr>,
}
