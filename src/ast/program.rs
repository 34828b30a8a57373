//! Top-level statements.
//!
//! A [`Statement`] is what the host hands to the validator. Query
//! statements name their output through an explicit
//! [`OutputColumn`] list; every other statement has no output columns.

use smol_str::SmolStr;

use crate::ast::catalog::{
    AlterAllRowAccessPoliciesStmt, AlterObjectStmt, CreateConstantStmt, CreateDatabaseStmt,
    CreateEntityStmt, CreateExternalTableStmt, CreateFunctionStmt, CreateIndexStmt,
    CreateMaterializedViewStmt, CreateModelStmt, CreatePrivilegeRestrictionStmt,
    CreateProcedureStmt, CreateRowAccessPolicyStmt, CreateSchemaStmt, CreateSnapshotTableStmt,
    CreateTableAsSelectStmt, CreateTableFunctionStmt, CreateTableStmt, CreateViewStmt,
    CreateWithOptionsStmt, DropFunctionStmt, DropIndexStmt, DropPrivilegeRestrictionStmt,
    DropRowAccessPolicyStmt, DropStmt, RenameStmt, UndropStmt,
};
use crate::ast::column::ResolvedColumn;
use crate::ast::expression::Expr;
use crate::ast::graph::CreatePropertyGraphStmt;
use crate::ast::mutation::{DeleteStmt, InsertStmt, MergeStmt, TruncateStmt, UpdateStmt};
use crate::ast::procedure::{AssertStmt, AssignmentStmt, CallStmt, ExecuteImmediateStmt};
use crate::ast::query::{OutputSchema, Scan, WithEntry};
use crate::ast::session::{
    AnalyzeStmt, AuxLoadDataStmt, BeginStmt, CloneDataStmt, DefineTableStmt, DescribeStmt,
    ExportMetadataStmt, ExportModelStmt, GrantOrRevokeStmt, ImportStmt, ModuleStmt,
    SetTransactionStmt, ShowStmt, StartBatchStmt,
};

// ============================================================================
// Shared statement pieces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentOp {
    #[default]
    Default,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
}

/// A `name = value` entry of an OPTIONS or hint list.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub qualifier: SmolStr,
    pub name: SmolStr,
    pub value: Expr,
    pub assignment_op: AssignmentOp,
}

impl OptionEntry {
    pub fn new(name: impl Into<SmolStr>, value: Expr) -> Self {
        Self {
            qualifier: SmolStr::default(),
            name: name.into(),
            value,
            assignment_op: AssignmentOp::Default,
        }
    }
}

/// A named output column of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: SmolStr,
    pub column: ResolvedColumn,
}

impl OutputColumn {
    pub fn new(name: impl Into<SmolStr>, column: ResolvedColumn) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

// ============================================================================
// Query statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QueryStmt {
    pub output_column_list: Vec<OutputColumn>,
    pub is_value_table: bool,
    pub query: Box<Scan>,
    pub hint_list: Vec<OptionEntry>,
}

impl QueryStmt {
    pub fn new(output_column_list: Vec<OutputColumn>, query: Scan) -> Self {
        Self {
            output_column_list,
            is_value_table: false,
            query: Box::new(query),
            hint_list: Vec::new(),
        }
    }
}

/// A query that may produce zero or several results or side effects
/// (pipe FORK, TEE, INSERT, EXPORT DATA, CREATE TABLE).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedQueryStmt {
    pub output_schema: Option<OutputSchema>,
    pub query: Box<Scan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainStmt {
    pub statement: Box<Statement>,
}

/// Several statements validated as one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStmt {
    pub statement_list: Vec<Statement>,
}

/// Registers a WITH entry visible to the later statements of the
/// enclosing batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateWithEntryStmt {
    pub with_entry: WithEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDataStmt {
    pub connection: Option<SmolStr>,
    pub option_list: Vec<OptionEntry>,
    pub output_column_list: Vec<OutputColumn>,
    pub is_value_table: bool,
    pub query: Option<Box<Scan>>,
}

// ============================================================================
// Statement - Top-level enum
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(QueryStmt),
    GeneralizedQuery(GeneralizedQueryStmt),
    Explain(ExplainStmt),
    Multi(MultiStmt),
    CreateWithEntry(CreateWithEntryStmt),

    // DDL
    CreateDatabase(CreateDatabaseStmt),
    CreateSchema(CreateSchemaStmt),
    CreateTable(CreateTableStmt),
    CreateTableAsSelect(CreateTableAsSelectStmt),
    CreateExternalTable(CreateExternalTableStmt),
    CreateSnapshotTable(CreateSnapshotTableStmt),
    CreateView(CreateViewStmt),
    CreateMaterializedView(CreateMaterializedViewStmt),
    CreateIndex(CreateIndexStmt),
    CreateFunction(CreateFunctionStmt),
    CreateTableFunction(CreateTableFunctionStmt),
    CreateProcedure(CreateProcedureStmt),
    CreateConstant(CreateConstantStmt),
    CreateModel(CreateModelStmt),
    CreateRowAccessPolicy(CreateRowAccessPolicyStmt),
    CreatePrivilegeRestriction(CreatePrivilegeRestrictionStmt),
    CreateEntity(CreateEntityStmt),
    CreateConnection(CreateWithOptionsStmt),
    CreateSequence(CreateWithOptionsStmt),
    CreatePropertyGraph(CreatePropertyGraphStmt),
    AlterObject(AlterObjectStmt),
    AlterAllRowAccessPolicies(AlterAllRowAccessPoliciesStmt),
    Rename(RenameStmt),
    Drop(DropStmt),
    DropFunction(DropFunctionStmt),
    DropTableFunction(DropStmt),
    DropMaterializedView(DropStmt),
    DropSnapshotTable(DropStmt),
    DropRowAccessPolicy(DropRowAccessPolicyStmt),
    DropPrivilegeRestriction(DropPrivilegeRestrictionStmt),
    DropIndex(DropIndexStmt),
    Undrop(UndropStmt),

    // DML
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Merge(MergeStmt),
    Truncate(TruncateStmt),

    // Transactions and batches
    Begin(BeginStmt),
    SetTransaction(SetTransactionStmt),
    Commit,
    Rollback,
    StartBatch(StartBatchStmt),
    RunBatch,
    AbortBatch,

    // Scripting
    Assert(AssertStmt),
    Assignment(AssignmentStmt),
    ExecuteImmediate(ExecuteImmediateStmt),
    Call(CallStmt),

    // Administrative
    Describe(DescribeStmt),
    Show(ShowStmt),
    DefineTable(DefineTableStmt),
    ExportData(ExportDataStmt),
    ExportModel(ExportModelStmt),
    ExportMetadata(ExportMetadataStmt),
    Grant(GrantOrRevokeStmt),
    Revoke(GrantOrRevokeStmt),
    Analyze(AnalyzeStmt),
    AuxLoadData(AuxLoadDataStmt),
    CloneData(CloneDataStmt),
    Import(ImportStmt),
    Module(ModuleStmt),
}

impl Statement {
    /// Node kind name as used in debug strings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Query(_) => "QueryStmt",
            Statement::GeneralizedQuery(_) => "GeneralizedQueryStmt",
            Statement::Explain(_) => "ExplainStmt",
            Statement::Multi(_) => "MultiStmt",
            Statement::CreateWithEntry(_) => "CreateWithEntryStmt",
            Statement::CreateDatabase(_) => "CreateDatabaseStmt",
            Statement::CreateSchema(_) => "CreateSchemaStmt",
            Statement::CreateTable(_) => "CreateTableStmt",
            Statement::CreateTableAsSelect(_) => "CreateTableAsSelectStmt",
            Statement::CreateExternalTable(_) => "CreateExternalTableStmt",
            Statement::CreateSnapshotTable(_) => "CreateSnapshotTableStmt",
            Statement::CreateView(_) => "CreateViewStmt",
            Statement::CreateMaterializedView(_) => "CreateMaterializedViewStmt",
            Statement::CreateIndex(_) => "CreateIndexStmt",
            Statement::CreateFunction(_) => "CreateFunctionStmt",
            Statement::CreateTableFunction(_) => "CreateTableFunctionStmt",
            Statement::CreateProcedure(_) => "CreateProcedureStmt",
            Statement::CreateConstant(_) => "CreateConstantStmt",
            Statement::CreateModel(_) => "CreateModelStmt",
            Statement::CreateRowAccessPolicy(_) => "CreateRowAccessPolicyStmt",
            Statement::CreatePrivilegeRestriction(_) => "CreatePrivilegeRestrictionStmt",
            Statement::CreateEntity(_) => "CreateEntityStmt",
            Statement::CreateConnection(_) => "CreateConnectionStmt",
            Statement::CreateSequence(_) => "CreateSequenceStmt",
            Statement::CreatePropertyGraph(_) => "CreatePropertyGraphStmt",
            Statement::AlterObject(_) => "AlterObjectStmt",
            Statement::AlterAllRowAccessPolicies(_) => "AlterAllRowAccessPoliciesStmt",
            Statement::Rename(_) => "RenameStmt",
            Statement::Drop(_) => "DropStmt",
            Statement::DropFunction(_) => "DropFunctionStmt",
            Statement::DropTableFunction(_) => "DropTableFunctionStmt",
            Statement::DropMaterializedView(_) => "DropMaterializedViewStmt",
            Statement::DropSnapshotTable(_) => "DropSnapshotTableStmt",
            Statement::DropRowAccessPolicy(_) => "DropRowAccessPolicyStmt",
            Statement::DropPrivilegeRestriction(_) => "DropPrivilegeRestrictionStmt",
            Statement::DropIndex(_) => "DropIndexStmt",
            Statement::Undrop(_) => "UndropStmt",
            Statement::Insert(_) => "InsertStmt",
            Statement::Update(_) => "UpdateStmt",
            Statement::Delete(_) => "DeleteStmt",
            Statement::Merge(_) => "MergeStmt",
            Statement::Truncate(_) => "TruncateStmt",
            Statement::Begin(_) => "BeginStmt",
            Statement::SetTransaction(_) => "SetTransactionStmt",
            Statement::Commit => "CommitStmt",
            Statement::Rollback => "RollbackStmt",
            Statement::StartBatch(_) => "StartBatchStmt",
            Statement::RunBatch => "RunBatchStmt",
            Statement::AbortBatch => "AbortBatchStmt",
            Statement::Assert(_) => "AssertStmt",
            Statement::Assignment(_) => "AssignmentStmt",
            Statement::ExecuteImmediate(_) => "ExecuteImmediateStmt",
            Statement::Call(_) => "CallStmt",
            Statement::Describe(_) => "DescribeStmt",
            Statement::Show(_) => "ShowStmt",
            Statement::DefineTable(_) => "DefineTableStmt",
            Statement::ExportData(_) => "ExportDataStmt",
            Statement::ExportModel(_) => "ExportModelStmt",
            Statement::ExportMetadata(_) => "ExportMetadataStmt",
            Statement::Grant(_) => "GrantStmt",
            Statement::Revoke(_) => "RevokeStmt",
            Statement::Analyze(_) => "AnalyzeStmt",
            Statement::AuxLoadData(_) => "AuxLoadDataStmt",
            Statement::CloneData(_) => "CloneDataStmt",
            Statement::Import(_) => "ImportStmt",
            Statement::Module(_) => "ModuleStmt",
        }
    }

    /// Hints attached to the statement itself, if the kind carries any.
    pub fn hint_list(&self) -> &[OptionEntry] {
        match self {
            Statement::Query(s) => &s.hint_list,
            Statement::Insert(s) => &s.hint_list,
            Statement::Update(s) => &s.hint_list,
            Statement::Delete(s) => &s.hint_list,
            _ => &[],
        }
    }
}
