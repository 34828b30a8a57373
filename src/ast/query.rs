//! Resolved relational operators ("scans").
//!
//! Every scan produces rows over its `column_list`. The columns in that
//! list must be a subset of what the scan's own logic makes available:
//! its input scan's columns plus whatever the scan itself introduces.
//!
//! # Scan families
//!
//! - **Leaves**: single row, table, WITH reference, recursive reference,
//!   relation argument, subpipeline input
//! - **Relational operators**: join, array, filter, project, aggregate,
//!   set operation, order by, limit, analytic, sample, TVF
//! - **Reshaping**: pivot, unpivot, match-recognize
//! - **Pipe operators**: IF, FORK, TEE, LOG, EXPORT DATA, INSERT, CREATE TABLE
//! - **Graph scans**: see [`crate::ast::graph`]

use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::{FunctionSignature, TableRef, TableValuedFunction};
use crate::ast::expression::{
    ColumnRef, ComputedColumn, ComputedColumnBase, Expr, FunctionArgument, OrderByItem,
};
use crate::ast::graph::{
    GraphCallScan, GraphEdgeScan, GraphLinearScan, GraphNodeScan, GraphPathScan, GraphRefScan,
    GraphScan, GraphTableScan,
};
use crate::ast::mutation::InsertStmt;
use crate::ast::catalog::CreateTableAsSelectStmt;
use crate::ast::program::{ExportDataStmt, OptionEntry, OutputColumn};
use crate::ast::types::Collation;
use crate::ast::value::Value;

// ============================================================================
// Scan - Top-level relational node
// ============================================================================

/// Fields every scan carries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanBase {
    pub column_list: Vec<ResolvedColumn>,
    pub hint_list: Vec<OptionEntry>,
    /// Set when the scan produces an ordered stream.
    pub is_ordered: bool,
}

impl ScanBase {
    pub fn new(column_list: Vec<ResolvedColumn>) -> Self {
        Self {
            column_list,
            hint_list: Vec::new(),
            is_ordered: false,
        }
    }

    pub fn ordered(column_list: Vec<ResolvedColumn>) -> Self {
        Self {
            is_ordered: true,
            ..Self::new(column_list)
        }
    }
}

/// A resolved relational operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Scan {
    SingleRow(SingleRowScan),
    Table(TableScan),
    Join(JoinScan),
    Array(ArrayScan),
    Filter(FilterScan),
    Project(ProjectScan),
    Aggregate(AggregateScan),
    AnonymizedAggregate(AnonymizedAggregateScan),
    DifferentialPrivacyAggregate(DifferentialPrivacyAggregateScan),
    AggregationThresholdAggregate(AggregationThresholdAggregateScan),
    SetOperation(SetOperationScan),
    OrderBy(OrderByScan),
    LimitOffset(LimitOffsetScan),
    WithRef(WithRefScan),
    With(WithScan),
    Analytic(AnalyticScan),
    Sample(SampleScan),
    Tvf(TvfScan),
    RelationArgument(RelationArgumentScan),
    Recursive(RecursiveScan),
    RecursiveRef(RecursiveRefScan),
    Pivot(PivotScan),
    Unpivot(UnpivotScan),
    MatchRecognize(MatchRecognizeScan),
    Barrier(BarrierScan),
    Assert(AssertScan),
    ExecuteAsRole(ExecuteAsRoleScan),
    StaticDescribe(StaticDescribeScan),
    Log(LogScan),
    PipeIf(PipeIfScan),
    PipeFork(PipeForkScan),
    PipeTee(PipeTeeScan),
    PipeExportData(PipeExportDataScan),
    PipeInsert(PipeInsertScan),
    PipeCreateTable(PipeCreateTableScan),
    SubpipelineInput(SubpipelineInputScan),
    GroupRows(GroupRowsScan),
    GraphTable(GraphTableScan),
    Graph(GraphScan),
    GraphPath(GraphPathScan),
    GraphNode(GraphNodeScan),
    GraphEdge(GraphEdgeScan),
    GraphLinear(GraphLinearScan),
    GraphRef(GraphRefScan),
    GraphCall(GraphCallScan),
}

macro_rules! scan_base {
    ($scan:expr, $s:ident => $body:expr) => {
        match $scan {
            Scan::SingleRow($s) => $body,
            Scan::Table($s) => $body,
            Scan::Join($s) => $body,
            Scan::Array($s) => $body,
            Scan::Filter($s) => $body,
            Scan::Project($s) => $body,
            Scan::Aggregate($s) => $body,
            Scan::AnonymizedAggregate($s) => $body,
            Scan::DifferentialPrivacyAggregate($s) => $body,
            Scan::AggregationThresholdAggregate($s) => $body,
            Scan::SetOperation($s) => $body,
            Scan::OrderBy($s) => $body,
            Scan::LimitOffset($s) => $body,
            Scan::WithRef($s) => $body,
            Scan::With($s) => $body,
            Scan::Analytic($s) => $body,
            Scan::Sample($s) => $body,
            Scan::Tvf($s) => $body,
            Scan::RelationArgument($s) => $body,
            Scan::Recursive($s) => $body,
            Scan::RecursiveRef($s) => $body,
            Scan::Pivot($s) => $body,
            Scan::Unpivot($s) => $body,
            Scan::MatchRecognize($s) => $body,
            Scan::Barrier($s) => $body,
            Scan::Assert($s) => $body,
            Scan::ExecuteAsRole($s) => $body,
            Scan::StaticDescribe($s) => $body,
            Scan::Log($s) => $body,
            Scan::PipeIf($s) => $body,
            Scan::PipeFork($s) => $body,
            Scan::PipeTee($s) => $body,
            Scan::PipeExportData($s) => $body,
            Scan::PipeInsert($s) => $body,
            Scan::PipeCreateTable($s) => $body,
            Scan::SubpipelineInput($s) => $body,
            Scan::GroupRows($s) => $body,
            Scan::GraphTable($s) => $body,
            Scan::Graph($s) => $body,
            Scan::GraphPath($s) => $body,
            Scan::GraphNode($s) => $body,
            Scan::GraphEdge($s) => $body,
            Scan::GraphLinear($s) => $body,
            Scan::GraphRef($s) => $body,
            Scan::GraphCall($s) => $body,
        }
    };
}

impl Scan {
    pub fn base(&self) -> &ScanBase {
        scan_base!(self, s => &s.base)
    }

    pub fn column_list(&self) -> &[ResolvedColumn] {
        &self.base().column_list
    }

    pub fn is_ordered(&self) -> bool {
        self.base().is_ordered
    }

    /// Node kind name as used in debug strings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scan::SingleRow(_) => "SingleRowScan",
            Scan::Table(_) => "TableScan",
            Scan::Join(_) => "JoinScan",
            Scan::Array(_) => "ArrayScan",
            Scan::Filter(_) => "FilterScan",
            Scan::Project(_) => "ProjectScan",
            Scan::Aggregate(_) => "AggregateScan",
            Scan::AnonymizedAggregate(_) => "AnonymizedAggregateScan",
            Scan::DifferentialPrivacyAggregate(_) => "DifferentialPrivacyAggregateScan",
            Scan::AggregationThresholdAggregate(_) => "AggregationThresholdAggregateScan",
            Scan::SetOperation(_) => "SetOperationScan",
            Scan::OrderBy(_) => "OrderByScan",
            Scan::LimitOffset(_) => "LimitOffsetScan",
            Scan::WithRef(_) => "WithRefScan",
            Scan::With(_) => "WithScan",
            Scan::Analytic(_) => "AnalyticScan",
            Scan::Sample(_) => "SampleScan",
            Scan::Tvf(_) => "TVFScan",
            Scan::RelationArgument(_) => "RelationArgumentScan",
            Scan::Recursive(_) => "RecursiveScan",
            Scan::RecursiveRef(_) => "RecursiveRefScan",
            Scan::Pivot(_) => "PivotScan",
            Scan::Unpivot(_) => "UnpivotScan",
            Scan::MatchRecognize(_) => "MatchRecognizeScan",
            Scan::Barrier(_) => "BarrierScan",
            Scan::Assert(_) => "AssertScan",
            Scan::ExecuteAsRole(_) => "ExecuteAsRoleScan",
            Scan::StaticDescribe(_) => "StaticDescribeScan",
            Scan::Log(_) => "LogScan",
            Scan::PipeIf(_) => "PipeIfScan",
            Scan::PipeFork(_) => "PipeForkScan",
            Scan::PipeTee(_) => "PipeTeeScan",
            Scan::PipeExportData(_) => "PipeExportDataScan",
            Scan::PipeInsert(_) => "PipeInsertScan",
            Scan::PipeCreateTable(_) => "PipeCreateTableScan",
            Scan::SubpipelineInput(_) => "SubpipelineInputScan",
            Scan::GroupRows(_) => "GroupRowsScan",
            Scan::GraphTable(_) => "GraphTableScan",
            Scan::Graph(_) => "GraphScan",
            Scan::GraphPath(_) => "GraphPathScan",
            Scan::GraphNode(_) => "GraphNodeScan",
            Scan::GraphEdge(_) => "GraphEdgeScan",
            Scan::GraphLinear(_) => "GraphLinearScan",
            Scan::GraphRef(_) => "GraphRefScan",
            Scan::GraphCall(_) => "GraphCallScan",
        }
    }
}

// ============================================================================
// Leaf scans
// ============================================================================

/// Produces exactly one row with no columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleRowScan {
    pub base: ScanBase,
}

/// Reads a catalog table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableScan {
    pub base: ScanBase,
    pub table: TableRef,
    pub for_system_time_expr: Option<Box<Expr>>,
    /// For each entry of `column_list`, the ordinal of the table column
    /// it reads.
    pub column_index_list: Vec<usize>,
    pub alias: SmolStr,
}

/// References a named WITH subquery visible in an enclosing `WithScan`.
#[derive(Debug, Clone, PartialEq)]
pub struct WithRefScan {
    pub base: ScanBase,
    pub with_query_name: SmolStr,
}

/// The back-reference to the enclosing recursive scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecursiveRefScan {
    pub base: ScanBase,
}

/// A table-typed argument inside a table function body.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationArgumentScan {
    pub base: ScanBase,
    pub name: SmolStr,
    pub is_value_table: bool,
}

/// Stand-in for the input of the enclosing subpipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubpipelineInputScan {
    pub base: ScanBase,
}

/// The rows of the current group, read inside a `WITH GROUP ROWS`
/// subquery. Reuses the column ids of the aggregate's input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupRowsScan {
    pub base: ScanBase,
}

// ============================================================================
// Joins and arrays
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinScan {
    pub base: ScanBase,
    pub join_type: JoinType,
    pub left_scan: Box<Scan>,
    pub right_scan: Box<Scan>,
    pub join_expr: Option<Box<Expr>>,
    pub has_using: bool,
    pub is_lateral: bool,
    /// Left-side columns the right side of a LATERAL join may reference.
    pub parameter_list: Vec<ColumnRef>,
}

impl JoinScan {
    pub fn inner(base: ScanBase, left: Scan, right: Scan, join_expr: Option<Expr>) -> Self {
        Self {
            base,
            join_type: JoinType::Inner,
            left_scan: Box::new(left),
            right_scan: Box::new(right),
            join_expr: join_expr.map(Box::new),
            has_using: false,
            is_lateral: false,
            parameter_list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayZipMode {
    Pad,
    Truncate,
    Strict,
}

/// UNNEST of one or more arrays, optionally joined to an input scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayScan {
    pub base: ScanBase,
    pub input_scan: Option<Box<Scan>>,
    pub array_expr_list: Vec<Expr>,
    pub element_column_list: Vec<ResolvedColumn>,
    pub array_offset_column: Option<ResolvedColumn>,
    pub join_expr: Option<Box<Expr>>,
    pub is_outer: bool,
    pub array_zip_mode: Option<ArrayZipMode>,
}

// ============================================================================
// Filtering, projection, ordering
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FilterScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub filter_expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectScan {
    pub base: ScanBase,
    pub expr_list: Vec<ComputedColumn>,
    pub input_scan: Box<Scan>,
}

impl ProjectScan {
    pub fn new(base: ScanBase, expr_list: Vec<ComputedColumn>, input_scan: Scan) -> Self {
        Self {
            base,
            expr_list,
            input_scan: Box::new(input_scan),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub order_by_item_list: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitOffsetScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub limit: Option<Box<Expr>>,
    pub offset: Option<Box<Expr>>,
}

// ============================================================================
// Aggregation
// ============================================================================

/// One explicit grouping set; `column_list` holds group-by columns.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingSetMultiColumn {
    pub column_list: Vec<ColumnRef>,
}

/// An element of GROUP BY GROUPING SETS / ROLLUP / CUBE.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingSetBase {
    GroupingSet(Vec<ColumnRef>),
    Rollup(Vec<GroupingSetMultiColumn>),
    Cube(Vec<GroupingSetMultiColumn>),
}

/// A `GROUPING(col)` call computed by the aggregate scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingCall {
    pub group_by_column: ColumnRef,
    pub output_column: ResolvedColumn,
}

/// Fields shared by all aggregate scan variants.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateScanBase {
    pub input_scan: Box<Scan>,
    pub group_by_list: Vec<ComputedColumn>,
    pub collation_list: Vec<Collation>,
    pub aggregate_list: Vec<ComputedColumnBase>,
    pub grouping_set_list: Vec<GroupingSetBase>,
    /// Legacy ROLLUP representation; when set, `grouping_set_list` holds
    /// every prefix of it.
    pub rollup_column_list: Vec<ColumnRef>,
    pub grouping_call_list: Vec<GroupingCall>,
}

impl AggregateScanBase {
    pub fn new(
        input_scan: Scan,
        group_by_list: Vec<ComputedColumn>,
        aggregate_list: Vec<ComputedColumnBase>,
    ) -> Self {
        Self {
            input_scan: Box::new(input_scan),
            group_by_list,
            collation_list: Vec::new(),
            aggregate_list,
            grouping_set_list: Vec::new(),
            rollup_column_list: Vec::new(),
            grouping_call_list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateScan {
    pub base: ScanBase,
    pub aggregate: AggregateScanBase,
}

impl AggregateScan {
    pub fn new(base: ScanBase, aggregate: AggregateScanBase) -> Self {
        Self { base, aggregate }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonymizedAggregateScan {
    pub base: ScanBase,
    pub aggregate: AggregateScanBase,
    pub k_threshold_expr: Option<Box<Expr>>,
    pub anonymization_option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialPrivacyAggregateScan {
    pub base: ScanBase,
    pub aggregate: AggregateScanBase,
    pub group_selection_threshold_expr: Option<Box<Expr>>,
    pub option_list: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationThresholdAggregateScan {
    pub base: ScanBase,
    pub aggregate: AggregateScanBase,
    pub option_list: Vec<OptionEntry>,
}

// ============================================================================
// Set operations and WITH
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperationType {
    UnionAll,
    UnionDistinct,
    IntersectAll,
    IntersectDistinct,
    ExceptAll,
    ExceptDistinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOperationColumnMatchMode {
    #[default]
    ByPosition,
    Corresponding,
    CorrespondingBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOperationColumnPropagationMode {
    #[default]
    Strict,
    Inner,
    Left,
    Full,
}

/// One input of a set operation: a scan plus the columns it contributes,
/// positionally aligned with the enclosing scan's `column_list`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperationItem {
    pub scan: Box<Scan>,
    pub output_column_list: Vec<ResolvedColumn>,
}

impl SetOperationItem {
    pub fn new(scan: Scan, output_column_list: Vec<ResolvedColumn>) -> Self {
        Self {
            scan: Box::new(scan),
            output_column_list,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperationScan {
    pub base: ScanBase,
    pub op_type: SetOperationType,
    pub input_item_list: Vec<SetOperationItem>,
    pub column_match_mode: SetOperationColumnMatchMode,
    pub column_propagation_mode: SetOperationColumnPropagationMode,
}

impl SetOperationScan {
    pub fn new(
        base: ScanBase,
        op_type: SetOperationType,
        input_item_list: Vec<SetOperationItem>,
    ) -> Self {
        Self {
            base,
            op_type,
            input_item_list,
            column_match_mode: SetOperationColumnMatchMode::ByPosition,
            column_propagation_mode: SetOperationColumnPropagationMode::Strict,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithEntry {
    pub with_query_name: SmolStr,
    pub with_subquery: Box<Scan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithScan {
    pub base: ScanBase,
    pub with_entry_list: Vec<WithEntry>,
    pub query: Box<Scan>,
    pub recursive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursiveSetOperationType {
    UnionAll,
    UnionDistinct,
}

/// Optional depth bound and depth column of a recursive scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursionDepthModifier {
    pub lower_bound: Option<Box<Expr>>,
    pub upper_bound: Option<Box<Expr>>,
    pub recursion_depth_column: ResolvedColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveScan {
    pub base: ScanBase,
    pub op_type: RecursiveSetOperationType,
    pub non_recursive_term: SetOperationItem,
    pub recursive_term: SetOperationItem,
    pub recursion_depth_modifier: Option<RecursionDepthModifier>,
}

// ============================================================================
// Analytic functions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WindowPartitioning {
    pub partition_by_list: Vec<ColumnRef>,
    pub hint_list: Vec<OptionEntry>,
    pub collation_list: Vec<Collation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOrdering {
    pub order_by_item_list: Vec<OrderByItem>,
    pub hint_list: Vec<OptionEntry>,
}

/// Analytic calls sharing one PARTITION BY / ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticFunctionGroup {
    pub partition_by: Option<WindowPartitioning>,
    pub order_by: Option<WindowOrdering>,
    pub analytic_function_list: Vec<ComputedColumnBase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub function_group_list: Vec<AnalyticFunctionGroup>,
}

// ============================================================================
// Sampling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleUnit {
    Rows,
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub method: SmolStr,
    pub size: Box<Expr>,
    pub unit: SampleUnit,
    pub repeatable_argument: Option<Box<Expr>>,
    pub weight_column: Option<ResolvedColumn>,
    pub partition_by_list: Vec<Expr>,
}

// ============================================================================
// Table-valued functions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TvfScan {
    pub base: ScanBase,
    pub tvf: Arc<TableValuedFunction>,
    /// Concrete signature of this call; its result is the output relation.
    pub signature: FunctionSignature,
    pub argument_list: Vec<FunctionArgument>,
    /// For each entry of `column_list`, the ordinal of the result column.
    pub column_index_list: Vec<usize>,
    pub alias: SmolStr,
}

// ============================================================================
// PIVOT / UNPIVOT
// ============================================================================

/// One output cell of a PIVOT: `pivot_expr_list[pivot_expr_index]`
/// evaluated for `pivot_value_list[pivot_value_index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotColumn {
    pub column: ResolvedColumn,
    pub pivot_expr_index: usize,
    pub pivot_value_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub group_by_list: Vec<ComputedColumn>,
    pub pivot_expr_list: Vec<Expr>,
    pub for_expr: Box<Expr>,
    pub pivot_value_list: Vec<Expr>,
    pub pivot_column_list: Vec<PivotColumn>,
}

/// One IN group of an UNPIVOT.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpivotArg {
    pub column_list: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnpivotScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub value_column_list: Vec<ResolvedColumn>,
    pub label_column: ResolvedColumn,
    pub label_list: Vec<Value>,
    pub unpivot_arg_list: Vec<UnpivotArg>,
    pub projected_input_column_list: Vec<ComputedColumn>,
    pub include_nulls: bool,
}

// ============================================================================
// MATCH_RECOGNIZE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecognizeVariableDefinition {
    pub name: SmolStr,
    pub predicate: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternOperationType {
    Concat,
    Alternate,
}

/// Row pattern of a MATCH_RECOGNIZE.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchRecognizePattern {
    Empty,
    Anchor(PatternAnchor),
    VariableRef(SmolStr),
    Operation {
        op_type: PatternOperationType,
        operand_list: Vec<MatchRecognizePattern>,
    },
    Quantification {
        operand: Box<MatchRecognizePattern>,
        lower_bound: Option<Box<Expr>>,
        upper_bound: Option<Box<Expr>>,
        is_reluctant: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterMatchSkipMode {
    EndOfMatch,
    NextRow,
}

/// Measures computed over the rows matched by one pattern variable, or
/// over all matched rows when `pattern_variable_ref` is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureGroup {
    pub pattern_variable_ref: Option<SmolStr>,
    pub aggregate_list: Vec<ComputedColumnBase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecognizeScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub option_list: Vec<OptionEntry>,
    pub partition_by: Option<WindowPartitioning>,
    pub order_by: WindowOrdering,
    pub pattern_variable_definition_list: Vec<MatchRecognizeVariableDefinition>,
    pub pattern: MatchRecognizePattern,
    pub after_match_skip_mode: AfterMatchSkipMode,
    pub measure_group_list: Vec<MeasureGroup>,
    pub match_number_column: ResolvedColumn,
    pub match_row_number_column: ResolvedColumn,
    pub classifier_column: ResolvedColumn,
}

// ============================================================================
// Wrappers
// ============================================================================

/// Optimization barrier; passes its input through.
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
}

/// Pipe ASSERT: fails the query when `condition` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub condition: Box<Expr>,
    pub message: Box<Expr>,
}

/// Runs its input with the privileges of the view owner. Output columns
/// are fresh copies of the input columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteAsRoleScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
}

/// Pipe STATIC_DESCRIBE.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticDescribeScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub describe_text: SmolStr,
}

/// A pipe subpipeline; reads its input through one `SubpipelineInputScan`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subpipeline {
    pub scan: Box<Scan>,
}

/// Output schema of a generalized-query subpipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub output_column_list: Vec<OutputColumn>,
    pub is_value_table: bool,
}

/// A subpipeline of FORK/TEE, optionally producing an extra result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedQuerySubpipeline {
    pub subpipeline: Subpipeline,
    pub output_schema: Option<OutputSchema>,
}

/// Pipe LOG: runs a side subpipeline and passes the input through.
#[derive(Debug, Clone, PartialEq)]
pub struct LogScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub subpipeline: Subpipeline,
    pub output_schema: Option<OutputSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeIfCase {
    /// Absent only for a trailing ELSE.
    pub condition: Option<Expr>,
    pub subpipeline_sql: SmolStr,
    /// Resolved only for the selected case.
    pub subpipeline: Option<Subpipeline>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeIfScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub selected_case: Option<usize>,
    pub if_case_list: Vec<PipeIfCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeForkScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub subpipeline_list: Vec<GeneralizedQuerySubpipeline>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeTeeScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub subpipeline_list: Vec<GeneralizedQuerySubpipeline>,
}

/// Pipe EXPORT DATA; the statement's query reads the pipe input.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeExportDataScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub export_data_stmt: Box<ExportDataStmt>,
}

/// Pipe INSERT; the statement's query reads the pipe input.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeInsertScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub insert_stmt: Box<InsertStmt>,
}

/// Pipe CREATE TABLE; the statement's query reads the pipe input.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeCreateTableScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub create_table_as_select_stmt: Box<CreateTableAsSelectStmt>,
}
