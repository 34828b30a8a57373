//! Resolved expression nodes.
//!
//! Every expression carries its declared result type in `ty`. The
//! validator checks that this declared type agrees with whatever
//! computation produced it.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::{
    Connection, Constant, FunctionRef, FunctionSignature, Model, PropertyDeclaration,
    PropertyGraph, Sequence,
};
use crate::ast::graph::GraphLabelExpr;
use crate::ast::program::OptionEntry;
use crate::ast::query::Scan;
use crate::ast::types::{Collation, TypeParameters, TypeRef};
use crate::ast::value::Value;

// ============================================================================
// Expression - Top-level expression type
// ============================================================================

/// A resolved scalar (or array, struct, graph) computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Parameter(Parameter),
    ExpressionColumn(ExpressionColumn),
    ColumnRef(ColumnRef),
    Constant(ConstantRef),
    SystemVariable(SystemVariable),
    ArgumentRef(ArgumentRef),
    FunctionCall(FunctionCall),
    AggregateFunctionCall(AggregateFunctionCall),
    AnalyticFunctionCall(AnalyticFunctionCall),
    Cast(Cast),
    MakeStruct(MakeStruct),
    MakeProto(MakeProto),
    GetStructField(GetStructField),
    GetProtoField(GetProtoField),
    GetJsonField(GetJsonField),
    Flatten(Flatten),
    FlattenedArg(FlattenedArg),
    ReplaceField(ReplaceField),
    SubqueryExpr(SubqueryExpr),
    WithExpr(WithExpr),
    DmlDefault(DmlDefault),
    GraphGetElementProperty(GraphGetElementProperty),
    GraphMakeElement(GraphMakeElement),
    GraphIsLabeledPredicate(GraphIsLabeledPredicate),
}

impl Expr {
    /// Returns the declared result type of this expression.
    pub fn ty(&self) -> &TypeRef {
        match self {
            Expr::Literal(e) => &e.ty,
            Expr::Parameter(e) => &e.ty,
            Expr::ExpressionColumn(e) => &e.ty,
            Expr::ColumnRef(e) => &e.ty,
            Expr::Constant(e) => &e.ty,
            Expr::SystemVariable(e) => &e.ty,
            Expr::ArgumentRef(e) => &e.ty,
            Expr::FunctionCall(e) => &e.base.ty,
            Expr::AggregateFunctionCall(e) => &e.base.ty,
            Expr::AnalyticFunctionCall(e) => &e.base.ty,
            Expr::Cast(e) => &e.ty,
            Expr::MakeStruct(e) => &e.ty,
            Expr::MakeProto(e) => &e.ty,
            Expr::GetStructField(e) => &e.ty,
            Expr::GetProtoField(e) => &e.ty,
            Expr::GetJsonField(e) => &e.ty,
            Expr::Flatten(e) => &e.ty,
            Expr::FlattenedArg(e) => &e.ty,
            Expr::ReplaceField(e) => &e.ty,
            Expr::SubqueryExpr(e) => &e.ty,
            Expr::WithExpr(e) => &e.ty,
            Expr::DmlDefault(e) => &e.ty,
            Expr::GraphGetElementProperty(e) => &e.ty,
            Expr::GraphMakeElement(e) => &e.ty,
            Expr::GraphIsLabeledPredicate(e) => &e.ty,
        }
    }

    /// Node kind name as used in debug strings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Literal(_) => "Literal",
            Expr::Parameter(_) => "Parameter",
            Expr::ExpressionColumn(_) => "ExpressionColumn",
            Expr::ColumnRef(_) => "ColumnRef",
            Expr::Constant(_) => "Constant",
            Expr::SystemVariable(_) => "SystemVariable",
            Expr::ArgumentRef(_) => "ArgumentRef",
            Expr::FunctionCall(_) => "FunctionCall",
            Expr::AggregateFunctionCall(_) => "AggregateFunctionCall",
            Expr::AnalyticFunctionCall(_) => "AnalyticFunctionCall",
            Expr::Cast(_) => "Cast",
            Expr::MakeStruct(_) => "MakeStruct",
            Expr::MakeProto(_) => "MakeProto",
            Expr::GetStructField(_) => "GetStructField",
            Expr::GetProtoField(_) => "GetProtoField",
            Expr::GetJsonField(_) => "GetJsonField",
            Expr::Flatten(_) => "Flatten",
            Expr::FlattenedArg(_) => "FlattenedArg",
            Expr::ReplaceField(_) => "ReplaceField",
            Expr::SubqueryExpr(_) => "SubqueryExpr",
            Expr::WithExpr(_) => "WithExpr",
            Expr::DmlDefault(_) => "DMLDefault",
            Expr::GraphGetElementProperty(_) => "GraphGetElementProperty",
            Expr::GraphMakeElement(_) => "GraphMakeElement",
            Expr::GraphIsLabeledPredicate(_) => "GraphIsLabeledPredicate",
        }
    }

    /// Returns the literal if this is a `Literal` node.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the column reference if this is a `ColumnRef` node.
    pub fn as_column_ref(&self) -> Option<&ColumnRef> {
        match self {
            Expr::ColumnRef(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the function call if this is a scalar `FunctionCall`.
    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Expr::FunctionCall(f) => Some(f),
            _ => None,
        }
    }

    /// True for literals and query parameters.
    pub fn is_literal_or_parameter(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Parameter(_))
    }
}

// ============================================================================
// Leaves
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub ty: TypeRef,
    pub value: Value,
    pub has_explicit_type: bool,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self {
            ty: value.ty(),
            value,
            has_explicit_type: false,
        }
    }
}

/// A query parameter; either named or positional, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: TypeRef,
    pub name: SmolStr,
    /// 1-based position for positional parameters, 0 for named ones.
    pub position: i64,
    pub is_untyped: bool,
}

/// A column supplied by the host when evaluating a standalone expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionColumn {
    pub ty: TypeRef,
    pub name: SmolStr,
}

/// A reference to a column defined elsewhere in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub ty: TypeRef,
    pub column: ResolvedColumn,
    /// Set when the column comes from an enclosing scope.
    pub is_correlated: bool,
}

impl ColumnRef {
    pub fn new(column: ResolvedColumn) -> Self {
        Self {
            ty: column.ty.clone(),
            column,
            is_correlated: false,
        }
    }

    pub fn correlated(column: ResolvedColumn) -> Self {
        Self {
            is_correlated: true,
            ..Self::new(column)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRef {
    pub ty: TypeRef,
    pub constant: Arc<Constant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemVariable {
    pub ty: TypeRef,
    pub name_path: Vec<SmolStr>,
}

/// How a function argument may be used inside a SQL function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Scalar,
    Aggregate,
    NotAggregate,
}

/// A reference to an argument of the function or procedure being defined.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentRef {
    pub ty: TypeRef,
    pub name: SmolStr,
    pub argument_kind: ArgumentKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DmlDefault {
    pub ty: TypeRef,
}

// ============================================================================
// Function calls
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    #[default]
    Default,
    /// `SAFE.` prefix: errors become NULL.
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandlingModifier {
    #[default]
    Default,
    IgnoreNulls,
    RespectNulls,
}

/// Fields shared by scalar, aggregate and analytic calls.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallBase {
    pub ty: TypeRef,
    pub function: Option<FunctionRef>,
    pub signature: FunctionSignature,
    pub argument_list: Vec<Expr>,
    pub generic_argument_list: Vec<FunctionArgument>,
    pub error_mode: ErrorMode,
    pub hint_list: Vec<OptionEntry>,
    pub collation_list: Vec<Collation>,
}

impl FunctionCallBase {
    pub fn function_name(&self) -> &str {
        self.function.as_ref().map_or("<null>", |f| f.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub base: FunctionCallBase,
}

/// `HAVING MAX expr` / `HAVING MIN expr` on an aggregate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HavingModifierKind {
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateHavingModifier {
    pub kind: HavingModifierKind,
    pub having_expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFunctionCall {
    pub base: FunctionCallBase,
    pub distinct: bool,
    pub null_handling_modifier: NullHandlingModifier,
    pub having_modifier: Option<AggregateHavingModifier>,
    pub order_by_item_list: Vec<OrderByItem>,
    pub limit: Option<Box<Expr>>,
    /// Inner grouping of a multi-level aggregate.
    pub group_by_list: Vec<ComputedColumn>,
    pub group_by_aggregate_list: Vec<ComputedColumnBase>,
    pub with_group_rows_subquery: Option<Box<Scan>>,
    pub with_group_rows_parameter_list: Vec<ColumnRef>,
}

impl AggregateFunctionCall {
    pub fn new(base: FunctionCallBase) -> Self {
        Self {
            base,
            distinct: false,
            null_handling_modifier: NullHandlingModifier::Default,
            having_modifier: None,
            order_by_item_list: Vec::new(),
            limit: None,
            group_by_list: Vec::new(),
            group_by_aggregate_list: Vec::new(),
            with_group_rows_subquery: None,
            with_group_rows_parameter_list: Vec::new(),
        }
    }

    pub fn is_multi_level(&self) -> bool {
        !self.group_by_list.is_empty() || !self.group_by_aggregate_list.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoundaryType {
    UnboundedPreceding,
    OffsetPreceding,
    CurrentRow,
    OffsetFollowing,
    UnboundedFollowing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrameExpr {
    pub boundary_type: BoundaryType,
    pub expression: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub frame_unit: FrameUnit,
    pub start_expr: WindowFrameExpr,
    pub end_expr: WindowFrameExpr,
}

impl WindowFrame {
    pub fn is_unbounded_both_ways(&self) -> bool {
        self.start_expr.boundary_type == BoundaryType::UnboundedPreceding
            && self.end_expr.boundary_type == BoundaryType::UnboundedFollowing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticFunctionCall {
    pub base: FunctionCallBase,
    pub distinct: bool,
    pub null_handling_modifier: NullHandlingModifier,
    pub window_frame: Option<WindowFrame>,
}

/// A lambda argument. `argument_list` introduces fresh columns visible to
/// the body; `parameter_list` names the outer columns the body may use.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineLambda {
    pub argument_list: Vec<ResolvedColumn>,
    pub parameter_list: Vec<ColumnRef>,
    pub body: Box<Expr>,
}

/// A DESCRIPTOR(...) argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub descriptor_column_name_list: Vec<SmolStr>,
    /// Resolved columns, populated when the descriptor was matched
    /// against a sibling table argument.
    pub descriptor_column_list: Vec<ResolvedColumn>,
}

/// A non-expression (or expression) argument of a function or TVF call.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgument {
    Expr(Expr),
    Scan {
        scan: Box<Scan>,
        argument_column_list: Vec<ResolvedColumn>,
    },
    Model(Arc<Model>),
    Connection(Arc<Connection>),
    Descriptor(Descriptor),
    InlineLambda(InlineLambda),
    Sequence(Arc<Sequence>),
    Graph(Arc<PropertyGraph>),
}

impl FunctionArgument {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FunctionArgument::Expr(_) => "SCALAR",
            FunctionArgument::Scan { .. } => "RELATION",
            FunctionArgument::Model(_) => "MODEL",
            FunctionArgument::Connection(_) => "CONNECTION",
            FunctionArgument::Descriptor(_) => "DESCRIPTOR",
            FunctionArgument::InlineLambda(_) => "LAMBDA",
            FunctionArgument::Sequence(_) => "SEQUENCE",
            FunctionArgument::Graph(_) => "GRAPH",
        }
    }
}

// ============================================================================
// Casts and constructors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub return_null_on_error: bool,
    pub format: Option<Box<Expr>>,
    pub time_zone: Option<Box<Expr>>,
    pub type_parameters: Option<TypeParameters>,
    pub collation: Option<Collation>,
}

impl Cast {
    pub fn new(expr: Expr, ty: TypeRef) -> Self {
        Self {
            ty,
            expr: Box::new(expr),
            return_null_on_error: false,
            format: None,
            time_zone: None,
            type_parameters: None,
            collation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MakeStruct {
    pub ty: TypeRef,
    pub field_list: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MakeProtoField {
    pub field_name: SmolStr,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MakeProto {
    pub ty: TypeRef,
    pub field_list: Vec<MakeProtoField>,
}

// ============================================================================
// Field access
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GetStructField {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub field_idx: usize,
    pub field_expr_is_positional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetProtoField {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub field_name: SmolStr,
    pub default_value: Option<Value>,
    pub get_has_bit: bool,
    pub return_default_value_when_unset: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetJsonField {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub field_name: SmolStr,
}

/// `FLATTEN(expr.a.b)`: `get_field_list` is a chain of accesses rooted at
/// a `FlattenedArg` placeholder standing for each array element.
#[derive(Debug, Clone, PartialEq)]
pub struct Flatten {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub get_field_list: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedArg {
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceFieldItem {
    pub expr: Expr,
    pub struct_index_path: Vec<usize>,
    pub proto_field_path: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceField {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub replace_field_item_list: Vec<ReplaceFieldItem>,
}

// ============================================================================
// Subqueries and scoped expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryType {
    Scalar,
    Array,
    Exists,
    In,
    LikeAny,
    LikeAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub ty: TypeRef,
    pub subquery_type: SubqueryType,
    /// Outer columns the subquery may reference as correlated.
    pub parameter_list: Vec<ColumnRef>,
    pub in_expr: Option<Box<Expr>>,
    pub in_collation: Option<Collation>,
    pub subquery: Box<Scan>,
    pub hint_list: Vec<OptionEntry>,
}

/// `WITH(a AS x, b AS y, body)`: each assignment sees the earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct WithExpr {
    pub ty: TypeRef,
    pub assignment_list: Vec<ComputedColumn>,
    pub expr: Box<Expr>,
}

// ============================================================================
// Graph element expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GraphGetElementProperty {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    /// Statically declared property; absent for dynamic access.
    pub property: Option<PropertyDeclaration>,
    /// Key expression for dynamic (string-keyed) access.
    pub property_name: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphMakeProperty {
    pub name: SmolStr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphMakeElement {
    pub ty: TypeRef,
    pub identifier: Box<Expr>,
    pub property_list: Vec<GraphMakeProperty>,
    pub label_list: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphIsLabeledPredicate {
    pub ty: TypeRef,
    pub is_not: bool,
    pub expr: Box<Expr>,
    pub label_expr: GraphLabelExpr,
}

// ============================================================================
// Column definitions shared by scans and statements
// ============================================================================

/// Defines `column` as the value of `expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedColumn {
    pub column: ResolvedColumn,
    pub expr: Expr,
}

impl ComputedColumn {
    pub fn new(column: ResolvedColumn, expr: Expr) -> Self {
        Self { column, expr }
    }
}

/// A computed column whose errors are deferred into `side_effect_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredComputedColumn {
    pub column: ResolvedColumn,
    pub expr: Expr,
    pub side_effect_column: ResolvedColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputedColumnBase {
    Computed(ComputedColumn),
    Deferred(DeferredComputedColumn),
}

impl ComputedColumnBase {
    pub fn column(&self) -> &ResolvedColumn {
        match self {
            ComputedColumnBase::Computed(c) => &c.column,
            ComputedColumnBase::Deferred(c) => &c.column,
        }
    }

    pub fn expr(&self) -> &Expr {
        match self {
            ComputedColumnBase::Computed(c) => &c.expr,
            ComputedColumnBase::Deferred(c) => &c.expr,
        }
    }
}

impl From<ComputedColumn> for ComputedColumnBase {
    fn from(column: ComputedColumn) -> Self {
        ComputedColumnBase::Computed(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullOrder {
    #[default]
    OrderUnspecified,
    NullsFirst,
    NullsLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column_ref: ColumnRef,
    pub collation_name: Option<Box<Expr>>,
    pub is_descending: bool,
    pub null_order: NullOrder,
    pub collation: Option<Collation>,
}

impl OrderByItem {
    pub fn new(column_ref: ColumnRef) -> Self {
        Self {
            column_ref,
            collation_name: None,
            is_descending: false,
            null_order: NullOrder::OrderUnspecified,
            collation: None,
        }
    }
}
