//! Tree-shaped debug rendering of resolved nodes.
//!
//! ```text
//! QueryStmt
//! +-output_column_list=
//! | +-$query.five#1 AS five [INT64]
//! +-query=
//!   +-ProjectScan
//!     +-column_list=[$query.five#1]
//!     +-expr_list=
//!     | +-five#1 := Literal(type=INT64, value=5)
//!     +-input_scan=
//!       +-SingleRowScan
//! ```
//!
//! Rendering can mark one node (identified by its address) with
//! `(validation failed here)`; the byte range of the marked line is
//! reported so diagnostics can label it.

use std::fmt::Display;
use std::ops::Range;

use smol_str::SmolStr;

use crate::ast::catalog::{
    AlterAction, CheckConstraint, ColumnDefinition, CreateTableBase, CreateViewBase, ForeignKey,
};
use crate::ast::column::{ResolvedColumn, column_list_debug_string};
use crate::ast::descriptors::{FunctionSignature, SignatureArgument, SignatureArgumentKind};
use crate::ast::expression::{
    AggregateFunctionCall, ComputedColumn, ComputedColumnBase, Expr, FunctionArgument,
    FunctionCallBase, OrderByItem, WindowFrame, WindowFrameExpr,
};
use crate::ast::graph::{GraphElementTable, GraphLabelExpr, GraphPathScan};
use crate::ast::mutation::{
    DeleteStmt, InsertRow, InsertStmt, OnConflictClause, ReturningClause, UpdateItem, UpdateStmt,
};
use crate::ast::program::{OptionEntry, OutputColumn, Statement};
use crate::ast::query::{
    AggregateScanBase, AnalyticFunctionGroup, GeneralizedQuerySubpipeline, GroupingSetBase,
    MatchRecognizePattern, Scan, SetOperationItem, Subpipeline, WindowOrdering,
    WindowPartitioning,
};

/// Suffix appended to the node a validation failure is attributed to.
pub const FAILURE_MARKER: &str = " (validation failed here)";

/// Identity of a node for failure attribution.
pub fn node_address<T>(node: &T) -> usize {
    std::ptr::from_ref(node) as usize
}

// ============================================================================
// Generic debug tree
// ============================================================================

#[derive(Debug, Clone)]
enum DebugField {
    Text { name: &'static str, value: String },
    Node { name: &'static str, node: DebugNode },
    List { name: &'static str, nodes: Vec<DebugNode> },
}

/// One rendered node: a label line plus named fields.
#[derive(Debug, Clone)]
pub struct DebugNode {
    label: String,
    addrs: Vec<usize>,
    fields: Vec<DebugField>,
}

impl DebugNode {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            addrs: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn at<T>(mut self, node: &T) -> Self {
        self.addrs.push(node_address(node));
        self
    }

    fn text(mut self, name: &'static str, value: impl Display) -> Self {
        self.fields.push(DebugField::Text {
            name,
            value: value.to_string(),
        });
        self
    }

    fn text_if(self, cond: bool, name: &'static str, value: impl Display) -> Self {
        if cond { self.text(name, value) } else { self }
    }

    fn flag(self, name: &'static str, value: bool) -> Self {
        self.text_if(value, name, "TRUE")
    }

    fn columns(self, name: &'static str, columns: &[ResolvedColumn]) -> Self {
        self.text_if(!columns.is_empty(), name, column_list_debug_string(columns))
    }

    fn path(self, name: &'static str, path: &[SmolStr]) -> Self {
        self.text_if(!path.is_empty(), name, join_path(path))
    }

    fn child(mut self, name: &'static str, node: DebugNode) -> Self {
        self.fields.push(DebugField::Node { name, node });
        self
    }

    fn opt_child<T: ToDebugNode + ?Sized>(self, name: &'static str, node: Option<&T>) -> Self {
        match node {
            Some(n) => self.child(name, n.debug_node()),
            None => self,
        }
    }

    fn list<'a, T, I>(mut self, name: &'static str, items: I) -> Self
    where
        T: ToDebugNode + 'a + ?Sized,
        I: IntoIterator<Item = &'a T>,
    {
        let nodes: Vec<DebugNode> = items.into_iter().map(ToDebugNode::debug_node).collect();
        if !nodes.is_empty() {
            self.fields.push(DebugField::List { name, nodes });
        }
        self
    }

    fn nodes(mut self, name: &'static str, nodes: Vec<DebugNode>) -> Self {
        if !nodes.is_empty() {
            self.fields.push(DebugField::List { name, nodes });
        }
        self
    }

    fn render(
        &self,
        first: &str,
        rest: &str,
        failed_at: Option<usize>,
        out: &mut String,
        marked: &mut Option<Range<usize>>,
    ) {
        out.push_str(first);
        let label_start = out.len();
        out.push_str(&self.label);
        if marked.is_none() {
            if let Some(addr) = failed_at {
                if self.addrs.contains(&addr) {
                    out.push_str(FAILURE_MARKER);
                    *marked = Some(label_start..out.len());
                }
            }
        }
        out.push('\n');

        let count = self.fields.len();
        for (i, field) in self.fields.iter().enumerate() {
            let branch = format!("{rest}+-");
            let child_rest = if i + 1 == count {
                format!("{rest}  ")
            } else {
                format!("{rest}| ")
            };
            match field {
                DebugField::Text { name, value } => {
                    out.push_str(&format!("{branch}{name}={value}\n"));
                }
                DebugField::Node { name, node } => {
                    out.push_str(&format!("{branch}{name}=\n"));
                    node.render(
                        &format!("{child_rest}+-"),
                        &format!("{child_rest}  "),
                        failed_at,
                        out,
                        marked,
                    );
                }
                DebugField::List { name, nodes } => {
                    out.push_str(&format!("{branch}{name}=\n"));
                    for (j, node) in nodes.iter().enumerate() {
                        let node_rest = if j + 1 == nodes.len() {
                            format!("{child_rest}  ")
                        } else {
                            format!("{child_rest}| ")
                        };
                        node.render(
                            &format!("{child_rest}+-"),
                            &node_rest,
                            failed_at,
                            out,
                            marked,
                        );
                    }
                }
            }
        }
    }
}

/// Debug text with the optional location of the marked node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDebugString {
    pub text: String,
    /// Byte range of the marked node's label within `text`.
    pub marked_span: Option<Range<usize>>,
}

/// Types that render as a debug tree.
pub trait ToDebugNode {
    fn debug_node(&self) -> DebugNode;
}

/// Renders `node` as a debug tree.
pub fn debug_string<T: ToDebugNode + ?Sized>(node: &T) -> String {
    annotated_debug_string(node, None).text
}

/// Renders `node`, marking the node whose address is `failed_at`.
pub fn annotated_debug_string<T: ToDebugNode + ?Sized>(
    node: &T,
    failed_at: Option<usize>,
) -> AnnotatedDebugString {
    let mut text = String::new();
    let mut marked_span = None;
    node.debug_node()
        .render("", "", failed_at, &mut text, &mut marked_span);
    AnnotatedDebugString { text, marked_span }
}

fn join_path(path: &[SmolStr]) -> String {
    path.iter().map(SmolStr::as_str).collect::<Vec<_>>().join(".")
}

fn signature_string(signature: &FunctionSignature) -> String {
    fn argument_string(arg: &SignatureArgument) -> String {
        match &arg.kind {
            SignatureArgumentKind::Fixed(ty) => ty.to_string(),
            other => other.kind_name().to_string(),
        }
    }
    let args = signature
        .arguments
        .iter()
        .map(argument_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({args}) -> {}", argument_string(&signature.result))
}

// ============================================================================
// Expressions
// ============================================================================

impl ToDebugNode for Expr {
    fn debug_node(&self) -> DebugNode {
        let node = match self {
            Expr::Literal(l) => DebugNode::new(format!("Literal(type={}, value={})", l.ty, l.value)),
            Expr::Parameter(p) => {
                if p.name.is_empty() {
                    DebugNode::new(format!("Parameter(type={}, position={})", p.ty, p.position))
                } else {
                    DebugNode::new(format!("Parameter(type={}, name=\"{}\")", p.ty, p.name))
                }
            }
            Expr::ExpressionColumn(c) => {
                DebugNode::new(format!("ExpressionColumn(type={}, name=\"{}\")", c.ty, c.name))
            }
            Expr::ColumnRef(c) => DebugNode::new(format!(
                "ColumnRef(type={}, column={}{})",
                c.ty,
                c.column,
                if c.is_correlated { ", is_correlated=TRUE" } else { "" }
            )),
            Expr::Constant(c) => {
                DebugNode::new(format!("Constant({}, type={})", c.constant.name, c.ty))
            }
            Expr::SystemVariable(v) => DebugNode::new(format!(
                "SystemVariable({}, type={})",
                join_path(&v.name_path),
                v.ty
            )),
            Expr::ArgumentRef(a) => {
                DebugNode::new(format!("ArgumentRef(type={}, name=\"{}\")", a.ty, a.name))
            }
            Expr::FunctionCall(f) => function_call_node("FunctionCall", &f.base),
            Expr::AggregateFunctionCall(f) => aggregate_call_node(f),
            Expr::AnalyticFunctionCall(f) => function_call_node("AnalyticFunctionCall", &f.base)
                .flag("distinct", f.distinct)
                .opt_child("window_frame", f.window_frame.as_ref()),
            Expr::Cast(c) => DebugNode::new(format!("Cast({} -> {})", c.expr.ty(), c.ty))
                .child("expr", c.expr.debug_node())
                .flag("return_null_on_error", c.return_null_on_error)
                .opt_child("format", c.format.as_deref())
                .opt_child("time_zone", c.time_zone.as_deref())
                .text_if(
                    c.collation.is_some(),
                    "collation",
                    c.collation.as_ref().map(ToString::to_string).unwrap_or_default(),
                ),
            Expr::MakeStruct(m) => {
                DebugNode::new(format!("MakeStruct(type={})", m.ty)).list("field_list", &m.field_list)
            }
            Expr::MakeProto(m) => DebugNode::new(format!("MakeProto(type={})", m.ty)).nodes(
                "field_list",
                m.field_list
                    .iter()
                    .map(|f| {
                        DebugNode::new(format!("MakeProtoField({})", f.field_name))
                            .child("expr", f.expr.debug_node())
                    })
                    .collect(),
            ),
            Expr::GetStructField(g) => {
                DebugNode::new(format!("GetStructField(type={}, field_idx={})", g.ty, g.field_idx))
                    .child("expr", g.expr.debug_node())
            }
            Expr::GetProtoField(g) => DebugNode::new(format!(
                "GetProtoField(type={}, field_descriptor={})",
                g.ty, g.field_name
            ))
            .child("expr", g.expr.debug_node())
            .flag("get_has_bit", g.get_has_bit)
            .text_if(
                g.default_value.is_some(),
                "default_value",
                g.default_value.as_ref().map(ToString::to_string).unwrap_or_default(),
            ),
            Expr::GetJsonField(g) => DebugNode::new(format!(
                "GetJsonField(type={}, field_name=\"{}\")",
                g.ty, g.field_name
            ))
            .child("expr", g.expr.debug_node()),
            Expr::Flatten(f) => DebugNode::new(format!("Flatten(type={})", f.ty))
                .child("expr", f.expr.debug_node())
                .list("get_field_list", &f.get_field_list),
            Expr::FlattenedArg(f) => DebugNode::new(format!("FlattenedArg(type={})", f.ty)),
            Expr::ReplaceField(r) => DebugNode::new(format!("ReplaceField(type={})", r.ty))
                .child("expr", r.expr.debug_node())
                .nodes(
                    "replace_field_item_list",
                    r.replace_field_item_list
                        .iter()
                        .map(|item| {
                            DebugNode::new("ReplaceFieldItem")
                                .child("expr", item.expr.debug_node())
                                .text_if(
                                    !item.struct_index_path.is_empty(),
                                    "struct_index_path",
                                    format!("{:?}", item.struct_index_path),
                                )
                                .path("proto_field_path", &item.proto_field_path)
                        })
                        .collect(),
                ),
            Expr::SubqueryExpr(s) => DebugNode::new(format!(
                "SubqueryExpr(type={}, subquery_type={:?})",
                s.ty, s.subquery_type
            ))
            .list("parameter_list", &s.parameter_list)
            .opt_child("in_expr", s.in_expr.as_deref())
            .child("subquery", s.subquery.debug_node()),
            Expr::WithExpr(w) => DebugNode::new(format!("WithExpr(type={})", w.ty))
                .list("assignment_list", &w.assignment_list)
                .child("expr", w.expr.debug_node()),
            Expr::DmlDefault(d) => DebugNode::new(format!("DMLDefault(type={})", d.ty)),
            Expr::GraphGetElementProperty(g) => {
                let label = match &g.property {
                    Some(p) => format!("GraphGetElementProperty(type={}, property={})", g.ty, p.name),
                    None => format!("GraphGetElementProperty(type={})", g.ty),
                };
                DebugNode::new(label)
                    .child("expr", g.expr.debug_node())
                    .opt_child("property_name", g.property_name.as_deref())
            }
            Expr::GraphMakeElement(g) => DebugNode::new(format!("GraphMakeElement(type={})", g.ty))
                .child("identifier", g.identifier.debug_node())
                .nodes(
                    "property_list",
                    g.property_list
                        .iter()
                        .map(|p| {
                            DebugNode::new(format!("GraphMakeProperty({})", p.name))
                                .child("value", p.value.debug_node())
                        })
                        .collect(),
                )
                .path("label_list", &g.label_list),
            Expr::GraphIsLabeledPredicate(g) => {
                DebugNode::new(format!("GraphIsLabeledPredicate(type={})", g.ty))
                    .flag("is_not", g.is_not)
                    .child("expr", g.expr.debug_node())
                    .child("label_expr", g.label_expr.debug_node())
            }
        };
        node.at(self)
    }
}

impl ToDebugNode for crate::ast::expression::ColumnRef {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new(format!(
            "ColumnRef(type={}, column={}{})",
            self.ty,
            self.column,
            if self.is_correlated { ", is_correlated=TRUE" } else { "" }
        ))
        .at(self)
    }
}

fn function_call_node(kind: &str, base: &FunctionCallBase) -> DebugNode {
    DebugNode::new(format!(
        "{kind}({}{}{})",
        if base.error_mode == crate::ast::expression::ErrorMode::Safe { "SAFE." } else { "" },
        base.function_name(),
        signature_string(&base.signature)
    ))
    .list("argument_list", &base.argument_list)
    .list("generic_argument_list", &base.generic_argument_list)
    .list("hint_list", &base.hint_list)
}

fn aggregate_call_node(call: &AggregateFunctionCall) -> DebugNode {
    let mut node = function_call_node("AggregateFunctionCall", &call.base)
        .flag("distinct", call.distinct)
        .list("group_by_list", &call.group_by_list)
        .list("group_by_aggregate_list", &call.group_by_aggregate_list)
        .list("order_by_item_list", &call.order_by_item_list)
        .opt_child("limit", call.limit.as_deref());
    if let Some(having) = &call.having_modifier {
        node = node.child(
            "having_modifier",
            DebugNode::new(format!("AggregateHavingModifier(kind={:?})", having.kind))
                .child("having_expr", having.having_expr.debug_node()),
        );
    }
    node.list(
        "with_group_rows_parameter_list",
        &call.with_group_rows_parameter_list,
    )
    .opt_child("with_group_rows_subquery", call.with_group_rows_subquery.as_deref())
}

impl ToDebugNode for ComputedColumn {
    fn debug_node(&self) -> DebugNode {
        let mut node = self.expr.debug_node();
        node.label = format!("{} := {}", self.column, node.label);
        node.at(self)
    }
}

impl ToDebugNode for ComputedColumnBase {
    fn debug_node(&self) -> DebugNode {
        match self {
            ComputedColumnBase::Computed(c) => c.debug_node().at(self),
            ComputedColumnBase::Deferred(d) => {
                let mut node = d.expr.debug_node();
                node.label = format!(
                    "{} := {} [side_effect_column={}]",
                    d.column, node.label, d.side_effect_column
                );
                node.at(d).at(self)
            }
        }
    }
}

impl ToDebugNode for OrderByItem {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("OrderByItem")
            .child("column_ref", self.column_ref.debug_node())
            .opt_child("collation_name", self.collation_name.as_deref())
            .flag("is_descending", self.is_descending)
            .text_if(
                self.null_order != crate::ast::expression::NullOrder::OrderUnspecified,
                "null_order",
                format!("{:?}", self.null_order),
            )
            .at(self)
    }
}

impl ToDebugNode for WindowFrame {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new(format!("WindowFrame(frame_unit={:?})", self.frame_unit))
            .child("start_expr", self.start_expr.debug_node())
            .child("end_expr", self.end_expr.debug_node())
            .at(self)
    }
}

impl ToDebugNode for WindowFrameExpr {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new(format!(
            "WindowFrameExpr(boundary_type={:?})",
            self.boundary_type
        ))
        .opt_child("expression", self.expression.as_deref())
        .at(self)
    }
}

impl ToDebugNode for FunctionArgument {
    fn debug_node(&self) -> DebugNode {
        let node = match self {
            FunctionArgument::Expr(e) => DebugNode::new("FunctionArgument").child("expr", e.debug_node()),
            FunctionArgument::Scan {
                scan,
                argument_column_list,
            } => DebugNode::new("FunctionArgument")
                .child("scan", scan.debug_node())
                .columns("argument_column_list", argument_column_list),
            FunctionArgument::Model(m) => DebugNode::new(format!("FunctionArgument(model={})", m.name)),
            FunctionArgument::Connection(c) => {
                DebugNode::new(format!("FunctionArgument(connection={})", c.name))
            }
            FunctionArgument::Descriptor(d) => DebugNode::new("FunctionArgument(descriptor)")
                .path("descriptor_column_name_list", &d.descriptor_column_name_list)
                .columns("descriptor_column_list", &d.descriptor_column_list),
            FunctionArgument::InlineLambda(l) => DebugNode::new("FunctionArgument(inline_lambda)")
                .columns("argument_list", &l.argument_list)
                .list("parameter_list", &l.parameter_list)
                .child("body", l.body.debug_node()),
            FunctionArgument::Sequence(s) => {
                DebugNode::new(format!("FunctionArgument(sequence={})", s.name))
            }
            FunctionArgument::Graph(g) => DebugNode::new(format!("FunctionArgument(graph={})", g.name)),
        };
        node.at(self)
    }
}

impl ToDebugNode for OptionEntry {
    fn debug_node(&self) -> DebugNode {
        let mut node = self.value.debug_node();
        node.label = format!("{} := {}", self.name, node.label);
        node.at(self)
    }
}

impl ToDebugNode for OutputColumn {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new(format!("{} AS {} [{}]", self.column, self.name, self.column.ty)).at(self)
    }
}

impl ToDebugNode for GraphLabelExpr {
    fn debug_node(&self) -> DebugNode {
        let node = match self {
            GraphLabelExpr::Label(name) => DebugNode::new(format!("GraphLabel({name})")),
            GraphLabelExpr::Wildcard => DebugNode::new("GraphWildCardLabel"),
            GraphLabelExpr::Operation { op, operand_list } => {
                DebugNode::new(format!("GraphLabelNaryExpr(op={})", op.as_str()))
                    .list("operand_list", operand_list)
            }
        };
        node.at(self)
    }
}

// ============================================================================
// Scans
// ============================================================================

fn aggregate_fields(node: DebugNode, aggregate: &AggregateScanBase) -> DebugNode {
    node.child("input_scan", aggregate.input_scan.debug_node())
        .list("group_by_list", &aggregate.group_by_list)
        .list("aggregate_list", &aggregate.aggregate_list)
        .nodes(
            "grouping_set_list",
            aggregate
                .grouping_set_list
                .iter()
                .map(grouping_set_node)
                .collect(),
        )
        .list("rollup_column_list", &aggregate.rollup_column_list)
        .nodes(
            "grouping_call_list",
            aggregate
                .grouping_call_list
                .iter()
                .map(|g| {
                    DebugNode::new(format!("GroupingCall(output_column={})", g.output_column))
                        .child("group_by_column", g.group_by_column.debug_node())
                })
                .collect(),
        )
}

fn grouping_set_node(set: &GroupingSetBase) -> DebugNode {
    let multi = |name: &str, items: &[crate::ast::query::GroupingSetMultiColumn]| {
        DebugNode::new(name.to_string()).nodes(
            "multi_column_list",
            items
                .iter()
                .map(|m| DebugNode::new("GroupingSetMultiColumn").list("column_list", &m.column_list))
                .collect(),
        )
    };
    match set {
        GroupingSetBase::GroupingSet(columns) => {
            DebugNode::new("GroupingSet").list("group_by_column_list", columns)
        }
        GroupingSetBase::Rollup(items) => multi("Rollup", items),
        GroupingSetBase::Cube(items) => multi("Cube", items),
    }
}

impl ToDebugNode for SetOperationItem {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("SetOperationItem")
            .child("scan", self.scan.debug_node())
            .columns("output_column_list", &self.output_column_list)
            .at(self)
    }
}

impl ToDebugNode for Subpipeline {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("Subpipeline")
            .child("scan", self.scan.debug_node())
            .at(self)
    }
}

impl ToDebugNode for GeneralizedQuerySubpipeline {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("GeneralizedQuerySubpipeline")
            .child("subpipeline", self.subpipeline.debug_node())
            .nodes(
                "output_schema",
                self.output_schema
                    .iter()
                    .map(|s| DebugNode::new("OutputSchema").list("output_column_list", &s.output_column_list))
                    .collect(),
            )
            .at(self)
    }
}

impl ToDebugNode for WindowPartitioning {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("WindowPartitioning")
            .list("partition_by_list", &self.partition_by_list)
            .at(self)
    }
}

impl ToDebugNode for WindowOrdering {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("WindowOrdering")
            .list("order_by_item_list", &self.order_by_item_list)
            .at(self)
    }
}

impl ToDebugNode for AnalyticFunctionGroup {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("AnalyticFunctionGroup")
            .opt_child("partition_by", self.partition_by.as_ref())
            .opt_child("order_by", self.order_by.as_ref())
            .list("analytic_function_list", &self.analytic_function_list)
            .at(self)
    }
}

impl ToDebugNode for MatchRecognizePattern {
    fn debug_node(&self) -> DebugNode {
        let node = match self {
            MatchRecognizePattern::Empty => DebugNode::new("MatchRecognizePatternEmpty"),
            MatchRecognizePattern::Anchor(a) => {
                DebugNode::new(format!("MatchRecognizePatternAnchor(mode={a:?})"))
            }
            MatchRecognizePattern::VariableRef(name) => {
                DebugNode::new(format!("MatchRecognizePatternVariableRef(name=\"{name}\")"))
            }
            MatchRecognizePattern::Operation {
                op_type,
                operand_list,
            } => DebugNode::new(format!("MatchRecognizePatternOperation(op_type={op_type:?})"))
                .list("operand_list", operand_list),
            MatchRecognizePattern::Quantification {
                operand,
                lower_bound,
                upper_bound,
                is_reluctant,
            } => DebugNode::new("MatchRecognizePatternQuantification")
                .child("operand", operand.debug_node())
                .opt_child("lower_bound", lower_bound.as_deref())
                .opt_child("upper_bound", upper_bound.as_deref())
                .flag("is_reluctant", *is_reluctant),
        };
        node.at(self)
    }
}

impl ToDebugNode for GraphPathScan {
    fn debug_node(&self) -> DebugNode {
        DebugNode::new("GraphPathScan")
            .columns("column_list", &self.base.column_list)
            .list("input_scan_list", &self.input_scan_list)
            .opt_child("filter_expr", self.filter_expr.as_deref())
            .text_if(
                self.path.is_some(),
                "path",
                self.path.as_ref().map(ToString::to_string).unwrap_or_default(),
            )
            .text("head", &self.head)
            .text("tail", &self.tail)
            .nodes(
                "quantifier",
                self.quantifier
                    .iter()
                    .map(|q| {
                        DebugNode::new("GraphPathPatternQuantifier")
                            .opt_child("lower_bound", q.lower_bound.as_deref())
                            .opt_child("upper_bound", q.upper_bound.as_deref())
                    })
                    .collect(),
            )
            .nodes(
                "group_variable_list",
                self.group_variable_list
                    .iter()
                    .map(|g| {
                        DebugNode::new(format!("GraphGroupVariable({} -> {})", g.element, g.array_column))
                    })
                    .collect(),
            )
            .at(self)
    }
}

impl ToDebugNode for Scan {
    fn debug_node(&self) -> DebugNode {
        let base = self.base();
        let node = DebugNode::new(self.kind_name())
            .columns("column_list", &base.column_list)
            .list("hint_list", &base.hint_list)
            .flag("is_ordered", base.is_ordered);
        let node = match self {
            Scan::SingleRow(_)
            | Scan::RecursiveRef(_)
            | Scan::SubpipelineInput(_)
            | Scan::GroupRows(_)
            | Scan::GraphRef(_) => node,
            Scan::Table(t) => node
                .text("table", &t.table.name)
                .opt_child("for_system_time_expr", t.for_system_time_expr.as_deref())
                .text_if(
                    !t.column_index_list.is_empty(),
                    "column_index_list",
                    format!("{:?}", t.column_index_list),
                )
                .text_if(!t.alias.is_empty(), "alias", &t.alias),
            Scan::Join(j) => node
                .text_if(
                    j.join_type != crate::ast::query::JoinType::Inner,
                    "join_type",
                    format!("{:?}", j.join_type).to_uppercase(),
                )
                .child("left_scan", j.left_scan.debug_node())
                .child("right_scan", j.right_scan.debug_node())
                .opt_child("join_expr", j.join_expr.as_deref())
                .flag("has_using", j.has_using)
                .flag("is_lateral", j.is_lateral)
                .list("parameter_list", &j.parameter_list),
            Scan::Array(a) => node
                .opt_child("input_scan", a.input_scan.as_deref())
                .list("array_expr_list", &a.array_expr_list)
                .columns("element_column_list", &a.element_column_list)
                .text_if(
                    a.array_offset_column.is_some(),
                    "array_offset_column",
                    a.array_offset_column.as_ref().map(ToString::to_string).unwrap_or_default(),
                )
                .opt_child("join_expr", a.join_expr.as_deref())
                .flag("is_outer", a.is_outer),
            Scan::Filter(f) => node
                .child("input_scan", f.input_scan.debug_node())
                .child("filter_expr", f.filter_expr.debug_node()),
            Scan::Project(p) => node
                .list("expr_list", &p.expr_list)
                .child("input_scan", p.input_scan.debug_node()),
            Scan::Aggregate(a) => aggregate_fields(node, &a.aggregate),
            Scan::AnonymizedAggregate(a) => aggregate_fields(node, &a.aggregate)
                .opt_child("k_threshold_expr", a.k_threshold_expr.as_deref())
                .list("anonymization_option_list", &a.anonymization_option_list),
            Scan::DifferentialPrivacyAggregate(a) => aggregate_fields(node, &a.aggregate)
                .opt_child(
                    "group_selection_threshold_expr",
                    a.group_selection_threshold_expr.as_deref(),
                )
                .list("option_list", &a.option_list),
            Scan::AggregationThresholdAggregate(a) => {
                aggregate_fields(node, &a.aggregate).list("option_list", &a.option_list)
            }
            Scan::SetOperation(s) => node
                .text("op_type", format!("{:?}", s.op_type))
                .list("input_item_list", &s.input_item_list)
                .text_if(
                    s.column_match_mode != Default::default(),
                    "column_match_mode",
                    format!("{:?}", s.column_match_mode),
                )
                .text_if(
                    s.column_propagation_mode != Default::default(),
                    "column_propagation_mode",
                    format!("{:?}", s.column_propagation_mode),
                ),
            Scan::OrderBy(o) => node
                .child("input_scan", o.input_scan.debug_node())
                .list("order_by_item_list", &o.order_by_item_list),
            Scan::LimitOffset(l) => node
                .child("input_scan", l.input_scan.debug_node())
                .opt_child("limit", l.limit.as_deref())
                .opt_child("offset", l.offset.as_deref()),
            Scan::WithRef(w) => node.text("with_query_name", &w.with_query_name),
            Scan::With(w) => node
                .nodes(
                    "with_entry_list",
                    w.with_entry_list
                        .iter()
                        .map(|e| {
                            DebugNode::new("WithEntry")
                                .text("with_query_name", &e.with_query_name)
                                .child("with_subquery", e.with_subquery.debug_node())
                                .at(e)
                        })
                        .collect(),
                )
                .child("query", w.query.debug_node())
                .flag("recursive", w.recursive),
            Scan::Analytic(a) => node
                .child("input_scan", a.input_scan.debug_node())
                .list("function_group_list", &a.function_group_list),
            Scan::Sample(s) => node
                .child("input_scan", s.input_scan.debug_node())
                .text("method", &s.method)
                .child("size", s.size.debug_node())
                .text("unit", format!("{:?}", s.unit).to_uppercase())
                .opt_child("repeatable_argument", s.repeatable_argument.as_deref())
                .list("partition_by_list", &s.partition_by_list),
            Scan::Tvf(t) => node
                .text("tvf", format!("{}{}", t.tvf.name, signature_string(&t.signature)))
                .list("argument_list", &t.argument_list)
                .text_if(
                    !t.column_index_list.is_empty(),
                    "column_index_list",
                    format!("{:?}", t.column_index_list),
                )
                .text_if(!t.alias.is_empty(), "alias", &t.alias),
            Scan::RelationArgument(r) => node.text("name", &r.name),
            Scan::Recursive(r) => node
                .text("op_type", format!("{:?}", r.op_type))
                .child("non_recursive_term", r.non_recursive_term.debug_node())
                .child("recursive_term", r.recursive_term.debug_node())
                .nodes(
                    "recursion_depth_modifier",
                    r.recursion_depth_modifier
                        .iter()
                        .map(|m| {
                            DebugNode::new("RecursionDepthModifier")
                                .opt_child("lower_bound", m.lower_bound.as_deref())
                                .opt_child("upper_bound", m.upper_bound.as_deref())
                                .text("recursion_depth_column", &m.recursion_depth_column)
                        })
                        .collect(),
                ),
            Scan::Pivot(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .list("group_by_list", &p.group_by_list)
                .list("pivot_expr_list", &p.pivot_expr_list)
                .child("for_expr", p.for_expr.debug_node())
                .list("pivot_value_list", &p.pivot_value_list)
                .nodes(
                    "pivot_column_list",
                    p.pivot_column_list
                        .iter()
                        .map(|c| {
                            DebugNode::new(format!(
                                "PivotColumn(column={}, pivot_expr_index={}, pivot_value_index={})",
                                c.column, c.pivot_expr_index, c.pivot_value_index
                            ))
                        })
                        .collect(),
                ),
            Scan::Unpivot(u) => node
                .child("input_scan", u.input_scan.debug_node())
                .columns("value_column_list", &u.value_column_list)
                .text("label_column", &u.label_column)
                .text(
                    "label_list",
                    u.label_list.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
                )
                .nodes(
                    "unpivot_arg_list",
                    u.unpivot_arg_list
                        .iter()
                        .map(|a| DebugNode::new("UnpivotArg").list("column_list", &a.column_list))
                        .collect(),
                )
                .list("projected_input_column_list", &u.projected_input_column_list)
                .flag("include_nulls", u.include_nulls),
            Scan::MatchRecognize(m) => node
                .child("input_scan", m.input_scan.debug_node())
                .list("option_list", &m.option_list)
                .opt_child("partition_by", m.partition_by.as_ref())
                .child("order_by", m.order_by.debug_node())
                .nodes(
                    "pattern_variable_definition_list",
                    m.pattern_variable_definition_list
                        .iter()
                        .map(|d| {
                            DebugNode::new(format!("MatchRecognizeVariableDefinition(name=\"{}\")", d.name))
                                .child("predicate", d.predicate.debug_node())
                        })
                        .collect(),
                )
                .child("pattern", m.pattern.debug_node())
                .text("after_match_skip_mode", format!("{:?}", m.after_match_skip_mode))
                .nodes(
                    "measure_group_list",
                    m.measure_group_list
                        .iter()
                        .map(|g| {
                            DebugNode::new(format!(
                                "MeasureGroup(pattern_variable_ref={})",
                                g.pattern_variable_ref.as_deref().unwrap_or("<universal>")
                            ))
                            .list("aggregate_list", &g.aggregate_list)
                        })
                        .collect(),
                )
                .text("match_number_column", &m.match_number_column)
                .text("match_row_number_column", &m.match_row_number_column)
                .text("classifier_column", &m.classifier_column),
            Scan::Barrier(b) => node.child("input_scan", b.input_scan.debug_node()),
            Scan::Assert(a) => node
                .child("input_scan", a.input_scan.debug_node())
                .child("condition", a.condition.debug_node())
                .child("message", a.message.debug_node()),
            Scan::ExecuteAsRole(e) => node.child("input_scan", e.input_scan.debug_node()),
            Scan::StaticDescribe(s) => node
                .child("input_scan", s.input_scan.debug_node())
                .text("describe_text", format!("{:?}", s.describe_text)),
            Scan::Log(l) => node
                .child("input_scan", l.input_scan.debug_node())
                .child("subpipeline", l.subpipeline.debug_node()),
            Scan::PipeIf(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .text_if(
                    p.selected_case.is_some(),
                    "selected_case",
                    p.selected_case.map(|c| c.to_string()).unwrap_or_default(),
                )
                .nodes(
                    "if_case_list",
                    p.if_case_list
                        .iter()
                        .map(|c| {
                            DebugNode::new("PipeIfCase")
                                .opt_child("condition", c.condition.as_ref())
                                .text("subpipeline_sql", format!("{:?}", c.subpipeline_sql))
                                .opt_child("subpipeline", c.subpipeline.as_ref())
                        })
                        .collect(),
                ),
            Scan::PipeFork(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .list("subpipeline_list", &p.subpipeline_list),
            Scan::PipeTee(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .list("subpipeline_list", &p.subpipeline_list),
            Scan::PipeExportData(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .child(
                    "export_data_stmt",
                    export_data_node(&p.export_data_stmt),
                ),
            Scan::PipeInsert(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .child("insert_stmt", insert_node(&p.insert_stmt)),
            Scan::PipeCreateTable(p) => node
                .child("input_scan", p.input_scan.debug_node())
                .child(
                    "create_table_as_select_stmt",
                    create_table_base_node("CreateTableAsSelectStmt", &p.create_table_as_select_stmt.table)
                        .list("output_column_list", &p.create_table_as_select_stmt.output_column_list)
                        .child("query", p.create_table_as_select_stmt.query.debug_node()),
                ),
            Scan::GraphTable(g) => node
                .text("property_graph", &g.property_graph.name)
                .child("input_scan", g.input_scan.debug_node())
                .list("shape_expr_list", &g.shape_expr_list),
            Scan::Graph(g) => node
                .list("input_scan_list", &g.input_scan_list)
                .opt_child("input_scan", g.input_scan.as_deref())
                .opt_child("filter_expr", g.filter_expr.as_deref())
                .flag("optional", g.optional),
            Scan::GraphPath(p) => p.debug_node(),
            Scan::GraphNode(n) => node
                .opt_child("filter_expr", n.filter_expr.as_deref())
                .opt_child("label_expr", n.label_expr.as_ref())
                .path("target_element_table_list", &n.target_element_table_list),
            Scan::GraphEdge(e) => node
                .opt_child("filter_expr", e.filter_expr.as_deref())
                .opt_child("label_expr", e.label_expr.as_ref())
                .path("target_element_table_list", &e.target_element_table_list)
                .text("orientation", format!("{:?}", e.orientation).to_uppercase()),
            Scan::GraphLinear(l) => node.list("scan_list", &l.scan_list),
            Scan::GraphCall(c) => node
                .child("input_scan", c.input_scan.debug_node())
                .child("subquery", c.subquery.debug_node())
                .list("parameter_list", &c.parameter_list)
                .flag("optional", c.optional),
        };
        node.at(self)
    }
}

// ============================================================================
// Statements
// ============================================================================

fn column_definition_node(def: &ColumnDefinition) -> DebugNode {
    let mut node = DebugNode::new(format!(
        "ColumnDefinition(name=\"{}\", type={}, column={})",
        def.name, def.ty, def.column
    ))
    .flag("is_hidden", def.is_hidden);
    if let Some(info) = &def.generated_column_info {
        node = node.child("generated_column_info", info.expression.debug_node());
    }
    if let Some(default) = &def.default_value {
        node = node.child("default_value", default.expression.debug_node());
    }
    if let Some(annotations) = &def.annotations {
        node = node.opt_child("collation_name", annotations.collation_name.as_deref());
    }
    node.at(def)
}

fn foreign_key_node(fk: &ForeignKey) -> DebugNode {
    DebugNode::new(format!(
        "ForeignKey(constraint_name=\"{}\", referenced_table={})",
        fk.constraint_name, fk.referenced_table.name
    ))
    .text("referencing_column_offset_list", format!("{:?}", fk.referencing_column_offset_list))
    .text("referenced_column_offset_list", format!("{:?}", fk.referenced_column_offset_list))
    .list("option_list", &fk.option_list)
    .at(fk)
}

fn check_constraint_node(check: &CheckConstraint) -> DebugNode {
    DebugNode::new(format!("CheckConstraint(constraint_name=\"{}\")", check.constraint_name))
        .child("expression", check.expression.debug_node())
        .flag("enforced", check.enforced)
        .at(check)
}

fn create_table_base_node(kind: &str, table: &CreateTableBase) -> DebugNode {
    let mut node = DebugNode::new(kind)
        .path("name_path", &table.common.name_path)
        .list("option_list", &table.option_list)
        .nodes(
            "column_definition_list",
            table.column_definition_list.iter().map(column_definition_node).collect(),
        )
        .columns("pseudo_column_list", &table.pseudo_column_list);
    if let Some(pk) = &table.primary_key {
        node = node.text("primary_key", format!("{:?}", pk.column_offset_list));
    }
    node.nodes(
        "foreign_key_list",
        table.foreign_key_list.iter().map(foreign_key_node).collect(),
    )
    .nodes(
        "check_constraint_list",
        table.check_constraint_list.iter().map(check_constraint_node).collect(),
    )
    .opt_child("collation_name", table.collation_name.as_deref())
    .flag("is_value_table", table.is_value_table)
}

fn create_view_base_node(kind: &str, view: &CreateViewBase) -> DebugNode {
    DebugNode::new(kind)
        .path("name_path", &view.common.name_path)
        .list("option_list", &view.option_list)
        .list("output_column_list", &view.output_column_list)
        .child("query", view.query.debug_node())
        .text("sql", format!("{:?}", view.sql))
        .flag("recursive", view.recursive)
}

fn returning_node(returning: &ReturningClause) -> DebugNode {
    DebugNode::new("ReturningClause")
        .list("output_column_list", &returning.output_column_list)
        .text_if(
            returning.action_column.is_some(),
            "action_column",
            returning.action_column.as_ref().map(ToString::to_string).unwrap_or_default(),
        )
        .list("expr_list", &returning.expr_list)
        .at(returning)
}

fn insert_row_node(row: &InsertRow) -> DebugNode {
    DebugNode::new("InsertRow")
        .nodes(
            "value_list",
            row.value_list
                .iter()
                .map(|v| DebugNode::new("DMLValue").child("value", v.value.debug_node()).at(v))
                .collect(),
        )
        .at(row)
}

fn on_conflict_node(clause: &OnConflictClause) -> DebugNode {
    DebugNode::new(format!("OnConflictClause(conflict_action={:?})", clause.conflict_action))
        .list("conflict_target_column_list", &clause.conflict_target_column_list)
        .text_if(
            !clause.unique_constraint_name.is_empty(),
            "unique_constraint_name",
            &clause.unique_constraint_name,
        )
        .opt_child("insert_row_scan", clause.insert_row_scan.as_deref())
        .nodes("update_item_list", clause.update_item_list.iter().map(update_item_node).collect())
        .opt_child("update_where_expression", clause.update_where_expression.as_deref())
        .at(clause)
}

fn insert_node(stmt: &InsertStmt) -> DebugNode {
    DebugNode::new("InsertStmt")
        .opt_child("table_scan", stmt.table_scan.as_deref())
        .text_if(
            stmt.insert_mode != Default::default(),
            "insert_mode",
            format!("{:?}", stmt.insert_mode),
        )
        .opt_child("assert_rows_modified", stmt.assert_rows_modified.as_deref())
        .nodes("returning", stmt.returning.iter().map(returning_node).collect())
        .columns("insert_column_list", &stmt.insert_column_list)
        .list("query_parameter_list", &stmt.query_parameter_list)
        .opt_child("query", stmt.query.as_deref())
        .columns("query_output_column_list", &stmt.query_output_column_list)
        .nodes("row_list", stmt.row_list.iter().map(insert_row_node).collect())
        .nodes("on_conflict_clause", stmt.on_conflict_clause.iter().map(on_conflict_node).collect())
        .at(stmt)
}

fn update_item_node(item: &UpdateItem) -> DebugNode {
    DebugNode::new("UpdateItem")
        .child("target", item.target.debug_node())
        .nodes(
            "set_value",
            item.set_value
                .iter()
                .map(|v| DebugNode::new("DMLValue").child("value", v.value.debug_node()).at(v))
                .collect(),
        )
        .text_if(
            item.element_column.is_some(),
            "element_column",
            item.element_column.as_ref().map(ToString::to_string).unwrap_or_default(),
        )
        .nodes(
            "array_update_list",
            item.array_update_list
                .iter()
                .map(|a| {
                    DebugNode::new("UpdateArrayItem")
                        .child("offset", a.offset.debug_node())
                        .child("update_item", update_item_node(&a.update_item))
                        .at(a)
                })
                .collect(),
        )
        .nodes("delete_list", item.delete_list.iter().map(delete_node).collect())
        .nodes("update_list", item.update_list.iter().map(update_node).collect())
        .nodes("insert_list", item.insert_list.iter().map(insert_node).collect())
        .at(item)
}

fn update_node(stmt: &UpdateStmt) -> DebugNode {
    DebugNode::new("UpdateStmt")
        .opt_child("table_scan", stmt.table_scan.as_deref())
        .opt_child("assert_rows_modified", stmt.assert_rows_modified.as_deref())
        .nodes("returning", stmt.returning.iter().map(returning_node).collect())
        .text_if(
            stmt.array_offset_column.is_some(),
            "array_offset_column",
            stmt.array_offset_column.as_ref().map(ToString::to_string).unwrap_or_default(),
        )
        .opt_child("where_expr", stmt.where_expr.as_deref())
        .nodes("update_item_list", stmt.update_item_list.iter().map(update_item_node).collect())
        .opt_child("from_scan", stmt.from_scan.as_deref())
        .at(stmt)
}

fn delete_node(stmt: &DeleteStmt) -> DebugNode {
    DebugNode::new("DeleteStmt")
        .opt_child("table_scan", stmt.table_scan.as_deref())
        .opt_child("assert_rows_modified", stmt.assert_rows_modified.as_deref())
        .nodes("returning", stmt.returning.iter().map(returning_node).collect())
        .text_if(
            stmt.array_offset_column.is_some(),
            "array_offset_column",
            stmt.array_offset_column.as_ref().map(ToString::to_string).unwrap_or_default(),
        )
        .opt_child("where_expr", stmt.where_expr.as_deref())
        .at(stmt)
}

fn export_data_node(stmt: &crate::ast::program::ExportDataStmt) -> DebugNode {
    DebugNode::new("ExportDataStmt")
        .text_if(
            stmt.connection.is_some(),
            "connection",
            stmt.connection.clone().unwrap_or_default(),
        )
        .list("option_list", &stmt.option_list)
        .list("output_column_list", &stmt.output_column_list)
        .opt_child("query", stmt.query.as_deref())
        .at(stmt)
}

fn graph_element_table_node(table: &GraphElementTable) -> DebugNode {
    DebugNode::new(format!("GraphElementTable(alias=\"{}\", kind={:?})", table.alias, table.kind))
        .child("input_scan", table.input_scan.debug_node())
        .list("key_list", &table.key_list)
        .path("label_name_list", &table.label_name_list)
        .nodes(
            "property_definition_list",
            table
                .property_definition_list
                .iter()
                .map(|p| {
                    DebugNode::new(format!(
                        "GraphPropertyDefinition(property_declaration_name=\"{}\")",
                        p.property_declaration_name
                    ))
                    .child("expr", p.expr.debug_node())
                })
                .collect(),
        )
        .opt_child("dynamic_label", table.dynamic_label.as_deref())
        .opt_child("dynamic_properties", table.dynamic_properties.as_deref())
        .at(table)
}

fn alter_action_node(action: &AlterAction) -> DebugNode {
    let node = DebugNode::new(action.kind_name());
    let node = match action {
        AlterAction::SetOptions(options) => node.list("option_list", options),
        AlterAction::AddColumn {
            column_definition, ..
        } => node.child("column_definition", column_definition_node(column_definition)),
        AlterAction::DropColumn { name, .. } => node.text("name", name),
        AlterAction::RenameColumn { name, new_name, .. } => {
            node.text("name", name).text("new_name", new_name)
        }
        AlterAction::AlterColumnSetDataType {
            column,
            updated_type,
            ..
        } => node.text("column", column).text("updated_type", updated_type),
        AlterAction::AlterColumnSetOptions {
            column,
            option_list,
            ..
        } => node.text("column", column).list("option_list", option_list),
        AlterAction::AlterColumnDropNotNull { column, .. }
        | AlterAction::AlterColumnDropDefault { column, .. } => node.text("column", column),
        AlterAction::AlterColumnSetDefault {
            column,
            default_value,
            ..
        } => node
            .text("column", column)
            .child("default_value", default_value.expression.debug_node()),
        AlterAction::AddPrimaryKey { primary_key, .. } => {
            node.text("primary_key", format!("{:?}", primary_key.column_offset_list))
        }
        AlterAction::AddForeignKey { foreign_key, .. } => {
            node.child("foreign_key", foreign_key_node(foreign_key))
        }
        AlterAction::AddCheckConstraint {
            check_constraint, ..
        } => node.child("check_constraint", check_constraint_node(check_constraint)),
        AlterAction::DropConstraint { name, .. } => node.text("name", name),
        AlterAction::DropPrimaryKey { .. } => node,
        AlterAction::SetAs { entity_body_json } => {
            node.text("entity_body_json", format!("{entity_body_json:?}"))
        }
        AlterAction::SetCollateClause { collation_name } => {
            node.child("collation_name", collation_name.debug_node())
        }
        AlterAction::RenameTo { new_path } => node.path("new_path", new_path),
        AlterAction::GrantTo(grantees) => node.list("grantee_expr_list", grantees),
        AlterAction::RevokeFrom {
            revokee_expr_list,
            is_revoke_from_all,
        } => node
            .list("revokee_expr_list", revokee_expr_list)
            .flag("is_revoke_from_all", *is_revoke_from_all),
        AlterAction::FilterUsing { predicate, .. } => {
            node.child("predicate", predicate.debug_node())
        }
    };
    node.at(action)
}

impl ToDebugNode for Statement {
    fn debug_node(&self) -> DebugNode {
        let kind = self.kind_name();
        let node = match self {
            Statement::Query(q) => DebugNode::new(kind)
                .list("hint_list", &q.hint_list)
                .list("output_column_list", &q.output_column_list)
                .flag("is_value_table", q.is_value_table)
                .child("query", q.query.debug_node()),
            Statement::GeneralizedQuery(q) => DebugNode::new(kind)
                .nodes(
                    "output_schema",
                    q.output_schema
                        .iter()
                        .map(|s| DebugNode::new("OutputSchema").list("output_column_list", &s.output_column_list))
                        .collect(),
                )
                .child("query", q.query.debug_node()),
            Statement::Explain(e) => DebugNode::new(kind).child("statement", e.statement.debug_node()),
            Statement::Multi(m) => DebugNode::new(kind).list("statement_list", &m.statement_list),
            Statement::CreateWithEntry(c) => DebugNode::new(kind)
                .text("with_query_name", &c.with_entry.with_query_name)
                .child("with_subquery", c.with_entry.with_subquery.debug_node()),
            Statement::CreateDatabase(c) => DebugNode::new(kind)
                .path("name_path", &c.name_path)
                .list("option_list", &c.option_list),
            Statement::CreateSchema(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .opt_child("collation_name", c.collation_name.as_deref())
                .list("option_list", &c.option_list),
            Statement::CreateTable(c) => create_table_base_node(kind, &c.table)
                .opt_child("clone_from", c.clone_from.as_deref())
                .opt_child("copy_from", c.copy_from.as_deref())
                .list("partition_by_list", &c.partition_by_list)
                .list("cluster_by_list", &c.cluster_by_list),
            Statement::CreateTableAsSelect(c) => create_table_base_node(kind, &c.table)
                .list("partition_by_list", &c.partition_by_list)
                .list("cluster_by_list", &c.cluster_by_list)
                .list("output_column_list", &c.output_column_list)
                .child("query", c.query.debug_node()),
            Statement::CreateExternalTable(c) => create_table_base_node(kind, &c.table).nodes(
                "with_partition_columns",
                c.with_partition_columns
                    .iter()
                    .flat_map(|w| w.column_definition_list.iter().map(column_definition_node))
                    .collect(),
            ),
            Statement::CreateSnapshotTable(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .child("clone_from", c.clone_from.debug_node())
                .list("option_list", &c.option_list),
            Statement::CreateView(c) => create_view_base_node(kind, &c.view),
            Statement::CreateMaterializedView(c) => create_view_base_node(kind, &c.view)
                .nodes(
                    "column_definition_list",
                    c.column_definition_list.iter().map(column_definition_node).collect(),
                )
                .list("partition_by_list", &c.partition_by_list)
                .list("cluster_by_list", &c.cluster_by_list),
            Statement::CreateIndex(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .path("table_name_path", &c.table_name_path)
                .child("table_scan", c.table_scan.debug_node())
                .flag("is_unique", c.is_unique)
                .flag("is_search", c.is_search)
                .nodes(
                    "index_item_list",
                    c.index_item_list
                        .iter()
                        .map(|i| {
                            DebugNode::new("IndexItem")
                                .child("column_ref", i.column_ref.debug_node())
                                .flag("descending", i.descending)
                        })
                        .collect(),
                )
                .list("storing_expression_list", &c.storing_expression_list)
                .list("option_list", &c.option_list)
                .list("computed_columns_list", &c.computed_columns_list)
                .nodes(
                    "unnest_expressions_list",
                    c.unnest_expressions_list
                        .iter()
                        .map(|u| {
                            DebugNode::new(format!("UnnestItem(element_column={})", u.element_column))
                                .child("array_expr", u.array_expr.debug_node())
                        })
                        .collect(),
                ),
            Statement::CreateFunction(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .text("return_type", &c.return_type)
                .path("argument_name_list", &c.argument_name_list)
                .text("signature", signature_string(&c.signature))
                .flag("is_aggregate", c.is_aggregate)
                .text("language", &c.language)
                .list("aggregate_expression_list", &c.aggregate_expression_list)
                .opt_child("function_expression", c.function_expression.as_deref())
                .list("option_list", &c.option_list),
            Statement::CreateTableFunction(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .path("argument_name_list", &c.argument_name_list)
                .text("signature", signature_string(&c.signature))
                .list("option_list", &c.option_list)
                .text("language", &c.language)
                .opt_child("query", c.query.as_deref())
                .list("output_column_list", &c.output_column_list),
            Statement::CreateProcedure(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .path("argument_name_list", &c.argument_name_list)
                .text("signature", signature_string(&c.signature))
                .list("option_list", &c.option_list)
                .text("procedure_body", format!("{:?}", c.procedure_body)),
            Statement::CreateConstant(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .child("expr", c.expr.debug_node()),
            Statement::CreateModel(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .list("option_list", &c.option_list)
                .list("output_column_list", &c.output_column_list)
                .opt_child("query", c.query.as_deref())
                .list("transform_list", &c.transform_list)
                .list("transform_output_column_list", &c.transform_output_column_list)
                .nodes(
                    "input_column_definition_list",
                    c.input_column_definition_list.iter().map(column_definition_node).collect(),
                )
                .nodes(
                    "output_column_definition_list",
                    c.output_column_definition_list.iter().map(column_definition_node).collect(),
                ),
            Statement::CreateRowAccessPolicy(c) => DebugNode::new(kind)
                .text("name", &c.name)
                .path("target_name_path", &c.target_name_path)
                .list("grantee_expr_list", &c.grantee_expr_list)
                .opt_child("table_scan", c.table_scan.as_deref())
                .opt_child("predicate", c.predicate.as_deref()),
            Statement::CreatePrivilegeRestriction(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .text("object_type", &c.object_type)
                .list("restrictee_list", &c.restrictee_list),
            Statement::CreateEntity(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .text("entity_type", &c.entity_type)
                .list("option_list", &c.option_list),
            Statement::CreateConnection(c) | Statement::CreateSequence(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .list("option_list", &c.option_list),
            Statement::CreatePropertyGraph(c) => DebugNode::new(kind)
                .path("name_path", &c.common.name_path)
                .nodes(
                    "node_table_list",
                    c.node_table_list.iter().map(graph_element_table_node).collect(),
                )
                .nodes(
                    "edge_table_list",
                    c.edge_table_list.iter().map(graph_element_table_node).collect(),
                )
                .nodes(
                    "label_list",
                    c.label_list
                        .iter()
                        .map(|l| DebugNode::new(format!("GraphElementLabel(name=\"{}\")", l.name)))
                        .collect(),
                )
                .nodes(
                    "property_declaration_list",
                    c.property_declaration_list
                        .iter()
                        .map(|p| DebugNode::new(format!("GraphPropertyDeclaration({} {})", p.name, p.ty)))
                        .collect(),
                ),
            Statement::AlterObject(a) => DebugNode::new(format!("Alter{}Stmt", alter_kind_label(a.kind)))
                .path("name_path", &a.name_path)
                .nodes("alter_action_list", a.alter_action_list.iter().map(alter_action_node).collect())
                .flag("is_if_exists", a.is_if_exists)
                .opt_child("table_scan", a.table_scan.as_deref()),
            Statement::AlterAllRowAccessPolicies(a) => DebugNode::new(kind)
                .path("table_name_path", &a.table_name_path)
                .nodes("alter_action_list", a.alter_action_list.iter().map(alter_action_node).collect())
                .opt_child("table_scan", a.table_scan.as_deref()),
            Statement::Rename(r) => DebugNode::new(kind)
                .text("object_type", &r.object_type)
                .path("old_name_path", &r.old_name_path)
                .path("new_name_path", &r.new_name_path),
            Statement::Drop(d)
            | Statement::DropTableFunction(d)
            | Statement::DropMaterializedView(d)
            | Statement::DropSnapshotTable(d) => DebugNode::new(kind)
                .text_if(!d.object_type.is_empty(), "object_type", &d.object_type)
                .flag("is_if_exists", d.is_if_exists)
                .path("name_path", &d.name_path),
            Statement::DropFunction(d) => DebugNode::new(kind)
                .flag("is_if_exists", d.is_if_exists)
                .path("name_path", &d.name_path),
            Statement::DropRowAccessPolicy(d) => DebugNode::new(kind)
                .flag("is_drop_all", d.is_drop_all)
                .text("name", &d.name)
                .path("target_name_path", &d.target_name_path),
            Statement::DropPrivilegeRestriction(d) => DebugNode::new(kind)
                .text("object_type", &d.object_type)
                .path("name_path", &d.name_path),
            Statement::DropIndex(d) => DebugNode::new(kind)
                .text("name", &d.name)
                .path("table_name_path", &d.table_name_path),
            Statement::Undrop(u) => DebugNode::new(kind)
                .text("schema_object_kind", &u.schema_object_kind)
                .path("name_path", &u.name_path)
                .opt_child("for_system_time_expr", u.for_system_time_expr.as_deref())
                .list("option_list", &u.option_list),
            Statement::Insert(i) => insert_node(i),
            Statement::Update(u) => update_node(u),
            Statement::Delete(d) => delete_node(d),
            Statement::Merge(m) => DebugNode::new(kind)
                .child("table_scan", m.table_scan.debug_node())
                .child("from_scan", m.from_scan.debug_node())
                .child("merge_expr", m.merge_expr.debug_node())
                .nodes(
                    "when_clause_list",
                    m.when_clause_list
                        .iter()
                        .map(|w| {
                            DebugNode::new(format!(
                                "MergeWhen(match_type={:?}, action_type={:?})",
                                w.match_type, w.action_type
                            ))
                            .opt_child("match_expr", w.match_expr.as_deref())
                            .columns("insert_column_list", &w.insert_column_list)
                            .nodes("insert_row", w.insert_row.iter().map(insert_row_node).collect())
                            .nodes(
                                "update_item_list",
                                w.update_item_list.iter().map(update_item_node).collect(),
                            )
                            .at(w)
                        })
                        .collect(),
                ),
            Statement::Truncate(t) => DebugNode::new(kind)
                .child("table_scan", t.table_scan.debug_node())
                .opt_child("where_expr", t.where_expr.as_deref()),
            Statement::Begin(b) => DebugNode::new(kind)
                .text_if(
                    b.read_write_mode != Default::default(),
                    "read_write_mode",
                    format!("{:?}", b.read_write_mode),
                )
                .path("isolation_level_list", &b.isolation_level_list),
            Statement::SetTransaction(s) => DebugNode::new(kind)
                .text_if(
                    s.read_write_mode != Default::default(),
                    "read_write_mode",
                    format!("{:?}", s.read_write_mode),
                )
                .path("isolation_level_list", &s.isolation_level_list),
            Statement::Commit | Statement::Rollback | Statement::RunBatch | Statement::AbortBatch => {
                DebugNode::new(kind)
            }
            Statement::StartBatch(s) => {
                DebugNode::new(kind).text_if(!s.batch_type.is_empty(), "batch_type", &s.batch_type)
            }
            Statement::Assert(a) => DebugNode::new(kind)
                .child("expression", a.expression.debug_node())
                .text_if(!a.description.is_empty(), "description", format!("{:?}", a.description)),
            Statement::Assignment(a) => DebugNode::new(kind)
                .child("target", a.target.debug_node())
                .child("expr", a.expr.debug_node()),
            Statement::ExecuteImmediate(e) => DebugNode::new(kind)
                .child("sql", e.sql.debug_node())
                .path("into_identifier_list", &e.into_identifier_list)
                .nodes(
                    "using_argument_list",
                    e.using_argument_list
                        .iter()
                        .map(|a| {
                            DebugNode::new(format!("ExecuteImmediateArgument(name=\"{}\")", a.name))
                                .child("expression", a.expression.debug_node())
                        })
                        .collect(),
                ),
            Statement::Call(c) => DebugNode::new(kind)
                .text(
                    "procedure",
                    format!("{}{}", c.procedure.name, signature_string(&c.signature)),
                )
                .list("argument_list", &c.argument_list),
            Statement::Describe(d) => DebugNode::new(kind)
                .text("object_type", &d.object_type)
                .path("name_path", &d.name_path)
                .path("from_name_path", &d.from_name_path),
            Statement::Show(s) => DebugNode::new(kind)
                .text("identifier", &s.identifier)
                .path("name_path", &s.name_path)
                .opt_child("like_expr", s.like_expr.as_deref()),
            Statement::DefineTable(d) => DebugNode::new(kind)
                .path("name_path", &d.name_path)
                .list("option_list", &d.option_list),
            Statement::ExportData(e) => export_data_node(e),
            Statement::ExportModel(e) => DebugNode::new(kind)
                .path("model_name_path", &e.model_name_path)
                .list("option_list", &e.option_list),
            Statement::ExportMetadata(e) => DebugNode::new(kind)
                .text("schema_object_kind", &e.schema_object_kind)
                .path("name_path", &e.name_path)
                .list("option_list", &e.option_list),
            Statement::Grant(g) | Statement::Revoke(g) => DebugNode::new(kind)
                .path("privilege_list", &g.privilege_list)
                .text("object_type", &g.object_type)
                .path("name_path", &g.name_path)
                .list("grantee_expr_list", &g.grantee_expr_list),
            Statement::Analyze(a) => DebugNode::new(kind)
                .list("option_list", &a.option_list)
                .nodes(
                    "table_and_column_index_list",
                    a.table_and_column_index_list
                        .iter()
                        .map(|t| {
                            DebugNode::new(format!(
                                "TableAndColumnInfo(table={}, column_index_list={:?})",
                                t.table.name, t.column_index_list
                            ))
                        })
                        .collect(),
                ),
            Statement::AuxLoadData(a) => DebugNode::new(kind)
                .text("insertion_mode", format!("{:?}", a.insertion_mode))
                .path("name_path", &a.name_path)
                .list("output_column_list", &a.output_column_list)
                .nodes(
                    "column_definition_list",
                    a.column_definition_list.iter().map(column_definition_node).collect(),
                )
                .list("partition_by_list", &a.partition_by_list)
                .list("cluster_by_list", &a.cluster_by_list)
                .list("option_list", &a.option_list)
                .list("from_files_option_list", &a.from_files_option_list),
            Statement::CloneData(c) => DebugNode::new(kind)
                .child("target_table", c.target_table.debug_node())
                .child("clone_from", c.clone_from.debug_node()),
            Statement::Import(i) => DebugNode::new(kind)
                .text("import_kind", format!("{:?}", i.import_kind).to_uppercase())
                .path("name_path", &i.name_path)
                .text_if(!i.file_path.is_empty(), "file_path", format!("{:?}", i.file_path))
                .path("alias_path", &i.alias_path)
                .list("option_list", &i.option_list),
            Statement::Module(m) => DebugNode::new(kind)
                .path("name_path", &m.name_path)
                .list("option_list", &m.option_list),
        };
        node.at(self)
    }
}

fn alter_kind_label(kind: crate::ast::catalog::AlterObjectKind) -> String {
    kind.as_str()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect()
}

impl Statement {
    pub fn debug_string(&self) -> String {
        debug_string(self)
    }
}

impl Scan {
    pub fn debug_string(&self) -> String {
        debug_string(self)
    }
}

impl Expr {
    pub fn debug_string(&self) -> String {
        debug_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expression::{ColumnRef, Literal};
    use crate::ast::program::QueryStmt;
    use crate::ast::query::{ProjectScan, ScanBase, SingleRowScan};
    use crate::ast::types::types;
    use crate::ast::value::Value;

    fn five_query() -> Statement {
        let col = ResolvedColumn::new(1, "$query", "five", types::int64());
        let project = ProjectScan::new(
            ScanBase::new(vec![col.clone()]),
            vec![ComputedColumn::new(
                col.clone(),
                Expr::Literal(Literal::new(Value::Int64(5))),
            )],
            Scan::SingleRow(SingleRowScan::default()),
        );
        Statement::Query(QueryStmt::new(
            vec![OutputColumn::new("five", col)],
            Scan::Project(project),
        ))
    }

    #[test]
    fn renders_tree_shape() {
        let text = five_query().debug_string();
        let expected = "\
QueryStmt
+-output_column_list=
| +-$query.five#1 AS five [INT64]
+-query=
  +-ProjectScan
    +-column_list=[$query.five#1]
    +-expr_list=
    | +-$query.five#1 := Literal(type=INT64, value=5)
    +-input_scan=
      +-SingleRowScan
";
        assert_eq!(text, expected);
    }

    #[test]
    fn marks_failing_node() {
        let stmt = five_query();
        let Statement::Query(query) = &stmt else {
            unreachable!()
        };
        let Scan::Project(project) = query.query.as_ref() else {
            unreachable!()
        };
        let target = node_address(project.input_scan.as_ref());
        let annotated = annotated_debug_string(&stmt, Some(target));
        assert!(annotated.text.contains("SingleRowScan (validation failed here)"));
        let span = annotated.marked_span.expect("marked");
        assert_eq!(
            &annotated.text[span],
            "SingleRowScan (validation failed here)"
        );
    }

    #[test]
    fn correlated_column_ref_is_flagged() {
        let col = ResolvedColumn::new(7, "t", "x", types::string());
        let expr = Expr::ColumnRef(ColumnRef::correlated(col));
        assert_eq!(
            expr.debug_string(),
            "ColumnRef(type=STRING, column=t.x#7, is_correlated=TRUE)\n"
        );
    }
}
