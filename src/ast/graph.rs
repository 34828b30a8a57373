//! Property graph nodes: GQL query scans, label expressions and the
//! element tables of CREATE PROPERTY GRAPH.
//!
//! # Query shape
//!
//! ```text
//! GraphTableScan
//!   GraphLinearScan            stages share an implicit working table
//!     GraphScan                MATCH, joined to the working table
//!       GraphPathScan          (a)-[e]->(b)
//!         GraphNodeScan
//!         GraphEdgeScan
//!         GraphNodeScan
//!     ProjectScan
//!       GraphRefScan           reads the working table
//! ```

use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::catalog::CreateCommon;
use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::{PropertyDeclaration, PropertyGraph};
use crate::ast::expression::{ColumnRef, ComputedColumn, Expr};
use crate::ast::query::{Scan, ScanBase};

// ============================================================================
// Label expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphLogicalOp {
    And,
    Or,
    Not,
}

impl GraphLogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphLogicalOp::And => "AND",
            GraphLogicalOp::Or => "OR",
            GraphLogicalOp::Not => "NOT",
        }
    }
}

/// A label expression such as `Person & !Employee`.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphLabelExpr {
    Label(SmolStr),
    /// `%`, matching any label.
    Wildcard,
    Operation {
        op: GraphLogicalOp,
        operand_list: Vec<GraphLabelExpr>,
    },
}

// ============================================================================
// Element pattern scans
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrientation {
    Any,
    Left,
    Right,
}

/// A node pattern. Produces exactly one GRAPH_NODE column.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNodeScan {
    pub base: ScanBase,
    pub filter_expr: Option<Box<Expr>>,
    pub label_expr: Option<GraphLabelExpr>,
    pub target_element_table_list: Vec<SmolStr>,
}

/// An edge pattern. Produces exactly one GRAPH_EDGE column.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdgeScan {
    pub base: ScanBase,
    pub filter_expr: Option<Box<Expr>>,
    pub label_expr: Option<GraphLabelExpr>,
    pub target_element_table_list: Vec<SmolStr>,
    pub orientation: EdgeOrientation,
}

/// `{lower, upper}` on a quantified path pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPathPatternQuantifier {
    pub lower_bound: Option<Box<Expr>>,
    pub upper_bound: Option<Box<Expr>>,
}

/// Binds an element variable inside a quantified path to the array of
/// its values across iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphGroupVariable {
    pub element: ResolvedColumn,
    pub array_column: ResolvedColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphPathMode {
    #[default]
    Walk,
    Trail,
    Simple,
    Acyclic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPathSearchPrefix {
    Any,
    Shortest,
    AllShortest,
}

/// A path pattern built from node, edge and nested path scans.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPathScan {
    pub base: ScanBase,
    pub input_scan_list: Vec<Scan>,
    pub filter_expr: Option<Box<Expr>>,
    /// GRAPH_PATH column naming the whole path, if bound.
    pub path: Option<ResolvedColumn>,
    /// First element column of the composition.
    pub head: ResolvedColumn,
    /// Last element column of the composition.
    pub tail: ResolvedColumn,
    pub quantifier: Option<GraphPathPatternQuantifier>,
    pub group_variable_list: Vec<GraphGroupVariable>,
    pub path_mode: GraphPathMode,
    pub search_prefix: Option<GraphPathSearchPrefix>,
}

/// A MATCH: one or more path patterns joined on shared variables, plus
/// the working table from earlier stages when present.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphScan {
    pub base: ScanBase,
    pub input_scan_list: Vec<GraphPathScan>,
    pub input_scan: Option<Box<Scan>>,
    pub filter_expr: Option<Box<Expr>>,
    pub optional: bool,
}

/// Sequential query stages; each stage reads the previous one through
/// `GraphRefScan`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphLinearScan {
    pub base: ScanBase,
    pub scan_list: Vec<Scan>,
}

/// Reads the working table of the innermost `GraphLinearScan`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphRefScan {
    pub base: ScanBase,
}

/// CALL of a subquery per working-table row; the subquery sees only
/// `parameter_list`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphCallScan {
    pub base: ScanBase,
    pub input_scan: Box<Scan>,
    pub subquery: Box<Scan>,
    pub parameter_list: Vec<ColumnRef>,
    pub optional: bool,
}

/// GRAPH_TABLE(graph MATCH ... COLUMNS(...)).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTableScan {
    pub base: ScanBase,
    pub property_graph: Arc<PropertyGraph>,
    pub input_scan: Box<Scan>,
    pub shape_expr_list: Vec<ComputedColumn>,
}

// ============================================================================
// CREATE PROPERTY GRAPH
// ============================================================================

/// SOURCE / DESTINATION KEY reference from an edge table to a node table.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNodeTableReference {
    pub node_table_identifier: SmolStr,
    pub edge_table_column_list: Vec<Expr>,
    pub node_table_column_list: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphPropertyDefinition {
    pub expr: Expr,
    pub sql: SmolStr,
    pub property_declaration_name: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphElementLabel {
    pub name: SmolStr,
    pub property_declaration_name_list: Vec<SmolStr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphElementTableKind {
    Node,
    Edge,
}

/// A NODE TABLE or EDGE TABLE entry.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphElementTable {
    pub alias: SmolStr,
    pub kind: GraphElementTableKind,
    pub input_scan: Box<Scan>,
    pub key_list: Vec<Expr>,
    pub source_node_reference: Option<GraphNodeTableReference>,
    pub dest_node_reference: Option<GraphNodeTableReference>,
    pub label_name_list: Vec<SmolStr>,
    pub property_definition_list: Vec<GraphPropertyDefinition>,
    /// Label computed from a STRING column.
    pub dynamic_label: Option<Box<Expr>>,
    /// Properties computed from a JSON column.
    pub dynamic_properties: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePropertyGraphStmt {
    pub common: CreateCommon,
    pub node_table_list: Vec<GraphElementTable>,
    pub edge_table_list: Vec<GraphElementTable>,
    pub label_list: Vec<GraphElementLabel>,
    pub property_declaration_list: Vec<PropertyDeclaration>,
}
