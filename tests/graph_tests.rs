//! GRAPH_TABLE queries: element patterns, paths, labels and linear stages,
//! plus the graph element expressions.

mod common;

use std::sync::Arc;

use common::*;
use resolved_ast_validator::ast::column::ResolvedColumn;
use resolved_ast_validator::ast::descriptors::{PropertyDeclaration, PropertyGraph};
use resolved_ast_validator::ast::expression::{
    ComputedColumn, Expr, GraphGetElementProperty, GraphMakeElement, GraphMakeProperty,
};
use resolved_ast_validator::ast::graph::{
    EdgeOrientation, GraphEdgeScan, GraphLabelExpr, GraphLinearScan, GraphLogicalOp, GraphNodeScan,
    GraphPathMode, GraphPathPatternQuantifier, GraphPathScan, GraphRefScan, GraphScan,
    GraphTableScan,
};
use resolved_ast_validator::ast::program::Statement;
use resolved_ast_validator::ast::query::{Scan, ScanBase};
use resolved_ast_validator::ast::types::{TypeRef, types};
use resolved_ast_validator::semantic::{LanguageFeature, Validator};

fn graph() -> Arc<PropertyGraph> {
    Arc::new(PropertyGraph {
        name: "g".into(),
        labels: vec!["Person".into(), "Knows".into()],
        property_declarations: vec![PropertyDeclaration {
            name: "name".into(),
            ty: types::string(),
        }],
    })
}

fn node_type() -> TypeRef {
    types::graph_node("g", vec![("name", types::string())])
}

fn edge_type() -> TypeRef {
    types::graph_edge("g", Vec::new())
}

fn node(column: &ResolvedColumn, label: Option<GraphLabelExpr>) -> Scan {
    Scan::GraphNode(GraphNodeScan {
        base: ScanBase::new(vec![column.clone()]),
        filter_expr: None,
        label_expr: label,
        target_element_table_list: Vec::new(),
    })
}

fn edge(column: &ResolvedColumn) -> Scan {
    Scan::GraphEdge(GraphEdgeScan {
        base: ScanBase::new(vec![column.clone()]),
        filter_expr: None,
        label_expr: Some(GraphLabelExpr::Label("Knows".into())),
        target_element_table_list: Vec::new(),
        orientation: EdgeOrientation::Right,
    })
}

fn person() -> Option<GraphLabelExpr> {
    Some(GraphLabelExpr::Label("Person".into()))
}

/// `GRAPH_TABLE(g MATCH (a:Person)-[e:Knows]->(b:Person) RETURN a.name)`
/// with the path pattern and stages exposed.
struct Match {
    a: ResolvedColumn,
    e: ResolvedColumn,
    b: ResolvedColumn,
    name: ResolvedColumn,
    output: ResolvedColumn,
    path: GraphPathScan,
}

impl Match {
    fn new(fx: &mut Fixture) -> Self {
        let a = fx.column("$graph", "a", node_type());
        let e = fx.column("$graph", "e", edge_type());
        let b = fx.column("$graph", "b", node_type());
        let path = GraphPathScan {
            base: ScanBase::new(vec![a.clone(), e.clone(), b.clone()]),
            input_scan_list: vec![node(&a, person()), edge(&e), node(&b, person())],
            filter_expr: None,
            path: None,
            head: a.clone(),
            tail: b.clone(),
            quantifier: None,
            group_variable_list: Vec::new(),
            path_mode: GraphPathMode::Walk,
            search_prefix: None,
        };
        Self {
            name: fx.column("$graph", "name", types::string()),
            output: fx.column("$graph_table", "name", types::string()),
            a,
            e,
            b,
            path,
        }
    }

    fn graph_scan(&self) -> Scan {
        Scan::Graph(GraphScan {
            base: ScanBase::new(vec![self.a.clone(), self.e.clone(), self.b.clone()]),
            input_scan_list: vec![self.path.clone()],
            input_scan: None,
            filter_expr: None,
            optional: false,
        })
    }

    /// `RETURN a.name`, reading the MATCH output as the working table.
    fn return_stage(&self) -> Scan {
        let property = Expr::GraphGetElementProperty(GraphGetElementProperty {
            ty: types::string(),
            expr: Box::new(column_ref(&self.a)),
            property: Some(PropertyDeclaration {
                name: "name".into(),
                ty: types::string(),
            }),
            property_name: None,
        });
        let working_table = Scan::GraphRef(GraphRefScan {
            base: ScanBase::new(vec![self.a.clone()]),
        });
        project(vec![ComputedColumn::new(self.name.clone(), property)], working_table)
    }

    fn table_scan_with(&self, stages: Vec<Scan>) -> Scan {
        let linear = Scan::GraphLinear(GraphLinearScan {
            base: ScanBase::new(vec![self.name.clone()]),
            scan_list: stages,
        });
        Scan::GraphTable(GraphTableScan {
            base: ScanBase::new(vec![self.output.clone()]),
            property_graph: graph(),
            input_scan: Box::new(linear),
            shape_expr_list: vec![ComputedColumn::new(self.output.clone(), column_ref(&self.name))],
        })
    }

    fn stmt(&self) -> Statement {
        query_stmt(self.table_scan_with(vec![self.graph_scan(), self.return_stage()]))
    }
}

fn graph_validator() -> Validator {
    validator_with(&[LanguageFeature::SqlGraph])
}

// ============================================================================
// GRAPH_TABLE and linear stages
// ============================================================================

#[test]
fn graph_table_query_validates() {
    let mut fx = Fixture::new();
    let query = Match::new(&mut fx);
    assert_valid_with(&mut graph_validator(), &query.stmt());
}

#[test]
fn graph_table_requires_its_feature() {
    let mut fx = Fixture::new();
    let query = Match::new(&mut fx);
    assert_invalid_containing(
        &query.stmt(),
        "GRAPH_TABLE is not supported without FEATURE_SQL_GRAPH",
    );
}

#[test]
fn graph_ref_reads_the_previous_stage() {
    let mut fx = Fixture::new();
    let query = Match::new(&mut fx);

    let first_stage_only = query.table_scan_with(vec![query.return_stage()]);
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query_stmt(first_stage_only),
        &format!("GraphRefScan contains column {} which is not available", query.a),
    );
}

#[test]
fn graph_ref_outside_a_linear_scan_is_rejected() {
    let mut fx = Fixture::new();
    let a = fx.column("$graph", "a", node_type());
    let stray = Scan::GraphRef(GraphRefScan {
        base: ScanBase::new(vec![a]),
    });
    assert_invalid_containing(
        &query_stmt(stray),
        "GraphRefScan appears outside of a GraphLinearScan",
    );
}

#[test]
fn linear_scan_needs_stages() {
    let mut fx = Fixture::new();
    let query = Match::new(&mut fx);
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query_stmt(query.table_scan_with(Vec::new())),
        "GraphLinearScan has no stages",
    );
}

// ============================================================================
// Element patterns
// ============================================================================

#[test]
fn element_scans_produce_one_column_of_their_kind() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    let misplaced = fx.column("$graph", "e2", node_type());
    query.path.input_scan_list[1] = Scan::GraphEdge(GraphEdgeScan {
        base: ScanBase::new(vec![misplaced.clone()]),
        filter_expr: None,
        label_expr: None,
        target_element_table_list: Vec::new(),
        orientation: EdgeOrientation::Any,
    });
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        &format!("GraphEdgeScan column {misplaced} is a NODE but the pattern is a EDGE"),
    );

    let mut query = Match::new(&mut fx);
    let Scan::GraphNode(first) = &mut query.path.input_scan_list[0] else {
        unreachable!("fixture starts with a node")
    };
    first.base.column_list.push(query.b.clone());
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        "GraphNodeScan must produce exactly one column, found 2",
    );
}

#[test]
fn element_filter_sees_only_its_element() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    let b = query.b.clone();
    let Scan::GraphNode(first) = &mut query.path.input_scan_list[0] else {
        unreachable!("fixture starts with a node")
    };
    first.filter_expr = Some(Box::new(equal(column_ref(&b), column_ref(&b))));
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        &format!("Incorrect reference to column {b}"),
    );
}

// ============================================================================
// Labels
// ============================================================================

#[test]
fn labels_come_from_the_property_graph() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    let a = query.a.clone();
    query.path.input_scan_list[0] = node(&a, Some(GraphLabelExpr::Label("Unknown".into())));
    let stmt = query.stmt();

    assert_invalid_containing_with(
        &mut graph_validator(),
        &stmt,
        "Label Unknown is not defined by the property graph",
    );
    assert_valid_with(
        &mut validator_with(&[
            LanguageFeature::SqlGraph,
            LanguageFeature::SqlGraphDynamicLabelProperties,
        ]),
        &stmt,
    );
}

#[test]
fn label_operations_check_their_arity() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    let a = query.a.clone();

    let negated = GraphLabelExpr::Operation {
        op: GraphLogicalOp::Not,
        operand_list: vec![GraphLabelExpr::Wildcard],
    };
    query.path.input_scan_list[0] = node(&a, Some(negated));
    assert_valid_with(&mut graph_validator(), &query.stmt());

    let lonely_and = GraphLabelExpr::Operation {
        op: GraphLogicalOp::And,
        operand_list: vec![GraphLabelExpr::Label("Person".into())],
    };
    query.path.input_scan_list[0] = node(&a, Some(lonely_and));
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        "Label AND must have at least 2 operands, found 1",
    );
}

// ============================================================================
// Path patterns
// ============================================================================

#[test]
fn path_head_and_tail_are_its_end_elements() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    query.path.head = query.b.clone();
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        &format!("GraphPathScan head {} must be the first element {}", query.b, query.a),
    );

    let mut query = Match::new(&mut fx);
    query.path.tail = query.a.clone();
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        &format!("GraphPathScan tail {} must be the last element {}", query.a, query.b),
    );
}

#[test]
fn path_inputs_are_element_or_path_scans() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    query.path.input_scan_list.push(single_row());
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        "GraphPathScan input cannot be a SingleRowScan",
    );
}

#[test]
fn path_modes_other_than_walk_are_feature_gated() {
    let mut fx = Fixture::new();
    let mut query = Match::new(&mut fx);
    query.path.path_mode = GraphPathMode::Trail;
    let stmt = query.stmt();
    assert_invalid_containing_with(
        &mut graph_validator(),
        &stmt,
        "Graph path mode is not supported without FEATURE_SQL_GRAPH_PATH_MODE",
    );
    assert_valid_with(
        &mut validator_with(&[LanguageFeature::SqlGraph, LanguageFeature::SqlGraphPathMode]),
        &stmt,
    );
}

#[test]
fn quantified_paths_need_ordered_bounds() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[
        LanguageFeature::SqlGraph,
        LanguageFeature::SqlGraphBoundedPathQuantification,
    ]);
    let mut query = Match::new(&mut fx);

    query.path.quantifier = Some(GraphPathPatternQuantifier {
        lower_bound: Some(Box::new(int64_literal(1))),
        upper_bound: Some(Box::new(int64_literal(3))),
    });
    assert_valid_with(&mut validator, &query.stmt());

    query.path.quantifier = Some(GraphPathPatternQuantifier {
        lower_bound: Some(Box::new(int64_literal(1))),
        upper_bound: None,
    });
    assert_invalid_containing_with(
        &mut validator,
        &query.stmt(),
        "Quantified path pattern requires an upper bound",
    );

    query.path.quantifier = Some(GraphPathPatternQuantifier {
        lower_bound: Some(Box::new(int64_literal(4))),
        upper_bound: Some(Box::new(int64_literal(2))),
    });
    assert_invalid_containing_with(
        &mut validator,
        &query.stmt(),
        "Path quantifier lower bound 4 exceeds upper bound 2",
    );

    assert_invalid_containing_with(
        &mut graph_validator(),
        &query.stmt(),
        "Quantified path pattern is not supported without \
         FEATURE_SQL_GRAPH_BOUNDED_PATH_QUANTIFICATION",
    );
}

#[test]
fn match_patterns_may_not_redefine_columns() {
    let mut fx = Fixture::new();
    let query = Match::new(&mut fx);
    let Scan::Graph(mut graph_scan) = query.graph_scan() else {
        unreachable!("fixture builds a GraphScan")
    };
    graph_scan.input_scan_list.push(query.path.clone());
    let stages = vec![Scan::Graph(graph_scan), query.return_stage()];
    assert_invalid_containing_with(
        &mut graph_validator(),
        &query_stmt(query.table_scan_with(stages)),
        &format!("Duplicate column id {}", query.a.column_id),
    );
}

// ============================================================================
// Element expressions
// ============================================================================

/// `SELECT <make element> FROM t(id, name)` building a `g` node from the
/// given property assignments.
fn make_node_stmt(
    fx: &mut Fixture,
    properties: impl FnOnce(&ResolvedColumn) -> Vec<GraphMakeProperty>,
) -> Statement {
    let input = fx.table_scan("t", &[("id", types::int64()), ("name", types::string())]);
    let id = input.column_list()[0].clone();
    let name = input.column_list()[1].clone();
    let make = Expr::GraphMakeElement(GraphMakeElement {
        ty: node_type(),
        identifier: Box::new(column_ref(&id)),
        property_list: properties(&name),
        label_list: vec!["Person".into()],
    });
    let out = fx.column("$query", "node", node_type());
    query_stmt(project(vec![ComputedColumn::new(out, make)], input))
}

fn set(name: &str, value: Expr) -> GraphMakeProperty {
    GraphMakeProperty {
        name: name.into(),
        value,
    }
}

#[test]
fn make_element_sets_every_declared_property() {
    let mut fx = Fixture::new();
    assert_valid(&make_node_stmt(&mut fx, |name| vec![set("NAME", column_ref(name))]));
    assert_invalid_containing(
        &make_node_stmt(&mut fx, |_| Vec::new()),
        "GraphMakeElement sets 0 of 1 properties",
    );
}

#[test]
fn make_element_properties_follow_the_element_type() {
    let mut fx = Fixture::new();
    assert_invalid_containing(
        &make_node_stmt(&mut fx, |_| vec![set("name", int64_literal(1))]),
        "Property name has type INT64, expected STRING",
    );
    assert_invalid_containing(
        &make_node_stmt(&mut fx, |name| {
            vec![set("name", column_ref(name)), set("age", int64_literal(30))]
        }),
        "Graph element has no property age",
    );
    assert_invalid_containing(
        &make_node_stmt(&mut fx, |name| {
            vec![set("name", column_ref(name)), set("Name", column_ref(name))]
        }),
        "Property Name is set more than once",
    );
}

/// `SELECT n.<key> FROM t(n)`, reading a property by name at run time.
fn dynamic_property_stmt(fx: &mut Fixture, key: Expr, ty: TypeRef) -> Statement {
    let input = fx.table_scan("t", &[("n", node_type())]);
    let element = input.column_list()[0].clone();
    let get = Expr::GraphGetElementProperty(GraphGetElementProperty {
        ty: ty.clone(),
        expr: Box::new(column_ref(&element)),
        property: None,
        property_name: Some(Box::new(key)),
    });
    let out = fx.column("$query", "value", ty);
    query_stmt(project(vec![ComputedColumn::new(out, get)], input))
}

#[test]
fn dynamic_property_access_reads_json_by_literal_name() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::SqlGraphDynamicLabelProperties]);

    let by_name = dynamic_property_stmt(&mut fx, string_literal("name"), types::json());
    assert_invalid_containing(
        &by_name,
        "Dynamic property access is not supported without \
         FEATURE_SQL_GRAPH_DYNAMIC_LABEL_PROPERTIES",
    );
    assert_valid_with(&mut validator, &by_name);

    assert_invalid_containing_with(
        &mut validator,
        &dynamic_property_stmt(&mut fx, int64_literal(1), types::json()),
        "Dynamic property name must be a STRING literal",
    );
    assert_invalid_containing_with(
        &mut validator,
        &dynamic_property_stmt(&mut fx, string_literal("name"), types::string()),
        "Dynamic property access has type STRING, expected JSON",
    );
}
