//! Property graph queries, graph element expressions and CREATE PROPERTY
//! GRAPH.
//!
//! # Working tables
//!
//! A `GraphLinearScan` runs its stages in order. Each stage may read the
//! output of the previous one through a `GraphRefScan`, so the validator
//! keeps a stack of working tables: one entry per enclosing linear scan,
//! replaced after every stage.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::expression::{
    Expr, GraphGetElementProperty, GraphIsLabeledPredicate, GraphMakeElement,
};
use crate::ast::graph::{
    CreatePropertyGraphStmt, GraphCallScan, GraphElementTable, GraphElementTableKind,
    GraphLabelExpr, GraphLinearScan, GraphLogicalOp, GraphNodeTableReference, GraphPathMode,
    GraphPathPatternQuantifier, GraphPathScan, GraphScan, GraphTableScan,
};
use crate::ast::query::Scan;
use crate::ast::types::{GraphElementKind, TypeRef};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

impl Validator {
    // ========================================================================
    // GRAPH_TABLE and query stages
    // ========================================================================

    pub(super) fn validate_graph_table_scan(
        &mut self,
        scan: &GraphTableScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::SqlGraph, "GRAPH_TABLE")?;
        self.state.property_graphs.push(scan.property_graph.clone());
        let result = self.validate_graph_table_body(scan, params);
        self.state.property_graphs.pop();
        result
    }

    fn validate_graph_table_body(
        &mut self,
        scan: &GraphTableScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        check_single_path_column(scan.input_scan.column_list(), "GRAPH_TABLE input")?;

        let mut available = ColumnSet::new();
        for shape in &scan.shape_expr_list {
            self.with_context(shape, |v| {
                v.validate_expr(&input, params, &shape.expr)?;
                v.check_type_equals(shape.expr.ty(), &shape.column.ty, || {
                    format!("GRAPH_TABLE column {}", shape.column)
                })?;
                v.check_unique_column_id(&shape.column)
            })?;
            available = available.with_columns([&shape.column]);
        }
        Ok(available)
    }

    /// A MATCH joins its path patterns with the working table, if any.
    pub(super) fn validate_graph_scan(&mut self, scan: &GraphScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let mut available = match &scan.input_scan {
            Some(input_scan) => self.validate_pass_through(input_scan, params)?,
            None => ColumnSet::new(),
        };
        ensure(!scan.input_scan_list.is_empty(), || "GraphScan has no path patterns".to_string())?;
        for path in &scan.input_scan_list {
            let produced = self.validate_graph_path_input(path, params)?;
            if let Some(shared) = produced.ids().find(|&id| available.contains_id(id)) {
                return fail(format!("Path pattern redefines column id {shared}"));
            }
            available = available.union(&produced);
        }
        if let Some(filter) = &scan.filter_expr {
            self.validate_bool_expr(&available, params, filter, "MATCH WHERE clause")?;
        }
        check_single_path_column(&scan.base.column_list, "GraphScan")?;
        Ok(available)
    }

    /// Validates a path pattern held directly by a `GraphScan`, applying the
    /// same contract `validate_scan` applies to boxed scans.
    fn validate_graph_path_input(
        &mut self,
        path: &GraphPathScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.with_depth(|v| {
            v.with_context(path, |v| {
                let available = v.validate_graph_path_scan(path, params)?;
                v.check_columns_available(&path.base.column_list, &available, "GraphPathScan")?;
                ensure(!path.base.is_ordered, || {
                    "GraphPathScan cannot produce an ordered result".to_string()
                })?;
                v.validate_option_list(&path.base.hint_list)?;
                Ok(ColumnSet::from_columns(&path.base.column_list))
            })
        })
    }

    pub(super) fn validate_graph_linear_scan(
        &mut self,
        scan: &GraphLinearScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        ensure(!scan.scan_list.is_empty(), || "GraphLinearScan has no stages".to_string())?;
        self.state.graph_working_tables.push(Vec::new());
        let result = self.validate_graph_linear_stages(&scan.scan_list, params);
        self.state.graph_working_tables.pop();
        result
    }

    fn validate_graph_linear_stages(&mut self, stages: &[Scan], params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let mut output = ColumnSet::new();
        for stage in stages {
            self.validate_scan(stage, params)?;
            let columns = stage.column_list();
            if let Some(top) = self.state.graph_working_tables.last_mut() {
                *top = columns.to_vec();
            }
            output = ColumnSet::from_columns(columns);
        }
        Ok(output)
    }

    /// Reads the working table of the innermost linear scan; its columns are
    /// references, not definitions.
    pub(super) fn validate_graph_ref_scan(&mut self, scan: &Scan) -> ValidationResult<ColumnSet> {
        let Some(working_table) = self.state.graph_working_tables.last() else {
            return fail("GraphRefScan appears outside of a GraphLinearScan");
        };
        let available = ColumnSet::from_columns(working_table);
        self.check_columns_available(scan.column_list(), &available, "GraphRefScan")?;
        Ok(available)
    }

    /// CALL acts as a lateral join: the subquery sees only the parameters.
    pub(super) fn validate_graph_call_scan(
        &mut self,
        scan: &GraphCallScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_column_refs(&input, params, &scan.parameter_list)?;
        let call_params = ColumnSet::from_columns(scan.parameter_list.iter().map(|p| &p.column));
        self.validate_scan(&scan.subquery, &call_params)?;
        let produced = ColumnSet::from_columns(scan.subquery.column_list());
        if let Some(shared) = produced.ids().find(|&id| input.contains_id(id)) {
            return fail(format!("Graph CALL subquery redefines column id {shared}"));
        }
        Ok(input.union(&produced))
    }

    // ========================================================================
    // Path and element patterns
    // ========================================================================

    pub(super) fn validate_graph_path_scan(
        &mut self,
        scan: &GraphPathScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        if scan.path_mode != GraphPathMode::Walk {
            self.check_feature(LanguageFeature::SqlGraphPathMode, "Graph path mode")?;
        }
        ensure(!scan.input_scan_list.is_empty(), || "GraphPathScan has no inputs".to_string())?;

        let mut inner = ColumnSet::new();
        for input in &scan.input_scan_list {
            ensure(
                matches!(input, Scan::GraphNode(_) | Scan::GraphEdge(_) | Scan::GraphPath(_)),
                || format!("GraphPathScan input cannot be a {}", input.kind_name()),
            )?;
            self.validate_scan(input, params)?;
            inner = inner.with_columns(input.column_list());
        }

        let (first, last) = match (scan.input_scan_list.first(), scan.input_scan_list.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return fail("GraphPathScan has no inputs"),
        };
        let head = path_end(first, PathEnd::Head)?;
        let tail = path_end(last, PathEnd::Tail)?;
        ensure(scan.head == *head, || {
            format!("GraphPathScan head {} must be the first element {head}", scan.head)
        })?;
        ensure(scan.tail == *tail, || {
            format!("GraphPathScan tail {} must be the last element {tail}", scan.tail)
        })?;

        if let Some(filter) = &scan.filter_expr {
            self.validate_bool_expr(&inner, params, filter, "Path pattern WHERE clause")?;
        }

        let mut available = inner.clone();
        match &scan.quantifier {
            Some(quantifier) => {
                self.validate_path_quantifier(quantifier, params)?;
                for group in &scan.group_variable_list {
                    ensure(inner.contains(&group.element), || {
                        format!("Group variable element {} is not defined by the path", group.element)
                    })?;
                    let matches_element = group
                        .array_column
                        .ty
                        .element_type()
                        .is_some_and(|element| element.equals(&group.element.ty));
                    ensure(matches_element, || {
                        format!(
                            "Group variable {} must be an array of {}",
                            group.array_column,
                            self.type_name(&group.element.ty)
                        )
                    })?;
                    self.check_unique_column_id(&group.array_column)?;
                    available = available.with_columns([&group.array_column]);
                }
            }
            None => ensure(scan.group_variable_list.is_empty(), || {
                "Only a quantified path may define group variables".to_string()
            })?,
        }

        if let Some(path) = &scan.path {
            ensure(path.ty.is_graph_path(), || {
                format!("Path column {path} has type {}, expected a GRAPH_PATH", self.type_name(&path.ty))
            })?;
            self.check_unique_column_id(path)?;
            available = available.with_columns([path]);
        }
        check_single_path_column(&scan.base.column_list, "GraphPathScan")?;
        Ok(available)
    }

    fn validate_path_quantifier(
        &mut self,
        quantifier: &GraphPathPatternQuantifier,
        params: &ColumnSet,
    ) -> ValidationResult<()> {
        self.check_feature(
            LanguageFeature::SqlGraphBoundedPathQuantification,
            "Quantified path pattern",
        )?;
        let Some(upper_bound) = &quantifier.upper_bound else {
            return fail("Quantified path pattern requires an upper bound");
        };
        let empty = ColumnSet::new();
        self.validate_int64_constant(&empty, params, upper_bound, "Path quantifier upper bound")?;
        if let Some(lower_bound) = &quantifier.lower_bound {
            self.validate_int64_constant(&empty, params, lower_bound, "Path quantifier lower bound")?;
        }
        let literal = |bound: Option<&Expr>| bound.and_then(|b| b.as_literal()).and_then(|l| l.value.as_i64());
        if let (Some(lower), Some(upper)) = (
            literal(quantifier.lower_bound.as_deref()),
            literal(Some(upper_bound)),
        ) {
            ensure(lower <= upper, || {
                format!("Path quantifier lower bound {lower} exceeds upper bound {upper}")
            })?;
        }
        Ok(())
    }

    /// Node and edge patterns define exactly one element column of their
    /// own kind.
    pub(super) fn validate_graph_element_scan(
        &mut self,
        scan: &Scan,
        filter: Option<&Expr>,
        label: Option<&GraphLabelExpr>,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        let expected_kind = match scan {
            Scan::GraphEdge(_) => GraphElementKind::Edge,
            _ => GraphElementKind::Node,
        };
        let [column] = scan.column_list() else {
            return fail(format!(
                "{} must produce exactly one column, found {}",
                scan.kind_name(),
                scan.column_list().len()
            ));
        };
        let Some(element_type) = column.ty.as_graph_element() else {
            return fail(format!(
                "{} column {column} has type {}, expected a graph element",
                scan.kind_name(),
                self.type_name(&column.ty)
            ));
        };
        ensure(element_type.element_kind == expected_kind, || {
            format!(
                "{} column {column} is a {} but the pattern is a {expected_kind}",
                scan.kind_name(),
                element_type.element_kind
            )
        })?;
        self.check_unique_column_id(column)?;

        if let Some(label) = label {
            self.validate_label_expr(label)?;
        }
        let available = ColumnSet::from_columns([column]);
        if let Some(filter) = filter {
            self.validate_bool_expr(&available, params, filter, "Element pattern WHERE clause")?;
        }
        Ok(available)
    }

    fn validate_label_expr(&mut self, label: &GraphLabelExpr) -> ValidationResult<()> {
        self.with_depth(|v| {
            v.with_context(label, |v| match label {
                GraphLabelExpr::Wildcard => Ok(()),
                GraphLabelExpr::Label(name) => {
                    ensure(!name.is_empty(), || "Label name must not be empty".to_string())?;
                    if v.feature_enabled(LanguageFeature::SqlGraphDynamicLabelProperties) {
                        return Ok(());
                    }
                    let known = v
                        .state
                        .property_graphs
                        .last()
                        .is_none_or(|graph| graph.has_label(name));
                    ensure(known, || format!("Label {name} is not defined by the property graph"))
                }
                GraphLabelExpr::Operation { op, operand_list } => {
                    match op {
                        GraphLogicalOp::Not => ensure(operand_list.len() == 1, || {
                            format!("Label NOT must have 1 operand, found {}", operand_list.len())
                        })?,
                        GraphLogicalOp::And | GraphLogicalOp::Or => ensure(operand_list.len() >= 2, || {
                            format!(
                                "Label {} must have at least 2 operands, found {}",
                                op.as_str(),
                                operand_list.len()
                            )
                        })?,
                    }
                    for operand in operand_list {
                        v.validate_label_expr(operand)?;
                    }
                    Ok(())
                }
            })
        })
    }

    // ========================================================================
    // Graph element expressions
    // ========================================================================

    pub(super) fn validate_graph_get_element_property(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        get: &GraphGetElementProperty,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &get.expr)?;
        let Some(element_type) = get.expr.ty().as_graph_element() else {
            return fail(format!(
                "Property access requires a graph element, found {}",
                self.type_name(get.expr.ty())
            ));
        };

        match (&get.property, &get.property_name) {
            (Some(property), None) => {
                self.check_type_equals(&get.ty, &property.ty, || {
                    format!("Property {}", property.name)
                })?;
                match element_type.find_property(&property.name) {
                    Some(declared) => self.check_type_equals(&declared.value_type, &property.ty, || {
                        format!("Element property {}", property.name)
                    }),
                    None => ensure(element_type.is_dynamic, || {
                        format!("Graph element has no property {}", property.name)
                    }),
                }
            }
            (None, Some(property_name)) => {
                self.check_feature(
                    LanguageFeature::SqlGraphDynamicLabelProperties,
                    "Dynamic property access",
                )?;
                self.validate_expr(visible, params, property_name)?;
                let is_string_literal = property_name
                    .as_literal()
                    .is_some_and(|l| l.value.as_str().is_some());
                ensure(is_string_literal, || {
                    "Dynamic property name must be a STRING literal".to_string()
                })?;
                ensure(get.ty.is_json(), || {
                    format!(
                        "Dynamic property access has type {}, expected JSON",
                        self.type_name(&get.ty)
                    )
                })
            }
            (Some(_), Some(_)) => fail("Property access names both a declared and a dynamic property"),
            (None, None) => fail("Property access names no property"),
        }
    }

    /// Every provided property must be declared by the element type; a
    /// static element type must receive all of them.
    pub(super) fn validate_graph_make_element(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        make: &GraphMakeElement,
    ) -> ValidationResult<()> {
        let Some(element_type) = make.ty.as_graph_element() else {
            return fail(format!(
                "GraphMakeElement has type {}, expected a graph element",
                self.type_name(&make.ty)
            ));
        };
        self.validate_expr(visible, params, &make.identifier)?;

        let mut seen = FxHashSet::default();
        for property in &make.property_list {
            ensure(seen.insert(property.name.to_ascii_lowercase()), || {
                format!("Property {} is set more than once", property.name)
            })?;
            self.validate_expr(visible, params, &property.value)?;
            match element_type.find_property(&property.name) {
                Some(declared) => self.check_type_equals(property.value.ty(), &declared.value_type, || {
                    format!("Property {}", property.name)
                })?,
                None => ensure(element_type.is_dynamic, || {
                    format!("Graph element has no property {}", property.name)
                })?,
            }
        }
        if !element_type.is_dynamic {
            ensure(seen.len() == element_type.property_types.len(), || {
                format!(
                    "GraphMakeElement sets {} of {} properties",
                    seen.len(),
                    element_type.property_types.len()
                )
            })?;
        }
        for label in &make.label_list {
            ensure(!label.is_empty(), || "Element label must not be empty".to_string())?;
        }
        Ok(())
    }

    pub(super) fn validate_graph_is_labeled_predicate(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        predicate: &GraphIsLabeledPredicate,
    ) -> ValidationResult<()> {
        ensure(predicate.ty.is_bool(), || {
            format!("IS LABELED has type {}, expected BOOL", self.type_name(&predicate.ty))
        })?;
        self.validate_expr(visible, params, &predicate.expr)?;
        ensure(predicate.expr.ty().is_graph_element(), || {
            format!(
                "IS LABELED requires a graph element, found {}",
                self.type_name(predicate.expr.ty())
            )
        })?;
        self.validate_label_expr(&predicate.label_expr)
    }

    // ========================================================================
    // CREATE PROPERTY GRAPH
    // ========================================================================

    pub(super) fn validate_create_property_graph_stmt(
        &mut self,
        stmt: &CreatePropertyGraphStmt,
    ) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::SqlGraph, "CREATE PROPERTY GRAPH")?;
        self.validate_create_common(&stmt.common, "CREATE PROPERTY GRAPH")?;
        ensure(!stmt.node_table_list.is_empty(), || {
            "CREATE PROPERTY GRAPH requires at least one node table".to_string()
        })?;

        let mut declarations = FxHashMap::default();
        for declaration in &stmt.property_declaration_list {
            ensure(
                declarations
                    .insert(declaration.name.to_ascii_lowercase(), declaration.ty.clone())
                    .is_none(),
                || format!("Property {} is declared more than once", declaration.name),
            )?;
        }

        let mut labels: FxHashMap<String, &[SmolStr]> = FxHashMap::default();
        for label in &stmt.label_list {
            for property in &label.property_declaration_name_list {
                ensure(declarations.contains_key(&property.to_ascii_lowercase()), || {
                    format!("Label {} exposes undeclared property {property}", label.name)
                })?;
            }
            ensure(
                labels
                    .insert(label.name.to_ascii_lowercase(), label.property_declaration_name_list.as_slice())
                    .is_none(),
                || format!("Label {} is defined more than once", label.name),
            )?;
        }

        let graph = GraphDefinition {
            declarations,
            labels,
        };
        let mut aliases = FxHashSet::default();
        let mut node_tables: FxHashMap<String, ColumnSet> = FxHashMap::default();
        for (tables, kind) in [
            (&stmt.node_table_list, GraphElementTableKind::Node),
            (&stmt.edge_table_list, GraphElementTableKind::Edge),
        ] {
            for table in tables.iter() {
                ensure(table.kind == kind, || {
                    format!("Element table {} is listed with the wrong kind", table.alias)
                })?;
                let alias = table.alias.to_ascii_lowercase();
                ensure(aliases.insert(alias.clone()), || {
                    format!("Element table alias {} is used more than once", table.alias)
                })?;
                let columns = self.validate_element_table(table, &graph, &node_tables)?;
                if kind == GraphElementTableKind::Node {
                    node_tables.insert(alias, columns);
                }
            }
        }
        Ok(())
    }

    fn validate_element_table(
        &mut self,
        table: &GraphElementTable,
        graph: &GraphDefinition<'_>,
        node_tables: &FxHashMap<String, ColumnSet>,
    ) -> ValidationResult<ColumnSet> {
        let alias = &table.alias;
        let empty = ColumnSet::new();
        self.validate_scan(&table.input_scan, &empty)?;
        let input = ColumnSet::from_columns(table.input_scan.column_list());

        ensure(!table.key_list.is_empty(), || format!("Element table {alias} has no key"))?;
        for key in &table.key_list {
            self.validate_expr(&input, &empty, key)?;
            ensure(key.ty().supports_equality_with(&self.language), || {
                format!(
                    "Key of element table {alias} has type {}, which does not support equality",
                    self.type_name(key.ty())
                )
            })?;
        }

        match table.kind {
            GraphElementTableKind::Node => ensure(
                table.source_node_reference.is_none() && table.dest_node_reference.is_none(),
                || format!("Node table {alias} cannot reference other node tables"),
            )?,
            GraphElementTableKind::Edge => {
                for (reference, what) in [
                    (&table.source_node_reference, "SOURCE"),
                    (&table.dest_node_reference, "DESTINATION"),
                ] {
                    let Some(reference) = reference else {
                        return fail(format!("Edge table {alias} has no {what} node reference"));
                    };
                    self.validate_node_table_reference(alias, reference, &input, node_tables)?;
                }
            }
        }

        ensure(!table.label_name_list.is_empty(), || {
            format!("Element table {alias} has no labels")
        })?;
        let mut defined = FxHashSet::default();
        for definition in &table.property_definition_list {
            let name = definition.property_declaration_name.to_ascii_lowercase();
            let Some(declared) = graph.declarations.get(&name) else {
                return fail(format!(
                    "Element table {alias} defines undeclared property {}",
                    definition.property_declaration_name
                ));
            };
            ensure(!definition.sql.is_empty(), || {
                format!(
                    "Property {} of element table {alias} has no SQL text",
                    definition.property_declaration_name
                )
            })?;
            self.validate_expr(&input, &empty, &definition.expr)?;
            self.check_type_equals(definition.expr.ty(), declared, || {
                format!("Property {} of element table {alias}", definition.property_declaration_name)
            })?;
            ensure(defined.insert(name), || {
                format!(
                    "Element table {alias} defines property {} more than once",
                    definition.property_declaration_name
                )
            })?;
        }
        for label in &table.label_name_list {
            let Some(properties) = graph.labels.get(&label.to_ascii_lowercase()) else {
                return fail(format!("Element table {alias} uses undefined label {label}"));
            };
            for property in properties.iter() {
                ensure(defined.contains(&property.to_ascii_lowercase()), || {
                    format!("Element table {alias} does not define property {property} of label {label}")
                })?;
            }
        }

        if let Some(dynamic_label) = &table.dynamic_label {
            self.check_feature(LanguageFeature::SqlGraphDynamicLabelProperties, "Dynamic label")?;
            self.validate_expr(&input, &empty, dynamic_label)?;
            ensure(dynamic_label.ty().is_string(), || {
                format!("Dynamic label of element table {alias} must be STRING")
            })?;
        }
        if let Some(dynamic_properties) = &table.dynamic_properties {
            self.check_feature(
                LanguageFeature::SqlGraphDynamicLabelProperties,
                "Dynamic properties",
            )?;
            self.validate_expr(&input, &empty, dynamic_properties)?;
            ensure(dynamic_properties.ty().is_json(), || {
                format!("Dynamic properties of element table {alias} must be JSON")
            })?;
        }
        Ok(input)
    }

    fn validate_node_table_reference(
        &mut self,
        edge_alias: &str,
        reference: &GraphNodeTableReference,
        edge_input: &ColumnSet,
        node_tables: &FxHashMap<String, ColumnSet>,
    ) -> ValidationResult<()> {
        let node_alias = &reference.node_table_identifier;
        let Some(node_input) = node_tables.get(&node_alias.to_ascii_lowercase()) else {
            return fail(format!(
                "Edge table {edge_alias} references unknown node table {node_alias}"
            ));
        };
        ensure(!reference.edge_table_column_list.is_empty(), || {
            format!("Edge table {edge_alias} references {node_alias} without key columns")
        })?;
        ensure(
            reference.edge_table_column_list.len() == reference.node_table_column_list.len(),
            || {
                format!(
                    "Edge table {edge_alias} references {node_alias} with {} edge columns and {} node columns",
                    reference.edge_table_column_list.len(),
                    reference.node_table_column_list.len()
                )
            },
        )?;
        let empty = ColumnSet::new();
        for (edge_column, node_column) in reference
            .edge_table_column_list
            .iter()
            .zip(&reference.node_table_column_list)
        {
            self.validate_expr(edge_input, &empty, edge_column)?;
            self.validate_expr(node_input, &empty, node_column)?;
            self.check_type_equals(edge_column.ty(), node_column.ty(), || {
                format!("Edge table {edge_alias} key column referencing {node_alias}")
            })?;
        }
        Ok(())
    }
}

/// Declarations of a CREATE PROPERTY GRAPH, keyed by lowercased name.
struct GraphDefinition<'a> {
    declarations: FxHashMap<String, TypeRef>,
    labels: FxHashMap<String, &'a [SmolStr]>,
}

#[derive(Clone, Copy)]
enum PathEnd {
    Head,
    Tail,
}

/// The element column at one end of a path input.
fn path_end(scan: &Scan, end: PathEnd) -> ValidationResult<&ResolvedColumn> {
    let column = match (scan, end) {
        (Scan::GraphPath(path), PathEnd::Head) => Some(&path.head),
        (Scan::GraphPath(path), PathEnd::Tail) => Some(&path.tail),
        (_, _) => scan.column_list().first(),
    };
    match column {
        Some(column) => Ok(column),
        None => fail(format!("{} produces no element column", scan.kind_name())),
    }
}

fn check_single_path_column(columns: &[ResolvedColumn], what: &str) -> ValidationResult<()> {
    let paths = columns.iter().filter(|c| c.ty.is_graph_path()).count();
    ensure(paths <= 1, || format!("{what} has {paths} path columns, at most one is allowed"))
}
