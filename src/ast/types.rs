//! Type system consumed by the resolved tree.
//!
//! The validator treats types as an opaque capability surface: it asks
//! whether a type supports equality, ordering, grouping or partitioning,
//! whether two types are equal or equivalent, and how to name a type in a
//! message. This module provides exactly that surface.
//!
//! # Type Hierarchy
//!
//! ```text
//! Type
//! ├── Simple (INT32 .. UUID)
//! ├── Enum / Proto            (named by full name)
//! ├── Array<T> / Range<T>
//! ├── Struct<name T, ...>
//! ├── Map<K, V>
//! ├── GraphElement / GraphPath
//! └── Measure<T>
//! ```

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::semantic::{LanguageFeature, LanguageOptions};

/// Shared handle to a type. Trees hold many references to the same type.
pub type TypeRef = Arc<Type>;

/// Controls how type names are spelled in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductMode {
    /// Internal names (`DOUBLE`, `FLOAT`, `INT32`).
    #[default]
    Internal,
    /// External names (`FLOAT64`, `FLOAT32`).
    External,
}

/// Discriminant of [`Type`], useful for messages and quick checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    Date,
    Timestamp,
    Time,
    Datetime,
    Interval,
    Geography,
    Numeric,
    BigNumeric,
    Json,
    Uuid,
    Enum,
    Array,
    Struct,
    Proto,
    Range,
    Map,
    GraphElement,
    GraphPath,
    Measure,
}

/// A resolved SQL type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    Date,
    Timestamp,
    Time,
    Datetime,
    Interval,
    Geography,
    Numeric,
    BigNumeric,
    Json,
    Uuid,
    Enum(EnumType),
    Array(ArrayType),
    Struct(StructType),
    Proto(ProtoType),
    Range(RangeType),
    Map(MapType),
    GraphElement(GraphElementType),
    GraphPath(GraphPathType),
    Measure(MeasureType),
}

/// `ARRAY<element_type>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element_type: TypeRef,
}

/// One field of a struct type. Field names may be empty (anonymous).
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: SmolStr,
    pub ty: TypeRef,
}

/// `STRUCT<name type, ...>`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<StructField>,
}

/// Cardinality label of a proto field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

/// A field of a proto message descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoField {
    pub name: SmolStr,
    pub number: i32,
    pub ty: TypeRef,
    pub label: FieldLabel,
    pub has_default: bool,
}

/// A proto message type, identified by its full name.
#[derive(Debug, Clone)]
pub struct ProtoType {
    pub full_name: SmolStr,
    pub fields: Vec<ProtoField>,
}

impl PartialEq for ProtoType {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl ProtoType {
    /// Looks up a field by name.
    pub fn find_field(&self, name: &str) -> Option<&ProtoField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// An enum type, identified by its full name.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub full_name: SmolStr,
    pub values: Vec<(SmolStr, i32)>,
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

/// `RANGE<element_type>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeType {
    pub element_type: TypeRef,
}

/// `MAP<key_type, value_type>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    pub key_type: TypeRef,
    pub value_type: TypeRef,
}

/// `MEASURE<result_type>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureType {
    pub result_type: TypeRef,
}

/// Whether a graph element is a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphElementKind {
    Node,
    Edge,
}

impl fmt::Display for GraphElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphElementKind::Node => write!(f, "NODE"),
            GraphElementKind::Edge => write!(f, "EDGE"),
        }
    }
}

/// A property exposed by a graph element type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyType {
    pub name: SmolStr,
    pub value_type: TypeRef,
}

/// The type of a node or edge produced by a property graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphElementType {
    pub graph_reference: Vec<SmolStr>,
    pub element_kind: GraphElementKind,
    pub property_types: Vec<PropertyType>,
    /// Dynamic element types may carry properties not declared statically.
    pub is_dynamic: bool,
}

impl GraphElementType {
    /// Looks up a statically declared property (case-insensitive).
    pub fn find_property(&self, name: &str) -> Option<&PropertyType> {
        self.property_types
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// The type of a path value: alternating nodes and edges.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPathType {
    pub node_type: TypeRef,
    pub edge_type: TypeRef,
}

impl Type {
    /// Returns the discriminant of this type.
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Int32 => TypeKind::Int32,
            Type::Int64 => TypeKind::Int64,
            Type::Uint32 => TypeKind::Uint32,
            Type::Uint64 => TypeKind::Uint64,
            Type::Bool => TypeKind::Bool,
            Type::Float => TypeKind::Float,
            Type::Double => TypeKind::Double,
            Type::String => TypeKind::String,
            Type::Bytes => TypeKind::Bytes,
            Type::Date => TypeKind::Date,
            Type::Timestamp => TypeKind::Timestamp,
            Type::Time => TypeKind::Time,
            Type::Datetime => TypeKind::Datetime,
            Type::Interval => TypeKind::Interval,
            Type::Geography => TypeKind::Geography,
            Type::Numeric => TypeKind::Numeric,
            Type::BigNumeric => TypeKind::BigNumeric,
            Type::Json => TypeKind::Json,
            Type::Uuid => TypeKind::Uuid,
            Type::Enum(_) => TypeKind::Enum,
            Type::Array(_) => TypeKind::Array,
            Type::Struct(_) => TypeKind::Struct,
            Type::Proto(_) => TypeKind::Proto,
            Type::Range(_) => TypeKind::Range,
            Type::Map(_) => TypeKind::Map,
            Type::GraphElement(_) => TypeKind::GraphElement,
            Type::GraphPath(_) => TypeKind::GraphPath,
            Type::Measure(_) => TypeKind::Measure,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_int64(&self) -> bool {
        matches!(self, Type::Int64)
    }

    pub fn is_uint64(&self) -> bool {
        matches!(self, Type::Uint64)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, Type::Bytes)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Type::Json)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int32 | Type::Int64 | Type::Uint32 | Type::Uint64)
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_proto(&self) -> bool {
        matches!(self, Type::Proto(_))
    }

    pub fn is_graph_element(&self) -> bool {
        matches!(self, Type::GraphElement(_))
    }

    pub fn is_graph_path(&self) -> bool {
        matches!(self, Type::GraphPath(_))
    }

    pub fn is_measure(&self) -> bool {
        matches!(self, Type::Measure(_))
    }

    /// True for the non-parameterized scalar types.
    pub fn is_simple(&self) -> bool {
        !matches!(
            self,
            Type::Enum(_)
                | Type::Array(_)
                | Type::Struct(_)
                | Type::Proto(_)
                | Type::Range(_)
                | Type::Map(_)
                | Type::GraphElement(_)
                | Type::GraphPath(_)
                | Type::Measure(_)
        )
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_proto(&self) -> Option<&ProtoType> {
        match self {
            Type::Proto(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_graph_element(&self) -> Option<&GraphElementType> {
        match self {
            Type::GraphElement(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_graph_path(&self) -> Option<&GraphPathType> {
        match self {
            Type::GraphPath(p) => Some(p),
            _ => None,
        }
    }

    /// Element type of an array, if this is an array.
    pub fn element_type(&self) -> Option<&TypeRef> {
        self.as_array().map(|a| &a.element_type)
    }

    /// Exact structural equality, including struct field names.
    pub fn equals(&self, other: &Type) -> bool {
        self == other
    }

    /// Equality that ignores struct field names.
    pub fn equivalent(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Struct(a), Type::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(x, y)| x.ty.equivalent(&y.ty))
            }
            (Type::Array(a), Type::Array(b)) => a.element_type.equivalent(&b.element_type),
            (Type::Range(a), Type::Range(b)) => a.element_type.equivalent(&b.element_type),
            (Type::Map(a), Type::Map(b)) => {
                a.key_type.equivalent(&b.key_type) && a.value_type.equivalent(&b.value_type)
            }
            (Type::Measure(a), Type::Measure(b)) => a.result_type.equivalent(&b.result_type),
            _ => self == other,
        }
    }

    /// Whether values of this type can be compared with `=`.
    pub fn supports_equality(&self) -> bool {
        match self {
            Type::Json | Type::Geography | Type::Proto(_) | Type::Map(_) | Type::Measure(_) => {
                false
            }
            Type::Array(a) => a.element_type.supports_equality(),
            Type::Struct(s) => s.fields.iter().all(|f| f.ty.supports_equality()),
            Type::Range(r) => r.element_type.supports_equality(),
            _ => true,
        }
    }

    /// Equality support taking feature gates into account.
    pub fn supports_equality_with(&self, options: &LanguageOptions) -> bool {
        match self {
            Type::Array(a) => {
                options.feature_enabled(LanguageFeature::ArrayEquality)
                    && a.element_type.supports_equality_with(options)
            }
            Type::Struct(s) => s.fields.iter().all(|f| f.ty.supports_equality_with(options)),
            _ => self.supports_equality(),
        }
    }

    /// Whether values of this type can appear in ORDER BY.
    pub fn supports_ordering(&self, options: &LanguageOptions) -> bool {
        match self {
            Type::Json
            | Type::Geography
            | Type::Proto(_)
            | Type::Struct(_)
            | Type::Map(_)
            | Type::Measure(_)
            | Type::GraphElement(_)
            | Type::GraphPath(_) => false,
            Type::Array(a) => {
                options.feature_enabled(LanguageFeature::ArrayOrdering)
                    && a.element_type.supports_ordering(options)
            }
            Type::Range(r) => r.element_type.supports_ordering(options),
            _ => true,
        }
    }

    /// Whether values of this type can appear in GROUP BY or DISTINCT.
    pub fn supports_grouping(&self, options: &LanguageOptions) -> bool {
        match self {
            Type::Json | Type::Geography | Type::Proto(_) | Type::Map(_) | Type::Measure(_) => {
                false
            }
            Type::Array(a) => {
                options.feature_enabled(LanguageFeature::GroupByArray)
                    && a.element_type.supports_grouping(options)
            }
            Type::Struct(s) => {
                options.feature_enabled(LanguageFeature::GroupByStruct)
                    && s.fields.iter().all(|f| f.ty.supports_grouping(options))
            }
            Type::Range(r) => r.element_type.supports_grouping(options),
            _ => true,
        }
    }

    /// Whether values of this type can appear in PARTITION BY.
    pub fn supports_partitioning(&self, options: &LanguageOptions) -> bool {
        match self {
            Type::Float | Type::Double => false,
            Type::Array(a) => {
                options.feature_enabled(LanguageFeature::GroupByArray)
                    && a.element_type.supports_partitioning(options)
            }
            Type::Struct(s) => {
                options.feature_enabled(LanguageFeature::GroupByStruct)
                    && s.fields.iter().all(|f| f.ty.supports_partitioning(options))
            }
            _ => self.supports_grouping(options),
        }
    }

    /// Renders the type name as a user would spell it.
    pub fn type_name(&self, mode: ProductMode) -> String {
        let simple = |internal: &'static str, external: &'static str| -> String {
            match mode {
                ProductMode::Internal => internal.to_string(),
                ProductMode::External => external.to_string(),
            }
        };
        match self {
            Type::Int32 => simple("INT32", "INT32"),
            Type::Int64 => simple("INT64", "INT64"),
            Type::Uint32 => simple("UINT32", "UINT32"),
            Type::Uint64 => simple("UINT64", "UINT64"),
            Type::Bool => simple("BOOL", "BOOL"),
            Type::Float => simple("FLOAT", "FLOAT32"),
            Type::Double => simple("DOUBLE", "FLOAT64"),
            Type::String => simple("STRING", "STRING"),
            Type::Bytes => simple("BYTES", "BYTES"),
            Type::Date => simple("DATE", "DATE"),
            Type::Timestamp => simple("TIMESTAMP", "TIMESTAMP"),
            Type::Time => simple("TIME", "TIME"),
            Type::Datetime => simple("DATETIME", "DATETIME"),
            Type::Interval => simple("INTERVAL", "INTERVAL"),
            Type::Geography => simple("GEOGRAPHY", "GEOGRAPHY"),
            Type::Numeric => simple("NUMERIC", "NUMERIC"),
            Type::BigNumeric => simple("BIGNUMERIC", "BIGNUMERIC"),
            Type::Json => simple("JSON", "JSON"),
            Type::Uuid => simple("UUID", "UUID"),
            Type::Enum(e) => format!("ENUM<{}>", e.full_name),
            Type::Proto(p) => format!("PROTO<{}>", p.full_name),
            Type::Array(a) => format!("ARRAY<{}>", a.element_type.type_name(mode)),
            Type::Range(r) => format!("RANGE<{}>", r.element_type.type_name(mode)),
            Type::Map(m) => format!(
                "MAP<{}, {}>",
                m.key_type.type_name(mode),
                m.value_type.type_name(mode)
            ),
            Type::Measure(m) => format!("MEASURE<{}>", m.result_type.type_name(mode)),
            Type::Struct(s) => {
                let fields = s
                    .fields
                    .iter()
                    .map(|f| {
                        if f.name.is_empty() {
                            f.ty.type_name(mode)
                        } else {
                            format!("{} {}", f.name, f.ty.type_name(mode))
                        }
                    })
                    .collect::<Vec<_>>();
                format!("STRUCT<{}>", fields.join(", "))
            }
            Type::GraphElement(g) => {
                let props = g
                    .property_types
                    .iter()
                    .map(|p| format!("{} {}", p.name, p.value_type.type_name(mode)))
                    .collect::<Vec<_>>();
                let prefix = match g.element_kind {
                    GraphElementKind::Node => "GRAPH_NODE",
                    GraphElementKind::Edge => "GRAPH_EDGE",
                };
                let dynamic = if g.is_dynamic { ", DYNAMIC" } else { "" };
                format!(
                    "{}({})<{}{}>",
                    prefix,
                    g.graph_reference.join("."),
                    props.join(", "),
                    dynamic
                )
            }
            Type::GraphPath(p) => format!(
                "PATH<node: {}, edge: {}>",
                p.node_type.type_name(mode),
                p.edge_type.type_name(mode)
            ),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name(ProductMode::Internal))
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Convenience constructors for shared type handles.
pub mod types {
    use super::*;

    pub fn int32() -> TypeRef {
        Arc::new(Type::Int32)
    }

    pub fn int64() -> TypeRef {
        Arc::new(Type::Int64)
    }

    pub fn uint64() -> TypeRef {
        Arc::new(Type::Uint64)
    }

    pub fn bool() -> TypeRef {
        Arc::new(Type::Bool)
    }

    pub fn double() -> TypeRef {
        Arc::new(Type::Double)
    }

    pub fn string() -> TypeRef {
        Arc::new(Type::String)
    }

    pub fn bytes() -> TypeRef {
        Arc::new(Type::Bytes)
    }

    pub fn date() -> TypeRef {
        Arc::new(Type::Date)
    }

    pub fn timestamp() -> TypeRef {
        Arc::new(Type::Timestamp)
    }

    pub fn json() -> TypeRef {
        Arc::new(Type::Json)
    }

    pub fn array(element_type: TypeRef) -> TypeRef {
        Arc::new(Type::Array(ArrayType { element_type }))
    }

    pub fn struct_of(fields: Vec<(&str, TypeRef)>) -> TypeRef {
        Arc::new(Type::Struct(StructType {
            fields: fields
                .into_iter()
                .map(|(name, ty)| StructField {
                    name: SmolStr::new(name),
                    ty,
                })
                .collect(),
        }))
    }

    pub fn graph_node(graph: &str, properties: Vec<(&str, TypeRef)>) -> TypeRef {
        graph_element(graph, GraphElementKind::Node, properties)
    }

    pub fn graph_edge(graph: &str, properties: Vec<(&str, TypeRef)>) -> TypeRef {
        graph_element(graph, GraphElementKind::Edge, properties)
    }

    pub fn graph_element(
        graph: &str,
        element_kind: GraphElementKind,
        properties: Vec<(&str, TypeRef)>,
    ) -> TypeRef {
        Arc::new(Type::GraphElement(GraphElementType {
            graph_reference: vec![SmolStr::new(graph)],
            element_kind,
            property_types: properties
                .into_iter()
                .map(|(name, value_type)| PropertyType {
                    name: SmolStr::new(name),
                    value_type,
                })
                .collect(),
            is_dynamic: false,
        }))
    }

    pub fn graph_path(node_type: TypeRef, edge_type: TypeRef) -> TypeRef {
        Arc::new(Type::GraphPath(GraphPathType {
            node_type,
            edge_type,
        }))
    }
}

// ============================================================================
// Type parameters and collation
// ============================================================================

/// Type parameters attached to a type, e.g. `STRING(10)` or `NUMERIC(10, 2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeParameters {
    /// No parameters at this level.
    Empty,
    /// `STRING(L)` / `BYTES(L)`.
    MaxLength(i64),
    /// `NUMERIC(P, S)` / `BIGNUMERIC(P, S)`.
    Numeric { precision: i64, scale: i64 },
    /// `TIMESTAMP(P)`.
    Timestamp { precision: i64 },
    /// Parameters for struct fields or the array element.
    Children(Vec<TypeParameters>),
}

impl TypeParameters {
    /// Checks that these parameters structurally fit `ty`.
    pub fn matches_type(&self, ty: &Type) -> bool {
        match self {
            TypeParameters::Empty => true,
            TypeParameters::MaxLength(len) => *len > 0 && (ty.is_string() || ty.is_bytes()),
            TypeParameters::Numeric { precision, scale } => {
                matches!(ty, Type::Numeric | Type::BigNumeric)
                    && *precision > 0
                    && *scale >= 0
                    && scale <= precision
            }
            TypeParameters::Timestamp { precision } => {
                matches!(ty, Type::Timestamp) && (0..=12).contains(precision)
            }
            TypeParameters::Children(children) => match ty {
                Type::Struct(s) => {
                    children.len() == s.fields.len()
                        && children
                            .iter()
                            .zip(&s.fields)
                            .all(|(c, f)| c.matches_type(&f.ty))
                }
                Type::Array(a) => children.len() == 1 && children[0].matches_type(&a.element_type),
                _ => false,
            },
        }
    }
}

/// Collation annotation tree mirroring the nesting of a type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Collation {
    pub collation_name: Option<SmolStr>,
    pub child_list: Vec<Collation>,
}

impl Collation {
    /// A leaf collation such as `und:ci`.
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self {
            collation_name: Some(name.into()),
            child_list: Vec::new(),
        }
    }

    /// True when no level of the tree carries a collation name.
    pub fn is_empty(&self) -> bool {
        self.collation_name.is_none() && self.child_list.iter().all(Collation::is_empty)
    }

    /// Checks arity agreement between the collation tree and `ty`.
    pub fn is_compatible_with(&self, ty: &Type) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.child_list.is_empty() {
            return self.collation_name.is_some() && ty.is_string();
        }
        if self.collation_name.is_some() {
            return false;
        }
        match ty {
            Type::Struct(s) => {
                self.child_list.len() == s.fields.len()
                    && self
                        .child_list
                        .iter()
                        .zip(&s.fields)
                        .all(|(c, f)| c.is_compatible_with(&f.ty))
            }
            Type::Array(a) => {
                self.child_list.len() == 1 && self.child_list[0].is_compatible_with(&a.element_type)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.child_list.is_empty() {
            return write!(f, "{}", self.collation_name.as_deref().unwrap_or("_"));
        }
        write!(f, "[")?;
        for (i, child) in self.child_list.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{child}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_type_name_renders_fields() {
        let ty = types::struct_of(vec![("a", types::int64()), ("", types::string())]);
        assert_eq!(ty.to_string(), "STRUCT<a INT64, STRING>");
    }

    #[test]
    fn product_mode_changes_float_names() {
        assert_eq!(Type::Double.type_name(ProductMode::Internal), "DOUBLE");
        assert_eq!(Type::Double.type_name(ProductMode::External), "FLOAT64");
        assert_eq!(Type::Float.type_name(ProductMode::External), "FLOAT32");
    }

    #[test]
    fn equivalent_ignores_field_names() {
        let a = types::struct_of(vec![("a", types::int64())]);
        let b = types::struct_of(vec![("b", types::int64())]);
        assert!(!a.equals(&b));
        assert!(a.equivalent(&b));
    }

    #[test]
    fn capability_queries_respect_features() {
        let options = LanguageOptions::new();
        let arr = types::array(types::int64());
        assert!(!arr.supports_grouping(&options));
        assert!(!arr.supports_ordering(&options));
        let options = options.with_feature(LanguageFeature::GroupByArray);
        assert!(arr.supports_grouping(&options));
        assert!(!Type::Json.supports_equality());
        assert!(!Type::Double.supports_partitioning(&options));
        assert!(Type::Double.supports_grouping(&options));
    }

    #[test]
    fn type_parameters_follow_nesting() {
        let ty = types::struct_of(vec![("s", types::string()), ("i", types::int64())]);
        let params = TypeParameters::Children(vec![
            TypeParameters::MaxLength(10),
            TypeParameters::Empty,
        ]);
        assert!(params.matches_type(&ty));
        let wrong = TypeParameters::Children(vec![TypeParameters::MaxLength(10)]);
        assert!(!wrong.matches_type(&ty));
        assert!(!TypeParameters::MaxLength(3).matches_type(&Type::Int64));
    }

    #[test]
    fn collation_arity_must_match_type() {
        let leaf = Collation::named("und:ci");
        assert!(leaf.is_compatible_with(&Type::String));
        assert!(!leaf.is_compatible_with(&Type::Int64));

        let nested = Collation {
            collation_name: None,
            child_list: vec![Collation::named("und:ci"), Collation::default()],
        };
        let ty = types::struct_of(vec![("a", types::string()), ("b", types::int64())]);
        assert!(nested.is_compatible_with(&ty));
        assert!(!nested.is_compatible_with(&types::array(types::string())));
        assert_eq!(nested.to_string(), "[und:ci,_]");
    }
}
