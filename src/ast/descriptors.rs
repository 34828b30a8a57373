//! Read-only catalog descriptors referenced from the resolved tree.
//!
//! These are produced by the catalog/resolver and consumed opaquely: the
//! validator only reads names, column shapes, function capabilities and
//! signatures from them.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::types::{Type, TypeRef};

// ============================================================================
// Tables
// ============================================================================

/// A column of a catalog table.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogColumn {
    pub name: SmolStr,
    pub ty: TypeRef,
    pub is_pseudo_column: bool,
}

/// A catalog table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: SmolStr,
    pub full_name: SmolStr,
    pub columns: Vec<CatalogColumn>,
    pub is_value_table: bool,
}

impl Table {
    pub fn new(name: impl Into<SmolStr>, columns: Vec<(&str, TypeRef)>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            columns: columns
                .into_iter()
                .map(|(name, ty)| CatalogColumn {
                    name: SmolStr::new(name),
                    ty,
                    is_pseudo_column: false,
                })
                .collect(),
            is_value_table: false,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&CatalogColumn> {
        self.columns.get(index)
    }
}

// ============================================================================
// Functions and signatures
// ============================================================================

/// Evaluation mode of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionMode {
    Scalar,
    Aggregate,
    Analytic,
}

/// Whether an analytic function requires, allows or forbids window ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowOrderSupport {
    #[default]
    Optional,
    Required,
    Disallowed,
}

/// Capability flags of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOptions {
    pub supports_over_clause: bool,
    pub window_ordering_support: WindowOrderSupport,
    pub supports_window_framing: bool,
    pub supports_order_by: bool,
    pub supports_limit: bool,
    pub supports_null_handling_modifier: bool,
    pub supports_safe_error_mode: bool,
    pub supports_having_modifier: bool,
    pub supports_distinct_modifier: bool,
    pub supports_group_by_modifier: bool,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            supports_over_clause: false,
            window_ordering_support: WindowOrderSupport::Optional,
            supports_window_framing: false,
            supports_order_by: false,
            supports_limit: false,
            supports_null_handling_modifier: false,
            supports_safe_error_mode: true,
            supports_having_modifier: true,
            supports_distinct_modifier: true,
            supports_group_by_modifier: false,
        }
    }
}

/// A catalog function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: SmolStr,
    pub group: SmolStr,
    pub mode: FunctionMode,
    pub options: FunctionOptions,
}

impl Function {
    pub fn new(name: impl Into<SmolStr>, mode: FunctionMode) -> Self {
        Self {
            name: name.into(),
            group: SmolStr::new("ZetaSQL"),
            mode,
            options: FunctionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FunctionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.mode == FunctionMode::Scalar
    }

    pub fn is_aggregate(&self) -> bool {
        self.mode == FunctionMode::Aggregate
    }

    pub fn is_analytic(&self) -> bool {
        self.mode == FunctionMode::Analytic
    }

    pub fn supports_safe_error_mode(&self) -> bool {
        self.options.supports_safe_error_mode
    }

    pub fn supports_over_clause(&self) -> bool {
        self.options.supports_over_clause
    }

    pub fn requires_window_ordering(&self) -> bool {
        self.options.window_ordering_support == WindowOrderSupport::Required
    }

    pub fn supports_window_ordering(&self) -> bool {
        self.options.window_ordering_support != WindowOrderSupport::Disallowed
    }

    pub fn supports_window_framing(&self) -> bool {
        self.options.supports_window_framing
    }
}

/// Cardinality of a signature argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentCardinality {
    #[default]
    Required,
    Optional,
    Repeated,
}

/// Templated placeholder kinds that must not survive into a concrete signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatedKind {
    Any1,
    Any2,
    ArrayAny1,
    ArbitraryType,
}

/// A fixed relation schema declared by a TVF signature.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSchema {
    pub columns: Vec<(SmolStr, TypeRef)>,
    pub is_value_table: bool,
}

/// What a signature argument accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureArgumentKind {
    /// A concrete scalar type.
    Fixed(TypeRef),
    /// A not-yet-resolved templated type.
    Templated(TemplatedKind),
    /// A table argument, optionally with a fixed schema.
    Relation(Option<RelationSchema>),
    Model,
    Connection,
    Descriptor,
    /// A lambda taking `argument_types` and returning `body_type`.
    Lambda {
        argument_types: Vec<TypeRef>,
        body_type: TypeRef,
    },
    Sequence,
    Graph,
    Void,
}

impl SignatureArgumentKind {
    pub fn is_concrete(&self) -> bool {
        !matches!(self, SignatureArgumentKind::Templated(_))
    }

    /// Short tag used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SignatureArgumentKind::Fixed(_) => "SCALAR",
            SignatureArgumentKind::Templated(_) => "TEMPLATED",
            SignatureArgumentKind::Relation(_) => "RELATION",
            SignatureArgumentKind::Model => "MODEL",
            SignatureArgumentKind::Connection => "CONNECTION",
            SignatureArgumentKind::Descriptor => "DESCRIPTOR",
            SignatureArgumentKind::Lambda { .. } => "LAMBDA",
            SignatureArgumentKind::Sequence => "SEQUENCE",
            SignatureArgumentKind::Graph => "GRAPH",
            SignatureArgumentKind::Void => "VOID",
        }
    }
}

/// One argument (or the result) of a function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureArgument {
    pub kind: SignatureArgumentKind,
    pub cardinality: ArgumentCardinality,
    /// How many actual arguments this entry matched; -1 when unresolved.
    pub num_occurrences: i32,
    pub name: Option<SmolStr>,
}

impl SignatureArgument {
    /// A required concrete scalar argument matched exactly once.
    pub fn fixed(ty: TypeRef) -> Self {
        Self {
            kind: SignatureArgumentKind::Fixed(ty),
            cardinality: ArgumentCardinality::Required,
            num_occurrences: 1,
            name: None,
        }
    }

    pub fn of_kind(kind: SignatureArgumentKind) -> Self {
        Self {
            kind,
            cardinality: ArgumentCardinality::Required,
            num_occurrences: 1,
            name: None,
        }
    }

    pub fn fixed_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            SignatureArgumentKind::Fixed(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.kind.is_concrete() && self.num_occurrences >= 0
    }
}

/// A function signature attached to a call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub arguments: Vec<SignatureArgument>,
    pub result: SignatureArgument,
    pub context_id: i64,
}

impl FunctionSignature {
    pub fn new(arguments: Vec<SignatureArgument>, result: SignatureArgument) -> Self {
        Self {
            arguments,
            result,
            context_id: 0,
        }
    }

    /// A signature with fixed scalar argument types.
    pub fn fixed(argument_types: Vec<TypeRef>, result_type: TypeRef) -> Self {
        Self::new(
            argument_types.into_iter().map(SignatureArgument::fixed).collect(),
            SignatureArgument::fixed(result_type),
        )
    }

    /// True when no argument or the result remains templated or unresolved.
    pub fn is_concrete(&self) -> bool {
        self.result.is_concrete() && self.arguments.iter().all(SignatureArgument::is_concrete)
    }

    /// Expands repeated/optional arguments by their occurrence counts.
    pub fn concrete_arguments(&self) -> Vec<&SignatureArgument> {
        self.arguments
            .iter()
            .flat_map(|arg| {
                let count = usize::try_from(arg.num_occurrences.max(0)).unwrap_or(0);
                std::iter::repeat_n(arg, count)
            })
            .collect()
    }

    /// Result type, when the result is a fixed scalar.
    pub fn result_type(&self) -> Option<&TypeRef> {
        self.result.fixed_type()
    }
}

/// A table-valued function.
#[derive(Debug, Clone, PartialEq)]
pub struct TableValuedFunction {
    pub name: SmolStr,
}

/// A stored procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: SmolStr,
    pub signature: FunctionSignature,
}

/// A named constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: SmolStr,
    pub ty: TypeRef,
}

/// A model usable as a TVF argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: SmolStr,
    pub inputs: Vec<(SmolStr, TypeRef)>,
    pub outputs: Vec<(SmolStr, TypeRef)>,
}

/// An external connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub name: SmolStr,
}

/// A sequence object.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: SmolStr,
}

/// A declared property of a property graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDeclaration {
    pub name: SmolStr,
    pub ty: TypeRef,
}

/// A property graph as seen by graph queries.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGraph {
    pub name: SmolStr,
    pub labels: Vec<SmolStr>,
    pub property_declarations: Vec<PropertyDeclaration>,
}

impl PropertyGraph {
    pub fn find_property(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.property_declarations
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(name))
    }
}

/// Shared handles, as held by tree nodes.
pub type TableRef = Arc<Table>;
pub type FunctionRef = Arc<Function>;

/// Returns true if two relation column types line up for a fixed schema.
pub(crate) fn relation_column_matches(expected: &(SmolStr, TypeRef), name: &str, ty: &Type) -> bool {
    expected.0.eq_ignore_ascii_case(name) && expected.1.equals(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::types;

    #[test]
    fn signature_concreteness() {
        let sig = FunctionSignature::fixed(vec![types::int64()], types::int64());
        assert!(sig.is_concrete());

        let mut templated = sig.clone();
        templated.arguments[0].kind = SignatureArgumentKind::Templated(TemplatedKind::Any1);
        assert!(!templated.is_concrete());

        let mut unresolved = sig;
        unresolved.arguments[0].num_occurrences = -1;
        assert!(!unresolved.is_concrete());
    }

    #[test]
    fn repeated_arguments_expand() {
        let mut sig = FunctionSignature::fixed(vec![types::string()], types::string());
        sig.arguments[0].cardinality = ArgumentCardinality::Repeated;
        sig.arguments[0].num_occurrences = 3;
        assert_eq!(sig.concrete_arguments().len(), 3);
    }

    #[test]
    fn function_capabilities() {
        let f = Function::new("rank", FunctionMode::Analytic).with_options(FunctionOptions {
            window_ordering_support: WindowOrderSupport::Required,
            ..FunctionOptions::default()
        });
        assert!(f.requires_window_ordering());
        assert!(f.supports_window_ordering());
        assert!(!f.supports_window_framing());
    }
}
