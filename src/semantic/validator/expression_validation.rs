//! Expression validation.
//!
//! Certifies that an expression is well scoped against the visible columns
//! and parameters of its position, and that its declared type agrees with
//! the computation that produces it. Expressions do not change what their
//! children can see, except for WITH expressions, lambdas and subqueries.

use rustc_hash::FxHashSet;

use crate::ast::expression::{
    Cast, ColumnRef, Expr, Flatten, GetProtoField, GetStructField, Literal, MakeProto,
    MakeStruct, Parameter, ReplaceField, SubqueryExpr, SubqueryType, WithExpr,
};
use crate::ast::types::{FieldLabel, ProtoField, Type, TypeRef, types};
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

/// The field-access family of a FLATTEN step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldAccessKind {
    Struct,
    Proto,
    Json,
    GraphProperty,
}

impl FieldAccessKind {
    fn of(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::GetStructField(_) => Some(Self::Struct),
            Expr::GetProtoField(_) => Some(Self::Proto),
            Expr::GetJsonField(_) => Some(Self::Json),
            Expr::GraphGetElementProperty(_) => Some(Self::GraphProperty),
            _ => None,
        }
    }

    fn operand(expr: &Expr) -> Option<&Expr> {
        match expr {
            Expr::GetStructField(e) => Some(&e.expr),
            Expr::GetProtoField(e) => Some(&e.expr),
            Expr::GetJsonField(e) => Some(&e.expr),
            Expr::GraphGetElementProperty(e) => Some(&e.expr),
            _ => None,
        }
    }
}

/// Declared type of reading `field`, accounting for repetition.
fn proto_field_value_matches(field: &ProtoField, ty: &Type) -> bool {
    match field.label {
        FieldLabel::Repeated => ty
            .element_type()
            .is_some_and(|element| element.equals(&field.ty)),
        FieldLabel::Optional | FieldLabel::Required => ty.equals(&field.ty),
    }
}

impl Validator {
    /// Validates `expr` against the columns and parameters in scope.
    pub(super) fn validate_expr(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
    ) -> ValidationResult<()> {
        self.with_depth(|v| v.with_context(expr, |v| v.validate_expr_kind(visible, params, expr)))
    }

    pub(super) fn validate_exprs<'a, I>(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        exprs: I,
    ) -> ValidationResult<()>
    where
        I: IntoIterator<Item = &'a Expr>,
    {
        for expr in exprs {
            self.validate_expr(visible, params, expr)?;
        }
        Ok(())
    }

    fn validate_expr_kind(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
    ) -> ValidationResult<()> {
        match expr {
            Expr::Literal(literal) => self.validate_literal(literal),
            Expr::Parameter(parameter) => validate_parameter(parameter),
            Expr::ExpressionColumn(column) => ensure(!column.name.is_empty(), || {
                "ExpressionColumn must have a name".to_string()
            }),
            Expr::ColumnRef(column_ref) => self.validate_column_ref(visible, params, column_ref),
            Expr::Constant(constant) => {
                self.check_type_equals(&constant.ty, &constant.constant.ty, || {
                    format!("Constant {}", constant.constant.name)
                })
            }
            Expr::SystemVariable(variable) => ensure(!variable.name_path.is_empty(), || {
                "SystemVariable must have a name path".to_string()
            }),
            Expr::ArgumentRef(argument) => ensure(!argument.name.is_empty(), || {
                "ArgumentRef must have a name".to_string()
            }),
            Expr::FunctionCall(call) => self.validate_function_call(visible, params, call),
            Expr::AggregateFunctionCall(call) => fail(format!(
                "Aggregate function {} is only allowed in an aggregate list",
                call.base.function_name()
            )),
            Expr::AnalyticFunctionCall(call) => fail(format!(
                "Analytic function {} is only allowed in an analytic function group",
                call.base.function_name()
            )),
            Expr::Cast(cast) => self.validate_cast(visible, params, cast),
            Expr::MakeStruct(make) => self.validate_make_struct(visible, params, make),
            Expr::MakeProto(make) => self.validate_make_proto(visible, params, make),
            Expr::GetStructField(get) => self.validate_get_struct_field(visible, params, get),
            Expr::GetProtoField(get) => self.validate_get_proto_field(visible, params, get),
            Expr::GetJsonField(get) => {
                self.validate_expr(visible, params, &get.expr)?;
                ensure(get.expr.ty().is_json(), || {
                    format!(
                        "GetJsonField operand must be JSON, but has type {}",
                        self.type_name(get.expr.ty())
                    )
                })?;
                ensure(get.ty.is_json(), || "GetJsonField must produce JSON".to_string())?;
                ensure(!get.field_name.is_empty(), || {
                    "GetJsonField must name a field".to_string()
                })
            }
            Expr::Flatten(flatten) => self.validate_flatten(visible, params, flatten),
            Expr::FlattenedArg(arg) => {
                let Some(expected) = self.state.flattened_arg_types.last() else {
                    return fail("FlattenedArg found outside of FLATTEN");
                };
                self.check_type_equals(&arg.ty, expected, || "FlattenedArg".to_string())
            }
            Expr::ReplaceField(replace) => self.validate_replace_field(visible, params, replace),
            Expr::SubqueryExpr(subquery) => self.validate_subquery_expr(visible, params, subquery),
            Expr::WithExpr(with) => self.validate_with_expr(visible, params, with),
            Expr::DmlDefault(_) => fail("DMLDefault is only allowed as a DML value"),
            Expr::GraphGetElementProperty(get) => {
                self.validate_graph_get_element_property(visible, params, get)
            }
            Expr::GraphMakeElement(make) => self.validate_graph_make_element(visible, params, make),
            Expr::GraphIsLabeledPredicate(predicate) => {
                self.validate_graph_is_labeled_predicate(visible, params, predicate)
            }
        }
    }

    fn validate_literal(&self, literal: &Literal) -> ValidationResult<()> {
        let value_type = literal.value.ty();
        ensure(value_type.equals(&literal.ty), || {
            format!(
                "Literal value {} has type {}, but the literal is declared as {}",
                literal.value,
                self.type_name(&value_type),
                self.type_name(&literal.ty)
            )
        })?;
        ensure(literal.value.is_internally_consistent(), || {
            format!("Literal value {} is inconsistent with its type", literal.value)
        })
    }

    /// Checks a column reference against the scope its correlation flag
    /// selects.
    pub(super) fn validate_column_ref(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        column_ref: &ColumnRef,
    ) -> ValidationResult<()> {
        let column = &column_ref.column;
        if column_ref.is_correlated {
            ensure(params.contains(column), || {
                format!("Incorrect reference to correlated column {column}")
            })?;
        } else {
            ensure(visible.contains(column), || {
                format!("Incorrect reference to column {column}")
            })?;
        }
        self.check_type_equals(&column_ref.ty, &column.ty, || format!("ColumnRef to {column}"))?;
        self.state.note_reference(column);
        Ok(())
    }

    pub(super) fn validate_column_refs(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        column_refs: &[ColumnRef],
    ) -> ValidationResult<()> {
        for column_ref in column_refs {
            self.with_context(column_ref, |v| v.validate_column_ref(visible, params, column_ref))?;
        }
        Ok(())
    }

    fn validate_cast(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        cast: &Cast,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &cast.expr)?;
        if let Some(format) = &cast.format {
            self.check_feature(LanguageFeature::FormatInCast, "CAST with FORMAT")?;
            self.validate_expr(visible, params, format)?;
            ensure(format.ty().is_string(), || {
                format!(
                    "CAST format must be STRING, but has type {}",
                    self.type_name(format.ty())
                )
            })?;
        }
        if let Some(time_zone) = &cast.time_zone {
            ensure(cast.format.is_some(), || {
                "CAST time zone requires a format".to_string()
            })?;
            self.validate_expr(visible, params, time_zone)?;
            ensure(time_zone.ty().is_string(), || {
                format!(
                    "CAST time zone must be STRING, but has type {}",
                    self.type_name(time_zone.ty())
                )
            })?;
        }
        if let Some(parameters) = &cast.type_parameters {
            self.check_feature(LanguageFeature::ParameterizedTypes, "CAST with type parameters")?;
            ensure(parameters.matches_type(&cast.ty), || {
                format!(
                    "CAST type parameters do not match target type {}",
                    self.type_name(&cast.ty)
                )
            })?;
        }
        if let Some(collation) = &cast.collation {
            self.check_feature(LanguageFeature::CollationSupport, "CAST with collation")?;
            ensure(collation.is_compatible_with(&cast.ty), || {
                format!(
                    "CAST collation {collation} does not match target type {}",
                    self.type_name(&cast.ty)
                )
            })?;
        }
        Ok(())
    }

    fn validate_make_struct(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        make: &MakeStruct,
    ) -> ValidationResult<()> {
        let Some(struct_type) = make.ty.as_struct() else {
            return fail(format!(
                "MakeStruct must produce a STRUCT, but has type {}",
                self.type_name(&make.ty)
            ));
        };
        ensure(struct_type.fields.len() == make.field_list.len(), || {
            format!(
                "MakeStruct has {} fields, but its type has {}",
                make.field_list.len(),
                struct_type.fields.len()
            )
        })?;
        for (index, (field, expr)) in struct_type.fields.iter().zip(&make.field_list).enumerate() {
            self.validate_expr(visible, params, expr)?;
            self.check_type_equals(expr.ty(), &field.ty, || {
                format!("MakeStruct field {index}")
            })?;
        }
        Ok(())
    }

    fn validate_make_proto(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        make: &MakeProto,
    ) -> ValidationResult<()> {
        let Some(proto) = make.ty.as_proto() else {
            return fail(format!(
                "MakeProto must produce a PROTO, but has type {}",
                self.type_name(&make.ty)
            ));
        };
        let mut seen = FxHashSet::default();
        for field in &make.field_list {
            ensure(seen.insert(field.field_name.clone()), || {
                format!("MakeProto sets field {} more than once", field.field_name)
            })?;
            let Some(declared) = proto.find_field(&field.field_name) else {
                return fail(format!(
                    "Proto {} has no field {}",
                    proto.full_name, field.field_name
                ));
            };
            self.validate_expr(visible, params, &field.expr)?;
            ensure(proto_field_value_matches(declared, field.expr.ty()), || {
                format!(
                    "MakeProto value for field {} has type {}, which does not match the field",
                    field.field_name,
                    self.type_name(field.expr.ty())
                )
            })?;
        }
        Ok(())
    }

    fn validate_get_struct_field(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        get: &GetStructField,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &get.expr)?;
        let Some(struct_type) = get.expr.ty().as_struct() else {
            return fail(format!(
                "GetStructField operand must be a STRUCT, but has type {}",
                self.type_name(get.expr.ty())
            ));
        };
        let Some(field) = struct_type.fields.get(get.field_idx) else {
            return fail(format!(
                "GetStructField index {} is out of range for {}",
                get.field_idx,
                self.type_name(get.expr.ty())
            ));
        };
        self.check_type_equals(&get.ty, &field.ty, || {
            format!("GetStructField {}", get.field_idx)
        })
    }

    fn validate_get_proto_field(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        get: &GetProtoField,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &get.expr)?;
        let Some(proto) = get.expr.ty().as_proto() else {
            return fail(format!(
                "GetProtoField operand must be a PROTO, but has type {}",
                self.type_name(get.expr.ty())
            ));
        };
        let Some(field) = proto.find_field(&get.field_name) else {
            return fail(format!("Proto {} has no field {}", proto.full_name, get.field_name));
        };
        if get.get_has_bit {
            ensure(get.ty.is_bool(), || {
                "GetProtoField has-bit access must produce BOOL".to_string()
            })?;
            ensure(field.label != FieldLabel::Repeated, || {
                format!("Repeated field {} has no has-bit", get.field_name)
            })?;
            ensure(get.default_value.is_none() && !get.return_default_value_when_unset, || {
                "GetProtoField has-bit access cannot carry a default value".to_string()
            })?;
            return Ok(());
        }
        ensure(proto_field_value_matches(field, &get.ty), || {
            format!(
                "GetProtoField {} has type {}, which does not match the field",
                get.field_name,
                self.type_name(&get.ty)
            )
        })?;
        if field.label == FieldLabel::Required {
            ensure(get.default_value.is_none() && !get.return_default_value_when_unset, || {
                format!("Required field {} cannot have a default value", get.field_name)
            })?;
        }
        if get.return_default_value_when_unset {
            ensure(get.default_value.is_none(), || {
                "GetProtoField returning the default when unset cannot carry a default value"
                    .to_string()
            })?;
            ensure(field.label != FieldLabel::Repeated, || {
                format!("Repeated field {} has no default value", get.field_name)
            })?;
        }
        if let Some(default) = &get.default_value {
            ensure(default.is_null() || default.ty().equals(&get.ty), || {
                format!(
                    "Default value {default} of field {} does not match type {}",
                    get.field_name,
                    self.type_name(&get.ty)
                )
            })?;
        }
        Ok(())
    }

    fn validate_flatten(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        flatten: &Flatten,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &flatten.expr)?;
        let Some(element) = flatten.expr.ty().element_type() else {
            return fail(format!(
                "FLATTEN input must be an ARRAY, but has type {}",
                self.type_name(flatten.expr.ty())
            ));
        };
        ensure(!flatten.get_field_list.is_empty(), || {
            "FLATTEN must have at least one field access".to_string()
        })?;
        let mut current: TypeRef = element.clone();
        let mut chain_kind = None;
        for get in &flatten.get_field_list {
            let Some(kind) = FieldAccessKind::of(get) else {
                return fail(format!(
                    "FLATTEN field access must be a field access, found {}",
                    get.kind_name()
                ));
            };
            ensure(chain_kind.is_none_or(|k| k == kind), || {
                "FLATTEN field accesses must all be of the same kind".to_string()
            })?;
            chain_kind = Some(kind);
            ensure(
                matches!(FieldAccessKind::operand(get), Some(Expr::FlattenedArg(_))),
                || "FLATTEN field access must read a FlattenedArg".to_string(),
            )?;
            self.state.flattened_arg_types.push(current.clone());
            let result = self.validate_expr(visible, params, get);
            self.state.flattened_arg_types.pop();
            result?;
            current = get.ty().element_type().cloned().unwrap_or_else(|| get.ty().clone());
        }
        ensure(
            flatten
                .ty
                .element_type()
                .is_some_and(|element| element.equals(&current)),
            || {
                format!(
                    "FLATTEN has type {}, expected an ARRAY of {}",
                    self.type_name(&flatten.ty),
                    self.type_name(&current)
                )
            },
        )
    }

    fn validate_replace_field(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        replace: &ReplaceField,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, &replace.expr)?;
        self.check_type_equals(&replace.ty, replace.expr.ty(), || "ReplaceField".to_string())?;
        ensure(replace.ty.is_struct() || replace.ty.is_proto(), || {
            format!(
                "ReplaceField operand must be a STRUCT or PROTO, but has type {}",
                self.type_name(&replace.ty)
            )
        })?;
        ensure(!replace.replace_field_item_list.is_empty(), || {
            "ReplaceField must replace at least one field".to_string()
        })?;
        for item in &replace.replace_field_item_list {
            ensure(
                !item.struct_index_path.is_empty() || !item.proto_field_path.is_empty(),
                || "ReplaceField item must have a field path".to_string(),
            )?;
            let mut current: TypeRef = replace.ty.clone();
            for index in &item.struct_index_path {
                let next = current.as_struct().and_then(|s| s.fields.get(*index));
                let Some(field) = next else {
                    return fail(format!(
                        "ReplaceField struct index {index} is invalid for {}",
                        self.type_name(&current)
                    ));
                };
                current = field.ty.clone();
            }
            for name in &item.proto_field_path {
                let next = current.as_proto().and_then(|p| p.find_field(name));
                let Some(field) = next else {
                    return fail(format!(
                        "ReplaceField proto field {name} is invalid for {}",
                        self.type_name(&current)
                    ));
                };
                current = match field.label {
                    FieldLabel::Repeated => types::array(field.ty.clone()),
                    FieldLabel::Optional | FieldLabel::Required => field.ty.clone(),
                };
            }
            self.validate_expr(visible, params, &item.expr)?;
            self.check_type_equals(item.expr.ty(), &current, || {
                "ReplaceField replacement value".to_string()
            })?;
        }
        Ok(())
    }

    fn validate_subquery_expr(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        subquery: &SubqueryExpr,
    ) -> ValidationResult<()> {
        self.validate_column_refs(visible, params, &subquery.parameter_list)?;
        let inner_params =
            ColumnSet::from_columns(subquery.parameter_list.iter().map(|p| &p.column));

        let takes_in_expr = matches!(
            subquery.subquery_type,
            SubqueryType::In | SubqueryType::LikeAny | SubqueryType::LikeAll
        );
        match &subquery.in_expr {
            Some(in_expr) => {
                ensure(takes_in_expr, || {
                    "in_expr is only allowed on IN and LIKE subqueries".to_string()
                })?;
                self.validate_expr(visible, params, in_expr)?;
            }
            None => ensure(!takes_in_expr, || {
                "IN and LIKE subqueries require an in_expr".to_string()
            })?,
        }
        if let Some(collation) = &subquery.in_collation {
            ensure(takes_in_expr, || {
                "in_collation is only allowed on IN and LIKE subqueries".to_string()
            })?;
            self.check_feature(LanguageFeature::CollationSupport, "Subquery collation")?;
            ensure(!collation.is_empty(), || "in_collation must not be empty".to_string())?;
        }

        let track = self.options.require_subquery_parameters_referenced;
        if track {
            self.state.referenced_columns.push(FxHashSet::default());
        }
        // Pipe operators inside the subquery belong to it, not to an
        // enclosing generalized query.
        let generalized_query_depth = std::mem::take(&mut self.state.generalized_query_depth);
        let result = self.validate_scan(&subquery.subquery, &inner_params);
        self.state.generalized_query_depth = generalized_query_depth;
        let referenced = if track {
            self.state.referenced_columns.pop()
        } else {
            None
        };
        result?;
        if let Some(referenced) = referenced {
            for parameter in &subquery.parameter_list {
                ensure(referenced.contains(&parameter.column.column_id), || {
                    format!(
                        "Subquery parameter {} is not referenced in the subquery",
                        parameter.column
                    )
                })?;
            }
        }

        let columns = subquery.subquery.column_list();
        if subquery.subquery_type != SubqueryType::Exists {
            ensure(columns.len() == 1, || {
                format!(
                    "Subquery must produce exactly one column, but produces {}",
                    columns.len()
                )
            })?;
        }
        match subquery.subquery_type {
            SubqueryType::Scalar => {
                self.check_type_equals(&subquery.ty, &columns[0].ty, || {
                    "Scalar subquery".to_string()
                })?;
            }
            SubqueryType::Array => {
                ensure(
                    subquery
                        .ty
                        .element_type()
                        .is_some_and(|element| element.equals(&columns[0].ty)),
                    || {
                        format!(
                            "Array subquery has type {}, expected an ARRAY of {}",
                            self.type_name(&subquery.ty),
                            self.type_name(&columns[0].ty)
                        )
                    },
                )?;
            }
            SubqueryType::Exists => {
                ensure(subquery.ty.is_bool(), || "EXISTS subquery must be BOOL".to_string())?;
            }
            SubqueryType::In => {
                ensure(subquery.ty.is_bool(), || "IN subquery must be BOOL".to_string())?;
                if let Some(in_expr) = &subquery.in_expr {
                    self.check_in_comparison(in_expr.ty(), &columns[0].ty)?;
                }
            }
            SubqueryType::LikeAny | SubqueryType::LikeAll => {
                ensure(subquery.ty.is_bool(), || "LIKE subquery must be BOOL".to_string())?;
                if let Some(in_expr) = &subquery.in_expr {
                    let lhs = in_expr.ty();
                    let rhs = &columns[0].ty;
                    ensure(
                        (lhs.is_string() && rhs.is_string()) || (lhs.is_bytes() && rhs.is_bytes()),
                        || {
                            format!(
                                "LIKE subquery compares {} with {}; both must be STRING or BYTES",
                                self.type_name(lhs),
                                self.type_name(rhs)
                            )
                        },
                    )?;
                }
            }
        }
        self.validate_option_list(&subquery.hint_list)
    }

    fn check_in_comparison(&self, lhs: &Type, rhs: &Type) -> ValidationResult<()> {
        ensure(
            lhs.supports_equality_with(&self.language) && rhs.supports_equality_with(&self.language),
            || {
                format!(
                    "IN subquery compares {} with {}, which do not support equality",
                    self.type_name(lhs),
                    self.type_name(rhs)
                )
            },
        )?;
        let integer_pair = (lhs.is_int64() && rhs.is_uint64()) || (lhs.is_uint64() && rhs.is_int64());
        ensure(lhs.equals(rhs) || integer_pair, || {
            format!(
                "IN subquery compares {} with {}",
                self.type_name(lhs),
                self.type_name(rhs)
            )
        })
    }

    fn validate_with_expr(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        with: &WithExpr,
    ) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::WithExpression, "WITH expression")?;
        let mut scope = visible.clone();
        for assignment in &with.assignment_list {
            self.with_context(assignment, |v| {
                v.validate_expr(&scope, params, &assignment.expr)?;
                v.check_unique_column_id(&assignment.column)?;
                v.check_type_equals(assignment.expr.ty(), &assignment.column.ty, || {
                    format!("WITH expression assignment {}", assignment.column)
                })
            })?;
            scope = scope.with_columns([&assignment.column]);
        }
        self.validate_expr(&scope, params, &with.expr)?;
        self.check_type_equals(&with.ty, with.expr.ty(), || "WITH expression".to_string())
    }
}

fn validate_parameter(parameter: &Parameter) -> ValidationResult<()> {
    let named = !parameter.name.is_empty();
    let positional = parameter.position > 0;
    ensure(named != positional, || {
        format!(
            "Parameter must be either named or positional, found name \"{}\" and position {}",
            parameter.name, parameter.position
        )
    })
}
