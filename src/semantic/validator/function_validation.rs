//! Function call validation.
//!
//! Scalar calls are validated wherever an expression may appear.
//! Aggregate calls are only reachable from aggregate lists, and analytic
//! calls only from an analytic function group, so those entry points take
//! the extra context they need from their caller.

use crate::ast::descriptors::{Function, SignatureArgument, SignatureArgumentKind};
use crate::ast::expression::{
    AggregateFunctionCall, AnalyticFunctionCall, BoundaryType, ComputedColumnBase, ErrorMode,
    Expr, FrameUnit, FunctionArgument, FunctionCall, FunctionCallBase, InlineLambda,
    NullHandlingModifier, OrderByItem, WindowFrame, WindowFrameExpr,
};
use crate::ast::types::TypeRef;
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

/// Internal function that attaches deferred errors to a value.
const WITH_SIDE_EFFECTS: &str = "$with_side_effects";

impl Validator {
    pub(super) fn validate_function_call(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        call: &FunctionCall,
    ) -> ValidationResult<()> {
        let function = self.validate_function_call_base(visible, params, &call.base)?;
        ensure(function.is_scalar(), || {
            format!("Function {} is not a scalar function", function.name)
        })?;
        if function.name == WITH_SIDE_EFFECTS {
            self.consume_side_effect(&call.base)?;
        }
        Ok(())
    }

    /// `$with_side_effects(value, side_effect_column)` consumes a column
    /// registered by a deferred computed column.
    fn consume_side_effect(&mut self, base: &FunctionCallBase) -> ValidationResult<()> {
        let [value, side_effect] = base.argument_list.as_slice() else {
            return fail(format!(
                "{WITH_SIDE_EFFECTS} takes 2 arguments, found {}",
                base.argument_list.len()
            ));
        };
        self.check_type_equals(value.ty(), &base.ty, || format!("{WITH_SIDE_EFFECTS} value"))?;
        let Some(column_ref) = side_effect.as_column_ref() else {
            return fail(format!(
                "{WITH_SIDE_EFFECTS} side effect must be a ColumnRef, found {}",
                side_effect.kind_name()
            ));
        };
        let column = &column_ref.column;
        ensure(
            self.state
                .unconsumed_side_effects
                .remove(&column.column_id)
                .is_some(),
            || format!("Side effect column {column} is not pending consumption"),
        )
    }

    /// Checks the parts shared by every call kind and returns the function.
    fn validate_function_call_base<'a>(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        base: &'a FunctionCallBase,
    ) -> ValidationResult<&'a Function> {
        let Some(function) = base.function.as_deref() else {
            return fail("Function call has no function");
        };
        let name = &function.name;
        ensure(
            base.argument_list.is_empty() || base.generic_argument_list.is_empty(),
            || format!("Function {name} cannot have both argument_list and generic_argument_list"),
        )?;
        ensure(base.signature.is_concrete(), || {
            format!("Signature of function {name} is not concrete")
        })?;

        let expected = base.signature.concrete_arguments();
        let actual = base.argument_list.len().max(base.generic_argument_list.len());
        ensure(expected.len() == actual, || {
            format!(
                "Function {name} has {actual} arguments, but its signature expects {}",
                expected.len()
            )
        })?;

        if base.generic_argument_list.is_empty() {
            for (index, (arg, signature_arg)) in base.argument_list.iter().zip(&expected).enumerate() {
                self.validate_expr(visible, params, arg)?;
                let Some(ty) = signature_arg.fixed_type() else {
                    return fail(format!(
                        "Argument {index} of {name} is a scalar, but the signature expects {}",
                        signature_arg.kind.kind_name()
                    ));
                };
                self.check_type_equals(arg.ty(), ty, || format!("Argument {index} of {name}"))?;
            }
        } else {
            for (index, (arg, signature_arg)) in
                base.generic_argument_list.iter().zip(&expected).enumerate()
            {
                self.with_context(arg, |v| {
                    v.validate_function_argument(visible, params, arg, signature_arg, index, name)
                })?;
            }
        }

        let Some(result_type) = base.signature.result_type() else {
            return fail(format!("Signature of function {name} has no scalar result type"));
        };
        self.check_type_equals(&base.ty, result_type, || format!("Call to {name}"))?;

        if base.error_mode == ErrorMode::Safe {
            ensure(function.supports_safe_error_mode(), || {
                format!("Function {name} does not support SAFE error mode")
            })?;
        }
        if !base.collation_list.is_empty() {
            self.check_feature(LanguageFeature::CollationSupport, "Function call collation")?;
            ensure(!base.collation_list.iter().all(|c| c.is_empty()), || {
                format!("Collation list of {name} contains only empty collations")
            })?;
        }
        self.validate_option_list(&base.hint_list)?;
        Ok(function)
    }

    /// Validates one generic argument against the signature argument it
    /// was matched to.
    pub(super) fn validate_function_argument(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        arg: &FunctionArgument,
        signature_arg: &SignatureArgument,
        index: usize,
        callee: &str,
    ) -> ValidationResult<()> {
        match (arg, &signature_arg.kind) {
            (FunctionArgument::Expr(expr), SignatureArgumentKind::Fixed(ty)) => {
                self.validate_expr(visible, params, expr)?;
                self.check_type_equals(expr.ty(), ty, || format!("Argument {index} of {callee}"))
            }
            (
                FunctionArgument::Scan {
                    scan,
                    argument_column_list,
                },
                SignatureArgumentKind::Relation(_),
            ) => {
                self.validate_scan(scan, params)?;
                let produced = ColumnSet::from_columns(scan.column_list());
                self.check_columns_available(
                    argument_column_list,
                    &produced,
                    &format!("Relation argument {index} of {callee}"),
                )
            }
            (FunctionArgument::Model(_), SignatureArgumentKind::Model)
            | (FunctionArgument::Connection(_), SignatureArgumentKind::Connection)
            | (FunctionArgument::Sequence(_), SignatureArgumentKind::Sequence)
            | (FunctionArgument::Graph(_), SignatureArgumentKind::Graph) => Ok(()),
            (FunctionArgument::Descriptor(descriptor), SignatureArgumentKind::Descriptor) => {
                ensure(!descriptor.descriptor_column_name_list.is_empty(), || {
                    format!("Descriptor argument {index} of {callee} names no columns")
                })?;
                ensure(
                    descriptor.descriptor_column_list.is_empty()
                        || descriptor.descriptor_column_list.len()
                            == descriptor.descriptor_column_name_list.len(),
                    || format!("Descriptor argument {index} of {callee} is partially resolved"),
                )
            }
            (
                FunctionArgument::InlineLambda(lambda),
                SignatureArgumentKind::Lambda {
                    argument_types,
                    body_type,
                },
            ) => self.validate_inline_lambda(visible, params, lambda, argument_types, body_type),
            (arg, expected) => fail(format!(
                "Argument {index} of {callee} is {}, but the signature expects {}",
                arg.kind_name(),
                expected.kind_name()
            )),
        }
    }

    /// Lambda arguments are fresh columns visible to the body; the body
    /// reaches outer columns only through the lambda's parameter list.
    fn validate_inline_lambda(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        lambda: &InlineLambda,
        argument_types: &[TypeRef],
        body_type: &TypeRef,
    ) -> ValidationResult<()> {
        self.check_feature(LanguageFeature::InlineLambda, "Lambda argument")?;
        self.validate_column_refs(visible, params, &lambda.parameter_list)?;
        ensure(lambda.argument_list.len() == argument_types.len(), || {
            format!(
                "Lambda takes {} arguments, but its signature expects {}",
                lambda.argument_list.len(),
                argument_types.len()
            )
        })?;
        for (column, ty) in lambda.argument_list.iter().zip(argument_types) {
            self.check_unique_column_id(column)?;
            self.check_type_equals(&column.ty, ty, || format!("Lambda argument {column}"))?;
        }
        let body_visible = ColumnSet::from_columns(&lambda.argument_list);
        let body_params = ColumnSet::from_columns(lambda.parameter_list.iter().map(|p| &p.column));
        self.validate_expr(&body_visible, &body_params, &lambda.body)?;
        self.check_type_equals(lambda.body.ty(), body_type, || "Lambda body".to_string())
    }

    // ========================================================================
    // Aggregate calls
    // ========================================================================

    /// Validates one entry of an aggregate list and registers its output
    /// column (and side-effect column) as new.
    pub(super) fn validate_aggregate_computed_column(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        computed: &ComputedColumnBase,
    ) -> ValidationResult<()> {
        self.with_context(computed, |v| {
            v.validate_aggregate_expr(input, params, computed.expr())?;
            v.check_type_equals(computed.expr().ty(), &computed.column().ty, || {
                format!("Aggregate column {}", computed.column())
            })?;
            v.check_unique_column_id(computed.column())?;
            if let ComputedColumnBase::Deferred(deferred) = computed {
                v.check_unique_column_id(&deferred.side_effect_column)?;
                v.state.unconsumed_side_effects.insert(
                    deferred.side_effect_column.column_id,
                    deferred.side_effect_column.clone(),
                );
            }
            Ok(())
        })
    }

    /// Validates an expression that must be an aggregate function call
    /// whose arguments see `input`.
    pub(super) fn validate_aggregate_expr(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
    ) -> ValidationResult<()> {
        let Expr::AggregateFunctionCall(call) = expr else {
            return fail(format!(
                "Aggregate list entry must be an aggregate function call, found {}",
                expr.kind_name()
            ));
        };
        self.with_depth(|v| {
            v.with_context(expr, |v| v.validate_aggregate_function_call(input, params, call))
        })
    }

    fn validate_aggregate_function_call(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        call: &AggregateFunctionCall,
    ) -> ValidationResult<()> {
        // Multi-level aggregates evaluate their arguments over the inner
        // grouping, which hides the input columns.
        let scope = if call.is_multi_level() {
            self.check_feature(LanguageFeature::MultilevelAggregation, "GROUP BY inside an aggregate")?;
            let mut inner = ColumnSet::new();
            for group_by in &call.group_by_list {
                self.with_context(group_by, |v| {
                    v.validate_expr(input, params, &group_by.expr)?;
                    v.check_type_equals(group_by.expr.ty(), &group_by.column.ty, || {
                        format!("Grouping column {}", group_by.column)
                    })?;
                    v.check_unique_column_id(&group_by.column)
                })?;
                inner = inner.with_columns([&group_by.column]);
            }
            for aggregate in &call.group_by_aggregate_list {
                self.validate_aggregate_computed_column(input, params, aggregate)?;
                inner = inner.with_columns([aggregate.column()]);
            }
            inner
        } else {
            input.clone()
        };

        let function = self.validate_function_call_base(&scope, params, &call.base)?;
        let name = &function.name;
        ensure(function.is_aggregate(), || {
            format!("Function {name} is not an aggregate function")
        })?;

        if call.distinct {
            ensure(function.options.supports_distinct_modifier, || {
                format!("Function {name} does not support DISTINCT")
            })?;
            for arg in &call.base.argument_list {
                ensure(arg.ty().supports_grouping(&self.language), || {
                    format!(
                        "DISTINCT argument of {name} has type {}, which does not support grouping",
                        self.type_name(arg.ty())
                    )
                })?;
            }
        }
        if call.null_handling_modifier != NullHandlingModifier::Default {
            ensure(function.options.supports_null_handling_modifier, || {
                format!("Function {name} does not support IGNORE NULLS or RESPECT NULLS")
            })?;
        }
        if let Some(having) = &call.having_modifier {
            ensure(function.options.supports_having_modifier, || {
                format!("Function {name} does not support HAVING MAX or HAVING MIN")
            })?;
            self.validate_expr(&scope, params, &having.having_expr)?;
            ensure(having.having_expr.ty().supports_ordering(&self.language), || {
                format!(
                    "HAVING modifier of {name} has type {}, which does not support ordering",
                    self.type_name(having.having_expr.ty())
                )
            })?;
        }
        if !call.order_by_item_list.is_empty() {
            ensure(function.options.supports_order_by, || {
                format!("Function {name} does not support ORDER BY")
            })?;
            self.validate_order_by_items(&scope, params, &call.order_by_item_list)?;
        }
        if let Some(limit) = &call.limit {
            ensure(function.options.supports_limit, || {
                format!("Function {name} does not support LIMIT")
            })?;
            self.validate_int64_constant(&scope, params, limit, "Aggregate LIMIT")?;
        }
        if let Some(subquery) = &call.with_group_rows_subquery {
            self.check_feature(LanguageFeature::WithGroupRows, "WITH GROUP ROWS")?;
            self.validate_column_refs(input, params, &call.with_group_rows_parameter_list)?;
            let group_params = ColumnSet::from_columns(
                call.with_group_rows_parameter_list.iter().map(|p| &p.column),
            );
            self.state.group_rows_inputs.push(input.clone());
            let result = self.validate_scan(subquery, &group_params);
            self.state.group_rows_inputs.pop();
            result?;
        } else {
            ensure(call.with_group_rows_parameter_list.is_empty(), || {
                "WITH GROUP ROWS parameters require a WITH GROUP ROWS subquery".to_string()
            })?;
        }
        Ok(())
    }

    /// A `GroupRowsScan` reads the input of the innermost aggregate whose
    /// WITH GROUP ROWS subquery is being validated.
    pub(super) fn validate_group_rows_scan(&self) -> ValidationResult<ColumnSet> {
        match self.state.group_rows_inputs.last() {
            Some(input) => Ok(input.clone()),
            None => fail("GroupRowsScan appears outside of a WITH GROUP ROWS subquery"),
        }
    }

    /// ORDER BY items reference visible columns whose types are orderable.
    pub(super) fn validate_order_by_items(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        items: &[OrderByItem],
    ) -> ValidationResult<()> {
        for item in items {
            self.with_context(item, |v| {
                v.validate_column_ref(visible, params, &item.column_ref)?;
                let ty = &item.column_ref.ty;
                ensure(ty.supports_ordering(&v.language), || {
                    format!(
                        "ORDER BY column {} has type {}, which does not support ordering",
                        item.column_ref.column,
                        v.type_name(ty)
                    )
                })?;
                if let Some(collation_name) = &item.collation_name {
                    let empty = ColumnSet::new();
                    v.validate_expr(&empty, &empty, collation_name)?;
                    ensure(collation_name.ty().is_string(), || {
                        "ORDER BY collation name must be STRING".to_string()
                    })?;
                }
                if let Some(collation) = &item.collation {
                    v.check_feature(LanguageFeature::CollationSupport, "ORDER BY collation")?;
                    ensure(collation.is_compatible_with(ty), || {
                        format!("ORDER BY collation {collation} does not match {}", v.type_name(ty))
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    // ========================================================================
    // Analytic calls
    // ========================================================================

    /// Validates an expression that must be an analytic function call.
    /// `has_order_by` tells whether the enclosing group orders its window.
    pub(super) fn validate_analytic_expr(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
        has_order_by: bool,
    ) -> ValidationResult<()> {
        let Expr::AnalyticFunctionCall(call) = expr else {
            return fail(format!(
                "Analytic function list entry must be an analytic function call, found {}",
                expr.kind_name()
            ));
        };
        self.with_depth(|v| {
            v.with_context(expr, |v| {
                v.validate_analytic_function_call(input, params, call, has_order_by)
            })
        })
    }

    fn validate_analytic_function_call(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        call: &AnalyticFunctionCall,
        has_order_by: bool,
    ) -> ValidationResult<()> {
        let function = self.validate_function_call_base(input, params, &call.base)?;
        let name = &function.name;
        ensure(function.supports_over_clause(), || {
            format!("Function {name} does not support an OVER clause")
        })?;
        if function.requires_window_ordering() {
            ensure(has_order_by, || format!("Function {name} requires window ORDER BY"))?;
        }
        if !function.supports_window_ordering() {
            ensure(!has_order_by, || format!("Function {name} does not support window ORDER BY"))?;
        }
        if call.null_handling_modifier != NullHandlingModifier::Default {
            ensure(function.options.supports_null_handling_modifier, || {
                format!("Function {name} does not support IGNORE NULLS or RESPECT NULLS")
            })?;
        }
        if let Some(frame) = &call.window_frame {
            ensure(function.supports_window_framing(), || {
                format!("Function {name} does not support a window frame")
            })?;
            self.with_context(frame, |v| v.validate_window_frame(input, params, frame, has_order_by))?;
        }
        if call.distinct {
            ensure(function.options.supports_distinct_modifier, || {
                format!("Function {name} does not support DISTINCT")
            })?;
            ensure(
                call.window_frame
                    .as_ref()
                    .is_none_or(WindowFrame::is_unbounded_both_ways),
                || format!("DISTINCT {name} requires an unbounded window frame"),
            )?;
        }
        Ok(())
    }

    fn validate_window_frame(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        frame: &WindowFrame,
        has_order_by: bool,
    ) -> ValidationResult<()> {
        let start = frame.start_expr.boundary_type;
        let end = frame.end_expr.boundary_type;
        ensure(start != BoundaryType::UnboundedFollowing, || {
            "Window frame cannot start at UNBOUNDED FOLLOWING".to_string()
        })?;
        ensure(end != BoundaryType::UnboundedPreceding, || {
            "Window frame cannot end at UNBOUNDED PRECEDING".to_string()
        })?;
        ensure(start <= end, || {
            format!("Window frame starts at {start:?} but ends at {end:?}")
        })?;
        if frame.frame_unit == FrameUnit::Range {
            ensure(has_order_by, || "RANGE window frame requires window ORDER BY".to_string())?;
        }
        for boundary in [&frame.start_expr, &frame.end_expr] {
            self.with_context(boundary, |v| {
                v.validate_window_frame_boundary(input, params, boundary, frame.frame_unit)
            })?;
        }
        Ok(())
    }

    fn validate_window_frame_boundary(
        &mut self,
        input: &ColumnSet,
        params: &ColumnSet,
        boundary: &WindowFrameExpr,
        unit: FrameUnit,
    ) -> ValidationResult<()> {
        let takes_offset = matches!(
            boundary.boundary_type,
            BoundaryType::OffsetPreceding | BoundaryType::OffsetFollowing
        );
        match &boundary.expression {
            Some(offset) => {
                ensure(takes_offset, || {
                    format!("{:?} boundary cannot have an offset", boundary.boundary_type)
                })?;
                self.validate_expr(input, params, offset)?;
                match unit {
                    FrameUnit::Rows => ensure(offset.ty().is_int64(), || {
                        format!(
                            "ROWS frame offset must be INT64, but has type {}",
                            self.type_name(offset.ty())
                        )
                    }),
                    FrameUnit::Range => ensure(
                        offset.ty().is_integer() || offset.ty().is_floating_point(),
                        || {
                            format!(
                                "RANGE frame offset must be numeric, but has type {}",
                                self.type_name(offset.ty())
                            )
                        },
                    ),
                }
            }
            None => ensure(!takes_offset, || {
                format!("{:?} boundary requires an offset", boundary.boundary_type)
            }),
        }
    }
}
