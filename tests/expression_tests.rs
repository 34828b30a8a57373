//! Expression forms: CAST modifiers, FLATTEN, WITH expressions and lambdas.

mod common;

use std::sync::Arc;

use common::*;
use resolved_ast_validator::ast::column::ResolvedColumn;
use resolved_ast_validator::ast::descriptors::{
    Function, FunctionMode, FunctionSignature, SignatureArgument, SignatureArgumentKind,
};
use resolved_ast_validator::ast::expression::{
    Cast, ComputedColumn, ErrorMode, Expr, Flatten, FlattenedArg, FunctionArgument, FunctionCall,
    FunctionCallBase, GetStructField, InlineLambda, WithExpr,
};
use resolved_ast_validator::ast::program::Statement;
use resolved_ast_validator::ast::query::Scan;
use resolved_ast_validator::ast::types::{Collation, TypeRef, types};
use resolved_ast_validator::semantic::LanguageFeature;

/// `SELECT <expr> FROM <input>`.
fn select_expr(fx: &mut Fixture, input: Scan, expr: Expr) -> Statement {
    let out = fx.column("$query", "out", expr.ty().clone());
    query_stmt(project(vec![ComputedColumn::new(out, expr)], input))
}

/// A table `t` with one column, returned alongside its scan.
fn one_column_table(fx: &mut Fixture, name: &str, ty: TypeRef) -> (Scan, ResolvedColumn) {
    let scan = fx.table_scan("t", &[(name, ty)]);
    let column = scan.column_list()[0].clone();
    (scan, column)
}

// ============================================================================
// CAST
// ============================================================================

fn cast_stmt(fx: &mut Fixture, build: impl FnOnce(&ResolvedColumn) -> Cast) -> Statement {
    let (input, value) = one_column_table(fx, "v", types::int64());
    let cast = build(&value);
    select_expr(fx, input, Expr::Cast(cast))
}

#[test]
fn cast_format_is_feature_gated_and_string_typed() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::FormatInCast]);

    let formatted = cast_stmt(&mut fx, |value| Cast {
        format: Some(Box::new(string_literal("999"))),
        ..Cast::new(column_ref(value), types::string())
    });
    assert_invalid_containing(
        &formatted,
        "CAST with FORMAT is not supported without FEATURE_FORMAT_IN_CAST",
    );
    assert_valid_with(&mut validator, &formatted);

    let int_format = cast_stmt(&mut fx, |value| Cast {
        format: Some(Box::new(int64_literal(999))),
        ..Cast::new(column_ref(value), types::string())
    });
    assert_invalid_containing_with(
        &mut validator,
        &int_format,
        "CAST format must be STRING, but has type INT64",
    );

    let zone_only = cast_stmt(&mut fx, |value| Cast {
        time_zone: Some(Box::new(string_literal("UTC"))),
        ..Cast::new(column_ref(value), types::string())
    });
    assert_invalid_containing_with(&mut validator, &zone_only, "CAST time zone requires a format");
}

#[test]
fn cast_collation_applies_to_string_targets() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::CollationSupport]);

    let to_string = cast_stmt(&mut fx, |value| Cast {
        collation: Some(Collation::named("und:ci")),
        ..Cast::new(column_ref(value), types::string())
    });
    assert_invalid_containing(
        &to_string,
        "CAST with collation is not supported without FEATURE_COLLATION_SUPPORT",
    );
    assert_valid_with(&mut validator, &to_string);

    let to_int = cast_stmt(&mut fx, |value| Cast {
        collation: Some(Collation::named("und:ci")),
        ..Cast::new(column_ref(value), types::int64())
    });
    assert_invalid_containing_with(
        &mut validator,
        &to_int,
        "CAST collation und:ci does not match target type INT64",
    );
}

// ============================================================================
// FLATTEN
// ============================================================================

fn point_type() -> TypeRef {
    types::struct_of(vec![("x", types::int64())])
}

/// `.x` read from `operand`.
fn get_x(operand: Expr) -> Expr {
    Expr::GetStructField(GetStructField {
        ty: types::int64(),
        expr: Box::new(operand),
        field_idx: 0,
        field_expr_is_positional: false,
    })
}

fn flattened_point() -> Expr {
    Expr::FlattenedArg(FlattenedArg { ty: point_type() })
}

/// `FLATTEN(points.x)` over `t(points ARRAY<STRUCT<x INT64>>)`.
fn flatten_stmt(
    fx: &mut Fixture,
    ty: TypeRef,
    field: impl FnOnce(&ResolvedColumn) -> Expr,
) -> Statement {
    let (input, points) = one_column_table(fx, "points", types::array(point_type()));
    let flatten = Expr::Flatten(Flatten {
        ty,
        expr: Box::new(column_ref(&points)),
        get_field_list: vec![field(&points)],
    });
    select_expr(fx, input, flatten)
}

#[test]
fn flatten_reads_fields_of_each_element() {
    let mut fx = Fixture::new();
    let ints = flatten_stmt(&mut fx, types::array(types::int64()), |_| get_x(flattened_point()));
    assert_valid(&ints);

    let strings = flatten_stmt(&mut fx, types::array(types::string()), |_| get_x(flattened_point()));
    assert_invalid_containing(
        &strings,
        "FLATTEN has type ARRAY<STRING>, expected an ARRAY of INT64",
    );
}

#[test]
fn flatten_field_access_must_read_the_flattened_argument() {
    let mut fx = Fixture::new();
    let bypass = flatten_stmt(&mut fx, types::array(types::int64()), |points| {
        get_x(column_ref(points))
    });
    assert_invalid_containing(&bypass, "FLATTEN field access must read a FlattenedArg");

    let (input, _) = one_column_table(&mut fx, "points", types::array(point_type()));
    let stray = select_expr(&mut fx, input, get_x(flattened_point()));
    assert_invalid_containing(&stray, "FlattenedArg found outside of FLATTEN");
}

// ============================================================================
// WITH expressions
// ============================================================================

/// `WITH(<name> AS <expr>, ..., <body>)` over `t(v)`.
fn with_expr_stmt(
    fx: &mut Fixture,
    ty: TypeRef,
    build: impl FnOnce(&mut Fixture, &ResolvedColumn) -> (Vec<ComputedColumn>, Expr),
) -> Statement {
    let (input, value) = one_column_table(fx, "v", types::int64());
    let (assignment_list, body) = build(fx, &value);
    let with = Expr::WithExpr(WithExpr {
        ty,
        assignment_list,
        expr: Box::new(body),
    });
    select_expr(fx, input, with)
}

#[test]
fn with_expression_assignments_scope_into_the_body() {
    let mut fx = Fixture::new();
    let stmt = with_expr_stmt(&mut fx, types::int64(), |fx, value| {
        let x = fx.int64_column("$with_expr", "x");
        let y = fx.int64_column("$with_expr", "y");
        (
            vec![
                ComputedColumn::new(x.clone(), column_ref(value)),
                ComputedColumn::new(y.clone(), column_ref(&x)),
            ],
            column_ref(&y),
        )
    });
    assert_invalid_containing(
        &stmt,
        "WITH expression is not supported without FEATURE_WITH_EXPRESSION",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::WithExpression]), &stmt);
}

#[test]
fn with_expression_assignments_see_only_earlier_ones() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::WithExpression]);

    let mut later = None;
    let forward = with_expr_stmt(&mut fx, types::int64(), |fx, _| {
        let x = fx.int64_column("$with_expr", "x");
        let y = fx.int64_column("$with_expr", "y");
        later = Some(y.clone());
        (
            vec![
                ComputedColumn::new(x.clone(), column_ref(&y)),
                ComputedColumn::new(y, int64_literal(1)),
            ],
            column_ref(&x),
        )
    });
    let later = later.expect("assignment column was built");
    assert_invalid_containing_with(
        &mut validator,
        &forward,
        &format!("Incorrect reference to column {later}"),
    );

    let mis_typed = with_expr_stmt(&mut fx, types::string(), |fx, value| {
        let x = fx.int64_column("$with_expr", "x");
        (vec![ComputedColumn::new(x.clone(), column_ref(value))], column_ref(&x))
    });
    assert_invalid_containing_with(
        &mut validator,
        &mis_typed,
        "WITH expression has type STRING, expected INT64",
    );
}

// ============================================================================
// Lambdas
// ============================================================================

/// `ARRAY_TRANSFORM(arr, <lambda>)` with a one-argument INT64 lambda.
fn array_transform(array: &ResolvedColumn, lambda: InlineLambda) -> Expr {
    let int_array = types::array(types::int64());
    let signature = FunctionSignature::new(
        vec![
            SignatureArgument::fixed(int_array.clone()),
            SignatureArgument::of_kind(SignatureArgumentKind::Lambda {
                argument_types: vec![types::int64()],
                body_type: types::int64(),
            }),
        ],
        SignatureArgument::fixed(int_array.clone()),
    );
    Expr::FunctionCall(FunctionCall {
        base: FunctionCallBase {
            ty: int_array,
            function: Some(Arc::new(Function::new("array_transform", FunctionMode::Scalar))),
            signature,
            argument_list: Vec::new(),
            generic_argument_list: vec![
                FunctionArgument::Expr(column_ref(array)),
                FunctionArgument::InlineLambda(lambda),
            ],
            error_mode: ErrorMode::Default,
            hint_list: Vec::new(),
            collation_list: Vec::new(),
        },
    })
}

fn lambda_stmt(
    fx: &mut Fixture,
    build: impl FnOnce(&mut Fixture, &ResolvedColumn) -> InlineLambda,
) -> Statement {
    let (input, array) = one_column_table(fx, "arr", types::array(types::int64()));
    let lambda = build(fx, &array);
    let call = array_transform(&array, lambda);
    select_expr(fx, input, call)
}

#[test]
fn lambda_body_sees_its_arguments() {
    let mut fx = Fixture::new();
    let stmt = lambda_stmt(&mut fx, |fx, _| {
        let e = fx.int64_column("$lambda", "e");
        InlineLambda {
            argument_list: vec![e.clone()],
            parameter_list: Vec::new(),
            body: Box::new(column_ref(&e)),
        }
    });
    assert_invalid_containing(
        &stmt,
        "Lambda argument is not supported without FEATURE_INLINE_LAMBDA",
    );
    assert_valid_with(&mut validator_with(&[LanguageFeature::InlineLambda]), &stmt);
}

#[test]
fn lambda_arity_and_outer_references_are_checked() {
    let mut fx = Fixture::new();
    let mut validator = validator_with(&[LanguageFeature::InlineLambda]);

    let binary = lambda_stmt(&mut fx, |fx, _| {
        let e = fx.int64_column("$lambda", "e");
        let i = fx.int64_column("$lambda", "i");
        InlineLambda {
            argument_list: vec![e.clone(), i],
            parameter_list: Vec::new(),
            body: Box::new(column_ref(&e)),
        }
    });
    assert_invalid_containing_with(
        &mut validator,
        &binary,
        "Lambda takes 2 arguments, but its signature expects 1",
    );

    let mut outer = None;
    let escaping = lambda_stmt(&mut fx, |fx, array| {
        outer = Some(array.clone());
        let e = fx.int64_column("$lambda", "e");
        let size = scalar_call("array_length", vec![column_ref(array)], types::int64());
        InlineLambda {
            argument_list: vec![e],
            parameter_list: Vec::new(),
            body: Box::new(size),
        }
    });
    let outer = outer.expect("lambda builder ran");
    assert_invalid_containing_with(
        &mut validator,
        &escaping,
        &format!("Incorrect reference to column {outer}"),
    );
}
