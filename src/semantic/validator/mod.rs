//! Resolved tree validator.
//!
//! A [`Validator`] walks a fully resolved statement or expression and
//! certifies that it honors every structural, scoping and typing contract
//! an execution engine relies on. Validation is fail-fast: the first
//! violated contract ends the pass with a single [`ValidationError`].
//!
//! # Scoping
//!
//! Every recursive step receives two [`ColumnSet`]s by shared reference:
//! the columns an expression may reference directly, and the columns it may
//! reference only through a correlated `ColumnRef`. Sets are persistent, so
//! extending one for a child never changes what the caller sees.
//!
//! # Pass state
//!
//! Column-id uniqueness, recursive terms, subpipelines, MATCH_RECOGNIZE,
//! graph working tables and pending side-effect columns are tracked in a
//! per-pass state that is reset on entry and checked for emptiness on exit.

mod aggregate_validation;
mod ddl_validation;
mod dml_validation;
mod expression_validation;
mod function_validation;
mod graph_validation;
mod match_recognize_validation;
mod pipe_validation;
mod pivot_validation;
mod scan_validation;
mod scope;
mod set_operation_validation;
mod state;
mod statement_validation;
mod tvf_validation;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::ast::column::ResolvedColumn;
use crate::ast::debug_string::{ToDebugNode, node_address};
use crate::ast::expression::Expr;
use crate::ast::program::{OptionEntry, Statement};
use crate::ast::types::Type;
use crate::semantic::diag::{ValidationError, ValidationResult};
use crate::semantic::language::{LanguageFeature, LanguageOptions};

pub(crate) use scope::ColumnSet;
use state::PassState;

/// Message of the error returned when the tree is nested too deeply.
pub const STACK_EXHAUSTED_MESSAGE: &str =
    "Out of stack space due to deeply nested query expression during query validation";

const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

const DEFAULT_ANONYMIZATION_OPTIONS: &[&str] = &[
    "delta",
    "epsilon",
    "k_threshold",
    "kappa",
    "max_groups_contributed",
    "max_rows_contributed",
];

const DEFAULT_DIFFERENTIAL_PRIVACY_OPTIONS: &[&str] = &[
    "delta",
    "epsilon",
    "max_groups_contributed",
    "max_rows_contributed",
    "privacy_unit_column",
    "min_privacy_units_per_group",
    "group_selection_strategy",
];

const DEFAULT_AGGREGATION_THRESHOLD_OPTIONS: &[&str] = &[
    "threshold",
    "max_groups_contributed",
    "max_rows_contributed",
    "privacy_unit_column",
];

fn names(list: &[&str]) -> Vec<SmolStr> {
    list.iter().map(|name| SmolStr::new(name)).collect()
}

/// Behavior switches of a [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Option names accepted on anonymized aggregate scans (case-insensitive).
    pub allowed_anonymization_options: Vec<SmolStr>,

    /// Option names accepted on differential privacy aggregate scans.
    pub allowed_differential_privacy_options: Vec<SmolStr>,

    /// Option names accepted on aggregation threshold aggregate scans.
    pub allowed_aggregation_threshold_options: Vec<SmolStr>,

    /// Reject subqueries whose parameter list names a column the subquery
    /// never references.
    pub require_subquery_parameters_referenced: bool,

    /// Maximum nesting of statements, scans and expressions before the
    /// pass fails with resource exhaustion.
    pub max_recursion_depth: usize,

    /// Accept table and TVF scans whose `column_index_list` is empty.
    pub allow_legacy_empty_column_index_list: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            allowed_anonymization_options: names(DEFAULT_ANONYMIZATION_OPTIONS),
            allowed_differential_privacy_options: names(DEFAULT_DIFFERENTIAL_PRIVACY_OPTIONS),
            allowed_aggregation_threshold_options: names(DEFAULT_AGGREGATION_THRESHOLD_OPTIONS),
            require_subquery_parameters_referenced: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            allow_legacy_empty_column_index_list: true,
        }
    }
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_anonymization_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.allowed_anonymization_options = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_differential_privacy_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.allowed_differential_privacy_options = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_aggregation_threshold_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.allowed_aggregation_threshold_options = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_subquery_parameters_referenced(mut self, required: bool) -> Self {
        self.require_subquery_parameters_referenced = required;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_allow_legacy_empty_column_index_list(mut self, allowed: bool) -> Self {
        self.allow_legacy_empty_column_index_list = allowed;
        self
    }
}

/// Certifies resolved statements and expressions.
///
/// One instance may validate any number of trees in sequence; each call
/// starts from a fresh pass state.
#[derive(Debug, Default)]
pub struct Validator {
    pub(super) language: LanguageOptions,
    pub(super) options: ValidatorOptions,
    pub(super) state: PassState,
}

impl Validator {
    /// Creates a validator for the given dialect and options.
    pub fn new(language: LanguageOptions, options: ValidatorOptions) -> Self {
        Self {
            language,
            options,
            state: PassState::default(),
        }
    }

    /// Creates a validator with default options for the given dialect.
    pub fn with_language(language: LanguageOptions) -> Self {
        Self::new(language, ValidatorOptions::default())
    }

    /// Replaces the validator options.
    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn language_options(&self) -> &LanguageOptions {
        &self.language
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validates a top-level statement.
    ///
    /// Internal errors carry the debug rendering of `statement` with the
    /// failing node marked. Resource exhaustion is returned unwrapped.
    pub fn validate_statement(&mut self, statement: &Statement) -> ValidationResult<()> {
        debug!(
            kind = statement.kind_name(),
            features = self.language.enabled_feature_count(),
            "validating resolved statement"
        );
        self.state.reset();
        let result = self
            .validate_statement_internal(statement)
            .and_then(|()| self.validate_final_state());
        self.finish(result, statement)
    }

    /// Validates an expression that has no columns or parameters in scope.
    pub fn validate_standalone_expr(&mut self, expr: &Expr) -> ValidationResult<()> {
        debug!(
            kind = expr.kind_name(),
            features = self.language.enabled_feature_count(),
            "validating standalone resolved expression"
        );
        self.state.reset();
        let empty = ColumnSet::new();
        let result = self
            .validate_expr(&empty, &empty, expr)
            .and_then(|()| self.validate_final_state());
        self.finish(result, expr)
    }

    fn finish<N: ToDebugNode>(
        &mut self,
        result: ValidationResult<()>,
        root: &N,
    ) -> ValidationResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                let error = error.wrap_with_tree(root);
                debug!(
                    kind = error.kind().name(),
                    error = %error.detail(),
                    "resolved AST validation failed"
                );
                self.state.reset();
                Err(error)
            }
        }
    }

    fn validate_final_state(&self) -> ValidationResult<()> {
        match self.state.leftover() {
            Some(message) => Err(ValidationError::internal(message)),
            None => Ok(()),
        }
    }

    /// Marks the start of one statement of a multi-statement batch.
    pub(super) fn trace_batch_statement(&self, index: usize, statement: &Statement) {
        trace!(
            index,
            kind = statement.kind_name(),
            "validating batch statement"
        );
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Runs `f` with `node` as the innermost context; an internal error that
    /// no inner node claimed is attributed to `node`.
    pub(super) fn with_context<N, T, F>(&mut self, node: &N, f: F) -> ValidationResult<T>
    where
        N: ToDebugNode,
        F: FnOnce(&mut Self) -> ValidationResult<T>,
    {
        self.state.context_stack.push(node_address(node));
        let result = f(self);
        self.state.context_stack.pop();
        result.map_err(|mut error| {
            error.attach_location(node);
            error
        })
    }

    /// Runs `f` one nesting level deeper, failing with resource exhaustion
    /// beyond `max_recursion_depth`.
    pub(super) fn with_depth<T, F>(&mut self, f: F) -> ValidationResult<T>
    where
        F: FnOnce(&mut Self) -> ValidationResult<T>,
    {
        if self.state.depth >= self.options.max_recursion_depth {
            return Err(ValidationError::resource_exhausted(STACK_EXHAUSTED_MESSAGE));
        }
        self.state.depth += 1;
        let result = f(self);
        self.state.depth -= 1;
        result
    }

    pub(super) fn type_name(&self, ty: &Type) -> String {
        ty.type_name(self.language.product_mode())
    }

    pub(super) fn feature_enabled(&self, feature: LanguageFeature) -> bool {
        self.language.feature_enabled(feature)
    }

    pub(super) fn check_feature(&self, feature: LanguageFeature, what: &str) -> ValidationResult<()> {
        ensure(self.feature_enabled(feature), || {
            format!("{what} is not supported without {feature}")
        })
    }

    /// Registers a newly defined column; fails if its id was seen before.
    pub(super) fn check_unique_column_id(&mut self, column: &ResolvedColumn) -> ValidationResult<()> {
        ensure(self.state.column_ids_seen.insert(column.column_id), || {
            format!("Duplicate column id {} in column {column}", column.column_id)
        })
    }

    pub(super) fn check_unique_column_ids<'a, I>(&mut self, columns: I) -> ValidationResult<()>
    where
        I: IntoIterator<Item = &'a ResolvedColumn>,
    {
        for column in columns {
            self.check_unique_column_id(column)?;
        }
        Ok(())
    }

    pub(super) fn check_type_equals(
        &self,
        actual: &Type,
        expected: &Type,
        what: impl FnOnce() -> String,
    ) -> ValidationResult<()> {
        ensure(actual.equals(expected), || {
            format!(
                "{} has type {}, expected {}",
                what(),
                self.type_name(actual),
                self.type_name(expected)
            )
        })
    }

    /// Validates an expression and requires it to be BOOL.
    pub(super) fn validate_bool_expr(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
        what: &str,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, expr)?;
        ensure(expr.ty().is_bool(), || {
            format!("{what} must be BOOL, but has type {}", self.type_name(expr.ty()))
        })
    }

    /// Validates an expression that must be a literal or parameter of type
    /// INT64, and non-negative when it is a literal.
    pub(super) fn validate_int64_constant(
        &mut self,
        visible: &ColumnSet,
        params: &ColumnSet,
        expr: &Expr,
        what: &str,
    ) -> ValidationResult<()> {
        self.validate_expr(visible, params, expr)?;
        ensure(expr.is_literal_or_parameter(), || {
            format!("{what} must be a literal or parameter, found {}", expr.kind_name())
        })?;
        ensure(expr.ty().is_int64(), || {
            format!("{what} must be INT64, but has type {}", self.type_name(expr.ty()))
        })?;
        if let Some(value) = expr.as_literal().and_then(|l| l.value.as_i64()) {
            ensure(value >= 0, || format!("{what} must not be negative, found {value}"))?;
        }
        Ok(())
    }

    /// Validates OPTIONS and hint lists; values see no columns.
    pub(super) fn validate_option_list(&mut self, options: &[OptionEntry]) -> ValidationResult<()> {
        let empty = ColumnSet::new();
        for option in options {
            self.with_context(option, |v| {
                ensure(!option.name.is_empty(), || "Option name must not be empty".to_string())?;
                v.validate_expr(&empty, &empty, &option.value)
            })?;
        }
        Ok(())
    }

    /// Checks option names against an allow-list, case-insensitively, and
    /// rejects repeated names.
    pub(super) fn check_allowed_options(
        &self,
        options: &[OptionEntry],
        allowed: &[SmolStr],
        what: &str,
    ) -> ValidationResult<()> {
        let mut seen = FxHashSet::default();
        for option in options {
            let lowered = option.name.to_ascii_lowercase();
            ensure(allowed.iter().any(|a| a.eq_ignore_ascii_case(&lowered)), || {
                format!("Option {} is not allowed in {what}", option.name)
            })?;
            ensure(seen.insert(lowered), || {
                format!("Option {} is specified more than once in {what}", option.name)
            })?;
        }
        Ok(())
    }

    /// Requires every column of `columns` to be in `available`.
    pub(super) fn check_columns_available(
        &self,
        columns: &[ResolvedColumn],
        available: &ColumnSet,
        what: &str,
    ) -> ValidationResult<()> {
        for column in columns {
            ensure(available.contains(column), || {
                format!("{what} contains column {column} which is not available")
            })?;
        }
        Ok(())
    }
}

/// Fails with an internal error unless `condition` holds.
pub(super) fn ensure(condition: bool, message: impl FnOnce() -> String) -> ValidationResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ValidationError::internal(message()))
    }
}

/// Fails with an internal error.
pub(super) fn fail<T>(message: impl Into<String>) -> ValidationResult<T> {
    Err(ValidationError::internal(message))
}
