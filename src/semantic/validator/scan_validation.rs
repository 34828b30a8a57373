//! Scan dispatch and the relational operators without a module of their own.
//!
//! Every per-kind function validates its inputs and returns the columns the
//! scan makes available. [`Validator::validate_scan`] then checks that the
//! scan's `column_list` draws only from those columns and that a scan
//! claiming ordered output is allowed to.

use crate::ast::query::{
    AnalyticScan, ArrayScan, AssertScan, ExecuteAsRoleScan, FilterScan, JoinScan, JoinType,
    LimitOffsetScan, OrderByScan, ProjectScan, SampleScan, SampleUnit, Scan, TableScan,
    WindowPartitioning, WithRefScan, WithScan,
};
use crate::ast::types::Type;
use crate::semantic::diag::ValidationResult;
use crate::semantic::language::LanguageFeature;

use super::{ColumnSet, Validator, ensure, fail};

const RESERVOIR_METHOD: &str = "reservoir";

impl Validator {
    /// Validates `scan`, whose correlated references may only target
    /// `params`.
    pub(super) fn validate_scan(&mut self, scan: &Scan, params: &ColumnSet) -> ValidationResult<()> {
        self.with_depth(|v| {
            v.with_context(scan, |v| {
                let available = v.validate_scan_kind(scan, params)?;
                for column in scan.column_list() {
                    ensure(available.contains(column), || {
                        format!(
                            "Column list contains column {column} not visible in {}",
                            scan.kind_name()
                        )
                    })?;
                }
                v.check_scan_ordering(scan)?;
                v.validate_option_list(&scan.base().hint_list)
            })
        })
    }

    fn validate_scan_kind(&mut self, scan: &Scan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        match scan {
            Scan::SingleRow(_) => Ok(ColumnSet::new()),
            Scan::Table(s) => self.validate_table_scan(s, params),
            Scan::Join(s) => self.validate_join_scan(s, params),
            Scan::Array(s) => self.validate_array_scan(s, params),
            Scan::Filter(s) => self.validate_filter_scan(s, params),
            Scan::Project(s) => self.validate_project_scan(s, params),
            Scan::Aggregate(s) => self.validate_aggregate_scan_base(&s.aggregate, params),
            Scan::AnonymizedAggregate(s) => self.validate_anonymized_aggregate_scan(s, params),
            Scan::DifferentialPrivacyAggregate(s) => {
                self.validate_differential_privacy_aggregate_scan(s, params)
            }
            Scan::AggregationThresholdAggregate(s) => {
                self.validate_aggregation_threshold_aggregate_scan(s, params)
            }
            Scan::SetOperation(s) => self.validate_set_operation_scan(s, params),
            Scan::OrderBy(s) => self.validate_order_by_scan(s, params),
            Scan::LimitOffset(s) => self.validate_limit_offset_scan(s, params),
            Scan::WithRef(s) => self.validate_with_ref_scan(s),
            Scan::With(s) => self.validate_with_scan(s, params),
            Scan::Analytic(s) => self.validate_analytic_scan(s, params),
            Scan::Sample(s) => self.validate_sample_scan(s, params),
            Scan::Tvf(s) => self.validate_tvf_scan(s, params),
            Scan::RelationArgument(s) => {
                self.check_unique_column_ids(&s.base.column_list)?;
                Ok(ColumnSet::from_columns(&s.base.column_list))
            }
            Scan::Recursive(s) => self.validate_recursive_scan(s, params),
            Scan::RecursiveRef(s) => self.validate_recursive_ref_scan(s),
            Scan::Pivot(s) => self.validate_pivot_scan(s, params),
            Scan::Unpivot(s) => self.validate_unpivot_scan(s, params),
            Scan::MatchRecognize(s) => self.validate_match_recognize_scan(s, params),
            Scan::Barrier(s) => self.validate_pass_through(&s.input_scan, params),
            Scan::Assert(s) => self.validate_assert_scan(s, params),
            Scan::ExecuteAsRole(s) => self.validate_execute_as_role_scan(s, params),
            Scan::StaticDescribe(s) => self.validate_pass_through(&s.input_scan, params),
            Scan::Log(s) => self.validate_log_scan(s, params),
            Scan::PipeIf(s) => self.validate_pipe_if_scan(s, params),
            Scan::PipeFork(s) => self.validate_pipe_fork_scan(s, params),
            Scan::PipeTee(s) => self.validate_pipe_tee_scan(s, params),
            Scan::PipeExportData(s) => self.validate_pipe_export_data_scan(s, params),
            Scan::PipeInsert(s) => self.validate_pipe_insert_scan(s, params),
            Scan::PipeCreateTable(s) => self.validate_pipe_create_table_scan(s, params),
            Scan::SubpipelineInput(s) => self.validate_subpipeline_input_scan(s),
            Scan::GroupRows(_) => self.validate_group_rows_scan(),
            Scan::GraphTable(s) => self.validate_graph_table_scan(s, params),
            Scan::Graph(s) => self.validate_graph_scan(s, params),
            Scan::GraphPath(s) => self.validate_graph_path_scan(s, params),
            Scan::GraphNode(s) => self.validate_graph_element_scan(
                scan,
                s.filter_expr.as_deref(),
                s.label_expr.as_ref(),
                params,
            ),
            Scan::GraphEdge(s) => self.validate_graph_element_scan(
                scan,
                s.filter_expr.as_deref(),
                s.label_expr.as_ref(),
                params,
            ),
            Scan::GraphLinear(s) => self.validate_graph_linear_scan(s, params),
            Scan::GraphRef(_) => self.validate_graph_ref_scan(scan),
            Scan::GraphCall(s) => self.validate_graph_call_scan(s, params),
        }
    }

    /// Only ORDER BY creates order; a few wrappers may preserve it.
    fn check_scan_ordering(&self, scan: &Scan) -> ValidationResult<()> {
        if !scan.is_ordered() {
            return Ok(());
        }
        let input = match scan {
            Scan::OrderBy(_) | Scan::SubpipelineInput(_) => return Ok(()),
            Scan::Project(s) => &s.input_scan,
            Scan::LimitOffset(s) => &s.input_scan,
            Scan::Filter(s) => &s.input_scan,
            Scan::Barrier(s) => &s.input_scan,
            Scan::Assert(s) => &s.input_scan,
            Scan::ExecuteAsRole(s) => &s.input_scan,
            Scan::StaticDescribe(s) => &s.input_scan,
            Scan::Log(s) => &s.input_scan,
            Scan::With(s) => &s.query,
            other => return fail(format!("{} cannot produce an ordered result", other.kind_name())),
        };
        ensure(input.is_ordered(), || {
            format!(
                "{} is ordered but its input {} is not",
                scan.kind_name(),
                input.kind_name()
            )
        })
    }

    /// Validates the input of a scan that adds no columns.
    pub(super) fn validate_pass_through(&mut self, input: &Scan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        self.validate_scan(input, params)?;
        Ok(ColumnSet::from_columns(input.column_list()))
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn validate_table_scan(&mut self, scan: &TableScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let columns = &scan.base.column_list;
        let legacy = scan.column_index_list.is_empty() && self.options.allow_legacy_empty_column_index_list;
        if !legacy {
            ensure(scan.column_index_list.len() == columns.len(), || {
                format!(
                    "TableScan of {} has {} columns but {} column indexes",
                    scan.table.name,
                    columns.len(),
                    scan.column_index_list.len()
                )
            })?;
            for (column, &index) in columns.iter().zip(&scan.column_index_list) {
                let Some(catalog_column) = scan.table.column(index) else {
                    return fail(format!(
                        "Column index {index} is out of range for table {} with {} columns",
                        scan.table.name,
                        scan.table.num_columns()
                    ));
                };
                self.check_type_equals(&column.ty, &catalog_column.ty, || {
                    format!("Column {column} of table {}", scan.table.name)
                })?;
            }
        }

        if let Some(expr) = &scan.for_system_time_expr {
            self.check_feature(LanguageFeature::ForSystemTimeAsOf, "FOR SYSTEM_TIME AS OF")?;
            self.validate_expr(&ColumnSet::new(), params, expr)?;
            ensure(matches!(expr.ty().as_ref(), Type::Timestamp), || {
                format!(
                    "FOR SYSTEM_TIME AS OF expression must be TIMESTAMP, but has type {}",
                    self.type_name(expr.ty())
                )
            })?;
        }

        self.check_unique_column_ids(columns)?;
        Ok(ColumnSet::from_columns(columns))
    }

    fn validate_with_ref_scan(&mut self, scan: &WithRefScan) -> ValidationResult<ColumnSet> {
        let Some(entry_columns) = self.state.find_with_entry(&scan.with_query_name) else {
            return fail(format!("WITH query {} is not visible", scan.with_query_name));
        };
        let entry_types: Vec<_> = entry_columns.iter().map(|c| c.ty.clone()).collect();
        let columns = &scan.base.column_list;
        ensure(columns.len() == entry_types.len(), || {
            format!(
                "WithRefScan of {} has {} columns, but the WITH query produces {}",
                scan.with_query_name,
                columns.len(),
                entry_types.len()
            )
        })?;
        for (column, ty) in columns.iter().zip(&entry_types) {
            self.check_type_equals(&column.ty, ty, || {
                format!("Column {column} of WITH query {}", scan.with_query_name)
            })?;
        }
        self.check_unique_column_ids(columns)?;
        Ok(ColumnSet::from_columns(columns))
    }

    // ========================================================================
    // Joins and arrays
    // ========================================================================

    fn validate_join_scan(&mut self, scan: &JoinScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        self.validate_scan(&scan.left_scan, params)?;
        let left = ColumnSet::from_columns(scan.left_scan.column_list());

        if scan.is_lateral {
            self.check_feature(LanguageFeature::LateralJoin, "LATERAL join")?;
            self.validate_column_refs(&left, params, &scan.parameter_list)?;
            let lateral_params =
                ColumnSet::from_columns(scan.parameter_list.iter().map(|p| &p.column));
            self.validate_scan(&scan.right_scan, &lateral_params)?;
        } else {
            ensure(scan.parameter_list.is_empty(), || {
                "Only a LATERAL join may have a parameter list".to_string()
            })?;
            self.validate_scan(&scan.right_scan, params)?;
        }
        let right = ColumnSet::from_columns(scan.right_scan.column_list());

        if let Some(shared) = right.ids().find(|&id| left.contains_id(id)) {
            return fail(format!(
                "Join inputs share column id {shared}; left and right columns must be disjoint"
            ));
        }

        let visible = left.union(&right);
        match &scan.join_expr {
            Some(join_expr) => self.validate_bool_expr(&visible, params, join_expr, "Join condition")?,
            None => match scan.join_type {
                JoinType::Inner => {}
                JoinType::Left => ensure(scan.is_lateral, || {
                    "LEFT JOIN without a join condition must be LATERAL".to_string()
                })?,
                JoinType::Right | JoinType::Full => {
                    return fail(format!("{:?} JOIN requires a join condition", scan.join_type));
                }
            },
        }
        ensure(!scan.has_using || scan.join_expr.is_some(), || {
            "JOIN USING requires a join condition".to_string()
        })?;
        Ok(visible)
    }

    fn validate_array_scan(&mut self, scan: &ArrayScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = match &scan.input_scan {
            Some(input_scan) => {
                self.validate_scan(input_scan, params)?;
                ColumnSet::from_columns(input_scan.column_list())
            }
            None => ColumnSet::new(),
        };

        ensure(!scan.array_expr_list.is_empty(), || "ArrayScan has no array expressions".to_string())?;
        ensure(scan.array_expr_list.len() == scan.element_column_list.len(), || {
            format!(
                "ArrayScan has {} array expressions but {} element columns",
                scan.array_expr_list.len(),
                scan.element_column_list.len()
            )
        })?;
        if scan.array_expr_list.len() > 1 || scan.array_zip_mode.is_some() {
            self.check_feature(LanguageFeature::MultiwayUnnest, "Multiway UNNEST")?;
        }

        for (array_expr, element) in scan.array_expr_list.iter().zip(&scan.element_column_list) {
            self.validate_expr(&input, params, array_expr)?;
            let Some(element_type) = array_expr.ty().element_type() else {
                return fail(format!(
                    "UNNEST operand must be an ARRAY, but has type {}",
                    self.type_name(array_expr.ty())
                ));
            };
            self.check_type_equals(&element.ty, element_type, || format!("Element column {element}"))?;
            self.check_unique_column_id(element)?;
        }

        let mut available = input.with_columns(&scan.element_column_list);
        if let Some(offset) = &scan.array_offset_column {
            ensure(offset.ty.is_int64(), || format!("Array offset column {offset} must be INT64"))?;
            self.check_unique_column_id(offset)?;
            available = available.with_columns([offset]);
        }

        if let Some(join_expr) = &scan.join_expr {
            ensure(scan.input_scan.is_some(), || {
                "ArrayScan join condition requires an input scan".to_string()
            })?;
            self.validate_bool_expr(&available, params, join_expr, "ArrayScan join condition")?;
        }
        ensure(!scan.is_outer || scan.input_scan.is_some(), || {
            "Outer ArrayScan requires an input scan".to_string()
        })?;
        Ok(available)
    }

    // ========================================================================
    // Filtering, projection, ordering
    // ========================================================================

    fn validate_filter_scan(&mut self, scan: &FilterScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_bool_expr(&input, params, &scan.filter_expr, "Filter expression")?;
        Ok(input)
    }

    fn validate_project_scan(&mut self, scan: &ProjectScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        let mut available = input.clone();
        for computed in &scan.expr_list {
            self.with_context(computed, |v| {
                v.validate_expr(&input, params, &computed.expr)?;
                v.check_type_equals(computed.expr.ty(), &computed.column.ty, || {
                    format!("Computed column {}", computed.column)
                })?;
                v.check_unique_column_id(&computed.column)
            })?;
            available = available.with_columns([&computed.column]);
        }
        Ok(available)
    }

    fn validate_order_by_scan(&mut self, scan: &OrderByScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        ensure(!scan.order_by_item_list.is_empty(), || "OrderByScan has no ORDER BY items".to_string())?;
        self.validate_order_by_items(&input, params, &scan.order_by_item_list)?;
        Ok(input)
    }

    fn validate_limit_offset_scan(
        &mut self,
        scan: &LimitOffsetScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        ensure(scan.limit.is_some() || scan.offset.is_some(), || {
            "LimitOffsetScan must have a LIMIT or an OFFSET".to_string()
        })?;
        let empty = ColumnSet::new();
        if let Some(limit) = &scan.limit {
            self.validate_int64_constant(&empty, params, limit, "LIMIT")?;
        }
        if let Some(offset) = &scan.offset {
            self.validate_int64_constant(&empty, params, offset, "OFFSET")?;
        }
        Ok(input)
    }

    // ========================================================================
    // WITH
    // ========================================================================

    fn validate_with_scan(&mut self, scan: &WithScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        if scan.recursive {
            self.check_feature(LanguageFeature::WithRecursive, "WITH RECURSIVE")?;
        }
        let saved = self.state.with_entries.len();
        let result = self.validate_with_scan_entries(scan, params);
        self.state.with_entries.truncate(saved);
        result
    }

    fn validate_with_scan_entries(&mut self, scan: &WithScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        for (index, entry) in scan.with_entry_list.iter().enumerate() {
            let duplicate = scan.with_entry_list[..index]
                .iter()
                .any(|e| e.with_query_name.eq_ignore_ascii_case(&entry.with_query_name));
            ensure(!duplicate, || {
                format!("Duplicate WITH query name {}", entry.with_query_name)
            })?;
            self.validate_scan(&entry.with_subquery, params)?;
            self.state.with_entries.push((
                entry.with_query_name.clone(),
                entry.with_subquery.column_list().to_vec(),
            ));
        }
        self.validate_pass_through(&scan.query, params)
    }

    // ========================================================================
    // Analytic functions
    // ========================================================================

    fn validate_analytic_scan(&mut self, scan: &AnalyticScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        let mut available = input.clone();
        for group in &scan.function_group_list {
            self.with_context(group, |v| {
                if let Some(partition_by) = &group.partition_by {
                    v.validate_window_partitioning(&input, partition_by)?;
                }
                if let Some(order_by) = &group.order_by {
                    v.with_context(order_by, |v| {
                        ensure(!order_by.order_by_item_list.is_empty(), || {
                            "Window ORDER BY has no items".to_string()
                        })?;
                        v.validate_order_by_items(&input, params, &order_by.order_by_item_list)?;
                        v.validate_option_list(&order_by.hint_list)
                    })?;
                }
                let has_order_by = group.order_by.is_some();
                for computed in &group.analytic_function_list {
                    v.with_context(computed, |v| {
                        v.validate_analytic_expr(&input, params, computed.expr(), has_order_by)?;
                        v.check_type_equals(computed.expr().ty(), &computed.column().ty, || {
                            format!("Analytic column {}", computed.column())
                        })?;
                        v.check_unique_column_id(computed.column())
                    })?;
                }
                Ok(())
            })?;
            available = available.with_columns(group.analytic_function_list.iter().map(|c| c.column()));
        }
        Ok(available)
    }

    /// PARTITION BY references input columns directly, never correlated.
    pub(super) fn validate_window_partitioning(
        &mut self,
        input: &ColumnSet,
        partitioning: &WindowPartitioning,
    ) -> ValidationResult<()> {
        self.with_context(partitioning, |v| {
            ensure(!partitioning.partition_by_list.is_empty(), || {
                "PARTITION BY has no columns".to_string()
            })?;
            let empty = ColumnSet::new();
            for column_ref in &partitioning.partition_by_list {
                ensure(!column_ref.is_correlated, || {
                    format!("PARTITION BY column {} cannot be correlated", column_ref.column)
                })?;
                v.validate_column_ref(input, &empty, column_ref)?;
                ensure(column_ref.ty.supports_partitioning(&v.language), || {
                    format!(
                        "PARTITION BY column {} has type {}, which does not support partitioning",
                        column_ref.column,
                        v.type_name(&column_ref.ty)
                    )
                })?;
            }
            if !partitioning.collation_list.is_empty() {
                v.check_feature(LanguageFeature::CollationSupport, "PARTITION BY collation")?;
            }
            v.validate_option_list(&partitioning.hint_list)
        })
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    fn validate_sample_scan(&mut self, scan: &SampleScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        self.check_feature(LanguageFeature::TableSample, "TABLESAMPLE")?;
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        ensure(!scan.method.is_empty(), || "TABLESAMPLE method must not be empty".to_string())?;

        let empty = ColumnSet::new();
        match scan.unit {
            SampleUnit::Rows => {
                if self.feature_enabled(LanguageFeature::TablesampleFromExpr) {
                    self.validate_expr(&empty, params, &scan.size)?;
                    ensure(scan.size.ty().is_int64(), || {
                        "TABLESAMPLE ROWS size must be INT64".to_string()
                    })?;
                } else {
                    self.validate_int64_constant(&empty, params, &scan.size, "TABLESAMPLE ROWS size")?;
                }
            }
            SampleUnit::Percent => {
                self.validate_expr(&empty, params, &scan.size)?;
                ensure(scan.size.is_literal_or_parameter(), || {
                    format!(
                        "TABLESAMPLE PERCENT size must be a literal or parameter, found {}",
                        scan.size.kind_name()
                    )
                })?;
                ensure(scan.size.ty().is_int64() || scan.size.ty().is_floating_point(), || {
                    format!(
                        "TABLESAMPLE PERCENT size must be numeric, but has type {}",
                        self.type_name(scan.size.ty())
                    )
                })?;
                if let Some(percent) = scan.size.as_literal().and_then(|l| l.value.as_f64()) {
                    ensure((0.0..=100.0).contains(&percent), || {
                        format!("TABLESAMPLE PERCENT size {percent} is not in [0, 100]")
                    })?;
                }
            }
        }

        if let Some(repeatable) = &scan.repeatable_argument {
            self.validate_int64_constant(&empty, params, repeatable, "REPEATABLE argument")?;
        }

        if !scan.partition_by_list.is_empty() {
            self.check_feature(
                LanguageFeature::StratifiedReservoirTableSample,
                "TABLESAMPLE with PARTITION BY",
            )?;
            ensure(
                scan.unit == SampleUnit::Rows && scan.method.eq_ignore_ascii_case(RESERVOIR_METHOD),
                || "TABLESAMPLE PARTITION BY requires RESERVOIR sampling in ROWS".to_string(),
            )?;
            self.validate_exprs(&input, params, &scan.partition_by_list)?;
        }

        let mut available = input;
        if let Some(weight) = &scan.weight_column {
            ensure(matches!(weight.ty.as_ref(), Type::Double), || {
                format!("TABLESAMPLE weight column {weight} must be DOUBLE")
            })?;
            self.check_unique_column_id(weight)?;
            available = available.with_columns([weight]);
        }
        Ok(available)
    }

    // ========================================================================
    // Wrappers
    // ========================================================================

    fn validate_assert_scan(&mut self, scan: &AssertScan, params: &ColumnSet) -> ValidationResult<ColumnSet> {
        let input = self.validate_pass_through(&scan.input_scan, params)?;
        self.validate_bool_expr(&input, params, &scan.condition, "ASSERT condition")?;
        self.validate_expr(&input, params, &scan.message)?;
        ensure(scan.message.ty().is_string(), || "ASSERT message must be STRING".to_string())?;
        Ok(input)
    }

    /// Output columns are fresh copies of the input columns, positionally.
    fn validate_execute_as_role_scan(
        &mut self,
        scan: &ExecuteAsRoleScan,
        params: &ColumnSet,
    ) -> ValidationResult<ColumnSet> {
        self.validate_scan(&scan.input_scan, params)?;
        let input_columns = scan.input_scan.column_list();
        let columns = &scan.base.column_list;
        ensure(columns.len() == input_columns.len(), || {
            format!(
                "ExecuteAsRoleScan has {} columns but its input has {}",
                columns.len(),
                input_columns.len()
            )
        })?;
        for (column, input_column) in columns.iter().zip(input_columns) {
            self.check_type_equals(&column.ty, &input_column.ty, || format!("Column {column}"))?;
        }
        self.check_unique_column_ids(columns)?;
        Ok(ColumnSet::from_columns(columns))
    }
}
