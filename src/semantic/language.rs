//! Dialect feature flags consulted by validation.
//!
//! Many structural checks only apply, or only permit a node kind, when a
//! specific [`LanguageFeature`] is enabled. [`LanguageOptions`] is the
//! read-only bag of enabled features a [`Validator`](super::Validator) is
//! constructed with.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::ast::types::ProductMode;

/// A dialect feature that gates node kinds or node shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageFeature {
    // Type capabilities
    ArrayEquality,
    ArrayOrdering,
    GroupByArray,
    GroupByStruct,
    CollationSupport,
    ParameterizedTypes,
    FormatInCast,

    // Recursion
    WithRecursive,
    PipeRecursiveUnion,

    // Aggregation
    GroupingSets,
    Rollup,
    Cube,
    MultilevelAggregation,
    WithGroupRows,
    Anonymization,
    DifferentialPrivacy,
    AggregationThreshold,

    // Relational operators
    LateralJoin,
    MultiwayUnnest,
    TableSample,
    StratifiedReservoirTableSample,
    TablesampleFromExpr,
    ForSystemTimeAsOf,
    CorrespondingFull,
    Pivot,
    Unpivot,
    MatchRecognize,

    // Expressions
    InlineLambda,
    WithExpression,

    // Pipe syntax
    PipeIf,
    PipeFork,
    PipeTee,
    PipeLog,
    PipeExportData,
    PipeInsert,
    PipeCreateTable,

    // DML
    InsertOnConflictClause,
    DmlReturning,

    // Property graphs
    SqlGraph,
    SqlGraphBoundedPathQuantification,
    SqlGraphDynamicLabelProperties,
    SqlGraphPathMode,
}

impl LanguageFeature {
    /// Every feature, in declaration order.
    pub const ALL: &'static [LanguageFeature] = &[
        LanguageFeature::ArrayEquality,
        LanguageFeature::ArrayOrdering,
        LanguageFeature::GroupByArray,
        LanguageFeature::GroupByStruct,
        LanguageFeature::CollationSupport,
        LanguageFeature::ParameterizedTypes,
        LanguageFeature::FormatInCast,
        LanguageFeature::WithRecursive,
        LanguageFeature::PipeRecursiveUnion,
        LanguageFeature::GroupingSets,
        LanguageFeature::Rollup,
        LanguageFeature::Cube,
        LanguageFeature::MultilevelAggregation,
        LanguageFeature::WithGroupRows,
        LanguageFeature::Anonymization,
        LanguageFeature::DifferentialPrivacy,
        LanguageFeature::AggregationThreshold,
        LanguageFeature::LateralJoin,
        LanguageFeature::MultiwayUnnest,
        LanguageFeature::TableSample,
        LanguageFeature::StratifiedReservoirTableSample,
        LanguageFeature::TablesampleFromExpr,
        LanguageFeature::ForSystemTimeAsOf,
        LanguageFeature::CorrespondingFull,
        LanguageFeature::Pivot,
        LanguageFeature::Unpivot,
        LanguageFeature::MatchRecognize,
        LanguageFeature::InlineLambda,
        LanguageFeature::WithExpression,
        LanguageFeature::PipeIf,
        LanguageFeature::PipeFork,
        LanguageFeature::PipeTee,
        LanguageFeature::PipeLog,
        LanguageFeature::PipeExportData,
        LanguageFeature::PipeInsert,
        LanguageFeature::PipeCreateTable,
        LanguageFeature::InsertOnConflictClause,
        LanguageFeature::DmlReturning,
        LanguageFeature::SqlGraph,
        LanguageFeature::SqlGraphBoundedPathQuantification,
        LanguageFeature::SqlGraphDynamicLabelProperties,
        LanguageFeature::SqlGraphPathMode,
    ];

    /// Stable name used in messages, e.g. `FEATURE_WITH_RECURSIVE`.
    pub fn name(self) -> &'static str {
        match self {
            LanguageFeature::ArrayEquality => "FEATURE_ARRAY_EQUALITY",
            LanguageFeature::ArrayOrdering => "FEATURE_ARRAY_ORDERING",
            LanguageFeature::GroupByArray => "FEATURE_GROUP_BY_ARRAY",
            LanguageFeature::GroupByStruct => "FEATURE_GROUP_BY_STRUCT",
            LanguageFeature::CollationSupport => "FEATURE_COLLATION_SUPPORT",
            LanguageFeature::ParameterizedTypes => "FEATURE_PARAMETERIZED_TYPES",
            LanguageFeature::FormatInCast => "FEATURE_FORMAT_IN_CAST",
            LanguageFeature::WithRecursive => "FEATURE_WITH_RECURSIVE",
            LanguageFeature::PipeRecursiveUnion => "FEATURE_PIPE_RECURSIVE_UNION",
            LanguageFeature::GroupingSets => "FEATURE_GROUPING_SETS",
            LanguageFeature::Rollup => "FEATURE_ROLLUP",
            LanguageFeature::Cube => "FEATURE_CUBE",
            LanguageFeature::MultilevelAggregation => "FEATURE_MULTILEVEL_AGGREGATION",
            LanguageFeature::WithGroupRows => "FEATURE_WITH_GROUP_ROWS",
            LanguageFeature::Anonymization => "FEATURE_ANONYMIZATION",
            LanguageFeature::DifferentialPrivacy => "FEATURE_DIFFERENTIAL_PRIVACY",
            LanguageFeature::AggregationThreshold => "FEATURE_AGGREGATION_THRESHOLD",
            LanguageFeature::LateralJoin => "FEATURE_LATERAL_JOIN",
            LanguageFeature::MultiwayUnnest => "FEATURE_MULTIWAY_UNNEST",
            LanguageFeature::TableSample => "FEATURE_TABLESAMPLE",
            LanguageFeature::StratifiedReservoirTableSample => {
                "FEATURE_STRATIFIED_RESERVOIR_TABLESAMPLE"
            }
            LanguageFeature::TablesampleFromExpr => "FEATURE_TABLESAMPLE_FROM_EXPR",
            LanguageFeature::ForSystemTimeAsOf => "FEATURE_FOR_SYSTEM_TIME_AS_OF",
            LanguageFeature::CorrespondingFull => "FEATURE_CORRESPONDING_FULL",
            LanguageFeature::Pivot => "FEATURE_PIVOT",
            LanguageFeature::Unpivot => "FEATURE_UNPIVOT",
            LanguageFeature::MatchRecognize => "FEATURE_MATCH_RECOGNIZE",
            LanguageFeature::InlineLambda => "FEATURE_INLINE_LAMBDA_ARGUMENT",
            LanguageFeature::WithExpression => "FEATURE_WITH_EXPRESSION",
            LanguageFeature::PipeIf => "FEATURE_PIPE_IF",
            LanguageFeature::PipeFork => "FEATURE_PIPE_FORK",
            LanguageFeature::PipeTee => "FEATURE_PIPE_TEE",
            LanguageFeature::PipeLog => "FEATURE_PIPE_LOG",
            LanguageFeature::PipeExportData => "FEATURE_PIPE_EXPORT_DATA",
            LanguageFeature::PipeInsert => "FEATURE_PIPE_INSERT",
            LanguageFeature::PipeCreateTable => "FEATURE_PIPE_CREATE_TABLE",
            LanguageFeature::InsertOnConflictClause => "FEATURE_INSERT_ON_CONFLICT_CLAUSE",
            LanguageFeature::DmlReturning => "FEATURE_DML_RETURNING",
            LanguageFeature::SqlGraph => "FEATURE_SQL_GRAPH",
            LanguageFeature::SqlGraphBoundedPathQuantification => {
                "FEATURE_SQL_GRAPH_BOUNDED_PATH_QUANTIFICATION"
            }
            LanguageFeature::SqlGraphDynamicLabelProperties => {
                "FEATURE_SQL_GRAPH_DYNAMIC_LABEL_PROPERTIES"
            }
            LanguageFeature::SqlGraphPathMode => "FEATURE_SQL_GRAPH_PATH_MODE",
        }
    }
}

impl fmt::Display for LanguageFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Enabled dialect features plus the product mode used for type names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageOptions {
    enabled: FxHashSet<LanguageFeature>,
    product_mode: ProductMode,
}

impl LanguageOptions {
    /// Options with no features enabled and internal product mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with every feature enabled.
    pub fn maximum_features() -> Self {
        Self {
            enabled: LanguageFeature::ALL.iter().copied().collect(),
            product_mode: ProductMode::Internal,
        }
    }

    /// Builder-style variant of [`enable_feature`](Self::enable_feature).
    pub fn with_feature(mut self, feature: LanguageFeature) -> Self {
        self.enable_feature(feature);
        self
    }

    pub fn with_product_mode(mut self, product_mode: ProductMode) -> Self {
        self.product_mode = product_mode;
        self
    }

    pub fn enable_feature(&mut self, feature: LanguageFeature) {
        self.enabled.insert(feature);
    }

    pub fn disable_feature(&mut self, feature: LanguageFeature) {
        self.enabled.remove(&feature);
    }

    pub fn set_product_mode(&mut self, product_mode: ProductMode) {
        self.product_mode = product_mode;
    }

    pub fn feature_enabled(&self, feature: LanguageFeature) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn product_mode(&self) -> ProductMode {
        self.product_mode
    }

    /// Number of enabled features.
    pub fn enabled_feature_count(&self) -> usize {
        self.enabled.len()
    }

    /// Enabled features in declaration order.
    pub fn enabled_features(&self) -> Vec<LanguageFeature> {
        let mut features: Vec<_> = self.enabled.iter().copied().collect();
        features.sort();
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_enables_and_disables() {
        let mut options = LanguageOptions::new().with_feature(LanguageFeature::WithRecursive);
        assert!(options.feature_enabled(LanguageFeature::WithRecursive));
        assert!(!options.feature_enabled(LanguageFeature::PipeRecursiveUnion));

        options.disable_feature(LanguageFeature::WithRecursive);
        assert!(!options.feature_enabled(LanguageFeature::WithRecursive));
        assert_eq!(options.enabled_feature_count(), 0);
    }

    #[test]
    fn maximum_features_enables_everything() {
        let options = LanguageOptions::maximum_features();
        assert_eq!(options.enabled_feature_count(), LanguageFeature::ALL.len());
        assert!(
            LanguageFeature::ALL
                .iter()
                .all(|f| options.feature_enabled(*f))
        );
        assert_eq!(options.enabled_features(), LanguageFeature::ALL.to_vec());
    }

    #[test]
    fn feature_names_are_unique() {
        let names: FxHashSet<&str> = LanguageFeature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), LanguageFeature::ALL.len());
        assert_eq!(
            LanguageFeature::SqlGraph.to_string(),
            "FEATURE_SQL_GRAPH"
        );
    }

    #[test]
    fn product_mode_defaults_to_internal() {
        let options = LanguageOptions::new();
        assert_eq!(options.product_mode(), ProductMode::Internal);
        let external = options.with_product_mode(ProductMode::External);
        assert_eq!(external.product_mode(), ProductMode::External);
    }
}
