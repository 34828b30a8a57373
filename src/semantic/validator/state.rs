//! Transient state of one validation pass.
//!
//! Everything here is reset at the start of a top-level call and must be
//! back in its empty shape when the pass completes. Stack-shaped pieces are
//! pushed and popped by the validator around the subtree they govern.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::ast::column::ResolvedColumn;
use crate::ast::descriptors::PropertyGraph;
use crate::ast::types::TypeRef;

use super::ColumnSet;

/// The recursive term currently being validated.
#[derive(Debug, Clone)]
pub(crate) struct RecursiveScanFrame {
    /// Columns a `RecursiveRefScan` must produce, positionally.
    pub(crate) expected_columns: Vec<ResolvedColumn>,
    /// Number of back-references seen so far.
    pub(crate) references: usize,
}

/// The subpipeline currently being validated.
#[derive(Debug, Clone)]
pub(crate) struct SubpipelineFrame {
    /// Columns the `SubpipelineInputScan` must produce.
    pub(crate) input_columns: Vec<ResolvedColumn>,
    pub(crate) input_is_ordered: bool,
    pub(crate) input_seen: bool,
}

/// Pattern variables of the active MATCH_RECOGNIZE.
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchRecognizeState {
    pub(crate) defined_variables: FxHashSet<SmolStr>,
}

/// Mutable bookkeeping threaded through every validation method.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    /// Every column id defined so far in this pass (or batch).
    pub(crate) column_ids_seen: FxHashSet<i64>,
    /// Addresses of the nodes currently being validated, outermost first.
    pub(crate) context_stack: Vec<usize>,
    pub(crate) depth: usize,
    pub(crate) recursive_scans: Vec<RecursiveScanFrame>,
    pub(crate) subpipelines: Vec<SubpipelineFrame>,
    pub(crate) match_recognize: Option<MatchRecognizeState>,
    /// Working tables of the enclosing graph linear scans.
    pub(crate) graph_working_tables: Vec<Vec<ResolvedColumn>>,
    /// Property graphs of the enclosing GRAPH_TABLE scans.
    pub(crate) property_graphs: Vec<Arc<PropertyGraph>>,
    /// Side-effect columns awaiting a `$with_side_effects` call, by id.
    pub(crate) unconsumed_side_effects: FxHashMap<i64, ResolvedColumn>,
    /// Visible WITH entries, innermost last. Lookups scan from the end.
    pub(crate) with_entries: Vec<(SmolStr, Vec<ResolvedColumn>)>,
    /// Number of leading `with_entries` registered at batch scope.
    pub(crate) batch_with_entries: usize,
    /// Input columns of the aggregates whose WITH GROUP ROWS subqueries
    /// are being validated.
    pub(crate) group_rows_inputs: Vec<ColumnSet>,
    /// Element types of the enclosing FLATTEN calls.
    pub(crate) flattened_arg_types: Vec<TypeRef>,
    /// Column ids referenced inside each enclosing subquery that must
    /// use all of its parameters.
    pub(crate) referenced_columns: Vec<FxHashSet<i64>>,
    /// Nesting depth of generalized query statements.
    pub(crate) generalized_query_depth: usize,
    pub(crate) in_multi_stmt: bool,
}

impl PassState {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Looks up the innermost WITH entry named `name` (case-insensitive).
    pub(crate) fn find_with_entry(&self, name: &str) -> Option<&[ResolvedColumn]> {
        self.with_entries
            .iter()
            .rev()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, columns)| columns.as_slice())
    }

    /// Records a column reference for every enclosing parameter tracker.
    pub(crate) fn note_reference(&mut self, column: &ResolvedColumn) {
        if let Some(frame) = self.referenced_columns.last_mut() {
            frame.insert(column.column_id);
        }
    }

    /// Describes the first tracker that is not back in its empty shape.
    pub(crate) fn leftover(&self) -> Option<String> {
        if !self.context_stack.is_empty() {
            return Some(format!(
                "Context stack is not empty at end of validation: {} entries",
                self.context_stack.len()
            ));
        }
        self.open_scope()
    }

    /// Like [`PassState::leftover`], minus the context stack, which still
    /// holds the enclosing batch between its statements.
    pub(crate) fn open_scope(&self) -> Option<String> {
        if !self.unconsumed_side_effects.is_empty() {
            let mut columns: Vec<_> = self.unconsumed_side_effects.values().collect();
            columns.sort_by_key(|c| c.column_id);
            let names = columns
                .iter()
                .map(|c| c.debug_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Some(format!("Unconsumed side effect columns: [{names}]"));
        }
        if self.with_entries.len() != self.batch_with_entries {
            return Some(format!(
                "{} WITH entries are still open at end of validation",
                self.with_entries.len() - self.batch_with_entries
            ));
        }
        if !self.recursive_scans.is_empty() {
            return Some("Recursive scan stack is not empty at end of validation".to_string());
        }
        if !self.subpipelines.is_empty() {
            return Some("Subpipeline stack is not empty at end of validation".to_string());
        }
        if self.match_recognize.is_some() {
            return Some("MATCH_RECOGNIZE state is still active at end of validation".to_string());
        }
        if !self.graph_working_tables.is_empty() || !self.property_graphs.is_empty() {
            return Some("Graph working table stack is not empty at end of validation".to_string());
        }
        if !self.group_rows_inputs.is_empty() {
            return Some("WITH GROUP ROWS stack is not empty at end of validation".to_string());
        }
        if !self.flattened_arg_types.is_empty() || !self.referenced_columns.is_empty() {
            return Some("Expression scope stack is not empty at end of validation".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::types;

    fn column(id: i64) -> ResolvedColumn {
        ResolvedColumn::new(id, "t", format!("c{id}"), types::int64())
    }

    #[test]
    fn fresh_state_has_no_leftovers() {
        let state = PassState::default();
        assert_eq!(state.leftover(), None);
    }

    #[test]
    fn with_entries_shadow_and_match_case_insensitively() {
        let mut state = PassState::default();
        state.with_entries.push(("q".into(), vec![column(1)]));
        state.with_entries.push(("Q".into(), vec![column(2)]));
        assert_eq!(state.find_with_entry("q"), Some(&[column(2)][..]));
        assert!(state.find_with_entry("other").is_none());
        assert!(state.leftover().is_some());

        state.batch_with_entries = 2;
        assert_eq!(state.leftover(), None);
    }

    #[test]
    fn unconsumed_side_effects_are_reported_in_id_order() {
        let mut state = PassState::default();
        state.unconsumed_side_effects.insert(7, column(7));
        state.unconsumed_side_effects.insert(3, column(3));
        assert_eq!(
            state.leftover().as_deref(),
            Some("Unconsumed side effect columns: [t.c3#3, t.c7#7]")
        );
        state.reset();
        assert_eq!(state.leftover(), None);
    }

    #[test]
    fn open_scope_ignores_the_context_stack() {
        let mut state = PassState::default();
        state.context_stack.push(1);
        assert_eq!(state.open_scope(), None);
        assert!(state.leftover().is_some());

        state.recursive_scans.push(RecursiveScanFrame {
            expected_columns: Vec::new(),
            references: 0,
        });
        assert_eq!(
            state.open_scope().as_deref(),
            Some("Recursive scan stack is not empty at end of validation")
        );
    }

    #[test]
    fn references_go_to_innermost_tracker() {
        let mut state = PassState::default();
        state.note_reference(&column(1));
        state.referenced_columns.push(FxHashSet::default());
        state.referenced_columns.push(FxHashSet::default());
        state.note_reference(&column(2));
        assert!(state.referenced_columns[1].contains(&2));
        assert!(state.referenced_columns[0].is_empty());
    }
}
