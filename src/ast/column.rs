//! Resolved columns and column id allocation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use smol_str::SmolStr;

use crate::ast::types::{Collation, TypeRef};

/// One logical column instance in a resolved tree.
///
/// Two columns are the same column iff their ids match; `table_name` and
/// `name` only serve diagnostics.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub column_id: i64,
    pub table_name: SmolStr,
    pub name: SmolStr,
    pub ty: TypeRef,
    /// Collation annotation carried by the column, if any.
    pub collation: Option<Collation>,
}

impl ResolvedColumn {
    pub fn new(
        column_id: i64,
        table_name: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        ty: TypeRef,
    ) -> Self {
        Self {
            column_id,
            table_name: table_name.into(),
            name: name.into(),
            ty,
            collation: None,
        }
    }

    /// Renders `table.name#id`.
    pub fn debug_string(&self) -> String {
        format!("{}.{}#{}", self.table_name, self.name, self.column_id)
    }

    /// Renders `table.name#id` together with the column type.
    pub fn short_debug_string(&self) -> String {
        format!("{} {}", self.debug_string(), self.ty)
    }
}

impl PartialEq for ResolvedColumn {
    fn eq(&self, other: &Self) -> bool {
        self.column_id == other.column_id
    }
}

impl Eq for ResolvedColumn {}

impl Hash for ResolvedColumn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column_id.hash(state);
    }
}

impl fmt::Display for ResolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.debug_string())
    }
}

/// Renders a column list as `[t.a#1, t.b#2]`.
pub fn column_list_debug_string(columns: &[ResolvedColumn]) -> String {
    let parts = columns
        .iter()
        .map(ResolvedColumn::debug_string)
        .collect::<Vec<_>>();
    format!("[{}]", parts.join(", "))
}

/// A shared, monotonically increasing id source.
#[derive(Debug, Default)]
pub struct SequenceNumber {
    next: AtomicI64,
}

impl SequenceNumber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next value, starting at zero.
    pub fn next_value(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Allocates fresh columns with ids above a known maximum.
///
/// Without a sequence, ids are handed out as `max_column_id + 1`, `+ 2`, ...
/// With a sequence, ids are drawn from it, skipping any value that is not
/// above the ids already handed out.
#[derive(Debug)]
pub struct ColumnFactory {
    max_column_id: i64,
    sequence: Option<Arc<SequenceNumber>>,
}

impl ColumnFactory {
    /// Creates a factory that allocates ids after `max_seen_column_id`.
    pub fn new(max_seen_column_id: i64) -> Self {
        Self {
            max_column_id: max_seen_column_id,
            sequence: None,
        }
    }

    /// Creates a factory drawing ids from a shared sequence.
    pub fn with_sequence(max_seen_column_id: i64, sequence: Arc<SequenceNumber>) -> Self {
        Self {
            max_column_id: max_seen_column_id,
            sequence: Some(sequence),
        }
    }

    /// Largest id allocated so far (or the starting maximum).
    pub fn max_column_id(&self) -> i64 {
        self.max_column_id
    }

    fn allocate_column_id(&mut self) -> i64 {
        let id = match &self.sequence {
            None => self.max_column_id + 1,
            Some(sequence) => loop {
                let candidate = sequence.next_value();
                if candidate > self.max_column_id {
                    break candidate;
                }
            },
        };
        self.max_column_id = id;
        id
    }

    /// Makes a new column with a fresh id.
    pub fn make_col(
        &mut self,
        table_name: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        ty: TypeRef,
    ) -> ResolvedColumn {
        let id = self.allocate_column_id();
        ResolvedColumn::new(id, table_name, name, ty)
    }

    /// Makes a new column with a fresh id and a collation annotation.
    pub fn make_collated_col(
        &mut self,
        table_name: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        ty: TypeRef,
        collation: Collation,
    ) -> ResolvedColumn {
        let mut column = self.make_col(table_name, name, ty);
        column.collation = Some(collation);
        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::types;

    #[test]
    fn factory_without_sequence() {
        let mut factory = ColumnFactory::new(10);
        let column = factory.make_col("table", "column", types::string());
        assert_eq!(column.column_id, 11);
        assert!(column.ty.is_string());
        assert_eq!(column.table_name, "table");
        assert_eq!(column.name, "column");
        assert_eq!(factory.max_column_id(), 11);
    }

    #[test]
    fn factory_with_sequence_behind() {
        let sequence = Arc::new(SequenceNumber::new());
        let mut factory = ColumnFactory::with_sequence(5, sequence.clone());
        let column = factory.make_col("table", "column", types::int32());
        assert_eq!(column.column_id, 6);
        assert_eq!(sequence.next_value(), 7);
        assert_eq!(factory.max_column_id(), 6);
    }

    #[test]
    fn factory_with_sequence_ahead() {
        let sequence = Arc::new(SequenceNumber::new());
        for _ in 0..10 {
            sequence.next_value();
        }
        let mut factory = ColumnFactory::with_sequence(0, sequence.clone());
        let column = factory.make_col("table", "column", types::int32());
        assert_eq!(column.column_id, 10);
        assert_eq!(sequence.next_value(), 11);
        assert_eq!(factory.max_column_id(), 10);
    }

    #[test]
    fn collated_column_keeps_annotation() {
        let mut factory = ColumnFactory::new(0);
        let column =
            factory.make_collated_col("test", "collate", types::string(), Collation::named("und:ci"));
        assert_eq!(column.collation, Some(Collation::named("und:ci")));
    }

    #[test]
    fn columns_compare_by_id() {
        let a = ResolvedColumn::new(1, "t", "a", types::int64());
        let b = ResolvedColumn::new(1, "u", "b", types::string());
        assert_eq!(a, b);
        assert_eq!(a.debug_string(), "t.a#1");
        assert_eq!(column_list_debug_string(&[a, b]), "[t.a#1, u.b#1]");
    }
}
