//! Persistent column sets threaded through validation.
//!
//! A [`ColumnSet`] is immutable once built. Extending it creates a new
//! layer that shares every older layer, so handing a set to a child
//! validation step is an O(1) clone and no callee can ever change what
//! its caller sees.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::column::ResolvedColumn;

/// Layers beyond this depth are flattened on the next extension.
const MAX_LAYERS: usize = 32;

#[derive(Debug)]
struct Layer {
    ids: FxHashSet<i64>,
    parent: Option<Rc<Layer>>,
    depth: usize,
}

/// An immutable set of visible column ids.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnSet {
    head: Option<Rc<Layer>>,
}

impl ColumnSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_columns<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedColumn>,
    {
        Self::new().with_columns(columns)
    }

    /// Returns a set containing these columns plus `columns`.
    pub(crate) fn with_columns<'a, I>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedColumn>,
    {
        self.with_ids(columns.into_iter().map(|c| c.column_id))
    }

    /// Returns the union of both sets.
    pub(crate) fn union(&self, other: &ColumnSet) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        self.with_ids(other.ids())
    }

    fn with_ids(&self, ids: impl IntoIterator<Item = i64>) -> Self {
        let ids: FxHashSet<i64> = ids.into_iter().filter(|id| !self.contains_id(*id)).collect();
        if ids.is_empty() {
            return self.clone();
        }
        let depth = self.head.as_ref().map_or(0, |l| l.depth + 1);
        if depth >= MAX_LAYERS {
            let mut flat: FxHashSet<i64> = self.ids().collect();
            flat.extend(ids);
            return Self {
                head: Some(Rc::new(Layer {
                    ids: flat,
                    parent: None,
                    depth: 0,
                })),
            };
        }
        Self {
            head: Some(Rc::new(Layer {
                ids,
                parent: self.head.clone(),
                depth,
            })),
        }
    }

    pub(crate) fn contains(&self, column: &ResolvedColumn) -> bool {
        self.contains_id(column.column_id)
    }

    pub(crate) fn contains_id(&self, id: i64) -> bool {
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            if current.ids.contains(&id) {
                return true;
            }
            layer = current.parent.as_deref();
        }
        false
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Every id in the set, in no particular order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        let mut layers = Vec::new();
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            layers.push(current);
            layer = current.parent.as_deref();
        }
        layers.into_iter().flat_map(|l| l.ids.iter().copied())
    }

    pub(crate) fn len(&self) -> usize {
        self.ids().count()
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
    fn extension_does_not_touch_original() {
        let base = ColumnSet::from_columns(&[column(1), column(2)]);
        let extended = base.with_columns(&[column(3)]);
        assert!(extended.contains(&column(3)));
        assert!(!base.contains(&column(3)));
        assert_eq!(base.len(), 2);
        assert_eq!(extended.len(), 3);
    }

    #[test]
    fn union_and_duplicates() {
        let left = ColumnSet::from_columns(&[column(1), column(2)]);
        let right = ColumnSet::from_columns(&[column(2), column(3)]);
        let both = left.union(&right);
        let mut ids: Vec<_> = both.ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(ColumnSet::new().union(&left).contains_id(1));
    }

    #[test]
    fn deep_chains_are_flattened() {
        let mut set = ColumnSet::new();
        for id in 0..100 {
            set = set.with_columns(&[column(id)]);
        }
        assert_eq!(set.len(), 100);
        assert!((0..100).all(|id| set.contains_id(id)));
        assert!(set.head.as_ref().is_some_and(|l| l.depth < MAX_LAYERS));
    }
}
