use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// An ordered set which remembers the parent under which each element was
/// first added.
///
/// Elements are iterated in insertion order. [`NestedSet::nested()`] groups
/// them back into the tree implied by their parents, which is how bulk
/// actions present the records a publication would touch.
#[derive(Clone, Debug)]
pub struct NestedSet<T> {
    order: Vec<T>,
    parents: Vec<Option<T>>,
    members: HashSet<T>,
}

impl<T> NestedSet<T>
where
    T: Copy + Eq + Hash,
{
    pub fn new() -> NestedSet<T> {
        NestedSet::default()
    }

    /// Add an element under `parent`. Re-adding an element is a no-op; its
    /// original position and parent are kept.
    pub fn add(&mut self, item: T, parent: Option<T>) {
        if self.members.insert(item) {
            self.order.push(item);
            self.parents.push(parent);
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate elements in the order they were first added.
    pub fn iter(&self) -> std::slice::Iter<T> {
        self.order.iter()
    }

    /// Group elements into the tree implied by their parents.
    ///
    /// Elements whose parent was never added (or was `None`) become roots.
    pub fn nested(&self) -> Vec<NestedItem<T>> {
        let mut children: HashMap<T, Vec<T>> = HashMap::new();
        let mut roots = Vec::new();

        for (item, parent) in self.order.iter().zip(&self.parents) {
            match parent {
                Some(parent) if self.members.contains(parent) && parent != item =>
                    children.entry(*parent).or_insert_with(Vec::new).push(*item),
                _ => roots.push(*item),
            }
        }

        roots.into_iter()
            .map(|root| Self::subtree(root, &children))
            .collect()
    }

    fn subtree(item: T, children: &HashMap<T, Vec<T>>) -> NestedItem<T> {
        NestedItem {
            item,
            children: children.get(&item)
                .map(|kids| {
                    kids.iter()
                        .map(|&kid| Self::subtree(kid, children))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl<T> Default for NestedSet<T> {
    fn default() -> NestedSet<T> {
        NestedSet {
            order: Vec::new(),
            parents: Vec::new(),
            members: HashSet::new(),
        }
    }
}

/// A node of the tree view produced by [`NestedSet::nested()`].
#[derive(Clone, Debug, PartialEq)]
pub struct NestedItem<T> {
    pub item: T,
    pub children: Vec<NestedItem<T>>,
}
