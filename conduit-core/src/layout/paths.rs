//! Path Index
//!
//! Maps every component id in the live tree to its location. The scheduler
//! only asks two things of it: does a component still exist, and which
//! components does a wildcard spec currently address.
//!
//! Iteration order is insertion order, which for an index built by
//! [`PathIndex::from_layout`] is depth-first layout order. Wildcard
//! resolution returns addresses in that order so results are deterministic.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use super::address::{Address, Bindings, ComponentId};
use super::pattern::{DependencySpec, IdPattern};

/// One step from a parent node to a child node in the layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key, e.g. `props` or `children`.
    Key(String),
    /// Array index.
    Index(usize),
}

/// Location of a component in the layout tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePath(SmallVec<[PathSegment; 8]>);

impl TreePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path made of the given segments.
    pub fn new(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        segments.into_iter().collect()
    }

    /// A path extended by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut path = self.clone();
        path.0.push(segment);
        path
    }

    /// The path segments, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl FromIterator<PathSegment> for TreePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(segments: I) -> Self {
        Self(segments.into_iter().collect())
    }
}

/// Component id to tree location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathIndex {
    paths: IndexMap<ComponentId, TreePath>,
}

impl PathIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every component with an id in a JSON layout tree.
    ///
    /// A component is an object with a `props` object; it is indexed when
    /// `props.id` is a string or a keyed map of scalars. Any other id is
    /// logged and skipped. Children are followed through
    /// `props.children`, which may be a single node or an array, and through
    /// bare arrays.
    pub fn from_layout(layout: &Value) -> Self {
        let mut index = Self::new();
        index.crawl(layout, TreePath::root());
        index
    }

    fn crawl(&mut self, node: &Value, path: TreePath) {
        match node {
            Value::Object(object) => {
                let Some(Value::Object(props)) = object.get("props") else {
                    return;
                };
                if let Some(raw) = props.get("id") {
                    match serde_json::from_value::<ComponentId>(raw.clone()) {
                        Ok(id) => {
                            self.paths.insert(id, path.clone());
                        }
                        Err(error) => {
                            tracing::warn!(id = %raw, %error, "component id not indexed");
                        }
                    }
                }
                if let Some(children) = props.get("children") {
                    let base = path
                        .child(PathSegment::Key("props".to_string()))
                        .child(PathSegment::Key("children".to_string()));
                    match children {
                        Value::Array(items) => {
                            for (i, child) in items.iter().enumerate() {
                                self.crawl(child, base.child(PathSegment::Index(i)));
                            }
                        }
                        child => self.crawl(child, base),
                    }
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    self.crawl(child, path.child(PathSegment::Index(i)));
                }
            }
            _ => {}
        }
    }

    /// Record (or move) a component.
    pub fn insert(&mut self, id: impl Into<ComponentId>, path: TreePath) {
        self.paths.insert(id.into(), path);
    }

    /// Forget a component. Returns its last known path.
    pub fn remove(&mut self, id: &ComponentId) -> Option<TreePath> {
        self.paths.shift_remove(id)
    }

    /// Whether the component is in the tree.
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.paths.contains_key(id)
    }

    /// The component's location, if it is in the tree.
    pub fn path(&self, id: &ComponentId) -> Option<&TreePath> {
        self.paths.get(id)
    }

    /// All indexed ids in layout order.
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.paths.keys()
    }

    /// Number of indexed components.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Concrete addresses a spec resolves to under `bindings`.
    ///
    /// An exact spec yields zero or one address. A wildcard spec yields one
    /// address per matching component, in layout order.
    pub fn resolve(&self, spec: &DependencySpec, bindings: &Bindings) -> Vec<Address> {
        match &spec.target {
            IdPattern::Exact(id) => {
                if self.contains(id) {
                    vec![Address::new(id.clone(), spec.property.clone())]
                } else {
                    Vec::new()
                }
            }
            IdPattern::Wildcard(_) => self
                .paths
                .keys()
                .filter(|id| spec.matches_component(id, bindings))
                .map(|id| Address::new(id.clone(), spec.property.clone()))
                .collect(),
        }
    }

    /// Distinct `MATCH` bindings under which a spec addresses at least one
    /// live component, in layout order.
    pub fn bindings_for(&self, spec: &DependencySpec) -> Vec<Bindings> {
        let found: IndexSet<Bindings> = self
            .paths
            .keys()
            .filter_map(|id| spec.capture(id))
            .collect();
        found.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{KeyValue, Selector};
    use serde_json::json;

    fn row(index: i64) -> ComponentId {
        ComponentId::keyed([("type", KeyValue::from("row")), ("index", KeyValue::from(index))])
    }

    #[test]
    fn crawl_indexes_nested_children() {
        let layout = json!({
            "type": "Div",
            "props": {
                "id": "root",
                "children": [
                    {"type": "Input", "props": {"id": "name"}},
                    "plain text",
                    {"type": "Div", "props": {"children": {"type": "Span", "props": {"id": "label"}}}}
                ]
            }
        });

        let index = PathIndex::from_layout(&layout);

        assert_eq!(index.len(), 3);
        assert_eq!(index.path(&ComponentId::from("root")), Some(&TreePath::root()));

        let label = index.path(&ComponentId::from("label")).unwrap();
        assert_eq!(
            label.segments(),
            &[
                PathSegment::Key("props".to_string()),
                PathSegment::Key("children".to_string()),
                PathSegment::Index(2),
                PathSegment::Key("props".to_string()),
                PathSegment::Key("children".to_string()),
            ]
        );
    }

    #[test]
    fn crawl_reads_keyed_ids_and_bare_arrays() {
        let layout = json!([
            {"type": "Li", "props": {"id": {"type": "row", "index": 0}}},
            {"type": "Li", "props": {"id": {"type": "row", "index": 1}}}
        ]);

        let index = PathIndex::from_layout(&layout);
        assert!(index.contains(&row(0)));
        assert_eq!(index.path(&row(1)), Some(&TreePath::new([PathSegment::Index(1)])));
    }

    #[test]
    fn crawl_accepts_bool_and_float_key_values() {
        let layout = json!([
            {"props": {"id": {"item": 0}}},
            {"props": {"id": {"item": 0, "preceding": true}}},
            {"props": {"id": {"item": 1.5}}},
            {"props": {"id": {"item": [1]}}}
        ]);

        let index = PathIndex::from_layout(&layout);

        assert_eq!(index.len(), 3);
        assert!(index.contains(&ComponentId::keyed([
            ("item", KeyValue::from(0)),
            ("preceding", KeyValue::from(true)),
        ])));
        assert!(index.contains(&ComponentId::keyed([("item", KeyValue::from(1.5))])));
    }

    #[test]
    fn resolve_wildcard_in_layout_order() {
        let mut index = PathIndex::new();
        index.insert(row(2), TreePath::new([PathSegment::Index(0)]));
        index.insert(row(0), TreePath::new([PathSegment::Index(1)]));
        index.insert("total", TreePath::root());

        let spec = DependencySpec::pattern(
            [("type", Selector::Value(KeyValue::from("row"))), ("index", Selector::All)],
            "value",
        );
        let resolved = index.resolve(&spec, &Bindings::new());
        assert_eq!(resolved, vec![Address::new(row(2), "value"), Address::new(row(0), "value")]);
    }

    #[test]
    fn resolve_missing_exact_is_empty() {
        let index = PathIndex::new();
        assert!(index.resolve(&DependencySpec::exact("gone", "value"), &Bindings::new()).is_empty());
    }

    #[test]
    fn bindings_are_distinct() {
        let mut index = PathIndex::new();
        index.insert(row(0), TreePath::root());
        index.insert(row(1), TreePath::root());

        let spec = DependencySpec::pattern(
            [("type", Selector::All), ("index", Selector::Match)],
            "value",
        );
        let bindings = index.bindings_for(&spec);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].get("index"), Some(&KeyValue::from(0)));
    }
}
