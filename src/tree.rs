use crate::key::encode_key;
use crate::value::{Attr, Value};
use std::collections::{BTreeMap, HashMap};

/// Attributes attached to a handler, organised by the group that was
/// open when they were added.
///
/// Every derived handler owns its own deep copy, so adding attributes to
/// one never shows up in its parent or siblings.
#[derive(Clone, Debug, Default)]
pub struct GroupedAttrs {
    attrs: Vec<Attr>,
    groups: HashMap<String, GroupedAttrs>,
}

impl GroupedAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `attrs` to the node at `groups`, creating missing nodes.
    pub fn set<S: AsRef<str>>(&mut self, groups: &[S], attrs: impl IntoIterator<Item = Attr>) {
        let mut target = self;
        for group in groups {
            target = target.groups.entry(group.as_ref().to_string()).or_default();
        }
        target.attrs.extend(attrs);
    }

    /// Visit every attribute with the group path it was declared under.
    ///
    /// A node's own attributes come first, in insertion order, followed by
    /// its child groups in no particular order.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(&[String], &Attr),
    {
        let mut path = Vec::new();
        self.walk(&mut path, &mut visitor);
    }

    fn walk<F>(&self, path: &mut Vec<String>, visitor: &mut F)
    where
        F: FnMut(&[String], &Attr),
    {
        for attr in &self.attrs {
            visitor(path, attr);
        }
        for (name, child) in &self.groups {
            path.push(name.clone());
            child.walk(path, visitor);
            path.pop();
        }
    }

    /// Resolve and flatten every attribute into `out`.
    pub fn flatten_into(&self, out: &mut BTreeMap<String, Value>) {
        self.traverse(|path, attr| {
            flatten_attr(path, attr, &mut |key, value| {
                out.insert(key, value);
            })
        });
    }
}

/// Resolve `attr` and report each leaf with its flattened key.
///
/// Group values expand into one more path segment named after the
/// attribute. Empty groups vanish and a group with an empty key is inlined
/// into the enclosing group.
pub fn flatten_attr<S, F>(groups: &[S], attr: &Attr, emit: &mut F)
where
    S: AsRef<str>,
    F: FnMut(String, Value),
{
    match attr.value.clone().resolve() {
        Value::Group(members) => {
            if members.is_empty() {
                return;
            }
            let mut path: Vec<String> = groups.iter().map(|g| g.as_ref().to_string()).collect();
            if !attr.key.is_empty() {
                path.push(attr.key.clone());
            }
            for member in &members {
                flatten_attr(&path, member, emit);
            }
        }
        value => emit(encode_key(groups, &attr.key), value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flattened(tree: &GroupedAttrs) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        tree.flatten_into(&mut out);
        out
    }

    #[test]
    fn set_creates_nested_groups() {
        let mut tree = GroupedAttrs::new();
        tree.set::<&str>(&[], [Attr::new("top", 1)]);
        tree.set(&["a", "b"], [Attr::new("deep", true)]);
        tree.set(&["a"], [Attr::new("mid", "m")]);

        let out = flattened(&tree);
        assert_eq!(out.len(), 3);
        assert_eq!(out["top"], Value::Int64(1));
        assert_eq!(out["a.mid"], Value::from("m"));
        assert_eq!(out["a.b.deep"], Value::Bool(true));
    }

    #[test]
    fn clone_is_independent() {
        let mut parent = GroupedAttrs::new();
        parent.set(&["g"], [Attr::new("x", 1)]);

        let mut child = parent.clone();
        child.set(&["g"], [Attr::new("y", 2)]);
        child.set(&["h"], [Attr::new("z", 3)]);

        assert_eq!(flattened(&parent).len(), 1);
        assert_eq!(flattened(&child).len(), 3);
    }

    #[test]
    fn traverse_keeps_insertion_order_within_a_node() {
        let mut tree = GroupedAttrs::new();
        tree.set::<&str>(&[], [Attr::new("b", 1), Attr::new("a", 2)]);
        tree.set::<&str>(&[], [Attr::new("c", 3)]);

        let mut seen = Vec::new();
        tree.traverse(|path, attr| {
            assert!(path.is_empty());
            seen.push(attr.key.clone());
        });
        assert_eq!(seen, ["b", "a", "c"]);
    }

    #[test]
    fn group_values_expand_and_empty_groups_vanish() {
        let mut tree = GroupedAttrs::new();
        tree.set::<&str>(
            &[],
            [
                Attr::group(
                    "req",
                    [Attr::new("method", "GET"), Attr::group("inner", [Attr::new("x", 1)])],
                ),
                Attr::group("empty", []),
                Attr::group("", [Attr::new("inlined", 1)]),
            ],
        );

        let out = flattened(&tree);
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, ["inlined", "req.inner.x", "req.method"]);
    }
}
