use std::fmt;

use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::ser::SerializeMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A node in the prefix tree: a display name, a self-cost `value`, and an
/// ordered mapping from child name to child frame.
///
/// Children are kept in an [`IndexMap`] rather than a [`std::collections::HashMap`]
/// so the insertion order set by a snapshot (descending `value`, stable
/// tie-break by name) survives encode/decode without a second sort.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub value: i64,
    pub children: IndexMap<String, Frame>,
}

impl Frame {
    /// Create a new, childless frame.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            children: IndexMap::new(),
        }
    }

    /// Cumulative subtree cost for this frame.
    ///
    /// `add` folds a sample's weight into every frame it passes through
    /// (root→leaf), so a frame's stored `value` is already inclusive of
    /// everything beneath it — the same convention collapsed-stack flame
    /// graphs use. `cumulative` exists so callers never need to know that;
    /// it is the on-demand read, `value` is the representation.
    pub fn cumulative(&self) -> i64 {
        self.value
    }

    /// Re-insert `children` ordered by descending `value`, tie-broken
    /// lexically by name. Used by snapshotting and by diff to give
    /// subscribers a deterministic traversal order.
    pub fn sort_children_by_value_desc(&mut self) {
        self.children
            .sort_by(|_, a, _, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
        for child in self.children.values_mut() {
            child.sort_children_by_value_desc();
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Frame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 2 + usize::from(!self.children.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("value", &self.value)?;
        if !self.children.is_empty() {
            map.serialize_entry("children", &self.children)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FrameVisitor;

        impl<'de> de::Visitor<'de> for FrameVisitor {
            type Value = Frame;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a frame object with name, value, and optional children")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Frame, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut name: Option<String> = None;
                let mut value: Option<i64> = None;
                let mut children: Option<IndexMap<String, Frame>> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "name" => name = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        "children" => {
                            let raw: IndexMap<String, Frame> = map.next_value()?;
                            for (key, frame) in &raw {
                                if key != &frame.name {
                                    return Err(de::Error::custom(format!(
                                        "child key {key:?} does not match frame name {:?}",
                                        frame.name
                                    )));
                                }
                            }
                            children = Some(raw);
                        }
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let name = name.ok_or_else(|| de::Error::missing_field("name"))?;
                let value = value.ok_or_else(|| de::Error::missing_field("value"))?;
                Ok(Frame {
                    name,
                    value,
                    children: children.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(FrameVisitor)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn cumulative_reads_the_stored_inclusive_value() {
        let mut main = Frame::new("main", 15);
        main.children.insert("leaf".into(), Frame::new("leaf", 5));
        assert_eq!(main.cumulative(), 15);
    }

    #[test]
    fn children_omitted_when_empty() {
        let frame = Frame::new("leaf", 3);
        let encoded = serde_json::to_value(&frame).unwrap();
        assert!(encoded.get("children").is_none());
    }

    #[test]
    fn sort_orders_descending_value_then_name() {
        let mut root = Frame::new("root", 0);
        root.children.insert("b".into(), Frame::new("b", 5));
        root.children.insert("a".into(), Frame::new("a", 5));
        root.children.insert("c".into(), Frame::new("c", 9));
        root.sort_children_by_value_desc();
        let names: Vec<_> = root.children.keys().cloned().collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn round_trip_preserves_order() {
        let mut root = Frame::new("root", 0);
        root.children.insert("b".into(), Frame::new("b", 5));
        root.children.insert("a".into(), Frame::new("a", 9));
        root.sort_children_by_value_desc();

        let encoded = serde_json::to_string(&root).unwrap();
        let decoded: Frame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn duplicate_child_key_mismatch_is_rejected() {
        let json = r#"{"name":"root","value":0,"children":{"a":{"name":"not_a","value":1}}}"#;
        let err = serde_json::from_str::<Frame>(json).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
