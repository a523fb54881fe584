//! Node implementation for the target graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId, NodeKey};
use serde::{Deserialize, Serialize};

/// A node in the property graph
///
/// Every migrated node carries exactly one label and its merge key as an
/// ordinary property (e.g. `book_id`), so the relational surrogate id stays
/// queryable after projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Store-internal identifier
    pub id: NodeId,

    pub label: Label,

    /// Name of the property holding the relational key
    pub key_property: String,

    /// Properties associated with this node (key property included)
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last time a merge actually changed a property (Unix milliseconds)
    pub updated_at: i64,
}

impl Node {
    /// Create a node for a merge key; the key value is stored as a property
    pub fn new(id: NodeId, key: &NodeKey) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut properties = PropertyMap::new();
        properties.insert(key.property.clone(), PropertyValue::Integer(key.value));

        Node {
            id,
            label: key.label.clone(),
            key_property: key.property.clone(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild the merge key from the stored key property
    pub fn key(&self) -> Option<NodeKey> {
        let value = self.properties.get(&self.key_property)?.as_integer()?;
        Some(NodeKey::new(self.label.clone(), self.key_property.clone(), value))
    }

    pub fn has_label(&self, label: &Label) -> bool {
        &self.label == label
    }

    /// Overwrite properties with merge semantics.
    ///
    /// `Null` removes the property. The key property is never touched.
    /// Returns true if anything changed.
    pub fn apply_properties(&mut self, properties: PropertyMap) -> bool {
        let mut changed = false;
        for (key, value) in properties {
            if key == self.key_property {
                continue;
            }
            if value.is_null() {
                changed |= self.properties.remove(&key).is_some();
            } else if self.properties.get(&key) != Some(&value) {
                self.properties.insert(key, value);
                changed = true;
            }
        }
        if changed {
            self.updated_at = chrono::Utc::now().timestamp_millis();
        }
        changed
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_key() -> NodeKey {
        NodeKey::new("Book", "book_id", 1)
    }

    #[test]
    fn test_new_node_carries_key() {
        let node = Node::new(NodeId::new(1), &book_key());
        assert!(node.has_label(&Label::new("Book")));
        assert_eq!(node.get_property("book_id").unwrap().as_integer(), Some(1));
        assert_eq!(node.key(), Some(book_key()));
    }

    #[test]
    fn test_apply_properties_overwrites_and_clears() {
        let mut node = Node::new(NodeId::new(1), &book_key());

        let mut props = PropertyMap::new();
        props.insert("title".to_string(), "Physics 101".into());
        props.insert("first_publish_year".to_string(), 2001i64.into());
        assert!(node.apply_properties(props.clone()));
        assert_eq!(node.property_count(), 3);

        // Same values again: nothing changes
        assert!(!node.apply_properties(props));

        let mut clear = PropertyMap::new();
        clear.insert("first_publish_year".to_string(), PropertyValue::Null);
        assert!(node.apply_properties(clear));
        assert!(!node.has_property("first_publish_year"));
    }

    #[test]
    fn test_key_property_is_immutable() {
        let mut node = Node::new(NodeId::new(1), &book_key());
        let mut props = PropertyMap::new();
        props.insert("book_id".to_string(), 99i64.into());

        assert!(!node.apply_properties(props));
        assert_eq!(node.key(), Some(book_key()));
    }
}
