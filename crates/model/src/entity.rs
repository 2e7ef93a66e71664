use mapwright_common::NodeId;
use serde::{Deserialize, Serialize};

/// Well-known entity property keys.
pub mod property_keys {
    pub const CLASSNAME: &str = "classname";
    pub const WORLDSPAWN_CLASSNAME: &str = "worldspawn";
    pub const ENTITY_DEFINITIONS: &str = "_tb_def";
    pub const MODS: &str = "_tb_mod";
    pub const WAD: &str = "wad";
    pub const ORIGIN: &str = "origin";
}

/// A single key/value pair on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProperty {
    pub key: String,
    pub value: String,
}

/// A map entity: an ordered list of properties.
///
/// Property order is preserved; updating an existing key keeps its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    id: NodeId,
    properties: Vec<EntityProperty>,
}

impl Entity {
    pub fn new(classname: impl Into<String>) -> Self {
        let mut entity = Self {
            id: NodeId::new(),
            properties: Vec::new(),
        };
        entity.add_or_update_property(property_keys::CLASSNAME, classname);
        entity
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn properties(&self) -> &[EntityProperty] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    pub fn classname(&self) -> Option<&str> {
        self.property(property_keys::CLASSNAME)
    }

    pub fn is_worldspawn(&self) -> bool {
        self.classname() == Some(property_keys::WORLDSPAWN_CLASSNAME)
    }

    /// Set `key` to `value`, appending the property if it does not exist yet.
    /// Returns the previous value.
    pub fn add_or_update_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.properties.push(EntityProperty { key, value });
                None
            }
        }
    }

    pub fn property_index(&self, key: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.key == key)
    }

    /// Remove a property and return its value.
    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        let index = self.property_index(key)?;
        Some(self.properties.remove(index).value)
    }

    /// Insert a property at `index` (clamped to the end). An existing
    /// property with the same key is updated in place instead.
    pub fn insert_property_at(
        &mut self,
        index: usize,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let key = key.into();
        if self.has_property(&key) {
            return self.add_or_update_property(key, value);
        }
        let index = index.min(self.properties.len());
        self.properties.insert(
            index,
            EntityProperty {
                key,
                value: value.into(),
            },
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_has_classname() {
        let e = Entity::new("light");
        assert_eq!(e.classname(), Some("light"));
        assert!(!e.is_worldspawn());
        assert!(Entity::new("worldspawn").is_worldspawn());
    }

    #[test]
    fn update_keeps_position() {
        let mut e = Entity::new("info_player_start");
        e.add_or_update_property("origin", "0 0 0");
        e.add_or_update_property("angle", "90");

        let old = e.add_or_update_property("origin", "16 0 0");
        assert_eq!(old.as_deref(), Some("0 0 0"));
        let keys: Vec<&str> = e.properties().iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["classname", "origin", "angle"]);
        assert_eq!(e.property("origin"), Some("16 0 0"));
    }

    #[test]
    fn remove_property() {
        let mut e = Entity::new("light");
        e.add_or_update_property("light", "300");
        assert_eq!(e.remove_property("light").as_deref(), Some("300"));
        assert!(!e.has_property("light"));
        assert!(e.remove_property("light").is_none());
    }

    #[test]
    fn insert_at_restores_position() {
        let mut e = Entity::new("worldspawn");
        e.add_or_update_property("wad", "base.wad");
        e.add_or_update_property("message", "hello");

        let index = e.property_index("wad").unwrap();
        let value = e.remove_property("wad").unwrap();
        e.insert_property_at(index, "wad", value);
        let keys: Vec<&str> = e.properties().iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["classname", "wad", "message"]);

        assert_eq!(e.insert_property_at(99, "origin", "0 0 0"), None);
        assert_eq!(e.properties().last().unwrap().key, "origin");
        assert_eq!(e.insert_property_at(0, "wad", "q.wad").as_deref(), Some("base.wad"));
        assert_eq!(e.property_index("wad"), Some(1));
    }
}
