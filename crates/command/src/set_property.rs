use mapwright_common::NodeId;
use mapwright_model::{Entity, MapDocument, ModelError};
use std::any::Any;

use crate::command::{Command, CommandError, CommandType};

/// Sets (or removes, with `None`) one property of one entity.
///
/// Consecutive edits of the same key on the same entity collate into a
/// single undo step.
#[derive(Debug, Clone)]
pub struct SetPropertyCommand {
    entity: NodeId,
    key: String,
    new_value: Option<String>,
    old_value: Option<String>,
    old_index: Option<usize>,
}

impl SetPropertyCommand {
    pub const TYPE: CommandType = CommandType("SetProperty");

    pub fn new(entity: NodeId, key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            entity,
            key: key.into(),
            new_value: value,
            old_value: None,
            old_index: None,
        }
    }

    pub fn set(entity: NodeId, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(entity, key, Some(value.into()))
    }

    pub fn remove(entity: NodeId, key: impl Into<String>) -> Self {
        Self::new(entity, key, None)
    }

    fn edit<R>(
        &self,
        document: &mut MapDocument,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> Result<R, CommandError> {
        if document.entity(self.entity).is_none() {
            return Err(ModelError::EntityNotFound(self.entity).into());
        }
        document.object_will_change(self.entity);
        let entity = document
            .entity_mut(self.entity)
            .ok_or(ModelError::EntityNotFound(self.entity))?;
        let result = f(entity);
        document.object_did_change(self.entity);
        Ok(result)
    }
}

impl Command for SetPropertyCommand {
    fn name(&self) -> &str {
        if self.new_value.is_some() {
            "Set Property"
        } else {
            "Remove Property"
        }
    }

    fn command_type(&self) -> CommandType {
        Self::TYPE
    }

    fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        let (old_index, old_value) = self.edit(document, |entity| {
            let index = entity.property_index(&self.key);
            let previous = match &self.new_value {
                Some(v) => entity.add_or_update_property(self.key.as_str(), v.as_str()),
                None => entity.remove_property(&self.key),
            };
            (index, previous)
        })?;
        self.old_index = old_index;
        self.old_value = old_value;
        tracing::debug!(entity = %self.entity.short(), key = %self.key, "property set");
        Ok(())
    }

    fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        self.edit(document, |entity| match (&self.old_value, self.old_index) {
            (Some(value), Some(index)) => {
                entity.remove_property(&self.key);
                entity.insert_property_at(index, self.key.as_str(), value.as_str());
            }
            (Some(value), None) => {
                entity.add_or_update_property(self.key.as_str(), value.as_str());
            }
            (None, _) => {
                entity.remove_property(&self.key);
            }
        })
    }

    fn collate_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if other.entity != self.entity || other.key != self.key {
            return false;
        }
        self.new_value = other.new_value.clone();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_undo() {
        let mut doc = MapDocument::new();
        let light = doc.add_entity("light");
        let mut cmd = SetPropertyCommand::set(light, "light", "300");
        cmd.perform_do(&mut doc).unwrap();
        assert_eq!(doc.entity(light).unwrap().property("light"), Some("300"));

        cmd.perform_undo(&mut doc).unwrap();
        assert!(!doc.entity(light).unwrap().has_property("light"));
    }

    #[test]
    fn remove_and_undo() {
        let mut doc = MapDocument::new();
        let ws = doc.worldspawn_id();
        doc.worldspawn_mut().add_or_update_property("wad", "base.wad");
        let mut cmd = SetPropertyCommand::remove(ws, "wad");
        assert_eq!(cmd.name(), "Remove Property");
        cmd.perform_do(&mut doc).unwrap();
        assert!(!doc.worldspawn().has_property("wad"));
        cmd.perform_undo(&mut doc).unwrap();
        assert_eq!(doc.worldspawn().property("wad"), Some("base.wad"));
    }

    #[test]
    fn undo_of_removal_keeps_property_order() {
        let mut doc = MapDocument::new();
        let ws = doc.worldspawn_id();
        doc.worldspawn_mut().add_or_update_property("wad", "base.wad");
        doc.worldspawn_mut().add_or_update_property("message", "The Slipgate");
        let before = doc.state_hash();

        let mut cmd = SetPropertyCommand::remove(ws, "wad");
        cmd.perform_do(&mut doc).unwrap();
        cmd.perform_undo(&mut doc).unwrap();

        let keys: Vec<&str> = doc
            .worldspawn()
            .properties()
            .iter()
            .map(|p| p.key.as_str())
            .collect();
        assert_eq!(keys, ["classname", "wad", "message"]);
        assert_eq!(doc.state_hash(), before);
    }

    #[test]
    fn unknown_entity_fails_without_notifying() {
        let mut doc = MapDocument::new();
        let mut cmd = SetPropertyCommand::set(NodeId::new(), "k", "v");
        assert!(matches!(
            cmd.perform_do(&mut doc),
            Err(CommandError::Model(ModelError::EntityNotFound(_)))
        ));
        assert!(doc.events().is_empty());
    }

    #[test]
    fn collates_same_key_only() {
        let id = NodeId::new();
        let mut a = SetPropertyCommand::set(id, "angle", "90");
        let b = SetPropertyCommand::set(id, "angle", "180");
        let c = SetPropertyCommand::set(id, "origin", "0 0 0");
        let d = SetPropertyCommand::set(NodeId::new(), "angle", "0");
        assert!(a.collate_with(&b));
        assert_eq!(a.new_value.as_deref(), Some("180"));
        assert!(!a.collate_with(&c));
        assert!(!a.collate_with(&d));
    }
}
