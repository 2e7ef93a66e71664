use mapwright_model::{EntityDefinitionFileSpec, MapDocument, property_keys};
use std::any::Any;

use crate::command::{Command, CommandError, CommandType};

/// Points the map at a different entity definition file by rewriting the
/// worldspawn's `_tb_def` property.
///
/// Undo restores the raw property exactly as it was, including its absence.
#[derive(Debug, Clone)]
pub struct SetEntityDefinitionFileCommand {
    new_spec: EntityDefinitionFileSpec,
    old_value: Option<String>,
}

impl SetEntityDefinitionFileCommand {
    pub const TYPE: CommandType = CommandType("SetEntityDefinitionFile");

    pub fn new(spec: EntityDefinitionFileSpec) -> Self {
        Self {
            new_spec: spec,
            old_value: None,
        }
    }

    pub fn new_spec(&self) -> &EntityDefinitionFileSpec {
        &self.new_spec
    }

    /// The definition file in effect before the last `perform_do`.
    pub fn old_spec(&self) -> EntityDefinitionFileSpec {
        self.old_value
            .as_deref()
            .map(EntityDefinitionFileSpec::parse)
            .unwrap_or_default()
    }

    fn write(document: &mut MapDocument, value: Option<String>) {
        let worldspawn = document.worldspawn_id();
        document.object_will_change(worldspawn);
        let entity = document.worldspawn_mut();
        match value {
            Some(value) => {
                entity.add_or_update_property(property_keys::ENTITY_DEFINITIONS, value);
            }
            None => {
                entity.remove_property(property_keys::ENTITY_DEFINITIONS);
            }
        }
        document.object_did_change(worldspawn);
        document.entity_definitions_did_change();
    }
}

impl Command for SetEntityDefinitionFileCommand {
    fn name(&self) -> &str {
        "Set Entity Definition File"
    }

    fn command_type(&self) -> CommandType {
        Self::TYPE
    }

    fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        self.old_value = document
            .worldspawn()
            .property(property_keys::ENTITY_DEFINITIONS)
            .map(str::to_owned);
        tracing::debug!(
            old = ?self.old_value,
            new = %self.new_spec,
            "setting entity definition file"
        );
        Self::write(document, Some(self.new_spec.to_string()));
        Ok(())
    }

    fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        tracing::debug!(restored = ?self.old_value, "restoring entity definition file");
        Self::write(document, self.old_value.clone());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
