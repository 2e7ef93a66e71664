use mapwright_common::EditorConfig;
use mapwright_model::MapDocument;
use std::time::{Duration, Instant};

use crate::command::{Command, CommandError, CommandGroup, CommandState, undo_in_reverse};

struct Entry {
    command: Box<dyn Command>,
    state: CommandState,
    stored_at: Instant,
}

struct OpenGroup {
    name: String,
    depth: usize,
    commands: Vec<Box<dyn Command>>,
}

/// Executes commands against a document and keeps the undo/redo history.
///
/// Every stored command is reversible via `undo()` and re-applicable via
/// `redo()`. Storing a new command clears the redo stack.
pub struct CommandProcessor {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    group: Option<OpenGroup>,
    collation_interval: Duration,
    max_undo_levels: usize,
    modification_count: i64,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            group: None,
            collation_interval: config.collation_interval(),
            max_undo_levels: config.max_undo_levels,
            modification_count: 0,
        }
    }

    /// Perform `command` and, if it is undoable, store it.
    ///
    /// A command that fails is neither stored nor collated.
    pub fn submit(
        &mut self,
        document: &mut MapDocument,
        mut command: Box<dyn Command>,
    ) -> Result<(), CommandError> {
        let _span = tracing::info_span!("submit", command = command.name()).entered();
        command.perform_do(document)?;
        tracing::debug!("performed");
        let modifies = command.modifies_document();
        let new_step = if command.is_undoable() {
            self.store(command)
        } else {
            true
        };
        if modifies && new_step {
            self.modification_count += 1;
        }
        Ok(())
    }

    /// Returns true if the command became a new undo step of its own.
    fn store(&mut self, command: Box<dyn Command>) -> bool {
        if let Some(group) = &mut self.group {
            if let Some(last) = group.commands.last_mut() {
                if last.command_type() == command.command_type()
                    && last.collate_with(command.as_ref())
                {
                    tracing::trace!("collated into open group");
                    return false;
                }
            }
            group.commands.push(command);
            return false;
        }

        self.redo_stack.clear();
        let now = Instant::now();
        if let Some(top) = self.undo_stack.last_mut() {
            if top.command.command_type() == command.command_type()
                && now.duration_since(top.stored_at) <= self.collation_interval
                && top.command.collate_with(command.as_ref())
            {
                top.stored_at = now;
                tracing::trace!("collated with previous command");
                return false;
            }
        }
        self.push_undo(Entry {
            command,
            state: CommandState::Done,
            stored_at: now,
        });
        true
    }

    fn push_undo(&mut self, entry: Entry) {
        self.undo_stack.push(entry);
        if self.max_undo_levels > 0 && self.undo_stack.len() > self.max_undo_levels {
            let excess = self.undo_stack.len() - self.max_undo_levels;
            self.undo_stack.drain(..excess);
        }
    }

    /// Undo the last stored command. Returns false if there is nothing to undo.
    pub fn undo(&mut self, document: &mut MapDocument) -> Result<bool, CommandError> {
        self.ensure_no_open_group()?;
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if entry.state != CommandState::Done {
            let err = CommandError::InvalidState {
                name: entry.command.name().to_string(),
                action: "undo",
                state: entry.state,
            };
            self.undo_stack.push(entry);
            return Err(err);
        }

        entry.state = CommandState::Undoing;
        if let Err(err) = entry.command.perform_undo(document) {
            tracing::warn!(command = entry.command.name(), "undo failed: {err}");
            entry.state = CommandState::Done;
            self.undo_stack.push(entry);
            return Err(err);
        }
        tracing::debug!(command = entry.command.name(), "undone");
        if entry.command.modifies_document() {
            self.modification_count -= 1;
        }
        entry.state = CommandState::Default;
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Redo the last undone command. Returns false if there is nothing to redo.
    pub fn redo(&mut self, document: &mut MapDocument) -> Result<bool, CommandError> {
        self.ensure_no_open_group()?;
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(false);
        };

        entry.state = CommandState::Doing;
        if let Err(err) = entry.command.perform_do(document) {
            tracing::warn!(command = entry.command.name(), "redo failed: {err}");
            entry.state = CommandState::Default;
            self.redo_stack.push(entry);
            return Err(err);
        }
        tracing::debug!(command = entry.command.name(), "redone");
        if entry.command.modifies_document() {
            self.modification_count += 1;
        }
        entry.state = CommandState::Done;
        entry.stored_at = Instant::now();
        self.push_undo(entry);
        Ok(true)
    }

    /// Open a group. Commands submitted until the matching `end_group` are
    /// stored as one undo step. Nested groups fold into the outermost one.
    pub fn begin_group(&mut self, name: impl Into<String>) {
        match &mut self.group {
            Some(group) => group.depth += 1,
            None => {
                self.group = Some(OpenGroup {
                    name: name.into(),
                    depth: 1,
                    commands: Vec::new(),
                })
            }
        }
    }

    /// Close the innermost group. Closing the outermost group stores its
    /// commands; an empty group stores nothing.
    pub fn end_group(&mut self) -> Result<(), CommandError> {
        let group = self.group.as_mut().ok_or(CommandError::NoOpenGroup)?;
        group.depth -= 1;
        if group.depth > 0 {
            return Ok(());
        }
        let Some(group) = self.group.take() else {
            return Err(CommandError::NoOpenGroup);
        };
        if group.commands.is_empty() {
            return Ok(());
        }
        tracing::debug!(group = %group.name, commands = group.commands.len(), "group stored");
        let command = CommandGroup::new(group.name, group.commands);
        if command.modifies_document() {
            self.modification_count += 1;
        }
        self.redo_stack.clear();
        self.push_undo(Entry {
            command: Box::new(command),
            state: CommandState::Done,
            stored_at: Instant::now(),
        });
        Ok(())
    }

    /// Undo every command of the open group and discard the group, including
    /// all enclosing levels. If an undo fails the group stays open with all
    /// its commands applied.
    pub fn rollback_group(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        let group = self.group.as_mut().ok_or(CommandError::NoOpenGroup)?;
        tracing::debug!(group = %group.name, "rolling back group");
        undo_in_reverse(&mut group.commands, document)?;
        self.group = None;
        Ok(())
    }

    pub fn is_group_open(&self) -> bool {
        self.group.is_some()
    }

    fn ensure_no_open_group(&self) -> Result<(), CommandError> {
        match &self.group {
            Some(group) => Err(CommandError::GroupOpen(group.name.clone())),
            None => Ok(()),
        }
    }

    /// Number of operations on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of operations on the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Name of the command the next `undo` reverts.
    pub fn undo_name(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.command.name())
    }

    /// Name of the command the next `redo` re-applies.
    pub fn redo_name(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.command.name())
    }

    /// Net number of document-modifying undo steps performed since the last
    /// `reset_modification_count`. Undo counts backwards; collated commands
    /// and commands inside an open group do not count on their own.
    pub fn modification_count(&self) -> i64 {
        self.modification_count
    }

    /// True if the document differs from its last saved state.
    pub fn is_modified(&self) -> bool {
        self.modification_count != 0
    }

    /// Call after the document has been saved.
    pub fn reset_modification_count(&mut self) {
        self.modification_count = 0;
    }

    /// Forget the whole history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group = None;
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoveVerticesCommand, SetEntityDefinitionFileCommand, SetPropertyCommand};
    use crate::command::CommandType;
    use glam::Vec3;
    use mapwright_common::NodeId;
    use mapwright_model::{
        BrushNode, EntityDefinitionFileSpec, ModelError, VertexRef, property_keys,
    };
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Writes `_note` on the worldspawn; undo can be made to fail.
    #[derive(Debug)]
    struct NoteCommand {
        undoable: bool,
        modifies: bool,
        fail_undo: Rc<Cell<bool>>,
    }

    impl NoteCommand {
        fn new(undoable: bool, modifies: bool) -> Self {
            Self {
                undoable,
                modifies,
                fail_undo: Rc::new(Cell::new(false)),
            }
        }
    }

    impl Command for NoteCommand {
        fn name(&self) -> &str {
            "Note"
        }

        fn command_type(&self) -> CommandType {
            CommandType("Note")
        }

        fn is_undoable(&self) -> bool {
            self.undoable
        }

        fn modifies_document(&self) -> bool {
            self.modifies
        }

        fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
            if self.modifies {
                document.worldspawn_mut().add_or_update_property("_note", "x");
            }
            Ok(())
        }

        fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
            if self.fail_undo.get() {
                return Err(ModelError::EntityNotFound(NodeId::new()).into());
            }
            if self.modifies {
                document.worldspawn_mut().remove_property("_note");
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn set_defs(path: &str) -> Box<dyn Command> {
        Box::new(SetEntityDefinitionFileCommand::new(
            EntityDefinitionFileSpec::builtin(path),
        ))
    }

    #[test]
    fn submit_and_undo_restores_state() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let before = doc.state_hash();

        processor.submit(&mut doc, set_defs("Quake.fgd")).unwrap();
        assert_eq!(processor.undo_name(), Some("Set Entity Definition File"));
        assert_eq!(
            doc.entity_definition_file(),
            EntityDefinitionFileSpec::builtin("Quake.fgd")
        );

        assert!(processor.undo(&mut doc).unwrap());
        assert_eq!(doc.state_hash(), before);
        assert_eq!(doc.entity_definition_file(), EntityDefinitionFileSpec::Unset);
    }

    #[test]
    fn undo_redo_cycle() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        let after = doc.state_hash();

        processor.undo(&mut doc).unwrap();
        assert!(processor.can_redo());
        assert_eq!(processor.redo_name(), Some("Set Entity Definition File"));

        assert!(processor.redo(&mut doc).unwrap());
        assert_eq!(doc.state_hash(), after);
        assert_eq!(processor.undo_count(), 1);
        assert_eq!(processor.redo_count(), 0);
    }

    #[test]
    fn entity_definition_commands_do_not_collate() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        processor.submit(&mut doc, set_defs("b.fgd")).unwrap();
        assert_eq!(processor.undo_count(), 2);

        processor.undo(&mut doc).unwrap();
        assert_eq!(
            doc.worldspawn().property(property_keys::ENTITY_DEFINITIONS),
            Some("builtin:a.fgd")
        );
    }

    #[test]
    fn property_edits_collate() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let light = doc.add_entity("light");

        for value in ["100", "200", "300"] {
            processor
                .submit(&mut doc, Box::new(SetPropertyCommand::set(light, "light", value)))
                .unwrap();
        }
        assert_eq!(processor.undo_count(), 1);
        assert_eq!(doc.entity(light).unwrap().property("light"), Some("300"));

        processor.undo(&mut doc).unwrap();
        assert!(!doc.entity(light).unwrap().has_property("light"));

        processor.redo(&mut doc).unwrap();
        assert_eq!(doc.entity(light).unwrap().property("light"), Some("300"));
    }

    #[test]
    fn redo_cleared_on_new_command() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        processor.undo(&mut doc).unwrap();
        assert!(processor.can_redo());

        processor.submit(&mut doc, set_defs("b.fgd")).unwrap();
        assert!(!processor.can_redo());
    }

    #[test]
    fn undo_empty_returns_false() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        assert!(!processor.undo(&mut doc).unwrap());
        assert!(!processor.redo(&mut doc).unwrap());
    }

    #[test]
    fn failed_command_is_not_stored() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let result = processor.submit(
            &mut doc,
            Box::new(SetPropertyCommand::set(mapwright_common::NodeId::new(), "k", "v")),
        );
        assert!(result.is_err());
        assert!(!processor.can_undo());
    }

    #[test]
    fn group_is_one_undo_step() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let ws = doc.worldspawn_id();
        let before = doc.state_hash();

        processor.begin_group("Configure Map");
        processor.submit(&mut doc, set_defs("Quake.fgd")).unwrap();
        processor
            .submit(&mut doc, Box::new(SetPropertyCommand::set(ws, "wad", "base.wad")))
            .unwrap();
        assert!(matches!(
            processor.undo(&mut doc),
            Err(CommandError::GroupOpen(_))
        ));
        processor.end_group().unwrap();

        assert_eq!(processor.undo_count(), 1);
        assert_eq!(processor.undo_name(), Some("Configure Map"));
        processor.undo(&mut doc).unwrap();
        assert_eq!(doc.state_hash(), before);
    }

    #[test]
    fn nested_groups_fold_into_outermost() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor.begin_group("outer");
        processor.begin_group("inner");
        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        processor.end_group().unwrap();
        assert!(processor.is_group_open());
        processor.submit(&mut doc, set_defs("b.fgd")).unwrap();
        processor.end_group().unwrap();
        assert!(!processor.is_group_open());
        assert_eq!(processor.undo_count(), 1);
        assert_eq!(processor.undo_name(), Some("outer"));
    }

    #[test]
    fn rollback_group_reverts_and_discards() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let brush = doc.add_brush(BrushNode::cuboid(Vec3::ZERO, Vec3::splat(16.0), "base"));
        let before = doc.state_hash();
        let v = VertexRef::new(brush, 7);

        processor.begin_group("Move Vertices");
        for _ in 0..3 {
            processor
                .submit(&mut doc, Box::new(MoveVerticesCommand::new([v], Vec3::X)))
                .unwrap();
        }
        assert_eq!(doc.vertex_position(v).unwrap(), Vec3::new(19.0, 16.0, 16.0));
        processor.rollback_group(&mut doc).unwrap();

        assert_eq!(doc.state_hash(), before);
        assert!(!processor.can_undo());
        assert!(matches!(
            processor.end_group(),
            Err(CommandError::NoOpenGroup)
        ));
    }

    #[test]
    fn empty_group_stores_nothing() {
        let mut processor = CommandProcessor::new();
        processor.begin_group("nothing");
        processor.end_group().unwrap();
        assert!(!processor.can_undo());
    }

    #[test]
    fn max_undo_levels_trims_oldest() {
        let mut doc = MapDocument::new();
        let config = EditorConfig {
            max_undo_levels: 2,
            ..EditorConfig::default()
        };
        let mut processor = CommandProcessor::from_config(&config);
        for name in ["a.fgd", "b.fgd", "c.fgd"] {
            processor.submit(&mut doc, set_defs(name)).unwrap();
        }
        assert_eq!(processor.undo_count(), 2);
        processor.undo(&mut doc).unwrap();
        processor.undo(&mut doc).unwrap();
        assert_eq!(doc.entity_definition_file(), EntityDefinitionFileSpec::builtin("a.fgd"));
    }

    #[test]
    fn non_undoable_command_is_performed_but_not_stored() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor
            .submit(&mut doc, Box::new(NoteCommand::new(false, true)))
            .unwrap();
        assert_eq!(doc.worldspawn().property("_note"), Some("x"));
        assert!(!processor.can_undo());
        assert!(processor.is_modified());
    }

    #[test]
    fn modification_count_follows_undo_steps() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let light = doc.add_entity("light");
        assert!(!processor.is_modified());

        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        for value in ["100", "200"] {
            processor
                .submit(&mut doc, Box::new(SetPropertyCommand::set(light, "light", value)))
                .unwrap();
        }
        processor
            .submit(&mut doc, Box::new(NoteCommand::new(true, false)))
            .unwrap();
        assert_eq!(processor.undo_count(), 3);
        assert_eq!(processor.modification_count(), 2);

        processor.undo(&mut doc).unwrap();
        processor.undo(&mut doc).unwrap();
        assert_eq!(processor.modification_count(), 1);
        processor.redo(&mut doc).unwrap();
        assert_eq!(processor.modification_count(), 2);

        processor.reset_modification_count();
        assert!(!processor.is_modified());
        processor.undo(&mut doc).unwrap();
        assert!(processor.is_modified());
    }

    #[test]
    fn group_counts_as_one_modification() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        processor.begin_group("Configure Map");
        processor.submit(&mut doc, set_defs("a.fgd")).unwrap();
        processor.submit(&mut doc, set_defs("b.fgd")).unwrap();
        assert_eq!(processor.modification_count(), 0);
        processor.end_group().unwrap();
        assert_eq!(processor.modification_count(), 1);

        processor.begin_group("Abandoned");
        processor.submit(&mut doc, set_defs("c.fgd")).unwrap();
        processor.rollback_group(&mut doc).unwrap();
        assert_eq!(processor.modification_count(), 1);
    }

    #[test]
    fn failed_group_undo_leaves_group_applied() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let ws = doc.worldspawn_id();
        let before = doc.state_hash();

        let flaky = NoteCommand::new(true, false);
        let fail_undo = Rc::clone(&flaky.fail_undo);
        processor.begin_group("Configure Map");
        processor
            .submit(&mut doc, Box::new(SetPropertyCommand::set(ws, "wad", "base.wad")))
            .unwrap();
        processor.submit(&mut doc, Box::new(flaky)).unwrap();
        processor
            .submit(&mut doc, Box::new(SetPropertyCommand::set(ws, "message", "hi")))
            .unwrap();
        processor.end_group().unwrap();
        let after = doc.state_hash();

        fail_undo.set(true);
        assert!(processor.undo(&mut doc).is_err());
        assert_eq!(doc.state_hash(), after);
        assert_eq!(processor.undo_count(), 1);

        fail_undo.set(false);
        assert!(processor.undo(&mut doc).unwrap());
        assert_eq!(doc.state_hash(), before);
    }

    #[test]
    fn failed_rollback_keeps_group_open() {
        let mut doc = MapDocument::new();
        let mut processor = CommandProcessor::new();
        let ws = doc.worldspawn_id();

        let flaky = NoteCommand::new(true, false);
        let fail_undo = Rc::clone(&flaky.fail_undo);
        processor.begin_group("Edit");
        processor.submit(&mut doc, Box::new(flaky)).unwrap();
        processor
            .submit(&mut doc, Box::new(SetPropertyCommand::set(ws, "wad", "base.wad")))
            .unwrap();

        fail_undo.set(true);
        assert!(processor.rollback_group(&mut doc).is_err());
        assert!(processor.is_group_open());
        assert_eq!(doc.worldspawn().property("wad"), Some("base.wad"));

        fail_undo.set(false);
        processor.rollback_group(&mut doc).unwrap();
        assert!(!doc.worldspawn().has_property("wad"));
    }
}
