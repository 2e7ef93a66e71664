use mapwright_common::NodeId;
use mapwright_model::{EntityDefinitionFileSpec, MapDocument};

/// Read-only queries against a map document for debugging and the CLI.
pub struct MapInspector;

impl MapInspector {
    /// Produce a summary of the document.
    pub fn summary(document: &MapDocument) -> MapSummary {
        MapSummary {
            entity_count: document.entity_count(),
            brush_count: document.brushes().len(),
            patch_count: document.patches().len(),
            entity_definitions: document.entity_definition_file(),
            worldspawn_properties: document.worldspawn().properties().len(),
            pending_events: document.events().len(),
        }
    }

    pub fn inspect_entity(document: &MapDocument, id: NodeId) -> Option<EntityInfo> {
        document.entity(id).map(|entity| EntityInfo {
            id,
            classname: entity.classname().unwrap_or_default().to_string(),
            properties: entity
                .properties()
                .iter()
                .map(|p| (p.key.clone(), p.value.clone()))
                .collect(),
        })
    }

    /// All entity ids, worldspawn first.
    pub fn list_entities(document: &MapDocument) -> Vec<NodeId> {
        document.entities().map(|e| e.id()).collect()
    }
}

/// Counts and settings of a map document.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub entity_count: usize,
    pub brush_count: usize,
    pub patch_count: usize,
    pub entity_definitions: EntityDefinitionFileSpec,
    pub worldspawn_properties: usize,
    pub pending_events: usize,
}

impl std::fmt::Display for MapSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let defs = if self.entity_definitions.is_set() {
            self.entity_definitions.to_string()
        } else {
            "<unset>".to_string()
        };
        write!(
            f,
            "Map: entities={} brushes={} patches={} worldspawn_properties={} defs={}",
            self.entity_count, self.brush_count, self.patch_count, self.worldspawn_properties, defs
        )
    }
}

/// Properties of a single entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: NodeId,
    pub classname: String,
    pub properties: Vec<(String, String)>,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity [{}] {} ({} properties)",
            self.id.short(),
            self.classname,
            self.properties.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mapwright_model::BrushNode;

    #[test]
    fn summary_new_document() {
        let doc = MapDocument::new();
        let summary = MapInspector::summary(&doc);
        assert_eq!(summary.entity_count, 1);
        assert_eq!(summary.brush_count, 0);
        assert_eq!(summary.entity_definitions, EntityDefinitionFileSpec::Unset);
        assert_eq!(summary.worldspawn_properties, 1);
    }

    #[test]
    fn summary_counts_nodes() {
        let mut doc = MapDocument::new();
        doc.add_entity("light");
        doc.add_brush(BrushNode::cuboid(Vec3::ZERO, Vec3::ONE, "base"));
        let summary = MapInspector::summary(&doc);
        assert_eq!(summary.entity_count, 2);
        assert_eq!(summary.brush_count, 1);
        assert_eq!(summary.pending_events, 2);
    }

    #[test]
    fn inspect_entity_found_and_missing() {
        let mut doc = MapDocument::new();
        let light = doc.add_entity("light");
        let info = MapInspector::inspect_entity(&doc, light).unwrap();
        assert_eq!(info.classname, "light");
        assert!(MapInspector::inspect_entity(&doc, NodeId::new()).is_none());
    }

    #[test]
    fn list_entities_starts_with_worldspawn() {
        let mut doc = MapDocument::new();
        let light = doc.add_entity("light");
        let ids = MapInspector::list_entities(&doc);
        assert_eq!(ids, vec![doc.worldspawn_id(), light]);
    }

    #[test]
    fn summary_display() {
        let mut doc = MapDocument::new();
        doc.worldspawn_mut().add_or_update_property(
            mapwright_model::property_keys::ENTITY_DEFINITIONS,
            "builtin:Quake.fgd",
        );
        let s = MapInspector::summary(&doc).to_string();
        assert!(s.contains("entities=1"));
        assert!(s.contains("defs=builtin:Quake.fgd"));
    }
}
