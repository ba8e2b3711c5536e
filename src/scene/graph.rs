use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    Category, ChangeTag, ChangeTags, Entity, EntityKind, EntityMetadata, GlobalConfiguration,
};

/// The live, mutable set of entities in an open scene, along with the
/// scene-wide state that is saved next to them.
///
/// Iteration always follows insertion order, so exported documents list
/// entities in a stable order.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    entities: HashMap<String, Entity>,
    order: Vec<String>,

    pub global: GlobalConfiguration,

    /// Editor asset components, keyed by component id.
    pub assets: BTreeMap<String, Vec<AssetEntry>>,

    /// Arbitrary user data stored alongside the scene.
    pub custom_metadata: Map<String, Value>,

    /// Files that belong to the scene on disk.
    pub files: Vec<SceneFileEntry>,

    /// Name of the file the baseline scene was loaded from.
    pub scene_file_name: Option<String>,
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph::default()
    }

    /// The scene an editor falls back to when a project cannot be loaded: an
    /// editor camera and a single light.
    pub fn default_scene() -> Self {
        let mut graph = SceneGraph::new();

        let camera = Entity::new(EntityKind::Camera, "editorCamera")
            .name("Editor Camera")
            .field("position", vec![0.0, 5.0, -10.0])
            .metadata(EntityMetadata::new().editor_camera(true));

        let light = Entity::new(EntityKind::Light, "defaultLight")
            .name("Default Light")
            .field("direction", vec![0.0, 1.0, 0.0])
            .field("intensity", 0.7);

        for entity in [camera, light] {
            graph.order.push(entity.id.clone());
            graph.entities.insert(entity.id.clone(), entity);
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Gives raw access to an entity. Changes made through this reference are
    /// not tagged; use [`SceneGraph::edit`] for user-facing mutations.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<&Entity> {
        self.iter()
            .find(|entity| entity.kind == kind && entity.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(move |id| self.entities.get(id))
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn iter_category(&self, category: Category) -> impl Iterator<Item = &Entity> {
        self.iter()
            .filter(move |entity| entity.kind.category() == Some(category))
    }

    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.iter().filter(move |entity| entity.parent_id() == Some(id))
    }

    pub fn editor_camera(&self) -> Option<&Entity> {
        self.iter().find(|entity| entity.metadata.editor_camera)
    }

    /// Inserts an entity as-is, keeping whatever tags it already carries.
    pub fn insert(&mut self, entity: Entity) -> Result<(), GraphError> {
        if self.entities.contains_key(&entity.id) {
            return Err(GraphError::DuplicateId { id: entity.id });
        }

        self.order.push(entity.id.clone());
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Inserts a brand new entity and tags it as added.
    pub fn add(&mut self, mut entity: Entity) -> Result<(), GraphError> {
        entity.metadata.tag(ChangeTag::Added);
        self.insert(entity)
    }

    /// Applies a user mutation to an entity and tags it as modified.
    pub fn edit<F, R>(&mut self, id: &str, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut Entity) -> R,
    {
        let entity = self.entities.get_mut(id)?;
        let result = mutate(entity);
        entity.metadata.tag(ChangeTag::Modified);

        Some(result)
    }

    pub fn set_field(&mut self, id: &str, field: &str, value: impl Into<Value>) -> bool {
        let value = value.into();

        self.edit(id, |entity| {
            entity.fields.insert(field.to_owned(), value);
        })
        .is_some()
    }

    /// Removes an entity from the graph without any bookkeeping.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.order.retain(|existing| existing != id);

        Some(entity)
    }
}

/// One entry of an editor asset component.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub name: String,
    pub data: Value,
    pub tags: ChangeTags,
}

impl AssetEntry {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        AssetEntry {
            name: name.into(),
            data,
            tags: ChangeTags::default(),
        }
    }
}

/// A file stored next to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFileEntry {
    pub name: String,

    #[serde(default)]
    pub do_not_export: bool,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("an entity with id '{id}' already exists in the scene")]
    DuplicateId { id: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iteration_follows_insertion_order() {
        let mut graph = SceneGraph::new();
        graph.insert(Entity::new(EntityKind::Mesh, "b")).unwrap();
        graph.insert(Entity::new(EntityKind::Light, "a")).unwrap();
        graph.insert(Entity::new(EntityKind::Material, "c")).unwrap();

        let ids: Vec<_> = graph.iter().map(|entity| entity.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        graph.remove("a");
        let ids: Vec<_> = graph.iter().map(|entity| entity.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn edit_tags_modified() {
        let mut graph = SceneGraph::new();
        graph.insert(Entity::new(EntityKind::Mesh, "cube")).unwrap();

        assert!(graph.set_field("cube", "castShadow", true));
        assert!(graph.get("cube").unwrap().metadata.is_modified());
        assert!(!graph.set_field("missing", "castShadow", true));
    }

    #[test]
    fn edit_keeps_added() {
        let mut graph = SceneGraph::new();
        graph.add(Entity::new(EntityKind::Light, "L9")).unwrap();
        graph.set_field("L9", "intensity", 2.0);

        assert!(graph.get("L9").unwrap().metadata.is_added());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut graph = SceneGraph::new();
        graph.insert(Entity::new(EntityKind::Mesh, "cube")).unwrap();

        assert!(matches!(
            graph.insert(Entity::new(EntityKind::Light, "cube")),
            Err(GraphError::DuplicateId { .. })
        ));
    }

    #[test]
    fn default_scene_has_editor_camera() {
        let graph = SceneGraph::default_scene();
        assert_eq!(graph.editor_camera().unwrap().id, "editorCamera");
        assert_eq!(graph.len(), 2);
    }
}
