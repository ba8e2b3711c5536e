use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use scenefs::Storage;

use crate::{
    codec::CodecTable,
    export::{export_project, Assembled, ExportError},
    interaction::InteractionToggle,
    overlay::{overlay_scene, OverlayError, OverlaySummary},
    project::ProjectDocument,
    reconcile::{reconcile, ImportError, ImportReport},
    removed::{RemoveError, RemovedObjects, Tombstone},
    scene::{Entity, GraphError, SceneGraph},
    store,
};

/// Contains all of the state for one open scene: the live graph, the
/// registry of deleted entities, the stashed interaction handlers, and the
/// guard that keeps exports from overlapping.
///
/// Locks are always taken in the order graph, removed objects, interactions.
pub struct AuthoringSession {
    codecs: CodecTable,

    /// The live scene. Every entity in it is either untagged, matching the
    /// baseline, or tagged with how it differs.
    graph: Mutex<SceneGraph>,

    /// Baseline entities deleted during this session.
    removed: Mutex<RemovedObjects>,

    /// Interaction handlers not currently attached to their meshes.
    interactions: Mutex<InteractionToggle>,

    /// Set while an export is running.
    exporting: AtomicBool,
}

impl AuthoringSession {
    /// Starts a session on the default scene.
    pub fn new(codecs: CodecTable) -> Self {
        AuthoringSession {
            codecs,
            graph: Mutex::new(SceneGraph::default_scene()),
            removed: Mutex::new(RemovedObjects::new()),
            interactions: Mutex::new(InteractionToggle::new()),
            exporting: AtomicBool::new(false),
        }
    }

    pub fn codecs(&self) -> &CodecTable {
        &self.codecs
    }

    pub fn graph(&self) -> MutexGuard<'_, SceneGraph> {
        self.graph.lock().unwrap()
    }

    pub fn removed_objects(&self) -> MutexGuard<'_, RemovedObjects> {
        self.removed.lock().unwrap()
    }

    /// Replaces the session's scene with a freshly loaded baseline and then
    /// applies a project document to it, if there is one.
    ///
    /// When the document cannot be applied at all, the session falls back to
    /// the default scene and the error is returned.
    pub fn load(
        &self,
        baseline: SceneGraph,
        document: Option<&ProjectDocument>,
    ) -> Result<ImportReport, ImportError> {
        let mut graph = self.graph.lock().unwrap();
        let mut removed = self.removed.lock().unwrap();
        let mut interactions = self.interactions.lock().unwrap();

        *graph = baseline;
        removed.clear();
        interactions.clear();

        let report = match document {
            Some(document) => {
                match reconcile(&mut graph, &self.codecs, &mut removed, document) {
                    Ok(report) => report,
                    Err(err) => {
                        log::warn!("Falling back to the default scene: {}", err);

                        *graph = SceneGraph::default_scene();
                        removed.clear();
                        return Err(err);
                    }
                }
            }
            None => ImportReport::default(),
        };

        // Stash the scene's own handlers so they are not live while editing.
        interactions.toggle(&mut graph);

        Ok(report)
    }

    /// Loads a baseline scene file and, if it exists, the project document
    /// stored at `project_path`.
    pub fn open(
        &self,
        storage: &Storage,
        scene_path: &Path,
        project_path: &Path,
    ) -> Result<ImportReport, ImportError> {
        let baseline = store::load_scene_file(storage, scene_path, &self.codecs)?;

        let document = if storage.exists(project_path).unwrap_or(false) {
            Some(store::load_project(storage, project_path)?)
        } else {
            None
        };

        self.load(baseline, document.as_ref())
    }

    /// Begins an export, failing if another one is already running. The
    /// export slot is released when the returned guard is dropped.
    pub fn begin_export(&self) -> Result<ExportGuard<'_>, ExportError> {
        self.exporting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::ConcurrentExportRejected)?;

        Ok(ExportGuard {
            flag: &self.exporting,
        })
    }

    /// Assembles the project document for the current scene.
    pub fn export(&self) -> Result<Assembled, ExportError> {
        let _guard = self.begin_export()?;

        Ok(self.assemble())
    }

    /// Exports and writes the project document to `path`. Nothing is written
    /// if any entity failed to serialize.
    ///
    /// The export slot is held until the write finishes, so an older
    /// document can never overwrite a newer one.
    pub fn save(&self, storage: &Storage, path: &Path) -> Result<ProjectDocument, ExportError> {
        let _guard = self.begin_export()?;

        let document = self.assemble().into_document()?;
        store::save_project(storage, path, &document)?;

        Ok(document)
    }

    /// Callers must hold the export slot.
    fn assemble(&self) -> Assembled {
        let mut graph = self.graph.lock().unwrap();
        let removed = self.removed.lock().unwrap();
        let mut interactions = self.interactions.lock().unwrap();

        export_project(&mut graph, &mut interactions, &self.codecs, &removed)
    }

    /// Adds a new entity to the scene. An id that was previously deleted is
    /// free to be reused.
    pub fn add_entity(&self, entity: Entity) -> Result<(), GraphError> {
        let mut graph = self.graph.lock().unwrap();
        let mut removed = self.removed.lock().unwrap();

        let id = entity.id.clone();
        graph.add(entity)?;

        if removed.forget(&id).is_some() {
            log::debug!("Entity {} reuses a deleted id", id);
        }

        Ok(())
    }

    pub fn edit_entity<F, R>(&self, id: &str, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut Entity) -> R,
    {
        self.graph.lock().unwrap().edit(id, mutate)
    }

    pub fn remove_entity(&self, id: &str) -> Result<Option<Tombstone>, RemoveError> {
        let mut graph = self.graph.lock().unwrap();
        let mut removed = self.removed.lock().unwrap();
        let mut interactions = self.interactions.lock().unwrap();

        let tombstone = removed.remove(&mut graph, &self.codecs, id)?;
        interactions.forget(id);

        Ok(tombstone)
    }

    /// Makes the session's scene match an edited copy of it, recording every
    /// difference as if it had been made interactively.
    pub fn apply_live_scene(&self, live: SceneGraph) -> Result<OverlaySummary, OverlayError> {
        let mut graph = self.graph.lock().unwrap();
        let mut removed = self.removed.lock().unwrap();
        let mut interactions = self.interactions.lock().unwrap();

        // The live copy carries the scene's handlers, so they are compared
        // while attached.
        interactions.toggle(&mut graph);
        let result = overlay_scene(
            &mut graph,
            &mut removed,
            &mut interactions,
            &self.codecs,
            live,
        );
        interactions.toggle(&mut graph);

        result
    }

    pub fn toggle_interactions(&self) {
        let mut graph = self.graph.lock().unwrap();
        let mut interactions = self.interactions.lock().unwrap();

        interactions.toggle(&mut graph);
    }
}

/// Holds the session's export slot.
pub struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use scenefs::InMemoryStorage;
    use serde_json::json;

    use crate::scene::{load_scene, EntityKind, InteractionHandler, SceneFile};

    fn baseline() -> SceneGraph {
        let file: SceneFile = serde_json::from_value(json!({
            "entities": [
                { "type": "Mesh", "id": "cube1", "name": "Cube", "castShadow": false },
                { "type": "Mesh", "id": "door", "actions": { "onPick": "open" } },
            ],
        }))
        .unwrap();

        load_scene(file, &CodecTable::standard()).unwrap()
    }

    #[test]
    fn overlapping_exports_are_rejected() {
        let session = AuthoringSession::new(CodecTable::standard());

        let guard = session.begin_export().unwrap();
        assert!(matches!(
            session.export(),
            Err(ExportError::ConcurrentExportRejected)
        ));

        drop(guard);
        assert!(session.export().is_ok());
        assert!(session.export().is_ok());
    }

    #[test]
    fn save_holds_the_export_slot() {
        let session = AuthoringSession::new(CodecTable::standard());
        let storage = Storage::new(InMemoryStorage::new());
        let path = Path::new("/work/scene.editorproject");

        let guard = session.begin_export().unwrap();
        assert!(matches!(
            session.save(&storage, path),
            Err(ExportError::ConcurrentExportRejected)
        ));
        assert!(!storage.exists(path).unwrap());

        drop(guard);
        session.save(&storage, path).unwrap();
        assert!(storage.exists(path).unwrap());
        assert!(session.begin_export().is_ok());
    }

    #[test]
    fn load_stashes_scene_handlers() {
        let session = AuthoringSession::new(CodecTable::standard());
        session.load(baseline(), None).unwrap();

        assert!(session.graph().get("door").unwrap().handler.is_none());

        session.toggle_interactions();
        assert_eq!(
            session.graph().get("door").unwrap().handler,
            Some(InteractionHandler::new(json!({ "onPick": "open" })))
        );
    }

    #[test]
    fn fatal_import_falls_back_to_default_scene() {
        let session = AuthoringSession::new(CodecTable::standard());
        let document: ProjectDocument = serde_json::from_value(json!({
            "globalConfiguration": { "clearColor": "blue" },
        }))
        .unwrap();

        let result = session.load(baseline(), Some(&document));

        assert!(matches!(result, Err(ImportError::GlobalConfiguration { .. })));
        assert!(!session.graph().contains("cube1"));
        assert!(session.graph().editor_camera().is_some());
    }

    #[test]
    fn reused_ids_lose_their_tombstone() {
        let session = AuthoringSession::new(CodecTable::standard());
        session.load(baseline(), None).unwrap();

        assert!(session.remove_entity("cube1").unwrap().is_some());
        assert!(session.removed_objects().is_tombstoned("cube1"));

        session
            .add_entity(Entity::new(EntityKind::Light, "cube1"))
            .unwrap();
        assert!(!session.removed_objects().is_tombstoned("cube1"));
    }

    #[test]
    fn removed_mesh_takes_its_handler_along() {
        let session = AuthoringSession::new(CodecTable::standard());
        session.load(baseline(), None).unwrap();

        session.remove_entity("door").unwrap();
        session
            .add_entity(Entity::new(EntityKind::Mesh, "door"))
            .unwrap();

        session.toggle_interactions();
        assert_eq!(session.graph().get("door").unwrap().handler, None);
    }

    #[test]
    fn live_scene_handlers_are_compared_attached() {
        let session = AuthoringSession::new(CodecTable::standard());
        session.load(baseline(), None).unwrap();

        let live: SceneFile = serde_json::from_value(json!({
            "entities": [
                { "type": "Mesh", "id": "cube1", "name": "Cube", "castShadow": false },
                { "type": "Mesh", "id": "door", "actions": { "onPick": "slam" } },
            ],
        }))
        .unwrap();
        let live = load_scene(live, &CodecTable::standard()).unwrap();

        let summary = session.apply_live_scene(live).unwrap();
        assert_eq!(summary, OverlaySummary::default());

        let document = session.export().unwrap().into_document().unwrap();
        assert_eq!(document.nodes.len(), 1);
        assert_eq!(document.nodes[0].id, "door");
        assert_eq!(document.nodes[0].extra.actions, Some(json!({ "onPick": "slam" })));
        assert!(document.removed_objects.is_empty());
    }

    #[test]
    fn edits_show_up_in_export() {
        let session = AuthoringSession::new(CodecTable::standard());
        session.load(baseline(), None).unwrap();

        session.edit_entity("cube1", |cube| {
            cube.fields.insert("castShadow".to_owned(), json!(true));
        });

        let document = session.export().unwrap().into_document().unwrap();
        assert_eq!(document.nodes.len(), 1);
        assert_eq!(
            document.nodes[0].serialization_object.as_ref().unwrap()["castShadow"],
            json!(true)
        );
    }
}
