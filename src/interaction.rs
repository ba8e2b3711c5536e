use std::collections::HashMap;

use crate::scene::{InteractionHandler, SceneGraph};

/// Swaps the interaction handlers attached to meshes with a stashed set.
///
/// The editor keeps its own handlers attached while authoring and the
/// scene's handlers stashed; toggling before and after serialization means
/// the scene's handlers are the ones written out.
#[derive(Debug, Default)]
pub struct InteractionToggle {
    stashed: HashMap<String, InteractionHandler>,
}

impl InteractionToggle {
    pub fn new() -> Self {
        InteractionToggle::default()
    }

    /// Exchanges every mesh's live handler with its stashed one. Calling this
    /// twice in a row leaves the graph and the stash as they were.
    pub fn toggle(&mut self, graph: &mut SceneGraph) {
        let mesh_ids: Vec<String> = graph
            .iter()
            .filter(|entity| entity.kind.is_mesh())
            .map(|entity| entity.id.clone())
            .collect();

        for id in mesh_ids {
            let entity = match graph.get_mut(&id) {
                Some(entity) => entity,
                None => continue,
            };

            let incoming = self.stashed.remove(&id);
            if let Some(outgoing) = std::mem::replace(&mut entity.handler, incoming) {
                self.stashed.insert(id, outgoing);
            }
        }
    }

    pub fn stashed(&self, id: &str) -> Option<&InteractionHandler> {
        self.stashed.get(id)
    }

    /// Drops whatever is stashed for a mesh that is going away, so a later
    /// mesh reusing its id starts with nothing.
    pub fn forget(&mut self, id: &str) -> Option<InteractionHandler> {
        self.stashed.remove(id)
    }

    pub fn clear(&mut self) {
        self.stashed.clear();
    }
}
