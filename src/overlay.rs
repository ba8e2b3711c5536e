//! Folds an edited copy of a scene back onto its baseline, tagging every
//! difference the way interactive edits would have.
//!
//! Used by `scenepatch export`, where the edits arrive as a second scene file
//! instead of through an editor.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    codec::CodecTable,
    diff::value_eq,
    interaction::InteractionToggle,
    removed::{RemoveError, RemovedObjects},
    scene::{
        AssetEntry, ChangeTag, ChangeTags, Entity, EntityMetadata, GraphError,
        InteractionHandler, PhysicsImpostor, SceneGraph,
    },
};

/// What an overlay changed in the baseline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Remove(#[from] RemoveError),
}

/// Makes `graph` match `live`.
///
/// Entities are paired by id. Paired entities whose name or fields differ are
/// edited; animations, physics impostors, and handlers that differ are
/// attached as added records. Entities only in `live` are added and entities
/// only in `graph` are removed through the registry, leaving tombstones.
/// An entity whose kind changed is removed and added again.
pub fn overlay_scene(
    graph: &mut SceneGraph,
    removed: &mut RemovedObjects,
    interactions: &mut InteractionToggle,
    codecs: &CodecTable,
    live: SceneGraph,
) -> Result<OverlaySummary, OverlayError> {
    let mut summary = OverlaySummary::default();

    for id in graph.ids() {
        let replaced = match live.get(&id) {
            Some(live_entity) => graph
                .get(&id)
                .map_or(false, |entity| entity.kind != live_entity.kind),
            None => true,
        };

        if replaced && graph.contains(&id) {
            log::trace!("Overlay removes {}", id);
            removed.remove(graph, codecs, &id)?;
            interactions.forget(&id);
            summary.removed += 1;
        }
    }

    for live_entity in live.iter() {
        let id = live_entity.id.as_str();

        let base = match graph.get(id) {
            Some(base) => base,
            None => {
                graph.add(fresh(live_entity))?;
                removed.forget(id);
                summary.added += 1;
                continue;
            }
        };

        if base.name != live_entity.name || !fields_eq(&base.fields, &live_entity.fields) {
            let name = live_entity.name.clone();
            let fields = live_entity.fields.clone();

            graph.edit(id, |entity| {
                entity.name = name;
                entity.fields = fields;
            });
            summary.modified += 1;
        }

        if let Some(entity) = graph.get_mut(id) {
            overlay_aux(entity, live_entity);
        }
    }

    graph.global = live.global;
    graph.custom_metadata = live.custom_metadata;
    graph.files = live.files;
    overlay_assets(graph, live.assets);

    Ok(summary)
}

/// A copy of a live entity with no baseline attached. Everything it carries
/// is new.
fn fresh(live: &Entity) -> Entity {
    let mut metadata = EntityMetadata::new()
        .placeholder_emitter(live.metadata.placeholder_emitter)
        .editor_camera(live.metadata.editor_camera);
    metadata.user = live.metadata.user.clone();

    let mut entity = live.clone().metadata(metadata);

    for animation in &mut entity.animations {
        animation.tags = ChangeTags::added();
    }
    if let Some(physics) = &mut entity.physics {
        physics.tags = ChangeTags::added();
    }
    if let Some(handler) = &mut entity.handler {
        handler.tags = ChangeTags::added();
    }

    entity
}

fn fields_eq(base: &Map<String, Value>, live: &Map<String, Value>) -> bool {
    base.len() == live.len()
        && base
            .iter()
            .all(|(key, value)| live.get(key).map_or(false, |other| value_eq(value, other)))
}

fn overlay_aux(entity: &mut Entity, live: &Entity) {
    for animation in &live.animations {
        let unchanged = entity.animations.iter().any(|existing| {
            existing.name == animation.name
                && value_eq(
                    &Value::Object(existing.data.clone()),
                    &Value::Object(animation.data.clone()),
                )
        });

        if !unchanged {
            entity.animations.retain(|existing| existing.name != animation.name);
            entity
                .animations
                .push(animation.clone().tagged(ChangeTag::Added));
        }
    }

    if let Some(physics) = &live.physics {
        if !entity.physics.as_ref().map_or(false, |p| physics_eq(p, physics)) {
            entity.physics = Some(physics.clone().tagged(ChangeTag::Added));
        }
    }

    if let Some(handler) = &live.handler {
        if !entity.handler.as_ref().map_or(false, |h| handler_eq(h, handler)) {
            entity.handler = Some(handler.clone().tagged(ChangeTag::Added));
        }
    }
}

fn physics_eq(a: &PhysicsImpostor, b: &PhysicsImpostor) -> bool {
    PhysicsImpostor {
        tags: ChangeTags::default(),
        ..a.clone()
    } == PhysicsImpostor {
        tags: ChangeTags::default(),
        ..b.clone()
    }
}

fn handler_eq(a: &InteractionHandler, b: &InteractionHandler) -> bool {
    value_eq(&a.actions, &b.actions)
}

fn overlay_assets(graph: &mut SceneGraph, live: BTreeMap<String, Vec<AssetEntry>>) {
    for (component, entries) in live {
        let existing = graph.assets.entry(component).or_default();

        for entry in entries {
            match existing.iter_mut().find(|base| base.name == entry.name) {
                Some(base) => {
                    if !value_eq(&base.data, &entry.data) {
                        base.data = entry.data;
                        base.tags.tag(ChangeTag::Modified);
                    }
                }
                None => {
                    let mut entry = entry;
                    entry.tags = ChangeTags::added();
                    existing.push(entry);
                }
            }
        }
    }
}
