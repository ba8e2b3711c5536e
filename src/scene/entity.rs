//! Defines the structure of a single entity in the scene graph.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ChangeTag, ChangeTags, EntityKind, EntityMetadata};

/// A node, material, texture, or any other identifiable thing in a scene.
///
/// Engine-owned properties live in `fields`, keyed by their serialized name.
/// Reference fields hold the id of the entity they point at.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Stable identifier, unique across the whole graph.
    pub id: String,

    /// Human readable name. Not required to be unique.
    pub name: String,

    pub kind: EntityKind,

    /// All other properties of the entity, weakly-typed.
    pub fields: Map<String, Value>,

    /// Change tracking and editor bookkeeping for this entity.
    pub metadata: EntityMetadata,

    /// Animations attached to this node.
    pub animations: Vec<Animation>,

    /// Physics impostor attached to this node, if any.
    pub physics: Option<PhysicsImpostor>,

    /// Interaction handler attached to this mesh, if any.
    pub handler: Option<InteractionHandler>,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        let id = id.into();

        Entity {
            name: id.clone(),
            id,
            kind,
            fields: Map::new(),
            metadata: EntityMetadata::new(),
            animations: Vec::new(),
            physics: None,
            handler: None,
        }
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn metadata(self, metadata: EntityMetadata) -> Self {
        Self { metadata, ..self }
    }

    pub fn animation(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    pub fn physics(self, physics: PhysicsImpostor) -> Self {
        Self {
            physics: Some(physics),
            ..self
        }
    }

    pub fn handler(self, handler: InteractionHandler) -> Self {
        Self {
            handler: Some(handler),
            ..self
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the id held by a reference field, if it holds one.
    pub fn link(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.link("parentId")
    }

    /// The ids of every entity this one refers to through its schema's
    /// reference fields.
    pub fn referenced_ids(&self) -> Vec<(&'static str, &str)> {
        self.kind
            .reference_fields()
            .filter_map(|(field, _)| self.link(field).map(|target| (field, target)))
            .collect()
    }

    /// Whether any animation, physics impostor, or handler on this entity
    /// was added since the baseline.
    pub fn has_added_aux(&self) -> bool {
        self.animations.iter().any(|animation| animation.tags.is_added())
            || self.physics.as_ref().map_or(false, |p| p.tags.is_added())
            || self.handler.as_ref().map_or(false, |h| h.tags.is_added())
    }
}

/// An animation attached to a node. The keyframe data is opaque here.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub data: Map<String, Value>,
    pub tags: ChangeTags,
}

impl Animation {
    pub fn new(name: impl Into<String>, data: Map<String, Value>) -> Self {
        Animation {
            name: name.into(),
            data,
            tags: ChangeTags::default(),
        }
    }

    pub fn tagged(mut self, tag: ChangeTag) -> Self {
        self.tags.tag(tag);
        self
    }
}

/// Physics parameters of a node, in their persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsImpostor {
    pub physics_impostor: u32,
    pub physics_mass: f64,
    pub physics_friction: f64,
    pub physics_restitution: f64,

    #[serde(skip)]
    pub tags: ChangeTags,
}

impl PhysicsImpostor {
    pub fn new(impostor: u32, mass: f64, friction: f64, restitution: f64) -> Self {
        PhysicsImpostor {
            physics_impostor: impostor,
            physics_mass: mass,
            physics_friction: friction,
            physics_restitution: restitution,
            tags: ChangeTags::default(),
        }
    }

    pub fn tagged(mut self, tag: ChangeTag) -> Self {
        self.tags.tag(tag);
        self
    }
}

/// A set of triggered actions attached to a mesh. The action graph is kept
/// opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionHandler {
    pub actions: Value,
    pub tags: ChangeTags,
}

impl InteractionHandler {
    pub fn new(actions: Value) -> Self {
        InteractionHandler {
            actions,
            tags: ChangeTags::default(),
        }
    }

    pub fn tagged(mut self, tag: ChangeTag) -> Self {
        self.tags.tag(tag);
        self
    }
}
