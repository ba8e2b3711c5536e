//! The closed set of entity kinds a scene can hold, the project categories
//! they are exported under, and the per-kind field schema used for diffing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Discriminates every kind of entity the scene graph can contain.
///
/// The serialized form is the variant name, which is also the `type` of a
/// project fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Mesh,
    InstancedMesh,
    TransformNode,
    Light,
    Camera,
    Geometry,
    Skeleton,
    Material,
    Texture,
    ParticleSystem,
    ShadowGenerator,
    Sound,
    RenderTarget,
    ReflectionProbe,
    EffectLayer,
    GuiLayer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 16] = [
        EntityKind::Mesh,
        EntityKind::InstancedMesh,
        EntityKind::TransformNode,
        EntityKind::Light,
        EntityKind::Camera,
        EntityKind::Geometry,
        EntityKind::Skeleton,
        EntityKind::Material,
        EntityKind::Texture,
        EntityKind::ParticleSystem,
        EntityKind::ShadowGenerator,
        EntityKind::Sound,
        EntityKind::RenderTarget,
        EntityKind::ReflectionProbe,
        EntityKind::EffectLayer,
        EntityKind::GuiLayer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Mesh => "Mesh",
            EntityKind::InstancedMesh => "InstancedMesh",
            EntityKind::TransformNode => "TransformNode",
            EntityKind::Light => "Light",
            EntityKind::Camera => "Camera",
            EntityKind::Geometry => "Geometry",
            EntityKind::Skeleton => "Skeleton",
            EntityKind::Material => "Material",
            EntityKind::Texture => "Texture",
            EntityKind::ParticleSystem => "ParticleSystem",
            EntityKind::ShadowGenerator => "ShadowGenerator",
            EntityKind::Sound => "Sound",
            EntityKind::RenderTarget => "RenderTarget",
            EntityKind::ReflectionProbe => "ReflectionProbe",
            EntityKind::EffectLayer => "EffectLayer",
            EntityKind::GuiLayer => "GuiLayer",
        }
    }

    /// The project category this kind is exported under.
    ///
    /// Geometries and skeletons have no category of their own: they travel
    /// as sub-fragments of the mesh that owns them.
    pub fn category(self) -> Option<Category> {
        match self {
            EntityKind::Mesh
            | EntityKind::InstancedMesh
            | EntityKind::TransformNode
            | EntityKind::Light
            | EntityKind::Camera => Some(Category::Nodes),
            EntityKind::Geometry | EntityKind::Skeleton => None,
            EntityKind::Material => Some(Category::Materials),
            EntityKind::Texture => Some(Category::Textures),
            EntityKind::ParticleSystem => Some(Category::ParticleSystems),
            EntityKind::ShadowGenerator => Some(Category::ShadowGenerators),
            EntityKind::Sound => Some(Category::Sounds),
            EntityKind::RenderTarget | EntityKind::ReflectionProbe => {
                Some(Category::RenderTargets)
            }
            EntityKind::EffectLayer => Some(Category::EffectLayers),
            EntityKind::GuiLayer => Some(Category::Gui),
        }
    }

    pub fn is_node(self) -> bool {
        self.category() == Some(Category::Nodes)
    }

    /// Whether entities of this kind can carry an interaction handler.
    pub fn is_mesh(self) -> bool {
        matches!(self, EntityKind::Mesh | EntityKind::InstancedMesh)
    }

    /// The statically known fields of this kind and how they are compared.
    pub fn schema(self) -> &'static [(&'static str, FieldKind)] {
        use FieldKind::*;

        match self {
            EntityKind::Mesh => &[
                ("parentId", Link),
                ("geometryId", Link),
                ("skeletonId", Link),
                ("materialIds", Sequence),
                ("position", Sequence),
                ("rotation", Sequence),
                ("scaling", Sequence),
            ],
            EntityKind::InstancedMesh => &[
                ("parentId", Link),
                ("sourceMeshId", Link),
                ("position", Sequence),
                ("rotation", Sequence),
                ("scaling", Sequence),
            ],
            EntityKind::TransformNode | EntityKind::Camera => &[
                ("parentId", Link),
                ("position", Sequence),
                ("rotation", Sequence),
            ],
            EntityKind::Light => &[
                ("parentId", Link),
                ("position", Sequence),
                ("direction", Sequence),
                ("diffuse", Sequence),
                ("specular", Sequence),
            ],
            EntityKind::Material => &[
                ("diffuseTexture", EntityRef),
                ("bumpTexture", EntityRef),
                ("emissiveTexture", EntityRef),
                ("opacityTexture", EntityRef),
                ("reflectionTexture", EntityRef),
                ("specularTexture", EntityRef),
                ("ambientTexture", EntityRef),
                ("diffuseColor", Sequence),
                ("emissiveColor", Sequence),
                ("specularColor", Sequence),
            ],
            EntityKind::ParticleSystem => &[
                ("emitterId", Link),
                ("particleTexture", EntityRef),
                ("color1", Sequence),
                ("color2", Sequence),
            ],
            EntityKind::ShadowGenerator => &[("lightId", Link)],
            EntityKind::Sound => &[("connectedMeshId", Link)],
            EntityKind::Geometry => &[("positions", Sequence), ("indices", Sequence)],
            EntityKind::Skeleton => &[("bones", Sequence)],
            EntityKind::RenderTarget | EntityKind::ReflectionProbe => {
                &[("renderList", Sequence)]
            }
            EntityKind::Texture | EntityKind::EffectLayer | EntityKind::GuiLayer => &[],
        }
    }

    /// Resolves how a field of this kind is compared, given its current value.
    ///
    /// Schema entries win whenever the value has the shape the schema
    /// expects; everything else is classified by the JSON shape of the value.
    pub fn field_kind(self, field: &str, value: &Value) -> FieldKind {
        let inferred = FieldKind::of_value(value);

        let declared = self
            .schema()
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind);

        match (declared, value) {
            (Some(FieldKind::Link), Value::String(_)) => FieldKind::Link,
            (Some(FieldKind::EntityRef), Value::Object(_)) => FieldKind::EntityRef,
            (Some(FieldKind::Sequence), Value::Array(_)) => FieldKind::Sequence,
            _ => inferred,
        }
    }

    /// Fields whose values name another entity by id, either directly or as
    /// an embedded reference.
    pub fn reference_fields(self) -> impl Iterator<Item = (&'static str, FieldKind)> {
        self.schema()
            .iter()
            .copied()
            .filter(|(_, kind)| matches!(kind, FieldKind::Link | FieldKind::EntityRef))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == source)
            .ok_or_else(|| UnknownEntityKind {
                attempted: source.to_owned(),
            })
    }
}

#[derive(Debug, Error)]
#[error("Unknown entity type '{attempted}'")]
pub struct UnknownEntityKind {
    attempted: String,
}

/// How a field's current value is compared against its baseline value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Numbers, booleans, strings, and null.
    Primitive,

    /// Arrays, compared position by position and always emitted whole.
    Sequence,

    /// An embedded `{ id, name }` reference to another entity.
    EntityRef,

    /// A string id naming a parent, emitter, source, or other entity.
    Link,

    /// Any other nested object.
    Structured,
}

impl FieldKind {
    pub fn of_value(value: &Value) -> FieldKind {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                FieldKind::Primitive
            }
            Value::Array(_) => FieldKind::Sequence,
            Value::Object(_) => FieldKind::Structured,
        }
    }
}

/// The named sections of a project document that hold entity fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Nodes,
    Materials,
    Textures,
    ParticleSystems,
    ShadowGenerators,
    Sounds,
    RenderTargets,
    EffectLayers,
    Gui,
}

impl Category {
    /// The key of this category in the persisted project document.
    pub fn key(self) -> &'static str {
        match self {
            Category::Nodes => "nodes",
            Category::Materials => "materials",
            Category::Textures => "textures",
            Category::ParticleSystems => "particleSystems",
            Category::ShadowGenerators => "shadowGenerators",
            Category::Sounds => "sounds",
            Category::RenderTargets => "renderTargets",
            Category::EffectLayers => "effectLayers",
            Category::Gui => "gui",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.key())
    }
}
