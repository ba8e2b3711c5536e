//! The persisted project document: everything that differs between the live
//! scene and its baseline, grouped by category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    removed::Tombstone,
    scene::{Category, EntityKind, PhysicsImpostor},
};

/// The `customMetadatas` key under which every export mirrors the asset
/// entries that extensions may use.
pub const ASSETS_EXTENSION_KEY: &str = "AssetsExtension";

/// Category-specific data carried next to a fragment's serialized object.
pub trait FragmentExtra: Default {
    fn is_empty(&self) -> bool;
}

/// The persisted change record for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment<E: FragmentExtra = NoExtra> {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Whether the entity was new since the baseline. Fragments written by
    /// older editors may leave this out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,

    /// The full serialized entity when added, the changed fields when
    /// modified, or null when only auxiliary data changed.
    #[serde(default)]
    pub serialization_object: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "FragmentExtra::is_empty")]
    pub extra: E,
}

impl<E: FragmentExtra> Fragment<E> {
    pub fn is_added(&self) -> bool {
        self.added == Some(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoExtra {}

impl FragmentExtra for NoExtra {
    fn is_empty(&self) -> bool {
        true
    }
}

/// Data that travels with a node: the geometry and skeleton it owns, and the
/// animations, physics, and actions added to it since the baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeExtra {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub geometries: Vec<Fragment>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skeletons: Vec<Fragment>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<AnimationFragment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsImpostor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
}

impl FragmentExtra for NodeExtra {
    fn is_empty(&self) -> bool {
        self.geometries.is_empty()
            && self.skeletons.is_empty()
            && self.animations.is_empty()
            && self.physics.is_none()
            && self.actions.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFragment {
    pub name: String,
    pub target_id: String,
    pub serialization_object: Map<String, Value>,
}

/// Which meshes a material is bound to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialExtra {
    pub bindings: Vec<MaterialBinding>,
}

impl FragmentExtra for MaterialExtra {
    fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialBinding {
    pub mesh_id: String,

    /// The material slot on a mesh with several materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleExtra {
    /// False when the emitter was a placeholder mesh, or a bare position.
    pub has_emitter: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emitter_position: Option<[f64; 3]>,
}

impl FragmentExtra for ParticleExtra {
    fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderTargetExtra {
    pub is_probe: bool,
}

impl FragmentExtra for RenderTargetExtra {
    fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFragment {
    pub name: String,
    pub data: Value,
    pub added: bool,
}

/// A project document. Every section defaults to empty so documents written
/// before a section existed still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectDocument {
    pub global_configuration: Value,
    pub nodes: Vec<Fragment<NodeExtra>>,
    pub materials: Vec<Fragment<MaterialExtra>>,
    pub textures: Vec<Fragment>,
    pub particle_systems: Vec<Fragment<ParticleExtra>>,
    pub shadow_generators: Vec<Fragment>,
    pub sounds: Vec<Fragment>,
    pub render_targets: Vec<Fragment<RenderTargetExtra>>,
    pub effect_layers: Vec<Fragment>,
    pub gui: Vec<Fragment>,
    pub assets: BTreeMap<String, Vec<AssetFragment>>,
    pub custom_metadatas: Map<String, Value>,
    pub files_list: Vec<String>,
    pub removed_objects: BTreeMap<String, Tombstone>,
}

impl ProjectDocument {
    pub fn category_len(&self, category: Category) -> usize {
        match category {
            Category::Nodes => self.nodes.len(),
            Category::Materials => self.materials.len(),
            Category::Textures => self.textures.len(),
            Category::ParticleSystems => self.particle_systems.len(),
            Category::ShadowGenerators => self.shadow_generators.len(),
            Category::Sounds => self.sounds.len(),
            Category::RenderTargets => self.render_targets.len(),
            Category::EffectLayers => self.effect_layers.len(),
            Category::Gui => self.gui.len(),
        }
    }

    /// The number of entity fragments across every category.
    pub fn fragment_count(&self) -> usize {
        const CATEGORIES: [Category; 9] = [
            Category::Nodes,
            Category::Materials,
            Category::Textures,
            Category::ParticleSystems,
            Category::ShadowGenerators,
            Category::Sounds,
            Category::RenderTargets,
            Category::EffectLayers,
            Category::Gui,
        ];

        CATEGORIES
            .iter()
            .map(|category| self.category_len(*category))
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use insta::assert_yaml_snapshot;
    use serde_json::json;

    #[test]
    fn legacy_document_defaults_missing_sections() {
        let document: ProjectDocument = serde_json::from_value(json!({
            "nodes": [{
                "id": "cube1",
                "name": "Cube",
                "type": "Mesh",
                "serializationObject": { "id": "cube1", "castShadow": true },
            }],
        }))
        .unwrap();

        assert_eq!(document.nodes.len(), 1);
        assert_eq!(document.nodes[0].added, None);
        assert_eq!(document.nodes[0].extra, NodeExtra::default());
        assert!(document.sounds.is_empty());
        assert!(document.removed_objects.is_empty());
        assert_eq!(document.global_configuration, Value::Null);
    }

    #[test]
    fn empty_extras_are_left_out() {
        let fragment: Fragment<NodeExtra> = Fragment {
            id: "L9".to_owned(),
            name: "L9".to_owned(),
            kind: EntityKind::Light,
            added: Some(true),
            serialization_object: Some(Map::new()),
            extra: NodeExtra::default(),
        };

        assert_yaml_snapshot!(fragment, @r###"
        ---
        id: L9
        name: L9
        type: Light
        added: true
        serializationObject: {}
        "###);
    }

    #[test]
    fn particle_extra_is_always_written() {
        let fragment: Fragment<ParticleExtra> = Fragment {
            id: "p1".to_owned(),
            name: "Smoke".to_owned(),
            kind: EntityKind::ParticleSystem,
            added: Some(false),
            serialization_object: None,
            extra: ParticleExtra {
                has_emitter: true,
                emitter_position: None,
            },
        };

        let value = serde_json::to_value(&fragment).unwrap();
        assert_eq!(value["extra"], json!({ "hasEmitter": true }));
        assert_eq!(value["serializationObject"], Value::Null);
    }
}
