use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Scene-wide settings that travel with every project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalConfiguration {
    /// Pose of the editor camera, in the camera codec's serialized form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized_camera: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_texture: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_processing_configuration: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_helper: Option<Value>,

    pub ambient_color: [f64; 3],
    pub clear_color: [f64; 4],
    pub fog: Fog,
    pub physics_enabled: bool,
}

impl Default for GlobalConfiguration {
    fn default() -> Self {
        GlobalConfiguration {
            serialized_camera: None,
            environment_texture: None,
            image_processing_configuration: None,
            environment_helper: None,
            ambient_color: [0.0, 0.0, 0.0],
            clear_color: [0.2, 0.2, 0.3, 1.0],
            fog: Fog::default(),
            physics_enabled: false,
        }
    }
}

impl GlobalConfiguration {
    pub fn validate(&self) -> Result<(), GlobalConfigurationError> {
        let mut colors = self
            .ambient_color
            .iter()
            .chain(self.clear_color.iter())
            .chain(self.fog.color.iter());

        if colors.any(|channel| !channel.is_finite()) {
            return Err(GlobalConfigurationError::NonFiniteColor);
        }

        if self.fog.mode > Fog::MAX_MODE {
            return Err(GlobalConfigurationError::UnknownFogMode(self.fog.mode));
        }

        if self.fog.start > self.fog.end {
            return Err(GlobalConfigurationError::InvertedFogRange {
                start: self.fog.start,
                end: self.fog.end,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fog {
    pub enabled: bool,
    pub mode: u8,
    pub start: f64,
    pub end: f64,
    pub density: f64,
    pub color: [f64; 3],
}

impl Fog {
    const MAX_MODE: u8 = 3;
}

impl Default for Fog {
    fn default() -> Self {
        Fog {
            enabled: false,
            mode: 0,
            start: 0.0,
            end: 1000.0,
            density: 0.1,
            color: [0.2, 0.2, 0.3],
        }
    }
}

#[derive(Debug, Error)]
pub enum GlobalConfigurationError {
    #[error("a scene color contains a non-finite channel")]
    NonFiniteColor,

    #[error("fog mode {0} is not a known fog mode")]
    UnknownFogMode(u8),

    #[error("fog starts at {start} but ends at {end}")]
    InvertedFogRange { start: f64, end: f64 },
}
