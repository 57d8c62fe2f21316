use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    pub audio: AudioConfig,
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// A character voice on disk: `<id>.onnx` plus its `<id>.onnx.json` config.
#[derive(Debug)]
pub struct Character {
    pub id: String,
    pub config: CharacterConfig,
    pub model_path: PathBuf,
}

impl Character {
    pub fn load(voices_dir: &Path, id: &str) -> Result<Self, EngineError> {
        if !is_valid_id(id) {
            return Err(EngineError::UnknownCharacter(id.to_string()));
        }

        let model_path = voices_dir.join(format!("{}.onnx", id));
        let config_path = voices_dir.join(format!("{}.onnx.json", id));

        if !model_path.is_file() {
            return Err(EngineError::UnknownCharacter(id.to_string()));
        }

        if !config_path.is_file() {
            return Err(EngineError::UnknownCharacter(format!(
                "{} (missing config file)",
                id
            )));
        }

        let config: CharacterConfig =
            serde_json::from_reader(BufReader::new(File::open(&config_path)?)).map_err(|e| {
                EngineError::Synthesis(format!("Invalid config for '{}': {}", id, e))
            })?;

        Ok(Self {
            id: id.to_string(),
            config,
            model_path,
        })
    }

    pub fn espeak_voice(&self) -> &str {
        self.config
            .espeak
            .as_ref()
            .map(|e| e.voice.as_str())
            .unwrap_or("en")
    }

    pub fn info(&self) -> CharacterInfo {
        CharacterInfo {
            id: self.id.clone(),
            name: display_name(&self.id),
            language: self.espeak_voice().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterInfo {
    pub id: String,
    pub name: String,
    pub language: String,
}

/// Identifiers name files inside the voices directory and nothing else.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(|c: char| c == '/' || c == '\\') && !id.contains("..")
}

/// `en_GB-alba-medium` -> `Alba`; identifiers without that shape are returned as-is.
pub fn display_name(id: &str) -> String {
    match id.split('-').nth(1) {
        Some(name) if !name.is_empty() => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => id.to_string(),
            }
        }
        _ => id.to_string(),
    }
}
