pub mod artifact;
pub mod character;
pub mod piper;

#[cfg(test)]
pub mod fake;

use std::path::Path;
use std::sync::Arc;

use crate::error::EngineError;

pub use artifact::Artifact;
pub use character::CharacterInfo;
pub use piper::PiperEngine;

/// The external speech engine the gateway delegates to.
///
/// Calls are blocking and may run concurrently from several worker threads.
pub trait SynthesisEngine: Send + Sync {
    /// Prepare a character so later synthesis calls can use it.
    fn load_voice(&self, character: &str) -> Result<(), EngineError>;

    /// Render `text` in `character`'s voice as a WAV file at `output_path`.
    fn synthesize(&self, character: &str, text: &str, output_path: &Path) -> Result<(), EngineError>;

    fn list_characters(&self) -> Result<Vec<CharacterInfo>, EngineError>;
}

pub struct TtsService {
    engine: Arc<dyn SynthesisEngine>,
    default_character: String,
}

impl TtsService {
    pub fn new(engine: Arc<dyn SynthesisEngine>, default_character: String) -> Self {
        Self {
            engine,
            default_character,
        }
    }

    pub fn default_character(&self) -> &str {
        &self.default_character
    }

    /// Load the default character; the process must not serve without it.
    pub fn warm_up(&self) -> Result<(), EngineError> {
        self.engine.load_voice(&self.default_character)
    }

    /// Synthesize `text` and return the WAV bytes.
    ///
    /// Falls back to the default character when none is given. The engine runs
    /// on the blocking pool; its temporary output file never outlives this call.
    pub async fn speak(&self, text: String, character: Option<String>) -> Result<Vec<u8>, EngineError> {
        let character = character.unwrap_or_else(|| self.default_character.clone());
        let engine = Arc::clone(&self.engine);

        tokio::task::spawn_blocking(move || render(engine.as_ref(), &character, &text))
            .await
            .map_err(|e| EngineError::Synthesis(format!("Synthesis task failed: {}", e)))?
    }

    /// List the engine's characters; this scans disk, so it runs on the blocking pool.
    pub async fn list_characters(&self) -> Result<Vec<CharacterInfo>, EngineError> {
        let engine = Arc::clone(&self.engine);

        tokio::task::spawn_blocking(move || engine.list_characters())
            .await
            .map_err(|e| EngineError::Synthesis(format!("Character listing failed: {}", e)))?
    }
}

fn render(engine: &dyn SynthesisEngine, character: &str, text: &str) -> Result<Vec<u8>, EngineError> {
    let artifact = Artifact::create()?;
    engine.synthesize(character, text, artifact.path())?;

    let wav = artifact.into_bytes()?;
    if wav.is_empty() {
        return Err(EngineError::Synthesis("Engine produced no audio".to_string()));
    }

    Ok(wav)
}
