//! Scripted engine for exercising the gateway without voice models.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::ThreadId;

use super::{CharacterInfo, SynthesisEngine};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct Call {
    pub character: String,
    pub text: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Speak,
    Silent,
    Fail(&'static str),
    Panic,
}

pub struct FakeEngine {
    mode: Mode,
    calls: Mutex<Vec<Call>>,
    loaded: Mutex<Vec<String>>,
    listed_from: Mutex<Option<ThreadId>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::with_mode(Mode::Speak)
    }

    /// Leaves a partial file behind, then fails with `message`.
    pub fn failing(message: &'static str) -> Self {
        Self::with_mode(Mode::Fail(message))
    }

    /// Succeeds without writing anything.
    pub fn silent() -> Self {
        Self::with_mode(Mode::Silent)
    }

    pub fn panicking() -> Self {
        Self::with_mode(Mode::Panic)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
            loaded: Mutex::new(Vec::new()),
            listed_from: Mutex::new(None),
        }
    }

    /// The bytes written for a successful call.
    pub fn audio_for(character: &str, text: &str) -> Vec<u8> {
        format!("RIFF{}:{}", character, text).into_bytes()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }

    /// The thread that last listed characters.
    pub fn listed_from(&self) -> Option<ThreadId> {
        *self.listed_from.lock().unwrap()
    }
}

impl SynthesisEngine for FakeEngine {
    fn load_voice(&self, character: &str) -> Result<(), EngineError> {
        self.loaded.lock().unwrap().push(character.to_string());
        Ok(())
    }

    fn synthesize(&self, character: &str, text: &str, output_path: &Path) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(Call {
            character: character.to_string(),
            text: text.to_string(),
            output_path: output_path.to_path_buf(),
        });

        match self.mode {
            Mode::Speak => {
                std::fs::write(output_path, Self::audio_for(character, text))?;
                Ok(())
            }
            Mode::Silent => Ok(()),
            Mode::Fail(message) => {
                std::fs::write(output_path, b"RIFF")?;
                Err(EngineError::Synthesis(message.to_string()))
            }
            Mode::Panic => panic!("engine crashed"),
        }
    }

    fn list_characters(&self) -> Result<Vec<CharacterInfo>, EngineError> {
        *self.listed_from.lock().unwrap() = Some(std::thread::current().id());
        Ok(vec![CharacterInfo {
            id: "mika".to_string(),
            name: "mika".to_string(),
            language: "ja".to_string(),
        }])
    }
}
