use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, LockResult, Mutex, RwLock};

use hound::{SampleFormat, WavSpec, WavWriter};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use super::character::{Character, CharacterInfo};
use super::SynthesisEngine;
use crate::error::EngineError;

/// Synthesis engine backed by Piper ONNX voice models.
///
/// Each character is loaded once and shared by every request that asks for it.
pub struct PiperEngine {
    voices_dir: PathBuf,
    models: RwLock<HashMap<String, Arc<VoiceModel>>>,
}

impl PiperEngine {
    pub fn new(voices_dir: PathBuf) -> Self {
        Self {
            voices_dir,
            models: RwLock::new(HashMap::new()),
        }
    }

    fn model(&self, character: &str) -> Result<Arc<VoiceModel>, EngineError> {
        {
            let models = recover(self.models.read(), "voice model cache");
            if let Some(model) = models.get(character) {
                return Ok(Arc::clone(model));
            }
        }

        let loaded = Character::load(&self.voices_dir, character)?;
        let model = Arc::new(VoiceModel::new(&loaded)?);
        tracing::info!(character, model = %loaded.model_path.display(), "Loaded voice model");

        // A concurrent loader may have won the race; keep whichever landed first.
        let mut models = recover(self.models.write(), "voice model cache");
        let model = models
            .entry(character.to_string())
            .or_insert(model);
        Ok(Arc::clone(model))
    }
}

impl SynthesisEngine for PiperEngine {
    fn load_voice(&self, character: &str) -> Result<(), EngineError> {
        self.model(character).map(|_| ())
    }

    fn synthesize(&self, character: &str, text: &str, output_path: &Path) -> Result<(), EngineError> {
        let model = self.model(character)?;

        let phonemes = phonemize(text, &model.espeak_voice)?;
        let ids = phonemes_to_ids(&phonemes, &model.phoneme_id_map);
        let samples = model.infer(&ids)?;

        tracing::debug!(
            character,
            phonemes = ids.len(),
            samples = samples.len(),
            "Synthesized audio"
        );

        write_wav(output_path, &samples, model.sample_rate)
    }

    fn list_characters(&self) -> Result<Vec<CharacterInfo>, EngineError> {
        let mut characters = Vec::new();

        if !self.voices_dir.exists() {
            return Ok(characters);
        }

        for entry in std::fs::read_dir(&self.voices_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "onnx").unwrap_or(false) {
                let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };

                match Character::load(&self.voices_dir, &id) {
                    Ok(character) => characters.push(character.info()),
                    Err(e) => tracing::debug!(character = %id, "Skipping voice: {}", e),
                }
            }
        }

        characters.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(characters)
    }
}

struct VoiceModel {
    session: Mutex<Session>,
    sample_rate: u32,
    espeak_voice: String,
    phoneme_id_map: HashMap<String, Vec<i64>>,
    noise_scale: f32,
    length_scale: f32,
    noise_w: f32,
}

impl VoiceModel {
    fn new(character: &Character) -> Result<Self, EngineError> {
        let session = Session::builder()
            .map_err(|e| EngineError::Synthesis(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::Synthesis(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| EngineError::Synthesis(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&character.model_path)
            .map_err(|e| EngineError::Synthesis(format!("Failed to load model: {}", e)))?;

        let inference = character.config.inference.clone().unwrap_or_default();

        Ok(Self {
            session: Mutex::new(session),
            sample_rate: character.config.audio.sample_rate,
            espeak_voice: character.espeak_voice().to_string(),
            phoneme_id_map: character.config.phoneme_id_map.clone(),
            noise_scale: inference.noise_scale,
            length_scale: inference.length_scale,
            noise_w: inference.noise_w,
        })
    }

    fn infer(&self, phoneme_ids: &[i64]) -> Result<Vec<f32>, EngineError> {
        if phoneme_ids.is_empty() {
            return Ok(Vec::new());
        }

        let input_len = phoneme_ids.len();

        // input: [batch, sequence] = [1, phoneme_count]
        let input_value = Value::from_array((vec![1, input_len], phoneme_ids.to_vec()))
            .map_err(|e| EngineError::Synthesis(format!("Failed to create input tensor: {}", e)))?;

        let lengths_value = Value::from_array((vec![1], vec![input_len as i64]))
            .map_err(|e| EngineError::Synthesis(format!("Failed to create lengths tensor: {}", e)))?;

        // scales: [noise_scale, length_scale, noise_w]
        let scales_value = Value::from_array((
            vec![3],
            vec![self.noise_scale, self.length_scale, self.noise_w],
        ))
        .map_err(|e| EngineError::Synthesis(format!("Failed to create scales tensor: {}", e)))?;

        let mut session = recover(self.session.lock(), "inference session");
        let outputs = session
            .run(ort::inputs![input_value, lengths_value, scales_value])
            .map_err(|e| EngineError::Synthesis(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| EngineError::Synthesis("Missing output tensor".to_string()))?;

        let (_, audio) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| EngineError::Synthesis(format!("Failed to extract output tensor: {}", e)))?;

        Ok(audio.to_vec())
    }
}

/// Poisoning is ignored; the cache and sessions stay valid after a panicking call.
fn recover<G>(result: LockResult<G>, what: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering poisoned {} lock", what);
        poisoned.into_inner()
    })
}

/// Convert text to IPA phonemes using espeak-ng
pub fn phonemize(text: &str, voice: &str) -> Result<String, EngineError> {
    phonemize_with(Command::new("espeak-ng"), text, voice)
}

/// Run `command` as espeak-ng. The text travels over stdin, never argv.
fn phonemize_with(mut command: Command, text: &str, voice: &str) -> Result<String, EngineError> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }

    let mut child = command
        .args(["--ipa", "-q", "-v", voice, "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            EngineError::Synthesis(format!("Failed to run espeak-ng (is it installed?): {}", e))
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EngineError::Synthesis("espeak-ng stdin unavailable".to_string()))?;
    let input = text.to_string();
    // Feed from another thread so a full stdout pipe cannot deadlock us
    let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

    let output = child.wait_with_output()?;
    let written = writer
        .join()
        .map_err(|_| EngineError::Synthesis("espeak-ng input writer panicked".to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Synthesis(format!(
            "espeak-ng failed: {}",
            stderr.trim()
        )));
    }

    written.map_err(|e| EngineError::Synthesis(format!("Failed to send text to espeak-ng: {}", e)))?;

    // One output line per input line or clause
    let phonemes = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(phonemes)
}

/// Map phonemes to model ids, framed by BOS/EOS and interleaved with padding.
pub fn phonemes_to_ids(phonemes: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let mut ids = Vec::new();

    match id_map.get("^") {
        Some(bos) => ids.extend(bos),
        None => ids.push(0),
    }

    let pad = id_map.get("_");
    let mut buf = [0u8; 4];
    for ch in phonemes.chars() {
        if let Some(mapped) = id_map.get(&*ch.encode_utf8(&mut buf)) {
            ids.extend(mapped);
        }
        if let Some(pad) = pad {
            ids.extend(pad);
        }
    }

    match id_map.get("$") {
        Some(eos) => ids.extend(eos),
        None => ids.push(0),
    }

    ids
}

/// Write samples as a 16-bit mono WAV file at `path`, replacing its contents.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), EngineError> {
    let file = BufWriter::new(File::create(path)?);
    encode_wav(file, samples, sample_rate)
}

fn encode_wav<W: Write + Seek>(
    writer: W,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), EngineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut wav = WavWriter::new(writer, spec)
        .map_err(|e| EngineError::Synthesis(format!("Failed to create WAV writer: {}", e)))?;

    for sample in samples {
        // f32 [-1.0, 1.0] to i16 with 2x gain
        let scaled = (sample * 2.0 * 32767.0).clamp(-32768.0, 32767.0) as i16;
        wav.write_sample(scaled)
            .map_err(|e| EngineError::Synthesis(format!("Failed to write sample: {}", e)))?;
    }

    wav.finalize()
        .map_err(|e| EngineError::Synthesis(format!("Failed to finalize WAV: {}", e)))
}
