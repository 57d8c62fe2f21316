use std::path::Path;

use tempfile::TempPath;

use crate::error::EngineError;

/// A request-scoped temporary WAV file.
///
/// The file is removed when the artifact is consumed by [`Artifact::into_bytes`]
/// or dropped, whichever comes first.
pub struct Artifact {
    path: TempPath,
}

impl Artifact {
    pub fn create() -> Result<Self, EngineError> {
        let path = tempfile::Builder::new()
            .prefix("speech-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the synthesized audio and release the file.
    pub fn into_bytes(self) -> Result<Vec<u8>, EngineError> {
        let bytes = std::fs::read(&self.path)?;
        self.path.close()?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_reserves_wav_path() {
        let artifact = Artifact::create().unwrap();
        assert!(artifact.path().exists());
        assert_eq!(artifact.path().extension().unwrap(), "wav");
    }

    #[test]
    fn test_into_bytes_removes_file() {
        let artifact = Artifact::create().unwrap();
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, b"RIFF....WAVE").unwrap();

        let bytes = artifact.into_bytes().unwrap();
        assert_eq!(bytes, b"RIFF....WAVE");
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let artifact = Artifact::create().unwrap();
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, b"partial").unwrap();

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_paths_are_unique() {
        let a = Artifact::create().unwrap();
        let b = Artifact::create().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
