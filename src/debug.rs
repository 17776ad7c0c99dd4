//! Optional side channel for debug artifacts.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SliceError};

/// Receives intermediate outputs. Failures are reported to the caller, which
/// logs them and carries on.
pub trait DebugSink: Send {
    /// Store an extracted object image
    fn save_image(&mut self, batch_index: usize, detection_index: usize, image: &RgbImage) -> Result<()>;

    /// Store the encoded text payload of an extracted object
    fn save_encoded(&mut self, batch_index: usize, detection_index: usize, encoded: &str) -> Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn save_image(&mut self, _batch_index: usize, _detection_index: usize, _image: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn save_encoded(&mut self, _batch_index: usize, _detection_index: usize, _encoded: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes `img/BB-DD.png` and `b64/BB-DD.b64` under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryDebugSink {
    output_dir: PathBuf,
}

impl DirectoryDebugSink {
    /// The directory must be empty or non-existent
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(SliceError::Config(format!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        }
        std::fs::create_dir_all(output_dir.join("img"))?;
        std::fs::create_dir_all(output_dir.join("b64"))?;

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn artifact_path(&self, subdir: &str, extension: &str, batch_index: usize, detection_index: usize) -> PathBuf {
        self.output_dir
            .join(subdir)
            .join(format!("{:02}-{:02}.{}", batch_index, detection_index, extension))
    }
}

impl DebugSink for DirectoryDebugSink {
    fn save_image(&mut self, batch_index: usize, detection_index: usize, image: &RgbImage) -> Result<()> {
        let path = self.artifact_path("img", "png", batch_index, detection_index);
        image.save(&path).map_err(|e| {
            SliceError::Io(std::io::Error::other(format!(
                "Failed to save debug image {}: {}",
                path.display(),
                e
            )))
        })?;
        debug!("Debug: saved {}", path.display());
        Ok(())
    }

    fn save_encoded(&mut self, batch_index: usize, detection_index: usize, encoded: &str) -> Result<()> {
        let path = self.artifact_path("b64", "b64", batch_index, detection_index);
        std::fs::write(&path, encoded)?;
        debug!("Debug: saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_directory_sink_writes_artifacts() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let root = dir.path().join("debug");
        let mut sink = DirectoryDebugSink::new(&root)?;

        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        sink.save_image(3, 1, &img)?;
        sink.save_encoded(3, 1, "aGVsbG8=")?;

        assert!(root.join("img").join("03-01.png").exists());
        let text = std::fs::read_to_string(root.join("b64").join("03-01.b64"))?;
        assert_eq!(text, "aGVsbG8=");
        Ok(())
    }

    #[test]
    fn test_directory_sink_rejects_non_empty_dir() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        std::fs::write(dir.path().join("stale.txt"), "x")?;
        assert!(matches!(DirectoryDebugSink::new(dir.path()), Err(SliceError::Config(_))));
        Ok(())
    }
}
