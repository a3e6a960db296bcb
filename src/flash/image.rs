//! Out-of-band access to the array: seeding it before a run and dumping it
//! afterwards. None of this is reachable over the bus.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use super::{FlashDevice, MEMORY_SIZE};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to access image {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("offset {offset:#x} is outside the {size:#x} byte array", size = MEMORY_SIZE)]
    OffsetOutOfRange { offset: usize },
}

impl FlashDevice {
    /// Copy `data` into the array at `offset`. Data running past the end of
    /// the array is dropped. Returns the number of bytes copied.
    pub fn load(&mut self, offset: usize, data: &[u8]) -> Result<usize, ImageError> {
        let end = self.clamp(offset, data.len())?;
        let len = end - offset;
        if len < data.len() {
            warn!(
                "Image is too large, truncating {} bytes at {end:#x}",
                data.len() - len
            );
        }
        self.memory[offset..end].copy_from_slice(&data[..len]);
        Ok(len)
    }

    pub fn load_image(&mut self, path: &Path, offset: usize) -> Result<usize, ImageError> {
        let data = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_owned(),
            source,
        })?;
        let len = self.load(offset, &data)?;
        info!("Loaded {len} bytes from {path:?} at {offset:#08x}");
        Ok(len)
    }

    pub fn save_image(&self, path: &Path) -> Result<(), ImageError> {
        fs::write(path, &self.memory).map_err(|source| ImageError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Fill `len` bytes starting at `offset` with random data.
    pub fn random_fill<R: Rng>(
        &mut self,
        offset: usize,
        len: usize,
        rng: &mut R,
    ) -> Result<usize, ImageError> {
        let end = self.clamp(offset, len)?;
        rng.fill(&mut self.memory[offset..end]);
        Ok(end - offset)
    }

    fn clamp(&self, offset: usize, len: usize) -> Result<usize, ImageError> {
        if offset >= MEMORY_SIZE {
            return Err(ImageError::OffsetOutOfRange { offset });
        }
        Ok(offset.saturating_add(len).min(MEMORY_SIZE))
    }
}
