use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported image format: {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pixel data does not match {width}x{height}")]
    Dimensions { width: usize, height: usize },
}

/// Single-channel pixel data, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    samples: Vec<u16>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize, samples: Vec<u16>) -> Result<Self, DecodeError> {
        if width.checked_mul(height) != Some(samples.len()) {
            return Err(DecodeError::Dimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stretches the sample range linearly onto 0..=255. A flat image is black.
    pub fn to_gray8(&self) -> Vec<u8> {
        let (Some(&min), Some(&max)) = (self.samples.iter().min(), self.samples.iter().max())
        else {
            return Vec::new();
        };
        if min == max {
            return vec![0; self.samples.len()];
        }
        let span = u32::from(max - min);
        self.samples
            .iter()
            .map(|&s| (u32::from(s - min) * 255 / span) as u8)
            .collect()
    }
}

/// Turns a file on disk into pixels.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<PixelGrid, DecodeError>;
}

/// Decodes anything the `image` crate recognises, as 16-bit luma.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, path: &Path) -> Result<PixelGrid, DecodeError> {
        let io_error = |source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = image::ImageReader::open(path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?;
        let decoded = reader.decode().map_err(|err| match err {
            image::ImageError::IoError(source) => DecodeError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => DecodeError::Unsupported {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        let luma = decoded.to_luma16();
        let (width, height) = (luma.width() as usize, luma.height() as usize);
        log::debug!("decoded {} ({}x{})", path.display(), width, height);
        PixelGrid::new(width, height, luma.into_raw())
    }
}
