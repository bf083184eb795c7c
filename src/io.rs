use image::{ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::digest::{HashAlgorithm, Hasher};
use crate::error::{Result, SpoofError};

pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Produces the base buffer a search appends trailer blocks to.
///
/// The search itself never looks at file formats; anything that turns a
/// path into bytes can feed it.
pub trait BaseSource {
    /// Loads the bytes for `path`.
    fn load(&self, path: &Path) -> Result<Vec<u8>>;

    /// Short label for logs and reports.
    fn name(&self) -> &'static str;
}

/// Decodes an image and re-encodes it in the same format, so the appended
/// trailer lands after a codec-normalised stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageNormalizer;

impl ImageNormalizer {
    pub fn normalize(&self, path: &Path) -> Result<(ImageFormat, Vec<u8>)> {
        let codec = |source: image::ImageError| SpoofError::Codec {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(path)
            .map_err(|e| SpoofError::io(path, e))?
            .with_guessed_format()
            .map_err(|e| SpoofError::io(path, e))?;
        let format = reader.format().ok_or_else(|| {
            codec(image::ImageError::Unsupported(
                image::error::UnsupportedError::from_format_and_kind(
                    image::error::ImageFormatHint::PathExtension(path.to_path_buf()),
                    image::error::UnsupportedErrorKind::Format(
                        image::error::ImageFormatHint::Unknown,
                    ),
                ),
            ))
        })?;
        let decoded = reader.decode().map_err(codec)?;

        let mut out = Cursor::new(Vec::new());
        decoded.write_to(&mut out, format).map_err(codec)?;

        let bytes = out.into_inner();
        tracing::debug!(?format, path = %path.display(), len = bytes.len(), "image normalized");
        Ok((format, bytes))
    }
}

impl BaseSource for ImageNormalizer {
    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        self.normalize(path).map(|(_, bytes)| bytes)
    }

    fn name(&self) -> &'static str {
        "image"
    }
}

/// Uses the file's bytes as they are on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSource;

impl BaseSource for RawSource {
    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        read_bytes(path)
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| SpoofError::io(path, e))
}

/// Writes `bytes` to `path`, creating missing parent directories.
pub fn write_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SpoofError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| SpoofError::io(path, e))
}

/// Streams a file through `algorithm` and returns the hex digest.
pub fn file_digest(path: impl AsRef<Path>, algorithm: HashAlgorithm) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SpoofError::io(path, e))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| SpoofError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize().to_hex())
}
