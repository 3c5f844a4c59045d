//! Image acquisition boundary.
//!
//! The host platform (camera, photo library, permission system) implements
//! [`ImageAcquirer`]. [`FileAcquirer`] serves images from the filesystem and is
//! what the command line front end and the tests use.
use std::{
    collections::VecDeque,
    fmt::Display,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;
use thiserror::Error;

/// Handle to an encoded image, consumed once by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    /// Image stored on disk, usually the URI returned by the picker.
    Path(PathBuf),
    /// Encoded image already held in memory (JPEG, PNG, ...).
    Bytes(Vec<u8>),
}

impl SourceImage {
    pub fn describe(&self) -> String {
        match self {
            SourceImage::Path(path) => path.display().to_string(),
            SourceImage::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for SourceImage {
    fn from(path: PathBuf) -> Self {
        SourceImage::Path(path)
    }
}

impl From<&Path> for SourceImage {
    fn from(path: &Path) -> Self {
        SourceImage::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for SourceImage {
    fn from(bytes: Vec<u8>) -> Self {
        SourceImage::Bytes(bytes)
    }
}

/// Where the user asked to take the image from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Camera,
    Gallery,
}

impl Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Camera => write!(f, "camera"),
            ImageSource::Gallery => write!(f, "photo library"),
        }
    }
}

#[derive(Debug)]
pub enum Acquisition {
    /// The user dismissed the picker without choosing anything.
    Cancelled,
    Image(SourceImage),
}

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Please grant {0} access")]
    PermissionDenied(ImageSource),
    #[error("Failed to get an image from the {from}: {reason}")]
    Failed { from: ImageSource, reason: String },
}

pub trait ImageAcquirer {
    /// Asks the platform for an image. May block while the user interacts with the picker.
    fn acquire(&self, source: ImageSource) -> Result<Acquisition, AcquireError>;
}

impl<A: ImageAcquirer + ?Sized> ImageAcquirer for &A {
    fn acquire(&self, source: ImageSource) -> Result<Acquisition, AcquireError> {
        (**self).acquire(source)
    }
}

/// Serves queued files, one per acquisition, regardless of the requested source.
///
/// An empty queue behaves like a cancelled picker. Sources can be denied to
/// simulate a refused permission.
#[derive(Debug, Default)]
pub struct FileAcquirer {
    queue: Mutex<VecDeque<PathBuf>>,
    denied: Vec<ImageSource>,
}

impl FileAcquirer {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            queue: Mutex::new(paths.into_iter().map(Into::into).collect()),
            denied: Vec::new(),
        }
    }

    pub fn deny(mut self, source: ImageSource) -> Self {
        self.denied.push(source);
        self
    }

    pub fn push(&self, path: impl Into<PathBuf>) {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(path.into());
    }

    pub fn remaining(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl ImageAcquirer for FileAcquirer {
    fn acquire(&self, source: ImageSource) -> Result<Acquisition, AcquireError> {
        if self.denied.contains(&source) {
            return Err(AcquireError::PermissionDenied(source));
        }

        let next = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match next {
            Some(path) if path.is_file() => {
                debug!("Acquired {} from the {}", path.display(), source);
                Ok(Acquisition::Image(SourceImage::Path(path)))
            }
            Some(path) => Err(AcquireError::Failed {
                from: source,
                reason: format!("{} is not a file", path.display()),
            }),
            None => Ok(Acquisition::Cancelled),
        }
    }
}
