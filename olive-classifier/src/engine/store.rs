use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

/// Writable location where the bundled model is materialized before loading.
#[derive(Debug, Clone)]
pub struct ModelStore {
    cache_dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path the bundled model has, or will have, inside the cache.
    pub fn cached_path(&self, bundled: &Path) -> io::Result<PathBuf> {
        let file_name = bundled.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} does not name a file", bundled.display()),
            )
        })?;
        Ok(self.cache_dir.join(file_name))
    }

    /// Copies the bundled model into the cache unless a copy is already there.
    ///
    /// The copy goes through a temporary file renamed at the end, so an
    /// interrupted copy is never mistaken for a cached model.
    pub fn materialize<P: AsRef<Path>>(&self, bundled: P) -> io::Result<PathBuf> {
        let bundled = bundled.as_ref();
        let target = self.cached_path(bundled)?;

        if target.is_file() {
            debug!("Reusing cached model {}", target.display());
            return Ok(target);
        }

        fs::create_dir_all(&self.cache_dir)?;
        let partial = target.with_extension("partial");
        if let Err(e) = fs::copy(bundled, &partial).and_then(|_| fs::rename(&partial, &target)) {
            warn!("Could not materialize {}: {e}", target.display());
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        info!(
            "Model {} materialized to {}",
            bundled.display(),
            target.display()
        );
        Ok(target)
    }
}
