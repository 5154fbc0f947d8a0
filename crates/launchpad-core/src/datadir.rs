//! Scoped data directories - データディレクトリ
//!
//! Every project, app and component gets a persistent data directory and a
//! disposable cache directory. Directories are created on first use.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    data: PathBuf,
    cache: PathBuf,
}

impl ProjectDir {
    /// Lay out `<root>/data` and `<root>/cache`.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        Self::at(root.join("data"), root.join("cache"))
    }

    fn at(data: PathBuf, cache: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&data)?;
        std::fs::create_dir_all(&cache)?;
        Ok(Self { data, cache })
    }

    pub fn app(&self, name: &str) -> io::Result<AppDir> {
        let (data, cache) = scoped(&self.data, &self.cache, &["app", name])?;
        Ok(AppDir { data, cache })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }
}

/// Directories of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDir {
    data: PathBuf,
    cache: PathBuf,
}

impl AppDir {
    /// Directories of the component of type `name` bound as `kind`.
    pub fn component(&self, kind: &str, name: &str) -> io::Result<ComponentDir> {
        let (data, cache) = scoped(&self.data, &self.cache, &["component", kind, name])?;
        Ok(ComponentDir { data, cache })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }
}

/// Directories private to one bound component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDir {
    data: PathBuf,
    cache: PathBuf,
}

impl ComponentDir {
    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }
}

fn scoped(data: &Path, cache: &Path, parts: &[&str]) -> io::Result<(PathBuf, PathBuf)> {
    let data = parts.iter().fold(data.to_path_buf(), |p, part| p.join(part));
    let cache = parts.iter().fold(cache.to_path_buf(), |p, part| p.join(part));
    std::fs::create_dir_all(&data)?;
    std::fs::create_dir_all(&cache)?;
    Ok((data, cache))
}
