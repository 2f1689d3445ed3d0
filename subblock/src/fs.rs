use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(\w+)%").expect("environment variable pattern compiles"));

/// File lookup used when resolving `!includesub path!name`.
pub trait FileSystem {
    /// Turn a path spec into a concrete path. Never fails; missing files are
    /// detected through `exists`.
    fn resolve(&self, spec: &str) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Resolves relative specs against a base directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    base_dir: PathBuf,
}

impl LocalFileSystem {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        LocalFileSystem {
            base_dir: base_dir.into(),
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn resolve(&self, spec: &str) -> PathBuf {
        let path = Path::new(spec);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        std::path::absolute(&joined).unwrap_or(joined)
    }
}

/// Replace each `%NAME%` with the value of environment variable `NAME`.
/// Unset variables are left untouched.
pub fn with_environment_variables(spec: &str) -> String {
    ENV_VAR
        .replace_all(spec, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
