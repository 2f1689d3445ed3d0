use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::fs::{FileSystem, LocalFileSystem};
use crate::pass::{DefaultPassFactory, PassFactory};

/// Symbol definitions in effect for a run. Carried unchanged into nested
/// passes; expanding them is the job of other pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    symbols: BTreeMap<String, String>,
}

impl Defines {
    pub fn new() -> Self {
        Defines::default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.symbols.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for Defines {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Defines {
            symbols: iter.into_iter().collect(),
        }
    }
}

/// Everything a preprocessing pass needs besides its input, shared by the
/// top-level run and every nested pass it spawns.
#[derive(Clone)]
pub struct PassContext {
    pub config: Vec<String>,
    pub charset: Option<String>,
    pub defines: Defines,
    pub fs: Rc<dyn FileSystem>,
    pub passes: Rc<dyn PassFactory>,
    /// Files whose nested passes are currently being drained, outermost first.
    including: Vec<PathBuf>,
}

impl PassContext {
    /// Context resolving includes against `base_dir` on the local disk.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        PassContext {
            config: Vec::new(),
            charset: None,
            defines: Defines::new(),
            fs: Rc::new(LocalFileSystem::new(base_dir)),
            passes: Rc::new(DefaultPassFactory),
            including: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Vec<String>) -> Self {
        self.config = config;
        self
    }

    pub fn with_charset(mut self, charset: Option<String>) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_defines(mut self, defines: Defines) -> Self {
        self.defines = defines;
        self
    }

    pub fn with_file_system(mut self, fs: Rc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_pass_factory(mut self, passes: Rc<dyn PassFactory>) -> Self {
        self.passes = passes;
        self
    }

    /// True if `file` is already being drained further up the include chain.
    pub fn is_including(&self, file: &Path) -> bool {
        self.including.iter().any(|f| f == file)
    }

    /// Context for a nested pass over `file`.
    pub(crate) fn nested(&self, file: &Path) -> PassContext {
        let mut ctx = self.clone();
        ctx.including.push(file.to_path_buf());
        ctx
    }
}

impl fmt::Debug for PassContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassContext")
            .field("config", &self.config)
            .field("charset", &self.charset)
            .field("defines", &self.defines)
            .field("including", &self.including)
            .finish_non_exhaustive()
    }
}
