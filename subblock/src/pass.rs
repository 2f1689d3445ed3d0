use std::path::Path;

use linesrc::{Line, LineSource, ReaderSource, SourceError};

use crate::context::PassContext;
use crate::engine::SubEngine;
use crate::registry::SubRegistry;
use crate::sub::Sub;

/// A complete preprocessing pass whose blocks can be queried once drained.
pub trait Pass: LineSource {
    /// Look up a block, registering an empty one if the name is unknown.
    fn sub(&mut self, name: &str) -> &Sub;
}

/// Builds the nested passes used for cross-file `!includesub`.
pub trait PassFactory {
    fn open(&self, context: PassContext, source: Box<dyn LineSource>) -> Box<dyn Pass>;
}

/// The preprocessing pipeline for one document. Sub-block handling is its
/// only stage here; the rest of the directive language lives elsewhere.
pub struct Preprocessor {
    engine: SubEngine,
}

impl Preprocessor {
    pub fn new(context: PassContext, source: Box<dyn LineSource>) -> Self {
        Preprocessor {
            engine: SubEngine::new(context, source),
        }
    }

    /// Open `path` with the context's charset.
    pub fn open_file(context: PassContext, path: &Path) -> Result<Self, SourceError> {
        let source = ReaderSource::open(path, context.charset.as_deref(), None)?;
        Ok(Preprocessor::new(context, Box::new(source)))
    }

    pub fn registry(&self) -> &SubRegistry {
        self.engine.registry()
    }
}

impl LineSource for Preprocessor {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        self.engine.next_line()
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.engine.close()
    }
}

impl Pass for Preprocessor {
    fn sub(&mut self, name: &str) -> &Sub {
        self.engine.sub(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPassFactory;

impl PassFactory for DefaultPassFactory {
    fn open(&self, context: PassContext, source: Box<dyn LineSource>) -> Box<dyn Pass> {
        Box::new(Preprocessor::new(context, source))
    }
}

/// Run `path` through the pipeline and collect every output line.
pub fn preprocess_file(context: PassContext, path: &Path) -> Result<Vec<Line>, SourceError> {
    let mut pass = Preprocessor::open_file(context, path)?;
    let lines = pass.collect_lines();
    pass.close()?;
    lines
}

/// Run in-memory `text` through the pipeline; `name` labels its locations.
pub fn preprocess_str(context: PassContext, name: &str, text: &str) -> Result<Vec<Line>, SourceError> {
    let mut pass = Preprocessor::new(context, Box::new(ReaderSource::from_text(name, text)));
    let lines = pass.collect_lines();
    pass.close()?;
    lines
}
