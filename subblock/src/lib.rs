pub mod context;
pub mod engine;
pub mod fs;
pub mod pass;
pub mod registry;
pub mod sub;

pub use context::{Defines, PassContext};
pub use engine::SubEngine;
pub use fs::{FileSystem, LocalFileSystem};
pub use linesrc::{Line, LineSource, Location, SourceError};
pub use pass::{DefaultPassFactory, Pass, PassFactory, Preprocessor, preprocess_file, preprocess_str};
pub use registry::SubRegistry;
pub use sub::Sub;
