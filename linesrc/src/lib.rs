pub mod directive;
pub mod error;
pub mod line;
pub mod location;
pub mod source;

pub use directive::Directive;
pub use directive::reference::SubRef;
pub use error::SourceError;
pub use line::Line;
pub use location::Location;
pub use source::LineSource;
pub use source::list::ListSource;
pub use source::reader::ReaderSource;
pub use source::simple::ErrorSource;
