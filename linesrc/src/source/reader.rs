use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use std::rc::Rc;

use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::line::Line;
use crate::location::Location;
use crate::source::LineSource;

/// Lines read from a character stream, numbered from 1.
///
/// Trailing `\n` / `\r\n` terminators are stripped, as is a UTF-8 byte order
/// mark at the start of the first line.
pub struct ReaderSource {
    reader: Option<Box<dyn BufRead>>,
    description: Rc<str>,
    parent: Option<Location>,
    line_no: usize,
}

impl ReaderSource {
    pub fn new(
        reader: impl BufRead + 'static,
        description: impl Into<Rc<str>>,
        parent: Option<Location>,
    ) -> Self {
        ReaderSource {
            reader: Some(Box::new(reader)),
            description: description.into(),
            parent,
            line_no: 0,
        }
    }

    /// In-memory source over `text`.
    pub fn from_text(description: impl Into<Rc<str>>, text: &str) -> Self {
        ReaderSource::new(Cursor::new(text.to_string().into_bytes()), description, None)
    }

    /// Open `path` for reading.
    ///
    /// Without a charset the file is streamed as UTF-8. With one, the label is
    /// resolved through the WHATWG encoding registry and the file is decoded
    /// up front.
    pub fn open(
        path: &Path,
        charset: Option<&str>,
        parent: Option<Location>,
    ) -> Result<Self, SourceError> {
        let description = path.display().to_string();
        match charset {
            None => {
                info!(file = %description, "using default charset");
                let file = File::open(path).map_err(|e| SourceError::io(e, &description))?;
                Ok(ReaderSource::new(BufReader::new(file), description, parent))
            }
            Some(label) => {
                info!(file = %description, charset = label, "using charset");
                let encoding = Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| SourceError::UnknownCharset(label.to_string()))?;
                let bytes = std::fs::read(path).map_err(|e| SourceError::io(e, &description))?;
                let (text, used, had_errors) = encoding.decode(&bytes);
                if had_errors {
                    warn!(
                        file = %description,
                        charset = used.name(),
                        "malformed input replaced while decoding"
                    );
                }
                let text = text.into_owned();
                Ok(ReaderSource::new(Cursor::new(text.into_bytes()), description, parent))
            }
        }
    }
}

impl LineSource for ReaderSource {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut buf = String::new();
        let read = reader.read_line(&mut buf).map_err(|e| {
            SourceError::io(e, format!("{}:{}", self.description, self.line_no + 1))
        })?;
        if read == 0 {
            debug!(file = %self.description, lines = self.line_no, "end of input");
            self.reader = None;
            return Ok(None);
        }

        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        if self.line_no == 0 && buf.starts_with('\u{feff}') {
            buf.remove(0);
        }
        self.line_no += 1;

        let location =
            Location::new(Rc::clone(&self.description), self.line_no).with_parent(self.parent.clone());
        Ok(Some(Line::new(buf, location)))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}
