use std::collections::HashMap;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use subblock::{Line, Location};
use tracing::warn;

/// Renders preprocessor error lines against the files they point into.
/// Files are loaded on first use; locations that can't be read from disk
/// fall back to a plain `location: message` report.
pub struct Reporter {
    files: SimpleFiles<String, String>,
    ids: HashMap<String, Option<usize>>,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    pub fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            files: SimpleFiles::new(),
            ids: HashMap::new(),
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    fn file_id(&mut self, source: &str) -> Option<usize> {
        if let Some(id) = self.ids.get(source) {
            return *id;
        }
        let id = std::fs::read_to_string(source)
            .ok()
            .map(|contents| self.files.add(source.to_string(), contents));
        self.ids.insert(source.to_string(), id);
        id
    }

    fn label(&mut self, location: &Location) -> Option<Label<usize>> {
        let id = self.file_id(&location.source)?;
        let range = self.files.line_range(id, location.line.checked_sub(1)?).ok()?;
        let text = self.files.source(id).ok()?;
        let end = text[..range.end].trim_end_matches(['\r', '\n']).len().max(range.start);
        Some(Label::primary(id, range.start..end))
    }

    pub fn report(&mut self, line: &Line) {
        let Some(message) = line.error() else {
            return;
        };
        let location = line.location();
        let notes: Vec<String> = location
            .included_from()
            .map(|parent| format!("included from {}:{}", parent.source, parent.line))
            .collect();

        match self.label(location) {
            Some(label) => {
                let diagnostic = Diagnostic::error()
                    .with_message(message)
                    .with_labels(vec![label])
                    .with_notes(notes);
                if let Err(e) = term::emit_to_write_style(
                    &mut self.writer.lock(),
                    &self.config,
                    &self.files,
                    &diagnostic,
                ) {
                    warn!(error = %e, at = %location, "cannot render diagnostic");
                    eprintln!("error: {}: {}", location, message);
                }
            }
            None => eprintln!("error: {}: {}", location, message),
        }
    }
}
