use linesrc::{Directive, ErrorSource, Line, LineSource, ReaderSource, SourceError, SubRef};
use tracing::{debug, warn};

use crate::context::PassContext;
use crate::fs::with_environment_variables;
use crate::registry::SubRegistry;
use crate::sub::Sub;

/// The sub-block stage: filters `!startsub`, `!endsub` and `!includesub`
/// out of its upstream, capturing and replaying named blocks of lines.
///
/// Two independent slots drive it. `learning` names the block currently
/// receiving output lines; `replay` is the source an `!includesub` is being
/// served from. A new `!startsub` redirects learning without any implicit
/// `!endsub`; the previous block simply stops growing.
pub struct SubEngine {
    source: Box<dyn LineSource>,
    context: PassContext,
    subs: SubRegistry,
    learning: Option<String>,
    replay: Option<Box<dyn LineSource>>,
    closed: bool,
}

impl SubEngine {
    pub fn new(context: PassContext, source: Box<dyn LineSource>) -> Self {
        SubEngine {
            source,
            context,
            subs: SubRegistry::new(),
            learning: None,
            replay: None,
            closed: false,
        }
    }

    pub fn registry(&self) -> &SubRegistry {
        &self.subs
    }

    /// Name of the block currently being learned, if any.
    pub fn learning(&self) -> Option<&str> {
        self.learning.as_deref()
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_some()
    }

    /// Look up a block, registering an empty one if the name is new.
    pub fn sub(&mut self, name: &str) -> &Sub {
        self.subs.get_or_create(name)
    }

    fn eventually_learn(&mut self, line: &Line) {
        if let Some(name) = self.learning.as_deref() {
            self.subs.get_or_create(name).append(line.clone());
        }
    }

    /// Resolve an include into the source its lines will be replayed from.
    ///
    /// A reference to a missing file or a directory comes back as `Err` with
    /// the error line to emit in place of the directive. Failures reading an
    /// existing file are replayed as a one-line `ErrorSource`.
    fn resolve(&mut self, directive: &Line, reference: &SubRef) -> Result<Box<dyn LineSource>, Line> {
        let anchor = directive.location();
        match reference {
            SubRef::Local(name) => {
                let sub = self.subs.get_or_create(name);
                debug!(sub = %name, lines = sub.len(), at = %anchor, "including local sub");
                Ok(Box::new(sub.to_source(anchor)))
            }
            SubRef::External { path, name } => {
                let fs = &self.context.fs;
                let file = fs.resolve(&with_environment_variables(path));
                if !fs.exists(&file) || fs.is_dir(&file) {
                    warn!(file = %file.display(), at = %anchor, "cannot include");
                    return Err(directive.with_error(format!("Cannot include {}", file.display())));
                }
                if self.context.is_including(&file) {
                    warn!(file = %file.display(), at = %anchor, "recursive include");
                    return Err(directive.with_error(format!(
                        "Cannot include {}: recursive inclusion",
                        file.display()
                    )));
                }

                let input = match ReaderSource::open(
                    &file,
                    self.context.charset.as_deref(),
                    Some(anchor.clone()),
                ) {
                    Ok(input) => input,
                    Err(e) => {
                        warn!(file = %file.display(), error = %e, "cannot open include");
                        return Ok(Box::new(ErrorSource::new(directive, e.to_string())));
                    }
                };
                let ctx = self.context.nested(&file);
                let mut nested = ctx.passes.open(ctx.clone(), Box::new(input));

                // Blocks are only registered as their lines stream past, so the
                // whole file has to be read before the name can be looked up.
                let drained = nested.drain();
                let closed = nested.close();
                let count = match drained.and_then(|count| closed.map(|_| count)) {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(file = %file.display(), error = %e, "nested pass failed");
                        return Ok(Box::new(ErrorSource::new(directive, e.to_string())));
                    }
                };

                let sub = nested.sub(name);
                debug!(
                    file = %file.display(),
                    sub = %name,
                    drained = count,
                    lines = sub.len(),
                    "including external sub"
                );
                Ok(Box::new(sub.to_source(anchor)))
            }
        }
    }
}

impl LineSource for SubEngine {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some(replay) = self.replay.as_mut() {
                if let Some(line) = replay.next_line()? {
                    self.eventually_learn(&line);
                    return Ok(Some(line));
                }
                if let Some(mut finished) = self.replay.take() {
                    finished.close()?;
                }
            }

            let Some(line) = self.source.next_line()? else {
                return Ok(None);
            };

            match Directive::parse(line.text()) {
                Some(Directive::IncludeSub(reference)) => match self.resolve(&line, &reference) {
                    Ok(replay) => self.replay = Some(replay),
                    Err(error_line) => return Ok(Some(error_line)),
                },
                Some(Directive::StartSub(name)) => {
                    debug!(sub = %name, at = %line.location(), "start learning");
                    self.subs.get_or_create(&name);
                    self.learning = Some(name);
                }
                Some(Directive::EndSub) => {
                    debug!(sub = ?self.learning, at = %line.location(), "stop learning");
                    self.learning = None;
                }
                None => {
                    self.eventually_learn(&line);
                    return Ok(Some(line));
                }
            }
        }
    }

    /// Release the upstream and any in-flight replay. Captured blocks stay
    /// readable until the engine is dropped.
    fn close(&mut self) -> Result<(), SourceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.learning = None;
        let replay = match self.replay.take() {
            Some(mut replay) => replay.close(),
            None => Ok(()),
        };
        let source = self.source.close();
        replay.and(source)
    }
}
