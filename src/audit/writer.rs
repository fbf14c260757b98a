//! Incremental JSON array writer.
//!
//! Records are serialized one at a time as they arrive, so memory use does
//! not grow with the size of the export. The document is only valid once
//! [`JsonArrayWriter::close`] has written the closing bracket; a run that
//! dies earlier leaves a truncated file behind.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    NotStarted,
    Open,
    Closed,
}

/// Record layout inside the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Two-space indented records.
    #[default]
    Pretty,
    /// One record per line.
    Compact,
}

pub struct JsonArrayWriter<W: Write> {
    inner: W,
    layout: Layout,
    state: WriterState,
    written: usize,
}

impl JsonArrayWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and wrap it.
    pub fn create(path: impl AsRef<Path>, layout: Layout) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::Write(std::io::Error::new(
                e.kind(),
                format!("cannot create {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self::new(BufWriter::new(file), layout))
    }
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(inner: W, layout: Layout) -> Self {
        Self {
            inner,
            layout,
            state: WriterState::NotStarted,
            written: 0,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write the opening bracket.
    pub fn open(&mut self) -> Result<()> {
        if self.state != WriterState::NotStarted {
            return Err(Error::InvalidState("array already opened"));
        }
        self.inner.write_all(b"[")?;
        self.state = WriterState::Open;
        Ok(())
    }

    /// Append one record, preceded by a separator unless it is the first.
    pub fn write_record<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<()> {
        match self.state {
            WriterState::NotStarted => return Err(Error::InvalidState("array not opened")),
            WriterState::Closed => return Err(Error::InvalidState("array already closed")),
            WriterState::Open => {}
        }

        if self.written > 0 {
            self.inner.write_all(b",")?;
        }
        self.inner.write_all(b"\n")?;
        match self.layout {
            Layout::Pretty => serde_json::to_writer_pretty(&mut self.inner, record),
            Layout::Compact => serde_json::to_writer(&mut self.inner, record),
        }
        .map_err(std::io::Error::from)?;

        self.written += 1;
        Ok(())
    }

    /// Write the closing bracket and flush. Returns the record count.
    pub fn close(&mut self) -> Result<usize> {
        match self.state {
            WriterState::NotStarted => return Err(Error::InvalidState("array not opened")),
            WriterState::Closed => return Err(Error::InvalidState("array already closed")),
            WriterState::Open => {}
        }
        self.inner.write_all(b"\n]\n")?;
        self.inner.flush()?;
        self.state = WriterState::Closed;
        Ok(self.written)
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
