//! Per-record list/extract decisions and the output they produce.

use std::io::{self, Write};

use crate::file::{FileName, FileRecord};
use crate::walk::{FileEntry, FileTable};
use crate::{CbfsError, Result};

/// What to do with the records of a file table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Print the name of every record that passes the type filter.
    pub list: bool,
    /// Extract the first record whose name matches this target.
    pub read: Option<String>,
    /// Only consider records of exactly this type.
    pub file_type: Option<u32>,
}

impl Selection {
    pub fn list() -> Self {
        Self {
            list: true,
            ..Self::default()
        }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self {
            read: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, file_type: u32) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn type_matches(&self, record: &FileRecord) -> bool {
        self.file_type
            .map_or(true, |file_type| record.file_type == file_type)
    }

    /// Whether `entry` is the extraction target.
    ///
    /// The name comparison is bounded by the candidate record's name capacity, see
    /// [`FileName::matches`].
    pub fn is_target(&self, entry: &FileEntry<'_>) -> bool {
        match &self.read {
            Some(target) => {
                self.type_matches(&entry.record) && entry.name.matches(target.as_bytes())
            }
            None => false,
        }
    }
}

/// Destination for listed names and extracted payloads.
#[derive(Debug)]
pub struct OutputSink<W> {
    inner: W,
}

impl<W: Write> OutputSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn emit_name(&mut self, name: &FileName<'_>) -> Result<()> {
        self.write_bytes(name.as_bytes())?;
        self.write_bytes(b"\n")
    }

    pub fn emit_payload(&mut self, data: &[u8]) -> Result<()> {
        self.write_bytes(data)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(CbfsError::WriteFailure)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    // Tolerates short writes; a zero-length write or any error ends the run.
    fn write_bytes(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match self.inner.write(data) {
                Ok(0) => {
                    return Err(CbfsError::WriteFailure(io::Error::from(
                        io::ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => data = &data[n..],
                Err(err) => return Err(CbfsError::WriteFailure(err)),
            }
        }
        Ok(())
    }
}

/// Counts reported by [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Records examined before the walk ended.
    pub scanned: usize,
    /// Names written in list mode.
    pub listed: usize,
    /// Physical address and length of the extracted payload.
    pub extracted: Option<(u64, u32)>,
}

/// Walks `table`, listing and/or extracting records as `selection` asks.
///
/// Extraction stops the walk at the first match. If a read target is set and nothing matched,
/// fails with [`CbfsError::TargetNotFound`]; names listed before that point have already been
/// written.
pub fn run<W: Write>(
    table: &FileTable,
    selection: &Selection,
    sink: &mut OutputSink<W>,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for entry in table.files() {
        let entry = entry?;
        summary.scanned += 1;

        if selection.list && selection.type_matches(&entry.record) {
            sink.emit_name(&entry.name)?;
            summary.listed += 1;
        }

        if selection.is_target(&entry) {
            let data_start = entry.data_start();
            tracing::debug!("Seeking to 0x{data_start:x}");
            let data = table.data(&entry)?;

            tracing::debug!("-------- Start Data");
            sink.emit_payload(data)?;
            tracing::debug!("-------- End Data");

            summary.extracted = Some((data_start, entry.record.len));
            break;
        }
    }

    sink.flush()?;

    if let Some(target) = &selection.read {
        if summary.extracted.is_none() {
            return Err(CbfsError::TargetNotFound {
                name: target.clone(),
            });
        }
    }

    Ok(summary)
}
