//! ZIP container input and output.
//!
//! Only two operations are needed from the container: read a named entry as
//! bytes, and write a named entry from bytes.

use std::io::{Cursor, Read, Seek, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::batch::{BatchOutput, BatchProcessor, EntrySource, Progress};
use crate::detector::Detector;
use crate::error::{Error, Result};

/// A ZIP archive opened for reading.
pub struct ZipSource<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipSource<R> {
    /// Open an archive from a seekable reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Archive`] if the central directory cannot be read.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> EntrySource for ZipSource<R> {
    fn entry_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        debug!(entry = name, bytes = data.len(), "read archive entry");
        Ok(data)
    }
}

/// Write `(name, bytes)` entries into a new deflate-compressed archive.
///
/// # Errors
///
/// Returns [`Error::Archive`] or [`Error::Io`] if writing fails.
pub fn write_archive<'a, W, I>(writer: W, entries: I) -> Result<W>
where
    W: Write + Seek,
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }
    Ok(zip.finish()?)
}

/// Repair every pair in an in-memory ZIP archive.
///
/// Returns the output archive bytes (one entry per repaired image, named
/// after the watermarked file) together with the per-pair results; call
/// [`BatchOutput::report`] for the text report.
///
/// # Errors
///
/// Fails without output if the input is not a readable archive, if it has
/// no valid pairs, or if the output archive cannot be written.
pub fn repair_archive<D, F>(
    processor: &BatchProcessor<D>,
    input: &[u8],
    progress: F,
) -> Result<(Vec<u8>, BatchOutput)>
where
    D: Detector,
    F: FnMut(Progress<'_>),
{
    let mut source = ZipSource::new(Cursor::new(input))?;
    let output = processor.process(&mut source, progress)?;
    let archive = write_archive(Cursor::new(Vec::new()), output.outputs())?.into_inner();
    Ok((archive, output))
}

/// Read every non-directory entry of an in-memory archive.
///
/// # Errors
///
/// Returns [`Error::Archive`] if the archive or an entry is unreadable.
pub fn read_entries(input: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut source = ZipSource::new(Cursor::new(input))?;
    source
        .entry_names()
        .into_iter()
        .map(|name| {
            let data = source.read_entry(&name)?;
            Ok::<_, Error>((name, data))
        })
        .collect()
}
