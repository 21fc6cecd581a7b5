//! File output: the raw response as JSON or the extracted rows as CSV.
//!
//! Writes go to a temporary file in the target directory which is renamed
//! over the target only once fully written, so a failed run never leaves a
//! truncated file behind.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tempfile::NamedTempFile;

use crate::config::SettingsError;
use crate::error::{Error, Result};
use crate::report::{extract_all, FlatRecord, RawReportResponse};

/// Header row of the CSV output.
pub const CSV_HEADER: [&str; 2] = ["Country", "Sessions"];

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// The raw API response, pretty-printed.
    Json,
    /// The extracted rows with a header.
    Csv,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Csv => "csv",
        }
    }
}

impl FromStr for FileFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            other => Err(SettingsError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a file write serializes.
#[derive(Debug, Clone, Copy)]
pub enum FileSource<'a> {
    /// The response exactly as the API returned it.
    Raw(&'a RawReportResponse),
    /// Rows already extracted from a response.
    Records(&'a [FlatRecord]),
}

/// Write `source` to `path` in the given format.
///
/// A raw response written as CSV is extracted first. Records cannot be
/// written as JSON since the raw response is gone by then.
pub fn write_file(source: FileSource<'_>, format: FileFormat, path: &Path) -> Result<usize> {
    match (format, source) {
        (FileFormat::Json, FileSource::Raw(response)) => {
            write_json(response, path)?;
            Ok(response.row_count())
        }
        (FileFormat::Json, FileSource::Records(_)) => Err(Error::config(
            "JSON output writes the raw response, not extracted records",
        )),
        (FileFormat::Csv, FileSource::Records(records)) => {
            write_csv(records, path)?;
            Ok(records.len())
        }
        (FileFormat::Csv, FileSource::Raw(response)) => {
            let records = extract_all(response)?;
            write_csv(&records, path)?;
            Ok(records.len())
        }
    }
}

/// Write the raw response as JSON with 2-space indentation.
pub fn write_json(response: &RawReportResponse, path: &Path) -> Result<()> {
    write_atomically(path, |out| {
        serde_json::to_writer_pretty(&mut *out, response).map_err(std::io::Error::from)?;
        out.write_all(b"\n")
    })?;
    tracing::info!(path = %path.display(), reports = response.reports.len(), "wrote JSON report");
    Ok(())
}

/// Write records as CSV: the header row, then one `country,sessions` line per record.
pub fn write_csv(records: &[FlatRecord], path: &Path) -> Result<()> {
    write_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(CSV_HEADER).map_err(csv_io)?;
        for record in records {
            writer
                .write_record([record.country.as_str(), record.sessions.as_str()])
                .map_err(csv_io)?;
        }
        writer.flush()
    })?;
    tracing::info!(path = %path.display(), records = records.len(), "wrote CSV report");
    Ok(())
}

fn csv_io(e: csv::Error) -> std::io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::other(format!("{:?}", other)),
    }
}

/// Run `write` against a temp file next to `path`, then move it into place.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> std::io::Result<()>,
{
    if path.as_os_str().is_empty() {
        return Err(Error::config("output path is empty"));
    }
    if path.is_dir() {
        return Err(Error::config(format!(
            "output path '{}' is a directory",
            path.display()
        )));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = temp_file_in(dir, path).map_err(|e| Error::io(path, e))?;
    {
        let mut out = BufWriter::new(&mut tmp);
        write(&mut out).map_err(|e| Error::io(path, e))?;
        out.flush().map_err(|e| Error::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Temp file that ends up with the permissions a plain create or overwrite
/// of `target` would give: the existing file's mode, or the umask default.
fn temp_file_in(dir: &Path, target: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let tmp = builder.tempfile_in(dir)?;

    match fs::metadata(target) {
        Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    Ok(tmp)
}
