//! G-code file container: read a sliced file into lines and write it back.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GcodeError, Result};
use crate::line::{classify, Line};

/// Suffix appended to the file stem of processed output files.
const OUTPUT_SUFFIX: &str = "_fs";

/// Split raw file contents into classified lines, dropping blank lines.
pub fn parse_lines(bytes: &[u8]) -> Vec<Line> {
    bytes.split(|&b| b == b'\n').filter_map(classify).collect()
}

/// Read a G-code file into classified lines.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<Line>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let lines = parse_lines(&bytes);
    if lines.is_empty() {
        return Err(GcodeError::EmptyFile(path.to_path_buf()));
    }
    log::debug!("read {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Serialize lines to bytes, joined with CRLF.
pub fn serialize_lines<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(&line.to_bytes());
    }
    out
}

/// Write lines to a file, joined with CRLF.
pub fn write_lines<'a>(
    path: impl AsRef<Path>,
    lines: impl IntoIterator<Item = &'a Line>,
) -> Result<()> {
    fs::write(path.as_ref(), serialize_lines(lines))?;
    Ok(())
}

/// Output path for a processed file: `<stem>_fs.<ext>` next to the input.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    input.with_file_name(name)
}
