//! Atomic, byte-preserving I/O for declaration files

use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::path::Path;

use crate::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Line terminator convention of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl Newline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Pick the dominant convention: CRLF if any CRLF is present, else bare
    /// CR if any CR is present, else LF.
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else if text.contains('\r') {
            Self::Cr
        } else {
            Self::Lf
        }
    }
}

/// How a file was encoded on disk, so it can be re-emitted the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextEncoding {
    /// The file started with a UTF-8 byte-order mark
    pub bom: bool,
    /// Dominant line terminator
    pub newline: Newline,
}

/// Decoded file content plus the encoding it was read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    /// Text with the BOM removed and line terminators untouched
    pub text: String,
    pub encoding: TextEncoding,
}

/// Read a file as UTF-8 text, remembering BOM presence and newline style.
///
/// Content that is not valid UTF-8 is rejected rather than decoded lossily,
/// since a lossy decode would alter bytes on the way back out.
pub fn read_text_preserve(path: &Path) -> Result<TextFile> {
    let raw = fs::read(path).map_err(|e| Error::io(path, e))?;
    let (bom, body) = match raw.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, raw.as_slice()),
    };
    let text = std::str::from_utf8(body)
        .map_err(|_| Error::InvalidEncoding {
            path: path.to_path_buf(),
        })?
        .to_string();
    let newline = Newline::detect(&text);

    Ok(TextFile {
        text,
        encoding: TextEncoding { bom, newline },
    })
}

/// Rewrite every line terminator (`\r\n`, `\r`, `\n`) to `newline`.
pub fn normalize_newlines(text: &str, newline: Newline) -> String {
    let target = newline.as_str();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(target);
            }
            '\n' => out.push_str(target),
            other => out.push(other),
        }
    }

    out
}

/// Encode `text` with the given encoding and replace `path` atomically.
///
/// Mixed terminators collapse to the encoding's single newline style.
pub fn write_text_preserve(path: &Path, text: &str, encoding: TextEncoding) -> Result<()> {
    let body = normalize_newlines(text, encoding.newline);
    let mut payload = Vec::with_capacity(body.len() + UTF8_BOM.len());
    if encoding.bom {
        payload.extend_from_slice(UTF8_BOM);
    }
    payload.extend_from_slice(body.as_bytes());
    write_atomic(path, &payload)
}

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename in the target's directory so a crash never
/// leaves a truncated file behind. The replaced file's permissions carry over.
/// Removing a leftover temp file after a failure is best-effort.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Ensure parent directory exists
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = parent.join(temp_name);
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let outcome = write_then_rename(&temp_path, path, content, permissions);
    if outcome.is_err()
        && temp_path.exists()
        && let Err(e) = fs::remove_file(&temp_path)
    {
        tracing::warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
    }
    outcome
}

fn write_then_rename(
    temp_path: &Path,
    target: &Path,
    content: &[u8],
    permissions: Option<Permissions>,
) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    // Flush to disk
    temp_file
        .sync_all()
        .map_err(|e| Error::io(temp_path, e))?;
    drop(temp_file);

    if let Some(permissions) = permissions {
        fs::set_permissions(temp_path, permissions).map_err(|e| Error::io(temp_path, e))?;
    }

    // Atomic rename
    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))
}
