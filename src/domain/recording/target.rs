//! Output target value object and file-name resolution

use std::fmt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::error::FormatError;

use super::format::{AudioFormat, Container};

/// What to do when the output file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExistingFileAction {
    /// Truncate and reuse the path
    #[default]
    Overwrite,
    /// Append `_1`, or bump an existing `_N`, until the name is free
    AppendSuffix,
}

impl ExistingFileAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::AppendSuffix => "suffix",
        }
    }
}

impl fmt::Display for ExistingFileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExistingFileAction {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "suffix" | "append-suffix" | "append_suffix" => Ok(Self::AppendSuffix),
            _ => Err(FormatError::ExistingFileAction(s.to_string())),
        }
    }
}

/// Where and how one session writes its output.
/// Fixed once the session is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
    format: AudioFormat,
}

impl OutputTarget {
    /// Target an already-resolved path
    pub fn new(path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Resolve a user-supplied path against `base_dir`, fix its extension
    /// for the codec and apply the existing-file policy.
    pub fn resolve(
        base_dir: &Path,
        requested: &Path,
        format: AudioFormat,
        action: ExistingFileAction,
    ) -> Self {
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            base_dir.join(requested)
        };
        let with_extension = with_codec_extension(&joined, format.codec().extension());
        let path = match action {
            ExistingFileAction::Overwrite => with_extension,
            ExistingFileAction::AppendSuffix => {
                next_free_path(&with_extension, |candidate| candidate.exists())
            }
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn container(&self) -> Container {
        self.format.container()
    }
}

/// Append `.ext` unless the path already ends in it (case-insensitive).
pub fn with_codec_extension(path: &Path, extension: &str) -> PathBuf {
    let matches = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if matches {
        return path.to_path_buf();
    }
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// First candidate of `stem_N.ext` that `exists` reports as free.
///
/// Returns `path` unchanged when it is free already. An existing numeric
/// suffix is incremented rather than stacked (`take_3.wav` → `take_4.wav`).
pub fn next_free_path(path: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
    if !exists(path) {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    let (base, mut number) = split_numeric_suffix(&stem);

    loop {
        number += 1;
        let file_name = match &extension {
            Some(ext) => format!("{}_{}.{}", base, number, ext),
            None => format!("{}_{}", base, number),
        };
        let candidate = path.with_file_name(file_name);
        if !exists(&candidate) {
            return candidate;
        }
    }
}

/// Split `name_12` into (`name`, 12); names without a suffix yield 0.
fn split_numeric_suffix(stem: &str) -> (&str, u64) {
    if let Some((base, digits)) = stem.rsplit_once('_') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(number) = digits.parse::<u64>() {
                return (base, number);
            }
        }
    }
    (stem, 0)
}
