use crate::config::ConventionConfig;
use std::fmt;
use std::path::Path;

/// Contributor names inside a filename are joined with this character, and it
/// also separates the sheet number head and the marker tail.
pub const TOKEN_SEPARATOR: char = '_';

/// Zero-padded two-digit sheet number, e.g. `01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNumber(String);

impl SheetNumber {
    /// Normalizes user input: `1` becomes `01`, `07` stays `07`.
    pub fn parse(raw: &str) -> Result<Self, InvalidSheetNumber> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidSheetNumber {
                raw: raw.to_string(),
            });
        }

        let normalized = if trimmed.len() == 1 {
            format!("0{trimmed}")
        } else {
            trimmed.to_string()
        };
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("'{raw}' is not a valid sheet number (digits only)")]
pub struct InvalidSheetNumber {
    pub raw: String,
}

/// Fixed head/tail convention for one sheet:
/// `{NN}_{name}[_{name}...]_{marker}.{ext}`.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    sheet: SheetNumber,
    head: String,
    marker: String,
    extensions: Vec<String>,
}

impl NamingConvention {
    pub fn for_sheet(sheet: &SheetNumber, settings: &ConventionConfig) -> Self {
        Self {
            sheet: sheet.clone(),
            head: format!("{}{}", sheet, TOKEN_SEPARATOR),
            marker: settings.marker.clone(),
            extensions: settings.extensions.clone(),
        }
    }

    pub fn sheet(&self) -> &SheetNumber {
        &self.sheet
    }

    /// Extracts a submission from a filename, or `None` when the name does
    /// not follow the convention. Other files may legitimately share the
    /// folder, so a miss is not an error.
    pub fn parse(&self, filename: &str) -> Option<SubmissionFile> {
        let rest = filename.strip_prefix(&self.head)?;

        for extension in &self.extensions {
            let tail = format!("{}{}.{}", TOKEN_SEPARATOR, self.marker, extension);
            if let Some(middle) = rest.strip_suffix(&tail) {
                if middle.is_empty() {
                    return None;
                }

                let tokens = middle
                    .split(TOKEN_SEPARATOR)
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                return Some(SubmissionFile {
                    filename: filename.to_string(),
                    sheet: self.sheet.clone(),
                    tokens,
                    extension: extension.clone(),
                });
            }
        }

        None
    }
}

/// One corrected-homework file, decomposed per the naming convention.
///
/// `tokens` holds one surname per contributor, in filename order; rejoining
/// them with [`TOKEN_SEPARATOR`] reconstructs the middle segment exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFile {
    pub filename: String,
    pub sheet: SheetNumber,
    pub tokens: Vec<String>,
    pub extension: String,
}

/// Applies the convention to a directory listing, preserving listing order.
/// Zero matches is a valid, reportable outcome.
pub fn submissions_from_listing<'a, I>(names: I, convention: &NamingConvention) -> Vec<SubmissionFile>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| convention.parse(name))
        .collect()
}

/// File names in `path`, sorted so downstream prompts appear in a
/// reproducible order regardless of filesystem enumeration.
pub fn list_directory(path: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
