use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Header cells recognised as the name column, compared case-insensitively.
const NAME_HEADERS: &[&str] = &["name", "vollständiger name", "full name", "nachname"];

/// Column used for the name when the header names none of [`NAME_HEADERS`].
const DEFAULT_NAME_COLUMN: usize = 1;

const DEFAULT_OUTPUT_STEM: &str = "QR-Codes";

static CLASS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d{1,2}[a-z]_").expect("class tag pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("roster needs a header line and at least one data row")]
    EmptyRoster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub display_name: String,
}

impl Subject {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A parsed roster. Immutable: a new upload builds a new `Roster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    filename: String,
    raw_text: String,
    subjects: Vec<Subject>,
}

impl Roster {
    /// Lenient parse: short rows yield empty fields instead of failing.
    pub fn parse(filename: impl Into<String>, text: impl Into<String>) -> Result<Self, RosterError> {
        let raw_text = text.into();
        let lines: Vec<&str> = raw_text
            .trim()
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        if lines.len() < 2 {
            return Err(RosterError::EmptyRoster);
        }

        let name_column = name_column(lines[0]);
        let subjects = lines[1..]
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                let id = fields.first().copied().unwrap_or_default().to_string();
                let name = fields
                    .get(name_column)
                    .map(|field| field.replace('"', ""))
                    .unwrap_or_default();
                let display_name = if name.is_empty() {
                    format!("Subject {}", index + 1)
                } else {
                    name
                };
                Subject { id, display_name }
            })
            .collect();

        Ok(Self {
            filename: filename.into(),
            raw_text,
            subjects,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Output stem for generated sheets: `QR-Codes`, or `QR-Codes-10b` when the
    /// filename carries a class tag such as `_10b_`.
    pub fn output_stem(&self) -> String {
        match CLASS_TAG.find(&self.filename) {
            Some(tag) => format!("{DEFAULT_OUTPUT_STEM}-{}", tag.as_str().trim_matches('_')),
            None => DEFAULT_OUTPUT_STEM.to_string(),
        }
    }
}

fn name_column(header: &str) -> usize {
    header
        .split(',')
        .map(|cell| cell.trim().replace('"', "").to_lowercase())
        .position(|cell| NAME_HEADERS.contains(&cell.as_str()))
        .unwrap_or(DEFAULT_NAME_COLUMN)
}
