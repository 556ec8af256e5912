//! Bundle descriptor (`SKILL.md`) parsing.
//!
//! A descriptor starts with a front-matter header:
//!
//! ```text
//! ---
//! name: pdf-tools
//! description: Extract text and tables from PDF files
//! ---
//! # Body
//! ```
//!
//! The header region is the span between the opening `---` line and the next
//! line consisting solely of `---`. Required keys are only recognised inside
//! that span; a key that appears after the closing marker does not count.

use crate::{BundleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default descriptor file name at the bundle root.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "SKILL.md";

/// Line that opens and closes the header block.
pub const HEADER_MARKER: &str = "---";

/// Keys every descriptor header must define.
pub const REQUIRED_KEYS: [&str; 2] = ["name", "description"];

/// Where to find the descriptor and what its header must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRules {
    /// File name of the descriptor at the bundle/archive root.
    pub file_name: String,
    /// Keys required in addition to [`REQUIRED_KEYS`].
    pub extra_required_keys: Vec<String>,
}

impl Default for DescriptorRules {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_DESCRIPTOR_NAME.to_string(),
            extra_required_keys: Vec::new(),
        }
    }
}

impl DescriptorRules {
    /// Override the descriptor file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Require an additional header key.
    pub fn with_required_key(mut self, key: impl Into<String>) -> Self {
        self.extra_required_keys.push(key.into());
        self
    }

    /// All required keys, built-in ones first.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .chain(self.extra_required_keys.iter().map(String::as_str))
    }
}

/// Parsed descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Value of the `name` key.
    pub name: String,

    /// Value of the `description` key.
    pub description: String,

    /// Every top-level `key: value` pair of the header.
    pub fields: BTreeMap<String, String>,

    /// Text after the closing marker.
    #[serde(skip)]
    pub body: String,
}

impl Descriptor {
    /// Parse raw descriptor bytes, which must be UTF-8.
    pub fn from_bytes(bytes: &[u8], rules: &DescriptorRules) -> Result<Self> {
        let content = std::str::from_utf8(bytes).map_err(|e| {
            BundleError::MalformedHeader(format!("{} is not valid UTF-8: {e}", rules.file_name))
        })?;
        Self::parse(content, rules)
    }

    /// Parse descriptor text.
    pub fn parse(content: &str, rules: &DescriptorRules) -> Result<Self> {
        let (header, body) = split_header(content)?;
        let fields = parse_fields(header);

        let missing: Vec<String> = rules
            .required_keys()
            .filter(|key| !fields.contains_key(*key))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(BundleError::MissingRequiredKey { keys: missing });
        }

        Ok(Self {
            name: fields.get("name").cloned().unwrap_or_default(),
            description: fields.get("description").cloned().unwrap_or_default(),
            fields,
            body: body.to_string(),
        })
    }

    /// Look up a header value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Split content into (header, body), excluding both marker lines.
fn split_header(content: &str) -> Result<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    if first.trim_end() != HEADER_MARKER {
        return Err(BundleError::MalformedHeader(format!(
            "content does not start with a '{HEADER_MARKER}' line"
        )));
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == HEADER_MARKER {
            return Ok((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(BundleError::MalformedHeader(format!(
        "header is not closed by a second '{HEADER_MARKER}' line"
    )))
}

fn parse_fields(header: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    for line in header.lines() {
        // Nested/continuation lines and comments never define a top-level key.
        if line.is_empty() || line.starts_with(char::is_whitespace) || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.starts_with('-') {
            continue;
        }
        fields
            .entry(key.to_string())
            .or_insert_with(|| unquote(value.trim()).to_string());
    }

    fields
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
