//! Debian control paragraph parsing
//!
//! A control file is a deb822 document: paragraphs separated by blank
//! lines, each made of `Key: value` fields with optional continuation
//! lines indented by a space or tab.

use crate::error::{LoadError, LoadResult};
use serde::Serialize;
use std::fmt;

/// Ordered fields of a single control paragraph
///
/// Keys are unique and compared case-insensitively, as dpkg does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    fields: Vec<(String, String)>,
}

impl Descriptor {
    /// Look up a field value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Fields in the order they appeared
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Package name, or `None` if absent
    pub fn name(&self) -> Option<&str> {
        self.get("Package")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    pub fn architecture(&self) -> Option<&str> {
        self.get("Architecture")
    }

    /// Identity triple; absent fields become empty strings
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity {
            name: self.name().unwrap_or_default().to_string(),
            version: self.version().unwrap_or_default().to_string(),
            architecture: self.architecture().unwrap_or_default().to_string(),
        }
    }

    fn push(&mut self, key: &str, value: String) -> LoadResult<()> {
        if self.get(key).is_some() {
            return Err(LoadError::Malformed(format!("duplicate field {}", key)));
        }
        self.fields.push((key.to_string(), value));
        Ok(())
    }

    fn append_continuation(&mut self, line: &str) -> LoadResult<()> {
        let (_, value) = self.fields.last_mut().ok_or_else(|| {
            LoadError::Malformed("continuation line before first field".to_string())
        })?;
        value.push('\n');
        value.push_str(line.trim());
        Ok(())
    }
}

/// The (name, version, architecture) triple naming a package entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.name, self.version, self.architecture)
    }
}

/// Parse every paragraph of a control document
pub fn parse_paragraphs(text: &str) -> LoadResult<Vec<Descriptor>> {
    let mut paragraphs = Vec::new();
    let mut current = Descriptor::default();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            current.append_continuation(line)?;
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| {
            LoadError::Malformed(format!("line {}: expected 'Key: value'", idx + 1))
        })?;
        let key = key.trim_end();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(LoadError::Malformed(format!(
                "line {}: invalid field name '{}'",
                idx + 1,
                key
            )));
        }
        current.push(key, value.trim().to_string())?;
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs)
}

/// Decode raw control bytes, which must be UTF-8
pub fn decode_control(control: Vec<u8>) -> LoadResult<String> {
    String::from_utf8(control).map_err(|e| LoadError::Malformed(format!("not UTF-8: {}", e)))
}

/// Parse a control file that must contain exactly one paragraph
pub fn parse_descriptor(text: &str) -> LoadResult<Descriptor> {
    let mut paragraphs = parse_paragraphs(text)?;
    match paragraphs.len() {
        0 => Err(LoadError::NoParagraphs),
        1 => Ok(paragraphs.remove(0)),
        _ => Err(LoadError::TooManyParagraphs),
    }
}

/// Check the mandatory identity fields and the checksum
pub fn validate(descriptor: &Descriptor, md5sum: &str) -> LoadResult<()> {
    for field in ["Package", "Architecture", "Version"] {
        if descriptor.get(field).is_none_or(str::is_empty) {
            return Err(LoadError::MissingField(field));
        }
    }
    if md5sum.is_empty() {
        return Err(LoadError::MissingChecksum);
    }
    Ok(())
}
