//! URL query string form of a [`Query`]
//!
//! `?query=<terms>&bildnr=<n>&dekade=<n>&thema=<a,b>&autor=<name>` with the
//! terms comma separated and every value percent-encoded.

use super::{Field, Query, SUBJECT_SEPARATORS};
use crate::error::{ArchiveError, Result};

/// Separators between terms of the `query` parameter
const TERM_SEPARATORS: &[char] = &[',', ' ', '\t', '\n', '\r', ';'];

const TERMS_KEY: &str = "query";

impl Query {
    /// Parse a URL query string, with or without the leading `?`
    ///
    /// Unknown keys are ignored. A segment that does not split into exactly
    /// one key and one value, or a decade or image number that is not an
    /// integer, is a [`ArchiveError::Format`] error. Returns `Ok(None)` when
    /// the string carries no restriction.
    pub fn parse_url(query: &str) -> Result<Option<Self>> {
        let query = query.trim();
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut parsed = Self::default();

        for component in query.split('&').filter(|c| !c.is_empty()) {
            let parts: Vec<&str> = component
                .split('=')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();

            let [key, value] = parts.as_slice() else {
                return Err(ArchiveError::Format(format!(
                    "Invalid url query ('{query}'): component '{component}' must be split by '=' into 2 parts"
                )));
            };

            let key = key.to_lowercase();
            if key == TERMS_KEY {
                for term in value.split(TERM_SEPARATORS).filter(|t| !t.trim().is_empty()) {
                    let term = decode(term.trim())?;
                    if !term.trim().is_empty() {
                        parsed.terms.push(term);
                    }
                }
                continue;
            }

            match Field::from_key(&key) {
                Some(Field::Decade) => parsed.decade = Some(parse_number(value, "decade")?),
                Some(Field::ImageNr) => parsed.image_nr = Some(parse_number(value, "image number")?),
                Some(Field::Subject) => parsed.subjects = decode_subjects(value)?,
                Some(Field::Author) => {
                    let author = decode(value)?;
                    parsed.author = Some(author).filter(|a| !a.trim().is_empty());
                }
                None => tracing::debug!("Ignoring unknown url parameter '{}'", key),
            }
        }

        if parsed.is_empty() {
            return Ok(None);
        }

        Ok(Some(parsed))
    }

    /// URL query string with a leading `?`, or the empty string for an empty query
    pub fn to_url(&self) -> String {
        let mut components = Vec::new();

        if !self.terms.is_empty() {
            let terms: Vec<String> = self
                .terms
                .iter()
                .map(|t| urlencoding::encode(t).into_owned())
                .collect();
            components.push(format!("{}={}", TERMS_KEY, terms.join(",")));
        }
        if let Some(image_nr) = self.image_nr {
            components.push(format!("{}={}", Field::ImageNr.canonical_key(), image_nr));
        }
        if let Some(decade) = self.decade {
            components.push(format!("{}={}", Field::Decade.canonical_key(), decade));
        }
        if !self.subjects.is_empty() {
            let subjects: Vec<String> = self
                .subjects
                .iter()
                .map(|s| urlencoding::encode(s).into_owned())
                .collect();
            components.push(format!(
                "{}={}",
                Field::Subject.canonical_key(),
                subjects.join(",")
            ));
        }
        if let Some(author) = self.author() {
            components.push(format!(
                "{}={}",
                Field::Author.canonical_key(),
                urlencoding::encode(author)
            ));
        }

        if components.is_empty() {
            return String::new();
        }

        format!("?{}", components.join("&"))
    }
}

fn parse_number(value: &str, what: &str) -> Result<i32> {
    value
        .parse()
        .map_err(|_| ArchiveError::Format(format!("'{value}' is not a valid {what}")))
}

/// Split on the raw value so encoded separators stay inside an element
fn decode_subjects(value: &str) -> Result<Vec<String>> {
    let mut subjects = Vec::new();
    for element in value.split(SUBJECT_SEPARATORS) {
        let decoded = decode(element.trim())?;
        let decoded = decoded.trim();
        if !decoded.is_empty() {
            subjects.push(decoded.to_string());
        }
    }
    Ok(subjects)
}

/// Percent-decode a value, treating `+` as a space
fn decode(value: &str) -> Result<String> {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ArchiveError::Format(format!("'{value}' is not valid url encoding: {e}")))
}
