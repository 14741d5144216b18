//! Query model
//!
//! A [`Query`] is the structured form of what the user typed: free-text terms
//! plus optional image number, decade, subject path and author. It converts
//! between free text, canonical text and the URL query string.

mod person;
mod tokenizer;
mod url;

pub use person::{Person, ResolvedQuery};
pub use tokenizer::{tokenize, Token};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

const DECADE_KEYS: &[&str] = &["dekade", "dec", "decade", "dek"];
const IMAGE_NR_KEYS: &[&str] = &["bildnr", "img", "image", "bild"];
const SUBJECT_KEYS: &[&str] = &["thema", "subj", "subject"];
const AUTHOR_KEYS: &[&str] = &["autor", "author"];

/// Separators between subject path elements in free text and URLs
const SUBJECT_SEPARATORS: &[char] = &['>', ','];

/// Structured search query
///
/// Equality and hashing compare `terms` and `subjects` case-insensitively and
/// independent of order; `image_nr`, `decade` and `author` compare exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Free-text terms, each matched as a substring of the description
    #[serde(default)]
    pub terms: Vec<String>,

    /// Exact image number
    pub image_nr: Option<i32>,

    /// Decade as its first year (e.g. 1950)
    pub decade: Option<i32>,

    /// Subject path, outermost first
    #[serde(default)]
    pub subjects: Vec<String>,

    /// Author name as typed by the user
    pub author: Option<String>,
}

/// Query dimension addressed by a `key:value` fragment or URL parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Decade,
    ImageNr,
    Subject,
    Author,
}

impl Field {
    /// Look up the field for a key, accepting every synonym
    pub(crate) fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        let key = key.as_str();

        if DECADE_KEYS.contains(&key) {
            Some(Self::Decade)
        } else if IMAGE_NR_KEYS.contains(&key) {
            Some(Self::ImageNr)
        } else if SUBJECT_KEYS.contains(&key) {
            Some(Self::Subject)
        } else if AUTHOR_KEYS.contains(&key) {
            Some(Self::Author)
        } else {
            None
        }
    }

    /// Key used when emitting text or URLs
    pub(crate) fn canonical_key(self) -> &'static str {
        match self {
            Self::Decade => DECADE_KEYS[0],
            Self::ImageNr => IMAGE_NR_KEYS[0],
            Self::Subject => SUBJECT_KEYS[0],
            Self::Author => AUTHOR_KEYS[0],
        }
    }
}

impl Query {
    /// Query consisting of a single term
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            terms: vec![text.into()],
            ..Self::default()
        }
    }

    /// True when no dimension restricts the search
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.image_nr.is_none()
            && self.decade.is_none()
            && self.subjects.is_empty()
            && self.author().is_none()
    }

    /// Author name, if one is set and not blank
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// Parse free search text such as `dec:1950 autor:"Steiner, Albert" postauto`
    ///
    /// Malformed decade or image numbers are dropped silently, unknown keys
    /// are ignored. Returns `None` when nothing restricts the search.
    pub fn parse_free_text(text: &str) -> Option<Self> {
        let mut query = Self::default();

        for token in tokenize(text) {
            let Some(key) = token.key else {
                query.terms.push(token.value);
                continue;
            };

            match Field::from_key(&key) {
                Some(Field::Decade) => match token.value.parse() {
                    Ok(decade) => query.decade = Some(decade),
                    Err(_) => tracing::debug!("Dropping malformed decade '{}'", token.value),
                },
                Some(Field::ImageNr) => match token.value.parse() {
                    Ok(image_nr) => query.image_nr = Some(image_nr),
                    Err(_) => tracing::debug!("Dropping malformed image number '{}'", token.value),
                },
                Some(Field::Subject) => query.subjects = split_subjects(&token.value),
                Some(Field::Author) => query.author = normalize_author(&token.value),
                None => tracing::debug!("Ignoring unknown key '{}' in search text", key),
            }
        }

        if query.is_empty() {
            // A search without restrictions is not offered
            return None;
        }

        Some(query)
    }

    /// Canonical free text; parsing it again yields an equal query
    pub fn to_canonical_search_text(&self) -> String {
        let mut parts = Vec::new();

        if let Some(decade) = self.decade {
            parts.push(format!("{}:{}", Field::Decade.canonical_key(), decade));
        }
        if let Some(image_nr) = self.image_nr {
            parts.push(format!("{}:{}", Field::ImageNr.canonical_key(), image_nr));
        }
        if !self.subjects.is_empty() {
            let path = self.subjects.join(">");
            parts.push(format!("{}:{}", Field::Subject.canonical_key(), enquote(&path)));
        }
        if let Some(author) = self.author() {
            parts.push(format!("{}:{}", Field::Author.canonical_key(), enquote(author)));
        }
        parts.extend(self.terms.iter().map(|term| enquote(term)));

        parts.join(" ").trim().to_string()
    }

    /// Short link label: the bare value when the query is a single `key:value`
    pub fn to_link_display_text(&self) -> String {
        let text = self.to_canonical_search_text();
        let parts: Vec<&str> = text.split(':').map(str::trim).collect();
        if let [_, value] = parts.as_slice() {
            return remove_quotes(value).to_string();
        }
        text
    }

    /// Human readable summary, e.g. `"schnee" und "post" (Dekade: 1950)`
    pub fn to_description(&self) -> String {
        let quoted: Vec<String> = self.terms.iter().map(|t| format!("\"{t}\"")).collect();
        let search_terms = match quoted.split_last() {
            None => String::new(),
            Some((last, [])) => last.clone(),
            Some((last, rest)) => format!("{} und {}", rest.join(", "), last),
        };

        let in_parenthesis = |text: String| {
            if self.terms.is_empty() {
                text
            } else {
                format!("({text})")
            }
        };

        let mut elements = vec![search_terms];
        if let Some(decade) = self.decade {
            elements.push(in_parenthesis(format!("Dekade: {decade}")));
        }
        if let Some(image_nr) = self.image_nr {
            elements.push(in_parenthesis(format!("Bildnummer: {image_nr}")));
        }
        if !self.subjects.is_empty() {
            elements.push(in_parenthesis(format!("Thema: {}", self.subjects.join(">"))));
        }
        if let Some(author) = self.author() {
            elements.push(in_parenthesis(format!("Author: '{author}'")));
        }

        elements
            .into_iter()
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_search_text())
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.image_nr == other.image_nr
            && self.decade == other.decade
            && self.author() == other.author()
            && folded(&self.terms) == folded(&other.terms)
            && folded(&self.subjects) == folded(&other.subjects)
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.image_nr.hash(state);
        self.decade.hash(state);
        self.author().hash(state);
        folded(&self.terms).hash(state);
        folded(&self.subjects).hash(state);
    }
}

/// Lowercased and sorted copy, the basis of equality and hashing
fn folded(values: &[String]) -> Vec<String> {
    let mut folded: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
    folded.sort();
    folded
}

fn split_subjects(value: &str) -> Vec<String> {
    value
        .split(SUBJECT_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank or quote-only author input means "no author"
fn normalize_author(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
    if trimmed.is_empty() {
        None
    } else {
        Some(value.trim().to_string())
    }
}

fn enquote(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == ':') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn remove_quotes(mut input: &str) -> &str {
    while input.len() >= 2
        && ((input.starts_with('"') && input.ends_with('"'))
            || (input.starts_with('\'') && input.ends_with('\'')))
    {
        input = &input[1..input.len() - 1];
    }
    input
}
