use super::Query;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Person record of the archive, the target of an author filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Resource IRI
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} ({})", self.last_name, self.first_name, self.city)
    }
}

/// A query together with the people its author name resolved to
///
/// `authors` is filled by name resolution and only read by the compiler; it
/// takes no part in query equality.
#[derive(Debug, Clone, Default)]
pub struct ResolvedQuery {
    pub query: Query,
    pub authors: Vec<Person>,
}

impl ResolvedQuery {
    pub fn new(query: Query, authors: Vec<Person>) -> Self {
        Self { query, authors }
    }

    /// Query without an author, or one whose author needs no lookup
    pub fn unresolved(query: Query) -> Self {
        Self {
            query,
            authors: Vec::new(),
        }
    }
}

impl From<Query> for ResolvedQuery {
    fn from(query: Query) -> Self {
        Self::unresolved(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_display() {
        let person = Person {
            id: "http://rdfh.ch/0804/p1".into(),
            first_name: "Albert".into(),
            last_name: "Steiner".into(),
            city: "St. Moritz".into(),
        };
        assert_eq!(person.to_string(), "Steiner, Albert (St. Moritz)");
    }
}
