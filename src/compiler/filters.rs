//! Filter fragments of a compiled query
//!
//! Each fragment contributes one projection line to the `CONSTRUCT` block and
//! its matching patterns to the `WHERE` block, both keyed by the variable
//! `?prop<N>` reserved for it.

use super::QueryWriter;
use crate::query::Person;

pub(crate) const DOKUBIB: &str = "http://api.dasch.swiss/ontology/0804/dokubib/v2#";
pub(crate) const KNORA_API: &str = "http://api.knora.org/ontology/knora-api/v2#";
const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const SIMPLE_DATE: &str = "http://api.knora.org/ontology/knora-api/simple/v2#Date";

/// A single filter of the `WHERE` block together with its projection
pub(crate) trait FilterComponent {
    /// Variable number reserved for this fragment
    fn number(&self) -> usize;

    /// Property the fragment binds to `?prop<N>`
    fn property(&self) -> &'static str;

    fn add_construct(&self, writer: &mut QueryWriter) {
        writer.line(format!(
            "?mainRes <{DOKUBIB}{}> ?prop{} .",
            self.property(),
            self.number()
        ));
    }

    fn add_filter(&self, writer: &mut QueryWriter) {
        self.add_construct(writer);
        self.add_conditions(writer);
    }

    /// Conditions restricting `?prop<N>`
    fn add_conditions(&self, writer: &mut QueryWriter);
}

/// Exact image number
pub(crate) struct ImageNrFilter {
    pub number: usize,
    pub image_nr: i32,
}

impl FilterComponent for ImageNrFilter {
    fn number(&self) -> usize {
        self.number
    }

    fn property(&self) -> &'static str {
        "hasBildnummer"
    }

    fn add_conditions(&self, writer: &mut QueryWriter) {
        let n = self.number;
        writer.line(format!("?prop{n} <{KNORA_API}intValueAsInt> ?prop{n}Literal ."));
        writer.line(format!(
            "FILTER (?prop{n}Literal = \"{}\"^^<{XSD}integer>) .",
            self.image_nr
        ));
    }
}

/// Decade, stored as the date of its first day
pub(crate) struct DecadeFilter {
    pub number: usize,
    pub decade: i32,
}

impl FilterComponent for DecadeFilter {
    fn number(&self) -> usize {
        self.number
    }

    fn property(&self) -> &'static str {
        "hasJahrzehnt"
    }

    fn add_conditions(&self, writer: &mut QueryWriter) {
        writer.line(format!(
            "FILTER(knora-api:toSimpleDate(?prop{}) = \"GREGORIAN:{}-01-01\"^^<{SIMPLE_DATE}>) .",
            self.number, self.decade
        ));
    }
}

/// Case-insensitive substring match on a text property
pub(crate) struct TextFilter {
    pub number: usize,
    pub property: &'static str,
    pub text: String,
}

impl TextFilter {
    pub fn description(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            property: "hasDescription",
            text: text.into(),
        }
    }
}

impl FilterComponent for TextFilter {
    fn number(&self) -> usize {
        self.number
    }

    fn property(&self) -> &'static str {
        self.property
    }

    fn add_conditions(&self, writer: &mut QueryWriter) {
        let n = self.number;
        let pattern = string_literal(&regex::escape(&self.text));
        writer.line(format!("?prop{n} <{KNORA_API}valueAsString> ?prop{n}Literal ."));
        writer.line(format!(
            "FILTER regex(?prop{n}Literal, \"{pattern}\"^^<{XSD}string>, \"i\") ."
        ));
    }
}

/// Link to any of the resolved authors
pub(crate) struct AuthorFilter {
    pub number: usize,
    pub authors: Vec<Person>,
}

impl FilterComponent for AuthorFilter {
    fn number(&self) -> usize {
        self.number
    }

    fn property(&self) -> &'static str {
        "linkToUrheber"
    }

    fn add_conditions(&self, writer: &mut QueryWriter) {
        let alternatives: Vec<String> = self
            .authors
            .iter()
            .map(|author| format!("?prop{} = <{}>", self.number, author.id))
            .collect();
        writer.line(format!("FILTER({}) .", alternatives.join(" || ")));
    }
}

/// Escape a value for use inside a double-quoted literal
fn string_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(filter: &dyn FilterComponent) -> String {
        let mut writer = QueryWriter::new();
        filter.add_filter(&mut writer);
        writer.finish()
    }

    #[test]
    fn test_image_nr_filter_uses_own_variable() {
        let text = render(&ImageNrFilter {
            number: 3,
            image_nr: 14826,
        });
        assert!(text.contains("?prop3 <http://api.knora.org/ontology/knora-api/v2#intValueAsInt> ?prop3Literal ."));
        assert!(text.contains("FILTER (?prop3Literal = \"14826\"^^<http://www.w3.org/2001/XMLSchema#integer>) ."));
        assert!(!text.contains("?prop0"));
    }

    #[test]
    fn test_text_filter_escapes_pattern() {
        let text = render(&TextFilter::description(0, "St. \"Moritz\""));
        assert!(text.contains(r#""St\\. \"Moritz\""^^"#));
    }

    #[test]
    fn test_author_filter_with_two_people() {
        let person = |id: &str| Person {
            id: id.to_string(),
            first_name: "Albert".into(),
            last_name: "Steiner".into(),
            city: "St. Moritz".into(),
        };
        let text = render(&AuthorFilter {
            number: 1,
            authors: vec![person("http://rdfh.ch/0804/a"), person("http://rdfh.ch/0804/b")],
        });

        assert!(text.contains(
            "FILTER(?prop1 = <http://rdfh.ch/0804/a> || ?prop1 = <http://rdfh.ch/0804/b>) ."
        ));
    }
}
