//! Query compiler
//!
//! Turns a [`ResolvedQuery`] into the CONSTRUCT/WHERE query document the
//! archive's extended search endpoint expects. Compilation is pure: the same
//! input always produces the same text.

mod filters;

use crate::query::ResolvedQuery;
use filters::{AuthorFilter, DecadeFilter, FilterComponent, ImageNrFilter, TextFilter};

const INDENT: &str = "    ";

/// Line writer with a block indentation level
#[derive(Debug, Default)]
pub(crate) struct QueryWriter {
    buffer: String,
    indent: usize,
}

impl QueryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(text.as_ref());
        self.buffer.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Hands out variable numbers in order; no number is used twice
#[derive(Debug, Default)]
struct FilterNumbers {
    next: usize,
}

impl FilterNumbers {
    fn reserve(&mut self) -> usize {
        let number = self.next;
        self.next += 1;
        number
    }
}

/// Compile a query into the search endpoint's query text
///
/// Fragments are emitted for the image number, the decade, every term and,
/// when the author resolved to at least one person, the author. Subjects are
/// not part of the compiled query.
pub fn compile(resolved: &ResolvedQuery) -> String {
    let query = &resolved.query;
    let mut numbers = FilterNumbers::default();
    let mut components: Vec<Box<dyn FilterComponent>> = Vec::new();

    if let Some(image_nr) = query.image_nr {
        components.push(Box::new(ImageNrFilter {
            number: numbers.reserve(),
            image_nr,
        }));
    }
    if let Some(decade) = query.decade {
        components.push(Box::new(DecadeFilter {
            number: numbers.reserve(),
            decade,
        }));
    }
    for term in query.terms.iter().filter(|t| !t.trim().is_empty()) {
        components.push(Box::new(TextFilter::description(numbers.reserve(), term.as_str())));
    }
    if let Some(author) = query.author() {
        if resolved.authors.is_empty() {
            tracing::warn!("Author '{}' matches no person, ignoring author filter", author);
        } else {
            components.push(Box::new(AuthorFilter {
                number: numbers.reserve(),
                authors: resolved.authors.clone(),
            }));
        }
    }

    let mut writer = QueryWriter::new();
    write_preamble(&mut writer);

    writer.line("CONSTRUCT {");
    writer.indent();
    writer.line("?mainRes knora-api:isMainResource true .");
    for component in &components {
        component.add_construct(&mut writer);
    }
    writer.dedent();

    writer.line("} WHERE {");
    writer.indent();
    writer.line("?mainRes a knora-api:Resource .");
    writer.line(
        "{ ?mainRes a dokubib:Bild . } UNION { ?mainRes a dokubib:Bildformat . } UNION { ?mainRes a dokubib:Person . }",
    );
    for component in &components {
        component.add_filter(&mut writer);
    }
    writer.dedent();
    writer.line("}");

    writer.finish()
}

/// Compile a lookup of the people matching an author name
///
/// `"Last, First"` restricts last and first name, anything else is matched
/// against the last name only.
pub fn compile_person_lookup(name: &str) -> String {
    let mut numbers = FilterNumbers::default();
    let mut components = Vec::new();

    let (last_name, first_name) = split_name(name);
    components.push(TextFilter {
        number: numbers.reserve(),
        property: "hasLastname",
        text: last_name.to_string(),
    });
    if let Some(first_name) = first_name {
        components.push(TextFilter {
            number: numbers.reserve(),
            property: "hasFirstname",
            text: first_name.to_string(),
        });
    }

    let mut writer = QueryWriter::new();
    write_preamble(&mut writer);

    writer.line("CONSTRUCT {");
    writer.indent();
    writer.line("?mainRes knora-api:isMainResource true .");
    for component in &components {
        component.add_construct(&mut writer);
    }
    writer.dedent();

    writer.line("} WHERE {");
    writer.indent();
    writer.line("?mainRes a dokubib:Person .");
    for component in &components {
        component.add_filter(&mut writer);
    }
    writer.dedent();
    writer.line("}");

    writer.finish()
}

/// Page `page` of a compiled query
pub fn with_offset(query: &str, page: usize) -> String {
    format!("{}OFFSET {}", query, page)
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    let name = name.trim().trim_matches(|c: char| c == '"' || c == '\'');
    match name.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() => (last.trim(), Some(first.trim())),
        Some((last, _)) => (last.trim(), None),
        None => (name, None),
    }
}

fn write_preamble(writer: &mut QueryWriter) {
    writer.line(format!("PREFIX knora-api: <{}>", filters::KNORA_API));
    writer.line(format!("PREFIX dokubib: <{}>", filters::DOKUBIB));
}
