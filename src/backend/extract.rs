//! JSON-LD response extraction
//!
//! The search endpoints answer with either a `@graph` array of resources or,
//! when exactly one resource matches, that resource at the top level.

use crate::error::{ArchiveError, Result};
use crate::query::Person;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const NO_FIRST_NAME: &str = "<kein Vorname>";
const NO_LAST_NAME: &str = "<kein Nachname>";
const NO_CITY: &str = "<keine Ortsangabe>";
const NO_TITLE: &str = "<kein Titel>";
const NO_DESCRIPTION: &str = "<keine Beschreibung>";
pub(crate) const UNDEFINED_LABEL: &str = "<nicht definiert>";

/// Details of a single image resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub image_nr: Option<i32>,
    pub decade: Option<i32>,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    /// List node of the season the photo was taken in
    pub season_node: Option<String>,
    /// Label of `season_node`, filled in by name resolution
    pub season: String,
}

/// Entry of the subject vocabulary, a tree of list nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectNode {
    pub id: Option<String>,
    pub label: Option<String>,
    pub position: Option<i32>,
    pub children: Vec<SubjectNode>,
}

impl SubjectNode {
    /// Node reached by following `path` label by label, case-insensitively
    pub fn find<'a, S: AsRef<str>>(nodes: &'a [SubjectNode], path: &[S]) -> Option<&'a SubjectNode> {
        let (first, rest) = path.split_first()?;
        let node = nodes.iter().find(|node| {
            node.label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case(first.as_ref().trim()))
        })?;

        if rest.is_empty() {
            Some(node)
        } else {
            Self::find(&node.children, rest)
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{}{}",
            "  ".repeat(depth),
            self.label.as_deref().unwrap_or(UNDEFINED_LABEL)
        )?;
        for child in &self.children {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SubjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

fn parse(content: &str) -> Result<Value> {
    serde_json::from_str(content).map_err(|source| ArchiveError::Json {
        source,
        context: "Failed to parse backend response".to_string(),
    })
}

/// Resources of a response, whichever shape it has
fn resources(root: &Value) -> Option<Vec<&Value>> {
    match root.get("@graph") {
        Some(Value::Array(graph)) => Some(graph.iter().filter(|v| v.is_object()).collect()),
        Some(_) => None,
        None if root.get("@id").is_some() => Some(vec![root]),
        None => None,
    }
}

/// Ordered ids of a search response page
///
/// Blank or missing ids are dropped with a warning. A response with neither
/// `@graph` nor `@id` is an empty page.
pub fn extract_ids(content: &str) -> Result<Vec<String>> {
    let root = parse(content)?;
    let Some(resources) = resources(&root) else {
        tracing::warn!("Unable to extract ids from content: {}", content);
        return Ok(Vec::new());
    };

    let mut ids = Vec::with_capacity(resources.len());
    for resource in resources {
        match resource.get("@id").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => ids.push(id.to_string()),
            _ => tracing::warn!("Backend returned a resource with a blank id, dropping it"),
        }
    }

    Ok(ids)
}

/// Total number of matches of a count response
pub fn extract_count(content: &str) -> Result<Option<usize>> {
    let root = parse(content)?;
    let count = match root.get("schema:numberOfItems") {
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(count)
}

/// People of a person lookup response
pub fn extract_people(content: &str) -> Result<Vec<Person>> {
    let root = parse(content)?;
    let Some(resources) = resources(&root) else {
        return Ok(Vec::new());
    };

    Ok(resources
        .into_iter()
        .filter_map(|resource| {
            let id = string_at(resource, &["@id"]).filter(|id| !id.trim().is_empty());
            if id.is_none() {
                tracing::warn!("Backend returned a person without an id, dropping it");
            }
            Some((resource, id?))
        })
        .map(|(resource, id)| Person {
            id,
            first_name: string_at(resource, &["dokubib:hasFirstname", "knora-api:valueAsString"])
                .unwrap_or_else(|| NO_FIRST_NAME.to_string()),
            last_name: string_at(resource, &["dokubib:hasLastname", "knora-api:valueAsString"])
                .unwrap_or_else(|| NO_LAST_NAME.to_string()),
            city: string_at(resource, &["dokubib:hasCity", "knora-api:valueAsString"])
                .unwrap_or_else(|| NO_CITY.to_string()),
        })
        .collect())
}

/// Image details of a resource response
pub fn extract_image(content: &str) -> Result<ImageRecord> {
    let root = parse(content)?;
    let id = string_at(&root, &["@id"])
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ArchiveError::Format("Resource without '@id'".to_string()))?;

    Ok(ImageRecord {
        id,
        image_nr: int_at(&root, &["dokubib:hasBildnummer", "knora-api:intValueAsInt"]),
        decade: int_at(&root, &["dokubib:hasJahrzehnt", "knora-api:dateValueHasStartYear"]),
        title: string_at(&root, &["rdfs:label"]).unwrap_or_else(|| NO_TITLE.to_string()),
        description: string_at(&root, &["dokubib:hasDescription", "knora-api:valueAsString"])
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        author: string_at(
            &root,
            &[
                "dokubib:linkToUrheberValue",
                "knora-api:linkValueHasTarget",
                "rdfs:label",
            ],
        ),
        season_node: string_at(
            &root,
            &["dokubib:hasJahreszeit", "knora-api:listValueAsListNode", "@id"],
        )
        .filter(|id| !id.trim().is_empty()),
        season: UNDEFINED_LABEL.to_string(),
    })
}

/// Label of a list node response
pub fn extract_node_label(content: &str) -> Result<String> {
    let root = parse(content)?;
    Ok(string_at(&root, &["rdfs:label"]).unwrap_or_else(|| UNDEFINED_LABEL.to_string()))
}

/// Top level nodes of a list response, children nested below them
pub fn extract_subject_tree(content: &str) -> Result<Vec<SubjectNode>> {
    let root = parse(content)?;
    Ok(root
        .get("knora-api:hasSubListNode")
        .map(sub_list_nodes)
        .unwrap_or_default())
}

// `knora-api:hasSubListNode` holds an array, or a single object for one child
fn sub_list_nodes(value: &Value) -> Vec<SubjectNode> {
    match value {
        Value::Array(nodes) => nodes.iter().filter(|n| n.is_object()).map(subject_node).collect(),
        Value::Object(_) => vec![subject_node(value)],
        _ => Vec::new(),
    }
}

fn subject_node(value: &Value) -> SubjectNode {
    SubjectNode {
        id: string_at(value, &["@id"]),
        label: string_at(value, &["rdfs:label"]),
        position: int_at(value, &["knora-api:listNodePosition"]),
        children: value
            .get("knora-api:hasSubListNode")
            .map(sub_list_nodes)
            .unwrap_or_default(),
    }
}

fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, key| value.get(*key))
}

fn string_at(root: &Value, path: &[&str]) -> Option<String> {
    value_at(root, path).and_then(Value::as_str).map(str::to_string)
}

fn int_at(root: &Value, path: &[&str]) -> Option<i32> {
    match value_at(root, path)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
