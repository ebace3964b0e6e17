//! Canonical form of a `ZoneGroupState` document
//!
//! Devices do not keep group or member order stable between reports, so two
//! payloads describing the same topology can differ byte for byte. The
//! canonical form sorts attributes and children and trims text, and is what
//! the engine compares to recognise a repeat.

use xmltree::{Element, XMLNode};

use crate::error::{Result, StateError};

const WRAPPERS: [&str; 2] = ["ZoneGroupState", "ZoneGroups"];

/// Parse a payload and return its `<ZoneGroup>` elements.
///
/// Accepts the current shape (`<ZoneGroupState><ZoneGroups><ZoneGroup>…`) and
/// the legacy one with bare `<ZoneGroup>` elements, wrapped or not.
pub(crate) fn zone_groups(xml: &str) -> Result<Vec<Element>> {
    let body = strip_declaration(xml);
    let root = Element::parse(format!("<payload>{}</payload>", body).as_bytes())
        .map_err(|e| StateError::Parse(format!("malformed topology XML: {}", e)))?;

    let mut groups = Vec::new();
    let mut recognised = false;
    collect(&root, &mut groups, &mut recognised);

    if !recognised {
        return Err(StateError::Parse(
            "payload contains no ZoneGroupState, ZoneGroups or ZoneGroup element".to_string(),
        ));
    }
    Ok(groups)
}

fn collect(element: &Element, groups: &mut Vec<Element>, recognised: &mut bool) {
    for child in child_elements(element) {
        if child.name == "ZoneGroup" {
            *recognised = true;
            groups.push(child.clone());
        } else if WRAPPERS.contains(&child.name.as_str()) {
            *recognised = true;
            collect(child, groups, recognised);
        }
    }
}

fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

/// Canonical form of a set of `<ZoneGroup>` elements
pub(crate) fn normalize(groups: &[Element]) -> String {
    let mut parts: Vec<String> = groups.iter().map(canonical).collect();
    parts.sort();
    parts.concat()
}

fn canonical(element: &Element) -> String {
    let mut attributes: Vec<(&String, &String)> = element.attributes.iter().collect();
    attributes.sort();

    let mut out = String::new();
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    out.push('>');

    let text: String = element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(text) | XMLNode::CData(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    out.push_str(&escape(text.trim()));

    let mut children: Vec<String> = child_elements(element).map(canonical).collect();
    children.sort();
    for child in children {
        out.push_str(&child);
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
    out
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

pub(crate) fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(child) => Some(child),
        _ => None,
    })
}
