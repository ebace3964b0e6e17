//! Decoding of the `LastChange` variable
//!
//! AVTransport, RenderingControl and Queue report state through a single
//! `LastChange` variable whose text is an escaped XML document:
//!
//! ```xml
//! <Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/">
//!   <InstanceID val="0">
//!     <Volume channel="Master" val="24"/>
//!     <Mute channel="Master" val="0"/>
//!     <PresetNameList val="FactoryDefaults"/>
//!   </InstanceID>
//! </Event>
//! ```

use indexmap::IndexMap;
use xmltree::{Element, XMLNode};

use super::naming::camel_to_snake;
use crate::error::ParseError;
use crate::event::{EventValue, EventVariables};

const AVT_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/AVT/";
const RCS_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/RCS/";
const QUEUE_NAMESPACE: &str = "urn:schemas-sonos-com:metadata-1-0/Queue/";

/// Service family a `LastChange` document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastChangeFamily {
    AVTransport,
    RenderingControl,
    Queue,
    Other,
}

impl LastChangeFamily {
    pub fn from_namespace(namespace: Option<&str>) -> Self {
        match namespace {
            Some(AVT_NAMESPACE) => LastChangeFamily::AVTransport,
            Some(RCS_NAMESPACE) => LastChangeFamily::RenderingControl,
            Some(QUEUE_NAMESPACE) => LastChangeFamily::Queue,
            _ => LastChangeFamily::Other,
        }
    }

    fn nests_by_channel(self, tag: &str) -> bool {
        self == LastChangeFamily::RenderingControl
            && matches!(tag, "Volume" | "Mute" | "Loudness")
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(child) => Some(child),
        _ => None,
    })
}

/// `val` attribute when non-empty, otherwise the element text
fn element_value(element: &Element) -> Option<String> {
    if let Some(val) = element.attributes.get("val") {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    element
        .get_text()
        .map(|text| text.into_owned())
        .filter(|text| !text.is_empty())
}

/// Merge the variables of a `LastChange` document into `out`.
///
/// Every grandchild of the root (the children of each `InstanceID` or
/// `QueueID`) becomes one variable. Empty values are skipped.
pub fn merge_last_change(xml: &str, out: &mut EventVariables) -> Result<(), ParseError> {
    let root = Element::parse(xml.as_bytes()).map_err(|e| ParseError::LastChange(e.to_string()))?;
    let family = LastChangeFamily::from_namespace(root.namespace.as_deref());

    for instance in child_elements(&root) {
        for variable in child_elements(instance) {
            let name = camel_to_snake(&variable.name);

            if family.nests_by_channel(&variable.name) {
                let channel = variable
                    .attributes
                    .get("channel")
                    .cloned()
                    .unwrap_or_else(|| "Master".to_string());
                let Some(value) = element_value(variable) else {
                    continue;
                };
                let entry = out
                    .entry(name)
                    .or_insert_with(|| EventValue::Channels(IndexMap::new()));
                if let EventValue::Text(_) = entry {
                    *entry = EventValue::Channels(IndexMap::new());
                }
                if let EventValue::Channels(channels) = entry {
                    channels.insert(channel, value);
                }
            } else if let Some(value) = element_value(variable) {
                out.insert(name, EventValue::Text(value));
            }
        }
    }

    Ok(())
}
