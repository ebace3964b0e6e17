//! GENA event body parsing
//!
//! A NOTIFY body is a property set with one variable per property:
//!
//! ```xml
//! <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
//!   <e:property><ZoneGroupState>&lt;ZoneGroupState&gt;…</ZoneGroupState></e:property>
//!   <e:property><LastChange>&lt;Event xmlns=…&gt;…</LastChange></e:property>
//! </e:propertyset>
//! ```

mod last_change;
mod naming;

pub use last_change::LastChangeFamily;
pub use naming::camel_to_snake;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use xmltree::{Element, XMLNode};

use crate::error::ParseError;
use crate::event::{EventValue, EventVariables};

/// Parse a NOTIFY body into its variables.
///
/// Plain properties map to one variable each; `LastChange` is unpacked into
/// the variables it carries. Empty values are dropped.
pub fn parse_propertyset(xml: &str) -> Result<EventVariables, ParseError> {
    let root = Element::parse(xml.as_bytes()).map_err(|e| ParseError::Xml(e.to_string()))?;
    if root.name != "propertyset" {
        return Err(ParseError::NotPropertySet(root.name));
    }

    let mut variables = EventVariables::new();
    for property in root.children.iter().filter_map(as_element) {
        for variable in property.children.iter().filter_map(as_element) {
            let text = variable.get_text().map(|t| t.into_owned()).unwrap_or_default();

            if variable.name == "LastChange" {
                if !text.trim().is_empty() {
                    last_change::merge_last_change(&text, &mut variables)?;
                }
                continue;
            }

            if !text.is_empty() {
                variables.insert(camel_to_snake(&variable.name), EventValue::Text(text));
            }
        }
    }

    Ok(variables)
}

fn as_element(node: &XMLNode) -> Option<&Element> {
    match node {
        XMLNode::Element(element) => Some(element),
        _ => None,
    }
}

/// Memoising front-end to [`parse_propertyset`].
///
/// Devices resend identical bodies often (every subscriber of a topology
/// change gets the same `ZoneGroupState`), so successful parses are kept for
/// up to `capacity` distinct bodies, oldest evicted first.
pub struct EventParser {
    capacity: usize,
    memo: Mutex<Memo>,
}

#[derive(Default)]
struct Memo {
    entries: HashMap<String, Arc<EventVariables>>,
    order: VecDeque<String>,
}

impl EventParser {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn parse(&self, xml: &str) -> Result<Arc<EventVariables>, ParseError> {
        if let Some(hit) = self.memo.lock().entries.get(xml) {
            return Ok(Arc::clone(hit));
        }

        let parsed = Arc::new(parse_propertyset(xml)?);

        let mut memo = self.memo.lock();
        if !memo.entries.contains_key(xml) {
            while memo.order.len() >= self.capacity {
                match memo.order.pop_front() {
                    Some(oldest) => {
                        memo.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            memo.order.push_back(xml.to_string());
            memo.entries.insert(xml.to_string(), Arc::clone(&parsed));
        }
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.memo.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut memo = self.memo.lock();
        memo.entries.clear();
        memo.order.clear();
    }
}

impl std::fmt::Debug for EventParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventParser")
            .field("capacity", &self.capacity)
            .field("memoised", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propertyset(inner: &str) -> String {
        format!(
            r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">{}</e:propertyset>"#,
            inner
        )
    }

    #[test]
    fn test_av_transport_last_change() {
        let body = propertyset(
            r#"<e:property><LastChange>&lt;Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"&gt;&lt;InstanceID val="0"&gt;&lt;TransportState val="STOPPED"/&gt;&lt;CurrentPlayMode val="NORMAL"/&gt;&lt;CurrentTrackMetaData val=""/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange></e:property>"#,
        );

        let variables = parse_propertyset(&body).unwrap();
        assert_eq!(variables["transport_state"].as_text(), Some("STOPPED"));
        assert_eq!(variables["current_play_mode"].as_text(), Some("NORMAL"));
        assert!(!variables.contains_key("current_track_meta_data"));
    }

    #[test]
    fn test_empty_last_change_yields_no_variables() {
        let body = propertyset("<e:property><LastChange></LastChange></e:property>");
        assert!(parse_propertyset(&body).unwrap().is_empty());
    }

    #[test]
    fn test_plain_properties() {
        let body = propertyset(
            "<e:property><ZoneGroupName>Kitchen</ZoneGroupName></e:property>\
             <e:property><ThirdPartyMediaServersX></ThirdPartyMediaServersX></e:property>\
             <e:property><AvailableSoftwareUpdate>&lt;UpdateItem/&gt;</AvailableSoftwareUpdate></e:property>",
        );

        let variables = parse_propertyset(&body).unwrap();
        let keys: Vec<&str> = variables.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zone_group_name", "available_software_update"]);
        assert_eq!(
            variables["available_software_update"].as_text(),
            Some("<UpdateItem/>")
        );
    }

    #[test]
    fn test_rejects_non_propertyset() {
        assert!(matches!(
            parse_propertyset("<Envelope/>"),
            Err(ParseError::NotPropertySet(name)) if name == "Envelope"
        ));
        assert!(matches!(parse_propertyset("not xml"), Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_memo_returns_shared_result_and_evicts_oldest() {
        let parser = EventParser::new(2);
        let a = propertyset("<e:property><A>1</A></e:property>");
        let b = propertyset("<e:property><B>2</B></e:property>");
        let c = propertyset("<e:property><C>3</C></e:property>");

        let first = parser.parse(&a).unwrap();
        let again = parser.parse(&a).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        parser.parse(&b).unwrap();
        parser.parse(&c).unwrap();
        assert_eq!(parser.len(), 2);

        let after_eviction = parser.parse(&a).unwrap();
        assert!(!Arc::ptr_eq(&first, &after_eviction));
        assert_eq!(*first, *after_eviction);
    }

    #[test]
    fn test_errors_are_not_memoised() {
        let parser = EventParser::new(4);
        assert!(parser.parse("<broken").is_err());
        assert!(parser.is_empty());
    }
}
