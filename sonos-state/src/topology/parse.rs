//! Building the zone and group model from `<ZoneGroup>` elements

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;
use xmltree::Element;

use super::normalize::child_elements;
use crate::error::{Result, StateError};
use crate::model::{split_location, Group, Zone};

/// Zones and groups described by one payload
#[derive(Debug, Default)]
pub(crate) struct ParsedTopology {
    pub zones: Vec<Arc<Zone>>,
    pub groups: Vec<Group>,
}

pub(crate) fn build(zone_groups: &[Element]) -> Result<ParsedTopology> {
    let mut parsed = ParsedTopology::default();
    let mut seen = HashSet::new();

    for element in zone_groups {
        let coordinator_uuid = required(element, "Coordinator")?;
        let id = element
            .attributes
            .get("ID")
            .cloned()
            .unwrap_or_else(|| coordinator_uuid.to_string());

        let mut members = Vec::new();
        for member in child_elements(element).filter(|e| e.name == "ZoneGroupMember") {
            let uuid = required(member, "UUID")?;
            if !seen.insert(uuid.to_string()) {
                warn!(uuid, group = %id, "zone listed in more than one group, keeping the first");
                continue;
            }

            let satellites: Vec<&Element> = child_elements(member)
                .filter(|e| e.name == "Satellite")
                .collect();

            let mut zone = zone_from(member, uuid);
            zone.is_coordinator = uuid == coordinator_uuid;
            zone.has_satellites = !satellites.is_empty();
            let zone = Arc::new(zone);
            members.push(Arc::clone(&zone));

            for satellite in satellites {
                let satellite_uuid = required(satellite, "UUID")?;
                if !seen.insert(satellite_uuid.to_string()) {
                    warn!(uuid = satellite_uuid, "satellite listed twice, keeping the first");
                    continue;
                }
                let mut sat = zone_from(satellite, satellite_uuid);
                sat.is_satellite = true;
                sat.parent = Some(Arc::downgrade(&zone));
                members.push(Arc::new(sat));
            }
        }

        let Some(coordinator) = members
            .iter()
            .find(|zone| zone.is_coordinator)
            .cloned()
        else {
            warn!(group = %id, coordinator = coordinator_uuid, "coordinator is not a member, skipping group");
            continue;
        };

        parsed.zones.extend(members.iter().cloned());
        parsed.groups.push(Group {
            id,
            coordinator,
            members,
        });
    }

    Ok(parsed)
}

fn required<'a>(element: &'a Element, attribute: &str) -> Result<&'a str> {
    element
        .attributes
        .get(attribute)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            StateError::Parse(format!("<{}> without {} attribute", element.name, attribute))
        })
}

fn zone_from(element: &Element, uuid: &str) -> Zone {
    let attr = |name: &str| element.attributes.get(name).map(String::as_str);
    let location = attr("Location").unwrap_or_default().to_string();
    let (ip, base_url) = split_location(&location);

    Zone {
        uuid: uuid.to_string(),
        name: attr("ZoneName").unwrap_or_default().to_string(),
        ip,
        base_url,
        location,
        boot_seq: attr("BootSeq").and_then(|v| v.parse().ok()),
        invisible: attr("Invisible") == Some("1"),
        is_coordinator: false,
        is_satellite: false,
        has_satellites: false,
        software_version: attr("SoftwareVersion").map(str::to_string),
        is_zone_bridge: attr("IsZoneBridge") == Some("1"),
        parent: None,
    }
}
