//! Group type

use std::sync::Arc;

use super::Zone;

/// A zone group: one coordinator and the zones playing in sync with it.
///
/// Members include the coordinator and any satellites.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    /// Shared with `members` and the snapshot's zone lists. Snapshots are
    /// immutable, so the strong reference never outlives or cycles the zone.
    pub coordinator: Arc<Zone>,
    pub members: Vec<Arc<Zone>>,
}

impl Group {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coordinator(&self) -> &Arc<Zone> {
        &self.coordinator
    }

    pub fn members(&self) -> &[Arc<Zone>] {
        &self.members
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.members.iter().any(|zone| zone.uuid == uuid)
    }

    /// Members that are not satellites
    pub fn visible_members(&self) -> impl Iterator<Item = &Arc<Zone>> {
        self.members.iter().filter(|zone| zone.is_visible())
    }

    /// A group of one zone (plus its satellites, if any)
    pub fn is_standalone(&self) -> bool {
        self.members.iter().filter(|zone| !zone.is_satellite).count() == 1
    }
}
