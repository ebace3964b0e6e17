//! Model types for sonos-state

mod group;
mod payload;
mod zone;

pub use group::Group;
pub use payload::{PayloadSource, TopologyPayload};
pub use zone::Zone;

pub(crate) use zone::split_location;
