/// The UPnP services exposed by Sonos devices
///
/// Each service has a fixed control path for SOAP actions and an event path
/// for GENA subscriptions, both relative to the device base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Alarm scheduling and the device clock
    AlarmClock,
    /// Music service account catalogue
    MusicServices,
    /// Line-in source control
    AudioIn,
    /// LEDs, zone name, household and invisible-unit properties
    DeviceProperties,
    /// Account and system-wide key/value storage
    SystemProperties,
    /// Household zone/group topology
    ZoneGroupTopology,
    /// Group membership operations
    GroupManagement,
    /// Tencent QPlay integration
    QPlay,
    /// Library and favourites browsing (media server)
    ContentDirectory,
    /// Connection manager of the media server
    MsConnectionManager,
    /// Connection manager of the media renderer
    MrConnectionManager,
    /// Per-speaker volume, mute and EQ
    RenderingControl,
    /// Playback transport
    AVTransport,
    /// Group-wide volume and mute
    GroupRenderingControl,
    /// The playback queue
    Queue,
}

/// Static description of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    /// UPnP service type name, e.g. `AVTransport`
    pub service_type: &'static str,
    /// UPnP service version
    pub version: u8,
    /// Control path for SOAP actions
    pub control_path: &'static str,
    /// Event path for GENA subscriptions
    pub event_path: &'static str,
    /// Identifier carried on events from this service
    pub service_id: &'static str,
}

impl ServiceInfo {
    /// Full service type URN used in envelopes and the `SOAPACTION` header
    pub fn service_type_urn(&self) -> String {
        format!(
            "urn:schemas-upnp-org:service:{}:{}",
            self.service_type, self.version
        )
    }
}

const fn info(
    service_type: &'static str,
    control_path: &'static str,
    event_path: &'static str,
    service_id: &'static str,
) -> ServiceInfo {
    ServiceInfo {
        service_type,
        version: 1,
        control_path,
        event_path,
        service_id,
    }
}

impl Service {
    pub const ALL: [Service; 15] = [
        Service::AlarmClock,
        Service::MusicServices,
        Service::AudioIn,
        Service::DeviceProperties,
        Service::SystemProperties,
        Service::ZoneGroupTopology,
        Service::GroupManagement,
        Service::QPlay,
        Service::ContentDirectory,
        Service::MsConnectionManager,
        Service::MrConnectionManager,
        Service::RenderingControl,
        Service::AVTransport,
        Service::GroupRenderingControl,
        Service::Queue,
    ];

    pub fn name(&self) -> &'static str {
        self.info().service_type
    }

    pub fn info(&self) -> ServiceInfo {
        match self {
            Service::AlarmClock => info(
                "AlarmClock",
                "/AlarmClock/Control",
                "/AlarmClock/Event",
                "AlarmClock",
            ),
            Service::MusicServices => info(
                "MusicServices",
                "/MusicServices/Control",
                "/MusicServices/Event",
                "MusicServices",
            ),
            Service::AudioIn => info(
                "AudioIn",
                "/AudioIn/Control",
                "/AudioIn/Event",
                "AudioIn",
            ),
            Service::DeviceProperties => info(
                "DeviceProperties",
                "/DeviceProperties/Control",
                "/DeviceProperties/Event",
                "DeviceProperties",
            ),
            Service::SystemProperties => info(
                "SystemProperties",
                "/SystemProperties/Control",
                "/SystemProperties/Event",
                "SystemProperties",
            ),
            Service::ZoneGroupTopology => info(
                "ZoneGroupTopology",
                "/ZoneGroupTopology/Control",
                "/ZoneGroupTopology/Event",
                "ZoneGroupTopology",
            ),
            Service::GroupManagement => info(
                "GroupManagement",
                "/GroupManagement/Control",
                "/GroupManagement/Event",
                "GroupManagement",
            ),
            Service::QPlay => info("QPlay", "/QPlay/Control", "/QPlay/Event", "QPlay"),
            Service::ContentDirectory => info(
                "ContentDirectory",
                "/MediaServer/ContentDirectory/Control",
                "/MediaServer/ContentDirectory/Event",
                "ContentDirectory",
            ),
            Service::MsConnectionManager => info(
                "ConnectionManager",
                "/MediaServer/ConnectionManager/Control",
                "/MediaServer/ConnectionManager/Event",
                "ConnectionManager",
            ),
            Service::MrConnectionManager => info(
                "ConnectionManager",
                "/MediaRenderer/ConnectionManager/Control",
                "/MediaRenderer/ConnectionManager/Event",
                "ConnectionManager",
            ),
            Service::RenderingControl => info(
                "RenderingControl",
                "/MediaRenderer/RenderingControl/Control",
                "/MediaRenderer/RenderingControl/Event",
                "RenderingControl",
            ),
            Service::AVTransport => info(
                "AVTransport",
                "/MediaRenderer/AVTransport/Control",
                "/MediaRenderer/AVTransport/Event",
                "AVTransport",
            ),
            Service::GroupRenderingControl => info(
                "GroupRenderingControl",
                "/MediaRenderer/GroupRenderingControl/Control",
                "/MediaRenderer/GroupRenderingControl/Event",
                "GroupRenderingControl",
            ),
            Service::Queue => info(
                "Queue",
                "/MediaRenderer/Queue/Control",
                "/MediaRenderer/Queue/Event",
                "Queue",
            ),
        }
    }

    /// Full service type URN, e.g. `urn:schemas-upnp-org:service:AVTransport:1`
    pub fn service_type_urn(&self) -> String {
        self.info().service_type_urn()
    }
}
