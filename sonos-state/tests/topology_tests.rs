//! Topology engine behaviour over realistic payloads and a polled device double

use std::net::SocketAddr;

use mockito::{Server, ServerGuard};
use rstest::rstest;
use sonos_api::{DeviceAddress, SonosClient};
use sonos_state::{
    PayloadOutcome, PayloadSource, PollOutcome, StateError, TopologyConfig, ZoneTopologyEngine,
};

const TWO_GROUPS: &str = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_A" ID="RINCON_A:12"><ZoneGroupMember UUID="RINCON_A" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Kitchen" BootSeq="31"/><ZoneGroupMember UUID="RINCON_B" Location="http://192.168.1.11:1400/xml/device_description.xml" ZoneName="Dining Room" BootSeq="12"/></ZoneGroup><ZoneGroup Coordinator="RINCON_C" ID="RINCON_C:4"><ZoneGroupMember UUID="RINCON_C" Location="http://192.168.1.12:1400/xml/device_description.xml" ZoneName="Office" BootSeq="8"/></ZoneGroup></ZoneGroups><VanishedDevices/></ZoneGroupState>"#;

const TWO_GROUPS_REORDERED: &str = r#"<ZoneGroupState>
  <ZoneGroups>
    <ZoneGroup ID="RINCON_C:4" Coordinator="RINCON_C">
      <ZoneGroupMember BootSeq="8" ZoneName="Office" Location="http://192.168.1.12:1400/xml/device_description.xml" UUID="RINCON_C"/>
    </ZoneGroup>
    <ZoneGroup ID="RINCON_A:12" Coordinator="RINCON_A">
      <ZoneGroupMember UUID="RINCON_B" Location="http://192.168.1.11:1400/xml/device_description.xml" ZoneName="Dining Room" BootSeq="12"/>
      <ZoneGroupMember UUID="RINCON_A" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Kitchen" BootSeq="31"/>
    </ZoneGroup>
  </ZoneGroups>
  <VanishedDevices/>
</ZoneGroupState>"#;

const HOME_THEATER: &str = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_ARC" ID="RINCON_ARC:77"><ZoneGroupMember UUID="RINCON_ARC" Location="http://192.168.1.20:1400/xml/device_description.xml" ZoneName="Living Room" SoftwareVersion="79.1-52020"><Satellite UUID="RINCON_SUB" Location="http://192.168.1.21:1400/xml/device_description.xml" ZoneName="Living Room" Invisible="1"/><Satellite UUID="RINCON_LS" Location="http://192.168.1.22:1400/xml/device_description.xml" ZoneName="Living Room" Invisible="1"/></ZoneGroupMember></ZoneGroup></ZoneGroups></ZoneGroupState>"#;

const WITH_BRIDGE: &str = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_A" ID="g1"><ZoneGroupMember UUID="RINCON_A" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Kitchen"/></ZoneGroup><ZoneGroup Coordinator="RINCON_BOOST" ID="g2"><ZoneGroupMember UUID="RINCON_BOOST" Location="http://192.168.1.30:1400/xml/device_description.xml" ZoneName="BOOST" Invisible="1" IsZoneBridge="1"/></ZoneGroup></ZoneGroups></ZoneGroupState>"#;

const LEGACY: &str = r#"<ZoneGroups><ZoneGroup Coordinator="RINCON_A" ID="RINCON_A:12"><ZoneGroupMember UUID="RINCON_A" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Kitchen" BootSeq="31"/><ZoneGroupMember UUID="RINCON_B" Location="http://192.168.1.11:1400/xml/device_description.xml" ZoneName="Dining Room" BootSeq="12"/></ZoneGroup><ZoneGroup Coordinator="RINCON_C" ID="RINCON_C:4"><ZoneGroupMember UUID="RINCON_C" Location="http://192.168.1.12:1400/xml/device_description.xml" ZoneName="Office" BootSeq="8"/></ZoneGroup></ZoneGroups>"#;

fn engine(config: TopologyConfig) -> ZoneTopologyEngine {
    ZoneTopologyEngine::new(SonosClient::new().unwrap(), config)
}

fn device_for(server: &ServerGuard) -> DeviceAddress {
    let addr: SocketAddr = server.host_with_port().parse().expect("socket address");
    DeviceAddress::new(addr.ip()).with_port(addr.port())
}

fn zone_group_state_response(state: &str) -> String {
    let escaped = state
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>{}</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#,
        escaped
    )
}

fn fault(code: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>{}</errorCode></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#,
        code
    )
}

#[test]
fn test_reordered_payload_is_a_repeat() {
    let engine = engine(TopologyConfig::default());

    assert_eq!(
        engine.process_payload(TWO_GROUPS, PayloadSource::Poll, None).unwrap(),
        PayloadOutcome::Applied
    );
    let first = engine.snapshot();
    assert_eq!(
        engine
            .process_payload(TWO_GROUPS_REORDERED, PayloadSource::Event, None)
            .unwrap(),
        PayloadOutcome::Unchanged
    );

    let stats = engine.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.processed_count, 1);
    assert_eq!(stats.zone_count, 3);
    assert_eq!(stats.group_count, 2);
    assert!(std::sync::Arc::ptr_eq(&first, &engine.snapshot()));
    assert_eq!(engine.last_payload().unwrap().source, PayloadSource::Poll);
}

#[test]
fn test_legacy_shape_builds_same_model() {
    let engine = engine(TopologyConfig::default());
    engine.process_payload(LEGACY, PayloadSource::Manual, None).unwrap();

    assert_eq!(engine.groups().len(), 2);
    assert_eq!(engine.all_zones().len(), 3);
    assert_eq!(engine.zone_by_uuid("RINCON_B").unwrap().name, "Dining Room");
    assert_eq!(
        engine.process_payload(TWO_GROUPS, PayloadSource::Poll, None).unwrap(),
        PayloadOutcome::Unchanged
    );
}

#[test]
fn test_satellites() {
    let engine = engine(TopologyConfig::default());
    engine.process_payload(HOME_THEATER, PayloadSource::Manual, None).unwrap();

    assert_eq!(engine.all_zones().len(), 3);
    let visible = engine.visible_zones();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, "RINCON_ARC");
    assert!(visible[0].has_satellites);

    let sub = engine.zone_by_uuid("RINCON_SUB").unwrap();
    assert!(sub.is_satellite);
    assert!(!sub.is_coordinator);
    assert_eq!(sub.parent().unwrap().uuid, "RINCON_ARC");

    let group = engine.group_for_zone("RINCON_LS").unwrap();
    assert_eq!(group.coordinator.uuid, "RINCON_ARC");
    assert_eq!(group.members.len(), 3);
    assert!(group.is_standalone());
    assert_eq!(group.visible_members().count(), 1);
}

#[test]
fn test_invisible_zone_excluded_from_visible() {
    let engine = engine(TopologyConfig::default());
    engine.process_payload(WITH_BRIDGE, PayloadSource::Manual, None).unwrap();

    assert_eq!(engine.all_zones().len(), 2);
    let visible: Vec<String> = engine.visible_zones().iter().map(|z| z.uuid.clone()).collect();
    assert_eq!(visible, vec!["RINCON_A".to_string()]);
    assert!(engine.zone_by_uuid("RINCON_BOOST").unwrap().is_zone_bridge);
    assert!(engine.zone_by_name("BOOST").is_none());
}

#[test]
fn test_snapshots_are_replaced_not_patched() {
    let engine = engine(TopologyConfig::default());
    engine.process_payload(TWO_GROUPS, PayloadSource::Manual, None).unwrap();
    let before = engine.snapshot();

    engine.process_payload(HOME_THEATER, PayloadSource::Manual, None).unwrap();
    assert_eq!(before.all_zones.len(), 3);
    assert!(before.zone_by_uuid("RINCON_ARC").is_none());
    assert!(engine.zone_by_uuid("RINCON_A").is_none());
    assert_eq!(engine.all_zones().len(), 3);
}

#[tokio::test]
async fn test_poll_applies_topology() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/ZoneGroupTopology/Control")
        .match_header(
            "soapaction",
            "\"urn:schemas-upnp-org:service:ZoneGroupTopology:1#GetZoneGroupState\"",
        )
        .with_status(200)
        .with_body(zone_group_state_response(TWO_GROUPS))
        .expect(1)
        .create_async()
        .await;

    let engine = engine(TopologyConfig::default());
    let device = device_for(&server);

    assert_eq!(engine.poll(&device).await.unwrap(), PollOutcome::Applied);
    // Answered from the action cache.
    assert_eq!(engine.poll(&device).await.unwrap(), PollOutcome::Unchanged);
    mock.assert_async().await;

    let payload = engine.last_payload().unwrap();
    assert_eq!(payload.source, PayloadSource::Poll);
    assert_eq!(payload.source_ip, Some(device.ip));
    assert_eq!(engine.groups().len(), 2);
}

#[rstest]
#[case("401")]
#[case("501")]
#[tokio::test]
async fn test_unsupported_poll_defers_to_events(#[case] code: &str) {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/ZoneGroupTopology/Control")
        .with_status(500)
        .with_body(fault(code))
        .create_async()
        .await;
    let device = device_for(&server);

    let deferring = engine(TopologyConfig::default());
    assert_eq!(deferring.poll(&device).await.unwrap(), PollOutcome::Deferred);

    let strict = engine(TopologyConfig::default().with_event_fallback(false));
    match strict.poll(&device).await {
        Err(StateError::NotSupported { code: reported, .. }) => assert_eq!(reported, code),
        other => panic!("expected NotSupported, got {:?}", other),
    }
}

#[tokio::test]
async fn test_other_poll_errors_surface() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/ZoneGroupTopology/Control")
        .with_status(500)
        .with_body(fault("402"))
        .create_async()
        .await;

    let engine = engine(TopologyConfig::default());
    assert!(matches!(
        engine.poll(&device_for(&server)).await,
        Err(StateError::Api(_))
    ));
    assert_eq!(engine.stats().total_requests, 0);
}
