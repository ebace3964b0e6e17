//! SOAP 1.1 request envelope construction

use quick_xml::escape::escape;

use crate::transport::HttpRequest;

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Content type sent with every action request
pub const CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// A fully built action request, ready to POST to a control URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapCommand {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SoapCommand {
    pub fn into_request(self) -> HttpRequest {
        let mut request = HttpRequest::new("POST", self.url).body(self.body);
        request.headers = self.headers;
        request
    }
}

/// Value of the `SOAPACTION` header, quotes included
pub fn soap_action(service_type: &str, action: &str) -> String {
    format!("\"{}#{}\"", service_type, action)
}

/// Build the envelope and headers for `action` on the service identified by
/// `service_type` (e.g. `urn:schemas-upnp-org:service:AVTransport:1`).
///
/// Argument values are escaped; argument order is preserved.
pub fn build_command(
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> SoapCommand {
    let mut arguments = String::new();
    for (name, value) in args {
        arguments.push_str(&format!("<{name}>{}</{name}>", escape(*value)));
    }

    let body = format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="{ns}" s:encodingStyle="{enc}">"#,
            r#"<s:Body><u:{action} xmlns:u="{service}">{args}</u:{action}></s:Body>"#,
            r#"</s:Envelope>"#
        ),
        ns = ENVELOPE_NS,
        enc = ENCODING_STYLE,
        action = action,
        service = service_type,
        args = arguments,
    );

    SoapCommand {
        url: control_url.to_string(),
        headers: vec![
            ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
            ("SOAPACTION".to_string(), soap_action(service_type, action)),
        ],
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVT: &str = "urn:schemas-upnp-org:service:AVTransport:1";

    #[test]
    fn test_soap_action_header() {
        let command = build_command(
            "http://192.168.1.10:1400/MediaRenderer/AVTransport/Control",
            AVT,
            "Play",
            &[("InstanceID", "0"), ("Speed", "1")],
        );

        let request = command.into_request();
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.get_header("SOAPACTION"),
            Some("\"urn:schemas-upnp-org:service:AVTransport:1#Play\"")
        );
        assert_eq!(
            request.get_header("content-type"),
            Some("text/xml; charset=\"utf-8\"")
        );
    }

    #[test]
    fn test_envelope_shape_and_argument_order() {
        let command = build_command("http://h/c", AVT, "Seek", &[("InstanceID", "0"), ("Unit", "REL_TIME")]);

        assert!(command.body.contains("<s:Envelope"));
        assert!(command.body.contains("s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\""));
        assert!(command.body.contains(
            "<u:Seek xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\"><InstanceID>0</InstanceID><Unit>REL_TIME</Unit></u:Seek>"
        ));
    }

    #[test]
    fn test_argument_values_are_escaped() {
        let command = build_command(
            "http://h/c",
            AVT,
            "SetAVTransportURI",
            &[("CurrentURIMetaData", r#"<DIDL a="1">Tom & Jerry's</DIDL>"#)],
        );

        assert!(command.body.contains(
            "<CurrentURIMetaData>&lt;DIDL a=&quot;1&quot;&gt;Tom &amp; Jerry&apos;s&lt;/DIDL&gt;</CurrentURIMetaData>"
        ));
    }
}
