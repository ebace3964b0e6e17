//! Decoding of action responses and SOAP faults

use indexmap::IndexMap;
use xmltree::{Element, XMLNode};

use crate::error::SoapError;
use crate::fault::UpnpFault;

/// Output arguments of an action, in document order
pub type ActionResponse = IndexMap<String, String>;

fn parse_body(raw: &str) -> Option<Element> {
    let envelope = Element::parse(raw.as_bytes()).ok()?;
    envelope.get_child("Body").cloned()
}

/// Decode a HTTP 200 body into the `{action}Response` output arguments.
///
/// Each child element becomes one entry; empty elements map to `""`.
pub fn parse_action_response(raw: &str, action: &str) -> Result<ActionResponse, SoapError> {
    let body = parse_body(raw).ok_or_else(|| SoapError::unknown_response(raw))?;
    let response_name = format!("{}Response", action);
    let response = body
        .get_child(response_name.as_str())
        .ok_or_else(|| SoapError::unknown_response(raw))?;

    let mut out = IndexMap::new();
    for node in &response.children {
        if let XMLNode::Element(child) = node {
            let value = child.get_text().map(|t| t.into_owned()).unwrap_or_default();
            out.insert(child.name.clone(), value);
        }
    }
    Ok(out)
}

/// Decode a HTTP 500 body into a [`UpnpFault`].
///
/// Devices spell the detail element either `UPnPError` or `UpnPError`.
/// A body that is not a SOAP fault with an error code is reported as
/// [`SoapError::UnknownResponse`].
pub fn parse_fault(raw: &str, service_type: &str) -> SoapError {
    match decode_fault(raw, service_type) {
        Some(fault) => SoapError::Fault(fault),
        None => SoapError::unknown_response(raw),
    }
}

fn decode_fault(raw: &str, service_type: &str) -> Option<UpnpFault> {
    let body = parse_body(raw)?;
    let fault = body.get_child("Fault")?;
    let detail = fault.get_child("detail")?;
    let upnp_error = detail
        .get_child("UPnPError")
        .or_else(|| detail.get_child("UpnPError"))?;

    let code = upnp_error.get_child("errorCode")?.get_text()?;
    let code = code.trim();
    if code.is_empty() {
        return None;
    }

    let description = upnp_error
        .get_child("errorDescription")
        .and_then(|e| e.get_text())
        .or_else(|| fault.get_child("faultstring").and_then(|e| e.get_text()))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    Some(UpnpFault::new(code, description, raw, service_type))
}
