//! UPnP fault decoding.
//!
//! A device reports a failed action with HTTP 500 and a SOAP fault whose
//! `detail` carries a `UPnPError` element:
//!
//! ```xml
//! <s:Fault>
//!   <faultcode>s:Client</faultcode>
//!   <faultstring>UPnPError</faultstring>
//!   <detail>
//!     <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
//!       <errorCode>402</errorCode>
//!       <errorDescription>Invalid Args</errorDescription>
//!     </UPnPError>
//!   </detail>
//! </s:Fault>
//! ```

use std::fmt;

/// A UPnP error reported by a device in response to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpFault {
    /// The UPnP error code exactly as transmitted (e.g. `"402"`)
    pub error_code: String,
    /// Canonical description for known codes, otherwise the device's own text
    pub error_description: String,
    /// The raw fault body, kept for diagnostics
    pub raw_xml: String,
}

impl UpnpFault {
    /// Build a fault, replacing the device description with the canonical one
    /// when the code is known for the given service type.
    pub fn new(
        error_code: impl Into<String>,
        device_description: impl Into<String>,
        raw_xml: impl Into<String>,
        service_type: &str,
    ) -> Self {
        let error_code = error_code.into();
        let error_description = match canonical_description(&error_code, service_type) {
            Some(known) => known.to_string(),
            None => device_description.into(),
        };
        Self {
            error_code,
            error_description,
            raw_xml: raw_xml.into(),
        }
    }

    /// Numeric value of the error code, if it is numeric.
    pub fn code(&self) -> Option<u16> {
        self.error_code.trim().parse().ok()
    }

    /// Whether the device refused the action itself rather than its arguments.
    ///
    /// Large households and some firmware versions answer certain actions
    /// (notably `GetZoneGroupState`) with `Invalid Action` or `Action Failed`.
    pub fn indicates_unsupported(&self) -> bool {
        matches!(self.code(), Some(401) | Some(501))
    }
}

impl fmt::Display for UpnpFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPnP error {}: {}", self.error_code, self.error_description)
    }
}

impl std::error::Error for UpnpFault {}

/// Look up the canonical description for a UPnP error code.
///
/// Codes in the 7xx range are service specific, so the service type
/// (e.g. `"urn:schemas-upnp-org:service:AVTransport:1"`) selects the table.
pub fn canonical_description(error_code: &str, service_type: &str) -> Option<&'static str> {
    let code: u16 = error_code.trim().parse().ok()?;
    if let Some(desc) = generic_description(code) {
        return Some(desc);
    }

    if service_type.contains(":AVTransport:") {
        av_transport_description(code)
    } else if service_type.contains(":ContentDirectory:") {
        content_directory_description(code)
    } else if service_type.contains(":RenderingControl:")
        || service_type.contains(":GroupRenderingControl:")
    {
        rendering_control_description(code)
    } else {
        None
    }
}

fn generic_description(code: u16) -> Option<&'static str> {
    let desc = match code {
        400 => "Bad Request",
        401 => "Invalid Action",
        402 => "Invalid Args",
        403 => "Out of Sync",
        404 => "Invalid Var",
        412 => "Precondition Failed",
        501 => "Action Failed",
        600 => "Argument Value Invalid",
        601 => "Argument Value Out of Range",
        602 => "Optional Action Not Implemented",
        603 => "Out Of Memory",
        604 => "Human Intervention Required",
        605 => "String Argument Too Long",
        606 => "Action Not Authorized",
        607 => "Signature Failure",
        608 => "Signature Missing",
        609 => "Not Encrypted",
        610 => "Invalid Sequence",
        611 => "Invalid Control URL",
        612 => "No Such Session",
        _ => return None,
    };
    Some(desc)
}

fn av_transport_description(code: u16) -> Option<&'static str> {
    let desc = match code {
        701 => "Transition not available",
        702 => "No contents",
        703 => "Read error",
        704 => "Format not supported for playback",
        705 => "Transport is locked",
        706 => "Write error",
        707 => "Media is protected or not writeable",
        708 => "Format not supported for recording",
        709 => "Media is full",
        710 => "Seek mode not supported",
        711 => "Illegal seek target",
        712 => "Play mode not supported",
        713 => "Record quality not supported",
        714 => "Illegal MIME-Type",
        715 => "Content 'BUSY'",
        716 => "Resource Not found",
        717 => "Play speed not supported",
        718 => "Invalid InstanceID",
        _ => return None,
    };
    Some(desc)
}

fn content_directory_description(code: u16) -> Option<&'static str> {
    let desc = match code {
        701 => "No such object",
        702 => "Invalid CurrentTagValue",
        703 => "Invalid NewTagValue",
        704 => "Required tag",
        705 => "Read only tag",
        706 => "Parameter Mismatch",
        708 => "Unsupported or invalid search criteria",
        709 => "Unsupported or invalid sort criteria",
        710 => "No such container",
        711 => "Restricted object",
        712 => "Bad metadata",
        713 => "Restricted parent object",
        714 => "No such source resource",
        715 => "Resource access denied",
        716 => "Transfer busy",
        717 => "No such file transfer",
        718 => "No such destination resource",
        719 => "Destination resource access denied",
        720 => "Cannot process the request",
        _ => return None,
    };
    Some(desc)
}

fn rendering_control_description(code: u16) -> Option<&'static str> {
    match code {
        701 => Some("Invalid Name"),
        702 => Some("Invalid InstanceID"),
        _ => None,
    }
}
