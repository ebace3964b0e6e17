//! HTTP server for receiving UPnP event notifications.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warp::http::{HeaderMap, Method, StatusCode};
use warp::path::FullPath;
use warp::Filter;

use crate::error::{CallbackError, Result};
use crate::payload::NotificationPayload;

/// HTTP callback server for receiving UPnP event notifications.
///
/// The server binds the first free port of a range and accepts `NOTIFY`
/// requests on any path. Every well-formed notification is forwarded, headers
/// and body untouched, to the channel given at construction; deciding what the
/// notification belongs to is the consumer's job.
///
/// # Example
///
/// ```no_run
/// use tokio::sync::mpsc;
/// use callback_server::{CallbackServer, NotificationPayload};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
///
///     let server = CallbackServer::new((3400, 3500), tx)
///         .await
///         .expect("Failed to create callback server");
///
///     println!("Server listening at: {}", server.base_url());
///
///     while let Some(notification) = rx.recv().await {
///         println!("event for {:?}", notification.subscription_id());
///     }
/// }
/// ```
pub struct CallbackServer {
    port: u16,
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Start a server, advertising the local address used for outbound traffic.
    pub async fn new(
        port_range: (u16, u16),
        event_sender: mpsc::UnboundedSender<NotificationPayload>,
    ) -> Result<Self> {
        Self::with_advertised_ip(port_range, None, event_sender).await
    }

    /// Start a server, advertising `advertise_ip` in the callback URL when given.
    ///
    /// A range of `(0, 0)` lets the operating system choose the port.
    pub async fn with_advertised_ip(
        port_range: (u16, u16),
        advertise_ip: Option<IpAddr>,
        event_sender: mpsc::UnboundedSender<NotificationPayload>,
    ) -> Result<Self> {
        let (start, end) = port_range;
        if start > end {
            return Err(CallbackError::InvalidPortRange { start, end });
        }

        let local_ip = match advertise_ip {
            Some(ip) => ip,
            None => detect_local_ip().ok_or(CallbackError::LocalIpUnavailable)?,
        };

        let routes = notify_route(event_sender).recover(handle_rejection);

        for port in start..=end {
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
            let bound = warp::serve(routes.clone())
                .try_bind_with_graceful_shutdown(bind_addr, async move {
                    let _ = shutdown_rx.await;
                });

            match bound {
                Ok((addr, server)) => {
                    let base_url = match local_ip {
                        IpAddr::V4(ip) => format!("http://{}:{}", ip, addr.port()),
                        IpAddr::V6(ip) => format!("http://[{}]:{}", ip, addr.port()),
                    };
                    info!(%addr, base_url = %base_url, "callback server listening");

                    return Ok(Self {
                        port: addr.port(),
                        base_url,
                        shutdown_tx: Some(shutdown_tx),
                        server_handle: Some(tokio::spawn(server)),
                    });
                }
                Err(e) => debug!(port, error = %e, "port unavailable"),
            }
        }

        Err(CallbackError::NoAvailablePort { start, end })
    }

    /// The callback URL to hand to devices, `http://<ip>:<port>`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting requests and wait for in-flight ones to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!(port = self.port, "callback server stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for CallbackServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackServer")
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Detect the local IP address for callback URLs.
///
/// Connecting a UDP socket picks the interface used for outbound traffic
/// without sending any data.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip())
}

fn notify_route(
    sender: mpsc::UnboundedSender<NotificationPayload>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and_then(
            move |method: Method, path: FullPath, headers: HeaderMap, body: Bytes| {
                let sender = sender.clone();
                async move { handle_notify(method, path, headers, body, &sender) }
            },
        )
}

fn handle_notify(
    method: Method,
    path: FullPath,
    headers: HeaderMap,
    body: Bytes,
    sender: &mpsc::UnboundedSender<NotificationPayload>,
) -> std::result::Result<warp::reply::WithStatus<&'static str>, warp::Rejection> {
    if method.as_str() != "NOTIFY" {
        return Err(warp::reject::custom(NotNotify));
    }

    let headers: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_string(), v.to_string()))
        })
        .collect();
    let payload = NotificationPayload::new(
        path.as_str(),
        headers,
        String::from_utf8_lossy(&body).into_owned(),
    );

    if let Err(problem) = validate_upnp_headers(&payload) {
        debug!(path = path.as_str(), ?problem, "rejecting NOTIFY");
        return Err(warp::reject::custom(problem));
    }

    debug!(
        sid = payload.subscription_id().unwrap_or_default(),
        seq = payload.header("seq").unwrap_or_default(),
        bytes = body.len(),
        "NOTIFY received"
    );

    if sender.send(payload).is_err() {
        warn!("notification consumer has gone away");
        return Err(warp::reject::custom(ConsumerGone));
    }

    Ok(warp::reply::with_status("", StatusCode::OK))
}

/// Why a NOTIFY was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderProblem {
    MissingSid,
    BadNotificationType,
}

impl warp::reject::Reject for HeaderProblem {}

#[derive(Debug)]
struct NotNotify;

impl warp::reject::Reject for NotNotify {}

#[derive(Debug)]
struct ConsumerGone;

impl warp::reject::Reject for ConsumerGone {}

/// The SID header is required; NT and NTS, when present, must carry the
/// GENA property-change values.
fn validate_upnp_headers(payload: &NotificationPayload) -> std::result::Result<(), HeaderProblem> {
    if payload
        .subscription_id()
        .map_or(true, |sid| sid.trim().is_empty())
    {
        return Err(HeaderProblem::MissingSid);
    }

    let nt_ok = payload.header("nt").map_or(true, |v| v == "upnp:event");
    let nts_ok = payload
        .header("nts")
        .map_or(true, |v| v == "upnp:propchange");
    if !(nt_ok && nts_ok) {
        return Err(HeaderProblem::BadNotificationType);
    }

    Ok(())
}

async fn handle_rejection(
    err: warp::Rejection,
) -> std::result::Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(problem) = err.find::<HeaderProblem>() {
        match problem {
            HeaderProblem::MissingSid => (StatusCode::PRECONDITION_FAILED, "Missing SID header"),
            HeaderProblem::BadNotificationType => (StatusCode::BAD_REQUEST, "Invalid UPnP headers"),
        }
    } else if err.find::<NotNotify>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Only NOTIFY is accepted")
    } else if err.find::<ConsumerGone>().is_some() {
        (StatusCode::SERVICE_UNAVAILABLE, "Not accepting events")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, code))
}
