//! Doubles shared by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sonos_api::{HttpRequest, HttpResponse, HttpTransport, InvokerConfig, SoapError, SonosClient};

use crate::dispatcher::NotifyDispatcher;
use crate::error::Result;
use crate::listener::EventListener;
use crate::registry::SubscriptionRegistry;
use crate::StreamConfig;

/// Device side of GENA: grants every lease for `granted` seconds
pub struct ScriptedGena {
    granted: u64,
    next_sid: AtomicUsize,
    fail_subscribe: AtomicBool,
    fail_renew: AtomicBool,
    rotate_sids: AtomicBool,
    delays: Mutex<HashMap<&'static str, Duration>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedGena {
    pub fn new(granted: u64) -> Arc<Self> {
        Arc::new(Self {
            granted,
            next_sid: AtomicUsize::new(1),
            fail_subscribe: AtomicBool::new(false),
            fail_renew: AtomicBool::new(false),
            rotate_sids: AtomicBool::new(false),
            delays: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_subscribes(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn fail_renewals(&self) {
        self.fail_renew.store(true, Ordering::SeqCst);
    }

    /// Answer renewals with a freshly assigned SID
    pub fn rotate_sids(&self) {
        self.rotate_sids.store(true, Ordering::SeqCst);
    }

    /// Hold every `kind` response for `delay` after logging the request
    pub fn delay(&self, kind: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(kind, delay);
    }

    /// Requests seen with `kind`: SUBSCRIBE, RENEW or UNSUBSCRIBE
    pub fn count(&self, kind: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|request| kind_of(request) == kind)
            .count()
    }

    pub fn callbacks(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|request| request.get_header("CALLBACK").map(str::to_string))
            .collect()
    }

    pub fn last_timeout_header(&self) -> Option<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.method == "SUBSCRIBE")
            .and_then(|request| request.get_header("TIMEOUT").map(str::to_string))
    }
}

fn kind_of(request: &HttpRequest) -> &'static str {
    match request.method.as_str() {
        "SUBSCRIBE" if request.get_header("SID").is_some() => "RENEW",
        "SUBSCRIBE" => "SUBSCRIBE",
        "UNSUBSCRIBE" => "UNSUBSCRIBE",
        _ => "OTHER",
    }
}

#[async_trait]
impl HttpTransport for ScriptedGena {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, SoapError> {
        let kind = kind_of(&request);
        let sid = request.get_header("SID").map(str::to_string);
        self.log.lock().unwrap().push(request);

        let delay = self.delays.lock().unwrap().get(kind).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let lease = format!("Second-{}", self.granted);
        let response = match kind {
            "SUBSCRIBE" if self.fail_subscribe.load(Ordering::SeqCst) => HttpResponse::new(503, ""),
            "SUBSCRIBE" => {
                let n = self.next_sid.fetch_add(1, Ordering::SeqCst);
                HttpResponse::new(200, "")
                    .with_header("SID", format!("uuid:RINCON_TEST_sub{:010}", n))
                    .with_header("TIMEOUT", lease)
            }
            "RENEW" if self.fail_renew.load(Ordering::SeqCst) => HttpResponse::new(412, ""),
            "RENEW" => {
                let sid = if self.rotate_sids.load(Ordering::SeqCst) {
                    let n = self.next_sid.fetch_add(1, Ordering::SeqCst);
                    format!("uuid:RINCON_TEST_sub{:010}", n)
                } else {
                    sid.unwrap_or_default()
                };
                HttpResponse::new(200, "")
                    .with_header("SID", sid)
                    .with_header("TIMEOUT", lease)
            }
            _ => HttpResponse::new(200, ""),
        };
        Ok(response)
    }
}

/// Listener that only records start and stop calls
#[derive(Default)]
pub struct StaticListener {
    running: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl StaticListener {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventListener for StaticListener {
    async fn start(&self, _dispatcher: NotifyDispatcher) -> Result<String> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok("http://127.0.0.1:3400".to_string())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub fn gena_registry(
    gena: Arc<ScriptedGena>,
    config: StreamConfig,
) -> (Arc<SubscriptionRegistry>, Arc<StaticListener>) {
    let client = SonosClient::with_transport(gena, InvokerConfig::default()).unwrap();
    let listener = Arc::new(StaticListener::default());
    let registry = SubscriptionRegistry::with_listener(client, listener.clone(), config).unwrap();
    (registry, listener)
}
