//! Shared mock transport and fixtures for integration tests.
//!
//! Provides a deterministic `HttpTransport` implementation that routes
//! requests by URL pattern and replies from canned scripts — all
//! in-memory with no external dependencies.

// Each integration test target compiles its own copy; not every target
// uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use astrolabe::cancel::Cancellation;
use astrolabe::client::{HttpTransport, RawResponse, RetryingClient};
use astrolabe::config::{AppConfig, RetryConfig};
use astrolabe::engine::CorrelationEngine;
use astrolabe::limiter::RateLimiter;
use astrolabe::sources::imagery::ImageryAdapter;
use astrolabe::sources::neo::NeoAdapter;
use astrolabe::sources::rover::RoverAdapter;

pub const BASE_URL: &str = "https://api.test";

/// One canned reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    TransportError(String),
    /// Never completes; pairs with deadline tests under a paused clock.
    Hang,
}

struct Route {
    pattern: String,
    queue: VecDeque<Reply>,
    sticky: Reply,
}

/// Pattern-routed mock transport. The longest pattern contained in the
/// full request URL (path + query) wins, so specific stubs can override
/// general ones.
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<(Instant, String)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Stub every request matching `pattern` with a JSON success.
    pub fn stub(&self, pattern: &str, body: serde_json::Value) {
        self.stub_reply(pattern, Reply::Status(200, body.to_string()));
    }

    /// Stub every request matching `pattern` with a fixed reply.
    pub fn stub_reply(&self, pattern: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) = routes.iter_mut().find(|r| r.pattern == pattern) {
            route.sticky = reply;
        } else {
            routes.push(Route {
                pattern: pattern.to_string(),
                queue: VecDeque::new(),
                sticky: reply,
            });
        }
    }

    /// Queue one-shot replies ahead of the sticky reply.
    pub fn stub_seq(&self, pattern: &str, replies: Vec<Reply>, then: Reply) {
        let mut routes = self.routes.lock().unwrap();
        routes.push(Route {
            pattern: pattern.to_string(),
            queue: replies.into(),
            sticky: then,
        });
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| url.contains(pattern))
            .count()
    }

    /// Grant instants of all calls matching `pattern`, in call order.
    pub fn call_times_matching(&self, pattern: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| url.contains(pattern))
            .map(|(t, _)| *t)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<RawResponse, String> {
        let joined = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let full = format!("{url}?{joined}");
        self.calls.lock().unwrap().push((Instant::now(), full.clone()));

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let best = routes
                .iter_mut()
                .filter(|r| full.contains(&r.pattern))
                .max_by_key(|r| r.pattern.len());
            match best {
                Some(route) => route.queue.pop_front().unwrap_or_else(|| route.sticky.clone()),
                None => return Err(format!("no stub for {full}")),
            }
        };

        match reply {
            Reply::Status(status, body) => Ok(RawResponse { status, body }),
            Reply::TransportError(msg) => Err(msg),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

/// Fast retry policy for tests: real shape, short delays.
pub fn test_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        multiplier: 2.0,
        max_delay_ms: 100,
        jitter_ms: 0,
    }
}

pub fn test_client(transport: Arc<MockTransport>, limiter: Arc<RateLimiter>) -> Arc<RetryingClient> {
    Arc::new(RetryingClient::new(
        transport,
        limiter,
        test_retry(),
        BASE_URL,
        "TEST_KEY".to_string().into(),
    ))
}

/// Full stack over the mock transport with a permissive rate limit.
pub fn test_engine(transport: Arc<MockTransport>) -> CorrelationEngine {
    let limiter = Arc::new(RateLimiter::with_window(
        std::time::Duration::from_secs(1),
        100_000,
    ));
    let client = test_client(transport, limiter);
    let cfg = AppConfig::default();
    CorrelationEngine::new(
        Arc::new(ImageryAdapter::new(Arc::clone(&client), cfg.spans.imagery_max_days)),
        Arc::new(NeoAdapter::new(Arc::clone(&client), cfg.spans.neo_max_days)),
        Arc::new(RoverAdapter::new(client)),
        cfg.rovers.clone(),
        cfg.spans.correlation_max_days,
    )
}

#[allow(dead_code)]
pub fn no_cancel() -> Cancellation {
    Cancellation::none()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn apod_fixture(date: &str, title: &str) -> serde_json::Value {
    json!({
        "date": date,
        "title": title,
        "explanation": "A test explanation.",
        "url": "https://apod.nasa.gov/apod/image/fixture.jpg",
        "hdurl": "https://apod.nasa.gov/apod/image/fixture_hd.jpg",
        "media_type": "image",
        "service_version": "v1"
    })
}

pub fn neo_fixture(
    id: &str,
    date: &str,
    max_km: f64,
    hazardous: bool,
) -> serde_json::Value {
    json!({
        "id": id,
        "neo_reference_id": id,
        "name": format!("({id} Test)"),
        "estimated_diameter": {
            "kilometers": {
                "estimated_diameter_min": max_km / 2.0,
                "estimated_diameter_max": max_km
            }
        },
        "is_potentially_hazardous_asteroid": hazardous,
        "close_approach_data": [{
            "close_approach_date": date,
            "relative_velocity": { "kilometers_per_second": "15.0" },
            "miss_distance": { "kilometers": "3500000", "lunar": "9.1" }
        }]
    })
}

/// Feed body: objects grouped per approach date.
pub fn feed_fixture(by_date: &[(&str, Vec<serde_json::Value>)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    let mut count = 0;
    for (date, objects) in by_date {
        count += objects.len();
        map.insert((*date).to_string(), json!(objects));
    }
    json!({
        "element_count": count,
        "near_earth_objects": map
    })
}

pub fn photo_fixture(id: u64, sol: u32, camera: &str, earth_date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "sol": sol,
        "camera": { "id": 20, "name": camera, "rover_id": 5, "full_name": camera },
        "img_src": format!("https://mars.nasa.gov/photos/{id}.jpg"),
        "earth_date": earth_date,
        "rover": { "id": 5, "name": "Fixture" }
    })
}

pub fn photos_fixture(photos: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "photos": photos })
}

pub fn manifest_fixture(status: &str, max_sol: u32, total_photos: u64) -> serde_json::Value {
    json!({
        "rover": {
            "id": 5,
            "name": "Fixture",
            "launch_date": "2011-11-26",
            "landing_date": "2012-08-06",
            "status": status,
            "max_sol": max_sol,
            "max_date": "2024-02-19",
            "total_photos": total_photos
        }
    })
}
