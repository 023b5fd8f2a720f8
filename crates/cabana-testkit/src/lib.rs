// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use cabana_app::{Cabin, CabinId, SETTINGS_ROW_ID, Settings};
use serde::Deserialize;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use time::OffsetDateTime;
use tiny_http::{Header, Method, Response, Server};

const CABIN_NAMES: [&str; 15] = [
    "Aspen", "Birch", "Cedar", "Douglas", "Elm", "Fir", "Hemlock", "Juniper", "Larch", "Maple",
    "Oak", "Pine", "Rowan", "Spruce", "Willow",
];

const CABIN_FEATURES: [&str; 10] = [
    "wood stove",
    "lake view",
    "private sauna",
    "wraparound porch",
    "outdoor hot tub",
    "stone fireplace",
    "loft bedroom",
    "screened veranda",
    "forest trailhead",
    "fire pit",
];

// Seed rows are stamped through 2026 so ordering tests have a spread of
// creation timestamps without touching the clock.
const REFERENCE_EPOCH: i64 = 1_767_225_600;

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic cabin data: the same seed always yields the same records.
pub struct CabinFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl CabinFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(if seed == 0 { 1 } else { seed }),
            next_id: 1,
        }
    }

    pub fn cabin(&mut self) -> Cabin {
        let id = self.next_id;
        self.next_id += 1;

        let name = CABIN_NAMES[self.rng.int_n(CABIN_NAMES.len())].to_owned();
        let max_capacity = 2 + self.rng.int_n(7) as i32;
        let regular_price_cents = 25_000 + self.rng.int_n(96) as i64 * 1_000;
        let discount_cents = if self.rng.int_n(3) == 0 {
            (regular_price_cents / 10).min(10_000)
        } else {
            0
        };
        let feature = CABIN_FEATURES[self.rng.int_n(CABIN_FEATURES.len())];
        let created_at = OffsetDateTime::from_unix_timestamp(
            REFERENCE_EPOCH + id * 86_400 + self.rng.int_n(86_400) as i64,
        )
        .expect("valid unix timestamp");

        Cabin {
            id: CabinId::new(id),
            name: name.clone(),
            max_capacity,
            regular_price_cents,
            discount_cents,
            description: format!("Sleeps {max_capacity}, {feature}."),
            image: format!("https://backend.example/storage/v1/object/public/cabin-images/{:08x}-{}.jpg",
                self.rng.next_u64() as u32, name.to_ascii_lowercase()),
            created_at,
        }
    }

    pub fn cabins(&mut self, count: usize) -> Vec<Cabin> {
        (0..count).map(|_| self.cabin()).collect()
    }
}

pub fn default_settings() -> Settings {
    Settings {
        id: SETTINGS_ROW_ID,
        min_booking_length: 3,
        max_booking_length: 30,
        max_guests_per_booking: 8,
        breakfast_price_cents: 1_500,
    }
}

// Incoming row writes, mirroring the wire shape the client sends.
#[derive(Debug, Clone, Deserialize)]
struct IncomingCabinWrite {
    name: String,
    max_capacity: i32,
    regular_price_cents: i64,
    discount_cents: i64,
    description: String,
    image: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct IncomingSettingsPatch {
    min_booking_length: Option<i32>,
    max_booking_length: Option<i32>,
    max_guests_per_booking: Option<i32>,
    breakfast_price_cents: Option<i64>,
}

#[derive(Debug)]
pub struct BackendState {
    pub cabins: Vec<Cabin>,
    pub settings: Settings,
    pub next_id: i64,
    /// Object names received by the storage endpoint, in order.
    pub uploads: Vec<String>,
    /// `"METHOD /path"` per request, in arrival order.
    pub requests: Vec<String>,
    pub fail_inserts: bool,
    pub fail_updates: bool,
    pub fail_deletes: bool,
    pub fail_uploads: bool,
}

/// In-process stand-in for the hosted backend: the row-store and
/// object-store routes the client speaks, plus scripted failures.
pub struct MockBackend {
    server: Arc<Server>,
    state: Arc<Mutex<BackendState>>,
    base_url: String,
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start() -> Result<Self> {
        Self::with_cabins(Vec::new())
    }

    pub fn with_cabins(cabins: Vec<Cabin>) -> Result<Self> {
        let server = Arc::new(
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock backend: {error}"))?,
        );
        let base_url = format!("http://{}", server.server_addr());
        let next_id = cabins.iter().map(|cabin| cabin.id.get()).max().unwrap_or(0) + 1;
        let state = Arc::new(Mutex::new(BackendState {
            cabins,
            settings: default_settings(),
            next_id,
            uploads: Vec::new(),
            requests: Vec::new(),
            fail_inserts: false,
            fail_updates: false,
            fail_deletes: false,
            fail_uploads: false,
        }));

        let worker_server = Arc::clone(&server);
        let worker_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            for request in worker_server.incoming_requests() {
                handle_request(&worker_state, request);
            }
        });

        Ok(Self {
            server,
            state,
            base_url,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state().uploads.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(state: &Mutex<BackendState>, mut request: tiny_http::Request) {
    let url = request.url().to_owned();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path.to_owned(), query.to_owned()),
        None => (url, String::new()),
    };
    let method = request.method().clone();

    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);

    let mut state = match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    state.requests.push(format!("{method} {path}"));

    let (status, payload) = route(&mut state, &method, &path, &query, &body);
    drop(state);

    let response = Response::from_string(payload).with_status_code(status).with_header(
        Header::from_bytes("Content-Type", "application/json").expect("valid content type"),
    );
    let _ = request.respond(response);
}

fn route(
    state: &mut BackendState,
    method: &Method,
    path: &str,
    query: &str,
    body: &str,
) -> (u16, String) {
    match (method, path) {
        (Method::Get, "/rest/v1/cabins") => (200, json_string(&state.cabins)),
        (Method::Post, "/rest/v1/cabins") => {
            if state.fail_inserts {
                return failure("cabin insert rejected by test");
            }
            let Ok(write) = serde_json::from_str::<IncomingCabinWrite>(body) else {
                return (400, error_body("malformed cabin row"));
            };
            let cabin = Cabin {
                id: CabinId::new(state.next_id),
                name: write.name,
                max_capacity: write.max_capacity,
                regular_price_cents: write.regular_price_cents,
                discount_cents: write.discount_cents,
                description: write.description,
                image: write.image,
                created_at: OffsetDateTime::from_unix_timestamp(
                    REFERENCE_EPOCH + state.next_id * 86_400,
                )
                .expect("valid unix timestamp"),
            };
            state.next_id += 1;
            state.cabins.push(cabin.clone());
            (201, json_string(&vec![cabin]))
        }
        (Method::Patch, "/rest/v1/cabins") => {
            if state.fail_updates {
                return failure("cabin update rejected by test");
            }
            let Some(id) = id_filter(query) else {
                return (400, error_body("missing id filter"));
            };
            let Ok(write) = serde_json::from_str::<IncomingCabinWrite>(body) else {
                return (400, error_body("malformed cabin row"));
            };
            match state.cabins.iter_mut().find(|cabin| cabin.id.get() == id) {
                Some(cabin) => {
                    cabin.name = write.name;
                    cabin.max_capacity = write.max_capacity;
                    cabin.regular_price_cents = write.regular_price_cents;
                    cabin.discount_cents = write.discount_cents;
                    cabin.description = write.description;
                    cabin.image = write.image;
                    (200, json_string(&vec![cabin.clone()]))
                }
                None => (200, "[]".to_owned()),
            }
        }
        (Method::Delete, "/rest/v1/cabins") => {
            if state.fail_deletes {
                return failure("cabin delete rejected by test");
            }
            let Some(id) = id_filter(query) else {
                return (400, error_body("missing id filter"));
            };
            state.cabins.retain(|cabin| cabin.id.get() != id);
            (204, String::new())
        }
        (Method::Get, "/rest/v1/settings") => (200, json_string(&vec![state.settings])),
        (Method::Patch, "/rest/v1/settings") => {
            if id_filter(query) != Some(SETTINGS_ROW_ID) {
                return (400, error_body("settings updates must target the singleton row"));
            }
            let Ok(patch) = serde_json::from_str::<IncomingSettingsPatch>(body) else {
                return (400, error_body("malformed settings patch"));
            };
            if let Some(value) = patch.min_booking_length {
                state.settings.min_booking_length = value;
            }
            if let Some(value) = patch.max_booking_length {
                state.settings.max_booking_length = value;
            }
            if let Some(value) = patch.max_guests_per_booking {
                state.settings.max_guests_per_booking = value;
            }
            if let Some(value) = patch.breakfast_price_cents {
                state.settings.breakfast_price_cents = value;
            }
            (200, json_string(&vec![state.settings]))
        }
        (Method::Post, _) if path.starts_with("/storage/v1/object/") => {
            if state.fail_uploads {
                return failure("upload rejected by test");
            }
            let name = path
                .rsplit_once('/')
                .map(|(_, name)| name.to_owned())
                .unwrap_or_default();
            state.uploads.push(name);
            (200, r#"{"Key":"ok"}"#.to_owned())
        }
        _ => (404, error_body("no such route")),
    }
}

fn id_filter(query: &str) -> Option<i64> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != "id" {
            return None;
        }
        value.strip_prefix("eq.")?.parse().ok()
    })
}

fn json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("serialize mock payload")
}

fn error_body(message: &str) -> String {
    format!(r#"{{"message":"{message}"}}"#)
}

fn failure(message: &str) -> (u16, String) {
    (500, error_body(message))
}
