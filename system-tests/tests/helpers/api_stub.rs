// system-tests/tests/helpers/api_stub.rs
// ============================================================================
// Module: SiteDocs API Stub
// Description: In-process stand-in for the SiteDocs HTTP API.
// Purpose: Run the conformance catalog hermetically, including fault modes.
// Dependencies: axum, sitedocs-conformance-core
// ============================================================================

//! ## Overview
//! The stub serves every catalog endpoint under `/api/v1` from an in-memory
//! [`World`]. Writes become visible only after a configurable lag so that
//! read-after-write polling is exercised. [`StubFault`] switches on
//! deliberate misbehavior for negative harness tests; faults combine.

use std::collections::BTreeMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use sitedocs_conformance_core::Endpoint;
use sitedocs_conformance_core::fixtures::id_text;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path prefix the stub serves the API under.
pub const BASE_PATH: &str = "/api/v1";

/// Key the stub accepts unless configured otherwise.
pub const STUB_API_KEY: &str = "stub-api-key";

/// Body served for worker photos (PNG signature).
pub const PHOTO_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Deliberate misbehavior injected into the stub.
///
/// A restore is a write that returns an entity to its seeded state: a PATCH
/// carrying the full seeded record, a status reactivation, or a worker
/// re-assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubFault {
    /// Restores answer `200 OK` but change nothing.
    BrokenRestore,
    /// Restores answer `500 Internal Server Error` and change nothing.
    RejectRestore,
    /// Worker deactivation (DELETE `/workers/status`) succeeds but changes nothing.
    NoopWorkerDeactivate,
    /// Every `Authorization` value is accepted.
    AcceptAnyKey,
}

/// Stub server options.
#[derive(Debug, Clone)]
pub struct StubOptions {
    /// Accepted API key.
    pub api_key: String,
    /// Delay before a write becomes visible to reads.
    pub visibility_lag: Duration,
    /// Injected faults; empty for a conforming API.
    pub faults: Vec<StubFault>,
}

impl StubOptions {
    /// Options with the given faults switched on.
    pub fn with_faults(faults: &[StubFault]) -> Self {
        Self {
            faults: faults.to_vec(),
            ..Self::default()
        }
    }

    /// True when `fault` is switched on.
    fn has(&self, fault: StubFault) -> bool {
        self.faults.contains(&fault)
    }
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            api_key: STUB_API_KEY.to_string(),
            visibility_lag: Duration::ZERO,
            faults: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Remote entity state held by the stub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct World {
    /// Workers by id.
    pub workers: BTreeMap<String, Value>,
    /// Locations by id.
    pub locations: BTreeMap<String, Value>,
    /// Form records in search order.
    pub forms: Vec<Value>,
    /// Form content documents by form id.
    pub form_content: BTreeMap<String, Value>,
    /// `(worker id, location id)` assignments.
    pub assignments: Vec<(String, String)>,
}

/// World state with delayed visibility of writes.
struct Visible {
    /// State reads observe.
    current: World,
    /// Pending state and the instant it becomes visible.
    staged: Option<(Instant, World)>,
}

impl Visible {
    /// Promotes staged state once its lag has elapsed.
    fn settle(&mut self) {
        let due = matches!(&self.staged, Some((due, _)) if Instant::now() >= *due);
        if due && let Some((_, world)) = self.staged.take() {
            self.current = world;
        }
    }

    /// Latest state including writes that are not visible yet.
    fn latest(&self) -> &World {
        self.staged.as_ref().map_or(&self.current, |(_, world)| world)
    }

    /// Applies a write on top of the latest state.
    fn write(
        &mut self,
        lag: Duration,
        mutate: impl FnOnce(&mut World) -> Result<(), Response>,
    ) -> Result<(), Response> {
        self.settle();
        let mut next = self.latest().clone();
        mutate(&mut next)?;
        if lag.is_zero() {
            self.current = next;
            self.staged = None;
        } else {
            self.staged = Some((Instant::now() + lag, next));
        }
        Ok(())
    }
}

/// Recorded request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubRequest {
    /// HTTP method.
    pub method: String,
    /// Request path including the base prefix.
    pub path: String,
    /// Whether the request passed the key check.
    pub authorized: bool,
}

/// Shared handler state.
#[derive(Clone)]
struct StubState {
    /// Server options.
    options: StubOptions,
    /// Externally visible base URL.
    base_url: String,
    /// State the stub was seeded with.
    seed: Arc<World>,
    /// Entity state.
    world: Arc<Mutex<Visible>>,
    /// Request log.
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle for a running stub; dropping it stops the server.
pub struct ApiStubHandle {
    /// Base URL including [`BASE_PATH`].
    base_url: String,
    /// Shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread.
    join: Option<thread::JoinHandle<()>>,
    /// Entity state.
    world: Arc<Mutex<Visible>>,
    /// Request log.
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl ApiStubHandle {
    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns captured requests.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Returns the state the stub converges to once pending writes land.
    pub fn eventual_world(&self) -> Option<World> {
        self.world.lock().ok().map(|visible| visible.latest().clone())
    }
}

impl Drop for ApiStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns the stub on a loopback port with its own runtime thread.
pub fn spawn_api_stub(world: World, options: StubOptions) -> Result<ApiStubHandle, String> {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("api stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("api stub listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("api stub local addr failed: {err}"))?;
    let base_url = format!("http://{addr}{BASE_PATH}");

    let seed = Arc::new(world.clone());
    let world = Arc::new(Mutex::new(Visible {
        current: world,
        staged: None,
    }));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        options,
        base_url: base_url.clone(),
        seed,
        world: Arc::clone(&world),
        requests: Arc::clone(&requests),
    };
    let app = Router::new().fallback(handle).with_state(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(ApiStubHandle {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        world,
        requests,
    })
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Single entry point; routing goes through the endpoint catalog.
async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let presented = headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok());
    let authorized = state.options.has(StubFault::AcceptAnyKey)
        || presented == Some(state.options.api_key.as_str());
    record_request(&state, &method, &uri, authorized);
    if !authorized {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({ "Message": "Authorization has been denied for this request." }),
        );
    }

    let Some(path) = uri.path().strip_prefix(BASE_PATH) else {
        return no_resource(&state.base_url, uri.path());
    };
    let Ok(endpoint) = path.parse::<Endpoint>() else {
        return no_resource(&state.base_url, path);
    };
    let payload = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => {
                return reply(
                    StatusCode::BAD_REQUEST,
                    json!({ "Message": "The request is invalid." }),
                );
            }
        }
    };
    let query: Vec<(String, String)> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let Ok(mut visible) = state.world.lock() else {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "Message": "state poisoned" }));
    };
    visible.settle();
    let request = Request {
        method: method.as_str(),
        endpoint,
        path,
        query: &query,
        payload,
    };
    match route(&mut visible, &state, request) {
        Ok(response) | Err(response) => response,
    }
}

/// Parsed request handed to [`route`].
struct Request<'a> {
    /// HTTP method name.
    method: &'a str,
    /// Catalog endpoint.
    endpoint: Endpoint,
    /// Path below [`BASE_PATH`].
    path: &'a str,
    /// Decoded query pairs.
    query: &'a [(String, String)],
    /// JSON body or null.
    payload: Value,
}

/// Serves one authorized request.
fn route(visible: &mut Visible, state: &StubState, request: Request<'_>) -> Result<Response, Response> {
    let lag = state.options.visibility_lag;
    let world = &visible.current;
    let payload = request.payload;
    match (request.method, request.endpoint) {
        ("GET", Endpoint::Form(id)) => world
            .forms
            .iter()
            .find(|form| has_id(form, &id))
            .map(|form| reply(StatusCode::OK, form.clone()))
            .ok_or_else(|| no_resource(&state.base_url, request.path)),
        ("GET", Endpoint::FormContent(id)) => world
            .form_content
            .get(&id)
            .map(|content| reply(StatusCode::OK, content.clone()))
            .ok_or_else(|| not_found("Form")),
        ("GET", Endpoint::Forms) => search_forms(world, request.query),
        ("GET", Endpoint::Location(id)) => world
            .locations
            .get(&id)
            .map(|location| reply(StatusCode::OK, location.clone()))
            .ok_or_else(|| not_found("Location")),
        ("GET", Endpoint::Locations) => Ok(list(world.locations.values())),
        ("PATCH", Endpoint::Locations) => {
            let id = payload_id(&payload, "Id")?;
            if state.seed.locations.get(&id) == Some(&payload) {
                restore_fault(state)?;
            }
            visible.write(lag, |world| merge_into(world.locations.get_mut(&id), &payload, "Location"))?;
            Ok(StatusCode::OK.into_response())
        }
        ("DELETE" | "POST", Endpoint::LocationStatus) => {
            let archive = request.method == "DELETE";
            let id = payload_id(&payload, "Id")?;
            if !archive {
                restore_fault(state)?;
            }
            visible.write(lag, |world| {
                set_flag(world.locations.get_mut(&id), "IsArchived", archive, "Location")
            })?;
            Ok(StatusCode::OK.into_response())
        }
        ("DELETE" | "POST", Endpoint::LocationWorker) => {
            let assign = request.method == "POST";
            let pair = (payload_id(&payload, "WorkerId")?, payload_id(&payload, "LocationId")?);
            if assign {
                restore_fault(state)?;
            }
            visible.write(lag, |world| {
                if !world.workers.contains_key(&pair.0) || !world.locations.contains_key(&pair.1) {
                    return Err(not_found("Assignment"));
                }
                world.assignments.retain(|existing| *existing != pair);
                if assign {
                    world.assignments.push(pair);
                }
                Ok(())
            })?;
            Ok(StatusCode::OK.into_response())
        }
        ("GET", Endpoint::Worker(id)) => world
            .workers
            .get(&id)
            .map(|worker| reply(StatusCode::OK, worker.clone()))
            .ok_or_else(|| not_found("Worker")),
        ("GET", Endpoint::Workers) => Ok(list(world.workers.values())),
        ("PUT", Endpoint::Worker(id)) => {
            visible.write(lag, |world| merge_into(world.workers.get_mut(&id), &payload, "Worker"))?;
            Ok(StatusCode::OK.into_response())
        }
        ("PATCH", Endpoint::Workers) => {
            let id = payload_id(&payload, "Id")?;
            if state.seed.workers.get(&id) == Some(&payload) {
                restore_fault(state)?;
            }
            visible.write(lag, |world| merge_into(world.workers.get_mut(&id), &payload, "Worker"))?;
            Ok(StatusCode::OK.into_response())
        }
        ("DELETE" | "POST", Endpoint::WorkerStatus) => {
            let active = request.method == "POST";
            let id = payload_id(&payload, "Id")?;
            if active {
                restore_fault(state)?;
            } else if state.options.has(StubFault::NoopWorkerDeactivate) {
                return Ok(StatusCode::OK.into_response());
            }
            visible.write(lag, |world| set_flag(world.workers.get_mut(&id), "IsActive", active, "Worker"))?;
            Ok(StatusCode::OK.into_response())
        }
        ("GET", Endpoint::WorkerPhoto(id)) => {
            if !world.workers.contains_key(&id) {
                return Err(not_found("Worker"));
            }
            Ok(([(header::CONTENT_TYPE, "image/png")], PHOTO_BYTES).into_response())
        }
        ("GET", Endpoint::WorkerLocations(id)) => Ok(list(
            world
                .assignments
                .iter()
                .filter(|(worker, _)| *worker == id)
                .filter_map(|(_, location)| world.locations.get(location)),
        )),
        ("GET", Endpoint::WorkerPermissionProfile) => Ok(reply(
            StatusCode::OK,
            json!([
                { "Id": 1, "Name": "Worker" },
                { "Id": 2, "Name": "Supervisor" },
            ]),
        )),
        (method, _) => Err(reply(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "Message": format!("The requested resource does not support http method '{method}'.") }),
        )),
    }
}

/// `GET /forms` honoring `count` and `formTypeId`.
fn search_forms(world: &World, query: &[(String, String)]) -> Result<Response, Response> {
    let lookup = |key: &str| query.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str());
    let count = match lookup("count") {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            reply(StatusCode::BAD_REQUEST, json!({ "Message": "count must be a number." }))
        })?,
        None => world.forms.len(),
    };
    let type_id = lookup("formTypeId");
    Ok(list(
        world
            .forms
            .iter()
            .filter(|form| {
                type_id.is_none_or(|wanted| {
                    form.get("DocumentTemplateId").and_then(id_text).as_deref() == Some(wanted)
                })
            })
            .take(count),
    ))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Short-circuits a restore according to the configured faults.
fn restore_fault(state: &StubState) -> Result<(), Response> {
    if state.options.has(StubFault::RejectRestore) {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "Message": "An error has occurred." }),
        ));
    }
    if state.options.has(StubFault::BrokenRestore) {
        return Err(StatusCode::OK.into_response());
    }
    Ok(())
}

/// JSON response with a status.
fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// JSON array response.
fn list<'a>(items: impl Iterator<Item = &'a Value>) -> Response {
    reply(StatusCode::OK, Value::Array(items.cloned().collect()))
}

/// The vendor's route-miss response.
fn no_resource(base_url: &str, path: &str) -> Response {
    reply(
        StatusCode::NOT_FOUND,
        json!({
            "Message": format!("No HTTP resource was found that matches the request URI '{base_url}{path}'.")
        }),
    )
}

/// Entity-miss response.
fn not_found(kind: &str) -> Response {
    reply(StatusCode::NOT_FOUND, json!({ "Message": format!("{kind} not found.") }))
}

/// True when `record` carries identifier `id`.
fn has_id(record: &Value, id: &str) -> bool {
    record.get("Id").and_then(id_text).as_deref() == Some(id)
}

/// Reads an identifier field from a request body.
fn payload_id(payload: &Value, field: &str) -> Result<String, Response> {
    payload.get(field).and_then(id_text).ok_or_else(|| {
        reply(StatusCode::BAD_REQUEST, json!({ "Message": format!("{field} is required.") }))
    })
}

/// Shallow-merges the payload's fields into an existing record.
fn merge_into(target: Option<&mut Value>, payload: &Value, kind: &str) -> Result<(), Response> {
    let (Some(Value::Object(record)), Value::Object(fields)) = (target, payload) else {
        return Err(not_found(kind));
    };
    for (key, value) in fields {
        record.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// Sets a boolean flag on an existing record.
fn set_flag(target: Option<&mut Value>, field: &str, value: bool, kind: &str) -> Result<(), Response> {
    let Some(Value::Object(record)) = target else {
        return Err(not_found(kind));
    };
    record.insert(field.to_string(), Value::Bool(value));
    Ok(())
}

/// Appends to the request log.
fn record_request(state: &StubState, method: &Method, uri: &Uri, authorized: bool) {
    let Ok(mut guard) = state.requests.lock() else {
        return;
    };
    guard.push(StubRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorized,
    });
}
