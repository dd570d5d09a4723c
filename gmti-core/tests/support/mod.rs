//! Fake engine HTTP interface shared by the integration tests.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use gmti_config::EngineEndpoints;
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct FakeEngine {
    pub polls: Arc<AtomicU64>,
    pub submissions: Arc<Mutex<Vec<Value>>>,
    /// Delay applied to the first telemetry request only.
    pub first_poll_delay: Duration,
    /// Delay applied to every telemetry request.
    pub poll_delay: Duration,
    /// Delay applied to every submission, indexed by arrival order.
    pub submit_delays: Vec<Duration>,
    pub submit_status: Option<StatusCode>,
}

impl FakeEngine {
    pub async fn serve(self) -> anyhow::Result<EngineEndpoints> {
        let router = Router::new()
            .route("/payload", get(payload))
            .route("/ingest-config", post(ingest))
            .with_state(self);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(EngineEndpoints::parse(&format!("http://{addr}"))?)
    }

    pub fn submitted(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }
}

async fn payload(State(engine): State<FakeEngine>) -> Json<Value> {
    let n = engine.polls.fetch_add(1, Ordering::SeqCst) + 1;
    if n == 1 && !engine.first_poll_delay.is_zero() {
        tokio::time::sleep(engine.first_poll_delay).await;
    }
    if !engine.poll_delay.is_zero() {
        tokio::time::sleep(engine.poll_delay).await;
    }
    Json(json!({
        "power_profile": [1.0, 2.0, 4.0, 2.0, 1.0],
        "detection_count": n,
    }))
}

async fn ingest(
    State(engine): State<FakeEngine>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let index = {
        let mut submissions = engine.submissions.lock().unwrap();
        submissions.push(body.clone());
        submissions.len() - 1
    };
    if let Some(delay) = engine.submit_delays.get(index) {
        tokio::time::sleep(*delay).await;
    }
    let status = engine.submit_status.unwrap_or(StatusCode::OK);
    (
        status,
        Json(json!({
            "status": "ok",
            "detections": index + 1,
            "description": body
                .get("description")
                .cloned()
                .unwrap_or(Value::Null),
        })),
    )
}
