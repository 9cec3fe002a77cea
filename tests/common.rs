#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use sysmond::config::ConfigV1;
use sysmond::metrics::MetricRegistry;
use sysmond::routes::create_router;
use sysmond::state::AppState;

pub fn test_config() -> ConfigV1 {
    ConfigV1 {
        bind_address: "127.0.0.1:0".to_string(),
        poll_interval_ms: 10,
        probes: Vec::new(),
        ..ConfigV1::default()
    }
}

pub fn build_app(metrics: Arc<MetricRegistry>) -> Router {
    create_router(AppState {
        config: Arc::new(test_config()),
        metrics,
    })
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

/// Sample lines of a text exposition as `(name, value)`, skipping comments.
pub fn samples(text: &str) -> Vec<(String, f64)> {
    text.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let (name, value) = line
                .rsplit_once(' ')
                .unwrap_or_else(|| panic!("malformed sample line: {:?}", line));
            let value = value
                .parse::<f64>()
                .unwrap_or_else(|_| panic!("malformed sample value: {:?}", line));
            (name.to_string(), value)
        })
        .collect()
}

pub fn sample(text: &str, name: &str) -> Option<f64> {
    samples(text)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}
