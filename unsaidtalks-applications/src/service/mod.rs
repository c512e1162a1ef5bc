//! Remote data service adapters
//!
//! Helpers that turn [`DataService`] calls into fetch producers and mutation
//! operations, plus the HTTP implementation.

pub mod http;

pub use http::HttpDataService;

use crate::fetch::{producer, Producer};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use unsaidtalks_core::{DashboardResult, DataService};

/// Producer that reads `endpoint` and decodes the reply as `T`
pub fn json_producer<T>(service: Arc<dyn DataService>, endpoint: impl Into<String>) -> Producer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let endpoint: Arc<str> = endpoint.into().into();
    producer(move || {
        let service = Arc::clone(&service);
        let endpoint = Arc::clone(&endpoint);
        async move { decode(service.get(&endpoint).await?) }
    })
}

/// Producer returning the raw JSON reply of `endpoint`
pub fn value_producer(service: Arc<dyn DataService>, endpoint: impl Into<String>) -> Producer<Value> {
    json_producer(service, endpoint)
}

fn decode<T: DeserializeOwned>(value: Value) -> DashboardResult<T> {
    Ok(serde_json::from_value(value)?)
}
