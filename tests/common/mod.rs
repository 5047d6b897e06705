#![allow(dead_code)]

use mcp_orgm::client::{
    EndpointConfig, GatewayCredentials, PostgrestBackend, Resource, ResourceClient, ResourceRecord,
};
use serde_json::Value;
use wiremock::{MockServer, Request};

/// A mock PostgREST backend and a backend handle pointed at it.
pub struct TestEnvironment {
    pub server: MockServer,
    pub backend: PostgrestBackend,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let backend = PostgrestBackend::new(EndpointConfig::new(server.uri()))
            .expect("Failed to build backend for mock server");
        Self { server, backend }
    }

    pub async fn with_gateway(client_id: &str, client_secret: &str) -> Self {
        let server = MockServer::start().await;
        let config = EndpointConfig::new(server.uri()).with_gateway(GatewayCredentials::new(
            client_id.to_string(),
            client_secret.to_string(),
        ));
        let backend = PostgrestBackend::new(config).expect("Failed to build backend for mock server");
        Self { server, backend }
    }

    pub fn client(&self, resource: Resource) -> ResourceClient {
        self.backend.resource(resource)
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .expect("Request recording is enabled by default")
    }

    pub async fn requests_with_method(&self, method: &str) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.method.to_string() == method)
            .collect()
    }
}

/// A backend whose base URL was never configured.
pub fn unconfigured_backend() -> PostgrestBackend {
    PostgrestBackend::new(EndpointConfig::unconfigured()).expect("Failed to build backend")
}

/// A backend pointed at a port nothing listens on.
pub fn unreachable_backend() -> PostgrestBackend {
    PostgrestBackend::new(EndpointConfig::new("http://127.0.0.1:1")).expect("Failed to build backend")
}

pub fn record(value: Value) -> ResourceRecord {
    ResourceRecord::try_from(value).expect("test records must be JSON objects")
}

pub fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).expect("request body should be JSON")
}

pub fn init_test_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
