// Common test utilities and fixtures
#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};
use webquery_lib::{HostCommand, HostEvent, Settings};

/// Mock JSON endpoint for testing
pub struct MockEndpoint {
    pub server: ServerGuard,
}

impl MockEndpoint {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Full URL for a path on the mock server
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    pub async fn mock_json(&mut self, path: &str, body: Value) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn mock_status(&mut self, path: &str, status: usize) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": "nope"}).to_string())
            .create_async()
            .await
    }

    pub async fn mock_invalid_json(&mut self, path: &str) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not valid json {{{")
            .create_async()
            .await
    }

    /// Expects a POST carrying the given headers
    pub async fn mock_post_with_headers(&mut self, path: &str, headers: &[(&str, &str)], body: Value) -> Mock {
        let mut mock = self.server.mock("POST", path);
        for (name, value) in headers {
            mock = mock.match_header(*name, Matcher::Exact(value.to_string()));
        }
        mock.with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }
}

pub fn settings_for(url: &str, path: &str) -> Settings {
    Settings {
        url: Some(url.to_string()),
        path: Some(path.to_string()),
        ..Default::default()
    }
}

/// Build a host event from the JSON the host would send
pub fn host_event(event: &str, context: &str, settings: Value) -> HostEvent {
    let raw = json!({
        "action": "org.inventivetalent.webquery.action",
        "event": event,
        "context": context,
        "device": "DEVICE",
        "payload": {
            "settings": settings,
            "coordinates": {"column": 0, "row": 0},
            "isInMultiAction": false
        }
    });
    serde_json::from_value(raw).expect("valid host event")
}

pub fn inspector_message(context: &str, key: &str, value: Value) -> HostEvent {
    let raw = json!({
        "action": "org.inventivetalent.webquery.action",
        "event": "sendToPlugin",
        "context": context,
        "payload": {"sdpi_collection": {"key": key, "value": value}}
    });
    serde_json::from_value(raw).expect("valid inspector message")
}

pub fn drain(commands: &mut tokio::sync::mpsc::UnboundedReceiver<HostCommand>) -> Vec<HostCommand> {
    let mut drained = Vec::new();
    while let Ok(command) = commands.try_recv() {
        drained.push(command);
    }
    drained
}

pub fn event_names(commands: &[HostCommand]) -> Vec<&'static str> {
    commands
        .iter()
        .map(|command| match command {
            HostCommand::SetTitle { .. } => "setTitle",
            HostCommand::SetImage { .. } => "setImage",
            HostCommand::SetSettings { .. } => "setSettings",
            HostCommand::ShowAlert { .. } => "showAlert",
        })
        .collect()
}
