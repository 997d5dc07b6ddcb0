//! Domain log events.
//!
//! # Responsibilities
//! - Describe what the server did with a request (`REQUEST`, `RESPONSE`, `ERROR`)
//! - Describe lifecycle changes (`SERVER`)
//! - Fan events out to subscribers (control channel log socket) and to `tracing`
//!
//! # Design Decisions
//! - Serialized as one JSON object per event, camelCase, absent fields omitted
//! - Broadcast channel: slow subscribers lag and lose events, never block requests

use chrono::Local;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::routing::QueryMap;

const EVENT_BUFFER: usize = 256;

/// Date format used in every event, `YYYY/MM/DD HH:mm:ss` local time.
pub const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Server,
    Request,
    Response,
    Error,
}

/// One log event as written to the log socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_warning: Option<bool>,
}

impl LogEvent {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            method: None,
            path: None,
            query: None,
            body: None,
            status_code: None,
            matched: None,
            date: Local::now().format(DATE_FORMAT).to_string(),
            message: None,
            is_warning: None,
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(EventKind::Server)
        }
    }

    pub fn server_warning(message: impl Into<String>) -> Self {
        Self {
            is_warning: Some(true),
            ..Self::server(message)
        }
    }

    /// A request served from a mock. An empty body is left out.
    pub fn request(method: &str, path: &str, query: &QueryMap, body: &[u8], status: u16) -> Self {
        Self {
            method: Some(method.to_string()),
            path: Some(path.to_string()),
            query: Some(query.clone()),
            body: (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned()),
            status_code: Some(status),
            matched: Some(true),
            ..Self::new(EventKind::Request)
        }
    }

    /// A response not produced by a mock (404 or forwarded).
    pub fn response(method: &str, path: &str, status: u16) -> Self {
        Self {
            method: Some(method.to_string()),
            path: Some(path.to_string()),
            status_code: Some(status),
            matched: Some(false),
            ..Self::new(EventKind::Response)
        }
    }

    pub fn error(method: &str, path: &str, message: impl Into<String>) -> Self {
        Self {
            method: Some(method.to_string()),
            path: Some(path.to_string()),
            matched: Some(false),
            message: Some(message.into()),
            ..Self::new(EventKind::Error)
        }
    }

    /// One NDJSON line, without the trailing newline.
    pub fn to_json_line(&self) -> String {
        // only strings, numbers and bools: serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Publishes [`LogEvent`]s to every subscriber and to `tracing`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LogEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: LogEvent) {
        mirror_to_tracing(&event);
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn mirror_to_tracing(event: &LogEvent) {
    let method = event.method.as_deref().unwrap_or_default();
    let path = event.path.as_deref().unwrap_or_default();
    let detail = event.message.as_deref().unwrap_or_default();

    match event.kind {
        EventKind::Server if event.is_warning == Some(true) => {
            tracing::warn!(detail, "Server warning")
        }
        EventKind::Server => tracing::info!(detail, "Server event"),
        EventKind::Request => tracing::info!(
            method,
            path,
            status = event.status_code,
            "Mocked request"
        ),
        EventKind::Response => tracing::info!(
            method,
            path,
            status = event.status_code,
            "Unmocked response"
        ),
        EventKind::Error => tracing::error!(method, path, detail, "Request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn request_event_shape() {
        let query = crate::routing::matcher::parse_query("?k=v");
        let event = LogEvent::request("POST", "/test/a", &query, br#"{"param":"value"}"#, 200);
        let value: Value = serde_json::from_str(&event.to_json_line()).unwrap();

        assert_eq!(value["type"], "REQUEST");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["matched"], true);
        assert_eq!(value["query"], serde_json::json!({"k": "v"}));
        assert_eq!(value["body"], r#"{"param":"value"}"#);
        assert!(value.get("message").is_none());
        assert!(value.get("isWarning").is_none());
    }

    #[test]
    fn request_without_body_or_query() {
        let event = LogEvent::request("GET", "/test/empty", &QueryMap::new(), b"", 200);
        let value: Value = serde_json::from_str(&event.to_json_line()).unwrap();

        assert_eq!(value["query"], serde_json::json!({}));
        assert!(value.get("body").is_none());
    }

    #[test]
    fn error_event_is_unmatched() {
        let event = LogEvent::error("GET", "/remote/x", "upstream request failed");
        let value: Value = serde_json::from_str(&event.to_json_line()).unwrap();

        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["matched"], false);
        assert_eq!(value["message"], "upstream request failed");
    }

    #[test]
    fn server_warning_shape() {
        let event = LogEvent::server_warning("WARNING - Multiple mocked endpoints found");
        let value: Value = serde_json::from_str(&event.to_json_line()).unwrap();

        assert_eq!(value["type"], "SERVER");
        assert_eq!(value["isWarning"], true);
        assert!(value.get("method").is_none());
    }

    #[test]
    fn date_format() {
        let date = LogEvent::server("START").date;
        assert!(chrono::NaiveDateTime::parse_from_str(&date, DATE_FORMAT).is_ok(), "{date}");
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(LogEvent::response("GET", "/x", 404));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::Response);
        assert_eq!(received.matched, Some(false));
    }
}
