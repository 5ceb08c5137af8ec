//! Elasticsearch REST implementation of [`SearchEngine`]

use std::collections::BTreeMap;

use nocake_core::{SHARED_RUNTIME, http_client};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::engine::{AliasAction, BulkOperation, BulkResponse, EngineError, SearchEngine};

/// Search engine reached over its REST API
#[derive(Debug, Clone)]
pub struct HttpEngine {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpEngine {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: None,
            password: None,
        }
    }

    /// Use HTTP basic auth for every request
    pub fn with_basic_auth(mut self, username: String, password: Option<String>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = http_client().request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    fn json_request(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<RequestBuilder, EngineError> {
        Ok(self
            .request(method, path)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(body)?))
    }

    /// Send a request and return status + body text
    fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String), EngineError> {
        SHARED_RUNTIME.handle().block_on(async {
            let response = builder.send().await.map_err(EngineError::from_reqwest)?;
            let status = response.status();
            let body = response.text().await.map_err(EngineError::from_reqwest)?;
            Ok((status, body))
        })
    }

    /// Send a request that must succeed; returns the body
    fn send_ok(&self, builder: RequestBuilder) -> Result<String, EngineError> {
        let (status, body) = self.send(builder)?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(EngineError::status(status.as_u16(), error_reason(&body)))
        }
    }

    /// HEAD request: 200 → true, 404 → false
    fn head(&self, path: &str) -> Result<bool, EngineError> {
        let (status, _) = self.send(self.request(Method::HEAD, path))?;
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(EngineError::status(other.as_u16(), "unexpected status")),
        }
    }

    /// GET an `{index: {aliases: {...}}}` listing; 404 means nothing matched
    fn get_alias_listing(&self, path: &str) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        let (status, body) = self.send(self.request(Method::GET, path))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(BTreeMap::new());
        }
        if !status.is_success() {
            return Err(EngineError::status(status.as_u16(), error_reason(&body)));
        }
        parse_alias_listing(&body)
    }
}

#[derive(Deserialize)]
struct IndexAliases {
    #[serde(default)]
    aliases: BTreeMap<String, Value>,
}

/// `{"idx": {"aliases": {"a": {}}}}` → `{"idx": ["a"]}`
fn parse_alias_listing(body: &str) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
    let listing: BTreeMap<String, IndexAliases> = serde_json::from_str(body)?;
    Ok(listing
        .into_iter()
        .map(|(index, entry)| (index, entry.aliases.into_keys().collect()))
        .collect())
}

/// Best-effort short reason from an error response body
fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/reason")
                .or_else(|| v.pointer("/error/type"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Render bulk operations as NDJSON: one action line, one source line each
fn bulk_body(operations: &[BulkOperation]) -> Result<String, EngineError> {
    let mut body = String::new();
    for op in operations {
        body.push_str(&serde_json::to_string(&json!({"index": {"_id": op.id}}))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&op.source)?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Deserialize)]
struct BulkReply {
    #[serde(default)]
    items: Vec<BTreeMap<String, BulkItem>>,
}

#[derive(Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

fn parse_bulk_reply(body: &str) -> Result<BulkResponse, EngineError> {
    let reply: BulkReply = serde_json::from_str(body)?;
    let mut response = BulkResponse {
        items: reply.items.len(),
        ..Default::default()
    };
    for item in reply.items.iter().flat_map(|entry| entry.values()) {
        if item.error.is_some() || item.status >= 300 {
            response.failed += 1;
            if response.first_error.is_none() {
                let reason = item
                    .error
                    .as_ref()
                    .and_then(|e| e.get("reason").or_else(|| e.get("type")))
                    .and_then(Value::as_str)
                    .unwrap_or("rejected");
                response.first_error = Some(format!("{}: {reason}", item.id));
            }
        }
    }
    Ok(response)
}

impl SearchEngine for HttpEngine {
    fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        self.head(index)
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError> {
        self.send_ok(self.json_request(Method::PUT, index, body)?)
            .map(drop)
    }

    fn delete_index(&self, index: &str) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::DELETE, index)).map(drop)
    }

    fn alias_exists(&self, alias: &str) -> Result<bool, EngineError> {
        self.head(&format!("_alias/{alias}"))
    }

    fn get_alias(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        Ok(self
            .get_alias_listing(&format!("_alias/{alias}"))?
            .into_keys()
            .collect())
    }

    fn put_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::PUT, &format!("{index}/_alias/{alias}")))
            .map(drop)
    }

    fn delete_alias(&self, index: &str, alias: &str) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::DELETE, &format!("{index}/_alias/{alias}")))
            .map(drop)
    }

    /// Single `POST /_aliases` call: the engine applies all actions atomically.
    fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
        let body = json!({ "actions": actions });
        self.send_ok(self.json_request(Method::POST, "_aliases", &body)?)
            .map(drop)
    }

    fn list_indices(&self, prefix: &str) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        self.get_alias_listing(&format!("{prefix}*/_alias"))
    }

    fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, EngineError> {
        let body = bulk_body(operations)?;
        let builder = self
            .request(Method::POST, &format!("{index}/_bulk"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let reply = self.send_ok(builder)?;
        parse_bulk_reply(&reply)
    }
}
