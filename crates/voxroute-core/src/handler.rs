//! Request/response types shared by version handlers

use serde::Serialize;
use std::collections::BTreeMap;

/// Query parameters forwarded to a version handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerRequest {
    pub params: BTreeMap<String, String>,
}

impl HandlerRequest {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Non-empty parameter value
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Boolean flag: `true`, `1` and `yes` (case-insensitive) are set
    pub fn flag(&self, name: &str) -> bool {
        self.param(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    /// Remove a parameter, returning its value
    pub fn take_param(&mut self, name: &str) -> Option<String> {
        self.params.remove(name)
    }
}

/// A handler's answer: status, pre-serialized JSON body and extra headers
///
/// The body is kept as the exact bytes to send so cached payloads go out
/// unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl HandlerResponse {
    /// Serialize `value` as the body
    pub fn json<T: Serialize>(status: u16, value: &T) -> crate::Result<Self> {
        Ok(Self::raw_json(status, serde_json::to_string(value)?))
    }

    /// Use an already serialized JSON body as-is
    pub fn raw_json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
