//! One HTTP exchange with the backend.
//!
//! `Err` from a transport always means no response was received. Any
//! response, whatever its status, comes back as `Ok(Reply)`.

use anyhow::{anyhow, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Status and raw body of a received response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transports to allow mocking the backend
pub trait Transport {
    /// `path` is relative to the API base URL and already percent-encoded
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Reply>;
}

pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
    debug: bool,
}

impl HttpTransport {
    pub fn new(base_url: &str, debug: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
            debug,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Reply> {
        let url = format!("{}{}", self.base_url, path);
        if self.debug {
            eprintln!("[DEBUG] {} {}", method.as_str(), url);
        }

        let req = self
            .agent
            .request(method.as_str(), &url)
            .set("Content-Type", "application/json");
        let resp = match body {
            Some(b) => req.send_json(b.clone()),
            None => req.call(),
        };

        let reply = match resp {
            Ok(r) => Reply {
                status: r.status(),
                body: r.into_string()?,
            },
            Err(ureq::Error::Status(code, r)) => Reply {
                status: code,
                body: r.into_string().unwrap_or_default(),
            },
            Err(e) => return Err(anyhow!("Request failed: {}", e)),
        };

        if self.debug {
            eprintln!("[DEBUG] -> {} ({} bytes)", reply.status, reply.body.len());
        }
        Ok(reply)
    }
}
