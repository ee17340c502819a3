//! API gateway: one function per backend action.
//!
//! Each call sends exactly one request and normalizes the outcome into
//! `Ok(value)` or one of the `Error` kinds. Nothing is retried.

use crate::error::{Error, Result};
use crate::model::{Credentials, HealthStatus, NewUser, User, UserUpdate};
use crate::session::Sessions;
use crate::transport::{Method, Reply, Transport};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

const FALLBACK_LOGIN: &str = "Login failed";
const FALLBACK_REGISTER: &str = "Registration failed";
const FALLBACK_LIST: &str = "Failed to load users";
const FALLBACK_UPDATE: &str = "Failed to update user";
const FALLBACK_DELETE: &str = "Failed to delete user";
const FALLBACK_SEARCH: &str = "Search failed";
const FALLBACK_STATS: &str = "Failed to load stats";

pub struct Api<T: Transport> {
    transport: T,
    sessions: Sessions,
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T, sessions: Sessions) -> Self {
        Self {
            transport,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Reply> {
        self.transport
            .send(method, path, body)
            .map_err(|e| Error::Connection {
                detail: e.to_string(),
            })
    }

    /// Send and normalize: non-2xx or `success: false` becomes an
    /// application error carrying the server message when there is one.
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        fallback: &str,
    ) -> Result<Value> {
        let reply = self.send(method, path, body)?;
        let data: Option<Value> = serde_json::from_str(&reply.body).ok();

        let reported_failure = data
            .as_ref()
            .and_then(|d| d.get("success"))
            .is_some_and(|s| s == &Value::Bool(false));

        if !reply.is_ok() || reported_failure {
            let message = data
                .as_ref()
                .and_then(|d| d.get("error"))
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(fallback);
            return Err(Error::Application(message.to_string()));
        }

        data.ok_or_else(|| Error::Application(fallback.to_string()))
    }

    /// GET /health. Any failure, with or without a response, is reported
    /// as `Unavailable`.
    pub fn health(&self) -> Result<HealthStatus> {
        let reply = self
            .transport
            .send(Method::Get, "/health", None)
            .map_err(|_| Error::Unavailable)?;
        if !reply.is_ok() {
            return Err(Error::Unavailable);
        }
        serde_json::from_str(&reply.body).map_err(|_| Error::Unavailable)
    }

    /// POST /login. On success the returned user object is stored as the
    /// session, verbatim.
    pub fn login(&self, credentials: &Credentials) -> Result<User> {
        let body =
            serde_json::to_value(credentials).map_err(|e| Error::Application(e.to_string()))?;
        let data = self.call(Method::Post, "/login", Some(&body), FALLBACK_LOGIN)?;

        let raw_user = data
            .get("user")
            .filter(|u| u.is_object())
            .ok_or_else(|| Error::Application(FALLBACK_LOGIN.to_string()))?;
        let user: User = serde_json::from_value(raw_user.clone())
            .map_err(|_| Error::Application(FALLBACK_LOGIN.to_string()))?;

        self.sessions
            .remember(&raw_user.to_string())
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(user)
    }

    /// POST /register
    pub fn register(&self, new_user: &NewUser) -> Result<()> {
        let body = serde_json::to_value(new_user).map_err(|e| Error::Application(e.to_string()))?;
        self.call(Method::Post, "/register", Some(&body), FALLBACK_REGISTER)?;
        Ok(())
    }

    /// GET /users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let data = self.call(Method::Get, "/users", None, FALLBACK_LIST)?;
        users_from(&data, FALLBACK_LIST)
    }

    /// GET /users/search?q=...
    pub fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let path = format!("/users/search?q={}", urlencoding::encode(query));
        let data = self.call(Method::Get, &path, None, FALLBACK_SEARCH)?;
        users_from(&data, FALLBACK_SEARCH)
    }

    /// PUT /users/{id}
    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<()> {
        let body = serde_json::to_value(update).map_err(|e| Error::Application(e.to_string()))?;
        let path = format!("/users/{}", id);
        self.call(Method::Put, &path, Some(&body), FALLBACK_UPDATE)?;
        Ok(())
    }

    /// DELETE /users/{id}
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let path = format!("/users/{}", id);
        self.call(Method::Delete, &path, None, FALLBACK_DELETE)?;
        Ok(())
    }

    /// GET /stats; the shape is up to the server
    pub fn stats(&self) -> Result<Value> {
        self.call(Method::Get, "/stats", None, FALLBACK_STATS)
    }
}

fn users_from(data: &Value, fallback: &str) -> Result<Vec<User>> {
    match data.get("users") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(users) => serde_json::from_value(users.clone())
            .map_err(|_| Error::Application(fallback.to_string())),
    }
}
