use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

const SERVER_NAME: &str = "ServerName";
const USER_ID: &str = "UserID";
const PASSWORD: &str = "Password";
const CHARSET: &str = "CHARSET";

/// Parameters handed to the native client when connecting.
///
/// The three well-known keys are typed; anything else the client understands goes in
/// `extra` and is passed through untouched.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    #[serde(rename = "ServerName", default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(rename = "UserID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "Password", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server_name", &self.server_name)
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("extra", &self.extra)
            .finish()
    }
}

impl ConnectionParams {
    #[must_use]
    pub fn builder() -> ConnectionParamsBuilder {
        ConnectionParamsBuilder::default()
    }

    /// Read `DB_SERVER`, `DB_USER` and `DB_PASSWORD`, defaulting each when unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        Self {
            server_name: Some(var("DB_SERVER", "database")),
            user_id: Some(var("DB_USER", "username")),
            password: Some(var("DB_PASSWORD", "password")),
            extra: BTreeMap::new(),
        }
    }

    /// Load parameters from a JSON object such as
    /// `{"ServerName": "demo", "UserID": "dba", "DatabaseFile": "/tmp/demo.db"}`.
    ///
    /// # Errors
    /// Returns `SessionError::ConfigError` if the text is not a JSON object of strings.
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::ConfigError(format!("invalid connection parameters: {e}")))
    }

    /// Parse a `key=value;` connection string.
    ///
    /// Well-known keys match case-insensitively; `CHARSET` is dropped since it is
    /// always appended on render.
    ///
    /// # Errors
    /// Returns `SessionError::ConfigError` for a segment without `=` or with an empty key.
    pub fn parse(conn_str: &str) -> Result<Self, SessionError> {
        let mut params = Self::default();
        for segment in conn_str.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                SessionError::ConfigError(format!("connection string segment '{segment}' has no '='"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(SessionError::ConfigError(format!(
                    "connection string segment '{segment}' has an empty key"
                )));
            }
            let value = value.trim().to_owned();
            if key.eq_ignore_ascii_case(SERVER_NAME) {
                params.server_name = Some(value);
            } else if key.eq_ignore_ascii_case(USER_ID) {
                params.user_id = Some(value);
            } else if key.eq_ignore_ascii_case(PASSWORD) {
                params.password = Some(value);
            } else if !key.eq_ignore_ascii_case(CHARSET) {
                params.extra.insert(key.to_owned(), value);
            }
        }
        Ok(params)
    }

    /// Render the connection string handed to the native client.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        let mut out = String::new();
        let typed = [
            (SERVER_NAME, &self.server_name),
            (USER_ID, &self.user_id),
            (PASSWORD, &self.password),
        ];
        for (key, value) in typed {
            if let Some(value) = value {
                out.push_str(&format!("{key}={value};"));
            }
        }
        for (key, value) in &self.extra {
            out.push_str(&format!("{key}={value};"));
        }
        out.push_str(CHARSET);
        out.push_str("=UTF-8");
        out
    }

    /// Look up an extra option by key, ignoring ASCII case.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Fluent builder for [`ConnectionParams`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionParamsBuilder {
    params: ConnectionParams,
}

impl ConnectionParamsBuilder {
    #[must_use]
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.params.server_name = Some(server_name.into());
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.params.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.params.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionParams {
        self.params
    }
}
