use serde_json::{Map, Value};

use super::CredentialError;

/// Connection fields parsed out of a database credentials secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPayload {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dbname: Option<String>,
}

impl SecretPayload {
    /// Parse the JSON secret string.
    ///
    /// `port` is accepted as a JSON number or a numeric string; `dbname` is optional.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        if raw.trim().is_empty() {
            return Err(CredentialError::Blank);
        }

        let value: Value = serde_json::from_str(raw)?;
        let fields = value.as_object().ok_or(CredentialError::NotAnObject)?;

        Ok(Self {
            username: required_str(fields, "username")?,
            password: required_str(fields, "password")?,
            host: required_str(fields, "host")?,
            port: port(fields)?,
            dbname: optional_str(fields, "dbname"),
        })
    }

    pub fn host_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPayload")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish()
    }
}

fn optional_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_str(fields: &Map<String, Value>, name: &'static str) -> Result<String, CredentialError> {
    optional_str(fields, name).ok_or(CredentialError::MissingField(name))
}

fn port(fields: &Map<String, Value>) -> Result<u16, CredentialError> {
    let raw = match fields.get("port") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(CredentialError::MissingField("port")),
    };
    raw.parse::<u16>()
        .map_err(|_| CredentialError::InvalidPort(raw))
}
