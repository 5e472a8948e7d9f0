//! Registrar credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username, password and registrar address.
///
/// The password can be set but never read back outside this crate, and it
/// is left out of both `Debug` output and serialization.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    password: String,
    /// Registrar host, also used as the digest URI
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Credentials {
            username: username.into(),
            password: String::new(),
            host: host.into(),
            port,
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.set_password(password);
        self
    }

    /// Host, username and password are all non-empty
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new("alice", "sip.example.com", Some(5060)).with_password("hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_completeness() {
        let mut creds = Credentials::new("alice", "sip.example.com", None);
        assert!(!creds.is_complete());
        creds.set_password("secret");
        assert!(creds.is_complete());
        assert!(!Credentials::new("", "sip.example.com", None).with_password("x").is_complete());
        assert!(!Credentials::new("alice", "", None).with_password("x").is_complete());
    }

    #[test]
    fn test_password_is_never_serialized() {
        let creds = Credentials::new("alice", "sip.example.com", Some(5060)).with_password("hunter2");
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("hunter2"));

        let loaded: Credentials =
            serde_json::from_str(r#"{"username":"bob","password":"pw","host":"pbx.local"}"#).unwrap();
        assert!(loaded.is_complete());
        assert_eq!(loaded.port, None);
    }
}
