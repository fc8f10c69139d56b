use serde::{Deserialize, Serialize};

/// API key for the completion service
///
/// A chain captures its credential at compile time and every replay uses it.
/// The value is persisted with the chain document but is never rendered by
/// `Debug` and never returned by read endpoints.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self(api_key.into().trim().to_string())
    }

    pub fn api_key(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `None` for a blank key so callers can fall back explicitly
    pub fn non_empty(value: Option<String>) -> Option<Self> {
        value.map(Self::new).filter(|c| !c.is_empty())
    }

    /// Short, log-safe rendering (`sk-…cdef`)
    pub fn masked(&self) -> String {
        let len = self.0.chars().count();

        if len <= 8 {
            return "****".to_string();
        }

        let head: String = self.0.chars().take(3).collect();
        let tail: String = self.0.chars().skip(len - 4).collect();
        format!("{}…{}", head, tail)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}
