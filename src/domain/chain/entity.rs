//! Chain definition entity and related types

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Credential, DomainError};

const ID_SUFFIX_LEN: usize = 8;
const ID_SUFFIX_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_ID_LEN: usize = 128;

/// Range of the bookkeeping port number embedded in endpoint URLs
pub const PORT_RANGE: std::ops::RangeInclusive<u16> = 3001..=9000;

/// Chain identifier, `<epoch-millis>-<random suffix>` when generated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    /// Parse an identifier received from a caller
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(DomainError::validation(format!(
                "Chain ID must be between 1 and {} characters",
                MAX_ID_LEN
            )));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation(format!(
                "Chain ID '{}' contains invalid characters",
                id
            )));
        }

        Ok(Self(id))
    }

    /// Generate a fresh identifier
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_SUFFIX_CHARSET[rng.gen_range(0..ID_SUFFIX_CHARSET.len())] as char)
            .collect();

        Self(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChainId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single transformation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    /// Unique within the chain
    pub id: u32,
    /// Directive describing the transformation
    pub instructions: String,
    /// Advisory description of the desired output shape
    #[serde(default)]
    pub required_output: String,
    /// Seed input for design-time previews only
    #[serde(default)]
    pub input_statement: String,
}

impl ChainStep {
    pub fn new(id: u32, instructions: impl Into<String>, required_output: impl Into<String>) -> Self {
        Self {
            id,
            instructions: instructions.into(),
            required_output: required_output.into(),
            input_statement: String::new(),
        }
    }
}

/// The user compiling a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOwner {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ChainOwner {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// URL-safe user segment: display name, else email local part, else `user`
    pub fn url_name(&self) -> String {
        let raw = self
            .display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.split('@').next().filter(|s| !s.is_empty()))
            .unwrap_or("user");

        let sanitized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if sanitized.is_empty() {
            "user".to_string()
        } else {
            sanitized
        }
    }

    /// Namespace key used by durable stores
    pub fn namespace(&self) -> &str {
        if self.id.trim().is_empty() {
            "anonymous"
        } else {
            &self.id
        }
    }
}

/// Callable location of a compiled chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEndpoint {
    pub user_name: String,
    pub port_number: u16,
    pub endpoint_url: String,
}

impl ChainEndpoint {
    /// Build the endpoint for a chain under `base_url` (scheme + host)
    pub fn build(base_url: &str, owner: &ChainOwner, id: &ChainId) -> Self {
        let user_name = owner.url_name();
        let port_number = rand::thread_rng().gen_range(PORT_RANGE);
        let endpoint_url = format!(
            "{}/api/chains/{}/{}/{}",
            base_url.trim_end_matches('/'),
            user_name,
            port_number,
            id
        );

        Self {
            user_name,
            port_number,
            endpoint_url,
        }
    }
}

/// Simple processing URL for a chain under `base_url`
pub fn process_url(base_url: &str, id: &ChainId) -> String {
    format!("{}/api/process/{}", base_url.trim_end_matches('/'), id)
}

/// A compiled chain, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDefinition {
    id: ChainId,
    steps: Vec<ChainStep>,
    #[serde(default)]
    credential: Credential,
    owner_id: String,
    owner_email: String,
    #[serde(flatten)]
    endpoint: ChainEndpoint,
    created_at: DateTime<Utc>,
}

impl ChainDefinition {
    pub fn new(
        id: ChainId,
        steps: Vec<ChainStep>,
        credential: Credential,
        owner: &ChainOwner,
        endpoint: ChainEndpoint,
    ) -> Self {
        Self {
            id,
            steps,
            credential,
            owner_id: owner.namespace().to_string(),
            owner_email: owner.email.clone(),
            endpoint,
            created_at: Utc::now(),
        }
    }

    /// Check a step list before it is compiled into a chain
    pub fn validate_steps(steps: &[ChainStep]) -> Result<(), DomainError> {
        if steps.is_empty() {
            return Err(DomainError::validation(
                "Invalid chain data. Chain must have at least one step.",
            ));
        }

        let mut seen = HashSet::with_capacity(steps.len());

        for step in steps {
            if !seen.insert(step.id) {
                return Err(DomainError::validation(format!(
                    "Duplicate step id {} in chain",
                    step.id
                )));
            }
        }

        Ok(())
    }

    // Getters

    pub fn id(&self) -> &ChainId {
        &self.id
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.is_empty()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn owner_email(&self) -> &str {
        &self.owner_email
    }

    pub fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
