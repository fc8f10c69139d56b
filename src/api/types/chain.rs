//! Chain request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::chain::{process_url, ChainDefinition, ChainOwner, ChainStep, StepResult};
use crate::domain::Credential;
use crate::infrastructure::services::{ChainLocation, CreatedChain, NewChain, PersistenceStatus};

/// POST /api/chains
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChainRequest {
    #[serde(default)]
    pub steps: Vec<ChainStep>,
    #[serde(default, alias = "apiKey")]
    pub credential: String,
    #[serde(default)]
    pub owner: Option<ChainOwner>,
}

impl CreateChainRequest {
    /// Split into the compile request, or `None` when no owner was supplied
    pub fn into_new_chain(self) -> Option<NewChain> {
        let owner = self.owner?;

        Some(NewChain {
            steps: self.steps,
            owner,
            credential: Credential::new(self.credential),
        })
    }
}

const STORED_MESSAGE: &str = "Chain endpoint created successfully";
const MEMORY_ONLY_MESSAGE: &str =
    "Chain endpoint created but only stored in memory (will be lost on server restart)";
const MEMORY_ONLY_WARNING: &str =
    "This chain is only stored in memory and will be lost when the server restarts";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChainResponse {
    pub success: bool,
    pub id: String,
    pub endpoint_url: String,
    pub process_url: String,
    pub port_number: u16,
    pub user_name: String,
    pub stored_durably: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CreateChainResponse {
    pub fn new(created: &CreatedChain, base_url: &str) -> Self {
        let chain = &created.chain;
        let endpoint = chain.endpoint();
        let (message, warning) = match &created.persistence {
            PersistenceStatus::Durable => (STORED_MESSAGE, None),
            PersistenceStatus::MemoryOnly { .. } => {
                (MEMORY_ONLY_MESSAGE, Some(MEMORY_ONLY_WARNING.to_string()))
            }
        };

        Self {
            success: true,
            id: chain.id().to_string(),
            endpoint_url: endpoint.endpoint_url.clone(),
            process_url: process_url(base_url, chain.id()),
            port_number: endpoint.port_number,
            user_name: endpoint.user_name.clone(),
            stored_durably: created.persistence.is_durable(),
            message: message.to_string(),
            warning,
        }
    }
}

/// Body of every run surface
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub final_result: String,
    pub steps: Vec<StepResult>,
    pub step_results: Vec<String>,
}

/// Public view of a chain; never carries the credential
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainView {
    pub id: String,
    pub steps: Vec<ChainStep>,
    pub owner_id: String,
    pub user_name: String,
    pub port_number: u16,
    pub endpoint_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChainDefinition> for ChainView {
    fn from(chain: &ChainDefinition) -> Self {
        let endpoint = chain.endpoint();

        Self {
            id: chain.id().to_string(),
            steps: chain.steps().to_vec(),
            owner_id: chain.owner_id().to_string(),
            user_name: endpoint.user_name.clone(),
            port_number: endpoint.port_number,
            endpoint_url: endpoint.endpoint_url.clone(),
            created_at: chain.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageHint {
    pub endpoint: String,
}

/// GET on a callable chain URL
#[derive(Debug, Clone, Serialize)]
pub struct DescribeChainResponse {
    pub success: bool,
    pub chain: ChainView,
    pub message: String,
    pub usage: UsageHint,
}

impl DescribeChainResponse {
    pub fn new(chain: &ChainDefinition) -> Self {
        Self {
            success: true,
            chain: ChainView::from(chain),
            message: "Chain data retrieved successfully".to_string(),
            usage: UsageHint {
                endpoint: r#"POST to this URL with {"input": "your text"} to process through the chain"#
                    .to_string(),
            },
        }
    }
}

/// GET /api/chain-direct/{slug}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugLookupResponse {
    pub success: bool,
    pub chain_id: String,
    pub full_endpoint: String,
    pub simple_endpoint: String,
    pub user_prompt: String,
}

impl SlugLookupResponse {
    pub fn new(chain: &ChainDefinition, base_url: &str) -> Self {
        let simple_endpoint = process_url(base_url, chain.id());
        let user_prompt = format!(
            r#"Use the simplified endpoint for quick processing: POST to {} with {{"input": "your text"}}"#,
            simple_endpoint
        );

        Self {
            success: true,
            chain_id: chain.id().to_string(),
            full_endpoint: chain.endpoint().endpoint_url.clone(),
            simple_endpoint,
            user_prompt,
        }
    }
}

/// POST /api/chain-process
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub input_statement: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub required_output: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub result: String,
}

/// GET /api/users/{owner_id}/chains
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerChainsResponse {
    pub success: bool,
    pub owner_id: String,
    pub count: usize,
    pub chains: Vec<ChainView>,
}

/// GET /api/debug-chain/{id}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDebugResponse {
    pub success: bool,
    #[serde(flatten)]
    pub location: ChainLocation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{ChainEndpoint, ChainId};

    fn chain() -> ChainDefinition {
        let owner = ChainOwner::new("owner-1", "jane@example.com");
        let id = ChainId::new("1700000000000-abcdefgh").unwrap();
        let endpoint = ChainEndpoint::build("http://localhost:3001", &owner, &id);

        ChainDefinition::new(
            id,
            vec![ChainStep::new(1, "summarize", "one sentence")],
            Credential::new("sk-secret-credential"),
            &owner,
            endpoint,
        )
    }

    #[test]
    fn test_create_request_accepts_api_key_alias() {
        let request: CreateChainRequest = serde_json::from_str(
            r#"{"steps":[{"id":1,"instructions":"x","requiredOutput":"y"}],
                "apiKey":"sk-1","owner":{"id":"u1","email":"a@b.c","displayName":"Al"}}"#,
        )
        .unwrap();

        let new_chain = request.into_new_chain().unwrap();
        assert_eq!(new_chain.credential.api_key(), "sk-1");
        assert_eq!(new_chain.owner.display_name.as_deref(), Some("Al"));
        assert_eq!(new_chain.steps.len(), 1);
    }

    #[test]
    fn test_create_request_without_owner() {
        let request: CreateChainRequest =
            serde_json::from_str(r#"{"steps":[],"credential":"sk-1"}"#).unwrap();
        assert!(request.into_new_chain().is_none());
    }

    #[test]
    fn test_create_response_memory_only_warning() {
        let created = CreatedChain {
            chain: chain(),
            persistence: PersistenceStatus::MemoryOnly {
                reason: "connection refused".to_string(),
            },
        };

        let json = serde_json::to_value(CreateChainResponse::new(&created, "http://localhost:3001"))
            .unwrap();
        assert_eq!(json["storedDurably"], false);
        assert_eq!(json["warning"], MEMORY_ONLY_WARNING);
        assert_eq!(
            json["processUrl"],
            "http://localhost:3001/api/process/1700000000000-abcdefgh"
        );
    }

    #[test]
    fn test_create_response_durable_has_no_warning() {
        let created = CreatedChain {
            chain: chain(),
            persistence: PersistenceStatus::Durable,
        };

        let json = serde_json::to_value(CreateChainResponse::new(&created, "http://x")).unwrap();
        assert_eq!(json["message"], STORED_MESSAGE);
        assert!(json.get("warning").is_none());
    }

    #[test]
    fn test_describe_never_contains_credential() {
        let body = serde_json::to_string(&DescribeChainResponse::new(&chain())).unwrap();
        assert!(!body.contains("sk-secret-credential"));
        assert!(!body.contains("credential"));
        assert!(body.contains("summarize"));
    }

    #[test]
    fn test_slug_lookup_prompt() {
        let response = SlugLookupResponse::new(&chain(), "https://chains.example.com");
        assert_eq!(
            response.simple_endpoint,
            "https://chains.example.com/api/process/1700000000000-abcdefgh"
        );
        assert!(response.user_prompt.contains(&response.simple_endpoint));
    }

    #[test]
    fn test_process_request_missing_or_null_input() {
        let request: ProcessRequest = serde_json::from_str("{}").unwrap();
        assert!(request.input.is_none());

        let request: ProcessRequest = serde_json::from_str(r#"{"input":null}"#).unwrap();
        assert!(request.input.is_none());
    }
}
