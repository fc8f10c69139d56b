//! Chain executor - runs a chain's steps in order, feeding each result forward

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, warn};

use super::{ChainDefinition, ChainStep};
use crate::domain::llm::{LlmProvider, LlmRequest, ProviderResolver};
use crate::domain::{Credential, DomainError, UpstreamErrorKind};

/// Text fed forward when the service answers without a completion
pub const EMPTY_COMPLETION_PLACEHOLDER: &str = "Error: No response generated";

const PREVIEW_EMPTY_RESULT: &str = "No result.";

/// How the per-step system message is phrased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Instructions and required output only
    Standard,
    /// Adds show-your-work and double-check directives
    #[default]
    Verifying,
}

/// What to do when the service returns no completion text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCompletionPolicy {
    /// Use [`EMPTY_COMPLETION_PLACEHOLDER`] as the step result and continue
    #[default]
    Placeholder,
    /// Fail the step as a malformed response
    Fail,
}

/// Settings for design-time single step previews
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub default_model: String,
    pub allowed_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-3.5-turbo".to_string(),
            allowed_models: default_allowed_models(),
            temperature: 0.5,
            max_tokens: 600,
        }
    }
}

/// Chat-completion models accepted for previews
pub fn default_allowed_models() -> Vec<String> {
    [
        "gpt-4o",
        "gpt-4o-mini",
        "gpt-4-turbo",
        "gpt-4-turbo-preview",
        "gpt-4",
        "gpt-4-32k",
        "gpt-4-0125-preview",
        "gpt-4-1106-preview",
        "gpt-4-0613",
        "gpt-4-0314",
        "gpt-3.5-turbo",
        "gpt-3.5-turbo-16k",
        "gpt-3.5-turbo-0125",
        "gpt-3.5-turbo-1106",
        "gpt-3.5-turbo-0613",
        "gpt-3.5-turbo-0301",
        "gpt-3.5-turbo-instruct",
        "gpt-3.5-turbo-instruct-0914",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

/// Configuration for the chain executor
#[derive(Debug, Clone)]
pub struct ChainExecutorConfig {
    /// Model used for every compiled-chain step
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for a single completion call (`None` = unbounded)
    pub step_timeout: Option<Duration>,
    pub prompt_style: PromptStyle,
    pub empty_completion: EmptyCompletionPolicy,
    /// Used by previews when the caller supplies no key; never by compiled chains
    pub fallback_credential: Option<Credential>,
    pub preview: PreviewConfig,
}

impl Default for ChainExecutorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
            step_timeout: Some(Duration::from_secs(60)),
            prompt_style: PromptStyle::default(),
            empty_completion: EmptyCompletionPolicy::default(),
            fallback_credential: None,
            preview: PreviewConfig::default(),
        }
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: u32,
    pub step_instructions: String,
    pub input: String,
    pub result: String,
    #[serde(skip)]
    pub latency_ms: u64,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// `step_index` is the zero-based position of the failing step
    Failed { step_index: usize, step_id: u32 },
}

/// Result of running a chain
#[derive(Debug)]
pub struct ChainResult {
    pub status: RunStatus,
    /// One entry per successful step, in chain order
    pub step_results: Vec<StepResult>,
    /// Last step's result when the run completed
    pub final_result: Option<String>,
    /// Cause of the failure, if any
    pub error: Option<DomainError>,
    /// Time spent on the failing step
    pub failed_step_latency_ms: Option<u64>,
    pub total_latency_ms: u64,
}

impl ChainResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Flat list of step outputs
    pub fn outputs(&self) -> Vec<String> {
        self.step_results.iter().map(|s| s.result.clone()).collect()
    }
}

/// Input for a design-time preview of a single step
#[derive(Debug, Clone, Default)]
pub struct StepPreview {
    pub input_statement: String,
    pub instructions: String,
    pub required_output: String,
    pub credential: Option<Credential>,
    pub model: Option<String>,
}

/// Chain executor - sequential, first failure stops the run
pub struct ChainExecutor<R: ProviderResolver> {
    resolver: R,
    config: ChainExecutorConfig,
}

impl<R: ProviderResolver> std::fmt::Debug for ChainExecutor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainExecutor")
            .field("model", &self.config.model)
            .field("prompt_style", &self.config.prompt_style)
            .finish()
    }
}

impl<R: ProviderResolver> ChainExecutor<R> {
    pub fn new(resolver: R, config: ChainExecutorConfig) -> Self {
        Self { resolver, config }
    }

    /// Run every step of `chain`, threading each result into the next step
    ///
    /// Precondition failures return `Err` without calling the service. Step
    /// failures return `Ok` with `RunStatus::Failed` and the partial trail.
    #[instrument(skip_all, fields(chain_id = %chain.id(), steps = chain.step_count()))]
    pub async fn run(
        &self,
        chain: &ChainDefinition,
        initial_input: &str,
    ) -> Result<ChainResult, DomainError> {
        if !chain.has_credential() {
            return Err(DomainError::validation(
                "API key not found for this chain. The chain may be corrupted.",
            ));
        }

        if initial_input.is_empty() {
            return Err(DomainError::validation("Input is required"));
        }

        if chain.is_empty() {
            return Err(DomainError::validation(format!(
                "Chain '{}' has no steps",
                chain.id()
            )));
        }

        let provider = self.resolver.resolve(chain.credential()).await?;
        let start = Instant::now();
        let mut step_results = Vec::with_capacity(chain.step_count());
        let mut current_input = initial_input.to_string();

        for (step_index, step) in chain.steps().iter().enumerate() {
            debug!(step_index, step_id = step.id, "Executing chain step");
            let step_start = Instant::now();

            match self.execute_step(provider.as_ref(), step, &current_input).await {
                Ok(result) => {
                    step_results.push(StepResult {
                        step_id: step.id,
                        step_instructions: step.instructions.clone(),
                        input: std::mem::take(&mut current_input),
                        result: result.clone(),
                        latency_ms: step_start.elapsed().as_millis() as u64,
                    });
                    current_input = result;
                }
                Err(error) => {
                    warn!(
                        step_index,
                        step_id = step.id,
                        completed = step_results.len(),
                        error = %error,
                        "Chain step failed, stopping run"
                    );

                    return Ok(ChainResult {
                        status: RunStatus::Failed {
                            step_index,
                            step_id: step.id,
                        },
                        step_results,
                        final_result: None,
                        error: Some(error),
                        failed_step_latency_ms: Some(step_start.elapsed().as_millis() as u64),
                        total_latency_ms: start.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        let total_latency_ms = start.elapsed().as_millis() as u64;
        info!(total_latency_ms, "Chain run completed");

        Ok(ChainResult {
            status: RunStatus::Completed,
            step_results,
            final_result: Some(current_input),
            error: None,
            failed_step_latency_ms: None,
            total_latency_ms,
        })
    }

    /// Run a single step at design time against its input statement
    ///
    /// Nothing is threaded; the caller's key wins over the fallback credential.
    #[instrument(skip_all, fields(model))]
    pub async fn preview_step(&self, preview: StepPreview) -> Result<String, DomainError> {
        let preview_config = &self.config.preview;
        let model = preview
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| preview_config.default_model.clone());
        tracing::Span::current().record("model", model.as_str());

        if !preview_config.allowed_models.iter().any(|m| m == &model) {
            return Err(DomainError::validation(format!(
                "Model '{}' is not compatible with the chat completions API. Please use a compatible model like gpt-3.5-turbo, gpt-4o, or gpt-4.",
                model
            )));
        }

        let credential = preview
            .credential
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| self.config.fallback_credential.clone())
            .ok_or_else(|| DomainError::configuration("OpenAI API key not set."))?;

        let prompt = format!(
            "You are an expert assistant.\n\nInput Statement:\n{}\n\nInstructions:\n{}\n\nRequired Output:\n{}\n\nPlease provide the output as requested.",
            preview.input_statement, preview.instructions, preview.required_output
        );

        let request = LlmRequest::builder()
            .system("You are a helpful assistant.")
            .user(prompt)
            .temperature(preview_config.temperature)
            .max_tokens(preview_config.max_tokens)
            .build();

        let provider = self.resolver.resolve(&credential).await?;
        let response = self.call_with_deadline(provider.as_ref(), &model, request).await?;

        Ok(response
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| PREVIEW_EMPTY_RESULT.to_string()))
    }

    /// Run one step against the input threaded from the previous step
    async fn execute_step(
        &self,
        provider: &dyn LlmProvider,
        step: &ChainStep,
        input: &str,
    ) -> Result<String, DomainError> {
        let request = self.build_step_request(step, input);
        let response = self
            .call_with_deadline(provider, &self.config.model, request)
            .await?;

        match response.content.filter(|c| !c.is_empty()) {
            Some(text) => Ok(text),
            None => match self.config.empty_completion {
                EmptyCompletionPolicy::Placeholder => {
                    warn!(
                        step_id = step.id,
                        "Completion service returned no text, forwarding placeholder"
                    );
                    Ok(EMPTY_COMPLETION_PLACEHOLDER.to_string())
                }
                EmptyCompletionPolicy::Fail => Err(DomainError::upstream(
                    UpstreamErrorKind::MalformedResponse,
                    "No completion returned",
                )),
            },
        }
    }

    async fn call_with_deadline(
        &self,
        provider: &dyn LlmProvider,
        model: &str,
        request: LlmRequest,
    ) -> Result<crate::domain::LlmResponse, DomainError> {
        let call = provider.chat(model, request);

        match self.config.step_timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| {
                DomainError::upstream(
                    UpstreamErrorKind::Timeout,
                    format!("Request timed out after {}ms", limit.as_millis()),
                )
            })?,
            None => call.await,
        }
    }

    fn build_step_request(&self, step: &ChainStep, input: &str) -> LlmRequest {
        LlmRequest::builder()
            .system(build_system_message(step, self.config.prompt_style))
            .user(input)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
    }
}

/// System message embedding the step's instructions and required output
pub fn build_system_message(step: &ChainStep, style: PromptStyle) -> String {
    let mut message = format!(
        "Instructions: {}\n\nRequired output format: {}\n\nProcess the user input according to these instructions and return a result in the required format.",
        step.instructions.trim(),
        step.required_output.trim()
    );

    if style == PromptStyle::Verifying {
        message.push_str(
            "\n\nIf this involves math, show complete step-by-step work and calculate every operation fully \
             (e.g. \"25 + 20 = 45\", not just \"25 + 20\").\
             \n\nVERIFICATION STEP: Before providing your final answer:\
             \n1. Review your calculations and logic\
             \n2. Check for arithmetic errors\
             \n3. Make sure all operations have been fully computed\
             \n4. Ensure the final result is clearly stated",
        );
    }

    message
}
