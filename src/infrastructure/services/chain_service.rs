//! Chain service - ties the repository to the executor

use std::time::Duration;

use tracing::{info, instrument};

use super::chain_repository::{ChainLocation, ChainRepository, CreatedChain, NewChain};
use crate::domain::chain::{
    ChainDefinition, ChainExecutor, ChainId, ChainResult, RunStatus, StepPreview,
};
use crate::domain::{DomainError, ProviderResolver};
use crate::infrastructure::observability::{
    record_chain_created, record_chain_run, record_chain_step,
};

/// A chain run together with the chain it executed
#[derive(Debug)]
pub struct ChainRun {
    pub chain_id: ChainId,
    pub result: ChainResult,
}

/// Chain service for compiling, resolving, and running chains
#[derive(Debug)]
pub struct ChainService<R: ProviderResolver> {
    repository: ChainRepository,
    executor: ChainExecutor<R>,
}

impl<R: ProviderResolver> ChainService<R> {
    pub fn new(repository: ChainRepository, executor: ChainExecutor<R>) -> Self {
        Self {
            repository,
            executor,
        }
    }

    fn require_input(input: Option<&str>) -> Result<&str, DomainError> {
        input
            .filter(|i| !i.is_empty())
            .ok_or_else(|| DomainError::validation("Input is required"))
    }

    fn parse_id(id: &str) -> Result<ChainId, DomainError> {
        // Malformed ids can never have been generated
        ChainId::new(id)
            .map_err(|_| DomainError::not_found("Chain not found. Please check the chain ID."))
    }

    /// Compile a new chain under `base_url`
    pub async fn create(
        &self,
        request: NewChain,
        base_url: &str,
    ) -> Result<CreatedChain, DomainError> {
        let created = self.repository.create(request, base_url).await?;
        record_chain_created(created.persistence.is_durable());
        Ok(created)
    }

    /// Look up a chain by identifier
    pub async fn get(&self, id: &str) -> Result<ChainDefinition, DomainError> {
        self.repository.resolve(&Self::parse_id(id)?).await
    }

    /// Look up a chain by identifier fragment
    pub async fn find_by_slug(&self, slug: &str) -> Result<ChainDefinition, DomainError> {
        self.repository.resolve_by_prefix(slug).await
    }

    /// Resolve and run a chain by identifier
    #[instrument(skip(self, input))]
    pub async fn run(&self, id: &str, input: Option<&str>) -> Result<ChainRun, DomainError> {
        let input = Self::require_input(input)?;

        let chain = self.get(id).await?;
        self.execute(&chain, input).await
    }

    /// Resolve a chain by slug and run it
    #[instrument(skip(self, input))]
    pub async fn run_by_slug(
        &self,
        slug: &str,
        input: Option<&str>,
    ) -> Result<ChainRun, DomainError> {
        let input = Self::require_input(input)?;

        let chain = self.find_by_slug(slug).await?;
        self.execute(&chain, input).await
    }

    /// Run a single step at design time
    pub async fn preview(&self, preview: StepPreview) -> Result<String, DomainError> {
        self.executor.preview_step(preview).await
    }

    /// All chains of one owner, newest first
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        self.repository.list_for_owner(owner_id).await
    }

    /// Where a chain lives, for diagnostics
    pub async fn locate(&self, id: &str) -> Result<ChainLocation, DomainError> {
        let id = ChainId::new(id)?;
        Ok(self.repository.locate(&id).await)
    }

    /// Durable store reachability
    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.repository.store().health_check().await
    }

    async fn execute(&self, chain: &ChainDefinition, input: &str) -> Result<ChainRun, DomainError> {
        let result = self.executor.run(chain, input).await?;

        for step in &result.step_results {
            record_chain_step(true, Duration::from_millis(step.latency_ms));
        }

        let outcome = match result.status {
            RunStatus::Completed => "completed",
            RunStatus::Failed { .. } => {
                if let Some(latency_ms) = result.failed_step_latency_ms {
                    record_chain_step(false, Duration::from_millis(latency_ms));
                }
                "failed"
            }
        };
        record_chain_run(
            outcome,
            result.step_results.len(),
            Duration::from_millis(result.total_latency_ms),
        );

        info!(
            chain_id = %chain.id(),
            outcome,
            steps_completed = result.step_results.len(),
            total_latency_ms = result.total_latency_ms,
            "Chain run finished"
        );

        Ok(ChainRun {
            chain_id: chain.id().clone(),
            result,
        })
    }
}
