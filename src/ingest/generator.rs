//! Generation pipeline: completion call, retry, extraction, validation.
//!
//! Every public method produces validated records and never touches the
//! task store; merging is the caller's job.

use std::sync::Arc;

use serde_json::Value;

use super::extract::{BracketExtractor, ResponseExtractor, Shape};
use super::prompts;
use super::validate::{self, GeneratedTasks, TaskDraft};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionClient, CompletionRequest, LlmError, RetryPolicy};
use crate::task::{AnalysisEntry, Subtask, Task};

pub struct Generator {
    client: Arc<dyn CompletionClient>,
    config: GenerationConfig,
    retry: RetryPolicy,
    extractor: Arc<dyn ResponseExtractor>,
}

impl Generator {
    /// Create a generator with the default retry policy and bracket extractor.
    pub fn new(client: Arc<dyn CompletionClient>, config: GenerationConfig) -> Self {
        Self {
            client,
            config,
            retry: RetryPolicy::default(),
            extractor: Arc::new(BracketExtractor),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ResponseExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn request(&self, system: Option<String>, user: String, use_research: bool) -> CompletionRequest {
        CompletionRequest::new(system, user, self.config.model_for(use_research))
            .with_limits(self.config.max_tokens, self.config.temperature)
    }

    /// Run one request under the retry policy.
    async fn call(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        let service = self.client.service_name();
        tracing::info!("Calling {} AI (model {})...", service, request.model);

        let text = self
            .retry
            .run(service, |_| self.client.request_text(request))
            .await?;

        if self.config.debug {
            tracing::debug!("Raw response from {}: {}", service, text);
        }
        Ok(text)
    }

    async fn call_non_empty(&self, request: &CompletionRequest) -> Result<String> {
        let text = self.call(request).await?;
        if text.trim().is_empty() {
            tracing::error!("{} returned an empty response", self.client.service_name());
            return Err(Error::GenerationFailed);
        }
        Ok(text)
    }

    fn extract(&self, raw: &str, shape: Shape) -> Result<Value> {
        self.extractor.extract(raw, shape).into_value(raw)
    }

    /// Stream a task list for `prd`.
    ///
    /// Terminal failures are logged with their user-facing message and turned
    /// into `None`; nothing propagates from here.
    pub async fn generate_tasks_from_prd(
        &self,
        prd: &str,
        source_file: &str,
        num_tasks: usize,
    ) -> Option<String> {
        let request = self
            .request(
                Some(prompts::prd_system_prompt(num_tasks, source_file)),
                prompts::prd_user_prompt(prd, num_tasks),
                false,
            )
            .streaming(true);

        match self.call(&request).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::error!("AI service returned an empty response");
                None
            }
            // Already reported by the retry loop.
            Err(_) => None,
        }
    }

    /// Extract and validate a PRD response.
    pub fn parse_prd_response(
        &self,
        raw: &str,
        num_tasks: usize,
        source_file: &str,
    ) -> Result<GeneratedTasks> {
        let value = self.extract(raw, Shape::Object)?;
        let mut generated = validate::validate_task_list(&value, num_tasks).map_err(|e| {
            tracing::debug!("Raw AI response: {}", raw);
            e
        })?;

        if let Some(metadata) = generated.metadata.as_mut() {
            metadata.source_file.get_or_insert_with(|| source_file.to_string());
        }
        Ok(generated)
    }

    /// Generate `num_subtasks` subtasks for `task`, numbered from `next_id`.
    pub async fn generate_subtasks(
        &self,
        task: &Task,
        num_subtasks: usize,
        next_id: u64,
        context: &str,
        use_research: bool,
    ) -> Result<Vec<Subtask>> {
        tracing::info!(
            "Generating {} subtasks for task {} using {}",
            num_subtasks,
            task.id,
            self.config.model_for(use_research)
        );
        let request = self
            .request(
                Some(prompts::SUBTASK_SYSTEM_PROMPT.to_string()),
                prompts::subtask_prompt(task, num_subtasks, next_id, context),
                use_research,
            )
            .json_mode(true);

        let raw = self.call_non_empty(&request).await?;
        let value = self.extract(&raw, Shape::SubtaskArray)?;
        validate::validate_subtasks(&value, next_id, num_subtasks, task.id)
    }

    /// Generate the content of one new task.
    ///
    /// `context` holds the tasks the new one depends on, or recent tasks when
    /// it has no dependencies.
    pub async fn generate_task(
        &self,
        description: &str,
        new_id: u64,
        context: &[&Task],
        has_dependencies: bool,
    ) -> Result<TaskDraft> {
        let request = self
            .request(
                Some(prompts::TASK_SYSTEM_PROMPT.to_string()),
                prompts::task_prompt(description, new_id, context, has_dependencies),
                false,
            )
            .streaming(true);

        let raw = self.call_non_empty(&request).await?;
        let value = self.extract(&raw, Shape::Object)?;
        validate::validate_task_draft(&value)
    }

    /// Score the complexity of each task.
    pub async fn analyze_complexity(
        &self,
        tasks: &[Task],
        use_research: bool,
    ) -> Result<Vec<AnalysisEntry>> {
        let request = self
            .request(
                Some(prompts::complexity_system_prompt(tasks)),
                prompts::COMPLEXITY_USER_PROMPT.to_string(),
                use_research,
            )
            .streaming(true);

        let raw = self.call_non_empty(&request).await?;
        let value = self.extract(&raw, Shape::Object)?;
        let entries = validate::validate_complexity(&value)?;
        if entries.len() != tasks.len() {
            tracing::warn!(
                "Complexity analysis covers {} of {} tasks",
                entries.len(),
                tasks.len()
            );
        }
        Ok(entries)
    }

    /// Rewrite `tasks` in light of `prompt`, returning `(id, patch)` pairs.
    ///
    /// Records without a usable id are skipped with a warning.
    pub async fn generate_task_updates(
        &self,
        tasks: &[Task],
        prompt: &str,
        use_research: bool,
    ) -> Result<Vec<(u64, Value)>> {
        let tasks_json = serde_json::to_string_pretty(tasks)
            .map_err(|e| Error::InvalidInput(format!("cannot serialize tasks: {}", e)))?;
        let request = self
            .request(
                Some(prompts::update_system_prompt()),
                prompts::update_user_prompt(&tasks_json, prompt),
                use_research,
            )
            .streaming(true);

        let raw = self.call_non_empty(&request).await?;
        let value = self.extract(&raw, Shape::Array)?;
        let Some(items) = value.as_array() else {
            return Err(Error::malformed("parsed response is not an array", raw));
        };

        if items.len() != tasks.len() {
            tracing::warn!(
                "AI returned {} tasks, but {} were expected. Matching by id.",
                items.len(),
                tasks.len()
            );
        }

        let patches = items
            .iter()
            .filter_map(|item| match validate::normalize_task_patch(item) {
                Ok(patch) => Some(patch),
                Err(e) => {
                    tracing::warn!("Skipping task update: {}", e);
                    None
                }
            })
            .collect();
        Ok(patches)
    }
}
