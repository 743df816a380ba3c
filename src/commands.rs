//! Command orchestration.
//!
//! Each command loads the tasks document, runs at most a few generation
//! calls, merges the result through [`TaskStore`], repairs dependencies and
//! writes the document back once. Presentation is left to the caller.

use std::path::Path;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::ingest::Generator;
use crate::task::{
    find_dependency_issues, find_next_task, ComplexityReport, DependencyIssue, DependencyRepairs,
    Document, Priority, ProjectSummary, ReportMeta, StatusChange, Subtask, SubtaskDraft, Task,
    TaskRef, TaskStatus, TaskStore,
};

/// Number of recent tasks shown to the model when a new task has no
/// dependencies.
const RECENT_CONTEXT_TASKS: usize = 3;

/// Settings shared by the expansion commands.
#[derive(Debug, Clone, Default)]
pub struct ExpandOptions<'a> {
    /// Explicit subtask count. `None` defers to the complexity report, then
    /// to the configured default.
    pub num_subtasks: Option<usize>,
    pub use_research: bool,
    pub context: &'a str,
    /// Complexity report consulted for counts and prompts, if present.
    pub report_path: Option<&'a Path>,
}

/// Outcome of [`expand_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandAllSummary {
    pub expanded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Where a subtask added by [`add_subtask`] comes from.
#[derive(Debug, Clone)]
pub enum SubtaskSource {
    New(SubtaskDraft),
    /// Convert an existing top-level task.
    Existing(u64),
}

/// Generate a fresh task list from a PRD and write it to `tasks_path`,
/// replacing any previous document.
pub async fn parse_prd(
    generator: &Generator,
    prd_path: &Path,
    tasks_path: &Path,
    num_tasks: usize,
    project_name: &str,
) -> Result<Document> {
    let prd = std::fs::read_to_string(prd_path).map_err(|e| Error::io(prd_path, e))?;
    let source = prd_path.display().to_string();
    tracing::info!("Parsing PRD file: {}", source);

    let raw = generator
        .generate_tasks_from_prd(&prd, &source, num_tasks)
        .await
        .ok_or(Error::GenerationFailed)?;
    let generated = generator.parse_prd_response(&raw, num_tasks, &source)?;

    let mut metadata = generated.metadata.unwrap_or_default();
    metadata
        .project_name
        .get_or_insert_with(|| project_name.to_string());
    metadata.source_file.get_or_insert(source);
    metadata.total_tasks = Some(generated.tasks.len());
    metadata.generated_at = Some(Utc::now());

    let mut store = TaskStore::from_document(Document::new(generated.tasks, metadata), tasks_path);
    store.repair_dependencies();
    store.save()?;

    tracing::info!(
        "Generated {} tasks in {}",
        store.tasks().len(),
        tasks_path.display()
    );
    Ok(store.into_document())
}

/// Rewrite every unfinished task with id `>= from_id` in light of `prompt`.
///
/// Returns the ids that were updated. Status and subtasks are never changed.
pub async fn update_tasks(
    generator: &Generator,
    tasks_path: &Path,
    from_id: u64,
    prompt: &str,
    use_research: bool,
) -> Result<Vec<u64>> {
    let mut store = TaskStore::load(tasks_path)?;
    let selected: Vec<Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id >= from_id && !t.status.is_done())
        .cloned()
        .collect();

    if selected.is_empty() {
        tracing::info!("No tasks to update (ID >= {} and not done)", from_id);
        return Ok(Vec::new());
    }
    tracing::info!("Updating {} tasks from ID {}", selected.len(), from_id);

    let patches = generator
        .generate_task_updates(&selected, prompt, use_research)
        .await?;

    let mut updated = Vec::with_capacity(patches.len());
    for (id, patch) in patches {
        if !selected.iter().any(|t| t.id == id) {
            tracing::warn!("Ignoring update for task {}, which was not selected", id);
            continue;
        }
        store.update_task(id, &patch)?;
        updated.push(id);
    }

    store.repair_dependencies();
    store.save()?;
    tracing::info!("Successfully updated {} tasks", updated.len());
    Ok(updated)
}

/// Set the status of each ref in a comma-separated list such as `"3,4.1"`.
pub fn set_status(tasks_path: &Path, refs: &str, status: TaskStatus) -> Result<Vec<StatusChange>> {
    let mut store = TaskStore::load(tasks_path)?;
    let changes = store.set_status_many(refs, status)?;

    for change in &changes {
        tracing::info!(
            "Updated {} status from '{}' to '{}'",
            change.target,
            change.previous,
            change.status
        );
        if change.all_siblings_done {
            tracing::info!(
                "All subtasks of task {} are now done; consider marking it done too",
                change.target.task_id()
            );
        }
    }

    store.repair_dependencies();
    store.save()?;
    Ok(changes)
}

/// Subtask count and context for one task, taking the complexity report
/// into account.
fn expansion_plan(
    task_id: u64,
    options: &ExpandOptions<'_>,
    report: Option<&ComplexityReport>,
    default_subtasks: usize,
) -> (usize, String) {
    let entry = report.and_then(|r| r.entry_for(task_id));

    let count = options
        .num_subtasks
        .or_else(|| {
            entry
                .map(|e| e.recommended_subtasks as usize)
                .filter(|n| *n > 0)
        })
        .unwrap_or(default_subtasks);

    let context = if options.context.trim().is_empty() {
        entry
            .and_then(|e| e.expansion_prompt.clone())
            .unwrap_or_default()
    } else {
        options.context.to_string()
    };

    (count, context)
}

/// Break one task into subtasks and append them.
///
/// A finished task is left alone and yields no subtasks.
pub async fn expand_task(
    generator: &Generator,
    tasks_path: &Path,
    task_id: u64,
    options: &ExpandOptions<'_>,
) -> Result<Vec<Subtask>> {
    let mut store = TaskStore::load(tasks_path)?;
    let task = store.task(task_id)?.clone();
    if task.status.is_done() {
        tracing::warn!("Task {} is already marked as {}; not expanding", task_id, task.status);
        return Ok(Vec::new());
    }

    let report = options.report_path.and_then(ComplexityReport::load_optional);
    let (count, context) = expansion_plan(
        task_id,
        options,
        report.as_ref(),
        generator.config().default_subtasks,
    );

    let subtasks = generator
        .generate_subtasks(
            &task,
            count,
            task.next_subtask_id(),
            &context,
            options.use_research,
        )
        .await?;

    store.attach_subtasks(task_id, subtasks.clone())?;
    store.repair_dependencies();
    store.save()?;
    Ok(subtasks)
}

/// Expand every unfinished task, most complex first when a report exists.
///
/// Tasks that already have subtasks are skipped unless `force` is set, in
/// which case their subtasks are replaced. A failure on one task is logged
/// and the rest continue.
pub async fn expand_all(
    generator: &Generator,
    tasks_path: &Path,
    options: &ExpandOptions<'_>,
    force: bool,
) -> Result<ExpandAllSummary> {
    let mut store = TaskStore::load(tasks_path)?;
    let report = options.report_path.and_then(ComplexityReport::load_optional);
    let mut summary = ExpandAllSummary::default();

    let mut candidates: Vec<u64> = Vec::new();
    for task in store.tasks() {
        if task.status.is_done() {
            continue;
        }
        if !task.subtasks.is_empty() && !force {
            tracing::info!("Task {} already has subtasks; skipping", task.id);
            summary.skipped += 1;
            continue;
        }
        candidates.push(task.id);
    }

    if force {
        store.clear_subtasks(&candidates);
    }

    if let Some(report) = &report {
        let score = |id: u64| report.entry_for(id).map_or(0, |e| e.complexity_score);
        candidates.sort_by_key(|id| std::cmp::Reverse(score(*id)));
    }

    tracing::info!("Expanding {} tasks", candidates.len());
    for task_id in candidates {
        let task = store.task(task_id)?.clone();
        let (count, context) = expansion_plan(
            task_id,
            options,
            report.as_ref(),
            generator.config().default_subtasks,
        );

        let result = generator
            .generate_subtasks(
                &task,
                count,
                task.next_subtask_id(),
                &context,
                options.use_research,
            )
            .await
            .and_then(|subtasks| store.attach_subtasks(task_id, subtasks));

        match result {
            Ok(_) => summary.expanded += 1,
            Err(e) => {
                tracing::warn!("Failed to expand task {}: {}", task_id, e);
                summary.failed += 1;
            }
        }
    }

    store.repair_dependencies();
    store.save()?;
    tracing::info!(
        "Expanded {} tasks ({} skipped, {} failed)",
        summary.expanded,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

/// Remove all subtasks from each listed task. Returns how many were cleared.
pub fn clear_subtasks(tasks_path: &Path, ids: &[u64]) -> Result<usize> {
    if ids.is_empty() {
        return Err(Error::InvalidInput("no task ids given".into()));
    }
    let mut store = TaskStore::load(tasks_path)?;
    let cleared = store.clear_subtasks(ids);
    store.repair_dependencies();
    store.save()?;
    Ok(cleared)
}

/// Generate and append one new task. Returns its id.
///
/// Dependencies on unknown tasks are dropped with a warning.
pub async fn add_task(
    generator: &Generator,
    tasks_path: &Path,
    prompt: &str,
    dependencies: &[u64],
    priority: Priority,
) -> Result<u64> {
    let mut store = TaskStore::load(tasks_path)?;
    let new_id = store.next_task_id();

    let mut valid = Vec::with_capacity(dependencies.len());
    for dep in dependencies {
        if !store.document().contains(*dep) {
            tracing::warn!("Dependency {} does not exist; ignoring it", dep);
        } else if !valid.contains(dep) {
            valid.push(*dep);
        }
    }

    let context: Vec<Task> = if valid.is_empty() {
        let tasks = store.tasks();
        tasks[tasks.len().saturating_sub(RECENT_CONTEXT_TASKS)..].to_vec()
    } else {
        store
            .tasks()
            .iter()
            .filter(|t| valid.contains(&t.id))
            .cloned()
            .collect()
    };
    let context_refs: Vec<&Task> = context.iter().collect();

    tracing::info!("Generating task {} from prompt", new_id);
    let draft = generator
        .generate_task(prompt, new_id, &context_refs, !valid.is_empty())
        .await?;

    let id = store.insert_task(draft.into_task(new_id, priority, valid));
    store.repair_dependencies();
    store.save()?;
    tracing::info!("Added task {}", id);
    Ok(id)
}

/// Score every unfinished task and write the complexity report.
pub async fn analyze_complexity(
    generator: &Generator,
    tasks_path: &Path,
    report_path: &Path,
    threshold: f64,
    use_research: bool,
    project_name: &str,
) -> Result<ComplexityReport> {
    let store = TaskStore::load(tasks_path)?;
    let tasks: Vec<Task> = store
        .tasks()
        .iter()
        .filter(|t| !t.status.is_done())
        .cloned()
        .collect();
    if tasks.is_empty() {
        return Err(Error::InvalidInput("no unfinished tasks to analyze".into()));
    }

    let entries = generator.analyze_complexity(&tasks, use_research).await?;
    let report = ComplexityReport {
        meta: ReportMeta {
            generated_at: Utc::now(),
            tasks_analyzed: tasks.len(),
            threshold_score: threshold,
            project_name: project_name.to_string(),
            used_research: use_research,
        },
        complexity_analysis: entries,
    };
    report.save(report_path)?;

    let buckets = report.buckets();
    tracing::info!(
        "Complexity report written to {}: {} high, {} medium, {} low",
        report_path.display(),
        buckets.high,
        buckets.medium,
        buckets.low
    );
    Ok(report)
}

/// The task to work on next, if any is ready.
pub fn next_task(tasks_path: &Path) -> Result<Option<Task>> {
    let store = TaskStore::load(tasks_path)?;
    Ok(find_next_task(store.tasks()).cloned())
}

/// Tasks and progress figures for listing.
pub fn list_tasks(
    tasks_path: &Path,
    status: Option<TaskStatus>,
) -> Result<(Vec<Task>, ProjectSummary)> {
    let store = TaskStore::load(tasks_path)?;
    let summary = ProjectSummary::from_tasks(store.tasks());
    let tasks = store
        .into_document()
        .tasks
        .into_iter()
        .filter(|t| status.map_or(true, |s| t.status == s))
        .collect();
    Ok((tasks, summary))
}

/// Add a subtask to `parent_id`, either new or converted from a task.
pub fn add_subtask(tasks_path: &Path, parent_id: u64, source: SubtaskSource) -> Result<TaskRef> {
    let mut store = TaskStore::load(tasks_path)?;
    let target = match source {
        SubtaskSource::New(draft) => store.add_subtask(parent_id, draft)?,
        SubtaskSource::Existing(task_id) => store.demote_task_to_subtask(parent_id, task_id)?,
    };
    store.repair_dependencies();
    store.save()?;
    Ok(target)
}

/// Remove subtask `target`. With `convert` it becomes a top-level task
/// depending on its former parent, and the new id is returned.
pub fn remove_subtask(tasks_path: &Path, target: &TaskRef, convert: bool) -> Result<Option<u64>> {
    let mut store = TaskStore::load(tasks_path)?;
    let new_id = if convert {
        Some(store.promote_subtask_to_task(target, true)?)
    } else {
        store.remove_subtask(target)?;
        None
    };
    store.repair_dependencies();
    store.save()?;
    Ok(new_id)
}

/// Report invalid dependency edges without changing anything.
pub fn validate_dependencies(tasks_path: &Path) -> Result<Vec<DependencyIssue>> {
    let store = TaskStore::load(tasks_path)?;
    let issues = find_dependency_issues(store.tasks());
    if issues.is_empty() {
        tracing::info!("All dependencies are valid");
    } else {
        tracing::warn!("Found {} invalid dependencies", issues.len());
    }
    Ok(issues)
}

/// Remove invalid dependency edges. The document is only rewritten when
/// something changed.
pub fn fix_dependencies(tasks_path: &Path) -> Result<DependencyRepairs> {
    let mut store = TaskStore::load(tasks_path)?;
    let repairs = store.repair_dependencies();
    if repairs.is_clean() {
        tracing::info!("No invalid dependencies found");
    } else {
        store.save()?;
    }
    Ok(repairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::config::GenerationConfig;
    use crate::llm::{LlmError, RetryPolicy, ScriptedClient};
    use crate::task::{AnalysisEntry, Metadata};

    fn generator(client: ScriptedClient) -> Generator {
        Generator::new(Arc::new(client), GenerationConfig::default())
            .with_retry(RetryPolicy::immediate(1))
    }

    fn write_tasks(dir: &TempDir, tasks: Vec<Task>) -> std::path::PathBuf {
        let path = dir.path().join("tasks/tasks.json");
        TaskStore::from_document(Document::new(tasks, Metadata::default()), &path)
            .save()
            .unwrap();
        path
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new(1, "Setup").with_status(TaskStatus::Done),
            Task::new(2, "Core").with_dependencies(vec![1]),
            Task::new(3, "Polish").with_dependencies(vec![2]),
        ]
    }

    #[tokio::test]
    async fn test_parse_prd_writes_document() {
        let dir = TempDir::new().unwrap();
        let prd_path = dir.path().join("prd.txt");
        std::fs::write(&prd_path, "Build a todo app").unwrap();
        let tasks_path = dir.path().join("tasks/tasks.json");

        let generator = generator(ScriptedClient::new().with_stream(vec![
            r#"{"tasks": [{"id": 1, "title": "Setup"}, {"id": 2, "title": "API", "dependencies": [1, 9]}]}"#,
        ]));

        let document = parse_prd(&generator, &prd_path, &tasks_path, 2, "Todo")
            .await
            .unwrap();

        assert_eq!(document.tasks.len(), 2);
        assert_eq!(document.tasks[1].dependencies, vec![1]);
        assert_eq!(document.metadata.project_name.as_deref(), Some("Todo"));
        assert_eq!(document.metadata.total_tasks, Some(2));
        assert!(document.metadata.generated_at.is_some());

        let reloaded = TaskStore::load(&tasks_path).unwrap();
        assert_eq!(reloaded.document(), &document);
    }

    #[tokio::test]
    async fn test_parse_prd_failure_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let prd_path = dir.path().join("prd.txt");
        std::fs::write(&prd_path, "prd").unwrap();
        let tasks_path = dir.path().join("tasks.json");

        let generator = generator(ScriptedClient::new().with_error(LlmError::new(
            crate::llm::LlmErrorKind::Authentication,
            "bad key",
        )));

        let err = parse_prd(&generator, &prd_path, &tasks_path, 2, "Todo")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed));
        assert!(!tasks_path.exists());
    }

    #[tokio::test]
    async fn test_update_tasks_preserves_status_and_skips_done() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());

        let generator = generator(ScriptedClient::new().with_text(
            r#"[{"id": 2, "title": "Core v2", "status": "done"}, {"id": 1, "title": "sneaky"}, {"id": 3, "title": "Polish v2"}]"#,
        ));

        let updated = update_tasks(&generator, &path, 1, "use v2", false)
            .await
            .unwrap();
        assert_eq!(updated, vec![2, 3]);

        let store = TaskStore::load(&path).unwrap();
        assert_eq!(store.task(1).unwrap().title, "Setup");
        assert_eq!(store.task(2).unwrap().title, "Core v2");
        assert_eq!(store.task(2).unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_expand_task_uses_report_recommendation() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());
        let report_path = dir.path().join("report.json");
        ComplexityReport {
            meta: ReportMeta {
                generated_at: Utc::now(),
                tasks_analyzed: 1,
                threshold_score: 5.0,
                project_name: "p".into(),
                used_research: false,
            },
            complexity_analysis: vec![AnalysisEntry {
                task_id: 2,
                title: "Core".into(),
                complexity_score: 8,
                justification: String::new(),
                recommended_subtasks: 2,
                expansion_prompt: Some("Split by layer".into()),
            }],
        }
        .save(&report_path)
        .unwrap();

        let client = Arc::new(ScriptedClient::new().with_text(
            r#"[{"title": "Model"}, {"title": "Handlers", "dependencies": ["2.1"]}]"#,
        ));
        let generator = Generator::new(client.clone(), GenerationConfig::default());
        let options = ExpandOptions {
            report_path: Some(&report_path),
            ..ExpandOptions::default()
        };

        let subtasks = expand_task(&generator, &path, 2, &options).await.unwrap();
        assert_eq!(subtasks.len(), 2);

        let prompt = &client.requests()[0].user;
        assert!(prompt.contains("exactly 2 smaller"));
        assert!(prompt.contains("Additional Context: Split by layer"));

        let store = TaskStore::load(&path).unwrap();
        let task = store.task(2).unwrap();
        assert_eq!(task.subtasks[1].dependencies, vec![1]);
    }

    #[tokio::test]
    async fn test_expand_done_task_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());
        let generator = generator(ScriptedClient::new());

        let subtasks = expand_task(&generator, &path, 1, &ExpandOptions::default())
            .await
            .unwrap();
        assert!(subtasks.is_empty());
    }

    #[tokio::test]
    async fn test_expand_all_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());
        let generator = generator(
            ScriptedClient::new()
                .with_text("no json at all")
                .with_text(r#"[{"title": "Only"}]"#),
        );

        let summary = expand_all(&generator, &path, &ExpandOptions::default(), false)
            .await
            .unwrap();
        assert_eq!(summary, ExpandAllSummary { expanded: 1, skipped: 0, failed: 1 });

        let store = TaskStore::load(&path).unwrap();
        assert!(store.task(2).unwrap().subtasks.is_empty());
        assert_eq!(store.task(3).unwrap().subtasks.len(), 1);
    }

    #[tokio::test]
    async fn test_add_task_drops_unknown_dependencies() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());
        let client = Arc::new(
            ScriptedClient::new().with_stream(vec![r#"{"title": "Auth", "description": "Login"}"#]),
        );
        let generator = Generator::new(client.clone(), GenerationConfig::default());

        let id = add_task(&generator, &path, "add auth", &[2, 42], Priority::High)
            .await
            .unwrap();
        assert_eq!(id, 4);

        let store = TaskStore::load(&path).unwrap();
        let task = store.task(4).unwrap();
        assert_eq!(task.dependencies, vec![2]);
        assert_eq!(task.priority, Priority::High);
        assert!(client.requests()[0]
            .user
            .contains("This task depends on the following tasks:"));
    }

    #[tokio::test]
    async fn test_analyze_complexity_writes_report() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());
        let report_path = dir.path().join("scripts/report.json");
        let generator = generator(ScriptedClient::new().with_text(
            r#"{"complexityAnalysis": [{"taskId": 2, "complexityScore": 9}, {"taskId": 3, "complexityScore": 2}]}"#,
        ));

        let report = analyze_complexity(&generator, &path, &report_path, 5.0, false, "p")
            .await
            .unwrap();
        assert_eq!(report.meta.tasks_analyzed, 2);
        assert_eq!(report.expansion_order(), vec![2, 3]);
        assert_eq!(ComplexityReport::load(&report_path).unwrap(), report);
    }

    #[test]
    fn test_status_and_next_task() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());

        assert_eq!(next_task(&path).unwrap().map(|t| t.id), Some(2));
        set_status(&path, "2", TaskStatus::Done).unwrap();
        assert_eq!(next_task(&path).unwrap().map(|t| t.id), Some(3));

        assert!(set_status(&path, "3,99", TaskStatus::Done).is_err());
        let (tasks, summary) = list_tasks(&path, Some(TaskStatus::Pending)).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(summary.done, 2);
    }

    #[test]
    fn test_subtask_conversions_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, sample_tasks());

        let err = add_subtask(&path, 2, SubtaskSource::Existing(3)).unwrap_err();
        assert!(matches!(err, Error::StructuralViolation(_)));

        let target = add_subtask(&path, 2, SubtaskSource::New(SubtaskDraft::new("Schema"))).unwrap();
        assert_eq!(target, TaskRef::Subtask { parent: 2, sub: 1 });

        let new_id = remove_subtask(&path, &target, true).unwrap();
        assert_eq!(new_id, Some(4));

        let store = TaskStore::load(&path).unwrap();
        assert!(store.task(2).unwrap().subtasks.is_empty());
        assert_eq!(store.task(4).unwrap().dependencies, vec![2]);
    }

    #[test]
    fn test_fix_dependencies_reports_and_repairs() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(
            &dir,
            vec![
                Task::new(1, "a").with_dependencies(vec![1, 7]),
                Task::new(2, "b").with_dependencies(vec![1, 1]),
            ],
        );

        assert_eq!(validate_dependencies(&path).unwrap().len(), 3);
        let repairs = fix_dependencies(&path).unwrap();
        assert_eq!(repairs.total(), 3);
        assert!(validate_dependencies(&path).unwrap().is_empty());
        assert!(fix_dependencies(&path).unwrap().is_clean());
    }
}
