//! Prompt templates for each generation request.

use crate::task::Task;

pub const SUBTASK_SYSTEM_PROMPT: &str = "You are an AI assistant specialized in breaking down development tasks into smaller, manageable subtasks. Follow the JSON output format precisely.";

pub const TASK_SYSTEM_PROMPT: &str = "You are a helpful assistant that creates well-structured tasks for a software development project. Generate a single new task based on the user's description.";

pub const COMPLEXITY_USER_PROMPT: &str =
    "Analyze the provided tasks according to the specified JSON format.";

pub fn prd_system_prompt(num_tasks: usize, source_file: &str) -> String {
    format!(
        r#"You are an AI assistant helping to break down a Product Requirements Document (PRD) into a set of sequential development tasks.
Your goal is to create {n} well-structured, actionable development tasks based on the PRD provided.

Each task should follow this JSON structure:
{{
  "id": number,
  "title": string,
  "description": string,
  "status": "pending",
  "dependencies": number[] (IDs of tasks this depends on),
  "priority": "high" | "medium" | "low",
  "details": string (implementation details),
  "testStrategy": string (validation approach)
}}

Guidelines:
1. Create exactly {n} tasks, numbered from 1 to {n}
2. Each task should be atomic and focused on a single responsibility
3. Order tasks logically, considering dependencies and implementation sequence
4. Early tasks should focus on setup and core functionality, then advanced features
5. Include a clear validation/testing approach for each task
6. Set appropriate dependency IDs (a task can only depend on tasks with lower IDs)
7. Assign priority (high/medium/low) based on criticality and dependency order
8. Include detailed implementation guidance in the "details" field

Expected output format:
{{
  "tasks": [
    {{
      "id": 1,
      "title": "Setup Project Repository",
      "description": "...",
      ...
    }},
    ...
  ],
  "metadata": {{
    "projectName": "PRD Implementation",
    "totalTasks": {n},
    "sourceFile": "{source}",
    "generatedAt": "YYYY-MM-DD"
  }}
}}

Important: Your response must be valid JSON only, with no additional explanation or comments."#,
        n = num_tasks,
        source = source_file
    )
}

pub fn prd_user_prompt(prd: &str, num_tasks: usize) -> String {
    format!(
        "Here's the Product Requirements Document (PRD) to break down into {} tasks:\n\n{}",
        num_tasks, prd
    )
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}

fn or_na(text: &str) -> &str {
    if text.is_empty() {
        "N/A"
    } else {
        text
    }
}

pub fn subtask_prompt(task: &Task, num_subtasks: usize, next_id: u64, context: &str) -> String {
    let dependencies = if task.dependencies.is_empty() {
        "None".to_string()
    } else {
        join_ids(&task.dependencies)
    };
    let context = if context.is_empty() {
        String::new()
    } else {
        format!("\nAdditional Context: {}\n", context)
    };

    format!(
        r#"Task: {title} (ID: {id})
Description: {description}
Details: {details}
Priority: {priority}
Dependencies: {dependencies}
Test Strategy: {test_strategy}
{context}
Break this task down into exactly {n} smaller, actionable subtasks.
Each subtask should have:
- id: Starting from {next} (e.g., {id}.{next})
- title: Clear and concise title
- description: Brief description of the subtask
- status: "pending"
- dependencies: List any dependencies *within this set of subtasks* (using the new subtask IDs like {id}.{next}) or on the parent task's dependencies.
- priority: Inherit or adjust priority (high/medium/low)
- details: Specific implementation steps for the subtask
- testStrategy: How to verify this specific subtask

Respond ONLY with a valid JSON array of subtask objects, like this:
[
  {{ "id": "{id}.{next}", "title": "...", "description": "...", ... }},
  ...
]
Do not include any explanations or surrounding text."#,
        title = task.title,
        id = task.id,
        description = task.description,
        details = or_na(&task.details),
        priority = task.priority,
        dependencies = dependencies,
        test_strategy = or_na(&task.test_strategy),
        context = context,
        n = num_subtasks,
        next = next_id,
    )
}

/// One line per task: `- Task 3: Title - description`.
fn task_lines<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> String {
    tasks
        .into_iter()
        .map(|t| format!("- Task {}: {} - {}", t.id, t.title, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for a single new task.
///
/// With dependencies the context lists those tasks; otherwise it lists the
/// most recent ones.
pub fn task_prompt(description: &str, new_id: u64, context: &[&Task], has_dependencies: bool) -> String {
    let heading = if has_dependencies {
        "This task depends on the following tasks:"
    } else {
        "Recent tasks in the project:"
    };
    let context = if context.is_empty() {
        String::new()
    } else {
        format!("\n{}\n{}", heading, task_lines(context.iter().copied()))
    };

    format!(
        r#"Create a comprehensive new task (Task #{id}) for a software development project based on this description: "{description}"
{context}

Return your answer as a single JSON object with the following structure:
{{
  "title": "Task title goes here",
  "description": "A concise one or two sentence description of what the task involves",
  "details": "In-depth details including specifics on implementation, considerations, and anything important for the developer to know. This should be detailed enough to guide implementation.",
  "testStrategy": "A detailed approach for verifying the task has been correctly implemented. Include specific test cases or validation methods."
}}

Don't include the task ID, status, dependencies, or priority as those will be added automatically.
Make sure the details and test strategy are thorough and specific.

IMPORTANT: Return ONLY the JSON object, nothing else."#,
        id = new_id,
        description = description,
        context = context,
    )
}

pub fn complexity_system_prompt(tasks: &[Task]) -> String {
    let descriptions = tasks
        .iter()
        .map(|t| {
            let deps = if t.dependencies.is_empty() {
                "None".to_string()
            } else {
                join_ids(&t.dependencies)
            };
            format!("- Task {}: {} (Deps: {}) - {}", t.id, t.title, deps, t.description)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI assistant specialized in analyzing software development task complexity.
Analyze the following tasks and provide a complexity score (1-10) for each, along with a brief justification and a recommendation for the number of subtasks if complexity is high (>= 5).

Tasks:
{descriptions}

Complexity Scale:
1-2: Trivial (e.g., config change, simple UI update)
3-4: Simple (e.g., small feature, standard component)
5-7: Medium (e.g., complex feature, integration, some unknowns)
8-9: High (e.g., core system change, major refactor, high uncertainty)
10: Very High (e.g., requires significant research, architectural changes, many unknowns)

Output Format:
Respond ONLY with a valid JSON object containing a single key "complexityAnalysis", which is an array. Each element in the array should be an object with the following keys:
- taskId: number
- title: string
- complexityScore: number (1-10)
- justification: string (brief explanation for the score)
- recommendedSubtasks: number (suggested number of subtasks, 0 if score < 5)
- expansionPrompt: string (optional guidance for breaking the task down)

Example JSON Output:
{{
  "complexityAnalysis": [
    {{ "taskId": 1, "title": "Setup Project", "complexityScore": 3, "justification": "Standard setup.", "recommendedSubtasks": 0 }},
    {{ "taskId": 2, "title": "Implement Auth", "complexityScore": 7, "justification": "Involves external service integration and security.", "recommendedSubtasks": 5 }},
    ...
  ]
}}

Ensure the output is only the JSON object, nothing else."#,
        descriptions = descriptions
    )
}

pub fn update_system_prompt() -> String {
    r#"You are an AI assistant helping to update software development tasks based on new context.
You will be given a set of tasks and a prompt describing changes or new implementation details.
Update the tasks to reflect these changes while keeping their ids, status and subtasks untouched.
Keep the same JSON structure for every task: id, title, description, status, dependencies, priority, details, testStrategy.
Return a valid JSON array with the updated tasks, containing only the tasks that were provided for update."#
        .to_string()
}

pub fn update_user_prompt(tasks_json: &str, prompt: &str) -> String {
    format!(
        "Here are the tasks to update:\n{}\n\nPlease update these tasks based on the following new context:\n{}\n\nReturn only the updated tasks as a valid JSON array.",
        tasks_json, prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    #[test]
    fn test_subtask_prompt_mentions_ids_and_context() {
        let task = Task::new(7, "Build API")
            .with_priority(Priority::High)
            .with_dependencies(vec![2, 3]);
        let prompt = subtask_prompt(&task, 4, 3, "Use axum");

        assert!(prompt.contains("Task: Build API (ID: 7)"));
        assert!(prompt.contains("Dependencies: 2, 3"));
        assert!(prompt.contains("Details: N/A"));
        assert!(prompt.contains("exactly 4 smaller"));
        assert!(prompt.contains("\"7.3\""));
        assert!(prompt.contains("Additional Context: Use axum"));
    }

    #[test]
    fn test_task_prompt_context_heading() {
        let dep = Task::new(1, "Setup");
        let with_deps = task_prompt("add login", 5, &[&dep], true);
        assert!(with_deps.contains("Task #5"));
        assert!(with_deps.contains("This task depends on the following tasks:\n- Task 1: Setup - "));

        let recent = task_prompt("add login", 5, &[&dep], false);
        assert!(recent.contains("Recent tasks in the project:"));
    }

    #[test]
    fn test_prd_prompt_counts() {
        let system = prd_system_prompt(12, "docs/prd.txt");
        assert!(system.contains("create 12 well-structured"));
        assert!(system.contains("\"sourceFile\": \"docs/prd.txt\""));
        assert!(prd_user_prompt("Build a thing", 12).ends_with("Build a thing"));
    }
}
