use crate::api_connection::ChatMessage;
use crate::schedule::{ScheduleTaskRequest, TimeWindow};

const SYSTEM_PROMPT: &str = "You are a professional kitchen production scheduler. \
You create cooking schedules that avoid equipment conflicts and keep the kitchen efficient. \
Always respond with only valid JSON, no explanations or markdown formatting.";

fn describe_task(index: usize, task: &ScheduleTaskRequest) -> String {
    let methods = if task.equipment_tags.is_empty() {
        "none listed".to_string()
    } else {
        task.equipment_tags.join(", ")
    };
    format!(
        "{}. {}\n   - Prep Time: {} minutes\n   - Cook Time: {} minutes\n   - TOTAL Duration: {} minutes (prep + cook)\n   - Cooking Methods: {}\n   - Task ID: {}\n",
        index + 1,
        task.display_name,
        task.prep_minutes,
        task.cook_minutes,
        task.duration_minutes,
        methods,
        task.task_id
    )
}

/// The user turn: dishes, hard rules, soft heuristics and the exact output shape.
pub fn build_user_prompt(tasks: &[ScheduleTaskRequest], window: &TimeWindow) -> String {
    let start = window.start();
    let end = window.end();
    let dishes: String = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| describe_task(idx, task))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create a production schedule for the following dishes. The schedule must fit within {start} to {end}.

DISHES TO SCHEDULE:
{dishes}
SCHEDULING REQUIREMENTS:
1. The duration of each task MUST be exactly the TOTAL Duration shown above (prep time + cook time). Do not change it.
2. Avoid equipment conflicts: tasks sharing a cooking method (same oven, same stovetop) should not run at the same time.
3. Longest or most complex tasks should generally start first.
4. Use opportunities for parallel prep work where equipment does not clash.
5. Every task must start at or after {start} and end at or before {end}.

RESPONSE FORMAT:
Return a JSON object with a \"schedule\" array with this exact structure (no markdown, no code blocks, just raw JSON):
{{
  \"schedule\": [
    {{
      \"taskId\": \"string\",
      \"displayName\": \"string\",
      \"startTime\": \"HH:MM\",
      \"endTime\": \"HH:MM\",
      \"durationMinutes\": number
    }}
  ]
}}

Important:
- Include every task exactly once, using the Task ID given above.
- startTime and endTime must be in 24-hour format (e.g. \"09:30\", \"14:15\").
- durationMinutes MUST equal the TOTAL Duration given for that dish.
- The difference between endTime and startTime must equal durationMinutes."
    )
}

pub fn build_messages(tasks: &[ScheduleTaskRequest], window: &TimeWindow) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(tasks, window)),
    ]
}
