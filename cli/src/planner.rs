use chrono::NaiveTime;
use serde_json::{json, Value};
use tracing::debug;

use crate::types::{Task, UserSettings, TIME_FORMAT};

pub const FAST_TEMPERATURE: f32 = 0.3;
pub const DEEP_THINKING_BUDGET: u32 = 32_768;

const PERSONA: &str = "You are an expert Productivity Assistant and Agile Coach.";

const SCHEDULING_RULES: &[&str] = &[
    "Prioritize HIGH priority tasks during morning hours or high-energy blocks if possible.",
    "Group similar tasks to avoid context switching cost.",
    "Insert small buffer blocks (5-10 mins) between major heavy cognitive tasks.",
    "Ensure a break is taken around the middle of the work block.",
    "Do NOT schedule past the Work Day End time.",
    "If tasks cannot fit, move them to the 'deferredTasks' list with a polite reason.",
    "Provide a confidence score based on how realistic this plan is.",
];

const BLOCK_TYPES: &[&str] = &["task", "break", "meeting", "buffer"];
const PRIORITIES: &[&str] = &["High", "Medium", "Low"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub fast_model: String,
    pub deep_model: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            fast_model: "gemini-2.5-flash-lite".into(),
            deep_model: "gemini-3-pro-preview".into(),
        }
    }
}

/// Sampling configuration for one plan request. The variants are exclusive:
/// a deep-reasoning request never carries a temperature override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionProfile {
    Fast { temperature: f32 },
    Deep { thinking_budget: u32 },
}

impl ExecutionProfile {
    pub fn for_mode(deep_reasoning: bool) -> Self {
        if deep_reasoning {
            Self::Deep { thinking_budget: DEEP_THINKING_BUDGET }
        } else {
            Self::Fast { temperature: FAST_TEMPERATURE }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fast { .. } => "fast",
            Self::Deep { .. } => "deep",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub model: String,
    pub prompt: String,
    pub schema: Value,
    pub profile: ExecutionProfile,
}

#[derive(Debug, Clone, Default)]
pub struct PlanRequestBuilder {
    models: ModelSelection,
}

impl PlanRequestBuilder {
    pub fn new(models: ModelSelection) -> Self {
        Self { models }
    }

    pub fn build(
        &self,
        tasks: &[Task],
        settings: &UserSettings,
        deep_reasoning: bool,
        now: NaiveTime,
    ) -> PlanRequest {
        let profile = ExecutionProfile::for_mode(deep_reasoning);
        let model = match profile {
            ExecutionProfile::Fast { .. } => self.models.fast_model.clone(),
            ExecutionProfile::Deep { .. } => self.models.deep_model.clone(),
        };
        debug!(
            %model,
            task_count = tasks.len(),
            profile = profile.label(),
            "building plan request"
        );

        PlanRequest {
            model,
            prompt: render_prompt(tasks, settings, now),
            schema: plan_schema(),
            profile,
        }
    }
}

fn render_prompt(tasks: &[Task], settings: &UserSettings, now: NaiveTime) -> String {
    // Task and setting values are plain strings and numbers; serialisation cannot fail.
    let task_json = serde_json::to_string(tasks).unwrap_or_else(|_| "[]".to_string());
    let rules = SCHEDULING_RULES
        .iter()
        .enumerate()
        .map(|(index, rule)| format!("{}. {rule}", index + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PERSONA}\n\
         Create an optimal daily schedule based on the following inputs.\n\
         \n\
         Current Time: {now}\n\
         \n\
         User Settings:\n\
         - Work Day: {start} to {end}\n\
         - Preferred Break Duration: {break_minutes} minutes\n\
         \n\
         Tasks List:\n\
         {task_json}\n\
         \n\
         Scheduling Rules:\n\
         {rules}\n\
         \n\
         Return the response strictly in JSON format matching the schema provided.",
        now = now.format(TIME_FORMAT),
        start = settings.work_start,
        end = settings.work_end,
        break_minutes = settings.break_duration,
    )
}

/// Response schema handed to the model. Mirrors `DailyPlan` field for field.
pub fn plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "schedule": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "startTime": {
                            "type": "STRING",
                            "description": "Start time in HH:mm 24h format"
                        },
                        "endTime": {
                            "type": "STRING",
                            "description": "End time in HH:mm 24h format"
                        },
                        "title": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": BLOCK_TYPES },
                        "priority": { "type": "STRING", "enum": PRIORITIES, "nullable": true },
                        "reasoning": {
                            "type": "STRING",
                            "description": "Short explanation why this task was placed here"
                        },
                        "energyContext": {
                            "type": "STRING",
                            "description": "Why it matches energy levels",
                            "nullable": true
                        }
                    },
                    "required": ["startTime", "endTime", "title", "type", "reasoning"]
                }
            },
            "metrics": {
                "type": "OBJECT",
                "properties": {
                    "totalFocusHours": { "type": "NUMBER" },
                    "confidenceScore": {
                        "type": "NUMBER",
                        "description": "0 to 100 score of plan feasibility"
                    },
                    "utilizationRate": {
                        "type": "NUMBER",
                        "description": "Percentage of work day used"
                    }
                },
                "required": ["totalFocusHours", "confidenceScore", "utilizationRate"]
            },
            "deferredTasks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["title", "reason"]
                }
            }
        },
        "required": ["schedule", "metrics", "deferredTasks"]
    })
}
