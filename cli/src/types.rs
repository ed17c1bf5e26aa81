use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};

pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl EnergyLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low => Self::High,
        }
    }
}

/// A task as entered by the user or shipped in a scenario, before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub priority: Priority,
    pub duration_minutes: u32,
    pub energy_required: EnergyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, priority: Priority, duration_minutes: u32) -> Self {
        Self {
            title: title.into(),
            priority,
            duration_minutes,
            energy_required: EnergyLevel::Medium,
            deadline: None,
            locked: None,
        }
    }

    pub fn validate(&self) -> FlowResult<()> {
        if self.title.trim().is_empty() {
            return Err(FlowError::InvalidTask("title must not be empty".into()));
        }
        if self.duration_minutes == 0 {
            return Err(FlowError::InvalidTask("duration must be at least one minute".into()));
        }
        if let Some(deadline) = self.deadline.as_deref() {
            parse_clock(deadline).map_err(|_| {
                FlowError::InvalidTask(format!("deadline {deadline:?} is not HH:mm"))
            })?;
        }
        Ok(())
    }

    pub fn into_task(self, id: String) -> Task {
        Task {
            id,
            title: self.title,
            priority: self.priority,
            duration_minutes: self.duration_minutes,
            energy_required: self.energy_required,
            deadline: self.deadline,
            locked: self.locked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub duration_minutes: u32,
    pub energy_required: EnergyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl Task {
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            priority: self.priority,
            duration_minutes: self.duration_minutes,
            energy_required: self.energy_required,
            deadline: self.deadline.clone(),
            locked: self.locked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub work_start: String,
    pub work_end: String,
    pub break_duration: u32,
}

impl UserSettings {
    pub fn validate(&self) -> FlowResult<()> {
        let start = parse_clock(&self.work_start).map_err(|_| {
            FlowError::InvalidSettings(format!("work start {:?} is not HH:mm", self.work_start))
        })?;
        let end = parse_clock(&self.work_end).map_err(|_| {
            FlowError::InvalidSettings(format!("work end {:?} is not HH:mm", self.work_end))
        })?;
        if start >= end {
            return Err(FlowError::InvalidSettings(format!(
                "work day must start before it ends ({} - {})",
                self.work_start, self.work_end
            )));
        }
        Ok(())
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self { work_start: "09:00".into(), work_end: "18:00".into(), break_duration: 60 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Task,
    Break,
    Meeting,
    Buffer,
}

impl BlockType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Break => "break",
            Self::Meeting => "meeting",
            Self::Buffer => "buffer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBlock {
    #[serde(default)]
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetrics {
    pub total_focus_hours: f64,
    pub confidence_score: f64,
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeferredTask {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub schedule: Vec<ScheduleBlock>,
    pub metrics: PlanMetrics,
    pub deferred_tasks: Vec<DeferredTask>,
}

impl DailyPlan {
    pub fn task_block_count(&self) -> usize {
        self.schedule.iter().filter(|block| block.block_type == BlockType::Task).count()
    }

    pub fn first_block(&self) -> Option<&ScheduleBlock> {
        self.schedule.first()
    }

    pub fn last_block(&self) -> Option<&ScheduleBlock> {
        self.schedule.last()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Scenario {
    pub id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
    pub icon: &'static str,
    pub tasks: Vec<TaskDraft>,
}

pub fn parse_clock(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_serialises_with_wire_names() {
        let task = TaskDraft {
            deadline: Some("15:30".into()),
            locked: Some(true),
            ..TaskDraft::new("Team Standup", Priority::Medium, 15)
        }
        .into_task("t1".into());

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "t1",
                "title": "Team Standup",
                "priority": "Medium",
                "durationMinutes": 15,
                "energyRequired": "Medium",
                "deadline": "15:30",
                "locked": true
            })
        );
    }

    #[test]
    fn optional_task_fields_are_omitted() {
        let task = TaskDraft::new("Email", Priority::Low, 30).into_task("t2".into());
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("deadline").is_none());
        assert!(value.get("locked").is_none());
        assert!(!task.is_locked());
    }

    #[test]
    fn draft_validation_rejects_blank_title_and_zero_duration() {
        assert!(TaskDraft::new("   ", Priority::High, 30).validate().is_err());
        assert!(TaskDraft::new("Write", Priority::High, 0).validate().is_err());
        let bad_deadline = TaskDraft {
            deadline: Some("25:99".into()),
            ..TaskDraft::new("Write", Priority::High, 30)
        };
        assert!(matches!(bad_deadline.validate(), Err(FlowError::InvalidTask(_))));
        assert!(TaskDraft::new("Write", Priority::High, 30).validate().is_ok());
    }

    #[test]
    fn settings_validation_requires_ordered_clock_times() {
        assert!(UserSettings::default().validate().is_ok());
        let inverted = UserSettings { work_start: "18:00".into(), ..UserSettings::default() };
        assert!(matches!(inverted.validate(), Err(FlowError::InvalidSettings(_))));
        let garbage = UserSettings { work_end: "late".into(), ..UserSettings::default() };
        assert!(garbage.validate().is_err());
    }

    #[test]
    fn block_type_uses_lowercase_tag() {
        let block: ScheduleBlock = serde_json::from_value(json!({
            "startTime": "09:00",
            "endTime": "09:15",
            "title": "Coffee",
            "type": "break",
            "reasoning": "warm up"
        }))
        .unwrap();
        assert_eq!(block.block_type, BlockType::Break);
        assert!(block.id.is_empty());
        assert!(block.priority.is_none());
    }

    #[test]
    fn counts_only_task_blocks() {
        let block = |kind: BlockType| ScheduleBlock {
            id: "b".into(),
            start_time: "09:00".into(),
            end_time: "10:00".into(),
            title: "x".into(),
            block_type: kind,
            priority: None,
            reasoning: String::new(),
            energy_context: None,
        };
        let plan = DailyPlan {
            schedule: vec![block(BlockType::Task), block(BlockType::Break), block(BlockType::Task)],
            metrics: PlanMetrics {
                total_focus_hours: 2.0,
                confidence_score: 90.0,
                utilization_rate: 40.0,
            },
            deferred_tasks: vec![],
        };
        assert_eq!(plan.task_block_count(), 2);
    }
}
