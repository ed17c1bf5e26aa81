use crossterm::event::KeyCode;

use crate::{
    error::{FlowError, FlowResult},
    types::{EnergyLevel, Priority, Task, TaskDraft, UserSettings},
};

/// Outcome of feeding a key to a form.
#[derive(Debug, PartialEq)]
pub enum FormAction {
    Continue,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Priority,
    Duration,
    Energy,
    Deadline,
    Locked,
}

impl TaskField {
    const ORDER: [TaskField; 6] = [
        TaskField::Title,
        TaskField::Priority,
        TaskField::Duration,
        TaskField::Energy,
        TaskField::Deadline,
        TaskField::Locked,
    ];

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let index = Self::ORDER.iter().position(|field| *field == self).unwrap_or(0);
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        Self::ORDER[next]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskField::Title => "Title",
            TaskField::Priority => "Priority",
            TaskField::Duration => "Duration (min)",
            TaskField::Energy => "Energy",
            TaskField::Deadline => "Deadline (HH:mm)",
            TaskField::Locked => "Locked",
        }
    }
}

/// Add/edit form for a single task. `editing` holds the id of the task being
/// edited; `None` means the form adds a new task.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub editing: Option<String>,
    pub title: String,
    pub priority: Priority,
    pub duration: String,
    pub energy: EnergyLevel,
    pub deadline: String,
    pub locked: bool,
    pub field: TaskField,
}

impl TaskForm {
    pub fn blank() -> Self {
        Self {
            editing: None,
            title: String::new(),
            priority: Priority::Medium,
            duration: "30".into(),
            energy: EnergyLevel::Medium,
            deadline: String::new(),
            locked: false,
            field: TaskField::Title,
        }
    }

    pub fn for_task(task: &Task) -> Self {
        Self {
            editing: Some(task.id.clone()),
            title: task.title.clone(),
            priority: task.priority,
            duration: task.duration_minutes.to_string(),
            energy: task.energy_required,
            deadline: task.deadline.clone().unwrap_or_default(),
            locked: task.is_locked(),
            field: TaskField::Title,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormAction {
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => self.field = self.field.step(true),
            KeyCode::BackTab | KeyCode::Up => self.field = self.field.step(false),
            KeyCode::Backspace => match self.field {
                TaskField::Title => {
                    self.title.pop();
                }
                TaskField::Duration => {
                    self.duration.pop();
                }
                TaskField::Deadline => {
                    self.deadline.pop();
                }
                _ => {}
            },
            KeyCode::Char(c) => match self.field {
                TaskField::Title => self.title.push(c),
                TaskField::Duration if c.is_ascii_digit() => self.duration.push(c),
                TaskField::Deadline if c.is_ascii_digit() || c == ':' => self.deadline.push(c),
                TaskField::Priority if c == ' ' => self.priority = self.priority.next(),
                TaskField::Energy if c == ' ' => self.energy = self.energy.next(),
                TaskField::Locked if c == ' ' => self.locked = !self.locked,
                _ => {}
            },
            _ => {}
        }
        FormAction::Continue
    }

    pub fn to_draft(&self) -> FlowResult<TaskDraft> {
        let duration_minutes = self
            .duration
            .parse::<u32>()
            .map_err(|_| {
                FlowError::InvalidTask("duration must be a whole number of minutes".into())
            })?;
        let deadline = Some(self.deadline.trim().to_string()).filter(|value| !value.is_empty());
        let draft = TaskDraft {
            title: self.title.trim().to_string(),
            priority: self.priority,
            duration_minutes,
            energy_required: self.energy,
            deadline,
            locked: self.locked.then_some(true),
        };
        draft.validate()?;
        Ok(draft)
    }

    pub fn field_value(&self, field: TaskField) -> String {
        match field {
            TaskField::Title => self.title.clone(),
            TaskField::Priority => self.priority.label().to_string(),
            TaskField::Duration => self.duration.clone(),
            TaskField::Energy => self.energy.label().to_string(),
            TaskField::Deadline => self.deadline.clone(),
            TaskField::Locked => String::from(if self.locked { "yes" } else { "no" }),
        }
    }

    pub fn fields(&self) -> &'static [TaskField] {
        &TaskField::ORDER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    WorkStart,
    WorkEnd,
    BreakDuration,
}

impl SettingsField {
    pub const ORDER: [SettingsField; 3] =
        [SettingsField::WorkStart, SettingsField::WorkEnd, SettingsField::BreakDuration];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::WorkStart => "Work start (HH:mm)",
            SettingsField::WorkEnd => "Work end (HH:mm)",
            SettingsField::BreakDuration => "Break (min)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub work_start: String,
    pub work_end: String,
    pub break_duration: String,
    pub field: SettingsField,
}

impl SettingsForm {
    pub fn for_settings(settings: &UserSettings) -> Self {
        Self {
            work_start: settings.work_start.clone(),
            work_end: settings.work_end.clone(),
            break_duration: settings.break_duration.to_string(),
            field: SettingsField::WorkStart,
        }
    }

    fn current_mut(&mut self) -> &mut String {
        match self.field {
            SettingsField::WorkStart => &mut self.work_start,
            SettingsField::WorkEnd => &mut self.work_end,
            SettingsField::BreakDuration => &mut self.break_duration,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormAction {
        let index = SettingsField::ORDER.iter().position(|field| *field == self.field).unwrap_or(0);
        let len = SettingsField::ORDER.len();
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => self.field = SettingsField::ORDER[(index + 1) % len],
            KeyCode::BackTab | KeyCode::Up => {
                self.field = SettingsField::ORDER[(index + len - 1) % len]
            }
            KeyCode::Backspace => {
                self.current_mut().pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == ':' => self.current_mut().push(c),
            _ => {}
        }
        FormAction::Continue
    }

    pub fn field_value(&self, field: SettingsField) -> &str {
        match field {
            SettingsField::WorkStart => &self.work_start,
            SettingsField::WorkEnd => &self.work_end,
            SettingsField::BreakDuration => &self.break_duration,
        }
    }

    pub fn to_settings(&self) -> FlowResult<UserSettings> {
        let break_duration = self.break_duration.parse::<u32>().map_err(|_| {
            FlowError::InvalidSettings("break must be a whole number of minutes".into())
        })?;
        let settings = UserSettings {
            work_start: self.work_start.trim().to_string(),
            work_end: self.work_end.trim().to_string(),
            break_duration,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(form: &mut TaskForm, text: &str) {
        for c in text.chars() {
            form.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn builds_a_draft_from_keystrokes() {
        let mut form = TaskForm::blank();
        type_text(&mut form, "Write report");
        form.handle_key(KeyCode::Tab);
        form.handle_key(KeyCode::Char(' '));
        form.handle_key(KeyCode::Tab);
        form.handle_key(KeyCode::Backspace);
        form.handle_key(KeyCode::Backspace);
        type_text(&mut form, "45x");
        form.handle_key(KeyCode::BackTab);
        form.handle_key(KeyCode::BackTab);
        assert_eq!(form.field, TaskField::Title);

        assert_eq!(form.handle_key(KeyCode::Enter), FormAction::Submit);
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.title, "Write report");
        assert_eq!(draft.priority, Priority::Medium.next());
        assert_eq!(draft.duration_minutes, 45);
        assert_eq!(draft.deadline, None);
        assert_eq!(draft.locked, None);
    }

    #[test]
    fn edit_form_round_trips_a_task() {
        let task = TaskDraft {
            deadline: Some("17:00".into()),
            locked: Some(true),
            ..TaskDraft::new("Standup", Priority::High, 15)
        }
        .into_task("t-1".into());
        let form = TaskForm::for_task(&task);
        assert_eq!(form.editing.as_deref(), Some("t-1"));
        assert_eq!(form.to_draft().unwrap(), task.to_draft());
    }

    #[test]
    fn rejects_blank_title_and_bad_deadline() {
        let form = TaskForm::blank();
        assert!(form.to_draft().is_err());

        let mut form = TaskForm::blank();
        type_text(&mut form, "Gym");
        form.field = TaskField::Deadline;
        type_text(&mut form, "99:99");
        assert!(matches!(form.to_draft(), Err(FlowError::InvalidTask(_))));
    }

    #[test]
    fn settings_form_validates_the_work_day() {
        let mut form = SettingsForm::for_settings(&UserSettings::default());
        for _ in 0..5 {
            form.handle_key(KeyCode::Backspace);
        }
        for c in "07:30".chars() {
            form.handle_key(KeyCode::Char(c));
        }
        assert_eq!(form.to_settings().unwrap().work_start, "07:30");

        form.handle_key(KeyCode::Tab);
        for _ in 0..5 {
            form.handle_key(KeyCode::Backspace);
        }
        for c in "06:00".chars() {
            form.handle_key(KeyCode::Char(c));
        }
        assert!(matches!(form.to_settings(), Err(FlowError::InvalidSettings(_))));
        assert_eq!(form.handle_key(KeyCode::Esc), FormAction::Cancel);
    }
}
