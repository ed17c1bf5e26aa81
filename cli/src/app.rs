use indexmap::{map::Values, IndexMap};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{FlowError, FlowResult},
    planner::PlanRequest,
    scenarios,
    types::{DailyPlan, Task, TaskDraft, UserSettings},
};

const MAX_STATUS_LINES: usize = 8;

pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate plan. Please try again or check your API key.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Input,
    Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStatus {
    Idle,
    Generating,
    Playing,
}

/// Claim on the single generation slot. `revision` is the input revision the
/// request was built from; a result for an older revision is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    revision: u64,
}

/// Claim on the read-aloud slot. Status events from any other session are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechTicket(pub(crate) u64);

#[derive(Debug)]
pub struct AppState {
    tasks: IndexMap<String, Task>,
    settings: UserSettings,
    plan: Option<DailyPlan>,
    deep_reasoning: bool,
    error: Option<String>,
    editing: Option<String>,
    view: View,
    speech: SpeechStatus,
    pub focused_task: Option<String>,
    pub status_lines: Vec<String>,
    revision: u64,
    next_ticket: u64,
    in_flight: Option<GenerationTicket>,
    next_speech: u64,
    speech_session: Option<SpeechTicket>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_tasks(config.settings().clone(), scenarios::initial_tasks())
    }

    pub fn with_tasks(settings: UserSettings, drafts: Vec<TaskDraft>) -> Self {
        let mut state = Self {
            tasks: IndexMap::new(),
            settings,
            plan: None,
            deep_reasoning: false,
            error: None,
            editing: None,
            view: View::Input,
            speech: SpeechStatus::Idle,
            focused_task: None,
            status_lines: Vec::new(),
            revision: 0,
            next_ticket: 0,
            in_flight: None,
            next_speech: 0,
            speech_session: None,
        };
        state.replace_tasks(drafts);
        state
    }

    pub fn tasks(&self) -> Values<'_, String, Task> {
        self.tasks.values()
    }

    pub fn task_list(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn plan(&self) -> Option<&DailyPlan> {
        self.plan.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn speech(&self) -> SpeechStatus {
        self.speech
    }

    pub fn deep_reasoning(&self) -> bool {
        self.deep_reasoning
    }

    pub fn set_deep_reasoning(&mut self, enabled: bool) {
        self.deep_reasoning = enabled;
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn editing_task(&self) -> Option<&Task> {
        self.editing.as_deref().and_then(|id| self.tasks.get(id))
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> FlowResult<String> {
        draft.validate()?;
        let id = Uuid::new_v4().to_string();
        info!(task_id = %id, title = %draft.title, "adding task");
        self.tasks.insert(id.clone(), draft.into_task(id.clone()));
        self.invalidate_plan();
        Ok(id)
    }

    /// Replaces the task with the same id in place. Returns whether a task
    /// matched; an unknown id leaves the list as it was.
    pub fn update_task(&mut self, task: Task) -> FlowResult<bool> {
        task.to_draft().validate()?;
        self.editing = None;
        let replaced = match self.tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => {
                warn!(task_id = %task.id, "update for unknown task ignored");
                false
            }
        };
        self.invalidate_plan();
        Ok(replaced)
    }

    pub fn remove_task(&mut self, id: &str) -> bool {
        let removed = self.tasks.shift_remove(id).is_some();
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        if self.focused_task.as_deref() == Some(id) {
            self.focused_task = self.tasks.keys().next().cloned();
        }
        self.invalidate_plan();
        removed
    }

    /// Unknown ids are ignored and leave every piece of state untouched.
    pub fn load_scenario(&mut self, scenario_id: &str) -> bool {
        let Some(scenario) = scenarios::find(scenario_id) else {
            return false;
        };
        info!(scenario = scenario.id, tasks = scenario.tasks.len(), "loading scenario");
        self.replace_tasks(scenario.tasks.clone());
        self.editing = None;
        self.invalidate_plan();
        self.push_status_line(format!("Loaded {} preset", scenario.name));
        true
    }

    pub fn update_settings(&mut self, settings: UserSettings) -> FlowResult<()> {
        settings.validate()?;
        self.settings = settings;
        self.invalidate_plan();
        Ok(())
    }

    pub fn begin_edit(&mut self, id: &str) -> bool {
        if self.tasks.contains_key(id) {
            self.editing = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Claims the generation slot. Returns `None` while another request is
    /// outstanding.
    pub fn begin_generation(&mut self) -> Option<GenerationTicket> {
        if self.in_flight.is_some() {
            self.push_status_line("Plan generation already in progress".to_string());
            return None;
        }
        self.next_ticket += 1;
        let ticket = GenerationTicket { id: self.next_ticket, revision: self.revision };
        self.in_flight = Some(ticket);
        self.error = None;
        info!(ticket = ticket.id, deep = self.deep_reasoning, "plan generation started");
        Some(ticket)
    }

    pub fn finish_generation(&mut self, ticket: GenerationTicket, outcome: FlowResult<DailyPlan>) {
        if self.in_flight != Some(ticket) {
            warn!(ticket = ticket.id, "ignoring result for a ticket that is not in flight");
            return;
        }
        self.in_flight = None;

        if ticket.revision != self.revision {
            info!(ticket = ticket.id, "inputs changed during generation, discarding result");
            self.push_status_line("Tasks changed while planning; result discarded".to_string());
            return;
        }

        match outcome {
            Ok(plan) => {
                info!(blocks = plan.schedule.len(), "plan stored");
                self.push_status_line(format!(
                    "Plan ready: {} blocks, {} deferred",
                    plan.schedule.len(),
                    plan.deferred_tasks.len()
                ));
                self.plan = Some(plan);
                self.view = View::Plan;
            }
            Err(err) => {
                error!(error = %err, retryable = err.is_retryable(), "plan generation failed");
                let hint = if err.is_retryable() {
                    "press g to try again"
                } else {
                    "check the API key and config"
                };
                self.error = Some(GENERATION_FAILED_MESSAGE.to_string());
                self.push_status_line(format!("Error: {err} ({hint})"));
            }
        }
    }

    /// Claims the read-aloud slot and marks speech busy straight away.
    /// Returns `None` when there is no plan or a narration is still running.
    pub fn begin_speech(&mut self) -> Option<AppCommand> {
        if self.speech_session.is_some() {
            return None;
        }
        let plan = self.plan.clone()?;
        self.next_speech += 1;
        let ticket = SpeechTicket(self.next_speech);
        self.speech_session = Some(ticket);
        self.speech = SpeechStatus::Generating;
        Some(AppCommand::ReadPlan { ticket, plan })
    }

    fn apply_speech_status(&mut self, ticket: SpeechTicket, status: SpeechStatus) {
        if self.speech_session != Some(ticket) {
            debug!(session = ticket.0, ?status, "ignoring status from a finished speech session");
            return;
        }
        self.speech = status;
        if status == SpeechStatus::Idle {
            self.speech_session = None;
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Info(message) => self.push_status_line(message),
            AppEvent::Error(message) => self.push_status_line(format!("Error: {message}")),
            AppEvent::PlanGenerated { ticket, plan } => self.finish_generation(ticket, Ok(plan)),
            AppEvent::PlanFailed { ticket, error } => self.finish_generation(ticket, Err(error)),
            AppEvent::Speech { ticket, status } => self.apply_speech_status(ticket, status),
        }
    }

    pub fn push_status_line(&mut self, line: String) {
        self.status_lines.push(line);
        if self.status_lines.len() > MAX_STATUS_LINES {
            let overflow = self.status_lines.len() - MAX_STATUS_LINES;
            self.status_lines.drain(0..overflow);
        }
    }

    pub fn select_next_task(&mut self) {
        if self.tasks.is_empty() {
            self.focused_task = None;
            return;
        }
        let next_index = self
            .focused_task
            .as_ref()
            .and_then(|id| self.tasks.get_index_of(id))
            .map(|idx| (idx + 1) % self.tasks.len())
            .unwrap_or(0);
        if let Some((id, _)) = self.tasks.get_index(next_index) {
            self.focused_task = Some(id.clone());
        }
    }

    pub fn select_previous_task(&mut self) {
        if self.tasks.is_empty() {
            self.focused_task = None;
            return;
        }
        let len = self.tasks.len();
        let prev_index = self
            .focused_task
            .as_ref()
            .and_then(|id| self.tasks.get_index_of(id))
            .map(|idx| if idx == 0 { len - 1 } else { idx - 1 })
            .unwrap_or(len - 1);
        if let Some((id, _)) = self.tasks.get_index(prev_index) {
            self.focused_task = Some(id.clone());
        }
    }

    fn replace_tasks(&mut self, drafts: Vec<TaskDraft>) {
        self.tasks = drafts
            .into_iter()
            .map(|draft| {
                let id = Uuid::new_v4().to_string();
                (id.clone(), draft.into_task(id))
            })
            .collect();
        self.focused_task = self.tasks.keys().next().cloned();
    }

    fn invalidate_plan(&mut self) {
        self.plan = None;
        self.revision += 1;
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Info(String),
    Error(String),
    PlanGenerated { ticket: GenerationTicket, plan: DailyPlan },
    PlanFailed { ticket: GenerationTicket, error: FlowError },
    Speech { ticket: SpeechTicket, status: SpeechStatus },
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    GeneratePlan { ticket: GenerationTicket, request: PlanRequest },
    ReadPlan { ticket: SpeechTicket, plan: DailyPlan },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnergyLevel, PlanMetrics, Priority};
    use std::collections::HashSet;

    fn sample_plan() -> DailyPlan {
        DailyPlan {
            schedule: vec![],
            metrics: PlanMetrics {
                total_focus_hours: 5.0,
                confidence_score: 80.0,
                utilization_rate: 60.0,
            },
            deferred_tasks: vec![],
        }
    }

    fn state() -> AppState {
        AppState::with_tasks(UserSettings::default(), scenarios::initial_tasks())
    }

    fn state_with_plan() -> AppState {
        let mut state = state();
        let ticket = state.begin_generation().unwrap();
        state.finish_generation(ticket, Ok(sample_plan()));
        assert!(state.plan().is_some());
        state
    }

    fn ids(state: &AppState) -> Vec<String> {
        state.tasks().map(|task| task.id.clone()).collect()
    }

    #[test]
    fn every_task_mutation_clears_the_plan() {
        let mut s = state_with_plan();
        s.add_task(TaskDraft::new("Write tests", Priority::High, 30)).unwrap();
        assert!(s.plan().is_none());

        let mut s = state_with_plan();
        let mut task = s.tasks().next().unwrap().clone();
        task.title = "Renamed".into();
        s.update_task(task).unwrap();
        assert!(s.plan().is_none());

        let mut s = state_with_plan();
        let first = ids(&s)[0].clone();
        s.remove_task(&first);
        assert!(s.plan().is_none());

        let mut s = state_with_plan();
        assert!(s.load_scenario("student_finals"));
        assert!(s.plan().is_none());

        let mut s = state_with_plan();
        s.update_task(TaskDraft::new("Ghost", Priority::Low, 5).into_task("missing".into()))
            .unwrap();
        assert!(s.plan().is_none());
    }

    #[test]
    fn add_task_appends_with_fresh_id() {
        let mut s = state();
        let before = ids(&s);
        let id = s.add_task(TaskDraft::new("Write tests", Priority::High, 30)).unwrap();
        let after = ids(&s);

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last(), Some(&id));
        assert!(!before.contains(&id));
    }

    #[test]
    fn add_task_rejects_invalid_draft_without_mutation() {
        let mut s = state_with_plan();
        let before = ids(&s);
        assert!(s.add_task(TaskDraft::new("", Priority::High, 30)).is_err());
        assert_eq!(ids(&s), before);
        assert!(s.plan().is_some());
    }

    #[test]
    fn update_task_replaces_in_place_and_leaves_edit_mode() {
        let mut s = state();
        let target = ids(&s)[2].clone();
        assert!(s.begin_edit(&target));
        assert_eq!(s.editing_task().map(|task| task.id.as_str()), Some(target.as_str()));

        let mut task = s.task(&target).unwrap().clone();
        task.title = "Inbox zero".into();
        task.energy_required = EnergyLevel::High;
        assert!(s.update_task(task).unwrap());

        assert_eq!(ids(&s)[2], target);
        assert_eq!(s.task(&target).unwrap().title, "Inbox zero");
        assert!(s.editing_task().is_none());
    }

    #[test]
    fn update_with_unknown_id_changes_nothing_but_edit_marker() {
        let mut s = state();
        let before = s.task_list();
        let first = before[0].id.clone();
        s.begin_edit(&first);

        let ghost = TaskDraft::new("Ghost", Priority::Low, 5).into_task("missing".into());
        assert!(!s.update_task(ghost).unwrap());
        assert_eq!(s.task_list(), before);
        assert!(s.editing_task().is_none());
    }

    #[test]
    fn removing_the_edited_task_clears_edit_mode() {
        let mut s = state();
        let all = ids(&s);
        s.begin_edit(&all[1]);
        assert!(s.remove_task(&all[0]));
        assert!(s.editing_task().is_some());
        assert!(s.remove_task(&all[1]));
        assert!(s.editing_task().is_none());
        assert_eq!(s.task_count(), all.len() - 2);
        assert!(!s.remove_task("missing"));
    }

    #[test]
    fn unknown_scenario_is_a_no_op() {
        let mut s = state_with_plan();
        let tasks = s.task_list();
        let settings = s.settings().clone();
        let plan = s.plan().cloned();

        assert!(!s.load_scenario("astronaut"));
        assert_eq!(s.task_list(), tasks);
        assert_eq!(s.settings(), &settings);
        assert_eq!(s.plan().cloned(), plan);
    }

    #[test]
    fn dev_sprint_replaces_tasks_with_fresh_ids() {
        let mut s = state_with_plan();
        let previous: HashSet<String> = ids(&s).into_iter().collect();
        s.begin_edit(&ids(&s)[0]);

        assert!(s.load_scenario("dev_sprint"));

        let titles: Vec<_> = s.tasks().map(|task| task.title.clone()).collect();
        assert_eq!(
            titles,
            vec![
                "Fix Critical Auth Bug",
                "Daily Standup",
                "Code Review (Team PRs)",
                "Feature Implementation: Dark Mode",
                "Update Documentation",
                "Deployment Pipeline Check",
            ]
        );
        let fresh: HashSet<String> = ids(&s).into_iter().collect();
        assert_eq!(fresh.len(), 6);
        assert!(fresh.is_disjoint(&previous));
        assert!(s.plan().is_none());
        assert!(s.editing_task().is_none());

        let preset = scenarios::find("dev_sprint").unwrap();
        for (task, draft) in s.tasks().zip(&preset.tasks) {
            assert_eq!(&task.to_draft(), draft);
        }
    }

    #[test]
    fn second_generation_is_rejected_while_in_flight() {
        let mut s = state();
        let first = s.begin_generation().unwrap();
        assert!(s.is_generating());
        assert!(s.begin_generation().is_none());

        s.finish_generation(first, Ok(sample_plan()));
        assert!(!s.is_generating());
        assert!(s.begin_generation().is_some());
    }

    #[test]
    fn success_stores_plan_and_switches_view() {
        let mut s = state();
        let ticket = s.begin_generation().unwrap();
        s.handle_event(AppEvent::PlanGenerated { ticket, plan: sample_plan() });
        assert_eq!(s.plan(), Some(&sample_plan()));
        assert_eq!(s.view(), View::Plan);
        assert!(s.error().is_none());
    }

    #[test]
    fn failure_keeps_previous_plan_and_sets_message() {
        let mut s = state_with_plan();
        s.set_view(View::Input);
        let ticket = s.begin_generation().unwrap();
        s.handle_event(AppEvent::PlanFailed {
            ticket,
            error: FlowError::MalformedPlan("expected value".into()),
        });
        assert_eq!(s.plan(), Some(&sample_plan()));
        assert_eq!(s.error(), Some(GENERATION_FAILED_MESSAGE));
        assert_eq!(s.view(), View::Input);
        assert!(!s.is_generating());

        let ticket = s.begin_generation().unwrap();
        assert!(s.error().is_none());
        s.finish_generation(ticket, Err(FlowError::EmptyResponse));
        assert_eq!(s.plan(), Some(&sample_plan()));
    }

    #[test]
    fn result_for_changed_inputs_is_discarded() {
        let mut s = state();
        let ticket = s.begin_generation().unwrap();
        s.add_task(TaskDraft::new("Late addition", Priority::Medium, 20)).unwrap();
        s.finish_generation(ticket, Ok(sample_plan()));

        assert!(s.plan().is_none());
        assert!(!s.is_generating());
        assert!(s.error().is_none());
        assert_eq!(s.view(), View::Input);
    }

    #[test]
    fn result_for_unknown_ticket_is_ignored() {
        let mut s = state();
        let ticket = s.begin_generation().unwrap();
        s.finish_generation(ticket, Ok(sample_plan()));
        s.set_view(View::Input);

        s.finish_generation(ticket, Err(FlowError::EmptyResponse));
        assert!(s.error().is_none());
        assert!(s.plan().is_some());
    }

    #[test]
    fn settings_change_invalidates_plan() {
        let mut s = state_with_plan();
        let settings = UserSettings {
            work_start: "07:00".into(),
            work_end: "15:00".into(),
            break_duration: 30,
        };
        s.update_settings(settings.clone()).unwrap();
        assert_eq!(s.settings(), &settings);
        assert!(s.plan().is_none());

        let mut s = state_with_plan();
        let inverted = UserSettings { work_start: "20:00".into(), ..UserSettings::default() };
        assert!(s.update_settings(inverted).is_err());
        assert!(s.plan().is_some());
    }

    fn speech_ticket(command: Option<AppCommand>) -> SpeechTicket {
        match command {
            Some(AppCommand::ReadPlan { ticket, .. }) => ticket,
            other => panic!("expected a read command, got {other:?}"),
        }
    }

    #[test]
    fn read_aloud_needs_a_plan() {
        let mut s = state();
        assert!(s.begin_speech().is_none());
        assert_eq!(s.speech(), SpeechStatus::Idle);

        let mut s = state_with_plan();
        assert!(matches!(s.begin_speech(), Some(AppCommand::ReadPlan { .. })));
    }

    #[test]
    fn read_aloud_is_claimed_before_any_event_arrives() {
        let mut s = state_with_plan();
        let ticket = speech_ticket(s.begin_speech());
        assert_eq!(s.speech(), SpeechStatus::Generating);
        assert!(s.begin_speech().is_none());

        s.handle_event(AppEvent::Speech { ticket, status: SpeechStatus::Playing });
        assert!(s.begin_speech().is_none());
        s.handle_event(AppEvent::Speech { ticket, status: SpeechStatus::Idle });
        assert_eq!(s.speech(), SpeechStatus::Idle);
        assert!(s.begin_speech().is_some());
    }

    #[test]
    fn idle_from_an_older_session_does_not_release_the_current_one() {
        let mut s = state_with_plan();
        let first = speech_ticket(s.begin_speech());
        s.handle_event(AppEvent::Speech { ticket: first, status: SpeechStatus::Idle });
        let second = speech_ticket(s.begin_speech());
        s.handle_event(AppEvent::Speech { ticket: second, status: SpeechStatus::Playing });

        s.handle_event(AppEvent::Speech { ticket: first, status: SpeechStatus::Idle });
        assert_eq!(s.speech(), SpeechStatus::Playing);
        assert!(s.begin_speech().is_none());
    }

    #[test]
    fn failure_hint_follows_retryability() {
        let mut s = state();
        let ticket = s.begin_generation().unwrap();
        s.finish_generation(
            ticket,
            Err(FlowError::Api { status: 401, message: "API key not valid".into() }),
        );
        assert!(s.status_lines.last().unwrap().ends_with("(check the API key and config)"));

        let ticket = s.begin_generation().unwrap();
        s.finish_generation(ticket, Err(FlowError::EmptyResponse));
        assert!(s.status_lines.last().unwrap().ends_with("(press g to try again)"));
        assert_eq!(s.error(), Some(GENERATION_FAILED_MESSAGE));
    }

    #[test]
    fn task_selection_wraps_around() {
        let mut s = state();
        let all = ids(&s);
        assert_eq!(s.focused_task.as_ref(), Some(&all[0]));
        s.select_previous_task();
        assert_eq!(s.focused_task.as_ref(), all.last());
        s.select_next_task();
        assert_eq!(s.focused_task.as_ref(), Some(&all[0]));
    }

    #[test]
    fn status_lines_are_bounded() {
        let mut s = state();
        for index in 0..20 {
            s.push_status_line(format!("line {index}"));
        }
        assert_eq!(s.status_lines.len(), MAX_STATUS_LINES);
        assert_eq!(s.status_lines.last().map(String::as_str), Some("line 19"));
    }
}
