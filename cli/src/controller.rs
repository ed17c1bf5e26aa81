use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    time::{sleep, Instant},
};
use tracing::{error, info};

use crate::{
    api::PlanService,
    app::{AppCommand, AppEvent, GenerationTicket},
    audio::AudioOutput,
    error::FlowResult,
    planner::PlanRequest,
    response::parse_plan,
    speech::SpeechBridge,
    types::DailyPlan,
};

/// Runs service work off the UI thread and reports back through `AppEvent`s.
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    service: Arc<dyn PlanService>,
    speech: SpeechBridge,
    event_tx: UnboundedSender<AppEvent>,
    min_latency: Duration,
}

impl Controller {
    pub fn new(
        service: Arc<dyn PlanService>,
        output: Arc<dyn AudioOutput>,
        event_tx: UnboundedSender<AppEvent>,
        min_latency: Duration,
    ) -> Self {
        let speech = SpeechBridge::new(Arc::clone(&service), output);
        let inner = ControllerInner { service, speech, event_tx, min_latency };
        Self { inner: Arc::new(inner) }
    }

    /// Each command gets its own task so narration never holds up planning.
    pub fn spawn(
        self,
        mut command_rx: UnboundedReceiver<AppCommand>,
    ) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let inner = inner.clone();
                tokio::spawn(Controller::handle_command(inner, command));
            }
        })
    }

    async fn handle_command(inner: Arc<ControllerInner>, command: AppCommand) {
        match command {
            AppCommand::GeneratePlan { ticket, request } => {
                Controller::generate(inner, ticket, request).await;
            }
            AppCommand::ReadPlan { ticket, plan } => {
                inner.speech.read_plan(&plan, ticket, inner.event_tx.clone()).await;
            }
        }
    }

    async fn generate(inner: Arc<ControllerInner>, ticket: GenerationTicket, request: PlanRequest) {
        let _ = inner.event_tx.send(AppEvent::Info(format!(
            "Planning {} ({} mode)...",
            request.model,
            request.profile.label()
        )));
        let event = match generate_plan(inner.service.as_ref(), &request, inner.min_latency).await {
            Ok(plan) => AppEvent::PlanGenerated { ticket, plan },
            Err(error) => {
                error!(error = %error, model = %request.model, "plan request failed");
                AppEvent::PlanFailed { ticket, error }
            }
        };
        let _ = inner.event_tx.send(event);
    }
}

/// Issues `request` and parses the reply. Resolves no sooner than
/// `min_latency` after the call, whether it succeeds or fails.
pub async fn generate_plan(
    service: &dyn PlanService,
    request: &PlanRequest,
    min_latency: Duration,
) -> FlowResult<DailyPlan> {
    let started = Instant::now();
    let (reply, ()) = tokio::join!(service.generate_plan_text(request), sleep(min_latency));
    let plan = parse_plan(reply?.as_deref());
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = plan.is_ok(),
        "plan request settled"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockPlanService;
    use crate::app::{AppState, SpeechStatus};
    use crate::audio::PcmBuffer;
    use crate::error::FlowError;
    use crate::planner::PlanRequestBuilder;
    use crate::scenarios;
    use crate::types::UserSettings;
    use chrono::NaiveTime;
    use serde_json::json;
    use tokio::sync::mpsc;

    const FLOOR: Duration = Duration::from_millis(800);

    struct SilentOutput;

    impl AudioOutput for SilentOutput {
        fn play_to_end(&self, _buffer: &PcmBuffer) -> FlowResult<()> {
            Ok(())
        }
    }

    fn plan_json() -> String {
        json!({
            "schedule": [{
                "id": "b1", "startTime": "09:00", "endTime": "10:00",
                "title": "Fix Critical Auth Bug", "type": "task", "reasoning": "fresh"
            }],
            "metrics": { "totalFocusHours": 1, "confidenceScore": 90, "utilizationRate": 11 },
            "deferredTasks": []
        })
        .to_string()
    }

    fn request(state: &AppState) -> PlanRequest {
        PlanRequestBuilder::default().build(
            &state.task_list(),
            state.settings(),
            state.deep_reasoning(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fast_replies_wait_for_the_floor() {
        let service = MockPlanService::new().push_plan(Ok(Some(plan_json())));
        let state = AppState::with_tasks(UserSettings::default(), scenarios::initial_tasks());

        let started = Instant::now();
        let plan = generate_plan(&service, &request(&state), FLOOR).await.unwrap();
        assert!(started.elapsed() >= FLOOR);
        assert_eq!(plan.schedule.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_also_wait_for_the_floor() {
        let service = MockPlanService::new().push_plan(Err(FlowError::Api {
            status: 401,
            message: "API key not valid".into(),
        }));
        let state = AppState::with_tasks(UserSettings::default(), vec![]);

        let started = Instant::now();
        let err = generate_plan(&service, &request(&state), FLOOR).await.unwrap_err();
        assert!(started.elapsed() >= FLOOR);
        assert!(matches!(err, FlowError::Api { status: 401, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_replies_are_not_padded() {
        let service = MockPlanService::new()
            .with_delay(Duration::from_secs(3))
            .push_plan(Ok(Some(plan_json())));
        let state = AppState::with_tasks(UserSettings::default(), vec![]);

        let started = Instant::now();
        generate_plan(&service, &request(&state), FLOOR).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(3) + FLOOR);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_and_malformed_replies_map_to_errors() {
        let service = MockPlanService::new()
            .push_plan(Ok(None))
            .push_plan(Ok(Some("I could not plan that".into())));
        let state = AppState::with_tasks(UserSettings::default(), vec![]);
        let request = request(&state);

        assert!(matches!(
            generate_plan(&service, &request, FLOOR).await,
            Err(FlowError::EmptyResponse)
        ));
        assert!(matches!(
            generate_plan(&service, &request, FLOOR).await,
            Err(FlowError::MalformedPlan(_))
        ));
        assert_eq!(service.plan_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_flow_back_into_state() {
        let service = Arc::new(MockPlanService::new().push_plan(Ok(Some(plan_json()))));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Controller::new(service.clone(), Arc::new(SilentOutput), event_tx, FLOOR).spawn(command_rx);

        let mut state = AppState::with_tasks(UserSettings::default(), scenarios::initial_tasks());
        let ticket = state.begin_generation().unwrap();
        command_tx.send(AppCommand::GeneratePlan { ticket, request: request(&state) }).unwrap();

        while state.is_generating() {
            let event = event_rx.recv().await.unwrap();
            state.handle_event(event);
        }
        assert!(state.plan().is_some());
        assert!(state.error().is_none());
        assert_eq!(service.plan_calls(), 1);
    }

    struct SlowOutput;

    impl AudioOutput for SlowOutput {
        fn play_to_end(&self, _buffer: &PcmBuffer) -> FlowResult<()> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        }
    }

    fn state_with_plan() -> AppState {
        let mut state = AppState::with_tasks(UserSettings::default(), vec![]);
        let ticket = state.begin_generation().unwrap();
        state.finish_generation(ticket, parse_plan(Some(&plan_json())));
        state
    }

    #[tokio::test]
    async fn read_plan_command_ends_idle() {
        let service = Arc::new(MockPlanService::new().push_speech(Ok(Some("AAABAA==".into()))));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Controller::new(service, Arc::new(SilentOutput), event_tx, FLOOR).spawn(command_rx);

        let mut state = state_with_plan();
        command_tx.send(state.begin_speech().unwrap()).unwrap();

        let mut seen = Vec::new();
        while seen.last() != Some(&SpeechStatus::Idle) {
            if let Some(event) = event_rx.recv().await {
                if let AppEvent::Speech { status, .. } = event {
                    seen.push(status);
                }
                state.handle_event(event);
            }
        }
        assert_eq!(seen, vec![SpeechStatus::Generating, SpeechStatus::Playing, SpeechStatus::Idle]);
        assert_eq!(state.speech(), SpeechStatus::Idle);
    }

    #[tokio::test]
    async fn repeated_presses_during_narration_start_one_session() {
        let service = Arc::new(
            MockPlanService::new()
                .push_speech(Ok(Some("AAABAA==".into())))
                .push_speech(Ok(Some("AAABAA==".into()))),
        );
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Controller::new(service.clone(), Arc::new(SlowOutput), event_tx, FLOOR).spawn(command_rx);

        let mut state = state_with_plan();
        command_tx.send(state.begin_speech().unwrap()).unwrap();
        assert!(state.begin_speech().is_none());

        let mut sent = 1;
        while state.speech() != SpeechStatus::Idle {
            if let Some(command) = state.begin_speech() {
                command_tx.send(command).unwrap();
                sent += 1;
            }
            if let Some(event) = event_rx.recv().await {
                state.handle_event(event);
            }
        }
        assert_eq!(sent, 1);
        assert_eq!(service.speech_calls(), 1);
        assert!(state.begin_speech().is_some());
    }
}
