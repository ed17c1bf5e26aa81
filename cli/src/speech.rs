use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::{
    api::PlanService,
    app::{AppEvent, SpeechStatus, SpeechTicket},
    audio::{decode_pcm16, AudioOutput, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE},
    error::{FlowError, FlowResult},
    types::DailyPlan,
};

const FALLBACK_START: &str = "9 AM";
const FALLBACK_END: &str = "6 PM";
const FALLBACK_FIRST_TASK: &str = "your first task";

/// Spoken narration for a plan.
pub fn plan_summary(plan: &DailyPlan) -> String {
    let first = plan.first_block();
    let start = first.map(|block| block.start_time.as_str()).unwrap_or(FALLBACK_START);
    let first_title = first.map(|block| block.title.as_str()).unwrap_or(FALLBACK_FIRST_TASK);
    let end = plan.last_block().map(|block| block.end_time.as_str()).unwrap_or(FALLBACK_END);

    format!(
        "Here is your optimal schedule for today. \
         I have planned {tasks} tasks with {hours} hours of focus time. \
         Your confidence score is {confidence} percent. You start at {start} with {first_title}. \
         Your day is scheduled to end at {end}. Have a productive day!",
        tasks = plan.task_block_count(),
        hours = plan.metrics.total_focus_hours,
        confidence = plan.metrics.confidence_score,
    )
}

/// Reports speech progress to the UI. Dropping the session always reports
/// `Idle`, so every exit path leaves the read-aloud control usable again.
struct SpeechSession {
    ticket: SpeechTicket,
    events: UnboundedSender<AppEvent>,
}

impl SpeechSession {
    fn start(ticket: SpeechTicket, events: UnboundedSender<AppEvent>) -> Self {
        let session = Self { ticket, events };
        session.report(SpeechStatus::Generating);
        session
    }

    fn report(&self, status: SpeechStatus) {
        let _ = self.events.send(AppEvent::Speech { ticket: self.ticket, status });
    }
}

impl Drop for SpeechSession {
    fn drop(&mut self) {
        self.report(SpeechStatus::Idle);
    }
}

#[derive(Clone)]
pub struct SpeechBridge {
    service: Arc<dyn PlanService>,
    output: Arc<dyn AudioOutput>,
}

impl SpeechBridge {
    pub fn new(service: Arc<dyn PlanService>, output: Arc<dyn AudioOutput>) -> Self {
        Self { service, output }
    }

    /// Narrates `plan` end to end. Failures are logged and surfaced as a
    /// status line; they never reach the caller.
    pub async fn read_plan(
        &self,
        plan: &DailyPlan,
        ticket: SpeechTicket,
        events: UnboundedSender<AppEvent>,
    ) {
        let session = SpeechSession::start(ticket, events.clone());
        match self.speak(plan, &session).await {
            Ok(()) => info!("finished reading plan aloud"),
            Err(err) => {
                error!(error = %err, "failed to read plan aloud");
                let _ = events.send(AppEvent::Error(format!("Could not read plan aloud: {err}")));
            }
        }
        drop(session);
    }

    async fn speak(&self, plan: &DailyPlan, session: &SpeechSession) -> FlowResult<()> {
        let summary = plan_summary(plan);
        let encoded = self.service.synthesize_speech(&summary).await?.ok_or_else(|| {
            warn!("speech synthesis returned no audio");
            FlowError::EmptyResponse
        })?;
        let buffer = decode_pcm16(&encoded, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)?;
        info!(frames = buffer.frame_count(), "playing plan narration");

        session.report(SpeechStatus::Playing);
        let output = Arc::clone(&self.output);
        tokio::task::spawn_blocking(move || output.play_to_end(&buffer))
            .await
            .map_err(|err| FlowError::PlaybackFailure(format!("playback task failed: {err}")))?
    }
}
