use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::Path, sync::Arc};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

use flowstate::{
    api::GeminiClient,
    app::{AppEvent, AppState},
    audio::RodioOutput,
    config::AppConfig,
    controller::Controller,
    logging,
    planner::PlanRequestBuilder,
    ui,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_dir = logging::init_logging()?;
    info!("starting FlowState");

    let config = AppConfig::load()?;
    let client = GeminiClient::new(&config).context("failed to set up the Gemini client")?;
    let builder = PlanRequestBuilder::new(config.models().clone());

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller = Controller::new(
        Arc::new(client.clone()),
        Arc::new(RodioOutput),
        event_tx,
        config.min_latency(),
    );
    controller.spawn(command_rx);

    let mut app_state = AppState::new(&config);
    seed_status(&client, &config, &log_dir, &mut app_state);

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(&mut terminal, &mut app_state, &mut event_rx, command_tx, &builder);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    ui_result
}

fn seed_status(client: &GeminiClient, config: &AppConfig, log_dir: &Path, app: &mut AppState) {
    let models = config.models();
    app.handle_event(AppEvent::Info(format!(
        "Models: fast {} / deep {} / voice {} ({}) @ {}",
        models.fast_model,
        models.deep_model,
        config.speech_model(),
        config.voice(),
        client.base_url()
    )));
    app.handle_event(AppEvent::Info(format!("Logs: {}", log_dir.display())));
}
