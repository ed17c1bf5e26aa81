mod form;
mod view;

use anyhow::{anyhow, Result};
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::{
    app::{AppCommand, AppEvent, AppState, View},
    planner::PlanRequestBuilder,
    scenarios::SCENARIOS,
};
use form::{FormAction, SettingsForm, TaskForm};

/// What the keyboard currently drives: the main screen or one of the forms.
pub enum Mode {
    Browse,
    Task(TaskForm),
    Settings(SettingsForm),
}

pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
    builder: &PlanRequestBuilder,
) -> Result<()> {
    let mut mode = Mode::Browse;
    loop {
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }

        terminal.draw(|frame| view::draw(frame, app, &mode))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        mode = match mode {
            Mode::Browse => {
                if key.code == KeyCode::Char('q') {
                    break;
                }
                browse_key(key.code, app, &command_tx, builder)?
            }
            Mode::Task(form) => task_form_key(key.code, form, app),
            Mode::Settings(form) => settings_form_key(key.code, form, app),
        };
    }

    info!("leaving FlowState");
    Ok(())
}

fn browse_key(
    code: KeyCode,
    app: &mut AppState,
    command_tx: &UnboundedSender<AppCommand>,
    builder: &PlanRequestBuilder,
) -> Result<Mode> {
    match code {
        KeyCode::Down | KeyCode::Char('j') => app.select_next_task(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous_task(),
        KeyCode::Char('a') => return Ok(Mode::Task(TaskForm::blank())),
        KeyCode::Char('e') => {
            let focused = app.focused_task.clone();
            if let Some(id) = focused {
                if app.begin_edit(&id) {
                    if let Some(task) = app.editing_task() {
                        return Ok(Mode::Task(TaskForm::for_task(task)));
                    }
                }
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.focused_task.clone() {
                app.remove_task(&id);
            }
        }
        KeyCode::Char('w') => {
            return Ok(Mode::Settings(SettingsForm::for_settings(app.settings())));
        }
        KeyCode::Char('m') => {
            let deep = !app.deep_reasoning();
            app.set_deep_reasoning(deep);
        }
        KeyCode::Tab => {
            let next = match app.view() {
                View::Input => View::Plan,
                View::Plan => View::Input,
            };
            app.set_view(next);
        }
        KeyCode::Char('g') => {
            if let Some(ticket) = app.begin_generation() {
                let request = builder.build(
                    &app.task_list(),
                    app.settings(),
                    app.deep_reasoning(),
                    Local::now().time(),
                );
                command_tx
                    .send(AppCommand::GeneratePlan { ticket, request })
                    .map_err(|_| anyhow!("controller stopped"))?;
            }
        }
        KeyCode::Char('r') => {
            if let Some(command) = app.begin_speech() {
                command_tx.send(command).map_err(|_| anyhow!("controller stopped"))?;
            }
        }
        KeyCode::Char(c) => {
            if let Some(scenario) = c
                .to_digit(10)
                .and_then(|digit| (digit as usize).checked_sub(1))
                .and_then(|index| SCENARIOS.get(index))
            {
                app.load_scenario(scenario.id);
            }
        }
        _ => {}
    }
    Ok(Mode::Browse)
}

fn task_form_key(code: KeyCode, mut form: TaskForm, app: &mut AppState) -> Mode {
    match form.handle_key(code) {
        FormAction::Continue => Mode::Task(form),
        FormAction::Cancel => {
            app.cancel_edit();
            Mode::Browse
        }
        FormAction::Submit => {
            let saved = form.to_draft().and_then(|draft| match form.editing.clone() {
                Some(id) => app.update_task(draft.into_task(id)).map(|_| ()),
                None => app.add_task(draft).map(|_| ()),
            });
            match saved {
                Ok(()) => Mode::Browse,
                Err(err) => {
                    app.handle_event(AppEvent::Error(err.to_string()));
                    Mode::Task(form)
                }
            }
        }
    }
}

fn settings_form_key(code: KeyCode, mut form: SettingsForm, app: &mut AppState) -> Mode {
    match form.handle_key(code) {
        FormAction::Continue => Mode::Settings(form),
        FormAction::Cancel => Mode::Browse,
        FormAction::Submit => {
            match form.to_settings().and_then(|settings| app.update_settings(settings)) {
                Ok(()) => {
                    app.push_status_line("Work day updated".to_string());
                    Mode::Browse
                }
                Err(err) => {
                    app.handle_event(AppEvent::Error(err.to_string()));
                    Mode::Settings(form)
                }
            }
        }
    }
}
