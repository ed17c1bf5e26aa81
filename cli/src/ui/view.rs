use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{
    form::{SettingsField, SettingsForm, TaskForm},
    Mode,
};
use crate::{
    app::{AppState, SpeechStatus, View},
    scenarios::SCENARIOS,
    types::{BlockType, DailyPlan, Priority},
};

const KEY_HELP: &str = "a add | e edit | d delete | 1-8 preset | w work day | m mode \
                        | g generate | r read | tab view | q quit";

pub fn draw(frame: &mut Frame, app: &AppState, mode: &Mode) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(7)])
        .split(frame.size());

    render_header(frame, rows[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);
    render_tasks(frame, body[0], app);
    match (app.view(), app.plan()) {
        (View::Plan, Some(plan)) => render_plan(frame, body[1], plan),
        _ => render_presets(frame, body[1], app),
    }

    render_status(frame, rows[2], app);

    match mode {
        Mode::Browse => {}
        Mode::Task(form) => render_task_form(frame, form),
        Mode::Settings(form) => render_settings_form(frame, form),
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &AppState) {
    let mode = if app.deep_reasoning() { "Deep reasoning" } else { "Fast" };
    let activity = if app.is_generating() {
        if app.deep_reasoning() {
            "Thinking deeply..."
        } else {
            "Optimizing..."
        }
    } else {
        match app.speech() {
            SpeechStatus::Generating => "Preparing narration...",
            SpeechStatus::Playing => "Reading plan aloud...",
            SpeechStatus::Idle => "Ready",
        }
    };
    let settings = app.settings();
    let line = Line::from(vec![
        Span::styled("FlowState", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "  | {mode} | work day {} - {} | break {} min | ",
            settings.work_start, settings.work_end, settings.break_duration
        )),
        Span::styled(activity, Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn render_tasks(frame: &mut Frame, area: Rect, app: &AppState) {
    let mut lines = Vec::new();
    for task in app.tasks() {
        let focused = app.focused_task.as_deref() == Some(task.id.as_str());
        let marker = if focused { "> " } else { "  " };
        let mut title_style = Style::default();
        if focused {
            title_style = title_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
        }
        let mut spans = vec![
            Span::raw(marker),
            Span::styled(
                format!("[{}] ", task.priority.label()),
                Style::default().fg(priority_color(task.priority)),
            ),
            Span::styled(task.title.clone(), title_style),
            Span::raw(format!("  {}m {}", task.duration_minutes, task.energy_required.label())),
        ];
        if let Some(deadline) = &task.deadline {
            spans.push(Span::raw(format!(" due {deadline}")));
        }
        if task.is_locked() {
            spans.push(Span::styled(" locked", Style::default().fg(Color::Magenta)));
        }
        lines.push(Line::from(spans));
    }
    if lines.is_empty() {
        lines.push(Line::from("No tasks yet. Press 'a' to add one."));
    }

    let editing = app
        .editing_task()
        .map(|task| format!(" (editing {})", task.title))
        .unwrap_or_default();
    let block = Block::default()
        .title(format!("Tasks ({}){editing}", app.task_count()))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn block_style(block_type: BlockType) -> Style {
    match block_type {
        BlockType::Task => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        BlockType::Break => Style::default().fg(Color::Green),
        BlockType::Meeting => Style::default().fg(Color::Blue),
        BlockType::Buffer => Style::default().fg(Color::DarkGray),
    }
}

fn render_plan(frame: &mut Frame, area: Rect, plan: &DailyPlan) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(5)])
        .split(area);

    let metrics = &plan.metrics;
    let summary = format!(
        "Focus {:.1}h | Confidence {:.0}% | Utilization {:.0}%",
        metrics.total_focus_hours, metrics.confidence_score, metrics.utilization_rate
    );
    frame.render_widget(
        Paragraph::new(summary).block(Block::default().title("Metrics").borders(Borders::ALL)),
        sections[0],
    );

    let mut lines = Vec::new();
    for block in &plan.schedule {
        let mut spans = vec![
            Span::styled(
                format!("{} - {} ", block.start_time, block.end_time),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("{:<7} ", block.block_type.label()),
                block_style(block.block_type),
            ),
            Span::styled(block.title.clone(), block_style(block.block_type)),
        ];
        if let Some(priority) = block.priority {
            spans.push(Span::styled(
                format!(" [{}]", priority.label()),
                Style::default().fg(priority_color(priority)),
            ));
        }
        if let Some(context) = &block.energy_context {
            spans.push(Span::styled(format!(" ({context})"), Style::default().fg(Color::Magenta)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(Span::styled(
            format!("    {}", block.reasoning),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().title("Schedule").borders(Borders::ALL)),
        sections[1],
    );

    let deferred: Vec<Line> = if plan.deferred_tasks.is_empty() {
        vec![Line::from("Everything fits today.")]
    } else {
        plan.deferred_tasks
            .iter()
            .map(|task| Line::from(format!("{}: {}", task.title, task.reason)))
            .collect()
    };
    frame.render_widget(
        Paragraph::new(deferred)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Deferred").borders(Borders::ALL)),
        sections[2],
    );
}

fn render_presets(frame: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = SCENARIOS
        .iter()
        .enumerate()
        .map(|(index, scenario)| {
            Line::from(format!(
                "{}. {} {} ({}, {} tasks)",
                index + 1,
                scenario.icon,
                scenario.name,
                scenario.role,
                scenario.tasks.len()
            ))
        })
        .collect();
    if app.plan().is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from("A plan is ready. Press tab to view it."));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Presets").borders(Borders::ALL)),
        area,
    );
}

fn render_status(frame: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(error) = app.error() {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }
    let room = (area.height as usize).saturating_sub(3 + lines.len());
    let skip = app.status_lines.len().saturating_sub(room);
    lines.extend(app.status_lines.iter().skip(skip).map(|line| Line::from(line.as_str())));
    lines.push(Line::from(Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray))));
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Status").borders(Borders::ALL)),
        area,
    );
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn field_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let style = if active {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if active { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:<18}"), style),
        Span::raw(format!("{value}{cursor}")),
    ])
}

fn render_task_form(frame: &mut Frame, form: &TaskForm) {
    let area = popup_area(frame.size(), 60, 11);
    let title = if form.editing.is_some() { "Edit task" } else { "New task" };
    let mut lines: Vec<Line> = form
        .fields()
        .iter()
        .map(|field| field_line(field.label(), &form.field_value(*field), *field == form.field))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "tab next | space cycle | enter save | esc cancel",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn render_settings_form(frame: &mut Frame, form: &SettingsForm) {
    let area = popup_area(frame.size(), 50, 8);
    let mut lines: Vec<Line> = SettingsField::ORDER
        .iter()
        .map(|field| field_line(field.label(), form.field_value(*field), *field == form.field))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "tab next | enter save | esc cancel",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Work day").borders(Borders::ALL)),
        area,
    );
}
