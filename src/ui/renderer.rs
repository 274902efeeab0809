use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::api::{OverallStatus, SearchResult};
use crate::api::models::model_label;
use crate::commands::all_commands;
use crate::core::message::{FeatureTag, NoticeKind};
use crate::ui::app::{App, LoginField, Panel};
use crate::ui::theme::Theme;
use crate::ui::view::View;

const SIDEBAR_WIDTH: u16 = 30;
const PANEL_HEIGHT: u16 = 12;

pub fn ui(f: &mut Frame, app: &mut App) {
    let background = Block::default().style(Style::default().bg(app.theme.background_color));
    f.render_widget(background, f.area());

    match app.chat.view {
        View::Home => render_home(f, app),
        View::Chat => render_chat(f, app),
        View::Login => render_login(f, app),
    }
}

fn feature_blurb(feature: FeatureTag) -> &'static str {
    match feature {
        FeatureTag::Chat => "Ask questions about an uploaded PDF",
        FeatureTag::QuestionGeneration => "FAQ, multiple choice and true/false questions",
        FeatureTag::QaGeneration => "Question and answer pairs from the document",
        FeatureTag::GeneralAi => "Talk to the model without a document",
        FeatureTag::Research => "Summaries and analysis of the document",
        FeatureTag::Translation => "Translate passages",
        FeatureTag::Comparison => "Compare documents",
        FeatureTag::Annotations => "Notes attached to the document",
        FeatureTag::QuizGeneration => "Daily quizzes at a chosen difficulty",
    }
}

fn render_home(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let mut lines = vec![
        Line::from(Span::styled(
            format!("chatpdf v{}", env!("CARGO_PKG_VERSION")),
            theme.heading_style,
        )),
        Line::from(Span::styled(
            "Chat with your PDFs from the terminal",
            theme.assistant_text_style,
        )),
        Line::from(""),
    ];
    for feature in FeatureTag::ALL {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<20}", feature.display_name()), theme.selected_style),
            Span::styled(feature_blurb(feature), theme.assistant_text_style),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(user) = &app.user {
        lines.push(Line::from(Span::styled(
            format!("Signed in as {}", user.email),
            theme.info_style,
        )));
    }
    lines.push(Line::from(Span::styled(
        "Enter: open chat   l: sign in   r: register   ?: help   q: quit",
        theme.title_style,
    )));

    let area = centered(f.area(), 72, lines.len() as u16 + 2);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.input_border_style);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left),
        area,
    );
    render_status(f, app, status_area(f.area()));
}

fn status_area(area: Rect) -> Rect {
    Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: area.height.min(1),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Number of rows `lines` occupy when wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_chat(f: &mut Frame, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(f.area());
    render_sidebar(f, app, columns[0]);

    let input_height = (app.textarea.lines().len() as u16).clamp(1, 6) + 2;
    let panel_height = if app.panel == Panel::None { 0 } else { PANEL_HEIGHT };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(panel_height),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(columns[1]);

    render_title(f, app, rows[0]);
    if app.panel != Panel::None {
        render_panel(f, app, rows[1]);
    }
    render_transcript(f, app, rows[2]);
    render_status(f, app, rows[3]);
    render_input(f, app, rows[4]);
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let session = app
        .chat
        .current_session()
        .map(|session| session.title.as_str())
        .unwrap_or("(no session)");
    let mut spans = vec![Span::styled(
        format!(
            "{session} • {} • {}",
            app.chat.current_feature().display_name(),
            app.chat.selected_model()
        ),
        app.theme.title_style,
    )];
    let activity = if app.chat.uploading {
        Some("uploading…")
    } else if app.chat.generating {
        Some("generating…")
    } else if app.chat.loading {
        Some("thinking…")
    } else if app.is_listening() {
        Some("listening…")
    } else {
        None
    };
    if let Some(activity) = activity {
        spans.push(Span::styled(
            format!("  ● {activity}"),
            app.theme.busy_indicator_style,
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let current = app.chat.current_session_id();
    let lines: Vec<Line> = app
        .chat
        .sessions()
        .iter()
        .enumerate()
        .map(|(index, session)| {
            let style = if Some(session.id.as_str()) == current {
                theme.selected_style
            } else {
                theme.assistant_text_style
            };
            let marker = if session.has_pdf() { "📄" } else { "  " };
            Line::from(Span::styled(
                format!("{:>2}. {marker} {}", index + 1, session.title),
                style,
            ))
        })
        .collect();
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(theme.input_border_style)
        .title(Span::styled("Sessions", theme.title_style));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn panel_lines(app: &App) -> (String, Vec<Line<'static>>) {
    let theme = &app.theme;
    match app.panel {
        Panel::None => (String::new(), Vec::new()),
        Panel::Sessions => {
            let lines = app
                .chat
                .sessions()
                .iter()
                .enumerate()
                .map(|(index, session)| {
                    let pdf = session
                        .pdf_filename
                        .as_deref()
                        .map(|name| format!(" [{name}]"))
                        .unwrap_or_default();
                    Line::from(format!("{}. {}{pdf}  ({})", index + 1, session.title, session.id))
                })
                .collect();
            ("Sessions (/select <n>)".to_string(), lines)
        }
        Panel::Models => {
            let selected = app.chat.selected_model();
            let lines = app
                .chat
                .models()
                .iter()
                .enumerate()
                .map(|(index, model)| {
                    let style = if model.id == selected {
                        theme.selected_style
                    } else {
                        theme.assistant_text_style
                    };
                    Line::from(Span::styled(
                        format!("{}. {}", index + 1, model_label(model)),
                        style,
                    ))
                })
                .collect();
            ("Models (/model <n>)".to_string(), lines)
        }
        Panel::Search => {
            let lines = app
                .chat
                .search_results()
                .iter()
                .map(|result| {
                    let style = match result {
                        SearchResult::Pdf { .. } => theme.selected_style,
                        _ => theme.assistant_text_style,
                    };
                    Line::from(Span::styled(result.summary(), style))
                })
                .collect();
            ("Search results".to_string(), lines)
        }
        Panel::Health => ("System health".to_string(), health_lines(app, theme)),
        Panel::Help => {
            let mut lines: Vec<Line<'static>> = all_commands()
                .iter()
                .map(|command| {
                    Line::from(vec![
                        Span::styled(format!("{:<44}", command.usage), theme.selected_style),
                        Span::raw(command.help),
                    ])
                })
                .collect();
            lines.push(Line::from(""));
            lines.push(Line::from(
                "Enter send • Alt+Enter newline • Tab complete • PgUp/PgDn scroll • F2 voice • Esc close • Ctrl+C quit",
            ));
            ("Help".to_string(), lines)
        }
    }
}

fn health_lines(app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let Some(report) = app.chat.health() else {
        return vec![Line::from("Checking…")];
    };
    let (label, style) = match report.overall_status {
        OverallStatus::Healthy => ("healthy", theme.info_style),
        OverallStatus::Warning => ("warning", theme.warning_style),
        OverallStatus::Critical => ("critical", theme.error_style),
    };
    let metrics = &report.metrics;
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Overall: "),
            Span::styled(label, style.add_modifier(Modifier::BOLD)),
        ]),
        Line::from(format!(
            "CPU {:.1}%  Memory {:.1}%  Disk {:.1}%  Response {:.0} ms",
            metrics.cpu_usage, metrics.memory_usage, metrics.disk_usage, metrics.response_time
        )),
        Line::from(format!(
            "Sessions {}  API calls {}  Error rate {:.2}%",
            metrics.active_sessions, metrics.total_api_calls, metrics.error_rate
        )),
    ];
    for issue in &report.issues {
        let fixable = if issue.auto_fixable.unwrap_or(false) {
            " (auto-fixable)"
        } else {
            ""
        };
        lines.push(Line::from(Span::styled(
            format!(
                "[{}] {}: {}{fixable}",
                issue.severity.as_deref().unwrap_or("info"),
                issue.id,
                issue.message.as_deref().unwrap_or("")
            ),
            theme.warning_style,
        )));
    }
    lines
}

fn render_panel(f: &mut Frame, app: &App, area: Rect) {
    let (title, lines) = panel_lines(app);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.input_border_style)
        .title(Span::styled(title, app.theme.title_style));
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let lines = if app.chat.messages().is_empty() {
        let hint = match app.chat.current_session() {
            Some(session) if session.has_pdf() => "Ask a question about the document.",
            Some(_) => "Upload a PDF with /upload <path> or ask a general question.",
            None => "Create a session with /new.",
        };
        vec![Line::from(Span::styled(hint, app.theme.system_text_style))]
    } else {
        app.transcript_lines()
    };

    let total = wrapped_height(&lines, area.width);
    app.max_scroll = total.saturating_sub(area.height);
    if app.auto_scroll {
        app.scroll_offset = app.max_scroll;
    }
    let scroll_offset = app.scroll_offset.min(app.max_scroll);

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll_offset, 0)),
        area,
    );
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = &app.status else {
        return;
    };
    let style = match notice.kind {
        NoticeKind::Info => app.theme.info_style,
        NoticeKind::Warning => app.theme.warning_style,
        NoticeKind::Error => app.theme.error_style,
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(notice.text.clone(), style))),
        area,
    );
}

fn render_input(f: &mut Frame, app: &mut App, area: Rect) {
    let title = if app.chat.loading {
        "Waiting for the reply… (/help for commands, Ctrl+C to quit)"
    } else {
        "Type a message or /command (Alt+Enter for new line, /help, Ctrl+C to quit)"
    };
    app.textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.input_border_style)
            .title(Span::styled(title, app.theme.input_title_style)),
    );
    f.render_widget(&app.textarea, area);
}

fn render_login(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let form = &app.login;
    let heading = if form.register {
        "Create an account"
    } else {
        "Sign in"
    };
    let field_style = |field: LoginField| {
        if form.field == field {
            theme.selected_style
        } else {
            theme.assistant_text_style
        }
    };
    let masked = "•".repeat(form.password.chars().count());
    let mut lines = vec![
        Line::from(Span::styled(heading, theme.heading_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Email:    ", field_style(LoginField::Email)),
            Span::styled(form.email.clone(), theme.input_text_style),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::styled(masked, theme.input_text_style),
        ]),
        Line::from(""),
    ];
    if form.pending {
        lines.push(Line::from(Span::styled("Contacting backend…", theme.info_style)));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(error.clone(), theme.error_style)));
    }
    lines.push(Line::from(Span::styled(
        "Tab: next field   Enter: submit   Ctrl+R: toggle register   Esc: back",
        theme.title_style,
    )));

    let area = centered(f.area(), 64, lines.len() as u16 + 2);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.input_border_style),
        ),
        area,
    );
}
