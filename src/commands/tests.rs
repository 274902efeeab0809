use super::*;
use crate::api::Session;
use crate::core::app::{ChatEvent, ChatSettings, ChatState, GenerationRequest};
use crate::core::message::NoticeKind;
use crate::ui::theme::Theme;
use tempfile::TempDir;

fn session(id: &str, pdf: Option<&str>) -> Session {
    Session {
        id: id.to_string(),
        title: format!("Session {id}"),
        pdf_filename: pdf.map(str::to_string),
        created_at: None,
        updated_at: None,
    }
}

fn create_test_app() -> App {
    App::new(ChatState::new(ChatSettings::default()), Theme::default(), true)
}

fn app_with_sessions() -> App {
    let mut app = create_test_app();
    app.chat.apply(ChatEvent::SessionsLoaded(Ok(vec![
        session("s1", Some("report.pdf")),
        session("s2", None),
    ])));
    app
}

fn status_text(app: &App) -> String {
    app.status
        .as_ref()
        .map(|notice| notice.text.clone())
        .unwrap_or_default()
}

#[test]
fn plain_text_is_sent_as_a_message() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "what is on page 3?");
    assert!(matches!(result, CommandResult::ProcessAsMessage(text) if text == "what is on page 3?"));
}

#[test]
fn unknown_command_sets_error_status() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/frobnicate");
    assert!(matches!(result, CommandResult::Continue));
    let status = app.status.expect("status");
    assert_eq!(status.kind, NoticeKind::Error);
    assert!(status.text.contains("/frobnicate"));
}

#[test]
fn command_names_are_case_insensitive() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/NEW Thesis notes");
    match result {
        CommandResult::Run(commands) => assert_eq!(
            commands,
            vec![ChatCommand::CreateSession {
                title: "Thesis notes".to_string()
            }]
        ),
        _ => panic!("expected backend work"),
    }
    assert_eq!(app.chat.view, View::Chat);
}

#[test]
fn select_accepts_list_position_or_id() {
    let mut app = app_with_sessions();
    assert_eq!(app.chat.current_session_id(), Some("s1"));

    let result = process_input(&mut app, "/select 2");
    assert!(matches!(result, CommandResult::Run(ref commands) if commands.len() == 1));
    assert_eq!(app.chat.current_session_id(), Some("s2"));

    process_input(&mut app, "/select s1");
    assert_eq!(app.chat.current_session_id(), Some("s1"));

    process_input(&mut app, "/select 9");
    assert!(status_text(&app).contains("No session matches"));
    assert_eq!(app.chat.current_session_id(), Some("s1"));
}

#[test]
fn delete_defaults_to_the_current_session() {
    let mut app = app_with_sessions();
    match process_input(&mut app, "/delete") {
        CommandResult::Run(commands) => assert_eq!(
            commands,
            vec![ChatCommand::DeleteSession {
                session_id: "s1".to_string()
            }]
        ),
        _ => panic!("expected delete command"),
    }
}

#[test]
fn feature_switch_accepts_aliases() {
    let mut app = app_with_sessions();
    let result = process_input(&mut app, "/feature research");
    assert!(matches!(result, CommandResult::Run(_)));
    assert_eq!(app.chat.current_feature(), FeatureTag::Research);

    process_input(&mut app, "/feature translation-memory");
    assert!(status_text(&app).contains("Unknown feature"));
    assert_eq!(app.chat.current_feature(), FeatureTag::Research);
}

#[test]
fn questions_parse_kind_and_chapter() {
    let mut app = app_with_sessions();
    match process_input(&mut app, "/questions mcq Chapter 2") {
        CommandResult::Run(commands) => match &commands[..] {
            [ChatCommand::Generate {
                session_id,
                request: GenerationRequest::Questions(params),
                ..
            }] => {
                assert_eq!(session_id, "s1");
                assert_eq!(params.question_type, "mcq");
                assert_eq!(params.chapter_segment.as_deref(), Some("Chapter 2"));
            }
            other => panic!("unexpected commands: {other:?}"),
        },
        _ => panic!("expected generation"),
    }
}

#[test]
fn questions_reject_unknown_kind() {
    let mut app = app_with_sessions();
    let result = process_input(&mut app, "/questions essay");
    assert!(matches!(result, CommandResult::Continue));
    assert!(status_text(&app).starts_with("Usage: /questions"));
}

#[test]
fn quiz_parses_positional_arguments() {
    let mut app = app_with_sessions();
    match process_input(&mut app, "/quiz weekly hard 5") {
        CommandResult::Run(commands) => match &commands[..] {
            [ChatCommand::Generate {
                request: GenerationRequest::Quiz(params),
                ..
            }] => {
                assert_eq!(params.quiz_type, "weekly");
                assert_eq!(params.difficulty, "hard");
                assert_eq!(params.question_count, 5);
            }
            other => panic!("unexpected commands: {other:?}"),
        },
        _ => panic!("expected generation"),
    }

    let result = process_input(&mut app, "/quiz daily medium zero");
    assert!(matches!(result, CommandResult::Continue));
}

#[test]
fn generation_without_pdf_only_raises_a_notice() {
    let mut app = app_with_sessions();
    process_input(&mut app, "/select 2");
    match process_input(&mut app, "/qa") {
        CommandResult::Run(commands) => assert!(commands.is_empty()),
        _ => panic!("expected empty run"),
    }
    assert!(app.absorb_notices());
    assert_eq!(status_text(&app), crate::core::app::NEED_PDF_TEXT);
}

#[test]
fn model_without_list_takes_id_verbatim() {
    let mut app = create_test_app();
    process_input(&mut app, "/model gpt-4o-mini");
    assert_eq!(app.chat.selected_model(), "gpt-4o-mini");
    assert!(status_text(&app).contains("gpt-4o-mini"));
}

#[test]
fn model_without_arguments_loads_the_list() {
    let mut app = create_test_app();
    match process_input(&mut app, "/model") {
        CommandResult::Run(commands) => {
            assert!(matches!(commands[..], [ChatCommand::LoadModels { .. }]))
        }
        _ => panic!("expected model load"),
    }
    assert_eq!(app.panel, Panel::Models);
}

#[test]
fn login_with_credentials_authenticates_directly() {
    let mut app = create_test_app();
    match process_input(&mut app, "/login a@b.c hunter2") {
        CommandResult::Authenticate {
            email,
            password,
            register,
        } => {
            assert_eq!(email, "a@b.c");
            assert_eq!(password, "hunter2");
            assert!(!register);
        }
        _ => panic!("expected authentication"),
    }
}

#[test]
fn login_with_email_only_opens_the_form() {
    let mut app = create_test_app();
    let result = process_input(&mut app, "/register a@b.c");
    assert!(matches!(result, CommandResult::Continue));
    assert_eq!(app.chat.view, View::Login);
    assert_eq!(app.login.email, "a@b.c");
    assert_eq!(app.login.field, LoginField::Password);
    assert!(app.login.register);
}

#[test]
fn export_writes_transcript_and_refuses_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.txt");
    let mut app = app_with_sessions();

    process_input(&mut app, &format!("/export {}", path.display()));
    assert!(status_text(&app).starts_with("Export failed"));
    assert!(!path.exists());

    app.chat.send_message("hello there");
    process_input(&mut app, &format!("/export {}", path.display()));
    assert!(status_text(&app).starts_with("Exported 1 messages"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("You: hello there"));
}

#[test]
fn quit_and_home_update_app_flags() {
    let mut app = create_test_app();
    app.chat.view = View::Chat;
    process_input(&mut app, "/home");
    assert_eq!(app.chat.view, View::Home);
    process_input(&mut app, "/quit");
    assert!(app.exit_requested);
}

#[test]
fn completion_matches_prefixes() {
    let names: Vec<&str> = matching_commands("se").iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["sessions", "select", "search"]);
    assert!(matching_commands("zzz").is_empty());
}
