use super::*;
use crate::provider::testing::{Reply, ScriptedClient};
use std::future::pending;
use std::path::Path;
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    tokens: Vec<String>,
    done: usize,
    errors: Vec<String>,
}

impl Renderer for Recorder {
    fn render_token(&mut self, token: &str) {
        self.tokens.push(token.to_string());
    }

    fn render_done(&mut self) {
        self.done += 1;
    }

    fn render_error(&mut self, err: &str) {
        self.errors.push(err.to_string());
    }
}

fn settings() -> ChatSettings {
    ChatSettings {
        model: "test/model".to_string(),
        system_prompt: Some("be brief".to_string()),
        temperature: 0.7,
        max_tokens: Some(4000),
        context_messages: 40,
        chunk_timeout: Duration::from_secs(60),
        autosave: false,
    }
}

fn engine_with(dir: &Path, settings: ChatSettings, replies: Vec<Reply>) -> ChatEngine<ScriptedClient> {
    ChatEngine::new(
        ScriptedClient::new(replies),
        SessionStore::new(dir),
        settings,
        Session::new(Some("current".to_string()), "test/model"),
    )
}

fn engine(dir: &Path, replies: Vec<Reply>) -> ChatEngine<ScriptedClient> {
    engine_with(dir, settings(), replies)
}

fn saved(dir: &Path, name: &str, model: &str, messages: Vec<Message>) {
    let mut session = Session::new(Some(name.to_string()), model);
    session.messages = messages;
    SessionStore::new(dir).save(&session).unwrap();
}

fn assert_alternates(messages: &[Message]) {
    for (i, msg) in messages.iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(msg.role, expected, "message {} out of order", i);
    }
}

fn interrupt_after(ms: u64) -> impl Future<Output = ()> {
    tokio::time::sleep(Duration::from_millis(ms))
}

#[tokio::test]
async fn test_streamed_turn_appends_reply() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![Reply::Deltas(vec!["Hi", " there"])]);
    let mut out = Recorder::default();

    let outcome = engine.send("hello", &mut out, pending()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(out.tokens, vec!["Hi", " there"]);
    assert_eq!(out.done, 1);
    assert_eq!(
        engine.session().messages,
        vec![Message::user("hello"), Message::assistant("Hi there")]
    );
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.is_dirty());
}

#[tokio::test]
async fn test_request_carries_prompt_history_and_parameters() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(
        dir.path(),
        vec![Reply::Deltas(vec!["one"]), Reply::Deltas(vec!["two"])],
    );
    let mut out = Recorder::default();
    engine.send("first", &mut out, pending()).await.unwrap();
    engine.send("second", &mut out, pending()).await.unwrap();

    let requests = engine.client.requests();
    assert_eq!(requests.len(), 2);
    let last = &requests[1];
    assert_eq!(last.model, "test/model");
    assert_eq!(last.temperature, 0.7);
    assert_eq!(last.max_tokens, Some(4000));
    assert_eq!(
        last.messages,
        vec![
            Message::system("be brief"),
            Message::user("first"),
            Message::assistant("one"),
            Message::user("second"),
        ]
    );
}

#[test]
fn test_request_window_starts_with_user() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.context_messages = 4;
    settings.system_prompt = None;
    let mut engine = engine_with(dir.path(), settings, vec![]);
    engine.session.messages = vec![
        Message::user("u1"),
        Message::assistant("a1"),
        Message::user("u2"),
        Message::assistant("a2"),
        Message::user("u3"),
    ];

    let request = engine.request();
    // Last four would open on "a1"; the window skips forward to "u2".
    assert_eq!(
        request.messages,
        vec![Message::user("u2"), Message::assistant("a2"), Message::user("u3")]
    );

    engine.settings.context_messages = 0;
    assert_eq!(engine.request().messages.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_keeps_partial_reply() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![Reply::DeltasThenHang(vec!["Hi", " there"])]);
    let mut out = Recorder::default();

    let outcome = engine
        .send("hello", &mut out, interrupt_after(50))
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Interrupted { kept: true });
    assert_eq!(
        engine.session().messages,
        vec![Message::user("hello"), Message::assistant("Hi there")]
    );
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(out.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_without_deltas_withdraws_message() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(
        dir.path(),
        vec![Reply::DeltasThenHang(vec![]), Reply::Hang],
    );
    let mut out = Recorder::default();

    let outcome = engine
        .send("hello", &mut out, interrupt_after(50))
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Interrupted { kept: false });
    assert!(engine.session().messages.is_empty());
    assert!(!engine.is_dirty());

    // Interrupted while still waiting for the response headers.
    let outcome = engine
        .send("again", &mut out, interrupt_after(50))
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Interrupted { kept: false });
    assert!(engine.session().messages.is_empty());
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_stream_times_out_and_keeps_partial() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.chunk_timeout = Duration::from_secs(1);
    let mut engine = engine_with(dir.path(), settings, vec![Reply::DeltasThenHang(vec!["Hi"])]);
    let mut out = Recorder::default();

    let err = engine.send("hello", &mut out, pending()).await.unwrap_err();

    assert!(matches!(err, ChatError::Api(ApiError::Timeout(_))));
    assert_eq!(
        engine.session().messages,
        vec![Message::user("hello"), Message::assistant("Hi")]
    );
    assert_eq!(out.errors.len(), 1);
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_failed_request_rolls_back() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(
        dir.path(),
        vec![
            Reply::Fail(ApiError::provider(402, "Insufficient credits")),
            Reply::DeltasThenError(vec!["Hi"], ApiError::Network("reset".into())),
        ],
    );
    let mut out = Recorder::default();

    let err = engine.send("hello", &mut out, pending()).await.unwrap_err();
    assert!(matches!(err, ChatError::Api(ApiError::Provider { status: 402, .. })));
    assert!(engine.session().messages.is_empty());

    let err = engine.send("hello", &mut out, pending()).await.unwrap_err();
    assert!(matches!(err, ChatError::Api(ApiError::Network(_))));
    assert!(engine.session().messages.is_empty());
    assert_eq!(out.errors.len(), 2);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(!engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_transcript_alternates_across_outcomes() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(
        dir.path(),
        vec![
            Reply::Deltas(vec!["a"]),
            Reply::Fail(ApiError::Network("down".into())),
            Reply::DeltasThenHang(vec![]),
            Reply::DeltasThenHang(vec!["partial"]),
            Reply::DeltasThenError(vec!["x"], ApiError::Decode("bad".into())),
            Reply::Deltas(vec!["b"]),
        ],
    );
    let mut out = Recorder::default();

    for text in ["1", "2", "3", "4", "5", "6"] {
        let _ = engine.send(text, &mut out, interrupt_after(50)).await;
        assert_alternates(&engine.session().messages);
    }
    assert_eq!(engine.session().messages.len(), 6);
}

#[test]
fn test_input_refused_while_streaming() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.begin_turn("hello").unwrap();
    assert_eq!(engine.state(), EngineState::Streaming);

    assert!(matches!(engine.accept("more"), Err(ChatError::Busy)));
    assert!(matches!(engine.execute(Command::Save), Err(ChatError::Busy)));
    assert!(matches!(engine.terminate(true), Err(ChatError::Busy)));
    assert_eq!(engine.session().messages, vec![Message::user("hello")]);
    assert!(!dir.path().join("current.json").exists());
}

#[tokio::test]
async fn test_send_refused_while_streaming() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.begin_turn("hello").unwrap();
    let mut out = Recorder::default();
    let err = engine.send("again", &mut out, pending()).await.unwrap_err();
    assert!(matches!(err, ChatError::Busy));
    assert_eq!(engine.session().messages.len(), 1);
}

#[test]
fn test_unknown_command_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), vec![]);
    assert!(matches!(engine.accept("/frobnicate"), Err(ChatError::UnknownCommand(_))));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.session().messages.is_empty());
}

#[test]
fn test_load_missing_session_keeps_current() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];

    let err = engine.execute(Command::Load("nonexistent".into())).unwrap_err();

    assert!(matches!(err, ChatError::Store(StoreError::NotFound(_))));
    assert_eq!(engine.session().name, "current");
    assert_eq!(engine.session().messages.len(), 2);
}

#[test]
fn test_load_replaces_transcript_and_model() {
    let dir = TempDir::new().unwrap();
    saved(
        dir.path(),
        "old",
        "other/model",
        vec![Message::user("q"), Message::assistant("a")],
    );
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];
    engine.dirty = true;

    let outcome = engine.execute(Command::Load("old".into())).unwrap();

    match outcome {
        CommandOutcome::Loaded {
            name,
            model,
            messages,
            dropped_unanswered,
            saved_previous,
        } => {
            assert_eq!(name, "old");
            assert_eq!(model, "other/model");
            assert_eq!(messages, 2);
            assert!(!dropped_unanswered);
            assert_eq!(saved_previous, Some(dir.path().join("current.json")));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(engine.session().model, "other/model");
    assert!(!engine.is_dirty());

    let previous = SessionStore::new(dir.path()).load("current").unwrap();
    assert_eq!(previous.messages.len(), 2);
}

#[test]
fn test_load_drops_unanswered_message() {
    let dir = TempDir::new().unwrap();
    saved(
        dir.path(),
        "cut",
        "test/model",
        vec![Message::user("q"), Message::assistant("a"), Message::user("lost")],
    );
    let mut engine = engine(dir.path(), vec![]);

    let outcome = engine.execute(Command::Load("cut".into())).unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::Loaded { dropped_unanswered: true, messages: 2, .. }
    ));
    assert_alternates(&engine.session().messages);
    assert!(engine.is_dirty());
}

#[tokio::test]
async fn test_reload_active_chat_keeps_unsaved_turns() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(
        dir.path(),
        vec![
            Reply::Deltas(vec!["one"]),
            Reply::Deltas(vec!["two"]),
            Reply::Deltas(vec!["three"]),
        ],
    );
    let mut out = Recorder::default();
    let store = SessionStore::new(dir.path());

    engine.send("a", &mut out, pending()).await.unwrap();
    engine.execute(Command::Save).unwrap();
    engine.send("b", &mut out, pending()).await.unwrap();
    assert!(engine.is_dirty());

    let outcome = engine.execute(Command::Load("current".into())).unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::Loaded { messages: 4, saved_previous: Some(_), .. }
    ));
    assert!(!engine.is_dirty());
    assert_eq!(engine.session().messages.len(), 4);
    assert_eq!(store.load("current").unwrap().messages.len(), 4);

    engine.send("c", &mut out, pending()).await.unwrap();
    engine.execute(Command::Save).unwrap();
    let texts: Vec<String> = store
        .load("current")
        .unwrap()
        .messages
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts, vec!["a", "one", "b", "two", "c", "three"]);
}

#[test]
fn test_list_names_saved_sessions() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        saved(dir.path(), name, "test/model", vec![]);
    }
    let mut engine = engine(dir.path(), vec![]);

    match engine.execute(Command::List).unwrap() {
        CommandOutcome::Listed(mut names) => {
            names.sort();
            assert_eq!(names, vec!["a", "b", "c"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_save_writes_current_session() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];
    engine.dirty = true;

    let outcome = engine.execute(Command::Save).unwrap();

    assert_eq!(outcome, CommandOutcome::Saved(dir.path().join("current.json")));
    assert!(!engine.is_dirty());
    let stored = SessionStore::new(dir.path()).load("current").unwrap();
    assert_eq!(stored.messages, engine.session().messages);
}

#[test]
fn test_new_saves_dirty_session_first() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];
    engine.dirty = true;

    let outcome = engine.execute(Command::New(Some("fresh".into()))).unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Created {
            name: "fresh".into(),
            saved_previous: Some(dir.path().join("current.json")),
        }
    );
    assert_eq!(engine.session().name, "fresh");
    assert!(engine.session().messages.is_empty());
    assert_eq!(engine.session().model, "test/model");
    assert!(SessionStore::new(dir.path()).exists("current"));
    // Autosave is off, so the empty session is not written yet.
    assert!(!SessionStore::new(dir.path()).exists("fresh"));
}

#[test]
fn test_new_refuses_existing_name() {
    let dir = TempDir::new().unwrap();
    saved(dir.path(), "taken", "test/model", vec![]);
    let mut engine = engine(dir.path(), vec![]);

    let err = engine.execute(Command::New(Some("taken".into()))).unwrap_err();

    assert!(matches!(err, ChatError::SessionExists(ref n) if n == "taken"));
    assert_eq!(engine.session().name, "current");
}

#[test]
fn test_new_with_autosave_writes_empty_session() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.autosave = true;
    let mut engine = engine_with(dir.path(), settings, vec![]);

    let outcome = engine.execute(Command::New(None)).unwrap();

    let name = match outcome {
        CommandOutcome::Created { name, .. } => name,
        other => panic!("unexpected {:?}", other),
    };
    assert!(name.starts_with("chat-"));
    assert!(SessionStore::new(dir.path()).exists(&name));
}

#[test]
fn test_new_keeps_current_chat_when_first_save_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut settings = settings();
    settings.autosave = true;
    let mut engine = engine_with(&blocker.join("chats"), settings, vec![]);

    let err = engine.execute(Command::New(Some("fresh".into()))).unwrap_err();

    assert!(matches!(err, ChatError::Store(StoreError::Persistence { .. })));
    assert_eq!(engine.session().name, "current");
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_exit_clean_terminates() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);

    assert_eq!(engine.execute(Command::Exit).unwrap(), CommandOutcome::Exited);
    assert_eq!(engine.state(), EngineState::Terminated);
    assert!(matches!(engine.accept("hello"), Err(ChatError::Terminated)));
}

#[test]
fn test_exit_with_unsaved_changes_asks_first() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];
    engine.dirty = true;

    assert_eq!(engine.execute(Command::Exit).unwrap(), CommandOutcome::ExitPending);
    assert_eq!(engine.state(), EngineState::Idle);

    let path = engine.terminate(true).unwrap();
    assert_eq!(path, Some(dir.path().join("current.json")));
    assert_eq!(engine.state(), EngineState::Terminated);
    assert_eq!(
        SessionStore::new(dir.path()).load("current").unwrap().messages.len(),
        2
    );
}

#[test]
fn test_exit_without_saving() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![]);
    engine.session.messages = vec![Message::user("hi"), Message::assistant("hey")];
    engine.dirty = true;

    assert_eq!(engine.terminate(false).unwrap(), None);
    assert_eq!(engine.state(), EngineState::Terminated);
    assert!(!SessionStore::new(dir.path()).exists("current"));
}

#[tokio::test]
async fn test_autosave_after_turn() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.autosave = true;
    let mut engine = engine_with(dir.path(), settings, vec![Reply::Deltas(vec!["Hi there"])]);
    let mut out = Recorder::default();

    engine.send("hello", &mut out, pending()).await.unwrap();
    let path = engine.autosave().unwrap().unwrap();

    assert_eq!(path, dir.path().join("current.json"));
    assert!(!engine.is_dirty());
    assert!(engine.autosave().is_none());
    let stored = SessionStore::new(dir.path()).load("current").unwrap();
    assert_eq!(
        stored.messages,
        vec![Message::user("hello"), Message::assistant("Hi there")]
    );
}

#[tokio::test]
async fn test_autosave_disabled() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(dir.path(), vec![Reply::Deltas(vec!["Hi"])]);
    let mut out = Recorder::default();

    engine.send("hello", &mut out, pending()).await.unwrap();

    assert!(engine.autosave().is_none());
    assert!(engine.is_dirty());
    assert!(!SessionStore::new(dir.path()).exists("current"));
}

#[tokio::test]
async fn test_autosave_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut settings = settings();
    settings.autosave = true;
    let mut engine = engine_with(&blocker.join("chats"), settings, vec![Reply::Deltas(vec!["Hi"])]);
    let mut out = Recorder::default();

    engine.send("hello", &mut out, pending()).await.unwrap();

    assert!(matches!(
        engine.autosave(),
        Some(Err(StoreError::Persistence { .. }))
    ));
    assert!(engine.is_dirty());
    assert_eq!(engine.session().messages.len(), 2);
}
