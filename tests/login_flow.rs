//! End-to-end tests for the QR login flow
//!
//! Drives a real [`Engine`] through recording doubles for the presenter,
//! navigator and push channel.
//!
//! Run with: cargo test --test login_flow

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use qrlaunch::headless::commands::parse_command;
use qrlaunch_app::{
    AppState, Engine, FileNonceStore, LaunchPhase, Message, Navigator, NonceStore, Presentation,
    Presenter, PushSender, Services, Settings,
};
use qrlaunch_core::{FlowError, OutboundRequest, Platform, PushEvent, QrImageUpdate};

const PAGE_URL: &str = "https://bank.example.se/login";

// ─────────────────────────────────────────────────────────
// Recording doubles
// ─────────────────────────────────────────────────────────

/// Everything the engine did to the outside world
#[derive(Debug, Clone, Default)]
struct Recorded {
    presented: Arc<Mutex<Vec<Presentation>>>,
    navigations: Arc<Mutex<Vec<String>>>,
    replaced: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl Recorded {
    fn presented(&self) -> Vec<Presentation> {
        self.presented.lock().unwrap().clone()
    }

    fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, wanted: &Presentation) -> usize {
        self.presented().iter().filter(|p| *p == wanted).count()
    }

    fn services(&self) -> Services {
        Services {
            push: Box::new(RecordingPush(self.requests.clone())),
            presenter: Box::new(RecordingPresenter(self.presented.clone())),
            navigator: Box::new(RecordingNavigator {
                navigations: self.navigations.clone(),
                replaced: self.replaced.clone(),
            }),
        }
    }
}

struct RecordingPresenter(Arc<Mutex<Vec<Presentation>>>);

impl Presenter for RecordingPresenter {
    fn present(&mut self, presentation: &Presentation) {
        self.0.lock().unwrap().push(presentation.clone());
    }
}

struct RecordingNavigator {
    navigations: Arc<Mutex<Vec<String>>>,
    replaced: Arc<Mutex<Vec<String>>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, uri: &str) {
        self.navigations.lock().unwrap().push(uri.to_string());
    }

    fn replace_location(&mut self, url: &str) {
        self.replaced.lock().unwrap().push(url.to_string());
    }
}

struct RecordingPush(Arc<Mutex<Vec<OutboundRequest>>>);

impl PushSender for RecordingPush {
    fn send(&self, request: OutboundRequest) -> qrlaunch_core::Result<()> {
        self.0.lock().unwrap().push(request);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Test Data Helpers
// ─────────────────────────────────────────────────────────

fn no_confirm_settings() -> Settings {
    let mut settings = Settings::default();
    settings.launch.confirm_before_launch = false;
    settings
}

fn desktop_engine(settings: Settings, recorded: &Recorded) -> Engine {
    let state = AppState::in_memory(settings, Url::parse(PAGE_URL).unwrap(), Platform::Desktop);
    Engine::new(state, recorded.services())
}

fn engine_with_store(
    page_url: &str,
    store: Box<dyn NonceStore>,
    recorded: &Recorded,
) -> Engine {
    let state = AppState::new(
        no_confirm_settings(),
        Url::parse(page_url).unwrap(),
        Platform::Desktop,
        store,
    );
    Engine::new(state, recorded.services())
}

fn qr_push(raw: &str, session_id: &str) -> Message {
    Message::Push(PushEvent::QrImage(QrImageUpdate {
        qr_image: None,
        qr_code_data: Some(raw.to_string()),
        autostarttoken: None,
        session_id: Some(session_id.to_string()),
    }))
}

// ─────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_qr_push_then_desktop_launch() {
    let recorded = Recorded::default();
    let mut engine = desktop_engine(no_confirm_settings(), &recorded);

    engine.process_message(qr_push("bankid.TOK123.3.sig", "S1"));
    assert_eq!(engine.state.session.token(), Some("TOK123"));
    assert_eq!(engine.state.session.session_id(), Some("S1"));

    engine.process_message(Message::ContinueInApp);

    let nonce = engine.state.stored_nonce().expect("nonce stored at launch");
    let navigations = recorded.navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(
        navigations[0],
        format!(
            "bankid:///?autostarttoken=TOK123&redirect=https%3A%2F%2Fbank.example.se%2Flogin%23nonce%3D{nonce}"
        )
    );
    assert_eq!(engine.state.launch.phase(), LaunchPhase::Launched);
    assert!(recorded.requests().contains(&OutboundRequest::FreshData));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_wins_and_late_return_is_ignored() {
    let recorded = Recorded::default();
    let mut engine = desktop_engine(no_confirm_settings(), &recorded);

    engine.process_message(qr_push("bankid.TOK123.3.sig", "S1"));
    engine.process_message(Message::ContinueInApp);
    let nonce = engine.state.stored_nonce().unwrap();

    // The 30s expiry wake-up is queued too; the 3s fallback comes first
    let next = engine.msg_rx.recv().await.unwrap();
    assert_eq!(
        next,
        Message::FallbackElapsed {
            nonce: nonce.clone()
        }
    );
    engine.process_message(next);

    assert_eq!(engine.state.launch.phase(), LaunchPhase::FallbackShown);
    assert_eq!(engine.state.stored_nonce(), None);
    assert!(recorded.presented().contains(&Presentation::Fallback {
        platform: Platform::Desktop,
        install_url: Platform::Desktop.install_url().to_string(),
    }));

    tokio::time::advance(Duration::from_secs(2)).await;
    engine.process_message(Message::ReturnSignal {
        fragment: format!("#nonce={nonce}"),
    });

    assert_eq!(engine.state.launch.phase(), LaunchPhase::FallbackShown);
    assert_eq!(recorded.count(&Presentation::LaunchSucceeded), 0);
    assert!(recorded.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_return_after_reload_matches_stored_nonce() {
    let dir = tempfile::tempdir().unwrap();

    // First page load launches the app and persists the nonce
    let first = Recorded::default();
    let mut engine = engine_with_store(
        PAGE_URL,
        Box::new(FileNonceStore::new(dir.path(), "tab-1").unwrap()),
        &first,
    );
    engine.process_message(qr_push("bankid.TOK123.3.sig", "S1"));
    engine.process_message(Message::ContinueInApp);
    let nonce = engine.state.stored_nonce().unwrap();
    engine.shutdown().await;
    drop(engine);

    // The app hands back by loading the page with the nonce fragment
    let second = Recorded::default();
    let mut engine = engine_with_store(
        &format!("{PAGE_URL}#nonce={nonce}"),
        Box::new(FileNonceStore::new(dir.path(), "tab-1").unwrap()),
        &second,
    );
    engine.process_message(Message::Startup);

    assert_eq!(second.replaced(), vec![PAGE_URL.to_string()]);
    assert_eq!(second.count(&Presentation::LaunchSucceeded), 1);
    assert!(second.navigations().is_empty());
    assert_eq!(engine.state.stored_nonce(), None);
    assert_eq!(engine.state.launch.phase(), LaunchPhase::Resolved);

    // Replaying the same fragment does nothing more
    engine.process_message(Message::ReturnSignal {
        fragment: format!("#nonce={nonce}"),
    });
    assert_eq!(second.count(&Presentation::LaunchSucceeded), 1);
    assert_eq!(second.replaced().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_other_tab_does_not_see_the_nonce() {
    let dir = tempfile::tempdir().unwrap();

    let first = Recorded::default();
    let mut engine = engine_with_store(
        PAGE_URL,
        Box::new(FileNonceStore::new(dir.path(), "tab-1").unwrap()),
        &first,
    );
    engine.process_message(qr_push("bankid.TOK123.3.sig", "S1"));
    engine.process_message(Message::ContinueInApp);
    let nonce = engine.state.stored_nonce().unwrap();
    engine.shutdown().await;

    let other = Recorded::default();
    let mut engine = engine_with_store(
        &format!("{PAGE_URL}#nonce={nonce}"),
        Box::new(FileNonceStore::new(dir.path(), "tab-2").unwrap()),
        &other,
    );
    engine.process_message(Message::Startup);

    assert_eq!(other.count(&Presentation::LaunchSucceeded), 0);
    assert!(other.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_launch_without_token_is_refused() {
    let recorded = Recorded::default();
    let mut engine = desktop_engine(Settings::default(), &recorded);

    engine.process_message(Message::ContinueInApp);
    assert!(recorded.presented().contains(&Presentation::ConfirmLaunch {
        platform: Platform::Desktop
    }));

    engine.process_message(Message::LaunchConfirmed);

    assert!(recorded.presented().contains(&Presentation::Error {
        error: FlowError::NoToken
    }));
    assert!(recorded.navigations().is_empty());
    assert!(engine.state.launch.pending().is_none());
    assert_eq!(engine.state.stored_nonce(), None);
    assert_eq!(engine.pending_fallbacks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_renews_with_session_id() {
    let recorded = Recorded::default();
    let mut settings = no_confirm_settings();
    settings.expiry.auto_renew = true;
    let mut engine = desktop_engine(settings, &recorded);

    engine.process_message(qr_push("bankid.TOK123.3.sig", "S1"));

    let next = engine.msg_rx.recv().await.unwrap();
    assert_eq!(next, Message::ExpiryElapsed { generation: 1 });
    engine.process_message(next);

    assert!(engine.state.expiry.is_expired());
    assert_eq!(recorded.count(&Presentation::Expired), 1);
    assert!(recorded.requests().contains(&OutboundRequest::Renewal {
        session_id: Some("S1".to_string())
    }));

    // The renewal answer restarts the countdown
    engine.process_message(qr_push("bankid.TOK456.0.sig", "S1"));
    assert!(engine.state.expiry.is_counting());
    assert_eq!(engine.state.session.token(), Some("TOK456"));
}

#[tokio::test(start_paused = true)]
async fn test_stdin_commands_drive_the_engine() {
    let recorded = Recorded::default();
    let mut engine = desktop_engine(Settings::default(), &recorded);

    let script = [
        r#"push {"event":"qr_data","data":{"token":"TOK789","session_id":"S9"}}"#,
        "continue",
        "confirm",
    ];
    for line in script {
        let message = parse_command(line).unwrap().unwrap();
        engine.process_message(message);
    }

    let navigations = recorded.navigations();
    assert_eq!(navigations.len(), 1);
    assert!(navigations[0].starts_with("bankid:///?autostarttoken=TOK789&redirect="));

    engine.process_message(parse_command("quit").unwrap().unwrap());
    assert!(engine.should_quit());
}
