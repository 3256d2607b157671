//! Headless mode runner - main event loop without a browser
//!
//! Builds the engine from the resolved options, wires stdin, OS signals and
//! (optionally) the WebSocket push channel into it, and runs until quit.

use std::path::PathBuf;

use tokio::sync::mpsc;
use url::Url;

use qrlaunch_app::signals::spawn_signal_handler;
use qrlaunch_app::{
    AppState, Engine, FileNonceStore, MemoryNonceStore, Message, NonceStore, PushSender,
    Services, Settings,
};
use qrlaunch_channel::{ChannelEvent, ChannelHandle, PushChannelClient};
use qrlaunch_core::prelude::*;
use qrlaunch_core::Platform;

use super::commands::parse_command;
use super::{HeadlessEvent, StdoutNavigator, StdoutPresenter, StdoutPushSender};

/// Everything the runner needs, resolved from CLI flags and config
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Page address, possibly carrying a `#nonce=` return fragment
    pub page_url: Url,
    /// WebSocket URL of the push channel; pushes come from stdin when absent
    pub channel_url: Option<String>,
    pub platform: Platform,
    /// Tab id for durable nonce storage; in-memory storage when absent
    pub tab_id: Option<String>,
    pub settings: Settings,
}

impl HeadlessOptions {
    fn nonce_store(&self) -> Result<Box<dyn NonceStore>> {
        match &self.tab_id {
            Some(tab_id) => Ok(Box::new(FileNonceStore::new(
                &storage_dir(&self.settings),
                tab_id,
            )
            .with_context(|| format!("opening nonce storage for tab '{tab_id}'"))?)),
            None => Ok(Box::new(MemoryNonceStore::new())),
        }
    }

    /// Connect the push channel, or read pushes from stdin without one.
    ///
    /// A channel that cannot be reached right now is not fatal: the run
    /// continues on stdin pushes.
    async fn push_channel(&self) -> Result<ChannelParts> {
        let Some(url) = &self.channel_url else {
            info!("No push channel configured; reading pushes from stdin");
            return Ok(stdin_pushes());
        };

        match PushChannelClient::connect(url).await {
            Ok(client) => {
                let (handle, events) = client.into_parts();
                let parts: ChannelParts = (Box::new(handle.clone()), Some(handle), Some(events));
                Ok(parts)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Push channel unavailable, falling back to stdin: {}", e);
                HeadlessEvent::error(e.to_string(), false).emit();
                Ok(stdin_pushes())
            }
            Err(e) => {
                HeadlessEvent::error(e.to_string(), true).emit();
                Err(e)
            }
        }
    }
}

/// Outbound sender, live channel handle and inbound event stream
type ChannelParts = (
    Box<dyn PushSender>,
    Option<ChannelHandle>,
    Option<mpsc::Receiver<ChannelEvent>>,
);

fn stdin_pushes() -> ChannelParts {
    (Box::new(StdoutPushSender), None, None)
}

/// Run in headless mode - NDJSON events on stdout, commands on stdin
pub async fn run_headless(options: HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("qrlaunch starting in HEADLESS mode");
    info!("Page: {}", options.page_url);
    info!("═══════════════════════════════════════════════════════");

    let store = options.nonce_store()?;
    let state = AppState::new(
        options.settings.clone(),
        options.page_url.clone(),
        options.platform,
        store,
    );

    let (push, channel, channel_events) = options.push_channel().await?;

    let mut engine = Engine::new(
        state,
        Services {
            push,
            presenter: Box::new(StdoutPresenter),
            navigator: Box::new(StdoutNavigator),
        },
    );
    if let Some(events) = channel_events {
        engine.attach_channel(events);
    }

    spawn_signal_handler(engine.msg_sender());
    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });

    HeadlessEvent::started(options.platform, options.page_url.as_str()).emit();
    engine.start();
    engine.run().await;
    engine.shutdown().await;
    if let Some(channel) = channel {
        channel.disconnect().await;
    }

    info!("qrlaunch headless mode exiting");
    Ok(())
}

/// Read commands from stdin and forward them to the engine (blocking)
fn spawn_stdin_reader_blocking(msg_tx: mpsc::Sender<Message>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => match parse_command(&line) {
                Ok(Some(message)) => {
                    let quit = message == Message::Quit;
                    if msg_tx.blocking_send(message).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Bad stdin command {:?}: {}", line, e);
                    HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
                }
            },
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    // EOF: nobody can answer dialogs any more
    let _ = msg_tx.blocking_send(Message::Quit);
    info!("Stdin reader exiting");
}

/// Directory holding per-tab nonce files
pub fn storage_dir(settings: &Settings) -> PathBuf {
    settings
        .storage
        .dir
        .clone()
        .unwrap_or_else(FileNonceStore::default_dir)
}
