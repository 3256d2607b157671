//! qrlaunch - QR login companion, headless frontend
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use url::Url;

use qrlaunch::{run_headless, HeadlessOptions};
use qrlaunch_app::config::{init_config_dir, load_settings};
use qrlaunch_core::Platform;

/// qrlaunch - drive a BankID-style QR login from the command line
///
/// Presentation events are written to stdout as NDJSON. User actions are
/// read from stdin: continue, confirm, cancel, extend, install, dismiss,
/// `return <fragment>`, `push <json envelope>`, quit. Closing stdin quits.
#[derive(Parser, Debug)]
#[command(name = "qrlaunch")]
#[command(about = "QR login companion: QR session lifecycle and app launch", long_about = None)]
struct Args {
    /// Directory containing .qrlaunch/config.toml
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Login page address; may carry a `#nonce=` return fragment
    #[arg(long)]
    page_url: Option<String>,

    /// WebSocket URL of the push channel
    #[arg(long)]
    channel_url: Option<String>,

    /// Platform family (ios, android, desktop)
    #[arg(long, conflicts_with = "user_agent")]
    platform: Option<Platform>,

    /// Browser user-agent string to classify
    #[arg(long)]
    user_agent: Option<String>,

    /// Tab id for durable nonce storage
    #[arg(long)]
    tab: Option<String>,

    /// Request a new QR automatically when the countdown runs out
    #[arg(long)]
    auto_renew: bool,

    /// Launch without a confirmation dialog
    #[arg(long)]
    no_confirm: bool,

    /// Fallback delay in milliseconds
    #[arg(long)]
    fallback_delay_ms: Option<u64>,

    /// Write a default .qrlaunch/config.toml and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let base_path = args
        .config_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init {
        init_config_dir(&base_path)?;
        eprintln!("Wrote {}", base_path.join(".qrlaunch").join("config.toml").display());
        return Ok(());
    }

    qrlaunch_core::logging::init()?;

    let mut settings = load_settings(&base_path);
    if args.auto_renew {
        settings.expiry.auto_renew = true;
    }
    if args.no_confirm {
        settings.launch.confirm_before_launch = false;
    }
    if let Some(delay) = args.fallback_delay_ms {
        settings.launch.fallback_delay_ms = delay;
    }
    settings.validate()?;

    let page_url = args
        .page_url
        .or_else(|| settings.page.url.clone())
        .ok_or_else(|| eyre!("no page URL: pass --page-url or set [page] url"))?;
    let page_url = Url::parse(&page_url).wrap_err_with(|| format!("invalid page URL '{page_url}'"))?;

    let platform = match (args.platform, args.user_agent.as_deref()) {
        (Some(platform), _) => platform,
        (None, Some(user_agent)) => Platform::from_user_agent(user_agent),
        (None, None) => Platform::Desktop,
    };

    let options = HeadlessOptions {
        page_url,
        channel_url: args.channel_url.or_else(|| settings.channel.url.clone()),
        platform,
        tab_id: args.tab,
        settings,
    };

    run_headless(options).await?;
    Ok(())
}
