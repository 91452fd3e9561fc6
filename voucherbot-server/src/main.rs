use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use voucherbot_common::models::SessionId;
use voucherbot_core::platforms::voucher_api::load_cookie_blob;
use voucherbot_core::services::command_service::ButtonAction;
use voucherbot_core::BotConfig;

mod console;
mod context;
mod render;

use console::{print_reply, ConsoleNotifier};
use context::ServerContext;
use render::render_reply;

#[derive(Parser, Debug, Clone)]
#[command(name = "voucherbot")]
#[command(author, version, about = "Voucher checker and protector, driven from the console")]
struct Args {
    /// Cookie file (JSON) for the voucher service. Overrides VOUCHERBOT_COOKIES_PATH.
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Seconds to wait between two remote checks.
    #[arg(long)]
    check_delay: Option<f64>,

    /// Seconds between protection cycles.
    #[arg(long)]
    interval: Option<u64>,

    /// Granularity (seconds) of the inter-cycle sleep; bounds stop latency.
    #[arg(long)]
    sleep_increment: Option<u64>,

    /// Session used for lines that don't start with `@<session>`.
    #[arg(long, default_value = "console")]
    session: String,

    /// Tracing filter, e.g. "voucherbot=debug". Defaults to RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

fn init_tracing(log_filter: Option<&str>) -> anyhow::Result<()> {
    // reqwest and friends still log through the `log` facade
    tracing_log::LogTracer::init().context("Failed to install log bridge")?;

    let filter = match log_filter {
        Some(raw) => EnvFilter::try_new(raw).context("Invalid --log-filter")?,
        None => EnvFilter::from_default_env().add_directive("voucherbot=info".parse()?),
    };
    let sub = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(sub).context("Failed to set global subscriber")?;
    Ok(())
}

fn apply_overrides(cfg: &mut BotConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(path) = &args.cookies {
        cfg.cookies_path = path.clone();
    }
    if let Some(secs) = args.check_delay {
        if !secs.is_finite() || secs < 0.0 {
            bail!("--check-delay must be a non-negative number of seconds");
        }
        cfg.check_delay = Duration::from_secs_f64(secs);
    }
    if let Some(secs) = args.interval {
        cfg.protection.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.sleep_increment {
        cfg.protection.sleep_increment = Duration::from_secs(secs);
    }
    cfg.validate()?;
    Ok(())
}

/// `@alice /add CODE` runs as session `alice`; anything else uses the default.
fn split_session(default: &SessionId, line: &str) -> (SessionId, String) {
    if let Some(rest) = line.strip_prefix('@') {
        if let Some((name, text)) = rest.split_once(char::is_whitespace) {
            if !name.is_empty() {
                return (SessionId::new(name), text.trim().to_string());
            }
        }
    }
    (default.clone(), line.to_string())
}

/// Handles one input line on its own task so a long check never blocks
/// `/stop` or `/status`.
fn dispatch(ctx: Arc<ServerContext>, default_session: &SessionId, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let (session, text) = split_session(default_session, line);

    tokio::spawn(async move {
        let commands = &ctx.command_service;
        let result = if ButtonAction::is_button_payload(&text) {
            commands.handle_button(&text).await
        } else {
            commands
                .handle_text(&session, &text)
                .await
                .map(|reply| (session.clone(), reply))
        };

        match result {
            Ok((target, reply)) => print_reply(&target, &render_reply(&target, &reply)),
            Err(e) => {
                error!(session = %session, "Command failed: {:?}", e);
                print_reply(
                    &session,
                    &format!("⚠️ Something went wrong:\n{e}\n\nBot is still running."),
                );
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref())?;

    let mut config = BotConfig::from_env()?;
    apply_overrides(&mut config, &args)?;
    info!(
        "voucherbot starting. check_delay={:?}, interval={:?}, session={}",
        config.check_delay, config.protection.interval, args.session
    );

    let cookie = load_cookie_blob(&config.cookies_path)?;
    let ctx = Arc::new(ServerContext::new(config, cookie, Arc::new(ConsoleNotifier::new())));
    let default_session = SessionId::new(args.session.clone());

    print_reply(&default_session, "Type /help for commands. Ctrl-C to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl-C: {:?}", e);
                }
                info!("Ctrl-C detected; stopping protection loops...");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => dispatch(ctx.clone(), &default_session, &line),
                Ok(None) => {
                    info!("stdin closed; protection keeps running until Ctrl-C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {:?}", e);
                    stdin_open = false;
                }
            },
        }
    }

    let stopped = ctx.supervisor.stop_all();
    info!(
        stopped,
        sessions = ctx.store.session_ids().len(),
        "Shutdown complete. Goodbye!"
    );
    Ok(())
}
