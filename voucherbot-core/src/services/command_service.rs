// File: voucherbot-core/src/services/command_service.rs
//
// Translates inbound chat text and button taps into calls against the session
// store, the protection supervisor and the scan engine. Replies are semantic
// (`CommandReply`); rendering them is the transport's job.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use voucherbot_common::models::{
    normalize_code, parse_codes, AddOutcome, CodeListing, Notice, ScanReport, SessionId,
    StatusSnapshot,
};

use crate::config::BotConfig;
use crate::services::message_sender::{MessageProgress, MessageSender};
use crate::services::scan_service::{ProgressSink, ScanEngine};
use crate::services::session_store::SessionStore;
use crate::tasks::protection::{ProtectionSupervisor, StartOutcome, StopOutcome};
use crate::Error;

pub const ADD_USAGE: &str = "/add CODE1 CODE2 CODE3 (also works with one code per line)";
pub const PROTECT_USAGE: &str = "/protect CODE1 CODE2 ...";
pub const CHECK_USAGE: &str = "/check CODE1 CODE2 CODE3";
pub const PAUSE_USAGE: &str = "/pause CODE";
pub const RESUME_USAGE: &str = "/resume CODE";

const PROTECT_ONE_TAG: &str = "protect_one";
const PROTECT_ALL_TAG: &str = "protect_all";

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Add(Vec<String>),
    Protect(Vec<String>),
    Check(Vec<String>),
    Run,
    Stop,
    Pause(Option<String>),
    Resume(Option<String>),
    List,
    Clear,
    Status,
    Unknown(String),
}

impl Command {
    /// Parses a chat message.
    ///
    /// `/name args...` is a command; everything after the name, including any
    /// following lines, is its argument text. Plain text that contains codes
    /// is an instant check. Returns `None` for text that is neither.
    pub fn parse(text: &str, min_code_len: usize) -> Option<Command> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(rest) = text.strip_prefix('/') else {
            let codes = parse_codes(text, min_code_len);
            return (!codes.is_empty()).then_some(Command::Check(codes));
        };

        let (head, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        // "/add@SomeBot" in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let first_arg = || args.split_whitespace().next().map(normalize_code);

        let cmd = match name.as_str() {
            "start" | "help" => Command::Help,
            "add" => Command::Add(parse_codes(args, min_code_len)),
            "protect" => Command::Protect(parse_codes(args, min_code_len)),
            "check" => Command::Check(parse_codes(args, min_code_len)),
            "run" => Command::Run,
            "stop" => Command::Stop,
            "pause" => Command::Pause(first_arg()),
            "resume" => Command::Resume(first_arg()),
            "list" => Command::List,
            "clear" => Command::Clear,
            "status" => Command::Status,
            other => Command::Unknown(other.to_string()),
        };
        Some(cmd)
    }
}

/// Payload of the "protect" buttons attached to instant-check results.
///
/// Wire format: `protect_one:<session>:<CODE>` or
/// `protect_all:<session>:<CODE1,CODE2,...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    ProtectOne { session: SessionId, code: String },
    ProtectAll { session: SessionId, codes: Vec<String> },
}

impl ButtonAction {
    pub fn session(&self) -> &SessionId {
        match self {
            ButtonAction::ProtectOne { session, .. } | ButtonAction::ProtectAll { session, .. } => {
                session
            }
        }
    }

    pub fn codes(&self) -> Vec<String> {
        match self {
            ButtonAction::ProtectOne { code, .. } => vec![code.clone()],
            ButtonAction::ProtectAll { codes, .. } => codes.clone(),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ButtonAction::ProtectOne { session, code } => {
                format!("{PROTECT_ONE_TAG}:{session}:{code}")
            }
            ButtonAction::ProtectAll { session, codes } => {
                format!("{PROTECT_ALL_TAG}:{session}:{}", codes.join(","))
            }
        }
    }

    pub fn decode(payload: &str) -> Result<Self, Error> {
        let mut parts = payload.trim().splitn(3, ':');
        let (Some(tag), Some(session), Some(codes_part)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Validation(format!("malformed button payload '{payload}'")));
        };
        if session.is_empty() {
            return Err(Error::Validation("button payload has no session".into()));
        }

        let mut codes: Vec<String> = codes_part
            .split(',')
            .map(normalize_code)
            .filter(|c| !c.is_empty())
            .collect();
        if codes.is_empty() {
            return Err(Error::Validation("button payload has no codes".into()));
        }

        let session = SessionId::new(session);
        match tag {
            PROTECT_ONE_TAG => Ok(ButtonAction::ProtectOne {
                session,
                code: codes.swap_remove(0),
            }),
            PROTECT_ALL_TAG => Ok(ButtonAction::ProtectAll { session, codes }),
            other => Err(Error::Validation(format!("unknown button action '{other}'"))),
        }
    }

    /// True when the payload looks like one of ours, without validating it.
    pub fn is_button_payload(text: &str) -> bool {
        let text = text.trim_start();
        text.starts_with(&format!("{PROTECT_ONE_TAG}:"))
            || text.starts_with(&format!("{PROTECT_ALL_TAG}:"))
    }
}

/// Semantic result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Help {
        check_delay: Duration,
        interval: Duration,
    },
    Usage(&'static str),
    Added(AddOutcome),
    /// `added` is `None` when the loop was started by `/run`.
    ProtectionStarted {
        added: Option<AddOutcome>,
        active: usize,
        scan_estimate: Duration,
        cycle_estimate: Duration,
    },
    AddedToRunningLoop(AddOutcome),
    AlreadyRunning,
    NothingToProtect,
    Stopped,
    NotRunning,
    Paused(String),
    Resumed(String),
    UnknownCode(String),
    Listing(CodeListing),
    Cleared(usize),
    Status(StatusSnapshot),
    CheckBusy,
    CheckResults(ScanReport),
    UnknownCommand(String),
    Ignored,
}

pub struct CommandService {
    store: Arc<SessionStore>,
    engine: Arc<ScanEngine>,
    sender: Arc<MessageSender>,
    supervisor: Arc<ProtectionSupervisor>,
    config: BotConfig,
    credential_loaded: bool,
}

impl CommandService {
    pub fn new(
        store: Arc<SessionStore>,
        engine: Arc<ScanEngine>,
        sender: Arc<MessageSender>,
        supervisor: Arc<ProtectionSupervisor>,
        config: BotConfig,
        credential_loaded: bool,
    ) -> Self {
        debug!("Initializing CommandService");
        Self {
            store,
            engine,
            sender,
            supervisor,
            config,
            credential_loaded,
        }
    }

    /// Handles a chat message from `session`.
    pub async fn handle_text(&self, session: &SessionId, text: &str) -> Result<CommandReply, Error> {
        match Command::parse(text, self.config.min_code_len) {
            Some(cmd) => self.execute(session, cmd).await,
            None => Ok(CommandReply::Ignored),
        }
    }

    /// Handles a button tap. The session encoded in the payload wins over
    /// whoever tapped it.
    pub async fn handle_button(&self, payload: &str) -> Result<(SessionId, CommandReply), Error> {
        let action = ButtonAction::decode(payload)?;
        let session = action.session().clone();
        info!(session = %session, "Button: {}", payload);
        // Same length rule as typed codes; nothing left means a usage reply.
        let codes = parse_codes(&action.codes().join(" "), self.config.min_code_len);
        let reply = self.protect(&session, codes).await?;
        Ok((session, reply))
    }

    pub async fn execute(&self, session: &SessionId, cmd: Command) -> Result<CommandReply, Error> {
        debug!(session = %session, ?cmd, "execute");

        let reply = match cmd {
            Command::Help => CommandReply::Help {
                check_delay: self.config.check_delay,
                interval: self.config.protection.interval,
            },
            Command::Add(codes) => {
                if codes.is_empty() {
                    return Ok(CommandReply::Usage(ADD_USAGE));
                }
                let outcome = self.store.add_codes(session, &codes);
                info!(session = %session, added = outcome.added.len(), "Codes added");
                CommandReply::Added(outcome)
            }
            Command::Protect(codes) => self.protect(session, codes).await?,
            Command::Check(codes) => self.run_check(session, codes).await?,
            Command::Run => self.run(session),
            Command::Stop => match self.supervisor.stop(session) {
                StopOutcome::Stopped => CommandReply::Stopped,
                StopOutcome::NotRunning => CommandReply::NotRunning,
            },
            Command::Pause(None) => CommandReply::Usage(PAUSE_USAGE),
            Command::Pause(Some(code)) => match self.store.pause(session, &code) {
                Ok(()) => CommandReply::Paused(code),
                Err(Error::Validation(_)) => CommandReply::UnknownCode(code),
                Err(e) => return Err(e),
            },
            Command::Resume(None) => CommandReply::Usage(RESUME_USAGE),
            Command::Resume(Some(code)) => match self.store.resume(session, &code) {
                Ok(()) => CommandReply::Resumed(code),
                Err(Error::Validation(_)) => CommandReply::UnknownCode(code),
                Err(e) => return Err(e),
            },
            Command::List => CommandReply::Listing(self.store.listing(session, self.engine.values())),
            Command::Clear => {
                let count = self.store.clear_all(session);
                info!(session = %session, count, "Cleared all codes");
                CommandReply::Cleared(count)
            }
            Command::Status => CommandReply::Status(self.status(session)),
            Command::Unknown(name) => CommandReply::UnknownCommand(name),
        };
        Ok(reply)
    }

    /// Adds `codes`, then starts the loop or folds them into the running one.
    async fn protect(&self, session: &SessionId, codes: Vec<String>) -> Result<CommandReply, Error> {
        if codes.is_empty() {
            return Ok(CommandReply::Usage(PROTECT_USAGE));
        }
        let outcome = self.store.add_codes(session, &codes);

        match self.supervisor.start(session) {
            StartOutcome::Started => Ok(self.started_reply(session, Some(outcome))),
            StartOutcome::AlreadyRunning => Ok(CommandReply::AddedToRunningLoop(outcome)),
        }
    }

    fn run(&self, session: &SessionId) -> CommandReply {
        let (total, _) = self.store.counts(session);
        if total == 0 {
            return CommandReply::NothingToProtect;
        }
        match self.supervisor.start(session) {
            StartOutcome::Started => self.started_reply(session, None),
            StartOutcome::AlreadyRunning => CommandReply::AlreadyRunning,
        }
    }

    fn started_reply(&self, session: &SessionId, added: Option<AddOutcome>) -> CommandReply {
        let (_, active) = self.store.counts(session);
        CommandReply::ProtectionStarted {
            added,
            active,
            scan_estimate: self.config.estimated_scan_time(active),
            cycle_estimate: self.config.estimated_cycle_time(active),
        }
    }

    /// One-shot scan of `codes`, independent of any running protection loop.
    async fn run_check(&self, session: &SessionId, codes: Vec<String>) -> Result<CommandReply, Error> {
        if codes.is_empty() {
            return Ok(CommandReply::Usage(CHECK_USAGE));
        }
        let Some(guard) = self.store.try_begin_scan(session) else {
            return Ok(CommandReply::CheckBusy);
        };

        info!(session = %session, count = codes.len(), "Instant check");
        let progress = self
            .sender
            .send_notice(session, &Notice::CheckStarted { count: codes.len() })
            .await
            .map(|msg| MessageProgress::new(self.sender.clone(), session.clone(), msg));

        // The scan runs on its own task; the slot is released when it ends,
        // even if this handler is dropped first.
        let engine = self.engine.clone();
        let report = tokio::spawn(async move {
            let _guard = guard;
            let sink = progress.as_ref().map(|p| p as &dyn ProgressSink);
            engine.scan(&codes, sink).await
        })
        .await?;

        Ok(CommandReply::CheckResults(report))
    }

    pub fn status(&self, session: &SessionId) -> StatusSnapshot {
        let (total, active) = self.store.counts(session);
        StatusSnapshot {
            total,
            active,
            paused: total - active,
            running: self.supervisor.is_running(session),
            interval_secs: self.config.protection.interval.as_secs(),
            credential_loaded: self.credential_loaded,
        }
    }
}
