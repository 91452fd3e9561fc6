//! voucherbot-server/src/context.rs
//!
//! Wires the core services together for the console server.

use std::sync::Arc;

use tracing::{info, warn};
use voucherbot_common::traits::Notifier;
use voucherbot_core::platforms::voucher_api::{CookieBlob, VoucherApiClient};
use voucherbot_core::services::{CommandService, MessageSender, Pacer, ScanEngine, SessionStore};
use voucherbot_core::tasks::{ProtectionContext, ProtectionSupervisor};
use voucherbot_core::{BotConfig, DefaultHttpClient};

pub struct ServerContext {
    pub command_service: Arc<CommandService>,
    pub supervisor: Arc<ProtectionSupervisor>,
    pub store: Arc<SessionStore>,
}

impl ServerContext {
    pub fn new(config: BotConfig, cookie: Option<CookieBlob>, notifier: Arc<dyn Notifier>) -> Self {
        let credential_loaded = cookie.is_some();
        if credential_loaded {
            info!("Cookies loaded from {}", config.cookies_path.display());
        } else {
            warn!(
                "No cookies at {}; every check will report a network error",
                config.cookies_path.display()
            );
        }

        // 1) Remote checker + scan engine
        let checker = Arc::new(VoucherApiClient::new(
            Arc::new(DefaultHttpClient::new()),
            config.api.clone(),
            cookie,
        ));
        let engine = Arc::new(ScanEngine::new(
            checker,
            Pacer::new(config.check_delay),
            Arc::new(config.value_table.clone()),
        ));

        // 2) Outbound notices
        let sender = Arc::new(MessageSender::new(notifier, config.notify.clone()));

        // 3) Session state + protection loops
        let store = Arc::new(SessionStore::new());
        let supervisor = Arc::new(ProtectionSupervisor::new(ProtectionContext {
            store: store.clone(),
            engine: engine.clone(),
            sender: sender.clone(),
            config: config.protection.clone(),
        }));

        // 4) Commands
        let command_service = Arc::new(CommandService::new(
            store.clone(),
            engine,
            sender,
            supervisor.clone(),
            config,
            credential_loaded,
        ));

        Self {
            command_service,
            supervisor,
            store,
        }
    }
}
