// File: src/services/mod.rs

pub mod pacer;
pub mod scan_service;
pub mod session_store;
pub mod message_sender;
pub mod command_service;

pub use pacer::Pacer;
pub use scan_service::{DedupProgress, ProgressSink, ScanEngine};
pub use session_store::{ProtectionHandle, ScanGuard, Session, SessionStore};
pub use message_sender::{MessageProgress, MessageSender};
pub use command_service::{ButtonAction, Command, CommandReply, CommandService};
