pub mod protection;

pub use protection::{ProtectionContext, ProtectionSupervisor, StartOutcome, StopOutcome};
