// File: voucherbot-common/src/traits/mod.rs
pub mod checker_traits;
pub mod notifier_traits;

pub use checker_traits::VoucherChecker;
pub use notifier_traits::Notifier;
