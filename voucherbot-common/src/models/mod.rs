// File: voucherbot-common/src/models/mod.rs
pub mod voucher;
pub mod value;
pub mod scan;
pub mod session;
pub mod notice;

pub use voucher::{VoucherRecord, normalize_code, parse_codes, DEFAULT_MIN_CODE_LEN};
pub use value::{ValueTable, VoucherValue};
pub use scan::{CheckOutcome, ScanProgress, ScanReport, ScanResult};
pub use session::{AddOutcome, CodeListing, ListedCode, SessionId, StatusSnapshot};
pub use notice::{CycleReport, MessageRef, Notice};
