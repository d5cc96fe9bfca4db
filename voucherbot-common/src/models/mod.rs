// File: voucherbot-common/src/models/mod.rs
pub mod voucher;
pub mod lucky_win;
pub mod allocation;

pub use voucher::{NewVoucher, Voucher, VoucherKind};
pub use lucky_win::LuckyWin;
pub use allocation::{AllocationOutcome, IssuedVoucher, VoucherStats};
