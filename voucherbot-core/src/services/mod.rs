// File: voucherbot-core/src/services/mod.rs

pub mod replenish_service;
pub mod voucher_service;

pub use replenish_service::ReplenishService;
pub use voucher_service::VoucherService;
