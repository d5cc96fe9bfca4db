// src/repositories/postgres/mod.rs

pub mod voucher;
pub mod lucky_win;

pub use voucher::PostgresVoucherRepository;
pub use lucky_win::PostgresLuckyWinRepository;
