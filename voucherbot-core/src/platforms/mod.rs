// File: src/platforms/mod.rs

pub mod voucher_api;
