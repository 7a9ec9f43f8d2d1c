// src/lib.rs — Library root for winear

pub mod api;
pub mod cli;
pub mod infra;
pub mod interview;
pub mod provider;
pub mod recommend;
pub mod storage;
