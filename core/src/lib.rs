//! turf-core — the persistent economy and contest-resolution engine.
//!
//! Request-driven: every gameplay request names one acting account
//! (and optionally a target). Handlers load the account, run lazy
//! resets and passive-production settlement, execute the operation,
//! then persist. No background scheduler exists; daily and hourly
//! state is computed on the next read.

pub mod account;
pub mod accrual;
pub mod bonus;
pub mod catalog;
pub mod clock;
pub mod combat;
pub mod engine;
pub mod error;
pub mod event;
pub mod market;
pub mod referral;
pub mod regen;
pub mod rng;
pub mod store;
pub mod types;
