//! Kumo Core: candles, Ichimoku lines, signal classification, and the
//! BUY/SELL/HOLD decision engine.
//!
//! This crate holds everything that does not own time:
//! - Domain types (candles, intervals, position state, actions)
//! - Ichimoku indicator lines over a candle series
//! - Five-category signal classifier
//! - Hysteretic decision engine (pure state transition)
//! - Candle feeds (Binance REST, deterministic synthetic)
//! - Reporters (log lines, CSV signal log)
//! - Bot configuration and user registration
//!
//! The evaluation loop that owns position state lives in `kumo-runner`.

pub mod components;
pub mod config;
pub mod data;
pub mod decision;
pub mod domain;
pub mod indicators;
pub mod registration;
pub mod report;
pub mod signals;
