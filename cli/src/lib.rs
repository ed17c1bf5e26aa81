//! FlowState: an energy-aware day planner backed by a generative model.

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod planner;
pub mod response;
pub mod scenarios;
pub mod speech;
pub mod types;
pub mod ui;
