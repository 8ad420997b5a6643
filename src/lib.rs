//! connview library
//!
//! Lists the machine's network connections as display rows, with a small
//! filter language, column sorting and change highlighting between refreshes.

pub mod app;
pub mod cli;
pub mod config;
pub mod filter;
pub mod network;
pub mod refresh;
pub mod rows;
pub mod sort;
pub mod tracker;
pub mod ui;
