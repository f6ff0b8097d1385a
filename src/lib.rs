//! Plant Explorer
//!
//! 植物名の検索・写真からの特定・健康診断をAIで行い、検索履歴を保存する。

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod gateway;
pub mod history;
pub mod image_input;
pub mod session;
pub mod thumbnail;
