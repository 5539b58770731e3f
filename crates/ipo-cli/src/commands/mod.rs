//! CLI 명령 구현.

pub mod daemon;
pub mod fetch;
pub mod probe;
pub mod save_detail;
pub mod show;
