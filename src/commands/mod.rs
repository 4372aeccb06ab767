//! CLI commands for pagewiki

pub mod dispatch;
pub mod export;
pub mod format;
pub mod images;
pub mod init;
pub mod pages;
pub mod search;
pub mod status;
pub mod tags;
