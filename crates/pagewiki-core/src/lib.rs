//! Pagewiki Core Library
//!
//! Local page store, tag index, image attachments and the window-local cache
//! that keeps several windows of the wiki consistent with one store file.

pub mod cache;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod export;
pub mod format;
pub mod logging;
pub mod page;
pub mod suggest;
