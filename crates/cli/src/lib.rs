//! The `offsign` command-line tool.
//!
//! Adds content to a storage node, starts an offline-signed upload and
//! signs every stage locally until the node reports the upload complete.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
