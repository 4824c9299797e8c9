// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert exported chat archives into browsable HTML pages.
//!
//! A chat archive export is a single HTML page with every conversation
//! embedded as a JSON array in an inline script. This crate cuts that array
//! out, and writes a standalone page and a JSON snapshot per conversation,
//! plus a small search script that highlights a `?q=` term inside a page.
//!
//! # Overview
//!
//! 1. [`extract`] locates the JSON payload between two literal markers
//! 2. [`parser`] decodes conversations and linearizes their message trees
//! 3. [`renderer`] turns a conversation into an HTML document
//! 4. [`export`] writes the files, the search [`widget`], and the page index
//!
//! # Example
//!
//! ```no_run
//! use chat2html::export::{self, ExportOptions};
//! use std::path::Path;
//!
//! let summary = export::run(Path::new("chat.html"), &ExportOptions::default()).unwrap();
//! println!("{} conversations exported", summary.exported);
//! ```

#![deny(missing_docs)]

pub mod export;
pub mod extract;
pub mod parser;
pub mod renderer;
pub mod widget;
