// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The in-page search widget shipped alongside the rendered pages.
//!
//! The script is compiled into the binary and written next to the HTML files,
//! which reference it by relative path. Loading a page with `?q=term`
//! highlights every case-insensitive, literal occurrence of `term`; `n` and
//! `N` (or the on-screen buttons) step through the matches. The script also
//! drives the dark-mode toggle button.

use std::io;
use std::path::{Path, PathBuf};

/// File name the widget is written under.
pub const SCRIPT_NAME: &str = "conversation.js";

/// Source of the search widget.
pub const SCRIPT: &str = include_str!("../assets/conversation.js");

/// Writes the widget script into `dir` and returns its path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_widget(dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(SCRIPT_NAME);
    std::fs::write(&path, SCRIPT)?;
    Ok(path)
}
