// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Locating the conversation array embedded in an exported chat page.
//!
//! The export is a single HTML document whose inline script assigns the
//! conversation list to a variable. There is no structured way to find it,
//! so the payload is cut out between two literal markers. Any change to the
//! upstream page layout shows up here as a [`ExtractError`] rather than as
//! garbage further down the pipeline.
//!
//! # Example
//!
//! ```
//! use chat2html::extract::{extract_json_array, Markers};
//!
//! let page = r#"<script>var jsonData = [{"title": "Hi"}];
//! var assetsJson = {"file-service://x": 1}</script>"#;
//!
//! let json = extract_json_array(page, &Markers::default()).unwrap();
//! assert_eq!(json, r#"[{"title": "Hi"}]"#);
//! ```

use snafu::prelude::*;

/// Default text preceding the conversation array.
pub const DEFAULT_START_MARKER: &str = "var jsonData = [";

/// Default text following the conversation array.
pub const DEFAULT_END_MARKER: &str = r#"var assetsJson = {"file-service"#;

/// Error type for payload extraction failures.
#[derive(Debug, Snafu)]
pub enum ExtractError {
    /// The start marker does not occur in the input.
    #[snafu(display("could not locate start marker {marker:?} in input"))]
    MissingStartMarker {
        /// The marker that was searched for.
        marker: String,
    },

    /// The end marker does not occur after the start marker.
    #[snafu(display("could not locate end marker {marker:?} after start marker"))]
    MissingEndMarker {
        /// The marker that was searched for.
        marker: String,
    },
}

/// The pair of literals delimiting the embedded JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Text immediately before the payload.
    pub start: String,
    /// Text immediately after the payload.
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_owned(),
            end: DEFAULT_END_MARKER.to_owned(),
        }
    }
}

/// Cuts the conversation array out of `raw` and coerces it into a JSON array.
///
/// The text between the first start marker and the first end marker after it
/// is trimmed, stripped of a trailing `;`, and wrapped in `[`/`]` where those
/// are missing. The result is not validated as JSON; see
/// [`parse_conversations`](crate::parser::parse_conversations).
///
/// # Errors
///
/// Returns an error if either marker cannot be found.
pub fn extract_json_array(raw: &str, markers: &Markers) -> Result<String, ExtractError> {
    let start = raw
        .find(&markers.start)
        .context(MissingStartMarkerSnafu {
            marker: &markers.start,
        })?
        + markers.start.len();

    let end = raw[start..]
        .find(&markers.end)
        .context(MissingEndMarkerSnafu {
            marker: &markers.end,
        })?
        + start;

    Ok(coerce_array(&raw[start..end]))
}

/// Normalizes a payload fragment into something shaped like a JSON array.
fn coerce_array(fragment: &str) -> String {
    let mut body = fragment.trim();
    while let Some(stripped) = body.strip_suffix(';') {
        body = stripped.trim_end();
    }

    let mut json = String::with_capacity(body.len() + 2);
    if !body.starts_with('[') {
        json.push('[');
    }
    json.push_str(body);
    if !body.ends_with(']') {
        json.push(']');
    }
    json
}
