// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering for parsed conversations.
//!
//! This module turns a [`Conversation`] into a self-contained HTML page. Each
//! visible message becomes a block tagged with its role; message text is
//! treated as Markdown and converted with `pulldown-cmark`.
//!
//! # Output Format
//!
//! The rendered page includes:
//! - The conversation title as `<title>` and `<h1>`
//! - The creation date, when the export has one
//! - A dark-mode toggle button
//! - One `message` block per visible message, with image attachments
//! - A script reference to the search widget
//!
//! # Example
//!
//! ```
//! use chat2html::parser::Conversation;
//! use chat2html::renderer::{render_conversation, RenderOptions};
//!
//! let conversation = Conversation::from_value(&serde_json::json!({
//!     "title": "Greetings",
//!     "mapping": {
//!         "a": { "message": {
//!             "author": { "role": "user" },
//!             "content": { "parts": ["Hello **there**"] }
//!         } }
//!     }
//! }))
//! .unwrap();
//!
//! let html = render_conversation(&conversation, &RenderOptions::default());
//!
//! assert!(html.contains("<title>Greetings</title>"));
//! assert!(html.contains("<strong>there</strong>"));
//! ```

use crate::parser::{Attachment, Conversation, Message, Order, Role};
use chrono::DateTime;
use pulldown_cmark::{Event, Options, Parser, html};
use std::fmt::Write;

/// Script reference emitted when none is configured.
pub const DEFAULT_SCRIPT_SRC: &str = "conversation.js";

/// Configuration options for HTML rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// How messages are ordered on the page.
    pub order: Order,

    /// Value of the `src` attribute of the search widget script tag.
    pub script_src: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            order: Order::Mapping,
            script_src: DEFAULT_SCRIPT_SRC.to_owned(),
        }
    }
}

const STYLE: &str = "\
:root { --bg-color: #f9f9f9; --text-color: #000; --message-bg-user: #fff3e0; --message-bg-assistant: #e3f2fd; --highlight-match: pink; --highlight-current: lightgreen; }
.dark-mode { --bg-color: #1e1e1e; --text-color: #ffffff; --message-bg-user: #5a5a5a; --message-bg-assistant: #2a2a2a; --highlight-match: #ff79c6; --highlight-current: #50fa7b; }
body { font-family: Inter, Arial, Helvetica, sans-serif; background-color: var(--bg-color); color: var(--text-color); padding: 5px; }
h1 { text-align: center; }
.created { text-align: center; opacity: 0.7; }
.chat-container { max-width: 800px; margin: auto; padding: 5px; background: var(--bg-color); border-radius: 8px; box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1); }
.message { padding: 5px; margin: 5px 0; border-radius: 8px; }
.author { font-weight: bold; margin-bottom: 5px; }
.content { white-space: pre-wrap; }
.content pre { overflow-x: auto; }
.user { background: var(--message-bg-user); }
.assistant { background: var(--message-bg-assistant); }
.attachment img { max-width: 100%; height: auto; }
#darkModeToggle { position: fixed; top: 10px; left: 10px; padding: 8px 12px; font-size: 14px; background: #007bff; color: white; border: none; border-radius: 5px; cursor: pointer; }
#darkModeToggle:hover { background: #0056b3; }
.highlight-match { background-color: var(--highlight-match); color: black; font-weight: bold; padding: 2px; border-radius: 3px; }
.highlight-current { background-color: var(--highlight-current); }
";

/// Renders a conversation as a complete HTML document.
///
/// Messages are taken in [`RenderOptions::order`] and filtered through
/// [`render_message`].
#[must_use]
pub fn render_conversation(conversation: &Conversation, opts: &RenderOptions) -> String {
    let title = escape_html(conversation.display_title().unwrap_or_default());

    let mut body = String::from("<div class=\"chat-container\">\n");
    for message in conversation.linearize(opts.order) {
        if let Some(block) = render_message(message) {
            body.push_str(&block);
        }
    }
    body.push_str("</div>\n");

    let created = conversation
        .create_time
        .and_then(format_timestamp)
        .map(|ts| format!("    <p class=\"created\">{ts}</p>\n"))
        .unwrap_or_default();

    format!(
        "\
<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"UTF-8\">
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
    <title>{title}</title>
    <style>
{STYLE}    </style>
</head>
<body>
    <h1>{title}</h1>
{created}    <button id=\"darkModeToggle\">🌙 Dark Mode</button>
{body}    <script src=\"{script}\"></script>
</body>
</html>
",
        script = escape_html(&opts.script_src),
    )
}

/// Renders one message block, or `None` if the message is not shown.
///
/// A message is dropped when it is a tool message, when it is flagged as
/// hidden, when it is an assistant message without text, or when it is a
/// system message with neither text nor image attachments.
#[must_use]
pub fn render_message(message: &Message) -> Option<String> {
    let role = &message.author.role;
    let text = message.text();
    let attachments = render_attachments(&message.metadata.attachments);

    let skip = match role {
        Role::Tool => true,
        Role::System => text.is_empty() && attachments.is_empty(),
        Role::Assistant => text.is_empty(),
        Role::User | Role::Other(_) => false,
    };
    if skip || message.metadata.is_visually_hidden_from_conversation {
        return None;
    }

    let role = escape_html(role.as_str());
    Some(format!(
        "    <div class=\"message {role}\">
        <div class=\"author\">{role}</div>
        <div class=\"content\">{content}{attachments}</div>
    </div>
",
        content = markdown_to_html(&text),
    ))
}

/// Renders the image attachments of a message. Other attachments are ignored.
fn render_attachments(attachments: &[Attachment]) -> String {
    let mut out = String::new();
    for attachment in attachments.iter().filter(|a| a.is_image()) {
        let name = escape_html(&attachment.name);
        write!(
            out,
            "
                <div class=\"attachment\">
                    <img src=\"file-service://{id}\" alt=\"{name}\" width=\"300\">
                    <p><i>{name} ({kb} KB)</i></p>
                </div>",
            id = escape_html(&attachment.id),
            kb = attachment.size_kb(),
        )
        .unwrap();
    }
    out
}

/// Converts Markdown to HTML.
///
/// Raw HTML in the source is escaped so it shows up as text rather than
/// becoming part of the page.
fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Formats fractional Unix seconds as a UTC date and time.
fn format_timestamp(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (seconds * 1000.0) as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}

/// Escapes the characters that are significant in HTML text and attributes.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}
