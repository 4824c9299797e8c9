// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for exported chat archives.
//!
//! The archive payload is an array of conversation objects. Each conversation
//! stores its messages in a `mapping` object keyed by opaque node ids, where
//! every node may hold a message and links to its parent and children.
//!
//! # Format Overview
//!
//! A conversation contains:
//! - A `title` (conversations without one are ignored)
//! - A `mapping` of node id to node, in source order
//! - Optionally `create_time` and `current_node` (the leaf of the active branch)
//!
//! # Example
//!
//! ```
//! use chat2html::parser::{parse_conversations, Conversation, Order};
//!
//! let json = r#"[{
//!     "title": "Greetings",
//!     "mapping": {
//!         "a": { "message": {
//!             "author": { "role": "user" },
//!             "content": { "parts": ["Hello"] }
//!         } }
//!     }
//! }]"#;
//!
//! let records = parse_conversations(json).unwrap();
//! let conversation = Conversation::from_value(&records[0]).unwrap();
//! assert_eq!(conversation.title.as_deref(), Some("Greetings"));
//! assert_eq!(conversation.linearize(Order::Mapping).len(), 1);
//! ```

use serde::{Deserialize, Deserializer};
use snafu::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The payload is not a JSON array.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// A single conversation record does not match the expected shape.
    #[snafu(display("failed to decode conversation: {source}"))]
    Decode {
        /// The underlying decoding error.
        source: serde_json::Error,
    },
}

/// One exported conversation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Conversation {
    /// The conversation title, if any.
    #[serde(default)]
    pub title: Option<String>,

    /// Creation time in fractional Unix seconds.
    #[serde(default)]
    pub create_time: Option<f64>,

    /// Id of the leaf node of the branch that was last shown.
    #[serde(default)]
    pub current_node: Option<String>,

    /// Message nodes in source order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mapping: Mapping,
}

/// The node table of a conversation, keeping the order keys appear in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    nodes: Vec<(String, Node)>,
    index: HashMap<String, usize>,
}

impl Mapping {
    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i].1)
    }

    /// Iterates over `(id, node)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Returns the number of nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if there are no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut mapping = Self::default();
        for (key, node) in iter {
            if let Some(&i) = mapping.index.get(&key) {
                mapping.nodes[i].1 = node;
            } else {
                mapping.index.insert(key.clone(), mapping.nodes.len());
                mapping.nodes.push((key, node));
            }
        }
        mapping
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `preserve_order` keeps the map in source order.
        let map = serde_json::Map::deserialize(deserializer)?;
        map.into_iter()
            .map(|(key, value)| {
                serde_json::from_value(value)
                    .map(|node| (key, node))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// A node in the message tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Node {
    /// The message stored at this node. Structural nodes have none.
    #[serde(default)]
    pub message: Option<Message>,

    /// Id of the parent node.
    #[serde(default)]
    pub parent: Option<String>,

    /// Ids of the child nodes, oldest first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<String>,
}

/// A single message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,

    /// The message body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Content,

    /// Attachments and display flags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
}

impl Message {
    /// Joins the text parts with newlines and trims the result.
    ///
    /// Non-text parts are dropped.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .flatten()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_owned()
    }
}

/// The author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Author {
    /// The author's role.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
}

/// The role a message was written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Role {
    /// A person typing into the chat.
    #[default]
    User,
    /// The model's reply.
    Assistant,
    /// System or developer instructions.
    System,
    /// Output of a tool call.
    Tool,
    /// Any other role, kept verbatim.
    Other(String),
}

impl Role {
    /// Returns the role name as it appears in the export.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Other(name),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body of a message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Content {
    /// The message parts. `None` when the export has no `parts` field.
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

/// One entry of a message's `parts` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Markdown text.
    Text(String),
    /// Anything else (image pointers, tool payloads). Never rendered.
    Other(serde_json::Value),
}

impl Part {
    /// Returns the text of a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other(_) => None,
        }
    }
}

/// Message metadata relevant to rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    /// Files attached to the message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,

    /// Set on messages the chat UI never displays.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_visually_hidden_from_conversation: bool,
}

/// A file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    /// File service id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// MIME type, e.g. `image/png`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mime_type: String,
    /// Original file name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Size in bytes.
    #[serde(default, deserialize_with = "byte_size")]
    pub size: u64,
}

impl Attachment {
    /// Returns `true` for image attachments.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Size in kilobytes, rounded to the nearest integer with halves rounding up.
    #[must_use]
    pub const fn size_kb(&self) -> u64 {
        self.size.saturating_add(512) / 1024
    }
}

/// How messages are ordered when a conversation is linearized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// The order nodes appear in the mapping.
    #[default]
    Mapping,
    /// The parent chain of the active branch, root first.
    Thread,
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mapping" => Ok(Self::Mapping),
            "thread" => Ok(Self::Thread),
            other => Err(format!("unknown order {other:?} (expected mapping or thread)")),
        }
    }
}

impl Conversation {
    /// Decodes one conversation record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not an object of the expected shape,
    /// e.g. a non-string `title`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ParseError> {
        Self::deserialize(value).context(DecodeSnafu)
    }

    /// Returns the title if it is present and not empty.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }

    /// Returns the messages that carry content parts, in the requested order.
    ///
    /// Filtering by role or visibility is left to the renderer.
    #[must_use]
    pub fn linearize(&self, order: Order) -> Vec<&Message> {
        let ids: Vec<&str> = match order {
            Order::Mapping => self.mapping.iter().map(|(id, _)| id).collect(),
            Order::Thread => {
                let thread = self.thread_ids();
                if thread.is_empty() {
                    self.mapping.iter().map(|(id, _)| id).collect()
                } else {
                    thread
                }
            }
        };

        ids.into_iter()
            .filter_map(|id| self.mapping.get(id)?.message.as_ref())
            .filter(|message| message.content.parts.is_some())
            .collect()
    }

    /// Node ids of the active branch, root first.
    fn thread_ids(&self) -> Vec<&str> {
        if let Some(leaf) = self.current_node.as_deref()
            && self.mapping.get(leaf).is_some()
        {
            let mut seen = HashSet::new();
            let mut chain = Vec::new();
            let mut cursor = Some(leaf);
            while let Some(id) = cursor {
                let Some(node) = self.mapping.get(id) else {
                    break;
                };
                if !seen.insert(id) {
                    break;
                }
                chain.push(id);
                cursor = node.parent.as_deref();
            }
            chain.reverse();
            return chain;
        }

        let Some((root, _)) = self.mapping.iter().find(|(_, node)| {
            node.parent
                .as_deref()
                .is_none_or(|parent| self.mapping.get(parent).is_none())
        }) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            cursor = self
                .mapping
                .get(id)
                .and_then(|node| node.children.last())
                .map(String::as_str)
                .filter(|child| self.mapping.get(child).is_some());
        }
        chain
    }
}

/// Parses the extracted payload into raw conversation records.
///
/// Records are kept as [`serde_json::Value`] so they can be written back out
/// unchanged; decode each one with [`Conversation::from_value`].
///
/// # Errors
///
/// Returns an error if the payload is not a JSON array.
pub fn parse_conversations(json: &str) -> Result<Vec<serde_json::Value>, ParseError> {
    serde_json::from_str(json).context(JsonSnafu)
}

/// Deserializes `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a byte count, accepting `null` and rounding fractional values.
fn byte_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = value.as_ref().and_then(|v| {
        v.as_u64().or_else(|| {
            v.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        })
    });
    Ok(size.unwrap_or_default())
}
