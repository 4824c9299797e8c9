// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Writing conversations out as browsable files.
//!
//! [`run`] drives a whole export: it pulls the conversation array out of the
//! source page, writes a JSON snapshot and an HTML page per titled
//! conversation, drops the search widget next to them, and finishes with an
//! `index.json` listing every page in the output directory.
//!
//! Only problems with the source itself are fatal. A conversation that cannot
//! be decoded or written is logged and the export moves on.

use crate::extract::{self, ExtractError, Markers};
use crate::parser::{self, Conversation, ParseError};
use crate::renderer::{self, RenderOptions};
use crate::widget;
use snafu::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "chats";

/// Name of the page listing written after every export.
pub const INDEX_FILE: &str = "index.json";

/// Maximum length of a generated file name, without extension.
pub const MAX_BASE_NAME_LEN: usize = 100;

/// Errors that abort an export.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The source file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadInput {
        /// The source file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The conversation array could not be located.
    #[snafu(display("failed to extract conversations from {}: {source}", path.display()))]
    Extract {
        /// The source file.
        path: PathBuf,
        /// The underlying extraction error.
        source: ExtractError,
    },

    /// The scratch copy of the extracted payload could not be written.
    #[snafu(display("failed to write scratch file: {source}"))]
    Scratch {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The extracted payload is not a JSON array.
    #[snafu(display("failed to parse conversations: {source}"))]
    Parse {
        /// The underlying parsing error.
        source: ParseError,
    },

    /// The output directory could not be created.
    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        /// The output directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors affecting a single conversation. These are logged, never returned
/// from [`run`].
#[derive(Debug, Snafu)]
pub enum ConversationError {
    /// The record does not decode into a conversation.
    #[snafu(display("cannot render {}: {source}", path.display()))]
    Decode {
        /// The page that was being produced.
        path: PathBuf,
        /// The underlying decoding error.
        source: ParseError,
    },

    /// The raw record could not be serialized.
    #[snafu(display("failed to serialize {}: {source}", path.display()))]
    Serialize {
        /// The file that was being produced.
        path: PathBuf,
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// The JSON snapshot could not be written.
    #[snafu(display("failed to write JSON file {}: {source}", path.display()))]
    WriteJson {
        /// The JSON file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The HTML page could not be written.
    #[snafu(display("failed to write HTML file {}: {source}", path.display()))]
    WriteHtml {
        /// The HTML file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors while generating the page index.
#[derive(Debug, Snafu)]
pub enum IndexError {
    /// The output directory could not be listed.
    #[snafu(display("failed to list {}: {source}", path.display()))]
    ReadDir {
        /// The output directory.
        path: PathBuf,
        /// The underlying traversal error.
        source: walkdir::Error,
    },

    /// The index could not be serialized.
    #[snafu(display("failed to serialize index: {source}"))]
    SerializeIndex {
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// The index file could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteIndex {
        /// The index file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Configuration for an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Directory receiving all generated files.
    pub output_dir: PathBuf,

    /// Literals delimiting the conversation array in the source.
    pub markers: Markers,

    /// Whether repeated file names get a numeric suffix instead of
    /// overwriting the earlier file.
    pub dedupe: bool,

    /// Page rendering options.
    pub render: RenderOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            markers: Markers::default(),
            dedupe: false,
            render: RenderOptions::default(),
        }
    }
}

/// Counts from an export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Conversations whose JSON and HTML files were both written.
    pub exported: usize,
    /// Records skipped for lacking a title.
    pub skipped: usize,
    /// Titled records whose page could not be decoded or a file not written.
    pub failed: usize,
}

/// Hands out file names, optionally suffixing repeats.
///
/// With deduplication off every name is returned as is, so a later
/// conversation with the same name overwrites the earlier one.
#[derive(Debug, Default)]
pub struct NameAllocator {
    dedupe: bool,
    counts: HashMap<String, usize>,
    used: HashSet<String>,
}

impl NameAllocator {
    /// Creates an allocator.
    #[must_use]
    pub fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            counts: HashMap::new(),
            used: HashSet::new(),
        }
    }

    /// Returns the name to use for `base`.
    ///
    /// With deduplication on, the result differs from every name handed out
    /// before, including suffixed names that happen to equal another base.
    pub fn next_name(&mut self, base: &str) -> String {
        if !self.dedupe {
            return base.to_owned();
        }
        let seen = self.counts.entry(base.to_owned()).or_insert(0);
        let mut name = base.to_owned();
        while self.used.contains(&name) {
            *seen += 1;
            name = format!("{base}-{seen:03}");
        }
        self.used.insert(name.clone());
        name
    }
}

/// Derives a file system safe base name from a conversation title.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, and the result is
/// cut to [`MAX_BASE_NAME_LEN`] characters.
#[must_use]
pub fn base_name(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_NAME_LEN)
        .collect()
}

/// Runs a complete export of the chat archive at `input`.
///
/// # Errors
///
/// Returns an error if the source cannot be read, does not contain the
/// conversation array, or the output directory cannot be created. Problems
/// with individual conversations and with the index are logged instead.
pub fn run(input: &Path, opts: &ExportOptions) -> Result<Summary, Error> {
    let raw = std::fs::read_to_string(input).context(ReadInputSnafu { path: input })?;
    let json =
        extract::extract_json_array(&raw, &opts.markers).context(ExtractSnafu { path: input })?;
    drop(raw);

    let mut scratch = tempfile::Builder::new()
        .prefix("extracted_json")
        .suffix(".json")
        .tempfile()
        .context(ScratchSnafu)?;
    scratch.write_all(json.as_bytes()).context(ScratchSnafu)?;
    let scratch_path = scratch.path().to_path_buf();
    info!(path = %scratch_path.display(), "extracted JSON saved temporarily");

    let records = parser::parse_conversations(&json).context(ParseSnafu)?;
    debug!(count = records.len(), "parsed conversation records");

    std::fs::create_dir_all(&opts.output_dir).context(CreateOutputDirSnafu {
        path: &opts.output_dir,
    })?;

    match widget::write_widget(&opts.output_dir) {
        Ok(path) => info!(path = %path.display(), "saved search widget"),
        Err(e) => error!(dir = %opts.output_dir.display(), "failed to write search widget: {e}"),
    }

    let summary = export_conversations(&records, opts);

    match scratch.close() {
        Ok(()) => info!(path = %scratch_path.display(), "deleted temporary file"),
        Err(e) => warn!(path = %scratch_path.display(), "failed to delete temporary file: {e}"),
    }

    match generate_index(&opts.output_dir) {
        Ok(path) => info!(path = %path.display(), "index generated"),
        Err(e) => error!("failed to generate index: {e}"),
    }

    info!(
        exported = summary.exported,
        skipped = summary.skipped,
        failed = summary.failed,
        "export completed"
    );
    Ok(summary)
}

/// Writes the JSON snapshot and HTML page of every titled record.
///
/// Records are processed in order. Failures are logged and counted, never
/// propagated.
pub fn export_conversations(records: &[serde_json::Value], opts: &ExportOptions) -> Summary {
    let mut summary = Summary::default();
    let mut names = NameAllocator::new(opts.dedupe);

    for (index, record) in records.iter().enumerate() {
        // The snapshot needs only the title, so read it before decoding.
        let Some(title) = record_title(record) else {
            warn!("skipping conversation {index} (missing title)");
            summary.skipped += 1;
            continue;
        };

        let name = names.next_name(&base_name(title));
        let mut ok = true;

        match write_snapshot(record, &opts.output_dir, &name) {
            Ok(path) => info!(path = %path.display(), "saved JSON"),
            Err(e) => {
                error!("{e}");
                ok = false;
            }
        }

        match write_page(record, &opts.output_dir, &name, &opts.render) {
            Ok(path) => info!(path = %path.display(), "saved HTML"),
            Err(e) => {
                error!("{e}");
                ok = false;
            }
        }

        if ok {
            summary.exported += 1;
        } else {
            summary.failed += 1;
        }
    }

    summary
}

/// Writes the raw record as pretty-printed JSON to `<dir>/<name>.json`.
fn write_snapshot(
    record: &serde_json::Value,
    dir: &Path,
    name: &str,
) -> Result<PathBuf, ConversationError> {
    let path = dir.join(format!("{name}.json"));
    let json = serde_json::to_string_pretty(record).context(SerializeSnafu { path: &path })?;
    std::fs::write(&path, json).context(WriteJsonSnafu { path: &path })?;
    Ok(path)
}

/// Returns the non-empty string title of a raw record.
fn record_title(record: &serde_json::Value) -> Option<&str> {
    record
        .get("title")
        .and_then(serde_json::Value::as_str)
        .filter(|title| !title.is_empty())
}

/// Decodes the record and renders it to `<dir>/<name>.html`.
fn write_page(
    record: &serde_json::Value,
    dir: &Path,
    name: &str,
    opts: &RenderOptions,
) -> Result<PathBuf, ConversationError> {
    let path = dir.join(format!("{name}.html"));
    let conversation = Conversation::from_value(record).context(DecodeSnafu { path: &path })?;
    let html = renderer::render_conversation(&conversation, opts);
    std::fs::write(&path, html).context(WriteHtmlSnafu { path: &path })?;
    Ok(path)
}

/// Lists the HTML pages in `dir` and writes their names to `index.json`.
///
/// Names are sorted so the index does not depend on directory order.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or the index cannot be
/// written.
pub fn generate_index(dir: &Path) -> Result<PathBuf, IndexError> {
    let mut pages = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.context(ReadDirSnafu { path: dir })?;
        let is_page = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "html");
        if is_page {
            pages.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    pages.sort();

    let path = dir.join(INDEX_FILE);
    let json = serde_json::to_string_pretty(&pages).context(SerializeIndexSnafu)?;
    std::fs::write(&path, json).context(WriteIndexSnafu { path: &path })?;
    Ok(path)
}
