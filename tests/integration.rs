// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for chat2html extraction, rendering and export.

use chat2html::export::{self, ExportOptions, Summary};
use chat2html::extract::{DEFAULT_END_MARKER, DEFAULT_START_MARKER};
use chat2html::parser::Order;
use std::fs;
use std::path::Path;

/// Wraps a conversation payload the way the archive page embeds it.
fn archive_page(payload: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body><div id=\"root\"></div><script>\n\
         {DEFAULT_START_MARKER}{payload}];\n\
         {DEFAULT_END_MARKER}-abc\": {{}}}};\n</script></body></html>"
    )
}

fn sample_payload() -> String {
    r#"{
        "title": "Borrow checker basics",
        "create_time": 1733356800.0,
        "current_node": "n4",
        "mapping": {
            "n0": { "message": null, "parent": null, "children": ["n1"] },
            "n1": {
                "message": {
                    "author": { "role": "system" },
                    "content": { "content_type": "text", "parts": [""] },
                    "metadata": { "is_visually_hidden_from_conversation": true }
                },
                "parent": "n0", "children": ["n2"]
            },
            "n2": {
                "message": {
                    "author": { "role": "user" },
                    "content": { "content_type": "multimodal_text", "parts": [
                        { "content_type": "image_asset_pointer", "asset_pointer": "file-service://file-img" },
                        "Why does this *not* compile?"
                    ] },
                    "metadata": { "attachments": [
                        { "id": "file-img", "mime_type": "image/png", "name": "error.png", "size": 51200 }
                    ] }
                },
                "parent": "n1", "children": ["n3"]
            },
            "n3": {
                "message": {
                    "author": { "role": "tool" },
                    "content": { "content_type": "text", "parts": ["SECRET TOOL OUTPUT"] },
                    "metadata": {}
                },
                "parent": "n2", "children": ["n4"]
            },
            "n4": {
                "message": {
                    "author": { "role": "assistant" },
                    "content": { "content_type": "text", "parts": ["You are **moving** the value."] },
                    "metadata": {}
                },
                "parent": "n3", "children": []
            }
        }
    },
    { "mapping": {} },
    {
        "title": "Second / chat",
        "mapping": {
            "a": {
                "message": {
                    "author": { "role": "assistant" },
                    "content": { "parts": [""] },
                    "metadata": {}
                }
            },
            "b": {
                "message": {
                    "author": { "role": "user" },
                    "content": { "parts": ["Hello world hello"] },
                    "metadata": {}
                }
            }
        }
    }"#
    .to_owned()
}

fn write_archive(dir: &Path, payload: &str) -> std::path::PathBuf {
    let path = dir.join("chat.html");
    fs::write(&path, archive_page(payload)).unwrap();
    path
}

fn export_options(dir: &Path) -> ExportOptions {
    ExportOptions {
        output_dir: dir.join("chats"),
        ..Default::default()
    }
}

#[test]
fn exports_every_titled_conversation() {
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), &sample_payload());
    let opts = export_options(temp.path());

    let summary = export::run(&input, &opts).unwrap();

    assert_eq!(
        summary,
        Summary {
            exported: 2,
            skipped: 1,
            failed: 0
        }
    );

    let out = &opts.output_dir;
    for name in ["Borrow_checker_basics", "Second___chat"] {
        assert!(out.join(format!("{name}.json")).is_file(), "{name}.json");
        assert!(out.join(format!("{name}.html")).is_file(), "{name}.html");
    }
    assert!(out.join("conversation.js").is_file());

    let index: Vec<String> =
        serde_json::from_str(&fs::read_to_string(out.join("index.json")).unwrap()).unwrap();
    assert_eq!(index, ["Borrow_checker_basics.html", "Second___chat.html"]);
}

#[test]
fn rendered_page_contains_visible_messages_only() {
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), &sample_payload());
    let opts = export_options(temp.path());

    export::run(&input, &opts).unwrap();

    let html = fs::read_to_string(opts.output_dir.join("Borrow_checker_basics.html")).unwrap();

    assert!(html.contains("<title>Borrow checker basics</title>"));
    assert!(html.contains("2024-12-05 00:00 UTC"));
    assert!(html.contains("Why does this <em>not</em> compile?"));
    assert!(html.contains("You are <strong>moving</strong> the value."));
    assert!(html.contains("src=\"file-service://file-img\""));
    assert!(html.contains("error.png (50 KB)"));
    assert!(!html.contains("SECRET TOOL OUTPUT"));
    assert!(!html.contains("message system"));
    assert!(!html.contains("image_asset_pointer"));
    assert!(html.contains("<script src=\"conversation.js\"></script>"));
}

#[test]
fn empty_assistant_message_is_dropped_but_user_kept() {
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), &sample_payload());
    let opts = export_options(temp.path());

    export::run(&input, &opts).unwrap();

    let html = fs::read_to_string(opts.output_dir.join("Second___chat.html")).unwrap();
    assert!(!html.contains("message assistant"));
    assert!(html.contains("<p>Hello world hello</p>"));
}

#[test]
fn json_snapshot_round_trips() {
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), &sample_payload());
    let opts = export_options(temp.path());

    export::run(&input, &opts).unwrap();

    let originals: Vec<serde_json::Value> =
        serde_json::from_str(&format!("[{}]", sample_payload())).unwrap();
    let written: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(opts.output_dir.join("Borrow_checker_basics.json")).unwrap(),
    )
    .unwrap();

    assert_eq!(written, originals[0]);
}

#[test]
fn thread_order_renders_active_branch() {
    let payload = r#"{
        "title": "Branches",
        "current_node": "old",
        "mapping": {
            "new": { "message": { "author": { "role": "assistant" }, "content": { "parts": ["NEW ANSWER"] } }, "parent": "q" },
            "q": { "message": { "author": { "role": "user" }, "content": { "parts": ["QUESTION"] } }, "parent": null, "children": ["old", "new"] },
            "old": { "message": { "author": { "role": "assistant" }, "content": { "parts": ["OLD ANSWER"] } }, "parent": "q" }
        }
    }"#;
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), payload);

    let mut opts = export_options(temp.path());
    export::run(&input, &opts).unwrap();
    let mapping_html = fs::read_to_string(opts.output_dir.join("Branches.html")).unwrap();
    assert!(mapping_html.contains("NEW ANSWER"));
    assert!(mapping_html.find("NEW ANSWER").unwrap() < mapping_html.find("QUESTION").unwrap());

    opts.render.order = Order::Thread;
    export::run(&input, &opts).unwrap();
    let thread_html = fs::read_to_string(opts.output_dir.join("Branches.html")).unwrap();
    assert!(!thread_html.contains("NEW ANSWER"));
    assert!(thread_html.find("QUESTION").unwrap() < thread_html.find("OLD ANSWER").unwrap());
}

#[test]
fn empty_payload_writes_empty_index() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("chat.html");
    fs::write(
        &input,
        format!("{DEFAULT_START_MARKER}\n{DEFAULT_END_MARKER}\": 1}}"),
    )
    .unwrap();
    let opts = export_options(temp.path());

    let summary = export::run(&input, &opts).unwrap();

    assert_eq!(summary, Summary::default());
    let index = fs::read_to_string(opts.output_dir.join("index.json")).unwrap();
    assert_eq!(index, "[]");
}

#[test]
fn missing_markers_are_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("chat.html");
    fs::write(&input, "<html>nothing embedded</html>").unwrap();
    let opts = export_options(temp.path());

    let err = export::run(&input, &opts).unwrap_err();

    assert!(matches!(err, export::Error::Extract { .. }));
    assert!(!opts.output_dir.exists());
}

#[test]
fn malformed_payload_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let input = write_archive(temp.path(), r#"{"title": "broken", "#);
    let opts = export_options(temp.path());

    let err = export::run(&input, &opts).unwrap_err();

    assert!(matches!(err, export::Error::Parse { .. }));
    assert!(err.to_string().contains("failed to parse JSON"));
}

#[test]
fn missing_input_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let err = export::run(&temp.path().join("absent.html"), &export_options(temp.path()))
        .unwrap_err();

    assert!(matches!(err, export::Error::ReadInput { .. }));
}
