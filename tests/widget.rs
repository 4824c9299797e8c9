// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Runs the search widget's matching and navigation helpers under Node.js.
//!
//! Each test is skipped when `node` is not installed.

use std::path::Path;
use std::process::Command;

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Evaluates `body` with the widget's helpers in scope and `assert` bound to
/// Node's assertion module.
fn run_widget(body: &str) {
    if !node_available() {
        eprintln!("node not found, skipping widget test");
        return;
    }

    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/conversation.js");
    let program = format!(
        "const assert = require('assert');\n\
         const {{ escapeRegExp, buildMatcher, splitMatches, createCursor, safeDecode }} =\n\
         require(process.env.WIDGET_SCRIPT);\n\
         {body}"
    );
    let output = Command::new("node")
        .arg("-e")
        .arg(program)
        .env("WIDGET_SCRIPT", script)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "node failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn marks_every_case_insensitive_occurrence() {
    run_widget(
        r#"
        const segments = splitMatches("Hello world hello", buildMatcher("hello"));
        const marks = segments.filter(s => s.match).map(s => s.text);
        assert.deepStrictEqual(marks, ["Hello", "hello"]);
        assert.strictEqual(segments.map(s => s.text).join(""), "Hello world hello");
        assert.deepStrictEqual(segments[1], { text: " world ", match: false });
        "#,
    );
}

#[test]
fn matcher_is_reusable_across_text_nodes() {
    run_widget(
        r#"
        const regex = buildMatcher("x");
        assert.strictEqual(splitMatches("axbx", regex).filter(s => s.match).length, 2);
        assert.strictEqual(splitMatches("xx", regex).filter(s => s.match).length, 2);
        assert.deepStrictEqual(splitMatches("none", regex), [{ text: "none", match: false }]);
        "#,
    );
}

#[test]
fn special_characters_match_literally() {
    run_widget(
        r#"
        const marks = splitMatches("a.b axb a.b", buildMatcher("a.b")).filter(s => s.match);
        assert.strictEqual(marks.length, 2);
        assert.ok(marks.every(s => s.text === "a.b"));

        assert.strictEqual(escapeRegExp("(a+b)*[c]?"), "\\(a\\+b\\)\\*\\[c\\]\\?");
        const hits = splitMatches("cost $5 (approx)", buildMatcher("$5 (approx)"));
        assert.deepStrictEqual(hits.filter(s => s.match).map(s => s.text), ["$5 (approx)"]);
        "#,
    );
}

#[test]
fn next_wraps_back_to_first_match() {
    run_widget(
        r#"
        const cursor = createCursor(2);
        assert.strictEqual(cursor.index, 0);
        assert.strictEqual(cursor.next(), 1);
        assert.strictEqual(cursor.next(), 0);
        assert.strictEqual(cursor.prev(), 1);
        assert.strictEqual(cursor.index, 1);
        "#,
    );
}

#[test]
fn navigation_without_matches_does_nothing() {
    run_widget(
        r#"
        const cursor = createCursor(0);
        assert.strictEqual(cursor.index, -1);
        assert.strictEqual(cursor.next(), -1);
        assert.strictEqual(cursor.prev(), -1);
        assert.strictEqual(cursor.index, -1);
        "#,
    );
}

#[test]
fn malformed_query_encoding_is_kept_verbatim() {
    run_widget(
        r#"
        assert.strictEqual(safeDecode("caf%C3%A9"), "café");
        assert.strictEqual(safeDecode("100%"), "100%");
        "#,
    );
}
