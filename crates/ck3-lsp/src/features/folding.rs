//! Folding-range provider: one region per multi-line block, plus runs of
//! consecutive comment lines.

use crate::features::DocSnapshot;
use ck3_ast::NodeType;
use serde_json::{Value, json};

/// Folding ranges for the document.
pub fn folding_ranges(snapshot: &DocSnapshot) -> Vec<Value> {
    let ast = &snapshot.parse.ast;
    let mut out = Vec::new();

    for id in ast.walk() {
        let node = ast.node(id);
        if node.node_type != NodeType::Assignment || !node.is_block() {
            continue;
        }
        if node.range.end.line > node.range.start.line {
            out.push(json!({
                "startLine": node.range.start.line,
                "endLine": node.range.end.line,
                "kind": "region",
            }));
        }
    }

    // Comment runs: two or more consecutive full-line comments fold.
    let mut run_start: Option<u32> = None;
    let mut previous = 0u32;
    for (line_number, line) in snapshot.text.lines().enumerate() {
        let line_number = line_number as u32;
        let is_comment = line.trim_start().starts_with('#');
        match (is_comment, run_start) {
            (true, None) => run_start = Some(line_number),
            (true, Some(_)) => {}
            (false, Some(start)) => {
                if previous > start {
                    out.push(json!({
                        "startLine": start,
                        "endLine": previous,
                        "kind": "comment",
                    }));
                }
                run_start = None;
            }
            (false, None) => {}
        }
        if is_comment {
            previous = line_number;
        }
    }
    if let Some(start) = run_start {
        if previous > start {
            out.push(json!({ "startLine": start, "endLine": previous, "kind": "comment" }));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn ranges(text: &str) -> Vec<Value> {
        let snap = DocSnapshot {
            uri: "file:///mod/events/test.txt".into(),
            path: "mod/events/test.txt".into(),
            kind: ck3_index::FileKind::Events,
            version: 1,
            text: text.to_string(),
            parse: Arc::new(ck3_parser::parse(text)),
        };
        folding_ranges(&snap)
    }

    #[test]
    fn blocks_fold_per_brace_pair() {
        let text = "m.0001 = {\n\ttrigger = {\n\t\tis_adult = yes\n\t}\n}\n";
        let found = ranges(text);
        let regions: Vec<_> =
            found.iter().filter(|r| r["kind"] == "region").collect();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0]["startLine"], 0);
        assert_eq!(regions[0]["endLine"], 4);
    }

    #[test]
    fn single_line_blocks_do_not_fold() {
        let found = ranges("a = { b = yes }");
        assert!(found.is_empty());
    }

    #[test]
    fn comment_runs_fold() {
        let text = "# one\n# two\n# three\na = yes\n# lonely\n";
        let found = ranges(text);
        let comments: Vec<_> =
            found.iter().filter(|r| r["kind"] == "comment").collect();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["startLine"], 0);
        assert_eq!(comments[0]["endLine"], 2);
    }
}
