//! Whitespace style checks (CK3801, CK3802). Hint severity; the formatter
//! fixes both.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{Range, ScriptAst, utf16_len};

const SOURCE: &str = "ck3-style";

pub struct StyleValidator;

impl Validate for StyleValidator {
    fn name(&self) -> &'static str {
        "style"
    }

    fn validate(&self, _ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (line_number, line) in ctx.source.lines().enumerate() {
            let line_number = line_number as u32;

            let trimmed_end = line.trim_end();
            if trimmed_end.len() < line.len() {
                let start = utf16_len(trimmed_end);
                out.push(Diagnostic::new(
                    Range::on_line(line_number, start, utf16_len(line)),
                    Severity::Hint,
                    codes::TRAILING_WHITESPACE,
                    SOURCE,
                    "trailing whitespace",
                ));
            }

            let leading_spaces = line.bytes().take_while(|&b| b == b' ').count();
            if leading_spaces >= 2 {
                out.push(Diagnostic::new(
                    Range::on_line(line_number, 0, leading_spaces as u32),
                    Severity::Hint,
                    codes::SPACES_INDENT,
                    SOURCE,
                    "indentation uses spaces; this codebase indents with tabs",
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck3_index::{DocumentIndex, FileKind};
    use ck3_parser::parse;
    use ck3_schema::SchemaSet;

    fn run(source: &str) -> Vec<Diagnostic> {
        let outcome = parse(source);
        let index = DocumentIndex::new();
        let schemas = SchemaSet::from_sources(&[]).unwrap_or_else(|_| unreachable!());
        let ctx = ValidationContext {
            uri: "file:///events/test.txt",
            path: "events/test.txt",
            file_kind: FileKind::Events,
            index: &index,
            schemas: &schemas,
            source,
        };
        StyleValidator.validate(&outcome.ast, &ctx)
    }

    #[test]
    fn trailing_whitespace_is_hinted() {
        let diagnostics = run("a = yes   \nb = no");
        let trailing: Vec<_> =
            diagnostics.iter().filter(|d| d.code == codes::TRAILING_WHITESPACE).collect();
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].range.start.character, 7);
    }

    #[test]
    fn space_indentation_is_hinted() {
        let diagnostics = run("a = {\n    b = yes\n}");
        assert!(diagnostics.iter().any(|d| d.code == codes::SPACES_INDENT));
    }

    #[test]
    fn tab_indentation_is_quiet() {
        let diagnostics = run("a = {\n\tb = yes\n}");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
