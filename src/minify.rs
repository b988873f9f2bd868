//! Whitespace minification.

use crate::language::SupportedLanguage;
use crate::lexer::{splice, Lexer};
use tracing::debug;

/// Collapses formatting. Whitespace-insensitive languages lose line breaks
/// and indentation; whitespace-sensitive ones only lose blank lines.
pub fn minify(code: &str, language: SupportedLanguage) -> String {
    let lexer = Lexer::new(code, language);
    let profile = lexer.profile();

    let replacements: Vec<_> = if profile.whitespace_sensitive {
        lexer
            .find_blank_line_runs()
            .into_iter()
            .map(|range| (range, "\n".to_string()))
            .collect()
    } else {
        lexer
            .find_indented_line_breaks()
            .into_iter()
            .map(|range| {
                // Joining onto a line comment would comment out the next line.
                let line = lexer.line_before(range.start);
                let keep_break = profile
                    .line_comment_markers()
                    .any(|marker| line.contains(marker));
                let joiner = if keep_break { "\n" } else { " " };
                (range, joiner.to_string())
            })
            .collect()
    };

    debug!(collapsed = replacements.len(), %language, "minify pass complete");
    splice(code, replacements)
}
