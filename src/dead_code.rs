//! Inert marker block injection.

use crate::language::SupportedLanguage;
use tracing::debug;

/// Prepends the language's dead-code block. When the language requires an
/// opening tag and the code starts with it, the block goes right after the
/// tag instead.
pub fn inject(code: &str, language: SupportedLanguage) -> String {
    let profile = language.profile();
    let block = profile.dead_code_block;

    if let Some(tag) = profile.open_tag {
        let trimmed = code.trim_start();
        if let Some(rest) = trimmed.strip_prefix(tag) {
            let lead = &code[..code.len() - trimmed.len()];
            debug!(%language, "dead code placed after open tag");
            return format!("{lead}{tag}\n{block}{}", rest.strip_prefix('\n').unwrap_or(rest));
        }
    }

    debug!(%language, "dead code prepended");
    format!("{block}{code}")
}
