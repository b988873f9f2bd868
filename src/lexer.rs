//! Shallow lexical layer shared by every pass.
//!
//! This is pattern matching, not parsing: quoted spans are found textually,
//! so an apostrophe inside a comment can pair with a later quote and escaped
//! quotes are not understood. Passes accept those limits.

use crate::language::{LanguageProfile, SupportedLanguage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

static QUOTED_LITERAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).expect("static literal pattern"));

static INDENTED_BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s+").expect("static indentation pattern"));

static BLANK_LINE_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t\r]*\n)+").expect("static blank line pattern"));

static MODULE_PATH_REGEXES: Lazy<HashMap<SupportedLanguage, Regex>> = Lazy::new(|| {
    SupportedLanguage::all()
        .into_iter()
        .filter_map(|language| {
            let pattern = language.profile().module_path_pattern?;
            Some((language, Regex::new(pattern).expect("static module path pattern")))
        })
        .collect()
});

/// Content shorter than this is left alone by the recoder.
pub const MIN_CONCEALABLE_LEN: usize = 2;

/// A single- or double-quoted span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedLiteral {
    pub quote: char,
    /// Byte range of the text between the quotes.
    pub content: Range<usize>,
    /// Byte range including both quotes.
    pub span: Range<usize>,
}

impl QuotedLiteral {
    pub fn content_len(&self, source: &str) -> usize {
        source[self.content.clone()].chars().count()
    }

    pub fn is_concealable(&self, source: &str) -> bool {
        self.content_len(source) >= MIN_CONCEALABLE_LEN
    }
}

/// Query surface over one immutable input string.
pub struct Lexer<'a> {
    source: &'a str,
    profile: &'static LanguageProfile,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, language: SupportedLanguage) -> Self {
        Self {
            source,
            profile: language.profile(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn profile(&self) -> &'static LanguageProfile {
        self.profile
    }

    /// Byte ranges where `identifier` appears as a whole word.
    pub fn find_whole_word_occurrences(&self, identifier: &str) -> Vec<Range<usize>> {
        if identifier.is_empty() {
            return Vec::new();
        }
        let pattern = format!(r"\b{}\b", regex::escape(identifier));
        match Regex::new(&pattern) {
            Ok(regex) => regex.find_iter(self.source).map(|m| m.range()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Whole-word occurrences that do not sit inside a quoted literal, plus
    /// those inside the `{...}` parts of interpolated literals.
    pub fn find_code_word_occurrences(&self, identifier: &str) -> Vec<Range<usize>> {
        let literals = self.find_quoted_literals();
        self.find_whole_word_occurrences(identifier)
            .into_iter()
            .filter(|hit| {
                match literals
                    .iter()
                    .find(|lit| lit.span.start < hit.start && hit.end < lit.span.end)
                {
                    None => true,
                    Some(lit) => self
                        .interpolation_ranges(lit)
                        .iter()
                        .any(|part| part.start <= hit.start && hit.end <= part.end),
                }
            })
            .collect()
    }

    /// True when the literal carries the language's interpolation prefix,
    /// possibly combined with other one-letter string prefixes (`rf"..."`).
    pub fn is_interpolated(&self, literal: &QuotedLiteral) -> bool {
        let Some(marker) = self.profile.interpolation_prefix else {
            return false;
        };
        let before = &self.source[..literal.span.start];
        let prefix_len = before
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if prefix_len == 0 || prefix_len > 2 {
            return false;
        }
        let prefix = &before[before.len() - prefix_len..];
        let word_start = before[..before.len() - prefix_len]
            .bytes()
            .next_back()
            .map_or(true, |b| !(b.is_ascii_alphanumeric() || b == b'_'));
        word_start
            && prefix.chars().all(|c| "rRbBuUfF".contains(c))
            && prefix.chars().any(|c| c.eq_ignore_ascii_case(&marker))
    }

    /// Byte ranges of the `{...}` expressions inside an interpolated literal.
    /// Doubled braces are escapes and yield nothing.
    pub fn interpolation_ranges(&self, literal: &QuotedLiteral) -> Vec<Range<usize>> {
        if !self.is_interpolated(literal) {
            return Vec::new();
        }
        let content = &self.source[literal.content.clone()];
        let bytes = content.as_bytes();
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => i += 2,
                b'{' => match content[i + 1..].find('}') {
                    Some(len) => {
                        let start = literal.content.start + i + 1;
                        ranges.push(start..start + len);
                        i += len + 2;
                    }
                    None => break,
                },
                _ => i += 1,
            }
        }
        ranges
    }

    /// Spans of statements whose literals name modules (`import "fmt"`).
    pub fn find_module_path_spans(&self) -> Vec<Range<usize>> {
        MODULE_PATH_REGEXES
            .get(&self.profile.language)
            .map(|regex| regex.find_iter(self.source).map(|m| m.range()).collect())
            .unwrap_or_default()
    }

    pub fn contains_word(&self, identifier: &str) -> bool {
        !self.find_whole_word_occurrences(identifier).is_empty()
    }

    /// Every quoted span on a single line, scanning left to right.
    pub fn find_quoted_literals(&self) -> Vec<QuotedLiteral> {
        QUOTED_LITERAL_REGEX
            .captures_iter(self.source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let (quote, content) = match (caps.get(1), caps.get(2)) {
                    (Some(inner), _) => ('"', inner),
                    (None, Some(inner)) => ('\'', inner),
                    (None, None) => return None,
                };
                Some(QuotedLiteral {
                    quote,
                    content: content.range(),
                    span: whole.range(),
                })
            })
            .collect()
    }

    /// A newline followed by at least one whitespace character.
    pub fn find_indented_line_breaks(&self) -> Vec<Range<usize>> {
        INDENTED_BREAK_REGEX
            .find_iter(self.source)
            .map(|m| m.range())
            .collect()
    }

    /// A newline followed by one or more whitespace-only lines; the range
    /// ends just after the last newline of the run.
    pub fn find_blank_line_runs(&self) -> Vec<Range<usize>> {
        BLANK_LINE_RUN_REGEX
            .find_iter(self.source)
            .map(|m| m.range())
            .collect()
    }

    /// The text of the line that ends at byte offset `end`.
    pub fn line_before(&self, end: usize) -> &'a str {
        let start = self.source[..end].rfind('\n').map_or(0, |i| i + 1);
        &self.source[start..end]
    }
}

/// Rebuilds `source` with each `(range, replacement)` spliced in. Ranges must
/// be sorted and non-overlapping.
pub fn splice<I>(source: &str, replacements: I) -> String
where
    I: IntoIterator<Item = (Range<usize>, String)>,
{
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, replacement) in replacements {
        out.push_str(&source[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
