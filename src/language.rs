//! Supported languages and their capability table.
//!
//! Every per-language difference the local pipeline cares about lives in a
//! [`LanguageProfile`] row, so adding a language means adding data here
//! rather than new branches in the passes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Languages the pipeline can transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[default]
    JavaScript,
    Python,
    #[serde(rename = "PHP")]
    Php,
    Go,
    Java,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl SupportedLanguage {
    /// All languages in display order.
    pub fn all() -> Vec<SupportedLanguage> {
        vec![
            SupportedLanguage::JavaScript,
            SupportedLanguage::Python,
            SupportedLanguage::Php,
            SupportedLanguage::Go,
            SupportedLanguage::Java,
        ]
    }

    /// Detects the language from a file extension, `None` if unrecognised.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" | "pyw" => Some(Self::Python),
            "php" | "phtml" => Some(Self::Php),
            "go" => Some(Self::Go),
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension, used when naming exported output.
    pub fn extension(self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::Python => "py",
            Self::Php => "php",
            Self::Go => "go",
            Self::Java => "java",
        }
    }

    pub fn profile(self) -> &'static LanguageProfile {
        match self {
            Self::JavaScript => &JAVASCRIPT,
            Self::Python => &PYTHON,
            Self::Php => &PHP,
            Self::Go => &GO,
            Self::Java => &JAVA,
        }
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JavaScript => write!(f, "JavaScript"),
            Self::Python => write!(f, "Python"),
            Self::Php => write!(f, "PHP"),
            Self::Go => write!(f, "Go"),
            Self::Java => write!(f, "Java"),
        }
    }
}

impl FromStr for SupportedLanguage {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(Self::JavaScript),
            "python" | "py" => Ok(Self::Python),
            "php" => Ok(Self::Php),
            "go" | "golang" => Ok(Self::Go),
            "java" => Ok(Self::Java),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// How the runtime decode routine turns payload bytes back into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadCharset {
    /// Each character maps to one byte; characters above U+00FF are rejected,
    /// matching the browser `btoa`/`atob` pair.
    Latin1,
    Utf8,
}

/// Line and block comment delimiters.
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    pub line: &'static str,
    /// Additional line-comment marker some languages accept (`#` in PHP).
    pub alt_line: Option<&'static str>,
    pub block: Option<(&'static str, &'static str)>,
}

/// One row of the capability table.
#[derive(Debug)]
pub struct LanguageProfile {
    pub language: SupportedLanguage,
    pub supports_renaming: bool,
    pub whitespace_sensitive: bool,
    pub comments: CommentSyntax,
    /// Decode expression; `{payload}` is replaced by the base64 text.
    pub decode_template: &'static str,
    pub payload_charset: PayloadCharset,
    pub rename_prefix: &'static str,
    pub rename_candidates: &'static [&'static str],
    pub reserved_words: &'static [&'static str],
    /// Inert block prepended by the dead-code pass, newline terminated.
    pub dead_code_block: &'static str,
    /// Opening tag that must stay first in the file (`<?php`).
    pub open_tag: Option<&'static str>,
    /// String prefix marking literals whose `{...}` parts are code (`f` in
    /// Python). Matched case-insensitively.
    pub interpolation_prefix: Option<char>,
    /// Statements whose string literals name modules and must stay literal.
    pub module_path_pattern: Option<&'static str>,
}

impl LanguageProfile {
    pub fn decode_expression(&self, payload: &str) -> String {
        self.decode_template.replace("{payload}", payload)
    }

    /// Wraps `text` as a single comment line.
    pub fn comment_line(&self, text: &str) -> String {
        match self.open_tag {
            // PHP: keep the header inside its own tag pair so it emits nothing.
            Some(tag) => match self.comments.block {
                Some((open, close)) => format!("{tag} {open} {text} {close} ?>"),
                None => format!("{tag} {} {text} ?>", self.comments.line),
            },
            None => format!("{} {text}", self.comments.line),
        }
    }

    /// Markers that start a comment running to end of line.
    pub fn line_comment_markers(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.comments.line).chain(self.comments.alt_line)
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.contains(&word)
    }
}

const BRACE_DEAD_CODE: &str =
    "/* Protected by CodeShield */\n/* _0x4f2a1b check integrity */\n";

static JAVASCRIPT: LanguageProfile = LanguageProfile {
    language: SupportedLanguage::JavaScript,
    supports_renaming: true,
    whitespace_sensitive: false,
    comments: CommentSyntax { line: "//", alt_line: None, block: Some(("/*", "*/")) },
    decode_template: "atob(\"{payload}\")",
    payload_charset: PayloadCharset::Latin1,
    rename_prefix: "_0x",
    rename_candidates: &["total", "price", "tax", "count", "index", "data", "result", "value"],
    reserved_words: &[
        "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
        "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this",
        "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield", "arguments",
        "undefined", "NaN", "Infinity",
    ],
    dead_code_block: BRACE_DEAD_CODE,
    open_tag: None,
    interpolation_prefix: None,
    module_path_pattern: Some(
        r#"\bimport\s[^;\n]*?["'][^"'\n]*["']|\bimport\s*\(\s*["'][^"'\n]*["']|\brequire\s*\(\s*["'][^"'\n]*["']|\bfrom\s*["'][^"'\n]*["']"#,
    ),
};

static PYTHON: LanguageProfile = LanguageProfile {
    language: SupportedLanguage::Python,
    supports_renaming: true,
    whitespace_sensitive: true,
    comments: CommentSyntax { line: "#", alt_line: None, block: None },
    decode_template: "__import__('base64').b64decode(\"{payload}\").decode('utf-8')",
    payload_charset: PayloadCharset::Utf8,
    rename_prefix: "_var_",
    rename_candidates: &["total", "price", "tax", "count", "data"],
    reserved_words: &[
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield", "self",
    ],
    dead_code_block: "# Protected by CodeShield\n# _0x4f2a1b check integrity\nif False: pass\n",
    open_tag: None,
    interpolation_prefix: Some('f'),
    module_path_pattern: None,
};

// Naive substitution is too likely to break PHP, Go and Java, so renaming is
// disabled for them and their candidate lists stay empty.
static PHP: LanguageProfile = LanguageProfile {
    language: SupportedLanguage::Php,
    supports_renaming: false,
    whitespace_sensitive: false,
    comments: CommentSyntax { line: "//", alt_line: Some("#"), block: Some(("/*", "*/")) },
    decode_template: "base64_decode(\"{payload}\")",
    payload_charset: PayloadCharset::Utf8,
    rename_prefix: "_0x",
    rename_candidates: &[],
    reserved_words: &[
        "abstract", "and", "array", "as", "break", "case", "catch", "class", "clone", "const",
        "continue", "declare", "default", "do", "echo", "else", "elseif", "empty", "extends",
        "final", "finally", "fn", "for", "foreach", "function", "global", "if", "implements",
        "include", "instanceof", "interface", "isset", "list", "match", "namespace", "new", "or",
        "print", "private", "protected", "public", "require", "return", "static", "switch",
        "this", "throw", "trait", "try", "unset", "use", "var", "while", "yield",
    ],
    dead_code_block: BRACE_DEAD_CODE,
    open_tag: Some("<?php"),
    interpolation_prefix: None,
    module_path_pattern: None,
};

static GO: LanguageProfile = LanguageProfile {
    language: SupportedLanguage::Go,
    supports_renaming: false,
    whitespace_sensitive: false,
    comments: CommentSyntax { line: "//", alt_line: None, block: Some(("/*", "*/")) },
    // Needs `encoding/base64` in the file's imports; import paths themselves
    // are matched by `module_path_pattern` and stay literal.
    decode_template: "func() string { b, _ := base64.StdEncoding.DecodeString(\"{payload}\"); return string(b) }()",
    payload_charset: PayloadCharset::Utf8,
    rename_prefix: "_0x",
    rename_candidates: &[],
    reserved_words: &[
        "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
        "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
        "return", "select", "struct", "switch", "type", "var", "nil", "true", "false",
    ],
    dead_code_block: BRACE_DEAD_CODE,
    open_tag: None,
    interpolation_prefix: None,
    module_path_pattern: Some(r#"\bimport\s*(?:\([^)]*\)|(?:[A-Za-z0-9_.]+\s+)?"[^"\n]*")"#),
};

static JAVA: LanguageProfile = LanguageProfile {
    language: SupportedLanguage::Java,
    supports_renaming: false,
    whitespace_sensitive: false,
    comments: CommentSyntax { line: "//", alt_line: None, block: Some(("/*", "*/")) },
    decode_template: "new String(java.util.Base64.getDecoder().decode(\"{payload}\"), java.nio.charset.StandardCharsets.UTF_8)",
    payload_charset: PayloadCharset::Utf8,
    rename_prefix: "_0x",
    rename_candidates: &[],
    reserved_words: &[
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
        "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
        "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
        "interface", "long", "native", "new", "package", "private", "protected", "public",
        "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
        "throw", "throws", "transient", "try", "void", "volatile", "while", "var", "null",
        "true", "false",
    ],
    dead_code_block: BRACE_DEAD_CODE,
    open_tag: None,
    interpolation_prefix: None,
    module_path_pattern: None,
};
