//! String literal concealment.
//!
//! Each concealable literal is base64 encoded and swapped for an expression
//! that decodes it at runtime with the target language's own routine.

use crate::language::{PayloadCharset, SupportedLanguage};
use crate::lexer::{splice, Lexer};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("character {ch:?} at offset {offset} is outside Latin-1")]
    OutsideLatin1 { ch: char, offset: usize },
    #[error("payload is not valid base64: {0}")]
    InvalidPayload(String),
    #[error("decoded payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Encodes literal content for the given runtime charset.
pub fn encode_payload(content: &str, charset: PayloadCharset) -> Result<String, EncodingError> {
    match charset {
        PayloadCharset::Utf8 => Ok(STANDARD.encode(content.as_bytes())),
        PayloadCharset::Latin1 => {
            let bytes = content
                .char_indices()
                .map(|(offset, ch)| {
                    u8::try_from(u32::from(ch))
                        .map_err(|_| EncodingError::OutsideLatin1 { ch, offset })
                })
                .collect::<Result<Vec<u8>, _>>()?;
            Ok(STANDARD.encode(bytes))
        }
    }
}

/// Mirrors what the runtime decode expression produces.
pub fn decode_payload(payload: &str, charset: PayloadCharset) -> Result<String, EncodingError> {
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| EncodingError::InvalidPayload(e.to_string()))?;
    match charset {
        PayloadCharset::Utf8 => String::from_utf8(bytes).map_err(|_| EncodingError::InvalidUtf8),
        PayloadCharset::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

/// Outcome of one recoding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecodeOutcome {
    pub code: String,
    pub recoded: usize,
    /// Literals left as-is because their content could not be encoded.
    pub failed: usize,
}

/// Replaces every concealable literal with a decode expression. Literals
/// that fail to encode stay untouched; the pass never aborts. Interpolated
/// literals and module paths in import statements are never recoded.
pub fn recode(code: &str, language: SupportedLanguage) -> RecodeOutcome {
    let lexer = Lexer::new(code, language);
    let profile = lexer.profile();
    let mut recoded = 0;
    let mut failed = 0;
    let mut replacements = Vec::new();
    let module_paths = lexer.find_module_path_spans();

    for literal in lexer.find_quoted_literals() {
        if !literal.is_concealable(code) {
            continue;
        }
        if lexer.is_interpolated(&literal) {
            debug!(%language, "interpolated literal kept");
            continue;
        }
        if module_paths
            .iter()
            .any(|path| path.start <= literal.span.start && literal.span.end <= path.end)
        {
            debug!(%language, "module path kept");
            continue;
        }
        let content = &code[literal.content.clone()];
        match encode_payload(content, profile.payload_charset) {
            Ok(payload) => {
                replacements.push((literal.span, profile.decode_expression(&payload)));
                recoded += 1;
            }
            Err(e) => {
                warn!(%language, error = %e, "leaving literal unencoded");
                failed += 1;
            }
        }
    }

    debug!(recoded, failed, %language, "string pass complete");
    RecodeOutcome {
        code: splice(code, replacements),
        recoded,
        failed,
    }
}
