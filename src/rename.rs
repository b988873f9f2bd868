//! Identifier renaming with a per-invocation mapping.

use crate::language::SupportedLanguage;
use crate::lexer::{splice, Lexer};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Original identifier -> generated identifier for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMapping {
    entries: BTreeMap<String, String>,
}

impl RenameMapping {
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_generated(&self, name: &str) -> bool {
        self.entries.values().any(|v| v == name)
    }
}

/// Renames the language's candidate identifiers using names drawn from `rng`.
pub struct RenameMapper<'r, R: Rng> {
    rng: &'r mut R,
    exclusions: HashSet<String>,
}

impl<'r, R: Rng> RenameMapper<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        Self {
            rng,
            exclusions: HashSet::new(),
        }
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(exclusions.into_iter().map(Into::into));
        self
    }

    /// Renames the language's own candidate list.
    pub fn rename(&mut self, code: &str, language: SupportedLanguage) -> (String, RenameMapping) {
        let profile = language.profile();
        if !profile.supports_renaming {
            return (code.to_string(), RenameMapping::default());
        }
        self.rename_candidates(code, language, profile.rename_candidates)
    }

    /// Replaces every whole-word occurrence of each candidate outside quoted
    /// literals with one generated name. Candidates that are excluded,
    /// reserved or absent are skipped and do not appear in the mapping.
    pub fn rename_candidates(
        &mut self,
        code: &str,
        language: SupportedLanguage,
        candidates: &[&str],
    ) -> (String, RenameMapping) {
        let profile = language.profile();
        let mut mapping = RenameMapping::default();
        let mut current = code.to_string();

        for &candidate in candidates {
            if self.exclusions.contains(candidate) || profile.is_reserved(candidate) {
                debug!(candidate, "skipping protected identifier");
                continue;
            }
            if mapping.get(candidate).is_some() {
                continue;
            }

            let lexer = Lexer::new(&current, language);
            let occurrences = lexer.find_code_word_occurrences(candidate);
            if occurrences.is_empty() {
                continue;
            }

            let generated = self.fresh_name(profile.rename_prefix, &lexer, &mapping);
            let replaced = splice(
                &current,
                occurrences.into_iter().map(|range| (range, generated.clone())),
            );
            mapping.entries.insert(candidate.to_string(), generated);
            current = replaced;
        }

        debug!(renamed = mapping.len(), %language, "rename pass complete");
        (current, mapping)
    }

    /// A prefix plus four hex digits, unique within this run and absent from
    /// the code being rewritten.
    fn fresh_name(&mut self, prefix: &str, lexer: &Lexer<'_>, mapping: &RenameMapping) -> String {
        loop {
            let name = format!("{prefix}{:04x}", self.rng.random::<u16>());
            if !mapping.is_generated(&name) && !lexer.contains_word(&name) {
                return name;
            }
        }
    }
}
