//! Local pass pipeline and the result type shared with delegated runs.

use crate::dead_code;
use crate::language::SupportedLanguage;
use crate::minify;
use crate::rename::{RenameMapper, RenameMapping};
use crate::settings::ObfuscationSettings;
use crate::strings;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Local,
    Delegated,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Local => write!(f, "local"),
            ExecutionStrategy::Delegated => write!(f, "delegated"),
        }
    }
}

/// What the local passes did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub identifiers_renamed: usize,
    pub literals_recoded: usize,
    pub literals_failed: usize,
    pub dead_code_injected: bool,
    pub minified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationResult {
    pub strategy: ExecutionStrategy,
    pub language: SupportedLanguage,
    /// Provenance comment line, without trailing newline.
    pub header: String,
    /// Transformed code, without the header.
    pub body: String,
    /// Present for local runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PassReport>,
}

impl TransformationResult {
    pub fn delegated(language: SupportedLanguage, body: String) -> Self {
        Self {
            strategy: ExecutionStrategy::Delegated,
            language,
            header: provenance_header(ExecutionStrategy::Delegated, language),
            body,
            report: None,
        }
    }

    /// Header line followed by the body.
    pub fn output(&self) -> String {
        format!("{}\n{}", self.header, self.body)
    }
}

impl fmt::Display for TransformationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header, self.body)
    }
}

pub fn provenance_header(strategy: ExecutionStrategy, language: SupportedLanguage) -> String {
    let text = match strategy {
        ExecutionStrategy::Local => format!("[LOCAL MODE] CodeShield obfuscation applied ({language})"),
        ExecutionStrategy::Delegated => {
            format!("[DELEGATED MODE] Obfuscated by remote rewriting service ({language})")
        }
    };
    language.profile().comment_line(&text)
}

/// Applies the enabled passes in fixed order: rename, recode, dead code,
/// minify. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LocalPipeline {
    seed: Option<u64>,
}

impl LocalPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the rename token source so output is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn run(&self, code: &str, settings: &ObfuscationSettings) -> TransformationResult {
        self.run_with_mapping(code, settings).0
    }

    /// Like [`run`](Self::run), also returning the rename mapping used.
    pub fn run_with_mapping(
        &self,
        code: &str,
        settings: &ObfuscationSettings,
    ) -> (TransformationResult, RenameMapping) {
        let language = settings.language;
        let mut report = PassReport::default();
        let mut mapping = RenameMapping::default();
        let mut current = code.to_string();

        if settings.rename_variables {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let (renamed, used) = RenameMapper::new(&mut rng)
                .with_exclusions(settings.exclusion_list())
                .rename(&current, language);
            report.identifiers_renamed = used.len();
            current = renamed;
            mapping = used;
        }

        if settings.string_encryption {
            let outcome = strings::recode(&current, language);
            report.literals_recoded = outcome.recoded;
            report.literals_failed = outcome.failed;
            current = outcome.code;
        }

        if settings.dead_code_injection {
            current = dead_code::inject(&current, language);
            report.dead_code_injected = true;
        }

        if settings.intensity.minifies() {
            current = minify::minify(&current, language);
            report.minified = true;
        }

        if settings.control_flow_flattening {
            debug!("control flow flattening is only available in delegated mode");
        }

        info!(
            %language,
            renamed = report.identifiers_renamed,
            recoded = report.literals_recoded,
            dead_code = report.dead_code_injected,
            minified = report.minified,
            "local pipeline finished"
        );

        let result = TransformationResult {
            strategy: ExecutionStrategy::Local,
            language,
            header: provenance_header(ExecutionStrategy::Local, language),
            body: current,
            report: Some(report),
        };
        (result, mapping)
    }
}
