//! Chooses between the local pipeline and the delegated service.
//!
//! No credential means local, which always succeeds. A credential means
//! delegated, and any failure there is returned as-is: a broken credential
//! must not look like a silent downgrade to local output.

use crate::config::ServiceConfig;
use crate::delegate::{strip_code_fences, ChatCompletionsDelegate, DelegateError, DelegateRequest, DelegatedService};
use crate::errors::{Result, ShieldError};
use crate::metrics::Metrics;
use crate::pipeline::{LocalPipeline, TransformationResult};
use crate::settings::ObfuscationSettings;
use std::sync::Arc;
use tracing::{error, info};

/// Mode picked for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode<'a> {
    NoCredential,
    CredentialPresent(&'a str),
}

impl<'a> ExecutionMode<'a> {
    /// Blank credentials count as absent.
    pub fn select(credential: Option<&'a str>) -> Self {
        match credential.filter(|c| !c.trim().is_empty()) {
            Some(c) => ExecutionMode::CredentialPresent(c),
            None => ExecutionMode::NoCredential,
        }
    }
}

pub struct Transformer {
    pipeline: LocalPipeline,
    delegate: Arc<dyn DelegatedService>,
    metrics: Option<Metrics>,
}

impl Transformer {
    /// Uses the chat-completions client described by `config` for delegated
    /// calls.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let delegate = ChatCompletionsDelegate::new(&config.endpoint, &config.model, config.timeout)?;
        Ok(Self::with_delegate(Arc::new(delegate)))
    }

    pub fn with_delegate(delegate: Arc<dyn DelegatedService>) -> Self {
        Self {
            pipeline: LocalPipeline::new(),
            delegate,
            metrics: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: LocalPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Transforms `code`, delegating only when a credential is given.
    pub async fn transform(
        &self,
        code: &str,
        settings: &ObfuscationSettings,
        credential: Option<&str>,
    ) -> Result<TransformationResult> {
        match ExecutionMode::select(credential) {
            ExecutionMode::NoCredential => {
                info!(language = %settings.language, "no credential configured, using local pipeline");
                Ok(self.transform_local(code, settings))
            }
            ExecutionMode::CredentialPresent(key) => self.delegate(code, settings, key).await,
        }
    }

    pub fn transform_local(&self, code: &str, settings: &ObfuscationSettings) -> TransformationResult {
        let result = self.pipeline.run(code, settings);
        if let Some(metrics) = &self.metrics {
            metrics.record_success(result.strategy, result.report.as_ref());
        }
        result
    }

    /// Forces delegated mode.
    pub async fn transform_delegated(
        &self,
        code: &str,
        settings: &ObfuscationSettings,
        credential: Option<&str>,
    ) -> Result<TransformationResult> {
        match ExecutionMode::select(credential) {
            ExecutionMode::CredentialPresent(key) => self.delegate(code, settings, key).await,
            ExecutionMode::NoCredential => Err(ShieldError::MissingCredential),
        }
    }

    async fn delegate(
        &self,
        code: &str,
        settings: &ObfuscationSettings,
        credential: &str,
    ) -> Result<TransformationResult> {
        info!(language = %settings.language, "delegating to rewriting service");
        let request = DelegateRequest {
            code,
            settings,
            credential,
        };

        let outcome = self
            .delegate
            .rewrite(request)
            .await
            .and_then(|raw| {
                let body = strip_code_fences(&raw);
                if body.is_empty() {
                    Err(DelegateError::EmptyResponse)
                } else {
                    Ok(body.to_string())
                }
            });

        match outcome {
            Ok(body) => {
                let result = TransformationResult::delegated(settings.language, body);
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(result.strategy, None);
                }
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "rewriting service failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_delegated_failure();
                }
                Err(e.into())
            }
        }
    }
}
