//! CodeShield: local and delegated source-code obfuscation.

pub mod config;
pub mod dead_code;
pub mod delegate;
pub mod errors;
pub mod language;
pub mod lexer;
pub mod logger;
pub mod metrics;
pub mod minify;
pub mod pipeline;
pub mod rename;
pub mod settings;
pub mod strategy;
pub mod strings;

pub use config::{load_config, ConfigOverrides, ServiceConfig};
pub use delegate::{DelegateError, DelegateRequest, DelegatedService};
pub use errors::{Result, ShieldError};
pub use language::{LanguageProfile, SupportedLanguage};
pub use pipeline::{ExecutionStrategy, LocalPipeline, PassReport, TransformationResult};
pub use rename::RenameMapping;
pub use settings::{Intensity, ObfuscationSettings};
pub use strategy::{ExecutionMode, Transformer};
