use async_trait::async_trait;
use codeshield::delegate::{DelegateError, DelegateRequest, DelegatedService};
use codeshield::errors::ShieldError;
use codeshield::language::SupportedLanguage;
use codeshield::pipeline::ExecutionStrategy;
use codeshield::settings::ObfuscationSettings;
use codeshield::strategy::Transformer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum Reply {
    Code(&'static str),
    Fail(&'static str),
}

/// Records every call and answers with a canned reply.
struct ScriptedService {
    reply: Reply,
    calls: AtomicUsize,
    last_credential: Mutex<Option<String>>,
}

impl ScriptedService {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_credential: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DelegatedService for ScriptedService {
    async fn rewrite(&self, request: DelegateRequest<'_>) -> Result<String, DelegateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_credential.lock().unwrap() = Some(request.credential.to_string());
        match self.reply {
            Reply::Code(code) => Ok(code.to_string()),
            Reply::Fail(message) => Err(DelegateError::Service(message.to_string())),
        }
    }
}

fn js_settings() -> ObfuscationSettings {
    ObfuscationSettings::default()
}

#[tokio::test]
async fn no_credential_never_calls_service() {
    let service = ScriptedService::new(Reply::Fail("should not be called"));
    let transformer = Transformer::with_delegate(service.clone());

    for credential in [None, Some(""), Some("   ")] {
        let result = transformer
            .transform("let total = 'secret';", &js_settings(), credential)
            .await
            .expect("local mode always succeeds");
        assert_eq!(result.strategy, ExecutionStrategy::Local);
        assert!(result.header.contains("[LOCAL MODE]"));
    }
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn failure_propagates_without_local_fallback() {
    let service = ScriptedService::new(Reply::Fail("quota exceeded for key"));
    let transformer = Transformer::with_delegate(service.clone());

    let err = transformer
        .transform("let a = 1;", &js_settings(), Some("sk-test"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ShieldError::DelegatedServiceFailure(DelegateError::Service(_))
    ));
    assert_eq!(err.to_string(), "quota exceeded for key");
    assert_eq!(service.calls(), 1);
    assert_eq!(service.last_credential.lock().unwrap().as_deref(), Some("sk-test"));
}

#[tokio::test]
async fn fenced_response_is_unwrapped() {
    let service = ScriptedService::new(Reply::Code("```javascript\nvar _0x1=1;\n```\n"));
    let transformer = Transformer::with_delegate(service);

    let result = transformer
        .transform("var a = 1;", &js_settings(), Some("sk-test"))
        .await
        .unwrap();
    assert_eq!(result.strategy, ExecutionStrategy::Delegated);
    assert_eq!(result.body, "var _0x1=1;");
    assert!(result.header.starts_with("// [DELEGATED MODE]"));
    assert!(result.report.is_none());
}

#[tokio::test]
async fn empty_response_is_an_error() {
    for reply in ["", "  \n", "```\n```"] {
        let transformer = Transformer::with_delegate(ScriptedService::new(Reply::Code(reply)));
        let err = transformer
            .transform("var a = 1;", &js_settings(), Some("sk-test"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ShieldError::DelegatedServiceFailure(DelegateError::EmptyResponse)),
            "reply {reply:?}"
        );
    }
}

#[tokio::test]
async fn forced_delegation_requires_credential() {
    let service = ScriptedService::new(Reply::Code("x"));
    let transformer = Transformer::with_delegate(service.clone());
    let err = transformer
        .transform_delegated("x", &js_settings(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShieldError::MissingCredential));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn delegated_header_follows_language() {
    let transformer = Transformer::with_delegate(ScriptedService::new(Reply::Code("print(1)")));
    let settings = ObfuscationSettings {
        language: SupportedLanguage::Python,
        ..Default::default()
    };
    let result = transformer
        .transform("print(1)", &settings, Some("key"))
        .await
        .unwrap();
    assert_eq!(
        result.output(),
        "# [DELEGATED MODE] Obfuscated by remote rewriting service (Python)\nprint(1)"
    );
}

#[tokio::test]
async fn concurrent_local_calls_are_independent() {
    let transformer = Arc::new(Transformer::with_delegate(ScriptedService::new(Reply::Code("x"))));
    let mut handles = Vec::new();
    for i in 0..8 {
        let transformer = transformer.clone();
        handles.push(tokio::spawn(async move {
            let code = format!("let total = {i}; total++;");
            transformer
                .transform(&code, &ObfuscationSettings::default(), None)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(!result.body.contains("total"));
    }
}
