//! Pipeline behavior with a stubbed session layer: the invalid fast path,
//! the retry bound, release discipline, and error folding.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use veripat::config::VerifierConfig;
use veripat::error::VerifyError;
use veripat::model::{Category, PageSnapshot};
use veripat::pipeline::Verifier;
use veripat::plate::PlateToken;
use veripat::session::{QuerySession, SessionFactory};

/// What a stub session returns on each query, in order. The last entry
/// repeats once the script runs out.
#[derive(Clone)]
enum Script {
    Texts(Vec<&'static str>),
    Fail,
}

struct StubFactory {
    script: Script,
    opens: Arc<AtomicU32>,
    queries: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
}

impl StubFactory {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            opens: Arc::new(AtomicU32::new(0)),
            queries: Arc::new(AtomicU32::new(0)),
            closes: Arc::new(AtomicU32::new(0)),
        })
    }
}

#[async_trait]
impl SessionFactory for StubFactory {
    async fn open(&self, _config: &VerifierConfig) -> Result<Box<dyn QuerySession>, VerifyError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            script: self.script.clone(),
            cursor: AtomicUsize::new(0),
            queries: self.queries.clone(),
            closes: self.closes.clone(),
        }))
    }
}

struct StubSession {
    script: Script,
    cursor: AtomicUsize,
    queries: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
}

#[async_trait]
impl QuerySession for StubSession {
    async fn run_query(&self, _plate: &PlateToken) -> Result<PageSnapshot, VerifyError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Texts(texts) => {
                let i = self.cursor.fetch_add(1, Ordering::SeqCst).min(texts.len() - 1);
                Ok(PageSnapshot::new(texts[i]))
            }
            Script::Fail => Err(VerifyError::Navigation("net::ERR_CONNECTION_RESET".into())),
        }
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A factory that never finds a browser runtime.
struct NoRuntimeFactory {
    opens: Arc<AtomicU32>,
}

#[async_trait]
impl SessionFactory for NoRuntimeFactory {
    async fn open(&self, _config: &VerifierConfig) -> Result<Box<dyn QuerySession>, VerifyError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(VerifyError::RuntimeUnavailable(
            "no Chrome/Chromium executable found (strategies tried: bundled-detection, \
             path-probe, cache-dir-scan)"
                .to_string(),
        ))
    }
}

fn verifier_with(factory: Arc<StubFactory>) -> Verifier {
    Verifier::with_sessions(Arc::new(VerifierConfig::for_tests()), factory)
}

#[tokio::test]
async fn invalid_input_short_circuits_without_the_browser_layer() {
    let factory = StubFactory::new(Script::Texts(vec!["irrelevant"]));
    let verifier = verifier_with(factory.clone());

    for raw in [" ab-1 ", "....", "", "ABCDE12345"] {
        let result = verifier.verify(raw).await;
        assert!(!result.ok);
        assert_eq!(result.category, Category::Invalida);
    }

    assert_eq!(factory.opens.load(Ordering::SeqCst), 0);
    assert_eq!(factory.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_input_echoes_the_stripped_value() {
    let factory = StubFactory::new(Script::Texts(vec!["irrelevant"]));
    let verifier = verifier_with(factory);

    let result = verifier.verify(" ab-1 ").await;
    assert_eq!(result.plate, "AB1");
}

#[tokio::test]
async fn positive_match_echoes_the_normalized_token() {
    let factory = StubFactory::new(Script::Texts(vec!["tipo de servicio: colectivo"]));
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify(" ab-123 ").await;
    assert!(result.ok);
    assert_eq!(result.category, Category::Colectivo);
    assert_eq!(result.plate, "AB123");
    assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
    assert_eq!(factory.queries.load(Ordering::SeqCst), 1);
    assert_eq!(factory.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn punctuated_input_reaches_the_browser_stage() {
    // "xx.123-yz!" strips to a 7-char token and must proceed to a session.
    let factory = StubFactory::new(Script::Texts(vec!["no existen resultados"]));
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify("xx.123-yz!").await;
    assert_eq!(result.plate, "XX123YZ");
    assert_eq!(result.category, Category::NoEncontrado);
    assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ambiguous_render_is_retried_exactly_once() {
    let factory = StubFactory::new(Script::Texts(vec!["cargando..."]));
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify("AB123").await;
    assert_eq!(result.category, Category::Otro);
    assert!(!result.ok);
    // Two attempts total, one session, one release.
    assert_eq!(factory.queries.load(Ordering::SeqCst), 2);
    assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
    assert_eq!(factory.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_attempt_result_is_final() {
    let factory = StubFactory::new(Script::Texts(vec![
        "cargando...",
        "tipo de servicio: taxi básico",
    ]));
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify("AB123").await;
    assert_eq!(result.category, Category::Taxi);
    assert_eq!(factory.queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn committed_first_result_is_not_retried() {
    let factory = StubFactory::new(Script::Texts(vec!["no existen resultados"]));
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify("AB123").await;
    assert_eq!(result.category, Category::NoEncontrado);
    assert_eq!(factory.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_disabled_stops_after_one_attempt() {
    let mut config = VerifierConfig::for_tests();
    config.retry.max_attempts = 1;
    let factory = StubFactory::new(Script::Texts(vec!["cargando..."]));
    let verifier = Verifier::with_sessions(Arc::new(config), factory.clone());

    let result = verifier.verify("AB123").await;
    assert_eq!(result.category, Category::Otro);
    assert_eq!(factory.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_failure_folds_into_an_error_verdict_and_still_releases() {
    let factory = StubFactory::new(Script::Fail);
    let verifier = verifier_with(factory.clone());

    let result = verifier.verify("AB123").await;
    assert!(!result.ok);
    assert_eq!(result.category, Category::Error);
    assert_eq!(result.plate, "AB123");
    let detail = result.detail.expect("error verdicts carry a detail");
    assert!(detail.contains("navigation"), "{detail}");
    // The session was still closed exactly once.
    assert_eq!(factory.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_runtime_is_an_error_verdict_with_no_session() {
    let opens = Arc::new(AtomicU32::new(0));
    let factory = Arc::new(NoRuntimeFactory {
        opens: opens.clone(),
    });
    let verifier = Verifier::with_sessions(Arc::new(VerifierConfig::for_tests()), factory);

    let result = verifier.verify("AB123").await;
    assert!(!result.ok);
    assert_eq!(result.category, Category::Error);
    let detail = result.detail.expect("runtime failures carry a detail");
    assert!(detail.contains("runtime unavailable"), "{detail}");
    // The factory was asked, but no session ever existed to leak.
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}
