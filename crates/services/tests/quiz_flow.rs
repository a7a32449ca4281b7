use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use quiz_core::time::fixed_clock;
use quiz_core::{Advanced, Identity, Phase, QuizResult};
use services::{
    ConfettiHook, EventBus, ManifestApi, ManifestError, QuizConfig, QuizEvent, QuizService,
    ResultRecorder, SiteManifest,
};
use storage::repository::{ResultCache, SnapshotStore, Storage};

//
// ─── FAKES ─────────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct FakeManifest {
    manifest: Mutex<SiteManifest>,
    local: bool,
    fetches: AtomicUsize,
    submits: AtomicUsize,
}

impl FakeManifest {
    fn with_document(raw: &str) -> Self {
        Self {
            manifest: Mutex::new(serde_json::from_str(raw).unwrap()),
            ..Self::default()
        }
    }

    fn local() -> Self {
        Self {
            local: true,
            ..Self::default()
        }
    }

    fn document(&self) -> SiteManifest {
        self.manifest.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestApi for FakeManifest {
    async fn fetch(&self) -> Result<SiteManifest, ManifestError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.document())
    }

    async fn submit(&self, manifest: &SiteManifest) -> Result<(), ManifestError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        *self.manifest.lock().unwrap() = manifest.clone();
        Ok(())
    }

    fn is_local(&self) -> bool {
        self.local
    }
}

#[derive(Default)]
struct CountingConfetti {
    fired: AtomicUsize,
}

impl ConfettiHook for CountingConfetti {
    fn fire(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

fn single_question_config(page_path: &str) -> QuizConfig {
    let mut config = QuizConfig::new(page_path);
    config.questions = Some(r#"[{"question":"2+2?","answer":"4"}]"#.to_owned());
    config
}

async fn started_service(config: QuizConfig, storage: &Storage) -> QuizService {
    QuizService::start(config, storage, EventBus::default(), None, fixed_clock()).await
}

//
// ─── SESSION FLOW ──────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn single_question_flow_emits_and_persists() {
    let storage = Storage::in_memory();
    let confetti = Arc::new(CountingConfetti::default());
    let mut service = started_service(single_question_config("/pages/kuis"), &storage)
        .await
        .with_confetti(confetti.clone());
    let mut events = service.bus().subscribe();

    service
        .submit_intro(Identity::new("Ana", "0812", "Jakarta"))
        .await
        .unwrap();

    let outcome = service.check_answer("4").await.unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.score, 1);
    assert_eq!(outcome.percentage, 100);
    assert_eq!(confetti.fired.load(Ordering::SeqCst), 1);

    // The incremental event fires before any terminal one.
    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        QuizEvent::Result {
            slug: "kuis".to_owned(),
            result: QuizResult {
                score: 1,
                percentage: 100,
                finished: false,
                total: None,
            },
        }
    );

    let advanced = service.advance().await.unwrap();
    assert!(matches!(advanced, Advanced::Finished(_)));
    assert_eq!(service.session().phase(), Phase::Summary);

    let event = events.recv().await.unwrap();
    match event {
        QuizEvent::Finished { slug, result, user } => {
            assert_eq!(slug, "kuis");
            assert_eq!(
                result,
                QuizResult {
                    score: 1,
                    percentage: 100,
                    finished: true,
                    total: Some(1),
                }
            );
            assert_eq!(user.name, "Ana");
        }
        QuizEvent::Result { .. } => panic!("expected the terminal event"),
    }

    let snapshot = storage
        .snapshots
        .load("/pages/kuis")
        .await
        .unwrap()
        .expect("final snapshot persisted");
    assert!(snapshot.show_summary);
    assert_eq!(snapshot.score, 1);
}

#[tokio::test]
async fn wrong_answers_also_emit_result_events() {
    let storage = Storage::in_memory();
    let mut service = started_service(single_question_config("/pages/kuis"), &storage).await;
    let mut events = service.bus().subscribe();

    service
        .submit_intro(Identity::new("Ana", "", ""))
        .await
        .unwrap();
    let outcome = service.check_answer("5").await.unwrap();
    assert!(!outcome.correct);

    let event = events.recv().await.unwrap();
    assert_eq!(
        event.result(),
        &QuizResult {
            score: 0,
            percentage: 0,
            finished: false,
            total: None,
        }
    );
}

#[tokio::test]
async fn saved_snapshot_resumes_the_session() {
    let storage = Storage::in_memory();
    let mut config = QuizConfig::new("/pages/kuis");
    config.questions =
        Some(r#"[{"question":"a?","answer":"1"},{"question":"b?","answer":"2"}]"#.to_owned());

    {
        let mut service = started_service(config.clone(), &storage).await;
        service
            .submit_intro(Identity::new("Ana", "", ""))
            .await
            .unwrap();
        service.check_answer("wrong").await.unwrap();
        service.advance().await.unwrap();
    }

    let service = started_service(config, &storage).await;
    let session = service.session();
    assert_eq!(session.phase(), Phase::Answering);
    assert_eq!(session.current_index(), 1);
    assert_eq!(session.user_answers()[0].as_deref(), Some("wrong"));
    assert_eq!(session.identity().map(|i| i.name.as_str()), Some("Ana"));
}

#[tokio::test]
async fn autoload_off_ignores_the_snapshot() {
    let storage = Storage::in_memory();
    let mut config = single_question_config("/pages/kuis");

    {
        let mut service = started_service(config.clone(), &storage).await;
        service
            .submit_intro(Identity::new("Ana", "", ""))
            .await
            .unwrap();
        service.check_answer("4").await.unwrap();
    }

    config.autoload = false;
    let service = started_service(config, &storage).await;
    assert_eq!(service.session().phase(), Phase::IntroForm);
    assert_eq!(service.session().score(), 0);
}

#[tokio::test]
async fn restart_clears_the_persisted_snapshot() {
    let storage = Storage::in_memory();
    let mut service = started_service(single_question_config("/pages/kuis"), &storage).await;

    service
        .submit_intro(Identity::new("Ana", "", ""))
        .await
        .unwrap();
    service.check_answer("4").await.unwrap();
    service.advance().await.unwrap();
    assert!(storage.snapshots.load("/pages/kuis").await.unwrap().is_some());

    service.restart().await.unwrap();
    assert_eq!(service.session().phase(), Phase::IntroForm);
    assert!(storage.snapshots.load("/pages/kuis").await.unwrap().is_none());
}

//
// ─── RECONCILIATION ────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn remote_record_short_circuits_to_summary() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::with_document(
        r#"{"items":[{"slug":"about","metadata":{"quizResult":{"score":3,"percentage":75,"finished":true,"total":4}}}]}"#,
    ));

    let mut service = QuizService::start(
        QuizConfig::new("/pages/about"),
        &storage,
        EventBus::default(),
        Some(manifest.clone()),
        fixed_clock(),
    )
    .await;

    assert_eq!(service.session().phase(), Phase::Summary);
    let summary = service.session().summary();
    assert_eq!(summary.score, 3);
    assert_eq!(summary.percentage, 75);
    assert_eq!(summary.total, Some(4));

    // The intro form and answering are disabled by the override.
    assert!(
        service
            .submit_intro(Identity::new("Ana", "", ""))
            .await
            .is_err()
    );
    assert!(service.check_answer("4").await.is_err());
}

#[tokio::test]
async fn unfinished_remote_record_is_ignored() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::with_document(
        r#"{"items":[{"slug":"kuis","metadata":{"quizResult":{"finished":false}}}]}"#,
    ));

    let service = QuizService::start(
        single_question_config("/pages/kuis"),
        &storage,
        EventBus::default(),
        Some(manifest),
        fixed_clock(),
    )
    .await;

    assert_eq!(service.session().phase(), Phase::IntroForm);
}

#[tokio::test]
async fn local_manifest_host_skips_reconciliation() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::local());

    let service = QuizService::start(
        single_question_config("/pages/kuis"),
        &storage,
        EventBus::default(),
        Some(manifest.clone()),
        fixed_clock(),
    )
    .await;

    assert_eq!(service.session().phase(), Phase::IntroForm);
    assert_eq!(manifest.fetches.load(Ordering::SeqCst), 0);
}

//
// ─── RESULT RECORDER ───────────────────────────────────────────────────────────
//

#[tokio::test]
async fn recorder_mirrors_results_into_cache_and_manifest() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::with_document(
        r#"{"title":"site","items":[{"slug":"kuis","order":7}]}"#,
    ));
    let recorder = ResultRecorder::new(
        Arc::clone(&storage.results),
        Some(manifest.clone()),
        fixed_clock(),
    );

    recorder
        .handle_event(&QuizEvent::Result {
            slug: "kuis".to_owned(),
            result: QuizResult {
                score: 2,
                percentage: 67,
                finished: false,
                total: None,
            },
        })
        .await;

    let cached = storage.results.get("kuis").await.unwrap().expect("cached");
    assert_eq!(cached.score, 2);
    assert_eq!(cached.percentage, 67);
    assert!(!cached.finished);

    assert_eq!(manifest.submits.load(Ordering::SeqCst), 1);
    let document = manifest.document();
    let record = document
        .item("kuis")
        .unwrap()
        .metadata
        .as_ref()
        .unwrap()
        .quiz_result
        .as_ref()
        .expect("written back");
    assert_eq!(record.score, Some(2));
    assert!(record.updated.is_some());
    // Fields the recorder does not model survive the read-modify-write.
    assert_eq!(document.extra["title"], "site");
    assert_eq!(document.item("kuis").unwrap().extra["order"], 7);
}

#[tokio::test]
async fn recorder_ignores_terminal_events() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::default());
    let recorder = ResultRecorder::new(
        Arc::clone(&storage.results),
        Some(manifest.clone()),
        fixed_clock(),
    );

    recorder
        .handle_event(&QuizEvent::Finished {
            slug: "kuis".to_owned(),
            result: QuizResult {
                score: 1,
                percentage: 100,
                finished: true,
                total: Some(1),
            },
            user: Identity::default(),
        })
        .await;

    assert!(storage.results.get("kuis").await.unwrap().is_none());
    assert_eq!(manifest.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recorder_missing_slug_leaves_manifest_untouched() {
    let storage = Storage::in_memory();
    let manifest = Arc::new(FakeManifest::with_document(r#"{"items":[]}"#));
    let recorder = ResultRecorder::new(
        Arc::clone(&storage.results),
        Some(manifest.clone()),
        fixed_clock(),
    );

    recorder
        .handle_event(&QuizEvent::Result {
            slug: "kuis".to_owned(),
            result: QuizResult {
                score: 1,
                percentage: 100,
                finished: false,
                total: None,
            },
        })
        .await;

    // Cache still records the result even without a manifest entry.
    assert!(storage.results.get("kuis").await.unwrap().is_some());
    assert_eq!(manifest.submits.load(Ordering::SeqCst), 0);
}
