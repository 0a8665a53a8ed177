// tests/run_once.rs
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use rad_scrape::{
    config::{DelayRange, Settings, StaticSettings},
    core::Fetch,
    error::{FetchError, PersistError, PublishError, RunError},
    file::{CsvStore, Persist},
    publish::Publish,
    record::MonitoringRecord,
    runner::{PublishStatus, RunOutcome, Runner},
    schedule::CancelToken,
    sink::LogBuffer,
};

const PAGE: &str = r#"<ul>
  <li class="datali"><div class="divname">北京 (东城)</div>
    <div class="divval"><span class="label">80.1 nGy/h</span><span class="showtime">2024-05-01</span></div></li>
  <li class="datali"><div class="divname">上海 (徐汇)</div>
    <div class="divval"><span class="label">95.0 nGy/h</span><span class="showtime">2024-05-01</span></div></li>
</ul>"#;

enum Reply {
    Page(&'static str),
    Fail,
    Panic(String),
}

struct FakeFetch {
    reply: Reply,
    urls: Mutex<Vec<String>>,
}

impl FakeFetch {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply, urls: Mutex::new(Vec::new()) })
    }
}

impl Fetch for FakeFetch {
    fn fetch(&self, url: &str, _delay: DelayRange) -> Result<String, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        match &self.reply {
            Reply::Page(p) => Ok(p.to_string()),
            Reply::Fail => Err(FetchError::Status { url: url.to_string(), status: 503 }),
            Reply::Panic(msg) => panic!("{msg}"),
        }
    }
}

#[derive(Default)]
struct FakeStore {
    calls: AtomicUsize,
    fail: bool,
}

impl Persist for FakeStore {
    fn persist(&self, records: &[MonitoringRecord], prefix: &str) -> Result<PathBuf, PersistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PersistError::Empty);
        }
        Ok(PathBuf::from(format!("/virtual/{prefix}_{}.csv", records.len())))
    }
}

#[derive(Default)]
struct FakePublish {
    seen: Mutex<Vec<(PathBuf, String)>>,
    fail: bool,
}

impl Publish for FakePublish {
    fn publish(&self, location: &Path, message_prefix: &str) -> Result<(), PublishError> {
        self.seen.lock().unwrap().push((location.to_path_buf(), message_prefix.to_string()));
        if self.fail {
            Err(PublishError::Git { step: "push".into(), detail: "no remote".into() })
        } else {
            Ok(())
        }
    }
}

struct Rig {
    settings: Arc<StaticSettings>,
    fetch: Arc<FakeFetch>,
    store: Arc<FakeStore>,
    publish: Arc<FakePublish>,
    sink: Arc<LogBuffer>,
    runner: Runner,
}

fn rig(reply: Reply, store: FakeStore, publish: FakePublish, tweak: impl FnOnce(&mut Settings)) -> Rig {
    let mut s = Settings::default();
    s.scraping.target_url = "https://example.test/list.html".into();
    tweak(&mut s);

    let settings = Arc::new(StaticSettings::new(s));
    let fetch = FakeFetch::new(reply);
    let store = Arc::new(store);
    let publish = Arc::new(publish);
    let sink = Arc::new(LogBuffer::new(200, CancelToken::new()));
    let runner = Runner::new(settings.clone(), fetch.clone(), store.clone(), publish.clone(), sink.clone());
    Rig { settings, fetch, store, publish, sink, runner }
}

fn completed(out: RunOutcome) -> rad_scrape::runner::RunSummary {
    match out {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Failed(e) => panic!("run failed: {e}"),
    }
}

fn error_lines(sink: &LogBuffer) -> Vec<String> {
    sink.lines().into_iter().filter(|l| l.contains("[ERROR] ")).collect()
}

#[test]
fn fetch_failure_logs_once_and_never_persists() {
    let r = rig(Reply::Fail, FakeStore::default(), FakePublish::default(), |_| {});
    let out = r.runner.run_once("scheduled");

    assert!(matches!(out, RunOutcome::Failed(RunError::Fetch(FetchError::Status { status: 503, .. }))));
    assert_eq!(error_lines(&r.sink).len(), 1);
    assert_eq!(r.store.calls.load(Ordering::SeqCst), 0);
    assert!(r.publish.seen.lock().unwrap().is_empty());
}

#[test]
fn zero_records_is_a_failure() {
    let r = rig(Reply::Page("<html><body>维护中</body></html>"), FakeStore::default(), FakePublish::default(), |_| {});
    let out = r.runner.run_once("manual");

    assert!(matches!(out, RunOutcome::Failed(RunError::EmptyResult)));
    assert_eq!(error_lines(&r.sink).len(), 1);
    assert_eq!(r.store.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn full_run_persists_and_publishes() {
    let r = rig(Reply::Page(PAGE), FakeStore::default(), FakePublish::default(), |s| {
        s.scraping.output_prefix = "辐射".into();
        s.publishing.commit_message_prefix = "更新：".into();
    });
    let out = r.runner.run_once("scheduled");

    let summary = completed(out);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.location, PathBuf::from("/virtual/辐射_2.csv"));
    assert!(matches!(summary.publish, PublishStatus::Published));

    let seen = r.publish.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(PathBuf::from("/virtual/辐射_2.csv"), "更新：".to_string())]);
    assert!(error_lines(&r.sink).is_empty());
    assert!(r.sink.lines().last().unwrap().contains("scheduled run finished"));
}

#[test]
fn publish_failure_does_not_fail_the_run() {
    let r = rig(Reply::Page(PAGE), FakeStore::default(), FakePublish { fail: true, ..Default::default() }, |_| {});
    let out = r.runner.run_once("scheduled");

    let summary = completed(out);
    assert!(matches!(summary.publish, PublishStatus::Failed(PublishError::Git { .. })));
    let errors = error_lines(&r.sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("no remote"));
}

#[test]
fn publish_disabled_skips_publisher() {
    let r = rig(Reply::Page(PAGE), FakeStore::default(), FakePublish::default(), |s| {
        s.publishing.publish_enabled = false;
    });
    let summary = completed(r.runner.run_once("manual"));
    assert!(matches!(summary.publish, PublishStatus::Disabled));
    assert!(r.publish.seen.lock().unwrap().is_empty());
}

#[test]
fn persist_failure_aborts_before_publish() {
    let r = rig(Reply::Page(PAGE), FakeStore { fail: true, ..Default::default() }, FakePublish::default(), |_| {});
    let out = r.runner.run_once("manual");
    assert!(matches!(out, RunOutcome::Failed(RunError::Persist(_))));
    assert!(r.publish.seen.lock().unwrap().is_empty());
}

#[test]
fn panic_is_contained_and_truncated() {
    let long = "x".repeat(300);
    let r = rig(Reply::Panic(long), FakeStore::default(), FakePublish::default(), |_| {});
    let out = r.runner.run_once("scheduled");

    let why = match out {
        RunOutcome::Failed(RunError::Panicked(why)) => why,
        other => panic!("expected panic outcome, got {other:?}"),
    };
    assert_eq!(why.chars().count(), 103);
    assert!(why.ends_with("..."));
    assert_eq!(error_lines(&r.sink).len(), 1);
}

#[test]
fn every_run_takes_a_fresh_snapshot() {
    let r = rig(Reply::Fail, FakeStore::default(), FakePublish::default(), |_| {});
    r.runner.run_once("scheduled");

    let mut next = Settings::default();
    next.scraping.target_url = "https://mirror.example.test/".into();
    r.settings.replace(next);
    r.runner.run_once("scheduled");

    let urls = r.fetch.urls.lock().unwrap();
    assert_eq!(urls.as_slice(), ["https://example.test/list.html", "https://mirror.example.test/"]);
}

#[test]
fn real_store_writes_bom_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = Arc::new(StaticSettings::new(Settings::default()));
    let sink = Arc::new(LogBuffer::new(50, CancelToken::new()));
    let runner = Runner::new(
        settings,
        FakeFetch::new(Reply::Page(PAGE)),
        Arc::new(CsvStore::new(tmp.path())),
        Arc::new(FakePublish::default()),
        sink,
    );

    let summary = completed(runner.run_once("manual"));
    let text = fs::read_to_string(&summary.location).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "\u{feff}省份,监测点,辐射值,更新时间");
    assert_eq!(lines.next().unwrap(), "北京,北京 (东城),80.1 nGy/h,2024-05-01");
    assert_eq!(lines.count(), 1);
    assert!(summary.location.file_name().unwrap().to_string_lossy().starts_with("辐射监测数据_"));
}

#[test]
fn log_bound_follows_the_snapshot() {
    let r = rig(Reply::Page(PAGE), FakeStore::default(), FakePublish::default(), |s| {
        s.logging.max_log_lines = 2;
    });
    completed(r.runner.run_once("manual"));

    let lines = r.sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("manual run finished"));
}
