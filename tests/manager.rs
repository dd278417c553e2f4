//! DataManager tests with in-memory fetchers and a temporary data directory

use std::fs::{self, File};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::NaiveDate;
use ghpulse::cache;
use ghpulse::{
    Config, DailyCount, DataManager, FetcherRegistry, MetricFetcher, MetricKind, MetricSeries,
    PulseError, RepoId, Result,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn repo() -> RepoId {
    RepoId::new("octo", "widget")
}

/// Serves fixed rows (or a failure) and counts calls.
struct FakeFetcher {
    kind: MetricKind,
    rows: Vec<DailyCount>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    fn new(kind: MetricKind, rows: Vec<DailyCount>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = Self {
            kind,
            rows,
            fail: false,
            calls: Arc::clone(&calls),
        };
        (fetcher, calls)
    }

    fn failing(kind: MetricKind) -> (Self, Arc<AtomicUsize>) {
        let (mut fetcher, calls) = Self::new(kind, Vec::new());
        fetcher.fail = true;
        (fetcher, calls)
    }
}

#[async_trait]
impl MetricFetcher for FakeFetcher {
    fn kind(&self) -> MetricKind {
        self.kind
    }

    async fn fetch(&self, _repo: &RepoId) -> Result<MetricSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PulseError::NoData("offline".to_string()));
        }
        Ok(MetricSeries::from_rows(self.kind, self.rows.clone()))
    }
}

fn manager(dir: &TempDir, fetchers: FetcherRegistry) -> DataManager {
    DataManager::with_fetchers(Config::default().with_data_dir(dir.path()), fetchers)
}

fn seed(manager: &DataManager, kind: MetricKind, rows: Vec<DailyCount>) {
    let path = manager.path_for(&repo(), kind);
    cache::save_series(&path, &MetricSeries::from_rows(kind, rows)).unwrap();
}

fn age_file(manager: &DataManager, kind: MetricKind, age: Duration) {
    let path = manager.path_for(&repo(), kind);
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_second_get_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) = FakeFetcher::new(
        MetricKind::Stars,
        vec![DailyCount::new(d(2024, 1, 1), 2), DailyCount::new(d(2024, 1, 2), 1)],
    );
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));

    let first = manager.get(&repo(), MetricKind::Stars, false).await;
    let path = manager.path_for(&repo(), MetricKind::Stars);
    let written = fs::read_to_string(&path).unwrap();

    let second = manager.get(&repo(), MetricKind::Stars, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert_eq!(written, "date,stars\n2024-01-01,2\n2024-01-02,1\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), written);
}

#[tokio::test]
async fn test_force_refresh_bypasses_fresh_cache() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) =
        FakeFetcher::new(MetricKind::Forks, vec![DailyCount::new(d(2024, 2, 1), 4)]);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(&manager, MetricKind::Forks, vec![DailyCount::new(d(2024, 1, 1), 1)]);

    let series = manager.get(&repo(), MetricKind::Forks, true).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.rows(), &[DailyCount::new(d(2024, 2, 1), 4)]);
}

#[tokio::test]
async fn test_stale_cache_is_refetched() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) =
        FakeFetcher::new(MetricKind::Issues, vec![DailyCount::new(d(2024, 3, 1), 9)]);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(&manager, MetricKind::Issues, vec![DailyCount::new(d(2024, 1, 1), 1)]);
    age_file(&manager, MetricKind::Issues, Duration::from_secs(25 * 3600));

    let series = manager.get(&repo(), MetricKind::Issues, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.rows(), &[DailyCount::new(d(2024, 3, 1), 9)]);

    let status = manager.data_status(&repo());
    assert!(!status[&MetricKind::Issues].stale);
}

#[tokio::test]
async fn test_fetch_failure_falls_back_to_cache() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) = FakeFetcher::failing(MetricKind::Downloads);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(&manager, MetricKind::Downloads, vec![DailyCount::new(d(2024, 1, 5), 30)]);
    age_file(&manager, MetricKind::Downloads, Duration::from_secs(48 * 3600));

    let series = manager.get(&repo(), MetricKind::Downloads, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.rows(), &[DailyCount::new(d(2024, 1, 5), 30)]);
    // Failed fetches leave the file alone.
    assert!(manager.data_status(&repo())[&MetricKind::Downloads].stale);
}

#[tokio::test]
async fn test_fetch_failure_without_cache_is_empty() {
    let dir = TempDir::new().unwrap();
    let (fetcher, _) = FakeFetcher::failing(MetricKind::Commits);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));

    let series = manager.get(&repo(), MetricKind::Commits, false).await;

    assert!(series.is_empty());
    assert_eq!(series.kind(), MetricKind::Commits);
    assert!(!manager.path_for(&repo(), MetricKind::Commits).exists());
}

#[tokio::test]
async fn test_unreadable_cache_is_refetched() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) =
        FakeFetcher::new(MetricKind::Stars, vec![DailyCount::new(d(2024, 1, 1), 1)]);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    let path = manager.path_for(&repo(), MetricKind::Stars);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "when,how_many\nyesterday,lots\n").unwrap();

    let series = manager.get(&repo(), MetricKind::Stars, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.len(), 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "date,stars\n2024-01-01,1\n"
    );
}

#[tokio::test]
async fn test_range_miss_merges_fresh_over_cached() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) = FakeFetcher::new(
        MetricKind::PullRequests,
        vec![DailyCount::new(d(2024, 1, 2), 7), DailyCount::new(d(2024, 1, 3), 1)],
    );
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(
        &manager,
        MetricKind::PullRequests,
        vec![DailyCount::new(d(2024, 1, 1), 5), DailyCount::new(d(2024, 1, 2), 3)],
    );

    let series = manager
        .get_range(&repo(), MetricKind::PullRequests, d(2024, 1, 1), d(2024, 1, 3), false)
        .await;

    let expected = [
        DailyCount::new(d(2024, 1, 1), 5),
        DailyCount::new(d(2024, 1, 2), 7),
        DailyCount::new(d(2024, 1, 3), 1),
    ];
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.rows(), &expected);

    let persisted =
        cache::load_series(&manager.path_for(&repo(), MetricKind::PullRequests), MetricKind::PullRequests)
            .unwrap()
            .unwrap();
    assert_eq!(persisted.rows(), &expected);
}

#[tokio::test]
async fn test_covered_range_uses_cache() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) = FakeFetcher::new(MetricKind::Forks, Vec::new());
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(
        &manager,
        MetricKind::Forks,
        vec![DailyCount::new(d(2024, 1, 1), 1), DailyCount::new(d(2024, 1, 31), 2)],
    );

    // Reversed bounds are normalized.
    let series = manager
        .get_range(&repo(), MetricKind::Forks, d(2024, 1, 20), d(2024, 1, 10), false)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(series.len(), 2);
}

#[tokio::test]
async fn test_range_fetch_failure_returns_cached_rows() {
    let dir = TempDir::new().unwrap();
    let (fetcher, calls) = FakeFetcher::failing(MetricKind::Stars);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));
    seed(&manager, MetricKind::Stars, vec![DailyCount::new(d(2024, 1, 5), 3)]);

    let series = manager
        .get_range(&repo(), MetricKind::Stars, d(2024, 1, 1), d(2024, 1, 10), false)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(series.rows(), &[DailyCount::new(d(2024, 1, 5), 3)]);
}

#[tokio::test]
async fn test_force_fetch_real_data_defaults_to_verifiable_metrics() {
    let dir = TempDir::new().unwrap();
    let mut registry = FetcherRegistry::new();
    let mut counters = Vec::new();
    for kind in MetricKind::ALL {
        let (fetcher, calls) = FakeFetcher::new(kind, vec![DailyCount::new(d(2024, 1, 1), 1)]);
        registry = registry.with(fetcher);
        counters.push((kind, calls));
    }
    let manager = manager(&dir, registry);
    for kind in MetricKind::ALL {
        seed(&manager, kind, Vec::new());
    }

    let result = manager.force_fetch_real_data(&repo(), None).await;

    assert_eq!(
        result.keys().copied().collect::<Vec<_>>(),
        vec![MetricKind::Downloads, MetricKind::Commits]
    );
    for (kind, calls) in counters {
        let expected = usize::from(MetricKind::VERIFIABLE.contains(&kind));
        assert_eq!(calls.load(Ordering::SeqCst), expected, "{kind}");
    }

    let only_stars = manager
        .force_fetch_real_data(&repo(), Some(&[MetricKind::Stars]))
        .await;
    assert_eq!(only_stars.len(), 1);
    assert_eq!(only_stars[&MetricKind::Stars].len(), 1);
}

#[tokio::test]
async fn test_get_all_without_fetcher_yields_empty_series() {
    let dir = TempDir::new().unwrap();
    let (fetcher, _) = FakeFetcher::new(MetricKind::Stars, vec![DailyCount::new(d(2024, 1, 1), 1)]);
    let manager = manager(&dir, FetcherRegistry::new().with(fetcher));

    let all = manager.get_all(&repo(), false).await;

    assert_eq!(all.len(), MetricKind::ALL.len());
    assert_eq!(all[&MetricKind::Stars].len(), 1);
    for kind in MetricKind::ALL.into_iter().filter(|k| *k != MetricKind::Stars) {
        assert!(all[&kind].is_empty());
        assert_eq!(all[&kind].kind(), kind);
    }
}

#[tokio::test]
async fn test_data_status_and_clear_cache() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir, FetcherRegistry::new());
    seed(&manager, MetricKind::Stars, vec![DailyCount::new(d(2024, 1, 1), 1)]);
    seed(&manager, MetricKind::Forks, Vec::new());
    age_file(&manager, MetricKind::Forks, Duration::from_secs(30 * 3600));

    let status = manager.data_status(&repo());
    assert_eq!(status.len(), MetricKind::ALL.len());
    assert!(status[&MetricKind::Stars].exists);
    assert!(!status[&MetricKind::Stars].stale);
    assert!(status[&MetricKind::Forks].stale);
    assert!(status[&MetricKind::Forks].age.unwrap() >= Duration::from_secs(30 * 3600));
    assert!(!status[&MetricKind::Issues].exists);
    assert!(status[&MetricKind::Issues].age.is_none());

    manager.clear_cache(&repo(), Some(MetricKind::Stars)).unwrap();
    assert!(!manager.path_for(&repo(), MetricKind::Stars).exists());
    assert!(manager.path_for(&repo(), MetricKind::Forks).exists());

    manager.clear_cache(&repo(), None).unwrap();
    assert!(!dir.path().join("octo").join("widget").exists());
    manager.clear_cache(&repo(), None).unwrap();
}

#[tokio::test]
async fn test_github_backed_manager_caches_network_results() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/octo/widget/stats/commit_activity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"week": 1_704_585_600_i64, "days": [0, 2, 0, 0, 1, 0, 0], "total": 3}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::default()
        .with_api_base(server.uri())
        .with_data_dir(dir.path());
    let manager = DataManager::new(config).unwrap();

    let first = manager.get(&repo(), MetricKind::Commits, false).await;
    let second = manager.get(&repo(), MetricKind::Commits, false).await;

    assert_eq!(first, second);
    assert_eq!(
        first.rows(),
        &[DailyCount::new(d(2024, 1, 8), 2), DailyCount::new(d(2024, 1, 11), 1)]
    );
    assert!(manager.client().is_some());
}
