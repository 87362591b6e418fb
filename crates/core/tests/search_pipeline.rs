//! End-to-end search pipeline tests: coordinator → ranker → snatcher,
//! driven through the queue runner with mock providers and download
//! clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use telesnatch_core::queue::QueueRunner;
use telesnatch_core::testing::{fixtures, MockDownloadClient, MockProvider};
use telesnatch_core::{
    CombinedQuality, DownloadDispatcher, Episode, EpisodeKey, EpisodeState, EpisodeStatus,
    EventBus, HistoryStore, Library, MemoryLibrary, Provider, ProviderError, ProviderRegistry,
    Quality, QueueItem, QueueKind, ResultCache, SearchCoordinator, SearchRunner, SearchType,
    Show, ShowId, SnatchExecutor,
};

struct Harness {
    library: Arc<MemoryLibrary>,
    coordinator: Arc<SearchCoordinator>,
    runner: SearchRunner,
    sent: Arc<RwLock<Vec<String>>>,
}

fn harness(show: Show, episodes: Vec<Episode>, providers: Vec<Arc<MockProvider>>) -> Harness {
    let library = Arc::new(MemoryLibrary::new());
    library.add_show(show, episodes);
    let library_dyn: Arc<dyn Library> = Arc::clone(&library) as Arc<dyn Library>;

    let provider_dyns: Vec<Arc<dyn Provider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Provider>)
        .collect();
    let registry = Arc::new(ProviderRegistry::new(provider_dyns));

    let history: Arc<dyn HistoryStore> =
        Arc::new(telesnatch_core::SqliteHistoryStore::in_memory().unwrap());
    let cache = Arc::new(ResultCache::in_memory().unwrap());
    let events = EventBus::default();

    let coordinator = Arc::new(SearchCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        Arc::clone(&cache),
        events.clone(),
        true,
        Duration::ZERO,
    ));

    let client = MockDownloadClient::accepting();
    let sent = client.sent_handle();
    let dispatcher = Arc::new(DownloadDispatcher::with_client(Arc::new(client)));
    let snatcher = Arc::new(SnatchExecutor::new(
        Arc::clone(&library_dyn),
        Arc::clone(&history),
        dispatcher,
        events.clone(),
        false,
    ));

    let runner = SearchRunner::new(
        Arc::clone(&coordinator),
        snatcher,
        library_dyn,
        registry,
        events,
        Duration::ZERO,
    );

    Harness {
        library,
        coordinator,
        runner,
        sent,
    }
}

fn show_with_quality(allowed: &[Quality], preferred: &[Quality]) -> Show {
    let mut show = fixtures::test_show(1);
    show.quality = CombinedQuality::combine(allowed, preferred);
    show
}

fn wanted_episodes(count: i32) -> Vec<Episode> {
    (1..=count)
        .map(|n| {
            Episode::new(
                ShowId(1),
                EpisodeKey::new(1, n),
                format!("Episode {}", n),
                EpisodeState::new(EpisodeStatus::Wanted),
            )
        })
        .collect()
}

fn backlog_item(episodes: &[i32]) -> QueueItem {
    QueueItem::new(
        QueueKind::Backlog,
        ShowId(1),
        episodes.iter().map(|&e| EpisodeKey::new(1, e)).collect(),
    )
}

// Spec end-to-end scenario A: one wanted episode, one healthy candidate,
// snatch commits and the episode lands on SNATCHED at HDTV.
#[tokio::test]
async fn scenario_a_wanted_episode_gets_snatched() {
    let provider = Arc::new(MockProvider::new("mock").with_peer_floor(1, 0));
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01E01.720p.HDTV.x264-GRP",
            1,
            vec![1],
        )])
        .await;

    let h = harness(
        show_with_quality(&[Quality::Hdtv], &[]),
        wanted_episodes(1),
        vec![Arc::clone(&provider)],
    );

    let mut item = backlog_item(&[1]);
    h.runner.run(&mut item).await;

    assert_eq!(item.success, Some(true));
    let ep = h.library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
    assert_eq!(ep.status(), EpisodeStatus::Snatched);
    assert_eq!(ep.quality(), Quality::Hdtv);
    assert_eq!(h.sent.read().await.len(), 1);
}

// Spec end-to-end scenario B: candidate below the provider's seeder
// floor is rejected and nothing is snatched.
#[tokio::test]
async fn scenario_b_seeder_floor_rejects_candidate() {
    let provider = Arc::new(MockProvider::new("mock").with_peer_floor(5, 0));
    let mut candidate = fixtures::hdtv_result("Test.Show.S01E01.720p.HDTV.x264-GRP", 1, vec![1]);
    candidate.seeders = 0;
    candidate.leechers = 0;
    provider.set_results(vec![candidate]).await;

    let h = harness(
        show_with_quality(&[Quality::Hdtv], &[]),
        wanted_episodes(1),
        vec![Arc::clone(&provider)],
    );

    let mut item = backlog_item(&[1]);
    h.runner.run(&mut item).await;

    assert_eq!(item.success, Some(false));
    let ep = h.library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
    assert_eq!(ep.status(), EpisodeStatus::Wanted);
    assert!(h.sent.read().await.is_empty());
}

// Spec end-to-end scenario C: an episode DOWNLOADED at a stale quality
// re-snatches at the preferred quality, even though it is numerically
// lower.
#[tokio::test]
async fn scenario_c_preferred_downgrade_replaces_stale_quality() {
    let provider = Arc::new(MockProvider::new("mock"));
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01E01.720p.HDTV.x264-GRP",
            1,
            vec![1],
        )])
        .await;

    let mut state = EpisodeState::new(EpisodeStatus::Downloaded);
    state.quality = Quality::FullHdBluray;
    let episode = Episode::new(ShowId(1), EpisodeKey::new(1, 1), "Pilot", state);

    let h = harness(
        show_with_quality(&[], &[Quality::Hdtv]),
        vec![episode],
        vec![Arc::clone(&provider)],
    );

    let mut item = backlog_item(&[1]);
    h.runner.run(&mut item).await;

    assert_eq!(item.success, Some(true));
    let ep = h.library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
    assert!(ep.status().is_snatched());
    assert_eq!(ep.quality(), Quality::Hdtv);
}

// Spec property P8: a season pack at the best seen quality, with every
// episode wanted, comes back as exactly one result covering the season.
#[tokio::test]
async fn season_pack_accepted_for_whole_season() {
    let provider = Arc::new(MockProvider::new("mock"));
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01.720p.HDTV.x264-GRP",
            1,
            vec![],
        )])
        .await;

    let show = show_with_quality(&[Quality::Hdtv], &[]);
    let h = harness(show.clone(), wanted_episodes(3), vec![Arc::clone(&provider)]);

    let keys = vec![
        EpisodeKey::new(1, 1),
        EpisodeKey::new(1, 2),
        EpisodeKey::new(1, 3),
    ];
    let outcome = h
        .coordinator
        .search(&show, &keys, SearchType::Backlog, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].episodes, vec![1, 2, 3]);
}

// A partially wanted season splits an NZB pack into per-episode results.
#[tokio::test]
async fn nzb_season_pack_splits_for_partial_season() {
    let provider = Arc::new(MockProvider::new("mock"));
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01.720p.HDTV.x264-GRP",
            1,
            vec![],
        )])
        .await;

    // Episode 2 already downloaded at a terminal allowed quality.
    let mut episodes = wanted_episodes(3);
    episodes[1] = {
        let mut state = EpisodeState::new(EpisodeStatus::Downloaded);
        state.quality = Quality::Hdtv;
        Episode::new(ShowId(1), EpisodeKey::new(1, 2), "Episode 2", state)
    };

    let show = show_with_quality(&[Quality::Hdtv], &[]);
    let h = harness(show.clone(), episodes, vec![Arc::clone(&provider)]);

    let keys = vec![
        EpisodeKey::new(1, 1),
        EpisodeKey::new(1, 2),
        EpisodeKey::new(1, 3),
    ];
    let outcome = h
        .coordinator
        .search(&show, &keys, SearchType::Backlog, false, false)
        .await
        .unwrap();

    let mut covered: Vec<Vec<i32>> =
        outcome.results.iter().map(|r| r.episodes.clone()).collect();
    covered.sort();
    assert_eq!(covered, vec![vec![1], vec![3]]);
}

// A torrent pack cannot be split; it competes as one multi-episode
// result covering the needed episodes.
#[tokio::test]
async fn torrent_season_pack_demotes_to_multi_episode() {
    let provider = Arc::new(MockProvider::new("mock").torrent());
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01.720p.HDTV.x264-GRP",
            1,
            vec![],
        )])
        .await;

    let mut episodes = wanted_episodes(3);
    episodes[1] = {
        let mut state = EpisodeState::new(EpisodeStatus::Downloaded);
        state.quality = Quality::Hdtv;
        Episode::new(ShowId(1), EpisodeKey::new(1, 2), "Episode 2", state)
    };

    let show = show_with_quality(&[Quality::Hdtv], &[]);
    let h = harness(show.clone(), episodes, vec![Arc::clone(&provider)]);

    let keys = vec![
        EpisodeKey::new(1, 1),
        EpisodeKey::new(1, 2),
        EpisodeKey::new(1, 3),
    ];
    let outcome = h
        .coordinator
        .search(&show, &keys, SearchType::Backlog, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].episodes, vec![1, 3]);
}

// A multi-episode result that covers episodes singles cannot displaces
// the overlapping single winners.
#[tokio::test]
async fn multi_episode_result_wins_over_overlapping_single() {
    let provider = Arc::new(MockProvider::new("mock"));
    provider
        .set_results(vec![
            fixtures::hdtv_result("Test.Show.S01E01.720p.HDTV.x264-A", 1, vec![1]),
            fixtures::hdtv_result("Test.Show.S01E01E02.720p.HDTV.x264-B", 1, vec![1, 2]),
        ])
        .await;

    let show = show_with_quality(&[Quality::Hdtv], &[]);
    let h = harness(show.clone(), wanted_episodes(2), vec![Arc::clone(&provider)]);

    let keys = vec![EpisodeKey::new(1, 1), EpisodeKey::new(1, 2)];
    let outcome = h
        .coordinator
        .search(&show, &keys, SearchType::Backlog, false, false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].episodes, vec![1, 2]);
}

// One provider failing never aborts the run; the next provider's
// results still win through.
#[tokio::test]
async fn provider_failure_does_not_abort_run() {
    let broken = Arc::new(MockProvider::new("broken"));
    broken
        .fail_next(ProviderError::Auth("bad key".to_string()))
        .await;

    let healthy = Arc::new(MockProvider::new("mock"));
    healthy
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01E01.720p.HDTV.x264-GRP",
            1,
            vec![1],
        )])
        .await;

    let h = harness(
        show_with_quality(&[Quality::Hdtv], &[]),
        wanted_episodes(1),
        vec![Arc::clone(&broken), Arc::clone(&healthy)],
    );

    let mut item = backlog_item(&[1]);
    h.runner.run(&mut item).await;

    assert_eq!(item.success, Some(true));
    let ep = h.library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
    assert_eq!(ep.status(), EpisodeStatus::Snatched);
}

// Zero enabled providers is the hard "no providers" failure.
#[tokio::test]
async fn no_providers_is_a_hard_failure() {
    let show = show_with_quality(&[Quality::Hdtv], &[]);
    let h = harness(show.clone(), wanted_episodes(1), vec![]);

    let err = h
        .coordinator
        .search(
            &show,
            &[EpisodeKey::new(1, 1)],
            SearchType::Backlog,
            false,
            false,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No providers available"));
}

// Manual searches cache results instead of snatching.
#[tokio::test]
async fn manual_search_caches_without_snatching() {
    let provider = Arc::new(MockProvider::new("mock"));
    provider
        .set_results(vec![fixtures::hdtv_result(
            "Test.Show.S01E01.720p.HDTV.x264-GRP",
            1,
            vec![1],
        )])
        .await;

    let h = harness(
        show_with_quality(&[Quality::Hdtv], &[]),
        wanted_episodes(1),
        vec![Arc::clone(&provider)],
    );

    let mut item = QueueItem::new(QueueKind::Manual, ShowId(1), vec![EpisodeKey::new(1, 1)]);
    h.runner.run(&mut item).await;

    assert_eq!(item.success, Some(true));
    assert_eq!(item.results.len(), 1);
    // No snatch happened.
    assert!(h.sent.read().await.is_empty());
    let ep = h.library.episode(ShowId(1), EpisodeKey::new(1, 1)).unwrap();
    assert_eq!(ep.status(), EpisodeStatus::Wanted);
}
