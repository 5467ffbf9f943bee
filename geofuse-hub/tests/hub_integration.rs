//! Integration tests for the fusion hub: selection across providers,
//! self-refresh, TTL expiry, teardown and forced refresh.


use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use geofuse_core::{EstimateUpdate, LocationProvider};
use geofuse_hub::{HubConfig, LocationHub};
use mock_provider::{fix, MockProvider};

const KEY: &str = "host";
const TTL: Duration = Duration::from_secs(60);
const WAIT: Duration = Duration::from_secs(2);

fn hub_with(providers: Vec<Arc<dyn LocationProvider>>) -> LocationHub {
    let config = HubConfig::new().with_sweep_interval(Duration::from_millis(20));
    LocationHub::new(providers, config).expect("default test config is valid")
}

async fn next_update(stream: &mut geofuse_hub::EstimateStream) -> EstimateUpdate {
    timeout(WAIT, stream.next())
        .await
        .expect("update should arrive in time")
        .expect("stream should be open")
}

#[tokio::test]
async fn higher_confidence_wins_weak_then_strong() {
    let weak = MockProvider::new("weak");
    let strong = MockProvider::new("strong");
    let hub = hub_with(vec![
        Arc::new(weak.clone()) as Arc<dyn LocationProvider>,
        Arc::new(strong.clone()),
    ]);

    let mut stream = hub.subscribe(KEY);

    weak.emit(fix(KEY, "weak", 0.3, 10.0, TTL)).await;
    let first = next_update(&mut stream).await;
    assert!(matches!(first, EstimateUpdate::Updated(ref f) if f.source == "weak"));

    strong.emit(fix(KEY, "strong", 0.9, 1000.0, TTL)).await;
    let second = next_update(&mut stream).await;
    assert!(matches!(second, EstimateUpdate::Updated(ref f) if f.source == "strong"));

    assert_eq!(hub.current_estimate(KEY).unwrap().source, "strong");
}

#[tokio::test]
async fn higher_confidence_wins_strong_then_weak() {
    let weak = MockProvider::new("weak");
    let strong = MockProvider::new("strong");
    let hub = hub_with(vec![
        Arc::new(weak.clone()) as Arc<dyn LocationProvider>,
        Arc::new(strong.clone()),
    ]);

    let mut stream = hub.subscribe(KEY);

    strong.emit(fix(KEY, "strong", 0.9, 1000.0, TTL)).await;
    let first = next_update(&mut stream).await;
    assert!(matches!(first, EstimateUpdate::Updated(ref f) if f.source == "strong"));

    // The weaker fix must not displace the estimate or notify anyone.
    weak.emit(fix(KEY, "weak", 0.3, 10.0, TTL)).await;
    let silence = timeout(Duration::from_millis(200), stream.next()).await;
    assert!(silence.is_err(), "losing fix must not be republished");

    assert_eq!(hub.current_estimate(KEY).unwrap().source, "strong");
    // Both fixes are recorded for diagnostics.
    assert_eq!(hub.source_fixes(KEY).len(), 2);
}

#[tokio::test]
async fn accuracy_breaks_equal_confidence() {
    let loose = MockProvider::new("loose");
    let tight = MockProvider::new("tight");
    let hub = hub_with(vec![
        Arc::new(loose.clone()) as Arc<dyn LocationProvider>,
        Arc::new(tight.clone()),
    ]);

    let mut stream = hub.subscribe(KEY);

    loose.emit(fix(KEY, "loose", 0.5, 5000.0, TTL)).await;
    next_update(&mut stream).await;

    tight.emit(fix(KEY, "tight", 0.5, 100.0, TTL)).await;
    let update = next_update(&mut stream).await;
    assert!(matches!(update, EstimateUpdate::Updated(ref f) if f.source == "tight"));
}

#[tokio::test]
async fn provider_refreshes_its_own_estimate() {
    let provider = MockProvider::new("only");
    let other = MockProvider::new("other");
    let hub = hub_with(vec![
        Arc::new(provider.clone()) as Arc<dyn LocationProvider>,
        Arc::new(other.clone()),
    ]);

    let mut stream = hub.subscribe(KEY);

    provider.emit(fix(KEY, "only", 0.9, 10.0, TTL)).await;
    next_update(&mut stream).await;

    // A weaker reading from the same source still replaces its own prior
    // contribution.
    provider.emit(fix(KEY, "only", 0.2, 50_000.0, TTL)).await;
    let update = next_update(&mut stream).await;
    match update {
        EstimateUpdate::Updated(f) => {
            assert_eq!(f.source, "only");
            assert_eq!(f.confidence, 0.2);
        }
        other => panic!("expected an update, got {other:?}"),
    }

    // But it still competes against other providers afterwards.
    other.emit(fix(KEY, "other", 0.5, 1000.0, TTL)).await;
    let update = next_update(&mut stream).await;
    assert!(matches!(update, EstimateUpdate::Updated(ref f) if f.source == "other"));
}

#[tokio::test]
async fn estimate_expires_to_unknown_without_new_fixes() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    let mut stream = hub.subscribe(KEY);

    provider
        .emit(fix(KEY, "only", 0.9, 10.0, Duration::from_millis(100)))
        .await;
    next_update(&mut stream).await;

    let update = next_update(&mut stream).await;
    assert!(matches!(update, EstimateUpdate::Unknown { ref key } if key == KEY));
    assert!(hub.current_estimate(KEY).is_none());

    // A recovering source re-establishes the estimate.
    provider.emit(fix(KEY, "only", 0.9, 10.0, TTL)).await;
    let update = next_update(&mut stream).await;
    assert!(matches!(update, EstimateUpdate::Updated(_)));
}

#[tokio::test]
async fn dropping_the_last_stream_tears_the_key_down() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    let mut stream = hub.subscribe(KEY);
    provider.emit(fix(KEY, "only", 0.9, 10.0, TTL)).await;
    next_update(&mut stream).await;
    assert!(provider.has_live_stream());

    drop(stream);

    // The provider stream is cancelled and the key state removed.
    timeout(WAIT, async {
        while provider.has_live_stream() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("provider stream should be cancelled promptly");
    assert!(hub.current_estimate(KEY).is_none());

    // Subscribing again starts a fresh stream cleanly.
    let starts_before = provider.stream_starts();
    let _stream = hub.subscribe(KEY);
    timeout(WAIT, async {
        while provider.stream_starts() == starts_before {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("resubscription should restart the provider stream");
}

#[tokio::test]
async fn shared_key_survives_until_last_subscriber() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    let first = hub.subscribe(KEY);
    let second = hub.subscribe(KEY);
    timeout(WAIT, async {
        while provider.stream_starts() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stream should start");
    assert_eq!(provider.stream_starts(), 1, "subscribers share one loop");

    drop(first);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        provider.has_live_stream(),
        "remaining subscriber keeps the loop alive"
    );

    drop(second);
    timeout(WAIT, async {
        while provider.has_live_stream() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("loop should stop after the last subscriber leaves");
}

#[tokio::test]
async fn refresh_restarts_provider_streams() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    let _stream = hub.subscribe(KEY);
    timeout(WAIT, async {
        while provider.stream_starts() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("initial stream should start");

    hub.refresh(KEY).await;

    timeout(WAIT, async {
        while provider.stream_starts() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh should restart the provider stream");
}

#[tokio::test]
async fn refresh_without_subscription_is_a_noop() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    hub.refresh(KEY).await;
    hub.refresh_all().await;
    assert_eq!(provider.stream_starts(), 0);
}

#[tokio::test]
async fn shutdown_stops_everything_within_bounds() {
    let provider = MockProvider::new("only");
    let hub = hub_with(vec![Arc::new(provider.clone()) as Arc<dyn LocationProvider>]);

    let mut stream = hub.subscribe(KEY);
    provider.emit(fix(KEY, "only", 0.9, 10.0, TTL)).await;
    next_update(&mut stream).await;

    timeout(WAIT, hub.shutdown())
        .await
        .expect("shutdown should be bounded")
        .expect("shutdown should succeed");

    // The subscriber observes the closed stream.
    let end = timeout(WAIT, stream.next())
        .await
        .expect("stream should close promptly");
    assert!(end.is_none());
}
