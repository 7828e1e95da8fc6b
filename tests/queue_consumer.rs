mod common;

use std::sync::Arc;

use common::{RecordingNotifier, ev, fast_policy, user};
use enrollwatch::application::WatcherRegistry;
use enrollwatch::infrastructure::fake_eligibility::ScriptedEligibility;
use enrollwatch::infrastructure::memory_store::InMemoryWatchStore;
use enrollwatch::interfaces::queue::{ConsumeStats, QueueConsumer};

#[tokio::test]
async fn queued_records_feed_the_registry() {
    let registry = Arc::new(WatcherRegistry::new(
        Arc::new(InMemoryWatchStore::new()),
        Arc::new(ScriptedEligibility::new()),
        Arc::new(RecordingNotifier::new()),
        fast_policy(),
    ));
    let consumer = QueueConsumer {
        registry: registry.clone(),
    };

    let input = concat!(
        r#"{"userID": 7, "eventID": 100, "token": "abc"}"#,
        "\n",
        "not json\n",
        "\n",
        r#"{"userID": "7", "eventID": "101"}"#,
        "\n",
        r#"{"userID": 7, "eventID": 100}"#,
        "\n",
        r#"{"userID": "", "eventID": 1}"#,
        "\n",
    );

    let stats = consumer.consume(input.as_bytes()).await.unwrap();

    assert_eq!(
        stats,
        ConsumeStats {
            accepted: 3,
            rejected: 2,
        }
    );
    assert_eq!(registry.users().unwrap(), vec![user("7")]);
    let list = registry.get(&user("7")).unwrap().unwrap();
    assert_eq!(list.list().await.unwrap(), vec![ev("100"), ev("101")]);
    assert_eq!(list.watch_user().token.as_deref(), Some("abc"));

    registry.shutdown().await;
}
