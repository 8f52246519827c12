//! Integration tests for stream effects and cancellation in the Store runtime
//!
//! A live subscription is modelled as a stream fed by an mpsc channel held in
//! the environment, so tests control exactly when items arrive.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use firetodo_core::{
    SmallVec,
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec,
};
use firetodo_runtime::Store;
use firetodo_testing::wait_for_state;
use futures::stream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const FEED: EffectId = EffectId::new("feed");
const TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, Default)]
struct FeedState {
    received: Vec<(u8, i32)>,
}

#[derive(Clone, Debug)]
enum FeedAction {
    /// Subscribe to the feed with the given tag, replacing any running feed
    Subscribe(u8),
    Unsubscribe,
    Item(u8, i32),
}

/// One receiver per tag, taken when the feed starts
#[derive(Clone, Default)]
struct FeedEnv {
    feeds: Arc<Mutex<Vec<(u8, mpsc::UnboundedReceiver<i32>)>>>,
}

impl FeedEnv {
    fn feed(&self, tag: u8) -> mpsc::UnboundedSender<i32> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().push((tag, rx));
        tx
    }

    fn take(&self, tag: u8) -> Option<mpsc::UnboundedReceiver<i32>> {
        let mut feeds = self.feeds.lock().unwrap();
        let index = feeds.iter().position(|(t, _)| *t == tag)?;
        Some(feeds.remove(index).1)
    }
}

#[derive(Clone)]
struct FeedReducer;

impl Reducer for FeedReducer {
    type State = FeedState;
    type Action = FeedAction;
    type Environment = FeedEnv;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FeedAction::Subscribe(tag) => {
                let Some(rx) = env.take(tag) else {
                    return SmallVec::new();
                };
                let items = stream::unfold(rx, move |mut rx| async move {
                    rx.recv().await.map(|value| (FeedAction::Item(tag, value), rx))
                });
                smallvec![
                    Effect::Cancel(FEED),
                    Effect::stream(items).cancellable(FEED),
                ]
            },
            FeedAction::Unsubscribe => smallvec![Effect::Cancel(FEED)],
            FeedAction::Item(tag, value) => {
                state.received.push((tag, value));
                SmallVec::new()
            },
        }
    }
}

#[tokio::test]
async fn stream_items_are_fed_back() {
    let env = FeedEnv::default();
    let tx = env.feed(1);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::Subscribe(1)).await.unwrap();
    tx.send(10).unwrap();
    tx.send(20).unwrap();

    wait_for_state(&store, TIMEOUT, |s| s.received.len() == 2)
        .await
        .unwrap();
    assert_eq!(
        store.state(|s| s.received.clone()).await,
        vec![(1, 10), (1, 20)]
    );
}

#[tokio::test]
async fn cancel_tears_down_the_stream() {
    let env = FeedEnv::default();
    let tx = env.feed(1);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::Subscribe(1)).await.unwrap();
    tx.send(1).unwrap();
    wait_for_state(&store, TIMEOUT, |s| s.received.len() == 1)
        .await
        .unwrap();

    store.send(FeedAction::Unsubscribe).await.unwrap();

    // Aborting the task drops the receiver
    tokio::time::timeout(TIMEOUT, tx.closed()).await.unwrap();
    assert!(tx.send(2).is_err());
    assert_eq!(store.state(|s| s.received.clone()).await, vec![(1, 1)]);
}

#[tokio::test]
async fn resubscribing_replaces_the_previous_stream() {
    let env = FeedEnv::default();
    let first = env.feed(1);
    let second = env.feed(2);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::Subscribe(1)).await.unwrap();
    store.send(FeedAction::Subscribe(2)).await.unwrap();

    tokio::time::timeout(TIMEOUT, first.closed()).await.unwrap();

    second.send(5).unwrap();
    wait_for_state(&store, TIMEOUT, |s| !s.received.is_empty())
        .await
        .unwrap();
    assert_eq!(store.state(|s| s.received.clone()).await, vec![(2, 5)]);
}

#[tokio::test]
async fn shutdown_aborts_running_streams() {
    let env = FeedEnv::default();
    let tx = env.feed(1);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::Subscribe(1)).await.unwrap();
    store.shutdown();

    tokio::time::timeout(TIMEOUT, tx.closed()).await.unwrap();
}

#[tokio::test]
async fn actions_from_streams_are_broadcast() {
    let env = FeedEnv::default();
    let tx = env.feed(1);
    let store = Store::new(FeedState::default(), FeedReducer, env);
    let mut actions = store.subscribe_actions();

    store.send(FeedAction::Subscribe(1)).await.unwrap();
    tx.send(42).unwrap();

    let action = tokio::time::timeout(TIMEOUT, actions.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(action, FeedAction::Item(1, 42)));
}
