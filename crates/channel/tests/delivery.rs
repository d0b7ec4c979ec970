use std::sync::Arc;
use taskmill_channel::{
    AsyncResultChannelQuery, AsyncResultChannelQueryExt, AsyncResultChannelSinkFactory, AsyncResultChannelSinkLocator,
    AsyncResultChannelSource, DefaultAsyncResultChannelSinkFactory, Delivery, InMemoryAsyncResultChannel,
};
use taskmill_core::{AsyncResult, UniqueId};

/// Producer and consumer share only the locator string and the channel id.
#[tokio::test]
async fn test_relocated_producer_and_consumer() {
    let local = Arc::new(InMemoryAsyncResultChannel::new());
    let producer_side = DefaultAsyncResultChannelSinkFactory::new(local.clone());
    let consumer_side = DefaultAsyncResultChannelSinkFactory::new(local);

    let request = serde_json::json!({
        "locator": AsyncResultChannelSinkLocator::local(),
        "channel_id": UniqueId::random(6),
    });
    let stored = request.to_string();

    let source: AsyncResultChannelSource = serde_json::from_str(&stored).unwrap();
    let query = consumer_side.channel_query(&source.locator).unwrap();
    assert!(!query.has_result(&source.channel_id).await);

    source.success(&producer_side, &vec![1, 2, 3]).await.unwrap();

    assert!(query.has_result(&source.channel_id).await);
    assert_eq!(
        query.result::<Vec<i32>>(&source.channel_id).await.unwrap(),
        AsyncResult::Success(vec![1, 2, 3])
    );
}

#[tokio::test]
async fn test_has_result_stays_true() {
    let factory = DefaultAsyncResultChannelSinkFactory::default();
    let locator = AsyncResultChannelSinkLocator::local();
    let sink = factory.create(&locator).unwrap();
    let query = factory.channel_query(&locator).unwrap();
    let source = AsyncResultChannelSource::new(locator, UniqueId::random(8));

    assert!(!query.has_result(&source.channel_id).await);
    assert_eq!(source.fail::<i32>(&factory, "first").await.unwrap(), Delivery::Stored);

    for n in 0..5 {
        let again = taskmill_channel::AsyncResultChannelMessage::success(source.channel_id.clone(), &n).unwrap();
        assert_eq!(sink.accept(again).await.unwrap(), Delivery::Ignored);
        assert!(query.has_result(&source.channel_id).await);
    }

    assert_eq!(
        query.result::<i32>(&source.channel_id).await.unwrap(),
        AsyncResult::Fail("first".to_string())
    );
}

#[tokio::test]
async fn test_independent_channels() {
    let factory = DefaultAsyncResultChannelSinkFactory::default();
    let locator = AsyncResultChannelSinkLocator::local();
    let query = factory.channel_query(&locator).unwrap();

    let ids: Vec<UniqueId> = (0..10).map(|_| UniqueId::new()).collect();
    for (n, id) in ids.iter().enumerate() {
        AsyncResultChannelSource::new(locator.clone(), id.clone())
            .success(&factory, &n)
            .await
            .unwrap();
    }

    for (n, id) in ids.iter().enumerate() {
        assert_eq!(query.result::<usize>(id).await.unwrap(), AsyncResult::Success(n));
    }
    assert_eq!(factory.local().len().await, 10);
}
