//! End-to-end pipeline tests over the file store and the spool queue

mod common;

use chunkfan::chunk::{ChunkDescriptor, ChunkRange};
use chunkfan::events::ObjectArrivalEvent;
use chunkfan::partitioner::Partitioner;
use chunkfan::pipeline::LocalPipeline;
use chunkfan::queue::{ChunkPublisher, DeliverySource, SpoolQueue, SqsEvent};
use chunkfan::storage::{FileBackend, ObjectStore};
use chunkfan::worker::Worker;
use common::{s3_notification, sqs_event, TestContextBuilder};
use std::sync::Arc;

const TEXT: &str = "It was the best of times, it was the worst of times";

#[tokio::test]
async fn test_run_counts_every_chunk() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(16)
        .with_object("input", "books/dickens.txt", TEXT)
        .build()
        .unwrap();
    let config = ctx.config().unwrap();

    let pipeline = LocalPipeline::from_config(&config).await.unwrap();
    let report = pipeline.run("input", "books/dickens.txt").await.unwrap();

    // 51 bytes at 16 per chunk
    assert_eq!(report.partition.dispatched, 4);
    assert_eq!(report.drain.processed, 4);
    assert!(report.drain.dead_letters.is_empty());
    assert!(report.aggregate.complete);

    let first = ctx.read_result("results/books/dickens.txt-0-15.json").unwrap();
    assert_eq!(first["wordCount"], 4); // "It was the best "
    assert_eq!(first["chunk"]["start"], 0);
    assert!(first["outputPath"]
        .as_str()
        .unwrap()
        .ends_with("/results/results/books/dickens.txt-0-15.json"));

    let summary = ctx.read_result("results/books/dickens.txt-total.json").unwrap();
    assert_eq!(summary["expectedChunks"], 4);
    assert_eq!(summary["complete"], true);
    assert_eq!(summary["wordCount"], report.aggregate.word_count);
}

#[tokio::test]
async fn test_duplicate_delivery_leaves_one_identical_record() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_object("input", "data.txt", "the quick brown fox")
        .build()
        .unwrap();
    let config = ctx.config().unwrap();
    let store: Arc<dyn ObjectStore> =
        Arc::new(FileBackend::with_base_dir(&ctx.objects_dir).await.unwrap());
    let worker = Worker::new(store.clone(), &config);

    let descriptor = ChunkDescriptor::new("input", "data.txt", ChunkRange::new(0, 19).unwrap())
        .with_ordinal(0);
    let body = descriptor.to_message().unwrap().body;
    let event: SqsEvent =
        serde_json::from_str(&sqs_event(&[("m-1", &body), ("m-2", &body)])).unwrap();

    let report = worker.process_batch(event.into_deliveries()).await;
    assert_eq!(report.processed.len(), 2);

    let keys = store.list("results", "results/").await.unwrap();
    assert_eq!(keys, vec!["results/data.txt-0-19.json".to_string()]);

    let record = ctx.read_result("results/data.txt-0-19.json").unwrap();
    assert_eq!(record["wordCount"], 4);
    assert_eq!(record["bucket"], "input");
    assert_eq!(record["key"], "data.txt");
}

#[tokio::test]
async fn test_partition_then_drain_spool() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(10)
        .with_object("input", "data file.txt", "one two three four five six")
        .build()
        .unwrap();
    let config = ctx.config().unwrap();

    let store: Arc<dyn ObjectStore> =
        Arc::new(FileBackend::with_base_dir(&ctx.objects_dir).await.unwrap());
    let spool = Arc::new(SpoolQueue::open(&ctx.spool_dir).await.unwrap());
    let partitioner = Partitioner::new(store.clone(), spool.clone(), config.chunk_size().unwrap());

    let event = ObjectArrivalEvent::from_s3_json(&s3_notification("input", "data+file.txt")).unwrap();
    let reports = partitioner.handle_event(&event).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].key, "data file.txt");
    assert_eq!(reports[0].dispatched, 3);
    assert_eq!(spool.ready_len().await.unwrap(), 3);

    let pipeline = LocalPipeline::new(store, spool.clone(), spool.clone(), &config).unwrap();
    let drain = pipeline.drain().await.unwrap();
    assert_eq!(drain.processed, 3);
    assert_eq!(spool.ready_len().await.unwrap(), 0);

    let aggregate = pipeline.aggregator().aggregate("input", "data file.txt").await.unwrap();
    assert!(aggregate.complete);
}

#[tokio::test]
async fn test_interrupted_consumer_messages_are_recovered() {
    let ctx = TestContextBuilder::new().unwrap().build().unwrap();
    let spool = SpoolQueue::open(&ctx.spool_dir).await.unwrap();

    let descriptor = ChunkDescriptor::new("input", "x.txt", ChunkRange::new(0, 9).unwrap());
    spool.publish(descriptor.to_message().unwrap()).await.unwrap();

    let claimed = spool.receive(10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert!(spool.receive(10).await.unwrap().is_empty());

    // A new consumer after a crash puts claimed messages back
    let reopened = SpoolQueue::open(&ctx.spool_dir).await.unwrap();
    assert_eq!(reopened.recover_inflight().await.unwrap(), 1);
    let again = reopened.receive(10).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].receive_count, 2);
}

#[tokio::test]
async fn test_dropped_batch_is_redelivered_after_visibility_timeout() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(10)
        .with_visibility_timeout("1s")
        .with_object("input", "data.txt", "alpha beta gamma delta")
        .build()
        .unwrap();
    let config = ctx.config().unwrap();

    let store: Arc<dyn ObjectStore> =
        Arc::new(FileBackend::with_base_dir(&ctx.objects_dir).await.unwrap());
    let spool = Arc::new(SpoolQueue::open(&ctx.spool_dir).await.unwrap());
    let partitioner = Partitioner::new(store, spool.clone(), config.chunk_size().unwrap());
    assert_eq!(partitioner.partition_object("input", "data.txt").await.unwrap().dispatched, 3);

    // A consumer claims the whole queue and goes away without settling
    let abandoned = spool.receive(10).await.unwrap();
    assert_eq!(abandoned.len(), 3);
    drop(abandoned);

    let pipeline = LocalPipeline::from_config(&config).await.unwrap();
    assert_eq!(pipeline.drain().await.unwrap().processed, 0);
    assert!(!pipeline.aggregator().aggregate("input", "data.txt").await.unwrap().complete);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

    let drain = pipeline.drain().await.unwrap();
    assert_eq!(drain.processed, 3);
    assert_eq!(spool.inflight_len().await.unwrap(), 0);
    assert!(pipeline.aggregator().aggregate("input", "data.txt").await.unwrap().complete);
}
