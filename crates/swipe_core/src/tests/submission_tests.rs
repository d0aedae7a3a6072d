use super::*;
use shared::domain::{ImageRef, ItemId};

use crate::backend::SimulatedBackend;

fn item(id: &str) -> ClassificationItem {
    ClassificationItem {
        id: ItemId::new(id),
        task_id: None,
        prompt: "Is this a hornet?".into(),
        image: ImageRef::uri(format!("https://example.com/{id}.jpg")),
        reference_images: Vec::new(),
    }
}

async fn pipeline_with(
    ids: &[&str],
) -> (
    SubmissionPipeline,
    Arc<SimulatedBackend>,
    Arc<Mutex<ClassificationQueue>>,
) {
    let items: Vec<_> = ids.iter().map(|id| item(id)).collect();
    let backend = Arc::new(SimulatedBackend::new(items.clone()));
    let queue = Arc::new(Mutex::new(ClassificationQueue::new()));
    queue.lock().await.load(items);
    let pipeline =
        SubmissionPipeline::new(backend.clone(), queue.clone(), &EngineConfig::default());
    (pipeline, backend, queue)
}

#[tokio::test(start_paused = true)]
async fn acknowledged_submission_advances_queue() {
    let (pipeline, backend, queue) = pipeline_with(&["A", "B"]).await;

    let result = pipeline
        .submit(&item("A"), Direction::Yes)
        .await
        .expect("submit");

    let queue = queue.lock().await;
    assert_eq!(queue.cursor(), 1);
    assert_eq!(queue.results(), &[result.clone()]);
    assert_eq!(queue.results()[0].direction, Direction::Yes);
    assert_eq!(queue.current().map(|i| i.id.as_str()), Some("B"));
    assert_eq!(backend.accepted().await, vec![result]);
}

#[tokio::test(start_paused = true)]
async fn two_failures_leave_item_current_and_report_submission_failed() {
    let (pipeline, backend, queue) = pipeline_with(&["A"]).await;
    backend.fail_next_submissions(2).await;

    let err = pipeline
        .submit(&item("A"), Direction::No)
        .await
        .expect_err("exhausted retries");

    assert!(
        matches!(
            err,
            CoreError::SubmissionFailed { attempts: 2, ref item_id, .. } if item_id.as_str() == "A"
        ),
        "{err:?}"
    );
    assert_eq!(backend.submit_calls().await, 2);
    let queue = queue.lock().await;
    assert_eq!(queue.cursor(), 0);
    assert!(queue.results().is_empty());
    assert_eq!(queue.current().map(|i| i.id.as_str()), Some("A"));
}

#[tokio::test(start_paused = true)]
async fn single_failure_is_retried_with_same_submission_id() {
    let (pipeline, backend, queue) = pipeline_with(&["A"]).await;
    backend.fail_next_submissions(1).await;

    let result = pipeline
        .submit(&item("A"), Direction::Trash)
        .await
        .expect("retry succeeds");

    assert_eq!(backend.submit_calls().await, 2);
    let accepted = backend.accepted().await;
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].submission_id, result.submission_id);
    assert_eq!(queue.lock().await.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_is_not_retried() {
    let (pipeline, backend, queue) = pipeline_with(&["A"]).await;
    backend.reject_credential(true).await;

    let err = pipeline
        .submit(&item("A"), Direction::Yes)
        .await
        .expect_err("unauthorized");

    assert_eq!(err, CoreError::Unauthorized);
    assert_eq!(backend.submit_calls().await, 1);
    assert_eq!(queue.lock().await.cursor(), 0);
}

#[tokio::test(start_paused = true)]
async fn each_attempt_is_bounded_by_timeout() {
    let (pipeline, backend, queue) = pipeline_with(&["A"]).await;
    backend.set_ack_delay(Duration::from_secs(30)).await;

    let started = tokio::time::Instant::now();
    let err = pipeline
        .submit(&item("A"), Direction::Yes)
        .await
        .expect_err("timed out");

    assert!(matches!(err, CoreError::SubmissionFailed { .. }));
    assert_eq!(backend.submit_calls().await, 2);
    // Two 10s attempts plus the retry delay.
    assert!(started.elapsed() < Duration::from_secs(21));
    assert_eq!(queue.lock().await.cursor(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_submissions_are_serialized_in_commit_order() {
    let (pipeline, backend, queue) = pipeline_with(&["A", "B"]).await;
    backend.set_ack_delay(Duration::from_millis(100)).await;

    let item_a = item("A");
    let item_b = item("B");
    let (first, second) = tokio::join!(
        pipeline.submit(&item_a, Direction::Yes),
        pipeline.submit(&item_b, Direction::No),
    );
    let first = first.expect("first");
    let second = second.expect("second");
    assert!(first.committed_at <= second.committed_at);

    let queue = queue.lock().await;
    let order: Vec<&str> = queue.results().iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(order, vec!["A", "B"]);
    let backend_order: Vec<String> = backend
        .accepted()
        .await
        .into_iter()
        .map(|r| r.item_id.0)
        .collect();
    assert_eq!(backend_order, vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn double_commit_on_same_item_cannot_double_advance() {
    let (pipeline, backend, queue) = pipeline_with(&["A", "B"]).await;
    backend.set_ack_delay(Duration::from_millis(100)).await;

    let item_a1 = item("A");
    let item_a2 = item("A");
    let (first, second) = tokio::join!(
        pipeline.submit(&item_a1, Direction::Yes),
        pipeline.submit(&item_a2, Direction::No),
    );
    first.expect("first");
    assert_eq!(
        second.expect_err("stale"),
        CoreError::StaleItem {
            item_id: ItemId::new("A")
        }
    );

    assert_eq!(backend.submit_calls().await, 1);
    let queue = queue.lock().await;
    assert_eq!(queue.cursor(), 1);
    assert_eq!(queue.results().len(), 1);
}

#[tokio::test]
async fn submitting_into_exhausted_queue_issues_no_backend_call() {
    let (pipeline, backend, _queue) = pipeline_with(&[]).await;
    let err = pipeline
        .submit(&item("ghost"), Direction::Yes)
        .await
        .expect_err("exhausted");
    assert_eq!(err, CoreError::QueueExhausted);
    assert_eq!(backend.submit_calls().await, 0);
    assert!(!pipeline.is_busy());
}
