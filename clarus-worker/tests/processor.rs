//! Job processor state machine against the in-memory store

mod common;

use uuid::Uuid;

use clarus_worker::store::JobStore;
use clarus_worker::{JobOutcome, JobStatus};

use common::{Harness, TRAFFIC_CSV};

#[tokio::test]
async fn test_happy_path_records_summary_and_scored_file() {
    let h = Harness::new();
    let (file, job) = h.queue_csv("traffic.csv", TRAFFIC_CSV).await;

    let outcome = h.processor.process(job.id).await.unwrap();

    let JobOutcome::Done(summary) = outcome else {
        panic!("expected done, got {:?}", outcome);
    };
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.attack_rows, 3);
    assert!((summary.attack_ratio - 0.75).abs() < 1e-9);
    assert_eq!(summary.top_class.as_deref(), Some("DoS"));
    assert!((summary.top_class_share.unwrap() - 2.0 / 3.0).abs() < 1e-9);

    assert_eq!(
        h.store.history(job.id),
        vec![JobStatus::Queued, JobStatus::Running, JobStatus::Done]
    );

    let stored = h.store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "done");
    assert!(stored.started_at.is_some());
    assert!(stored.finished_at.is_some());
    assert!(stored.error_message.is_none());

    let file = h.store.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(file.rows_count, Some(4));

    let record = h.store.find_summary(job.id).await.unwrap().unwrap();
    assert_eq!(record.rows_scored, 4);
    assert_eq!(record.attack_rows, 3);
    assert_eq!(record.top_class.as_deref(), Some("DoS"));
    assert_eq!(record.detected_delimiter.as_deref(), Some(","));
    assert_eq!(record.parsed_columns, Some(6));

    let scored_path = record.scored_path.unwrap();
    assert!(scored_path.ends_with("traffic_scored.csv"));

    let scored = std::fs::read_to_string(&scored_path).unwrap();
    let lines: Vec<&str> = scored.lines().collect();
    assert_eq!(lines[0], "pkts,bytes,dur,rate,proto_num,label,is_attack,attack_type");
    assert_eq!(lines[1], "10,500,0.5,1.0,6,normal,0,benign");
    assert_eq!(lines[2], "200,500,0.7,2.0,6,ddos,1,DDoS");
    assert_eq!(lines[3], "300,5000,0.9,3.0,17,dos,1,DoS");
    assert_eq!(lines[4], "400,6000,1.1,4.0,17,dos,1,DoS");
}

#[tokio::test]
async fn test_scored_file_never_carries_label_columns() {
    let h = Harness::new();
    let csv = "\
pkts,attack,bytes,category,subcategory,dur
10,0,500,Normal,Normal,0.5
200,1,500,DDoS,UDP,0.7
300,1,5000,DoS,TCP,0.9
";
    let (_, job) = h.queue_csv("labelled.csv", csv).await;

    assert!(matches!(h.processor.process(job.id).await.unwrap(), JobOutcome::Done(_)));

    let record = h.store.find_summary(job.id).await.unwrap().unwrap();
    let scored = std::fs::read_to_string(record.scored_path.unwrap()).unwrap();
    let lines: Vec<&str> = scored.lines().collect();
    assert_eq!(lines[0], "pkts,bytes,dur,is_attack,attack_type");
    assert_eq!(lines[2], "200,500,0.7,1,DDoS");
    assert_eq!(lines[3], "300,5000,0.9,1,DoS");
}

#[tokio::test]
async fn test_semicolon_upload_is_detected() {
    let h = Harness::new();
    let csv = TRAFFIC_CSV.replace(',', ";");
    let (_, job) = h.queue_csv("semi.csv", &csv).await;

    let outcome = h.processor.process(job.id).await.unwrap();

    assert!(matches!(outcome, JobOutcome::Done(ref s) if s.attack_rows == 3));
    let record = h.store.find_summary(job.id).await.unwrap().unwrap();
    assert_eq!(record.detected_delimiter.as_deref(), Some(";"));
    assert_eq!(record.parsed_columns, Some(6));
}

#[tokio::test]
async fn test_header_only_upload_is_done_with_empty_summary() {
    let h = Harness::new();
    let (file, job) = h
        .queue_csv("empty_rows.csv", "pkts,bytes,dur,rate,proto_num\n")
        .await;

    let outcome = h.processor.process(job.id).await.unwrap();

    let JobOutcome::Done(summary) = outcome else {
        panic!("expected done, got {:?}", outcome);
    };
    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.top_class, None);
    assert_eq!(h.store.find_file(file.id).await.unwrap().unwrap().rows_count, Some(0));
}

#[tokio::test]
async fn test_unknown_job_is_missing() {
    let h = Harness::new();

    let outcome = h.processor.process(Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome, JobOutcome::Missing);
    assert_eq!(h.store.summary_count(), 0);
}

#[tokio::test]
async fn test_missing_file_record_fails_before_running() {
    let h = Harness::new();
    let (file, job) = h.queue_csv("traffic.csv", TRAFFIC_CSV).await;
    h.store.remove_file(file.id);

    let outcome = h.processor.process(job.id).await.unwrap();

    assert_eq!(outcome, JobOutcome::Failed("TrafficFile not found".to_string()));
    assert_eq!(
        h.store.history(job.id),
        vec![JobStatus::Queued, JobStatus::Failed]
    );
}

#[tokio::test]
async fn test_missing_stored_csv_fails() {
    let h = Harness::new();
    let gone = h.uploads_dir().join("gone.csv");
    let (_, job) = h.queue_path("gone.csv", &gone.display().to_string()).await;

    let outcome = h.processor.process(job.id).await.unwrap();

    let JobOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(message.starts_with("CSV not found at stored_path='"));
    assert!(message.contains("gone.csv"));

    let stored = h.store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "failed");
    assert_eq!(stored.error_message.as_deref(), Some(message.as_str()));
    assert_eq!(
        h.store.history(job.id),
        vec![JobStatus::Queued, JobStatus::Running, JobStatus::Failed]
    );
}

#[tokio::test]
async fn test_empty_file_fails_with_read_error() {
    let h = Harness::new();
    let (_, job) = h.queue_csv("blank.csv", "").await;

    let outcome = h.processor.process(job.id).await.unwrap();

    assert!(matches!(outcome, JobOutcome::Failed(ref m) if m.starts_with("Failed to read CSV")));
    assert_eq!(h.store.summary_count(), 0);
}

#[tokio::test]
async fn test_wrong_schema_fails_with_diagnostics() {
    let h = Harness::new();
    let (_, job) = h
        .queue_csv("other.csv", "alpha,beta,gamma\n1,2,3\n4,5,6\n")
        .await;

    let outcome = h.processor.process(job.id).await.unwrap();

    let JobOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(message.starts_with("CSV columns do not match trained feature set."));
    assert!(message.contains("Detected sep=','"));
    assert!(message.contains("parsed_cols=3"));
    assert!(message.contains("overlap_with_features=0"));
    assert_eq!(h.store.summary_count(), 0);
}

#[tokio::test]
async fn test_reprocessing_done_job_keeps_one_summary() {
    let h = Harness::new();
    let (_, job) = h.queue_csv("traffic.csv", TRAFFIC_CSV).await;

    h.processor.process(job.id).await.unwrap();
    let first = h.store.find_summary(job.id).await.unwrap().unwrap();

    let again = h.processor.process(job.id).await.unwrap();

    assert!(matches!(again, JobOutcome::Done(_)));
    assert_eq!(h.store.summary_count(), 1);
    let second = h.store.find_summary(job.id).await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.rows_scored, first.rows_scored);
    // Terminal jobs are not marked running again
    assert_eq!(
        h.store.history(job.id),
        vec![
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Done
        ]
    );
}

#[tokio::test]
async fn test_done_job_is_not_downgraded_to_failed() {
    let h = Harness::new();
    let (file, job) = h.queue_csv("traffic.csv", TRAFFIC_CSV).await;
    h.processor.process(job.id).await.unwrap();

    std::fs::remove_file(&file.stored_path).unwrap();
    let outcome = h.processor.process(job.id).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped { recorded: JobStatus::Done });
    let stored = h.store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "done");
    assert!(stored.error_message.is_none());
    assert_eq!(h.store.summary_count(), 1);
}

#[tokio::test]
async fn test_failed_job_is_not_upgraded_to_done() {
    let h = Harness::new();
    let late = h.uploads_dir().join("late.csv");
    let (_, job) = h.queue_path("late.csv", &late.display().to_string()).await;
    assert!(matches!(
        h.processor.process(job.id).await.unwrap(),
        JobOutcome::Failed(_)
    ));

    std::fs::create_dir_all(h.uploads_dir()).unwrap();
    std::fs::write(&late, TRAFFIC_CSV).unwrap();
    let outcome = h.processor.process(job.id).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped { recorded: JobStatus::Failed });
    assert_eq!(h.store.find_job(job.id).await.unwrap().unwrap().status, "failed");
    assert_eq!(h.store.summary_count(), 0);
}

#[tokio::test]
async fn test_rejected_completion_fails_job_without_summary() {
    let h = Harness::new();
    let (file, job) = h.queue_csv("traffic.csv", TRAFFIC_CSV).await;
    h.store.set_fail_completions(true);

    let outcome = h.processor.process(job.id).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Failed(ref m) if m.starts_with("Failed to record results:")
    ));
    assert_eq!(h.store.summary_count(), 0);
    assert_eq!(h.store.find_file(file.id).await.unwrap().unwrap().rows_count, None);
    assert_eq!(h.store.find_job(job.id).await.unwrap().unwrap().status, "failed");
}
