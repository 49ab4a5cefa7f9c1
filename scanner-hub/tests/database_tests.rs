//! Repository tests against an in-memory SQLite database.

mod common;

use chrono::{Duration, Utc};

use common::setup_test_db;
use scanner_hub::database::models::{ScannerRecordDbModel, StatusEventDbModel};
use scanner_hub::database::{
    RecordRepository, SqlxRecordRepository, SqlxStatusEventRepository, StatusEventRepository,
};
use scanner_hub::domain::{ConnectionPhase, ConnectionState, DeviceEndpoint, StatusTransitionEvent};

mod record_repository {
    use super::*;

    #[tokio::test]
    async fn test_list_recent_newest_first_and_limited() {
        let pool = setup_test_db().await;
        let repo = SqlxRecordRepository::new(pool);
        let start = Utc::now();

        for counter in 0..5 {
            let record = scan_frame::decode_line(&format!("A,OK,PC1,SN1,{counter}"));
            let row = ScannerRecordDbModel::from_decoded(
                "scanner1",
                &record,
                start + Duration::milliseconds(counter),
            );
            repo.append_record(&row).await.unwrap();
        }

        let recent = repo.list_recent("scanner1", 3).await.unwrap();
        let counters: Vec<Option<i64>> = recent.iter().map(|r| r.counter).collect();
        assert_eq!(counters, vec![Some(4), Some(3), Some(2)]);
        assert!(recent.iter().all(|r| r.id > 0));
    }

    #[tokio::test]
    async fn test_count_by_validity_per_device() {
        let pool = setup_test_db().await;
        let repo = SqlxRecordRepository::new(pool);
        let now = Utc::now();

        for (device, line) in [
            ("scanner1", "A,OK,PC1,SN1,1"),
            ("scanner1", "A,OK,PC1,SN1"),
            ("scanner1", "A,OK,PC1,SN1,abc"),
            ("scanner2", "A,OK,PC1,SN1,2"),
        ] {
            let row = ScannerRecordDbModel::from_decoded(device, &scan_frame::decode_line(line), now);
            repo.append_record(&row).await.unwrap();
        }

        let counts = repo.count_by_validity("scanner1").await.unwrap();
        assert_eq!(counts.valid, 1);
        assert_eq!(counts.invalid, 2);
        assert_eq!(counts.total(), 3);

        let empty = repo.count_by_validity("scanner9").await.unwrap();
        assert_eq!(empty.total(), 0);
    }

    #[tokio::test]
    async fn test_invalid_record_round_trip() {
        let pool = setup_test_db().await;
        let repo = SqlxRecordRepository::new(pool);

        let row = ScannerRecordDbModel::from_decoded(
            "scanner1",
            &scan_frame::decode_line("A,OK,PC1,SN1,1,extra"),
            Utc::now(),
        );
        repo.append_record(&row).await.unwrap();

        let stored = repo.list_recent("scanner1", 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].is_valid);
        assert_eq!(stored[0].raw_data, "A,OK,PC1,SN1,1,extra");
        assert_eq!(stored[0].error_message.as_deref(), Some("incorrect number of fields"));
        assert!(stored[0].counter.is_none());
    }
}

mod status_repository {
    use super::*;

    #[tokio::test]
    async fn test_history_newest_first() {
        let pool = setup_test_db().await;
        let repo = SqlxStatusEventRepository::new(pool);
        let endpoint = DeviceEndpoint::new("scanner1", Some("10.0.0.1".to_string()), 30000);

        let mut state = ConnectionState::new();
        let mut events = vec![StatusTransitionEvent::capture(&endpoint, &state)];
        state.begin_connecting().unwrap();
        state.mark_connected().unwrap();
        events.push(StatusTransitionEvent::capture(&endpoint, &state));
        state.record_failure("connection closed unexpectedly").unwrap();
        events.push(StatusTransitionEvent::capture(&endpoint, &state));

        for event in &events {
            repo.append_status_event(&StatusEventDbModel::from_event(event))
                .await
                .unwrap();
        }

        let history = repo.list_for_device("scanner1", 10).await.unwrap();
        let phases: Vec<ConnectionPhase> = history
            .into_iter()
            .map(|row| row.into_event().unwrap().status)
            .collect();
        assert_eq!(
            phases,
            vec![
                ConnectionPhase::Disconnected,
                ConnectionPhase::Connected,
                ConnectionPhase::Disconnected
            ]
        );

        let latest = repo.list_for_device("scanner1", 1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].reconnect_attempts, 1);
        assert_eq!(latest[0].port, 30000);

        assert!(repo.list_for_device("scanner2", 10).await.unwrap().is_empty());
    }
}
