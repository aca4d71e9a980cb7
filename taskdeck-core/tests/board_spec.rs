use std::sync::Arc;

use serde_json::{json, Value};
use speculate2::speculate;
use taskdeck_core::models::*;
use taskdeck_core::notify::{NoticeLevel, RecordingNotifier};
use taskdeck_core::store::{InMemoryStore, Operation, Record};
use taskdeck_core::{BoardController, Gateway, LoadState, PicklistMode, Transition};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn opportunity(name: &str, stage: &str, deal_size: f64) -> Record {
    record(json!({
        "Name": name,
        "pipeline_name_c": "Pipeline",
        "deal_size_c": deal_size,
        "stage_c": stage
    }))
}

fn pipeline(
    store: &Arc<InMemoryStore>,
) -> (BoardController<Opportunity>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let gateway = Gateway::new(store.clone()).with_mode(PicklistMode::Lenient);
    (BoardController::new(gateway, notifier.clone()), notifier)
}

speculate! {
    describe "board controller" {
        describe "load" {
            it "buckets every entity under its stage" {
                let store = Arc::new(InMemoryStore::new());
                store.insert("sales_pipeline_c", opportunity("a", "Prospecting", 100.0));
                store.insert("sales_pipeline_c", opportunity("b", "Demo", 250.0));
                store.insert("sales_pipeline_c", opportunity("c", "Demo", 750.0));
                let (mut board, _) = pipeline(&store);

                tokio_test::block_on(board.load()).unwrap();

                assert_eq!(board.state(), &LoadState::Ready);
                let buckets = board.buckets();
                assert_eq!(buckets.len(), 6);
                assert_eq!(buckets.iter().map(|b| b.len()).sum::<usize>(), 3);
                assert_eq!(board.bucket(OpportunityStage::Proposal).len(), 2);
                assert_eq!(board.bucket_value(OpportunityStage::Proposal, |o| o.deal_size), 1000.0);
            }

            it "clears the list on failure and recovers on retry" {
                let store = Arc::new(InMemoryStore::new());
                store.insert("sales_pipeline_c", opportunity("a", "Prospecting", 100.0));
                let (mut board, _) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();

                store.fail_next(Operation::Fetch, "Gateway timeout");
                assert!(tokio_test::block_on(board.load()).is_err());
                assert_eq!(board.state(), &LoadState::Failed("Gateway timeout".into()));
                assert!(board.items().is_empty());

                tokio_test::block_on(board.load()).unwrap();
                assert_eq!(board.state(), &LoadState::Ready);
                assert_eq!(board.items().len(), 1);
            }
        }

        describe "drag and drop" {
            it "moves a lead to qualified with a single stage-only update" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("sales_pipeline_c", opportunity("a", "Prospecting", 100.0));
                let (mut board, notifier) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();

                board.begin_drag(id);
                assert_eq!(board.dragging(), Some(id));
                let transition = tokio_test::block_on(board.end_drag(id, OpportunityStage::Qualified));

                assert_eq!(
                    transition,
                    Transition::Moved { from: OpportunityStage::Lead, to: OpportunityStage::Qualified }
                );
                assert_eq!(board.dragging(), None);

                let updates = store.calls_for(Operation::Update);
                assert_eq!(updates.len(), 1);
                let sent = &updates[0].records[0];
                assert_eq!(sent.len(), 2);
                assert_eq!(sent["Id"], json!(id));
                assert_eq!(sent["stage_c"], json!("Qualification"));

                let notice = notifier.last().expect("a notice");
                assert_eq!(notice.level, NoticeLevel::Success);
                assert_eq!(notice.message, "Stage updated to Qualified");
                assert_eq!(board.bucket(OpportunityStage::Qualified).len(), 1);
                assert!(board.bucket(OpportunityStage::Lead).is_empty());
            }

            it "leaves the entity in place when the update fails" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("sales_pipeline_c", opportunity("a", "Prospecting", 100.0));
                let (mut board, notifier) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();
                store.fail_next(Operation::Update, "Record is locked");

                let transition = tokio_test::block_on(board.move_to(id, OpportunityStage::ClosedWon));

                assert!(matches!(transition, Transition::Failed { ref message } if message == "Record is locked"));
                assert_eq!(board.bucket(OpportunityStage::Lead).len(), 1);
                assert!(board.bucket(OpportunityStage::ClosedWon).is_empty());
                let notice = notifier.last().expect("a notice");
                assert_eq!(notice.level, NoticeLevel::Error);
                assert_eq!(notice.message, "Failed to update stage");
            }

            it "ignores a drop onto the same bucket" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("sales_pipeline_c", opportunity("a", "Negotiation", 100.0));
                let (mut board, notifier) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();
                store.clear_calls();

                let transition = tokio_test::block_on(board.end_drag(id, OpportunityStage::Negotiation));

                assert_eq!(transition, Transition::Unchanged);
                assert!(store.calls().is_empty());
                assert!(notifier.notices().is_empty());
            }

            it "ignores a drop of an unknown entity" {
                let store = Arc::new(InMemoryStore::new());
                let (mut board, _) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();
                store.clear_calls();

                let transition = tokio_test::block_on(board.move_to(99, OpportunityStage::Lead));
                assert_eq!(transition, Transition::Unchanged);
                assert!(store.calls().is_empty());
            }

            it "stamps completion when a task card lands in completed" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("task_c", record(json!({"title_c": "ship", "status_c": "in_progress"})));
                let notifier = Arc::new(RecordingNotifier::new());
                let mut board = BoardController::new(Gateway::<Task>::new(store.clone()), notifier.clone());
                tokio_test::block_on(board.load()).unwrap();

                tokio_test::block_on(board.move_to(id, TaskStatus::Completed));

                let sent = &store.calls_for(Operation::Update)[0].records[0];
                assert_eq!(sent["status_c"], json!("completed"));
                assert!(sent["completed_at_c"].is_string());
                assert_eq!(notifier.last().map(|n| n.message), Some("Status updated to Completed".to_string()));
            }
        }

        describe "create, edit and remove" {
            it "notifies and reloads after a create" {
                let store = Arc::new(InMemoryStore::new());
                let notifier = Arc::new(RecordingNotifier::new());
                let mut board = BoardController::new(Gateway::<Quote>::new(store.clone()), notifier.clone());
                let input = CreateQuoteInput {
                    name: "Q-7".into(),
                    value: 1200.0,
                    expected_close_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 31),
                    ..CreateQuoteInput::default()
                };

                let quote = tokio_test::block_on(board.create(&input)).unwrap();

                assert_eq!(quote.status, QuoteStatus::Draft);
                assert_eq!(board.items().len(), 1);
                assert_eq!(notifier.last().map(|n| n.message), Some("Quote created successfully!".to_string()));
            }

            it "reports form errors without a request" {
                let store = Arc::new(InMemoryStore::new());
                let notifier = Arc::new(RecordingNotifier::new());
                let mut board = BoardController::new(Gateway::<Quote>::new(store.clone()), notifier.clone());

                let result = tokio_test::block_on(board.create(&CreateQuoteInput::default()));

                assert!(result.is_err());
                assert!(store.calls().is_empty());
                assert_eq!(notifier.last().map(|n| n.message), Some("Please fix the form errors".to_string()));
            }

            it "saves an edit and reloads the board" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("sales_pipeline_c", opportunity("Acme", "Prospecting", 100.0));
                let (mut board, notifier) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();

                let input = UpdateOpportunityInput {
                    deal_size: Some(900.0),
                    stage: Some(OpportunityStage::Proposal),
                    ..UpdateOpportunityInput::default()
                };
                let updated = tokio_test::block_on(board.update(id, &input)).unwrap();

                assert_eq!(updated.deal_size, 900.0);
                assert_eq!(board.bucket(OpportunityStage::Proposal).len(), 1);
                assert_eq!(board.bucket_value(OpportunityStage::Proposal, |o| o.deal_size), 900.0);
                assert_eq!(notifier.last().map(|n| n.message), Some("Opportunity updated successfully!".to_string()));
            }

            it "notifies a failed edit and keeps the card as it was" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("sales_pipeline_c", opportunity("Acme", "Prospecting", 100.0));
                let (mut board, notifier) = pipeline(&store);
                tokio_test::block_on(board.load()).unwrap();
                store.reject_record("sales_pipeline_c", id, "Record is locked");

                let input = UpdateOpportunityInput {
                    name: Some("Acme renewal".into()),
                    ..UpdateOpportunityInput::default()
                };
                let err = tokio_test::block_on(board.update(id, &input)).unwrap_err();

                assert_eq!(err.to_string(), "Record is locked");
                assert_eq!(board.find(id).map(|o| o.name.as_str()), Some("Acme"));
                let notice = notifier.last().expect("a notice");
                assert_eq!(notice.level, NoticeLevel::Error);
                assert_eq!(notice.message, "Failed to save opportunity");
            }

            it "notifies a failed delete and keeps the card" {
                let store = Arc::new(InMemoryStore::new());
                let id = store.insert("contacts_c", record(json!({"first_name_c": "Ada", "status_c": "active"})));
                let notifier = Arc::new(RecordingNotifier::new());
                let mut board = BoardController::new(Gateway::<Contact>::new(store.clone()), notifier.clone());
                tokio_test::block_on(board.load()).unwrap();
                store.reject_record("contacts_c", id, "Has open deals");

                assert!(tokio_test::block_on(board.remove(id)).is_err());
                assert_eq!(board.items().len(), 1);
                assert_eq!(notifier.last().map(|n| n.message), Some("Failed to delete contact".to_string()));

                let other = store.insert("contacts_c", record(json!({"first_name_c": "Bob", "status_c": "prospect"})));
                tokio_test::block_on(board.remove(other)).unwrap();
                assert_eq!(notifier.last().map(|n| n.message), Some("Contact deleted successfully!".to_string()));
                assert_eq!(board.items().len(), 1);
            }
        }
    }
}
