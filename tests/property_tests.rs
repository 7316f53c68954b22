//! Property-based tests for repository invariants.
//!
//! These use proptest to check that saves and deletes against the mock
//! client keep the stored record set consistent for arbitrary inputs.

use std::sync::Arc;

use proptest::prelude::*;

use measurekeep::core::config::StorageLayout;
use measurekeep::core::types::{MeasurementValue, MeasurementValues, RecordDraft};
use measurekeep::metadata::mock::MockMetadataClient;
use measurekeep::repository::codec::pointer_target;
use measurekeep::repository::ids::SequenceIds;
use measurekeep::repository::{MeasurementRepository, RepositoryOptions};

/// Strategy for measurement names.
fn measurement_name() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

/// Strategy for single values: integers or short text.
fn measurement_value() -> impl Strategy<Value = MeasurementValue> {
    prop_oneof![
        (0i64..500).prop_map(MeasurementValue::from),
        "[0-9]{1,3}(in|cm)".prop_map(MeasurementValue::Text),
    ]
}

fn measurement_values() -> impl Strategy<Value = MeasurementValues> {
    prop::collection::btree_map(measurement_name(), measurement_value(), 0..6)
}

fn record_draft() -> impl Strategy<Value = RecordDraft> {
    ("[A-Za-z ]{0,16}", measurement_values()).prop_map(|(label, values)| RecordDraft {
        id: None,
        label,
        values,
    })
}

fn repository(client: &MockMetadataClient, layout: StorageLayout) -> MeasurementRepository {
    MeasurementRepository::new(
        Arc::new(client.clone()),
        RepositoryOptions::default().with_layout(layout),
    )
    .with_id_generator(Arc::new(SequenceIds::starting_at(1)))
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn layout() -> impl Strategy<Value = StorageLayout> {
    prop_oneof![Just(StorageLayout::Aggregate), Just(StorageLayout::Discrete)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every saved draft is listed back with the same label and values, in
    /// save order.
    #[test]
    fn saves_are_listed(layout in layout(), drafts in prop::collection::vec(record_draft(), 1..6)) {
        let client = MockMetadataClient::new();
        let repo = repository(&client, layout);

        let listed = run(async {
            for d in &drafts {
                repo.save("42", d.clone()).await.unwrap();
            }
            repo.list("42").await.unwrap()
        });

        prop_assert_eq!(listed.len(), drafts.len());
        for (item, d) in listed.iter().zip(&drafts) {
            let record = item.as_record().expect("decoded record");
            prop_assert_eq!(&record.label, &d.label);
            prop_assert_eq!(&record.values, &d.values);
        }
    }

    /// Replacing an aggregate record leaves the length unchanged and only
    /// touches that record.
    #[test]
    fn aggregate_replace_touches_one(
        drafts in prop::collection::vec(record_draft(), 1..6),
        pick in any::<prop::sample::Index>(),
        replacement in record_draft(),
    ) {
        let client = MockMetadataClient::new();
        let repo = repository(&client, StorageLayout::Aggregate);

        let (before, after, target) = run(async {
            let mut ids = Vec::new();
            for d in &drafts {
                ids.push(repo.save("42", d.clone()).await.unwrap().record.id);
            }
            let before = repo.list("42").await.unwrap();
            let target = ids[pick.index(ids.len())].clone();

            let mut update = replacement.clone();
            update.id = Some(target.clone());
            repo.save("42", update).await.unwrap();

            (before, repo.list("42").await.unwrap(), target)
        });

        prop_assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(&after) {
            let old = old.as_record().unwrap();
            let new = new.as_record().unwrap();
            prop_assert_eq!(&old.id, &new.id);
            if new.id == target {
                prop_assert_eq!(&new.label, &replacement.label);
                prop_assert_eq!(&new.values, &replacement.values);
            } else {
                prop_assert_eq!(old, new);
            }
        }
    }

    /// Deleting a present id removes exactly one record.
    #[test]
    fn delete_removes_exactly_one(
        layout in layout(),
        drafts in prop::collection::vec(record_draft(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let client = MockMetadataClient::new();
        let repo = repository(&client, layout);

        let (before, after, removed) = run(async {
            let mut ids = Vec::new();
            for d in &drafts {
                ids.push(repo.save("42", d.clone()).await.unwrap().record.id);
            }
            let target = ids[pick.index(ids.len())].clone();
            let before = repo.list("42").await.unwrap().len();
            let removed = repo.delete("42", &target).await.unwrap();
            (before, repo.list("42").await.unwrap(), removed)
        });

        prop_assert!(removed);
        prop_assert_eq!(after.len(), before - 1);
    }

    /// Saved ids are unique within a customer.
    #[test]
    fn ids_are_unique(layout in layout(), drafts in prop::collection::vec(record_draft(), 1..8)) {
        let client = MockMetadataClient::new();
        let repo = repository(&client, layout);

        let listed = run(async {
            for d in &drafts {
                repo.save("42", d.clone()).await.unwrap();
            }
            repo.list("42").await.unwrap()
        });

        let mut ids: Vec<_> = listed.iter().map(|i| i.selection_id().to_string()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), drafts.len());
    }

    /// Plain-text pointers name themselves, trimmed.
    #[test]
    fn plain_pointer_is_identity(id in "measurement_[0-9]{1,13}") {
        let padded = format!("  {}\n", id);
        prop_assert_eq!(pointer_target(&padded), Some(id));
    }
}
