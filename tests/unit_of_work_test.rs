//! Unit of work lifecycle and flush tests against an in-memory SQLite store.

mod common;

use std::sync::Arc;

use sea_orm::ColumnTrait;

use common::{category, item, item_count, seeded, setup};
use generic_repository::{
    with_transaction, QuerySpec, RepoError, RepoResult, StateViolation, TransactionState,
    UnitOfWork,
};

fn is_violation(err: &RepoError, expected: StateViolation) -> bool {
    matches!(err, RepoError::StateViolation(v) if *v == expected)
}

// =============================================================================
// Repository cache
// =============================================================================

#[tokio::test]
async fn test_repo_returns_same_instance_per_entity() {
    let db = setup().await;
    let uow = db.unit_of_work();

    let first = uow.repo::<item::Entity>();
    let second = uow.repo::<item::Entity>();
    assert!(Arc::ptr_eq(&first, &second));

    // A different entity gets its own repository.
    let categories = uow.repo::<category::Entity>();
    assert_eq!(categories.count().await.unwrap(), 0);
}

/// Rename an item through any unit of work, saving right away.
async fn rename_item<U: UnitOfWork>(uow: &U, id: i32, name: &str) -> RepoResult<bool> {
    let items = uow.repo::<item::Entity>();
    let Some(mut model) = items.get_by_id(id).await? else {
        return Ok(false);
    };
    model.name = name.to_string();
    items.update(model).await?;
    uow.save().await
}

#[tokio::test]
async fn test_generic_caller_works_through_trait() {
    let db = seeded().await;
    let uow = db.unit_of_work();

    assert!(rename_item(&uow, 2, "B-renamed").await.unwrap());
    assert!(!rename_item(&uow, 42, "missing").await.unwrap());
    uow.dispose().await.unwrap();

    let fresh = db.unit_of_work();
    let renamed = fresh.repo::<item::Entity>().get_by_id(2).await.unwrap().unwrap();
    assert_eq!(renamed.name, "B-renamed");
}

// =============================================================================
// State machine
// =============================================================================

#[tokio::test]
async fn test_state_transitions() {
    let db = setup().await;
    let uow = db.unit_of_work();
    assert_eq!(uow.state().await, TransactionState::Idle);

    uow.begin_transaction().await.unwrap();
    assert_eq!(uow.state().await, TransactionState::InTransaction);

    uow.commit_transaction().await.unwrap();
    assert_eq!(uow.state().await, TransactionState::Idle);

    uow.begin_transaction().await.unwrap();
    uow.roll_back().await.unwrap();
    assert_eq!(uow.state().await, TransactionState::Idle);
}

#[tokio::test]
async fn test_begin_twice_fails() {
    let db = setup().await;
    let uow = db.unit_of_work();

    uow.begin_transaction().await.unwrap();
    let err = uow.begin_transaction().await.unwrap_err();
    assert!(is_violation(&err, StateViolation::TransactionAlreadyOpen));
    assert_eq!(err.code(), "STATE_VIOLATION");

    // The first transaction is still usable.
    assert_eq!(uow.state().await, TransactionState::InTransaction);
    uow.roll_back().await.unwrap();
}

#[tokio::test]
async fn test_commit_and_rollback_without_transaction_fail() {
    let db = setup().await;
    let uow = db.unit_of_work();

    let err = uow.commit_transaction().await.unwrap_err();
    assert!(is_violation(&err, StateViolation::NoTransaction));

    let err = uow.roll_back().await.unwrap_err();
    assert!(is_violation(&err, StateViolation::NoTransaction));

    assert_eq!(uow.state().await, TransactionState::Idle);
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_rollback_restores_store() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    uow.begin_transaction().await.unwrap();
    items.add(common::item(4, "D", None, 1)).await.unwrap();
    items.update(common::item(1, "A-renamed", Some(1), 30)).await.unwrap();
    uow.save_changes().await.unwrap();

    // Visible inside the transaction.
    assert_eq!(items.count().await.unwrap(), 4);

    uow.roll_back().await.unwrap();
    assert_eq!(uow.pending_changes(), 0);
    assert!(!items.is_tracked(&4));

    assert_eq!(items.count().await.unwrap(), 3);
    let a = items.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(a.name, "A");
    uow.dispose().await.unwrap();
}

#[tokio::test]
async fn test_rollback_discards_unsaved_changes() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    uow.begin_transaction().await.unwrap();
    items.delete_by_id(2).await.unwrap();
    assert_eq!(uow.pending_changes(), 1);

    uow.roll_back().await.unwrap();
    assert_eq!(uow.pending_changes(), 0);
    assert!(!uow.save().await.unwrap());
    assert_eq!(items.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_commit_is_visible_to_other_units() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    uow.begin_transaction().await.unwrap();
    items.add(common::item(4, "D", Some(2), 40)).await.unwrap();
    uow.save_changes().await.unwrap();
    uow.commit_transaction().await.unwrap();
    uow.dispose().await.unwrap();

    assert_eq!(item_count(&db).await, 4);
}

#[tokio::test]
async fn test_transaction_helper_commits_on_ok() {
    let db = seeded().await;
    let uow = db.unit_of_work();

    let added = with_transaction!(uow, |tx| {
        let items = tx.repo::<item::Entity>();
        items.add(common::item(4, "D", None, 5)).await?;
        items.add(common::item(5, "E", None, 6)).await?;
        Ok::<_, RepoError>(2)
    })
    .unwrap();

    assert_eq!(added, 2);
    assert_eq!(uow.state().await, TransactionState::Idle);
    assert_eq!(uow.pending_changes(), 0);
    uow.dispose().await.unwrap();

    assert_eq!(item_count(&db).await, 5);
}

#[tokio::test]
async fn test_transaction_helper_rolls_back_on_err() {
    let db = seeded().await;
    let uow = db.unit_of_work();

    let result: Result<(), RepoError> = uow
        .transaction(|tx| {
            Box::pin(async move {
                let items = tx.repo::<item::Entity>();
                items.delete_by_id(1).await?;
                tx.save_changes().await?;
                Err::<(), _>(RepoError::NotFound)
            })
        })
        .await;

    assert!(matches!(result, Err(RepoError::NotFound)));
    assert_eq!(uow.state().await, TransactionState::Idle);
    uow.dispose().await.unwrap();

    assert_eq!(item_count(&db).await, 3);
}

// =============================================================================
// Saving
// =============================================================================

#[tokio::test]
async fn test_save_reports_affected_rows() {
    let db = setup().await;
    let uow = db.unit_of_work();
    let categories = uow.repo::<category::Entity>();

    categories.add(common::category(1, "Tools")).await.unwrap();
    assert_eq!(uow.pending_changes(), 1);
    assert!(uow.save().await.unwrap());
    assert_eq!(uow.pending_changes(), 0);

    // Nothing staged.
    assert!(!uow.save().await.unwrap());
}

#[tokio::test]
async fn test_failed_flush_keeps_changes_queued() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    items.add(common::item(1, "duplicate", None, 0)).await.unwrap();

    let err = uow.save_changes().await.unwrap_err();
    assert!(matches!(err, RepoError::Store(_)));
    assert_eq!(err.code(), "STORE_FAILURE");
    assert_eq!(uow.pending_changes(), 1);

    let err = uow.save().await.unwrap_err();
    assert!(matches!(err, RepoError::Store(_)));
    assert_eq!(items.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_flush_is_atomic() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    items.add(common::item(4, "D", None, 0)).await.unwrap();
    items.add(common::item(2, "duplicate", None, 0)).await.unwrap();

    assert!(uow.save_changes().await.is_err());
    assert!(!items.exists(4).await.unwrap());
    assert_eq!(uow.pending_changes(), 2);
}

#[tokio::test]
async fn test_changes_apply_in_program_order() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    let d = common::item(4, "D", None, 0);
    items.add(d.clone()).await.unwrap();
    items.delete(d).await.unwrap();
    uow.save_changes().await.unwrap();

    assert_eq!(items.count().await.unwrap(), 3);
    assert!(!items.exists(4).await.unwrap());
}

#[tokio::test]
async fn test_reads_see_earlier_saves() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    items.update(common::item(2, "B2", Some(2), 11)).await.unwrap();
    uow.save_changes().await.unwrap();

    let stored = items
        .get_all(QuerySpec::new().filter(item::Column::Name.eq("B2")))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

// =============================================================================
// Disposal
// =============================================================================

#[tokio::test]
async fn test_dispose_rolls_back_open_transaction() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();

    uow.begin_transaction().await.unwrap();
    items.delete_by_id(3).await.unwrap();
    uow.save_changes().await.unwrap();
    uow.dispose().await.unwrap();

    assert_eq!(item_count(&db).await, 3);
}

#[tokio::test]
async fn test_repository_fails_after_dispose() {
    let db = seeded().await;
    let uow = db.unit_of_work();
    let items = uow.repo::<item::Entity>();
    uow.dispose().await.unwrap();

    let err = items.count().await.unwrap_err();
    assert!(is_violation(&err, StateViolation::Disposed));

    let err = items.get_all(QuerySpec::new()).await.unwrap_err();
    assert!(is_violation(&err, StateViolation::Disposed));

    let err = items.add(common::item(9, "Z", None, 0)).await.unwrap_err();
    assert!(is_violation(&err, StateViolation::Disposed));
}

#[tokio::test]
async fn test_drop_marks_repositories_disposed() {
    let db = seeded().await;
    let items = {
        let uow = db.unit_of_work();
        uow.repo::<item::Entity>()
    };

    let err = items.exists(1).await.unwrap_err();
    assert!(is_violation(&err, StateViolation::Disposed));
}
