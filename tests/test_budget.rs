//! Budget CRUD and upsert integration tests

use std::sync::{Arc, Barrier};

use pocketbook::app::{
    budget_create, budget_delete, budget_list, budget_update, budget_upsert, owner_register,
    BudgetCreateReq, BudgetUpdateReq, OwnerRegisterReq,
};
use pocketbook::domain::{Money, OwnerId};
use pocketbook::infra::db::init_test_db;
use pocketbook::infra::DbPool;

// ──────────────────────── Helper ────────────────────────

fn owner(pool: &DbPool, name: &str, pin: &str) -> OwnerId {
    let dto = owner_register(
        pool,
        OwnerRegisterReq {
            name: name.to_string(),
            pin: pin.to_string(),
        },
    )
    .unwrap();
    OwnerId::require(Some(dto.id)).unwrap()
}

fn count_rows(pool: &DbPool, owner: OwnerId, category: &str) -> i64 {
    pool.connect()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM budgets WHERE owner_id = ?1 AND category = ?2",
            rusqlite::params![owner.get(), category],
            |r| r.get(0),
        )
        .unwrap()
}

// ══════════════════════════════════════════════════════════
//  budget_create
// ══════════════════════════════════════════════════════════

#[test]
fn create_budget_returns_correct_fields() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let dto = budget_create(
        &pool,
        ana,
        BudgetCreateReq {
            category: " food ".into(),
            limit_amount: Some("400".parse().unwrap()),
        },
    )
    .unwrap();
    assert_eq!(dto.category, "food");
    assert_eq!(dto.limit_amount.to_string(), "400.00");
    assert_eq!(dto.owner_id, ana.get());
}

#[test]
fn create_duplicate_category_is_conflict() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let req = || BudgetCreateReq {
        category: "food".into(),
        limit_amount: None,
    };
    budget_create(&pool, ana, req()).unwrap();
    let err = budget_create(&pool, ana, req()).unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Uniqueness is per owner.
    let ben = owner(&pool, "Ben", "5678");
    budget_create(&pool, ben, req()).unwrap();
}

// ══════════════════════════════════════════════════════════
//  budget_upsert
// ══════════════════════════════════════════════════════════

#[test]
fn upsert_inserts_then_overwrites_in_place() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");

    let first = budget_upsert(&pool, ana, "food", Money::from_cents(40_000)).unwrap();
    let second = budget_upsert(&pool, ana, "food", Money::from_cents(45_050)).unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.limit_amount.to_string(), "450.50");

    let list = budget_list(&pool, ana).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].limit_amount, Money::from_cents(45_050));
}

#[test]
fn upsert_rejects_negative_and_blank() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let err = budget_upsert(&pool, ana, "food", Money::from_cents(-1)).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    let err = budget_upsert(&pool, ana, "  ", Money::ZERO).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn upsert_for_unknown_owner_is_unauthorized() {
    let pool = init_test_db();
    let ghost = OwnerId::require(Some(42)).unwrap();
    let err = budget_upsert(&pool, ghost, "food", Money::ZERO).unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
}

#[test]
fn concurrent_upserts_from_threads_leave_one_row() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let workers = 8;
    let barrier = Barrier::new(workers);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let pool = &pool;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    budget_upsert(pool, ana, "food", Money::from_cents(1_000 + i as i64))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ids: Vec<i64> = results.into_iter().map(|r| r.unwrap().id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "ids diverged: {ids:?}");
    assert_eq!(count_rows(&pool, ana, "food"), 1);

    let stored = budget_list(&pool, ana).unwrap()[0].limit_amount.cents();
    assert!((1_000..1_000 + workers as i64).contains(&stored));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_from_tasks_leave_one_row() {
    let pool = Arc::new(init_test_db());
    let ana = owner(&pool, "Ana", "1234");
    let ben = owner(&pool, "Ben", "5678");

    let mut handles = Vec::new();
    for i in 0..16i64 {
        let pool = Arc::clone(&pool);
        let who = if i % 2 == 0 { ana } else { ben };
        handles.push(tokio::task::spawn_blocking(move || {
            budget_upsert(&pool, who, "rent", Money::from_cents(100_000 + i))
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(count_rows(&pool, ana, "rent"), 1);
    assert_eq!(count_rows(&pool, ben, "rent"), 1);
    assert_eq!(budget_list(&pool, ana).unwrap().len(), 1);
}

// ══════════════════════════════════════════════════════════
//  budget_update / budget_delete
// ══════════════════════════════════════════════════════════

#[test]
fn update_budget_into_taken_category_is_conflict() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    budget_upsert(&pool, ana, "food", Money::ZERO).unwrap();
    let rent = budget_upsert(&pool, ana, "rent", Money::ZERO).unwrap();

    let err = budget_update(
        &pool,
        ana,
        BudgetUpdateReq {
            id: rent.id,
            category: Some("food".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}

#[test]
fn other_owner_cannot_touch_budget() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let ben = owner(&pool, "Ben", "5678");
    let b = budget_upsert(&pool, ana, "food", Money::from_cents(100)).unwrap();

    let err = budget_update(
        &pool,
        ben,
        BudgetUpdateReq {
            id: b.id,
            limit_amount: Some(Money::ZERO),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(budget_delete(&pool, ben, b.id).unwrap_err().code(), "NOT_FOUND");
    assert!(budget_list(&pool, ben).unwrap().is_empty());

    budget_delete(&pool, ana, b.id).unwrap();
    assert!(budget_list(&pool, ana).unwrap().is_empty());
}
