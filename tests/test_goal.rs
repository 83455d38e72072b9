//! Goal CRUD integration tests

use pocketbook::app::{
    goal_create, goal_delete, goal_list, goal_update, owner_register, GoalCreateReq,
    GoalUpdateReq, OwnerRegisterReq,
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

fn make_req(name: &str) -> GoalCreateReq {
    GoalCreateReq {
        name: name.to_string(),
        target_amount: Some("1500.00".parse().unwrap()),
        saved_amount: None,
        deadline: Some("2025-06-30".to_string()),
    }
}

// ══════════════════════════════════════════════════════════
//  goal_create / goal_list
// ══════════════════════════════════════════════════════════

#[test]
fn create_goal_returns_correct_fields() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let dto = goal_create(&pool, ana, make_req("Holiday")).unwrap();
    assert_eq!(dto.name, "Holiday");
    assert_eq!(dto.owner_id, ana.get());
    assert_eq!(dto.target_amount.to_string(), "1500.00");
    assert_eq!(dto.saved_amount, Money::ZERO);
    assert_eq!(dto.deadline.as_deref(), Some("2025-06-30"));
}

#[test]
fn create_goal_blank_deadline_is_none() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let mut req = make_req("Car");
    req.deadline = Some("   ".into());
    assert_eq!(goal_create(&pool, ana, req).unwrap().deadline, None);

    let mut req = make_req("Car");
    req.deadline = Some("someday".into());
    assert_eq!(goal_create(&pool, ana, req).unwrap_err().code(), "VALIDATION_ERROR");
}

#[test]
fn list_goals_in_creation_order() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    for name in ["A", "B", "C"] {
        goal_create(&pool, ana, make_req(name)).unwrap();
    }
    let names: Vec<String> = goal_list(&pool, ana).unwrap().into_iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

// ══════════════════════════════════════════════════════════
//  goal_update / goal_delete
// ══════════════════════════════════════════════════════════

#[test]
fn update_goal_saved_amount() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let g = goal_create(&pool, ana, make_req("Holiday")).unwrap();
    let updated = goal_update(
        &pool,
        ana,
        GoalUpdateReq {
            id: g.id,
            saved_amount: Some(Money::from_cents(12_345)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(updated.saved_amount.to_string(), "123.45");
    assert_eq!(updated.target_amount, g.target_amount);
    assert_eq!(updated.name, "Holiday");
}

#[test]
fn update_goal_blank_name_fails() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let g = goal_create(&pool, ana, make_req("Holiday")).unwrap();
    let err = goal_update(
        &pool,
        ana,
        GoalUpdateReq {
            id: g.id,
            name: Some(" ".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn other_owner_cannot_touch_goal() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let ben = owner(&pool, "Ben", "5678");
    let g = goal_create(&pool, ana, make_req("Holiday")).unwrap();

    assert!(goal_list(&pool, ben).unwrap().is_empty());
    let err = goal_update(
        &pool,
        ben,
        GoalUpdateReq {
            id: g.id,
            saved_amount: Some(Money::ZERO),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(goal_delete(&pool, ben, g.id).unwrap_err().code(), "NOT_FOUND");

    goal_delete(&pool, ana, g.id).unwrap();
    assert!(goal_list(&pool, ana).unwrap().is_empty());
}
