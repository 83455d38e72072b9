//! Card CRUD integration tests

use pocketbook::app::{
    card_create, card_delete, card_list, card_update, owner_register, CardCreateReq,
    CardUpdateReq, OwnerRegisterReq,
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

fn make_req(name: &str) -> CardCreateReq {
    CardCreateReq {
        name: name.to_string(),
        credit_limit: Some(Money::from_cents(500_000)),
        closing_day: Some(25),
        due_day: Some(5),
    }
}

// ══════════════════════════════════════════════════════════
//  card_create
// ══════════════════════════════════════════════════════════

#[test]
fn create_card_returns_correct_fields() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let dto = card_create(&pool, ana, make_req("Visa")).unwrap();
    assert_eq!(dto.name, "Visa");
    assert_eq!(dto.credit_limit.to_string(), "5000.00");
    assert_eq!(dto.closing_day, Some(25));
    assert_eq!(dto.due_day, Some(5));
}

#[test]
fn create_card_defaults() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let dto = card_create(
        &pool,
        ana,
        CardCreateReq {
            name: "Debit".into(),
            credit_limit: None,
            closing_day: None,
            due_day: None,
        },
    )
    .unwrap();
    assert_eq!(dto.credit_limit, Money::ZERO);
    assert_eq!(dto.closing_day, None);
}

#[test]
fn create_card_rejects_bad_day() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    for day in [0, 32, -1] {
        let mut req = make_req("Visa");
        req.due_day = Some(day);
        assert_eq!(card_create(&pool, ana, req).unwrap_err().code(), "VALIDATION_ERROR");
    }
}

// ══════════════════════════════════════════════════════════
//  card_update / card_delete
// ══════════════════════════════════════════════════════════

#[test]
fn update_card_limit() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let c = card_create(&pool, ana, make_req("Visa")).unwrap();
    let updated = card_update(
        &pool,
        ana,
        CardUpdateReq {
            id: c.id,
            credit_limit: Some("7500.5".parse().unwrap()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(updated.credit_limit.to_string(), "7500.50");
    assert_eq!(updated.closing_day, Some(25));
}

#[test]
fn other_owner_cannot_touch_card() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let ben = owner(&pool, "Ben", "5678");
    let c = card_create(&pool, ana, make_req("Visa")).unwrap();
    card_create(&pool, ben, make_req("Amex")).unwrap();

    let ben_cards = card_list(&pool, ben).unwrap();
    assert_eq!(ben_cards.len(), 1);
    assert_eq!(ben_cards[0].name, "Amex");

    let err = card_update(
        &pool,
        ben,
        CardUpdateReq {
            id: c.id,
            name: Some("Mine now".into()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(card_delete(&pool, ben, c.id).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(card_list(&pool, ana).unwrap()[0].name, "Visa");
}

#[test]
fn delete_card_removes_it() {
    let pool = init_test_db();
    let ana = owner(&pool, "Ana", "1234");
    let c = card_create(&pool, ana, make_req("Visa")).unwrap();
    card_delete(&pool, ana, c.id).unwrap();
    assert!(card_list(&pool, ana).unwrap().is_empty());
}
