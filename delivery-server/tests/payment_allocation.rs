//! Payment allocation against generated shipments

mod common;

use chrono::NaiveDate;
use common::{TestEnv, d, date, seed_client, seed_order, setup};
use delivery_server::db::repository::{payment, shipment};
use delivery_server::notify::Notification;
use delivery_server::{ConflictKind, DeliveryError};
use rust_decimal::Decimal;
use shared::models::{PaymentMeta, PaymentStatus, Shipment, Weekday};

fn meta() -> PaymentMeta {
    PaymentMeta {
        registered_by: 1,
        ..Default::default()
    }
}

/// One order scheduled every day, one shipment per date in `days`
async fn seed_shipments(env: &TestEnv, client_id: i64, amount: &str, days: &[NaiveDate]) -> Vec<Shipment> {
    let order = seed_order(env, client_id, &format!("ORD-{client_id}"), Weekday::ALL.to_vec(), amount).await;
    let generator = env.state.on_demand_generator();
    let mut shipments = Vec::new();
    for day in days {
        let result = generator
            .generate_for_order_on(order.id, *day, "admin")
            .await
            .unwrap();
        shipments.push(result.shipment);
    }
    shipments
}

async fn reload(env: &TestEnv, id: i64) -> Shipment {
    shipment::find_by_id(&env.state.db.pool, id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_allocates_oldest_first() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    // Generated newest first so creation order differs from delivery order
    let days = [date("2025-04-03"), date("2025-04-02"), date("2025-04-01")];
    let s = seed_shipments(&env, client, "100.00", &days).await;
    let (d3, d2, d1) = (&s[0], &s[1], &s[2]);

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("150.00"), meta())
        .await
        .unwrap();

    let d1 = reload(&env, d1.id).await;
    let d2 = reload(&env, d2.id).await;
    let d3 = reload(&env, d3.id).await;
    assert_eq!((d1.amount_paid, d1.payment_status), (d("100.00"), PaymentStatus::Completed));
    assert_eq!((d2.amount_paid, d2.payment_status), (d("50.00"), PaymentStatus::Incomplete));
    assert_eq!((d3.amount_paid, d3.payment_status), (d("0"), PaymentStatus::Unpaid));

    assert_eq!(payment.amount_paid, d("150.00"));
    assert_eq!(payment.unallocated_amount, Decimal::ZERO);
    assert_eq!(payment.allocations.len(), 2);
    assert_eq!(payment.allocations[0].shipment_id, d1.id);
    assert_eq!(payment.allocations[0].amount_applied, d("100.00"));
    assert_eq!(payment.allocations[1].shipment_id, d2.id);
    assert_eq!(payment.allocations[1].amount_applied, d("50.00"));

    // A second payment continues where the first stopped
    let second = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("60.00"), meta())
        .await
        .unwrap();
    assert_eq!(second.allocations[0].shipment_id, d2.id);
    assert_eq!(second.allocations[0].amount_applied, d("50.00"));
    assert_eq!(second.allocations[1].shipment_id, d3.id);
    assert_eq!(second.allocations[1].amount_applied, d("10.00"));
    assert_eq!(reload(&env, d3.id).await.payment_status, PaymentStatus::Incomplete);
}

#[tokio::test]
async fn test_exact_settlement_completes_everything() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let days = [date("2025-04-07"), date("2025-04-08")];
    let s = seed_shipments(&env, client, "12.34", &days).await;

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("24.68"), meta())
        .await
        .unwrap();
    assert_eq!(payment.unallocated_amount, Decimal::ZERO);

    for original in &s {
        let current = reload(&env, original.id).await;
        assert_eq!(current.amount_paid, current.billed_amount);
        assert_eq!(current.payment_status, PaymentStatus::Completed);
    }

    let summary = env.state.payment_allocator().debt_summary(client).await.unwrap();
    assert_eq!(summary.total_debt, Decimal::ZERO);
    assert_eq!(summary.pending_count, 0);

    // Nothing left to pay
    let err = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("1.00"), meta())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::NoOutstandingDebt { client_id } if client_id == client));
}

#[tokio::test]
async fn test_exact_payment_settles_only_the_oldest() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let days = [date("2025-04-22"), date("2025-04-23")];
    let s = seed_shipments(&env, client, "15.00", &days).await;
    let (older, newer) = (&s[0], &s[1]);

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("15.00"), meta())
        .await
        .unwrap();
    assert_eq!(payment.unallocated_amount, Decimal::ZERO);
    assert_eq!(payment.allocations.len(), 1);
    assert_eq!(payment.allocations[0].shipment_id, older.id);
    assert_eq!(payment.allocations[0].amount_applied, d("15.00"));

    let older = reload(&env, older.id).await;
    assert_eq!((older.amount_paid, older.payment_status), (d("15.00"), PaymentStatus::Completed));
    let newer = reload(&env, newer.id).await;
    assert_eq!((newer.amount_paid, newer.payment_status), (Decimal::ZERO, PaymentStatus::Unpaid));

    let summary = env.state.payment_allocator().debt_summary(client).await.unwrap();
    assert_eq!(summary.total_debt, d("15.00"));
    assert_eq!(summary.pending_count, 1);
}

#[tokio::test]
async fn test_no_outstanding_debt_leaves_no_trace() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;

    let err = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("20.00"), meta())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::NoOutstandingDebt { .. }));
    assert_eq!(payment::count_by_client(&env.state.db.pool, client).await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_amounts_and_clients() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    seed_shipments(&env, client, "10.00", &[date("2025-04-09")]).await;
    let allocator = env.state.payment_allocator();

    for amount in ["0", "-5.00", "1.001"] {
        let err = allocator
            .allocate_payment(client, d(amount), meta())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidArgument(_)), "amount {amount}: {err:?}");
    }

    let err = allocator
        .allocate_payment(424_242, d("5.00"), meta())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::InvalidArgument(_)));

    let err = allocator.debt_summary(424_242).await.unwrap_err();
    assert!(matches!(err, DeliveryError::NotFound { resource: "client", .. }));

    assert_eq!(payment::count_by_client(&env.state.db.pool, client).await.unwrap(), 0);
}

#[tokio::test]
async fn test_surplus_is_kept_unallocated() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let s = seed_shipments(&env, client, "30.00", &[date("2025-04-10")]).await;

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("50.00"), meta())
        .await
        .unwrap();
    assert_eq!(payment.amount_paid, d("50.00"));
    assert_eq!(payment.unallocated_amount, d("20.00"));
    assert_eq!(payment.allocated_amount(), d("30.00"));

    let settled = reload(&env, s[0].id).await;
    assert_eq!(settled.amount_paid, d("30.00"));
    assert_eq!(settled.payment_status, PaymentStatus::Completed);

    let stored = env
        .state
        .payment_allocator()
        .find_payment(payment.id)
        .await
        .unwrap();
    assert_eq!(stored.unallocated_amount, d("20.00"));
    assert_eq!(stored.allocations, payment.allocations);
}

#[tokio::test]
async fn test_cancelled_shipments_are_not_billed() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let s = seed_shipments(&env, client, "10.00", &[date("2025-04-14"), date("2025-04-15")]).await;

    sqlx::query("UPDATE shipment SET status = 'CANCELLED' WHERE id = ?1")
        .bind(s[0].id)
        .execute(&env.state.db.pool)
        .await
        .unwrap();

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("10.00"), meta())
        .await
        .unwrap();
    assert_eq!(payment.allocations.len(), 1);
    assert_eq!(payment.allocations[0].shipment_id, s[1].id);
    assert_eq!(reload(&env, s[0].id).await.amount_paid, Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_payment_code_changes_nothing() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let s = seed_shipments(&env, client, "40.00", &[date("2025-04-16")]).await;
    let allocator = env.state.payment_allocator();

    let with_code = |code: &str| PaymentMeta {
        payment_code: Some(code.to_string()),
        payment_time: Some("10:30".to_string()),
        ..meta()
    };

    let first = allocator
        .allocate_payment(client, d("10.00"), with_code("REC-001"))
        .await
        .unwrap();
    assert_eq!(first.payment_code, "REC-001");
    assert_eq!(first.payment_time.as_deref(), Some("10:30"));

    let err = allocator
        .allocate_payment(client, d("10.00"), with_code(" REC-001 "))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Conflict { kind: ConflictKind::PaymentCode, .. }));
    assert!(!err.is_retryable());

    assert_eq!(reload(&env, s[0].id).await.amount_paid, d("10.00"));
    assert_eq!(payment::count_by_client(&env.state.db.pool, client).await.unwrap(), 1);
}

#[tokio::test]
async fn test_generated_payment_code() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    seed_shipments(&env, client, "5.00", &[date("2025-04-17")]).await;

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("5.00"), meta())
        .await
        .unwrap();
    assert_eq!(payment.payment_code, format!("PAY-{}", payment.id));
}

#[tokio::test]
async fn test_find_payment_not_found() {
    let env = setup().await;
    let err = env
        .state
        .payment_allocator()
        .find_payment(1)
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::NotFound { resource: "payment", id: 1 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_conserve_funds() {
    let env = setup().await;
    let client = seed_client(&env, "Ana").await;
    let days: Vec<_> = (1..=6)
        .map(|i| date(&format!("2025-05-{i:02}")))
        .collect();
    let shipments = seed_shipments(&env, client, "25.00", &days).await;
    let billed_total: Decimal = shipments.iter().map(|s| s.billed_amount).sum();

    let amounts = ["10.00", "35.50", "20.00", "7.25", "40.00", "15.00"];
    let mut handles = Vec::new();
    for amount in amounts {
        let allocator = env.state.payment_allocator();
        handles.push(tokio::spawn(async move {
            // Conflicts are retryable from a fresh read
            for _ in 0..50 {
                match allocator.allocate_payment(client, d(amount), meta()).await {
                    Ok(payment) => return payment,
                    Err(e) if e.is_retryable() => {
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    }
                    Err(e) => panic!("allocation failed: {e:?}"),
                }
            }
            panic!("allocation kept conflicting");
        }));
    }

    let mut payments = Vec::new();
    for handle in handles {
        payments.push(handle.await.unwrap());
    }

    let paid_total: Decimal = amounts.iter().map(|a| d(a)).sum();
    let allocated_total: Decimal = payments.iter().map(|p| p.allocated_amount()).sum();
    let unallocated_total: Decimal = payments.iter().map(|p| p.unallocated_amount).sum();
    assert_eq!(allocated_total + unallocated_total, paid_total);

    let current = shipment::find_by_client(&env.state.db.pool, client)
        .await
        .unwrap();
    let shipment_paid: Decimal = current.iter().map(|s| s.amount_paid).sum();
    assert_eq!(shipment_paid, allocated_total);

    for s in &current {
        assert!(s.amount_paid >= Decimal::ZERO && s.amount_paid <= s.billed_amount);
        assert_eq!(s.payment_status, PaymentStatus::from_amounts(s.billed_amount, s.amount_paid));
    }

    // 127.75 paid against 150.00 billed: oldest-first means at most one
    // shipment is partially paid, and it sits between settled and untouched ones
    assert!(paid_total < billed_total);
    let statuses: Vec<_> = {
        let mut sorted = current.clone();
        sorted.sort_by_key(|s| s.delivery_date);
        sorted.into_iter().map(|s| s.payment_status).collect()
    };
    assert_eq!(
        statuses,
        vec![
            PaymentStatus::Completed,
            PaymentStatus::Completed,
            PaymentStatus::Completed,
            PaymentStatus::Completed,
            PaymentStatus::Completed,
            PaymentStatus::Incomplete,
        ]
    );
    assert_eq!(
        payment::count_by_client(&env.state.db.pool, client).await.unwrap(),
        amounts.len() as i64
    );
}

#[tokio::test]
async fn test_allocation_publishes_notification() {
    let mut env = setup().await;
    let client = seed_client(&env, "Ana").await;
    seed_shipments(&env, client, "8.00", &[date("2025-04-21")]).await;
    // Drain the on-demand notification
    while env.rx.try_recv().is_ok() {}

    let payment = env
        .state
        .payment_allocator()
        .allocate_payment(client, d("8.00"), meta())
        .await
        .unwrap();

    assert_eq!(
        env.rx.try_recv().unwrap(),
        Notification::PaymentAllocated {
            payment_id: payment.id,
            client_id: client,
            amount_paid: d("8.00"),
            unallocated: Decimal::ZERO,
            shipments: 1,
        }
    );
}
