//! Payment Allocation Engine
//!
//! Waterfall allocation: the client's UNPAID/INCOMPLETE shipments are sorted
//! by delivery date (then creation) and each one absorbs as much of the
//! payment as it still owes until the payment or the debt runs out.
//!
//! The shipment reads, every paid-amount update and the payment insert share
//! one transaction. Each update is additionally conditioned on the paid
//! amount that was read, so a concurrent payment for the same client makes
//! this one fail with a retryable `Conflict` and leaves no partial state.
//!
//! Money left over after all debt is cleared is kept on the payment as
//! `unallocated_amount`; the payment still records the full amount received.

use rust_decimal::Decimal;
use shared::models::{
    DebtSummary, Payment, PaymentAllocation, PaymentMeta, PaymentStatus, Shipment,
};
use sqlx::SqlitePool;

use crate::db::repository::payment::{NewAllocation, NewPayment};
use crate::db::repository::{RepoError, client, payment, shipment};
use crate::error::{ConflictKind, DeliveryError, DeliveryResult};
use crate::money;
use crate::notify::{Notification, NotificationQueue};

/// Funds applied to one shipment
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub shipment_id: i64,
    /// Paid amount as read; the update is conditioned on it
    pub previous_paid: Decimal,
    pub new_paid: Decimal,
    pub applied: Decimal,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    /// In application order (oldest shipment first)
    pub slices: Vec<AllocationSlice>,
    /// Part of the payment not applied to any shipment
    pub remaining: Decimal,
}

impl AllocationPlan {
    pub fn allocated(&self) -> Decimal {
        self.slices.iter().map(|s| s.applied).sum()
    }
}

/// Compute the waterfall over `outstanding`, which must already be sorted
/// oldest first.
///
/// Shipments that owe nothing are passed over. `allocated() + remaining`
/// always equals `amount`.
pub fn plan_allocation(amount: Decimal, outstanding: &[Shipment]) -> AllocationPlan {
    let mut remaining = amount;
    let mut slices = Vec::new();

    for shipment in outstanding {
        if remaining <= Decimal::ZERO {
            break;
        }
        let owed = shipment.outstanding();
        if !shipment.payment_status.is_outstanding() || owed.is_zero() {
            continue;
        }
        let applied = remaining.min(owed);
        let new_paid = shipment.amount_paid + applied;
        slices.push(AllocationSlice {
            shipment_id: shipment.id,
            previous_paid: shipment.amount_paid,
            new_paid,
            applied,
            status: PaymentStatus::from_amounts(shipment.billed_amount, new_paid),
        });
        remaining -= applied;
    }

    AllocationPlan { slices, remaining }
}

#[derive(Debug, Clone)]
pub struct PaymentAllocator {
    pool: SqlitePool,
    notifier: Option<NotificationQueue>,
}

impl PaymentAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationQueue) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Apply `amount` to the client's outstanding shipments and record the
    /// payment.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: amount not positive, finer than cents, or unknown client
    /// - `NoOutstandingDebt`: the client has no UNPAID/INCOMPLETE shipment
    /// - `Conflict` (retryable): a shipment balance moved concurrently
    /// - `Conflict` (payment code): the code is already used
    pub async fn allocate_payment(
        &self,
        client_id: i64,
        amount: Decimal,
        meta: PaymentMeta,
    ) -> DeliveryResult<Payment> {
        let amount_cents = money::validate_amount(amount)?;
        let amount = money::from_cents(amount_cents);

        if !client::exists(&self.pool, client_id).await? {
            return Err(DeliveryError::InvalidArgument(format!(
                "Client {client_id} does not exist"
            )));
        }

        let payment_id = shared::util::snowflake_id();
        let payment_code = match meta.payment_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => format!("PAY-{payment_id}"),
        };
        let now = shared::util::now_millis();

        let mut tx = self.pool.begin().await?;

        if payment::code_exists(&mut *tx, &payment_code).await? {
            return Err(payment_code_taken(&payment_code));
        }

        let outstanding = shipment::find_outstanding_by_client(&mut *tx, client_id).await?;
        if outstanding.is_empty() {
            tracing::info!(client_id, "Payment rejected: no outstanding debt");
            return Err(DeliveryError::NoOutstandingDebt { client_id });
        }

        let plan = plan_allocation(amount, &outstanding);

        let mut allocations = Vec::with_capacity(plan.slices.len());
        for slice in &plan.slices {
            let updated = shipment::update_paid_amount(
                &mut *tx,
                slice.shipment_id,
                money::to_cents(slice.previous_paid)?,
                money::to_cents(slice.new_paid)?,
                slice.status,
                now,
            )
            .await?;
            if !updated {
                // tx is dropped here, rolling back every slice applied so far
                tracing::warn!(
                    client_id,
                    shipment_id = slice.shipment_id,
                    "Shipment balance changed during allocation"
                );
                return Err(DeliveryError::concurrent_update(format!(
                    "Shipment {} changed while applying the payment",
                    slice.shipment_id
                )));
            }
            tracing::debug!(
                shipment_id = slice.shipment_id,
                applied = %slice.applied,
                status = slice.status.as_str(),
                "Payment slice applied"
            );
            allocations.push(NewAllocation {
                shipment_id: slice.shipment_id,
                amount_applied_cents: money::to_cents(slice.applied)?,
            });
        }

        let new_payment = NewPayment {
            id: payment_id,
            client_id,
            payment_code: payment_code.clone(),
            amount_paid_cents: amount_cents,
            unallocated_cents: money::to_cents(plan.remaining)?,
            payment_date: meta.payment_date.unwrap_or(now),
            payment_time: meta.payment_time.clone(),
            registered_by: meta.registered_by,
            created_at: now,
        };
        payment::create(&mut *tx, &new_payment, &allocations)
            .await
            .map_err(|e| match e {
                RepoError::Duplicate(_) => payment_code_taken(&payment_code),
                other => other.into(),
            })?;

        tx.commit().await?;

        if plan.remaining > Decimal::ZERO {
            tracing::warn!(
                client_id,
                payment_id,
                unallocated = %plan.remaining,
                "Payment exceeds outstanding debt, surplus left unallocated"
            );
        }
        tracing::info!(
            client_id,
            payment_id,
            payment_code = %payment_code,
            amount = %amount,
            shipments = plan.slices.len(),
            "Payment allocated"
        );

        if let Some(notifier) = &self.notifier {
            notifier.publish(Notification::PaymentAllocated {
                payment_id,
                client_id,
                amount_paid: amount,
                unallocated: plan.remaining,
                shipments: plan.slices.len(),
            });
        }

        Ok(Payment {
            id: payment_id,
            client_id,
            payment_code,
            amount_paid: amount,
            unallocated_amount: plan.remaining,
            payment_date: new_payment.payment_date,
            payment_time: new_payment.payment_time,
            registered_by: meta.registered_by,
            allocations: plan
                .slices
                .iter()
                .map(|s| PaymentAllocation {
                    shipment_id: s.shipment_id,
                    amount_applied: s.applied,
                })
                .collect(),
            created_at: now,
        })
    }

    /// Payment with its allocation list
    pub async fn find_payment(&self, payment_id: i64) -> DeliveryResult<Payment> {
        payment::find_by_id(&self.pool, payment_id)
            .await?
            .ok_or_else(|| DeliveryError::not_found("payment", payment_id))
    }

    /// Total outstanding debt and pending shipment count of a client
    pub async fn debt_summary(&self, client_id: i64) -> DeliveryResult<DebtSummary> {
        if !client::exists(&self.pool, client_id).await? {
            return Err(DeliveryError::not_found("client", client_id));
        }
        Ok(shipment::debt_summary(&self.pool, client_id).await?)
    }
}

fn payment_code_taken(code: &str) -> DeliveryError {
    DeliveryError::Conflict {
        kind: ConflictKind::PaymentCode,
        message: format!("Payment code {code} is already used"),
    }
}
