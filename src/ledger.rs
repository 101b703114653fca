//! Seat reservation ledger.
//!
//! Every transition of a trip seat between `disponible`, `reservado` and
//! `ocupado` goes through this module, inside a transaction whose state check
//! and state write are a single conditional UPDATE. Concurrent attempts on the
//! same seat therefore serialize on the row: the losing request sees zero
//! affected rows and fails fast instead of double-booking.
//!
//! Transitions: disponible --reserve--> reservado --confirm_payment--> ocupado,
//! and reservado --expire/cancel--> disponible. `ocupado` is terminal here;
//! refunds after payment are a separate flow.

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::trip_seat::SeatState;
use crate::entities::{booking, payment, payment_method, route, trip, trip_seat, user_company};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct ReservationPolicy {
    /// How long an unpaid hold keeps a seat in `reservado`.
    pub hold_minutes: i64,
    /// Interval of the background sweep releasing lapsed holds.
    pub sweep_interval_secs: u64,
}

impl ReservationPolicy {
    pub fn hold_deadline(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + Duration::minutes(self.hold_minutes)
    }
}

/// Claim a seat for a user. The seat must be `disponible` at the moment of the
/// check-and-set; the hold expires after `policy.hold_minutes` unless paid.
pub async fn reserve(
    db: &DatabaseConnection,
    policy: &ReservationPolicy,
    trip_seat_id: Uuid,
    user_id: Uuid,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    // A lapsed hold left behind by a missed sweep must not block the seat.
    if let Some(held) = booking::Entity::find()
        .filter(booking::Column::TripSeatId.eq(trip_seat_id))
        .one(&txn)
        .await?
    {
        if !held.paid && held.expires_at <= Utc::now() {
            release_hold(&txn, &held).await?;
        }
    }

    let claimed = trip_seat::Entity::update_many()
        .col_expr(trip_seat::Column::State, Expr::value(SeatState::Reservado))
        .col_expr(trip_seat::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(trip_seat::Column::Id.eq(trip_seat_id))
        .filter(trip_seat::Column::State.eq(SeatState::Disponible))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        txn.rollback().await?;
        return match trip_seat::Entity::find_by_id(trip_seat_id).one(db).await? {
            None => Err(AppError::NotFound("Trip seat not found".to_string())),
            Some(_) => Err(AppError::Conflict("Seat is not available".to_string())),
        };
    }

    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        trip_seat_id: Set(trip_seat_id),
        user_id: Set(user_id),
        paid: Set(false),
        expires_at: Set(policy.hold_deadline(Utc::now()).into()),
        ..Default::default()
    };
    let created = new_booking.insert(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %created.id,
        trip_seat_id = %trip_seat_id,
        "Seat reserved"
    );
    Ok(created)
}

/// Settle a booking. Replaying a settled booking returns the stored payment
/// instead of creating a duplicate.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    booking_id: Uuid,
    method_id: Option<Uuid>,
    amount: f64,
) -> AppResult<payment::Model> {
    let txn = db.begin().await?;

    let held = booking::Entity::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if held.paid {
        let existing = payment::Entity::find()
            .filter(payment::Column::BookingId.eq(held.id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Paid booking {} has no payment record", held.id))
            })?;
        txn.commit().await?;
        return Ok(existing);
    }

    if let Some(method_id) = method_id {
        payment_method::Entity::find_by_id(method_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment method not found".to_string()))?;
    }

    let settled = trip_seat::Entity::update_many()
        .col_expr(trip_seat::Column::State, Expr::value(SeatState::Ocupado))
        .col_expr(trip_seat::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(trip_seat::Column::Id.eq(held.trip_seat_id))
        .filter(trip_seat::Column::State.eq(SeatState::Reservado))
        .exec(&txn)
        .await?;

    if settled.rows_affected == 0 {
        txn.rollback().await?;
        return Err(AppError::InvalidState(
            "Seat is not held by this booking".to_string(),
        ));
    }

    let created = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        method_id: Set(method_id),
        booking_id: Set(held.id),
        amount: Set(amount),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: booking::ActiveModel = held.into();
    active.paid = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        payment_id = %created.id,
        booking_id = %booking_id,
        "Booking settled"
    );
    Ok(created)
}

/// Release the seat if its hold lapsed without payment. No-op when the seat has
/// no booking, the booking is paid, or the deadline has not passed. Returns
/// whether a hold was released.
pub async fn expire_reservation(db: &DatabaseConnection, trip_seat_id: Uuid) -> AppResult<bool> {
    let txn = db.begin().await?;

    let Some(held) = booking::Entity::find()
        .filter(booking::Column::TripSeatId.eq(trip_seat_id))
        .one(&txn)
        .await?
    else {
        txn.commit().await?;
        return Ok(false);
    };

    if held.paid || held.expires_at > Utc::now() {
        txn.commit().await?;
        return Ok(false);
    }

    release_hold(&txn, &held).await?;
    txn.commit().await?;

    tracing::info!(trip_seat_id = %trip_seat_id, "Reservation hold expired");
    Ok(true)
}

/// Cancel an unpaid booking. Only the booking owner or an operator of the
/// company running the trip may cancel.
pub async fn cancel(db: &DatabaseConnection, booking_id: Uuid, actor_id: Uuid) -> AppResult<()> {
    let txn = db.begin().await?;

    let held = booking::Entity::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if held.paid {
        txn.rollback().await?;
        return Err(AppError::InvalidState(
            "Paid bookings cannot be cancelled here; refunds are a separate flow".to_string(),
        ));
    }

    if held.user_id != actor_id && !is_company_operator(&txn, actor_id, held.trip_seat_id).await? {
        txn.rollback().await?;
        return Err(AppError::Forbidden(
            "Only the booking owner or a company operator can cancel".to_string(),
        ));
    }

    release_hold(&txn, &held).await?;
    txn.commit().await?;

    tracing::info!(booking_id = %booking_id, "Booking cancelled");
    Ok(())
}

/// Release every lapsed unpaid hold. Each candidate is re-checked inside its
/// own transaction, so racing payments are never swept away.
pub async fn sweep_expired(db: &DatabaseConnection) -> AppResult<u64> {
    let lapsed = booking::Entity::find()
        .filter(booking::Column::Paid.eq(false))
        .filter(booking::Column::ExpiresAt.lte(Utc::now()))
        .all(db)
        .await?;

    let mut released = 0u64;
    for held in lapsed {
        if expire_reservation(db, held.trip_seat_id).await? {
            released += 1;
        }
    }
    Ok(released)
}

/// Background task driving the sweep on a fixed interval.
pub async fn run_sweeper(db: DatabaseConnection, policy: ReservationPolicy) {
    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(policy.sweep_interval_secs));
    loop {
        ticker.tick().await;
        match sweep_expired(&db).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(released = count, "Released expired reservation holds"),
            Err(e) => tracing::error!("Reservation sweep failed: {}", e),
        }
    }
}

/// Delete a hold and put its seat back on sale. The seat update is conditional
/// on `reservado` so an already-settled seat is never reopened.
async fn release_hold<C: ConnectionTrait>(conn: &C, held: &booking::Model) -> AppResult<()> {
    trip_seat::Entity::update_many()
        .col_expr(trip_seat::Column::State, Expr::value(SeatState::Disponible))
        .col_expr(trip_seat::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(trip_seat::Column::Id.eq(held.trip_seat_id))
        .filter(trip_seat::Column::State.eq(SeatState::Reservado))
        .exec(conn)
        .await?;

    booking::Entity::delete_by_id(held.id).exec(conn).await?;
    Ok(())
}

async fn is_company_operator<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    trip_seat_id: Uuid,
) -> AppResult<bool> {
    let Some(seat) = trip_seat::Entity::find_by_id(trip_seat_id).one(conn).await? else {
        return Ok(false);
    };
    let Some(sailing) = trip::Entity::find_by_id(seat.trip_id).one(conn).await? else {
        return Ok(false);
    };
    let Some(leg) = route::Entity::find_by_id(sailing.route_id).one(conn).await? else {
        return Ok(false);
    };

    Ok(user_company::Entity::find()
        .filter(user_company::Column::UserId.eq(user_id))
        .filter(user_company::Column::CompanyId.eq(leg.company_id))
        .one(conn)
        .await?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn policy() -> ReservationPolicy {
        ReservationPolicy {
            hold_minutes: 15,
            sweep_interval_secs: 60,
        }
    }

    fn now_tz() -> sea_orm::entity::prelude::DateTimeWithTimeZone {
        Utc::now().into()
    }

    fn seat_model(id: Uuid, state: SeatState) -> trip_seat::Model {
        trip_seat::Model {
            id,
            trip_id: Uuid::new_v4(),
            seat_id: Uuid::new_v4(),
            state,
            created_at: now_tz(),
            updated_at: now_tz(),
        }
    }

    fn booking_model(trip_seat_id: Uuid, user_id: Uuid, paid: bool) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            trip_seat_id,
            user_id,
            paid,
            expires_at: (Utc::now() + Duration::minutes(15)).into(),
            created_at: now_tz(),
            updated_at: now_tz(),
        }
    }

    #[test]
    fn test_hold_deadline() {
        let at = Utc::now();
        assert_eq!(policy().hold_deadline(at) - at, Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_reserve_succeeds_on_available_seat() {
        let seat_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let created = booking_model(seat_id, user_id, false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // no pre-existing hold on the seat
            .append_query_results([Vec::<booking::Model>::new()])
            // check-and-set claims the row
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // INSERT .. RETURNING the new booking
            .append_query_results([vec![created.clone()]])
            .into_connection();

        let result = reserve(&db, &policy(), seat_id, user_id).await.unwrap();
        assert_eq!(result.id, created.id);
        assert!(!result.paid);
    }

    #[tokio::test]
    async fn test_reserve_conflicts_when_seat_taken() {
        let seat_id = Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<booking::Model>::new()])
            // another request already flipped the seat: zero rows affected
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            // seat still exists, so this is a conflict rather than a 404
            .append_query_results([vec![seat_model(seat_id, SeatState::Reservado)]])
            .into_connection();

        let err = reserve(&db, &policy(), seat_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reserve_not_found_for_unknown_seat() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<booking::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<trip_seat::Model>::new()])
            .into_connection();

        let err = reserve(&db, &policy(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let seat_id = Uuid::new_v4();
        let settled = booking_model(seat_id, Uuid::new_v4(), true);
        let stored = payment::Model {
            id: Uuid::new_v4(),
            method_id: None,
            booking_id: settled.id,
            amount: 100.0,
            created_at: now_tz(),
            updated_at: now_tz(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![settled.clone()]])
            .append_query_results([vec![stored.clone()]])
            .into_connection();

        // No exec results queued: a replay must not write anything.
        let result = confirm_payment(&db, settled.id, None, 100.0).await.unwrap();
        assert_eq!(result.id, stored.id);
        assert_eq!(result.amount, 100.0);
    }

    #[tokio::test]
    async fn test_confirm_payment_rejects_unheld_seat() {
        let unpaid = booking_model(Uuid::new_v4(), Uuid::new_v4(), false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![unpaid.clone()]])
            // seat is no longer reservado: zero rows affected
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = confirm_payment(&db, unpaid.id, None, 50.0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_confirm_payment_missing_booking() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<booking::Model>::new()])
            .into_connection();

        let err = confirm_payment(&db, Uuid::new_v4(), None, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expire_noop_when_paid() {
        let seat_id = Uuid::new_v4();
        let settled = booking_model(seat_id, Uuid::new_v4(), true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![settled]])
            .into_connection();

        assert!(!expire_reservation(&db, seat_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_releases_lapsed_hold() {
        let seat_id = Uuid::new_v4();
        let mut lapsed = booking_model(seat_id, Uuid::new_v4(), false);
        lapsed.expires_at = (Utc::now() - Duration::minutes(1)).into();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![lapsed]])
            .append_exec_results([
                // seat reset to disponible
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                // hold deleted
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        assert!(expire_reservation(&db, seat_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_noop_before_deadline() {
        let seat_id = Uuid::new_v4();
        let active = booking_model(seat_id, Uuid::new_v4(), false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active]])
            .into_connection();

        assert!(!expire_reservation(&db, seat_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_forbidden_for_unrelated_user() {
        let seat_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let held = booking_model(seat_id, owner, false);
        let seat = seat_model(seat_id, SeatState::Reservado);
        let sailing = trip::Model {
            id: seat.trip_id,
            route_id: Uuid::new_v4(),
            seat_id: Uuid::new_v4(),
            base_price: 100.0,
            date_departure: now_tz(),
            created_at: now_tz(),
            updated_at: now_tz(),
        };
        let leg = route::Model {
            id: sailing.route_id,
            company_id: Uuid::new_v4(),
            origin: "Palma".to_string(),
            destiny: "Ibiza".to_string(),
            created_at: now_tz(),
            updated_at: now_tz(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![held.clone()]])
            .append_query_results([vec![seat]])
            .append_query_results([vec![sailing]])
            .append_query_results([vec![leg]])
            // stranger holds no membership in the operating company
            .append_query_results([Vec::<user_company::Model>::new()])
            .into_connection();

        let err = cancel(&db, held.id, stranger).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_cancel_rejects_paid_booking() {
        let held = booking_model(Uuid::new_v4(), Uuid::new_v4(), true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![held.clone()]])
            .into_connection();

        let err = cancel(&db, held.id, held.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_cancel_by_owner_releases_seat() {
        let seat_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let held = booking_model(seat_id, owner, false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![held.clone()]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        cancel(&db, held.id, owner).await.unwrap();
    }
}
