use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{CapacityChange, StoreError, StoreResult, TicketStore};
use crate::models::{
    Booking, BookingOverride, Capacity, Event, EventSnapshot, HolderSnapshot, NewBooking, User,
};

const HOLDER_EVENT_CONSTRAINT: &str = "bookings_holder_event_key";
const CREDENTIAL_CONSTRAINTS: [&str; 2] =
    ["issued_credentials_pkey", "bookings_credential_code_key"];
const EVENT_REFERENCE_CONSTRAINT: &str = "bookings_event_id_fkey";

/// PostgreSQL-backed store. Capacity and redemption writes are single
/// conditional `UPDATE` statements.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn event_exists(&self, event_id: Uuid) -> StoreResult<bool> {
        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    credential_code: String,
    created_at: DateTime<Utc>,
    is_approved: bool,
    is_used: bool,
    redeemed_at: Option<DateTime<Utc>>,
    holder_snapshot: Json<HolderSnapshot>,
    event_snapshot: Json<EventSnapshot>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            credential_code: row.credential_code,
            created_at: row.created_at,
            is_approved: row.is_approved,
            is_used: row.is_used,
            redeemed_at: row.redeemed_at,
            holder_snapshot: row.holder_snapshot.0,
            event_snapshot: row.event_snapshot.0,
        }
    }
}

#[derive(FromRow)]
struct CapacityRow {
    total_capacity: i32,
    remaining_capacity: i32,
}

impl From<CapacityRow> for Capacity {
    fn from(row: CapacityRow) -> Self {
        Capacity {
            total: row.total_capacity,
            remaining: row.remaining_capacity,
        }
    }
}

/// Maps constraint violations onto the store's conflict variants.
fn classify_insert_error(err: sqlx::Error, code: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(HOLDER_EVENT_CONSTRAINT) => return StoreError::DuplicateBooking,
                Some(name) if CREDENTIAL_CONSTRAINTS.contains(&name) => {
                    return StoreError::CredentialTaken(code.to_string())
                }
                _ => {}
            }
        }
        if db_err.is_foreign_key_violation()
            && db_err.constraint() == Some(EVENT_REFERENCE_CONSTRAINT)
        {
            return StoreError::MissingEvent;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, student_id, student_class, faculty, email, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events \
             (id, name, event_date, location, description, total_capacity, remaining_capacity, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(event.event_date)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.total_capacity)
        .bind(event.remaining_capacity)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Option<Vec<Booking>>> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, BookingRow>(
            "DELETE FROM bookings WHERE event_id = $1 RETURNING *",
        )
        .bind(event_id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(rows.into_iter().map(Booking::from).collect()))
    }

    async fn reserve_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange> {
        let row = sqlx::query_as::<_, CapacityRow>(
            "UPDATE events \
             SET remaining_capacity = remaining_capacity - 1, updated_at = now() \
             WHERE id = $1 AND remaining_capacity > 0 \
             RETURNING total_capacity, remaining_capacity",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(CapacityChange::Applied(row.into())),
            None if self.event_exists(event_id).await? => Ok(CapacityChange::Exhausted),
            None => Ok(CapacityChange::EventMissing),
        }
    }

    async fn release_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange> {
        let row = sqlx::query_as::<_, CapacityRow>(
            "UPDATE events \
             SET remaining_capacity = remaining_capacity + 1, updated_at = now() \
             WHERE id = $1 AND remaining_capacity < total_capacity \
             RETURNING total_capacity, remaining_capacity",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(CapacityChange::Applied(row.into())),
            None if self.event_exists(event_id).await? => Ok(CapacityChange::AtTotal),
            None => Ok(CapacityChange::EventMissing),
        }
    }

    async fn resize_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<CapacityChange> {
        let row = sqlx::query_as::<_, CapacityRow>(
            "UPDATE events \
             SET remaining_capacity = $2 - (total_capacity - remaining_capacity), \
                 total_capacity = $2, \
                 updated_at = now() \
             WHERE id = $1 AND $2 >= total_capacity - remaining_capacity \
             RETURNING total_capacity, remaining_capacity",
        )
        .bind(event_id)
        .bind(new_total)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(CapacityChange::Applied(row.into()));
        }
        match self.find_event(event_id).await? {
            Some(event) => Ok(CapacityChange::BelowSold {
                sold: event.capacity().sold(),
            }),
            None => Ok(CapacityChange::EventMissing),
        }
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Booking::from))
    }

    async fn find_booking_by_code(&self, code: &str) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE credential_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Booking::from))
    }

    async fn find_booking_for_holder(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Booking::from))
    }

    async fn find_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn find_redeemable(
        &self,
        code: &str,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE credential_code = $1 AND user_id = $2 AND event_id = $3",
        )
        .bind(code)
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Booking::from))
    }

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let code = booking.credential_code.clone();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO issued_credentials (code) VALUES ($1)")
            .bind(&code)
            .execute(&mut *tx)
            .await
            .map_err(|err| classify_insert_error(err, &code))?;

        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings \
             (id, user_id, event_id, credential_code, is_approved, is_used, \
              holder_snapshot, event_snapshot) \
             VALUES ($1, $2, $3, $4, TRUE, FALSE, $5, $6) \
             RETURNING *",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(&code)
        .bind(Json(&booking.holder_snapshot))
        .bind(Json(&booking.event_snapshot))
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| classify_insert_error(err, &code))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn restore_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO bookings \
             (id, user_id, event_id, credential_code, created_at, is_approved, is_used, \
              redeemed_at, holder_snapshot, event_snapshot) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(&booking.credential_code)
        .bind(booking.created_at)
        .bind(booking.is_approved)
        .bind(booking.is_used)
        .bind(booking.redeemed_at)
        .bind(Json(&booking.holder_snapshot))
        .bind(Json(&booking.event_snapshot))
        .execute(&self.pool)
        .await
        .map_err(|err| classify_insert_error(err, &booking.credential_code))?;
        Ok(())
    }

    async fn delete_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("DELETE FROM bookings WHERE id = $1 RETURNING *")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Booking::from))
    }

    async fn mark_used(&self, booking_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET is_used = TRUE, redeemed_at = $2 \
             WHERE id = $1 AND is_used = FALSE",
        )
        .bind(booking_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn apply_override(
        &self,
        booking_id: Uuid,
        change: &BookingOverride,
    ) -> StoreResult<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let row =
            sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut booking = Booking::from(row);
        change.apply_to(&mut booking, Utc::now());

        sqlx::query(
            "UPDATE bookings \
             SET is_used = $2, is_approved = $3, redeemed_at = $4, \
                 holder_snapshot = $5, event_snapshot = $6 \
             WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.is_used)
        .bind(booking.is_approved)
        .bind(booking.redeemed_at)
        .bind(Json(&booking.holder_snapshot))
        .bind(Json(&booking.event_snapshot))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(booking))
    }
}
