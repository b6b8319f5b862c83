//! `PostgreSQL` payment store for panelpay.
//!
//! Implements [`PaymentStore`] with sqlx. Transitions run in one transaction:
//! the payment row is locked, the target must be a permitted transition from
//! the status read under that lock, the status write is guarded on the row
//! still being `PENDING` or `FAILED`, and tickets and the panel mirror are written
//! before commit. Dropping the transaction on any error rolls everything back.
//!
//! # Example
//!
//! ```ignore
//! use panelpay_postgres::PostgresPaymentStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresPaymentStore::new("postgres://localhost/panelpay").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use panelpay_core::BoxFuture;
use panelpay_core::model::{
    Attendee, NewPanel, NewPayment, Panel, PaymentPurpose, PaymentRecord, Ticket, TicketPage,
    TicketQuery,
};
use panelpay_core::status::PaymentStatus;
use panelpay_core::store::{ApplyOutcome, PaymentStore, StoreError, TransitionRequest};
use panelpay_core::types::{Money, PanelId, PaymentId, TicketId};
use panelpay_core::{PaymentReference, Provider};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

const PANEL_COLUMNS: &str = "id, name, subdomain, custom_domain, owner_name, owner_email, \
     owner_phone, payment_status, setup_paid, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, reference, provider, status, amount_kobo, purpose, metadata, \
     created_at, updated_at, completed_at";

const TICKET_COLUMNS: &str = "id, payment_id, code, ticket_type, price_kobo, attendee_name, \
     attendee_email, attendee_phone, attendee_company, attendee_job_title, created_at";

const TICKET_SEARCH: &str = "($1::text IS NULL \
     OR attendee_name ILIKE $1 OR attendee_email ILIKE $1 OR attendee_phone ILIKE $1 \
     OR attendee_company ILIKE $1 OR attendee_job_title ILIKE $1 \
     OR code ILIKE $1 OR ticket_type ILIKE $1)";

/// `PostgreSQL`-backed [`PaymentStore`].
#[derive(Debug, Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn transition(&self, request: TransitionRequest) -> Result<ApplyOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let payment_id = *request.payment_id.as_uuid();

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

        let Some((current,)) = current else {
            return Err(StoreError::Missing {
                entity: "payment",
                id: request.payment_id.to_string(),
            });
        };
        let from = parse_status(&current)?;

        if !from.can_transition_to(request.to) {
            tracing::debug!(
                payment_id = %request.payment_id,
                current = %from,
                to = %request.to,
                "Transition superseded"
            );
            return Ok(ApplyOutcome::Superseded { current: from });
        }

        let updated = sqlx::query(
            r"
            UPDATE payments
            SET status = $2,
                metadata = $3,
                updated_at = $4,
                completed_at = CASE WHEN $2 = 'COMPLETED' THEN $4 ELSE completed_at END
            WHERE id = $1 AND status IN ('PENDING', 'FAILED')
            ",
        )
        .bind(payment_id)
        .bind(request.to.as_str())
        .bind(&request.metadata)
        .bind(request.at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if updated.rows_affected() == 0 {
            tracing::debug!(
                payment_id = %request.payment_id,
                current = %from,
                "Transition superseded"
            );
            return Ok(ApplyOutcome::Superseded { current: from });
        }

        let tickets = insert_tickets(&mut tx, request.payment_id, &request).await?;

        if let Some(update) = request.panel {
            let result = sqlx::query(
                r"
                UPDATE panels
                SET payment_status = $2, setup_paid = setup_paid OR $3, updated_at = $4
                WHERE id = $1
                ",
            )
            .bind(update.panel_id.as_uuid())
            .bind(update.payment_status.as_str())
            .bind(update.setup_paid)
            .bind(request.at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::Missing {
                    entity: "panel",
                    id: update.panel_id.to_string(),
                });
            }
        }

        tx.commit().await.map_err(db_error)?;

        tracing::debug!(
            payment_id = %request.payment_id,
            from = %from,
            to = %request.to,
            tickets = tickets.len(),
            "Transition committed"
        );

        Ok(ApplyOutcome::Applied { from, tickets })
    }
}

async fn insert_tickets(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: PaymentId,
    request: &TransitionRequest,
) -> Result<Vec<Ticket>, StoreError> {
    let mut issued = Vec::with_capacity(request.tickets.len());
    for ticket in &request.tickets {
        let id = TicketId::new();
        sqlx::query(
            r"
            INSERT INTO tickets (
                id, payment_id, code, ticket_type, price_kobo, attendee_name,
                attendee_email, attendee_phone, attendee_company, attendee_job_title, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(id.as_uuid())
        .bind(payment_id.as_uuid())
        .bind(&ticket.code)
        .bind(&ticket.ticket_type)
        .bind(ticket.price.kobo())
        .bind(&ticket.attendee.name)
        .bind(&ticket.attendee.email)
        .bind(&ticket.attendee.phone)
        .bind(&ticket.attendee.company)
        .bind(&ticket.attendee.job_title)
        .bind(request.at)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;

        issued.push(Ticket {
            id,
            payment_id,
            code: ticket.code.clone(),
            ticket_type: ticket.ticket_type.clone(),
            price: ticket.price,
            attendee: ticket.attendee.clone(),
            created_at: request.at,
        });
    }
    Ok(issued)
}

impl PaymentStore for PostgresPaymentStore {
    fn create_panel(
        &self,
        panel: NewPanel,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Panel, StoreError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO panels (id, name, subdomain, custom_domain, owner_name, owner_email, \
                 owner_phone, payment_status, setup_paid, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', FALSE, $8, $8) \
                 RETURNING {PANEL_COLUMNS}"
            );
            let row = sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(&panel.name)
                .bind(&panel.subdomain)
                .bind(&panel.custom_domain)
                .bind(&panel.owner_name)
                .bind(&panel.owner_email)
                .bind(&panel.owner_phone)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| conflict_or_db(e, "subdomain", &panel.subdomain))?;
            row_to_panel(&row)
        })
    }

    fn get_panel(&self, id: PanelId) -> BoxFuture<'_, Result<Option<Panel>, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {PANEL_COLUMNS} FROM panels WHERE id = $1");
            sqlx::query(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .as_ref()
                .map(row_to_panel)
                .transpose()
        })
    }

    fn find_panel_by_subdomain<'a>(
        &'a self,
        subdomain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {PANEL_COLUMNS} FROM panels WHERE subdomain = $1");
            sqlx::query(&sql)
                .bind(subdomain)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .as_ref()
                .map(row_to_panel)
                .transpose()
        })
    }

    fn find_panel_by_custom_domain<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {PANEL_COLUMNS} FROM panels WHERE custom_domain = $1 \
                 ORDER BY (payment_status = 'COMPLETED') DESC, created_at DESC LIMIT 1"
            );
            sqlx::query(&sql)
                .bind(domain)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .as_ref()
                .map(row_to_panel)
                .transpose()
        })
    }

    fn create_payment(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<PaymentRecord, StoreError>> {
        Box::pin(async move {
            let purpose = serde_json::to_value(&payment.purpose)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let panel_id = payment.purpose.panel_id();

            let mut tx = self.pool.begin().await.map_err(db_error)?;

            if let Some(panel_id) = panel_id {
                let result = sqlx::query(
                    "UPDATE panels SET payment_status = 'PENDING', updated_at = $2 WHERE id = $1",
                )
                .bind(panel_id.as_uuid())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Missing {
                        entity: "panel",
                        id: panel_id.to_string(),
                    });
                }
            }

            let sql = format!(
                "INSERT INTO payments (id, reference, provider, kind, status, amount_kobo, \
                 panel_id, purpose, metadata, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, 'PENDING', $5, $6, $7, $8, $9, $9) \
                 RETURNING {PAYMENT_COLUMNS}"
            );
            let row = sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(payment.reference.as_str())
                .bind(payment.provider.as_str())
                .bind(payment.purpose.kind().as_str())
                .bind(payment.amount.kobo())
                .bind(panel_id.map(|id| *id.as_uuid()))
                .bind(&purpose)
                .bind(&payment.metadata)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| conflict_or_db(e, "reference", payment.reference.as_str()))?;

            let record = row_to_payment(&row)?;
            tx.commit().await.map_err(db_error)?;
            Ok(record)
        })
    }

    fn find_payment<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<PaymentRecord>, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = $1");
            sqlx::query(&sql)
                .bind(reference)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .as_ref()
                .map(row_to_payment)
                .transpose()
        })
    }

    fn payments_for_panel(
        &self,
        panel_id: PanelId,
    ) -> BoxFuture<'_, Result<Vec<PaymentRecord>, StoreError>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE panel_id = $1 ORDER BY created_at DESC"
            );
            let rows = sqlx::query(&sql)
                .bind(panel_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
            rows.iter().map(row_to_payment).collect()
        })
    }

    fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> BoxFuture<'_, Result<ApplyOutcome, StoreError>> {
        Box::pin(self.transition(request))
    }

    fn tickets_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE payment_id = $1 ORDER BY code");
            let rows = sqlx::query(&sql)
                .bind(payment_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
            rows.iter().map(row_to_ticket).collect()
        })
    }

    fn list_tickets<'a>(
        &'a self,
        query: &'a TicketQuery,
    ) -> BoxFuture<'a, Result<TicketPage, StoreError>> {
        Box::pin(async move {
            let pattern = query.search.as_deref().map(like_pattern);

            let (total,): (i64,) =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM tickets WHERE {TICKET_SEARCH}"))
                    .bind(&pattern)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error)?;

            let sql = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE {TICKET_SEARCH} \
                 ORDER BY created_at DESC, code DESC LIMIT $2 OFFSET $3"
            );
            #[allow(clippy::cast_possible_wrap)] // offset is bounded by page * 100
            let rows = sqlx::query(&sql)
                .bind(&pattern)
                .bind(i64::from(query.limit))
                .bind(query.offset() as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

            let tickets = rows.iter().map(row_to_ticket).collect::<Result<Vec<_>, _>>()?;
            Ok(TicketPage::new(
                query,
                tickets,
                u64::try_from(total).unwrap_or(0),
            ))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(db_error)
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

fn conflict_or_db(error: sqlx::Error, field: &'static str, value: &str) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
            field,
            value: value.to_string(),
        },
        _ => db_error(error),
    }
}

/// Wrap a search term for `ILIKE`, escaping wildcards.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("{name}: {e}")))
}

fn parse_status(raw: &str) -> Result<PaymentStatus, StoreError> {
    PaymentStatus::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown status {raw}")))
}

fn row_to_panel(row: &PgRow) -> Result<Panel, StoreError> {
    let status: String = col(row, "payment_status")?;
    Ok(Panel {
        id: PanelId::from_uuid(col(row, "id")?),
        name: col(row, "name")?,
        subdomain: col(row, "subdomain")?,
        custom_domain: col(row, "custom_domain")?,
        owner_name: col(row, "owner_name")?,
        owner_email: col(row, "owner_email")?,
        owner_phone: col(row, "owner_phone")?,
        payment_status: parse_status(&status)?,
        setup_paid: col(row, "setup_paid")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn row_to_payment(row: &PgRow) -> Result<PaymentRecord, StoreError> {
    let reference: String = col(row, "reference")?;
    let provider: String = col(row, "provider")?;
    let status: String = col(row, "status")?;
    let purpose: serde_json::Value = col(row, "purpose")?;

    Ok(PaymentRecord {
        id: PaymentId::from_uuid(col(row, "id")?),
        reference: PaymentReference::parse(&reference)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        provider: Provider::parse(&provider).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        status: parse_status(&status)?,
        amount: Money::from_kobo(col(row, "amount_kobo")?),
        purpose: serde_json::from_value::<PaymentPurpose>(purpose)
            .map_err(|e| StoreError::Corrupt(format!("purpose: {e}")))?,
        metadata: col(row, "metadata")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
        completed_at: col(row, "completed_at")?,
    })
}

fn row_to_ticket(row: &PgRow) -> Result<Ticket, StoreError> {
    Ok(Ticket {
        id: TicketId::from_uuid(col(row, "id")?),
        payment_id: PaymentId::from_uuid(col(row, "payment_id")?),
        code: col(row, "code")?,
        ticket_type: col(row, "ticket_type")?,
        price: Money::from_kobo(col(row, "price_kobo")?),
        attendee: Attendee {
            name: col(row, "attendee_name")?,
            email: col(row, "attendee_email")?,
            phone: col(row, "attendee_phone")?,
            company: col(row, "attendee_company")?,
            job_title: col(row, "attendee_job_title")?,
        },
        created_at: col(row, "created_at")?,
    })
}
