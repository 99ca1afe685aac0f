use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use eventease_core::{
    ContactInfo, CoreError, CoreResult, Inquiry, InquiryChange, InquiryRepository, LiveViewHub,
    Mutation, NewInquiry, Precondition, Quote, Subscription, ViewScope,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// NOTIFY channel announcing every committed inquiry revision
pub const CHANGE_CHANNEL: &str = "inquiry_changes";

/// NOTIFY payload; the full document is kept in `inquiry_revisions`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct ChangeNotice {
    id: Uuid,
    revision: i64,
}

const COLUMNS: &str = "id, client_id, event_type, event_date, description, location, \
    expected_guests, contact, organizer_id, status, quote, revision, created_at, updated_at, \
    responded_at, cancellation_reason";

pub struct PgInquiryRepository {
    pool: PgPool,
    hub: LiveViewHub,
}

#[derive(sqlx::FromRow)]
struct InquiryRow {
    id: Uuid,
    client_id: String,
    event_type: String,
    event_date: NaiveDate,
    description: String,
    location: String,
    expected_guests: Option<i32>,
    contact: Option<Json<ContactInfo>>,
    organizer_id: Option<String>,
    status: String,
    quote: Option<Json<Quote>>,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
}

impl TryFrom<InquiryRow> for Inquiry {
    type Error = CoreError;

    fn try_from(row: InquiryRow) -> Result<Self, Self::Error> {
        let expected_guests = row
            .expected_guests
            .map(u32::try_from)
            .transpose()
            .map_err(|_| CoreError::InternalError(format!("inquiry {} has negative guests", row.id)))?;
        let revision = u64::try_from(row.revision)
            .map_err(|_| CoreError::InternalError(format!("inquiry {} has negative revision", row.id)))?;

        Ok(Inquiry {
            id: row.id,
            client_id: row.client_id,
            event_type: row.event_type,
            event_date: row.event_date,
            description: row.description,
            location: row.location,
            expected_guests,
            contact: row.contact.map(|c| c.0),
            organizer_id: row.organizer_id,
            status: row.status.parse()?,
            quote: row.quote.map(|q| q.0),
            revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
            responded_at: row.responded_at,
            cancellation_reason: row.cancellation_reason,
        })
    }
}

fn db_error(e: sqlx::Error) -> CoreError {
    tracing::error!("Inquiry store error: {}", e);
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            CoreError::TransportError(e.to_string())
        }
        other => CoreError::InternalError(other.to_string()),
    }
}

async fn fetch_inquiry(pool: &PgPool, id: Uuid) -> CoreResult<Option<Inquiry>> {
    let row: Option<InquiryRow> =
        sqlx::query_as(&format!("SELECT {} FROM inquiries WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_error)?;
    row.map(Inquiry::try_from).transpose()
}

async fn fetch_revision(pool: &PgPool, notice: &ChangeNotice) -> CoreResult<Option<Inquiry>> {
    let row: Option<InquiryRow> = sqlx::query_as(&format!(
        "SELECT {} FROM inquiry_revisions WHERE id = $1 AND revision = $2",
        COLUMNS
    ))
    .bind(notice.id)
    .bind(notice.revision)
    .fetch_optional(pool)
    .await
    .map_err(db_error)?;
    row.map(Inquiry::try_from).transpose()
}

/// Copy the just-written row into the revision log and announce it; both
/// become visible only when `tx` commits.
async fn record_revision(tx: &mut Transaction<'_, Postgres>, id: Uuid, revision: i64) -> CoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO inquiry_revisions ({0}) SELECT {0} FROM inquiries WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;

    let payload = serde_json::to_string(&ChangeNotice { id, revision })
        .map_err(|e| CoreError::InternalError(e.to_string()))?;
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(CHANGE_CHANNEL)
        .bind(payload)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(())
}

impl PgInquiryRepository {
    pub fn new(pool: PgPool, hub: LiveViewHub) -> Self {
        Self { pool, hub }
    }

    /// Forward committed writes, from this process or any other, into the hub.
    ///
    /// Each notification names one revision, which is loaded from the
    /// revision log, so every committed state is pushed in commit order even
    /// when writes land back to back. Losing the notification connection
    /// fails every open subscription.
    pub async fn spawn_listener(&self) -> Result<JoinHandle<()>, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        let pool = self.pool.clone();
        let hub = self.hub.clone();

        Ok(tokio::spawn(async move {
            tracing::info!("Listening for inquiry changes on '{}'", CHANGE_CHANNEL);
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => {
                        let notice: ChangeNotice = match serde_json::from_str(notification.payload()) {
                            Ok(notice) => notice,
                            Err(_) => {
                                tracing::warn!("Ignoring malformed change payload: {}", notification.payload());
                                continue;
                            }
                        };
                        match fetch_revision(&pool, &notice).await {
                            Ok(Some(inquiry)) => hub.publish(InquiryChange::committed(inquiry)),
                            Ok(None) => tracing::warn!(
                                inquiry_id = %notice.id,
                                revision = notice.revision,
                                "Change for unknown inquiry revision"
                            ),
                            Err(e) => hub.fail(format!(
                                "could not load inquiry {} revision {}: {}",
                                notice.id, notice.revision, e
                            )),
                        }
                    }
                    // connection dropped; the next try_recv reconnects
                    Ok(None) => hub.fail("inquiry change notifications interrupted"),
                    Err(e) => {
                        hub.fail(format!("inquiry change listener stopped: {}", e));
                        break;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl InquiryRepository for PgInquiryRepository {
    async fn insert(&self, client_id: &str, input: NewInquiry) -> CoreResult<Inquiry> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: InquiryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO inquiries (id, client_id, event_type, event_date, description, location,
                                   expected_guests, contact)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(client_id)
        .bind(&input.event_type)
        .bind(input.event_date)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.expected_guests.map(|g| g as i32))
        .bind(Json(&input.contact))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        record_revision(&mut tx, row.id, row.revision).await?;

        tx.commit().await.map_err(db_error)?;
        Inquiry::try_from(row)
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Inquiry>> {
        fetch_inquiry(&self.pool, id).await
    }

    async fn list(&self, scope: &ViewScope) -> CoreResult<Vec<Inquiry>> {
        let base = format!("SELECT {} FROM inquiries", COLUMNS);
        let order = "ORDER BY created_at DESC, id DESC";
        let rows: Vec<InquiryRow> = match scope {
            ViewScope::Inquiry(id) => {
                sqlx::query_as(&format!("{} WHERE id = $1 {}", base, order))
                    .bind(*id)
                    .fetch_all(&self.pool)
                    .await
            }
            ViewScope::Client(client_id) => {
                sqlx::query_as(&format!("{} WHERE client_id = $1 {}", base, order))
                    .bind(client_id)
                    .fetch_all(&self.pool)
                    .await
            }
            ViewScope::AllInquiries => {
                sqlx::query_as(&format!("{} {}", base, order))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_error)?;

        rows.into_iter().map(Inquiry::try_from).collect()
    }

    async fn apply_if(
        &self,
        id: Uuid,
        expected: Precondition,
        mutation: Mutation,
    ) -> CoreResult<Inquiry> {
        let target = mutation.target_status();
        let (organizer_id, quote, responded, reason) = match mutation {
            // submitted_at is restamped below with the commit timestamp
            Mutation::AttachQuote(draft) => {
                (Some(draft.organizer_id.clone()), Some(Json(draft.into_quote(Utc::now()))), false, None)
            }
            Mutation::Respond { .. } => (None, None, true, None),
            Mutation::Cancel { reason } => (None, None, false, reason),
        };

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE inquiries AS i SET
                status = $4,
                organizer_id = COALESCE(i.organizer_id, $5),
                quote = CASE WHEN $6::jsonb IS NULL THEN i.quote
                             ELSE jsonb_set($6::jsonb, '{{submitted_at}}', to_jsonb(s.at)) END,
                responded_at = CASE WHEN $7 THEN s.at ELSE i.responded_at END,
                cancellation_reason = COALESCE($8, i.cancellation_reason),
                revision = i.revision + 1,
                updated_at = s.at
            FROM (
                SELECT GREATEST(NOW(), updated_at + INTERVAL '1 microsecond') AS at
                FROM inquiries WHERE id = $1
            ) AS s
            WHERE i.id = $1
              AND i.revision = $2
              AND i.status = $3
              AND ($3 <> 'new' OR i.organizer_id IS NULL)
            RETURNING {}
            "#,
            COLUMNS
                .split(", ")
                .map(|c| format!("i.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .bind(id)
        .bind(expected.revision as i64)
        .bind(expected.status.as_str())
        .bind(target.as_str())
        .bind(organizer_id)
        .bind(quote)
        .bind(responded)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let row = match row {
            Some(row) => row,
            None => {
                tx.rollback().await.map_err(db_error)?;
                return match fetch_inquiry(&self.pool, id).await? {
                    None => Err(CoreError::NotFound(id)),
                    Some(current) => Err(CoreError::StaleStateError(format!(
                        "inquiry {} is {} at revision {}, expected {} at revision {}",
                        id, current.status, current.revision, expected.status, expected.revision
                    ))),
                };
            }
        };

        record_revision(&mut tx, id, row.revision).await?;

        tx.commit().await.map_err(db_error)?;

        let inquiry = Inquiry::try_from(row)?;
        debug_assert_eq!(inquiry.status, target);
        tracing::debug!(inquiry_id = %id, revision = inquiry.revision, status = %inquiry.status, "Inquiry updated");
        Ok(inquiry)
    }

    async fn subscribe(&self, scope: ViewScope) -> CoreResult<Subscription> {
        // register before reading so nothing committed in between is missed
        let subscription = self.hub.register(scope.clone());
        let snapshot = self.list(&scope).await?;
        Ok(subscription.with_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbClient;
    use chrono::Duration;
    use eventease_core::{Decision, InquiryStatus, QuoteDraft};
    use eventease_shared::Masked;
    use rust_decimal_macros::dec;

    async fn connect() -> PgInquiryRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let db = DbClient::new(&url, 2).await.unwrap();
        db.migrate().await.unwrap();
        PgInquiryRepository::new(db.pool.clone(), LiveViewHub::default())
    }

    fn gala() -> NewInquiry {
        NewInquiry {
            event_type: "Gala".to_string(),
            event_date: (Utc::now() + Duration::days(30)).date_naive(),
            description: "Black tie dinner".to_string(),
            location: "Edinburgh".to_string(),
            expected_guests: Some(200),
            contact: ContactInfo {
                name: "Robin".to_string(),
                email: Masked::from("robin@example.com"),
                phone: Masked::from("+44 131 496 0000"),
            },
        }
    }

    fn quote(organizer: &str) -> Mutation {
        Mutation::AttachQuote(QuoteDraft {
            organizer_id: organizer.to_string(),
            organizer_name: organizer.to_string(),
            amount: dec!(450.00),
            currency: "GBP".to_string(),
            message: "incl. catering".to_string(),
        })
    }

    #[test]
    fn test_change_notice_payload() {
        let id = Uuid::new_v4();
        let payload = serde_json::to_string(&ChangeNotice { id, revision: 2 }).unwrap();
        let parsed: ChangeNotice = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed, ChangeNotice { id, revision: 2 });
        assert!(serde_json::from_str::<ChangeNotice>(&id.to_string()).is_err());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL pointing at a scratch PostgreSQL"]
    async fn test_conditional_update_against_postgres() {
        let repo = connect().await;
        let created = repo.insert("client-pg", gala()).await.unwrap();
        assert_eq!(created.revision, 1);

        let expected = Precondition::of(&created);
        let quoted = repo.apply_if(created.id, expected, quote("org-1")).await.unwrap();
        assert_eq!(quoted.status, InquiryStatus::Quoted);
        assert_eq!(quoted.quote.as_ref().unwrap().amount, dec!(450.00));
        assert_eq!(quoted.quote.as_ref().unwrap().submitted_at, quoted.updated_at);
        assert!(quoted.updated_at > created.updated_at);

        assert!(matches!(
            repo.apply_if(created.id, expected, quote("org-2")).await,
            Err(CoreError::StaleStateError(_))
        ));

        let accepted = repo
            .apply_if(created.id, Precondition::of(&quoted), Mutation::Respond { decision: Decision::Accept })
            .await
            .unwrap();
        assert_eq!(accepted.organizer_id.as_deref(), Some("org-1"));
        assert!(accepted.responded_at.is_some());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL pointing at a scratch PostgreSQL"]
    async fn test_back_to_back_commits_each_reach_live_view() {
        let repo = connect().await;
        let _listener = repo.spawn_listener().await.unwrap();

        let created = repo.insert("client-pg", gala()).await.unwrap();
        let mut sub = repo.subscribe(ViewScope::Inquiry(created.id)).await.unwrap();
        assert_eq!(sub.snapshot()[0].revision, 1);

        // both commits land before the listener handles the first notification
        let quoted = repo
            .apply_if(created.id, Precondition::of(&created), quote("org-1"))
            .await
            .unwrap();
        repo.apply_if(created.id, Precondition::of(&quoted), Mutation::Respond { decision: Decision::Accept })
            .await
            .unwrap();

        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.inquiry.revision, 2);
        assert_eq!(first.inquiry.status, InquiryStatus::Quoted);
        assert_eq!(first.inquiry.organizer_id.as_deref(), Some("org-1"));

        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.inquiry.revision, 3);
        assert_eq!(second.inquiry.status, InquiryStatus::Accepted);
    }
}
