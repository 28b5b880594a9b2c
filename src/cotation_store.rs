use crate::errors::{AppError, ResultExt};
use crate::models::{CotationQueryParams, CotationRecord, NewCotation, QuoteRequest, QuoteResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Status filter value meaning "any status".
pub const ALL_STATUSES: &str = "Todos";

/// Dashboard query over one user's cotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CotationFilter {
    /// Lowercased headline status; `None` matches any.
    pub status: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
    /// Lowercased free-text search.
    pub search: Option<String>,
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_milli_opt(23, 59, 59, 999).map(|dt| dt.and_utc())
}

fn parse_day(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{} deve estar no formato AAAA-MM-DD", field)))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl CotationFilter {
    /// Builds the filter from query parameters; `today` anchors the period
    /// presets. Explicit dates win over a preset.
    pub fn from_params(params: &CotationQueryParams, today: NaiveDate) -> Result<Self, AppError> {
        let (mut from_day, mut to_day) = match non_blank(&params.period) {
            None | Some(ALL_STATUSES) => (None, None),
            Some("Hoje") => (Some(today), Some(today)),
            Some("7 Dias") => (Some(today - Duration::days(7)), Some(today)),
            Some("15 Dias") => (Some(today - Duration::days(15)), Some(today)),
            Some("30 Dias") => (Some(today - Duration::days(30)), Some(today)),
            Some(other) => {
                return Err(AppError::BadRequest(format!("Período desconhecido: {}", other)))
            }
        };

        if let Some(raw) = non_blank(&params.date_start) {
            from_day = Some(parse_day("dateStart", raw)?);
        }
        if let Some(raw) = non_blank(&params.date_end) {
            to_day = Some(parse_day("dateEnd", raw)?);
        }

        Ok(Self {
            status: non_blank(&params.status)
                .filter(|s| *s != ALL_STATUSES)
                .map(str::to_lowercase),
            created_from: from_day.and_then(start_of_day),
            created_to: to_day.and_then(end_of_day),
            search: non_blank(&params.search).map(str::to_lowercase),
        })
    }

    pub fn matches(&self, record: &CotationRecord) -> bool {
        if let Some(ref status) = self.status {
            if record.main_status.to_lowercase() != *status {
                return false;
            }
        }
        if self.created_from.is_some_and(|from| record.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| record.created_at > to) {
            return false;
        }
        match self.search {
            Some(ref needle) => searchable_text(record).contains(needle.as_str()),
            None => true,
        }
    }
}

/// Lowercased text the dashboard search looks into.
fn searchable_text(record: &CotationRecord) -> String {
    let payload = &record.payload;
    let mut fields = vec![
        record.id.to_string(),
        record.user_email.clone(),
        record.main_status.clone(),
        payload.tenant_name().unwrap_or_default().to_string(),
        payload.tenant_document().unwrap_or_default().to_string(),
        payload.property_address().unwrap_or_default(),
    ];
    for quote in &record.all_insurer_quotes {
        fields.push(quote.insurer_name.clone());
        if let Some(ref id) = quote.quote_id {
            fields.push(id.clone());
        }
    }
    fields.join(" ").to_lowercase()
}

/// Append-only store of cotations, queried per user.
#[async_trait]
pub trait CotationStore: Send + Sync {
    async fn insert(&self, new: NewCotation) -> Result<CotationRecord, AppError>;

    /// Only returns records owned by `user_id`.
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<CotationRecord>, AppError>;

    /// Newest first.
    async fn list(
        &self,
        user_id: &str,
        filter: &CotationFilter,
    ) -> Result<Vec<CotationRecord>, AppError>;
}

/// Keeps cotations for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCotationStore {
    records: RwLock<Vec<CotationRecord>>,
}

impl MemoryCotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn insert_record(&self, record: CotationRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl CotationStore for MemoryCotationStore {
    async fn insert(&self, new: NewCotation) -> Result<CotationRecord, AppError> {
        let record = CotationRecord::create(new, Utc::now());
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<CotationRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &CotationFilter,
    ) -> Result<Vec<CotationRecord>, AppError> {
        let mut records: Vec<CotationRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[derive(sqlx::FromRow)]
struct CotationRow {
    id: Uuid,
    user_id: String,
    user_email: String,
    created_at: DateTime<Utc>,
    main_status: String,
    payload: Json<QuoteRequest>,
    all_insurer_quotes: Json<Vec<QuoteResult>>,
}

impl From<CotationRow> for CotationRecord {
    fn from(row: CotationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            created_at: row.created_at,
            payload: row.payload.0,
            all_insurer_quotes: row.all_insurer_quotes.0,
            main_status: row.main_status,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, user_email, created_at, main_status, payload, all_insurer_quotes";

/// Postgres-backed store (table `cotations`, see `db::ensure_schema`).
pub struct PgCotationStore {
    pool: PgPool,
}

impl PgCotationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CotationStore for PgCotationStore {
    async fn insert(&self, new: NewCotation) -> Result<CotationRecord, AppError> {
        let record = CotationRecord::create(new, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO cotations
                (id, user_id, user_email, created_at, main_status, payload, all_insurer_quotes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.user_email)
        .bind(record.created_at)
        .bind(&record.main_status)
        .bind(Json(&record.payload))
        .bind(Json(&record.all_insurer_quotes))
        .execute(&self.pool)
        .await
        .context("inserting cotation")?;

        tracing::info!("✓ Cotation {} stored for user {}", record.id, record.user_id);
        Ok(record)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<CotationRecord>, AppError> {
        let row = sqlx::query_as::<_, CotationRow>(&format!(
            "SELECT {} FROM cotations WHERE id = $1 AND user_id = $2",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("loading cotation")?;

        Ok(row.map(CotationRecord::from))
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &CotationFilter,
    ) -> Result<Vec<CotationRecord>, AppError> {
        let rows = sqlx::query_as::<_, CotationRow>(&format!(
            r#"
            SELECT {} FROM cotations
            WHERE user_id = $1
              AND ($2::text IS NULL OR lower(main_status) = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC
            "#,
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.status.as_deref())
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(&self.pool)
        .await
        .context("listing cotations")?;

        // Free-text search runs over the JSON documents, so it is applied here
        Ok(rows
            .into_iter()
            .map(CotationRecord::from)
            .filter(|record| filter.matches(record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures, status};
    use chrono::TimeZone;

    fn quote(insurer: &str, id: Option<&str>, status: &str) -> QuoteResult {
        QuoteResult {
            insurer_name: insurer.to_string(),
            insurer_logo: String::new(),
            quote_id: id.map(str::to_string),
            status: status.to_string(),
            total_premium: id.map(|_| "84.00".to_string()),
            message: String::new(),
        }
    }

    fn record(user: &str, created_at: DateTime<Utc>, quotes: Vec<QuoteResult>) -> CotationRecord {
        CotationRecord::create(
            NewCotation {
                user_id: user.to_string(),
                user_email: format!("{}@example.com", user),
                payload: fixtures::quote_request(1000.0),
                all_insurer_quotes: quotes,
            },
            created_at,
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_filter_from_params() {
        let params = CotationQueryParams {
            status: Some("Todos".to_string()),
            period: Some("7 Dias".to_string()),
            search: Some("  Maria ".to_string()),
            ..Default::default()
        };
        let filter = CotationFilter::from_params(&params, day(18)).unwrap();

        assert_eq!(filter.status, None);
        assert_eq!(filter.search.as_deref(), Some("maria"));
        assert_eq!(
            filter.created_from,
            Some(Utc.with_ymd_and_hms(2026, 10, 11, 0, 0, 0).unwrap())
        );
        assert_eq!(filter.created_to, end_of_day(day(18)));
    }

    #[test]
    fn test_explicit_dates_override_period() {
        let params = CotationQueryParams {
            period: Some("Hoje".to_string()),
            date_start: Some("2026-10-01".to_string()),
            ..Default::default()
        };
        let filter = CotationFilter::from_params(&params, day(18)).unwrap();
        assert_eq!(filter.created_from, start_of_day(day(1)));
        assert_eq!(filter.created_to, end_of_day(day(18)));

        let bad = CotationQueryParams {
            date_end: Some("18/10/2026".to_string()),
            ..Default::default()
        };
        assert!(CotationFilter::from_params(&bad, day(18)).is_err());

        let unknown = CotationQueryParams {
            period: Some("Ontem".to_string()),
            ..Default::default()
        };
        assert!(CotationFilter::from_params(&unknown, day(18)).is_err());
    }

    #[test]
    fn test_end_date_includes_whole_day() {
        let filter = CotationFilter {
            created_to: end_of_day(day(18)),
            ..Default::default()
        };
        let late = record(
            "u1",
            Utc.with_ymd_and_hms(2026, 10, 18, 23, 59, 59).unwrap(),
            vec![],
        );
        let next = record(
            "u1",
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            vec![],
        );
        assert!(filter.matches(&late));
        assert!(!filter.matches(&next));
    }

    #[test]
    fn test_search_covers_insurers_and_tenant() {
        let rec = record(
            "u1",
            Utc::now(),
            vec![quote("Pottencial", Some("POT-ABC1234"), status::EM_ANALISE)],
        );
        let search = |needle: &str| CotationFilter {
            search: Some(needle.to_string()),
            ..Default::default()
        };

        assert!(search("pottencial").matches(&rec));
        assert!(search("pot-abc").matches(&rec));
        assert!(search("maria souza").matches(&rec));
        assert!(search("52998224725").matches(&rec));
        assert!(search("paulista").matches(&rec));
        assert!(!search("tokio").matches(&rec));
    }

    #[tokio::test]
    async fn test_memory_store_lists_newest_first_per_user() {
        let store = MemoryCotationStore::new();
        let older = record(
            "u1",
            Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
            vec![quote("Porto Seguro", None, status::RECUSADO)],
        );
        let newer = record(
            "u1",
            Utc.with_ymd_and_hms(2026, 10, 10, 12, 0, 0).unwrap(),
            vec![quote("Pottencial", Some("POT-1"), status::EM_ANALISE)],
        );
        let foreign = record("u2", Utc::now(), vec![]);
        store.insert_record(older.clone()).await;
        store.insert_record(newer.clone()).await;
        store.insert_record(foreign.clone()).await;

        let all = store.list("u1", &CotationFilter::default()).await.unwrap();
        assert_eq!(all, vec![newer.clone(), older.clone()]);

        let declined = CotationFilter {
            status: Some("recusado".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list("u1", &declined).await.unwrap(), vec![older]);

        assert!(store.get("u1", foreign.id).await.unwrap().is_none());
        assert_eq!(store.get("u2", foreign.id).await.unwrap(), Some(foreign));
    }
}
