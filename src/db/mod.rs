//! A `RecordStore` kept in a local SQLite file.
//!
//! Amounts are stored as decimal text and dates as `YYYY-MM-DD`, so both sort and compare
//! correctly in SQL without any conversion.

mod migrations;

use crate::api::{Filter, RecordStore};
use crate::model::{
    Amount, Collection, ExpensePatch, ExpenseRecord, IncomeRecord, NewExpense, NewIncome,
    NewRecord, NewTithe, Record, RecordPatch, TithePatch, TitheRecord,
};
use crate::Result;
use anyhow::{bail, ensure, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            !path.exists(),
            "A database already exists at '{}'",
            path.display()
        );
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created SQLite database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            "The SQLite database is missing '{}'",
            path.display()
        );
        let pool = connect(path, false).await?;
        migrations::bootstrap(&pool).await?;
        let version = migrations::version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this app supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    async fn insert_income(&self, id: &str, r: &NewIncome, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO income_records
                (id, date, category, amount, description, member_name, recorded_by_user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(date_text(r.date))
        .bind(r.category.to_string())
        .bind(r.amount.to_string())
        .bind(&r.description)
        .bind(&r.member_name)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_tithe(&self, id: &str, r: &NewTithe, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tithe_records (id, member_name, date, amount, recorded_by_user_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&r.member_name)
        .bind(date_text(r.date))
        .bind(r.amount.to_string())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_expense(&self, id: &str, r: &NewExpense, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expense_records
                (id, date, category, amount, payee, payment_method, description,
                 recorded_by_user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(date_text(r.date))
        .bind(r.category.to_string())
        .bind(r.amount.to_string())
        .bind(&r.payee)
        .bind(r.payment_method.map(|m| m.to_string()))
        .bind(&r.description)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_tithe(&self, id: &str, patch: &TithePatch) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tithe_records SET
                member_name = COALESCE(?, member_name),
                date = COALESCE(?, date),
                amount = COALESCE(?, amount)
            WHERE id = ?
            "#,
        )
        .bind(&patch.member_name)
        .bind(patch.date.map(date_text))
        .bind(patch.amount.map(|a| a.to_string()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_expense(&self, id: &str, patch: &ExpensePatch) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE expense_records SET
                date = COALESCE(?, date),
                category = COALESCE(?, category),
                amount = COALESCE(?, amount),
                payee = COALESCE(?, payee),
                payment_method = COALESCE(?, payment_method),
                description = COALESCE(?, description)
            WHERE id = ?
            "#,
        )
        .bind(patch.date.map(date_text))
        .bind(patch.category.map(|c| c.to_string()))
        .bind(patch.amount.map(|a| a.to_string()))
        .bind(&patch.payee)
        .bind(patch.payment_method.map(|m| m.to_string()))
        .bind(&patch.description)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, record: NewRecord, user_id: &str) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let collection = record.collection();
        let inserted = match &record {
            NewRecord::Income(r) => self.insert_income(&id, r, user_id).await,
            NewRecord::Tithe(r) => self.insert_tithe(&id, r, user_id).await,
            NewRecord::Expense(r) => self.insert_expense(&id, r, user_id).await,
        };
        inserted.with_context(|| format!("Failed to add a record to {collection}"))?;
        trace!("Inserted {id} into {collection}");
        Ok(id)
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let sql = format!(
            r#"
            SELECT * FROM {}
            WHERE (? IS NULL OR date >= ?) AND (? IS NULL OR date <= ?)
            ORDER BY date DESC, created_at DESC
            LIMIT ?
            "#,
            collection.name()
        );
        let start = filter.range.map(|r| date_text(r.start()));
        let end = filter.range.map(|r| date_text(r.end()));
        let limit = filter.limit.map_or(-1, i64::from);
        let rows = sqlx::query(&sql)
            .bind(&start)
            .bind(&start)
            .bind(&end)
            .bind(&end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query {collection}"))?;

        rows.iter()
            .map(|row| match collection {
                Collection::Income => income_from_row(row).map(Record::Income),
                Collection::Tithes => tithe_from_row(row).map(Record::Tithe),
                Collection::Expenses => expense_from_row(row).map(Record::Expense),
            })
            .collect()
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        ensure!(!patch.is_empty(), "There is nothing to update");
        let collection = patch.collection();
        let updated = match &patch {
            RecordPatch::Tithe(p) => self.update_tithe(id, p).await,
            RecordPatch::Expense(p) => self.update_expense(id, p).await,
        }
        .with_context(|| format!("Failed to update {id} in {collection}"))?;
        if updated == 0 {
            bail!("No record with id '{id}' in {collection}");
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {id} from {collection}"))?;
        if result.rows_affected() == 0 {
            bail!("No record with id '{id}' in {collection}");
        }
        Ok(())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(row: &SqliteRow) -> Result<NaiveDate> {
    let s: String = row.try_get("date")?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}' in database"))
}

fn parse_amount(row: &SqliteRow) -> Result<Amount> {
    let s: String = row.try_get("amount")?;
    Amount::from_str(&s).with_context(|| format!("Invalid amount '{s}' in database"))
}

fn parse_created_at(row: &SqliteRow) -> Result<Option<DateTime<Utc>>> {
    let s: String = row.try_get("created_at")?;
    let created = DateTime::parse_from_rfc3339(&s)
        .with_context(|| format!("Invalid created_at '{s}' in database"))?;
    Ok(Some(created.with_timezone(&Utc)))
}

/// Parses an optional column that holds one of the app's enumerations.
fn parse_opt<T>(row: &SqliteRow, column: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: Option<String> = row.try_get(column)?;
    s.map(|s| {
        T::from_str(&s).with_context(|| format!("Invalid {column} '{s}' in database"))
    })
    .transpose()
}

fn parse_required<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_opt(row, column)?.with_context(|| format!("Missing {column} in database"))
}

fn income_from_row(row: &SqliteRow) -> Result<IncomeRecord> {
    Ok(IncomeRecord {
        id: row.try_get("id")?,
        date: parse_date(row)?,
        category: parse_required(row, "category")?,
        amount: parse_amount(row)?,
        description: row.try_get("description")?,
        member_name: row.try_get("member_name")?,
        recorded_by_user_id: row.try_get("recorded_by_user_id")?,
        created_at: parse_created_at(row)?,
    })
}

fn tithe_from_row(row: &SqliteRow) -> Result<TitheRecord> {
    Ok(TitheRecord {
        id: row.try_get("id")?,
        member_name: row.try_get("member_name")?,
        date: parse_date(row)?,
        amount: parse_amount(row)?,
        recorded_by_user_id: row.try_get("recorded_by_user_id")?,
        created_at: parse_created_at(row)?,
    })
}

fn expense_from_row(row: &SqliteRow) -> Result<ExpenseRecord> {
    Ok(ExpenseRecord {
        id: row.try_get("id")?,
        date: parse_date(row)?,
        category: parse_required(row, "category")?,
        amount: parse_amount(row)?,
        payee: row.try_get("payee")?,
        payment_method: parse_opt(row, "payment_method")?,
        description: row.try_get("description")?,
        recorded_by_user_id: row.try_get("recorded_by_user_id")?,
        created_at: parse_created_at(row)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DateRange;
    use crate::model::{ExpenseCategory, IncomeCategory, PaymentMethod};
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    async fn store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::init(dir.path().join("books.sqlite"))
            .await
            .unwrap();
        (dir, store)
    }

    fn new_tithe(name: &str, d: &str, a: &str) -> NewRecord {
        NewRecord::Tithe(NewTithe {
            member_name: name.to_string(),
            date: date(d),
            amount: amt(a),
        })
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let (dir, _store) = store().await;
        assert!(SqliteStore::init(dir.path().join("books.sqlite"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(SqliteStore::load(dir.path().join("nope.sqlite"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_create_and_query_income() {
        let (dir, store) = store().await;
        let id = store
            .create(
                NewRecord::Income(NewIncome {
                    date: date("2024-03-03"),
                    category: IncomeCategory::Donation,
                    amount: amt("20000.50"),
                    description: Some("Building fund".to_string()),
                    member_name: None,
                }),
                "user-1",
            )
            .await
            .unwrap();

        // A second handle on the same file sees the record.
        let reopened = SqliteStore::load(dir.path().join("books.sqlite"))
            .await
            .unwrap();
        let records = reopened
            .query(Collection::Income, &Filter::all())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let Record::Income(income) = &records[0] else {
            panic!("expected an income record, got {:?}", records[0]);
        };
        assert_eq!(income.id, id);
        assert_eq!(income.category, IncomeCategory::Donation);
        assert_eq!(income.amount, amt("20000.5"));
        assert_eq!(income.description.as_deref(), Some("Building fund"));
        assert_eq!(income.recorded_by_user_id, "user-1");
        assert!(income.created_at.is_some());
    }

    #[tokio::test]
    async fn test_query_order_range_and_limit() {
        let (_dir, store) = store().await;
        for (name, d) in [
            ("Alice", "2024-01-31"),
            ("Bob", "2024-02-01"),
            ("Chantal", "2024-02-29"),
            ("Daniel", "2024-03-01"),
        ] {
            store
                .create(new_tithe(name, d, "1000"), "user-1")
                .await
                .unwrap();
        }

        let all = store
            .query(Collection::Tithes, &Filter::all())
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = all
            .iter()
            .map(|r| match r {
                Record::Tithe(t) => t.date,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            dates,
            vec![
                date("2024-03-01"),
                date("2024-02-29"),
                date("2024-02-01"),
                date("2024-01-31")
            ]
        );

        let february = Filter::within(DateRange::new(date("2024-02-01"), date("2024-02-29")));
        let found = store.query(Collection::Tithes, &february).await.unwrap();
        assert_eq!(found.len(), 2);

        let limited = store
            .query(Collection::Tithes, &Filter::all().with_limit(Some(1)))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id(), all[0].id());
    }

    #[tokio::test]
    async fn test_update_tithe() {
        let (_dir, store) = store().await;
        let id = store
            .create(new_tithe("Marie", "2024-05-05", "2500"), "user-1")
            .await
            .unwrap();
        let patch = TithePatch {
            amount: Some(amt("3000")),
            ..TithePatch::default()
        };
        store.update(&id, RecordPatch::Tithe(patch)).await.unwrap();

        let records = store
            .query(Collection::Tithes, &Filter::all())
            .await
            .unwrap();
        let Record::Tithe(t) = &records[0] else {
            panic!("expected a tithe");
        };
        assert_eq!(t.amount, amt("3000"));
        assert_eq!(t.member_name, "Marie");
        assert_eq!(t.date, date("2024-05-05"));
    }

    #[tokio::test]
    async fn test_update_expense() {
        let (_dir, store) = store().await;
        let id = store
            .create(
                NewRecord::Expense(NewExpense {
                    date: date("2024-05-20"),
                    category: ExpenseCategory::Rent,
                    amount: amt("60000"),
                    payee: Some("Landlord".to_string()),
                    payment_method: None,
                    description: None,
                }),
                "user-1",
            )
            .await
            .unwrap();
        let patch = ExpensePatch {
            category: Some(ExpenseCategory::Maintenance),
            payment_method: Some(PaymentMethod::MobileMoney),
            ..ExpensePatch::default()
        };
        store
            .update(&id, RecordPatch::Expense(patch))
            .await
            .unwrap();

        let records = store
            .query(Collection::Expenses, &Filter::all())
            .await
            .unwrap();
        let Record::Expense(e) = &records[0] else {
            panic!("expected an expense");
        };
        assert_eq!(e.category, ExpenseCategory::Maintenance);
        assert_eq!(e.payment_method, Some(PaymentMethod::MobileMoney));
        assert_eq!(e.payee.as_deref(), Some("Landlord"));
        assert_eq!(e.amount, amt("60000"));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let (_dir, store) = store().await;
        let patch = TithePatch {
            member_name: Some("Nobody".to_string()),
            ..TithePatch::default()
        };
        let err = store
            .update("missing", RecordPatch::Tithe(patch))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No record with id 'missing'"));
    }

    #[tokio::test]
    async fn test_update_empty_patch() {
        let (_dir, store) = store().await;
        let id = store
            .create(new_tithe("Marie", "2024-05-05", "2500"), "user-1")
            .await
            .unwrap();
        assert!(store
            .update(&id, RecordPatch::Tithe(TithePatch::default()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, store) = store().await;
        let id = store
            .create(new_tithe("Marie", "2024-05-05", "2500"), "user-1")
            .await
            .unwrap();
        // The id belongs to another collection.
        assert!(store.delete(Collection::Income, &id).await.is_err());
        store.delete(Collection::Tithes, &id).await.unwrap();
        assert!(store.delete(Collection::Tithes, &id).await.is_err());
        let left = store
            .query(Collection::Tithes, &Filter::all())
            .await
            .unwrap();
        assert!(left.is_empty());
    }
}
