//! Converts records to and from Firestore's REST document format.
//!
//! Each field value is an object naming its type, e.g. `{"stringValue": "Offering"}`. Record
//! dates are stored as timestamps at local midnight, which is how the web app writes them, and
//! are read back as the local calendar date.

use crate::model::{
    Amount, Collection, ExpenseRecord, IncomeRecord, NewExpense, NewIncome, NewRecord, NewTithe,
    PaymentMethod, Record, RecordPatch, TitheRecord,
};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

pub(super) type Fields = Map<String, Value>;

pub(super) const DATE: &str = "date";
pub(super) const CREATED_AT: &str = "createdAt";
const CATEGORY: &str = "category";
const AMOUNT: &str = "amount";
const DESCRIPTION: &str = "description";
const MEMBER_NAME: &str = "memberName";
const PAYEE: &str = "payee";
const PAYMENT_METHOD: &str = "paymentMethod";
const RECORDED_BY: &str = "recordedByUserId";

/// A Firestore document as it appears in REST requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing)]
    pub create_time: Option<String>,
}

impl Document {
    /// The last segment of the document's resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

/// The fields written when a record is created. `createdAt` is left to the server.
pub(super) fn new_record_fields(record: &NewRecord, user_id: &str) -> Fields {
    let mut fields = match record {
        NewRecord::Income(r) => income_fields(r),
        NewRecord::Tithe(r) => tithe_fields(r),
        NewRecord::Expense(r) => expense_fields(r),
    };
    fields.insert(RECORDED_BY.to_string(), string(user_id));
    fields
}

fn income_fields(r: &NewIncome) -> Fields {
    let mut fields = Fields::new();
    fields.insert(DATE.to_string(), date_value(r.date));
    fields.insert(CATEGORY.to_string(), string(&r.category.to_string()));
    fields.insert(AMOUNT.to_string(), amount_value(r.amount));
    insert_opt(&mut fields, DESCRIPTION, r.description.as_deref());
    insert_opt(&mut fields, MEMBER_NAME, r.member_name.as_deref());
    fields
}

fn tithe_fields(r: &NewTithe) -> Fields {
    let mut fields = Fields::new();
    fields.insert(MEMBER_NAME.to_string(), string(&r.member_name));
    fields.insert(DATE.to_string(), date_value(r.date));
    fields.insert(AMOUNT.to_string(), amount_value(r.amount));
    fields
}

fn expense_fields(r: &NewExpense) -> Fields {
    let mut fields = Fields::new();
    fields.insert(DATE.to_string(), date_value(r.date));
    fields.insert(CATEGORY.to_string(), string(&r.category.to_string()));
    fields.insert(AMOUNT.to_string(), amount_value(r.amount));
    insert_opt(&mut fields, PAYEE, r.payee.as_deref());
    let method = r.payment_method.map(|m| m.to_string());
    insert_opt(&mut fields, PAYMENT_METHOD, method.as_deref());
    insert_opt(&mut fields, DESCRIPTION, r.description.as_deref());
    fields
}

/// The changed fields of a patch, and the field mask naming them.
pub(super) fn patch_fields(patch: &RecordPatch) -> (Fields, Vec<&'static str>) {
    let mut fields = Fields::new();
    match patch {
        RecordPatch::Tithe(p) => {
            insert_opt(&mut fields, MEMBER_NAME, p.member_name.as_deref());
            if let Some(date) = p.date {
                fields.insert(DATE.to_string(), date_value(date));
            }
            if let Some(amount) = p.amount {
                fields.insert(AMOUNT.to_string(), amount_value(amount));
            }
        }
        RecordPatch::Expense(p) => {
            if let Some(date) = p.date {
                fields.insert(DATE.to_string(), date_value(date));
            }
            if let Some(category) = p.category {
                fields.insert(CATEGORY.to_string(), string(&category.to_string()));
            }
            if let Some(amount) = p.amount {
                fields.insert(AMOUNT.to_string(), amount_value(amount));
            }
            insert_opt(&mut fields, PAYEE, p.payee.as_deref());
            let method = p.payment_method.map(|m| m.to_string());
            insert_opt(&mut fields, PAYMENT_METHOD, method.as_deref());
            insert_opt(&mut fields, DESCRIPTION, p.description.as_deref());
        }
    }
    let mask = [
        MEMBER_NAME,
        DATE,
        CATEGORY,
        AMOUNT,
        PAYEE,
        PAYMENT_METHOD,
        DESCRIPTION,
    ]
    .into_iter()
    .filter(|f| fields.contains_key(*f))
    .collect();
    (fields, mask)
}

/// Decodes a stored document of `collection`.
pub(super) fn record_from_document(collection: Collection, doc: &Document) -> Result<Record> {
    let id = doc.id().to_string();
    let f = &doc.fields;
    let record = match collection {
        Collection::Income => Record::Income(IncomeRecord {
            date: get_date(f)?,
            category: get_enum(f, CATEGORY)?,
            amount: get_amount(f)?,
            description: get_string(f, DESCRIPTION)?,
            member_name: get_string(f, MEMBER_NAME)?,
            recorded_by_user_id: required_string(f, RECORDED_BY)?,
            created_at: get_timestamp(f, CREATED_AT)?,
            id,
        }),
        Collection::Tithes => Record::Tithe(TitheRecord {
            member_name: required_string(f, MEMBER_NAME)?,
            date: get_date(f)?,
            amount: get_amount(f)?,
            recorded_by_user_id: required_string(f, RECORDED_BY)?,
            created_at: get_timestamp(f, CREATED_AT)?,
            id,
        }),
        Collection::Expenses => Record::Expense(ExpenseRecord {
            date: get_date(f)?,
            category: get_enum(f, CATEGORY)?,
            amount: get_amount(f)?,
            payee: get_string(f, PAYEE)?,
            payment_method: get_string(f, PAYMENT_METHOD)?
                .map(|s| PaymentMethod::from_str(&s))
                .transpose()
                .context("Invalid paymentMethod")?,
            description: get_string(f, DESCRIPTION)?,
            recorded_by_user_id: required_string(f, RECORDED_BY)?,
            created_at: get_timestamp(f, CREATED_AT)?,
            id,
        }),
    };
    Ok(record)
}

/// The start of the calendar day `date` in local time, as a UTC instant.
pub(super) fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub(super) fn timestamp_value(instant: DateTime<Utc>) -> Value {
    json!({ "timestampValue": instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true) })
}

fn date_value(date: NaiveDate) -> Value {
    timestamp_value(local_midnight(date))
}

fn string(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn amount_value(amount: Amount) -> Value {
    json!({ "doubleValue": amount.to_f64() })
}

fn insert_opt(fields: &mut Fields, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), string(value));
    }
}

/// Looks up a field, treating `nullValue` the same as an absent field.
fn get<'a>(fields: &'a Fields, key: &str) -> Option<&'a Map<String, Value>> {
    fields
        .get(key)
        .and_then(Value::as_object)
        .filter(|v| !v.contains_key("nullValue"))
}

/// A blank string reads as an absent field. The web app stores `""` for optional fields left
/// empty.
fn get_string(fields: &Fields, key: &str) -> Result<Option<String>> {
    let Some(value) = get(fields, key) else {
        return Ok(None);
    };
    let s = value
        .get("stringValue")
        .and_then(Value::as_str)
        .with_context(|| format!("Field '{key}' is not a string"))?;
    Ok(Some(s.to_string()).filter(|s| !s.trim().is_empty()))
}

fn required_string(fields: &Fields, key: &str) -> Result<String> {
    get_string(fields, key)?.with_context(|| format!("Field '{key}' is missing"))
}

fn get_enum<T>(fields: &Fields, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s = required_string(fields, key)?;
    T::from_str(&s).with_context(|| format!("Invalid {key} '{s}'"))
}

fn get_timestamp(fields: &Fields, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = get(fields, key) else {
        return Ok(None);
    };
    let s = value
        .get("timestampValue")
        .and_then(Value::as_str)
        .with_context(|| format!("Field '{key}' is not a timestamp"))?;
    let instant = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Field '{key}' has an invalid timestamp '{s}'"))?;
    Ok(Some(instant.with_timezone(&Utc)))
}

fn get_date(fields: &Fields) -> Result<NaiveDate> {
    let instant = get_timestamp(fields, DATE)?.context("Field 'date' is missing")?;
    Ok(instant.with_timezone(&Local).date_naive())
}

/// Reads the amount, which may have been written as a double or an integer. Values that are not
/// finite numbers are rejected rather than treated as zero.
fn get_amount(fields: &Fields) -> Result<Amount> {
    let value = get(fields, AMOUNT).context("Field 'amount' is missing")?;
    let number = if let Some(v) = value.get("doubleValue") {
        match v {
            Value::Number(n) => n.as_f64(),
            // Non-finite doubles are sent as the strings "NaN", "Infinity" and "-Infinity".
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    } else if let Some(v) = value.get("integerValue") {
        // 64 bit integers are sent as strings.
        match v {
            Value::String(s) => s.parse::<i64>().ok().map(|i| i as f64),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    } else {
        bail!("Field 'amount' is not a number");
    };
    let number = number.ok_or_else(|| anyhow!("Field 'amount' is not a number"))?;
    Amount::try_from_f64(number).context("Invalid amount")
}
