//! Feedback history records in DynamoDB, queried per user through the
//! `user_email` global secondary indexes.

use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;

pub const INDEX_BY_CREATED_AT: &str = "GSI_user_email_created_at";
pub const INDEX_BY_SCORE: &str = "GSI_user_email_score";

type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Score,
}

impl SortField {
    /// Anything other than `score` sorts by creation time.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("score") => SortField::Score,
            _ => SortField::CreatedAt,
        }
    }

    pub fn index_name(self) -> &'static str {
        match self {
            SortField::CreatedAt => INDEX_BY_CREATED_AT,
            SortField::Score => INDEX_BY_SCORE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub user_email: String,
    pub video_id: String,
    pub created_at: String,
    pub total_score: f64,
    pub interviewer_emoji: String,
    pub pdf_url: String,
}

impl FeedbackRecord {
    pub fn new(
        user_email: &str,
        video_id: &str,
        total_score: f64,
        interviewer_emoji: &str,
        pdf_url: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_email: user_email.to_string(),
            video_id: video_id.to_string(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            total_score,
            interviewer_emoji: interviewer_emoji.to_string(),
            pdf_url: pdf_url.to_string(),
        }
    }

    fn into_item(self) -> Item {
        HashMap::from([
            ("id".to_string(), AttributeValue::S(self.id)),
            ("user_email".to_string(), AttributeValue::S(self.user_email)),
            ("video_id".to_string(), AttributeValue::S(self.video_id)),
            ("created_at".to_string(), AttributeValue::S(self.created_at)),
            (
                "total_score".to_string(),
                AttributeValue::N(self.total_score.to_string()),
            ),
            (
                "interviewer_emoji".to_string(),
                AttributeValue::S(self.interviewer_emoji),
            ),
            ("pdf_url".to_string(), AttributeValue::S(self.pdf_url)),
        ])
    }
}

#[derive(Clone)]
pub struct FeedbackHistory {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl FeedbackHistory {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub async fn save(&self, record: FeedbackRecord) -> Result<(), AppError> {
        let id = record.id.clone();
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(record.into_item()))
            .send()
            .await
            .map_err(|e| {
                AppError::DocumentStore(format!(
                    "put_item into {} failed: {}",
                    self.table,
                    DisplayErrorContext(&e)
                ))
            })?;
        info!("Saved feedback record {id}");
        Ok(())
    }

    /// All of a user's records, ordered by the index's sort key.
    pub async fn list(
        &self,
        user_email: &str,
        sort: SortField,
        ascending: bool,
    ) -> Result<Vec<Value>, AppError> {
        let items = self
            .query_user(user_email, sort.index_name(), ascending, None)
            .await?;
        Ok(items.iter().map(item_to_json).collect())
    }

    pub async fn has_video(&self, user_email: &str, video_id: &str) -> Result<bool, AppError> {
        let items = self
            .query_user(user_email, INDEX_BY_CREATED_AT, false, Some(video_id))
            .await?;
        Ok(!items.is_empty())
    }

    async fn query_user(
        &self,
        user_email: &str,
        index: &str,
        ascending: bool,
        video_id: Option<&str>,
    ) -> Result<Vec<Item>, AppError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut query = self
                .client
                .query()
                .table_name(&self.table)
                .index_name(index)
                .key_condition_expression("user_email = :email")
                .expression_attribute_values(":email", AttributeValue::S(user_email.to_string()))
                .scan_index_forward(ascending)
                .set_exclusive_start_key(start_key.take());
            if let Some(video_id) = video_id {
                query = query
                    .filter_expression("video_id = :video_id")
                    .expression_attribute_values(
                        ":video_id",
                        AttributeValue::S(video_id.to_string()),
                    );
            }

            let output = query.send().await.map_err(|e| {
                AppError::DocumentStore(format!(
                    "query {}/{index} failed: {}",
                    self.table,
                    DisplayErrorContext(&e)
                ))
            })?;

            items.extend(output.items().iter().cloned());
            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!("{index} returned {} records for {user_email}", items.len());
        Ok(items)
    }
}

/// Plain JSON view of a DynamoDB item. Numbers become JSON numbers.
pub fn item_to_json(item: &Item) -> Value {
    let map: Map<String, Value> = item
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();
    Value::Object(map)
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n).unwrap_or_else(|| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => item_to_json(map),
        AttributeValue::Ss(set) => Value::from(set.clone()),
        AttributeValue::Ns(set) => Value::Array(
            set.iter()
                .map(|n| parse_number(n).unwrap_or_else(|| Value::String(n.clone())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!(SortField::parse(Some("score")), SortField::Score);
        assert_eq!(SortField::parse(Some("created_at")), SortField::CreatedAt);
        assert_eq!(SortField::parse(Some("bogus")), SortField::CreatedAt);
        assert_eq!(SortField::parse(None).index_name(), INDEX_BY_CREATED_AT);
        assert_eq!(SortField::Score.index_name(), INDEX_BY_SCORE);
    }

    #[test]
    fn test_record_item_round_trips_to_json() {
        let created = Utc.with_ymd_and_hms(2025, 6, 14, 9, 30, 0).unwrap();
        let record = FeedbackRecord::new("kim@example.com", "0614-2", 81.5, "🙂", "https://x/r.pdf", created);
        let value = item_to_json(&record.into_item());
        assert_eq!(value["user_email"], "kim@example.com");
        assert_eq!(value["total_score"], 81.5);
        assert_eq!(value["created_at"], "2025-06-14T09:30:00.000000Z");
        assert_eq!(value["id"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_integer_scores_stay_integers() {
        let item = HashMap::from([("total_score".to_string(), AttributeValue::N("80".into()))]);
        assert_eq!(item_to_json(&item)["total_score"], 80);
    }
}
