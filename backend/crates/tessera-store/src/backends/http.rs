//! DynamoDB JSON 1.0 protocol client.
//!
//! Talks to DynamoDB-compatible endpoints that accept unsigned requests
//! (DynamoDB Local, LocalStack, caching proxies in front of them). Every call
//! is a `POST /` with `X-Amz-Target: DynamoDB_20120810.<Operation>`.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Map, Value};
use tessera_commons::Item;
use tessera_configs::BackendSettings;

use crate::backend_trait::TableBackend;
use crate::error::BackendError;
use crate::types::{
    BatchGetOutput, BatchWriteOutput, Condition, KeysByTable, PutItemRequest, QueryRequest,
    TableDescription, TableSchema, TableStatus, WriteRequestsByTable,
};

const TARGET_PREFIX: &str = "DynamoDB_20120810";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub request_timeout: Duration,
    /// Sends per call, counting the first, for throttled or transport failures.
    pub max_attempts: u32,
}

impl HttpBackendConfig {
    pub fn from_settings(endpoint: &str, settings: &BackendSettings) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: settings.region.clone(),
            access_key_id: settings.access_key_id.clone(),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
            max_attempts: 3,
        }
    }
}

pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Send one operation, resending throttled or transport failures with
    /// exponential backoff.
    async fn call(&self, operation: &str, body: Value) -> Result<Value, BackendError> {
        const INITIAL_BACKOFF_MS: u64 = 50;

        let attempts = self.config.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 0..attempts {
            match self.call_once(operation, &body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    debug!(
                        "{} against {} failed (attempt {}/{}): {}",
                        operation,
                        self.config.endpoint,
                        attempt + 1,
                        attempts,
                        err
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }

            if attempt + 1 < attempts {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }

        let err = last_error.unwrap_or_else(|| {
            BackendError::Transport(format!("{} was never sent", operation))
        });
        warn!("{} against {} gave up: {}", operation, self.config.endpoint, err);
        Err(err)
    }

    async fn call_once(&self, operation: &str, body: &Value) -> Result<Value, BackendError> {
        let now = chrono::Utc::now();
        let response = self
            .client
            .post(format!("{}/", self.config.endpoint))
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header("X-Amz-Date", now.format("%Y%m%dT%H%M%SZ").to_string())
            .header("Authorization", self.authorization(&now.format("%Y%m%d").to_string()))
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            return serde_json::from_str(&text)
                .map_err(|e| BackendError::Transport(format!("invalid {} response: {}", operation, e)));
        }

        Err(parse_error(status.as_u16(), &text))
    }

    /// Placeholder credential scope. Target endpoints do not verify signatures.
    fn authorization(&self, date: &str) -> String {
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}/{}/dynamodb/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature=unsigned",
            self.config.access_key_id, date, self.config.region
        )
    }
}

fn parse_error(status: u16, body: &str) -> BackendError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = parsed
        .get("message")
        .or_else(|| parsed.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();

    match parsed.get("__type").and_then(Value::as_str) {
        Some(error_type) => BackendError::from_service(error_type, message),
        None if status >= 500 => BackendError::Service {
            code: format!("HTTP {}", status),
            message,
        },
        None => BackendError::Validation(format!("HTTP {}: {}", status, message)),
    }
}

fn table_status(value: &Value, field: &str) -> Result<TableStatus, BackendError> {
    value
        .get(field)
        .and_then(|t| t.get("TableStatus"))
        .and_then(Value::as_str)
        .and_then(TableStatus::from_wire)
        .ok_or_else(|| BackendError::Transport(format!("response missing {}.TableStatus", field)))
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, BackendError> {
    serde_json::from_value(value)
        .map_err(|e| BackendError::Transport(format!("invalid {} in response: {}", what, e)))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value).map_err(|e| BackendError::Validation(e.to_string()))
}

fn key_schema(hash: &str, range: Option<&str>) -> Value {
    let mut schema = vec![json!({"AttributeName": hash, "KeyType": "HASH"})];
    if let Some(range) = range {
        schema.push(json!({"AttributeName": range, "KeyType": "RANGE"}));
    }
    Value::Array(schema)
}

fn create_table_body(schema: &TableSchema) -> Value {
    let definitions: Vec<Value> = schema
        .attribute_definitions()
        .into_iter()
        .map(|attr| json!({"AttributeName": attr.name, "AttributeType": attr.scalar_type.as_str()}))
        .collect();

    let mut body = json!({
        "TableName": schema.table_name,
        "AttributeDefinitions": definitions,
        "KeySchema": key_schema(
            &schema.hash_key.name,
            schema.range_key.as_ref().map(|r| r.name.as_str()),
        ),
        "BillingMode": "PAY_PER_REQUEST",
    });

    if !schema.global_secondary_indexes.is_empty() {
        let indexes: Vec<Value> = schema
            .global_secondary_indexes
            .iter()
            .map(|index| {
                json!({
                    "IndexName": index.index_name,
                    "KeySchema": key_schema(
                        &index.hash_key.name,
                        index.range_key.as_ref().map(|r| r.name.as_str()),
                    ),
                    "Projection": {"ProjectionType": "ALL"},
                })
            })
            .collect();
        body["GlobalSecondaryIndexes"] = Value::Array(indexes);
    }
    body
}

fn put_item_body(request: &PutItemRequest) -> Result<Value, BackendError> {
    let mut body = json!({
        "TableName": request.table,
        "Item": encode(&request.item)?,
    });
    match &request.condition {
        Some(Condition::AttributeNotExists(name)) => {
            body["ConditionExpression"] = json!("attribute_not_exists(#c)");
            body["ExpressionAttributeNames"] = json!({"#c": name});
        }
        Some(Condition::AttributeEquals { name, value }) => {
            body["ConditionExpression"] = json!("#c = :c");
            body["ExpressionAttributeNames"] = json!({"#c": name});
            body["ExpressionAttributeValues"] = json!({":c": encode(value)?});
        }
        None => {}
    }
    Ok(body)
}

fn query_body(request: &QueryRequest) -> Result<Value, BackendError> {
    let mut names = Map::new();
    let mut values = Map::new();
    let mut clauses = Vec::with_capacity(request.key_conditions.len());
    for (i, (name, value)) in request.key_conditions.iter().enumerate() {
        names.insert(format!("#k{}", i), json!(name));
        values.insert(format!(":k{}", i), encode(value)?);
        clauses.push(format!("#k{} = :k{}", i, i));
    }

    let mut body = json!({
        "TableName": request.table,
        "KeyConditionExpression": clauses.join(" AND "),
        "ExpressionAttributeNames": names,
        "ExpressionAttributeValues": values,
    });
    if let Some(index) = &request.index {
        body["IndexName"] = json!(index);
    }
    Ok(body)
}

#[async_trait]
impl TableBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.config.endpoint
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescription, BackendError> {
        let response = self.call("DescribeTable", json!({"TableName": table})).await?;
        Ok(TableDescription {
            table_name: table.to_string(),
            status: table_status(&response, "Table")?,
        })
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription, BackendError> {
        let response = self.call("CreateTable", create_table_body(schema)).await?;
        Ok(TableDescription {
            table_name: schema.table_name.clone(),
            status: table_status(&response, "TableDescription")?,
        })
    }

    async fn delete_table(&self, table: &str) -> Result<(), BackendError> {
        self.call("DeleteTable", json!({"TableName": table})).await?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, BackendError> {
        let mut tables = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let mut body = json!({});
            if let Some(start) = &start {
                body["ExclusiveStartTableName"] = json!(start);
            }
            let response = self.call("ListTables", body).await?;
            let page: Vec<String> = decode(
                response.get("TableNames").cloned().unwrap_or_else(|| json!([])),
                "TableNames",
            )?;
            tables.extend(page);

            start = response
                .get("LastEvaluatedTableName")
                .and_then(Value::as_str)
                .map(str::to_string);
            if start.is_none() {
                return Ok(tables);
            }
        }
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), BackendError> {
        self.call("PutItem", put_item_body(&request)?).await?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, BackendError> {
        let body = json!({"TableName": table, "Key": encode(key)?, "ConsistentRead": true});
        let mut response = self.call("GetItem", body).await?;
        match response.get_mut("Item").map(Value::take) {
            Some(item) => Ok(Some(decode(item, "Item")?)),
            None => Ok(None),
        }
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<Item>, BackendError> {
        let base = query_body(&request)?;
        let mut items = Vec::new();
        let mut start_key: Option<Value> = None;
        loop {
            let mut body = base.clone();
            if let Some(key) = start_key.take() {
                body["ExclusiveStartKey"] = key;
            }
            let mut response = self.call("Query", body).await?;
            if let Some(page) = response.get_mut("Items").map(Value::take) {
                let page: Vec<Item> = decode(page, "Items")?;
                items.extend(page);
            }
            match response.get_mut("LastEvaluatedKey").map(Value::take) {
                Some(key) if !key.is_null() => start_key = Some(key),
                _ => return Ok(items),
            }
        }
    }

    async fn batch_write(
        &self,
        request_items: WriteRequestsByTable,
    ) -> Result<BatchWriteOutput, BackendError> {
        let body = json!({"RequestItems": encode(&request_items)?});
        let response = self.call("BatchWriteItem", body).await?;
        decode(response, "BatchWriteItem output")
    }

    async fn batch_get(&self, request_keys: KeysByTable) -> Result<BatchGetOutput, BackendError> {
        let body = json!({"RequestItems": encode(&request_keys)?});
        let response = self.call("BatchGetItem", body).await?;
        decode(response, "BatchGetItem output")
    }
}
