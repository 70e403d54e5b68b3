//! Wire format and physical schema of transaction log shards.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use tessera_commons::{
    decode_item, CodecError, DecodedRecord, Item, LogicalValue, NameMap, RecordEncoder,
};
use tessera_store::{KeyAttribute, TableSchema};

use super::transaction_log_models::{
    TransactionLog, TransactionStatus, TransactionType, TransferEvent,
};

/// Secondary index on the transaction hash.
pub const TRANSACTION_HASH_INDEX: &str = "thash_global_secondary_index";

const TRANSACTION_HASH: &str = "transaction_hash";
const TRANSACTION_UUID: &str = "transaction_uuid";
const TRANSACTION_TYPE: &str = "transaction_type";
const BLOCK_NUMBER: &str = "block_number";
const CLIENT_ID: &str = "client_id";
const CLIENT_TOKEN_ID: &str = "client_token_id";
const GAS_USED: &str = "gas_used";
const GAS_PRICE: &str = "gas_price";
const STATUS: &str = "status";
const CREATED_AT: &str = "created_at";
const FROM_UUID: &str = "from_uuid";
const TO_UUID: &str = "to_uuid";
const ACTION_ID: &str = "action_id";
const TOKEN_SYMBOL: &str = "token_symbol";
const POST_RECEIPT_PROCESS_PARAMS: &str = "post_receipt_process_params";
const COMMISSION_PERCENT: &str = "commission_percent";
const COMMISSION_AMOUNT_IN_WEI: &str = "commission_amount_in_wei";
const AMOUNT: &str = "amount";
const AMOUNT_IN_WEI: &str = "amount_in_wei";
const TO_ADDRESS: &str = "to_address";
const FROM_ADDRESS: &str = "from_address";
const BT_TRANSFER_IN_WEI: &str = "bt_transfer_in_wei";
const TRANSFER_EVENTS: &str = "transfer_events";
const ERROR_CODE: &str = "error_code";

static PAIRS: &[(&str, &str)] = &[
    (TRANSACTION_HASH, "txh"),
    (TRANSACTION_UUID, "txu"),
    (TRANSACTION_TYPE, "tt"),
    (BLOCK_NUMBER, "bn"),
    (CLIENT_ID, "ci"),
    (CLIENT_TOKEN_ID, "cti"),
    (GAS_USED, "gu"),
    (GAS_PRICE, "gp"),
    (STATUS, "s"),
    (CREATED_AT, "ca"),
    (FROM_UUID, "fu"),
    (TO_UUID, "tu"),
    (ACTION_ID, "ai"),
    (TOKEN_SYMBOL, "ts"),
    (POST_RECEIPT_PROCESS_PARAMS, "prpp"),
    (COMMISSION_PERCENT, "cp"),
    (COMMISSION_AMOUNT_IN_WEI, "caiw"),
    (AMOUNT, "a"),
    (AMOUNT_IN_WEI, "aiw"),
    (TO_ADDRESS, "ta"),
    (FROM_ADDRESS, "fa"),
    (BT_TRANSFER_IN_WEI, "btiw"),
    (TRANSFER_EVENTS, "te"),
    (ERROR_CODE, "ec"),
];

pub static TRANSACTION_LOG_NAMES: Lazy<NameMap> = Lazy::new(|| NameMap::new(PAIRS));

fn short(long_name: &str) -> String {
    TRANSACTION_LOG_NAMES
        .short_name_for(long_name)
        .unwrap_or(long_name)
        .to_string()
}

/// Physical table of one transaction log shard: hash key `txu`, index on `txh`.
pub fn transaction_log_table_definition(shard_name: &str) -> TableSchema {
    TableSchema::new(shard_name, KeyAttribute::string(short(TRANSACTION_UUID))).with_index(
        TRANSACTION_HASH_INDEX,
        KeyAttribute::string(short(TRANSACTION_HASH)),
        None,
    )
}

/// Primary key item for a transaction uuid, lower-cased.
pub fn transaction_log_key(transaction_uuid: &str) -> Result<Item, CodecError> {
    let mut encoder = RecordEncoder::new(&TRANSACTION_LOG_NAMES);
    encoder.key(TRANSACTION_UUID, transaction_uuid)?;
    Ok(encoder.finish())
}

fn encode_transfer_event(event: &TransferEvent) -> LogicalValue {
    let mut fields = BTreeMap::new();
    if let Some(from_uuid) = &event.from_uuid {
        fields.insert(FROM_UUID.to_string(), LogicalValue::from(from_uuid));
    }
    if let Some(to_uuid) = &event.to_uuid {
        fields.insert(TO_UUID.to_string(), LogicalValue::from(to_uuid));
    }
    fields.insert(FROM_ADDRESS.to_string(), LogicalValue::from(&event.from_address));
    fields.insert(TO_ADDRESS.to_string(), LogicalValue::from(&event.to_address));
    fields.insert(AMOUNT.to_string(), LogicalValue::from(&event.amount));
    LogicalValue::Map(fields)
}

pub fn encode_transaction_log(log: &TransactionLog) -> Result<Item, CodecError> {
    let mut encoder = RecordEncoder::new(&TRANSACTION_LOG_NAMES);
    encoder.key(TRANSACTION_UUID, &log.transaction_uuid)?;
    if let Some(hash) = &log.transaction_hash {
        encoder.key(TRANSACTION_HASH, hash)?;
    }
    encoder
        .optional(TRANSACTION_TYPE, log.transaction_type.map(|t| t.code()))?
        .optional(BLOCK_NUMBER, log.block_number)?
        .optional(CLIENT_ID, log.client_id)?
        .optional(CLIENT_TOKEN_ID, log.client_token_id)?
        .optional(GAS_USED, log.gas_used)?
        .optional(GAS_PRICE, log.gas_price.as_ref())?
        .optional(STATUS, log.status.map(|s| s.code()))?
        .optional(CREATED_AT, log.created_at)?
        .optional(FROM_UUID, log.from_uuid.as_deref())?
        .optional(TO_UUID, log.to_uuid.as_deref())?
        .optional(ACTION_ID, log.action_id)?
        .optional(TOKEN_SYMBOL, log.token_symbol.as_deref())?
        .optional(POST_RECEIPT_PROCESS_PARAMS, log.post_receipt_process_params.as_deref())?
        .optional(COMMISSION_PERCENT, log.commission_percent.as_ref())?
        .optional(COMMISSION_AMOUNT_IN_WEI, log.commission_amount_in_wei.as_ref())?
        .optional(AMOUNT, log.amount.as_ref())?
        .optional(AMOUNT_IN_WEI, log.amount_in_wei.as_ref())?
        .optional(TO_ADDRESS, log.to_address.as_deref())?
        .optional(FROM_ADDRESS, log.from_address.as_deref())?
        .optional(BT_TRANSFER_IN_WEI, log.bt_transfer_in_wei.as_ref())?
        .optional(
            TRANSFER_EVENTS,
            log.transfer_events
                .as_ref()
                .map(|events| events.iter().map(encode_transfer_event).collect::<Vec<_>>()),
        )?
        .optional(ERROR_CODE, log.error_code.as_deref())?;
    Ok(encoder.finish())
}

fn invalid(field: &str, message: String) -> CodecError {
    CodecError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn decode_transfer_event(value: &LogicalValue) -> Result<TransferEvent, CodecError> {
    let LogicalValue::Map(fields) = value else {
        return Err(CodecError::TypeMismatch {
            field: TRANSFER_EVENTS.to_string(),
            expected: "map",
            found: value.kind(),
        });
    };
    let event = DecodedRecord::from_fields(fields.clone());
    Ok(TransferEvent {
        from_uuid: event.string(FROM_UUID)?,
        to_uuid: event.string(TO_UUID)?,
        from_address: event.require_string(FROM_ADDRESS)?,
        to_address: event.require_string(TO_ADDRESS)?,
        amount: event
            .number(AMOUNT)?
            .ok_or_else(|| CodecError::MissingField(AMOUNT.to_string()))?,
    })
}

pub fn decode_transaction_log(item: &Item) -> Result<TransactionLog, CodecError> {
    let record = decode_item(&TRANSACTION_LOG_NAMES, item)?;

    let transaction_type = record
        .u64(TRANSACTION_TYPE)?
        .map(|code| {
            TransactionType::from_code(code)
                .ok_or_else(|| invalid(TRANSACTION_TYPE, format!("unknown code {}", code)))
        })
        .transpose()?;
    let status = record
        .u64(STATUS)?
        .map(|code| {
            TransactionStatus::from_code(code)
                .ok_or_else(|| invalid(STATUS, format!("unknown code {}", code)))
        })
        .transpose()?;
    let transfer_events = record
        .list(TRANSFER_EVENTS)?
        .map(|events| events.iter().map(decode_transfer_event).collect::<Result<Vec<_>, _>>())
        .transpose()?;

    Ok(TransactionLog {
        transaction_uuid: record.require_string(TRANSACTION_UUID)?,
        transaction_hash: record.string(TRANSACTION_HASH)?,
        transaction_type,
        block_number: record.u64(BLOCK_NUMBER)?,
        client_id: record.u64(CLIENT_ID)?,
        client_token_id: record.u64(CLIENT_TOKEN_ID)?,
        gas_used: record.u64(GAS_USED)?,
        gas_price: record.number(GAS_PRICE)?,
        status,
        created_at: record.i64(CREATED_AT)?,
        from_uuid: record.string(FROM_UUID)?,
        to_uuid: record.string(TO_UUID)?,
        action_id: record.u64(ACTION_ID)?,
        token_symbol: record.string(TOKEN_SYMBOL)?,
        post_receipt_process_params: record.string(POST_RECEIPT_PROCESS_PARAMS)?,
        commission_percent: record.number(COMMISSION_PERCENT)?,
        commission_amount_in_wei: record.number(COMMISSION_AMOUNT_IN_WEI)?,
        amount: record.number(AMOUNT)?,
        amount_in_wei: record.number(AMOUNT_IN_WEI)?,
        to_address: record.string(TO_ADDRESS)?,
        from_address: record.string(FROM_ADDRESS)?,
        bt_transfer_in_wei: record.number(BT_TRANSFER_IN_WEI)?,
        transfer_events,
        error_code: record.string(ERROR_CODE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_commons::{AttributeValue, Decimal};

    fn sample() -> TransactionLog {
        TransactionLog {
            transaction_hash: Some("0xABCDEF".to_string()),
            status: Some(TransactionStatus::Complete),
            transaction_type: Some(TransactionType::TokenTransfer),
            client_id: Some(1001),
            amount_in_wei: Decimal::parse("1000000000000000000000"),
            transfer_events: Some(vec![TransferEvent::new(
                "0xfrom",
                "0xto",
                Decimal::parse("12.5").unwrap(),
            )]),
            ..TransactionLog::new("8F2E-11AA")
        }
    }

    #[test]
    fn test_vocabulary_is_bijective() {
        assert_eq!(TRANSACTION_LOG_NAMES.len(), 24);
        assert!(TRANSACTION_LOG_NAMES.is_bijective());
        assert_eq!(TRANSACTION_LOG_NAMES.short_name_for("error_code"), Some("ec"));
    }

    #[test]
    fn test_encode_uses_short_names_and_codes() {
        let item = encode_transaction_log(&sample()).unwrap();

        assert_eq!(item["txu"], AttributeValue::string("8f2e-11aa"));
        assert_eq!(item["txh"], AttributeValue::string("0xabcdef"));
        assert_eq!(item["s"], AttributeValue::number(2));
        assert_eq!(item["tt"], AttributeValue::number(1));
        assert_eq!(item["aiw"].as_number(), Some("1000000000000000000000"));
        assert!(!item.contains_key("ec"));
        assert!(!item.contains_key("bn"));

        let events = item["te"].as_list().unwrap();
        let event = events[0].as_map().unwrap();
        assert_eq!(event["fa"], AttributeValue::string("0xfrom"));
        assert_eq!(event["a"].as_number(), Some("12.5"));
        assert!(!event.contains_key("fu"));
    }

    #[test]
    fn test_decode_restores_record() {
        let item = encode_transaction_log(&sample()).unwrap();
        let decoded = decode_transaction_log(&item).unwrap();

        let mut expected = sample();
        expected.transaction_uuid = "8f2e-11aa".to_string();
        expected.transaction_hash = Some("0xabcdef".to_string());
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_decode_rejects_unknown_status_code() {
        let mut item = transaction_log_key("u-1").unwrap();
        item.insert("s".to_string(), AttributeValue::number(9));
        assert!(matches!(
            decode_transaction_log(&item),
            Err(CodecError::InvalidValue { field, .. }) if field == "status"
        ));
    }

    #[test]
    fn test_decode_skips_foreign_attributes() {
        let mut item = transaction_log_key("u-1").unwrap();
        item.insert("zz".to_string(), AttributeValue::string("ignored"));
        let decoded = decode_transaction_log(&item).unwrap();
        assert_eq!(decoded, TransactionLog::new("u-1"));
    }

    #[test]
    fn test_table_definition() {
        let schema = transaction_log_table_definition("tl_shard_1");
        assert_eq!(schema.table_name, "tl_shard_1");
        assert_eq!(schema.hash_key.name, "txu");
        assert_eq!(schema.index(TRANSACTION_HASH_INDEX).unwrap().hash_key.name, "txh");
    }
}
