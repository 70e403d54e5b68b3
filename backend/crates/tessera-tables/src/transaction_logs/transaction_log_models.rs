//! Transaction log record and its enum vocabularies.
//!
//! Enum fields are persisted as small number codes; the mapping is fixed and
//! shared with every reader of the shard tables.

use std::fmt;

use tessera_commons::Decimal;

macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(&self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: u64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

coded_enum!(
    /// Processing state of a transaction.
    TransactionStatus {
        Processing = 1 => "processing",
        Complete = 2 => "complete",
        Failed = 3 => "failed",
        WaitingForMining = 4 => "waiting_for_mining",
    }
);

coded_enum!(
    TransactionType {
        TokenTransfer = 1 => "token_transfer",
        StpTransfer = 2 => "stp_transfer",
        ExternalTokenTransfer = 3 => "external_token_transfer",
    }
);

coded_enum!(
    /// Chain a transaction was submitted to.
    ChainType {
        Value = 1 => "value",
        Utility = 2 => "utility",
    }
);

/// One token movement emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from_uuid: Option<String>,
    pub to_uuid: Option<String>,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
}

impl TransferEvent {
    pub fn new(from_address: impl Into<String>, to_address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from_uuid: None,
            to_uuid: None,
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
        }
    }
}

/// A transaction log row.
///
/// Only `transaction_uuid` is required. `None` fields are not written at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLog {
    pub transaction_uuid: String,
    pub transaction_hash: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub block_number: Option<u64>,
    pub client_id: Option<u64>,
    pub client_token_id: Option<u64>,
    pub gas_used: Option<u64>,
    pub gas_price: Option<Decimal>,
    pub status: Option<TransactionStatus>,
    /// Unix epoch seconds.
    pub created_at: Option<i64>,
    pub from_uuid: Option<String>,
    pub to_uuid: Option<String>,
    pub action_id: Option<u64>,
    pub token_symbol: Option<String>,
    /// Opaque JSON handed to the receipt processor.
    pub post_receipt_process_params: Option<String>,
    pub commission_percent: Option<Decimal>,
    pub commission_amount_in_wei: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub amount_in_wei: Option<Decimal>,
    pub to_address: Option<String>,
    pub from_address: Option<String>,
    pub bt_transfer_in_wei: Option<Decimal>,
    pub transfer_events: Option<Vec<TransferEvent>>,
    pub error_code: Option<String>,
}

impl TransactionLog {
    pub fn new(transaction_uuid: impl Into<String>) -> Self {
        Self {
            transaction_uuid: transaction_uuid.into(),
            ..Self::default()
        }
    }
}
