//! Node client object model
//!
//! Requests, replies and push updates exchanged with the node client,
//! in its JSON form: every object carries an `@type` tag, 64-bit integers
//! travel as strings and byte strings as base64.

pub mod secure;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CliError, CliResult};
pub use secure::SecureBytes;

//-----------------------------------------------------------------------------
// Field Encodings
//-----------------------------------------------------------------------------

/// `int64` fields: written as strings, read from strings or numbers
pub mod int64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
            Repr::Number(number) => Ok(number),
        }
    }
}

/// `bytes` fields: standard base64
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(de::Error::custom)
    }
}

//-----------------------------------------------------------------------------
// Shared Objects
//-----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAddress {
    pub account_address: String,
}

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            account_address: address.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub config: String,
    pub blockchain_name: String,
    pub use_callbacks_for_network: bool,
    pub ignore_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum KeyStoreType {
    #[serde(rename = "keyStoreTypeDirectory")]
    Directory { directory: String },
    #[serde(rename = "keyStoreTypeInMemory")]
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub config: Option<Config>,
    pub keystore_type: KeyStoreType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub public_key: String,
    pub secret: SecureBytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum InputKey {
    #[serde(rename = "inputKeyRegular")]
    Regular { key: Key, local_password: SecureBytes },
    #[serde(rename = "inputKeyFake")]
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedKey {
    pub word_list: Vec<SecureBytes>,
}

/// Error object as sent back for relayed queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type", rename = "error")]
pub struct TonError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum MsgData {
    #[serde(rename = "msg.dataText")]
    Text {
        #[serde(with = "base64_bytes")]
        text: Vec<u8>,
    },
    #[serde(rename = "msg.dataDecryptedText")]
    DecryptedText {
        #[serde(with = "base64_bytes")]
        text: Vec<u8>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgMessage {
    pub destination: AccountAddress,
    pub public_key: String,
    #[serde(with = "int64")]
    pub amount: i64,
    pub data: MsgData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Action {
    #[serde(rename = "actionMsg")]
    Msg {
        messages: Vec<MsgMessage>,
        allow_send_to_uninited: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum MethodId {
    #[serde(rename = "smc.methodIdNumber")]
    Number { number: i32 },
    #[serde(rename = "smc.methodIdName")]
    Name { name: String },
}

impl MethodId {
    /// Numeric ids for all-digit words, names otherwise
    pub fn parse(word: &str) -> CliResult<Self> {
        if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) {
            let number = word
                .parse()
                .map_err(|_| CliError::validation(format!("Method id {} is out of range", word)))?;
            Ok(MethodId::Number { number })
        } else if word.is_empty() {
            Err(CliError::validation("Method is not specified"))
        } else {
            Ok(MethodId::Name { name: word.to_string() })
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodId::Number { number } => write!(f, "method #{}", number),
            MethodId::Name { name } => write!(f, "method `{}`", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvmCell {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvmSlice {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvmNumber {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvmElements {
    pub elements: Vec<StackEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum StackEntry {
    #[serde(rename = "tvm.stackEntrySlice")]
    Slice { slice: TvmSlice },
    #[serde(rename = "tvm.stackEntryCell")]
    Cell { cell: TvmCell },
    #[serde(rename = "tvm.stackEntryNumber")]
    Number { number: TvmNumber },
    #[serde(rename = "tvm.stackEntryTuple")]
    Tuple { tuple: TvmElements },
    #[serde(rename = "tvm.stackEntryList")]
    List { list: TvmElements },
    #[serde(rename = "tvm.stackEntryUnsupported", other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionId {
    #[serde(with = "int64")]
    pub lt: i64,
    #[serde(with = "base64_bytes")]
    pub hash: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fees {
    pub in_fwd_fee: i64,
    pub storage_fee: i64,
    pub gas_fee: i64,
    pub fwd_fee: i64,
}

impl fmt::Display for Fees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in_fwd_fee: {}, storage_fee: {}, gas_fee: {}, fwd_fee: {}",
            self.in_fwd_fee, self.storage_fee, self.gas_fee, self.fwd_fee
        )
    }
}

//-----------------------------------------------------------------------------
// Requests
//-----------------------------------------------------------------------------

/// Functions understood by the node client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "@type")]
pub enum Request {
    #[serde(rename = "init")]
    Init { options: Options },
    #[serde(rename = "liteServer.getInfo")]
    LiteServerGetInfo,
    #[serde(rename = "options.setConfig")]
    SetConfig { config: Config },
    #[serde(rename = "options.validateConfig")]
    ValidateConfig { config: Config },
    #[serde(rename = "sync")]
    Sync,
    #[serde(rename = "onLiteServerQueryResult")]
    LiteServerQueryResult {
        #[serde(with = "int64")]
        id: i64,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    #[serde(rename = "onLiteServerQueryError")]
    LiteServerQueryError {
        #[serde(with = "int64")]
        id: i64,
        error: TonError,
    },
    #[serde(rename = "createNewKey")]
    CreateNewKey {
        local_password: SecureBytes,
        mnemonic_password: SecureBytes,
        random_extra_seed: SecureBytes,
    },
    #[serde(rename = "deleteAllKeys")]
    DeleteAllKeys,
    #[serde(rename = "exportKey")]
    ExportKey { input_key: InputKey },
    #[serde(rename = "exportPemKey")]
    ExportPemKey { input_key: InputKey, key_password: SecureBytes },
    #[serde(rename = "exportUnencryptedKey")]
    ExportUnencryptedKey { input_key: InputKey },
    #[serde(rename = "importKey")]
    ImportKey {
        local_password: SecureBytes,
        mnemonic_password: SecureBytes,
        exported_key: ExportedKey,
    },
    #[serde(rename = "getBip39Hints")]
    GetBip39Hints { prefix: String },
    #[serde(rename = "raw.sendMessage")]
    RawSendMessage {
        #[serde(with = "base64_bytes")]
        body: Vec<u8>,
    },
    #[serde(rename = "raw.createQuery")]
    RawCreateQuery {
        destination: AccountAddress,
        #[serde(with = "base64_bytes")]
        init_code: Vec<u8>,
        #[serde(with = "base64_bytes")]
        init_data: Vec<u8>,
        #[serde(with = "base64_bytes")]
        body: Vec<u8>,
    },
    #[serde(rename = "getAccountState")]
    GetAccountState { account_address: AccountAddress },
    #[serde(rename = "createQuery")]
    CreateQuery {
        private_key: Option<InputKey>,
        address: AccountAddress,
        timeout: i32,
        action: Action,
    },
    #[serde(rename = "query.estimateFees")]
    QueryEstimateFees { id: i64, ignore_chksig: bool },
    #[serde(rename = "query.send")]
    QuerySend { id: i64 },
    #[serde(rename = "smc.load")]
    SmcLoad { account_address: AccountAddress },
    #[serde(rename = "smc.getCode")]
    SmcGetCode { id: i64 },
    #[serde(rename = "smc.getData")]
    SmcGetData { id: i64 },
    #[serde(rename = "smc.getState")]
    SmcGetState { id: i64 },
    #[serde(rename = "smc.runGetMethod")]
    SmcRunGetMethod {
        id: i64,
        method: MethodId,
        stack: Vec<StackEntry>,
    },
    #[serde(rename = "unpackAccountAddress")]
    UnpackAccountAddress { account_address: String },
    #[serde(rename = "packAccountAddress")]
    PackAccountAddress { account_address: UnpackedAccountAddress },
}

//-----------------------------------------------------------------------------
// Replies
//-----------------------------------------------------------------------------

/// Reply to requests without a meaningful result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledged;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    #[serde(with = "int64")]
    pub default_wallet_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsInfo {
    pub config_info: ConfigInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteServerInfo {
    pub now: i64,
    pub version: i32,
    #[serde(with = "int64")]
    pub capabilities: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPemKey {
    pub pem: SecureBytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedUnencryptedKey {
    pub data: SecureBytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bip39Hints {
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAccountState {
    pub address: AccountAddress,
    #[serde(with = "int64")]
    pub balance: i64,
    pub last_transaction_id: TransactionId,
    pub sync_utime: i64,
    pub account_state: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    pub id: i64,
    pub valid_until: i64,
    #[serde(with = "base64_bytes")]
    pub body_hash: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFees {
    pub source_fees: Fees,
    pub destination_fees: Vec<Fees>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmcInfo {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmcRunResult {
    pub gas_used: i64,
    pub stack: Vec<StackEntry>,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackedAccountAddress {
    pub workchain_id: i32,
    pub bounceable: bool,
    pub testnet: bool,
    #[serde(with = "base64_bytes")]
    pub addr: Vec<u8>,
}

/// Any object the node client may answer with
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "@type")]
pub enum Response {
    #[serde(rename = "ok")]
    Acknowledged,
    #[serde(rename = "options.info")]
    OptionsInfo(OptionsInfo),
    #[serde(rename = "options.configInfo")]
    ConfigInfo(ConfigInfo),
    #[serde(rename = "liteServer.info")]
    LiteServerInfo(LiteServerInfo),
    #[serde(rename = "key")]
    Key(Key),
    #[serde(rename = "exportedKey")]
    ExportedKey(ExportedKey),
    #[serde(rename = "exportedPemKey")]
    ExportedPemKey(ExportedPemKey),
    #[serde(rename = "exportedUnencryptedKey")]
    ExportedUnencryptedKey(ExportedUnencryptedKey),
    #[serde(rename = "bip39Hints")]
    Bip39Hints(Bip39Hints),
    #[serde(rename = "fullAccountState")]
    FullAccountState(FullAccountState),
    #[serde(rename = "query.info")]
    QueryInfo(QueryInfo),
    #[serde(rename = "query.fees")]
    QueryFees(QueryFees),
    #[serde(rename = "smc.info")]
    SmcInfo(SmcInfo),
    #[serde(rename = "tvm.cell")]
    TvmCell(TvmCell),
    #[serde(rename = "smc.runResult")]
    SmcRunResult(SmcRunResult),
    #[serde(rename = "unpackedAccountAddress")]
    UnpackedAccountAddress(UnpackedAccountAddress),
    #[serde(rename = "accountAddress")]
    AccountAddress(AccountAddress),
    #[serde(other)]
    Other,
}

impl Response {
    pub fn type_name(&self) -> &'static str {
        match self {
            Response::Acknowledged => "ok",
            Response::OptionsInfo(_) => "options.info",
            Response::ConfigInfo(_) => "options.configInfo",
            Response::LiteServerInfo(_) => "liteServer.info",
            Response::Key(_) => "key",
            Response::ExportedKey(_) => "exportedKey",
            Response::ExportedPemKey(_) => "exportedPemKey",
            Response::ExportedUnencryptedKey(_) => "exportedUnencryptedKey",
            Response::Bip39Hints(_) => "bip39Hints",
            Response::FullAccountState(_) => "fullAccountState",
            Response::QueryInfo(_) => "query.info",
            Response::QueryFees(_) => "query.fees",
            Response::SmcInfo(_) => "smc.info",
            Response::TvmCell(_) => "tvm.cell",
            Response::SmcRunResult(_) => "smc.runResult",
            Response::UnpackedAccountAddress(_) => "unpackedAccountAddress",
            Response::AccountAddress(_) => "accountAddress",
            Response::Other => "unknown object",
        }
    }
}

impl TryFrom<Response> for Acknowledged {
    type Error = CliError;

    fn try_from(response: Response) -> CliResult<Self> {
        match response {
            Response::Acknowledged => Ok(Acknowledged),
            other => Err(CliError::UnexpectedReply {
                expected: "ok",
                got: other.type_name().to_string(),
            }),
        }
    }
}

macro_rules! reply_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        $(
            impl TryFrom<Response> for $variant {
                type Error = CliError;

                fn try_from(response: Response) -> CliResult<Self> {
                    match response {
                        Response::$variant(value) => Ok(value),
                        other => Err(CliError::UnexpectedReply {
                            expected: $name,
                            got: other.type_name().to_string(),
                        }),
                    }
                }
            }
        )*
    };
}

reply_types! {
    OptionsInfo => "options.info",
    ConfigInfo => "options.configInfo",
    LiteServerInfo => "liteServer.info",
    Key => "key",
    ExportedKey => "exportedKey",
    ExportedPemKey => "exportedPemKey",
    ExportedUnencryptedKey => "exportedUnencryptedKey",
    Bip39Hints => "bip39Hints",
    FullAccountState => "fullAccountState",
    QueryInfo => "query.info",
    QueryFees => "query.fees",
    SmcInfo => "smc.info",
    TvmCell => "tvm.cell",
    SmcRunResult => "smc.runResult",
    UnpackedAccountAddress => "unpackedAccountAddress",
    AccountAddress => "accountAddress",
}

//-----------------------------------------------------------------------------
// Push Updates
//-----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "@type")]
pub enum SyncProgress {
    #[serde(rename = "syncStateDone")]
    Done,
    #[serde(rename = "syncStateInProgress")]
    InProgress {
        from_seqno: i32,
        to_seqno: i32,
        current_seqno: i32,
    },
}

/// Notifications sent without a request id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "@type")]
pub enum Update {
    #[serde(rename = "updateSendLiteServerQuery")]
    SendLiteServerQuery {
        #[serde(with = "int64")]
        id: i64,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    #[serde(rename = "updateSyncState")]
    SyncState { sync_state: SyncProgress },
}
