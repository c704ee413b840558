use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// Identifies which compiled artifact slot a circuit occupies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitKind {
    #[serde(alias = "token", alias = "collection")]
    PrimaryAsset,
    AdvancedPrimaryAsset,
    #[serde(alias = "admin")]
    AdminStandard,
    AdminAdvanced,
    #[serde(alias = "user")]
    UserContract,
    #[serde(alias = "upgrade")]
    UpgradeContract,
}

impl CircuitKind {
    pub fn is_asset(self) -> bool {
        matches!(self, CircuitKind::PrimaryAsset | CircuitKind::AdvancedPrimaryAsset)
    }

    /// Name of the single asset circuit of this kind.
    fn canonical_name(self) -> &'static str {
        match self {
            CircuitKind::PrimaryAsset => "PrimaryAsset",
            CircuitKind::AdvancedPrimaryAsset => "AdvancedPrimaryAsset",
            CircuitKind::AdminStandard => "AdminStandard",
            CircuitKind::AdminAdvanced => "AdminAdvanced",
            CircuitKind::UserContract => "UserContract",
            CircuitKind::UpgradeContract => "UpgradeContract",
        }
    }
}

/// Key of a compiled circuit in the verification key cache.
///
/// Asset circuits are unique per kind. Admin and user contracts are
/// distinguished by their registry key, so two contracts of the same kind never
/// share a slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CircuitId {
    pub kind: CircuitKind,
    pub name: String,
}

impl CircuitId {
    pub fn asset(kind: CircuitKind) -> Self {
        Self {
            kind,
            name: kind.canonical_name().to_string(),
        }
    }

    pub fn contract(kind: CircuitKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// One row of a network's verification key registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationKeyEntry {
    #[serde(rename = "key")]
    pub circuit_key: String,
    #[serde(rename = "hash")]
    pub expected_hash: String,
    pub kind: CircuitKind,
}

/// Output of compiling a circuit. Never mutated once cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompiledKey {
    pub hash: String,
    #[serde(rename = "data")]
    pub raw_data: String,
}

// Admin policy contract governing an asset
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdminVariant {
    #[default]
    Standard,
    Advanced,
}

impl fmt::Display for AdminVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminVariant::Standard => f.write_str("standard"),
            AdminVariant::Advanced => f.write_str("advanced"),
        }
    }
}

/// Target ledger network of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkId {
    Mainnet,
    Devnet,
    Zeko,
    Lightnet,
    Local,
}

impl NetworkId {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkId::Mainnet => "mainnet",
            NetworkId::Devnet => "devnet",
            NetworkId::Zeko => "zeko",
            NetworkId::Lightnet => "lightnet",
            NetworkId::Local => "local",
        }
    }
}

impl FromStr for NetworkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(NetworkId::Mainnet),
            "devnet" => Ok(NetworkId::Devnet),
            "zeko" => Ok(NetworkId::Zeko),
            "lightnet" => Ok(NetworkId::Lightnet),
            "local" => Ok(NetworkId::Local),
            _ => Err(Error::Config(format!("Unknown network: {}", s))),
        }
    }
}

impl TryFrom<String> for NetworkId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<NetworkId> for String {
    fn from(id: NetworkId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of transaction types the agent can prove.
///
/// Wire names follow the current request schema; the camelCase and `nft:`
/// spellings of older clients are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    LaunchCollection,
    LaunchToken,
    Mint,
    Transfer,
    Offer,
    Bid,
    Sell,
    Buy,
    WithdrawOffer,
    WithdrawBid,
    UpdateWhitelist,
    UpdateBidWhitelist,
    UpdateOfferWhitelist,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::LaunchCollection => "launch-collection",
            TransactionType::LaunchToken => "launch-token",
            TransactionType::Mint => "mint",
            TransactionType::Transfer => "transfer",
            TransactionType::Offer => "offer",
            TransactionType::Bid => "bid",
            TransactionType::Sell => "sell",
            TransactionType::Buy => "buy",
            TransactionType::WithdrawOffer => "withdraw-offer",
            TransactionType::WithdrawBid => "withdraw-bid",
            TransactionType::UpdateWhitelist => "update-whitelist",
            TransactionType::UpdateBidWhitelist => "update-bid-whitelist",
            TransactionType::UpdateOfferWhitelist => "update-offer-whitelist",
        }
    }

    pub fn is_launch(self) -> bool {
        matches!(
            self,
            TransactionType::LaunchCollection | TransactionType::LaunchToken
        )
    }

    /// Whether proving this transaction signs as the asset admin, which needs
    /// the admin circuits compiled.
    pub fn compiles_admin(self) -> bool {
        match self {
            TransactionType::LaunchCollection
            | TransactionType::LaunchToken
            | TransactionType::Mint
            | TransactionType::UpdateWhitelist => true,
            TransactionType::Transfer
            | TransactionType::Offer
            | TransactionType::Bid
            | TransactionType::Sell
            | TransactionType::Buy
            | TransactionType::WithdrawOffer
            | TransactionType::WithdrawBid
            | TransactionType::UpdateBidWhitelist
            | TransactionType::UpdateOfferWhitelist => false,
        }
    }

    /// Launches and mints are charged the launch proving fee.
    pub fn uses_launch_fee(self) -> bool {
        self.is_launch() || self == TransactionType::Mint
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tx_type = match s {
            "launch-collection" | "nft:launch" => TransactionType::LaunchCollection,
            "launch-token" | "launch" | "token:launch" => TransactionType::LaunchToken,
            "mint" | "nft:mint" | "token:mint" => TransactionType::Mint,
            "transfer" | "nft:transfer" | "token:transfer" => TransactionType::Transfer,
            "offer" | "token:offer" => TransactionType::Offer,
            "bid" | "token:bid" => TransactionType::Bid,
            "sell" | "nft:sell" | "token:sell" => TransactionType::Sell,
            "buy" | "nft:buy" | "token:buy" => TransactionType::Buy,
            "withdraw-offer" | "withdrawOffer" => TransactionType::WithdrawOffer,
            "withdraw-bid" | "withdrawBid" => TransactionType::WithdrawBid,
            "update-whitelist" | "updateAdminWhitelist" => TransactionType::UpdateWhitelist,
            "update-bid-whitelist" | "updateBidWhitelist" => TransactionType::UpdateBidWhitelist,
            "update-offer-whitelist" | "updateOfferWhitelist" => {
                TransactionType::UpdateOfferWhitelist
            }
            other => return Err(Error::UnknownTransactionType(other.to_string())),
        };
        Ok(tx_type)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Request-specific parameter record, as sent under `request`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub tx_type: Option<String>,
    #[serde(rename = "collectionAddress", alias = "tokenAddress")]
    pub asset_address: Option<String>,
    pub admin_contract_address: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
    pub collection_name: Option<String>,
    pub creator: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransactionRequest {
    request: Option<RequestParams>,
    sender: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    nonce: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    fee: Option<u64>,
    memo: Option<String>,
    transaction: Option<String>,
    signed_data: Option<String>,
    send_transaction: Option<bool>,
    symbol: Option<String>,
}

/// A validated transaction request.
///
/// The raw envelope is kept alongside the typed fields because the transaction
/// builder consumes the payloads exactly as the client signed them.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub tx_type: TransactionType,
    pub sender: String,
    pub nonce: Option<u64>,
    pub fee: Option<u64>,
    pub memo: Option<String>,
    pub transaction: Option<String>,
    pub signed_data: Option<String>,
    pub send_transaction: bool,
    pub symbol: Option<String>,
    pub params: RequestParams,
    pub raw: serde_json::Value,
}

impl TransactionRequest {
    /// Parses and validates one serialized request of a batch.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Malformed transaction request: {}", e)))?;
        let wire: WireTransactionRequest = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Validation(format!("Malformed transaction request: {}", e)))?;

        let params = wire
            .request
            .ok_or_else(|| Error::Validation("request is undefined".to_string()))?;
        let tx_type: TransactionType = match params.tx_type.as_deref() {
            Some(t) if !t.is_empty() => t.parse()?,
            _ => return Err(Error::Validation("request.txType is undefined".to_string())),
        };

        let symbol = wire.symbol.or_else(|| params.symbol.clone());
        let mut missing = Vec::new();
        if wire.sender.is_none() {
            missing.push("sender");
        }
        if params.asset_address.is_none() {
            missing.push("request.collectionAddress");
        }
        if tx_type.is_launch() {
            if params.admin_contract_address.is_none() {
                missing.push("request.adminContractAddress");
            }
            if wire.transaction.is_none() {
                missing.push("transaction");
            }
            if wire.signed_data.is_none() {
                missing.push("signedData");
            }
            if symbol.is_none() {
                missing.push("symbol");
            }
            if tx_type == TransactionType::LaunchToken && params.uri.is_none() {
                missing.push("request.uri");
            }
        }
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "One or more required args are undefined: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            tx_type,
            sender: wire.sender.unwrap_or_default(),
            nonce: wire.nonce,
            fee: wire.fee,
            memo: wire.memo,
            transaction: wire.transaction,
            signed_data: wire.signed_data,
            send_transaction: wire.send_transaction.unwrap_or(true),
            symbol,
            params,
            raw,
        })
    }

    pub fn asset_address(&self) -> &str {
        self.params.asset_address.as_deref().unwrap_or_default()
    }
}

// Accepts both JSON numbers and decimal strings
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    match Option::<NumOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrString::Num(n)) => Ok(Some(n)),
        Some(NumOrString::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Fee, sender, nonce and memo recovered from the signed payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionParams {
    pub fee: u64,
    pub sender: String,
    pub nonce: u64,
    pub memo: String,
}

/// An assembled transaction that has not been proved yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UnprovenTransaction(pub serde_json::Value);

/// A proved transaction, held only for the prove and submit steps of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvedTransaction {
    json: String,
}

impl ProvedTransaction {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }

    /// Serialized proof payload returned to the host when there is no hash.
    pub fn to_json(&self) -> &str {
        &self.json
    }

    pub fn payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.json)?)
    }
}

/// Free-form metadata published for every submitted transaction.
pub type TransactionMetadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Included,
    Rejected,
}

impl TxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Included => "included",
            TxStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of a single send or inclusion wait.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub hash: Option<String>,
    pub status: TxStatus,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn launch_json() -> serde_json::Value {
        json!({
            "sender": "B62sender",
            "transaction": "{}",
            "signedData": "{}",
            "request": {
                "txType": "launch-collection",
                "collectionAddress": "B62collection",
                "adminContractAddress": "B62admin",
                "symbol": "NFT",
                "collectionName": "Collection"
            }
        })
    }

    #[test]
    fn parses_launch_with_defaults() {
        let request = TransactionRequest::parse(&launch_json().to_string()).unwrap();
        assert_eq!(request.tx_type, TransactionType::LaunchCollection);
        assert!(request.send_transaction);
        assert_eq!(request.symbol.as_deref(), Some("NFT"));
        assert_eq!(request.asset_address(), "B62collection");
        assert_eq!(
            request.params.collection_name.as_deref(),
            Some("Collection")
        );
    }

    #[test]
    fn accepts_token_address_and_string_nonce() {
        let json = json!({
            "sender": "B62sender",
            "nonce": "17",
            "fee": 100000000,
            "sendTransaction": false,
            "request": { "txType": "transferOffer", "tokenAddress": "B62token" }
        });
        let err = TransactionRequest::parse(&json.to_string()).unwrap_err();
        assert!(matches!(err, Error::UnknownTransactionType(t) if t == "transferOffer"));

        let json = json!({
            "sender": "B62sender",
            "nonce": "17",
            "fee": 100000000,
            "sendTransaction": false,
            "request": { "txType": "withdrawOffer", "tokenAddress": "B62token" }
        });
        let request = TransactionRequest::parse(&json.to_string()).unwrap();
        assert_eq!(request.tx_type, TransactionType::WithdrawOffer);
        assert_eq!(request.nonce, Some(17));
        assert_eq!(request.fee, Some(100_000_000));
        assert!(!request.send_transaction);
        assert_eq!(request.asset_address(), "B62token");
    }

    #[test]
    fn rejects_missing_sender() {
        let mut json = launch_json();
        json.as_object_mut().unwrap().remove("sender");
        let err = TransactionRequest::parse(&json.to_string()).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("sender")));
    }

    #[test]
    fn rejects_empty_tx_type() {
        let json = json!({ "sender": "B62sender", "request": { "txType": "" } });
        let err = TransactionRequest::parse(&json.to_string()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn token_launch_requires_uri() {
        let mut json = launch_json();
        json["request"]["txType"] = json!("launch");
        let err = TransactionRequest::parse(&json.to_string()).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("request.uri")));
    }

    #[test]
    fn admin_compilation_follows_type() {
        assert!(TransactionType::Mint.compiles_admin());
        assert!(TransactionType::UpdateWhitelist.compiles_admin());
        assert!(!TransactionType::Transfer.compiles_admin());
        assert!(!TransactionType::UpdateBidWhitelist.compiles_admin());
    }

    #[test]
    fn registry_kind_accepts_legacy_names() {
        let kind: CircuitKind = serde_json::from_value(json!("collection")).unwrap();
        assert_eq!(kind, CircuitKind::PrimaryAsset);
        let kind: CircuitKind = serde_json::from_value(json!("admin-advanced")).unwrap();
        assert_eq!(kind, CircuitKind::AdminAdvanced);
    }

    #[test]
    fn network_id_round_trips_through_strings() {
        let id: NetworkId = serde_json::from_value(json!("zeko")).unwrap();
        assert_eq!(id, NetworkId::Zeko);
        assert_eq!(serde_json::to_value(id).unwrap(), json!("zeko"));
        assert!("moon".parse::<NetworkId>().is_err());
    }
}
