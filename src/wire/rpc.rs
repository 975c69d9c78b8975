//! JSON-RPC request/response shapes for the methods in `spec.md` §6's
//! table. Validation (xpub shorter than 4 chars / not `xpub`-prefixed)
//! happens here, before the string reaches C6, matching the source's
//! input checks in `rpc.cpp`.

use bitcoin::{Transaction, Txid};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Resolves a raw transaction by txid for `get_xpub_txs`, mirroring the
/// source's `g_txindex` collaborator (`CoinView`'s counterpart for C8).
/// Absence of this collaborator when `get_xpub_txs` is called is
/// `Error::Configuration`, matching "bitcoind is not started with
/// -txindex option" in `net.cpp`.
pub trait TxLookup {
	fn get_raw_tx(&self, txid: &Txid) -> Option<Transaction>;
}

/// `{xpubkey, from?, count?}` or a raw string xpub, accepted by
/// `gen_xpub_addresses` and friends.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum XpubParam {
	Raw(String),
	Object { xpubkey: String, #[serde(default)] from: Option<u32>, #[serde(default)] count: Option<u32> },
}

impl XpubParam {
	pub fn xpubkey(&self) -> &str {
		match self {
			XpubParam::Raw(s) => s,
			XpubParam::Object { xpubkey, .. } => xpubkey,
		}
	}

	pub fn from(&self) -> u32 {
		match self {
			XpubParam::Raw(_) => 0,
			XpubParam::Object { from, .. } => from.unwrap_or(0),
		}
	}

	pub fn count(&self) -> u32 {
		match self {
			XpubParam::Raw(_) => crate::config::DEFAULT_DERIVATION_BLOCK,
			XpubParam::Object { count, .. } => count.unwrap_or(crate::config::DEFAULT_DERIVATION_BLOCK),
		}
	}
}

/// Rejects xpubs shorter than 4 chars or not beginning with `xpub`, before
/// the string ever reaches C6.
pub fn validate_xpub(xpub: &str) -> Result<()> {
	if xpub.len() < 4 || !xpub.starts_with("xpub") {
		return Err(Error::InvalidInput(format!("not a valid xpub: {}", xpub)));
	}
	Ok(())
}

/// Decode a single JSON-RPC parameter into an [`XpubParam`], accepting
/// either a raw quoted xpub string or the `{xpubkey, from, count}` object
/// form.
pub fn parse_xpub_param(json: &str) -> Result<XpubParam> {
	serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("bad xpub param: {}", e)))
}

/// Encode an RPC response value as the JSON string sent back over the
/// wire.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
	serde_json::to_string(value).map_err(|e| Error::Storage(format!("failed to encode RPC response: {}", e)))
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressUtxoResponse {
	pub address: String,
	pub txid: String,
	#[serde(rename = "outputIndex")]
	pub output_index: u32,
	pub script: String,
	pub satoshis: i64,
	pub height: i32,
}

impl From<&crate::query::Utxo> for AddressUtxoResponse {
	fn from(u: &crate::query::Utxo) -> Self {
		AddressUtxoResponse {
			address: u.address.clone(),
			txid: u.txid.to_string(),
			output_index: u.output_index,
			script: u.script_hex.clone(),
			satoshis: u.satoshis,
			height: u.height,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct LastUsedHdIndexResponse {
	pub lastindex: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirstUsedBlockResponse {
	pub firstusedblock: i32,
}

/// `{addresses: [string], chainInfo?: bool}`, accepted by
/// `get_address_utxos`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressUtxosParams {
	pub addresses: Vec<String>,
	#[serde(default, rename = "chainInfo")]
	pub chain_info: bool,
}

/// `{addresses: [string]}`, accepted by `get_address_txids`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressTxidsParams {
	pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AddressUtxosResult {
	Utxos(Vec<AddressUtxoResponse>),
	WithChainInfo { utxos: Vec<AddressUtxoResponse>, hash: String, height: i32 },
}
