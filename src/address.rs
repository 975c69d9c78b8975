//! C1 — address recognizer.
//!
//! Recognizes exactly the two script templates the on-disk index admits.
//! Everything else is silently ignored: address recognition failures on
//! unsupported scripts are expected and frequent, not errors.

use std::fmt;
use std::str::FromStr;

use bitcoin::{Address, Network, PubkeyHash, PublicKey, Script, ScriptBuf, ScriptHash};

use crate::error::{Error, Result};

/// `DUP HASH160 <20> EQUALVERIFY CHECKSIG`.
const P2PKH_LEN: usize = 25;
/// `HASH160 <20> EQUAL`.
const P2SH_LEN: usize = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
	P2pkh,
	P2sh,
}

impl AddressType {
	/// The on-disk type code from the index key layout.
	pub const fn code(self) -> u8 {
		match self {
			AddressType::P2pkh => 0x01,
			AddressType::P2sh => 0x02,
		}
	}

	pub fn from_code(code: u8) -> Result<Self> {
		match code {
			0x01 => Ok(AddressType::P2pkh),
			0x02 => Ok(AddressType::P2sh),
			other => Err(Error::InvalidInput(format!("unknown address type code {}", other))),
		}
	}
}

impl fmt::Display for AddressType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			AddressType::P2pkh => f.write_str("p2pkh"),
			AddressType::P2sh => f.write_str("p2sh"),
		}
	}
}

impl FromStr for AddressType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"p2pkh" => Ok(AddressType::P2pkh),
			"p2sh" => Ok(AddressType::P2sh),
			other => Err(Error::InvalidInput(format!("unknown address type {}", other))),
		}
	}
}

/// The canonical indexable form of a script: `(type, hash160)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressId {
	pub addr_type: AddressType,
	pub hash: [u8; 20],
}

impl AddressId {
	pub fn new(addr_type: AddressType, hash: [u8; 20]) -> Self {
		AddressId { addr_type, hash }
	}

	/// Re-encode this identifier as a base58check address string for the
	/// given network. Used by the query surface to return human-readable
	/// addresses alongside raw UTXO data.
	pub fn to_address(&self, network: Network) -> Address {
		match self.addr_type {
			AddressType::P2pkh => {
				Address::p2pkh(PubkeyHash::from_slice(&self.hash).expect("20 bytes"), network)
			}
			AddressType::P2sh => {
				Address::p2sh_from_hash(ScriptHash::from_slice(&self.hash).expect("20 bytes"), network)
			}
		}
	}

	/// Parse a base58check address string back into its indexable form,
	/// rejecting any address type other than the two whitelisted ones.
	pub fn from_address_str(s: &str, network: Network) -> Result<Self> {
		let addr = Address::from_str(s)
			.map_err(|e| Error::InvalidInput(format!("bad address {}: {}", s, e)))?
			.require_network(network)
			.map_err(|e| Error::InvalidInput(format!("address {} wrong network: {}", s, e)))?;
		recognize(&addr.script_pubkey())
			.ok_or_else(|| Error::InvalidInput(format!("unsupported address type: {}", s)))
	}
}

/// Given a script, return `(address_type, hash160)` if it matches one of
/// the two whitelisted templates, `None` otherwise.
pub fn recognize(script: &Script) -> Option<(AddressType, [u8; 20])> {
	let bytes = script.as_bytes();

	if bytes.len() == P2PKH_LEN
		&& bytes[0] == 0x76 // OP_DUP
		&& bytes[1] == 0xa9 // OP_HASH160
		&& bytes[2] == 0x14 // push 20 bytes
		&& bytes[23] == 0x88 // OP_EQUALVERIFY
		&& bytes[24] == 0xac
	// OP_CHECKSIG
	{
		let mut hash = [0u8; 20];
		hash.copy_from_slice(&bytes[3..23]);
		return Some((AddressType::P2pkh, hash));
	}

	if bytes.len() == P2SH_LEN
		&& bytes[0] == 0xa9 // OP_HASH160
		&& bytes[1] == 0x14 // push 20 bytes
		&& bytes[22] == 0x87
	// OP_EQUAL
	{
		let mut hash = [0u8; 20];
		hash.copy_from_slice(&bytes[2..22]);
		return Some((AddressType::P2sh, hash));
	}

	None
}

pub fn recognize_id(script: &Script) -> Option<AddressId> {
	recognize(script).map(|(t, h)| AddressId::new(t, h))
}

/// Build the P2PKH script that would be created by spending to this key;
/// used by HD derivation to produce the script a recognizer would accept.
pub fn p2pkh_script(pubkey: &PublicKey) -> ScriptBuf {
	ScriptBuf::new_p2pkh(&pubkey.pubkey_hash())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p2pkh_bytes(hash: [u8; 20]) -> ScriptBuf {
		let mut v = vec![0x76, 0xa9, 0x14];
		v.extend_from_slice(&hash);
		v.push(0x88);
		v.push(0xac);
		ScriptBuf::from(v)
	}

	fn p2sh_bytes(hash: [u8; 20]) -> ScriptBuf {
		let mut v = vec![0xa9, 0x14];
		v.extend_from_slice(&hash);
		v.push(0x87);
		ScriptBuf::from(v)
	}

	#[test]
	fn recognizes_p2pkh() {
		let hash = [7u8; 20];
		let (t, h) = recognize(&p2pkh_bytes(hash)).unwrap();
		assert_eq!(t, AddressType::P2pkh);
		assert_eq!(h, hash);
	}

	#[test]
	fn recognizes_p2sh() {
		let hash = [9u8; 20];
		let (t, h) = recognize(&p2sh_bytes(hash)).unwrap();
		assert_eq!(t, AddressType::P2sh);
		assert_eq!(h, hash);
	}

	#[test]
	fn rejects_unsupported_templates() {
		// OP_RETURN data push; not a whitelisted template.
		let script = ScriptBuf::from(vec![0x6a, 0x04, 1, 2, 3, 4]);
		assert!(recognize(&script).is_none());
	}

	#[test]
	fn rejects_malformed_p2pkh_length() {
		let mut v = vec![0x76, 0xa9, 0x14];
		v.extend_from_slice(&[1u8; 19]); // short hash
		v.push(0x88);
		v.push(0xac);
		assert!(recognize(&ScriptBuf::from(v)).is_none());
	}

	#[test]
	fn type_code_round_trip() {
		assert_eq!(AddressType::from_code(AddressType::P2pkh.code()).unwrap(), AddressType::P2pkh);
		assert_eq!(AddressType::from_code(AddressType::P2sh.code()).unwrap(), AddressType::P2sh);
		assert!(AddressType::from_code(0xff).is_err());
	}
}
