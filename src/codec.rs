//! C2 — key/value codecs.
//!
//! Fixed-width, bit-exact serialization for the two record families in the
//! `'a'`/`'u'` namespaces. `blockHeight` and `txIndexInBlock` in
//! [`ActivityKey`] are big-endian on purpose: that's what makes lexicographic
//! store order agree with chain order for a prefix scan over one address.
//! Everything else is little-endian. No infix stream operators — every
//! record type exposes an explicit `encode_into`/`decode` pair.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use bitcoin::hashes::Hash;
use bitcoin::{ScriptBuf, Txid};

use crate::address::{AddressId, AddressType};
use crate::error::{Error, Result};

pub const ACTIVITY_NAMESPACE: u8 = b'a';
pub const UNSPENT_NAMESPACE: u8 = b'u';

fn bad_len(what: &str, expected: &str, got: usize) -> Error {
	Error::Storage(format!("corrupt {} record: expected {}, got {} bytes", what, expected, got))
}

/// `'a' | type:u8 | hash:20 | blockHeight:u32-BE | txIndexInBlock:u32-BE
///     | txid:32 | outputOrInputIndex:u32-LE | spending:u8`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityKey {
	pub address: AddressId,
	pub height: u32,
	pub tx_index: u32,
	pub txid: Txid,
	pub io_index: u32,
	pub spending: bool,
}

pub const ACTIVITY_KEY_LEN: usize = 1 + 1 + 20 + 4 + 4 + 32 + 4 + 1;

impl ActivityKey {
	pub fn encode_into(&self, buf: &mut Vec<u8>) {
		buf.push(ACTIVITY_NAMESPACE);
		buf.push(self.address.addr_type.code());
		buf.extend_from_slice(&self.address.hash);
		let mut be4 = [0u8; 4];
		BigEndian::write_u32(&mut be4, self.height);
		buf.extend_from_slice(&be4);
		BigEndian::write_u32(&mut be4, self.tx_index);
		buf.extend_from_slice(&be4);
		buf.extend_from_slice(self.txid.as_ref() as &[u8]);
		let mut le4 = [0u8; 4];
		LittleEndian::write_u32(&mut le4, self.io_index);
		buf.extend_from_slice(&le4);
		buf.push(self.spending as u8);
	}

	pub fn encoded(&self) -> Vec<u8> {
		let mut v = Vec::with_capacity(ACTIVITY_KEY_LEN);
		self.encode_into(&mut v);
		v
	}

	/// Prefix shared by every activity key for `(type, hash)`, used to scan
	/// one address's history in chain order.
	pub fn address_prefix(addr: AddressId) -> Vec<u8> {
		let mut v = Vec::with_capacity(1 + 1 + 20);
		v.push(ACTIVITY_NAMESPACE);
		v.push(addr.addr_type.code());
		v.extend_from_slice(&addr.hash);
		v
	}

	pub fn decode(bytes: &[u8]) -> Result<Self> {
		if bytes.len() != ACTIVITY_KEY_LEN {
			return Err(bad_len("activity key", "67 bytes", bytes.len()));
		}
		if bytes[0] != ACTIVITY_NAMESPACE {
			return Err(Error::Storage("activity key missing 'a' namespace byte".into()));
		}
		let addr_type = AddressType::from_code(bytes[1])?;
		let mut hash = [0u8; 20];
		hash.copy_from_slice(&bytes[2..22]);
		let height = BigEndian::read_u32(&bytes[22..26]);
		let tx_index = BigEndian::read_u32(&bytes[26..30]);
		let txid = Txid::from_slice(&bytes[30..62]).map_err(|e| Error::Storage(e.to_string()))?;
		let io_index = LittleEndian::read_u32(&bytes[62..66]);
		let spending = bytes[66] != 0;
		Ok(ActivityKey {
			address: AddressId::new(addr_type, hash),
			height,
			tx_index,
			txid,
			io_index,
			spending,
		})
	}
}

/// Signed satoshi amount: positive for credits, negative for debits.
/// Two's-complement, little-endian.
pub fn encode_amount(amount: i64) -> [u8; 8] {
	let mut buf = [0u8; 8];
	LittleEndian::write_i64(&mut buf, amount);
	buf
}

pub fn decode_amount(bytes: &[u8]) -> Result<i64> {
	if bytes.len() != 8 {
		return Err(bad_len("activity amount", "8 bytes", bytes.len()));
	}
	Ok(LittleEndian::read_i64(bytes))
}

/// `'u' | type:u8 | hash:20 | txid:32 | outputIndex:u32-LE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnspentKey {
	pub address: AddressId,
	pub txid: Txid,
	pub vout: u32,
}

pub const UNSPENT_KEY_LEN: usize = 1 + 1 + 20 + 32 + 4;

impl UnspentKey {
	pub fn encode_into(&self, buf: &mut Vec<u8>) {
		buf.push(UNSPENT_NAMESPACE);
		buf.push(self.address.addr_type.code());
		buf.extend_from_slice(&self.address.hash);
		buf.extend_from_slice(self.txid.as_ref() as &[u8]);
		let mut le4 = [0u8; 4];
		LittleEndian::write_u32(&mut le4, self.vout);
		buf.extend_from_slice(&le4);
	}

	pub fn encoded(&self) -> Vec<u8> {
		let mut v = Vec::with_capacity(UNSPENT_KEY_LEN);
		self.encode_into(&mut v);
		v
	}

	pub fn address_prefix(addr: AddressId) -> Vec<u8> {
		let mut v = Vec::with_capacity(1 + 1 + 20);
		v.push(UNSPENT_NAMESPACE);
		v.push(addr.addr_type.code());
		v.extend_from_slice(&addr.hash);
		v
	}

	pub fn decode(bytes: &[u8]) -> Result<Self> {
		if bytes.len() != UNSPENT_KEY_LEN {
			return Err(bad_len("unspent key", "58 bytes", bytes.len()));
		}
		if bytes[0] != UNSPENT_NAMESPACE {
			return Err(Error::Storage("unspent key missing 'u' namespace byte".into()));
		}
		let addr_type = AddressType::from_code(bytes[1])?;
		let mut hash = [0u8; 20];
		hash.copy_from_slice(&bytes[2..22]);
		let txid = Txid::from_slice(&bytes[22..54]).map_err(|e| Error::Storage(e.to_string()))?;
		let vout = LittleEndian::read_u32(&bytes[54..58]);
		Ok(UnspentKey { address: AddressId::new(addr_type, hash), txid, vout })
	}
}

/// `(satoshis: i64-LE, scriptPubKey: var-bytes, blockHeight: i32-LE)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentValue {
	pub satoshis: i64,
	pub script: ScriptBuf,
	pub height: i32,
}

impl UnspentValue {
	pub fn encode_into(&self, buf: &mut Vec<u8>) {
		let mut le8 = [0u8; 8];
		LittleEndian::write_i64(&mut le8, self.satoshis);
		buf.extend_from_slice(&le8);
		crate::varint::write_compact_size(buf, self.script.len() as u64);
		buf.extend_from_slice(self.script.as_bytes());
		let mut le4 = [0u8; 4];
		LittleEndian::write_i32(&mut le4, self.height);
		buf.extend_from_slice(&le4);
	}

	pub fn encoded(&self) -> Vec<u8> {
		let mut v = Vec::with_capacity(8 + 1 + self.script.len() + 4);
		self.encode_into(&mut v);
		v
	}

	pub fn decode(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < 8 + 1 + 4 {
			return Err(bad_len("unspent value", "at least 13 bytes", bytes.len()));
		}
		let satoshis = LittleEndian::read_i64(&bytes[0..8]);
		let (script_len, mut pos) = crate::varint::read_compact_size(&bytes[8..])
			.map(|(n, consumed)| (n, 8 + consumed))
			.map_err(|e| Error::Storage(e.to_string()))?;
		let script_len = script_len as usize;
		if bytes.len() < pos + script_len + 4 {
			return Err(bad_len("unspent value", "header + script + height", bytes.len()));
		}
		let script = ScriptBuf::from(bytes[pos..pos + script_len].to_vec());
		pos += script_len;
		let height = LittleEndian::read_i32(&bytes[pos..pos + 4]);
		Ok(UnspentValue { satoshis, script, height })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::address::AddressType;
	use std::str::FromStr;

	fn txid(byte: u8) -> Txid {
		Txid::from_slice(&[byte; 32]).unwrap()
	}

	#[test]
	fn activity_key_round_trip() {
		let key = ActivityKey {
			address: AddressId::new(AddressType::P2pkh, [1u8; 20]),
			height: 650_000,
			tx_index: 12,
			txid: txid(0xab),
			io_index: 3,
			spending: true,
		};
		let bytes = key.encoded();
		assert_eq!(bytes.len(), ACTIVITY_KEY_LEN);
		assert_eq!(ActivityKey::decode(&bytes).unwrap(), key);
	}

	#[test]
	fn activity_key_sort_order_is_height_then_txindex() {
		let addr = AddressId::new(AddressType::P2pkh, [2u8; 20]);
		let low = ActivityKey {
			address: addr,
			height: 100,
			tx_index: 5,
			txid: txid(1),
			io_index: 0,
			spending: false,
		};
		let high = ActivityKey {
			address: addr,
			height: 100,
			tx_index: 6,
			txid: txid(1),
			io_index: 0,
			spending: false,
		};
		let next_block = ActivityKey {
			address: addr,
			height: 101,
			tx_index: 0,
			txid: txid(1),
			io_index: 0,
			spending: false,
		};
		assert!(low.encoded() < high.encoded());
		assert!(high.encoded() < next_block.encoded());
	}

	#[test]
	fn activity_key_big_endian_sorts_across_byte_boundaries() {
		let addr = AddressId::new(AddressType::P2pkh, [3u8; 20]);
		let heights = [1u32, 256, 65536, 16_777_216];
		let mut encoded: Vec<Vec<u8>> = heights
			.iter()
			.map(|&h| {
				ActivityKey {
					address: addr,
					height: h,
					tx_index: 0,
					txid: txid(1),
					io_index: 0,
					spending: false,
				}
				.encoded()
			})
			.collect();
		let sorted = {
			let mut v = encoded.clone();
			v.sort();
			v
		};
		assert_eq!(encoded, sorted, "keys must already be in ascending order");
		encoded.reverse();
		encoded.sort();
		assert_eq!(encoded, sorted);
	}

	#[test]
	fn amount_round_trip_negative() {
		let enc = encode_amount(-5_000_000_000);
		assert_eq!(decode_amount(&enc).unwrap(), -5_000_000_000);
	}

	#[test]
	fn unspent_key_round_trip() {
		let key = UnspentKey {
			address: AddressId::new(AddressType::P2sh, [9u8; 20]),
			txid: txid(7),
			vout: 4,
		};
		let bytes = key.encoded();
		assert_eq!(bytes.len(), UNSPENT_KEY_LEN);
		assert_eq!(UnspentKey::decode(&bytes).unwrap(), key);
	}

	#[test]
	fn unspent_value_round_trip() {
		let script = ScriptBuf::from_str("76a914000000000000000000000000000000000000000088ac").unwrap();
		let value = UnspentValue { satoshis: 123_456_789, script, height: 700_000 };
		let bytes = value.encoded();
		assert_eq!(UnspentValue::decode(&bytes).unwrap(), value);
	}
}
