//! C3 — address index store.
//!
//! Batched, reversible writes over an embedded ordered KV engine
//! (`rocksdb`), with prefix iteration by `(type, hash)`. One column family
//! holds both the `'a'` and `'u'` namespaces side by side, distinguished by
//! their leading byte, matching the on-disk layout in §3.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use crate::cancel::Cancellation;
use crate::codec::{ActivityKey, UnspentKey, UnspentValue};
use crate::error::{Error, Result};

/// A single mutation against the store. C4 builds these; C3 commits them
/// atomically. Keeping this an explicit enum (rather than handing C4 a raw
/// `rocksdb::WriteBatch`) keeps the block-delta applier engine-agnostic.
#[derive(Debug, Clone)]
pub enum BatchOp {
	PutActivity(ActivityKey, i64),
	DeleteActivity(ActivityKey),
	PutUnspent(UnspentKey, UnspentValue),
	DeleteUnspent(UnspentKey),
}

pub struct AddressIndexStore {
	db: DB,
}

impl AddressIndexStore {
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let mut opts = Options::default();
		opts.create_if_missing(true);
		Self::open_with(path, opts)
	}

	pub fn open_with<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
		let db = DB::open(&opts, path)?;
		log::debug!("address index store opened");
		Ok(AddressIndexStore { db })
	}

	/// Atomically commit a sequence of write/erase operations. On crash
	/// mid-commit the underlying engine reverts to the pre-batch state.
	pub fn apply_batch(&self, ops: &[BatchOp]) -> Result<()> {
		let mut batch = WriteBatch::default();
		for op in ops {
			match op {
				BatchOp::PutActivity(key, amount) => {
					batch.put(key.encoded(), crate::codec::encode_amount(*amount));
				}
				BatchOp::DeleteActivity(key) => {
					batch.delete(key.encoded());
				}
				BatchOp::PutUnspent(key, value) => {
					batch.put(key.encoded(), value.encoded());
				}
				BatchOp::DeleteUnspent(key) => {
					batch.delete(key.encoded());
				}
			}
		}
		self.db.write(batch).map_err(|e| {
			log::warn!("address index batch commit failed: {}", e);
			Error::from(e)
		})
	}

	/// Prefix-iterate the `'u'` namespace matching `(type, hash)`. Output
	/// order is storage order; callers that need a different order sort
	/// themselves.
	pub fn read_unspent(
		&self,
		address: crate::address::AddressId,
		cancel: &Cancellation,
	) -> Result<Vec<(UnspentKey, UnspentValue)>> {
		let prefix = UnspentKey::address_prefix(address);
		let snapshot = self.db.snapshot();
		let mut out = Vec::new();
		let iter = snapshot.iterator(IteratorMode::From(&prefix, rocksdb::Direction::Forward));
		for item in iter {
			cancel.check()?;
			let (key_bytes, value_bytes) = item?;
			if !key_bytes.starts_with(&prefix[..]) {
				break;
			}
			let key = UnspentKey::decode(&key_bytes)?;
			let value = UnspentValue::decode(&value_bytes)?;
			out.push((key, value));
		}
		Ok(out)
	}

	/// Prefix-iterate the `'a'` namespace. `to_height == 0` means
	/// unbounded; iteration stops when `blockHeight > to_height` or the
	/// `(type, hash)` prefix no longer matches. `from_height` is honored as
	/// a lower bound, resolving the "start parameter is never consulted"
	/// ambiguity noted against the original implementation.
	pub fn read_activity(
		&self,
		address: crate::address::AddressId,
		from_height: u32,
		to_height: u32,
		cancel: &Cancellation,
	) -> Result<Vec<(ActivityKey, i64)>> {
		let prefix = ActivityKey::address_prefix(address);
		let snapshot = self.db.snapshot();
		let mut out = Vec::new();

		let mut seek_key = prefix.clone();
		if from_height > 0 {
			// Seek straight to the first key at or after `from_height` by
			// encoding a synthetic lower bound with the rest of the fields
			// zeroed; big-endian height encoding makes this a valid seek
			// target even though no real record has this exact key.
			let mut be4 = [0u8; 4];
			BigEndian::write_u32(&mut be4, from_height);
			seek_key.extend_from_slice(&be4);
		}

		let iter = snapshot.iterator(IteratorMode::From(&seek_key, rocksdb::Direction::Forward));
		for item in iter {
			cancel.check()?;
			let (key_bytes, value_bytes) = item?;
			if !key_bytes.starts_with(&prefix[..]) {
				break;
			}
			let key = ActivityKey::decode(&key_bytes)?;
			if to_height != 0 && key.height > to_height {
				break;
			}
			let amount = crate::codec::decode_amount(&value_bytes)?;
			out.push((key, amount));
		}
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::address::{AddressId, AddressType};
	use bitcoin::hashes::Hash;
	use bitcoin::{ScriptBuf, Txid};

	fn temp_store() -> (tempfile::TempDir, AddressIndexStore) {
		let dir = tempfile::tempdir().unwrap();
		let store = AddressIndexStore::open(dir.path()).unwrap();
		(dir, store)
	}

	fn txid(b: u8) -> Txid {
		Txid::from_slice(&[b; 32]).unwrap()
	}

	#[test]
	fn put_then_read_unspent() {
		let (_dir, store) = temp_store();
		let addr = AddressId::new(AddressType::P2pkh, [1u8; 20]);
		let key = UnspentKey { address: addr, txid: txid(1), vout: 0 };
		let value = UnspentValue { satoshis: 5_000_000_000, script: ScriptBuf::new(), height: 100 };
		store.apply_batch(&[BatchOp::PutUnspent(key, value.clone())]).unwrap();

		let found = store.read_unspent(addr, &Cancellation::none()).unwrap();
		assert_eq!(found, vec![(key, value)]);
	}

	#[test]
	fn delete_unspent_removes_record() {
		let (_dir, store) = temp_store();
		let addr = AddressId::new(AddressType::P2pkh, [2u8; 20]);
		let key = UnspentKey { address: addr, txid: txid(2), vout: 0 };
		let value = UnspentValue { satoshis: 1000, script: ScriptBuf::new(), height: 10 };
		store.apply_batch(&[BatchOp::PutUnspent(key, value)]).unwrap();
		store.apply_batch(&[BatchOp::DeleteUnspent(key)]).unwrap();

		let found = store.read_unspent(addr, &Cancellation::none()).unwrap();
		assert!(found.is_empty());
	}

	#[test]
	fn read_activity_respects_to_height_bound() {
		let (_dir, store) = temp_store();
		let addr = AddressId::new(AddressType::P2pkh, [3u8; 20]);
		let ops: Vec<BatchOp> = (1u32..=5)
			.map(|h| {
				let key = ActivityKey {
					address: addr,
					height: h * 100,
					tx_index: 0,
					txid: txid(h as u8),
					io_index: 0,
					spending: false,
				};
				BatchOp::PutActivity(key, 1000)
			})
			.collect();
		store.apply_batch(&ops).unwrap();

		let all = store.read_activity(addr, 0, 0, &Cancellation::none()).unwrap();
		assert_eq!(all.len(), 5);

		let bounded = store.read_activity(addr, 0, 300, &Cancellation::none()).unwrap();
		assert_eq!(bounded.len(), 3);
		assert!(bounded.iter().all(|(k, _)| k.height <= 300));
	}

	#[test]
	fn read_activity_honors_from_height_lower_bound() {
		let (_dir, store) = temp_store();
		let addr = AddressId::new(AddressType::P2pkh, [4u8; 20]);
		let ops: Vec<BatchOp> = (1u32..=5)
			.map(|h| {
				let key = ActivityKey {
					address: addr,
					height: h * 100,
					tx_index: 0,
					txid: txid(h as u8),
					io_index: 0,
					spending: false,
				};
				BatchOp::PutActivity(key, 1000)
			})
			.collect();
		store.apply_batch(&ops).unwrap();

		let from_300 = store.read_activity(addr, 300, 0, &Cancellation::none()).unwrap();
		assert_eq!(from_300.len(), 3);
		assert!(from_300.iter().all(|(k, _)| k.height >= 300));
	}

	#[test]
	fn cancellation_stops_iteration_early() {
		let (_dir, store) = temp_store();
		let addr = AddressId::new(AddressType::P2pkh, [5u8; 20]);
		let ops: Vec<BatchOp> = (1u32..=10)
			.map(|h| {
				let key = ActivityKey {
					address: addr,
					height: h,
					tx_index: 0,
					txid: txid(h as u8),
					io_index: 0,
					spending: false,
				};
				BatchOp::PutActivity(key, 1)
			})
			.collect();
		store.apply_batch(&ops).unwrap();

		let cancel = Cancellation::new();
		cancel.cancel();
		let result = store.read_activity(addr, 0, 0, &cancel);
		assert!(matches!(result, Err(Error::Cancelled)));
	}

	#[test]
	fn different_addresses_do_not_bleed_into_each_other() {
		let (_dir, store) = temp_store();
		let addr_a = AddressId::new(AddressType::P2pkh, [0xaa; 20]);
		let addr_b = AddressId::new(AddressType::P2pkh, [0xbb; 20]);
		let key_a =
			ActivityKey { address: addr_a, height: 1, tx_index: 0, txid: txid(1), io_index: 0, spending: false };
		let key_b =
			ActivityKey { address: addr_b, height: 1, tx_index: 0, txid: txid(2), io_index: 0, spending: false };
		store.apply_batch(&[BatchOp::PutActivity(key_a, 1), BatchOp::PutActivity(key_b, 2)]).unwrap();

		let only_a = store.read_activity(addr_a, 0, 0, &Cancellation::none()).unwrap();
		assert_eq!(only_a.len(), 1);
		assert_eq!(only_a[0].0, key_a);
	}
}
