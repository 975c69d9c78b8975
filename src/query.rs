//! C5 — query surface.
//!
//! Read-only operations over the address index store. Every entry point
//! here returns [`Error::Configuration`] when the index is not open and
//! propagates [`Error::Storage`] verbatim on I/O faults — neither is
//! retried inside the core (`spec.md` §7).

use bitcoin::Network;

use crate::address::AddressId;
use crate::cancel::Cancellation;
use crate::error::{Error, Result};
use crate::store::AddressIndexStore;

/// One live unspent output, re-encoded for a caller that only knows about
/// addresses, not the index's internal `(type, hash)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
	pub address: String,
	pub txid: bitcoin::Txid,
	pub output_index: u32,
	pub script_hex: String,
	pub satoshis: i64,
	pub height: i32,
}

pub struct QuerySurface<'a> {
	store: Option<&'a AddressIndexStore>,
	network: Network,
}

impl<'a> QuerySurface<'a> {
	pub fn new(store: Option<&'a AddressIndexStore>, network: Network) -> Self {
		QuerySurface { store, network }
	}

	fn store(&self) -> Result<&AddressIndexStore> {
		self.store.ok_or_else(|| Error::Configuration("address index not enabled".into()))
	}

	/// Exposes the underlying store for callers (the scan engine's
	/// `first_used_block`) that need raw activity records rather than the
	/// aggregated query operations above.
	pub(crate) fn store_ref(&self) -> Result<&AddressIndexStore> {
		self.store()
	}

	/// Union of `read_unspent` across every address, sorted ascending by
	/// `blockHeight`; ties keep storage order.
	pub fn get_utxos(&self, addresses: &[AddressId], cancel: &Cancellation) -> Result<Vec<Utxo>> {
		let store = self.store()?;
		let mut out = Vec::new();
		for &addr in addresses {
			for (key, value) in store.read_unspent(addr, cancel)? {
				out.push(Utxo {
					address: addr.to_address(self.network).to_string(),
					txid: key.txid,
					output_index: key.vout,
					script_hex: hex::encode(value.script.as_bytes()),
					satoshis: value.satoshis,
					height: value.height,
				});
			}
		}
		out.sort_by_key(|u| u.height);
		Ok(out)
	}

	/// Short-circuits at the first address with any activity.
	pub fn has_any_activity(&self, addresses: &[AddressId], cancel: &Cancellation) -> Result<bool> {
		let store = self.store()?;
		for &addr in addresses {
			if !store.read_activity(addr, 0, 0, cancel)?.is_empty() {
				return Ok(true);
			}
		}
		Ok(false)
	}

	/// Merges activity across addresses, dedups by `(height, txid)`, and
	/// returns txids in `(height, txid)`-sorted order.
	pub fn get_txids(&self, addresses: &[AddressId], cancel: &Cancellation) -> Result<Vec<bitcoin::Txid>> {
		let store = self.store()?;
		let mut pairs = std::collections::BTreeSet::new();
		for &addr in addresses {
			for (key, _amount) in store.read_activity(addr, 0, 0, cancel)? {
				pairs.insert((key.height, key.txid));
			}
		}
		Ok(pairs.into_iter().map(|(_, txid)| txid).collect())
	}

	/// Highest positional index `i` in `addresses` for which that address
	/// has any activity, or `-1` if none. `addresses` is assumed positionally
	/// meaningful (e.g. a derived `from..from+N` run).
	pub fn last_used_index(&self, addresses: &[AddressId], cancel: &Cancellation) -> Result<i32> {
		let store = self.store()?;
		let mut last = -1i32;
		for (i, &addr) in addresses.iter().enumerate() {
			if !store.read_activity(addr, 0, 0, cancel)?.is_empty() {
				last = i as i32;
			}
		}
		Ok(last)
	}
}
