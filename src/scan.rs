//! C7 — scan / recovery engine.
//!
//! The gap-limit walker: derive a block of addresses, probe the index,
//! repeat until a long enough run of inactivity proves nothing more will be
//! found. Termination is guaranteed because `not_found` only grows when a
//! block is unproductive, and only finitely many productive blocks exist on
//! a finite chain (`spec.md` §4.7/§8 property 5).

use bitcoin::Network;

use crate::address::AddressId;
use crate::cancel::Cancellation;
use crate::config::Config;
use crate::error::Result;
use crate::hd::HdDeriver;
use crate::query::{QuerySurface, Utxo};

/// The four `(internal, witness)` combinations scanned by `recover`, in the
/// fixed order confirmed against `RecoverFromXPUB` in the source: external
/// witness-named first, then external legacy, internal legacy, internal
/// witness-named.
const COMBINATIONS: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

pub struct ScanEngine<'a> {
	query: QuerySurface<'a>,
	network: Network,
	gap_limit: u32,
	derivation_block: u32,
	enable_true_witness: bool,
}

impl<'a> ScanEngine<'a> {
	pub fn new(store: Option<&'a crate::store::AddressIndexStore>, config: &Config) -> Self {
		ScanEngine {
			query: QuerySurface::new(store, config.network),
			network: config.network,
			gap_limit: config.gap_limit,
			derivation_block: config.derivation_block,
			enable_true_witness: config.enable_true_witness,
		}
	}

	fn derive_ids(&self, deriver: &HdDeriver, from: u32, count: u32, internal: bool, witness: bool) -> Vec<AddressId> {
		deriver
			.derive(from, count, internal, witness)
			.into_iter()
			.filter_map(|addr| AddressId::from_address_str(&addr, self.network).ok())
			.collect()
	}

	/// Walk one `(internal, witness)` chain, appending found UTXOs to
	/// `results`. Mirrors `Recover_` from the source one-to-one.
	fn recover_chain(
		&self,
		deriver: &HdDeriver,
		internal: bool,
		witness: bool,
		cancel: &Cancellation,
		results: &mut Vec<Utxo>,
	) -> Result<()> {
		let mut last = 0u32;
		let mut not_found = 0u32;
		loop {
			cancel.check()?;
			let ids = self.derive_ids(deriver, last, self.derivation_block, internal, witness);
			let utxos = self.query.get_utxos(&ids, cancel)?;
			let found = if utxos.is_empty() {
				self.query.has_any_activity(&ids, cancel)?
			} else {
				results.extend(utxos);
				true
			};

			last = last.saturating_add(self.derivation_block);
			not_found = if found { 0 } else { not_found + self.derivation_block };

			if not_found >= self.gap_limit {
				break;
			}
		}
		Ok(())
	}

	/// Scan all four `(internal, witness)` combinations, in that fixed
	/// order, and concatenate their UTXOs. An xpub that fails to parse
	/// yields an empty result rather than an error (`spec.md` §4.6).
	pub fn recover(&self, xpub: &str, cancel: &Cancellation) -> Result<Vec<Utxo>> {
		let Some(deriver) = HdDeriver::parse(xpub, self.network, self.enable_true_witness) else {
			return Ok(Vec::new());
		};
		let mut results = Vec::new();
		for &(internal, witness) in &COMBINATIONS {
			self.recover_chain(&deriver, internal, witness, cancel, &mut results)?;
		}
		Ok(results)
	}

	/// Fixed to the external, witness-named path (`internal=false,
	/// witness=true`), following `spec.md`'s literal pseudocode rather than
	/// the source's `GetLastUsedExternalSegWitIndex`, which returns `0`
	/// instead of `-1` for a wallet with no activity at all — treated here
	/// as a source bug, not a behavior to reproduce (see DESIGN.md).
	pub fn last_used_hd_index(&self, xpub: &str, cancel: &Cancellation) -> Result<i32> {
		let Some(deriver) = HdDeriver::parse(xpub, self.network, self.enable_true_witness) else {
			return Ok(-1);
		};
		let mut last = 0u32;
		let mut overall = -1i32;
		loop {
			cancel.check()?;
			let ids = self.derive_ids(&deriver, last, self.derivation_block, false, true);
			let r = self.query.last_used_index(&ids, cancel)?;
			if r < 0 {
				break;
			}
			overall = last as i32 + r;
			last = last.saturating_add(self.derivation_block);
		}
		Ok(overall)
	}

	/// Supplemented from `GetFirstUsedBlock`'s declaration in the source
	/// (no body shipped with the retrieved sources): scans all four chains
	/// and returns the minimum `blockHeight` across every activity record
	/// found, or `-1` if the xpub has no activity anywhere.
	pub fn first_used_block(&self, xpub: &str, cancel: &Cancellation) -> Result<i32> {
		let Some(deriver) = HdDeriver::parse(xpub, self.network, self.enable_true_witness) else {
			return Ok(-1);
		};
		let mut min_height: Option<i32> = None;
		for &(internal, witness) in &COMBINATIONS {
			let mut last = 0u32;
			let mut not_found = 0u32;
			loop {
				cancel.check()?;
				let ids = self.derive_ids(&deriver, last, self.derivation_block, internal, witness);
				let mut found = false;
				for id in &ids {
					for (key, _amount) in self.query_activity(*id, cancel)? {
						found = true;
						min_height = Some(min_height.map_or(key.height as i32, |m| m.min(key.height as i32)));
					}
				}
				last = last.saturating_add(self.derivation_block);
				not_found = if found { 0 } else { not_found + self.derivation_block };
				if not_found >= self.gap_limit {
					break;
				}
			}
		}
		Ok(min_height.unwrap_or(-1))
	}

	fn query_activity(
		&self,
		addr: AddressId,
		cancel: &Cancellation,
	) -> Result<Vec<(crate::codec::ActivityKey, i64)>> {
		self.query.store_ref()?.read_activity(addr, 0, 0, cancel)
	}
}
