//! The address index as a service-registry value.
//!
//! The source holds a process-wide nullable smart pointer
//! (`std::unique_ptr<CAddressIndex> g_addressindex`) and checks it for
//! null on every RPC entry point. Re-architected per `spec.md` §9: the
//! "disabled" state is `Option<IndexService>` at the host's service
//! registry, so the null check disappears from the hot path — a caller
//! either holds a service or doesn't, and every entry point here takes
//! `&self`, never a raw pointer.

use bitcoin::Network;

use crate::applier::{connect, disconnect, BlockUndoData, CoinView, TipDescriptor};
use crate::cancel::Cancellation;
use crate::config::Config;
use crate::error::Result;
use crate::query::{QuerySurface, Utxo};
use crate::scan::ScanEngine;
use crate::store::AddressIndexStore;

pub struct IndexService {
	store: AddressIndexStore,
	config: Config,
}

impl IndexService {
	pub fn open<P: AsRef<std::path::Path>>(path: P, config: Config) -> Result<Self> {
		let store = AddressIndexStore::open(path)?;
		log::info!("address index service opened (network={:?})", config.network);
		Ok(IndexService { store, config })
	}

	pub fn network(&self) -> Network {
		self.config.network
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Apply a connected block's mutations atomically.
	pub fn connect_block(&self, block: &bitcoin::Block, tip: &TipDescriptor, coins: &dyn CoinView) -> Result<()> {
		let ops = connect(block, tip, coins);
		self.store.apply_batch(&ops)
	}

	/// Apply a disconnected block's mutations atomically — the exact
	/// inverse of the corresponding `connect_block` call.
	pub fn disconnect_block(
		&self,
		block: &bitcoin::Block,
		undo: &BlockUndoData,
		tip: &TipDescriptor,
		coins: &dyn CoinView,
	) -> Result<()> {
		let ops = disconnect(block, undo, tip, coins);
		self.store.apply_batch(&ops)
	}

	fn store_if_enabled(&self) -> Option<&AddressIndexStore> {
		if self.config.enabled {
			Some(&self.store)
		} else {
			None
		}
	}

	pub fn query(&self) -> QuerySurface<'_> {
		QuerySurface::new(self.store_if_enabled(), self.config.network)
	}

	pub fn scan(&self) -> ScanEngine<'_> {
		ScanEngine::new(self.store_if_enabled(), &self.config)
	}

	pub fn recover(&self, xpub: &str, cancel: &Cancellation) -> Result<Vec<Utxo>> {
		self.scan().recover(xpub, cancel)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_and_query_empty_store() {
		let dir = tempfile::tempdir().unwrap();
		let service = IndexService::open(dir.path(), Config::default()).unwrap();
		let addrs = [];
		let utxos = service.query().get_utxos(&addrs, &Cancellation::none()).unwrap();
		assert!(utxos.is_empty());
	}

	#[test]
	fn disabled_service_refuses_queries_and_scans() {
		let dir = tempfile::tempdir().unwrap();
		let config = Config { enabled: false, ..Config::default() };
		let service = IndexService::open(dir.path(), config).unwrap();
		let addrs = [];

		let query_err = service.query().get_utxos(&addrs, &Cancellation::none()).unwrap_err();
		assert!(matches!(query_err, crate::error::Error::Configuration(_)));

		// an unparseable xpub short-circuits before the store is ever
		// touched, so these still resolve to empty results rather than
		// propagating the disabled-store error
		assert!(service.recover("not-an-xpub", &Cancellation::none()).is_ok());
		assert!(service.scan().last_used_hd_index("not-an-xpub", &Cancellation::none()).is_ok());
	}
}
