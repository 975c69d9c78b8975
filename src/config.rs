use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Fixed gap limit `G`: a wallet is allowed to skip any run of unused
/// addresses shorter than this before the scanner gives up on a chain.
pub const DEFAULT_GAP_LIMIT: u32 = 100;

/// Derivation block size `B`: addresses are derived and probed this many
/// at a time.
pub const DEFAULT_DERIVATION_BLOCK: u32 = 100;

/// Process-wide configuration for the address index and recovery engine.
///
/// `enabled = false` is the single flag that takes the whole subsystem
/// offline: every query and scan entry point returns
/// [`crate::Error::Configuration`] without touching the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub network: Network,
	pub enabled: bool,

	/// Preserves the observed bit-compatible quirk where witness-path HD
	/// derivation resolves to the same legacy P2PKH encoding as the
	/// non-witness path. Set to `true` to derive genuine P2SH-wrapped
	/// P2WPKH addresses on the witness path instead.
	pub enable_true_witness: bool,

	pub gap_limit: u32,
	pub derivation_block: u32,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			network: Network::Bitcoin,
			enabled: true,
			enable_true_witness: false,
			gap_limit: DEFAULT_GAP_LIMIT,
			derivation_block: DEFAULT_DERIVATION_BLOCK,
		}
	}
}
