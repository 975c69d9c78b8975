use thiserror::Error;

/// The four error kinds the RPC/peer boundary needs to tell apart: a
/// disabled/misconfigured index, a bad caller input, a storage fault that
/// must be propagated verbatim (never retried inside the core), and
/// cooperative cancellation of a long-running scan.
#[derive(Error, Debug)]
pub enum Error {
	#[error("address index not enabled, or a required collaborator index is absent: {0}")]
	Configuration(String),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("storage error: {0}")]
	Storage(String),

	#[error("operation cancelled")]
	Cancelled,
}

impl From<rocksdb::Error> for Error {
	fn from(e: rocksdb::Error) -> Error {
		Error::Storage(e.to_string())
	}
}

impl From<bitcoin::bip32::Error> for Error {
	fn from(e: bitcoin::bip32::Error) -> Error {
		Error::InvalidInput(e.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
