// Rust Bitcoin Wallet
// Written in 2019 by
//   Steven Roose <steven@stevenroose.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! # addrindex
//!
//! An address-indexed secondary index and HD wallet recovery engine for a
//! UTXO-based node: a persistent store mapping script-derived addresses to
//! the outputs that credit or debit them, plus a gap-limit scanner that
//! recovers a wallet's UTXOs from nothing but an xpub.

#![crate_name = "addrindex"]
#![crate_type = "dylib"]
#![crate_type = "rlib"]

// Coding conventions
#![forbid(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

extern crate bitcoin;
extern crate byteorder;
extern crate hex;
#[macro_use]
extern crate lazy_static;
extern crate rocksdb;
extern crate secp256k1;
extern crate serde;

pub mod address;
pub mod applier;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod hd;
pub mod query;
pub mod scan;
pub mod service;
pub mod store;
pub mod varint;
pub mod wire;

pub use address::{AddressId, AddressType};
pub use config::Config;
pub use error::{Error, Result};
pub use query::Utxo;
pub use service::IndexService;

lazy_static! {
	static ref SECP: secp256k1::Secp256k1<secp256k1::All> = secp256k1::Secp256k1::new();
}
