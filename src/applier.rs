//! C4 — block-delta applier.
//!
//! Translates a connected or disconnected block into a batch of [`BatchOp`]s.
//! Neither `connect` nor `disconnect` touches the store directly; the caller
//! decides whether and when to commit, log, or discard the batch (dry-run
//! replay, for instance). `connect`/`disconnect` are exact inverses as batch
//! sets — replaying one after the other nets to nothing (§8 property 3).

use bitcoin::{Block, OutPoint, Transaction, TxOut};

use crate::address::recognize;
use crate::codec::{ActivityKey, UnspentKey, UnspentValue};
use crate::store::BatchOp;

/// Borrowed stand-in for the connected/disconnected block's position,
/// replacing the raw `CBlockIndex*` the source code threads around: no
/// shared ownership is needed because the applier never retains it past the
/// call.
#[derive(Debug, Clone, Copy)]
pub struct TipDescriptor {
	pub height: i32,
	pub block_hash: bitcoin::BlockHash,
}

/// Resolves a previous output without committing the applier to any
/// concrete UTXO set representation. The host's coin cache implements this.
pub trait CoinView {
	fn get_prevout(&self, outpoint: &OutPoint) -> Option<TxOut>;
}

/// Original heights of every input's previous output, one `Vec<i32>` per
/// non-coinbase transaction, indexed like `tx.input`. Supplied by the host
/// alongside the disconnected block; this is the typed form of the source's
/// `blockUndo.vtxundo[i-1].vprevout[j].GetHeight()`.
#[derive(Debug, Clone)]
pub struct BlockUndoData {
	pub tx_undo: Vec<Vec<i32>>,
}

/// Build the batch for connecting `block` at `tip`. Outputs within each
/// transaction are walked high-to-low, then inputs high-to-low, so the
/// batch is produced in descending key order within a transaction — a
/// convention the store does not require but that keeps batches stable
/// across re-derivation.
pub fn connect(block: &Block, tip: &TipDescriptor, coins: &dyn CoinView) -> Vec<BatchOp> {
	let mut ops = Vec::new();
	for (i, tx) in block.txdata.iter().enumerate() {
		connect_outputs(tx, i as u32, tip, &mut ops);
		if i != 0 {
			connect_inputs(tx, i as u32, tip, coins, &mut ops);
		}
	}
	ops
}

fn connect_outputs(tx: &Transaction, tx_index: u32, tip: &TipDescriptor, ops: &mut Vec<BatchOp>) {
	let txid = tx.compute_txid();
	for k in (0..tx.output.len()).rev() {
		let out = &tx.output[k];
		let Some((addr_type, hash)) = recognize(&out.script_pubkey) else { continue };
		let address = crate::address::AddressId::new(addr_type, hash);
		let amount = out.value.to_sat() as i64;

		ops.push(BatchOp::PutActivity(
			ActivityKey {
				address,
				height: tip.height as u32,
				tx_index,
				txid,
				io_index: k as u32,
				spending: false,
			},
			amount,
		));
		ops.push(BatchOp::PutUnspent(
			UnspentKey { address, txid, vout: k as u32 },
			UnspentValue { satoshis: amount, script: out.script_pubkey.clone(), height: tip.height },
		));
	}
}

fn connect_inputs(tx: &Transaction, tx_index: u32, tip: &TipDescriptor, coins: &dyn CoinView, ops: &mut Vec<BatchOp>) {
	let txid = tx.compute_txid();
	for j in (0..tx.input.len()).rev() {
		let prevout = &tx.input[j].previous_output;
		let Some(prev) = coins.get_prevout(prevout) else { continue };
		let Some((addr_type, hash)) = recognize(&prev.script_pubkey) else { continue };
		let address = crate::address::AddressId::new(addr_type, hash);
		let amount = prev.value.to_sat() as i64;

		ops.push(BatchOp::PutActivity(
			ActivityKey {
				address,
				height: tip.height as u32,
				tx_index,
				txid,
				io_index: j as u32,
				spending: true,
			},
			-amount,
		));
		ops.push(BatchOp::DeleteUnspent(UnspentKey { address, txid: prevout.txid, vout: prevout.vout }));
	}
}

/// Exact inverse of `connect`: `'a'` writes become erases, `'u'` writes
/// become erases, and the `'u'` erases become writes reconstituted from
/// `undo.tx_undo` with the output's original height.
pub fn disconnect(
	block: &Block,
	undo: &BlockUndoData,
	tip: &TipDescriptor,
	coins: &dyn CoinView,
) -> Vec<BatchOp> {
	let mut ops = Vec::new();
	for (i, tx) in block.txdata.iter().enumerate() {
		disconnect_outputs(tx, i as u32, tip, &mut ops);
		if i != 0 {
			let tx_undo = undo.tx_undo.get(i - 1);
			disconnect_inputs(tx, i as u32, tip, coins, tx_undo, &mut ops);
		}
	}
	ops
}

fn disconnect_outputs(tx: &Transaction, tx_index: u32, tip: &TipDescriptor, ops: &mut Vec<BatchOp>) {
	let txid = tx.compute_txid();
	for k in (0..tx.output.len()).rev() {
		let out = &tx.output[k];
		let Some((addr_type, hash)) = recognize(&out.script_pubkey) else { continue };
		let address = crate::address::AddressId::new(addr_type, hash);

		ops.push(BatchOp::DeleteActivity(ActivityKey {
			address,
			height: tip.height as u32,
			tx_index,
			txid,
			io_index: k as u32,
			spending: false,
		}));
		ops.push(BatchOp::DeleteUnspent(UnspentKey { address, txid, vout: k as u32 }));
	}
}

fn disconnect_inputs(
	tx: &Transaction,
	tx_index: u32,
	tip: &TipDescriptor,
	coins: &dyn CoinView,
	tx_undo: Option<&Vec<i32>>,
	ops: &mut Vec<BatchOp>,
) {
	let txid = tx.compute_txid();
	for j in (0..tx.input.len()).rev() {
		let prevout = &tx.input[j].previous_output;
		let Some(prev) = coins.get_prevout(prevout) else { continue };
		let Some((addr_type, hash)) = recognize(&prev.script_pubkey) else { continue };
		let address = crate::address::AddressId::new(addr_type, hash);
		let amount = prev.value.to_sat() as i64;
		let undo_height = tx_undo.and_then(|u| u.get(j).copied()).unwrap_or(tip.height);

		ops.push(BatchOp::DeleteActivity(ActivityKey {
			address,
			height: tip.height as u32,
			tx_index,
			txid,
			io_index: j as u32,
			spending: true,
		}));
		ops.push(BatchOp::PutUnspent(
			UnspentKey { address, txid: prevout.txid, vout: prevout.vout },
			UnspentValue { satoshis: amount, script: prev.script_pubkey.clone(), height: undo_height },
		));
	}
}
