//! C8 — wire envelopes.
//!
//! Two thin codecs over the same core calls, no transport: [`binary`] frames
//! the `STBTS` peer command (`G`/`R`/`T`), [`rpc`] defines the JSON-RPC
//! request/response shapes. Neither module talks to a socket or an HTTP
//! server; that's the host's job.

pub mod binary;
pub mod rpc;
