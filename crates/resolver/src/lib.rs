//! Recipient address canonicalization.
//!
//! Turns loosely-formatted human-entered recipients (phone numbers in varied
//! national formats, already-suffixed network addresses) into canonical
//! network addresses, combining pure format normalization with a live
//! existence check against the network.

pub mod address;
pub mod phone;
pub mod resolve;

pub use {
    address::{Address, Server},
    resolve::{ExistenceProbe, RecipientResolver, Resolution, Verification},
};
