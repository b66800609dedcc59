//! Transaction classification.
//!
//! Given a raw transaction and a snapshot of the ownership registry, every
//! input and output is labeled as external, owned by an account's explicit
//! address, or owned through an account's key pool. On top of the labeled
//! view sits the "net of change" projection, which strips internal
//! movement, and the presentation helpers that turn a projection into a
//! net amount, a title and per-destination subtitles.
//!
//! Classification is pure: it never mutates the registry and depends only
//! on its inputs.

/// Net amount, title and subtitle derivation
pub mod summary;
/// Classified inputs/outputs and the change projection
pub mod txio;

pub use summary::{Subtitle, net_amount, subtitles, title};
pub use txio::{TxInfo, TxIo};
