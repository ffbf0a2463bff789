//! Currency normalization: turning a foreign-currency amount into the
//! ledger's home currency through an external rate provider.

mod frankfurter;
mod normalizer;
mod provider;

pub use frankfurter::*;
pub use normalizer::*;
pub use provider::*;
