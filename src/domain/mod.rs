mod account;
mod currency;
mod ledger;
mod money;
mod profile;

pub use account::*;
pub use currency::*;
pub use ledger::*;
pub use money::*;
pub use profile::*;
