mod export;
mod vendor;

pub use export::*;
pub use vendor::*;
