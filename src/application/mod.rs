// Application layer - use cases and orchestration around the ledger:
// - PaymentService: serialized ledger access, conversion, vendor notification
// - AppConfig: layered settings for a session

pub mod error;
pub mod service;
pub mod settings;

pub use error::*;
pub use service::*;
pub use settings::*;
