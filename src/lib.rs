pub mod application;
pub mod cli;
pub mod conversion;
pub mod domain;
pub mod io;
pub mod observability;

pub use application::PaymentService;
pub use domain::*;
