//! Domain types shared across the Oakhouse crates.

pub mod email;
pub mod id;
pub mod money;
pub mod payment;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use payment::PaymentStatus;
