//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` directly; the typed ids and [`Email`]
//! from `oakhouse-core` decode straight out of Postgres.
//!
//! [`Email`]: oakhouse_core::Email

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartView, ShippingAddress};
pub use order::{AdminOrder, Order, OrderDetail, OrderItem};
pub use product::{Page, Product, ProductInput, ProductQuery};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
