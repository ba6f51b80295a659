//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, email verification, password reset
//! - `bog` - Bank of Georgia payments (token cache, orders, callbacks)
//! - `cart` - Cart lines and the saved shipping address
//! - `catalog` - Cached product reads and admin product writes
//! - `cloudinary` - Signed product image uploads
//! - `email` - Transactional email through Resend
//! - `orders` - Checkout and payment status
//!
//! Request-scoped services borrow the pool and shared clients from
//! [`AppState`](crate::state::AppState); only the clients themselves live
//! for the whole process.

pub mod auth;
pub mod bog;
pub mod cart;
pub mod catalog;
pub mod cloudinary;
pub mod email;
pub mod orders;
