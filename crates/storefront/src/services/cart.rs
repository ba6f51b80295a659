//! Cart operations.
//!
//! Quantities are checked against current stock on every write.

use sqlx::PgPool;
use thiserror::Error;

use oakhouse_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartView, ShippingAddress};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product doesn't exist.
    #[error("product not found")]
    ProductNotFound,

    /// Product isn't in the cart.
    #[error("item not in cart")]
    ItemNotFound,

    /// Quantity is zero or negative where a positive one is needed.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Requested more units than are in stock.
    #[error("only {available} in stock")]
    InsufficientStock { available: i32 },

    /// Shipping address failed validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service for one request.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's cart with current prices and the saved address.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the database operation fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, CartError> {
        let lines = self.carts.lines(user_id).await?;
        let address = self.carts.shipping_address(user_id).await?;
        Ok(CartView::new(lines, address))
    }

    /// Add units of a product, merging with any quantity already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is not positive.
    /// Returns `CartError::ProductNotFound` if the product doesn't exist.
    /// Returns `CartError::InsufficientStock` if the merged quantity exceeds stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let existing = self
            .carts
            .quantity_of(user_id, product_id)
            .await?
            .unwrap_or(0);
        let wanted = existing.saturating_add(quantity);

        self.write_quantity(user_id, product_id, wanted).await?;
        self.view(user_id).await
    }

    /// Set the quantity of a line. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is negative.
    /// Returns `CartError::ItemNotFound` if removing a line that isn't there.
    /// Returns `CartError::InsufficientStock` if `quantity` exceeds stock.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity);
        }
        if quantity == 0 {
            return self.remove(user_id, product_id).await;
        }

        self.write_quantity(user_id, product_id, quantity).await?;
        self.view(user_id).await
    }

    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product isn't in the cart.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        if !self.carts.remove(user_id, product_id).await? {
            return Err(CartError::ItemNotFound);
        }
        self.view(user_id).await
    }

    /// Remove every line. The saved address is kept.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the database operation fails.
    pub async fn clear(&self, user_id: UserId) -> Result<CartView, CartError> {
        self.carts.clear(user_id).await?;
        self.view(user_id).await
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the database operation fails.
    pub async fn shipping_address(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShippingAddress>, CartError> {
        Ok(self.carts.shipping_address(user_id).await?)
    }

    /// Validate and store the address used at checkout.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidAddress` if a required field is missing.
    pub async fn save_shipping_address(
        &self,
        user_id: UserId,
        address: ShippingAddress,
    ) -> Result<ShippingAddress, CartError> {
        let address = address.normalized().map_err(CartError::InvalidAddress)?;
        self.carts.save_shipping_address(user_id, &address).await?;
        Ok(address)
    }

    async fn write_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), CartError> {
        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        check_stock(quantity, product.stock)?;

        let cart_id = self.carts.ensure(user_id).await?;
        self.carts
            .set_quantity(cart_id, product_id, quantity)
            .await?;
        Ok(())
    }
}

/// `quantity` must not exceed `stock`.
pub(crate) const fn check_stock(quantity: i32, stock: i32) -> Result<(), CartError> {
    if quantity > stock {
        return Err(CartError::InsufficientStock {
            available: if stock < 0 { 0 } else { stock },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_stock() {
        assert!(check_stock(3, 3).is_ok());
        assert!(matches!(
            check_stock(4, 3),
            Err(CartError::InsufficientStock { available: 3 })
        ));
        assert!(matches!(
            check_stock(1, 0),
            Err(CartError::InsufficientStock { available: 0 })
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CartError::InsufficientStock { available: 2 }.to_string(),
            "only 2 in stock"
        );
        assert_eq!(
            CartError::InvalidQuantity.to_string(),
            "quantity must be at least 1"
        );
    }
}
