//! Cart repository.
//!
//! Every user has at most one cart row, created on first write. Reads on a
//! user without a cart behave like an empty cart.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use oakhouse_core::{CartId, OrderId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, ShippingAddress};

/// Repository for `storefront.cart` and `storefront.cart_item`.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart id, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Cart lines joined with current product data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r"
            SELECT p.id AS product_id, p.name, p.slug, p.images[1] AS image,
                   p.price, p.stock, ci.quantity
            FROM storefront.cart c
            JOIN storefront.cart_item ci ON ci.cart_id = c.id
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE c.user_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }

    /// Quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<i32>, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r"
            SELECT ci.quantity
            FROM storefront.cart c
            JOIN storefront.cart_item ci ON ci.cart_id = c.id
            WHERE c.user_id = $1 AND ci.product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(quantity)
    }

    /// Set the quantity of a line, inserting it if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        self.touch(cart_id).await
    }

    /// Returns `true` if a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_item ci
            USING storefront.cart c
            WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line. The saved address is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM storefront.cart_item ci
            USING storefront.cart c
            WHERE ci.cart_id = c.id AND c.user_id = $1
            ",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shipping_address(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShippingAddress>, RepositoryError> {
        let address = sqlx::query_scalar::<_, Option<Json<ShippingAddress>>>(
            "SELECT shipping_address FROM storefront.cart WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(address.flatten().map(|Json(a)| a))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save_shipping_address(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id, shipping_address)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET shipping_address = EXCLUDED.shipping_address, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(Json(address))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.cart SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Remove the cart lines for products in `order_id`, inside the
/// transaction that marks the order paid. Lines added after checkout stay.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn remove_ordered_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        DELETE FROM storefront.cart_item ci
        USING storefront.cart c
        WHERE ci.cart_id = c.id
          AND c.user_id = $1
          AND ci.product_id IN (
              SELECT oi.product_id FROM storefront.order_item oi
              WHERE oi.order_id = $2 AND oi.product_id IS NOT NULL
          )
        ",
    )
    .bind(user_id)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
