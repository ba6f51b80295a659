//! Order repository.

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use oakhouse_core::{OrderId, PaymentStatus, ProductId, UserId};

use super::RepositoryError;
use super::carts::remove_ordered_in_tx;
use crate::models::{AdminOrder, Order, OrderItem, ShippingAddress};

/// A line to be written with a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Result of recording a gateway status on an order.
#[derive(Debug, Clone)]
pub enum PaymentUpdate {
    /// This call moved the order to paid.
    Paid(Order),
    /// The order was paid before; nothing changed.
    AlreadyPaid(Order),
    /// Status stored, order still unpaid.
    Recorded(Order),
}

impl PaymentUpdate {
    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Paid(order) | Self::AlreadyPaid(order) | Self::Recorded(order) => order,
        }
    }
}

/// Repository for `storefront.order` and `storefront.order_item`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
        total_price: Decimal,
        items: &[NewOrderItem],
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO storefront.order (user_id, shipping_address, total_price)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, shipping_address, total_price, is_paid, paid_at,
                      is_delivered, delivered_at, payment_id, payment_status,
                      payment_result, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(Json(address))
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let line = sqlx::query_as::<_, OrderItem>(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_id, name, image, price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, order_id, product_id, name, image, price, quantity
                ",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.image.as_deref())
            .bind(item.price)
            .bind(item.quantity)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(line);
        }

        tx.commit().await?;
        Ok((order, lines))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, shipping_address, total_price, is_paid, paid_at,
                   is_delivered, delivered_at, payment_id, payment_status,
                   payment_result, created_at, updated_at
            FROM storefront.order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Look up an order by the gateway's order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, shipping_address, total_price, is_paid, paid_at,
                   is_delivered, delivered_at, payment_id, payment_status,
                   payment_result, created_at, updated_at
            FROM storefront.order
            WHERE payment_id = $1
            ",
        )
        .bind(payment_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, name, image, price, quantity
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, shipping_address, total_price, is_paid, paid_at,
                   is_delivered, delivered_at, payment_id, payment_status,
                   payment_result, created_at, updated_at
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// All orders for the admin panel, optionally filtered, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        paid: Option<bool>,
        delivered: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminOrder>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, AdminOrder>(
            r"
            SELECT o.id, o.user_id, o.shipping_address, o.total_price, o.is_paid, o.paid_at,
                   o.is_delivered, o.delivered_at, o.payment_id, o.payment_status,
                   o.payment_result, o.created_at, o.updated_at,
                   u.email AS customer_email, u.name AS customer_name
            FROM storefront.order o
            JOIN storefront.user u ON u.id = o.user_id
            WHERE ($1::boolean IS NULL OR o.is_paid = $1)
              AND ($2::boolean IS NULL OR o.is_delivered = $2)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(paid)
        .bind(delivered)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM storefront.order
            WHERE ($1::boolean IS NULL OR is_paid = $1)
              AND ($2::boolean IS NULL OR is_delivered = $2)
            ",
        )
        .bind(paid)
        .bind(delivered)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Remember the gateway order id once the payment has been started.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_payment_id(
        &self,
        id: OrderId,
        payment_id: &str,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            r"
            UPDATE storefront.order
            SET payment_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, shipping_address, total_price, is_paid, paid_at,
                      is_delivered, delivered_at, payment_id, payment_status,
                      payment_result, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(payment_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a gateway status under a row lock.
    ///
    /// On the first transition to paid this also decrements stock for every
    /// line and removes the ordered products from the customer's cart, all
    /// in the same transaction.
    /// A paid order is never changed again, so concurrent callbacks and
    /// status polls cannot apply a payment twice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn apply_payment(
        &self,
        id: OrderId,
        status: PaymentStatus,
        payload: &serde_json::Value,
    ) -> Result<PaymentUpdate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, shipping_address, total_price, is_paid, paid_at,
                   is_delivered, delivered_at, payment_id, payment_status,
                   payment_result, created_at, updated_at
            FROM storefront.order
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if current.is_paid {
            tx.commit().await?;
            return Ok(PaymentUpdate::AlreadyPaid(current));
        }

        let paid = status.is_paid();
        let order = sqlx::query_as::<_, Order>(
            r"
            UPDATE storefront.order
            SET payment_status = $2,
                payment_result = $3,
                is_paid = $4,
                paid_at = CASE WHEN $4 THEN NOW() ELSE paid_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, shipping_address, total_price, is_paid, paid_at,
                      is_delivered, delivered_at, payment_id, payment_status,
                      payment_result, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .bind(Json(payload))
        .bind(paid)
        .fetch_one(&mut *tx)
        .await?;

        if !paid {
            tx.commit().await?;
            return Ok(PaymentUpdate::Recorded(order));
        }

        sqlx::query(
            r"
            UPDATE storefront.product p
            SET stock = GREATEST(p.stock - oi.quantity, 0), updated_at = NOW()
            FROM storefront.order_item oi
            WHERE oi.order_id = $1 AND oi.product_id = p.id
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        remove_ordered_in_tx(&mut tx, order.user_id, order.id).await?;

        tx.commit().await?;
        Ok(PaymentUpdate::Paid(order))
    }

    /// Mark an order as delivered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            r"
            UPDATE storefront.order
            SET is_delivered = TRUE,
                delivered_at = COALESCE(delivered_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, shipping_address, total_price, is_paid, paid_at,
                      is_delivered, delivered_at, payment_id, payment_status,
                      payment_result, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
