//! Checkout and payment state.
//!
//! An order is created from the cart, registered with BOG, and later moved
//! to paid by whichever arrives first: the signed callback or a status poll.
//! Both paths end in [`OrderService::apply_receipt`].

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use oakhouse_core::{Money, OrderId, UserId};

use crate::config::StorefrontConfig;
use crate::db::orders::{NewOrderItem, PaymentUpdate};
use crate::db::{CartRepository, OrderRepository, RepositoryError, UserRepository};
use crate::models::{AdminOrder, Order, OrderDetail};
use crate::services::bog::{
    BasketItem, BogClient, BogError, CallbackEvent, CreateOrderRequest, Receipt,
};
use crate::services::catalog::ProductCache;
use crate::services::email::EmailClient;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Checkout needs a saved shipping address.
    #[error("shipping address is required")]
    MissingAddress,

    /// A cart line asks for more than is in stock.
    #[error("only {available} of {product} in stock")]
    InsufficientStock { product: String, available: i32 },

    /// Order doesn't exist or belongs to someone else.
    #[error("order not found")]
    NotFound,

    /// Callback refers to an order registered under a different BOG id.
    #[error("payment id mismatch for order {0}")]
    PaymentMismatch(OrderId),

    /// Payment gateway error.
    #[error("payment gateway error: {0}")]
    Payment(#[from] BogError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of starting checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub order: Order,
    /// BOG hosted payment page.
    pub redirect_url: String,
}

/// Who is asking for an order.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Viewer {
    fn can_see(self, order: &Order) -> bool {
        self.is_admin || order.user_id == self.user_id
    }
}

/// Order service for one request.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    carts: CartRepository<'a>,
    users: UserRepository<'a>,
    bog: &'a BogClient,
    email: &'a EmailClient,
    products: &'a ProductCache,
    config: &'a StorefrontConfig,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        bog: &'a BogClient,
        email: &'a EmailClient,
        products: &'a ProductCache,
        config: &'a StorefrontConfig,
    ) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            carts: CartRepository::new(pool),
            users: UserRepository::new(pool),
            bog,
            email,
            products,
            config,
        }
    }

    /// Turn the user's cart into an order and start the BOG payment.
    ///
    /// Prices come from the catalog at this moment, never from the client.
    /// The cart is left untouched until the payment succeeds.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `OrderError::MissingAddress` or
    /// `OrderError::InsufficientStock` if the cart can't be ordered.
    /// Returns `OrderError::Payment` if BOG rejects the order.
    #[instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Checkout, OrderError> {
        let lines = self.carts.lines(user_id).await?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let address = self
            .carts
            .shipping_address(user_id)
            .await?
            .ok_or(OrderError::MissingAddress)?;

        if let Some(line) = lines.iter().find(|line| line.quantity > line.stock) {
            return Err(OrderError::InsufficientStock {
                product: line.name.clone(),
                available: line.stock.max(0),
            });
        }

        let items: Vec<NewOrderItem> = lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                name: line.name.clone(),
                image: line.image.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();
        let total = order_total(&items);

        let (order, _) = self
            .orders
            .create(user_id, &address, total, &items)
            .await?;
        tracing::info!(order_id = %order.id, total = %total, "Order created");

        let request = self.payment_request(order.id, Money::gel(total), &items);
        let created = self.bog.create_order(&request).await?;

        let order = self.orders.set_payment_id(order.id, &created.id).await?;

        Ok(Checkout {
            order,
            redirect_url: created.redirect_url,
        })
    }

    /// An order with its lines, if `viewer` may see it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist or belongs
    /// to another customer.
    pub async fn detail(&self, viewer: Viewer, id: OrderId) -> Result<OrderDetail, OrderError> {
        let order = self.visible_order(viewer, id).await?;
        let items = self.orders.items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the database operation fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Ask BOG for the payment status of an unpaid order and record it.
    ///
    /// Paid orders and orders never registered with BOG are returned as is.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if `viewer` may not see the order.
    /// Returns `OrderError::Payment` if BOG can't be reached.
    #[instrument(skip(self))]
    pub async fn refresh_status(&self, viewer: Viewer, id: OrderId) -> Result<Order, OrderError> {
        let order = self.visible_order(viewer, id).await?;

        let Some(payment_id) = order.payment_id.as_deref() else {
            return Ok(order);
        };
        if order.is_paid {
            return Ok(order);
        }

        let receipt = self.bog.receipt(payment_id).await?;
        self.apply_receipt(order.id, &receipt).await
    }

    /// Record a verified payment callback.
    ///
    /// The order is found by BOG order id, falling back to our own id in
    /// `external_order_id` for callbacks that race `checkout` storing the
    /// payment id.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no order matches.
    /// Returns `OrderError::PaymentMismatch` if the order was registered
    /// under a different BOG id.
    #[instrument(skip(self, event), fields(bog_order_id = %event.body.order_id))]
    pub async fn handle_callback(&self, event: &CallbackEvent) -> Result<Order, OrderError> {
        let receipt = &event.body;

        let order = match self.orders.get_by_payment_id(&receipt.order_id).await? {
            Some(order) => order,
            None => {
                let id = receipt
                    .external_order_id
                    .as_deref()
                    .and_then(|raw| raw.parse::<OrderId>().ok())
                    .ok_or(OrderError::NotFound)?;
                let order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
                if order
                    .payment_id
                    .as_deref()
                    .is_some_and(|existing| existing != receipt.order_id)
                {
                    return Err(OrderError::PaymentMismatch(order.id));
                }
                order
            }
        };

        self.apply_receipt(order.id, receipt).await
    }

    /// Store a receipt on an order. The first paid receipt also decrements
    /// stock, drops the ordered lines from the cart and emails a confirmation.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn apply_receipt(&self, id: OrderId, receipt: &Receipt) -> Result<Order, OrderError> {
        let status = receipt.status();
        let payload = serde_json::to_value(receipt)
            .map_err(|e| OrderError::Payment(BogError::Parse(e.to_string())))?;

        let update = self
            .orders
            .apply_payment(id, status, &payload)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })?;

        match &update {
            PaymentUpdate::Paid(order) => {
                tracing::info!(order_id = %order.id, "Order paid");
                // Stock changed.
                self.products.invalidate_all().await;
                self.send_confirmation(order).await;
            }
            PaymentUpdate::AlreadyPaid(order) => {
                tracing::debug!(order_id = %order.id, status = %status, "Order already paid");
            }
            PaymentUpdate::Recorded(order) => {
                tracing::info!(order_id = %order.id, status = %status, "Payment status recorded");
            }
        }

        Ok(update.into_order())
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the database operation fails.
    pub async fn list_all(
        &self,
        paid: Option<bool>,
        delivered: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminOrder>, i64), OrderError> {
        Ok(self.orders.list_all(paid, delivered, limit, offset).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order, OrderError> {
        let order = self.orders.mark_delivered(id).await.map_err(|e| match e {
            RepositoryError::NotFound => OrderError::NotFound,
            other => OrderError::Repository(other),
        })?;
        tracing::info!(order_id = %order.id, "Order delivered");
        Ok(order)
    }

    async fn visible_order(&self, viewer: Viewer, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get(id)
            .await?
            .filter(|order| viewer.can_see(order))
            .ok_or(OrderError::NotFound)
    }

    fn payment_request(
        &self,
        id: OrderId,
        total: Money,
        items: &[NewOrderItem],
    ) -> CreateOrderRequest {
        let order_url = format!("{}/orders/{id}", self.config.frontend_url);
        let basket = items
            .iter()
            .map(|item| BasketItem {
                product_id: item.product_id.to_string(),
                description: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.price,
            })
            .collect();

        CreateOrderRequest::new(
            id.to_string(),
            self.config.bog_callback_url(),
            total,
            basket,
            format!("{order_url}?status=success"),
            format!("{order_url}?status=fail"),
        )
    }

    async fn send_confirmation(&self, order: &Order) {
        let (user, items) = match (
            self.users.get_by_id(order.user_id).await,
            self.orders.items(order.id).await,
        ) {
            (Ok(Some(user)), Ok(items)) => (user, items),
            (Ok(None), _) => {
                tracing::error!(order_id = %order.id, "Order owner missing, no confirmation sent");
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(order_id = %order.id, error = %e, "Failed to load order for confirmation");
                return;
            }
        };

        let link = format!("{}/orders/{}", self.config.frontend_url, order.id);
        if let Err(e) = self
            .email
            .send_order_confirmation(user.email.as_str(), &user.name, order, &items, &link)
            .await
        {
            tracing::error!(order_id = %order.id, error = %e, "Failed to send order confirmation");
        }
    }
}

/// Sum of line totals in lari, rounded to tetri.
fn order_total(items: &[NewOrderItem]) -> Decimal {
    let sum = items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();
    Money::gel(sum).rounded()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use oakhouse_core::ProductId;

    use super::*;

    fn item(price: &str, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(1),
            name: "Oak shelf".to_string(),
            image: None,
            price: price.parse().unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_order_total_sums_lines() {
        let items = [item("1250.00", 1), item("180.50", 4)];
        assert_eq!(order_total(&items), "1972.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_order_total_empty_is_zero() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }
}
