//! Cart quantity rules against the storefront database.

use oakhouse_core::{ProductId, UserId};
use oakhouse_integration_tests::{pool, seed_product, seed_user};
use oakhouse_storefront::services::cart::{CartError, CartService};

#[tokio::test]
#[ignore = "Requires storefront database"]
async fn test_add_merges_quantities() {
    let pool = pool().await;
    let user = UserId::new(seed_user(&pool).await);
    let product = ProductId::new(seed_product(&pool, "180.50", 10).await);
    let cart = CartService::new(&pool);

    cart.add(user, product, 2).await.expect("first add");
    let view = cart.add(user, product, 3).await.expect("second add");

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items.first().map(|line| line.quantity), Some(5));
    assert_eq!(view.item_count, 5);
}

#[tokio::test]
#[ignore = "Requires storefront database"]
async fn test_add_is_capped_by_stock() {
    let pool = pool().await;
    let user = UserId::new(seed_user(&pool).await);
    let product = ProductId::new(seed_product(&pool, "1250.00", 3).await);
    let cart = CartService::new(&pool);

    cart.add(user, product, 2).await.expect("within stock");

    let err = cart
        .add(user, product, 2)
        .await
        .expect_err("four units of three in stock");
    assert!(
        matches!(err, CartError::InsufficientStock { available: 3 }),
        "got {err:?}"
    );

    let view = cart.view(user).await.expect("view");
    assert_eq!(
        view.items.first().map(|line| line.quantity),
        Some(2),
        "failed add leaves the line alone"
    );
}
