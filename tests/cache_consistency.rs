//! Every write leaves no stale cached response behind for the reads it affects.

mod support;

use gemstore::application::categories::CategoryError;
use gemstore::application::orders::{CreateOrderCommand, OrderItemInput, PlacedOrder};
use gemstore::application::pagination::PageRequest;
use gemstore::application::products::{ProductError, UpdateProductCommand};
use gemstore::cache::{CacheKey, CacheTrigger, KvCache};
use rust_decimal::Decimal;

use gemstore::domain::entities::ProductRecord;

use support::{TestApp, product_command};

fn first_page() -> PageRequest {
    PageRequest::new(1, 12)
}

async fn cached(app: &TestApp, key: &CacheKey) -> Option<String> {
    app.cache.get(&key.to_string()).await.expect("memory cache")
}

async fn order_for(app: &TestApp, product: &ProductRecord) -> PlacedOrder {
    app.orders
        .place_order(CreateOrderCommand {
            name: Some("Grace".into()),
            address: Some("2 Quartz Lane".into()),
            telephone: Some("0456".into()),
            email: Some("grace@example.com".into()),
            note: None,
            delivery_method: Some("pickup".into()),
            items: vec![OrderItemInput {
                product_id: Some(product.id.to_string()),
                unit_price: Some(Decimal::new(4550, 2)),
                quantity: Some(1),
            }],
        })
        .await
        .expect("place order")
}

#[tokio::test]
async fn moving_a_product_updates_both_category_listings() {
    let app = TestApp::new();
    let sapphires = app.category("Blue Sapphires").await;
    assert_eq!(sapphires.slug, "blue-sapphires");
    let rings = app.category("Rings").await;
    let product = app.product("Sapphire Ring", Some(&sapphires)).await;
    assert_eq!(product.price, Decimal::new(12000, 2));

    let before = app
        .categories
        .category_page("blue-sapphires", first_page())
        .await
        .expect("sapphire page");
    assert!(before.contains("\"slug\":\"sapphire-ring\""));
    assert!(
        cached(&app, &CacheKey::category_page("blue-sapphires", first_page()))
            .await
            .is_some()
    );

    let rings_before = app
        .categories
        .category_page("rings", first_page())
        .await
        .expect("rings page");
    assert!(!rings_before.contains("sapphire-ring"));

    app.products
        .update_product(
            "sapphire-ring",
            UpdateProductCommand {
                category_id: Some(rings.id.to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("move product");

    let after = app
        .categories
        .category_page("blue-sapphires", first_page())
        .await
        .expect("sapphire page");
    assert!(!after.contains("sapphire-ring"));

    let rings_after = app
        .categories
        .category_page("rings", first_page())
        .await
        .expect("rings page");
    assert!(rings_after.contains("\"slug\":\"sapphire-ring\""));
}

#[tokio::test]
async fn every_cached_page_of_a_category_is_dropped() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.product("Ruby Ring", Some(&rings)).await;

    for (page, limit) in [(1, 12), (2, 12), (1, 5), (1, 100)] {
        app.categories
            .category_page("rings", PageRequest::new(page, limit))
            .await
            .expect("page");
    }
    app.categories
        .category_page("all", first_page())
        .await
        .expect("all page");

    app.product("Opal Ring", Some(&rings)).await;

    for (page, limit) in [(1, 12), (2, 12), (1, 5), (1, 100)] {
        let key = CacheKey::category_page("rings", PageRequest::new(page, limit));
        assert!(cached(&app, &key).await.is_none(), "{key} survived");
    }
    assert!(
        cached(&app, &CacheKey::category_page("all", first_page()))
            .await
            .is_none()
    );

    let listing = app
        .categories
        .category_page("rings", first_page())
        .await
        .expect("page");
    assert!(listing.contains("opal-ring"));
    assert!(listing.contains("\"total\":2"));
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache_byte_for_byte() {
    let app = TestApp::new();
    app.category("Pearls").await;

    let first = app.categories.list_categories().await.expect("list");
    let second = app.categories.list_categories().await.expect("list");

    assert_eq!(first, second);
    assert_eq!(app.store.category_list_loads(), 1);
}

#[tokio::test]
async fn not_found_results_are_never_cached() {
    let app = TestApp::new();

    let err = app
        .products
        .product_by_slug("missing")
        .await
        .expect_err("no product");
    assert!(matches!(err, ProductError::NotFound("Product not found")));
    assert!(app.categories.list_categories().await.is_err());
    assert!(app.cache.is_empty());

    app.category("Pearls").await;
    let listing = app.categories.list_categories().await.expect("list");
    assert!(listing.contains("\"slug\":\"pearls\""));
}

#[tokio::test]
async fn renaming_a_category_refreshes_embedded_product_payloads() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.product("Ruby Ring", Some(&rings)).await;

    let before = app
        .products
        .product_by_slug("ruby-ring")
        .await
        .expect("product");
    assert!(before.contains("\"name\":\"Rings\""));
    let products_before = app.products.list_products().await.expect("products");
    assert!(products_before.contains("\"name\":\"Rings\""));

    app.categories
        .rename_category(rings.id, "Statement Rings")
        .await
        .expect("rename");

    let after = app
        .products
        .product_by_slug("ruby-ring")
        .await
        .expect("product");
    assert!(after.contains("\"slug\":\"statement-rings\""));
    let products_after = app.products.list_products().await.expect("products");
    assert!(products_after.contains("\"name\":\"Statement Rings\""));
    assert!(
        app.categories
            .category_page("rings", first_page())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn deleting_a_category_uncategorises_cached_products() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.product("Ruby Ring", Some(&rings)).await;
    app.products
        .product_by_slug("ruby-ring")
        .await
        .expect("product");

    app.categories
        .delete_category(rings.id)
        .await
        .expect("delete");

    let after = app
        .products
        .product_by_slug("ruby-ring")
        .await
        .expect("product survives");
    assert!(after.contains("\"category\":null"));
    assert_eq!(app.store.product_count(), 1);
}

#[tokio::test]
async fn deleting_a_category_refreshes_all_listing_and_orders() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    let ruby = app.product("Ruby Ring", Some(&rings)).await;
    let placed = order_for(&app, &ruby).await;
    let rings_id = rings.id.to_string();

    let all_before = app
        .categories
        .category_page("all", first_page())
        .await
        .expect("all page");
    assert!(all_before.contains(&rings_id));
    let order_before = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(order_before.contains(&rings_id));
    let orders_before = app.orders.list_orders().await.expect("orders");
    assert!(orders_before.contains(&rings_id));

    app.categories
        .delete_category(rings.id)
        .await
        .expect("delete");

    let all_after = app
        .categories
        .category_page("all", first_page())
        .await
        .expect("all page");
    assert!(all_after.contains("ruby-ring"));
    assert!(!all_after.contains(&rings_id), "stale all listing");
    let order_after = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(!order_after.contains(&rings_id), "stale order");
    let orders_after = app.orders.list_orders().await.expect("orders");
    assert!(!orders_after.contains(&rings_id), "stale order list");
}

#[tokio::test]
async fn deleting_a_product_drops_every_entry_that_shows_it() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    let ruby = app.product("Ruby Ring", Some(&rings)).await;
    app.product("Opal Ring", Some(&rings)).await;
    let placed = order_for(&app, &ruby).await;

    app.products
        .product_by_slug("ruby-ring")
        .await
        .expect("product");
    app.products.list_products().await.expect("products");
    app.categories
        .category_page("rings", first_page())
        .await
        .expect("rings page");
    app.categories
        .category_page("all", first_page())
        .await
        .expect("all page");
    let order_before = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(order_before.contains("ruby-ring"));

    app.products.delete_product(ruby.id).await.expect("delete");

    assert!(app.products.product_by_slug("ruby-ring").await.is_err());
    let products = app.products.list_products().await.expect("products");
    assert!(!products.contains("ruby-ring"));
    for slug in ["rings", "all"] {
        let page = app
            .categories
            .category_page(slug, first_page())
            .await
            .expect("page");
        assert!(!page.contains("ruby-ring"), "{slug} still lists it");
        assert!(page.contains("\"total\":1"));
    }
    let order_after = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(!order_after.contains("ruby-ring"));
}

#[tokio::test]
async fn renaming_a_product_retires_its_old_slug() {
    let app = TestApp::new();
    app.product("Jade Pendant", None).await;
    app.products
        .product_by_slug("jade-pendant")
        .await
        .expect("product");
    assert!(
        cached(&app, &CacheKey::product("jade-pendant"))
            .await
            .is_some()
    );

    app.products
        .update_product(
            "jade-pendant",
            UpdateProductCommand {
                name: Some("Imperial Jade Pendant".into()),
                ..Default::default()
            },
        )
        .await
        .expect("rename product");

    assert!(
        cached(&app, &CacheKey::product("jade-pendant"))
            .await
            .is_none()
    );
    let err = app
        .products
        .product_by_slug("jade-pendant")
        .await
        .expect_err("old slug gone");
    assert!(matches!(err, ProductError::NotFound(_)));
    let renamed = app
        .products
        .product_by_slug("imperial-jade-pendant")
        .await
        .expect("new slug");
    assert!(renamed.contains("Imperial Jade Pendant"));
}

#[tokio::test]
async fn duplicate_names_are_rejected_before_any_write() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.product("Ruby Ring", Some(&rings)).await;
    app.product("Opal Ring", Some(&rings)).await;

    let err = app
        .categories
        .create_category("RINGS")
        .await
        .expect_err("duplicate category");
    assert!(matches!(err, CategoryError::BadRequest(_)));

    let err = app
        .products
        .create_product(product_command("ruby ring", Some(&rings)))
        .await
        .expect_err("duplicate product");
    assert!(matches!(err, ProductError::BadRequest(_)));
    assert_eq!(app.store.product_count(), 2);

    let err = app
        .products
        .update_product(
            "opal-ring",
            UpdateProductCommand {
                name: Some("Ruby Ring".into()),
                ..Default::default()
            },
        )
        .await
        .expect_err("rename onto existing slug");
    assert_eq!(
        err.to_string(),
        "Another product already exists with name \"Ruby Ring\""
    );
}

#[tokio::test]
async fn order_status_change_is_visible_on_next_read() {
    let app = TestApp::new();
    let product = app.product("Jade Pendant", None).await;

    let placed = app
        .orders
        .place_order(CreateOrderCommand {
            name: Some("Grace".into()),
            address: Some("2 Quartz Lane".into()),
            telephone: Some("0456".into()),
            email: Some("grace@example.com".into()),
            note: None,
            delivery_method: Some("delivery".into()),
            items: vec![OrderItemInput {
                product_id: Some(product.id.to_string()),
                unit_price: Some(Decimal::new(4550, 2)),
                quantity: Some(2),
            }],
        })
        .await
        .expect("place order");
    assert!(placed.order_code.starts_with("ORDER-"));

    let before = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(before.contains("\"status\":\"ordered\""));
    app.orders.list_orders().await.expect("orders");

    app.orders
        .update_status(placed.id, Some("shipped"))
        .await
        .expect("ship");

    let after = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(after.contains("\"status\":\"shipped\""));
    let listing = app.orders.list_orders().await.expect("orders");
    assert!(listing.contains("\"status\":\"shipped\""));
}

#[tokio::test]
async fn editing_a_product_refreshes_orders_that_embed_it() {
    let app = TestApp::new();
    let product = app.product("Jade Pendant", None).await;
    let placed = app
        .orders
        .place_order(CreateOrderCommand {
            name: Some("Grace".into()),
            address: Some("2 Quartz Lane".into()),
            telephone: Some("0456".into()),
            email: Some("grace@example.com".into()),
            note: None,
            delivery_method: Some("pickup".into()),
            items: vec![OrderItemInput {
                product_id: Some(product.id.to_string()),
                unit_price: Some(Decimal::new(4550, 2)),
                quantity: Some(1),
            }],
        })
        .await
        .expect("place order");
    app.orders.order_by_id(placed.id).await.expect("order");

    app.products
        .update_product(
            "jade-pendant",
            UpdateProductCommand {
                name: Some("Imperial Jade Pendant".into()),
                ..Default::default()
            },
        )
        .await
        .expect("rename product");

    let after = app.orders.order_by_id(placed.id).await.expect("order");
    assert!(after.contains("Imperial Jade Pendant"));
    // The captured line price stays as ordered.
    assert!(after.contains("\"unitPrice\":\"45.50\""));
}

#[tokio::test]
async fn invalidation_is_idempotent() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.categories
        .category_page("rings", first_page())
        .await
        .expect("page");

    let trigger = CacheTrigger::new(app.client.clone(), app.store.clone());
    let first = trigger.product_created("ruby-ring", Some(rings.id)).await;
    let second = trigger.product_created("ruby-ring", Some(rings.id)).await;

    assert!(first.keys_deleted >= 1);
    assert_eq!(second.keys_deleted, 0);
    assert_eq!(second.failures, 0);
}

#[tokio::test]
async fn cache_outage_degrades_to_direct_reads() {
    let app = TestApp::new();
    app.category("Pearls").await;
    app.cache.set_available(false);

    let first = app.categories.list_categories().await.expect("list");
    app.category("Opals").await;
    let second = app.categories.list_categories().await.expect("list");

    assert!(first.contains("pearls"));
    assert!(second.contains("opals"));
    assert_eq!(app.store.category_list_loads(), 2);

    app.cache.set_available(true);
    assert!(app.cache.is_empty());
}
