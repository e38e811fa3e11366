//! Read models assembled from batched repository lookups.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{
    CategoryRecord, OrderItemRecord, OrderRecord, ProductImageRecord, ProductRecord,
};
use crate::domain::slug::ALL_PRODUCTS_SLUG;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&CategoryRecord> for CategorySummary {
    fn from(record: &CategoryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub images: Vec<ProductImageRecord>,
    pub category: Option<CategorySummary>,
}

/// Category header of a paginated listing. The `all` pseudo-category has
/// no id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub slug: String,
}

impl ListingCategory {
    pub fn all_products() -> Self {
        Self {
            id: None,
            name: "All Products".to_string(),
            slug: ALL_PRODUCTS_SLUG.to_string(),
        }
    }
}

impl From<&CategoryRecord> for ListingCategory {
    fn from(record: &CategoryRecord) -> Self {
        Self {
            id: Some(record.id),
            name: record.name.clone(),
            slug: record.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryListing {
    pub category: ListingCategory,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedProduct {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub images: Vec<ProductImageRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItemRecord,
    pub product: Option<OrderedProduct>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: Uuid,
    pub owner: String,
}

fn group_images(images: Vec<ProductImageRecord>) -> HashMap<Uuid, Vec<ProductImageRecord>> {
    let mut grouped: HashMap<Uuid, Vec<ProductImageRecord>> = HashMap::new();
    for image in images {
        grouped.entry(image.product_id).or_default().push(image);
    }
    grouped
}

/// Join products with their images and categories, preserving product order.
/// Products whose category is absent from `categories` report `null`.
pub fn assemble_products(
    products: Vec<ProductRecord>,
    images: Vec<ProductImageRecord>,
    categories: &[CategoryRecord],
) -> Vec<ProductView> {
    let mut images = group_images(images);
    let categories: HashMap<Uuid, &CategoryRecord> =
        categories.iter().map(|c| (c.id, c)).collect();

    products
        .into_iter()
        .map(|product| {
            let category = product
                .category_id
                .and_then(|id| categories.get(&id))
                .map(|record| CategorySummary::from(*record));
            ProductView {
                images: images.remove(&product.id).unwrap_or_default(),
                category,
                product,
            }
        })
        .collect()
}

/// Join orders with their line items and each item's product.
pub fn assemble_orders(
    orders: Vec<OrderRecord>,
    items: Vec<OrderItemRecord>,
    products: Vec<ProductRecord>,
    images: Vec<ProductImageRecord>,
) -> Vec<OrderView> {
    let images = group_images(images);
    let products: HashMap<Uuid, ProductRecord> =
        products.into_iter().map(|p| (p.id, p)).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemRecord>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| {
            let items = items_by_order
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .map(|item| {
                    let product = products.get(&item.product_id).map(|product| OrderedProduct {
                        product: product.clone(),
                        images: images.get(&product.id).cloned().unwrap_or_default(),
                    });
                    OrderItemView { item, product }
                })
                .collect();
            OrderView { order, items }
        })
        .collect()
}

/// Distinct ids in first-seen order.
pub(crate) fn distinct_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
