//! Public-facing display codes such as `PRODUCT-0421` or `ORDER-9913`.

use uuid::Uuid;

pub const PRODUCT_CODE_PREFIX: &str = "product";
pub const ORDER_CODE_PREFIX: &str = "order";

/// Number of attempts callers make before giving up on a colliding code.
pub const MAX_CODE_ATTEMPTS: usize = 8;

/// Generate a `{PREFIX}-{NNNN}` code. Uniqueness is enforced by the store.
pub fn generate_display_code(prefix: &str) -> String {
    let digits = Uuid::new_v4().as_u128() % 10_000;
    format!("{}-{digits:04}", prefix.to_ascii_uppercase())
}
