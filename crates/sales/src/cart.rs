use serde::{Deserialize, Serialize};

use warung_core::ProductId;

use crate::CheckoutError;

/// One requested line of a checkout. Input only, never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }
}

/// Reject an empty cart or any line with a non-positive product id or quantity.
///
/// Duplicate product ids are allowed; checkout treats each line on its own.
pub fn validate_cart(items: &[CartItem]) -> Result<(), CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::validation("items cannot be empty"));
    }

    for (idx, item) in items.iter().enumerate() {
        if item.product_id.get() <= 0 {
            return Err(CheckoutError::validation(format!(
                "invalid product_id {} (line {idx})",
                item.product_id
            )));
        }
        if item.quantity <= 0 {
            return Err(CheckoutError::validation(format!(
                "quantity must be greater than 0 (line {idx})"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(validate_cart(&[]), Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn non_positive_ids_and_quantities_are_rejected() {
        let err = validate_cart(&[CartItem::new(1, 1), CartItem::new(0, 1)]).unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref m) if m.contains("product_id") && m.contains("line 1")));

        let err = validate_cart(&[CartItem::new(1, 0)]).unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref m) if m.contains("quantity")));

        let err = validate_cart(&[CartItem::new(1, -4)]).unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn duplicate_products_are_allowed() {
        assert!(validate_cart(&[CartItem::new(1, 2), CartItem::new(1, 3)]).is_ok());
    }

    #[test]
    fn deserializes_from_request_json() {
        let item: CartItem = serde_json::from_str(r#"{"product_id": 4, "quantity": 2}"#).unwrap();
        assert_eq!(item, CartItem::new(4, 2));
    }

    proptest! {
        /// Property: a cart of strictly positive lines always validates.
        #[test]
        fn positive_lines_validate(lines in proptest::collection::vec((1i64..10_000, 1i64..1_000), 1..20)) {
            let items: Vec<CartItem> = lines.into_iter().map(|(p, q)| CartItem::new(p, q)).collect();
            prop_assert!(validate_cart(&items).is_ok());
        }

        /// Property: one non-positive quantity anywhere fails the whole cart.
        #[test]
        fn any_bad_quantity_fails(
            lines in proptest::collection::vec((1i64..10_000, 1i64..1_000), 0..10),
            bad in -1_000i64..=0,
            at in 0usize..10,
        ) {
            let mut items: Vec<CartItem> = lines.into_iter().map(|(p, q)| CartItem::new(p, q)).collect();
            let at = at.min(items.len());
            items.insert(at, CartItem::new(1, bad));
            prop_assert!(validate_cart(&items).is_err());
        }
    }
}
