//! # Input Validation
//!
//! Business-rule validation for incoming purchase and sale requests.
//!
//! These checks run before anything is written; a failing request must
//! leave zero side effects. Reference-id existence is NOT checked here
//! (that needs I/O) - the use-case layer resolves ids against the
//! reference data store after these structural checks pass.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{NewPurchase, NewSale};

/// Validates a purchase bill before receipt.
///
/// Checks every item so that the first reported failure is also the
/// only kind of failure: no lot is written if any item is bad.
pub fn validate_new_purchase(
    purchase: &NewPurchase,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if purchase.invoice_number.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "invoice_number".to_string(),
        });
    }

    if purchase.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for item in &purchase.items {
        if item.batch_number.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "batch_number".to_string(),
            });
        }

        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity (batch {})", item.batch_number),
            });
        }

        if item.mrp.is_negative() || item.purchase_amount.is_negative() {
            return Err(ValidationError::NegativeAmount {
                field: format!("amount (batch {})", item.batch_number),
            });
        }

        // A batch already expired at receipt could never be sold
        if item.expiry_date <= today {
            return Err(ValidationError::ExpiredAtReceipt {
                batch_number: item.batch_number.clone(),
                expiry_date: item.expiry_date.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a sale request before allocation.
pub fn validate_new_sale(sale: &NewSale) -> Result<(), ValidationError> {
    if sale.customer_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        });
    }

    if sale.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for item in &sale.items {
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity (medicine {})", item.medicine_id),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{DiscountRate, Money};
    use crate::types::{NewPurchaseItem, NewSaleItem};
    use chrono::{Duration, Utc};

    fn purchase_item(batch: &str, qty: i64, days_to_expiry: i64) -> NewPurchaseItem {
        NewPurchaseItem {
            medicine_id: 1,
            manufacturer_id: 1,
            batch_number: batch.to_string(),
            expiry_date: Utc::now().date_naive() + Duration::days(days_to_expiry),
            quantity: qty,
            mrp: Money::from_paise(1_000),
            discount: DiscountRate::zero(),
            purchase_amount: Money::from_paise(900),
        }
    }

    fn purchase(items: Vec<NewPurchaseItem>) -> NewPurchase {
        NewPurchase {
            store_id: 1,
            distributor_id: 1,
            purchase_date: Utc::now().date_naive(),
            invoice_number: "DIST-557".to_string(),
            items,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn test_valid_purchase_passes() {
        let p = purchase(vec![purchase_item("B1", 10, 365)]);
        assert!(validate_new_purchase(&p, today()).is_ok());
    }

    #[test]
    fn test_purchase_needs_items() {
        let p = purchase(vec![]);
        assert!(matches!(
            validate_new_purchase(&p, today()).unwrap_err(),
            ValidationError::Required { .. }
        ));
    }

    #[test]
    fn test_purchase_rejects_non_positive_quantity() {
        let p = purchase(vec![purchase_item("B1", 0, 365)]);
        assert!(matches!(
            validate_new_purchase(&p, today()).unwrap_err(),
            ValidationError::MustBePositive { .. }
        ));
    }

    #[test]
    fn test_purchase_rejects_expired_batch() {
        let p = purchase(vec![purchase_item("B1", 5, -1)]);
        assert!(matches!(
            validate_new_purchase(&p, today()).unwrap_err(),
            ValidationError::ExpiredAtReceipt { .. }
        ));
    }

    #[test]
    fn test_purchase_rejects_blank_batch_number() {
        let p = purchase(vec![purchase_item("  ", 5, 365)]);
        assert!(matches!(
            validate_new_purchase(&p, today()).unwrap_err(),
            ValidationError::Required { .. }
        ));
    }

    #[test]
    fn test_sale_validation() {
        let sale = NewSale {
            store_id: 1,
            customer_id: "walk-in".to_string(),
            sale_date: today(),
            items: vec![NewSaleItem {
                medicine_id: 1,
                quantity: 2,
            }],
        };
        assert!(validate_new_sale(&sale).is_ok());

        let bad = NewSale {
            items: vec![NewSaleItem {
                medicine_id: 1,
                quantity: -1,
            }],
            ..sale.clone()
        };
        assert!(matches!(
            validate_new_sale(&bad).unwrap_err(),
            ValidationError::MustBePositive { .. }
        ));

        let empty = NewSale {
            items: vec![],
            ..sale
        };
        assert!(matches!(
            validate_new_sale(&empty).unwrap_err(),
            ValidationError::Required { .. }
        ));
    }
}
