//! End-to-end flows over an in-memory database: purchase receipt,
//! FEFO sale allocation, invoice issuance, and the read views.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use pharma_core::{
    DiscountRate, Money, NewPurchase, NewPurchaseItem, NewSale, NewSaleItem,
};
use pharma_db::{Database, DbConfig};
use pharma_ledger::{Ledger, LedgerError};

// =============================================================================
// Scenario Setup
// =============================================================================

/// A seeded store with two medicines, pricing, and an invoice sequence.
struct Scenario {
    db: Database,
    ledger: Ledger,
    store_id: i64,
    distributor_id: i64,
    manufacturer_id: i64,
    paracetamol_id: i64,
    ibuprofen_id: i64,
    today: NaiveDate,
}

impl Scenario {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reference = db.reference();

        let store_id = reference.create_store("Main Street Pharmacy").await.unwrap();
        let manufacturer_id = reference.create_manufacturer("Acme Labs").await.unwrap();
        let distributor_id = reference
            .create_distributor("Citywide Distributors")
            .await
            .unwrap();
        let paracetamol_id = reference
            .create_medicine("Paracin 500", "paracetamol 500mg", manufacturer_id, "tablet")
            .await
            .unwrap();
        let ibuprofen_id = reference
            .create_medicine("Ibuprin 400", "ibuprofen 400mg", manufacturer_id, "tablet")
            .await
            .unwrap();

        db.invoices().seed(store_id, "INV00000").await.unwrap();

        for medicine_id in [paracetamol_id, ibuprofen_id] {
            db.pricing()
                .upsert(
                    store_id,
                    medicine_id,
                    Money::from_paise(10_000),
                    DiscountRate::from_bps(500), // 5% -> 95.00 effective
                    Money::from_paise(8_000),
                    "test",
                )
                .await
                .unwrap();
        }

        let ledger = Ledger::new(db.clone());

        Scenario {
            db,
            ledger,
            store_id,
            distributor_id,
            manufacturer_id,
            paracetamol_id,
            ibuprofen_id,
            today: Utc::now().date_naive(),
        }
    }

    fn item(&self, medicine_id: i64, batch: &str, days_out: i64, qty: i64) -> NewPurchaseItem {
        NewPurchaseItem {
            medicine_id,
            manufacturer_id: self.manufacturer_id,
            batch_number: batch.to_string(),
            expiry_date: self.today + Duration::days(days_out),
            quantity: qty,
            mrp: Money::from_paise(10_000),
            discount: DiscountRate::from_bps(1_000),
            purchase_amount: Money::from_paise(9_000) * qty,
        }
    }

    async fn receive(&self, items: Vec<NewPurchaseItem>) {
        self.ledger
            .receiver
            .receive(
                NewPurchase {
                    store_id: self.store_id,
                    distributor_id: self.distributor_id,
                    purchase_date: self.today,
                    invoice_number: "BILL-7001".to_string(),
                    items,
                },
                self.today,
            )
            .await
            .unwrap();
    }

    fn sale(&self, items: Vec<(i64, i64)>) -> NewSale {
        NewSale {
            store_id: self.store_id,
            customer_id: "walk-in".to_string(),
            sale_date: self.today,
            items: items
                .into_iter()
                .map(|(medicine_id, quantity)| NewSaleItem {
                    medicine_id,
                    quantity,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Purchase Receipt
// =============================================================================

#[tokio::test]
async fn purchase_creates_lots_and_available_stock() {
    let s = Scenario::new().await;

    s.receive(vec![
        s.item(s.paracetamol_id, "B1", 60, 5),
        s.item(s.paracetamol_id, "B2", 90, 10),
    ])
    .await;

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 15);
    assert_eq!(snapshot.lots.len(), 2);
    assert!(snapshot.lots.iter().all(|lot| lot.is_active));

    let purchases = s.ledger.reports.purchases_by_store(s.store_id).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].distributor_name, "Citywide Distributors");
    assert_eq!(purchases[0].record.total_amount, Money::from_paise(9_000) * 15);
}

#[tokio::test]
async fn purchase_with_expired_item_writes_nothing() {
    let s = Scenario::new().await;

    let result = s
        .ledger
        .receiver
        .receive(
            NewPurchase {
                store_id: s.store_id,
                distributor_id: s.distributor_id,
                purchase_date: s.today,
                invoice_number: "BILL-7002".to_string(),
                items: vec![
                    s.item(s.paracetamol_id, "OK1", 120, 10),
                    s.item(s.paracetamol_id, "BAD", -1, 10),
                ],
            },
            s.today,
        )
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    // Validation failed before any write: no ledger exists
    let snapshot = s.ledger.views.snapshot(s.store_id, s.paracetamol_id).await;
    assert!(matches!(snapshot, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_batch_in_ledger_is_rejected() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 5)]).await;

    let result = s
        .ledger
        .receiver
        .receive(
            NewPurchase {
                store_id: s.store_id,
                distributor_id: s.distributor_id,
                purchase_date: s.today,
                invoice_number: "BILL-7003".to_string(),
                items: vec![s.item(s.paracetamol_id, "B1", 90, 5)],
            },
            s.today,
        )
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 5);
}

#[tokio::test]
async fn unknown_distributor_is_rejected_before_writes() {
    let s = Scenario::new().await;

    let result = s
        .ledger
        .receiver
        .receive(
            NewPurchase {
                store_id: s.store_id,
                distributor_id: 9_999,
                purchase_date: s.today,
                invoice_number: "BILL-7004".to_string(),
                items: vec![s.item(s.paracetamol_id, "B1", 60, 5)],
            },
            s.today,
        )
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
}

// =============================================================================
// FEFO Sale Allocation
// =============================================================================

#[tokio::test]
async fn sale_consumes_earliest_expiry_first() {
    let s = Scenario::new().await;
    s.receive(vec![
        s.item(s.paracetamol_id, "B1", 60, 5),
        s.item(s.paracetamol_id, "B2", 90, 10),
    ])
    .await;

    let receipt = s
        .ledger
        .allocator
        .allocate(s.sale(vec![(s.paracetamol_id, 8)]), s.today)
        .await
        .unwrap();

    assert_eq!(receipt.lines.len(), 1);
    let line = &receipt.lines[0];
    assert_eq!(line.consumptions.len(), 2);
    assert_eq!(line.consumptions[0].batch_number, "B1");
    assert_eq!(line.consumptions[0].quantity, 5);
    assert_eq!(line.consumptions[1].batch_number, "B2");
    assert_eq!(line.consumptions[1].quantity, 3);

    // 5% off an MRP of 100.00 -> 95.00 per unit
    assert_eq!(line.unit_price, Money::from_paise(9_500));
    assert_eq!(receipt.total_amount, Money::from_paise(9_500) * 8);

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 7);
    let b1 = snapshot.lots.iter().find(|l| l.batch_number == "B1").unwrap();
    let b2 = snapshot.lots.iter().find(|l| l.batch_number == "B2").unwrap();
    assert_eq!(b1.remaining_quantity, 0);
    assert_eq!(b2.remaining_quantity, 7);
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 5)]).await;

    let result = s
        .ledger
        .allocator
        .allocate(s.sale(vec![(s.paracetamol_id, 8)]), s.today)
        .await;

    match result {
        Err(LedgerError::InsufficientStock {
            available,
            requested,
        }) => {
            assert_eq!(available, 5);
            assert_eq!(requested, 8);
        }
        other => panic!("unexpected: {other:?}"),
    }

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 5);
    assert_eq!(snapshot.lots[0].remaining_quantity, 5);
}

#[tokio::test]
async fn expiring_batch_fails_sale_but_stays_retired() {
    let s = Scenario::new().await;
    // B3 expires inside the 30-day window: present but not sellable
    s.receive(vec![
        s.item(s.paracetamol_id, "B1", 60, 5),
        s.item(s.paracetamol_id, "B3", 10, 5),
    ])
    .await;

    let result = s
        .ledger
        .allocator
        .allocate(s.sale(vec![(s.paracetamol_id, 8)]), s.today)
        .await;

    match result {
        Err(LedgerError::InsufficientStock {
            available,
            requested,
        }) => {
            assert_eq!(available, 5);
            assert_eq!(requested, 8);
        }
        other => panic!("unexpected: {other:?}"),
    }

    // The failed sale rolled back, but the expiry observation held
    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    let b1 = snapshot.lots.iter().find(|l| l.batch_number == "B1").unwrap();
    let b3 = snapshot.lots.iter().find(|l| l.batch_number == "B3").unwrap();
    assert_eq!(b1.remaining_quantity, 5);
    assert!(b1.is_active);
    assert!(!b3.is_active);
    assert_eq!(b3.remaining_quantity, 5);
    assert_eq!(snapshot.available_stock, 5);
}

#[tokio::test]
async fn multi_medicine_sale_is_all_or_nothing() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 10)]).await;
    // ibuprofen never received: its line must sink the whole sale

    let result = s
        .ledger
        .allocator
        .allocate(
            s.sale(vec![(s.paracetamol_id, 4), (s.ibuprofen_id, 1)]),
            s.today,
        )
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound(_))));

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 10);
    assert_eq!(snapshot.lots[0].remaining_quantity, 10);

    // The failed sale left no record behind
    let sales = s.ledger.reports.sales_by_store(s.store_id).await.unwrap();
    assert!(sales.is_empty());
}

#[tokio::test]
async fn concurrent_sales_never_oversell_a_ledger() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 10)]).await;

    // Six buyers want 3 units each; only 10 exist. The per-ledger lock
    // serializes the writers, so exactly three sales can fit.
    let ledger = Arc::new(Ledger::new(s.db.clone()));
    let mut handles = Vec::new();
    for _ in 0..6 {
        let ledger = ledger.clone();
        let sale = s.sale(vec![(s.paracetamol_id, 3)]);
        let today = s.today;
        handles.push(tokio::spawn(async move {
            ledger.allocator.allocate(sale, today).await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => sold += receipt.lines[0].quantity,
            Err(LedgerError::InsufficientStock {
                available,
                requested,
            }) => {
                assert!(available < requested);
                refused += 1;
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    assert_eq!(sold, 9);
    assert_eq!(refused, 3);

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.available_stock, 1);
    assert_eq!(snapshot.lots[0].remaining_quantity, 1);

    let sales = s.ledger.reports.sales_by_store(s.store_id).await.unwrap();
    assert_eq!(sales.len(), 3);
    let recorded: i64 = sales
        .iter()
        .flat_map(|sale| sale.items.iter())
        .map(|item| item.quantity)
        .sum();
    assert_eq!(recorded, 9);
}

#[tokio::test]
async fn sale_without_pricing_is_rejected() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 10)]).await;
    s.db.pricing()
        .soft_delete(s.store_id, s.paracetamol_id)
        .await
        .unwrap();

    let result = s
        .ledger
        .allocator
        .allocate(s.sale(vec![(s.paracetamol_id, 2)]), s.today)
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn sale_record_carries_consumption_breakdown() {
    let s = Scenario::new().await;
    s.receive(vec![
        s.item(s.paracetamol_id, "B1", 60, 5),
        s.item(s.paracetamol_id, "B2", 90, 10),
    ])
    .await;

    let receipt = s
        .ledger
        .allocator
        .allocate(s.sale(vec![(s.paracetamol_id, 8)]), s.today)
        .await
        .unwrap();

    let stored = s.ledger.reports.sale_by_id(&receipt.sale_id).await.unwrap();
    assert_eq!(stored.invoice_number, receipt.invoice_number);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].consumptions.len(), 2);
    assert_eq!(stored.items[0].consumptions[0].batch_number, "B1");
    assert_eq!(stored.total_amount, receipt.total_amount);
}

// =============================================================================
// Invoice Sequencing
// =============================================================================

#[tokio::test]
async fn invoices_are_sequential_per_store() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 30)]).await;

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let receipt = s
            .ledger
            .allocator
            .allocate(s.sale(vec![(s.paracetamol_id, 2)]), s.today)
            .await
            .unwrap();
        numbers.push(receipt.invoice_number);
    }

    assert_eq!(numbers, vec!["INV00001", "INV00002", "INV00003"]);
}

#[tokio::test]
async fn concurrent_issuance_yields_distinct_numbers() {
    let s = Scenario::new().await;
    let sequencer = s.ledger.sequencer.clone();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let sequencer = sequencer.clone();
        let store_id = s.store_id;
        handles.push(tokio::spawn(
            async move { sequencer.next_invoice(store_id).await },
        ));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap());
    }

    let mut unique = numbers.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 10);
    assert_eq!(unique.last().unwrap(), "INV00010");
}

#[tokio::test]
async fn unseeded_store_cannot_issue_invoices() {
    let s = Scenario::new().await;
    let other_store = s
        .db
        .reference()
        .create_store("Annex Pharmacy")
        .await
        .unwrap();

    let result = s.ledger.sequencer.next_invoice(other_store).await;
    assert!(matches!(result, Err(LedgerError::NotFound(_))));
}

// =============================================================================
// Read Views
// =============================================================================

#[tokio::test]
async fn snapshot_lists_substitutes_by_composition() {
    let s = Scenario::new().await;
    let generic = s
        .db
        .reference()
        .create_medicine("Febrinil 500", "paracetamol 500mg", s.manufacturer_id, "tablet")
        .await
        .unwrap();
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 5)]).await;

    let snapshot = s
        .ledger
        .views
        .snapshot(s.store_id, s.paracetamol_id)
        .await
        .unwrap();
    assert_eq!(snapshot.substitutes.len(), 1);
    assert_eq!(snapshot.substitutes[0].medicine_id, generic);
}

#[tokio::test]
async fn store_overview_resolves_names_and_prices() {
    let s = Scenario::new().await;
    s.receive(vec![
        s.item(s.paracetamol_id, "B1", 60, 5),
        s.item(s.ibuprofen_id, "C1", 90, 12),
    ])
    .await;

    let rows = s.ledger.views.store_overview(s.store_id).await.unwrap();
    assert_eq!(rows.len(), 2);

    let para = rows
        .iter()
        .find(|r| r.medicine_id == s.paracetamol_id)
        .unwrap();
    assert_eq!(para.medicine_name, "Paracin 500");
    assert_eq!(para.available_stock, 5);
    assert_eq!(para.sale_price, Some(Money::from_paise(9_500)));
}

#[tokio::test]
async fn date_range_report_filters_purchases() {
    let s = Scenario::new().await;
    s.receive(vec![s.item(s.paracetamol_id, "B1", 60, 5)]).await;

    let hit = s
        .ledger
        .reports
        .purchases_between(s.store_id, s.today - Duration::days(1), s.today)
        .await
        .unwrap();
    assert_eq!(hit.len(), 1);

    let miss = s
        .ledger
        .reports
        .purchases_between(
            s.store_id,
            s.today - Duration::days(30),
            s.today - Duration::days(2),
        )
        .await
        .unwrap();
    assert!(miss.is_empty());
}
