//! # Seed Data Generator
//!
//! Populates the database with a demo pharmacy for development.
//!
//! ## Usage
//! ```bash
//! # Seed into the default dev database
//! cargo run -p pharma-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharma-db --bin seed -- --db ./data/ledger.db
//! ```
//!
//! ## Generated Data
//! - One store with its invoice sequence seeded at `INV00000`
//! - Manufacturers, distributors and a small medicine catalog
//! - A shelf of stock lots per medicine with staggered expiry dates
//! - Pricing rows with realistic MRPs and discounts

use chrono::{Duration, Utc};
use std::env;
use tracing_subscriber::EnvFilter;

use pharma_core::{DiscountRate, Lot, Money};
use pharma_db::{Database, DbConfig};

/// (name, composition, form) for the demo catalog.
const MEDICINES: &[(&str, &str, &str)] = &[
    ("Paracin 500", "paracetamol 500mg", "tablet"),
    ("Febrinil 500", "paracetamol 500mg", "tablet"),
    ("Amoxil 250", "amoxicillin 250mg", "capsule"),
    ("Coughex", "dextromethorphan 10mg/5ml", "syrup"),
    ("Gastrocalm 20", "omeprazole 20mg", "capsule"),
    ("Cetiriz 10", "cetirizine 10mg", "tablet"),
    ("Ibuprin 400", "ibuprofen 400mg", "tablet"),
    ("Metfor 500", "metformin 500mg", "tablet"),
];

/// MRPs in paise, cycled over the catalog.
const MRPS: &[i64] = &[4_500, 5_200, 12_000, 8_500, 9_900, 3_200, 6_000, 2_800];

/// Discounts in basis points.
const DISCOUNTS: &[i32] = &[0, 250, 500, 1000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./pharma_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharma Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pharma_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Pharma Ledger Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("Connected, migrations applied");

    let reference = db.reference();

    // Skip when the demo store already exists
    let store_id = match reference.create_store("Main Street Pharmacy").await {
        Ok(id) => id,
        Err(_) => {
            println!("Database already seeded, nothing to do.");
            println!("Delete the database file to regenerate.");
            return Ok(());
        }
    };

    db.invoices().seed(store_id, "INV00000").await?;
    println!("Store #{} created, invoice sequence at INV00000", store_id);

    let acme = reference.create_manufacturer("Acme Labs").await?;
    let zenith = reference.create_manufacturer("Zenith Pharma").await?;
    let distributor = reference.create_distributor("Citywide Distributors").await?;
    let _backup = reference.create_distributor("Regional Medico Supply").await?;

    let today = Utc::now().date_naive();
    let now = Utc::now();
    let stock = db.stock();
    let pricing = db.pricing();

    let mut medicines = 0;
    for (idx, (name, composition, form)) in MEDICINES.iter().enumerate() {
        let manufacturer = if idx % 2 == 0 { acme } else { zenith };
        let medicine_id = reference
            .create_medicine(name, composition, manufacturer, form)
            .await?;

        // Two lots per medicine with staggered expiries
        for (lot_idx, days_out) in [120i64, 270].iter().enumerate() {
            let lot = Lot {
                batch_number: format!("B{:02}{:02}", idx + 1, lot_idx + 1),
                expiry_date: today + Duration::days(*days_out + (idx as i64 * 7)),
                quantity_received: 50 + (idx as i64 * 10),
                remaining_quantity: 50 + (idx as i64 * 10),
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            stock
                .receive_lot(store_id, medicine_id, form, &lot, today)
                .await?;
        }

        let mrp = Money::from_paise(MRPS[idx % MRPS.len()]);
        let discount = DiscountRate::from_bps(DISCOUNTS[idx % DISCOUNTS.len()]);
        let net_rate = Money::from_paise(mrp.paise() * 80 / 100);
        pricing
            .upsert(store_id, medicine_id, mrp, discount, net_rate, "seed")
            .await?;

        medicines += 1;
    }

    println!("Seeded {} medicines with stock and pricing", medicines);
    println!("  Distributor: Citywide Distributors (#{})", distributor);
    println!();
    println!("Seed complete.");

    db.close().await;
    Ok(())
}
