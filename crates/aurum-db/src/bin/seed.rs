//! # Seed Data Generator
//!
//! Populates the database with jewelry products and clients for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p aurum-db --bin seed
//!
//! # Specify database path
//! cargo run -p aurum-db --bin seed -- --db ./data/aurum.db
//! ```
//!
//! Each product gets a price spread around its category's base and a stock
//! between 1 and 12 units (jewelry moves in small counts).

use std::env;

use aurum_db::repository::client::new_client;
use aurum_db::repository::product::new_product;
use aurum_db::{Database, DbConfig};

/// Jewelry categories with base prices in cents.
const CATALOG: &[(&str, i64, &[&str])] = &[
    (
        "Anillo",
        15_000_000,
        &[
            "Oro 18k",
            "Oro Blanco",
            "Compromiso Solitario",
            "Plata 925",
            "Oro Rosa",
        ],
    ),
    (
        "Cadena",
        8_000_000,
        &["Oro 18k 45cm", "Plata 925 50cm", "Oro Italiano", "Eslabon Cubano"],
    ),
    (
        "Pulsera",
        6_000_000,
        &["Oro 18k", "Plata Tejida", "Charms", "Esmeraldas"],
    ),
    (
        "Aretes",
        4_000_000,
        &["Topo Perla", "Candonga Oro", "Zirconia", "Esmeralda Colombiana"],
    ),
    (
        "Dije",
        2_500_000,
        &["Corazon Oro", "Inicial Plata", "Cruz Oro", "Virgen"],
    ),
];

const CLIENTS: &[&str] = &[
    "Maria Fernanda Gomez",
    "Carlos Restrepo",
    "Lucia Martinez",
    "Andres Jaramillo",
    "Paola Cardenas",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let db_path = args
        .iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("./aurum.db");

    println!("Seeding database at {db_path}");

    let db = Database::new(DbConfig::new(db_path)).await?;

    let products = db.products();
    let mut count = 0usize;
    for (category, base_price, variants) in CATALOG {
        for (i, variant) in variants.iter().enumerate() {
            let name = format!("{category} {variant}");
            // Deterministic spread: +5% per variant, stock cycles 1..=12.
            let price = base_price + (base_price / 20) * i as i64;
            let stock = (i as i64 % 12) + 1;

            products.insert(&new_product(&name, price, stock)).await?;
            count += 1;
        }
    }
    println!("Inserted {count} products");

    let clients = db.clients();
    for name in CLIENTS {
        clients.insert(&new_client(name)).await?;
    }
    println!("Inserted {} clients", CLIENTS.len());

    db.close().await;
    Ok(())
}
