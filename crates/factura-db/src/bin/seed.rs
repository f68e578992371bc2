//! # Seed Data Generator
//!
//! Populates the database with sample invoices for development.
//!
//! ## Usage
//! ```bash
//! # Generate 30 invoices (default)
//! cargo run -p factura-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p factura-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p factura-db --bin seed -- --db ./data/factura.db
//! ```
//!
//! ## Generated Invoices
//! Every invoice goes through the workflow service, so totals, validation
//! and transitions are the real ones:
//! - every third invoice stays a draft
//! - the rest are stamped with a generated fiscal stamp
//! - every third stamped invoice is then canceled
//!
//! Log verbosity follows `RUST_LOG` (default `info,factura=debug,sqlx=warn`).

use chrono::{Duration, Utc};
use factura_core::{
    CancelConfirmation, CatalogSnapshot, FiscalStamp, InvoiceDraft, InvoiceService, Issuer,
    LineItem, Money, PaymentTerms, Recipient, TaxCharge, TaxKind,
};
use factura_db::{Database, DbConfig, InvoiceRepository};
use rust_decimal::Decimal;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_COUNT: usize = 30;

/// Sample recipients: (RFC, name, CFDI usage, postal code, regime)
const RECIPIENTS: &[(&str, &str, &str, &str, &str)] = &[
    ("XAXX010101000", "PUBLICO EN GENERAL", "G03", "42501", "616"),
    ("XIQB891116QE4", "BERENICE XIMO QUEZADA", "G03", "06600", "612"),
    ("MOFY900516NL1", "YESENIA MONTIEL FLORES", "G01", "64000", "626"),
    ("CACX7605101P8", "XOCHILT CASAS CHAVEZ", "G02", "44100", "605"),
];

/// Sample concepts: (product code, description, unit price in centavos)
const CONCEPTS: &[(&str, &str, i64)] = &[
    ("84111500", "Servicios contables", 250_000),
    ("80101500", "Consultoría de procesos", 480_000),
    ("81111500", "Desarrollo de software a la medida", 1_250_000),
    ("43231500", "Licencia anual de software", 89_900),
    ("01010101", "Viáticos", 12_345),
];

/// Payment (method, form) pairs.
const PAYMENTS: &[(&str, &str)] = &[("PUE", "03"), ("PUE", "01"), ("PPD", "99"), ("PUE", "04")];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,factura=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Factura Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: $FACTURA_DB_PATH or ./factura.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(database = %config.database_path.display(), count, "Seeding invoices");

    let db = Database::new(config).await?;
    let catalogs = CatalogSnapshot::load(&db.catalogs()).await?;
    let service = InvoiceService::new(db.invoices()).with_catalogs(catalogs);

    let existing = service.list().await?.len();
    if existing > 0 {
        warn!(existing, "Database already has invoices, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        match seed_invoice(&service, seed).await {
            Ok(()) => generated += 1,
            Err(e) => warn!(seed, error = %e, "Failed to seed invoice"),
        }
    }

    let summary = service.summary().await?;
    info!(
        generated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        drafts = summary.drafts,
        stamped = summary.stamped,
        canceled = summary.canceled,
        stamped_amount = %summary.stamped_amount,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Creates one invoice and drives it to its target state.
async fn seed_invoice(
    service: &InvoiceService<InvoiceRepository>,
    seed: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let draft = generate_draft(seed);
    let invoice = service.create_draft("seed", draft).await?;

    if seed % 3 == 0 {
        return Ok(());
    }

    let stamp = FiscalStamp {
        uuid: Uuid::new_v4(),
        stamped_at: Utc::now(),
        sat_certificate_number: format!("{:020}", 30_001_000_000_400_002_434u128 + seed as u128),
        cfd_seal: format!("CFD{seed:06}"),
        sat_seal: format!("SAT{seed:06}"),
    };
    service.apply_stamp(&invoice.id, stamp).await?;

    if seed % 9 == 2 {
        service
            .cancel(&invoice.id, CancelConfirmation::for_invoice(&invoice.id))
            .await?;
    }
    Ok(())
}

/// Generates a draft with deterministic, catalog-valid content.
fn generate_draft(seed: usize) -> InvoiceDraft {
    let (tax_id, name, usage, postal_code, regime) = RECIPIENTS[seed % RECIPIENTS.len()];
    let (method, form) = PAYMENTS[seed % PAYMENTS.len()];

    let line_count = 1 + seed % 3;
    let line_items = (0..line_count)
        .map(|offset| {
            let (code, description, price) = CONCEPTS[(seed + offset) % CONCEPTS.len()];
            // 1, 1.5, 2, 2.5 ...
            let quantity = Decimal::new(10 + 5 * ((seed + offset) % 4) as i64, 1);
            let mut taxes = vec![TaxCharge::with_default_rate(TaxKind::ValueAdded)];
            if offset == 1 {
                taxes.push(TaxCharge::with_default_rate(TaxKind::IncomeWithholding));
            }
            if offset == 2 {
                taxes.push(TaxCharge::with_default_rate(TaxKind::SpecialProduction));
            }
            LineItem::new(code, description, quantity, Money::from_cents(price), taxes)
        })
        .collect();

    InvoiceDraft {
        issuer: Issuer {
            tax_id: "EKU9003173C9".to_string(),
            name: "ESCUELA KEMPER URGATE".to_string(),
            tax_regime: "601".to_string(),
            postal_code: "42501".to_string(),
        },
        recipient: Recipient {
            tax_id: tax_id.to_string(),
            name: name.to_string(),
            cfdi_usage: usage.to_string(),
            fiscal_postal_code: Some(postal_code.to_string()),
            tax_regime: Some(regime.to_string()),
        },
        line_items,
        payment_terms: PaymentTerms::new(method, form),
        issued_at: Utc::now() - Duration::days((seed % 30) as i64),
        series: Some("A".to_string()),
        folio: Some(format!("{}", 1000 + seed)),
    }
}
