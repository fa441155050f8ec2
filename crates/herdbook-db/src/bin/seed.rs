//! # Demo Farm Seeder
//!
//! Populates a database with a demo herd for development of the mobile UI.
//!
//! ## Usage
//! ```bash
//! # Seed ./herdbook_dev.db with 30 days of production
//! cargo run -p herdbook-db --bin seed
//!
//! # Custom database path and number of days
//! cargo run -p herdbook-db --bin seed -- --db ./data/herdbook.db --days 60
//! ```
//!
//! ## Generated Data
//! - 12 animals across common dairy breeds and herd statuses
//! - Daily morning/evening production for every producing cow
//! - Vaccines and dewormings with upcoming follow-ups
//! - Milk sales and monthly expenses by category
//! - Two paddocks with one open rotation
//!
//! Values are derived from indices so every run produces the same farm.

use chrono::{Duration, NaiveDate, Utc};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use herdbook_core::{
    AnimalStatus, ExpenseCategory, IncomeKind, Money, NewAnimal, NewAnimalEvent, NewExpense,
    NewIncome, NewPaddock, NewProduction, NewRotation, NewTreatment, PaddockPatch, PaddockStatus,
    TreatmentKind,
};
use herdbook_db::{Database, DbConfig};

/// (code, name, breed, status)
const HERD: &[(&str, &str, &str, AnimalStatus)] = &[
    ("A1", "Lucera", "Holstein", AnimalStatus::Producing),
    ("A2", "Canela", "Jersey", AnimalStatus::Producing),
    ("A3", "Manchas", "Holstein", AnimalStatus::Producing),
    ("A4", "Estrella", "Gyr", AnimalStatus::Producing),
    ("A5", "Paloma", "Brown Swiss", AnimalStatus::Producing),
    ("A6", "Morena", "Girolando", AnimalStatus::Producing),
    ("A7", "Luna", "Holstein", AnimalStatus::Dry),
    ("A8", "Bonita", "Jersey", AnimalStatus::Pregnant),
    ("A9", "Perla", "Holstein", AnimalStatus::Active),
    ("B1", "Tormenta", "Brahman", AnimalStatus::Active),
    ("B2", "Negra", "Gyr", AnimalStatus::Sold),
    ("B3", "Chispa", "Girolando", AnimalStatus::Producing),
];

/// Milk price per liter, in cents.
const MILK_PRICE_CENTS: i64 = 45;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 30;
    let mut db_path = String::from("./herdbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Herdbook Demo Farm Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of production to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./herdbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🐄 Herdbook Demo Farm Seeder");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.animals().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} animals", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();
    let first_day = today - Duration::days(days.max(1) - 1);

    // Herd
    let mut producing = Vec::new();
    for (idx, (code, name, breed, status)) in HERD.iter().enumerate() {
        let input = NewAnimal {
            name: Some(name.to_string()),
            status: *status,
            birth_date: NaiveDate::from_ymd_opt(2018 + (idx as i32 % 4), 1 + (idx as u32 % 12), 10),
            weight_kg: Some(420.0 + (idx as f64 * 13.5)),
            ..NewAnimal::new(*code, *breed)
        };
        let id = db.animals().create(input).await?;
        if *status == AnimalStatus::Producing {
            producing.push((idx, id));
        }
    }
    println!("✓ Registered {} animals", HERD.len());

    // Production
    let mut liters_total = 0.0;
    for day in 0..days.max(1) {
        let date = first_day + Duration::days(day);
        for (idx, animal_id) in &producing {
            let base = 8.0 + (*idx as f64 * 1.5);
            let swing = ((day + *idx as i64) % 5) as f64 * 0.5;
            let input = NewProduction::new(animal_id, date, base + swing, base - 1.5 + swing / 2.0);
            liters_total += input.total_liters();
            db.production().upsert(input).await?;
        }

        // Weekly milk sale
        if day % 7 == 6 {
            let week: f64 = db
                .production()
                .total_by_range(herdbook_core::DateRange::new(date - Duration::days(6), date))
                .await?;
            let sale = NewIncome {
                description: Some("Weekly cooperative delivery".to_string()),
                ..NewIncome::priced(date, IncomeKind::MilkSale, week, Money::from_cents(MILK_PRICE_CENTS))
            };
            db.incomes().create(sale).await?;
        }
    }
    println!(
        "✓ Recorded {} days of production ({:.1} L)",
        days.max(1),
        liters_total
    );

    // Health
    for (idx, animal_id) in &producing {
        let date = first_day + Duration::days(*idx as i64 % days.max(1));
        let vaccine = NewTreatment {
            medication: Some("Aftosa".to_string()),
            dose: Some("2 ml".to_string()),
            cost_cents: 1_800,
            veterinarian: Some("Dr. Ruiz".to_string()),
            next_date: Some(date + Duration::days(180)),
            ..NewTreatment::new(animal_id, date, TreatmentKind::Vaccine)
        };
        db.treatments().create(vaccine).await?;

        let deworming = NewTreatment {
            medication: Some("Ivermectina".to_string()),
            cost_cents: 900,
            next_date: Some(today + Duration::days(14 + *idx as i64)),
            ..NewTreatment::new(animal_id, date, TreatmentKind::Deworming)
        };
        db.treatments().create(deworming).await?;

        db.animal_events()
            .create(NewAnimalEvent {
                animal_id: animal_id.clone(),
                kind: "weighing".to_string(),
                date,
                description: format!("{:.0} kg", 430.0 + *idx as f64 * 12.0),
                notes: None,
            })
            .await?;
    }
    println!("✓ Recorded treatments and weighings");

    // Expenses
    let expenses = [
        (ExpenseCategory::Feed, 185_000, "Concentrate 40 bags"),
        (ExpenseCategory::Labor, 240_000, "Milker wages"),
        (ExpenseCategory::Health, 35_000, "Veterinary visit"),
        (ExpenseCategory::Utilities, 18_500, "Electricity"),
        (ExpenseCategory::Maintenance, 42_000, "Milking machine service"),
    ];
    for (offset, (category, cents, description)) in expenses.iter().enumerate() {
        let input = NewExpense {
            description: Some(description.to_string()),
            ..NewExpense::new(first_day + Duration::days(offset as i64), *category, Money::from_cents(*cents))
        };
        db.expenses().create(input).await?;
    }
    println!("✓ Recorded {} expenses", expenses.len());

    // Pasture
    let north = db
        .paddocks()
        .create(NewPaddock {
            area_ha: Some(4.5),
            grass_type: Some("Brachiaria".to_string()),
            capacity: Some(15),
            ..NewPaddock::new("North")
        })
        .await?;
    db.paddocks()
        .create(NewPaddock {
            area_ha: Some(3.2),
            grass_type: Some("Estrella".to_string()),
            ..NewPaddock::new("River")
        })
        .await?;
    db.rotations()
        .create(NewRotation::new(&north, today - Duration::days(3), producing.len() as i64))
        .await?;
    db.paddocks()
        .update(
            &north,
            PaddockPatch {
                status: Some(PaddockStatus::InUse),
                ..Default::default()
            },
        )
        .await?;
    println!("✓ Created paddocks and an open rotation");

    let range = herdbook_core::DateRange::new(first_day, today);
    let summary = db.finance_summary(range).await?;

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Seed complete");

    println!();
    println!("Finance summary {} .. {}", first_day, today);
    println!("  Income:   {}", summary.income);
    println!("  Expenses: {}", summary.expenses);
    println!("  Balance:  {}", summary.balance);
    println!();
    println!("✓ Done in {:?}", start.elapsed());

    db.close().await;
    Ok(())
}
