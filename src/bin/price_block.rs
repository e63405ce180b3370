//! Price a block of quotes against the motor tariff
//!
//! Reads quote contexts from a CSV (`driver_age,brand,density`), or
//! synthesizes a demo block when no path is given. Rows are evaluated in
//! parallel with per-row error capture, and results land in
//! `block_results.csv` for comparison with the pricing workbook.

use rating_engine::eval::write_batch_csv;
use rating_engine::{
    BranchDescriptor, CompareOp, Context, ExactMatchTable, InputKind, LookupMode,
    NodeDescriptor, RangeTable, RoundingMode, Table, TableRegistry, TariffGraph,
    TariffMetadata, Value,
};
use rust_decimal::Decimal;
use std::error::Error;
use std::fs::File;
use std::str::FromStr;
use std::time::Instant;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).expect("literal decimal")
}

fn motor_tariff() -> TariffGraph {
    let mut tables = TableRegistry::new();
    tables.insert(
        "age_table",
        Table::Range(RangeTable::new(
            vec![
                (d("18"), d("25"), Value::Decimal(d("1.8"))),
                (d("26"), d("35"), Value::Decimal(d("1.2"))),
                (d("36"), d("55"), Value::Decimal(d("1.0"))),
                (d("56"), d("99"), Value::Decimal(d("1.3"))),
            ],
            None,
        )),
    );
    tables.insert(
        "brand_table",
        Table::Exact(ExactMatchTable::with_text_keys(
            vec![
                ("BMW".to_string(), Value::Decimal(d("1.15"))),
                ("Toyota".to_string(), Value::Decimal(d("0.95"))),
            ],
            Some(Value::Decimal(d("1.00"))),
        )),
    );

    let descriptors = vec![
        ("base".to_string(), NodeDescriptor::Constant { value: Value::Decimal(d("500")) }),
        ("fee".to_string(), NodeDescriptor::Constant { value: Value::Decimal(d("25")) }),
        ("driver_age".to_string(), NodeDescriptor::Input { dtype: InputKind::Decimal }),
        ("brand".to_string(), NodeDescriptor::Input { dtype: InputKind::Text }),
        ("density".to_string(), NodeDescriptor::Input { dtype: InputKind::Decimal }),
        (
            "age_factor".to_string(),
            NodeDescriptor::Lookup {
                table: "age_table".to_string(),
                key_node: "driver_age".to_string(),
                mode: LookupMode::Range,
            },
        ),
        (
            "brand_factor".to_string(),
            NodeDescriptor::Lookup {
                table: "brand_table".to_string(),
                key_node: "brand".to_string(),
                mode: LookupMode::Exact,
            },
        ),
        (
            "density_factor".to_string(),
            NodeDescriptor::If {
                condition: "density".to_string(),
                op: CompareOp::Ge,
                threshold: d("1000"),
                then_branch: BranchDescriptor::Constant(Value::Decimal(d("1.20"))),
                else_branch: BranchDescriptor::Constant(Value::Decimal(d("1.00"))),
            },
        ),
        (
            "technical_premium".to_string(),
            NodeDescriptor::Multiply {
                inputs: vec![
                    "base".to_string(),
                    "age_factor".to_string(),
                    "brand_factor".to_string(),
                    "density_factor".to_string(),
                ],
            },
        ),
        (
            "raw_premium".to_string(),
            NodeDescriptor::Add {
                inputs: vec!["technical_premium".to_string(), "fee".to_string()],
            },
        ),
        (
            "total_premium".to_string(),
            NodeDescriptor::Round {
                input: "raw_premium".to_string(),
                decimals: 2,
                mode: RoundingMode::HalfUp,
            },
        ),
    ];

    TariffGraph::new(
        TariffMetadata::new("MOTOR_PRIVATE", "2024_09", "EUR"),
        descriptors,
        &tables,
    )
    .expect("motor tariff descriptors are well-formed")
}

/// Load quote contexts from a CSV with a header row. Every column becomes
/// a context entry; INPUT nodes coerce textual digits, so values stay raw.
fn load_contexts(path: &str) -> Result<Vec<Context>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut contexts = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                log::warn!("skipping malformed row {}: {}", row + 1, err);
                continue;
            }
        };
        let mut context = Context::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if field.is_empty() {
                context.set(header, Option::<i64>::None);
            } else {
                context.set(header, field);
            }
        }
        contexts.push(context);
    }
    Ok(contexts)
}

/// Deterministic demo block sweeping ages, brands, and densities.
fn demo_contexts() -> Vec<Context> {
    let brands = ["BMW", "Toyota", "Renault"];
    let densities = [250, 800, 1500, 4000];
    let mut contexts = Vec::new();
    for age in 18..=80 {
        for (i, brand) in brands.iter().enumerate() {
            contexts.push(
                Context::new()
                    .with("driver_age", age)
                    .with("brand", *brand)
                    .with("density", densities[(age as usize + i) % densities.len()]),
            );
        }
    }
    contexts
}

fn main() {
    env_logger::init();

    let start = Instant::now();
    let contexts = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading quotes from {}...", path);
            load_contexts(&path).expect("Failed to load quote contexts")
        }
        None => {
            println!("No quote file given, using demo block");
            demo_contexts()
        }
    };
    println!("Loaded {} quotes in {:?}", contexts.len(), start.elapsed());

    let graph = motor_tariff();
    let metadata = graph.metadata();
    println!("Tariff: {} v{} ({})", metadata.product, metadata.version, metadata.currency);

    println!("Pricing...");
    let pricing_start = Instant::now();
    let (results, errors) = graph.evaluate_batch_collecting("total_premium", &contexts);
    println!("Priced {} quotes in {:?}", results.len(), pricing_start.elapsed());

    // Aggregate the block
    let error_count = errors.iter().filter(|e| e.is_some()).count();
    let mut premiums: Vec<Decimal> = results.iter().filter_map(Value::as_decimal).collect();
    premiums.sort();

    println!("\nBlock summary:");
    println!("  Priced:  {}", premiums.len());
    println!("  Errors:  {}", error_count);
    if let (Some(lowest), Some(highest)) = (premiums.first(), premiums.last()) {
        let total: Decimal = premiums.iter().sum();
        println!("  Lowest:  {}", lowest);
        println!("  Highest: {}", highest);
        println!("  Written premium: {}", total);
    }

    for (i, error) in errors.iter().enumerate() {
        if let Some(error) = error {
            log::warn!("row {}: {}", i, error);
        }
    }

    let output = File::create("block_results.csv").expect("Failed to create output file");
    write_batch_csv(output, &contexts, &results, &errors).expect("Failed to write results");
    println!("\nResults written to block_results.csv");
}
