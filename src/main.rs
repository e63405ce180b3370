//! Rating Engine CLI
//!
//! Command-line walkthrough: builds the motor tariff in code, prices one
//! quote with trace and profiler attached, and prints both.

use rating_engine::{
    BranchDescriptor, CompareOp, Context, ExactMatchTable, InputKind, LookupMode,
    NodeDescriptor, Profiler, RangeTable, RoundingMode, Table, TableRegistry, TariffGraph,
    TariffMetadata, Trace, Value,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).expect("literal decimal")
}

/// Motor private tariff: base premium scaled by age, brand, and density
/// factors, plus a policy fee, rounded to cents.
fn motor_tariff() -> (TariffGraph, TableRegistry) {
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

    let metadata = TariffMetadata::new("MOTOR_PRIVATE", "2024_09", "EUR")
        .with_description("Motor private multiplicative tariff");

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

    let graph = TariffGraph::new(metadata, descriptors, &tables)
        .expect("motor tariff descriptors are well-formed");
    (graph, tables)
}

fn main() {
    env_logger::init();

    println!("Rating Engine v0.1.0");
    println!("====================\n");

    let (graph, _tables) = motor_tariff();
    let metadata = graph.metadata();
    println!("Tariff: {} v{} ({})", metadata.product, metadata.version, metadata.currency);
    println!("  Nodes: {}", graph.node_count());
    println!();

    // One urban BMW quote
    let context = Context::new()
        .with("driver_age", 22)
        .with("brand", "BMW")
        .with("density", 1500);

    let mut trace = Trace::new();
    let mut profiler = Profiler::new();
    let total = graph
        .evaluate_observed("total_premium", &context, Some(&mut trace), Some(&mut profiler))
        .unwrap_or_else(|e| {
            eprintln!("{}", e.detail());
            std::process::exit(1);
        });

    println!("Quote: driver_age=22, brand=BMW, density=1500");
    println!("Total premium: {} {}\n", total, metadata.currency);

    // Per-node breakdown in discovery order of the trace
    println!("{:<20} {:>10} {:>12}  {}", "Node", "Kind", "Value", "Path");
    println!("{}", "-".repeat(78));
    for (name, record) in trace.iter() {
        println!(
            "{:<20} {:>10} {:>12}  {}",
            name,
            record.kind,
            record.value.to_string(),
            record.path.join(" -> "),
        );
    }

    println!("\n{}", profiler.report(10));
}
