use chrono::Local;
use dashboard::config::parse_generate_args;
use dashboard::generator::{self, GenerationSummary};

/// Writes the sample project workbook
///
/// Generates a deterministic set of projects (seed 42, 20 projects by default),
/// prints a preview and summary statistics, and saves them to
/// `data/projets.xlsx` so the dashboard has something to load.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_generate_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    let anchor = args.anchor.unwrap_or_else(|| Local::now().date_naive());

    let records = generator::generate(args.seed, args.count, anchor);

    println!("Preview of generated data:");
    println!("{}", "=".repeat(80));
    for record in records.iter().take(10) {
        println!("{}", generator::preview_line(record));
    }
    println!("{}", "=".repeat(80));

    println!("Statistics:");
    for line in GenerationSummary::from_records(&records).lines() {
        println!("  - {line}");
    }

    generator::write_xlsx(&records, &args.output)?;
    println!();
    println!("Workbook '{}' created", args.output.display());
    println!(
        "Run the dashboard with: cargo run --bin dashboard -- --source {}",
        args.output.display()
    );

    Ok(())
}
