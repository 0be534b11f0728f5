use chrono::Local;
use dashboard::aggregate::Kpis;
use dashboard::config::{DashboardArgs, parse_dashboard_args};
use dashboard::downloader::{self, ExportFormat};
use dashboard::loader::format_number;
use dashboard::view::DashboardView;
use std::process::ExitCode;

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_kpis(kpis: &Kpis) {
    println!("Key indicators");
    println!("  Total projects     {}", kpis.total);
    println!("  Completion rate    {:.1}%", kpis.completion_rate);
    println!("  Overdue projects   {}", kpis.overdue);
    println!("  Mean progress      {}", percent(kpis.mean_progress));
    println!(
        "  Satisfaction       {}",
        kpis.mean_satisfaction
            .map(|v| format!("{v:.1}/5"))
            .unwrap_or_else(|| "n/a".to_string())
    );
}

fn print_counts(title: &str, counts: &[(String, usize)]) {
    println!("{title}");
    for (key, n) in counts {
        println!("  {key:<20} {n:>3} {}", "#".repeat(*n));
    }
}

fn print_view(view: &DashboardView, args: &DashboardArgs) {
    println!("Filter: {}", view.filter);
    println!();
    print_kpis(&view.kpis);
    println!();
    print_counts("Projects by phase", &view.by_phase);
    print_counts("Projects by country", &view.by_country);
    print_counts("Workload by owner", &view.by_owner);

    println!("Satisfaction by owner");
    for (owner, mean) in &view.satisfaction_by_owner {
        println!("  {owner:<20} {mean:.2}");
    }

    println!("Progress");
    for bar in &view.progress {
        let filled = (bar.progress.clamp(0.0, 100.0) / 5.0).round() as usize;
        println!(
            "  {:<6} {:<20} {:>4}% {}",
            bar.project_id,
            "=".repeat(filled),
            format_number(bar.progress),
            bar.status
        );
    }

    println!("Timeline");
    for entry in &view.timeline {
        println!(
            "  {:<6} {} -> {}  {:<13} {:<20} {:<8} {:>4}%",
            entry.project_id,
            entry.start,
            entry.end,
            entry.phase,
            entry.client,
            entry.owner,
            format_number(entry.progress)
        );
    }

    println!();
    let rows = match args.sort {
        Some(key) => view.sorted_rows(key, args.direction),
        None => view.rows.clone(),
    };
    if let Some(key) = args.sort {
        println!("Details (sorted by {key})");
    } else {
        println!("Details");
    }
    for row in &rows {
        let r = &row.record;
        println!(
            "  {:<6} {:<20} {:<12} {:<13} {:<8} {} {} {:<12} {:>4} {:>4} {:>5}{}",
            r.project_id,
            r.client,
            r.country,
            r.phase,
            r.owner,
            r.start_date.format("%d/%m/%Y"),
            r.end_date.format("%d/%m/%Y"),
            r.status,
            format_number(r.progress),
            format_number(r.satisfaction),
            row.days_remaining,
            if row.is_overdue { "  overdue" } else { "" }
        );
    }
}

fn run(args: DashboardArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.config.record_store();
    log::debug!(
        "loading {} (cache {})",
        store.source().display(),
        store.policy()
    );
    let records = store.records()?;

    let now = Local::now().naive_local();
    let view = DashboardView::build(&records, &args.filter, now);
    for (field, value) in view.filter.constraints() {
        if !view.options.get(field).iter().any(|v| v == value) {
            log::warn!("no project has {field} = {value:?}");
        }
    }
    print_view(&view, &args);

    if let Some(format) = args.export {
        let rows = match args.sort {
            Some(key) => view.sorted_rows(key, args.direction),
            None => view.rows.clone(),
        };
        let bytes = downloader::render(&rows, format, args.columns)?;
        let path = downloader::write_export(&args.config.export_dir, now.date(), format, &bytes)?;
        let label = match format {
            ExportFormat::Csv => "CSV",
            ExportFormat::Xlsx => "XLSX",
        };
        println!();
        println!("{label} export written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_dashboard_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
