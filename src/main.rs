// Console front-end.
//
// - Option [1] loads and cleans the purchase-order CSV, printing the
//   data-quality summary.
// - Option [2] edits the active filter.
// - Option [3] builds a report, previews each sheet and exports it.
// - Option [4] prints the data-quality report.
// - Option [5] looks up a single supplier.
use clap::Parser;
use procurement_dashboard::analytics::{data_summary, supplier_profile, Granularity};
use procurement_dashboard::export::{self, ExportFormat, ExportOptions};
use procurement_dashboard::filter::{filter_options, search_suppliers};
use procurement_dashboard::report::quality_sheet;
use procurement_dashboard::util::{format_currency, format_int, parse_date_safe};
use procurement_dashboard::{Config, FilterSpec, ReportKind, Session};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "procurement_dashboard", about = "Procurement spend analytics")]
struct Cli {
    /// Purchase-order CSV to analyse (overrides DATA_PATH).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory for exported reports (overrides OUTPUT_DIR).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

struct App {
    session: Session,
    source: Option<PathBuf>,
    filter: FilterSpec,
}

/// Rows shown per sheet in the console preview.
const PREVIEW_ROWS: usize = 5;

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn split_list(s: &str) -> BTreeSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Handle option [1]: load and clean the CSV file.
fn handle_load(app: &mut App) {
    let default = app.session.config().data_path.clone();
    let answer = prompt(&format!("CSV path [{}]: ", default.display()));
    let path = if answer.is_empty() {
        default
    } else {
        PathBuf::from(answer)
    };
    match app.session.dataset(&path) {
        Ok(data) => {
            let q = &data.quality;
            println!(
                "Processing dataset... ({} rows loaded, {} malformed rows skipped)",
                format_int(q.loaded_rows as i64),
                format_int(q.malformed_rows as i64)
            );
            for w in q.warnings() {
                println!("Warning: {}", w);
            }
            println!(
                "Total spend: {}\n",
                format_currency(data.table.total_spend())
            );
            app.source = Some(path);
            app.filter = FilterSpec::default();
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

/// Handle option [2]: edit the active filter.
fn handle_filters(app: &mut App) {
    let Some(source) = app.source.clone() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let data = match app.session.dataset(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };
    let opts = filter_options(&data.table, &app.filter);
    println!("Active filter: {}", app.filter.describe());
    if let Some((lo, hi)) = opts.date_bounds {
        println!("Order dates available: {} to {}", lo, hi);
    }
    println!("Categories: {}", opts.categories.join(", "));
    println!("Supplier states: {}", opts.supplier_states.join(", "));
    if !opts.po_statuses.is_empty() {
        println!("PO statuses: {}", opts.po_statuses.join(", "));
    }
    println!("\n[1] Date range");
    println!("[2] Categories");
    println!("[3] Subcategories");
    println!("[4] Supplier states");
    println!("[5] Suppliers");
    println!("[6] PO statuses");
    println!("[7] Clear all filters\n");
    match read_choice().as_str() {
        "1" => {
            let start = parse_date_safe(Some(prompt("Start date (YYYY-MM-DD): ").as_str()));
            let end = parse_date_safe(Some(prompt("End date (YYYY-MM-DD): ").as_str()));
            match (start, end) {
                (Some(s), Some(e)) if s <= e => app.filter.date_range = Some((s, e)),
                _ => println!("Invalid date range; filter unchanged."),
            }
        }
        "2" => app.filter.categories = split_list(&prompt("Categories (comma-separated): ")),
        "3" => {
            println!("Subcategories: {}", opts.subcategories.join(", "));
            app.filter.subcategories = split_list(&prompt("Subcategories (comma-separated): "));
        }
        "4" => {
            app.filter.supplier_states = split_list(&prompt("Supplier states (comma-separated): "))
        }
        "5" => {
            let matches = search_suppliers(&data.table, &prompt("Search suppliers: "));
            if matches.is_empty() {
                println!("No matching suppliers.");
            } else {
                println!("Matching suppliers: {}", matches.join(", "));
                app.filter.suppliers = split_list(&prompt("Suppliers (comma-separated): "));
            }
        }
        "6" => app.filter.po_statuses = split_list(&prompt("PO statuses (comma-separated): ")),
        "7" => app.filter = FilterSpec::default(),
        _ => println!("Invalid choice."),
    }
    println!("Active filter: {}\n", app.filter.describe());
}

fn choose_report() -> Option<ReportKind> {
    println!("Select Report:");
    for (i, kind) in ReportKind::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, kind.title());
    }
    println!();
    let kind = read_choice()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| ReportKind::ALL.get(i).copied())?;
    if let ReportKind::SpendTrend(_) = kind {
        let g = prompt("Granularity (month/quarter/year) [month]: ");
        let g = if g.is_empty() {
            Ok(Granularity::Month)
        } else {
            g.parse::<Granularity>()
        };
        return match g {
            Ok(g) => Some(ReportKind::SpendTrend(g)),
            Err(e) => {
                println!("{}", e);
                None
            }
        };
    }
    Some(kind)
}

/// Handle option [3]: build, preview and export one report.
fn handle_generate_report(app: &App) {
    let Some(source) = app.source.as_deref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let Some(kind) = choose_report() else {
        println!("Invalid choice.\n");
        return;
    };
    let sheets = match app.session.report(source, &app.filter, kind) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Report failed: {}\n", e);
            return;
        }
    };
    println!("\n{}", kind);
    println!("({})\n", app.filter.describe());
    for sheet in sheets.iter() {
        println!("{}\n", sheet.name);
        println!("{}\n", export::preview(sheet, PREVIEW_ROWS));
    }

    let format = match prompt("Export format (xlsx/csv) [xlsx]: ").as_str() {
        "" => Ok(ExportFormat::Workbook),
        other => other.parse::<ExportFormat>(),
    };
    let format = match format {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}\n", e);
            return;
        }
    };
    let config = app.session.config();
    let ext = match format {
        ExportFormat::Workbook => "xlsx",
        ExportFormat::Csv => "csv",
    };
    let dest = config.output_dir.join(format!("{}.{}", kind.slug(), ext));
    let options = ExportOptions {
        allow_empty: config.allow_empty_export,
        ..ExportOptions::default()
    };
    match export::export(&sheets, format, &dest, options) {
        Ok(paths) => {
            for p in paths {
                println!("(Exported to {})", p.display());
            }
        }
        Err(e) => eprintln!("Export failed: {}", e),
    }

    match app.session.filtered(source, &app.filter) {
        Ok(table) => {
            let summary = data_summary(&table);
            let path = config.output_dir.join("summary.json");
            if let Err(e) = export::write_json(&path, &summary) {
                eprintln!("Write error: {}", e);
            } else {
                println!("Summary Stats ({}):", path.display());
                println!(
                    "{{\"total_spend\": {}, \"unique_suppliers\": {}}}\n",
                    format_currency(summary.total_spend),
                    format_int(summary.unique_suppliers as i64)
                );
            }
        }
        Err(e) => eprintln!("Summary failed: {}\n", e),
    }
}

/// Handle option [4]: print the data-quality report for the loaded file.
fn handle_quality(app: &App) {
    let Some(source) = app.source.as_deref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    match app.session.dataset(source) {
        Ok(data) => {
            println!("{}\n", export::preview(&quality_sheet(&data.quality), usize::MAX));
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

/// Handle option [5]: supplier drill-down within the active filter.
fn handle_supplier_lookup(app: &App) {
    let Some(source) = app.source.as_deref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let table = match app.session.filtered(source, &app.filter) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };
    let matches = search_suppliers(&table, &prompt("Search suppliers: "));
    let Some(name) = matches.first() else {
        println!("No matching suppliers.\n");
        return;
    };
    if matches.len() > 1 {
        println!("Matches: {}", matches.join(", "));
    }
    if let Some(p) = supplier_profile(&table, name) {
        println!("\n{}", p.supplier);
        println!("Total spend: {}", format_currency(p.total_spend));
        println!("Line items: {}", format_int(p.po_count as i64));
        println!("Avg line value: {}", format_currency(p.avg_po_value));
        if let Some(state) = &p.primary_state {
            println!("Primary state: {}", state);
        }
        if let (Some(first), Some(last)) = (p.first_order, p.last_order) {
            println!("Orders: {} to {}", first, last);
        }
        for c in &p.by_category {
            println!("  {}: {}", c.name, format_currency(c.total_spend));
        }
        println!();
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(dir) = cli.out_dir {
        config.output_dir = dir;
    }

    let mut app = App {
        session: Session::new(config),
        source: None,
        filter: FilterSpec::default(),
    };

    loop {
        println!("Procurement Dashboard:");
        println!("[1] Load the file");
        println!("[2] Set Filters");
        println!("[3] Generate Report");
        println!("[4] Data Quality Report");
        println!("[5] Supplier Lookup");
        println!("[6] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&mut app),
            "2" => handle_filters(&mut app),
            "3" => {
                println!();
                handle_generate_report(&app);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "4" => handle_quality(&app),
            "5" => handle_supplier_lookup(&app),
            "6" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1 to 6.\n"),
        }
    }
    ExitCode::SUCCESS
}
