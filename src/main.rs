//! xlsxcsv CLI - convert every sheet of an XLSX workbook to CSV

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xlsxcsv::{export_base_name, ConverterBuilder, SheetResult, DEFAULT_PREVIEW_ROWS};

#[derive(Parser, Debug)]
#[command(name = "xlsxcsv")]
#[command(author, version, about = "Convert each sheet of an XLSX workbook to a CSV file")]
struct Cli {
    /// Input workbook (.xlsx)
    input: PathBuf,

    /// Directory for the CSV files (default: the input's directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Only export the named sheet (repeatable)
    #[arg(short, long, value_name = "NAME")]
    sheet: Vec<String>,

    /// Print the first N rows of each sheet
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "100")]
    preview: Option<usize>,

    /// Write CSV text to standard output instead of files
    #[arg(long)]
    stdout: bool,

    /// Process sheets one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Print a JSON summary (name, row count, preview rows) of each sheet
    #[arg(long, conflicts_with = "stdout")]
    json: bool,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG`で出力レベルを制御する（デフォルトは警告のみ）
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "xlsxcsv=warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let converter = ConverterBuilder::new()
        .with_parallel(!cli.sequential)
        .build()
        .context("Invalid converter configuration")?;

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("Failed to read '{}'", cli.input.display()))?;

    let results = converter
        .convert(&bytes)
        .with_context(|| format!("Failed to convert '{}'", cli.input.display()))?;

    let selected = select_sheets(&results, &cli.sheet)?;

    if cli.json {
        print_json(&selected, cli.preview.unwrap_or(DEFAULT_PREVIEW_ROWS))?;
    } else if let Some(limit) = cli.preview {
        print_previews(&selected, limit)?;
    }

    if cli.stdout {
        write_stdout(&selected)
    } else {
        let dir = output_dir(&cli.input, cli.output_dir.as_deref());
        write_files(&selected, &dir, &export_base_name(&cli.input))
    }
}

/// `--sheet`で指定されたシートを選択（未指定ならすべて）
fn select_sheets<'a>(results: &'a [SheetResult], names: &[String]) -> Result<Vec<&'a SheetResult>> {
    if names.is_empty() {
        return Ok(results.iter().collect());
    }

    for name in names {
        if !results.iter().any(|r| &r.name == name) {
            bail!("Sheet '{}' not found", name);
        }
    }

    Ok(results
        .iter()
        .filter(|r| names.iter().any(|name| name == &r.name))
        .collect())
}

fn output_dir(input: &Path, requested: Option<&Path>) -> PathBuf {
    match requested {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

fn write_files(sheets: &[&SheetResult], dir: &Path, base: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create '{}'", dir.display()))?;

    for sheet in sheets {
        let path = dir.join(sheet.export_file_name(base));
        std::fs::write(&path, sheet.csv.as_bytes())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        eprintln!("Wrote {} rows to '{}'", sheet.row_count, path.display());
    }

    Ok(())
}

fn write_stdout(sheets: &[&SheetResult]) -> Result<()> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    write_csv_stream(sheets, &mut stdout.lock(), &mut stderr.lock())
}

/// CSVテキストのみを`out`へ書き出す（シート見出しは`banner`側）
fn write_csv_stream<W: Write, E: Write>(
    sheets: &[&SheetResult],
    out: &mut W,
    banner: &mut E,
) -> Result<()> {
    for sheet in sheets {
        if sheets.len() > 1 {
            out.flush()?;
            writeln!(banner, "# Sheet: {}", sheet.name)?;
        }
        sheet
            .write_csv(out)
            .context("Failed to write to stdout")?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

fn print_previews(sheets: &[&SheetResult], limit: usize) -> Result<()> {
    let stderr = io::stderr();
    let mut err = stderr.lock();

    for sheet in sheets {
        writeln!(err, "{} ({} rows)", sheet.name, sheet.row_count)?;
        write!(err, "{}", sheet.render_preview(limit))?;
        if sheet.row_count > limit {
            writeln!(
                err,
                "(Showing first {} rows of {})",
                limit, sheet.row_count
            )?;
        }
        writeln!(err)?;
    }

    Ok(())
}

fn print_json(sheets: &[&SheetResult], limit: usize) -> Result<()> {
    let summary: Vec<serde_json::Value> = sheets
        .iter()
        .map(|sheet| {
            serde_json::json!({
                "name": sheet.name,
                "row_count": sheet.row_count,
                "preview": sheet.preview(limit),
            })
        })
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &summary).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> SheetResult {
        SheetResult {
            name: name.to_string(),
            matrix: vec![vec!["a".to_string()]],
            row_count: 1,
            csv: "a".to_string(),
        }
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "xlsxcsv",
            "book.xlsx",
            "-o",
            "out",
            "--sheet",
            "Sales",
            "--sheet",
            "Notes",
            "--preview",
            "--sequential",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("book.xlsx"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.sheet, vec!["Sales", "Notes"]);
        assert_eq!(cli.preview, Some(DEFAULT_PREVIEW_ROWS));
        assert!(cli.sequential);
        assert!(!cli.stdout);
    }

    #[test]
    fn test_cli_preview_with_value() {
        let cli = Cli::try_parse_from(["xlsxcsv", "book.xlsx", "--preview", "5"]).unwrap();
        assert_eq!(cli.preview, Some(5));
    }

    #[test]
    fn test_cli_json_conflicts_with_stdout() {
        assert!(Cli::try_parse_from(["xlsxcsv", "book.xlsx", "--json", "--stdout"]).is_err());
    }

    #[test]
    fn test_select_sheets() {
        let results = vec![result("Sales"), result("Notes"), result("Summary")];

        let all = select_sheets(&results, &[]).unwrap();
        assert_eq!(all.len(), 3);

        let picked = select_sheets(&results, &["Summary".to_string(), "Sales".to_string()]).unwrap();
        let names: Vec<&str> = picked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Sales", "Summary"]);

        let err = select_sheets(&results, &["Missing".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_output_dir_defaults_to_input_directory() {
        assert_eq!(
            output_dir(Path::new("data/book.xlsx"), None),
            PathBuf::from("data")
        );
        assert_eq!(output_dir(Path::new("book.xlsx"), None), PathBuf::from("."));
        assert_eq!(
            output_dir(Path::new("data/book.xlsx"), Some(Path::new("out"))),
            PathBuf::from("out")
        );
    }

    #[test]
    fn test_csv_stream_keeps_banners_out_of_csv() {
        let results = vec![result("Sales"), result("Notes")];
        let selected: Vec<&SheetResult> = results.iter().collect();
        let mut out = Vec::new();
        let mut banner = Vec::new();

        write_csv_stream(&selected, &mut out, &mut banner).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "a\na\n");
        assert_eq!(
            String::from_utf8(banner).unwrap(),
            "# Sheet: Sales\n# Sheet: Notes\n"
        );
    }

    #[test]
    fn test_csv_stream_single_sheet_has_no_banner() {
        let results = vec![result("Sales")];
        let selected: Vec<&SheetResult> = results.iter().collect();
        let mut out = Vec::new();
        let mut banner = Vec::new();

        write_csv_stream(&selected, &mut out, &mut banner).unwrap();

        assert_eq!(out, b"a\n");
        assert!(banner.is_empty());
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![result("Sales"), result("Q1/Q2")];
        let selected: Vec<&SheetResult> = results.iter().collect();

        write_files(&selected, dir.path(), "book").unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("book_Sales.csv")).unwrap(),
            "a"
        );
        assert!(dir.path().join("book_Q1_Q2.csv").exists());
    }
}
