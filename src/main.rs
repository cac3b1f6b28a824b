use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use tracing::{error, info, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use gridview::column::ColumnKind;
use gridview::dataset::load_csv;
use gridview::value::{parse_date, parse_numeric};
use gridview::{
    FilterState, FilterValue, GridConfig, GridError, GridView, Pin, RenderedRow, SortKey,
    ViewCoordinator,
};

/// Widest a printed column may get, in terminal cells.
const MAX_PRINT_WIDTH: usize = 40;

#[derive(Debug, Default)]
struct Args {
    file_path: Option<PathBuf>,
    delimiter: Option<u8>,
    config: Option<PathBuf>,
    filters: FilterState,
    sort: Vec<SortKey>,
    pins: Vec<(String, Pin)>,
    hidden: Vec<String>,
    help: bool,
}

/// Parse command line arguments (program name excluded)
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .map(String::as_str)
                .ok_or_else(|| format!("{} requires an argument", arg))
        };

        match arg {
            "-h" | "--help" => parsed.help = true,
            "-d" | "--delimiter" => parsed.delimiter = Some(parse_delimiter(value()?)?),
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--search" => parsed.filters.global_search = value()?.to_string(),
            "--text" | "--number" | "--select" | "--multi" | "--date" | "--range" => {
                let (column, filter) = parse_filter(arg, value()?)?;
                parsed.filters.columns.insert(column, filter);
            }
            "--sort" => parsed.sort.push(parse_sort(value()?)?),
            "--pin" => parsed.pins.push(parse_pin(value()?)?),
            "--hide" => parsed.hidden.push(value()?.to_string()),
            other if other.starts_with('-') => return Err(format!("Unknown option: {}", other)),
            path => parsed.file_path = Some(PathBuf::from(path)),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Parse a delimiter string into a byte
fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s.to_lowercase().as_str() {
        "comma" | "," => Ok(b','),
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "semicolon" | ";" => Ok(b';'),
        "pipe" | "|" => Ok(b'|'),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => Err(format!(
            "Invalid delimiter: '{}'. Use comma, tab, semicolon, pipe, or a single character.",
            s
        )),
    }
}

fn split_assignment(s: &str) -> Result<(String, &str), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => Ok((column.trim().to_string(), value.trim())),
        _ => Err(format!("expected COLUMN=VALUE, got '{}'", s)),
    }
}

fn parse_day(s: &str) -> Result<Option<NaiveDate>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    parse_date(s).map(Some).ok_or_else(|| format!("invalid date: '{}'", s))
}

/// `--text name=ada`, `--range joined=2023-01-01..`, and so on.
fn parse_filter(flag: &str, s: &str) -> Result<(String, FilterValue), String> {
    let (column, raw) = split_assignment(s)?;
    let filter = match flag {
        "--text" => FilterValue::text(raw),
        "--number" => {
            let n = parse_numeric(raw).ok_or_else(|| format!("invalid number: '{}'", raw))?;
            FilterValue::Number(Some(n))
        }
        "--select" => FilterValue::select(raw),
        "--multi" => FilterValue::multi(raw.split(',').map(str::trim).filter(|o| !o.is_empty())),
        "--date" => FilterValue::Date(parse_day(raw)?),
        "--range" => {
            let (from, to) = raw
                .split_once("..")
                .ok_or_else(|| format!("expected FROM..TO, got '{}'", raw))?;
            FilterValue::DateRange {
                from: parse_day(from.trim())?,
                to: parse_day(to.trim())?,
            }
        }
        _ => return Err(format!("Unknown filter option: {}", flag)),
    };
    Ok((column, filter))
}

fn parse_sort(s: &str) -> Result<SortKey, String> {
    match s.rsplit_once(':') {
        None => Ok(SortKey::ascending(s)),
        Some((column, "asc")) => Ok(SortKey::ascending(column)),
        Some((column, "desc")) => Ok(SortKey::descending(column)),
        Some((_, other)) => Err(format!("invalid sort direction '{}', use asc or desc", other)),
    }
}

fn parse_pin(s: &str) -> Result<(String, Pin), String> {
    match s.rsplit_once(':') {
        None => Ok((s.to_string(), Pin::Left)),
        Some((column, "left")) => Ok((column.to_string(), Pin::Left)),
        Some((column, "right")) => Ok((column.to_string(), Pin::Right)),
        Some((_, other)) => Err(format!("invalid pin side '{}', use left or right", other)),
    }
}

fn print_help() {
    eprintln!("gridview - filter, sort and lay out a CSV file the way a data grid would");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    gridview [OPTIONS] FILE");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -d, --delimiter <DELIM>   Set the field delimiter (comma, tab, semicolon, pipe, or char)");
    eprintln!("    --config <FILE>           Grid options as TOML");
    eprintln!("    --text <COL=TEXT>         Case-insensitive substring filter");
    eprintln!("    --number <COL=N>          Exact numeric filter");
    eprintln!("    --select <COL=OPTION>     Exact option filter");
    eprintln!("    --multi <COL=A,B,..>      Any-of option filter");
    eprintln!("    --date <COL=DATE>         Same-day filter");
    eprintln!("    --range <COL=FROM..TO>    Inclusive date range, either side may be empty");
    eprintln!("    --search <TERM>           Global search across filterable columns");
    eprintln!("    --sort <COL[:asc|desc]>   Add a sort key (repeatable, first wins)");
    eprintln!("    --pin <COL[:left|right]>  Pin a column");
    eprintln!("    --hide <COL>              Hide a column");
    eprintln!("    -h, --help                Print this help message");
    eprintln!();
    eprintln!("If no delimiter is specified, it is chosen from the file extension.");
}

/// Pad or cut `text` to exactly `width` display cells.
fn fit(text: &str, width: usize) -> String {
    let current = text.width();
    if current <= width {
        return format!("{}{}", text, " ".repeat(width - current));
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn render(view: &GridView<'_>, out: &mut impl Write) -> io::Result<()> {
    let columns: Vec<_> = view
        .columns
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::Data | ColumnKind::RowNumber))
        .collect();

    let cell = |kind: ColumnKind, id: &str, row: &RenderedRow<'_>| -> String {
        match kind {
            ColumnKind::RowNumber => row.number.to_string(),
            _ => row.row.get(id).to_string(),
        }
    };

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| {
            view.rows
                .iter()
                .map(|r| cell(c.kind, &c.id, r).width())
                .fold(c.header.width(), usize::max)
                .min(MAX_PRINT_WIDTH)
        })
        .collect();

    let header: Vec<String> = columns.iter().zip(&widths).map(|(c, w)| fit(&c.header, *w)).collect();
    writeln!(out, "{}", header.join(" | ").trim_end())?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("-+-"))?;

    for row in &view.rows {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| fit(&cell(c.kind, &c.id, row), *w))
            .collect();
        writeln!(out, "{}", line.join(" | ").trim_end())?;
    }

    writeln!(out)?;
    writeln!(out, "{} of {} rows", view.visible_count(), view.total_rows)?;
    Ok(())
}

fn run(args: Args, file_path: PathBuf) -> Result<(), GridError> {
    let config = match &args.config {
        Some(path) => GridConfig::load(path)?,
        None => GridConfig::default(),
    };
    let loaded = load_csv(&file_path, args.delimiter)?;
    for warning in &loaded.warnings {
        warn!(path = %file_path.display(), "{}", warning);
    }

    let mut grid = ViewCoordinator::new(loaded.dataset, loaded.columns, config);
    for column in &args.hidden {
        if grid.set_column_visibility(column, false).is_ignored() {
            warn!(column = %column, "column can't be hidden");
        }
    }
    for (column, pin) in &args.pins {
        if grid.pin_column(column, *pin).is_ignored() {
            warn!(column = %column, "column can't be pinned");
        }
    }
    let requested = args.sort.len();
    grid.set_sort(args.sort);
    if grid.state().sort.keys().len() != requested {
        warn!("some sort keys were dropped");
    }
    grid.apply_filters(args.filters);

    let view = grid.view();
    info!(visible = view.visible_count(), total = view.total_rows, "rendering view");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    render(&view, &mut out)
        .and_then(|_| out.flush())
        .map_err(|source| GridError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let mut args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    let Some(file_path) = args.file_path.take() else {
        print_help();
        return ExitCode::FAILURE;
    };

    info!(path = %file_path.display(), "gridview started");
    match run(args, file_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to render grid");
            ExitCode::FAILURE
        }
    }
}
