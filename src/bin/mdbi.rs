use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use mdbi_rs::api::{DEFAULT_VALUES_PATH, normalize_metric_ids};
use mdbi_rs::config::{self, ALL_METRICS_ID, ChartConfig, ChartKind};
use mdbi_rs::loader::{self, LoadRequest};
use mdbi_rs::transform::map_locale;
use mdbi_rs::{ChartSession, Client, EntityId, LoadState, Since, YearRange, viz};

#[derive(Parser, Debug)]
#[command(
    name = "mdbi",
    version,
    about = "Fetch and chart financial indicators of multilateral development banks"
)]
struct Cli {
    /// Base URL of the indicators API (defaults to $MDBI_API_URL, then localhost).
    #[arg(long, global = true)]
    api: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in chart presets and their metrics.
    Presets,
    /// Fetch raw value rows and print them as JSON.
    Fetch(FetchArgs),
    /// Load a chart and write it to an SVG or PNG file.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Metric ids separated by comma or semicolon (e.g., sp_01,sp_02)
    #[arg(short, long)]
    metrics: String,
    /// Values endpoint path.
    #[arg(long, default_value = DEFAULT_VALUES_PATH)]
    endpoint: String,
    /// Earliest year to request.
    #[arg(long, default_value_t = config::DEFAULT_YEAR_FROM, conflicts_with = "start_date")]
    year_from: i32,
    /// Earliest date to request (YYYY-MM-DD), for endpoints keyed by date.
    #[arg(long)]
    start_date: Option<chrono::NaiveDate>,
    /// Write JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Built-in preset (see `mdbi presets`).
    #[arg(short, long, default_value = "moodys-ratios", conflicts_with = "config")]
    preset: String,
    /// Chart config JSON file instead of a preset.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Metric to show (defaults to the config's default metric).
    #[arg(short, long, conflicts_with = "all")]
    metric: Option<String>,
    /// Show every metric as a grid of small charts.
    #[arg(long, default_value_t = false)]
    all: bool,
    /// Draw latest values as bars instead of lines.
    #[arg(long, default_value_t = false)]
    bars: bool,
    /// Year-over-year % change instead of levels.
    #[arg(long, default_value_t = false)]
    yoy: bool,
    /// First year of the view window.
    #[arg(long)]
    from: Option<i32>,
    /// Last year of the view window.
    #[arg(long)]
    to: Option<i32>,
    /// MDB ids to select, separated by comma or semicolon (defaults to the config's).
    #[arg(short, long)]
    entities: Option<String>,
    /// MDB ids to keep selected but hidden.
    #[arg(long)]
    hide: Option<String>,
    /// Locale for number formatting (en, de, fr, es, it, pt, nl).
    #[arg(long, default_value = "en")]
    locale: String,
    /// Output path (.svg or .png).
    #[arg(short, long)]
    out: PathBuf,
    /// Width of the chart.
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of the chart.
    #[arg(long, default_value_t = 600)]
    height: u32,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_ids(s: &str) -> Result<Vec<EntityId>> {
    parse_list(s)
        .iter()
        .map(|x| {
            x.parse::<EntityId>()
                .with_context(|| format!("invalid MDB id '{x}'"))
        })
        .collect()
}

fn client(api: Option<String>) -> Client {
    match api {
        Some(url) => Client::new(url),
        None => Client::default(),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Presets => cmd_presets(),
        Command::Fetch(args) => cmd_fetch(client(cli.api), args),
        Command::Render(args) => cmd_render(client(cli.api), args),
    }
}

fn cmd_presets() -> Result<()> {
    for (name, cfg) in config::presets() {
        let ids = cfg.grid_metric_ids().join(", ");
        let grid = if cfg.has_show_all() { " [grid]" } else { "" };
        println!("{name}{grid}: {ids}");
    }
    Ok(())
}

fn cmd_fetch(client: Client, args: FetchArgs) -> Result<()> {
    let list = parse_list(&args.metrics);
    let ids = normalize_metric_ids(list.iter().map(String::as_str));
    if ids.is_empty() {
        anyhow::bail!("--metrics needs at least one metric id");
    }
    let since = match args.start_date {
        Some(d) => Since::StartDate(d),
        None => Since::YearFrom(args.year_from),
    };
    let rows = client
        .fetch_values(&args.endpoint, &ids, since)
        .with_context(|| format!("fetching {}", ids.join(",")))?;
    let json = serde_json::to_string_pretty(&rows)?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Saved {} rows to {}", rows.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_config(args: &RenderArgs) -> Result<ChartConfig> {
    let mut cfg = match &args.config {
        Some(path) => ChartConfig::from_json_file(path)?,
        None => config::preset(&args.preset)?,
    };
    if let Some(list) = &args.entities {
        cfg.default_entities = parse_ids(list)?;
    }
    if args.bars {
        cfg.kind = ChartKind::LatestBar;
    }
    Ok(cfg)
}

fn cmd_render(client: Client, args: RenderArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    if args.all && !cfg.has_show_all() {
        anyhow::bail!("this chart has no grid view");
    }
    let mut session = ChartSession::new(cfg).with_locale(map_locale(&args.locale));
    if args.all {
        session.select_metric(ALL_METRICS_ID);
    } else if let Some(id) = &args.metric
        && session.view().selected_metric_id != *id
        && !session.select_metric(id)
    {
        anyhow::bail!("unknown metric '{id}'");
    }
    session.set_yoy(args.yoy);

    if let Some(req) = session.take_load_request() {
        load_into(&client, &mut session, req)?;
    }
    if let Some(list) = &args.hide {
        for id in parse_ids(list)? {
            session.toggle_visibility(id);
        }
    }
    if let Some(global) = session.global_domain()
        && (args.from.is_some() || args.to.is_some())
    {
        let window = YearRange::new(
            args.from.unwrap_or(global.start),
            args.to.unwrap_or(global.end),
        );
        session.set_year_domain(window);
    }

    let frame = session.prepare(args.width as f64, args.height as f64);
    viz::render_to_file(&frame, &args.out)
        .with_context(|| format!("rendering {}", args.out.display()))?;
    if *session.state() == LoadState::Empty {
        eprintln!("No data for the current selection.");
    }
    eprintln!("Wrote chart to {}", args.out.display());
    Ok(())
}

fn load_into(client: &Client, session: &mut ChartSession, req: LoadRequest) -> Result<()> {
    let outcome = loader::load_chart_data(client, &req);
    if let Err(e) = &outcome.result {
        anyhow::bail!("failed to load {}: {e}", req.metric_ids.join(","));
    }
    session.apply_load(outcome);
    Ok(())
}
