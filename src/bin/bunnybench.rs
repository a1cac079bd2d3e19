use std::path::PathBuf;

use anyhow::Result;
use bunnybench::{
    aggregate::CohortSelection,
    charts::{ChartKind, ChartRegistry},
    config::BenchConfig,
    config_file::LoadConfigFile,
    context::PipelineContext,
    info,
    load::list_input_files,
    output_table::terminal::TerminalTableOpts,
    record::Dimension,
    render::{
        ColorScheme, OutputMode, TableRenderer, crossings_panel, input_files_panel, print_panel,
        summary_panel,
    },
    summary::MetricSpec,
    utillib::{
        get_terminal_width::get_terminal_width,
        logging::{LogLevelOpt, set_log_level},
    },
};
use clap::Parser;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PROGRAM_NAME: &str = "bunnybench";

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(term_width = get_terminal_width(4))]
/// Compare benchmark runs of several language implementations of the
/// bunny benchmark across browsers.
struct Opts {
    #[clap(flatten)]
    log_level: LogLevelOpt,

    /// Path to the config file (.json5, .json, .yml, .yaml or
    /// .hcl). By default, `./bunnybench.*` is used if present.
    #[clap(long)]
    config: Option<PathBuf>,

    /// The directory with the benchmark logs (default from the config
    /// file, or `./data`)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct SelectionOpt {
    /// Which cohorts to analyze together: default-only,
    /// default+opt-low, default+opt-high, laptop-only (default from
    /// the config file)
    #[clap(long)]
    cohorts: Option<CohortSelection>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print version
    Version,

    /// List the input files and the cohort each belongs to
    Cohorts {
        #[clap(flatten)]
        table_opts: TerminalTableOpts,
    },

    /// Show, per curve, the workload at which the game frame rate
    /// first crosses the threshold
    Crossings {
        #[clap(flatten)]
        selection: SelectionOpt,
        #[clap(flatten)]
        table_opts: TerminalTableOpts,

        /// The frame rate to look for (default from the config file)
        #[clap(long)]
        threshold: Option<f64>,

        /// Ignore crossings at smaller workloads than this
        #[clap(long)]
        lower_bound: Option<f64>,
    },

    /// Reduce metrics per group, e.g. `summary --by lang,browser
    /// bunnies:max fps_game:mean`
    Summary {
        #[clap(flatten)]
        selection: SelectionOpt,
        #[clap(flatten)]
        table_opts: TerminalTableOpts,

        /// The dimensions to group by (lang, browser, opt_level)
        #[clap(long, value_delimiter = ',', default_value = "lang,browser")]
        by: Vec<Dimension>,

        /// `field:reduction` pairs, reduction being `max` or `mean`
        #[clap(required = true)]
        metrics: Vec<MetricSpec>,
    },

    /// Produce charts, shown as tables or saved to files
    Plot {
        #[clap(flatten)]
        selection: SelectionOpt,
        #[clap(flatten)]
        table_opts: TerminalTableOpts,

        /// Write the charts to the output directory instead of
        /// showing them
        #[clap(long)]
        save: bool,

        /// Where to write the charts (implies `--save`)
        #[clap(long)]
        output_dir: Option<PathBuf>,

        /// The charts to produce, e.g. `FPS_vs_Bunnies` (default from
        /// the config file, or all)
        charts: Vec<ChartKind>,
    },
}

fn apply_selection(config: &mut BenchConfig, selection: SelectionOpt) {
    let SelectionOpt { cohorts } = selection;
    if let Some(cohorts) = cohorts {
        config.cohort_selection = cohorts;
    }
}

fn main() -> Result<()> {
    let Opts {
        log_level,
        config,
        data_dir,
        command,
    } = Opts::parse();

    set_log_level(log_level.try_into()?);

    let mut config = BenchConfig::load_config(config)?;
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    let colors = ColorScheme::from_config(&config);

    match command {
        Command::Version => println!("{PROGRAM_NAME} version {}", env!("CARGO_PKG_VERSION")),

        Command::Cohorts { table_opts } => {
            let files = list_input_files(&config.data_dir, &config.cohort_rules())?;
            print_panel(&input_files_panel(&files), &colors, &table_opts)?;
        }

        Command::Crossings {
            selection,
            table_opts,
            threshold,
            lower_bound,
        } => {
            apply_selection(&mut config, selection);
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            if let Some(lower_bound) = lower_bound {
                config.lower_bound = lower_bound;
            }
            let ctx = PipelineContext::load(&config)?;
            let panel = crossings_panel(&ctx.crossings, ctx.dimensions(), &ctx.analysis);
            print_panel(&panel, &colors, &table_opts)?;
        }

        Command::Summary {
            selection,
            table_opts,
            by,
            metrics,
        } => {
            apply_selection(&mut config, selection);
            let ctx = PipelineContext::load(&config)?;
            let summary = ctx.summary(&by, &metrics);
            print_panel(&summary_panel(&summary), &colors, &table_opts)?;
        }

        Command::Plot {
            selection,
            table_opts,
            save,
            output_dir,
            charts,
        } => {
            apply_selection(&mut config, selection);
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
                config.save_to_files = true;
            }
            if save {
                config.save_to_files = true;
            }
            if !charts.is_empty() {
                config.charts = charts;
            }

            let ctx = PipelineContext::load(&config)?;
            let mode = if config.save_to_files {
                OutputMode::Save {
                    output_dir: config.output_dir.clone(),
                }
            } else {
                OutputMode::Display
            };
            let mut renderer = TableRenderer::new(mode, table_opts, colors);
            let rendered =
                ctx.render_charts(&ChartRegistry::default(), &config.charts, &mut renderer)?;
            info!(
                "rendered {} of {} charts, {} files written",
                rendered.len(),
                config.charts.len(),
                renderer.written().len()
            );
        }
    }

    Ok(())
}
