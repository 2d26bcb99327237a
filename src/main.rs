use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listrev_confgen::{Result, boot, command, emit, log, replicate, topology};

#[derive(Parser)]
#[command(name = "listrev-confgen")]
#[command(about = "listrev configuration generator and log checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate boot and command json files for a listrev session.
    Generate {
        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(short = 'r', long, default_value_t = command::lower::DEFAULT_RUN_NUMBER)]
        run_number: u32,

        /// Roles hosted by one application, e.g. `--apps gr --apps v`.
        /// Omit for a single application.
        #[arg(long = "apps")]
        apps: Vec<topology::RoleSet>,

        /// JSON file with topology parameters; flags override it.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, allow_negative_numbers = true)]
        n_generators: Option<i64>,

        #[arg(long, allow_negative_numbers = true)]
        n_reversers: Option<i64>,

        #[arg(long)]
        no_validator: bool,

        #[arg(long)]
        n_wait_ms: Option<u32>,

        #[arg(long)]
        request_timeout_ms: Option<u32>,

        #[arg(long)]
        request_rate_hz: Option<u32>,

        #[arg(long)]
        max_outstanding_requests: Option<u32>,

        #[arg(long)]
        n_ints_min: Option<u32>,

        #[arg(long)]
        n_ints_max: Option<u32>,

        /// First port for network connections.
        #[arg(long, default_value_t = command::lower::DEFAULT_CONNECTION_PORT)]
        base_port: u16,

        #[arg(long, default_value = topology::builder::DEFAULT_SCHEMA_NAMESPACE)]
        schema_namespace: String,

        /// Output directory; must not exist.
        json_dir: PathBuf,
    },

    /// Replace one application of a generated configuration with N copies.
    Replicate {
        #[arg(short = 'f', long, default_value = "boot.json")]
        file: PathBuf,

        #[arg(short = 'n', long, default_value_t = replicate::DEFAULT_REPLICAS)]
        num_apps: usize,

        #[arg(long, default_value = topology::layout::SINGLE_APP_NAME)]
        app: String,
    },

    /// Check the log files of a finished session.
    CheckLogs {
        /// Run duration in seconds; sets the minimum expected list count.
        #[arg(long, default_value_t = 20)]
        run_duration: u64,

        #[arg(long, default_value_t = 2)]
        copies_per_list: u64,

        /// Do not fail on warning/error lines.
        #[arg(long)]
        allow_errors: bool,

        /// Regex; matching lines are not reported as problems.
        #[arg(long)]
        ignore: Vec<String>,

        /// Print the scraped summary as JSON.
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        logs: Vec<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listrev_confgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Generate {
            host,
            run_number,
            apps,
            config,
            n_generators,
            n_reversers,
            no_validator,
            n_wait_ms,
            request_timeout_ms,
            request_rate_hz,
            max_outstanding_requests,
            n_ints_min,
            n_ints_max,
            base_port,
            schema_namespace,
            json_dir,
        } => {
            use anyhow::Context;

            // 1) Topology parameters: config file, then flags.
            let mut spec = match &config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("read config file {}", path.display()))?;
                    serde_json::from_str::<topology::TopologySpec>(&text)
                        .with_context(|| format!("parse config file {}", path.display()))?
                }
                None => topology::TopologySpec::default(),
            };
            if let Some(n) = n_generators {
                spec.n_generators = n;
            }
            if let Some(n) = n_reversers {
                spec.n_reversers = n;
            }
            if no_validator {
                spec.has_validator = false;
            }
            if let Some(ms) = n_wait_ms {
                spec.n_wait_ms = ms;
            }
            if let Some(ms) = request_timeout_ms {
                spec.request_timeout_ms = ms;
            }
            let validator_flags = [
                request_rate_hz,
                max_outstanding_requests,
                n_ints_min,
                n_ints_max,
            ];
            if validator_flags.iter().any(Option::is_some) {
                let v = spec.validator.get_or_insert_with(Default::default);
                v.request_rate_hz = request_rate_hz.unwrap_or(v.request_rate_hz);
                v.max_outstanding_requests =
                    max_outstanding_requests.unwrap_or(v.max_outstanding_requests);
                v.min_list_size = n_ints_min.unwrap_or(v.min_list_size);
                v.max_list_size = n_ints_max.unwrap_or(v.max_list_size);
            }
            let topo = spec.validate()?;

            // 2) Graph + layout.
            let graph = topology::build_module_graph(
                &topo,
                &topology::BuildOptions { schema_namespace },
            )?;
            let layout = topology::AppLayout::new(&graph, &apps)?;
            tracing::info!(
                modules = graph.modules().len(),
                apps = layout.apps().len(),
                "built listrev topology"
            );

            // 3) Documents.
            let lowering = command::LoweringOptions {
                host: host.clone(),
                run_number,
                base_port,
                ..command::LoweringOptions::default()
            };
            let app_commands = command::lower_layout(&layout, &lowering)?;
            let boot_doc = boot::generate_boot(&layout, &host)?;

            // 4) Write.
            emit::write_config_dir(&json_dir, &boot_doc, &app_commands)?;
            println!("Wrote {}", json_dir.display());
        }

        Commands::Replicate {
            file,
            num_apps,
            app,
        } => {
            let names = replicate::replicate_app(&file, &app, num_apps)?;
            println!("Replaced {} with {} apps in {}", app, names.len(), file.display());
        }

        Commands::CheckLogs {
            run_duration,
            copies_per_list,
            allow_errors,
            ignore,
            json,
            logs,
        } => {
            let summary = log::scrape_logs(&logs[..], &ignore)?;
            if json {
                println!("{}", emit::to_json_string(&summary)?);
            }
            for p in &summary.problems {
                tracing::warn!(
                    path = %p.path.display(),
                    line = p.line,
                    severity = ?p.severity,
                    "{}",
                    p.text
                );
            }

            let expectations = log::Expectations {
                copies_per_list,
                allow_problems: allow_errors,
                ..log::Expectations::for_run_duration(run_duration)
            };
            let failures = log::check_summary(&summary, &expectations);
            if !failures.is_empty() {
                for f in &failures {
                    eprintln!("FAIL: {}", f);
                }
                anyhow::bail!("{} log check(s) failed", failures.len());
            }
            println!(
                "Log checks passed ({} files, {} lists generated)",
                summary.files, summary.generator.generated
            );
        }
    }

    Ok(())
}
