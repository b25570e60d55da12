//! Cluster Lane CLI
//!
//! Entry point for the `cluster-lane` command-line tool.

use clap::{Args, Parser, Subcommand};
use cluster_lane::config::{default_host_config_path, parse_override, ConfigError, Configuration, EffectiveConfig};
use cluster_lane::{ClusterLane, ErrorCode, ExecutionMode, LaneError, SavepointRestore, StopRequest, SubmitRequest};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "cluster-lane")]
#[command(about = "Submit and stop jobs on shared compute clusters", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that talk to a cluster
#[derive(Args)]
struct ClusterArgs {
    /// Execution mode (remote, yarn-session, kubernetes-session, ...)
    #[arg(long, short = 'm')]
    mode: ExecutionMode,

    /// Target cluster id (YARN application id, Kubernetes cluster id or host:port)
    #[arg(long)]
    cluster_id: Option<String>,

    /// Configuration override, repeatable
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    define: Vec<String>,

    /// Config file layered over the host config
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a packaged program
    Submit {
        #[command(flatten)]
        cluster: ClusterArgs,

        /// Path to the program jar
        #[arg(long, short = 'a')]
        artifact: PathBuf,

        /// Entry class, when the jar manifest names none
        #[arg(long = "class")]
        entry_class: Option<String>,

        /// Job parallelism
        #[arg(long, short = 'p')]
        parallelism: Option<u32>,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Restore from this savepoint
        #[arg(long)]
        from_savepoint: Option<String>,

        /// Skip savepoint state that cannot be restored
        #[arg(long, requires = "from_savepoint")]
        allow_non_restored: bool,

        /// Program arguments (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Cancel a running job
    Stop {
        /// Job id returned by submit
        job_id: String,

        #[command(flatten)]
        cluster: ClusterArgs,

        /// Take a savepoint before the job goes away
        #[arg(long)]
        savepoint: bool,

        /// Savepoint target directory
        #[arg(long, requires = "savepoint")]
        savepoint_dir: Option<String>,

        /// Drain sources before stopping (takes a savepoint)
        #[arg(long)]
        drain: bool,
    },

    /// List execution targets with a registered client factory
    Targets {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            cluster,
            artifact,
            entry_class,
            parallelism,
            name,
            from_savepoint,
            allow_non_restored,
            args,
        } => {
            let mut request = SubmitRequest::new(cluster.mode, artifact).with_args(args);
            if let Some(ref id) = cluster.cluster_id {
                request = request.with_cluster_id(id.as_str());
            }
            if let Some(class) = entry_class {
                request = request.with_entry_class(class);
            }
            if let Some(parallelism) = parallelism {
                request = request.with_parallelism(parallelism);
            }
            if let Some(name) = name {
                request = request.with_job_name(name);
            }
            if let Some(path) = from_savepoint {
                request = request.with_savepoint(SavepointRestore {
                    path,
                    allow_non_restored_state: allow_non_restored,
                });
            }
            run_submit(&cluster, &request);
        }
        Commands::Stop {
            job_id,
            cluster,
            savepoint,
            savepoint_dir,
            drain,
        } => {
            let mut request = StopRequest::new(job_id, cluster.mode).with_drain(drain);
            if let Some(ref id) = cluster.cluster_id {
                request = request.with_cluster_id(id.as_str());
            }
            if savepoint {
                request = request.with_savepoint(savepoint_dir);
            }
            run_stop(&cluster, &request);
        }
        Commands::Targets { json } => run_targets(json),
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            let timestamp = buf.timestamp();
            let target = record.target();
            let args = record.args();
            writeln!(buf, "[{timestamp} {style}{level}{style:#} {target}] {args}")
        })
        .init();
}

fn load_config(cluster: &ClusterArgs) -> Result<EffectiveConfig, ConfigError> {
    let mut overrides = BTreeMap::new();
    for raw in &cluster.define {
        let (key, value) = parse_override(raw)?;
        overrides.insert(key, value);
    }
    let host = default_host_config_path();
    EffectiveConfig::build(host.as_deref(), cluster.config.as_deref(), overrides)
}

fn lane_for(cluster: &ClusterArgs) -> ClusterLane {
    match load_config(cluster) {
        Ok(config) => ClusterLane::with_defaults(config),
        Err(e) => {
            let err = LaneError::configuration(e.to_string());
            fail(&err, cluster.json);
        }
    }
}

fn run_submit(cluster: &ClusterArgs, request: &SubmitRequest) {
    let lane = lane_for(cluster);
    match lane.submit(request) {
        Ok(response) => {
            if cluster.json {
                let (configuration, _) = Configuration::from_map(response.configuration.clone()).redacted();
                let output = serde_json::json!({
                    "ok": true,
                    "cluster_id": response.cluster_id,
                    "job_id": response.job_id,
                    "submitted_at": response.submitted_at,
                    "configuration": configuration,
                });
                print_json(&output);
            } else {
                println!("Job {} submitted to {}", response.job_id, response.cluster_id);
            }
        }
        Err(e) => fail(&e, cluster.json),
    }
}

fn run_stop(cluster: &ClusterArgs, request: &StopRequest) {
    let lane = lane_for(cluster);
    match lane.stop(request) {
        Ok(response) => {
            if cluster.json {
                print_json(&serde_json::json!({ "ok": true, "ack": response.ack }));
            } else if response.ack.is_empty() {
                println!("Job {} cancelled", request.job_id);
            } else {
                println!("Job {} stopped ({})", request.job_id, response.ack);
            }
        }
        Err(e) => fail(&e, cluster.json),
    }
}

fn run_targets(json_output: bool) {
    let registry = cluster_lane::FactoryRegistry::with_defaults();
    let targets = registry.targets();
    if json_output {
        let modes: Vec<_> = ExecutionMode::ALL
            .iter()
            .map(|mode| {
                serde_json::json!({
                    "target": mode.target_name(),
                    "registered": targets.contains(&mode.target_name()),
                    "needs_cluster_id": mode.targets_existing_cluster(),
                })
            })
            .collect();
        print_json(&serde_json::json!({ "targets": modes }));
    } else {
        for mode in ExecutionMode::ALL {
            let marker = if targets.contains(&mode.target_name()) { "*" } else { " " };
            let session = if mode.targets_existing_cluster() { " (existing cluster)" } else { "" };
            println!("{} {}{}", marker, mode.target_name(), session);
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn fail(err: &LaneError, json_output: bool) -> ! {
    if json_output {
        let code: ErrorCode = err.code();
        print_json(&serde_json::json!({
            "ok": false,
            "code": code,
            "message": err.report(),
        }));
    } else {
        eprintln!("Error: {}", err.report());
    }
    process::exit(err.exit_code());
}
