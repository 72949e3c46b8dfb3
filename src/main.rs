//! nodeinit - Kubernetes worker-node bootstrap engine

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nodeinit::config::{self, AwsConfig};
use nodeinit::kubernetes::{connection_validation, unauthenticated_validation};
use nodeinit::node::ec2::Ec2NodeProvider;
use nodeinit::node::hybrid::HybridNodeProvider;
use nodeinit::node::{self, NodeProvider};
use nodeinit::validation::{
    flatten_remediation, skip_list_from_phases, Runner, SingleRunner, TracingInformer,
};

/// nodeinit - bootstrap this machine into a Kubernetes cluster
#[derive(Parser, Debug)]
#[command(name = "nodeinit", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize this machine as a cluster worker node
    ///
    /// Validates the node, configures containerd and kubelet (plus the
    /// credential-refresh helper on hybrid nodes using IAM Roles Anywhere),
    /// and starts them in order.
    Init(InitArgs),

    /// Diagnose cluster connectivity without changing the node
    ///
    /// Runs the endpoint reachability and unauthenticated request checks
    /// against the configured cluster, reporting remediation for failures.
    Debug(DebugArgs),
}

/// Init mode arguments
#[derive(Parser, Debug)]
struct InitArgs {
    /// Node configuration source (a path or file:// URI)
    #[arg(short = 'c', long = "config-source", env = "NODEINIT_CONFIG_SOURCE")]
    config_source: String,

    /// AWS region the cluster lives in
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// Validation phases to skip (e.g., node-ip-validation); repeatable
    #[arg(long = "skip", value_name = "PHASE")]
    skip_phases: Vec<String>,
}

/// Debug mode arguments
#[derive(Parser, Debug)]
struct DebugArgs {
    /// Node configuration source (a path or file:// URI)
    #[arg(short = 'c', long = "config-source", env = "NODEINIT_CONFIG_SOURCE")]
    config_source: String,

    /// Validation phases to skip; repeatable
    #[arg(long = "skip", value_name = "PHASE")]
    skip_phases: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider - the connectivity validators and the
    // Kubernetes client both build rustls configs and need one registered.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {e:?}");
        std::process::exit(1);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => run_init(args).await,
        Commands::Debug(args) => run_debug(args).await,
    }
}

/// Run the connectivity checks against the configured cluster
async fn run_debug(args: DebugArgs) -> anyhow::Result<()> {
    tracing::info!(config_source = %args.config_source, "Loading configuration");
    let node_config = config::load(&args.config_source).await?;

    let runner = SingleRunner::new(TracingInformer)
        .with_skipped_validations(skip_list_from_phases(&args.skip_phases));

    runner
        .run(
            &node_config,
            &[connection_validation(), unauthenticated_validation()],
        )
        .await
        .map_err(|e| anyhow::anyhow!(flatten_remediation(e.as_ref()).to_string()))?;

    tracing::info!("Cluster connectivity checks passed");
    Ok(())
}

/// Run the init flow end to end for the configured topology
async fn run_init(args: InitArgs) -> anyhow::Result<()> {
    tracing::info!(config_source = %args.config_source, "Loading configuration");
    let node_config = config::load(&args.config_source).await?;

    let aws_config = AwsConfig {
        region: args.region,
    };

    let provider: Box<dyn NodeProvider> = if node_config.is_hybrid_node() {
        tracing::info!("Initializing hybrid node");
        Box::new(
            HybridNodeProvider::new(node_config, args.skip_phases).with_aws_config(aws_config),
        )
    } else {
        tracing::info!("Initializing EC2 node");
        Box::new(Ec2NodeProvider::new(node_config).with_aws_config(aws_config))
    };

    let result = node::init(provider.as_ref()).await;
    provider.cleanup()?;

    // Surface remediation text attached anywhere in the cause chain.
    result.map_err(|e| anyhow::anyhow!(flatten_remediation(&e).to_string()))?;

    tracing::info!("Node initialization complete");
    Ok(())
}
