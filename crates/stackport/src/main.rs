mod commands;
mod context;
mod flash;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackport")]
#[command(about = "Static sites and virtual machines as Pulumi stacks", long_about = None)]
struct Cli {
    /// Owner id recorded on new stacks and used to scope listings
    #[arg(long, global = true, env = "STACKPORT_OWNER")]
    owner: Option<String>,

    /// Enable debug logging (RUST_LOG is ignored)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage static websites
    #[command(subcommand)]
    Site(SiteCommands),
    /// Manage virtual machines
    #[command(subcommand)]
    Vm(VmCommands),
    /// Rebuild the listing cache of a kind from the engine
    Refresh {
        #[arg(value_enum)]
        kind: KindArg,
    },
    /// Check that the engine is installed and logged in
    Whoami,
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum SiteCommands {
    /// List sites
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last-applied content of a site
    Show { name: String },
    /// Create a site
    Create {
        name: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Replace the content of a site
    Update {
        name: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Destroy a site and release its name
    Delete { name: String },
}

#[derive(Subcommand)]
enum VmCommands {
    /// List virtual machines
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last-applied settings of a virtual machine
    Show { name: String },
    /// Create a virtual machine
    Create {
        name: String,
        #[command(flatten)]
        vm: VmArgs,
    },
    /// Change the key or instance type of a virtual machine
    Update {
        name: String,
        #[command(flatten)]
        vm: VmArgs,
    },
    /// Destroy a virtual machine and release its name
    Delete { name: String },
}

#[derive(Args, Debug, Default)]
pub struct ContentArgs {
    /// Inline HTML served as index.html
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the HTML from a local file
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    /// Fetch the HTML from a URL (wins over inline content)
    #[arg(long)]
    pub content_url: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct VmArgs {
    /// OpenSSH public key installed on the instance
    #[arg(long, conflicts_with = "public_key_file")]
    pub public_key: Option<String>,

    /// Read the public key from a file (e.g. ~/.ssh/id_ed25519.pub)
    #[arg(long)]
    pub public_key_file: Option<PathBuf>,

    /// Instance type (defaults to the first configured type)
    #[arg(long)]
    pub instance_type: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    #[value(alias = "site")]
    Sites,
    #[value(alias = "vm")]
    Vms,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("stackport {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let settings = stackport_config::Settings::load()?;
    tracing::debug!(
        project = %settings.project,
        region = %settings.region,
        "Settings loaded"
    );
    let ctx = context::Context::new(settings)?;
    let owner = cli.owner.as_deref();

    match cli.command {
        Commands::Site(cmd) => match cmd {
            SiteCommands::List { json } => commands::site::list(&ctx, owner, json).await,
            SiteCommands::Show { name } => commands::site::show(&ctx, &name).await,
            SiteCommands::Create { name, content } => {
                commands::site::create(&ctx, &name, content, owner).await
            }
            SiteCommands::Update { name, content } => {
                commands::site::update(&ctx, &name, content, owner).await
            }
            SiteCommands::Delete { name } => commands::site::delete(&ctx, &name).await,
        },
        Commands::Vm(cmd) => match cmd {
            VmCommands::List { json } => commands::vm::list(&ctx, owner, json).await,
            VmCommands::Show { name } => commands::vm::show(&ctx, &name).await,
            VmCommands::Create { name, vm } => commands::vm::create(&ctx, &name, vm, owner).await,
            VmCommands::Update { name, vm } => commands::vm::update(&ctx, &name, vm, owner).await,
            VmCommands::Delete { name } => commands::vm::delete(&ctx, &name).await,
        },
        Commands::Refresh { kind } => match kind {
            KindArg::Sites => commands::stack::refresh(&ctx, &stackport_cloud::SiteKind).await,
            KindArg::Vms => commands::stack::refresh(&ctx, ctx.vm_kind()).await,
        },
        Commands::Whoami => commands::stack::whoami(&ctx).await,
        Commands::Version => unreachable!("Version is handled before config loading"),
    }
}
