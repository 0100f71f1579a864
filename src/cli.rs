use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "beluga",
    about = "A terminal dashboard for small Kubernetes clusters and their nodes.",
    disable_version_flag = true
)]
pub struct CliArgs {
    /// Print version information and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

pub fn print_version() {
    println!("beluga - Kubernetes terminal dashboard");
    println!("  Version: {}", env!("CARGO_PKG_VERSION"));
}
