use clap::Parser;
use url::Url;

pub mod op;
pub mod ops;

crate::command_enum! {
    (Daemon, ops::Daemon),
    (Ls, ops::Ls),
    (Upload, ops::Upload),
    (Cancel, ops::Cancel),
    (Rm, ops::Rm),
    (Health, ops::Health),
    (Version, ops::Version),
}

#[derive(Parser, Debug)]
#[command(name = "relay", version, about = "Relay local files to a quota-managed remote drive")]
pub struct Args {
    /// Address of the daemon the client commands talk to
    #[arg(
        long,
        global = true,
        env = "RELAY_REMOTE",
        default_value = "http://127.0.0.1:8080"
    )]
    pub remote: Url,

    #[command(subcommand)]
    pub command: Command,
}
