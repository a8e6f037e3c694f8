use clap::Parser;
use owo_colors::OwoColorize;

use relay_daemon::http_server::api::client::ApiClient;

mod cli;

use cli::op::{Op, OpContext};
use cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let ctx = OpContext {
        client: ApiClient::new(&args.remote)?,
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            std::process::exit(1);
        }
    }
}
