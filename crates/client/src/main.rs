mod debug;
pub mod net;
mod tui;

use clap::Parser;

#[derive(Parser)]
#[command(name = "dual")]
#[command(about = "Dual game client")]
struct Args {
    #[arg(short, long)]
    server: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    tui::run(args.server)?;

    Ok(())
}
