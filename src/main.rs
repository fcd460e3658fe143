use clap::Parser;
use tns_cli_lib::commands::{self, Cli};

fn main() {
  let cli = Cli::parse();
  let use_color = !cli.global.no_color;

  match commands::run(cli) {
    Ok(()) => std::process::exit(0),
    Err(e) => {
      log::debug!("exiting with code {}", e.exit_code());
      e.print(use_color);
      std::process::exit(e.exit_code());
    }
  }
}
