use anyhow::Result;
use clap::Command;

use varwin::cli::{create_varwin_cli, handlers};

fn build_parser() -> Command {
    create_varwin_cli()
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    handlers::run_varwin(&matches)?;

    Ok(())
}
