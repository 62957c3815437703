//! Build script for generating the `tier3` man pages.
//!
//! One page is rendered for the binary and one per subcommand
//! (`tier3-get.1`, `tier3-wait.1`, ...) into the build output directory.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(man: &Man, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(target, buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    for subcommand in command.get_subcommands() {
        let name = format!("tier3-{}", subcommand.get_name());
        let page = Man::new(subcommand.clone()).title(name.to_uppercase());
        render(&page, &out_dir.join(format!("{name}.1")))?;
    }
    render(&Man::new(command), &out_dir.join("tier3.1"))?;

    Ok(())
}
