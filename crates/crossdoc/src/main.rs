use clap::Parser;

use crossdoc::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crossdoc::init(cli.verbose);

    let report = cli::run(&cli)?;
    println!(
        "wrote {} pages to {}",
        report.pages.len(),
        report.out_dir.display()
    );
    for skipped in &report.skipped {
        println!("skipped {}: {}", skipped.file, skipped.reason);
    }
    Ok(())
}
