use clap::{Parser, Subcommand};
use mdsite::{build, config, logging, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Rebuild every page, ignoring the manifest
    #[arg(long)]
    force: bool,

    /// Render worker count (defaults to half the cores minus one)
    #[arg(long, value_name = "N")]
    threads: Option<String>,

    /// Output directory (overrides output.path from mdsite.toml)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "mdsite")]
#[command(about = "Incremental static site builder for Markdown content")]
#[command(long_about = "\
Incremental static site builder for Markdown content

Every .md file under the content directory becomes an index.html page in the
output directory. Repeated builds only render pages whose sources changed.

Project structure:

  my-site/
  ├── mdsite.toml                  # Optional config
  ├── content/
  │   ├── index.md                 # → output/index.html
  │   ├── about.md                 # → output/about/index.html
  │   └── blog/
  │       └── index.md             # → output/blog/index.html
  └── static/                      # → output/static/

Change detection:
  mtime unchanged          skip without reading the file
  mtime moved, same bytes  skip, record the new mtime
  otherwise                render

Set MDSITE_LOG=mdsite=debug for diagnostics on stderr.
Run 'mdsite gen-config' to generate a documented mdsite.toml.")]
#[command(version)]
struct Cli {
    /// Project root containing mdsite.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render changed content into the output directory
    Build(BuildArgs),
    /// Print a stock mdsite.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => run_build(&cli.root, args),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            ExitCode::SUCCESS
        }
    }
}

fn run_build(root: &Path, args: BuildArgs) -> ExitCode {
    let site_config = match config::load_config(root) {
        Ok(site_config) => site_config,
        Err(err) => {
            eprintln!("{}", output::format_fatal(&err));
            return ExitCode::FAILURE;
        }
    };

    println!("{}", output::BANNER);
    println!();

    let options = build::BuildOptions {
        force: args.force,
        threads: args.threads,
        output_dir: args.output,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = build::build(root, &site_config, &options, Some(tx));
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }

    match result {
        Ok(report) => {
            output::print_build_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", output::format_fatal(&err));
            ExitCode::FAILURE
        }
    }
}
