use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use patch_scrub::{FilterConfig, Scrubber};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info};

#[derive(Parser)]
#[command(name = "patch-scrub")]
#[command(about = "Strip debug prints, new comments and stray blank lines from unified diffs")]
struct Cli {
    /// Diff to scrub, or `-` for stdin
    #[arg(short, long, default_value = "git.diff")]
    input: PathBuf,

    /// Write the scrubbed diff to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with filter settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug call name to drop; replaces the configured names (repeatable)
    #[arg(long = "call", value_name = "NAME")]
    calls: Vec<String>,

    /// Glob selecting files with C-style comments; replaces the configured globs (repeatable)
    #[arg(long = "c-like", value_name = "GLOB")]
    c_like: Vec<String>,

    /// Context lines kept around each remaining change
    #[arg(long, value_name = "N")]
    window: Option<usize>,

    /// Print a one-line summary of what was dropped to stderr
    #[arg(long)]
    stats: bool,

    /// Log more (-v for decisions, -vv for every line)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,

    /// Print the man page and exit
    #[arg(long, exclusive = true)]
    man: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    /// Config file values, then command-line overrides
    fn filter_config(&self) -> Result<FilterConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => FilterConfig::load(path)?,
            None => FilterConfig::default(),
        };

        if !self.calls.is_empty() {
            config.call_names = self.calls.clone();
        }
        if !self.c_like.is_empty() {
            config.c_like_globs = self.c_like.clone();
        }
        if let Some(window) = self.window {
            config.window = window;
        }

        Ok(config)
    }
}

fn read_input(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e).into())
}

fn write_output(path: Option<&Path>, diff: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut text = diff.to_string();
    if !text.is_empty() {
        text.push('\n');
    }

    match path {
        Some(path) => fs::write(path, text)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e).into()),
        None => Ok(io::stdout().lock().write_all(text.as_bytes())?),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "patch-scrub", &mut io::stdout());
        return Ok(());
    }
    if cli.man {
        clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_max_level(cli.log_level())
        .init();

    let config = cli.filter_config()?;
    debug!(?config, "filter configuration");
    let scrubber = Scrubber::new(&config)?;

    let input = read_input(&cli.input)?;
    let scrubbed = scrubber.scrub(&input)?;
    info!(
        diagnostics = scrubbed.report.diagnostics.len(),
        "scrubbed {}",
        cli.input.display()
    );

    write_output(cli.output.as_deref(), &scrubbed.diff)?;

    if cli.stats {
        eprintln!("{}", scrubbed.report);
    }

    Ok(())
}
