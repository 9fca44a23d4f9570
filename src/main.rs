use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_linewise::{ApplyOutcome, Config, LineStager, PatchOptions};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GIT_LINEWISE_LOG";

#[derive(Parser)]
#[command(name = "git-linewise")]
#[command(about = "Line-by-line git staging and custom patch building")]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, default_value = ".")]
    repo: PathBuf,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a file's diff with line indices usable in references
    Show {
        path: String,
        /// Show the staged diff instead of the working tree diff
        #[arg(long)]
        staged: bool,
        /// Start a selection at this line index
        #[arg(long)]
        select: Option<usize>,
        /// No colours, no line indices
        #[arg(long)]
        plain: bool,
    },
    /// Stage lines by reference (e.g., file.nix:4..6,9)
    Stage {
        /// File and line references (e.g., "flake.nix:5" or "flake.nix:4..9")
        #[arg(required = true)]
        file_refs: Vec<String>,
    },
    /// Unstage lines of the staged diff
    Unstage {
        #[arg(required = true)]
        file_refs: Vec<String>,
    },
    /// Discard lines from the working tree
    Discard {
        #[arg(required = true)]
        file_refs: Vec<String>,
    },
    /// Print the patch for referenced lines of a diff read from a file or stdin
    Extract {
        file_ref: String,
        /// Diff file; stdin when absent
        #[arg(long)]
        diff: Option<PathBuf>,
        #[arg(long)]
        reverse: bool,
        /// Keep the diff's own file header
        #[arg(long)]
        keep_header: bool,
    },
    /// Build a custom patch from lines changed between two refs
    Build {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(required = true)]
        file_refs: Vec<String>,
        #[arg(long)]
        reverse: bool,
        /// Apply the patch to the working tree
        #[arg(long)]
        apply: bool,
        #[arg(long)]
        plain: bool,
    },
    /// Edit the hunk containing a line in $EDITOR, then apply it
    EditHunk {
        path: String,
        index: usize,
        #[arg(long)]
        staged: bool,
    },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load(),
    };
    let stager = LineStager::new(&cli.repo, config);

    match cli.command {
        Commands::Show {
            path,
            staged,
            select,
            plain,
        } => {
            let rendered = stager.show(&path, staged, select, plain)?;
            if plain {
                println!("{rendered}");
            } else {
                for (idx, line) in rendered.lines().enumerate() {
                    println!("{idx:>4} {line}");
                }
            }
        }
        Commands::Stage { file_refs } => {
            for file_ref in &file_refs {
                report(file_ref, stager.stage(file_ref)?);
            }
        }
        Commands::Unstage { file_refs } => {
            for file_ref in &file_refs {
                report(file_ref, stager.unstage(file_ref)?);
            }
        }
        Commands::Discard { file_refs } => {
            for file_ref in &file_refs {
                report(file_ref, stager.discard(file_ref)?);
            }
        }
        Commands::Extract {
            file_ref,
            diff,
            reverse,
            keep_header,
        } => {
            let diff_text = match diff {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let options = PatchOptions::default()
                .reverse(reverse)
                .keep_original_header(keep_header);
            print!("{}", LineStager::extract(&diff_text, &file_ref, options)?);
        }
        Commands::Build {
            from,
            to,
            file_refs,
            reverse,
            apply,
            plain,
        } => {
            print!(
                "{}",
                stager.build(&from, &to, &file_refs, reverse, apply, plain)?
            );
        }
        Commands::EditHunk {
            path,
            index,
            staged,
        } => {
            report(&path, stager.edit_hunk(&path, index, staged)?);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "git-linewise",
                &mut std::io::stdout(),
            );
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `GIT_LINEWISE_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(what: &str, outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied => {}
        ApplyOutcome::NothingToApply => eprintln!("{what}: selection contains no changes"),
        ApplyOutcome::Inactive => eprintln!("{what}: nothing to select"),
    }
}
