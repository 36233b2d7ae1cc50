use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use iconpatch::commands::{self, apply::Selection};
use iconpatch_core::icon::Role;
use iconpatch_core::patch::{PatchOptions, PatchOutcome, PatchSummary};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "iconpatch")]
#[command(about = "Replace the tray, window and notification icons of an Electron chat client")]
#[command(version)]
struct Cli {
    /// More log output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the client's icons
    Apply {
        /// Client install directory, or the app.asar itself
        install: PathBuf,
        /// Icon pack directory (tray.png, window.svg, notification.png, ...)
        #[arg(long)]
        pack: Option<PathBuf>,
        /// Tray icon image
        #[arg(long)]
        tray: Option<PathBuf>,
        /// Window and taskbar icon image
        #[arg(long)]
        window: Option<PathBuf>,
        /// Notification badge image
        #[arg(long)]
        notification: Option<PathBuf>,
        /// Only patch these roles. Repeat for multiple.
        #[arg(long = "only", value_name = "ROLE")]
        only: Vec<Role>,
        /// Target table to use instead of the built-in one
        #[arg(long)]
        targets: Option<PathBuf>,
        /// Show what would change without writing anything
        #[arg(long, short = 'n')]
        dry_run: bool,
    },
    /// Show whether the client is patched
    Status {
        /// Client install directory, or the app.asar itself
        install: PathBuf,
    },
    /// Put back the client's original icons
    Restore {
        /// Client install directory, or the app.asar itself
        install: PathBuf,
        /// Show what would change without writing anything
        #[arg(long, short = 'n')]
        dry_run: bool,
    },
    /// List the icon files a target table replaces
    List {
        /// Target table to use instead of the built-in one
        #[arg(long)]
        targets: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Apply {
            install,
            pack,
            tray,
            window,
            notification,
            only,
            targets,
            dry_run,
        } => {
            let custom = [(Role::Tray, tray), (Role::Window, window), (Role::Notification, notification)]
                .into_iter()
                .filter_map(|(role, path)| path.map(|p| (role, p)))
                .collect();
            let selection = Selection { pack, custom };
            if selection.is_empty() {
                eprintln!("Error: choose an icon pack (--pack) or at least one image (--tray, --window, --notification)");
                process::exit(2);
            }

            let options = PatchOptions { dry_run, roles: only };
            commands::apply::run(&install, &selection, targets.as_deref(), options).map(|outcome| match outcome {
                PatchOutcome::Patched(summary) => {
                    print_summary(&summary);
                    println!("Patched {}", summary.archive.display());
                }
                PatchOutcome::DryRun(summary) => {
                    print_summary(&summary);
                    println!("Dry run: {} left unchanged", summary.archive.display());
                }
                PatchOutcome::AlreadyPatched { archive, .. } => {
                    println!("{} is already patched with these icons", archive.display());
                }
            })
        }
        Commands::Status { install } => commands::status::run(&install).map(|status| {
            for line in commands::status::report(&status) {
                println!("{}", line);
            }
        }),
        Commands::Restore { install, dry_run } => commands::restore::run(&install, dry_run).map(|summary| {
            print_summary(&summary);
            if dry_run {
                println!("Dry run: {} left unchanged", summary.archive.display());
            } else {
                println!("Restored original icons in {}", summary.archive.display());
            }
        }),
        Commands::List { targets } => commands::list::run(targets.as_deref()).map(|lines| {
            for line in lines {
                println!("{}", line);
            }
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(commands::exit_code(&e));
    }
}

fn print_summary(summary: &PatchSummary) {
    for path in &summary.replaced {
        println!("Replace: {}", path);
    }
    for path in &summary.restored {
        println!("Restore: {}", path);
    }
}
