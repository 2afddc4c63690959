//! CLI tool for Android backup operations.

mod commands;
mod exit_codes;
mod output;
mod password;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Unpack and repack Android backup (.ab) archives
#[derive(Parser)]
#[command(name = "android-backup")]
#[command(author, version, about = "Unpack and repack Android backup (.ab) archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory into a backup
    Pack {
        /// Backup file to create
        out: PathBuf,

        /// Directory holding the members [default: <OUT>_unpacked]
        #[arg(short = 's', long)]
        source_dir: Option<PathBuf>,

        /// Member manifest [default: <OUT>.manifest.json]
        #[arg(short = 'm', long)]
        manifest: Option<PathBuf>,

        /// Encryption password, used with --encrypt
        #[arg(short = 'p', long, env = "ANDROID_BACKUP_PASSWORD")]
        password: Option<String>,

        /// Encrypt the backup, prompting for a password if none is given
        #[arg(short = 'e', long)]
        encrypt: bool,

        /// Format version written to the header
        #[arg(long, default_value = "3")]
        backup_version: u32,

        /// Store the container without zlib compression
        #[arg(long)]
        no_compress: bool,

        /// Compression level (0-9)
        #[arg(short = 'l', long, default_value = "6")]
        level: u32,

        /// PBKDF2 rounds for the key envelope
        #[arg(long, default_value = "10000")]
        rounds: u32,
    },

    /// Unpack or list a backup (alias: x)
    #[command(alias = "x")]
    Unpack {
        /// Backup file to read
        input: PathBuf,

        /// Target directory [default: <IN>_unpacked]
        #[arg(short = 't', long)]
        target_dir: Option<PathBuf>,

        /// Manifest to write [default: <IN>.manifest.json]
        #[arg(short = 'm', long)]
        manifest: Option<PathBuf>,

        /// Password (will prompt if needed and not provided)
        #[arg(short = 'p', long, env = "ANDROID_BACKUP_PASSWORD")]
        password: Option<String>,

        /// List members instead of extracting
        #[arg(short = 'l', long)]
        list: bool,

        /// Decode the payload into memory once instead of streaming it twice
        #[arg(long)]
        buffered: bool,

        /// Restore permission bits from the archive
        #[arg(long)]
        preserve_permissions: bool,
    },

    /// Show backup header information (alias: i)
    #[command(alias = "i")]
    Info {
        /// Backup file to inspect
        input: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Pack {
            out,
            source_dir,
            manifest,
            password,
            encrypt,
            backup_version,
            no_compress,
            level,
            rounds,
        } => commands::pack(&commands::PackConfig {
            backup_path: &out,
            source_dir,
            manifest,
            password,
            encrypt,
            version: backup_version,
            compress: !no_compress,
            level,
            rounds,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Unpack {
            input,
            target_dir,
            manifest,
            password,
            list,
            buffered,
            preserve_permissions,
        } => commands::unpack(&commands::UnpackConfig {
            backup_path: &input,
            target_dir,
            manifest,
            password,
            list,
            buffered,
            preserve_permissions,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Info { input } => commands::info(&input, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
