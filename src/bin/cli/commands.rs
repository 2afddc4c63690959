//! Command implementations for the CLI tool.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use android_backup::{
    AndroidBackup, BackupWriter, CompressionKind, EncryptionKind, Manifest, ReadMode,
    ReadOptions, WriteOptions,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::password::{get_or_confirm_password, get_password};
use crate::progress::StageSpinner;

/// Configuration for the pack command.
pub struct PackConfig<'a> {
    pub backup_path: &'a Path,
    pub source_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub password: Option<String>,
    pub encrypt: bool,
    pub version: u32,
    pub compress: bool,
    pub level: u32,
    pub rounds: u32,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Configuration for the unpack command.
pub struct UnpackConfig<'a> {
    pub backup_path: &'a Path,
    pub target_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub password: Option<String>,
    pub list: bool,
    pub buffered: bool,
    pub preserve_permissions: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Pack command implementation
pub fn pack(config: &PackConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let source_dir = config
        .source_dir
        .clone()
        .unwrap_or_else(|| default_sibling(config.backup_path, "_unpacked"));
    let manifest_path = config
        .manifest
        .clone()
        .unwrap_or_else(|| default_sibling(config.backup_path, ".manifest.json"));

    if !source_dir.is_dir() {
        eprintln!("Error: source directory {} does not exist", source_dir.display());
        return ExitCode::BadArgs;
    }

    let manifest = if manifest_path.exists() {
        Manifest::load(&manifest_path)
    } else {
        if !config.quiet {
            eprintln!(
                "Warning: {} not found, packing directory contents in scan order",
                manifest_path.display()
            );
        }
        Manifest::scan(&source_dir)
    };
    let manifest = match manifest {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error reading manifest: {}", e);
            return error_to_exit_code(&e);
        }
    };

    let password = if config.encrypt {
        match get_or_confirm_password(config.password.clone()) {
            Some(p) => Some(p),
            None => {
                eprintln!("Error: encryption requested but no password given");
                return ExitCode::BadArgs;
            }
        }
    } else {
        if config.password.is_some() && !config.quiet {
            eprintln!("Warning: --password ignored without --encrypt");
        }
        None
    };

    let options = WriteOptions::new()
        .version(config.version)
        .compression(if config.compress {
            CompressionKind::Zlib
        } else {
            CompressionKind::None
        })
        .encryption(if config.encrypt {
            EncryptionKind::Aes256
        } else {
            EncryptionKind::None
        })
        .level(config.level)
        .rounds(config.rounds);
    let writer = BackupWriter::new(options);

    let spinner = StageSpinner::new(config.quiet || config.format == OutputFormat::Json);
    spinner.set_message(format!("Packing {} members...", manifest.len()));

    let file = match File::create(config.backup_path) {
        Ok(f) => f,
        Err(e) => {
            spinner.fail();
            eprintln!("Error creating {}: {}", config.backup_path.display(), e);
            return ExitCode::IoError;
        }
    };
    let mut out = BufWriter::new(file);

    let result = match writer.pack_dir(&mut out, &source_dir, &manifest, password.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            spinner.fail();
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };
    spinner.finish();

    if !config.quiet || config.format == OutputFormat::Json {
        print!("{}", formatter.format_pack_result(&result, config.backup_path));
    }

    ExitCode::Success
}

/// Unpack command implementation
pub fn unpack(config: &UnpackConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let options = ReadOptions::new()
        .mode(if config.buffered {
            ReadMode::Buffered
        } else {
            ReadMode::Streaming
        })
        .preserve_permissions(config.preserve_permissions);

    let mut backup = match open_backup(config.backup_path, options) {
        Ok(b) => b,
        Err(code) => return code,
    };

    let spinner = StageSpinner::new(config.quiet || config.format == OutputFormat::Json);
    let password = spinner.suspend(|| get_password(config.password.clone(), backup.is_encrypted()));
    if backup.is_encrypted() && password.is_none() {
        spinner.fail();
        eprintln!("Error: backup is encrypted and no password was given");
        return ExitCode::BadArgs;
    }

    if config.list {
        spinner.set_message("Reading members...");
        let members = match backup.members(password.as_ref()) {
            Ok(m) => m,
            Err(e) => {
                spinner.fail();
                eprintln!("Error: {}", e);
                return error_to_exit_code(&e);
            }
        };
        spinner.finish();
        print!("{}", formatter.format_list(&members));
        return ExitCode::Success;
    }

    let target_dir = config
        .target_dir
        .clone()
        .unwrap_or_else(|| default_sibling(config.backup_path, "_unpacked"));
    let manifest_path = config
        .manifest
        .clone()
        .unwrap_or_else(|| default_sibling(config.backup_path, ".manifest.json"));

    spinner.set_message(format!("Extracting to {}...", target_dir.display()));
    let manifest = match backup.extract_all(&target_dir, password.as_ref()) {
        Ok(m) => m,
        Err(e) => {
            spinner.fail();
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    if let Err(e) = manifest.save(&manifest_path) {
        spinner.fail();
        eprintln!("Error writing manifest {}: {}", manifest_path.display(), e);
        return error_to_exit_code(&e);
    }
    spinner.finish();

    if !config.quiet || config.format == OutputFormat::Json {
        print!(
            "{}",
            formatter.format_unpack_result(&manifest, &target_dir, &manifest_path)
        );
    }

    ExitCode::Success
}

/// Info command implementation
pub fn info(backup_path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let mut backup = match open_backup(backup_path, ReadOptions::default()) {
        Ok(b) => b,
        Err(code) => return code,
    };

    let info = match backup.info() {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    print!("{}", formatter.format_info(&info));

    ExitCode::Success
}

/// Helper to open a backup and report failures
fn open_backup(
    path: &Path,
    options: ReadOptions,
) -> Result<AndroidBackup<std::io::BufReader<File>>, ExitCode> {
    AndroidBackup::open_path_with(path, options).map_err(|e| {
        eprintln!("Error opening backup: {}", e);
        error_to_exit_code(&e)
    })
}

/// Builds `<basename(path)><suffix>` relative to the working directory
fn default_sibling(path: &Path, suffix: &str) -> PathBuf {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    PathBuf::from(format!("{base}{suffix}"))
}
