//! Output formatting for CLI operations.

use android_backup::{BackupInfo, Manifest, MemberInfo, WriteResult};
use serde_json::json;
use std::path::Path;

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a member listing
    fn format_list(&self, members: &[MemberInfo]) -> String;

    /// Formats backup information
    fn format_info(&self, info: &BackupInfo) -> String;

    /// Formats the result of an unpack
    fn format_unpack_result(&self, manifest: &Manifest, target: &Path, manifest_path: &Path) -> String;

    /// Formats the result of a pack
    fn format_pack_result(&self, result: &WriteResult, backup: &Path) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, members: &[MemberInfo]) -> String {
        let mut output = String::new();
        let mut total_size: u64 = 0;
        let mut file_count = 0;
        let mut dir_count = 0;

        for member in members {
            if member.is_dir() {
                dir_count += 1;
            } else {
                file_count += 1;
                total_size += member.size;
            }
            output.push_str(&member.listing_line());
            output.push('\n');
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} files, {} directories, {} total\n",
            file_count,
            dir_count,
            humanize_bytes(total_size)
        ));

        output
    }

    fn format_info(&self, info: &BackupInfo) -> String {
        let mut output = String::new();

        output.push_str("Backup Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Version:        {}\n", info.version));
        output.push_str(&format!("  Compression:    {}\n", info.compression));
        output.push_str(&format!("  Encryption:     {}\n", info.encryption));
        output.push_str(&format!(
            "  Total size:     {}\n",
            humanize_bytes(info.total_size)
        ));
        output.push_str(&format!(
            "  Payload size:   {}\n",
            humanize_bytes(info.data_size())
        ));
        output.push_str(&format!("  Data offset:    {}\n", info.data_offset));

        if let Some(enc) = &info.encryption_info {
            output.push_str(&format!("  KDF rounds:     {}\n", enc.rounds));
            output.push_str(&format!("  User salt:      {} bytes\n", enc.user_salt_size));
            output.push_str(&format!("  Master blob:    {} bytes\n", enc.master_blob_size));
        }

        output
    }

    fn format_unpack_result(&self, manifest: &Manifest, target: &Path, manifest_path: &Path) -> String {
        format!(
            "Extracted {} members ({}) to {}\nManifest written to {}\n",
            manifest.len(),
            humanize_bytes(manifest.total_size()),
            target.display(),
            manifest_path.display()
        )
    }

    fn format_pack_result(&self, result: &WriteResult, backup: &Path) -> String {
        format!(
            "Created {} with {} members ({} -> {})\nCompression ratio: {:.1}% (saved {:.1}%)\n",
            backup.display(),
            result.members_written,
            humanize_bytes(result.container_size),
            humanize_bytes(result.total_size),
            result.compression_ratio() * 100.0,
            result.space_savings() * 100.0
        )
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, members: &[MemberInfo]) -> String {
        serde_json::to_string_pretty(members).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_info(&self, info: &BackupInfo) -> String {
        serde_json::to_string_pretty(info).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_unpack_result(&self, manifest: &Manifest, target: &Path, manifest_path: &Path) -> String {
        let obj = json!({
            "success": true,
            "members_extracted": manifest.len(),
            "bytes_extracted": manifest.total_size(),
            "target_dir": target.display().to_string(),
            "manifest": manifest_path.display().to_string(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_pack_result(&self, result: &WriteResult, backup: &Path) -> String {
        let obj = json!({
            "success": true,
            "backup": backup.display().to_string(),
            "members_written": result.members_written,
            "container_size": result.container_size,
            "payload_size": result.payload_size,
            "total_size": result.total_size,
            "compression_ratio": result.compression_ratio(),
            "space_savings": result.space_savings(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
