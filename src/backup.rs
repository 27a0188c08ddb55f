use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const ROSTER_ENTRY: &str = "roster/student_grades.csv";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-roster-v1";
pub const BARE_CSV_FORMAT: &str = "bare-csv";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_roster_bundle(roster_path: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if !roster_path.is_file() {
        return Err(anyhow!(
            "roster file not found: {}",
            roster_path.to_string_lossy()
        ));
    }
    let csv = std::fs::read(roster_path)
        .with_context(|| format!("failed to read roster {}", roster_path.to_string_lossy()))?;
    let digest = sha256_hex(&csv);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "sha256": digest,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(ROSTER_ENTRY, opts)
        .context("failed to start roster entry")?;
    zip.write_all(&csv).context("failed to write roster entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        sha256: digest,
    })
}

/// Restores a roster file from a bundle, or from a bare CSV copy when the
/// input is not a zip. `check` sees the extracted bytes first; the target is
/// replaced only after it accepts them and they are fully written.
pub fn import_roster_bundle<F>(
    in_path: &Path,
    roster_path: &Path,
    check: F,
) -> anyhow::Result<ImportSummary>
where
    F: FnOnce(&[u8]) -> anyhow::Result<()>,
{
    if let Some(parent) = roster_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let (bytes, detected) = if is_zip_file(in_path)? {
        (read_bundle(in_path)?, BUNDLE_FORMAT_V1)
    } else {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        (bytes, BARE_CSV_FORMAT)
    };
    check(&bytes).context("imported roster rejected")?;

    let tmp_dst = roster_path.with_extension("csv.importing");
    {
        let mut out = File::create(&tmp_dst).with_context(|| {
            format!("failed to create temp file {}", tmp_dst.to_string_lossy())
        })?;
        out.write_all(&bytes)
            .context("failed to write extracted roster")?;
        out.flush().context("failed to flush extracted roster")?;
    }
    std::fs::rename(&tmp_dst, roster_path).with_context(|| {
        format!(
            "failed to move extracted roster to {}",
            roster_path.to_string_lossy()
        )
    })?;

    Ok(ImportSummary {
        bundle_format_detected: detected.to_string(),
    })
}

fn read_bundle(in_path: &Path) -> anyhow::Result<Vec<u8>> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut bytes = Vec::new();
    archive
        .by_name(ROSTER_ENTRY)
        .context("bundle missing roster/student_grades.csv")?
        .read_to_end(&mut bytes)
        .context("failed to extract roster entry")?;

    if let Some(expected) = manifest.get("sha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!(
                "roster checksum mismatch: manifest {} but entry hashes to {}",
                expected,
                actual
            ));
        }
    }
    Ok(bytes)
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
