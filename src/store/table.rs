//! On-disk form of the watermark store: a CSV table, kept both as a plain
//! artifact and gzip-compressed. Only the compressed file is read back.

use anyhow::{anyhow, Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::WatermarkRecord;

pub const HEADER: [&str; 4] = [
    "feed_url",
    "saved_item_link_latest",
    "saved_item_link_second_latest",
    "updated_time",
];

pub fn read_compressed(path: &Path) -> Result<Vec<WatermarkRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(GzDecoder::new(file));

    let header = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    if header.iter().ne(HEADER) {
        return Err(anyhow!(
            "Unexpected columns in {}: {:?}",
            path.display(),
            header
        ));
    }

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.with_context(|| format!("Bad row {} in {}", i + 1, path.display()))
        })
        .collect()
}

/// Writes the plain CSV artifact, then its gzip-compressed copy at `path`.
/// Each file is written to a temporary sibling first and renamed into place.
pub fn write_compressed<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a WatermarkRecord>,
) -> Result<()> {
    let mut plain = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut plain);
        writer.write_record(HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }

    let artifact = artifact_path(path);
    replace_file(&artifact, |w| Ok(w.write_all(&plain)?))?;

    replace_file(path, |w| {
        let mut encoder = GzEncoder::new(w, Compression::default());
        encoder.write_all(&plain)?;
        encoder.finish()?;
        Ok(())
    })
}

/// `rss_database.csv.gz` keeps its plain copy at `rss_database.csv`; any other
/// name gets `.csv` appended.
pub fn artifact_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "gz") {
        path.with_extension("")
    } else {
        with_suffix(path, ".csv")
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn replace_file(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    let tmp = with_suffix(path, ".tmp");
    let file =
        File::create(&tmp).with_context(|| format!("Failed to create {}", tmp.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).with_context(|| format!("Failed to write {}", tmp.display()))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|f| f.sync_all())
        .with_context(|| format!("Failed to flush {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))
}
