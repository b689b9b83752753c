use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use semdex_core::error::{Error, Result};
use semdex_core::types::IndexMetadata;

pub const METADATA_FILE: &str = "metadata.json";

pub fn write_metadata(path: &Path, metadata: &IndexMetadata) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, metadata)?;
    writer.flush()?;
    Ok(())
}

pub fn read_metadata(path: &Path) -> Result<IndexMetadata> {
    if !path.exists() {
        return Err(Error::MetadataNotFound(path.to_path_buf()));
    }
    let unreadable = |reason: String| Error::MetadataUnreadable { path: path.to_path_buf(), reason };
    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))
}
