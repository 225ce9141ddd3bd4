//! Filesystem helpers shared by the datapack store, version ledger and
//! local image storage.

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Write `data` to `path` so that readers see either the old file or the
/// complete new one, never a partial write.
///
/// The bytes land in a uniquely named sibling file which is flushed to disk
/// and then renamed over the target.
pub async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp_name = format!(".{}.{}.tmp", file_name, Uuid::new_v4());
    let tmp_path = match dir {
        Some(dir) => dir.join(tmp_name),
        None => tmp_name.into(),
    };

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }

    result
}
