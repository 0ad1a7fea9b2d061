//! Line-per-identifier input source.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::domain::models::Identifier;
use crate::services::worker_pool::IdentifierSender;

/// Feed identifiers from `path` (`-` for stdin) into the worker queue.
///
/// Returns the number of identifiers queued.
pub async fn feed_identifiers(path: &Path, sender: &IdentifierSender) -> Result<u64> {
    if path == Path::new("-") {
        return feed_from_reader(BufReader::new(tokio::io::stdin()), sender).await;
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    let count = feed_from_reader(BufReader::new(file), sender).await?;

    info!(path = %path.display(), count, "input file queued");
    Ok(count)
}

/// Feed one identifier per line from `reader`; blank lines are skipped.
pub async fn feed_from_reader<R>(reader: R, sender: &IdentifierSender) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut count = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let id = line.trim();
        if id.is_empty() {
            warn!(line = line_no, "blank identifier, skipping");
            continue;
        }

        sender
            .send(Identifier::new(id))
            .await
            .context("Worker queue closed while feeding identifiers")?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::worker_pool::identifier_queue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_feed_skips_blank_lines() {
        let (tx, queue) = identifier_queue(10);
        let input = b"u1\n\n  u2  \r\nu3" as &[u8];

        let count = feed_from_reader(input, &tx).await.unwrap();
        drop(tx);

        assert_eq!(count, 3);
        let mut got = Vec::new();
        while let Some(id) = queue.recv().await {
            got.push(id.to_string());
        }
        assert_eq!(got, vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn test_feed_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a\nb").unwrap();
        file.flush().unwrap();

        let (tx, _queue) = identifier_queue(10);
        assert_eq!(feed_identifiers(file.path(), &tx).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let (tx, _queue) = identifier_queue(1);
        assert!(feed_identifiers(Path::new("/nonexistent/ids.txt"), &tx).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_is_an_error() {
        let (tx, queue) = identifier_queue(1);
        drop(queue);

        assert!(feed_from_reader(b"a\n" as &[u8], &tx).await.is_err());
    }
}
