//! JSON-lines block source.
//!
//! One [`RawBlock`] per line, in chain order. Blank lines are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use karscan_core::error::{ChainError, ChainResult};
use karscan_core::ports::{BlockSource, BlockStream, RawBlock};

/// Reads blocks from a JSON-lines dump.
pub struct JsonlBlockSource {
    path: PathBuf,
}

impl JsonlBlockSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode one line; `line_no` is 1-based for error messages.
fn parse_line(line: &str, line_no: usize) -> ChainResult<RawBlock> {
    serde_json::from_str(line).map_err(|e| ChainError::BlockDecodeError {
        position: format!("line {line_no}"),
        message: e.to_string(),
    })
}

#[async_trait]
impl BlockSource for JsonlBlockSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn blocks(&self) -> ChainResult<BlockStream> {
        let file = File::open(&self.path).await.map_err(|e| {
            ChainError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), "Block file opened");

        let lines = BufReader::new(file).lines();
        let blocks = stream::unfold((lines, 0usize), |(mut lines, mut line_no)| async move {
            loop {
                line_no += 1;
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let block = parse_line(&line, line_no);
                        return Some((block, (lines, line_no)));
                    }
                    Ok(None) => return None,
                    Err(e) => {
                        let err = ChainError::StreamError(format!("line {line_no}: {e}"));
                        return Some((Err(err), (lines, line_no)));
                    }
                }
            }
        });

        Ok(Box::pin(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use karscan_core::ports::Phase;
    use std::io::Write;

    const HASH: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    fn write_lines(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn block_line(number: u64) -> String {
        serde_json::json!({
            "number": number,
            "timestamp": 1_650_000_000_000u64,
            "extrinsics": [{
                "hash": HASH,
                "index": 0,
                "signer": "Alice",
                "module": "balances",
                "method": "transfer",
                "args": [{"name": "dest", "value": "Bob"}],
                "success": true,
                "events": []
            }],
            "events": [{
                "index": 0,
                "module": "currencies",
                "method": "Deposited",
                "data": [{"token": "KSM"}, "Bob", "500"],
                "phase": {"apply_extrinsic": 0},
                "extrinsic": {"hash": HASH, "success": true}
            }, {
                "index": 1,
                "module": "system",
                "method": "Remarked",
                "phase": "finalization"
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn reads_blocks_in_order() {
        let file = write_lines(&[block_line(1), String::new(), block_line(2)]);
        let source = JsonlBlockSource::new(file.path());

        let blocks: Vec<_> = source.blocks().await.unwrap().collect().await;

        assert_eq!(blocks.len(), 2);
        let first = blocks[0].as_ref().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.extrinsics[0].args[0].name, "dest");
        assert_eq!(first.events[0].phase, Phase::ApplyExtrinsic(0));
        assert_eq!(first.events[1].phase, Phase::Finalization);
        assert!(first.events[1].extrinsic.is_none());
        assert_eq!(blocks[1].as_ref().unwrap().number, 2);
    }

    #[tokio::test]
    async fn bad_line_reports_position() {
        let file = write_lines(&[block_line(1), "{\"number\": ".into()]);
        let source = JsonlBlockSource::new(file.path());

        let blocks: Vec<_> = source.blocks().await.unwrap().collect().await;

        assert!(blocks[0].is_ok());
        match &blocks[1] {
            Err(ChainError::BlockDecodeError { position, .. }) => assert_eq!(position, "line 2"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_tx_hash_is_rejected() {
        let line = block_line(1).replace(HASH, "0x1234");
        let file = write_lines(&[line]);
        let source = JsonlBlockSource::new(file.path());

        let blocks: Vec<_> = source.blocks().await.unwrap().collect().await;
        assert!(blocks[0].is_err());
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = JsonlBlockSource::new("/nonexistent/blocks.jsonl");
        assert!(matches!(
            source.blocks().await,
            Err(ChainError::SourceUnavailable(_))
        ));
    }
}
