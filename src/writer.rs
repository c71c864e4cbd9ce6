use crate::markdown::{Block, BlockKind, FileOutcome};
use anyhow::{Context, Result};
use log::{debug, info};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Counts of what ended up in a written document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub text_files: usize,
    pub binary_files: usize,
    pub failed_files: usize,
}

/// Writes assembled blocks to an async sink, yielding to the runtime after each one.
pub struct MarkdownWriter<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
    blocks_written: usize,
}

impl<W: AsyncWrite + Unpin> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            blocks_written: 0,
        }
    }

    pub async fn write_block(&mut self, block: &Block) -> Result<()> {
        if self.blocks_written > 0 {
            self.writer
                .write_all(b"\n\n")
                .await
                .context("Failed to write block separator")?;
        }

        let label = match &block.kind {
            BlockKind::Preamble => "preamble",
            BlockKind::File { path, .. } => path.as_str(),
        };
        self.writer
            .write_all(block.text.as_bytes())
            .await
            .with_context(|| format!("Failed to write block for {label}"))?;

        self.blocks_written += 1;
        Ok(())
    }

    /// Drains `blocks` into the sink and returns per-outcome counts.
    pub async fn write_document<I>(&mut self, blocks: I) -> Result<WriteSummary>
    where
        I: IntoIterator<Item = Block>,
    {
        let mut summary = WriteSummary::default();
        for block in blocks {
            self.write_block(&block).await?;
            if let BlockKind::File { path, outcome } = &block.kind {
                debug!("Finished: {path}");
                match outcome {
                    FileOutcome::Text => summary.text_files += 1,
                    FileOutcome::Binary => summary.binary_files += 1,
                    FileOutcome::ReadFailed(_) => summary.failed_files += 1,
                }
            }
            tokio::task::yield_now().await;
        }

        self.writer
            .write_all(b"\n")
            .await
            .context("Failed to write trailing newline")?;
        self.flush().await?;

        info!(
            "Wrote {} text files, skipped {} binary files, {} reads failed",
            summary.text_files, summary.binary_files, summary.failed_files
        );
        Ok(summary)
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.context("Failed to flush output")
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
