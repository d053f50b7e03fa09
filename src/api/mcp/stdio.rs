//! Line-delimited JSON-RPC over stdin/stdout.
//!
//! Messages are handled strictly one after another; the next line is not read
//! until the current reply has been written.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::{
    protocol::{JsonRpcError, JsonRpcResponse, PARSE_ERROR},
    server::McpServer,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct StdioTransport {
    server: McpServer,
}

impl StdioTransport {
    pub fn new(server: McpServer) -> Self {
        Self { server }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<(), Error> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), Error>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(message = "Stdio transport started, waiting for input");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                info!(message = "Stdin closed, shutting down");
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(err) => {
                    warn!(message = "Discarding input line that is not UTF-8", %err);
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
                    );
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!(message = "Received message", input = %trimmed);

            if let Some(response) = self.server.handle_line(trimmed).await {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let mut output = serde_json::to_vec(response)?;
    output.push(b'\n');
    writer.write_all(&output).await?;
    writer.flush().await?;
    Ok(())
}
