use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use stackbuild_core::RunnerError;

pub fn pump_stdout<R>(rd: R, echo_prefix: Option<String>) -> JoinHandle<Result<String, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, tokio::io::stdout(), "stdout", echo_prefix)
}

pub fn pump_stderr<R>(rd: R, echo_prefix: Option<String>) -> JoinHandle<Result<String, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, tokio::io::stderr(), "stderr", echo_prefix)
}

/// Drains `rd` to completion, echoing each complete line as `[prefix] line`
/// when a prefix is set. Returns everything read, lossily decoded.
fn pump<R, W>(
    mut rd: R,
    mut wr: W,
    label: &'static str,
    echo_prefix: Option<String>,
) -> JoinHandle<Result<String, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let io_err = |source: std::io::Error| RunnerError::StreamIo {
            stream: label,
            source,
        };
        let mut buf = vec![0u8; 16 * 1024];
        let mut captured: Vec<u8> = Vec::new();
        let mut line_buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            let n = rd.read(&mut buf).await.map_err(io_err)?;
            if n == 0 {
                break;
            }
            captured.extend_from_slice(&buf[..n]);

            let Some(prefix) = echo_prefix.as_deref() else {
                continue;
            };
            line_buf.extend_from_slice(&buf[..n]);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let mut one = line_buf.drain(..=pos).collect::<Vec<u8>>();
                trim_newline(&mut one);
                echo(&mut wr, prefix, &one).await.map_err(io_err)?;
            }
        }

        // Last line without a trailing newline.
        if let Some(prefix) = echo_prefix.as_deref() {
            trim_newline(&mut line_buf);
            if !line_buf.is_empty() {
                echo(&mut wr, prefix, &line_buf).await.map_err(io_err)?;
            }
        }
        wr.flush().await.map_err(io_err)?;

        Ok(String::from_utf8_lossy(&captured).into_owned())
    })
}

async fn echo<W>(wr: &mut W, prefix: &str, line: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let text = format!("[{}] {}\n", prefix, String::from_utf8_lossy(line));
    wr.write_all(text.as_bytes()).await
}

fn trim_newline(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}
