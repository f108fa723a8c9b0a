//! Async line readers for backend output (non-UTF8-safe).
//!
//! Scientific Python stacks can emit non-UTF8 bytes on stdout/stderr
//! (progress bars, locale-dependent library output). `BufReader::lines()`
//! would kill the reader task on the first invalid byte, so lines are read
//! as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use timelens_core::LogStream;

/// Spawn a task reading `stream` line by line into `tx`.
///
/// Lines are sent in arrival order with their originating stream tag; the
/// task exits on EOF or read error, dropping its sender.
pub(crate) fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    origin: LogStream,
    tx: UnboundedSender<(LogStream, String)>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    let line = String::from_utf8_lossy(&buf).to_string();
                    if tx.send((origin, line)).is_err() {
                        break; // dispatcher gone
                    }
                }
                Err(e) => {
                    debug!(stream = origin.as_str(), error = %e, "line reader exiting on read error");
                    break;
                }
            }
        }

        debug!(stream = origin.as_str(), "line reader task exiting");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    #[cfg(unix)]
    async fn reads_lines_in_order_until_eof() {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("printf 'one\\ntwo\\nthree\\n'")
            .stdout(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_line_reader(child.stdout.take().unwrap(), LogStream::Stdout, tx);

        let mut lines = Vec::new();
        while let Some((origin, line)) = rx.recv().await {
            assert_eq!(origin, LogStream::Stdout);
            lines.push(line);
        }
        assert_eq!(lines, ["one", "two", "three"]);

        let _ = child.wait().await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn strips_carriage_returns() {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("printf 'dos line\\r\\n'")
            .stdout(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_line_reader(child.stdout.take().unwrap(), LogStream::Stdout, tx);

        let (_, line) = rx.recv().await.unwrap();
        assert_eq!(line, "dos line");

        let _ = child.wait().await;
    }
}
