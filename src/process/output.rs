//! Child output forwarding.
//!
//! Output is decoded one byte per character (Latin-1). A read may end in the
//! middle of a multi-byte UTF-8 sequence; single-byte decoding never fails on
//! such a chunk boundary.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Shared destination for forwarded output.
pub type OutputSink = Arc<Mutex<dyn Write + Send>>;

/// The supervisor's own standard output.
pub fn stdout_sink() -> OutputSink {
    Arc::new(Mutex::new(std::io::stdout()))
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Copy `reader` into `sink` until EOF, a read error, or abort.
pub(super) fn spawn_forwarder<R>(stream: &'static str, mut reader: R, sink: OutputSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    crate::debug!("server"; "{} closed: {}", stream, e);
                    break;
                }
            };

            let text = decode_latin1(&buf[..n]);
            let mut out = sink.lock();
            if out.write_all(text.as_bytes()).and_then(|()| out.flush()).is_err() {
                break;
            }
        }
    })
}
