use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads `reader` to the end, keeping at most `cap` bytes.
///
/// Bytes past the cap are drained and dropped so the writer never blocks on
/// a full pipe. The flag reports whether anything was dropped.
pub async fn read_capped<R>(mut reader: R, cap: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(buf.len());
        if n > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((buf, truncated))
}
