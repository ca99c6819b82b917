use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default chunk size for streamed copies, in bytes. Tunable, not a
/// correctness constant.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Stream `reader` into `writer` in fixed-size chunks until end of input.
/// Returns the number of bytes transferred. Neither side is ever read fully
/// into memory.
pub async fn stream_copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total: u64 = 0;

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read]).await?;
        total += read as u64;
    }

    writer.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_stream_copy_round_trip() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = Cursor::new(payload.clone());
        let mut writer = Vec::new();

        let copied = stream_copy(&mut reader, &mut writer, 1024).await.unwrap();

        assert_eq!(copied, payload.len() as u64);
        assert_eq!(writer, payload);
    }

    #[tokio::test]
    async fn test_stream_copy_empty_input() {
        let mut reader = Cursor::new(Vec::new());
        let mut writer = Vec::new();

        let copied = stream_copy(&mut reader, &mut writer, 1024).await.unwrap();

        assert_eq!(copied, 0);
        assert!(writer.is_empty());
    }

    #[tokio::test]
    async fn test_stream_copy_clamps_zero_chunk_size() {
        let mut reader = Cursor::new(b"abc".to_vec());
        let mut writer = Vec::new();

        let copied = stream_copy(&mut reader, &mut writer, 0).await.unwrap();

        assert_eq!(copied, 3);
        assert_eq!(writer, b"abc");
    }
}
