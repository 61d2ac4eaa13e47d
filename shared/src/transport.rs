//! Length-prefixed framing for carrying packets over a byte stream.
//!
//! Each frame is a little-endian `u32` byte count followed by that many
//! bytes. The framing belongs to the transport; the packet codec never sees
//! the length prefix.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame. A full snapshot of a few hundred players
/// is well under this.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed by peer")]
    Closed,

    #[error("frame of {0} bytes exceeds the frame size limit")]
    TooLarge(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }

    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(FrameError::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_write_frame_prefixes_length() {
        let mut mock = Builder::new().write(&framed(&[1, 0, 7, 0, 0, 0])).build();
        tokio_test::block_on(write_frame(&mut mock, &[1, 0, 7, 0, 0, 0])).unwrap();
    }

    #[test]
    fn test_read_frames_in_order() {
        let mut mock = Builder::new()
            .read(&framed(b"first"))
            .read(&framed(b""))
            .read(&framed(b"third"))
            .build();

        tokio_test::block_on(async {
            assert_eq!(read_frame(&mut mock).await.unwrap(), b"first");
            assert!(read_frame(&mut mock).await.unwrap().is_empty());
            assert_eq!(read_frame(&mut mock).await.unwrap(), b"third");
            assert!(matches!(
                read_frame(&mut mock).await,
                Err(FrameError::Closed)
            ));
        });
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        let mut mock = Builder::new().read(&len).build();

        let result = tokio_test::block_on(read_frame(&mut mock));
        assert!(matches!(result, Err(FrameError::TooLarge(n)) if n == MAX_FRAME_LEN + 1));
    }

    #[test]
    fn test_oversized_payload_not_written() {
        let mut mock = Builder::new().build();
        let payload = vec![0u8; MAX_FRAME_LEN + 1];

        let result = tokio_test::block_on(write_frame(&mut mock, &payload));
        assert!(matches!(result, Err(FrameError::TooLarge(_))));
    }
}
