//! Reading size-prefixed frames off a stream.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest frame accepted from a peer.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

async fn read_frame<R>(reader: &mut R, min_size: usize) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let size = reader.read_i32().await?;
    if size < min_size as i32 || size as usize > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid frame size: {size}"),
        ));
    }
    let mut frame = BytesMut::zeroed(size as usize);
    reader.read_exact(&mut frame).await?;
    Ok(frame.freeze())
}

/// Read one request frame, returning its request-kind tag and the frame
/// without the size prefix.
pub async fn read_request<R>(reader: &mut R) -> io::Result<(i16, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let frame = read_frame(reader, 2).await?;
    let kind = i16::from_be_bytes([frame[0], frame[1]]);
    Ok((kind, frame))
}

/// Read one response frame without the size prefix.
pub async fn read_response<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    read_frame(reader, 4).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_request_kind() {
        let mut input: &[u8] = &[0, 0, 0, 4, 0, 3, 0, 0];
        let (kind, frame) = read_request(&mut input).await.unwrap();
        assert_eq!(kind, 3);
        assert_eq!(&frame[..], &[0, 3, 0, 0]);
    }

    #[tokio::test]
    async fn test_read_request_eof() {
        let mut input: &[u8] = &[];
        let err = read_request(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_request_short_body() {
        let mut input: &[u8] = &[0, 0, 0, 10, 0, 1];
        let err = read_request(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_request_rejects_bad_size() {
        let mut input: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let err = read_request(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
