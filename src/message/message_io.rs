use crate::{
    constants::MESSAGE_HEADER_SIZE,
    message::{Message, MessageCodec, MessageDecodeError, MessageIoError},
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one complete message from `reader`.
///
/// Returns `Ok(None)` if the stream ended before the first header byte
/// arrived (orderly close by the peer). Any later end of stream is reported
/// as [`MessageDecodeError::Truncated`].
///
/// The header is validated against `max_message_size` before any segment
/// buffer is allocated. Segments are always read in the order error, data,
/// extension; extension bytes are drained and dropped.
pub async fn read_message<R>(
    reader: &mut R,
    max_message_size: usize,
) -> Result<Option<Message>, MessageIoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_buf = [0u8; MESSAGE_HEADER_SIZE];
    let mut filled = 0;
    while filled < MESSAGE_HEADER_SIZE {
        let n = reader.read(&mut header_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(MessageDecodeError::Truncated.into());
        }
        filled += n;
    }

    let header = MessageCodec::decode_header(&header_buf)?;
    let (error_len, data_len, extension_len) =
        MessageCodec::validate_header(&header, max_message_size)?;

    tracing::trace!(
        "Reading message: state={:#x} err={} data={} ext={}",
        header.state,
        error_len,
        data_len,
        extension_len
    );

    let error = read_segment(reader, error_len).await?;
    let data = read_segment(reader, data_len).await?;
    discard_segment(reader, extension_len).await?;

    Ok(Some(Message {
        state: header.state,
        error,
        data,
    }))
}

/// Encodes `message` and writes it as one logical unit, then flushes.
pub async fn write_message<W>(
    writer: &mut W,
    message: &Message,
    max_message_size: usize,
) -> Result<(), MessageIoError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = MessageCodec::encode(message, max_message_size)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_segment<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, MessageIoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; len];
    if len == 0 {
        return Ok(buf);
    }
    match reader.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(MessageDecodeError::Truncated.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn discard_segment<R>(reader: &mut R, len: usize) -> Result<(), MessageIoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if len == 0 {
        return Ok(());
    }
    let mut limited = reader.take(len as u64);
    let drained = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
    if drained < len as u64 {
        return Err(MessageDecodeError::Truncated.into());
    }
    Ok(())
}
