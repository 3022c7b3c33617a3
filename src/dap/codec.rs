//! DAP wire protocol codec
//!
//! Every message is an HTTP-style header block followed by a JSON body:
//! ```text
//! Content-Length: <byte-length>\r\n
//! \r\n
//! <JSON body>
//! ```

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Upper bound on a single message body
const MAX_BODY_LEN: usize = 100 * 1024 * 1024;

fn eof_as_crash(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::AdapterCrashed
    } else {
        Error::Io(e)
    }
}

/// Read one DAP message body from the stream
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, Error> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await.map_err(eof_as_crash)?;

        if bytes_read == 0 {
            return Err(Error::AdapterCrashed);
        }

        if line == "\r\n" || line == "\n" {
            break;
        }

        // Content-Type and any other headers are ignored
        if let Some(value) = line.trim().strip_prefix("Content-Length:") {
            let value = value.trim();
            content_length = Some(value.parse().map_err(|_| {
                Error::DapProtocol(format!("Invalid Content-Length: {}", value))
            })?);
        }
    }

    let len = content_length
        .ok_or_else(|| Error::DapProtocol("Missing Content-Length header".to_string()))?;

    if len > MAX_BODY_LEN {
        return Err(Error::DapProtocol(format!(
            "Content-Length too large: {} bytes",
            len
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(eof_as_crash)?;

    String::from_utf8(body).map_err(|e| Error::DapProtocol(format!("Invalid UTF-8: {}", e)))
}

/// Write one DAP message, framing it with its byte length
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<(), Error> {
    let header = format!("Content-Length: {}\r\n\r\n", json.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_consecutive_messages() {
        let data = b"Content-Length: 13\r\n\r\n{\"test\":true}Content-Length: 2\r\nContent-Type: application/json\r\n\r\n{}";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_message(&mut reader).await.unwrap(), "{\"test\":true}");
        assert_eq!(read_message(&mut reader).await.unwrap(), "{}");
        assert!(matches!(
            read_message(&mut reader).await,
            Err(Error::AdapterCrashed)
        ));
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let data = b"Content-Type: application/json\r\n\r\n{}";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert!(matches!(
            read_message(&mut reader).await,
            Err(Error::DapProtocol(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_body_is_crash() {
        let data = b"Content-Length: 40\r\n\r\n{\"seq\":1}";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert!(matches!(
            read_message(&mut reader).await,
            Err(Error::AdapterCrashed)
        ));
    }

    #[tokio::test]
    async fn test_write_counts_bytes_not_chars() {
        let mut output = Vec::new();
        write_message(&mut output, "{\"s\":\"é\"}").await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Content-Length: 10\r\n\r\n"));
    }
}
