//! Scripted server standing in for a live database, the connection phase is skipped.
use bytes::{BufMut, Bytes, BytesMut};
use myro::protocol::ColumnType;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

pub const OK: &[u8] = b"\x00\x00\x00\x02\x00\x00\x00";
pub const END: &[u8] = b"\xfe\x00\x00\x02\x00\x00\x00";

/// Spawn a server which answers the nth command with the nth list of packets.
///
/// Commands without response, like `COM_STMT_CLOSE`, take an empty list.
pub fn spawn(script: Vec<Vec<Bytes>>) -> DuplexStream {
    let (client, mut server) = tokio::io::duplex(4096);

    tokio::spawn(async move {
        for responses in script {
            let mut header = [0u8; 4];
            if server.read_exact(&mut header).await.is_err() {
                return;
            }

            let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
            let mut payload = vec![0; len];
            if server.read_exact(&mut payload).await.is_err() {
                return;
            }

            tracing::trace!(command = payload.first().copied(), "server received");

            let mut sequence = header[3].wrapping_add(1);
            for packet in responses {
                let mut buf = BytesMut::with_capacity(4 + packet.len());
                buf.put_uint_le(packet.len() as u64, 3);
                buf.put_u8(sequence);
                buf.put_slice(&packet);
                if server.write_all(&buf).await.is_err() {
                    return;
                }
                sequence = sequence.wrapping_add(1);
            }
        }
    });

    client
}

pub fn ok() -> Bytes {
    Bytes::from_static(OK)
}

pub fn end() -> Bytes {
    Bytes::from_static(END)
}

/// `OK` packet of a write.
pub fn affected(rows: u8, last_insert_id: u8) -> Bytes {
    Bytes::copy_from_slice(&[0x00, rows, last_insert_id, 0x02, 0x00, 0x00, 0x00])
}

pub fn column_count(count: u8) -> Bytes {
    Bytes::copy_from_slice(&[count])
}

fn lenenc_str(buf: &mut BytesMut, value: &str) {
    buf.put_u8(value.len() as u8);
    buf.put_slice(value.as_bytes());
}

pub fn column(name: &str, column_type: ColumnType) -> Bytes {
    let charset: u16 = match column_type.is_string() {
        true => 33,
        false => 63,
    };
    let mut buf = BytesMut::new();
    for value in ["def", "demo", "post", "post", name, name] {
        lenenc_str(&mut buf, value);
    }
    buf.put_u8(0x0c);
    buf.put_u16_le(charset);
    buf.put_u32_le(255);
    buf.put_u8(column_type as u8);
    buf.put_u16_le(0);
    buf.put_u8(0);
    buf.put_u16_le(0);
    buf.freeze()
}

pub fn text_row(values: &[Option<&str>]) -> Bytes {
    let mut buf = BytesMut::new();
    for value in values {
        match value {
            Some(value) => lenenc_str(&mut buf, value),
            None => buf.put_u8(0xFB),
        }
    }
    buf.freeze()
}

pub fn prepare_ok(id: u32, columns: u16, params: u16) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(0);
    buf.put_u32_le(id);
    buf.put_u16_le(columns);
    buf.put_u16_le(params);
    buf.put_u8(0);
    buf.put_u16_le(0);
    buf.freeze()
}

pub fn error(code: u16, message: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(0xFF);
    buf.put_u16_le(code);
    buf.put_slice(b"#42S02");
    buf.put_slice(message.as_bytes());
    buf.freeze()
}
