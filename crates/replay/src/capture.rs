use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tabmask::ClientPacket;

const MAX_FRAME: usize = 1 << 20;

/// Writes packets as `u32` little-endian length prefixed rkyv frames.
pub fn write_frames(path: &Path, packets: &[ClientPacket]) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("failed to create capture {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;

    for packet in packets {
        let bytes = packet.serialize()?;
        let len = u32::try_from(bytes.len()).context("frame too large")?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&bytes)?;
        written += 4 + bytes.len();
    }
    writer.flush()?;
    Ok(written)
}

pub fn read_frames(path: &Path) -> Result<Vec<ClientPacket>> {
    let file =
        File::open(path).with_context(|| format!("failed to open capture {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut packets = Vec::new();
    let mut header = [0u8; 4];

    loop {
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME {
            bail!("frame of {len} bytes exceeds limit");
        }
        let mut frame = vec![0u8; len];
        reader
            .read_exact(&mut frame)
            .context("capture ends inside a frame")?;
        packets.push(ClientPacket::deserialize(&frame)?);
    }
    Ok(packets)
}
