use std::io::{self, Read, Write};

use anyhow::{anyhow, Context, Result};
use denver_core::DenverError;

/// Streams one file to an `scp -t` sink: a `C<mode> <size> <name>` header,
/// the raw bytes, a zero byte, then waits for the sink's acknowledgement.
pub fn push_file<W, R, S>(
    sink: &mut W,
    acks: &mut R,
    source: &mut S,
    size: u64,
    mode: u32,
    remote_path: &str,
) -> Result<()>
where
    W: Write,
    R: Read,
    S: Read,
{
    let name = remote_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| anyhow!("remote path has no file name: '{remote_path}'"))?;

    writeln!(sink, "C{:04o} {size} {name}", mode & 0o7777).map_err(transport)?;
    let sent = io::copy(&mut (&mut *source).take(size), sink).map_err(transport)?;
    if sent != size {
        return Err(DenverError::Transport(format!(
            "short read while pushing '{name}': sent {sent} of {size} bytes"
        ))
        .into());
    }
    sink.write_all(&[0]).map_err(transport)?;
    sink.flush().map_err(transport)?;

    read_ack(acks).with_context(|| format!("failed to push {remote_path}"))
}

/// Reads one acknowledgement: `0` is success, `1` and `2` carry a message
/// terminated by a newline.
pub fn read_ack<R: Read>(acks: &mut R) -> Result<()> {
    let mut code = [0_u8; 1];
    acks.read_exact(&mut code).map_err(transport)?;
    if code[0] == 0 {
        return Ok(());
    }

    let mut message = Vec::new();
    let mut byte = [0_u8; 1];
    loop {
        match acks.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => message.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(transport(err)),
        }
    }

    let severity = if code[0] == 1 { "warning" } else { "error" };
    Err(DenverError::Transport(format!(
        "remote copy {severity}: {}",
        String::from_utf8_lossy(&message).trim()
    ))
    .into())
}

fn transport(err: io::Error) -> anyhow::Error {
    DenverError::Transport(format!("remote copy stream failed: {err}")).into()
}
