use std::io::{self, Write};

/// Writes help and rendered output. A reader that closes the pipe early
/// (`precato claims list | head`) is not an error.
pub fn write_stdout_text(text: &str) -> io::Result<()> {
    write_all_tolerant(&[text.as_bytes()])
}

pub fn write_stdout_line(text: &str) -> io::Result<()> {
    write_all_tolerant(&[text.as_bytes(), b"\n"])
}

fn write_all_tolerant(chunks: &[&[u8]]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    let written = chunks
        .iter()
        .try_for_each(|chunk| stdout.write_all(chunk))
        .and_then(|()| stdout.flush());
    match written {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
