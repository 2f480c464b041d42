//! Program image loader.
//!
//! Parses the assembler's `.o` text format: a header line (the program
//! name) followed by one line of whitespace-separated hex bytes. Raw
//! binary images are accepted as-is.

/// Parse a `.o` text image into program bytes.
///
/// The header line is optional — a file consisting only of hex bytes also
/// parses. Returns the program bytes.
pub fn parse_image(text: &str) -> Result<Vec<u8>, String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let first = match lines.next() {
        Some(l) => l,
        None => return Err("Empty image".into()),
    };

    // Prefer the byte line after the header; fall back to a headerless file.
    if let Some(second) = lines.next() {
        parse_byte_line(second)
    } else {
        parse_byte_line(first)
    }
}

/// Load an image into a ROM array; returns the number of bytes loaded.
pub fn load_image(text: &str, rom: &mut [u8]) -> Result<usize, String> {
    let bytes = parse_image(text)?;
    if bytes.len() > rom.len() {
        return Err(format!(
            "Image too large: {} bytes into {} of ROM",
            bytes.len(),
            rom.len()
        ));
    }
    rom[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

fn parse_byte_line(line: &str) -> Result<Vec<u8>, String> {
    line.split_whitespace()
        .map(|tok| {
            u8::from_str_radix(tok, 16).map_err(|_| format!("Invalid hex byte: {}", tok))
        })
        .collect()
}
