//! Save state (quick save / quick load) for the JRB16 machine.
//!
//! Captures the full machine state to a file using bincode serialization
//! with deflate compression. In-flight bus and ALU transactions are
//! transient and not captured; a restored machine resumes at an
//! instruction-fetch boundary.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "JRBS"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```
//!
//! The program image is not part of the state — ROM travels with the image
//! file, like the flash contents of any emulator savestate.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Magic bytes identifying a JRB16 save state file.
const MAGIC: &[u8; 4] = b"JRBS";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;

/// Flag register snapshot.
#[derive(Serialize, Deserialize)]
pub struct FlagsState {
    pub zero: bool,
    pub carry: bool,
    pub sign: bool,
    pub overflow: bool,
    pub flags_en: bool,
    pub carry_en: bool,
    pub sign_en: bool,
}

/// Full machine snapshot.
#[derive(Serialize, Deserialize)]
pub struct SaveState {
    pub regs: [u16; 4],
    pub pc: u16,
    pub mar: u16,
    pub ram_page: u8,
    pub flags: FlagsState,
    pub tick: u64,
    pub halted: bool,
    pub addr24: bool,
    pub out_port: u8,
    pub outputs: Vec<u8>,
    pub ram: Vec<u8>,
}

/// Save state to file with header and deflate compression.
pub fn save_to_file(state: &SaveState, path: &Path) -> Result<(), String> {
    let payload = bincode::serialize(state).map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);

    std::fs::write(path, &out).map_err(|e| format!("Write error: {}", e))
}

/// Load state from file, verifying magic and version.
pub fn load_from_file(path: &Path) -> Result<SaveState, String> {
    let data = std::fs::read(path).map_err(|e| format!("Read error: {}", e))?;

    if data.len() < 8 {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid save state file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!(
            "Unsupported save state version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[8..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    bincode::deserialize(&decompressed).map_err(|e| format!("Deserialize error: {}", e))
}

/// Derive save state file path from an image file path.
/// `program.o` → `program.state`
pub fn state_path(image_path: &str) -> String {
    let p = Path::new(image_path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("program");
    let dir = p.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}.state", stem)).to_string_lossy().into_owned()
}
