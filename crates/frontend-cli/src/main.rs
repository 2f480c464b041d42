//! JRB16 emulator frontend.
//!
//! Headless runner: loads a program image, runs the machine for a bounded
//! number of clocks, feeds scripted input-port values, and prints every
//! output-port write as it happens.
//!
//! ```text
//! jrb16-emu program.o [options]
//!
//!   --cycles N        clock budget (default 1,000,000)
//!   --addr24          24-bit bus addressing mode
//!   --input a,b,c     values for the input port, consumed in order
//!   --save-state      write <program>.state after the run
//!   --load-state      restore <program>.state before the run
//!   --debug           per-instruction decode trace on stderr
//! ```

use jrb16_core::{image, savestate, Computer};
use std::env;
use std::fs;
use std::path::Path;
use std::process::exit;

fn usage() -> ! {
    eprintln!("Usage: jrb16-emu <program.o> [--cycles N] [--addr24] [--input a,b,c]");
    eprintln!("                 [--save-state] [--load-state] [--debug]");
    exit(2);
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut image_path: Option<String> = None;
    let mut cycles: u64 = 1_000_000;
    let mut addr24 = false;
    let mut inputs: Vec<u8> = Vec::new();
    let mut save_state = false;
    let mut load_state = false;
    let mut debug = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--cycles" => {
                i += 1;
                cycles = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| usage());
            }
            "--addr24" => addr24 = true,
            "--input" => {
                i += 1;
                let list = args.get(i).unwrap_or_else(|| usage());
                for tok in list.split(',') {
                    match tok.trim().parse::<u8>() {
                        Ok(v) => inputs.push(v),
                        Err(_) => {
                            eprintln!("Invalid input value: {}", tok);
                            exit(2);
                        }
                    }
                }
            }
            "--save-state" => save_state = true,
            "--load-state" => load_state = true,
            "--debug" => debug = true,
            "--help" | "-h" => usage(),
            arg if arg.starts_with("--") => {
                eprintln!("Unknown option: {}", arg);
                usage();
            }
            arg => {
                if image_path.is_some() {
                    usage();
                }
                image_path = Some(arg.to_string());
            }
        }
        i += 1;
    }

    let image_path = image_path.unwrap_or_else(|| usage());

    let raw = match fs::read(&image_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Cannot read {}: {}", image_path, e);
            exit(1);
        }
    };
    if raw.is_empty() {
        eprintln!("Empty image: {}", image_path);
        exit(1);
    }

    let mut computer = Computer::new();
    computer.set_addr24(addr24);
    computer.debug = debug;

    // `.o` text images first; anything else is taken as raw program bytes.
    let size = match std::str::from_utf8(&raw).ok().and_then(|t| image::parse_image(t).ok()) {
        Some(bytes) => {
            computer.load_program(&bytes);
            bytes.len()
        }
        None => {
            computer.load_program(&raw);
            raw.len()
        }
    };
    eprintln!("Loaded {} ({} bytes){}", image_path, size, if addr24 { ", 24-bit bus" } else { "" });

    let state_file = savestate::state_path(&image_path);
    if load_state {
        match savestate::load_from_file(Path::new(&state_file)) {
            Ok(s) => {
                computer.restore_state(s);
                eprintln!("Restored {}", state_file);
            }
            Err(e) => {
                eprintln!("Cannot restore {}: {}", state_file, e);
                exit(1);
            }
        }
    }

    for v in inputs {
        computer.push_input(v);
    }

    let mut printed = 0;
    while !computer.halted && computer.tick_count < cycles {
        computer.tick();
        while printed < computer.outputs.len() {
            println!("{}", computer.outputs[printed]);
            printed += 1;
        }
    }

    if computer.halted {
        eprintln!("Halted after {} cycles, {} output(s)", computer.tick_count, computer.outputs.len());
    } else {
        eprintln!(
            "Cycle budget exhausted ({} cycles) at pc=0x{:04X}",
            computer.tick_count, computer.pc
        );
    }

    if save_state {
        match savestate::save_to_file(&computer.save_state(), Path::new(&state_file)) {
            Ok(()) => eprintln!("Saved {}", state_file),
            Err(e) => {
                eprintln!("Cannot save {}: {}", state_file, e);
                exit(1);
            }
        }
    }
}
