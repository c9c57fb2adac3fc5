// SPDX-License-Identifier: MIT

//! hidrawctl: inspect hidraw devices, decode their HID report
//! descriptors and exchange reports with them.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use hidrawctl::hidraw::Device;
use hidrawctl::ReportDescriptor;

#[derive(Parser, Debug)]
#[command(name = "hidrawctl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print device metadata and the raw report descriptor
    Dump {
        /// Path to the hidraw device node, e.g. /dev/hidraw0
        device: PathBuf,
        /// Write to this file instead of stdout; an existing directory
        /// gets a timestamped file inside
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode the report descriptor into the annotated HID listing
    #[command(name = "dumphid")]
    DumpHid {
        /// Path to the hidraw device node
        device: PathBuf,
        /// Print the parsed collection/field tree instead
        #[arg(long)]
        tree: bool,
        /// Write to this file instead of stdout; an existing directory
        /// gets a timestamped file inside
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write an output report to the device
    Send {
        /// Path to the hidraw device node
        device: PathBuf,
        /// Report bytes, decimal or 0x-prefixed hex; the first byte is
        /// the Report ID on devices that use IDs
        #[arg(required = true, value_parser = parse_byte)]
        data: Vec<u8>,
    },
    /// Read one input report from the device
    Recv {
        /// Path to the hidraw device node
        device: PathBuf,
    },
    /// Fetch a feature report, sized from the report descriptor
    #[command(name = "feature-get")]
    FeatureGet {
        /// Path to the hidraw device node
        device: PathBuf,
        /// Report ID, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        report_id: u8,
    },
    /// Send a feature report
    #[command(name = "feature-set")]
    FeatureSet {
        /// Path to the hidraw device node
        device: PathBuf,
        /// Report ID, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        report_id: u8,
        /// Report payload bytes, decimal or 0x-prefixed hex
        #[arg(required = true, value_parser = parse_byte)]
        data: Vec<u8>,
    },
}

/// A byte argument, decimal or 0x-prefixed hex, at most 255.
fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    let value = parsed.map_err(|_| format!("invalid byte value '{s}'"))?;
    u8::try_from(value).map_err(|_| format!("byte value '{s}' exceeds 255"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders the per-command usage block itself
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Dump { device, output } => {
            let dev = Device::open(&device)?;
            let desc = dev.report_descriptor()?;
            let mut text = String::new();
            writeln!(text, "Device: {}", device.display())?;
            writeln!(text, "Name: {}", dev.name()?)?;
            writeln!(text, "Phys: {}", dev.phys()?)?;
            writeln!(text, "Info: {}", dev.info()?)?;
            writeln!(text, "Report descriptor ({} bytes):", desc.len())?;
            text.push_str(&hexdump(&desc));
            emit(&text, output.as_deref())
        }
        Command::DumpHid {
            device,
            tree,
            output,
        } => {
            let dev = Device::open(&device)?;
            let rdesc = ReportDescriptor::parse(&dev.report_descriptor()?);
            let text = if tree {
                rdesc.dump_tree()
            } else {
                rdesc.to_string()
            };
            emit(&text, output.as_deref())
        }
        Command::Send { device, data } => {
            let mut dev = Device::open(&device)?;
            let n = dev.write_report(&data)?;
            println!("Wrote {n} bytes");
            Ok(())
        }
        Command::Recv { device } => {
            let mut dev = Device::open(&device)?;
            let mut buf = vec![0u8; 4096];
            let n = dev.read_report(&mut buf)?;
            print!("{}", hexdump(&buf[..n]));
            Ok(())
        }
        Command::FeatureGet { device, report_id } => {
            let dev = Device::open(&device)?;
            let rdesc = ReportDescriptor::parse(&dev.report_descriptor()?);
            let mut buf = vec![0u8; rdesc.feature_report_size(report_id)?];
            buf[0] = report_id;
            let n = dev.feature_get(&mut buf)?;
            print!("{}", hexdump(&buf[..n]));
            Ok(())
        }
        Command::FeatureSet {
            device,
            report_id,
            data,
        } => {
            let dev = Device::open(&device)?;
            let mut buf = Vec::with_capacity(data.len() + 1);
            buf.push(report_id);
            buf.extend_from_slice(&data);
            let n = dev.feature_set(&buf)?;
            println!("Wrote {n} bytes");
            Ok(())
        }
    }
}

/// Write `text` to stdout, to the given file, or to a timestamped file
/// inside the given directory.
fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        print!("{text}");
        return Ok(());
    };
    let path = if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        path.join(format!("{stamp}_hid.txt"))
    } else {
        path.to_path_buf()
    };
    fs::write(&path, text).with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("Saved to {}", path.display());
    Ok(())
}

/// Conventional hex dump: offset column, 16 bytes per line, ASCII gutter.
fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", i * 16);
        for col in 0..16 {
            match chunk.get(col) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
            if col == 7 {
                out.push(' ');
            }
        }
        out.push(' ');
        for &b in chunk {
            out.push(if (0x20..0x7f).contains(&b) {
                b as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}
