//! This is the main entry point for the FAT32 inspection tool.
//!
//! Usage:
//! - `main [-v...] <disk_image> --mbr|--fat|--tree` runs one mode and exits.
//! - `main [-v...]` starts an interactive prompt (`open`, `print`, `fat`,
//!   `part`, `ls`, `strict`, `quit`).

use fat32_inspect::Disk;
use fat32_inspect::commands::Command;
use fat32_inspect::constants::PART_CNT;
use fat32_inspect::filesystem::bpb::Validation;
use log::{error, info, warn};
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

/// Represents the runtime state of the program.
struct RunState {
    /// The currently opened disk image.
    disk: Option<Disk>,
    /// Partition selected for listing (0-based)
    part_idx: Option<usize>,
    /// Strictness of the BPB validation
    validation: Validation,
}

fn main() -> ExitCode {
    let mut verbosity = 1;
    let mut positional = vec![];
    for arg in env::args().skip(1) {
        if arg.starts_with("-v") && arg[1..].chars().all(|c| c == 'v') {
            verbosity += arg.len() - 1;
        } else {
            positional.push(arg);
        }
    }

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .module("fat32_inspect")
        .verbosity(verbosity)
        .init()
    {
        eprintln!("Failed to initialise logging: {e}");
    }

    let mut run_state = RunState {
        disk: None,
        part_idx: None,
        validation: Validation::default(),
    };

    match positional.as_slice() {
        [] => {
            interactive(&mut run_state);
            ExitCode::SUCCESS
        }
        [path, mode] => {
            let cmd = Command::from_mode(mode);
            if let Command::Invalid(s) = &cmd {
                error!("{s}");
                return ExitCode::FAILURE;
            }
            if !open(&mut run_state, path) {
                return ExitCode::FAILURE;
            }
            run_command(&mut run_state, cmd);
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Usage: main [-v...] <disk_image_file> <--mbr|--fat|--tree>");
            ExitCode::FAILURE
        }
    }
}

fn interactive(run_state: &mut RunState) {
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut s = String::new();
        match io::stdin().read_line(&mut s) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read command: {e}");
                break;
            }
        }

        if !run_command(run_state, Command::from_string(&s)) {
            break;
        }
    }
}

/// Opens a disk image, replacing the current one. Returns whether it succeeded.
fn open(run_state: &mut RunState, path: &str) -> bool {
    match Disk::from_file(Path::new(path), run_state.validation) {
        Ok(disk) => {
            run_state.disk = Some(disk);
            run_state.part_idx = None;
            true
        }
        Err(err) => {
            error!("{err}");
            false
        }
    }
}

/// Runs one command. Returns `false` when the program should stop.
fn run_command(run_state: &mut RunState, cmd: Command) -> bool {
    match cmd {
        Command::Open(path) => {
            open(run_state, &path);
        }
        Command::Quit => return false,
        Command::Print => match &run_state.disk {
            Some(disk) => {
                if let Err(e) = disk.print_layout(0) {
                    error!("Print layout error: {e}");
                }
            }
            None => warn!("Open disk image first"),
        },
        Command::Fat => match &run_state.disk {
            Some(disk) => {
                for part in disk.volumes() {
                    println!("Partition #{}:", part.index() + 1);
                    match part.volume() {
                        Ok(vol) => print!("{}", vol.bpb()),
                        Err(err) => error!("Partition #{}: {err}", part.index() + 1),
                    }
                }
            }
            None => warn!("Open disk image first"),
        },
        Command::Partition(part_nb) => {
            if part_nb < 1 || part_nb as usize > PART_CNT {
                error!("Partition number should be between 1 and {PART_CNT}.");
            } else {
                run_state.part_idx = Some(part_nb as usize - 1);
            }
        }
        Command::List => match (&mut run_state.disk, run_state.part_idx) {
            (Some(disk), Some(part_idx)) => match disk.root_dir(part_idx) {
                Ok(walker) => {
                    for record in walker {
                        match record {
                            Ok(record) => println!("{record}"),
                            Err(err) => error!("Listing stopped: {err}"),
                        }
                    }
                }
                Err(err) => error!("{err}"),
            },
            (Some(disk), None) => disk.print_tree(),
            (None, _) => warn!("Open disk image first"),
        },
        Command::Strict => {
            run_state.validation = Validation::Strict;
            info!("Strict BPB validation enabled for images opened from now on");
        }
        Command::Unknown(s) => error!("Unknown command: {s:?}"),
        Command::Invalid(s) => error!("{s}"),
        Command::Empty => {}
    }

    true
}
