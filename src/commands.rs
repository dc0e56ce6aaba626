//! This module defines the `Command` enum and its associated methods for parsing
//! user commands, either typed at the interactive prompt or given as a
//! one-shot mode flag on the command line.

/// Represents a user command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Command to quit the program.
    Quit,
    /// Command to open a disk image, encapsulating the file path as a `String`.
    Open(String),
    /// Print the partition table and the layout of each volume.
    Print,
    /// Print the volume information of every partition.
    Fat,
    /// Select the partition to list (1-based).
    Partition(u8),
    /// List the root directory of the selected partition, or of every volume.
    List,
    /// Require exactly two FATs when decoding volumes.
    Strict,
    /// Command for an unknown input, encapsulating the raw input as a `String`.
    Unknown(String),
    /// Command for invalid input, encapsulating an error message as a `String`.
    Invalid(String),
    /// Command for an empty input.
    Empty,
}

impl Command {
    /// Parses a line typed at the prompt into a `Command`.
    ///
    /// # Returns
    /// - `Command::Quit` if the input is "quit".
    /// - `Command::Open` with the file path if the input is "open" followed by an argument.
    /// - `Command::Print` if the input is "print".
    /// - `Command::Fat` if the input is "fat".
    /// - `Command::Partition` if the input is "part" followed by a number.
    /// - `Command::List` if the input is "ls".
    /// - `Command::Strict` if the input is "strict".
    /// - `Command::Invalid` if an argument is missing or malformed.
    /// - `Command::Unknown` if the input does not match any known command.
    /// - `Command::Empty` if the input is empty or contains only whitespace.
    pub fn from_string(s: &str) -> Self {
        let mut parts = s.split_whitespace();
        match parts.next() {
            Some("quit") => Command::Quit,
            Some("open") => match parts.next() {
                Some(arg) => Command::Open(arg.to_string()),
                None => Command::Invalid(String::from(
                    "Missing arg: 'open' expects the path to a '.img' file.",
                )),
            },
            Some("print") => Command::Print,
            Some("fat") => Command::Fat,
            Some("part") => match parts.next() {
                Some(arg) => match arg.parse::<u8>() {
                    Ok(nb) => Command::Partition(nb),
                    Err(_) => Command::Invalid(String::from(
                        "Arg parsing error: 'part' expects an unsigned integer.",
                    )),
                },
                None => Command::Invalid(String::from(
                    "Missing arg: 'part' expects the partition number.",
                )),
            },
            Some("ls") => Command::List,
            Some("strict") => Command::Strict,
            Some(other) => Command::Unknown(other.to_string()),
            None => Command::Empty,
        }
    }

    /// Maps a one-shot mode flag to the command it runs.
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "--mbr" => Command::Print,
            "--fat" => Command::Fat,
            "--tree" => Command::List,
            other => Command::Invalid(format!(
                "This mode doesn't exist: {other:?}. Use '--mbr', '--fat' or '--tree'."
            )),
        }
    }
}
