//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `mblock` exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | Reserved; no command returns it          |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-9     | config           | Experiment config codes                  |
//! | 10-19   | input            | Collection / gold standard loading       |
//! | 20-29   | run              | Meta-blocking run and output             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use metablock_engine::MetaError;
use metablock_io::IoError;

use metablock_cli::RunError;

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (3-9)
// =============================================================================

/// Config file could not be read.
pub const EXIT_CONFIG_READ: u8 = 3;

/// Config is not valid TOML or does not match the schema.
pub const EXIT_CONFIG_PARSE: u8 = 4;

/// Config parsed but failed validation (bad fraction, empty sweep, ...).
pub const EXIT_CONFIG_INVALID: u8 = 5;

// =============================================================================
// Input (10-19)
// =============================================================================

/// A collection or gold-standard file could not be read or parsed.
pub const EXIT_INPUT_READ: u8 = 10;

/// A configured column is missing from its file.
pub const EXIT_INPUT_COLUMN: u8 = 11;

/// A gold-standard key does not occur in its collection.
pub const EXIT_INPUT_GOLD_KEY: u8 = 12;

/// A collection or the gold standard is empty.
pub const EXIT_INPUT_EMPTY: u8 = 13;

// =============================================================================
// Run (20-29)
// =============================================================================

/// Meta-blocking failed on otherwise valid inputs.
pub const EXIT_RUN_ENGINE: u8 = 20;

/// The JSON report could not be serialized or written.
pub const EXIT_RUN_OUTPUT: u8 = 21;

// =============================================================================
// Mapping
// =============================================================================

/// Exit code for a failed run.
pub fn run_exit_code(err: &RunError) -> u8 {
    match err {
        RunError::Io(IoError::Read { .. }) | RunError::Io(IoError::Csv(_)) => EXIT_INPUT_READ,
        RunError::Io(IoError::MissingColumn { .. }) => EXIT_INPUT_COLUMN,
        RunError::Io(IoError::Empty { .. }) => EXIT_INPUT_EMPTY,
        RunError::Meta(MetaError::Lookup { .. }) => EXIT_INPUT_GOLD_KEY,
        RunError::Meta(MetaError::EmptyInput { .. }) => EXIT_INPUT_EMPTY,
        RunError::Meta(_) => EXIT_RUN_ENGINE,
    }
}
