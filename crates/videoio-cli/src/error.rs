// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments
    InvalidArgs(String),
    /// Card or channel not found
    DeviceNotFound(String),
    /// Driver shim library could not be loaded
    DriverUnavailable(String),
    /// Channel could not be opened with a usable format
    Negotiation(String),
    /// DMA or field sync failure on an open channel
    Transfer(String),
    /// General error from the VideoIO library
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            CliError::DriverUnavailable(msg) => write!(f, "Driver unavailable: {}", msg),
            CliError::Negotiation(msg) => write!(f, "Negotiation failed: {}", msg),
            CliError::Transfer(msg) => write!(f, "Transfer failed: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::InvalidArgs(_) => ExitCode::from(2),
            CliError::DeviceNotFound(_) => ExitCode::from(3),
            CliError::DriverUnavailable(_) => ExitCode::from(4),
            CliError::Negotiation(_) => ExitCode::from(5),
            CliError::Transfer(_) => ExitCode::from(6),
            CliError::General(_) => ExitCode::from(1),
        }
    }
}

/// Map videoio::Error to CliError with appropriate exit codes
impl From<videoio::Error> for CliError {
    fn from(err: videoio::Error) -> Self {
        use videoio::Error;

        match err {
            Error::LibraryNotLoaded(lib_err) => {
                CliError::DriverUnavailable(format!("Failed to load driver library: {}", lib_err))
            }

            Error::DeviceNotFound(_)
            | Error::ChannelNotSelected
            | Error::ChannelNotOpen(_)
            | Error::AttachFailed { .. } => CliError::DeviceNotFound(err.to_string()),

            Error::WrongDirection(_) | Error::ModeRequired(_) | Error::InvalidCycle(_) => {
                CliError::InvalidArgs(err.to_string())
            }

            Error::NegotiationFailed { .. } | Error::LinkTypeUnsupported { .. } => {
                CliError::Negotiation(err.to_string())
            }

            Error::DmaSubmitFailed { .. }
            | Error::RenderCommitFailed { .. }
            | Error::CaptureArmFailed { .. }
            | Error::SyncWaitFailed { .. }
            | Error::EmptyBuffer => CliError::Transfer(err.to_string()),

            Error::Driver(_) | Error::DetachFailed { .. } => CliError::General(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::General(format!("I/O error: {}", err))
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}
