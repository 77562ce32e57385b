use derive_more::Display;

use crate::time::Time;

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "unknown train '{}'", _0)]
    UnknownTrain(String),
    #[display(fmt = "unknown block '{}'", _0)]
    UnknownBlock(String),
    #[display(fmt = "block '{}' is not on the path of train '{}'", block, train)]
    BlockNotOnPath { train: String, block: String },
    #[display(
        fmt = "invalid occupancy of block '{}' by train '{}': end {} is not after start {}",
        block,
        train,
        end,
        start
    )]
    InvalidInterval {
        train: String,
        block: String,
        start: Time,
        end: Time,
    },
    #[display(fmt = "block '{}' is occupied twice by train '{}'", block, train)]
    DuplicateOccupancy { train: String, block: String },
    #[display(fmt = "negative duration {} for train '{}'", amount, train)]
    NegativeDuration { train: String, amount: Time },
    #[display(fmt = "train '{}' has no block at or after time {}", train, threshold)]
    ThresholdBeyondPath { train: String, threshold: Time },
    #[display(fmt = "agent '{}' made an invalid proposal: {}", agent, reason)]
    InvalidAgentProposal { agent: String, reason: String },
    #[display(fmt = "times of train '{}' do not fit in the time range", train)]
    TimeOverflow { train: String },
    #[display(fmt = "delay propagation did not settle within {} steps", steps)]
    PropagationDiverged { steps: usize },
    #[display(fmt = "malformed simulator output: {}", _0)]
    AdapterMalformedInput(String),
    #[display(fmt = "json: {}", _0)]
    Json(serde_json::Error),
    #[display(fmt = "io: {}", _0)]
    Io(std::io::Error),
    #[display(fmt = "simulator command failed: {}", _0)]
    SimulatorFailed(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
