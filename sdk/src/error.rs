//! Phase-tagged session errors.

use std::fmt;

use thiserror::Error;

use crate::image::LocateError;
use crate::request::BuildError;
use crate::submit::SubmitError;
use crate::watch::WatchError;

/// Which lifecycle phase an error came from. Lets callers distinguish
/// "never submitted" from "submitted but unclaimed".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Locate,
    Build,
    Submit,
    Watch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Locate => "locate",
            Phase::Build => "build",
            Phase::Submit => "submit",
            Phase::Watch => "watch",
        };
        f.write_str(name)
    }
}

/// A session failure, wrapping the component error without discarding it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("locate phase failed: {0}")]
    Locate(#[from] LocateError),

    #[error("build phase failed: {0}")]
    Build(#[from] BuildError),

    #[error("submit phase failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("watch phase failed: {0}")]
    Watch(#[from] WatchError),
}

impl SessionError {
    pub fn phase(&self) -> Phase {
        match self {
            SessionError::Locate(_) => Phase::Locate,
            SessionError::Build(_) => Phase::Build,
            SessionError::Submit(_) => Phase::Submit,
            SessionError::Watch(_) => Phase::Watch,
        }
    }
}
