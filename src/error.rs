// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structural failures. Causes are reachable through `source()` only, never
/// repeated in the message, so a report walking the chain shows each once. Any of these aborts the operation that hit it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("repository is not clean")]
    DirtyRepository,

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("{operation} failed")]
    Git {
        operation: &'static str,
        #[source]
        source: git2::Error,
    },

    #[error("`git {command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to launch `git {command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// A run file that does not decode. Fatal for the run it belongs to only.
#[derive(Error, Debug)]
#[error("{}:{line}: {reason}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub line: u64,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("can't read {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no processor identity fields found in {}", path.display())]
    Unrecognized { path: PathBuf },
}
