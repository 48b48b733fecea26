// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::VcsError;
use git2::{Oid, Repository, StatusOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// The version-control operations the orchestrator needs.
pub trait Vcs {
    /// True if a tracked file has uncommitted modifications. Untracked
    /// files don't count.
    fn is_dirty(&self) -> Result<bool, VcsError>;

    fn fetch_tags(&self) -> Result<(), VcsError>;

    /// `(target hash, full reference name)` for every tag reference.
    fn tag_refs(&self) -> Result<Vec<(String, String)>, VcsError>;

    /// Check out `hash` with a detached HEAD.
    fn checkout(&self, hash: &str) -> Result<(), VcsError>;

    /// Directory the benchmark has to run in.
    fn workdir(&self) -> &Path;
}

fn git_err(operation: &'static str) -> impl FnOnce(git2::Error) -> VcsError {
    move |source| VcsError::Git { operation, source }
}

pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    pub fn open(path: &Path) -> Result<Self, VcsError> {
        let repo = Repository::open(path).map_err(git_err("opening repository"))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| VcsError::Git {
                operation: "opening repository",
                source: git2::Error::from_str("bare repositories have no working tree"),
            })?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    fn run_git(&self, args: &[&str]) -> Result<(), VcsError> {
        let command = args.join(" ");
        debug!(%command, workdir = %self.workdir.display(), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(VcsError::Exit {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Vcs for GitRepository {
    fn is_dirty(&self) -> Result<bool, VcsError> {
        let mut status_opts = StatusOptions::new();
        status_opts.include_untracked(false);
        let statuses = self
            .repo
            .statuses(Some(&mut status_opts))
            .map_err(git_err("reading working tree status"))?;
        Ok(!statuses.is_empty())
    }

    // Fetching goes through the git binary so that the user's credential
    // helpers and ssh setup apply.
    fn fetch_tags(&self) -> Result<(), VcsError> {
        let remotes = self.repo.remotes().map_err(git_err("listing remotes"))?;
        if remotes.is_empty() {
            debug!("no remotes configured, not fetching tags");
            return Ok(());
        }
        self.run_git(&["fetch", "--tags"])
    }

    fn tag_refs(&self) -> Result<Vec<(String, String)>, VcsError> {
        let mut tags = Vec::new();
        for reference in self
            .repo
            .references_glob("refs/tags/*")
            .map_err(git_err("listing tags"))?
        {
            let reference = reference.map_err(git_err("listing tags"))?;
            // Symbolic and non-UTF-8 references can't be monitoring tags.
            if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
                tags.push((target.to_string(), name.to_string()));
            }
        }
        Ok(tags)
    }

    fn checkout(&self, hash: &str) -> Result<(), VcsError> {
        let oid = Oid::from_str(hash).map_err(git_err("parsing revision hash"))?;
        // Annotated tags point at a tag object, not at the commit.
        let commit = self
            .repo
            .find_object(oid, None)
            .and_then(|object| object.peel_to_commit())
            .map_err(git_err("resolving revision"))?;

        let mut opts = git2::build::CheckoutBuilder::new();
        opts.safe(); // Don't overwrite modified files or remove untracked files

        self.repo
            .checkout_tree(commit.as_object(), Some(&mut opts))
            .map_err(git_err("checking out revision"))?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(git_err("detaching HEAD"))?;
        Ok(())
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}
