// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Repository fixtures shared by the integration tests.

#![allow(dead_code)]

use git2::{Commit, Oid, Repository, Signature};
use perfmon::BenchmarkCommand;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub fn commit_version(repo: &Repository, version: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join("version.txt"), version).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("version.txt")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Perf Bot", "perf@example.com").unwrap();
    let parents: Vec<Commit> = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &format!("version {version}"),
        &tree,
        &parent_refs,
    )
    .unwrap()
}

/// Three tagged commits (one annotated tag) plus tags that must be ignored.
pub fn fixture() -> (TempDir, Vec<Oid>) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let sig = Signature::now("Perf Bot", "perf@example.com").unwrap();
    let mut oids = Vec::new();
    for (version, tag) in [("1", "mon.00001"), ("2", "mon.00002"), ("3", "mon.00010")] {
        let oid = commit_version(&repo, version);
        let object = repo.find_object(oid, None).unwrap();
        if version == "2" {
            repo.tag(tag, &object, &sig, "annotated", false).unwrap();
        } else {
            repo.tag_lightweight(tag, &object, false).unwrap();
        }
        oids.push(oid);
    }
    let head = repo.find_object(oids[2], None).unwrap();
    repo.tag_lightweight("v1.0", &head, false).unwrap();
    repo.tag_lightweight("mon.123", &head, false).unwrap();
    (dir, oids)
}

/// Reports the checked out `version.txt` as the first duration.
pub fn version_benchmark(fail_on: Option<&str>) -> BenchmarkCommand {
    let fail = match fail_on {
        Some(v) => format!("test \"$v\" = {v} && exit 3; "),
        None => String::new(),
    };
    BenchmarkCommand::new(
        "sh",
        [
            "-c".to_string(),
            format!(
                "v=$(cat version.txt); {fail}echo 'case,status,limit,a,b,progress'; \
                 echo \"version,Success,60,$v,0.5,0\"; echo \"stuck,Timedout,60,,,$v\""
            ),
        ],
    )
}
