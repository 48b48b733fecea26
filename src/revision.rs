// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::vcs::Vcs;
use tracing::{debug, info};

pub const DEFAULT_TAG_PREFIX: &str = "mon.";

/// A tagged snapshot selected for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub hash: String,
    pub tag: String,
    /// Numeric suffix of the tag; the canonical ordering key.
    pub sequence: u32,
}

/// Naming convention for monitoring tags: a fixed prefix followed by
/// exactly five digits.
#[derive(Debug, Clone)]
pub struct TagScheme {
    prefix: String,
}

impl TagScheme {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Turns a `(hash, refs/tags/...)` pair into a revision if the tag is a
    /// monitoring tag.
    pub fn revision(&self, hash: &str, reference: &str) -> Option<Revision> {
        let tag = reference.strip_prefix("refs/tags/")?;
        match split_sequence(tag, &self.prefix)? {
            (sequence, "") => Some(Revision {
                hash: hash.to_string(),
                tag: tag.to_string(),
                sequence,
            }),
            _ => None,
        }
    }
}

/// Splits `<prefix><5 digits><rest>` into the sequence number and `rest`.
pub(crate) fn split_sequence<'s>(name: &'s str, prefix: &str) -> Option<(u32, &'s str)> {
    let digits = name.strip_prefix(prefix)?;
    if digits.len() < 5 || !digits.as_bytes()[..5].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let (number, rest) = digits.split_at(5);
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((number.parse().ok()?, rest))
}

impl Default for TagScheme {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_PREFIX)
    }
}

/// Enumerates the monitoring revisions of a repository.
pub struct RevisionSource<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    scheme: &'a TagScheme,
    fetch: bool,
}

impl<'a, V: Vcs + ?Sized> RevisionSource<'a, V> {
    pub fn new(vcs: &'a V, scheme: &'a TagScheme) -> Self {
        Self {
            vcs,
            scheme,
            fetch: true,
        }
    }

    pub fn without_fetch(mut self) -> Self {
        self.fetch = false;
        self
    }

    /// Fails if a tracked file is modified. The result comes in the order
    /// the VCS lists tags; callers needing chronology sort by `sequence`.
    pub fn discover(&self) -> Result<Vec<Revision>> {
        if self.vcs.is_dirty()? {
            return Err(Error::DirtyRepository);
        }
        if self.fetch {
            self.vcs.fetch_tags()?;
        }
        let refs = self.vcs.tag_refs()?;
        let total = refs.len();
        let revisions: Vec<Revision> = refs
            .iter()
            .filter_map(|(hash, reference)| {
                let rev = self.scheme.revision(hash, reference);
                if rev.is_none() {
                    debug!(%reference, "not a monitoring tag");
                }
                rev
            })
            .collect();
        info!(total, monitoring = revisions.len(), "discovered tags");
        Ok(revisions)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::VcsError;
    use std::cell::{Cell, RefCell};
    use std::path::{Path, PathBuf};

    /// In-memory VCS recording what the orchestrator asks of it.
    #[derive(Default)]
    pub(crate) struct FakeVcs {
        pub dirty: bool,
        pub tags: Vec<(String, String)>,
        pub fail_checkout: Option<String>,
        pub fetches: Cell<usize>,
        pub checkouts: RefCell<Vec<String>>,
        pub workdir: PathBuf,
    }

    impl FakeVcs {
        pub fn with_tags(tags: &[(&str, &str)]) -> Self {
            Self {
                tags: tags
                    .iter()
                    .map(|(h, t)| (h.to_string(), format!("refs/tags/{t}")))
                    .collect(),
                workdir: PathBuf::from("."),
                ..Default::default()
            }
        }
    }

    impl Vcs for FakeVcs {
        fn is_dirty(&self) -> Result<bool, VcsError> {
            Ok(self.dirty)
        }
        fn fetch_tags(&self) -> Result<(), VcsError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(())
        }
        fn tag_refs(&self) -> Result<Vec<(String, String)>, VcsError> {
            Ok(self.tags.clone())
        }
        fn checkout(&self, hash: &str) -> Result<(), VcsError> {
            if self.fail_checkout.as_deref() == Some(hash) {
                return Err(VcsError::Git {
                    operation: "checking out revision",
                    source: git2::Error::from_str("conflict"),
                });
            }
            self.checkouts.borrow_mut().push(hash.to_string());
            Ok(())
        }
        fn workdir(&self) -> &Path {
            &self.workdir
        }
    }

    #[test]
    fn filters_monitoring_tags() {
        let vcs = FakeVcs::with_tags(&[
            ("aaa", "mon.00002"),
            ("bbb", "v1.0"),
            ("ccc", "mon.0001"),
            ("ddd", "mon.000010"),
            ("eee", "mon.00001"),
            ("fff", "monX00003"),
            ("ggg", "mon.00004-fix"),
        ]);
        let scheme = TagScheme::default();
        let revs = RevisionSource::new(&vcs, &scheme).discover().unwrap();
        assert_eq!(
            revs,
            vec![
                Revision {
                    hash: "aaa".into(),
                    tag: "mon.00002".into(),
                    sequence: 2
                },
                Revision {
                    hash: "eee".into(),
                    tag: "mon.00001".into(),
                    sequence: 1
                },
            ]
        );
        assert_eq!(vcs.fetches.get(), 1);
    }

    #[test]
    fn dirty_repository_is_fatal() {
        let mut vcs = FakeVcs::with_tags(&[("aaa", "mon.00001")]);
        vcs.dirty = true;
        let scheme = TagScheme::default();
        let err = RevisionSource::new(&vcs, &scheme).discover().unwrap_err();
        assert!(matches!(err, Error::DirtyRepository));
        assert_eq!(vcs.fetches.get(), 0);
    }

    #[test]
    fn skip_fetch() {
        let vcs = FakeVcs::with_tags(&[]);
        let scheme = TagScheme::default();
        let revs = RevisionSource::new(&vcs, &scheme)
            .without_fetch()
            .discover()
            .unwrap();
        assert!(revs.is_empty());
        assert_eq!(vcs.fetches.get(), 0);
    }

    #[test]
    fn custom_prefix_is_literal() {
        let scheme = TagScheme::new("perf+");
        assert!(scheme.revision("h", "refs/tags/perf+12345").is_some());
        assert!(scheme.revision("h", "refs/tags/perfff12345").is_none());
        assert!(scheme.revision("h", "refs/heads/perf+12345").is_none());
    }

    #[test]
    fn huge_prefix_does_not_panic() {
        let prefix = "x".repeat(1 << 20);
        let scheme = TagScheme::new(&prefix);
        let reference = format!("refs/tags/{prefix}00042");
        assert_eq!(scheme.revision("h", &reference).unwrap().sequence, 42);
        assert!(scheme.revision("h", "refs/tags/mon.00042").is_none());
    }

    #[test]
    fn sequence_split() {
        assert_eq!(split_sequence("mon.00012.abc", "mon."), Some((12, ".abc")));
        assert_eq!(split_sequence("mon.00012", "mon."), Some((12, "")));
        assert_eq!(split_sequence("mon.000123", "mon."), None);
        assert_eq!(split_sequence("mon.0012", "mon."), None);
        assert_eq!(split_sequence("mon.1234٣", "mon."), None);
    }
}
