// Copyright (c) 2025 the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::HardwareError;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const CPUINFO: &str = "/proc/cpuinfo";

static IDENTITY_FIELDS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"(?m)^vendor_id\s*?: (.+?)$",
        r"(?m)^cpu family\s*?: (\d+)",
        r"(?m)^model\s*?: (\d+)",
        r"(?m)^stepping\s*?: (\d+)",
    ]
    .map(|re| Regex::new(re).expect("identity field patterns are valid"))
});

/// Key under which results are partitioned, so that runs measured on
/// different processors never end up on the same plot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardwareSignature(String);

impl HardwareSignature {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    /// Signature of the machine we are running on.
    pub fn detect() -> Result<Self, HardwareError> {
        Self::from_cpuinfo_file(Path::new(CPUINFO))
    }

    pub fn from_cpuinfo_file(path: &Path) -> Result<Self, HardwareError> {
        let info = fs::read_to_string(path).map_err(|source| HardwareError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_cpuinfo(&info).ok_or_else(|| HardwareError::Unrecognized {
            path: path.to_path_buf(),
        })
    }

    /// Vendor, family, model and stepping of the first processor listed,
    /// joined by `_`. Missing fields are skipped.
    pub fn from_cpuinfo(info: &str) -> Option<Self> {
        let parts: Vec<&str> = IDENTITY_FIELDS
            .iter()
            .filter_map(|re| re.captures(info))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts.join("_")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HardwareSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTEL: &str = "processor\t: 0\n\
        vendor_id\t: GenuineIntel\n\
        cpu family\t: 6\n\
        model\t\t: 158\n\
        model name\t: Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz\n\
        stepping\t: 10\n\
        \n\
        processor\t: 1\n\
        vendor_id\t: GenuineIntel\n\
        cpu family\t: 6\n\
        model\t\t: 158\n\
        stepping\t: 10\n";

    #[test]
    fn intel_cpuinfo() {
        let sig = HardwareSignature::from_cpuinfo(INTEL).unwrap();
        assert_eq!(sig.as_str(), "GenuineIntel_6_158_10");
    }

    #[test]
    fn model_name_is_not_model() {
        let info = "model name\t: Something 42\nmodel\t\t: 7\n";
        assert_eq!(HardwareSignature::from_cpuinfo(info).unwrap().as_str(), "7");
    }

    #[test]
    fn unrecognized_cpuinfo() {
        let arm = "processor\t: 0\nBogoMIPS\t: 48.00\nCPU implementer\t: 0x41\n";
        assert!(HardwareSignature::from_cpuinfo(arm).is_none());
    }

    #[test]
    fn missing_file() {
        let err = HardwareSignature::from_cpuinfo_file(Path::new("/nonexistent/cpuinfo"));
        assert!(matches!(err, Err(HardwareError::Unreadable { .. })));
    }
}
