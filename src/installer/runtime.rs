//! # Runtimes and the ordered chain the installer walks through.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Java majors tried in order when an installer crashes.
pub const JAVA_UPGRADE_ORDER: [u32; 3] = [8, 17, 21];

/// One runtime able to execute the installer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runtime {
    name: String,
    major_version: u32,
    executable: PathBuf,
}

impl Runtime {
    /// Creates a runtime from an explicit executable.
    pub fn new(name: impl Into<String>, major_version: u32, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            major_version,
            executable: executable.into(),
        }
    }

    /// Java runtime installed under `home` (`home/bin/java`).
    pub fn java(major_version: u32, home: &Path) -> Self {
        Self::new(
            format!("jre-{major_version}"),
            major_version,
            home.join("bin").join("java"),
        )
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Major version.
    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    /// Program to spawn.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.major_version)
    }
}

/// Ordered list of runtimes; a failed attempt advances to the next entry.
#[derive(Clone, Debug, Default)]
pub struct RuntimeChain {
    runtimes: Vec<Runtime>,
}

impl RuntimeChain {
    /// Chain in the given order.
    pub fn new(runtimes: Vec<Runtime>) -> Self {
        Self { runtimes }
    }

    /// Java chain starting at `start_major` and upgrading along
    /// [`JAVA_UPGRADE_ORDER`].
    ///
    /// Majors without an entry in `homes` are skipped. A `start_major` that is
    /// not part of the upgrade order yields a single-entry chain when
    /// installed.
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use std::path::PathBuf;
    /// use launchvisor::installer::RuntimeChain;
    ///
    /// let homes = BTreeMap::from([
    ///     (8, PathBuf::from("/rt/8")),
    ///     (17, PathBuf::from("/rt/17")),
    ///     (21, PathBuf::from("/rt/21")),
    /// ]);
    /// let majors: Vec<u32> = RuntimeChain::java_from(17, &homes)
    ///     .iter()
    ///     .map(|r| r.major_version())
    ///     .collect();
    /// assert_eq!(majors, vec![17, 21]);
    /// ```
    pub fn java_from(start_major: u32, homes: &BTreeMap<u32, PathBuf>) -> Self {
        let majors: Vec<u32> = match JAVA_UPGRADE_ORDER.iter().position(|m| *m == start_major) {
            Some(idx) => JAVA_UPGRADE_ORDER[idx..].to_vec(),
            None => vec![start_major],
        };
        let runtimes = majors
            .into_iter()
            .filter_map(|major| homes.get(&major).map(|home| Runtime::java(major, home)))
            .collect();
        Self { runtimes }
    }

    /// Number of runtimes.
    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    /// True if no runtime is available.
    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    /// Runtimes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Runtime> {
        self.runtimes.iter()
    }

    /// Runtime following `current`, if any.
    pub fn next_after(&self, current: &Runtime) -> Option<&Runtime> {
        let idx = self.runtimes.iter().position(|r| r == current)?;
        self.runtimes.get(idx + 1)
    }
}

impl<'a> IntoIterator for &'a RuntimeChain {
    type Item = &'a Runtime;
    type IntoIter = std::slice::Iter<'a, Runtime>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn homes(majors: &[u32]) -> BTreeMap<u32, PathBuf> {
        majors
            .iter()
            .map(|m| (*m, PathBuf::from(format!("/runtimes/{m}"))))
            .collect()
    }

    #[test]
    fn upgrades_from_eight() {
        let chain = RuntimeChain::java_from(8, &homes(&[8, 17, 21]));
        let majors: Vec<u32> = chain.iter().map(Runtime::major_version).collect();
        assert_eq!(majors, vec![8, 17, 21]);
        assert_eq!(
            chain.iter().next().unwrap().executable(),
            Path::new("/runtimes/8/bin/java")
        );
    }

    #[test]
    fn skips_missing_runtimes() {
        let chain = RuntimeChain::java_from(8, &homes(&[8, 21]));
        let majors: Vec<u32> = chain.iter().map(Runtime::major_version).collect();
        assert_eq!(majors, vec![8, 21]);
    }

    #[test]
    fn unknown_start_is_single_entry() {
        assert_eq!(RuntimeChain::java_from(11, &homes(&[11, 17])).len(), 1);
        assert!(RuntimeChain::java_from(11, &homes(&[17])).is_empty());
    }

    #[test]
    fn next_after_walks_the_chain() {
        let chain = RuntimeChain::java_from(8, &homes(&[8, 17, 21]));
        let first = chain.iter().next().unwrap();
        let second = chain.next_after(first).unwrap();
        assert_eq!(second.major_version(), 17);
        let third = chain.next_after(second).unwrap();
        assert!(chain.next_after(third).is_none());
    }
}
