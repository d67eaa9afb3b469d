//! Dependency scopes and the scope-widening table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility of a dependency on the build classpaths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    /// Supplied from a declared path on disk, never from a repository
    System,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::Compile,
        Scope::Provided,
        Scope::Runtime,
        Scope::Test,
        Scope::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Provided => "provided",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::System => "system",
        }
    }

    /// Effective scope of a transitive dependency declared with `dependency`
    /// and reached through an edge of scope `path`.
    ///
    /// `None` prunes the edge. System dependencies keep their scope; nothing
    /// is reached through a system dependency.
    pub fn widen(path: Scope, dependency: Scope) -> Option<Scope> {
        use Scope::*;

        match (path, dependency) {
            (_, System) => Some(System),
            (System, _) => None,
            (_, Test) => None,
            (Compile, Compile) => Some(Compile),
            (Compile, Runtime) => Some(Runtime),
            (Compile, Provided) => Some(Provided),
            (Runtime, Compile) | (Runtime, Runtime) => Some(Runtime),
            (Runtime, Provided) => None,
            (Test, Compile) | (Test, Runtime) => Some(Test),
            (Test, Provided) => None,
            (Provided, Compile) | (Provided, Runtime) => Some(Provided),
            (Provided, Provided) => None,
        }
    }

    /// Whether a node reached with `self` should replace the scope `other`
    /// of the node that won mediation.
    ///
    /// `compile` replaces anything narrower; `runtime` replaces `test` and
    /// `provided`. Other pairs keep the winner's scope, and a system scope is
    /// never replaced.
    pub fn widens(self, other: Scope) -> bool {
        match self {
            Scope::Compile => !matches!(other, Scope::Compile | Scope::System),
            Scope::Runtime => matches!(other, Scope::Test | Scope::Provided),
            _ => false,
        }
    }

    /// Broadest of two scopes, preferring `self` when neither widens the other
    pub fn broadest(self, other: Scope) -> Scope {
        if other.widens(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "provided" => Ok(Scope::Provided),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "system" => Ok(Scope::System),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scope::*;
    use super::*;

    #[test]
    fn test_widening_table() {
        let table = [
            (Compile, [(Compile, Some(Compile)), (Runtime, Some(Runtime)), (Test, None), (Provided, Some(Provided))]),
            (Runtime, [(Compile, Some(Runtime)), (Runtime, Some(Runtime)), (Test, None), (Provided, None)]),
            (Test, [(Compile, Some(Test)), (Runtime, Some(Test)), (Test, None), (Provided, None)]),
            (Provided, [(Compile, Some(Provided)), (Runtime, Some(Provided)), (Test, None), (Provided, None)]),
        ];
        for (path, row) in table {
            for (dependency, expected) in row {
                assert_eq!(
                    Scope::widen(path, dependency),
                    expected,
                    "widen({path}, {dependency})"
                );
            }
        }
    }

    #[test]
    fn test_default_is_compile() {
        assert_eq!(Scope::default(), Compile);
    }

    #[test]
    fn test_system_scope_passes_through() {
        for path in [Compile, Runtime, Test, Provided] {
            assert_eq!(Scope::widen(path, System), Some(System));
        }
        assert_eq!(Scope::widen(System, Compile), None);
    }

    #[test]
    fn test_widens() {
        assert!(Compile.widens(Test));
        assert!(Compile.widens(Runtime));
        assert!(!Compile.widens(System));
        assert!(Runtime.widens(Test));
        assert!(Runtime.widens(Provided));
        assert!(!Runtime.widens(Compile));
        assert!(!Test.widens(Provided));
        assert!(!Provided.widens(Test));
        assert!(!Runtime.widens(System));
        assert_eq!(Test.broadest(Compile), Compile);
        assert_eq!(Test.broadest(Provided), Test);
    }

    #[test]
    fn test_parse_and_display() {
        for scope in Scope::ALL {
            assert_eq!(scope.to_string().parse::<Scope>(), Ok(scope));
        }
        assert_eq!(" Runtime ".parse::<Scope>(), Ok(Runtime));
        assert!("import".parse::<Scope>().is_err());
    }
}
