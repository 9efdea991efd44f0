use serde::{Deserialize, Serialize};

/// What happens to a seeder whose content hash changed since its last success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePolicy {
    /// Run the body again on top of existing data.
    #[default]
    Rerun,
    /// Run the rollback body first, in the same transaction, when the seeder supports it.
    RollbackThenRerun,
}

/// Filters and flags of one `run` invocation.
///
/// Empty `names` or `tags` mean no filter on that axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub environment: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Expands the name and tag selection with every seeder it transitively depends on.
    /// On by default.
    #[serde(default = "default_with_dependencies")]
    pub with_dependencies: bool,
}

fn default_with_dependencies() -> bool {
    true
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            environment: String::new(),
            names: Vec::new(),
            tags: Vec::new(),
            force: false,
            dry_run: false,
            with_dependencies: default_with_dependencies(),
        }
    }
}

impl RunOptions {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_dependencies(mut self, with_dependencies: bool) -> Self {
        self.with_dependencies = with_dependencies;
        self
    }
}

/// Which tracked successes a rollback applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackTarget {
    /// Current successes of the named seeders.
    Names(Vec<String>),
    /// Current successes recorded under one batch number.
    Batch(u64),
    /// Current successes belonging to the `n` highest batch numbers.
    LastBatches(usize),
    /// Every current success in the environment.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOptions {
    pub environment: String,
    pub target: RollbackTarget,
    #[serde(default)]
    pub dry_run: bool,
}

impl RollbackOptions {
    pub fn new(environment: impl Into<String>, target: RollbackTarget) -> Self {
        Self {
            environment: environment.into(),
            target,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Rollback of `target` followed by a forced run over the same seeders.
pub type RefreshOptions = RollbackOptions;
