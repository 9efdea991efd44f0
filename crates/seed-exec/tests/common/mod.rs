#![allow(dead_code)]

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use seed_core::{
    BodyError, Registry, SeedContext, Seeder, SeederDefinition, SeederHooks, Transactional,
};
use seed_exec::SeederManager;
use seed_track::{MemoryStore, Tracker};

pub type Calls = Rc<RefCell<Vec<String>>>;

pub fn calls() -> Calls {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(calls: &Calls) -> Vec<String> {
    calls.borrow_mut().drain(..).collect()
}

/// Row store with one staged copy per open transaction.
#[derive(Debug, Default)]
pub struct MemorySession {
    pub committed: Vec<String>,
    staged: Option<Vec<String>>,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MemorySession {
    pub fn write(&mut self, row: String) -> Result<(), BodyError> {
        self.staged
            .as_mut()
            .ok_or("write outside transaction")?
            .push(row);
        Ok(())
    }

    pub fn remove_prefix(&mut self, prefix: &str) -> Result<(), BodyError> {
        self.staged
            .as_mut()
            .ok_or("remove outside transaction")?
            .retain(|row| !row.starts_with(prefix));
        Ok(())
    }

    pub fn rows_of(&self, seeder: &str) -> usize {
        let prefix = format!("{seeder}:");
        self.committed
            .iter()
            .filter(|row| row.starts_with(&prefix))
            .count()
    }
}

impl Transactional for MemorySession {
    fn begin(&mut self) -> Result<(), BodyError> {
        if self.staged.is_some() {
            return Err("transaction already open".into());
        }
        self.staged = Some(self.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BodyError> {
        self.committed = self.staged.take().ok_or("no open transaction")?;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BodyError> {
        self.staged = None;
        self.rollbacks += 1;
        Ok(())
    }
}

pub struct RecordingHooks {
    calls: Calls,
    reject: bool,
    fail_after: bool,
}

impl SeederHooks for RecordingHooks {
    fn validate(&self, ctx: &SeedContext) -> Result<(), BodyError> {
        self.calls.borrow_mut().push(format!("validate:{}", ctx.seeder));
        if self.reject {
            return Err("precondition not met".into());
        }
        Ok(())
    }

    fn before_run(&self, ctx: &SeedContext) -> Result<(), BodyError> {
        self.calls
            .borrow_mut()
            .push(format!("before_run:{}", ctx.seeder));
        Ok(())
    }

    fn after_run(&self, ctx: &SeedContext) -> Result<(), BodyError> {
        self.calls
            .borrow_mut()
            .push(format!("after_run:{}", ctx.seeder));
        if self.fail_after {
            return Err("cache warmup failed".into());
        }
        Ok(())
    }

    fn before_rollback(&self, ctx: &SeedContext) -> Result<(), BodyError> {
        self.calls
            .borrow_mut()
            .push(format!("before_rollback:{}", ctx.seeder));
        Ok(())
    }

    fn after_rollback(&self, ctx: &SeedContext) -> Result<(), BodyError> {
        self.calls
            .borrow_mut()
            .push(format!("after_rollback:{}", ctx.seeder));
        if self.fail_after {
            return Err("cache purge failed".into());
        }
        Ok(())
    }
}

/// Writes `rows` rows named `<seeder>:<n>` and logs every body call.
pub struct TestSeeder {
    definition: SeederDefinition,
    logic: String,
    rows: u64,
    fail_run: bool,
    fail_rollback: bool,
    calls: Calls,
    hooks: Option<RecordingHooks>,
}

impl TestSeeder {
    pub fn new(definition: SeederDefinition, calls: &Calls) -> Self {
        Self {
            logic: format!("insert into {}", definition.name),
            definition,
            rows: 1,
            fail_run: false,
            fail_rollback: false,
            calls: Rc::clone(calls),
            hooks: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn rows(mut self, rows: u64) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_logic(mut self, logic: &str) -> Self {
        self.logic = logic.to_string();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn with_hooks(mut self, reject: bool) -> Self {
        self.hooks = Some(RecordingHooks {
            calls: Rc::clone(&self.calls),
            reject,
            fail_after: false,
        });
        self
    }

    /// Hooks whose `after_run` and `after_rollback` fail.
    pub fn with_failing_after_hooks(mut self) -> Self {
        self.hooks = Some(RecordingHooks {
            calls: Rc::clone(&self.calls),
            reject: false,
            fail_after: true,
        });
        self
    }
}

impl Seeder<MemorySession> for TestSeeder {
    fn definition(&self) -> SeederDefinition {
        self.definition.clone()
    }

    fn logic(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.logic.as_bytes())
    }

    fn run(&self, session: &mut MemorySession, ctx: &mut SeedContext) -> Result<(), BodyError> {
        self.calls.borrow_mut().push(format!("run:{}", ctx.seeder));
        for index in 0..self.rows {
            session.write(format!("{}:{index}", ctx.seeder))?;
        }
        ctx.affected(self.rows);
        if self.fail_run {
            return Err(format!("insert into {} violated a constraint", ctx.seeder).into());
        }
        Ok(())
    }

    fn rollback(
        &self,
        session: &mut MemorySession,
        ctx: &mut SeedContext,
    ) -> Result<(), BodyError> {
        self.calls
            .borrow_mut()
            .push(format!("rollback:{}", ctx.seeder));
        session.remove_prefix(&format!("{}:", ctx.seeder))?;
        if self.fail_rollback {
            return Err("delete blocked by foreign key".into());
        }
        Ok(())
    }

    fn hooks(&self) -> Option<&dyn SeederHooks> {
        self.hooks.as_ref().map(|hooks| hooks as &dyn SeederHooks)
    }
}

pub type TestManager = SeederManager<MemorySession, MemoryStore>;

pub fn manager(seeders: Vec<TestSeeder>) -> TestManager {
    let mut registry = Registry::new();
    for seeder in seeders {
        registry.register(seeder).expect("register");
    }
    SeederManager::new(registry, Tracker::new(MemoryStore::new()), MemorySession::default())
}

/// A (no deps), B (deps A, priority 1), C (deps A, priority 2), all reversible.
pub fn abc(calls: &Calls) -> Vec<TestSeeder> {
    vec![
        TestSeeder::new(SeederDefinition::new("C").depends_on(["A"]).priority(2).rollback(true), calls),
        TestSeeder::new(SeederDefinition::new("A").rollback(true), calls).rows(2),
        TestSeeder::new(SeederDefinition::new("B").depends_on(["A"]).priority(1).rollback(true), calls),
    ]
}
