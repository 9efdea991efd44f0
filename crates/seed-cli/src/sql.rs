use std::borrow::Cow;
use std::fs;
use std::path::Path;

use rusqlite::Connection;
use seed_core::{
    BodyError, ErrorInfo, Registry, SeedContext, SeedError, Seeder, SeederDefinition,
    Transactional,
};

use crate::config::SqlSeederConfig;

/// Data session over one SQLite connection, one transaction per seeder.
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn open(path: &Path) -> Result<Self, SeedError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    SeedError::Config(
                        ErrorInfo::new("config-data-path", "failed to create data directory")
                            .with_context("path", parent.display().to_string())
                            .with_hint(err.to_string()),
                    )
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|err| {
            SeedError::Config(
                ErrorInfo::new("config-data-path", "failed to open data database")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Transactional for SqliteSession {
    fn begin(&mut self) -> Result<(), BodyError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BodyError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BodyError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Seeder whose bodies are lists of SQL statements from configuration.
#[derive(Debug, Clone)]
pub struct SqlSeeder {
    config: SqlSeederConfig,
}

impl SqlSeeder {
    pub fn new(config: SqlSeederConfig) -> Self {
        Self { config }
    }
}

fn execute_all(
    conn: &Connection,
    statements: &[String],
    ctx: &mut SeedContext,
) -> Result<(), BodyError> {
    for statement in statements {
        let changed = conn.execute(statement, [])?;
        ctx.affected(changed as u64);
    }
    Ok(())
}

impl Seeder<SqliteSession> for SqlSeeder {
    fn definition(&self) -> SeederDefinition {
        SeederDefinition::new(&self.config.name)
            .describe(&self.config.description)
            .environments(&self.config.environments)
            .depends_on(&self.config.dependencies)
            .tags(&self.config.tags)
            .priority(self.config.priority)
            .batch_size(self.config.batch_size)
            .rollback(self.config.can_rollback)
    }

    fn logic(&self) -> Cow<'_, [u8]> {
        let mut text = self.config.up.join(";\n");
        text.push_str("\n-- down\n");
        text.push_str(&self.config.down.join(";\n"));
        Cow::Owned(text.into_bytes())
    }

    fn run(&self, session: &mut SqliteSession, ctx: &mut SeedContext) -> Result<(), BodyError> {
        execute_all(&session.conn, &self.config.up, ctx)
    }

    fn rollback(
        &self,
        session: &mut SqliteSession,
        ctx: &mut SeedContext,
    ) -> Result<(), BodyError> {
        if self.config.down.is_empty() {
            return Err(format!("seeder {} has no down statements", ctx.seeder).into());
        }
        execute_all(&session.conn, &self.config.down, ctx)
    }
}

/// Builds a registry from the seeders declared in configuration.
pub fn registry_from_config(
    seeders: &[SqlSeederConfig],
) -> Result<Registry<SqliteSession>, SeedError> {
    let mut registry = Registry::new();
    for seeder in seeders {
        registry.register(SqlSeeder::new(seeder.clone()))?;
    }
    Ok(registry)
}
