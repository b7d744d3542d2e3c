//! Log database migrations - embedded SQL files
//!
//! Each migration is a (name, sql) pair compiled in with `include_str!`,
//! applied in order and recorded in `sys_migrations`.

/// All log migrations, in application order.
///
/// New migrations get the next `NNN_description.sql` name and an entry here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";
