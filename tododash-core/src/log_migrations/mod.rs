//! Event log migrations, embedded with include_str!
//!
//! Applied in order by name. To add one, create `NNN_description.sql` and
//! append it here.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
