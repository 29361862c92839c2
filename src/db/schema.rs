//! Database schema types for SQL Explorer.
//!
//! Represents the tables, columns and foreign keys of an SQLite database, and
//! renders them for the chat prompt and for the `/schema` command.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables and views, ordered by name.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the database has no user tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Looks up a table by name (case-insensitive, as SQLite does).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(|table| self.format_table_for_llm(table))
            .collect::<Vec<_>>()
            .join("");

        let foreign_keys_text = if self.foreign_keys.is_empty() {
            String::new()
        } else {
            let fk_lines = self
                .foreign_keys
                .iter()
                .map(|fk| {
                    format!(
                        "  - {}.{} -> {}.{}\n",
                        fk.from_table, fk.from_column, fk.to_table, fk.to_column
                    )
                })
                .collect::<Vec<_>>()
                .join("");
            format!("Foreign Keys:\n{}", fk_lines)
        };

        format!("Database Schema:\n\n{}{}", tables_text, foreign_keys_text)
    }

    fn format_table_for_llm(&self, table: &Table) -> String {
        let header = match table.kind {
            TableKind::Table => format!("Table: {}", table.name),
            TableKind::View => format!("View: {}", table.name),
        };

        let column_lines = table
            .columns
            .iter()
            .map(|column| {
                let annotations = [
                    table.primary_key.contains(&column.name).then_some("PK".to_string()),
                    (!column.is_nullable).then_some("NOT NULL".to_string()),
                    column.default.as_ref().map(|d| format!("DEFAULT {d}")),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();

                let data_type = if column.data_type.is_empty() {
                    "ANY"
                } else {
                    column.data_type.as_str()
                };

                if annotations.is_empty() {
                    format!("  - {}: {}\n", column.name, data_type)
                } else {
                    format!(
                        "  - {}: {} ({})\n",
                        column.name,
                        data_type,
                        annotations.join(", ")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("");

        format!("{}\n{}\n", header, column_lines)
    }

    /// Formats the schema as a compact listing, one table per line.
    pub fn format_for_display(&self) -> String {
        if self.tables.is_empty() {
            return "No tables found.".to_string();
        }

        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| {
                        if c.data_type.is_empty() {
                            c.name.clone()
                        } else {
                            format!("{} {}", c.name, c.data_type)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let suffix = match table.kind {
                    TableKind::Table => "",
                    TableKind::View => " [view]",
                };
                format!("{}{} ({})", table.name, suffix, columns)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Whether a schema entry is a table or a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

/// Represents a database table or view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Table or view.
    pub kind: TableKind,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type; empty when the column was declared without one.
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and declared type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// A single-column foreign key reference.
///
/// Composite keys are reported as one entry per column pair, matching
/// `pragma_foreign_key_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}
