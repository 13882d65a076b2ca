//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Renders the DDL that keeps a table in step with its shape and the
//! `INSERT ... ON DUPLICATE KEY UPDATE` statement used for every record.
//! Rendering is plain string building; the exact layout (tab indentation,
//! leading commas in ALTER, metadata columns last) is pinned by the golden
//! tests below.

use crate::core::identifier::quote;
use crate::core::schema::{PrimaryKeyChange, TableModel};
use crate::core::traits::Dialect;
use crate::shape::model::{
    ParamSpec, RenderCache, METADATA_COLUMNS, PUBLISHED_AT, PUBLISHER, SHAPE_VERSION,
};
use crate::typemap::SqlType;

/// MySQL/MariaDB dialect implementation.
///
/// `ADD COLUMN IF NOT EXISTS` requires MariaDB 10.0+ or MySQL 8.0.29+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn join_quoted<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> String {
        names
            .into_iter()
            .map(|n| self.quote_ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_def(&self, name: &str, sql_type: &SqlType, is_key: bool) -> String {
        format!(
            "{} {} {}NULL",
            self.quote_ident(name),
            sql_type,
            if is_key { "NOT " } else { "" }
        )
    }
}

/// Metadata columns written by every upsert, with the type their value is
/// coerced to. `createdAt` is filled by the server.
const UPSERT_METADATA: [(&str, SqlType); 3] = [
    (PUBLISHER, SqlType::Varchar(1000)),
    (PUBLISHED_AT, SqlType::DateTime),
    (SHAPE_VERSION, SqlType::Varchar(50)),
];

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn build_create_table(&self, model: &TableModel) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", self.quote_ident(&model.name));

        for col in &model.columns {
            sql.push_str("\n\t");
            sql.push_str(&self.column_def(&col.name, &col.sql_type, col.is_key));
            sql.push(',');
        }

        for (i, (name, ddl)) in METADATA_COLUMNS.iter().enumerate() {
            sql.push_str(&format!("\n\t{} {}", self.quote_ident(name), ddl));
            if i + 1 < METADATA_COLUMNS.len() || model.has_pk() {
                sql.push(',');
            }
        }

        if model.has_pk() {
            sql.push_str(&format!(
                "\n\tPRIMARY KEY ({})",
                self.join_quoted(&model.keys)
            ));
        }

        sql.push_str("\n);");
        sql
    }

    fn build_create_view(&self, model: &TableModel) -> String {
        let view_cols = model
            .virtual_columns
            .iter()
            .map(|v| self.quote_ident(&v.name))
            .chain(METADATA_COLUMNS.iter().map(|(n, _)| self.quote_ident(n)))
            .collect::<Vec<_>>()
            .join(",\n\t");

        let select_cols = model
            .virtual_columns
            .iter()
            .map(|v| self.quote_ident(&v.from_name))
            .chain(METADATA_COLUMNS.iter().map(|(n, _)| self.quote_ident(n)))
            .collect::<Vec<_>>()
            .join(",\n\t");

        format!(
            "CREATE OR REPLACE VIEW {} (\n\t{}\n)\nAS SELECT\n\t{}\nFROM {};",
            self.quote_ident(&model.view_name),
            view_cols,
            select_cols,
            self.quote_ident(&model.name)
        )
    }

    fn build_alter_table(&self, model: &TableModel, pk_change: PrimaryKeyChange) -> Option<String> {
        let mut clauses: Vec<String> = model
            .columns
            .iter()
            .map(|c| {
                format!(
                    "ADD COLUMN IF NOT EXISTS {}",
                    self.column_def(&c.name, &c.sql_type, c.is_key)
                )
            })
            .collect();

        match pk_change {
            PrimaryKeyChange::Keep => {}
            PrimaryKeyChange::Replace => {
                clauses.push("DROP PRIMARY KEY".to_string());
                clauses.push(format!("ADD PRIMARY KEY ({})", self.join_quoted(&model.keys)));
            }
            PrimaryKeyChange::Add => {
                clauses.push(format!("ADD PRIMARY KEY ({})", self.join_quoted(&model.keys)));
            }
        }

        if clauses.is_empty() {
            return None;
        }

        let mut sql = format!("ALTER TABLE {}", self.quote_ident(&model.name));
        for (i, clause) in clauses.iter().enumerate() {
            sql.push_str("\n\t");
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(clause);
        }
        sql.push(';');
        Some(sql)
    }

    fn build_upsert(&self, model: &TableModel) -> RenderCache {
        let mut params: Vec<ParamSpec> = model
            .columns
            .iter()
            .map(|c| ParamSpec {
                property: c.property.clone(),
                column: c.name.clone(),
                sql_type: c.sql_type.clone(),
                is_metadata: false,
            })
            .collect();
        params.extend(UPSERT_METADATA.iter().map(|(name, sql_type)| ParamSpec {
            property: name.to_string(),
            column: name.to_string(),
            sql_type: sql_type.clone(),
            is_metadata: true,
        }));

        let mut data_cols = self.join_quoted(model.columns.iter().map(|c| &c.name));
        if !data_cols.is_empty() {
            data_cols.push(',');
        }
        let meta_cols = UPSERT_METADATA
            .iter()
            .map(|(n, _)| self.quote_ident(n))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=params.len())
            .map(|i| self.param_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");

        let update_set = model
            .non_key_columns()
            .map(|c| c.name.as_str())
            .chain(UPSERT_METADATA.iter().map(|(n, _)| *n))
            .map(|n| format!("{} = VALUES({})", self.quote_ident(n), self.quote_ident(n)))
            .collect::<Vec<_>>()
            .join(",\n\t\t");

        let upsert_sql = format!(
            "INSERT INTO {} ({}\n\t{})\n\tVALUES ({})\n\tON DUPLICATE KEY UPDATE\n\t\t{};",
            self.quote_ident(&model.name),
            data_cols,
            meta_cols,
            placeholders,
            update_set
        );

        RenderCache { upsert_sql, params }
    }
}
