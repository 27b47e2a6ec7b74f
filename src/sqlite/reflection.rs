use std::collections::BTreeMap;

use regex::Regex;
use rusqlite::Connection;

use crate::error::SqlGatewayError;
use crate::reflection::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};

use super::errors::translate;

/// Name `SQLite` gives the implicit primary key of a table without an explicit index.
pub const IMPLICIT_ROWID_INDEX: &str = "ROWID";

fn rows<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, SqlGatewayError> {
    let run = || -> rusqlite::Result<Vec<T>> {
        let mut stmt = conn.prepare(sql)?;
        let collected = stmt.query_map(params, map)?.collect::<rusqlite::Result<Vec<T>>>();
        collected
    };
    run().map_err(|e| translate(e, sql, &[]))
}

pub(crate) fn get_tables(conn: &Connection) -> Result<Vec<TableInfo>, SqlGatewayError> {
    rows(
        conn,
        "SELECT name, type = 'view' AS view FROM sqlite_master WHERE type IN ('table', 'view') \
         AND name NOT LIKE 'sqlite_%' \
         UNION ALL \
         SELECT name, type = 'view' AS view FROM sqlite_temp_master WHERE type IN ('table', 'view') \
         AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
        &[],
        |row| {
            Ok(TableInfo {
                name: row.get(0)?,
                view: row.get(1)?,
            })
        },
    )
}

/// Original `CREATE TABLE` text, from the permanent or the temporary catalog.
fn table_ddl(conn: &Connection, table: &str) -> Result<Option<String>, SqlGatewayError> {
    let ddl = rows(
        conn,
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 \
         UNION ALL \
         SELECT sql FROM sqlite_temp_master WHERE type = 'table' AND name = ?1",
        &[&table],
        |row| row.get::<_, Option<String>>(0),
    )?;
    Ok(ddl.into_iter().flatten().next())
}

/// Does the DDL declare `column` as `... PRIMARY KEY AUTOINCREMENT`?
///
/// `SQLite` keeps no catalog flag for this, so the declaration text is matched.
#[must_use]
pub fn declares_autoincrement(ddl: &str, column: &str) -> bool {
    let name = regex::escape(column);
    let pattern = format!(
        r#"(?i)(?:^|[\s(,])(?:"{name}"|\[{name}\]|`{name}`|{name})\s+[^,]+?\s+PRIMARY\s+KEY\s+AUTOINCREMENT"#
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(ddl))
}

pub(crate) fn get_columns(
    conn: &Connection,
    table: &str,
    delimited: &str,
) -> Result<Vec<ColumnInfo>, SqlGatewayError> {
    let ddl = table_ddl(conn, table)?.unwrap_or_default();
    let pragma = format!("PRAGMA table_info({delimited})");
    let raw = rows(conn, &pragma, &[], |row| {
        Ok((
            row.get::<_, String>("name")?,
            row.get::<_, String>("type")?,
            row.get::<_, i64>("notnull")?,
            row.get::<_, Option<String>>("dflt_value")?,
            row.get::<_, i64>("pk")?,
        ))
    })?;

    Ok(raw
        .into_iter()
        .map(|(name, declared, notnull, default, pk)| {
            let mut parts = declared.splitn(2, '(');
            let native_type = parts.next().unwrap_or_default().trim().to_uppercase();
            let size = parts
                .next()
                .and_then(|rest| rest.split([',', ')']).next())
                .and_then(|n| n.trim().parse::<u32>().ok());
            let primary = pk > 0;
            ColumnInfo {
                autoincrement: primary && declares_autoincrement(&ddl, &name),
                full_name: format!("{table}.{name}"),
                table: table.to_owned(),
                name,
                native_type,
                size,
                nullable: notnull == 0,
                default,
                primary,
            }
        })
        .collect())
}

pub(crate) fn get_indexes(
    conn: &Connection,
    table: &str,
    delimited: &str,
    delimite: impl Fn(&str) -> String,
) -> Result<Vec<IndexInfo>, SqlGatewayError> {
    let list_sql = format!("PRAGMA index_list({delimited})");
    let listed = rows(conn, &list_sql, &[], |row| {
        Ok((row.get::<_, String>("name")?, row.get::<_, bool>("unique")?))
    })?;

    let columns = get_columns(conn, table, delimited)?;
    let mut indexes = Vec::with_capacity(listed.len());
    for (name, unique) in listed {
        let info_sql = format!("PRAGMA index_info({})", delimite(&name));
        let mut members = rows(conn, &info_sql, &[], |row| {
            Ok((
                row.get::<_, i64>("seqno")?,
                row.get::<_, Option<String>>("name")?,
            ))
        })?;
        members.sort_by_key(|(seqno, _)| *seqno);
        let index_columns: Vec<String> = members.into_iter().filter_map(|(_, n)| n).collect();

        let primary = index_columns.first().is_some_and(|first| {
            columns
                .iter()
                .find(|c| c.name == *first)
                .is_some_and(|c| c.primary)
        });
        indexes.push(IndexInfo {
            name,
            unique,
            primary,
            columns: index_columns,
        });
    }

    if indexes.is_empty()
        && let Some(pk) = columns.iter().find(|c| c.primary)
    {
        indexes.push(IndexInfo {
            name: IMPLICIT_ROWID_INDEX.to_owned(),
            unique: true,
            primary: true,
            columns: vec![pk.name.clone()],
        });
    }
    Ok(indexes)
}

pub(crate) fn get_foreign_keys(
    conn: &Connection,
    delimited: &str,
) -> Result<Vec<ForeignKeyInfo>, SqlGatewayError> {
    let pragma = format!("PRAGMA foreign_key_list({delimited})");
    let raw = rows(conn, &pragma, &[], |row| {
        Ok((
            row.get::<_, i64>("id")?,
            row.get::<_, i64>("seq")?,
            row.get::<_, String>("table")?,
            row.get::<_, String>("from")?,
            row.get::<_, Option<String>>("to")?,
            row.get::<_, String>("on_update")?,
            row.get::<_, String>("on_delete")?,
        ))
    })?;

    let mut keys: BTreeMap<i64, (ForeignKeyInfo, Vec<(i64, String, Option<String>)>)> =
        BTreeMap::new();
    for (id, seq, referenced, from, to, on_update, on_delete) in raw {
        let entry = keys.entry(id).or_insert_with(|| {
            (
                ForeignKeyInfo {
                    name: id.to_string(),
                    local: Vec::new(),
                    table: referenced,
                    foreign: None,
                    on_delete,
                    on_update,
                },
                Vec::new(),
            )
        });
        entry.1.push((seq, from, to));
    }

    Ok(keys
        .into_values()
        .map(|(mut key, mut members)| {
            members.sort_by_key(|(seq, _, _)| *seq);
            let implicit_target = members.first().is_some_and(|(_, _, to)| to.is_none());
            let (local, foreign): (Vec<String>, Vec<Option<String>>) =
                members.into_iter().map(|(_, from, to)| (from, to)).unzip();
            key.local = local;
            key.foreign = if implicit_target {
                None
            } else {
                Some(foreign.into_iter().flatten().collect())
            };
            key
        })
        .collect())
}
