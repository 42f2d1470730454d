//! Create/read/update/delete statements, generic over the record type

use std::collections::BTreeMap;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

use super::{columns, ListFilter, Store};
use crate::core::entity::Record;
use crate::core::error::{BmsError, Result};

/// Column list used by every SELECT so `Record::from_row` sees the same shape
fn select_list<R: Record>() -> String {
    format!("id, {}, created_at, updated_at", R::COLUMNS.join(", "))
}

/// Build the WHERE clause for a filter, checking column names first
fn where_clause<R: Record>(filter: &ListFilter) -> Result<(String, Vec<Value>)> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    for (column, value) in &filter.conditions {
        if !R::COLUMNS.contains(&column.as_str()) {
            return Err(BmsError::UnknownColumn {
                kind: R::KIND,
                column: column.clone(),
            });
        }
        values.push(Value::Text(value.clone()));
        clauses.push(format!("{} = ?{}", column, values.len()));
    }

    if let Some(search) = &filter.search {
        let escaped = search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        values.push(Value::Text(format!("%{}%", escaped)));
        clauses.push(format!(
            "{} LIKE ?{} ESCAPE '\\'",
            R::TITLE_COLUMN,
            values.len()
        ));
    }

    if clauses.is_empty() {
        Ok((String::new(), values))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
    }
}

impl Store {
    /// Insert a new record and return it with id and timestamps populated
    ///
    /// Any id already present on `record` is ignored; the store assigns a
    /// fresh one that is never reused.
    pub fn create<R: Record>(&self, record: R) -> Result<R> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(BmsError::validation(R::KIND, errors));
        }

        let now = columns::now();
        let mut values = record.to_sql_values();
        values.push(columns::timestamp(&now));
        values.push(columns::timestamp(&now));

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}, created_at, updated_at) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(values))?;

        let id = self.conn.last_insert_rowid();
        log::debug!("created {} {}", R::KIND, id);

        // Returned as stored, at column precision
        self.get(id)
    }

    /// Fetch a record by id
    pub fn get<R: Record>(&self, id: i64) -> Result<R> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            select_list::<R>(),
            R::TABLE
        );
        self.conn
            .query_row(&sql, params![id], |row| R::from_row(row))
            .optional()?
            .ok_or(BmsError::NotFound { kind: R::KIND, id })
    }

    /// Whether a record with this id exists
    pub fn exists<R: Record>(&self, id: i64) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", R::TABLE);
        let found: Option<i64> = self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// All records matching `filter`, in the filter's order
    pub fn list<R: Record>(&self, filter: &ListFilter) -> Result<Vec<R>> {
        let (where_sql, mut values) = where_clause::<R>(filter)?;
        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            select_list::<R>(),
            R::TABLE,
            where_sql,
            filter.order.sql()
        );
        if let Some(limit) = filter.limit {
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| R::from_row(row))?;
        let records: Vec<R> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(records)
    }

    /// Number of records matching `filter` (order and limit are ignored)
    pub fn count<R: Record>(&self, filter: &ListFilter) -> Result<usize> {
        let (where_sql, values) = where_clause::<R>(filter)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", R::TABLE, where_sql);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Apply `patch` to an existing record and persist it
    ///
    /// Fails with `NotFound` before touching the store if the id is absent,
    /// and with `Validation` if the patched record breaks a field rule.
    pub fn update<R: Record>(&self, id: i64, patch: R::Patch) -> Result<R> {
        let mut record: R = self.get(id)?;
        record.apply(patch);

        let errors = record.validate();
        if !errors.is_empty() {
            return Err(BmsError::validation(R::KIND, errors));
        }

        let now = columns::now();
        let mut values = record.to_sql_values();
        let assignments: Vec<String> = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        values.push(columns::timestamp(&now));
        let updated_idx = values.len();
        values.push(Value::Integer(id));
        let id_idx = values.len();

        let sql = format!(
            "UPDATE {} SET {}, updated_at = ?{} WHERE id = ?{}",
            R::TABLE,
            assignments.join(", "),
            updated_idx,
            id_idx
        );
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(BmsError::NotFound { kind: R::KIND, id });
        }

        log::debug!("updated {} {}", R::KIND, id);

        self.get(id)
    }

    /// Hard-delete a record
    pub fn delete<R: Record>(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        let changed = self.conn.execute(&sql, params![id])?;
        if changed == 0 {
            return Err(BmsError::NotFound { kind: R::KIND, id });
        }
        log::debug!("deleted {} {}", R::KIND, id);
        Ok(())
    }

    /// Record count per status value
    pub fn status_counts<R: Record>(&self) -> Result<BTreeMap<String, usize>> {
        let sql = format!(
            "SELECT {col}, COUNT(*) FROM {table} GROUP BY {col}",
            col = R::STATUS_COLUMN,
            table = R::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, usize::try_from(count).unwrap_or(0)))
        })?;
        let counts: BTreeMap<String, usize> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(counts)
    }
}
