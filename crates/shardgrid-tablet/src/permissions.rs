//! Grant-table snapshots and their comparison.
//!
//! A snapshot holds the `mysql.user` and `mysql.db` tables as an ordered
//! column list plus rows. Two snapshots are compared table by table: the
//! column lists must be identical, and the rows, de-duplicated and keyed
//! by their identifying columns, must match as sets. Row order is never
//! significant.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Query used to read the user grant table.
pub const USER_QUERY: &str = "SELECT * FROM mysql.user ORDER BY host, user";

/// Query used to read the database grant table.
pub const DB_QUERY: &str = "SELECT * FROM mysql.db ORDER BY host, db, user";

/// One table as returned by a query: ordered columns plus rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSnapshot {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, builder style.
    pub fn with_row<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Value of `column` in `row`. Missing columns and short rows read as "".
    fn value<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn row_key(&self, row: &[String], key_columns: &[&str]) -> String {
        key_columns
            .iter()
            .map(|c| self.value(row, c))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Distinct rows grouped by key.
    fn keyed_rows(&self, key_columns: &[&str]) -> BTreeMap<String, BTreeSet<&[String]>> {
        let mut keyed: BTreeMap<String, BTreeSet<&[String]>> = BTreeMap::new();
        for row in &self.rows {
            keyed
                .entry(self.row_key(row, key_columns))
                .or_default()
                .insert(row.as_slice());
        }
        keyed
    }
}

/// Both grant tables of one tablet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub user: TableSnapshot,
    pub db: TableSnapshot,
}

impl PermissionSnapshot {
    fn table(&self, table: PermissionTable) -> &TableSnapshot {
        match table {
            PermissionTable::User => &self.user,
            PermissionTable::Db => &self.db,
        }
    }
}

/// Which grant table a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionTable {
    User,
    Db,
}

impl PermissionTable {
    /// Columns identifying one grant.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            PermissionTable::User => &["Host", "User"],
            PermissionTable::Db => &["Host", "Db", "User"],
        }
    }
}

impl fmt::Display for PermissionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionTable::User => "user",
            PermissionTable::Db => "db permission",
        })
    }
}

/// A single difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDiff {
    pub table: PermissionTable,
    pub message: String,
}

impl fmt::Display for PermissionDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Compare two snapshots; an empty result means they match.
///
/// Findings name the tablet holding the surplus column or grant, e.g.
/// `"cell1-0000000001 has an extra user %:vt_app"`.
pub fn diff_permissions(
    left_name: &str,
    left: &PermissionSnapshot,
    right_name: &str,
    right: &PermissionSnapshot,
) -> Vec<PermissionDiff> {
    let mut diffs = Vec::new();
    for table in [PermissionTable::User, PermissionTable::Db] {
        diff_table(
            table,
            left_name,
            left.table(table),
            right_name,
            right.table(table),
            &mut diffs,
        );
    }
    diffs
}

fn diff_table(
    table: PermissionTable,
    left_name: &str,
    left: &TableSnapshot,
    right_name: &str,
    right: &TableSnapshot,
    diffs: &mut Vec<PermissionDiff>,
) {
    let mut push = |message: String| diffs.push(PermissionDiff { table, message });

    if left.columns != right.columns {
        let mut extra = false;
        for (name, own, other) in [
            (left_name, &left.columns, &right.columns),
            (right_name, &right.columns, &left.columns),
        ] {
            for column in own.iter().filter(|c| !other.contains(c)) {
                extra = true;
                push(format!("{name} has an extra {table} column {column}"));
            }
        }
        if !extra {
            push(format!(
                "{table} schema mismatch: {left_name} has columns {:?}, {right_name} has columns {:?}",
                left.columns, right.columns
            ));
        }
        // Rows can't be compared across different schemas.
        return;
    }

    let key_columns = table.key_columns();
    let left_rows = left.keyed_rows(key_columns);
    let right_rows = right.keyed_rows(key_columns);

    for (key, rows) in &left_rows {
        match right_rows.get(key) {
            None => push(format!("{left_name} has an extra {table} {key}")),
            Some(other) if other != rows => push(format!(
                "permissions differ on {table} {key}: {left_name} has {:?}, {right_name} has {:?}",
                rows, other
            )),
            Some(_) => {}
        }
    }
    for key in right_rows.keys().filter(|k| !left_rows.contains_key(*k)) {
        push(format!("{right_name} has an extra {table} {key}"));
    }
}
