//! Searchable, filterable, sortable, paginated view over a [`Table`].
//!
//! The view never copies cells; it resolves to a list of row indices in
//! display order and pages over that list.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;

use crate::data::{Table, Value};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl FromStr for SortSpec {
    type Err = anyhow::Error;

    /// Parses `column` or `column:asc|desc`.
    fn from_str(raw: &str) -> Result<Self> {
        let (column, direction) = match raw.rsplit_once(':') {
            Some((column, dir)) => {
                let direction = match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    other => bail!("Unknown sort direction '{other}' (expected asc or desc)"),
                };
                (column, direction)
            }
            None => (raw, SortDirection::Asc),
        };
        let column = column.trim();
        if column.is_empty() {
            bail!("Sort specification '{raw}' is missing a column name");
        }
        Ok(Self {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.direction.as_str())
    }
}

/// Parses `column=value` filter arguments.
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Filter '{raw}' must look like column=value"))?;
    let column = column.trim();
    if column.is_empty() {
        bail!("Filter '{raw}' is missing a column name");
    }
    Ok((column.to_string(), value.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// 1-based page number, clamped into range.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub rows: Vec<usize>,
}

#[derive(Debug)]
pub struct TableView<'a> {
    table: &'a Table,
    search: String,
    filters: BTreeMap<String, BTreeSet<String>>,
    sort: Option<SortSpec>,
    hidden: BTreeSet<usize>,
}

impl<'a> TableView<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            search: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            hidden: BTreeSet::new(),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn hide_column(&mut self, column: &str) -> Result<()> {
        let idx = self.require_column(column)?;
        self.hidden.insert(idx);
        Ok(())
    }

    pub fn show_column(&mut self, column: &str) -> Result<()> {
        let idx = self.require_column(column)?;
        self.hidden.remove(&idx);
        Ok(())
    }

    /// Shows exactly `columns` and hides the rest. Table order is kept.
    pub fn set_visible_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<()> {
        let keep = columns
            .iter()
            .map(|c| self.require_column(c.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        self.hidden = (0..self.table.column_count())
            .filter(|idx| !keep.contains(idx))
            .collect();
        Ok(())
    }

    /// Indices of visible columns in table order.
    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.table.column_count())
            .filter(|idx| !self.hidden.contains(idx))
            .collect()
    }

    pub fn visible_headers(&self) -> Vec<String> {
        self.visible_columns()
            .into_iter()
            .map(|idx| self.table.columns()[idx].clone())
            .collect()
    }

    /// Visible cells of row `row`.
    pub fn visible_cells(&self, row: usize) -> Vec<&'a Value> {
        let cells = &self.table.rows()[row];
        self.visible_columns()
            .into_iter()
            .map(|idx| &cells[idx])
            .collect()
    }

    /// Search only looks at visible columns.
    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_lowercase();
    }

    /// Allows `value` for `column`. Values for one column are OR-ed; columns
    /// are AND-ed.
    pub fn add_filter(&mut self, column: &str, value: &str) -> Result<()> {
        self.require_column(column)?;
        self.filters
            .entry(column.to_string())
            .or_default()
            .insert(value.to_string());
        Ok(())
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> Result<()> {
        if let Some(spec) = &sort {
            self.require_column(&spec.column)?;
        }
        self.sort = sort;
        Ok(())
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Cycles `column` through ascending, descending, and unsorted. Picking a
    /// different column starts it at ascending.
    pub fn toggle_sort(&mut self, column: &str) -> Result<()> {
        self.require_column(column)?;
        self.sort = match self.sort.take() {
            Some(spec) if spec.column == column => match spec.direction {
                SortDirection::Asc => Some(SortSpec {
                    column: spec.column,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                column: column.to_string(),
                direction: SortDirection::Asc,
            }),
        };
        Ok(())
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.table
            .column_index(column)
            .with_context(|| format!("Column '{column}' not found in {}", self.table.file_name()))
    }

    fn matches(&self, row: &[Value]) -> bool {
        if !self.search.is_empty()
            && !row
                .iter()
                .enumerate()
                .filter(|(idx, _)| !self.hidden.contains(idx))
                .any(|(_, cell)| cell.as_display().to_lowercase().contains(&self.search))
        {
            return false;
        }
        self.filters.iter().all(|(column, allowed)| {
            self.table
                .column_index(column)
                .and_then(|idx| row.get(idx))
                .is_some_and(|cell| allowed.contains(&cell.as_display()))
        })
    }

    /// Indices of matching rows in display order.
    pub fn rows(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(idx, _)| idx)
            .collect();
        if let Some(spec) = &self.sort
            && let Some(col) = self.table.column_index(&spec.column)
        {
            let rows = self.table.rows();
            indices.sort_by(|a, b| {
                let ordering = compare_cells(&rows[*a][col], &rows[*b][col]);
                match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        indices
    }

    /// One page of matching rows; `page` is 1-based and clamped.
    pub fn page(&self, page: usize, page_size: usize) -> Page {
        let page_size = page_size.max(1);
        let matching = self.rows();
        let total_rows = matching.len();
        let total_pages = total_rows.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);
        let rows = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Page {
            page,
            page_size,
            total_pages,
            total_rows,
            rows,
        }
    }

    /// Sorted distinct display values of `column`, for filter menus.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let idx = self.require_column(column)?;
        let values: BTreeSet<String> = self
            .table
            .rows()
            .iter()
            .map(|row| row[idx].as_display())
            .collect();
        Ok(values.into_iter().collect())
    }
}

/// Numbers compare numerically when both cells are numbers; everything else
/// compares by display string.
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        _ => a.as_display().cmp(&b.as_display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let rows = vec![
            vec![Value::Text("North".into()), Value::Number(10.0)],
            vec![Value::Text("South".into()), Value::Number(2.0)],
            vec![Value::Text("north-east".into()), Value::Number(30.0)],
        ];
        Table::new("t.csv", vec!["region".into(), "amount".into()], rows)
    }

    #[test]
    fn parses_sort_specs() {
        let spec: SortSpec = "amount:desc".parse().unwrap();
        assert_eq!(spec.direction, SortDirection::Desc);
        let spec: SortSpec = "amount".parse().unwrap();
        assert_eq!(spec.to_string(), "amount:asc");
        assert!("amount:up".parse::<SortSpec>().is_err());
        assert!(":asc".parse::<SortSpec>().is_err());
    }

    #[test]
    fn search_is_case_insensitive() {
        let t = table();
        let mut view = TableView::new(&t);
        view.set_search("NORTH");
        assert_eq!(view.rows(), vec![0, 2]);
    }

    #[test]
    fn search_skips_hidden_columns() {
        let t = table();
        let mut view = TableView::new(&t);
        view.set_search("30");
        assert_eq!(view.rows(), vec![2]);
        view.hide_column("amount").unwrap();
        assert!(view.rows().is_empty());
        assert_eq!(view.visible_headers(), vec!["region"]);
        assert_eq!(view.visible_cells(2), vec![&Value::Text("north-east".into())]);
        view.show_column("amount").unwrap();
        assert_eq!(view.rows(), vec![2]);
        assert!(view.hide_column("missing").is_err());
    }

    #[test]
    fn visible_columns_keep_table_order() {
        let t = table();
        let mut view = TableView::new(&t);
        view.set_visible_columns(&["amount", "region"]).unwrap();
        assert_eq!(view.visible_columns(), vec![0, 1]);
        view.set_visible_columns(&["amount"]).unwrap();
        assert_eq!(view.visible_columns(), vec![1]);
        assert!(view.set_visible_columns(&["nope"]).is_err());
        assert_eq!(view.visible_columns(), vec![1]);
    }

    #[test]
    fn numeric_sort_is_numeric() {
        let t = table();
        let mut view = TableView::new(&t);
        view.toggle_sort("amount").unwrap();
        assert_eq!(view.rows(), vec![1, 0, 2]);
        view.toggle_sort("amount").unwrap();
        assert_eq!(view.rows(), vec![2, 0, 1]);
        view.toggle_sort("amount").unwrap();
        assert!(view.sort().is_none());
        assert_eq!(view.rows(), vec![0, 1, 2]);
    }

    #[test]
    fn filters_combine() {
        let t = table();
        let mut view = TableView::new(&t);
        view.add_filter("region", "South").unwrap();
        view.add_filter("region", "North").unwrap();
        assert_eq!(view.rows(), vec![0, 1]);
        view.add_filter("amount", "2").unwrap();
        assert_eq!(view.rows(), vec![1]);
        assert!(view.add_filter("missing", "x").is_err());
    }

    #[test]
    fn pages_clamp_into_range() {
        let t = table();
        let view = TableView::new(&t);
        let page = view.page(9, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.rows, vec![2]);
        assert_eq!(view.distinct_values("region").unwrap(), vec!["North", "South", "north-east"]);
    }
}
