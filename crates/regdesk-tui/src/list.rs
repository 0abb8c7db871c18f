// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

pub const EMPTY_MESSAGE: &str = "Нет данных для отображения";

/// Raw value of one record field, before any column transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Integer(i64),
    Flag(bool),
}

impl FieldValue<'_> {
    pub fn text(value: Option<&str>) -> FieldValue<'_> {
        value.map_or(FieldValue::Missing, FieldValue::Text)
    }

    pub fn integer(value: Option<i64>) -> FieldValue<'static> {
        value.map_or(FieldValue::Missing, FieldValue::Integer)
    }

    pub fn flag(value: Option<bool>) -> FieldValue<'static> {
        value.map_or(FieldValue::Missing, FieldValue::Flag)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(*value),
            Self::Missing | Self::Integer(_) | Self::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            Self::Missing | Self::Text(_) | Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Missing | Self::Text(_) | Self::Flag(_) => None,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Text(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
        }
    }
}

/// A record the list view can render by field key.
pub trait ListRow {
    fn row_id(&self) -> i64;
    fn field(&self, key: &str) -> FieldValue<'_>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAction {
    DeleteTemplate,
}

/// Cell transform; receives the raw field value and the whole row.
pub type CellRender<T> = Box<dyn Fn(FieldValue<'_>, &T) -> String>;

pub struct Column<T> {
    pub header: &'static str,
    pub key: &'static str,
    pub render: Option<CellRender<T>>,
    /// Cells of an action column trigger the action instead of the row click.
    pub action: Option<ColumnAction>,
}

impl<T> Column<T> {
    pub fn plain(header: &'static str, key: &'static str) -> Self {
        Self {
            header,
            key,
            render: None,
            action: None,
        }
    }

    pub fn rendered<F>(header: &'static str, key: &'static str, render: F) -> Self
    where
        F: Fn(FieldValue<'_>, &T) -> String + 'static,
    {
        Self {
            header,
            key,
            render: Some(Box::new(render)),
            action: None,
        }
    }

    pub fn action<F>(
        header: &'static str,
        key: &'static str,
        render: F,
        action: ColumnAction,
    ) -> Self
    where
        F: Fn(FieldValue<'_>, &T) -> String + 'static,
    {
        Self {
            header,
            key,
            render: Some(Box::new(render)),
            action: Some(action),
        }
    }
}

impl<T: ListRow> Column<T> {
    pub fn cell(&self, row: &T) -> String {
        let value = row.field(self.key);
        match &self.render {
            Some(render) => render(value, row),
            None => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    pub id: i64,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListProjection {
    pub headers: Vec<&'static str>,
    pub actions: Vec<Option<ColumnAction>>,
    pub rows: Vec<ProjectedRow>,
    pub clickable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListBody {
    Empty(&'static str),
    Table(ListProjection),
}

/// Renders rows through the column descriptors. Absent or empty input
/// yields only the empty-state message.
pub fn project<T: ListRow>(rows: Option<&[T]>, columns: &[Column<T>], clickable: bool) -> ListBody {
    let Some(rows) = rows.filter(|rows| !rows.is_empty()) else {
        return ListBody::Empty(EMPTY_MESSAGE);
    };

    ListBody::Table(ListProjection {
        headers: columns.iter().map(|column| column.header).collect(),
        actions: columns.iter().map(|column| column.action).collect(),
        rows: rows
            .iter()
            .map(|row| ProjectedRow {
                id: row.row_id(),
                cells: columns.iter().map(|column| column.cell(row)).collect(),
            })
            .collect(),
        clickable,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Action { action: ColumnAction, row_id: i64 },
    RowClicked(i64),
}

impl ListProjection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// What activating `column` of row `row` does. An action cell never
    /// also counts as a row click.
    pub fn activate(&self, row: usize, column: usize) -> Option<Activation> {
        let row_id = self.rows.get(row)?.id;
        if let Some(Some(action)) = self.actions.get(column) {
            return Some(Activation::Action {
                action: *action,
                row_id,
            });
        }
        self.clickable.then_some(Activation::RowClicked(row_id))
    }

    pub fn action_column(&self) -> Option<usize> {
        self.actions.iter().position(Option::is_some)
    }
}
