//! Single-column sort orders encoded as `Field` / `Field_desc` parameters.

use crate::errors::AppError;

const DESC_SUFFIX: &str = "_desc";

/// A sortable column of some listing.
pub trait SortField: Copy + PartialEq + std::fmt::Debug {
    /// Field used when the request names none.
    const DEFAULT: Self;

    /// Parse the public field name (e.g. `LastName`).
    fn parse(name: &str) -> Option<Self>;

    /// Public field name used in sort parameters.
    fn name(self) -> &'static str;

    /// SQL column backing this field.
    fn column(self) -> &'static str;
}

/// Sort by exactly one field, ascending or descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<F> {
    pub field: F,
    pub descending: bool,
}

impl<F: SortField> Default for SortOrder<F> {
    fn default() -> Self {
        Self {
            field: F::DEFAULT,
            descending: false,
        }
    }
}

impl<F: SortField> SortOrder<F> {
    pub fn ascending(field: F) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: F) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Parse a sort parameter. Absent or blank means "no explicit sort".
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, AppError> {
        let raw = match raw.map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => return Ok(None),
        };

        let (name, descending) = match raw.strip_suffix(DESC_SUFFIX) {
            Some(name) => (name, true),
            None => (raw, false),
        };

        F::parse(name)
            .map(|field| Some(Self { field, descending }))
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown sort order '{}'", raw)))
    }

    /// Encode back into the parameter form.
    pub fn to_param(&self) -> String {
        if self.descending {
            format!("{}{}", self.field.name(), DESC_SUFFIX)
        } else {
            self.field.name().to_string()
        }
    }

    /// `ORDER BY` fragment; only whitelisted columns ever reach SQL.
    pub fn order_by_sql(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}", self.field.column(), direction)
    }

    /// Parameter a column header should link to given the current sort.
    ///
    /// The default field flips between ascending (empty parameter) and
    /// descending. Any other field flips between `Field` and `Field_desc`.
    pub fn toggle_param(current: Option<&Self>, field: F) -> String {
        if field == F::DEFAULT {
            return match current {
                None => Self::descending(field).to_param(),
                Some(_) => String::new(),
            };
        }

        match current {
            Some(c) if *c == Self::ascending(field) => Self::descending(field).to_param(),
            _ => Self::ascending(field).to_param(),
        }
    }
}
