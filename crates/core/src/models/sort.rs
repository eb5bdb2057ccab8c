use std::cmp::Ordering;

/// Sortable columns of the holdings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingField {
    DayProfit,
    Amount,
    Change,
}

/// Sortable columns of the watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchField {
    Change,
    Name,
}

/// Sortable columns of the sector overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorField {
    ChangePercent,
    StreakDays,
}

/// Session-transient sort selection for one list. Not persisted; every
/// session starts back at descending-by-primary-metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<F> {
    pub field: F,
    pub ascending: bool,
}

impl<F: PartialEq> SortState<F> {
    /// Selecting the active field flips direction; selecting a new field
    /// switches to it, descending.
    pub fn select(&mut self, field: F) {
        if self.field == field {
            self.ascending = !self.ascending;
        } else {
            self.field = field;
            self.ascending = false;
        }
    }
}

impl Default for SortState<HoldingField> {
    fn default() -> Self {
        Self {
            field: HoldingField::DayProfit,
            ascending: false,
        }
    }
}

impl Default for SortState<WatchField> {
    fn default() -> Self {
        Self {
            field: WatchField::Change,
            ascending: false,
        }
    }
}

impl Default for SortState<SectorField> {
    fn default() -> Self {
        Self {
            field: SectorField::ChangePercent,
            ascending: false,
        }
    }
}

/// Sort rows by an extracted key, honoring direction. Incomparable pairs
/// (NaN keys) are left in place.
pub fn sort_rows_by<T, K, F>(rows: &mut [T], ascending: bool, key: F)
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    rows.sort_by(|a, b| {
        let ord = key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}
