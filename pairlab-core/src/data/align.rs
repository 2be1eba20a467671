//! Multi-symbol time alignment.
//!
//! Given close series for multiple symbols, align them to a common timeline.
//! Missing observations are forward-filled from the last known close of the same
//! symbol, never backward-filled. Rows where some symbol has not produced its
//! first observation yet are dropped, so a late starter gets no synthetic history.

use crate::domain::PricePoint;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Close prices for several symbols on one shared date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Closes per symbol; each inner Vec has the same length as `dates`.
    pub closes: HashMap<String, Vec<f64>>,
    /// Symbols included, in configuration order.
    pub symbols: Vec<String>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Align `symbols` onto the union of their dates with forward fill.
///
/// Each input series must already be sorted ascending with unique dates
/// (the feed validates this before calling). Symbols absent from `series`
/// are treated as empty, which drops every row.
pub fn forward_fill_align(
    series: &HashMap<String, Vec<PricePoint>>,
    symbols: &[String],
) -> AlignedSeries {
    // Collect the union of all dates
    let all_dates: BTreeSet<NaiveDate> = symbols
        .iter()
        .filter_map(|s| series.get(s))
        .flat_map(|points| points.iter().map(|p| p.date))
        .collect();
    let union: Vec<NaiveDate> = all_dates.into_iter().collect();

    // Walk each symbol's own series once, carrying the last known close forward.
    let mut filled: Vec<Vec<Option<f64>>> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let points = series.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
        let mut cursor = 0;
        let mut last: Option<f64> = None;
        let column = union
            .iter()
            .map(|date| {
                while cursor < points.len() && points[cursor].date <= *date {
                    last = Some(points[cursor].close);
                    cursor += 1;
                }
                last
            })
            .collect();
        filled.push(column);
    }

    // Keep only rows where every symbol has a value.
    let mut dates = Vec::with_capacity(union.len());
    let mut closes: HashMap<String, Vec<f64>> = symbols
        .iter()
        .map(|s| (s.clone(), Vec::with_capacity(union.len())))
        .collect();

    for (row, date) in union.iter().enumerate() {
        if filled.iter().any(|column| column[row].is_none()) {
            continue;
        }
        dates.push(*date);
        for (symbol, column) in symbols.iter().zip(&filled) {
            if let (Some(out), Some(close)) = (closes.get_mut(symbol), column[row]) {
                out.push(close);
            }
        }
    }

    AlignedSeries {
        dates,
        closes,
        symbols: symbols.to_vec(),
    }
}
