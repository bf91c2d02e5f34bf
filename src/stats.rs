//! Descriptive statistics and correlation over numeric columns.
//!
//! Missing values are skipped. Values that cannot be computed (the mean of
//! nothing, the spread of a single value, the correlation of a constant
//! column) are `None` rather than NaN.

use serde::Serialize;

use crate::table::Table;

/// Decimal places kept in the summary table
pub const SUMMARY_DECIMALS: i32 = 3;

/// Count, mean, spread and quartiles of one column
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Pairwise Pearson coefficients, `values[i][j]` pairs `columns[i]` with
/// `columns[j]`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Linear-interpolated quantile of already sorted values
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Summary of one column's values, unrounded
pub fn summarize(column: &str, values: &[Option<f64>]) -> ColumnSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    let std = match (mean, count) {
        (Some(m), n) if n > 1 => {
            let ss: f64 = present.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: present.first().copied(),
        q25: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        q75: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

/// Summary table for the given columns, rounded for display. Non-numeric
/// and unknown columns are skipped.
pub fn describe(table: &Table, columns: &[String]) -> Vec<ColumnSummary> {
    let round = |v: Option<f64>| v.map(|x| round_to(x, SUMMARY_DECIMALS));
    columns
        .iter()
        .filter_map(|name| {
            let values = table.column(name)?.as_numeric()?;
            let s = summarize(name, values);
            Some(ColumnSummary {
                mean: round(s.mean),
                std: round(s.std),
                min: round(s.min),
                q25: round(s.q25),
                median: round(s.median),
                q75: round(s.q75),
                max: round(s.max),
                ..s
            })
        })
        .collect()
}

/// Pearson correlation over the rows where both values are present
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation matrix of the given numeric columns
pub fn correlation(table: &Table, columns: &[String]) -> CorrelationMatrix {
    let series: Vec<(&String, &[Option<f64>])> = columns
        .iter()
        .filter_map(|name| Some((name, table.column(name)?.as_numeric()?)))
        .collect();

    CorrelationMatrix {
        columns: series.iter().map(|(name, _)| (*name).clone()).collect(),
        values: series
            .iter()
            .map(|(_, xs)| series.iter().map(|(_, ys)| pearson(xs, ys)).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn summary_matches_known_values() {
        let values: Vec<Option<f64>> = vec![Some(4.0), Some(1.0), None, Some(3.0), Some(2.0)];
        let s = summarize("x", &values);
        assert_eq!(s.count, 4);
        assert!(close(s.mean, 2.5));
        assert!(close(s.std, (5.0f64 / 3.0).sqrt()));
        assert_eq!(s.min, Some(1.0));
        assert!(close(s.q25, 1.75));
        assert!(close(s.median, 2.5));
        assert!(close(s.q75, 3.25));
        assert_eq!(s.max, Some(4.0));
    }

    #[test]
    fn summary_of_tiny_columns() {
        let empty = summarize("e", &[None, None]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.min, None);

        let one = summarize("o", &[Some(7.0)]);
        assert_eq!(one.mean, Some(7.0));
        assert_eq!(one.std, None);
        assert_eq!(one.q75, Some(7.0));
    }

    #[test]
    fn describe_rounds_and_skips_non_numeric() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(2.0)]),
            Column::text("t", vec![None, None, None]),
        ])
        .unwrap();
        let rows = describe(&table, &["a".into(), "t".into(), "nope".into()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mean, Some(1.667));
        assert_eq!(rows[0].std, Some(0.577));
    }

    #[test]
    fn pearson_handles_edge_cases() {
        let up: Vec<Option<f64>> = (0..5).map(|i| Some(i as f64)).collect();
        let down: Vec<Option<f64>> = (0..5).map(|i| Some(-2.0 * i as f64)).collect();
        let flat = vec![Some(5.0); 5];
        assert!(close(pearson(&up, &up), 1.0));
        assert!(close(pearson(&up, &down), -1.0));
        assert_eq!(pearson(&up, &flat), None);
        assert_eq!(pearson(&[Some(1.0), None], &[Some(1.0), Some(2.0)]), None);
    }

    #[test]
    fn correlation_uses_pairwise_rows() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(3.0), None]),
            Column::numeric("b", vec![Some(2.0), Some(4.0), Some(6.0), Some(100.0)]),
            Column::numeric("c", vec![Some(5.0); 4]),
        ])
        .unwrap();
        let m = correlation(&table, &["a".into(), "b".into(), "c".into()]);
        assert_eq!(m.columns, vec!["a", "b", "c"]);
        assert!(close(m.get("a", "b"), 1.0));
        assert!(close(m.get("b", "a"), 1.0));
        assert_eq!(m.get("a", "c"), None);
        assert_eq!(m.get("c", "c"), None);
    }
}
