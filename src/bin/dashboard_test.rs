#![cfg(not(tarpaulin_include))]

use std::fs;
use tsdash::cache::DataCache;
use tsdash::detect::Locale;
use tsdash::render::{Level, render};
use tsdash::selection::{ChartType, Selection};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Dashboard Test Suite ===\n");

    let path = std::env::temp_dir().join(format!("dashboard_test_{}.csv", std::process::id()));
    let mut body = String::from("Timestamp,Revenue,Cost\n");
    for day in 1..=10 {
        body.push_str(&format!("2024-01-{:02},{},5\n", day, day * 10));
    }
    fs::write(&path, body)?;

    println!("Test 1: Loading and time column detection");
    let cache = DataCache::new(&path, Locale::En);
    let outcome = cache.get();
    let data = outcome.data().ok_or("scenario file did not load")?;
    assert_eq!(data.temporal_candidates, vec!["Timestamp"]);
    assert!(data.table.column("Timestamp").unwrap().is_temporal());
    println!(
        "Loaded {} rows, time column {:?} - PASS\n",
        data.table.row_count(),
        data.temporal_candidates
    );

    println!("Test 2: Default selection");
    let selection = Selection::default_for(data);
    assert_eq!(selection.time_column.as_deref(), Some("Timestamp"));
    assert_eq!(selection.columns, vec!["Revenue", "Cost"]);
    assert_eq!(selection.date_range.len(), 2);
    println!("Selected {:?} - PASS\n", selection.columns);

    println!("Test 3: Normalized chart");
    let normalized = Selection {
        normalize: true,
        chart_type: ChartType::Area,
        ..selection.clone()
    };
    let dashboard = render(outcome, &normalized);
    let chart = dashboard.chart.as_ref().unwrap();
    let revenue: Vec<f64> = chart.series[0].y.iter().flatten().copied().collect();
    let cost: Vec<f64> = chart.series[1].y.iter().flatten().copied().collect();
    assert_eq!(revenue.first(), Some(&0.0));
    assert_eq!(revenue.last(), Some(&1.0));
    assert!(cost.iter().all(|&c| c == 5.0));
    println!("{} - PASS\n", chart.title);

    println!("Test 4: Date range filter");
    let narrowed = Selection {
        date_range: vec![
            "2024-01-03".parse()?,
            "2024-01-05".parse()?,
        ],
        show_raw_data: true,
        ..selection.clone()
    };
    let dashboard = render(outcome, &narrowed);
    let info = dashboard.info.as_ref().unwrap();
    assert_eq!(info.filtered_rows, 3);
    assert_eq!(dashboard.raw_data.as_ref().unwrap().row_count(), 3);
    println!("{} of {} rows kept - PASS\n", info.filtered_rows, info.total_rows);

    println!("Test 5: Statistics and correlation");
    assert_eq!(dashboard.statistics.len(), 2);
    assert_eq!(dashboard.statistics[0].mean, Some(40.0));
    let matrix = dashboard.correlation.as_ref().unwrap();
    assert_eq!(matrix.get("Revenue", "Revenue"), Some(1.0));
    assert_eq!(matrix.get("Revenue", "Cost"), None);
    println!("Correlation of a constant column is undefined - PASS\n");

    println!("Test 6: Missing file");
    let missing = DataCache::new(path.with_extension("xlsx"), Locale::En);
    let dashboard = render(missing.get(), &Selection::default());
    assert!(dashboard.instructions.is_some());
    assert!(dashboard.notices.iter().all(|n| n.level == Level::Error));
    println!("Instructions shown - PASS\n");

    fs::remove_file(&path)?;
    println!("All tests completed.");
    Ok(())
}
