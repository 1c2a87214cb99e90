// Snapshot series persistence
// Columns: timestamp,bid_price,bid_volume,ask_price,ask_volume

use crate::core::types::{NumericWidth, PrecisionRules, Snapshot};
use crate::error::{ArbError, ArbResult};
use crate::store::{f64_column, i64_column, read_frame, required, write_frame};
use polars::prelude::*;
use std::path::Path;

fn width_dtype(width: NumericWidth) -> DataType {
    match width {
        NumericWidth::Narrow => DataType::Float32,
        NumericWidth::Wide => DataType::Float64,
    }
}

fn snapshots_to_frame(snapshots: &[Snapshot]) -> ArbResult<DataFrame> {
    let precision = snapshots.first().map(|s| s.precision).unwrap_or_default();
    let price_dtype = width_dtype(precision.price_width());
    let volume_dtype = width_dtype(precision.volume_width());

    let column = |name: &str, pick: fn(&Snapshot) -> f64, dtype: &DataType| {
        let values: Vec<f64> = snapshots.iter().map(pick).collect();
        Series::new(name, values).cast(dtype)
    };

    let timestamps: Vec<i64> = snapshots.iter().map(|s| s.timestamp).collect();
    let frame = DataFrame::new(vec![
        Series::new("timestamp", timestamps),
        column("bid_price", |s| s.bid_price, &price_dtype)?,
        column("bid_volume", |s| s.bid_volume, &volume_dtype)?,
        column("ask_price", |s| s.ask_price, &price_dtype)?,
        column("ask_volume", |s| s.ask_volume, &volume_dtype)?,
    ])?;
    Ok(frame)
}

/// Reject any timestamp that does not strictly exceed its predecessor
pub fn validate_ordering(source: &Path, snapshots: &[Snapshot]) -> ArbResult<()> {
    for (index, window) in snapshots.windows(2).enumerate() {
        if window[1].timestamp <= window[0].timestamp {
            return Err(ArbError::DataOrdering {
                source: source.display().to_string(),
                index: index + 1,
                previous: window[0].timestamp,
                current: window[1].timestamp,
            });
        }
    }
    Ok(())
}

/// Load a snapshot series. Every cell is required and timestamps must be
/// strictly increasing.
pub fn read_snapshots(path: &Path, precision: PrecisionRules) -> ArbResult<Vec<Snapshot>> {
    let frame = read_frame(path)?;

    let timestamps = i64_column(&frame, "timestamp")?;
    let bid_prices = f64_column(&frame, "bid_price")?;
    let bid_volumes = f64_column(&frame, "bid_volume")?;
    let ask_prices = f64_column(&frame, "ask_price")?;
    let ask_volumes = f64_column(&frame, "ask_volume")?;

    let mut snapshots = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        snapshots.push(Snapshot {
            timestamp: required(timestamps[row], path, "timestamp", row)?,
            bid_price: required(bid_prices[row], path, "bid_price", row)?,
            bid_volume: required(bid_volumes[row], path, "bid_volume", row)?,
            ask_price: required(ask_prices[row], path, "ask_price", row)?,
            ask_volume: required(ask_volumes[row], path, "ask_volume", row)?,
            precision,
        });
    }

    validate_ordering(path, &snapshots)?;
    Ok(snapshots)
}

/// Replace `path` with the given series
pub fn write_snapshots(path: &Path, snapshots: &[Snapshot]) -> ArbResult<()> {
    validate_ordering(path, snapshots)?;
    let mut frame = snapshots_to_frame(snapshots)?;
    write_frame(path, &mut frame, false)
}

/// Append one snapshot, writing the header only for a new file
pub fn append_snapshot(path: &Path, snapshot: &Snapshot) -> ArbResult<()> {
    append_snapshots(path, std::slice::from_ref(snapshot))
}

/// Append a batch; the caller guarantees it continues the stored ordering
pub fn append_snapshots(path: &Path, snapshots: &[Snapshot]) -> ArbResult<()> {
    if snapshots.is_empty() {
        return Ok(());
    }
    validate_ordering(path, snapshots)?;
    let mut frame = snapshots_to_frame(snapshots)?;
    write_frame(path, &mut frame, true)
}

/// Timestamp of the newest stored snapshot, `None` for a missing or empty file
pub fn last_timestamp(path: &Path) -> ArbResult<Option<i64>> {
    if !path.exists() {
        return Ok(None);
    }
    let frame = read_frame(path)?;
    let timestamps = i64_column(&frame, "timestamp")?;
    Ok(timestamps.into_iter().flatten().max())
}
