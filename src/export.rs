use std::io::Write;

use crate::dataset::{Channel, ChannelDataset};

/// Round to three decimal places for presentation.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Write `time_ms,z,y,x,aux` rows, rounded to three decimals. Values are
/// written in the units the driver reported them in.
pub fn write_csv<W: Write>(dataset: &ChannelDataset, writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["time_ms"];
    header.extend(Channel::ALL.iter().map(|channel| channel.name()));
    out.write_record(&header)?;

    for reading in dataset.readings() {
        let mut record = vec![round3(reading.time_ms).to_string()];
        record.extend(reading.values.iter().map(|value| round3(*value).to_string()));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}
