use std::path::Path;

use csv::Writer;

use crate::error::Error;
use crate::partition::EntryContent;
use crate::NvsPartition;

/// Serialize an NVS partition to a CSV file at the given `output_path`.
///
/// Entries are written in their original insertion order. A namespace header
/// row is emitted whenever the namespace changes between consecutive entries.
///
/// `Binary` data values are serialized as base64, matching the ESP-IDF
/// `nvs_partition_tool` convention.
pub(crate) fn write_csv<P: AsRef<Path>>(
    partition: &NvsPartition,
    output_path: P,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(output_path)?;
    write_records(&mut wtr, partition)
}

/// Serialize an NVS partition to CSV and return the content as a `String`.
///
/// See [`write_csv`] for details on ordering and encoding behavior.
pub(crate) fn write_csv_content(partition: &NvsPartition) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, partition)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::ValueUnsupported(format!("CSV output is not valid UTF-8: {}", e)))
}

fn write_records<W: std::io::Write>(
    wtr: &mut Writer<W>,
    partition: &NvsPartition,
) -> Result<(), Error> {
    wtr.write_record(["key", "type", "encoding", "value"])?;

    // Emit namespace rows on demand, preserving the original entry order.
    let mut current_namespace: Option<&str> = None;

    for entry in &partition.entries {
        // Emit a namespace row when the namespace changes
        if current_namespace != Some(&entry.namespace) {
            wtr.write_record([&entry.namespace, "namespace", "", ""])?;
            current_namespace = Some(&entry.namespace);
        }

        match &entry.content {
            EntryContent::Data(value) => {
                let value_str = value.to_string();
                wtr.write_record([&entry.key, "data", value.encoding_str(), &value_str])?;
            }
            EntryContent::File {
                encoding,
                file_path,
            } => {
                wtr.write_record([
                    &entry.key,
                    "file",
                    encoding.as_str(),
                    &file_path.to_string_lossy(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::value::Value;
    use crate::NvsEntry;
    use crate::NvsPartition;

    #[test]
    fn round_trips_through_csv() {
        let partition = NvsPartition {
            entries: vec![
                NvsEntry::new_data(
                    "config".to_string(),
                    "port".to_string(),
                    Value::U16(1883),
                ),
                NvsEntry::new_data(
                    "config".to_string(),
                    "ssid".to_string(),
                    Value::Str("HomeWiFi".to_string()),
                ),
            ],
        };

        let csv = partition.to_csv().unwrap();
        let round_tripped = NvsPartition::from_csv(&csv).unwrap();
        assert_eq!(round_tripped, partition);
    }

    #[test]
    fn emits_one_namespace_row_per_change() {
        let partition = NvsPartition {
            entries: vec![
                NvsEntry::new_data("a".to_string(), "k1".to_string(), Value::U8(1)),
                NvsEntry::new_data("a".to_string(), "k2".to_string(), Value::U8(2)),
                NvsEntry::new_data("b".to_string(), "k3".to_string(), Value::U8(3)),
            ],
        };
        let csv = partition.to_csv().unwrap();
        assert_eq!(csv.matches("namespace").count(), 2);
    }
}
