use crate::error::{Result, SyncError};
use crate::models::{DailyObservation, StationId, WeatherEvents};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(SyncError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }

    /// Encode one station-year dataset into an in-memory Parquet file
    pub fn encode_observations(&self, records: &[DailyObservation]) -> Result<Vec<u8>> {
        self.encode_into(records, Vec::new())
    }

    /// Write observations to a local Parquet file
    pub fn write_observations(&self, records: &[DailyObservation], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.encode_into(records, file)?;
        Ok(())
    }

    fn encode_into<W: Write + Send>(&self, records: &[DailyObservation], sink: W) -> Result<W> {
        let schema = observation_schema();
        let mut writer = ArrowWriter::try_new(sink, schema.clone(), Some(self.properties()))?;

        // Write in row-group sized chunks
        for chunk in records.chunks(self.row_group_size) {
            let batch = records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        Ok(writer.into_inner()?)
    }

    /// Read observations back from a Parquet file, optionally stopping after `limit` rows
    pub fn read_observations(&self, path: &Path, limit: Option<usize>) -> Result<Vec<DailyObservation>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.unwrap_or(8192).clamp(1, 8192))
            .build()?;

        let limit = limit.unwrap_or(usize::MAX);
        let mut records = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;
            let remaining = limit - records.len();
            records.extend(batch_to_records(&batch, remaining)?);

            if records.len() >= limit {
                break;
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let compression = (0..row_groups)
            .find_map(|i| {
                let group = metadata.row_group(i);
                (group.num_columns() > 0).then(|| group.column(0).compression())
            })
            .unwrap_or(self.compression);

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Arrow schema of a transformed station-year dataset
pub fn observation_schema() -> Arc<Schema> {
    let measurement = |name: &str| Field::new(name, DataType::Float64, true);
    let count = |name: &str| Field::new(name, DataType::UInt32, false);
    let flag = |name: &str| Field::new(name, DataType::Boolean, false);

    let fields = vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("usaf", DataType::Utf8, false),
        Field::new("wban", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("iso_date", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::UInt32, false),
        Field::new("day", DataType::UInt32, false),
        measurement("elevation"),
        Field::new("station_name", DataType::Utf8, true),
        Field::new("country", DataType::Utf8, true),
        measurement("latitude"),
        measurement("longitude"),
        measurement("mean_temp"),
        count("mean_temp_count"),
        measurement("mean_dewpoint"),
        count("mean_dewpoint_count"),
        measurement("mean_sea_level_pressure"),
        count("mean_sea_level_pressure_count"),
        measurement("mean_station_pressure"),
        count("mean_station_pressure_count"),
        measurement("mean_visibility"),
        count("mean_visibility_count"),
        measurement("mean_windspeed"),
        count("mean_windspeed_count"),
        measurement("max_windspeed"),
        measurement("max_gust"),
        measurement("max_temp"),
        flag("max_temp_quality_flag"),
        measurement("min_temp"),
        flag("min_temp_quality_flag"),
        measurement("precipitation"),
        Field::new("precipitation_flag", DataType::Utf8, true),
        measurement("snow_depth"),
        flag("fog"),
        flag("rain_or_drizzle"),
        flag("snow_or_ice"),
        flag("hail"),
        flag("thunder"),
        flag("tornado"),
    ];

    Arc::new(Schema::new(fields))
}

/// Convert observations to an Arrow RecordBatch
fn records_to_batch(records: &[DailyObservation], schema: Arc<Schema>) -> Result<RecordBatch> {
    let text = |f: fn(&DailyObservation) -> String| -> ArrayRef {
        Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let optional_text = |f: fn(&DailyObservation) -> Option<String>| -> ArrayRef {
        Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let measurement = |f: fn(&DailyObservation) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let count = |f: fn(&DailyObservation) -> u32| -> ArrayRef {
        Arc::new(UInt32Array::from(records.iter().map(f).collect::<Vec<_>>()))
    };
    let flag = |f: fn(&DailyObservation) -> bool| -> ArrayRef {
        Arc::new(BooleanArray::from(records.iter().map(f).collect::<Vec<_>>()))
    };

    let dates: Vec<i32> = records
        .iter()
        .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();
    let years: Vec<i32> = records.iter().map(|r| r.year()).collect();

    let columns: Vec<ArrayRef> = vec![
        text(|r| r.station.to_string()),
        text(|r| r.station.usaf.clone()),
        text(|r| r.station.wban.clone()),
        Arc::new(Date32Array::from(dates)),
        text(|r| r.iso_date()),
        Arc::new(Int32Array::from(years)),
        count(|r| r.month()),
        count(|r| r.day()),
        measurement(|r| r.elevation),
        optional_text(|r| r.station_name.clone()),
        optional_text(|r| r.country.clone()),
        measurement(|r| r.latitude),
        measurement(|r| r.longitude),
        measurement(|r| r.mean_temp),
        count(|r| r.mean_temp_count),
        measurement(|r| r.mean_dewpoint),
        count(|r| r.mean_dewpoint_count),
        measurement(|r| r.mean_sea_level_pressure),
        count(|r| r.mean_sea_level_pressure_count),
        measurement(|r| r.mean_station_pressure),
        count(|r| r.mean_station_pressure_count),
        measurement(|r| r.mean_visibility),
        count(|r| r.mean_visibility_count),
        measurement(|r| r.mean_windspeed),
        count(|r| r.mean_windspeed_count),
        measurement(|r| r.max_windspeed),
        measurement(|r| r.max_gust),
        measurement(|r| r.max_temp),
        flag(|r| r.max_temp_quality_flag),
        measurement(|r| r.min_temp),
        flag(|r| r.min_temp_quality_flag),
        measurement(|r| r.precipitation),
        optional_text(|r| r.precipitation_flag.map(String::from)),
        measurement(|r| r.snow_depth),
        flag(|r| r.events.fog),
        flag(|r| r.events.rain_or_drizzle),
        flag(|r| r.events.snow_or_ice),
        flag(|r| r.events.hail),
        flag(|r| r.events.thunder),
        flag(|r| r.events.tornado),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| SyncError::InvalidFormat(format!("Invalid {} column type", name)))
}

fn optional_f64(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn optional_string(array: &StringArray, i: usize) -> Option<String> {
    (!array.is_null(i)).then(|| array.value(i).to_string())
}

fn batch_to_records(batch: &RecordBatch, limit: usize) -> Result<Vec<DailyObservation>> {
    let usaf = column::<StringArray>(batch, "usaf")?;
    let wban = column::<StringArray>(batch, "wban")?;
    let dates = column::<Date32Array>(batch, "date")?;
    let elevation = column::<Float64Array>(batch, "elevation")?;
    let station_name = column::<StringArray>(batch, "station_name")?;
    let country = column::<StringArray>(batch, "country")?;
    let latitude = column::<Float64Array>(batch, "latitude")?;
    let longitude = column::<Float64Array>(batch, "longitude")?;
    let mean_temp = column::<Float64Array>(batch, "mean_temp")?;
    let mean_temp_count = column::<UInt32Array>(batch, "mean_temp_count")?;
    let mean_dewpoint = column::<Float64Array>(batch, "mean_dewpoint")?;
    let mean_dewpoint_count = column::<UInt32Array>(batch, "mean_dewpoint_count")?;
    let mean_slp = column::<Float64Array>(batch, "mean_sea_level_pressure")?;
    let mean_slp_count = column::<UInt32Array>(batch, "mean_sea_level_pressure_count")?;
    let mean_stp = column::<Float64Array>(batch, "mean_station_pressure")?;
    let mean_stp_count = column::<UInt32Array>(batch, "mean_station_pressure_count")?;
    let mean_visibility = column::<Float64Array>(batch, "mean_visibility")?;
    let mean_visibility_count = column::<UInt32Array>(batch, "mean_visibility_count")?;
    let mean_windspeed = column::<Float64Array>(batch, "mean_windspeed")?;
    let mean_windspeed_count = column::<UInt32Array>(batch, "mean_windspeed_count")?;
    let max_windspeed = column::<Float64Array>(batch, "max_windspeed")?;
    let max_gust = column::<Float64Array>(batch, "max_gust")?;
    let max_temp = column::<Float64Array>(batch, "max_temp")?;
    let max_temp_flag = column::<BooleanArray>(batch, "max_temp_quality_flag")?;
    let min_temp = column::<Float64Array>(batch, "min_temp")?;
    let min_temp_flag = column::<BooleanArray>(batch, "min_temp_quality_flag")?;
    let precipitation = column::<Float64Array>(batch, "precipitation")?;
    let precipitation_flag = column::<StringArray>(batch, "precipitation_flag")?;
    let snow_depth = column::<Float64Array>(batch, "snow_depth")?;
    let fog = column::<BooleanArray>(batch, "fog")?;
    let rain = column::<BooleanArray>(batch, "rain_or_drizzle")?;
    let snow = column::<BooleanArray>(batch, "snow_or_ice")?;
    let hail = column::<BooleanArray>(batch, "hail")?;
    let thunder = column::<BooleanArray>(batch, "thunder")?;
    let tornado = column::<BooleanArray>(batch, "tornado")?;

    let rows = batch.num_rows().min(limit);
    let mut records = Vec::with_capacity(rows);

    for i in 0..rows {
        let date = NaiveDate::from_num_days_from_ce_opt(dates.value(i) + UNIX_EPOCH_DAYS_FROM_CE)
            .ok_or_else(|| SyncError::InvalidFormat("Invalid date in Parquet file".to_string()))?;

        records.push(DailyObservation {
            station: StationId::new(usaf.value(i), wban.value(i)),
            date,
            elevation: optional_f64(elevation, i),
            station_name: optional_string(station_name, i),
            country: optional_string(country, i),
            latitude: optional_f64(latitude, i),
            longitude: optional_f64(longitude, i),
            mean_temp: optional_f64(mean_temp, i),
            mean_temp_count: mean_temp_count.value(i),
            mean_dewpoint: optional_f64(mean_dewpoint, i),
            mean_dewpoint_count: mean_dewpoint_count.value(i),
            mean_sea_level_pressure: optional_f64(mean_slp, i),
            mean_sea_level_pressure_count: mean_slp_count.value(i),
            mean_station_pressure: optional_f64(mean_stp, i),
            mean_station_pressure_count: mean_stp_count.value(i),
            mean_visibility: optional_f64(mean_visibility, i),
            mean_visibility_count: mean_visibility_count.value(i),
            mean_windspeed: optional_f64(mean_windspeed, i),
            mean_windspeed_count: mean_windspeed_count.value(i),
            max_windspeed: optional_f64(max_windspeed, i),
            max_gust: optional_f64(max_gust, i),
            max_temp: optional_f64(max_temp, i),
            max_temp_quality_flag: max_temp_flag.value(i),
            min_temp: optional_f64(min_temp, i),
            min_temp_quality_flag: min_temp_flag.value(i),
            precipitation: optional_f64(precipitation, i),
            precipitation_flag: optional_string(precipitation_flag, i)
                .and_then(|flag| flag.chars().next()),
            snow_depth: optional_f64(snow_depth, i),
            events: WeatherEvents {
                fog: fog.value(i),
                rain_or_drizzle: rain.value(i),
                snow_or_ice: snow.value(i),
                hail: hail.value(i),
                thunder: thunder.value(i),
                tornado: tornado.value(i),
            },
        });
    }

    Ok(records)
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}
