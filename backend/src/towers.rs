//! Cell tower data: a CSV export loaded once at startup, with generated
//! towers when no usable file is available.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use serde::Deserialize;
use shared::{BoundingBox, Tower};
use thiserror::Error;

use crate::engine::{TowerProvider, TowerSet};

/// Upper bound on towers returned for one bounding box.
pub const MAX_TOWERS_PER_QUERY: usize = 500;
const SAMPLE_SEED: u64 = 42;
/// Range used to fill in a missing or zero `averageSignal`.
const FILL_SIGNAL_DBM: std::ops::RangeInclusive<i32> = -110..=-70;
const MOCK_TOWER_COUNT: std::ops::RangeInclusive<usize> = 30..=80;
/// Weighted toward modern technologies.
const RADIO_TECHNOLOGIES: [&str; 7] = ["LTE", "LTE", "LTE", "5G", "5G", "UMTS", "GSM"];

pub const CSV_SOURCE: &str = "CSV";
pub const MOCK_SOURCE: &str = "mock";

#[derive(Debug, Error)]
pub enum TowerDataError {
    #[error("failed to open tower data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tower CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("tower CSV contains no usable rows")]
    Empty,
}

/// One row of an OpenCelliD-style export. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TowerRecord {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    id: Option<String>,
    lat: f64,
    lon: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    average_signal: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    radio: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    mcc: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    net: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    area: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    cell: Option<u64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    range: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    samples: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    updated: Option<f64>,
}

impl TowerRecord {
    fn into_tower<R: Rng>(self, rng: &mut R) -> Option<Tower> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return None;
        }
        let average_signal = match self.average_signal {
            Some(signal) if signal.is_finite() && signal != 0.0 => signal.round() as i32,
            _ => rng.random_range(FILL_SIGNAL_DBM),
        };
        let whole = |v: Option<f64>| v.filter(|v| v.is_finite() && *v >= 0.0);

        Some(Tower {
            id: self.id.filter(|id| !id.is_empty()),
            lat: self.lat,
            lon: self.lon,
            average_signal,
            radio: self.radio.filter(|r| !r.is_empty()),
            mcc: self.mcc,
            net: self.net,
            area: self.area,
            cell: self.cell,
            range: whole(self.range).map(|v| v as u32),
            samples: whole(self.samples).map(|v| v as u32),
            updated: self.updated.filter(|v| v.is_finite()).map(|v| v as i64),
        })
    }
}

/// Tower records held in memory, or mock mode when none could be loaded.
#[derive(Debug, Clone, Default)]
pub struct CsvTowerSource {
    towers: Option<Vec<Tower>>,
}

impl CsvTowerSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TowerDataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TowerDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_reader(file)?;
        tracing::info!(
            "loaded {} cell towers from {}",
            source.len(),
            path.display()
        );
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TowerDataError> {
        let mut rng = rand::rng();
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        csv_reader.headers()?;

        let mut towers = Vec::new();
        for (line, record) in csv_reader.deserialize::<TowerRecord>().enumerate() {
            match record {
                Ok(record) => match record.into_tower(&mut rng) {
                    Some(tower) => towers.push(tower),
                    None => tracing::warn!("skipping tower row {}: non-finite coordinates", line + 2),
                },
                Err(err) => tracing::warn!("skipping tower row {}: {err}", line + 2),
            }
        }

        if towers.is_empty() {
            return Err(TowerDataError::Empty);
        }
        Ok(Self {
            towers: Some(towers),
        })
    }

    /// Loads `path`, or falls back to mock mode with a warning.
    pub fn load_or_mock(path: impl AsRef<Path>) -> Self {
        Self::from_path(path).unwrap_or_else(|err| {
            tracing::warn!("{err}; generating mock cell towers instead");
            Self::mock()
        })
    }

    pub fn mock() -> Self {
        Self { towers: None }
    }

    pub fn is_mock(&self) -> bool {
        self.towers.is_none()
    }

    pub fn len(&self) -> usize {
        self.towers.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Towers inside `bbox` (bounds inclusive).
    ///
    /// More than [`MAX_TOWERS_PER_QUERY`] matches are sampled down with a
    /// fixed seed, keeping file order.
    pub fn query(&self, bbox: BoundingBox) -> TowerSet {
        tracing::info!(
            "fetching cell towers within ({:.4},{:.4}) to ({:.4},{:.4})",
            bbox.min_lat,
            bbox.min_lon,
            bbox.max_lat,
            bbox.max_lon
        );

        let Some(all) = &self.towers else {
            return TowerSet {
                towers: generate_mock_towers(bbox, None, &mut rand::rng()),
                source: MOCK_SOURCE.into(),
            };
        };

        let in_bounds: Vec<&Tower> = all
            .iter()
            .filter(|t| bbox.contains(t.lat, t.lon))
            .collect();
        let found = in_bounds.len();

        let towers: Vec<Tower> = if found > MAX_TOWERS_PER_QUERY {
            tracing::info!(
                "found {found} towers in bounds, sampling down to {MAX_TOWERS_PER_QUERY}"
            );
            let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
            let mut picked = index::sample(&mut rng, found, MAX_TOWERS_PER_QUERY).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| in_bounds[i].clone()).collect()
        } else {
            in_bounds.into_iter().cloned().collect()
        };

        tracing::debug!("returning {} of {found} towers in bounds", towers.len());
        TowerSet {
            towers,
            source: CSV_SOURCE.into(),
        }
    }
}

impl TowerProvider for CsvTowerSource {
    async fn towers_in_bounds(&self, bbox: BoundingBox) -> TowerSet {
        self.query(bbox)
    }
}

/// Random but plausible towers spread uniformly over `bbox`.
///
/// `count` defaults to a random value in 30..=80. An empty or inverted box
/// yields no towers.
pub fn generate_mock_towers<R: Rng>(
    bbox: BoundingBox,
    count: Option<usize>,
    rng: &mut R,
) -> Vec<Tower> {
    let lat_span = bbox.lat_span();
    let lon_span = bbox.lon_span();
    if !(lat_span > 0.0 && lon_span > 0.0) {
        tracing::warn!(
            "invalid bounding box for mock towers: lat span {lat_span:.4}, lon span {lon_span:.4}"
        );
        return Vec::new();
    }

    let count = count.unwrap_or_else(|| rng.random_range(MOCK_TOWER_COUNT));
    let now = chrono::Utc::now().timestamp();

    let towers: Vec<Tower> = (0..count)
        .map(|i| {
            let radio = RADIO_TECHNOLOGIES[rng.random_range(0..RADIO_TECHNOLOGIES.len())];
            let range = if radio == "5G" {
                rng.random_range(500..=2000)
            } else {
                rng.random_range(1000..=5000)
            };
            Tower {
                id: Some(format!("mock_{i}")),
                lat: bbox.min_lat + rng.random::<f64>() * lat_span,
                lon: bbox.min_lon + rng.random::<f64>() * lon_span,
                average_signal: rng.random_range(-115..=-65),
                radio: Some(radio.to_string()),
                mcc: Some(310),
                net: Some(rng.random_range(10..=410)),
                area: Some(rng.random_range(1000..=60000)),
                cell: Some(rng.random_range(10_000..=999_999)),
                range: Some(range),
                samples: Some(rng.random_range(1..=50)),
                updated: Some(now - rng.random_range(3600..=86_400 * 30)),
            }
        })
        .collect();

    tracing::info!("generated {} mock cell towers", towers.len());
    towers
}
