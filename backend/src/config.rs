use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, builder::TypedValueParser};

use crate::geocoding::DEFAULT_GEOCODING_URL;
use crate::graphhopper::{DEFAULT_ALTERNATIVES, DEFAULT_BASE_URL};

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Route optimizer balancing travel time and cellular coverage"
)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// GraphHopper API key; route requests fail without it
    #[arg(long, env = "GRAPHHOPPER_KEY", hide_env_values = true)]
    pub graphhopper_key: Option<String>,

    #[arg(long, env = "GRAPHHOPPER_URL", default_value = DEFAULT_BASE_URL)]
    pub graphhopper_url: String,

    /// MapTiler API key for the geocoding proxy
    #[arg(long, env = "MAPTILER_KEY", hide_env_values = true)]
    pub maptiler_key: Option<String>,

    #[arg(long, env = "MAPTILER_URL", default_value = DEFAULT_GEOCODING_URL)]
    pub maptiler_url: String,

    /// Cell tower CSV export; mock towers are generated when it is unusable
    #[arg(long, env = "TOWER_CSV_PATH", default_value = "backend/data/cell_towers.csv")]
    pub tower_csv: PathBuf,

    /// Number of alternatives requested from the routing provider (1-10)
    #[arg(
        long,
        env = "ROUTE_ALTERNATIVES",
        default_value_t = DEFAULT_ALTERNATIVES,
        value_parser = clap::value_parser!(u8).range(1..=10).map(usize::from)
    )]
    pub alternatives: usize,
}
