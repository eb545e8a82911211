//! OSRM dataset preparation: fetch a Geofabrik extract and preprocess it
//! for a routing profile with the `osrm/osrm-backend` image.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

const OSRM_IMAGE: &str = "osrm/osrm-backend";

#[derive(Debug, Clone)]
pub struct GeofabrikRegion {
    /// Geofabrik region path, e.g. "europe/monaco".
    pub path: String,
}

impl GeofabrikRegion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("region")
    }

    pub fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

/// Lua profile shipped in the backend image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingProfile {
    #[default]
    Bicycle,
    Foot,
    Car,
}

impl RoutingProfile {
    pub fn lua_path(self) -> &'static str {
        match self {
            RoutingProfile::Bicycle => "/opt/bicycle.lua",
            RoutingProfile::Foot => "/opt/foot.lua",
            RoutingProfile::Car => "/opt/car.lua",
        }
    }

    /// Name used in `/table/v1/{profile}` URLs.
    pub fn url_name(self) -> &'static str {
        match self {
            RoutingProfile::Bicycle => "bike",
            RoutingProfile::Foot => "foot",
            RoutingProfile::Car => "car",
        }
    }

    fn dir_name(self) -> &'static str {
        match self {
            RoutingProfile::Bicycle => "bicycle",
            RoutingProfile::Foot => "foot",
            RoutingProfile::Car => "car",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmDatasetConfig {
    pub region: GeofabrikRegion,
    pub data_root: PathBuf,
    pub profile: RoutingProfile,
}

impl OsrmDatasetConfig {
    pub fn new(region: GeofabrikRegion, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
            profile: RoutingProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: RoutingProfile) -> Self {
        self.profile = profile;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OsrmDataset {
    /// Per region and profile; mounted at `/data` in the container.
    pub data_dir: PathBuf,
    pub osrm_base: PathBuf,
    pub pbf_path: PathBuf,
    pub profile: RoutingProfile,
}

#[derive(Error, Debug)]
pub enum OsrmDataError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{step} failed: {status}")]
    ProcessFailure { step: String, status: String },
}

impl OsrmDataset {
    /// Downloads and preprocesses (extract, partition, customize) whatever
    /// is missing under `data_root/<region>/<profile>`.
    pub fn ensure(config: &OsrmDatasetConfig) -> Result<Self, OsrmDataError> {
        let data_root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let region = config.region.name();
        let data_dir = data_root.join(region).join(config.profile.dir_name());
        fs::create_dir_all(&data_dir)?;

        let pbf_path = data_dir.join(format!("{region}-latest.osm.pbf"));
        if !pbf_path.exists() {
            tracing::info!(url = %config.region.url(), "downloading extract");
            download_pbf(&config.region.url(), &pbf_path)?;
        }

        let osrm_base = data_dir.join(format!("{region}-latest.osrm"));
        let dataset = Self {
            data_dir,
            osrm_base,
            pbf_path,
            profile: config.profile,
        };

        if !dataset.osrm_base.exists() {
            dataset.run(&[
                "osrm-extract",
                "-p",
                config.profile.lua_path(),
                &dataset.container_path(&dataset.pbf_path),
            ])?;
        }
        if !dataset.is_ready() {
            let base = dataset.container_path(&dataset.osrm_base);
            dataset.run(&["osrm-partition", &base])?;
            dataset.run(&["osrm-customize", &base])?;
        }

        Ok(dataset)
    }

    /// All MLD artifacts are present.
    pub fn is_ready(&self) -> bool {
        ["osrm.partition", "osrm.mldgr", "osrm.cells"]
            .iter()
            .all(|ext| self.osrm_base.with_extension(ext).exists())
            && self.osrm_base.exists()
    }

    /// Path of `path` inside the container's `/data` mount.
    pub fn container_path(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        format!("/data/{name}")
    }

    fn run(&self, args: &[&str]) -> Result<(), OsrmDataError> {
        tracing::info!(step = args[0], dir = %self.data_dir.display(), "osrm preprocessing");
        let status = Command::new("docker")
            .args(["run", "--rm", "-t", "-v"])
            .arg(format!("{}:/data", self.data_dir.display()))
            .arg(OSRM_IMAGE)
            .args(args)
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(OsrmDataError::ProcessFailure {
                step: args[0].to_string(),
                status: status.to_string(),
            })
        }
    }
}

fn download_pbf(url: &str, dest: &Path) -> Result<(), OsrmDataError> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let tmp_path = dest.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    writer.write_all(&response.bytes()?)?;
    writer.flush()?;
    fs::rename(tmp_path, dest)?;
    Ok(())
}
