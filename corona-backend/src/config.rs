use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Process-wide configuration, set once by [`read_config`].
pub static CONFIG: OnceLock<BackendConfig> = OnceLock::new();

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "CORONA_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_data_file")]
    pub data_file: String,

    #[serde(default = "default_backup_file")]
    pub backup_file: String,

    /// Timeout of a single HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Timeout of one connector invocation inside a pass
    #[serde(default = "default_connector_timeout_secs")]
    pub connector_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub feeds: FeedUrls,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedUrls {
    #[serde(default = "default_incidence_url")]
    pub incidence: String,

    #[serde(default = "default_reproduction_number_url")]
    pub reproduction_number: String,

    #[serde(default = "default_vaccination_url")]
    pub vaccination: String,

    #[serde(default = "default_hospitalization_url")]
    pub hospitalization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minute past every hour the regular pass fires at
    #[serde(default = "default_regular_minute")]
    pub regular_minute: u32,

    /// Minute past every hour the frequent pass fires at
    #[serde(default = "default_frequent_minute")]
    pub frequent_minute: u32,

    #[serde(default = "default_perform_initial_update")]
    pub perform_initial_update: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_data_file() -> String {
    "data/data.json".to_string()
}

fn default_backup_file() -> String {
    "data/data.backup.json".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_connector_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    "corona-backend/0.1".to_string()
}

fn default_incidence_url() -> String {
    "https://services7.arcgis.com/mOBPykOjAyBO2ZKk/arcgis/rest/services/RKI_Landkreisdaten/FeatureServer/0/query?where=1%3D1&outFields=OBJECTID,GEN,BEZ,EWZ,EWZ_BL,cases,deaths,cases_per_100k,BL,BL_ID,county,last_update,cases7_per_100k,cases7_bl_per_100k&returnGeometry=false&outSR=4326&f=json".to_string()
}

fn default_reproduction_number_url() -> String {
    "https://raw.githubusercontent.com/robert-koch-institut/SARS-CoV-2-Nowcasting_und_-R-Schaetzung/main/Nowcast_R_aktuell.csv".to_string()
}

fn default_vaccination_url() -> String {
    "https://raw.githubusercontent.com/robert-koch-institut/COVID-19-Impfungen_in_Deutschland/master/Aktuell_Deutschland_Impfquoten_COVID-19.csv".to_string()
}

fn default_hospitalization_url() -> String {
    "https://raw.githubusercontent.com/robert-koch-institut/COVID-19-Hospitalisierungen_in_Deutschland/master/Aktuell_Deutschland_COVID-19-Hospitalisierungen.csv".to_string()
}

fn default_regular_minute() -> u32 {
    2
}

fn default_frequent_minute() -> u32 {
    14
}

fn default_perform_initial_update() -> bool {
    true
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            incidence: default_incidence_url(),
            reproduction_number: default_reproduction_number_url(),
            vaccination: default_vaccination_url(),
            hospitalization: default_hospitalization_url(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            regular_minute: default_regular_minute(),
            frequent_minute: default_frequent_minute(),
            perform_initial_update: default_perform_initial_update(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            data_file: default_data_file(),
            backup_file: default_backup_file(),
            http_timeout_secs: default_http_timeout_secs(),
            connector_timeout_secs: default_connector_timeout_secs(),
            user_agent: default_user_agent(),
            feeds: FeedUrls::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BackendConfig = toml::from_str(content)?;
        anyhow::ensure!(
            config.schedule.regular_minute < 60 && config.schedule.frequent_minute < 60,
            "schedule minutes must be below 60"
        );
        Ok(config)
    }
}

/// Load the config file into [`CONFIG`]. A missing file yields the defaults.
pub fn read_config() -> anyhow::Result<()> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        BackendConfig::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?
    } else {
        BackendConfig::default()
    };

    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Configuration already initialized"))?;
    Ok(())
}
