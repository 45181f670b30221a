use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::session::Session;

const CONFIG_FILE_NAME: &str = "config.json";
const SESSION_FILE_NAME: &str = "session.json";

fn default_bucket() -> String {
    "todolist-files".to_string()
}

/// Where the hosted backend lives. Env vars win over the config file,
/// so a config file is optional when SUPERTODO_URL and
/// SUPERTODO_ANON_KEY are exported.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub anon_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Config {
    pub fn load(base_dir: Option<PathBuf>) -> Result<Self> {
        let path = data_dir(base_dir)?.join(CONFIG_FILE_NAME);

        let file_config: Option<Config> = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            Some(
                serde_json::from_reader(reader)
                    .with_context(|| format!("invalid config at {}", path.display()))?,
            )
        } else {
            None
        };

        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let base_url = env("SUPERTODO_URL")
            .or_else(|| file_config.as_ref().map(|c| c.base_url.clone()))
            .ok_or_else(|| {
                anyhow!(
                    "no backend configured; set SUPERTODO_URL or create {}",
                    path.display()
                )
            })?;
        let anon_key = env("SUPERTODO_ANON_KEY")
            .or_else(|| file_config.as_ref().map(|c| c.anon_key.clone()))
            .ok_or_else(|| {
                anyhow!(
                    "no API key configured; set SUPERTODO_ANON_KEY or create {}",
                    path.display()
                )
            })?;
        let bucket = env("SUPERTODO_BUCKET")
            .or_else(|| file_config.as_ref().map(|c| c.bucket.clone()))
            .unwrap_or_else(default_bucket);

        Ok(Config {
            base_url,
            anon_key,
            bucket,
        })
    }
}

/// Persisted session so a sign-in survives across CLI invocations,
/// stored as a JSON file next to the config.
#[derive(Clone)]
pub struct SessionFile {
    file_path: PathBuf,
}

impl SessionFile {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let dir = data_dir(base_dir)?;
        fs::create_dir_all(&dir)?;
        Ok(SessionFile {
            file_path: dir.join(SESSION_FILE_NAME),
        })
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.file_path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.file_path)?);
        let session = serde_json::from_reader(reader)
            .with_context(|| format!("invalid session file at {}", self.file_path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let file = File::create(&self.file_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, session)?;
        writer.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path)?;
        }
        Ok(())
    }
}

fn data_dir(base_dir: Option<PathBuf>) -> Result<PathBuf> {
    match base_dir {
        Some(dir) => Ok(dir),
        None => {
            let home_dir =
                dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
            Ok(home_dir.join(".supertodo"))
        }
    }
}
