use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::trace;
use serde_json::Value;

use super::{DocumentPort, StoreError};

/// Default location of the settings document, relative to the working directory.
pub const DEFAULT_FILE: &str = ".valve.settings.json";

/// The settings document as a single JSON file.
pub struct JsonFilePort {
    file: PathBuf,
}

impl JsonFilePort {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }

    fn temp_file(&self) -> PathBuf {
        let mut name = self.file.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.file.with_file_name(name)
    }
}

#[async_trait]
impl DocumentPort for JsonFilePort {
    async fn get_json(&self) -> Result<Option<Value>, StoreError> {
        let data = match fs::read_to_string(&self.file) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("{:?} does not exist yet", self.file);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn set_json(&self, data: &Value) -> Result<(), StoreError> {
        // Renamed over the real file, readers only ever see a complete document.
        let temp = self.temp_file();
        fs::write(&temp, format!("{}\n", serde_json::to_string_pretty(data)?))?;
        fs::rename(&temp, &self.file)?;
        trace!("Wrote {:?}", self.file);
        Ok(())
    }
}
