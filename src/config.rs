use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodetrailConfig {
    pub database: Option<String>,
    pub read_only: Option<bool>,
}

/// Project settings that travel inside the index file.
///
/// The store treats the serialized form as opaque text; this is the shape
/// the CLI writes and reads back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectSettings {
    pub name: String,
    pub project_file_location: Option<String>,
    pub source_paths: Vec<String>,
    pub header_search_paths: Vec<String>,
    pub framework_search_paths: Vec<String>,
}

impl ProjectSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn to_text(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Settings(e.to_string()))
    }

    pub fn from_text(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Apply a `key=value` assignment. List keys take comma-separated values.
    pub fn assign(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::Settings(format!("expected key=value, got {assignment:?}")))?;
        let list = || -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        };

        match key.trim() {
            "name" => self.name = value.trim().to_string(),
            "project_file_location" => {
                let value = value.trim();
                self.project_file_location = (!value.is_empty()).then(|| value.to_string());
            }
            "source_paths" => self.source_paths = list(),
            "header_search_paths" => self.header_search_paths = list(),
            "framework_search_paths" => self.framework_search_paths = list(),
            other => return Err(Error::Settings(format!("unknown setting {other:?}"))),
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codetrail.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".codetrail").join("index.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CodetrailConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CodetrailConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CodetrailConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".codetrail/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_text_roundtrip() {
        let mut settings = ProjectSettings::new("demo");
        settings.source_paths = vec!["src".into(), "include".into()];
        settings.project_file_location = Some("/work/demo".into());

        let text = settings.to_text().unwrap();
        assert_eq!(ProjectSettings::from_text(&text).unwrap(), settings);
        assert!(matches!(ProjectSettings::from_text("name = ["), Err(Error::Settings(_))));
    }

    #[test]
    fn test_assign() {
        let mut settings = ProjectSettings::default();
        settings.assign("name=demo").unwrap();
        settings.assign("header_search_paths = /usr/include, vendor/include").unwrap();
        assert_eq!(settings.name, "demo");
        assert_eq!(settings.header_search_paths, vec!["/usr/include", "vendor/include"]);
        assert!(settings.assign("colour=blue").is_err());
        assert!(settings.assign("no-equals").is_err());
    }

    #[test]
    fn test_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("codetrail.toml");
        let config = CodetrailConfig {
            database: Some(".codetrail/index.db".into()),
            read_only: None,
        };

        write_config(&config_path, &config, false).unwrap();
        assert!(write_config(&config_path, &config, false).is_err());
        let loaded = load_config(Some(&config_path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some(".codetrail/index.db"));
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".codetrail/").count(), 1);

        let db_path = default_database_path_in(dir.path());
        ensure_db_dir(&db_path).unwrap();
        assert!(db_path.parent().unwrap().is_dir());
    }
}
