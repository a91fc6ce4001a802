// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that, or merge command-line
/// overrides into the raw file first and convert with `ConfigFile::try_from`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Config file picked up from the working directory when neither `--config`
/// nor `SRC` is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Onchange.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_validate_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Onchange.toml");
        fs::write(
            &path,
            "[watch]\npath = \".\"\ninclude = [\"*.c\"]\n\n[run]\ncommands = [[\"echo\", \"FILE\"]]\n",
        )
        .unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(cfg.watch.include, vec!["*.c"]);
        assert_eq!(cfg.run.commands, vec![vec!["echo", "FILE"]]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, crate::errors::OnchangeError::IoError(_)));
    }

    #[test]
    fn malformed_file_is_a_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[watch\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, crate::errors::OnchangeError::TomlError(_)));
    }
}
