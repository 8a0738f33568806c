use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::types::ComposeFile;

/// File names probed, in order, when no explicit path is given.
pub const COMPOSE_FILE_NAMES: [&str; 2] = ["dkcompose.yaml", "dkcompose.yml"];

/// Find a compose file in the given directory.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    COMPOSE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load a compose file, resolving relative host paths against its directory.
pub fn load(path: &Path) -> Result<ComposeFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut file: ComposeFile = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_paths(&mut file, base);
    Ok(file)
}

/// Load from `explicit` if given, otherwise discover one in `dir`.
pub fn load_from(dir: &Path, explicit: Option<&Path>) -> Result<(PathBuf, ComposeFile)> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match discover(dir) {
            Some(p) => p,
            None => bail!(
                "no compose file found in {} (looked for {})",
                dir.display(),
                COMPOSE_FILE_NAMES.join(", ")
            ),
        },
    };
    let file = load(&path)?;
    Ok((path, file))
}

fn resolve_paths(file: &mut ComposeFile, base: &Path) {
    if let Some(ws) = file.global.workspace.take() {
        file.global.workspace = Some(absolutize(base, &ws));
    }

    for container in &mut file.containers {
        container.volumes = std::mem::take(&mut container.volumes)
            .into_iter()
            .map(|(host, bind)| {
                let host = absolutize(base, Path::new(&host))
                    .to_string_lossy()
                    .to_string();
                (host, bind)
            })
            .collect();
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
