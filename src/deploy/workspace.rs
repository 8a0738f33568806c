use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use tracing::info;

use super::error::DeployError;

/// Location of the generated hosts file, relative to the workspace.
pub const HOSTS_RELATIVE_PATH: &str = "etc/hosts";

const DIR_MODE: u32 = 0o755;

/// Create the workspace layout and write the shared hosts file.
///
/// Returns the path of the hosts file.
pub fn prepare(workspace: &Path, hosts: &str) -> Result<PathBuf, DeployError> {
    let etc = workspace.join("etc");
    create_dir(workspace)?;
    create_dir(&etc)?;

    let path = workspace.join(HOSTS_RELATIVE_PATH);
    std::fs::write(&path, render_hosts(hosts)).map_err(|source| DeployError::Workspace {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "wrote hosts file");
    Ok(path)
}

/// One trimmed entry per non-blank line, each terminated by `\n`.
pub fn render_hosts(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
}

fn create_dir(path: &Path) -> Result<(), DeployError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
        .create(path)
        .map_err(|source| DeployError::Workspace {
            path: path.to_path_buf(),
            source,
        })
}
