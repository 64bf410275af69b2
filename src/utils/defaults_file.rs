//! Generation of the option file handed to xtrabackup via `--defaults-file`
//!
//! The file includes the server/global option files first, then the client
//! option files, and finally a `[client]` section with explicit connection
//! options. MySQL option files let later settings win, so explicit options
//! override every include. A second, append-only pass adds runtime values
//! (such as the resolved tmpdir) under a tool section.

use crate::config::{ConfigError, MysqlClientConfig, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the generated option file inside the target directory
pub const DEFAULTS_FILE_NAME: &str = "my.cnf";

/// Write a fresh defaults file at `path`
pub fn generate_defaults_file(
    path: &Path,
    includes: &[PathBuf],
    client: &MysqlClientConfig,
) -> Result<()> {
    for include in includes {
        if !include.exists() {
            return Err(ConfigError::IncludeNotFound(include.clone()));
        }
    }

    let mut lines: Vec<String> = includes
        .iter()
        .map(|include| format!("!include {}", include.display()))
        .collect();

    let options = [
        ("user", client.user.clone()),
        ("password", client.password.as_deref().map(quote_password)),
        ("socket", client.socket.clone()),
        ("host", client.host.clone()),
        ("port", client.port.map(|p| p.to_string())),
    ];
    lines.extend(section_lines("client", &options));

    debug!("Writing defaults file {:?}", path);
    write_lines(path, &lines, false)
}

/// Append `options` under `[section]` without touching existing content
///
/// Options whose value is `None` are skipped; if none are set nothing is
/// written.
pub fn add_tool_defaults(
    path: &Path,
    section: &str,
    options: &[(&str, Option<String>)],
) -> Result<()> {
    let lines = section_lines(section, options);
    if lines.is_empty() {
        return Ok(());
    }

    debug!("Appending [{}] options to {:?}", section, path);
    write_lines(path, &lines, true)
}

fn section_lines(section: &str, options: &[(&str, Option<String>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, value) in options {
        if let Some(value) = value {
            if lines.is_empty() {
                lines.push(format!("[{}]", section));
            }
            lines.push(format!("{} = {}", key, value));
        }
    }
    lines
}

/// Quote a password so `#`, `;`, quotes and spaces survive option parsing
fn quote_password(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn write_lines(path: &Path, lines: &[String], append: bool) -> Result<()> {
    let to_error = |source| ConfigError::DefaultsFile {
        path: path.to_path_buf(),
        source,
    };

    let file = open_defaults(path, append).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(to_error)?;
    }
    writer.flush().map_err(to_error)?;

    Ok(())
}

fn open_defaults(path: &Path, append: bool) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    // The file carries the client password
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;

    // mode() only applies on creation; a reused target may hold an older file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}
