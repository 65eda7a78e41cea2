// src/exec/script.rs

//! Inline script materialization.

use std::io::{self, Write};

use tempfile::TempPath;

/// Write `script` to a fresh temporary file that only the owner may read,
/// write and execute.
///
/// The file handle is closed before returning so the script can be executed.
/// The returned [`TempPath`] deletes the file when closed or dropped, which
/// also covers futures that are cancelled mid-run.
pub async fn materialize_script(script: String) -> io::Result<TempPath> {
    tokio::task::spawn_blocking(move || write_script(&script))
        .await
        .map_err(io::Error::other)?
}

fn write_script(script: &str) -> io::Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("autoapply-script-");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o700));
    }

    let mut file = builder.tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}
