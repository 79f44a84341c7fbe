use std::ffi::OsStr;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Run the `lapreplay` binary in `dir` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_lapreplay<I, S>(dir: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = lapreplay_bin()?;
    Command::new(bin)
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "error")
        .env_remove("LAPREPLAY_LOG")
        .env_remove("LAPREPLAY_PASSWORD")
        .stdin(Stdio::null())
        .output()
        .map_err(|err| format!("run lapreplay failed: {}", err))
}

/// Returns a loopback websocket URL nobody is listening on.
///
/// # Errors
///
/// Returns an error if no local port can be reserved.
pub fn closed_ws_url() -> Result<String, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe listener failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?;
    drop(listener);
    Ok(format!("ws://{}", addr))
}

#[must_use]
pub fn describe(output: &Output) -> String {
    format!(
        "status: {}\nstdout: {}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn lapreplay_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_lapreplay").map_or_else(
        || Err("CARGO_BIN_EXE_lapreplay missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
