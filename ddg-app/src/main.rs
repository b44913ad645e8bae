use anyhow::Result;
use ddg_app::cli::{Cli, CliError};
use ddg_app::run::{build_searcher, execute, load_config, start_logging};
use ddg_runtime::DdgRuntime;
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> Result<ExitCode> {
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => return Ok(report(err)),
    };

    // 1) Load config (env wins over files, flags win over both)
    let cfg = load_config(cli.config.as_deref())?;
    let inv = match cli.resolve(&cfg.search) {
        Ok(inv) => inv,
        Err(err) => return Ok(report(err)),
    };

    // 2) Logging goes to the rolling file; stderr carries progress
    let log_path = start_logging(&cfg.logging);
    tracing::debug!(target: "app", log = ?log_path, query = %inv.query, "app.start");

    // 3) Runtime with Ctrl-C wired to the shared cancellation token
    let searcher = build_searcher(&cfg)?;
    let runtime = DdgRuntime::build("ddg-search", None)?;
    let handle = runtime.handle();
    let _watcher = handle.cancel_on_ctrl_c();
    let cancel = handle.cancellation().as_ref().clone();

    let mut stdout = std::io::stdout().lock();
    let outcome = runtime.block_on(execute(&inv, &searcher, Some(cancel), &mut stdout));
    runtime.shutdown(Duration::from_millis(250));

    outcome?;
    Ok(ExitCode::SUCCESS)
}

fn report(err: CliError) -> ExitCode {
    eprintln!("{err}");
    ExitCode::FAILURE
}
