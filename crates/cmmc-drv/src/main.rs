use anyhow::Context;
use cmmc_drv::{Config, DriverError, Session};

fn main() {
    if let Err(e) = run() {
        // Stage logs carry the per-error lines; print them before the
        // summary so the positions are visible.
        if let Some(DriverError::StageFailed { log, .. }) = e.downcast_ref::<DriverError>() {
            eprint!("{}", log);
        }
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_args(std::env::args().skip(1)).context("bad command line")?;
    let session = Session::new(config);
    session.run()?;
    Ok(())
}
