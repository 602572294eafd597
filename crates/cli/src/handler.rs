use eyre::EyreHandler;
use itertools::Itertools;
use litsafe_common::errors::dedup_chain;
use std::{error::Error, fmt};

/// Error reporter for the `litsafe` binary.
///
/// Prints the deduplicated error chain. When a verbose report is attached it takes over the
/// `Debug` rendering.
pub struct Handler {
    verbose: Option<Box<dyn EyreHandler>>,
}

impl Handler {
    pub fn new(verbose: Option<Box<dyn EyreHandler>>) -> Self {
        Self { verbose }
    }
}

impl EyreHandler for Handler {
    fn display(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Display;
        dedup_chain(error).into_iter().format("; ").fmt(f)
    }

    fn debug(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(verbose) = &self.verbose {
            return verbose.debug(error, f);
        }
        let chain = dedup_chain(error);
        let Some((head, causes)) = chain.split_first() else { return Ok(()) };
        write!(f, "{head}")?;
        for cause in causes {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }

    fn track_caller(&mut self, location: &'static std::panic::Location<'static>) {
        if let Some(verbose) = &mut self.verbose {
            verbose.track_caller(location);
        }
    }
}

/// Installs the `litsafe` error and panic hooks.
///
/// `LITSAFE_DEBUG` switches error reports to the `color-eyre` format with span trace and
/// backtrace. Panics always use it.
pub fn install() {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section("litsafe panicked; please report the command that triggered it.")
        .into_hooks();
    panic_hook.install();
    let eyre_hook = eyre_hook.into_eyre_hook();
    let verbose = std::env::var_os("LITSAFE_DEBUG").is_some();
    let installed = eyre::set_hook(Box::new(move |error| {
        Box::new(Handler::new(verbose.then(|| eyre_hook(error))))
    }));
    if let Err(err) = installed {
        debug!("eyre hook already installed: {err}");
    }
}
