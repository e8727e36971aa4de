use crate::component::{CacheCleaner, ThumbnailCacheGenerator};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_thumbnail_cache_generator(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    let mut generator = ThumbnailCacheGenerator::new(config, Arc::clone(shutdown_signal));

    if let Err(e) = generator.run() {
        eprintln!("{} {:#}", style(t!("common.error")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_cache_cleaner(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    let cleaner = CacheCleaner::new(config, Arc::clone(shutdown_signal));

    if let Err(e) = cleaner.run() {
        eprintln!("{} {:#}", style(t!("common.error")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
