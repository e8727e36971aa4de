use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use rust_i18n::t;
use video_thumbnail_cache::config::Config;
use video_thumbnail_cache::init;
use video_thumbnail_cache::menu::show_main_menu;
use video_thumbnail_cache::signal::setup_shutdown_signal;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());
    info!(
        "快取資料夾: {}（{}）",
        config.settings.cache_root().display(),
        config.settings.cache_keying
    );

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("common.error")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
