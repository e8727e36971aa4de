use crate::config::save::save_settings;
use crate::config::{
    CacheKeying, Config, Distribution, GenerationParameters, Language, MAX_QUALITY, MIN_QUALITY,
    ScanOptions,
};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use rust_i18n::t;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// 設定選單
pub fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_generation"),
            t!("settings.opt_scan"),
            t!("settings.opt_concurrency"),
            t!("settings.opt_cache_dir"),
            t!("settings.opt_cache_keying"),
            t!("settings.opt_default_folder"),
            t!("settings.opt_tool_path"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_generation_menu(term, config)?,
            Some(1) => show_scan_menu(term, config)?,
            Some(2) => edit_concurrency(config)?,
            Some(3) => edit_cache_dir(config)?,
            Some(4) => show_cache_keying_menu(term, config)?,
            Some(5) => edit_default_folder(config)?,
            Some(6) => edit_tool_path(config)?,
            Some(7) => show_language_menu(term, config)?,
            Some(8) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

fn prompt_value<T>(prompt: impl Into<String>, current: T) -> Result<T>
where
    T: Clone + Display + FromStr,
    T::Err: Display,
{
    Ok(Input::<T>::new()
        .with_prompt(prompt)
        .default(current)
        .interact_text()?)
}

fn save_and_report(config: &Config, value: impl Display) -> Result<()> {
    save_settings(&config.settings)?;
    println!("\n{} {}", style(t!("settings.saved")).green(), value);
    std::thread::sleep(Duration::from_secs(1));
    Ok(())
}

/// 縮圖產生參數；任何變更都會使既有快取失效
fn show_generation_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.generation.title")).cyan().bold());
        println!("{}", style(t!("settings.generation.invalidate_hint")).yellow());

        let params = &config.settings.generation;
        let options = vec![
            format!("{}: {}", t!("settings.generation.count"), params.thumbnail_count),
            format!("{}: {}", t!("settings.generation.width"), params.thumbnail_width),
            format!("{}: {}", t!("settings.generation.quality"), params.quality),
            format!("{}: {}", t!("settings.generation.distribution"), params.distribution),
            format!("{}: {}", t!("settings.generation.peak"), params.peak_position),
            format!("{}: {}", t!("settings.generation.concentration"), params.concentration),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        let Some(index) = selection.filter(|i| *i < options.len() - 1) else {
            return Ok(());
        };

        let current = config.settings.generation.clone();
        let updated = match index {
            0 => GenerationParameters {
                thumbnail_count: prompt_value(t!("settings.generation.count"), current.thumbnail_count)?,
                ..current.clone()
            },
            1 => GenerationParameters {
                thumbnail_width: prompt_value(t!("settings.generation.width"), current.thumbnail_width)?,
                ..current.clone()
            },
            2 => GenerationParameters {
                quality: prompt_value(
                    t!("settings.generation.quality_range", min = MIN_QUALITY, max = MAX_QUALITY),
                    current.quality,
                )?,
                ..current.clone()
            },
            3 => {
                let Some(distribution) = select_distribution(term, current.distribution)? else {
                    continue;
                };
                GenerationParameters {
                    distribution,
                    ..current.clone()
                }
            }
            4 => GenerationParameters {
                peak_position: prompt_value(t!("settings.generation.peak"), current.peak_position)?,
                ..current.clone()
            },
            _ => GenerationParameters {
                concentration: prompt_value(
                    t!("settings.generation.concentration"),
                    current.concentration,
                )?,
                ..current.clone()
            },
        }
        .normalized();

        if updated != current {
            config.settings.generation = updated;
            save_and_report(config, t!("settings.generation.title"))?;
        }
    }
}

fn select_distribution(term: &Term, current: Distribution) -> Result<Option<Distribution>> {
    let items: Vec<String> = Distribution::ALL.iter().map(ToString::to_string).collect();
    let default_index = Distribution::ALL
        .iter()
        .position(|d| *d == current)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.generation.distribution"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    Ok(selection.map(|i| Distribution::ALL[i]))
}

fn show_scan_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.scan.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let scan = &config.settings.scan;
        let options = vec![
            format!("{}: {}", t!("settings.scan.min_size"), scan.min_size_mb),
            format!("{}: {}", t!("settings.scan.min_duration"), scan.min_duration_seconds),
            format!("{}: {}", t!("settings.scan.excluded"), scan.excluded_words_display()),
            format!("{}: {}", t!("settings.scan.use_regex"), scan.use_regex),
            format!("{}: {}", t!("settings.scan.full_path"), scan.match_full_path),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        let Some(index) = selection.filter(|i| *i < options.len() - 1) else {
            return Ok(());
        };

        let current = config.settings.scan.clone();
        let updated = match index {
            0 => ScanOptions {
                min_size_mb: prompt_value(t!("settings.scan.min_size"), current.min_size_mb)?.max(0.0),
                ..current.clone()
            },
            1 => ScanOptions {
                min_duration_seconds: prompt_value(
                    t!("settings.scan.min_duration"),
                    current.min_duration_seconds,
                )?
                .max(0.0),
                ..current.clone()
            },
            2 => {
                let words: String = Input::new()
                    .with_prompt(t!("settings.scan.excluded_prompt"))
                    .with_initial_text(current.excluded_words_display())
                    .allow_empty(true)
                    .interact_text()?;
                ScanOptions {
                    excluded_patterns: ScanOptions::parse_excluded_words(&words),
                    ..current.clone()
                }
            }
            3 => ScanOptions {
                use_regex: Confirm::new()
                    .with_prompt(t!("settings.scan.use_regex"))
                    .default(current.use_regex)
                    .interact()?,
                ..current.clone()
            },
            _ => ScanOptions {
                match_full_path: Confirm::new()
                    .with_prompt(t!("settings.scan.full_path"))
                    .default(current.match_full_path)
                    .interact()?,
                ..current.clone()
            },
        };

        if updated != current {
            config.settings.scan = updated;
            save_and_report(config, t!("settings.scan.title"))?;
        }
    }
}

fn edit_concurrency(config: &mut Config) -> Result<()> {
    let value = prompt_value(
        t!("settings.opt_concurrency"),
        config.settings.concurrent_videos,
    )?
    .max(1);

    if value != config.settings.concurrent_videos {
        config.settings.concurrent_videos = value;
        save_and_report(config, value)?;
    }
    Ok(())
}

fn edit_cache_dir(config: &mut Config) -> Result<()> {
    println!(
        "{} {}",
        style(t!("settings.cache_dir.current")).dim(),
        config.settings.cache_root().display()
    );

    let value: String = Input::new()
        .with_prompt(t!("settings.cache_dir.prompt"))
        .with_initial_text(config.settings.cache_dir.clone())
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim().to_string();

    if value != config.settings.cache_dir {
        config.settings.cache_dir = value;
        let root = config.settings.cache_root();
        save_and_report(config, root.display())?;
    }
    Ok(())
}

fn show_cache_keying_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.cache_keying.title")).cyan().bold());
    println!("{}", style(t!("settings.cache_keying.hint")).dim());

    let modes = [CacheKeying::FileName, CacheKeying::PathHash];
    let items: Vec<String> = vec![
        t!("settings.cache_keying.file_name").to_string(),
        t!("settings.cache_keying.path_hash").to_string(),
    ];

    let default_index = modes
        .iter()
        .position(|&m| m == config.settings.cache_keying)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected = modes[selection];
    if selected != config.settings.cache_keying {
        config.settings.cache_keying = selected;
        save_and_report(config, selected)?;
    }
    Ok(())
}

fn edit_default_folder(config: &mut Config) -> Result<()> {
    let value: String = Input::new()
        .with_prompt(t!("settings.opt_default_folder"))
        .with_initial_text(config.settings.default_folder.clone())
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim().to_string();

    if value != config.settings.default_folder {
        config.settings.default_folder = value.clone();
        save_and_report(config, value)?;
    }
    Ok(())
}

fn edit_tool_path(config: &mut Config) -> Result<()> {
    let value: String = Input::new()
        .with_prompt(t!("settings.opt_tool_path"))
        .with_initial_text(config.settings.tool_path.clone())
        .interact_text()?;
    let value = value.trim().to_string();

    if !value.is_empty() && value != config.settings.tool_path {
        config.settings.tool_path = value.clone();
        save_and_report(config, value)?;
    }
    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];
    let items: Vec<String> = languages.iter().map(ToString::to_string).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];
    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_and_report(config, selected_lang)?;
    }

    Ok(())
}
