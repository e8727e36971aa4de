use env_logger::Env;

/// 預設只顯示警告以上的日誌，避免干擾互動選單；可用 `RUST_LOG` 覆寫
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}
