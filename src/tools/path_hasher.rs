use std::path::{Path, PathBuf};

/// 快取目錄名稱中保留的雜湊長度（hex 字元）
const KEY_HEX_LEN: usize = 16;

/// 以 BLAKE3 計算完整路徑的雜湊，作為快取子資料夾的區別碼
///
/// 優先使用 canonical 路徑；檔案不存在時退回以工作目錄補成絕對路徑。
#[must_use]
pub fn path_cache_key(path: &Path) -> String {
    let resolved = resolve_full_path(path);
    let hash = blake3::hash(resolved.to_string_lossy().as_bytes());
    hash.to_hex()[..KEY_HEX_LEN].to_string()
}

fn resolve_full_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}
