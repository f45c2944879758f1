use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::DomainError;

/// 期日文字列を UTC のインスタントへ正規化する。
///
/// 受理する形式（上から順に試行）:
/// 1. オフセット付き RFC 3339（`2024-03-01T14:35:00+09:00` / `...Z`）→ UTC へ換算
/// 2. オフセットなしの素のタイムスタンプ → 時計の読みをそのまま UTC とみなす。
///    ユーザーが入力した「14:35」はサーバのロケールに関係なく 14:35 のまま
///    保存・再表示される。
///
/// どちらにも合致しない文字列は `InvalidDueDatetime` で拒否する。
pub fn parse_due_datetime(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    const BARE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in BARE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(DomainError::InvalidDueDatetime(raw.to_string()))
}
