/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 把毫秒时间戳拆成本地化展示用的 (fecha, hora) 两段。
///
/// 通知模板的变量按西语习惯使用 `dd/mm/YYYY` 和 `HH:MM`。
pub fn fecha_hora(millis: i64) -> (String, String) {
    let dt = chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default();
    (
        dt.format("%d/%m/%Y").to_string(),
        dt.format("%H:%M").to_string(),
    )
}
