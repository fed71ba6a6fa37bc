//! Worksheet row layout, columns A through L.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::store::StoredRegistration;

pub const FIRST_COLUMN: char = 'A';
pub const LAST_COLUMN: char = 'L';

/// Column holding the external identity.
pub const IDENTITY_COLUMN: char = 'B';

pub const HEADER: [&str; 12] = [
    "ID",
    "Telegram ID",
    "Username",
    "Имя",
    "Фамилия",
    "Пакет участия",
    "Участвовал ранее",
    "Год участия",
    "Выпускник ВШМ",
    "Год выпуска",
    "Дата регистрации",
    "Дата обновления",
];

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";
const NO_USERNAME: &str = "Нет username";

/// Render a stored registration as one worksheet row.
pub fn mirror_row(stored: &StoredRegistration) -> Vec<Value> {
    let record = &stored.record;
    vec![
        Value::from(stored.id),
        Value::from(record.telegram_id.as_i64()),
        Value::from(match record.username.as_deref() {
            Some(handle) if !handle.is_empty() => format!("@{handle}"),
            _ => NO_USERNAME.to_string(),
        }),
        Value::from(record.first_name.as_str()),
        Value::from(record.last_name.as_str()),
        Value::from(record.package_type.display_name()),
        Value::from(yes_no(record.participated_before)),
        Value::from(record.participation_year.as_deref().unwrap_or_default()),
        Value::from(yes_no(record.is_graduate)),
        Value::from(record.graduation_year.as_deref().unwrap_or_default()),
        Value::from(format_datetime(&stored.created_at)),
        Value::from(format_datetime(&stored.updated_at)),
    ]
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Да" } else { "Нет" }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// Text of a cell as the spreadsheet would display it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Zero-based index of a column letter (`'A'` is 0).
pub fn column_index(column: char) -> usize {
    (column.to_ascii_uppercase() as usize).saturating_sub('A' as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::package::Package;
    use crate::registration::record::RegistrationRecord;
    use crate::registration::session::ExternalIdentity;
    use chrono::TimeZone;

    fn stored(username: Option<&str>) -> StoredRegistration {
        StoredRegistration {
            id: 3,
            record: RegistrationRecord {
                telegram_id: ExternalIdentity(123456789),
                username: username.map(String::from),
                first_name: "Anna".into(),
                last_name: "Ivanova".into(),
                package_type: Package::Full,
                participated_before: true,
                participation_year: Some("2015".into()),
                is_graduate: false,
                graduation_year: None,
            },
            created_at: Utc.with_ymd_and_hms(2025, 9, 1, 14, 5, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 9, 2, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn row_layout() {
        let row = mirror_row(&stored(Some("anna_i")));
        assert_eq!(row.len(), HEADER.len());
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        assert_eq!(
            cells,
            vec![
                "3",
                "123456789",
                "@anna_i",
                "Anna",
                "Ivanova",
                "Деловая программа и гала-ужин - 5 990₽",
                "Да",
                "2015",
                "Нет",
                "",
                "01.09.2025 14:05",
                "02.09.2025 09:30",
            ]
        );
    }

    #[test]
    fn missing_handle_placeholder() {
        let row = mirror_row(&stored(None));
        assert_eq!(cell_text(&row[2]), "Нет username");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_index(FIRST_COLUMN), 0);
        assert_eq!(column_index(IDENTITY_COLUMN), 1);
        assert_eq!(column_index(LAST_COLUMN), HEADER.len() - 1);
    }
}
