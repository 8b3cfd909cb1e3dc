use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct SettingRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Render settings as a rounded table; empty input renders nothing
pub fn settings_table(rows: &[SettingRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_table() {
        assert!(settings_table(&[]).is_empty());

        let rendered = settings_table(&[SettingRow {
            name: "Theme".to_string(),
            value: "dark".to_string(),
        }]);
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("Theme"));
        assert!(rendered.contains("dark"));
    }
}
