pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, success, summary_row, value_text, warn};
pub use table::{settings_table, SettingRow};
pub use theme::{theme, Theme};
