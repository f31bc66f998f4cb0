use derive_setters::Setters;
use polars::error::PolarsError;
use std::io::Error;

use crate::sort::SortDirection;

#[derive(Debug)]
pub enum SVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    UnknownColumn(String),
}

impl From<Error> for SVError {
    fn from(err: Error) -> Self {
        SVError::IoError(err)
    }
}

impl From<PolarsError> for SVError {
    fn from(err: PolarsError) -> Self {
        SVError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct SVConfig {
    /// How long the controller blocks waiting for a terminal event, in ms.
    pub event_poll_time: u64,
    /// Widest a single column may render, in cells.
    pub max_column_width: usize,
}

impl Default for SVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    SortColumn,
    ToggleIndex,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
}

/// Parse a `column` or `column:direction` sort argument.
pub fn parse_sort_spec(s: &str) -> Result<(String, SortDirection), String> {
    match s.split_once(':') {
        None => Ok((s.to_string(), SortDirection::Ascending)),
        Some((column, "asc")) => Ok((column.to_string(), SortDirection::Ascending)),
        Some((column, "desc")) => Ok((column.to_string(), SortDirection::Descending)),
        Some((_, other)) => Err(format!("unknown direction \"{other}\", expected asc or desc")),
    }
}

pub const HELP_TEXT: &str = "
 sv - sortable record viewer

 Movement
   Up/k Down/j    move row selection
   Left/h Right/l move column selection
   PgUp/PgDn      move a page
   g/G            first/last row
   0/$            first/last column

 Sorting
   s or Enter     sort by the selected column
                  (ascending -> descending -> original order)

 Other
   i              toggle the row number gutter
   c              copy the selected cell
   y              copy the selected row
   ?              this help
   Esc            close popup
   q              quit
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_spec_defaults_to_ascending() {
        assert_eq!(
            parse_sort_spec("name"),
            Ok(("name".to_string(), SortDirection::Ascending))
        );
    }

    #[test]
    fn sort_spec_accepts_both_directions() {
        assert_eq!(
            parse_sort_spec("score:asc"),
            Ok(("score".to_string(), SortDirection::Ascending))
        );
        assert_eq!(
            parse_sort_spec("score:desc"),
            Ok(("score".to_string(), SortDirection::Descending))
        );
    }

    #[test]
    fn sort_spec_rejects_unknown_directions() {
        assert!(parse_sort_spec("score:up").is_err());
    }

    #[test]
    fn config_setters_chain() {
        let config = SVConfig::default()
            .with_event_poll_time(50)
            .with_max_column_width(20);
        assert_eq!(config.event_poll_time, 50);
        assert_eq!(config.max_column_width, 20);
    }
}
