use std::time::Instant;

use arboard::Clipboard;
use tracing::{error, trace};

use crate::domain::{HELP_TEXT, Message, SVConfig, SVError};
use crate::loader::{ColumnMeta, Row, TableData};
use crate::sort::{SortDirection, SortKey, SortView};
use crate::ui::{
    CMDLINE_HEIGHT, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT, direction_glyph,
};
use crate::value::Value;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
}

/// The field accessor handed to the sort engine: fields are column indices,
/// and a column a record does not have reads as absent.
fn row_field(row: &Row, column: &usize) -> Value {
    row.values.get(*column).cloned().unwrap_or(Value::Absent)
}

#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: "".to_string(),
            width: 0,
            data: Vec::new(),
        }
    }
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::empty(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
    pub index_height: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_model(model: &Model, ui_width: usize, ui_height: usize) -> Self {
        UILayout::from_values(model.index_width(), ui_width, ui_height)
    }

    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width.saturating_sub(SCROLLBAR_WIDTH + index_width);
        let table_height = ui_height.saturating_sub(CMDLINE_HEIGHT + TABLE_HEADER_HEIGHT);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
            index_width,
            index_height: table_height,
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGHT,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: SVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    columns: Vec<ColumnMeta>,
    view: SortView<Row, usize>,
    visible_columns: Vec<usize>,
    render_widths: Vec<usize>,
    table_views: Vec<ColumnView>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    show_index: bool,
    index: ColumnView,
    uilayout: UILayout,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &SVConfig,
        data: TableData,
        initial_sort: Option<(String, SortDirection)>,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, SVError> {
        let TableData {
            name,
            columns,
            rows,
        } = data;

        let view = match initial_sort {
            Some((column, direction)) => {
                let field = columns
                    .iter()
                    .position(|c| c.name == column)
                    .ok_or(SVError::UnknownColumn(column))?;
                SortView::with_initial(rows, row_field, SortKey { field, direction })
            }
            None => SortView::new(rows, row_field),
        };

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name,
            columns,
            view,
            visible_columns: Vec::new(),
            render_widths: Vec::new(),
            table_views: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            show_index: true,
            index: ColumnView::empty(),
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            status_message: "Started sv!".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.uilayout = UILayout::from_model(&model, ui_width, ui_height);
        model.update_table_data();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn update(&mut self, message: Message) -> Result<(), SVError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height + 1),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height + 1),
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::MoveToFirstColumn => self.select_column(0),
                Message::MoveToLastColumn => {
                    self.select_column(self.columns.len().saturating_sub(1))
                }
                Message::SortColumn => self.sort_selected_column(),
                Message::ToggleIndex => self.toggle_index(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Exit => (),
                Message::Resize(width, height) => self.ui_resize(width, height),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Sorting ---------------------- //

    /// Advance the sort directive on the selected column one step along
    /// ascending -> descending -> original order.
    fn sort_selected_column(&mut self) {
        if self.columns.is_empty() {
            return;
        }
        let column = self.offset_column + self.curser_column;
        self.view.request_sort(column);

        let message = match self.view.sort_key() {
            Some(key) => format!(
                "Sorted by {} {}",
                self.columns[key.field].name,
                direction_glyph(Some(key.direction))
            ),
            None => "Sort cleared, original order restored".to_string(),
        };
        self.set_status_message(message);
        self.update_table_data();
    }

    // -------------------- View data ---------------------- //

    fn index_width(&self) -> usize {
        if self.show_index {
            self.view.len().to_string().len()
        } else {
            0
        }
    }

    // The index gutter shows original record numbers resolved through the
    // derived order, so a sorted view exposes where each record came from.
    fn build_index(&mut self) {
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.view.len());

        let data = self.view.order()[rbegin..rend]
            .iter()
            .map(|idx| (idx + 1).to_string())
            .collect::<Vec<String>>();
        self.index = ColumnView {
            name: "".to_string(),
            width: self.view.len().to_string().len(),
            data,
        }
    }

    fn update_table_data(&mut self) {
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.view.len());

        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, tw {}, th {}",
            self.curser_row,
            self.curser_column,
            self.offset_row,
            self.offset_column,
            rbegin,
            rend,
            self.uilayout.table_width,
            self.uilayout.table_height
        );

        // The header carries a direction marker, so it always claims two
        // extra cells next to the column name.
        self.render_widths = self
            .columns
            .iter()
            .map(|c| {
                let width =
                    std::cmp::max(c.name.chars().count() + 2, c.max_width) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, self.config.max_column_width)
            })
            .collect();

        // Collect the columns that fit in the table, starting at the offset
        self.visible_columns.clear();
        let mut visible_width = 0;
        for cidx in self.offset_column..self.render_widths.len() {
            let width = self.render_widths[cidx];
            if visible_width + width + 1 <= self.uilayout.table_width {
                self.visible_columns.push(cidx);
                visible_width += width + 1;
            } else {
                // the last column may render partially
                if visible_width < self.uilayout.table_width {
                    let remaining = self.uilayout.table_width - visible_width;
                    self.visible_columns.push(cidx);
                    self.render_widths[cidx] = remaining;
                }
                break;
            }
        }

        // Growing columns can shrink the visible set; keep the curser on it
        if !self.visible_columns.is_empty() {
            self.curser_column = std::cmp::min(self.curser_column, self.visible_columns.len() - 1);
        }

        // Window the derived order into per column views
        let order = &self.view.order()[rbegin..rend];
        let records = self.view.records();
        let mut table = Vec::with_capacity(self.visible_columns.len());
        for &cidx in self.visible_columns.iter() {
            let width = self.render_widths[cidx];
            let marker = direction_glyph(self.view.direction(&cidx));
            let name =
                Self::get_visible_name(format!("{} {}", self.columns[cidx].name, marker), width);
            let data = order
                .iter()
                .map(|&ridx| records[ridx].display.get(cidx).cloned().unwrap_or_default())
                .collect();
            table.push(ColumnView { name, width, data });
        }
        self.table_views = table;

        self.build_index();
        self.update_uidata_for_table();
    }

    fn update_uidata_for_table(&mut self) {
        self.uidata = UIData {
            name: self.name.clone(),
            table: self.table_views.clone(),
            index: if self.show_index {
                self.index.clone()
            } else {
                ColumnView::empty()
            },
            nrows: self.view.len(),
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.offset_row + self.curser_row,
            show_popup: false,
            popup_message: String::new(),
            layout: self.uilayout.clone(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        }
    }

    fn get_visible_name(name: String, width: usize) -> String {
        if width < 3 {
            return "".to_string();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            return reduced;
        }
        name
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    // -------------------- Control handling ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.uidata.show_popup = false;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_model(self, width, height);
        match self.modus {
            Modus::TABLE => self.update_table_data(),
            Modus::POPUP => {
                self.uidata.layout = self.uilayout.clone();
            }
        }
    }

    fn toggle_index(&mut self) {
        self.show_index = !self.show_index;

        // The gutter changes the layout of everything next to it
        self.uilayout = UILayout::from_model(self, self.uilayout.width, self.uilayout.height);
        self.update_table_data();
    }

    fn select_column(&mut self, column: usize) {
        if self.visible_columns.contains(&column) {
            self.curser_column = self
                .visible_columns
                .iter()
                .position(|&c| c == column)
                .unwrap_or(0);
        } else {
            self.offset_column = column;
            self.curser_column = 0;
        }
        self.update_table_data();
    }

    fn move_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn move_selection_end(&mut self) {
        if self.view.is_empty() || self.uilayout.table_height == 0 {
            return;
        }
        if self.view.len() < self.uilayout.table_height {
            self.offset_row = 0;
            self.curser_row = self.view.len() - 1;
        } else {
            self.offset_row = self.view.len() - self.uilayout.table_height;
            self.curser_row = self.uilayout.table_height - 1;
        }
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.curser_row > 0 {
            self.curser_row = self.curser_row.saturating_sub(size);
        } else {
            // Curser at the top, shift the table instead
            self.offset_row = self.offset_row.saturating_sub(size);
        }
        self.update_table_data();
    }

    fn move_selection_down(&mut self, size: usize) {
        if self.view.is_empty() || self.uilayout.table_height == 0 {
            return;
        }
        if self.curser_row + self.offset_row < self.view.len() - 1 {
            if self.curser_row < self.uilayout.table_height - 1 {
                self.curser_row = std::cmp::min(
                    self.curser_row + size,
                    std::cmp::min(
                        self.uilayout.table_height - 1,
                        self.view.len() - self.offset_row - 1,
                    ),
                );
            } else {
                // At the bottom of the frame, shift the table down
                self.offset_row = std::cmp::min(self.offset_row + size, self.view.len() - 1);
                self.curser_row = std::cmp::min(
                    self.uilayout.table_height - 1,
                    self.view.len() - self.offset_row - 1,
                );
            }
            self.update_table_data();
        }
    }

    fn move_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.columns.is_empty() {
            return;
        }
        if self.curser_column + self.offset_column < self.columns.len() - 1 {
            if self.curser_column < self.visible_columns.len().saturating_sub(1) {
                self.curser_column += 1;
            } else {
                self.offset_column += 1;
            }
            self.update_table_data();
        }
    }

    // -------------------- Clipboard ---------------------- //

    fn copy_cell(&mut self) {
        let column = self.offset_column + self.curser_column;
        let Some(row) = self.view.record(self.offset_row + self.curser_row) else {
            return;
        };
        let cell = row.display.get(column).cloned().unwrap_or_default();
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_row(&mut self) {
        let Some(row) = self.view.record(self.offset_row + self.curser_row) else {
            return;
        };
        let content = row
            .display
            .iter()
            .map(Model::wrap_cell_content)
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content);
    }

    fn wrap_cell_content(c: &String) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace("\"", "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    // The clipboard is opened per copy. Headless sessions have none, which
    // lands on the status line instead of tearing down the view.
    fn copy_to_clipboard(&mut self, content: String) {
        match Clipboard::new() {
            Ok(mut clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => {
                    error!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Clipboard error, see log");
                }
            },
            Err(e) => {
                error!("Clipboard unavailable: {:?}", e);
                self.set_status_message("Clipboard unavailable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(display: &[&str], values: &[Value]) -> Row {
        Row {
            display: display.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    fn table() -> TableData {
        TableData {
            name: "test".into(),
            columns: vec![
                ColumnMeta {
                    name: "name".into(),
                    max_width: 6,
                },
                ColumnMeta {
                    name: "score".into(),
                    max_width: 5,
                },
            ],
            rows: vec![
                row(
                    &["banana", "2"],
                    &[Value::Text("banana".into()), Value::Number(2.0)],
                ),
                row(
                    &["Apple", "∅"],
                    &[Value::Text("Apple".into()), Value::Absent],
                ),
                row(
                    &["cherry", "1"],
                    &[Value::Text("cherry".into()), Value::Number(1.0)],
                ),
            ],
        }
    }

    fn model() -> Model {
        Model::init(&SVConfig::default(), table(), None, 80, 24).unwrap()
    }

    fn column_data(model: &Model, column: usize) -> Vec<String> {
        model.get_uidata().table[column].data.clone()
    }

    #[test]
    fn init_shows_records_in_input_order() {
        let m = model();
        assert_eq!(m.get_uidata().name, "test");
        assert_eq!(column_data(&m, 0), vec!["banana", "Apple", "cherry"]);
        assert_eq!(m.get_uidata().index.data, vec!["1", "2", "3"]);
        assert_eq!(m.get_uidata().nrows, 3);
    }

    #[test]
    fn sort_message_cycles_the_selected_column() {
        let mut m = model();

        m.update(Message::SortColumn).unwrap();
        assert_eq!(column_data(&m, 0), vec!["Apple", "banana", "cherry"]);
        assert_eq!(m.get_uidata().index.data, vec!["2", "1", "3"]);

        m.update(Message::SortColumn).unwrap();
        assert_eq!(column_data(&m, 0), vec!["cherry", "banana", "Apple"]);

        m.update(Message::SortColumn).unwrap();
        assert_eq!(column_data(&m, 0), vec!["banana", "Apple", "cherry"]);
        assert_eq!(m.get_uidata().index.data, vec!["1", "2", "3"]);
    }

    #[test]
    fn sorted_header_carries_the_direction_marker() {
        let mut m = model();
        assert!(m.get_uidata().table[0].name.contains('⇅'));
        m.update(Message::SortColumn).unwrap();
        assert!(m.get_uidata().table[0].name.contains('▲'));
        m.update(Message::SortColumn).unwrap();
        assert!(m.get_uidata().table[0].name.contains('▼'));
    }

    #[test]
    fn sort_updates_the_status_line() {
        let mut m = model();
        m.update(Message::SortColumn).unwrap();
        assert!(m.get_uidata().status_message.contains("Sorted by name"));
        m.update(Message::SortColumn).unwrap();
        m.update(Message::SortColumn).unwrap();
        assert!(m.get_uidata().status_message.contains("Sort cleared"));
    }

    #[test]
    fn sorting_a_numeric_column_pushes_absent_last() {
        let mut m = model();
        m.update(Message::MoveRight).unwrap();
        m.update(Message::SortColumn).unwrap();
        assert_eq!(column_data(&m, 1), vec!["1", "2", "∅"]);
        assert_eq!(column_data(&m, 0), vec!["cherry", "banana", "Apple"]);
    }

    #[test]
    fn initial_sort_is_applied_at_startup() {
        let m = Model::init(
            &SVConfig::default(),
            table(),
            Some(("score".to_string(), SortDirection::Descending)),
            80,
            24,
        )
        .unwrap();
        assert_eq!(column_data(&m, 1), vec!["∅", "2", "1"]);
        assert!(m.get_uidata().table[1].name.contains('▼'));
    }

    #[test]
    fn unknown_initial_sort_column_is_an_error() {
        let result = Model::init(
            &SVConfig::default(),
            table(),
            Some(("salary".to_string(), SortDirection::Ascending)),
            80,
            24,
        );
        assert!(matches!(result, Err(SVError::UnknownColumn(c)) if c == "salary"));
    }

    #[test]
    fn quit_message_sets_the_status() {
        let mut m = model();
        assert_eq!(m.status, Status::READY);
        m.update(Message::Quit).unwrap();
        assert_eq!(m.status, Status::QUITTING);
    }

    #[test]
    fn row_selection_is_bounded() {
        let mut m = model();
        m.update(Message::MoveUp).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 0);

        m.update(Message::MoveDown).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 1);

        m.update(Message::MoveEnd).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 2);
        m.update(Message::MoveDown).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 2);

        m.update(Message::MoveBeginning).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn column_selection_is_bounded() {
        let mut m = model();
        m.update(Message::MoveLeft).unwrap();
        assert_eq!(m.get_uidata().selected_column, 0);
        m.update(Message::MoveRight).unwrap();
        assert_eq!(m.get_uidata().selected_column, 1);
        m.update(Message::MoveRight).unwrap();
        assert_eq!(m.get_uidata().selected_column, 1);
        m.update(Message::MoveToFirstColumn).unwrap();
        assert_eq!(m.get_uidata().selected_column, 0);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model();
        m.update(Message::Help).unwrap();
        assert!(m.get_uidata().show_popup);
        assert!(
            m.get_uidata()
                .popup_message
                .contains("sortable record viewer")
        );
        m.update(Message::Exit).unwrap();
        assert!(!m.get_uidata().show_popup);
    }

    #[test]
    fn sorting_is_ignored_while_the_popup_is_open() {
        let mut m = model();
        m.update(Message::Help).unwrap();
        m.update(Message::SortColumn).unwrap();
        m.update(Message::Exit).unwrap();
        assert_eq!(column_data(&m, 0), vec!["banana", "Apple", "cherry"]);
    }

    #[test]
    fn resize_recomputes_the_layout() {
        let mut m = model();
        m.update(Message::Resize(100, 40)).unwrap();
        assert_eq!(m.get_uidata().layout.width, 100);
        assert_eq!(m.get_uidata().layout.height, 40);
        assert_eq!(
            m.get_uidata().layout.table_height,
            40 - CMDLINE_HEIGHT - TABLE_HEADER_HEIGHT
        );
    }

    #[test]
    fn index_gutter_can_be_toggled_off() {
        let mut m = model();
        assert_eq!(m.get_uidata().layout.index_width, 1);
        m.update(Message::ToggleIndex).unwrap();
        assert_eq!(m.get_uidata().layout.index_width, 0);
        assert!(m.get_uidata().index.data.is_empty());
        m.update(Message::ToggleIndex).unwrap();
        assert_eq!(m.get_uidata().layout.index_width, 1);
    }

    #[test]
    fn empty_tables_are_handled() {
        let data = TableData {
            name: "empty".into(),
            columns: vec![ColumnMeta {
                name: "a".into(),
                max_width: 1,
            }],
            rows: Vec::new(),
        };
        let mut m = Model::init(&SVConfig::default(), data, None, 80, 24).unwrap();
        assert_eq!(m.get_uidata().nrows, 0);
        m.update(Message::MoveDown).unwrap();
        m.update(Message::MoveEnd).unwrap();
        m.update(Message::SortColumn).unwrap();
        assert_eq!(m.get_uidata().nrows, 0);
    }
}
