use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use crate::model::UIData;
use crate::sort::SortDirection;

pub const CMDLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;

const STATUS_MESSAGE_FADE: Duration = Duration::from_secs(5);

/// The per column direction marker. Total over the three sort states.
pub fn direction_glyph(direction: Option<SortDirection>) -> &'static str {
    match direction {
        Some(SortDirection::Ascending) => "▲",
        Some(SortDirection::Descending) => "▼",
        None => "⇅",
    }
}

pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        TableUI
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let area = frame.area();
        let layout = &uidata.layout;
        let table_y = area.y + TABLE_HEADER_HEIGHT as u16;

        // Row number gutter
        if layout.index_width > 0 {
            let rect = Rect::new(
                area.x,
                table_y,
                layout.index_width as u16,
                layout.index_height as u16,
            )
            .intersection(area);
            let lines: Vec<Line> = uidata
                .index
                .data
                .iter()
                .map(|s| {
                    Line::styled(format!("{s:>w$}", w = uidata.index.width), Style::new().dim())
                })
                .collect();
            frame.render_widget(Paragraph::new(Text::from(lines)), rect);
        }

        // Column panes, header line first
        let mut x = area.x + layout.index_width as u16;
        for (cidx, column) in uidata.table.iter().enumerate() {
            let width = column.width as u16 + 1;
            let rect = Rect::new(
                x,
                area.y,
                width,
                (TABLE_HEADER_HEIGHT + layout.table_height) as u16,
            )
            .intersection(area);

            let mut lines = Vec::with_capacity(column.data.len() + 1);
            let header_style = if cidx == uidata.selected_column {
                Style::new().bold().underlined()
            } else {
                Style::new().bold()
            };
            lines.push(Line::styled(pad(&column.name, column.width), header_style));
            for (ridx, cell) in column.data.iter().enumerate() {
                let mut style = Style::new();
                if ridx == uidata.selected_row {
                    style = style.add_modifier(Modifier::REVERSED);
                    if cidx == uidata.selected_column {
                        style = style.bold();
                    }
                }
                lines.push(Line::styled(pad(cell, column.width), style));
            }
            frame.render_widget(Paragraph::new(Text::from(lines)), rect);

            x += width;
            if x >= area.right() {
                break;
            }
        }

        // Scrollbar over the full record count
        let scrollbar_rect = Rect::new(
            area.right().saturating_sub(SCROLLBAR_WIDTH as u16),
            table_y,
            SCROLLBAR_WIDTH as u16,
            layout.table_height as u16,
        )
        .intersection(area);
        let mut scrollbar_state =
            ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_rect,
            &mut scrollbar_state,
        );

        // Status line: message left, position right
        let status_rect = Rect::new(
            area.x,
            area.bottom()
                .saturating_sub(layout.statusline_height as u16),
            layout.statusline_width as u16,
            layout.statusline_height as u16,
        )
        .intersection(area);
        let mut status_style = Style::new();
        if uidata.last_status_message_update.elapsed() > STATUS_MESSAGE_FADE {
            status_style = status_style.dim();
        }
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                uidata.status_message.clone(),
                status_style,
            ))),
            status_rect,
        );
        let position = if uidata.nrows > 0 {
            format!(
                "{} | row {}/{}",
                uidata.name,
                uidata.abs_selected_row + 1,
                uidata.nrows
            )
        } else {
            format!("{} | empty", uidata.name)
        };
        frame.render_widget(
            Paragraph::new(Line::from(position)).alignment(Alignment::Right),
            status_rect,
        );

        if uidata.show_popup {
            let popup = centered_rect(area, 60, 80);
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(uidata.popup_message.clone())
                    .block(Block::bordered().title(" Help ")),
                popup,
            );
        }
    }
}

// Clip to the column width and pad the remainder with spaces.
fn pad(content: &str, width: usize) -> String {
    let mut out: String = content.chars().take(width).collect();
    let used = out.chars().count();
    for _ in used..width {
        out.push(' ');
    }
    out
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
