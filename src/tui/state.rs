//! Dashboard input state and key handling, kept apart from drawing.
//!
//! Every input change rebuilds the view from `(data, filter)`; nothing else is
//! carried between renders.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use crossterm::event::KeyCode;

use crate::dashboard::{DashboardData, DashboardView, Filter, build_view, default_selection};

/// Rows moved by PgUp/PgDn in the raw table.
const PAGE_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Start,
    End,
    Tickers,
    Rows,
}

impl Focus {
    const ORDER: [Focus; 4] = [Focus::Start, Focus::End, Focus::Tickers, Focus::Rows];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|&f| f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn is_date(self) -> bool {
        matches!(self, Focus::Start | Focus::End)
    }
}

pub struct DashboardState<'a> {
    data: &'a DashboardData,
    start: NaiveDate,
    end: NaiveDate,
    /// Explicitly selected tickers; empty means every ticker.
    selected: BTreeSet<String>,
    pub focus: Focus,
    /// Index into `data.tickers()`.
    pub cursor: usize,
    /// `Some` while a date is being typed for the focused bound.
    pub date_input: Option<String>,
    pub raw_expanded: bool,
    pub raw_scroll: usize,
    pub status: String,
    view: DashboardView,
}

impl<'a> DashboardState<'a> {
    pub fn new(data: &'a DashboardData) -> Self {
        let (start, end) = data.date_bounds();
        let selected: BTreeSet<String> = default_selection(data.tickers()).into_iter().collect();
        let filter = Filter::new(start, end, &selected.iter().cloned().collect::<Vec<_>>(), data.tickers());
        Self {
            data,
            start,
            end,
            selected,
            focus: Focus::Start,
            cursor: 0,
            date_input: None,
            raw_expanded: false,
            raw_scroll: 0,
            status: "Ready.".to_string(),
            view: build_view(data, &filter),
        }
    }

    pub fn data(&self) -> &DashboardData {
        self.data
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_selected(&self, ticker: &str) -> bool {
        self.selected.contains(ticker)
    }

    /// True when nothing is explicitly selected (so every ticker is shown).
    pub fn selection_cleared(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn filter(&self) -> Filter {
        let selected: Vec<String> = self.selected.iter().cloned().collect();
        Filter::new(self.start, self.end, &selected, self.data.tickers())
    }

    /// Apply one key press. Returns `true` when the dashboard should exit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.date_input.is_some() {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Left if self.focus.is_date() => self.shift_date(-1),
            KeyCode::Right if self.focus.is_date() => self.shift_date(1),
            KeyCode::Enter if self.focus.is_date() => {
                self.date_input = Some(String::new());
                self.status = "Type a date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Up => match self.focus {
                Focus::Rows => self.scroll_rows(-1),
                _ => self.cursor = self.cursor.saturating_sub(1),
            },
            KeyCode::Down => match self.focus {
                Focus::Rows => self.scroll_rows(1),
                _ => {
                    if self.cursor + 1 < self.data.tickers().len() {
                        self.cursor += 1;
                    }
                }
            },
            KeyCode::Char(' ') => self.toggle_cursor_ticker(),
            KeyCode::Char('c') => {
                self.selected.clear();
                self.status = "Selection cleared: showing every ticker.".to_string();
                self.refresh();
            }
            KeyCode::Char('r') => self.reset(),
            KeyCode::Char('v') => {
                self.raw_expanded = !self.raw_expanded;
                self.raw_scroll = 0;
            }
            KeyCode::PageDown => self.scroll_rows(PAGE_ROWS as isize),
            KeyCode::PageUp => self.scroll_rows(-(PAGE_ROWS as isize)),
            _ => {}
        }
        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        let Some(input) = self.date_input.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.date_input = None;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let typed = input.trim().to_string();
                self.date_input = None;
                match NaiveDate::parse_from_str(&typed, "%Y-%m-%d") {
                    Ok(date) => self.set_focused_date(date),
                    Err(e) => self.status = format!("Invalid date '{typed}': {e}"),
                }
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => input.push(c),
            _ => {}
        }
    }

    fn shift_date(&mut self, delta: i32) {
        let current = match self.focus {
            Focus::End => self.end,
            _ => self.start,
        };
        let shifted = if delta >= 0 { current.succ_opt() } else { current.pred_opt() };
        match shifted {
            Some(date) => self.set_focused_date(date),
            None => self.status = "Date out of range.".to_string(),
        }
    }

    /// Clamp to the data bounds, then reject edits that would invert the range.
    fn set_focused_date(&mut self, date: NaiveDate) {
        let (min, max) = self.data.date_bounds();
        let date = date.clamp(min, max);
        match self.focus {
            Focus::Start if date > self.end => {
                self.status = format!("Start date cannot be after end date ({}).", self.end);
            }
            Focus::End if date < self.start => {
                self.status = format!("End date cannot be before start date ({}).", self.start);
            }
            Focus::Start => {
                self.start = date;
                self.status = format!("start: {date}");
                self.refresh();
            }
            Focus::End => {
                self.end = date;
                self.status = format!("end: {date}");
                self.refresh();
            }
            Focus::Tickers | Focus::Rows => {}
        }
    }

    fn toggle_cursor_ticker(&mut self) {
        let Some(ticker) = self.data.tickers().get(self.cursor) else {
            return;
        };
        if !self.selected.remove(ticker) {
            self.selected.insert(ticker.clone());
        }
        self.status = format!("{} tickers selected", self.selected.len());
        self.refresh();
    }

    fn reset(&mut self) {
        let (start, end) = self.data.date_bounds();
        self.start = start;
        self.end = end;
        self.selected = default_selection(self.data.tickers()).into_iter().collect();
        self.cursor = 0;
        self.status = "Filters reset.".to_string();
        self.refresh();
    }

    fn scroll_rows(&mut self, delta: isize) {
        let max = self.view.rows.n_rows().saturating_sub(1);
        self.raw_scroll = self.raw_scroll.saturating_add_signed(delta).min(max);
    }

    fn refresh(&mut self) {
        self.view = build_view(self.data, &self.filter());
        self.raw_scroll = self.raw_scroll.min(self.view.rows.n_rows().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fixtures::{d, data};

    fn press(state: &mut DashboardState<'_>, keys: &[KeyCode]) {
        for &k in keys {
            assert!(!state.handle_key(k));
        }
    }

    fn type_date(state: &mut DashboardState<'_>, text: &str) {
        press(state, &[KeyCode::Enter]);
        for c in text.chars() {
            press(state, &[KeyCode::Char(c)]);
        }
        press(state, &[KeyCode::Enter]);
    }

    #[test]
    fn starts_with_full_range_and_default_tickers() {
        let data = data();
        let state = DashboardState::new(&data);

        assert_eq!((state.start(), state.end()), (d(2024, 1, 1), d(2024, 1, 3)));
        assert_eq!(state.filter().tickers().collect::<Vec<_>>(), vec!["AAA", "BBB", "CCC"]);
        assert_eq!(state.view().summary.rows, 9);
        assert!(!state.raw_expanded);
    }

    #[test]
    fn arrow_keys_shift_the_focused_date() {
        let data = data();
        let mut state = DashboardState::new(&data);

        press(&mut state, &[KeyCode::Right]);
        assert_eq!(state.start(), d(2024, 1, 2));
        assert_eq!(state.view().summary.rows, 6);

        // Clamped at the latest date.
        press(&mut state, &[KeyCode::Tab, KeyCode::Right]);
        assert_eq!(state.end(), d(2024, 1, 3));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let data = data();
        let mut state = DashboardState::new(&data);

        press(&mut state, &[KeyCode::Right, KeyCode::Right]);
        assert_eq!(state.start(), d(2024, 1, 3));
        press(&mut state, &[KeyCode::Tab, KeyCode::Left]);

        assert_eq!(state.end(), d(2024, 1, 3));
        assert!(state.status.contains("before start date"));
    }

    #[test]
    fn typed_dates_are_parsed_and_clamped() {
        let data = data();
        let mut state = DashboardState::new(&data);

        type_date(&mut state, "2024-01-02");
        assert_eq!(state.start(), d(2024, 1, 2));

        type_date(&mut state, "2020-01-01");
        assert_eq!(state.start(), d(2024, 1, 1));

        type_date(&mut state, "2024-1");
        assert_eq!(state.start(), d(2024, 1, 1));
        assert!(state.status.starts_with("Invalid date"));
    }

    #[test]
    fn escape_cancels_a_date_edit() {
        let data = data();
        let mut state = DashboardState::new(&data);

        press(&mut state, &[KeyCode::Enter, KeyCode::Char('2'), KeyCode::Esc]);
        assert!(state.date_input.is_none());
        assert_eq!(state.start(), d(2024, 1, 1));
    }

    #[test]
    fn space_toggles_and_c_clears_the_selection() {
        let data = data();
        let mut state = DashboardState::new(&data);
        press(&mut state, &[KeyCode::Tab, KeyCode::Tab]);

        press(&mut state, &[KeyCode::Char(' ')]);
        assert!(!state.is_selected("AAA"));
        assert_eq!(state.view().summary.unique_tickers, 2);

        press(&mut state, &[KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Char(' ')]);
        assert!(state.is_selected("DDD"));

        press(&mut state, &[KeyCode::Char('c')]);
        assert!(state.selection_cleared());
        assert_eq!(state.view().summary.unique_tickers, 4);
        assert_eq!(state.view().rows.n_rows(), 10);
    }

    #[test]
    fn reset_restores_defaults() {
        let data = data();
        let mut state = DashboardState::new(&data);
        press(&mut state, &[KeyCode::Right, KeyCode::Char('c')]);

        press(&mut state, &[KeyCode::Char('r')]);
        assert_eq!(state.start(), d(2024, 1, 1));
        assert_eq!(state.filter().tickers().count(), 3);
    }

    #[test]
    fn raw_table_toggles_and_scrolls_within_bounds() {
        let data = data();
        let mut state = DashboardState::new(&data);

        press(&mut state, &[KeyCode::Char('v')]);
        assert!(state.raw_expanded);

        press(&mut state, &[KeyCode::PageDown, KeyCode::PageDown]);
        assert_eq!(state.raw_scroll, 8);
        press(&mut state, &[KeyCode::PageUp]);
        assert_eq!(state.raw_scroll, 0);
    }

    #[test]
    fn q_quits() {
        let data = data();
        let mut state = DashboardState::new(&data);
        assert!(state.handle_key(KeyCode::Char('q')));
    }
}
