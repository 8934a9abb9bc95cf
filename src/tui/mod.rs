//! Ratatui-based terminal dashboard.
//!
//! Layout: a header with the active filters and summary metrics, a filter
//! sidebar, three chart panels and a collapsible raw-data table.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row},
};

use crate::dashboard::{DashboardData, Panel, WideSeries};
use crate::error::AppError;

mod plotters_chart;
mod state;

pub use state::{DashboardState, Focus};

use plotters_chart::{PlotSeries, SeriesChart, date_bounds, plot_series, x_date};

/// Start the dashboard over already-loaded data.
pub fn run(data: &DashboardData) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut state = DashboardState::new(data);
    event_loop(&mut state, &mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn event_loop<B: ratatui::backend::Backend>(
    state: &mut DashboardState<'_>,
    terminal: &mut Terminal<B>,
) -> Result<(), AppError> {
    let mut needs_redraw = true;
    loop {
        if needs_redraw {
            terminal
                .draw(|f| draw(f, state))
                .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
            needs_redraw = false;
        }

        if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
            continue;
        }

        match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if state.handle_key(key.code) {
                    break;
                }
                needs_redraw = true;
            }
            Event::Resize(_, _) => needs_redraw = true,
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut ratatui::Frame<'_>, state: &DashboardState<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    draw_body(frame, chunks[1], state);
    draw_footer(frame, chunks[2], state);
}

fn draw_header(frame: &mut ratatui::Frame<'_>, area: Rect, state: &DashboardState<'_>) {
    let view = state.view();
    let tickers = if state.selection_cleared() {
        "all".to_string()
    } else {
        view.filter.tickers().collect::<Vec<_>>().join(", ")
    };
    let total_volume = view
        .summary
        .total_volume
        .map_or_else(|| "n/a".to_string(), |v| v.to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled("stockdash", Style::default().fg(Color::Cyan)),
            Span::raw(" | Stock Market Dashboard"),
        ]),
        Line::from(Span::styled(
            format!("Showing data from {} to {} for tickers: {tickers}", state.start(), state.end()),
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            format!(
                "rows: {} | unique tickers: {} | total volume: {total_volume}",
                view.summary.rows, view.summary.unique_tickers
            ),
            Style::default().fg(Color::Gray),
        )),
    ];

    let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_body(frame: &mut ratatui::Frame<'_>, area: Rect, state: &DashboardState<'_>) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(0)])
        .split(area);

    draw_filters(frame, cols[0], state);

    let raw_height = if state.raw_expanded {
        Constraint::Percentage(40)
    } else {
        Constraint::Length(3)
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), raw_height])
        .split(cols[1]);

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
        .split(rows[0]);

    let view = state.view();
    draw_line_panel(frame, charts[0], "Daily Average Close Price by Ticker", &view.avg_close, state, None, |v| {
        format!("{v:.2}")
    });
    draw_volume_panel(frame, charts[1], &view.avg_volume);
    draw_line_panel(frame, charts[2], "Daily Return by Ticker", &view.daily_return, state, Some(0.0), |v| {
        format!("{:.1}%", v * 100.0)
    });
    draw_raw_table(frame, rows[1], state);
}

fn focus_style(state: &DashboardState<'_>, focus: Focus) -> Style {
    if state.focus == focus {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_filters(frame: &mut ratatui::Frame<'_>, area: Rect, state: &DashboardState<'_>) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let date_line = |label: &str, focus: Focus, value: chrono::NaiveDate| {
        let text = match &state.date_input {
            Some(input) if state.focus == focus => format!("{label}: {input}_"),
            _ => format!("{label}: {value}"),
        };
        Line::from(Span::styled(text, focus_style(state, focus)))
    };
    let dates = Paragraph::new(Text::from(vec![
        date_line("Start", Focus::Start, state.start()),
        date_line("End  ", Focus::End, state.end()),
    ]))
    .block(Block::default().title("Date range").borders(Borders::ALL));
    frame.render_widget(dates, parts[0]);

    let items: Vec<ListItem> = state
        .data()
        .tickers()
        .iter()
        .map(|t| {
            let mark = if state.is_selected(t) { "[x]" } else { "[ ]" };
            ListItem::new(format!("{mark} {t}"))
        })
        .collect();

    let title = if state.selection_cleared() { "Tickers (all)" } else { "Tickers" };
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(title, focus_style(state, Focus::Tickers)))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
        .highlight_symbol("» ");

    let mut list_state = ListState::default();
    if state.focus == Focus::Tickers {
        list_state.select(Some(state.cursor));
    }
    frame.render_stateful_widget(list, parts[1], &mut list_state);
}

/// Block title with the panel name followed by a colored legend.
fn legend_title<'a>(title: &'a str, series: &[PlotSeries]) -> Line<'a> {
    let mut spans = vec![Span::raw(title)];
    for s in series {
        let (r, g, b) = s.color;
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("■ {}", s.ticker), Style::default().fg(Color::Rgb(r, g, b))));
    }
    Line::from(spans)
}

fn draw_empty(frame: &mut ratatui::Frame<'_>, area: Rect, msg: &str) {
    let p = Paragraph::new(msg.to_string())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    frame.render_widget(p, area);
}

fn draw_line_panel(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    panel: &Panel<WideSeries>,
    state: &DashboardState<'_>,
    baseline: Option<f64>,
    fmt_y: fn(f64) -> String,
) {
    let (series, y_bounds) = match panel {
        Panel::Ready(wide) => plot_series(wide),
        Panel::Empty(_) => (Vec::new(), [0.0, 1.0]),
    };
    let block = Block::default().title(legend_title(title, &series)).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    if let Panel::Empty(msg) = panel {
        return draw_empty(frame, inner, msg);
    }

    let x_bounds = date_bounds(state.start(), state.end());
    let (chart_rect, insets) = chart_layout(inner);

    frame.render_widget(
        SeriesChart {
            series: &series,
            x_bounds,
            y_bounds,
            baseline,
        },
        chart_rect,
    );
    if let Some(insets) = insets {
        draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds, fmt_y);
    }
}

fn draw_volume_panel(frame: &mut ratatui::Frame<'_>, area: Rect, panel: &Panel<Vec<(String, Option<f64>)>>) {
    let block = Block::default().title("Average Volume by Ticker").borders(Borders::ALL);
    let rows = match panel {
        Panel::Ready(rows) => rows,
        Panel::Empty(msg) => {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            return draw_empty(frame, inner, msg);
        }
    };

    let bars: Vec<Bar> = rows
        .iter()
        .map(|(ticker, v)| {
            Bar::default()
                .value(v.map_or(0, |v| v.max(0.0).round() as u64))
                .text_value(v.map_or_else(|| "n/a".to_string(), compact_number))
                .label(Line::from(ticker.clone()))
        })
        .collect();

    let n = bars.len().max(1) as u16;
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / n).saturating_sub(1).clamp(3, 12);

    let chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

/// Short bar labels: 1234567 -> "1.2M".
fn compact_number(v: f64) -> String {
    let a = v.abs();
    if a >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{v:.0}")
    }
}

fn draw_raw_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &DashboardState<'_>) {
    let rows = &state.view().rows;
    let title = Span::styled(
        format!("Raw data ({} rows)", rows.n_rows()),
        focus_style(state, Focus::Rows),
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    if !state.raw_expanded {
        let hint = Paragraph::new("collapsed, press v to expand").style(Style::default().fg(Color::Gray));
        frame.render_widget(hint.block(block), area);
        return;
    }

    let header = Row::new(rows.column_names().into_iter().map(str::to_string).collect::<Vec<_>>())
        .style(Style::default().add_modifier(Modifier::BOLD));
    let visible = area.height.saturating_sub(3) as usize;
    let body: Vec<Row> = (state.raw_scroll..rows.n_rows())
        .take(visible)
        .map(|r| Row::new(rows.row(r).iter().map(|c| c.to_string()).collect::<Vec<_>>()))
        .collect();
    let widths = vec![Constraint::Fill(1); rows.n_cols().max(1)];

    let table = ratatui::widgets::Table::new(body, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut ratatui::Frame<'_>, area: Rect, state: &DashboardState<'_>) {
    let help = "Tab focus  ←/→ date  Enter type date  ↑/↓ move  Space toggle  c clear  r reset  v raw  PgUp/PgDn scroll  q quit";
    let line = Line::from(vec![
        Span::styled(help, Style::default().fg(Color::Gray)),
        Span::raw(" | "),
        Span::styled(&state.status, Style::default().fg(Color::Yellow)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 2,
        top: 0,
        bottom: 1,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 3 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    fmt_y: fn(f64) -> String,
) {
    let style = Style::default().fg(Color::Gray);

    // Dates along the bottom; fewer ticks when the range is only a few days.
    let span_days = (x_bounds[1] - x_bounds[0]).round().max(1.0) as usize;
    let x_ticks = span_days.clamp(2, 5);
    let y = chart.y + chart.height;
    if y < inner.y + inner.height {
        for i in 0..x_ticks {
            let u = i as f64 / (x_ticks as f64 - 1.0);
            let Some(date) = x_date(x_bounds[0] + u * (x_bounds[1] - x_bounds[0])) else {
                continue;
            };
            let label = date.format("%m-%d").to_string();
            let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
            let start = x.saturating_sub((label.len() / 2) as u16).max(chart.x);
            let width = (label.len() as u16).min((inner.x + inner.width).saturating_sub(start));
            frame.render_widget(Paragraph::new(label).style(style), Rect { x: start, y, width, height: 1 });
        }
    }

    let y_ticks = if chart.height >= 6 { 3 } else { 2 };
    for i in 0..y_ticks {
        let u = i as f64 / (y_ticks as f64 - 1.0);
        let value = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let row = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_y(value);
        let width = insets.left.saturating_sub(1);
        frame.render_widget(
            Paragraph::new(label).style(style).alignment(Alignment::Right),
            Rect {
                x: inner.x,
                y: row,
                width,
                height: 1,
            },
        );
    }
}
