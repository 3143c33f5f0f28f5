use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, OutputView, Popup};
use crate::session::{MAX_PRODUCTS, MIN_PRODUCTS};
use crate::theme::Theme;

static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(10),   // Sidebar + form + output
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(32), // Settings sidebar
            Constraint::Min(40),    // Form + output
        ])
        .split(rows[1]);

    draw_sidebar(f, app, columns[0]);
    draw_main_area(f, app, columns[1]);
    draw_footer(f, app, rows[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: busy indicator > status message > ready hint
    let line = if app.busy {
        Line::from(vec![
            Span::styled("⏳ ", Style::default().fg(warning())),
            Span::styled(
                format!(
                    "Analyzing {} policies, this can take a while...",
                    app.session.product_count
                ),
                Style::default().fg(warning()),
            ),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(warning())))
    } else if app.session.has_credential() {
        Line::from(Span::styled(
            "Ready. Fill in the policy terms and press F2 to compare.",
            Style::default().fg(text_dim()),
        ))
    } else {
        Line::from(Span::styled(
            "Enter your Gemini API key to get started.",
            Style::default().fg(text_dim()),
        ))
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Settings ", Style::default().fg(header())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // API key
            Constraint::Length(3), // Product count
            Constraint::Min(0),    // Spacer / hint
        ])
        .split(inner);

    draw_api_key_field(f, app, chunks[0]);
    draw_count_field(f, app, chunks[1]);

    let hint = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "The key is kept in memory for",
            Style::default().fg(text_dim()),
        )),
        Line::from(Span::styled(
            "this session only.",
            Style::default().fg(text_dim()),
        )),
    ]);
    f.render_widget(hint, chunks[2]);
}

fn draw_api_key_field(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::ApiKey;
    let border = if focused { accent() } else { inactive() };

    // Masked: show only dots, never the key itself
    let mut masked = "•".repeat(app.session.api_key.chars().count());
    if focused {
        masked.push('_');
    }
    let display = if masked.is_empty() {
        Span::styled("paste your key", Style::default().fg(text_dim()))
    } else {
        Span::styled(masked, Style::default().fg(text()))
    };

    let field = Paragraph::new(Line::from(display)).block(
        Block::default()
            .title(Span::styled(
                " Gemini API Key ",
                Style::default().fg(if focused { accent() } else { header() }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(field, area);
}

fn draw_count_field(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Count;
    let border = if focused { accent() } else { inactive() };

    let count = app.session.product_count;
    let line = Line::from(vec![
        Span::styled(
            if count > MIN_PRODUCTS { "◂ " } else { "  " },
            Style::default().fg(if focused { accent() } else { text_dim() }),
        ),
        Span::styled(
            format!("{}", count),
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            if count < MAX_PRODUCTS { " ▸" } else { "  " },
            Style::default().fg(if focused { accent() } else { text_dim() }),
        ),
        Span::styled(
            format!("  ({}-{})", MIN_PRODUCTS, MAX_PRODUCTS),
            Style::default().fg(text_dim()),
        ),
    ]);

    let field = Paragraph::new(line).block(
        Block::default()
            .title(Span::styled(
                " Products to Compare ",
                Style::default().fg(if focused { accent() } else { header() }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(field, area);
}

fn draw_main_area(f: &mut Frame, app: &App, area: Rect) {
    // Without a credential the form is disabled; the whole area becomes
    // the informational prompt.
    if !app.session.has_credential() {
        let prompt = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "󰌾  Paste your Gemini API key in the sidebar to enable the comparison form.",
                Style::default().fg(text_dim()),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(inactive())),
        );
        f.render_widget(prompt, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55), // Product columns
            Constraint::Percentage(45), // Output pane
        ])
        .split(area);

    draw_product_columns(f, app, chunks[0]);
    draw_output_pane(f, app, chunks[1]);
}

fn draw_product_columns(f: &mut Frame, app: &App, area: Rect) {
    let count = app.session.product_count;
    let widths = vec![Constraint::Ratio(1, count as u32); count];
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);

    for i in 0..count {
        draw_product_column(f, app, columns[i], i);
    }
}

fn draw_product_column(f: &mut Frame, app: &App, area: Rect, index: usize) {
    let entry = match app.session.entries.get(index) {
        Some(e) => e,
        None => return,
    };

    let name_focused = app.focus == Focus::Name(index);
    let terms_focused = app.focus == Focus::Terms(index);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Name field
            Constraint::Min(4),    // Terms field
        ])
        .split(area);

    // Name input
    let name_cursor = if name_focused { "_" } else { "" };
    let name_display = if entry.name.is_empty() && !name_focused {
        Span::styled(
            format!("Product {}", index + 1),
            Style::default().fg(text_dim()),
        )
    } else {
        Span::styled(
            format!("{}{}", entry.name, name_cursor),
            Style::default().fg(text()),
        )
    };
    let name_field = Paragraph::new(Line::from(name_display)).block(
        Block::default()
            .title(Span::styled(
                format!(" 󰢻 Product {} ", index + 1),
                Style::default().fg(if name_focused { accent() } else { header() }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if name_focused { accent() } else { inactive() })),
    );
    f.render_widget(name_field, chunks[0]);

    // Terms input: show the tail that fits, with a cursor block when focused
    let inner_height = chunks[1].height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = entry
        .terms
        .lines()
        .map(|l| Line::styled(l.to_string(), Style::default().fg(text())))
        .collect();
    if terms_focused {
        lines.push(Line::styled("█", Style::default().fg(accent())));
    } else if lines.is_empty() {
        lines.push(Line::styled(
            "paste policy terms here",
            Style::default().fg(text_dim()),
        ));
    }
    let skip = lines.len().saturating_sub(inner_height);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();

    let terms_field = Paragraph::new(visible).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(Span::styled(
                " Terms ",
                Style::default().fg(if terms_focused { accent() } else { header() }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if terms_focused { accent() } else { inactive() })),
    );
    f.render_widget(terms_field, chunks[1]);
}

fn draw_output_pane(f: &mut Frame, app: &App, area: Rect) {
    let (title, title_color, body): (&str, Color, Vec<Line>) = match &app.output {
        OutputView::None => (
            " Output ",
            header(),
            vec![Line::styled(
                "The comparison table will appear here.",
                Style::default().fg(text_dim()),
            )],
        ),
        OutputView::Comparison(text_body) => (
            " 󰓫 Comparison ",
            success(),
            // Markdown passed through verbatim; the table reads fine as
            // monospace text
            text_body
                .lines()
                .map(|l| Line::styled(l.to_string(), Style::default().fg(text())))
                .collect(),
        ),
        OutputView::Warning(msg) => (
            " Warning ",
            warning(),
            vec![Line::styled(msg.clone(), Style::default().fg(warning()))],
        ),
        OutputView::Error(msg) => (
            " Error ",
            danger(),
            vec![Line::styled(msg.clone(), Style::default().fg(danger()))],
        ),
    };

    let border_color = match &app.output {
        OutputView::Warning(_) => warning(),
        OutputView::Error(_) => danger(),
        _ => inactive(),
    };

    let pane = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .scroll((app.result_scroll, 0))
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(title_color)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color)),
        );
    f.render_widget(pane, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.focus {
        Focus::Count => vec![
            ("↑↓", "Count"),
            ("Tab", "Next"),
            ("F2", "Compare"),
            ("F1", "Help"),
            ("Esc", "Quit"),
        ],
        Focus::Terms(_) => vec![
            ("Tab", "Next"),
            ("Enter", "Newline"),
            ("F2", "Compare"),
            ("PgUp/PgDn", "Scroll"),
            ("F1", "Help"),
        ],
        _ => vec![
            ("Tab", "Next"),
            ("F2", "Compare"),
            ("F1", "Help"),
            ("Esc", "Quit"),
        ],
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.area());

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Form ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Tab/Shift-Tab ", Style::default().fg(accent())),
            Span::raw("Move between fields"),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓ + -       ", Style::default().fg(accent())),
            Span::raw("Adjust product count (on the count field)"),
        ]),
        Line::from(vec![
            Span::styled("  Enter         ", Style::default().fg(accent())),
            Span::raw("Name field: jump to terms. Terms field: newline"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Comparison ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  F2            ", Style::default().fg(accent())),
            Span::raw("Run the comparison (needs terms in every column)"),
        ]),
        Line::from(vec![
            Span::styled("  PgUp/PgDn     ", Style::default().fg(accent())),
            Span::raw("Scroll the output pane"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ General ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Esc           ", Style::default().fg(accent())),
            Span::raw("Quit (Ctrl-C always quits)"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Nothing is stored: key, names and terms live only in this session.",
            Style::default().fg(text_dim()),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(
                    " 󰋖 coverscope Help ",
                    Style::default().fg(accent()),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
