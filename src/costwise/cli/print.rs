use chrono::{DateTime, Utc};
use colored::Colorize;
use costwise::dashboard::DashboardView;
use costwise::model::Client;
use costwise::sidebar::Row;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 72;
const TIME_WIDTH: usize = 14;
const COST_WIDTH: usize = 14;

pub(crate) fn print_tree(rows: &[Row]) {
    if rows.is_empty() {
        println!("No modules found.");
        return;
    }
    for row in rows {
        let indent = "  ".repeat(row.depth);
        match row.collapsed {
            Some(collapsed) => {
                let marker = if collapsed { "▸" } else { "▾" };
                println!("{}{} {}", indent, marker, row.module.name.bold());
            }
            None => {
                let mut line = format!("{}  {}", indent, row.module.name);
                let id = format!("({})", row.module.id);
                let padding = LINE_WIDTH
                    .saturating_sub(line.width())
                    .saturating_sub(id.width());
                line.push_str(&" ".repeat(padding));
                println!("{}{}", line, id.dimmed());
            }
        }
    }
}

pub(crate) fn print_clients(clients: &[Client], current_id: Option<&str>) {
    if clients.is_empty() {
        println!("No clients found.");
        return;
    }
    for client in clients {
        let marker = if Some(client.id.as_str()) == current_id {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        let name = truncate_to_width(&client.name, 30);
        let padding = 32usize.saturating_sub(name.width());
        println!(
            "{} {}{}{}  {}",
            marker,
            name,
            " ".repeat(padding),
            client.id.dimmed(),
            format_time_ago(client.last_modified).dimmed()
        );
    }
}

pub(crate) fn print_client(client: &Client) {
    println!("{}", client.name.bold());
    if !client.address.is_empty() {
        println!("{}", client.address);
    }
    println!("{}", client.id.dimmed());
    println!(
        "created {}, last modified {}",
        format_time_ago(client.created).trim(),
        format_time_ago(client.last_modified).trim()
    );
}

pub(crate) fn print_dashboard(view: &DashboardView) {
    match &view.client_name {
        Some(name) => println!("{}\n", name.bold()),
        None => println!("{}\n", "No client selected".yellow()),
    }
    for tile in &view.tiles {
        let cost = format!("{:>width$.2}", tile.cost, width = COST_WIDTH);
        let name = truncate_to_width(&tile.name, LINE_WIDTH - COST_WIDTH - TIME_WIDTH - 2);
        let padding = (LINE_WIDTH - COST_WIDTH - TIME_WIDTH).saturating_sub(name.width());
        let time = tile
            .last_modified
            .map(format_time_ago)
            .unwrap_or_else(|| " ".repeat(TIME_WIDTH));
        let cost = if tile.has_data {
            cost.normal()
        } else {
            cost.dimmed()
        };
        println!("{}{}{}  {}", name, " ".repeat(padding), cost, time.dimmed());
    }
    let total = format!("{:>width$.2}", view.total, width = COST_WIDTH);
    println!(
        "{}{}",
        format!("{:<width$}", "Total", width = LINE_WIDTH - COST_WIDTH),
        total.green().bold()
    );
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(timestamp);

    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());

    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
