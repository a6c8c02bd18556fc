use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Title for the filter menu, e.g. `Filters (2)` when two filters are on.
pub(crate) fn filter_badge(count: usize) -> String {
    if count == 0 {
        "Filters".to_string()
    } else {
        format!("Filters ({count})")
    }
}

/// Column `offset` cells into `area`, kept on the last column when the text
/// runs past the edge.
pub(crate) fn cursor_column(area: Rect, offset: usize) -> u16 {
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);
    let last = area.right().saturating_sub(1).max(area.x);
    area.x.saturating_add(offset).min(last)
}

/// Text for an optional column, falling back to a dash.
pub(crate) fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn surface_error_prefers_root_cause() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("failed to save song")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }

    #[test]
    fn badge_shows_count_only_when_active() {
        assert_eq!(filter_badge(0), "Filters");
        assert_eq!(filter_badge(3), "Filters (3)");
    }

    #[test]
    fn blank_optional_values_render_as_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("  ")), "-");
        assert_eq!(or_dash(Some("Jo Thompson")), "Jo Thompson");
    }

    #[test]
    fn cursor_column_clamps_to_the_area() {
        let area = Rect::new(10, 2, 30, 1);
        assert_eq!(cursor_column(area, 5), 15);
        assert_eq!(cursor_column(area, 29), 39);
        assert_eq!(cursor_column(area, 500), 39);
        assert_eq!(cursor_column(area, usize::MAX), 39);

        let edge = Rect::new(u16::MAX - 4, 0, 4, 1);
        assert_eq!(cursor_column(edge, 70_000), u16::MAX - 1);
        assert_eq!(cursor_column(Rect::new(3, 0, 0, 0), 8), 3);
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
    }
}
