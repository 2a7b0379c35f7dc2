//! Text extraction from service pages.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use seatwarden_core::ReservationState;

/// Shown on the reservation page while a seat waits for check-in.
pub const MARKER_RESERVED: &str = "到馆签到";
/// Shown on the reservation page once the user has checked in.
pub const MARKER_STUDYING: &str = "已学习";

// <div class="grid_cell" data-key="12,34"><em>80</em></div>
static RE_SEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div[^>]+?grid_cell[^>]+?data-key="([^"]+)"[\s\S]+?<em>([0-9]+)</em>[\s\S]+?</div>"#)
        .expect("seat regex")
});

static RE_NICK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<div class="nick">(.*?)</div>"#).expect("nick regex"));

static RE_DEADLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"请在\s+([0-9]+):([0-9]+)\s+前到馆签到").expect("deadline regex")
});

static RE_SCRIPT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[!-~]+/[0-9a-zA-Z]+\.js").expect("script url regex"));

/// Map seat numbers to seat ids. Later cells win on duplicate numbers.
pub fn parse_seat_map(html: &str) -> HashMap<String, String> {
    RE_SEAT
        .captures_iter(html)
        .map(|c| (c[2].to_string(), c[1].to_string()))
        .collect()
}

/// The logged-in user's nickname, if the page shows one.
pub fn parse_nickname(html: &str) -> Option<String> {
    RE_NICK
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .filter(|n| !n.is_empty())
}

pub fn parse_state(html: &str) -> ReservationState {
    if html.contains(MARKER_RESERVED) {
        ReservationState::Reserved
    } else if html.contains(MARKER_STUDYING) {
        ReservationState::Studying
    } else {
        ReservationState::Idle
    }
}

/// Check-in deadline as `(hour, minute)`.
pub fn parse_deadline(html: &str) -> Option<(u32, u32)> {
    let caps = RE_DEADLINE.captures(html)?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    Some((hour, minute))
}

/// Every script URL referenced by a page, in document order.
pub fn script_urls(html: &str) -> Vec<String> {
    RE_SCRIPT_URL
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_map_from_grid_cells() {
        let html = r#"
            <div class="grid_cell grid_1" data-key="12,34" style="left:1px"><em>80</em><span></span></div>
            <div class="grid_cell" data-key="12,35"><em>81</em></div>
            <div class="grid_cell" data-key="bad"></div>
        "#;
        let seats = parse_seat_map(html);
        assert_eq!(seats.get("80").map(String::as_str), Some("12,34"));
        assert_eq!(seats.get("81").map(String::as_str), Some("12,35"));
        assert_eq!(seats.len(), 2);
    }

    #[test]
    fn seat_map_empty_for_unknown_room() {
        assert!(parse_seat_map("<html><body>not found</body></html>").is_empty());
    }

    #[test]
    fn nickname_extracted_and_trimmed() {
        assert_eq!(
            parse_nickname(r#"<div class="nick"> 小明 </div>"#).as_deref(),
            Some("小明")
        );
        assert_eq!(parse_nickname(r#"<div class="nick"></div>"#), None);
        assert_eq!(parse_nickname("<html></html>"), None);
    }

    #[test]
    fn state_markers() {
        assert_eq!(parse_state("请在 07:30 前到馆签到"), ReservationState::Reserved);
        assert_eq!(parse_state("今日已学习 2 小时"), ReservationState::Studying);
        assert_eq!(parse_state("<html/>"), ReservationState::Idle);
    }

    #[test]
    fn deadline_parsed() {
        assert_eq!(parse_deadline("请在  7:05  前到馆签到"), Some((7, 5)));
        assert_eq!(parse_deadline("请在07:05前到馆签到"), None);
    }

    #[test]
    fn script_urls_in_order() {
        let html = r#"
            <script src="https://static.test/js/abc123.js"></script>
            <script src="http://cdn.test/x/Y9.js"></script>
            <script src="/relative/skip.js"></script>
        "#;
        assert_eq!(
            script_urls(html),
            vec![
                "https://static.test/js/abc123.js".to_string(),
                "http://cdn.test/x/Y9.js".to_string(),
            ]
        );
    }
}
