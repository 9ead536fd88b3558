#![forbid(unsafe_code)]

//! Plain-text frame renderer.

use scrollfeed::{FeedRenderer, FetchDirection};

use crate::message::Message;

/// Renders each slot as one line: offset, height, and body.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl FeedRenderer<Message> for TextRenderer {
    type Output = String;

    fn render_item(&mut self, item: &Message, index: usize, top: f64, height: f64) -> String {
        format!("{top:>8.0} {height:>4.0} #{index:<4} {}", item.content)
    }

    fn render_loader(&mut self, direction: FetchDirection, top: f64, height: f64) -> String {
        format!("{top:>8.0} {height:>4.0} ... loading {direction}")
    }

    fn render_arrival_indicator(&mut self, count: usize) -> String {
        match count {
            1 => "[1 new message]".to_owned(),
            n => format!("[{n} new messages]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollfeed::Timestamp;

    #[test]
    fn lines_carry_offsets() {
        let mut r = TextRenderer;
        let m = Message::new("a", "hello", Timestamp(0));
        assert_eq!(r.render_item(&m, 3, 150.0, 50.0), "     150   50 #3    hello");
        assert_eq!(
            r.render_loader(FetchDirection::Top, 0.0, 100.0),
            "       0  100 ... loading top"
        );
    }

    #[test]
    fn indicator_pluralizes() {
        let mut r = TextRenderer;
        assert_eq!(r.render_arrival_indicator(1), "[1 new message]");
        assert_eq!(r.render_arrival_indicator(4), "[4 new messages]");
    }
}
