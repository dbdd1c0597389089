//! # MessageList Component
//!
//! Scrollable, virtualized view of the conversation.
//!
//! ## Responsibilities
//!
//! - Render only the messages near the viewport (plus overscan)
//! - Cache per-message heights so streaming doesn't remeasure everything
//! - Drive auto-scroll: follow new content while the user is at the bottom,
//!   back off the moment they scroll away
//!
//! `MessageList` is a transient component created each frame around
//! `&mut MessageListState` (persistent) and the message slice (props), so
//! the render pass can mutate caches in line with ratatui's
//! `StatefulWidget` pattern.

use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::chat::types::{Message, Status};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageCard;
use crate::tui::event::TuiEvent;

/// Items measured and rendered beyond the visible window on each side.
const ITEM_OVERSCAN: usize = 3;

/// New content must sit unscrolled this long before auto-scroll fires.
/// Coalesces bursts of stream deltas into one jump.
const SCROLL_DEBOUNCE: Duration = Duration::from_millis(50);
/// Minimum gap between two auto-scrolls. Keeps the view readable while a
/// long reply streams in.
const SCROLL_MIN_INTERVAL: Duration = Duration::from_millis(1000);
/// After an auto-scroll, position observations are ignored for this long so
/// our own jump isn't mistaken for the user scrolling away.
const SCROLL_SETTLE: Duration = Duration::from_millis(150);
/// Rows of slack when deciding whether the view counts as "at the bottom".
const BOTTOM_SLACK: u16 = 2;

/// Decides when the view should follow newly streamed content.
///
/// Engaged while the user sits at the bottom of the conversation. Appended
/// content schedules a scroll; the scroll actually fires only after
/// [`SCROLL_DEBOUNCE`] of quiet and at most once per [`SCROLL_MIN_INTERVAL`].
/// Scrolling away disengages it; returning to the bottom re-engages it.
///
/// All methods take `now` explicitly so tests can drive the clock.
#[derive(Debug)]
pub struct AutoScroll {
    pub engaged: bool,
    pending_since: Option<Instant>,
    last_scroll: Option<Instant>,
    settle_until: Option<Instant>,
}

impl Default for AutoScroll {
    fn default() -> Self {
        Self {
            engaged: true,
            pending_since: None,
            last_scroll: None,
            settle_until: None,
        }
    }
}

impl AutoScroll {
    /// Content grew below the viewport. Starts the debounce clock if a
    /// scroll isn't already pending.
    pub fn content_appended(&mut self, now: Instant) {
        if self.engaged && self.pending_since.is_none() {
            self.pending_since = Some(now);
        }
    }

    /// Returns true when a scroll-to-bottom should happen now. When the rate
    /// limit blocks it, the pending request is kept for a later frame.
    pub fn take_scroll(&mut self, now: Instant) -> bool {
        if !self.engaged {
            self.pending_since = None;
            return false;
        }
        let Some(since) = self.pending_since else {
            return false;
        };
        if now.duration_since(since) < SCROLL_DEBOUNCE {
            return false;
        }
        if self
            .last_scroll
            .is_some_and(|last| now.duration_since(last) < SCROLL_MIN_INTERVAL)
        {
            return false;
        }
        self.pending_since = None;
        self.last_scroll = Some(now);
        self.settle_until = Some(now + SCROLL_SETTLE);
        true
    }

    /// Report the scroll position after a user scroll event. Ignored inside
    /// the settle window following our own jump.
    pub fn observe_position(&mut self, at_bottom: bool, now: Instant) {
        if self.settle_until.is_some_and(|until| now < until) {
            return;
        }
        if at_bottom {
            self.engaged = true;
        } else {
            self.engaged = false;
            self.pending_since = None;
        }
    }

    /// Force engagement (jump-to-bottom shortcuts).
    pub fn engage(&mut self) {
        self.engaged = true;
        self.pending_since = None;
    }

    pub fn disengage(&mut self) {
        self.engaged = false;
        self.pending_since = None;
    }
}

/// Whether an offset counts as "at the bottom" of the scrollable content.
pub fn at_bottom(offset: u16, viewport_height: u16, total_height: u16) -> bool {
    offset.saturating_add(viewport_height) >= total_height.saturating_sub(BOTTOM_SLACK)
}

/// Layout and scroll state for the message list.
/// Must be persisted in the parent `TuiState`.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    pub autoscroll: AutoScroll,
    /// Last known viewport height (for clamping between frames)
    pub viewport_height: u16,
    /// Total content height from the previous frame, to detect growth
    last_total_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            autoscroll: AutoScroll::default(),
            viewport_height: 0,
            last_total_height: 0,
        }
    }

    fn total_height(&self) -> u16 {
        self.layout.prefix_heights.last().copied().unwrap_or(0)
    }

    fn max_offset(&self) -> u16 {
        self.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp the offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_state.set_offset(Position { x: 0, y: 0 });
        self.autoscroll.disengage();
    }

    pub fn scroll_to_bottom(&mut self) {
        let max_y = self.max_offset();
        self.scroll_state.set_offset(Position { x: 0, y: max_y });
        self.autoscroll.engage();
    }

    /// Align the top of the given message with the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        if index >= self.layout.prefix_heights.len() {
            return;
        }
        let item_top = if index == 0 {
            0
        } else {
            self.layout.prefix_heights[index - 1]
        };
        let target = item_top.min(self.max_offset());
        self.scroll_state.set_offset(Position { x: 0, y: target });
        if !at_bottom(target, self.viewport_height, self.total_height()) {
            self.autoscroll.disengage();
        }
    }

    fn observe_after_user_scroll(&mut self) {
        let offset = self.scroll_state.offset().y;
        let bottom = at_bottom(offset, self.viewport_height, self.total_height());
        self.autoscroll.observe_position(bottom, Instant::now());
    }
}

/// EventHandler lives on `MessageListState` rather than `MessageList`:
/// scroll handling needs persistent state, and the transient component is
/// recreated each frame.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.observe_after_user_scroll();
                None
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.clamp_scroll();
                self.observe_after_user_scroll();
                None
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.observe_after_user_scroll();
                None
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.clamp_scroll();
                self.observe_after_user_scroll();
                None
            }
            TuiEvent::ScrollToTop => {
                self.scroll_to_top();
                None
            }
            TuiEvent::ScrollToBottom => {
                self.scroll_to_bottom();
                None
            }
            _ => None,
        }
    }
}

/// Scrollable conversation view, created fresh each frame.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    pub is_streaming: bool,
    pub pulse_value: f32,
    /// Conversation index of the current search match, if searching.
    pub current_match: Option<usize>,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [Message],
        is_streaming: bool,
        pulse_value: f32,
        current_match: Option<usize>,
    ) -> Self {
        Self {
            state,
            messages,
            is_streaming,
            pulse_value,
            current_match,
        }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // scrollbar gutter
        let num_items = self.messages.len();
        let now = Instant::now();

        // 1. Refresh the height cache, re-measuring only what changed
        let layout = &mut self.state.layout;
        let reusable = layout.reusable_count(num_items, content_width, self.is_streaming, self.messages);
        layout.heights.truncate(reusable.min(layout.heights.len()));
        for message in self.messages.iter().skip(layout.heights.len()) {
            layout
                .heights
                .push(MessageCard::calculate_height(message, content_width));
        }
        layout.rebuild_prefix_heights();
        layout.update_metadata(num_items, content_width);

        self.state.viewport_height = area.height;
        let total_height = self.state.total_height();

        // 2. Auto-scroll: detect growth, fire at most once per interval
        if total_height > self.state.last_total_height {
            self.state.autoscroll.content_appended(now);
        }
        self.state.last_total_height = total_height;

        if self.state.autoscroll.take_scroll(now) {
            let max_y = total_height.saturating_sub(area.height);
            self.state
                .scroll_state
                .set_offset(Position { x: 0, y: max_y });
        }
        self.state.clamp_scroll();

        // 3. Render only the visible window (plus overscan)
        let scroll_offset = self.state.scroll_state.offset().y;
        let visible = self.state.layout.visible_range(scroll_offset, area.height);

        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height.max(1)))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible.start > 0 {
            self.state.layout.prefix_heights[visible.start - 1]
        } else {
            0
        };

        for i in visible {
            let message = &self.messages[i];
            let height = self.state.layout.heights[i];
            let is_last = i == num_items.saturating_sub(1);
            let streaming_here =
                is_last && self.is_streaming && message.status == Status::Sending;
            let pulse = if streaming_here { self.pulse_value } else { 0.0 };

            let card = MessageCard::new(message, self.current_match == Some(i), pulse);
            let rect = Rect::new(0, y_offset, content_width, height);
            scroll_view.render_widget(card, rect);
            y_offset += height;
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// Cached per-message heights plus the running prefix sums used for
/// windowing and scroll math.
pub struct LayoutCache {
    pub heights: Vec<u16>,
    /// `prefix_heights[i]` = bottom edge (exclusive) of message `i`.
    pub prefix_heights: Vec<u16>,
    message_count: usize,
    content_width: u16,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            message_count: 0,
            content_width: 0,
        }
    }

    /// How many cached heights can be kept for the next frame.
    ///
    /// Width changes and conversation truncation invalidate everything. The
    /// last message is re-measured whenever it might still be growing: while
    /// streaming, or right after streaming ended (its cached height may be
    /// from a partial frame).
    pub fn reusable_count(
        &self,
        message_count: usize,
        content_width: u16,
        is_streaming: bool,
        messages: &[Message],
    ) -> usize {
        if self.content_width != content_width || self.heights.is_empty() {
            return 0;
        }
        if message_count < self.message_count {
            return 0;
        }

        let last_is_volatile = messages
            .last()
            .is_some_and(|m| m.status == Status::Sending);
        if is_streaming || last_is_volatile {
            message_count.saturating_sub(1)
        } else {
            message_count
        }
    }

    pub fn update_metadata(&mut self, message_count: usize, content_width: u16) {
        self.message_count = message_count;
        self.content_width = content_width;
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    /// Indices of the messages overlapping the viewport, widened by
    /// [`ITEM_OVERSCAN`] on each side.
    pub fn visible_range(
        &self,
        scroll_offset: u16,
        viewport_height: u16,
    ) -> std::ops::Range<usize> {
        let len = self.prefix_heights.len();
        if len == 0 {
            return 0..0;
        }

        let viewport_end = scroll_offset.saturating_add(viewport_height);
        let start = self
            .prefix_heights
            .partition_point(|&bottom| bottom <= scroll_offset)
            .saturating_sub(ITEM_OVERSCAN);
        let end = self
            .prefix_heights
            .partition_point(|&bottom| bottom < viewport_end)
            .saturating_add(1)
            .saturating_add(ITEM_OVERSCAN)
            .min(len);

        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Message;

    fn uniform_cache(count: usize, item_height: u16) -> LayoutCache {
        let mut cache = LayoutCache::new();
        cache.heights = vec![item_height; count];
        cache.rebuild_prefix_heights();
        cache.update_metadata(count, 80);
        cache
    }

    // With uniform item heights the window has a closed form:
    //   start = max(0, floor(offset / h) - overscan)
    //   end   = min(n, ceil((offset + viewport) / h) + overscan)
    #[test]
    fn test_visible_range_matches_closed_form_for_uniform_heights() {
        let n = 50usize;
        let h = 4u16;
        let cache = uniform_cache(n, h);

        for offset in (0..=(n as u16 * h)).step_by(3) {
            for viewport in [1u16, 7, 12, 40] {
                let range = cache.visible_range(offset, viewport);
                let expected_start =
                    (offset as usize / h as usize).saturating_sub(ITEM_OVERSCAN);
                let expected_end = ((offset + viewport) as usize)
                    .div_ceil(h as usize)
                    .saturating_add(ITEM_OVERSCAN)
                    .min(n);
                assert_eq!(
                    range.start, expected_start,
                    "start mismatch at offset={offset} viewport={viewport}"
                );
                assert_eq!(
                    range.end, expected_end,
                    "end mismatch at offset={offset} viewport={viewport}"
                );
            }
        }
    }

    #[test]
    fn test_visible_range_empty_list() {
        let cache = LayoutCache::new();
        assert_eq!(cache.visible_range(0, 24), 0..0);
    }

    #[test]
    fn test_visible_range_covers_viewport_items() {
        // Heights 2, 5, 3, 8, 1 — prefix 2, 7, 10, 18, 19
        let mut cache = LayoutCache::new();
        cache.heights = vec![2, 5, 3, 8, 1];
        cache.rebuild_prefix_heights();

        // Viewport rows 7..10 shows exactly item 2; overscan widens to all 5
        let range = cache.visible_range(7, 3);
        assert!(range.contains(&2));
        assert_eq!(range, 0..5);
    }

    #[test]
    fn test_reusable_count_invalidation() {
        let mut cache = uniform_cache(5, 3);
        let messages: Vec<Message> = (0..5).map(|i| Message::user(format!("m{i}"))).collect();

        // Stable conversation: everything reusable
        assert_eq!(cache.reusable_count(5, 80, false, &messages), 5);

        // Width change: nothing reusable
        assert_eq!(cache.reusable_count(5, 40, false, &messages), 0);

        // Conversation shrank (clear or truncation): nothing reusable
        assert_eq!(cache.reusable_count(3, 80, false, &messages[..3]), 0);

        // Streaming: last height is volatile
        assert_eq!(cache.reusable_count(5, 80, true, &messages), 4);

        // Last message still Sending after streaming flag dropped:
        // its cached height may be stale, re-measure it
        let mut with_pending = messages.clone();
        with_pending.push(Message::pending_assistant());
        cache.update_metadata(6, 80);
        cache.heights.push(3);
        assert_eq!(cache.reusable_count(6, 80, false, &with_pending), 5);
    }

    #[test]
    fn test_scroll_to_index_aligns_item_top() {
        let mut state = MessageListState::new();
        state.layout.heights = vec![4; 20];
        state.layout.rebuild_prefix_heights();
        state.viewport_height = 10;

        state.scroll_to_index(5);
        assert_eq!(state.scroll_state.offset().y, 20);
        assert!(!state.autoscroll.engaged);

        // Index 0 is the top
        state.scroll_to_index(0);
        assert_eq!(state.scroll_state.offset().y, 0);

        // Near the end the offset clamps to max scroll
        state.scroll_to_index(19);
        assert_eq!(state.scroll_state.offset().y, 80 - 10);
    }

    #[test]
    fn test_scroll_to_bottom_engages() {
        let mut state = MessageListState::new();
        state.layout.heights = vec![4; 10];
        state.layout.rebuild_prefix_heights();
        state.viewport_height = 10;
        state.autoscroll.disengage();

        state.scroll_to_bottom();
        assert_eq!(state.scroll_state.offset().y, 30);
        assert!(state.autoscroll.engaged);
    }

    #[test]
    fn test_at_bottom_has_slack() {
        assert!(at_bottom(90, 10, 100));
        assert!(at_bottom(88, 10, 100)); // within BOTTOM_SLACK rows
        assert!(!at_bottom(80, 10, 100));
        // Short content is always at the bottom
        assert!(at_bottom(0, 24, 5));
    }

    // -- AutoScroll ------------------------------------------------------

    #[test]
    fn test_autoscroll_debounces_appends() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut auto = AutoScroll::default();

        auto.content_appended(at(0));
        assert!(!auto.take_scroll(at(10)), "still inside debounce window");
        assert!(auto.take_scroll(at(60)), "debounce elapsed");
        assert!(!auto.take_scroll(at(61)), "nothing pending after firing");
    }

    #[test]
    fn test_autoscroll_rate_limited_to_one_per_interval() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut auto = AutoScroll::default();

        auto.content_appended(at(0));
        assert!(auto.take_scroll(at(60)));

        // More content lands right away; the request stays pending until the
        // interval from the previous scroll has passed
        auto.content_appended(at(100));
        assert!(!auto.take_scroll(at(200)));
        assert!(!auto.take_scroll(at(900)));
        assert!(auto.take_scroll(at(1100)));
    }

    #[test]
    fn test_autoscroll_disengaged_drops_pending() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut auto = AutoScroll::default();

        auto.content_appended(at(0));
        auto.observe_position(false, at(10)); // user scrolled up
        assert!(!auto.engaged);
        assert!(!auto.take_scroll(at(100)));

        // While disengaged, appends are ignored
        auto.content_appended(at(200));
        assert!(!auto.take_scroll(at(300)));
    }

    #[test]
    fn test_autoscroll_reengages_at_bottom() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut auto = AutoScroll::default();

        auto.observe_position(false, at(0));
        assert!(!auto.engaged);
        auto.observe_position(true, at(100));
        assert!(auto.engaged);

        auto.content_appended(at(200));
        assert!(auto.take_scroll(at(300)));
    }

    #[test]
    fn test_autoscroll_settle_window_ignores_observations() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut auto = AutoScroll::default();

        auto.content_appended(at(0));
        assert!(auto.take_scroll(at(60)));

        // Right after our own jump the view briefly reads as not-at-bottom;
        // that must not disengage
        auto.observe_position(false, at(100));
        assert!(auto.engaged);

        // After the settle window, the same observation disengages
        auto.observe_position(false, at(300));
        assert!(!auto.engaged);
    }
}
