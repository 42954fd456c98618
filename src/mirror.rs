use std::io;

use crate::error::{CliGuiError, Result};

/// Default line retention for the output region.
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 2_000;

/// Receiver of text chunks produced during a run.
pub trait TextSink {
    /// Appends one chunk.
    fn write(&mut self, chunk: &str);
}

/// Scrollable, normally read-only display region for run output.
#[derive(Debug, Clone)]
pub struct OutputRegion {
    content: String,
    read_only: bool,
    max_lines: usize,
    scroll: u16,
    viewport_height: u16,
    display_rows: usize,
    follow_tail: bool,
}

impl Default for OutputRegion {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_LINES)
    }
}

impl OutputRegion {
    /// Creates an empty read-only region keeping at most `max_lines` lines.
    pub fn new(max_lines: usize) -> Self {
        Self {
            content: String::new(),
            read_only: true,
            max_lines: max_lines.max(1),
            scroll: 0,
            viewport_height: 0,
            display_rows: 0,
            follow_tail: true,
        }
    }

    /// Current text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether insertion is currently refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Switches the region between read-only and writable.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Inserts `text` at the end; fails while read-only.
    pub fn insert(&mut self, text: &str) -> Result<()> {
        if self.read_only {
            return Err(CliGuiError::InvalidInput(
                "output region is read-only".to_owned(),
            ));
        }
        self.content.push_str(text);
        self.enforce_retention();
        self.sync_scroll();
        Ok(())
    }

    /// Drops all text.
    pub fn clear(&mut self) {
        self.content.clear();
        self.scroll = 0;
        self.display_rows = 0;
        self.follow_tail = true;
    }

    /// Number of display lines.
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// Rows the content occupies once wrapped, as last reported by the
    /// front end; never fewer than the logical line count.
    pub fn row_count(&self) -> usize {
        self.display_rows.max(self.line_count())
    }

    /// First visible row.
    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Whether the view sticks to the newest output.
    pub fn follows_tail(&self) -> bool {
        self.follow_tail
    }

    /// Records the visible height after layout.
    pub fn set_viewport_height(&mut self, height: u16) {
        self.viewport_height = height;
        self.sync_scroll();
    }

    /// Records how many rows the content wraps to at the current width.
    pub fn set_display_rows(&mut self, rows: usize) {
        self.display_rows = rows;
        self.sync_scroll();
    }

    /// Scrolls up, leaving follow-tail mode.
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_tail = false;
        self.clamp_scroll();
    }

    /// Scrolls down, re-entering follow-tail mode at the last page.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
        self.clamp_scroll();
        let tail = tail_scroll_start(self.row_count(), self.viewport_height);
        if self.scroll >= tail {
            self.follow_tail = true;
            self.scroll = tail;
        }
    }

    /// Jumps to the first line.
    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow_tail = false;
    }

    /// Jumps to the last page and follows new output.
    pub fn scroll_to_tail(&mut self) {
        self.follow_tail = true;
        self.sync_scroll();
    }

    fn enforce_retention(&mut self) {
        let line_count = self.line_count();
        if line_count <= self.max_lines {
            return;
        }
        let overflow = line_count - self.max_lines;
        let cut = self
            .content
            .match_indices('\n')
            .nth(overflow - 1)
            .map(|(index, _)| index + 1)
            .unwrap_or(0);
        self.content.drain(..cut);
    }

    fn max_scroll(&self) -> u16 {
        self.row_count().saturating_sub(1).min(u16::MAX as usize) as u16
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn sync_scroll(&mut self) {
        if self.follow_tail {
            self.scroll = tail_scroll_start(self.row_count(), self.viewport_height);
        }
        self.clamp_scroll();
    }
}

fn tail_scroll_start(total_lines: usize, viewport_height: u16) -> u16 {
    if total_lines == 0 {
        return 0;
    }
    let viewport = usize::max(usize::from(viewport_height), 1);
    let page_index = total_lines.saturating_sub(1) / viewport;
    (page_index * viewport).min(u16::MAX as usize) as u16
}

/// Sink that appends chunks to an [`OutputRegion`].
///
/// The region is writable only for the duration of each insertion.
#[derive(Debug)]
pub struct OutputMirror<'a> {
    region: &'a mut OutputRegion,
}

impl<'a> OutputMirror<'a> {
    /// Wraps a region.
    pub fn new(region: &'a mut OutputRegion) -> Self {
        Self { region }
    }
}

impl TextSink for OutputMirror<'_> {
    fn write(&mut self, chunk: &str) {
        self.region.set_read_only(false);
        let inserted = self.region.insert(chunk);
        self.region.set_read_only(true);
        if let Err(error) = inserted {
            tracing::warn!(%error, "dropping output chunk");
        }
    }
}

impl TextSink for String {
    fn write(&mut self, chunk: &str) {
        self.push_str(chunk);
    }
}

/// `io::Write` adapter that interposes a [`TextSink`] during a run.
///
/// Bytes are forwarded as text; a UTF-8 sequence split across writes is held
/// back until it completes or the writer is flushed.
pub struct SinkWriter<'a> {
    sink: &'a mut dyn TextSink,
    pending: Vec<u8>,
}

impl<'a> SinkWriter<'a> {
    /// Wraps a sink.
    pub fn new(sink: &'a mut dyn TextSink) -> Self {
        Self {
            sink,
            pending: Vec::new(),
        }
    }

    fn forward_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    if !text.is_empty() {
                        self.sink.write(text);
                    }
                    self.pending.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    // An incomplete sequence at the end waits for more bytes.
                    let Some(invalid_len) = error.error_len() else {
                        if valid > 0 {
                            let text =
                                String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                            self.sink.write(&text);
                            self.pending.drain(..valid);
                        }
                        return;
                    };
                    let cut = valid + invalid_len;
                    let text = String::from_utf8_lossy(&self.pending[..cut]).into_owned();
                    self.sink.write(&text);
                    self.pending.drain(..cut);
                }
            }
        }
    }
}

impl io::Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.forward_pending();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let text = String::from_utf8_lossy(&self.pending).into_owned();
            self.sink.write(&text);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for SinkWriter<'_> {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

#[cfg(test)]
mod unit_tests {
    use std::io::Write;

    use super::{tail_scroll_start, OutputMirror, OutputRegion, SinkWriter, TextSink};

    #[test]
    fn mirror_appends_in_call_order_and_stays_read_only() {
        let mut region = OutputRegion::default();
        assert!(region.is_read_only());
        {
            let mut mirror = OutputMirror::new(&mut region);
            mirror.write("a");
            mirror.write("b");
        }
        assert!(region.content().ends_with("ab"));
        assert!(region.is_read_only());
    }

    #[test]
    fn read_only_region_refuses_direct_insert() {
        let mut region = OutputRegion::default();
        assert!(region.insert("x").is_err());
        assert_eq!(region.content(), "");
    }

    #[test]
    fn retention_drops_oldest_lines() {
        let mut region = OutputRegion::new(3);
        let mut mirror = OutputMirror::new(&mut region);
        for index in 0..5 {
            mirror.write(&format!("line-{index}\n"));
        }
        assert_eq!(region.content(), "line-2\nline-3\nline-4\n");
    }

    #[test]
    fn tail_scroll_start_aligns_to_viewport_pages() {
        assert_eq!(tail_scroll_start(0, 8), 0);
        assert_eq!(tail_scroll_start(1, 8), 0);
        assert_eq!(tail_scroll_start(8, 4), 4);
        assert_eq!(tail_scroll_start(9, 4), 8);
    }

    #[test]
    fn scrolling_up_leaves_follow_tail_and_end_restores_it() {
        let mut region = OutputRegion::default();
        region.set_viewport_height(4);
        {
            let mut mirror = OutputMirror::new(&mut region);
            for index in 0..20 {
                mirror.write(&format!("line-{index}\n"));
            }
        }
        assert!(region.follows_tail());
        assert_eq!(region.scroll(), 16);

        region.scroll_up(1);
        assert!(!region.follows_tail());
        assert_eq!(region.scroll(), 15);

        region.scroll_to_tail();
        assert!(region.follows_tail());
        assert_eq!(region.scroll(), 16);
    }

    #[test]
    fn sink_writer_holds_split_utf8_sequences() {
        let mut captured = String::new();
        {
            let mut writer = SinkWriter::new(&mut captured);
            let bytes = "é!".as_bytes();
            writer.write_all(&bytes[..1]).unwrap();
            writer.write_all(&bytes[1..]).unwrap();
        }
        assert_eq!(captured, "é!");
    }

    #[test]
    fn sink_writer_supports_formatting_macros() {
        let mut captured = String::new();
        {
            let mut writer = SinkWriter::new(&mut captured);
            writeln!(writer, "hello {}", 3).unwrap();
        }
        assert_eq!(captured, "hello 3\n");
    }

    impl TextSink for &std::cell::RefCell<String> {
        fn write(&mut self, chunk: &str) {
            self.borrow_mut().push_str(chunk);
        }
    }

    #[test]
    fn sink_writer_keeps_sequence_that_follows_an_invalid_byte() {
        let captured = std::cell::RefCell::new(String::new());
        {
            let mut sink = &captured;
            let mut writer = SinkWriter::new(&mut sink);
            writer.write_all(&[0xFF, 0xC3]).unwrap();
            assert_eq!(*captured.borrow(), "\u{FFFD}");
            writer.write_all(&[0xA9, b'!', 0xFE, b'x']).unwrap();
        }
        assert_eq!(captured.into_inner(), "\u{FFFD}é!\u{FFFD}x");
    }

    #[test]
    fn follow_tail_counts_wrapped_rows() {
        let mut region = OutputRegion::default();
        region.set_viewport_height(4);
        {
            let mut mirror = OutputMirror::new(&mut region);
            for index in 0..10 {
                mirror.write(&format!("line-{index}\n"));
            }
        }
        assert_eq!(region.scroll(), 8);

        region.set_display_rows(30);
        assert_eq!(region.row_count(), 30);
        assert_eq!(region.scroll(), 28);

        region.clear();
        assert_eq!(region.row_count(), 0);
        assert_eq!(region.scroll(), 0);
    }

    #[test]
    fn sink_writer_replaces_invalid_bytes_on_flush() {
        let mut captured = String::new();
        {
            let mut writer = SinkWriter::new(&mut captured);
            writer.write_all(&[b'a', 0xE2]).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(captured, "a\u{FFFD}");
    }
}
