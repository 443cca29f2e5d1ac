use pylog_types::Transform;

use crate::renderer::Renderer;

/// Counts of what happened to each line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub rendered: u64,
    pub suppressed: u64,
}

/// Splits a byte stream into lines and renders each complete one.
///
/// A trailing line without `\n` is held until more input arrives or the
/// stream finishes.
#[derive(Debug)]
pub struct LineRenderer {
    renderer: Renderer,
    partial: Vec<u8>,
    counts: LineCounts,
}

impl LineRenderer {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            partial: Vec::new(),
            counts: LineCounts::default(),
        }
    }

    pub fn counts(&self) -> LineCounts {
        self.counts
    }

    fn render(&mut self, line: &[u8], out: &mut Vec<u8>) {
        if self.renderer.render_line(line, out) {
            self.counts.rendered += 1;
        } else {
            self.counts.suppressed += 1;
        }
    }
}

impl Transform for LineRenderer {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos);
            if self.partial.is_empty() {
                self.render(line, &mut out);
            } else {
                let mut joined = std::mem::take(&mut self.partial);
                joined.extend_from_slice(line);
                self.render(&joined, &mut out);
            }
            rest = &tail[1..];
        }

        self.partial.extend_from_slice(rest);
        out
    }

    fn finish(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if !self.partial.is_empty() {
            let last = std::mem::take(&mut self.partial);
            self.render(&last, &mut out);
        }
        tracing::debug!(
            rendered = self.counts.rendered,
            suppressed = self.counts.suppressed,
            "renderer finished"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderOptions;

    fn line_renderer() -> LineRenderer {
        LineRenderer::new(Renderer::new(RenderOptions::default()))
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut r = line_renderer();
        let mut out = r.process(b"{\"level\":30,\"ms");
        assert!(out.is_empty());
        out.extend(r.process(b"g\":\"a\"}\n{\"level\":40,\"msg\":\"b\"}\n{\"msg\":"));
        out.extend(r.process(b"\"c\"}"));
        out.extend(r.finish());

        assert_eq!(String::from_utf8(out).unwrap(), "INFO: a\nWARN: b\nc\n");
        assert_eq!(r.counts().rendered, 3);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let mut r = line_renderer();
        let mut out = r.process(b"\n\n");
        out.extend(r.finish());
        assert_eq!(out, b"\n\n");
    }

    #[test]
    fn test_suppressed_lines_are_counted() {
        let options = RenderOptions {
            minimum_level: Some(50),
            ..Default::default()
        };
        let mut r = LineRenderer::new(Renderer::new(options));
        let out = r.process(b"{\"level\":30}\n{\"level\":60,\"msg\":\"x\"}\n");
        assert_eq!(out, b"FATAL: x\n");
        assert_eq!(
            r.counts(),
            LineCounts {
                rendered: 1,
                suppressed: 1
            }
        );
    }
}
