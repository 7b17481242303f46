/// Rasterizer drawing frames into a terminal
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use env3d_core::{Frame, Rasterizer, Result, SceneError};
use std::io::{self, Write};
use std::time::Instant;

use crate::renderer::AsciiRenderer;

/// Draws every frame with an [`AsciiRenderer`], below a one-line status bar
pub struct TerminalRasterizer<W: Write + Send> {
    out: W,
    renderer: AsciiRenderer,
    columns: u16,
    rows: u16,
    fps: f32,
    frames_since: u32,
    since: Instant,
}

impl<W: Write + Send> TerminalRasterizer<W> {
    /// `rows` includes the status bar
    pub fn new(out: W, columns: u16, rows: u16) -> Self {
        Self {
            out,
            renderer: AsciiRenderer::new(columns as usize, rows.saturating_sub(1) as usize),
            columns,
            rows,
            fps: 0.0,
            frames_since: 0,
            since: Instant::now(),
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.frames_since += 1;
        let elapsed = self.since.elapsed();
        if elapsed.as_secs() >= 1 {
            self.fps = self.frames_since as f32 / elapsed.as_secs_f32();
            self.frames_since = 0;
            self.since = Instant::now();
        }

        let status = format!(
            "env3d | frame {} | FPS: {:.1} | {} primitives, {} meshes, {} lights | WASD/Arrows=Camera L=Light Space=Pause Q=Quit",
            frame.number,
            self.fps,
            frame.primitives.len(),
            frame.meshes.len(),
            frame.lights.len(),
        );
        let status: String = status.chars().take(self.columns as usize).collect();
        queue!(
            self.out,
            MoveTo(0, 0),
            SetForegroundColor(TermColor::Yellow),
            Print(status),
            Clear(ClearType::UntilNewLine),
            ResetColor
        )?;

        self.renderer.draw(&mut self.out, 1)?;
        self.out.flush()
    }
}

impl<W: Write + Send> Rasterizer for TerminalRasterizer<W> {
    fn initialize(&mut self) -> Result<()> {
        if self.columns == 0 || self.rows < 2 {
            return Err(SceneError::ResourceExhausted(format!(
                "terminal of {} x {} has no room for a frame",
                self.columns, self.rows
            )));
        }
        log::debug!("Terminal rasterizer ready at {} x {}", self.columns, self.rows);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.columns = u16::try_from(width)
            .map_err(|_| SceneError::InvalidArgument(format!("{width} columns")))?;
        self.rows = u16::try_from(height)
            .map_err(|_| SceneError::InvalidArgument(format!("{height} rows")))?;
        self.renderer
            .resize(self.columns as usize, self.rows.saturating_sub(1) as usize);
        queue!(self.out, Clear(ClearType::All))
            .map_err(|e| SceneError::Rasterizer(e.to_string()))
    }

    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        self.renderer.clear(frame.background_color);
        self.renderer.render_frame(frame);
        self.write_frame(frame)
            .map_err(|e| SceneError::Rasterizer(format!("terminal write failed: {e}")))
    }

    fn dispose(&mut self) -> Result<()> {
        queue!(self.out, ResetColor)
            .and_then(|()| self.out.flush())
            .map_err(|e| SceneError::Rasterizer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::frame_with;
    use env3d_core::Primitive;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_draws_status_and_scene() {
        let frame = frame_with(&[Primitive::create_cube()], &[], |_| {});
        let mut rasterizer = TerminalRasterizer::new(Vec::new(), 40, 21);
        rasterizer.initialize().unwrap();
        rasterizer.draw_frame(&frame).unwrap();

        let output = String::from_utf8_lossy(rasterizer.writer()).into_owned();
        assert!(output.contains("env3d | frame 1"));
        assert_eq!(rasterizer.renderer().height(), 20);
        assert_ne!(rasterizer.renderer().cell(20, 10).unwrap().0, ' ');
    }

    #[test]
    fn test_resize_reallocates() {
        let mut rasterizer = TerminalRasterizer::new(Vec::new(), 40, 21);
        rasterizer.resize(80, 25).unwrap();
        assert_eq!(rasterizer.renderer().width(), 80);
        assert_eq!(rasterizer.renderer().height(), 24);
        assert!(rasterizer.resize(100_000, 25).is_err());
    }

    #[test]
    fn test_tiny_terminal_is_rejected() {
        let mut rasterizer = TerminalRasterizer::new(Vec::new(), 40, 1);
        assert!(matches!(
            rasterizer.initialize(),
            Err(SceneError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_write_failure_is_rasterizer_error() {
        let frame = frame_with(&[], &[], |_| {});
        let mut rasterizer = TerminalRasterizer::new(BrokenPipe, 10, 5);
        assert!(matches!(
            rasterizer.draw_frame(&frame),
            Err(SceneError::Rasterizer(_))
        ));
    }
}
