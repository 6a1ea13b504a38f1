//! Display surfaces for annotated frames.

use std::collections::VecDeque;

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

/// A user request read from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    /// Save the current raw frame.
    Save,
    /// Leave the viewer.
    Quit,
}

impl KeyCommand {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::S => Some(Self::Save),
            Key::Q | Key::Escape => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("window: {0}")]
    Window(String),
}

pub trait Display {
    /// Present `image` with the given window title.
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<(), DisplayError>;

    /// Next pending key command, without blocking.
    fn poll_key(&mut self) -> Option<KeyCommand>;

    /// `false` once the user closed the surface.
    fn is_open(&self) -> bool;
}

/// Discards frames. Used for batch runs without a window.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show(&mut self, _title: &str, _image: &RgbImage) -> Result<(), DisplayError> {
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyCommand> {
        None
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// A desktop window. Created on the first frame and recreated when the
/// frame size changes.
#[derive(Default)]
pub struct WindowDisplay {
    window: Option<Window>,
    size: (usize, usize),
    buffer: Vec<u32>,
    pending: VecDeque<KeyCommand>,
}

impl WindowDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for WindowDisplay {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<(), DisplayError> {
        let size = (image.width() as usize, image.height() as usize);
        let window = match &mut self.window {
            Some(w) if self.size == size => w,
            slot => {
                log::debug!("opening {}x{} window", size.0, size.1);
                let w = Window::new(title, size.0, size.1, WindowOptions::default())
                    .map_err(|e| DisplayError::Window(e.to_string()))?;
                self.size = size;
                slot.insert(w)
            }
        };
        window.set_title(title);

        to_argb(image, &mut self.buffer);
        window
            .update_with_buffer(&self.buffer, size.0, size.1)
            .map_err(|e| DisplayError::Window(e.to_string()))?;
        self.pending.extend(
            window
                .get_keys_pressed(KeyRepeat::No)
                .into_iter()
                .filter_map(KeyCommand::from_key),
        );
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyCommand> {
        self.pending.pop_front()
    }

    fn is_open(&self) -> bool {
        self.window.as_ref().is_none_or(Window::is_open)
    }
}

/// Pack RGB8 pixels as `0RGB` words.
fn to_argb(image: &RgbImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        image
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
    );
}
