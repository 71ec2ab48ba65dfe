use egui::Context;

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String>;
}

/// Hands text to the platform clipboard at the end of the current frame.
pub struct EguiClipboard<'a> {
    ctx: &'a Context,
}

impl<'a> EguiClipboard<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }
}

impl Clipboard for EguiClipboard<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        // egui treats an empty string as "nothing to copy".
        if text.is_empty() {
            return Err("nothing to copy".to_string());
        }
        self.ctx
            .output_mut(|output| output.copied_text = text.to_string());
        Ok(())
    }
}
